use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Error;

/// A single aggregation stage: an object with exactly one `$operator` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Stage {
    operator: String,
    spec: Value,
}

impl Stage {
    pub fn new(operator: impl Into<String>, spec: Value) -> Self {
        Self { operator: operator.into(), spec }
    }

    pub fn limit(n: u64) -> Self {
        Self::new("$limit", Value::from(n))
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn spec(&self) -> &Value {
        &self.spec
    }

    pub fn is_limit(&self) -> bool {
        self.operator == "$limit"
    }
}

impl TryFrom<Value> for Stage {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(map) = value else {
            return Err(Error::InvalidStage(format!(
                "expected an object, found {}",
                kind_of(&value)
            )));
        };

        if map.len() != 1 {
            return Err(Error::InvalidStage(format!(
                "expected exactly one operator key, found {}",
                map.len()
            )));
        }

        let Some((operator, spec)) = map.into_iter().next() else {
            return Err(Error::InvalidStage("empty stage".to_string()));
        };

        if !operator.starts_with('$') || operator.len() < 2 {
            return Err(Error::InvalidStage(format!(
                "'{operator}' is not an aggregation operator"
            )));
        }

        Ok(Self { operator, spec })
    }
}

impl From<Stage> for Value {
    fn from(stage: Stage) -> Self {
        let mut map = Map::new();
        map.insert(stage.operator, stage.spec);
        Value::Object(map)
    }
}

/// Ordered, non-empty sequence of aggregation stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Pipeline(Vec<Stage>);

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Result<Self, Error> {
        if stages.is_empty() {
            return Err(Error::EmptyPipeline);
        }
        Ok(Self(stages))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends `{"$limit": n}` unless the pipeline already ends with a limit.
    pub fn ensure_limit(mut self, n: u64) -> Self {
        if !self.0.last().is_some_and(Stage::is_limit) {
            self.0.push(Stage::limit(n));
        }
        self
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().cloned().map(Value::from).collect())
    }
}

impl TryFrom<Value> for Pipeline {
    type Error = Error;

    /// Accepts an array of stages or a single stage object.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(items) => {
                let stages = items
                    .into_iter()
                    .map(Stage::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Self::new(stages)
            }
            Value::Object(_) => Self::new(vec![Stage::try_from(value)?]),
            other => Err(Error::InvalidStage(format!(
                "expected a pipeline array, found {}",
                kind_of(&other)
            ))),
        }
    }
}

impl From<Pipeline> for Value {
    fn from(pipeline: Pipeline) -> Self {
        pipeline.to_value()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
