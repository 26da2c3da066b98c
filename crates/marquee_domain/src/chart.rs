use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serialized chart specification; empty when no chart was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartArtifact(String);

impl ChartArtifact {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_figure(figure: &Value) -> Self {
        Self(figure.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
