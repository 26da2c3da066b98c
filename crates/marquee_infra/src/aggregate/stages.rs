use std::collections::HashMap;

use marquee_domain::Stage;
use serde_json::{Map, Value};

use super::error::{AggregateError, Result};
use super::expr::eval;
use super::matcher::matches;
use super::value::{as_number, cmp_values, get_field, is_truthy, number, remove_path, set_path};

/// Applies one stage to the documents flowing through the pipeline.
pub fn apply(stage: &Stage, docs: Vec<Value>) -> Result<Vec<Value>> {
    let spec = stage.spec();
    match stage.operator() {
        "$match" => {
            let mut out = Vec::with_capacity(docs.len());
            for doc in docs {
                if matches(&doc, spec)? {
                    out.push(doc);
                }
            }
            Ok(out)
        }
        "$project" => project(spec, docs),
        "$addFields" | "$set" => add_fields(spec, docs),
        "$unset" => unset(spec, docs),
        "$group" => group(spec, docs),
        "$sort" => sort(spec, docs),
        "$limit" => {
            let n = count_arg("$limit", spec)?;
            Ok(docs.into_iter().take(n).collect())
        }
        "$skip" => {
            let n = count_arg("$skip", spec)?;
            Ok(docs.into_iter().skip(n).collect())
        }
        "$count" => {
            let Some(field) = spec.as_str().filter(|f| !f.is_empty() && !f.starts_with('$')) else {
                return Err(AggregateError::invalid("$count", "expected a field name"));
            };
            if docs.is_empty() {
                return Ok(Vec::new());
            }
            let mut out = Map::new();
            out.insert(field.to_string(), Value::from(docs.len()));
            Ok(vec![Value::Object(out)])
        }
        "$unwind" => unwind(spec, docs),
        "$sortByCount" => {
            let grouped = group(
                &serde_json::json!({"_id": spec, "count": {"$sum": 1}}),
                docs,
            )?;
            sort(&serde_json::json!({"count": -1}), grouped)
        }
        other => Err(AggregateError::UnsupportedStage(other.to_string())),
    }
}

fn count_arg(op: &str, spec: &Value) -> Result<usize> {
    as_number(spec)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0)
        .map(|n| n as usize)
        .ok_or_else(|| AggregateError::invalid(op, "expected a non-negative integer"))
}

fn spec_object<'a>(op: &str, spec: &'a Value) -> Result<&'a Map<String, Value>> {
    spec.as_object()
        .ok_or_else(|| AggregateError::invalid(op, "expected an object"))
}

/// Whether a projection value selects a field (`1`, `true`) rather than
/// computing one.
fn is_flag(value: &Value) -> bool {
    matches!(value, Value::Bool(_)) || value.as_f64().is_some()
}

fn project(spec: &Value, docs: Vec<Value>) -> Result<Vec<Value>> {
    let fields = spec_object("$project", spec)?;
    if fields.is_empty() {
        return Err(AggregateError::invalid("$project", "projection cannot be empty"));
    }

    let non_id = fields
        .iter()
        .filter(|(key, _)| key.as_str() != "_id")
        .collect::<Vec<_>>();
    let exclusion = if non_id.is_empty() {
        !is_truthy(&fields["_id"])
    } else {
        non_id.iter().all(|(_, value)| is_flag(value) && !is_truthy(value))
    };

    if exclusion {
        let removed = fields
            .iter()
            .filter(|(_, value)| !is_truthy(value))
            .map(|(key, _)| key.as_str())
            .collect::<Vec<_>>();
        return Ok(docs
            .into_iter()
            .map(|mut doc| {
                if let Value::Object(map) = &mut doc {
                    for path in &removed {
                        remove_path(map, path);
                    }
                }
                doc
            })
            .collect());
    }

    let keep_id = fields.get("_id").is_none_or(is_truthy);
    docs.into_iter()
        .map(|doc| {
            let mut out = Map::new();
            if keep_id && !fields.contains_key("_id") {
                if let Some(id) = doc.get("_id") {
                    out.insert("_id".to_string(), id.clone());
                }
            }
            for (path, value) in fields {
                if is_flag(value) {
                    if !is_truthy(value) {
                        if path == "_id" {
                            continue;
                        }
                        return Err(AggregateError::invalid(
                            "$project",
                            "cannot mix inclusion and exclusion",
                        ));
                    }
                    if let Some(found) = get_field(&doc, path) {
                        set_path(&mut out, path, found);
                    }
                } else if let Some(found) = eval(&doc, value)? {
                    set_path(&mut out, path, found);
                }
            }
            Ok(Value::Object(out))
        })
        .collect()
}

fn add_fields(spec: &Value, docs: Vec<Value>) -> Result<Vec<Value>> {
    let fields = spec_object("$addFields", spec)?;
    docs.into_iter()
        .map(|mut doc| {
            let computed = fields
                .iter()
                .map(|(path, expr)| Ok((path, eval(&doc, expr)?)))
                .collect::<Result<Vec<_>>>()?;
            if let Value::Object(map) = &mut doc {
                for (path, value) in computed {
                    match value {
                        Some(value) => set_path(map, path, value),
                        None => remove_path(map, path),
                    }
                }
            }
            Ok(doc)
        })
        .collect()
}

fn unset(spec: &Value, docs: Vec<Value>) -> Result<Vec<Value>> {
    let paths = match spec {
        Value::String(path) => vec![path.clone()],
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| AggregateError::invalid("$unset", "expected field names"))
            })
            .collect::<Result<Vec<_>>>()?,
        _ => return Err(AggregateError::invalid("$unset", "expected field names")),
    };
    Ok(docs
        .into_iter()
        .map(|mut doc| {
            if let Value::Object(map) = &mut doc {
                for path in &paths {
                    remove_path(map, path);
                }
            }
            doc
        })
        .collect())
}

fn sort(spec: &Value, mut docs: Vec<Value>) -> Result<Vec<Value>> {
    let keys = spec_object("$sort", spec)?
        .iter()
        .map(|(path, direction)| match as_number(direction) {
            Some(d) if d == 1.0 || d == -1.0 => Ok((path.as_str(), d < 0.0)),
            _ => Err(AggregateError::invalid("$sort", "direction must be 1 or -1")),
        })
        .collect::<Result<Vec<_>>>()?;

    if keys.is_empty() {
        return Err(AggregateError::invalid("$sort", "expected at least one key"));
    }

    docs.sort_by(|a, b| {
        keys.iter()
            .map(|(path, descending)| {
                let x = get_field(a, path).unwrap_or(Value::Null);
                let y = get_field(b, path).unwrap_or(Value::Null);
                let ordering = cmp_values(&x, &y);
                if *descending { ordering.reverse() } else { ordering }
            })
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(docs)
}

fn unwind(spec: &Value, docs: Vec<Value>) -> Result<Vec<Value>> {
    let (path, preserve) = match spec {
        Value::String(path) => (path.as_str(), false),
        Value::Object(map) => (
            map.get("path").and_then(Value::as_str).unwrap_or_default(),
            map.get("preserveNullAndEmptyArrays").is_some_and(is_truthy),
        ),
        _ => return Err(AggregateError::invalid("$unwind", "expected a field path")),
    };
    let Some(path) = path.strip_prefix('$') else {
        return Err(AggregateError::invalid("$unwind", "path must start with '$'"));
    };

    let mut out = Vec::new();
    for doc in docs {
        match get_field(&doc, path) {
            Some(Value::Array(items)) if !items.is_empty() => {
                for item in items {
                    let mut copy = doc.clone();
                    if let Value::Object(map) = &mut copy {
                        set_path(map, path, item);
                    }
                    out.push(copy);
                }
            }
            Some(Value::Array(_)) | Some(Value::Null) | None => {
                if preserve {
                    out.push(doc);
                }
            }
            Some(_) => out.push(doc),
        }
    }
    Ok(out)
}

/// Accumulator state for one output field of one group.
enum Accumulator {
    Sum { total: f64 },
    Avg { total: f64, count: usize },
    Min(Option<Value>),
    Max(Option<Value>),
    First(Option<Value>),
    Last(Option<Value>),
    Push(Vec<Value>),
    AddToSet(Vec<Value>),
}

impl Accumulator {
    fn new(op: &str) -> Result<Self> {
        Ok(match op {
            "$sum" | "$count" => Self::Sum { total: 0.0 },
            "$avg" => Self::Avg { total: 0.0, count: 0 },
            "$min" => Self::Min(None),
            "$max" => Self::Max(None),
            "$first" => Self::First(None),
            "$last" => Self::Last(None),
            "$push" => Self::Push(Vec::new()),
            "$addToSet" => Self::AddToSet(Vec::new()),
            other => return Err(AggregateError::UnsupportedOperator(other.to_string())),
        })
    }

    fn add(&mut self, value: Option<Value>) {
        match self {
            Self::Sum { total } => {
                if let Some(n) = value.as_ref().and_then(as_number) {
                    *total += n;
                } else if let Some(Value::Array(items)) = &value {
                    *total += items.iter().filter_map(as_number).sum::<f64>();
                }
            }
            Self::Avg { total, count } => {
                if let Some(n) = value.as_ref().and_then(as_number) {
                    *total += n;
                    *count += 1;
                }
            }
            Self::Min(_) | Self::Max(_) => {
                let Some(value) = value.filter(|v| !v.is_null()) else {
                    return;
                };
                let (best, wanted) = match self {
                    Self::Min(best) => (best, std::cmp::Ordering::Less),
                    Self::Max(best) => (best, std::cmp::Ordering::Greater),
                    _ => return,
                };
                if best.as_ref().is_none_or(|b| cmp_values(&value, b) == wanted) {
                    *best = Some(value);
                }
            }
            Self::First(slot) => {
                if slot.is_none() {
                    *slot = Some(value.unwrap_or(Value::Null));
                }
            }
            Self::Last(slot) => *slot = Some(value.unwrap_or(Value::Null)),
            Self::Push(items) => {
                if let Some(value) = value {
                    items.push(value);
                }
            }
            Self::AddToSet(items) => {
                if let Some(value) = value {
                    if !items.contains(&value) {
                        items.push(value);
                    }
                }
            }
        }
    }

    fn finish(self) -> Value {
        match self {
            Self::Sum { total } => number(total),
            Self::Avg { count: 0, .. } => Value::Null,
            Self::Avg { total, count } => number(total / count as f64),
            Self::Min(v) | Self::Max(v) | Self::First(v) | Self::Last(v) => v.unwrap_or(Value::Null),
            Self::Push(items) | Self::AddToSet(items) => Value::Array(items),
        }
    }
}

fn group(spec: &Value, docs: Vec<Value>) -> Result<Vec<Value>> {
    let fields = spec_object("$group", spec)?;
    let Some(id_expr) = fields.get("_id") else {
        return Err(AggregateError::invalid("$group", "a group specification must include an _id"));
    };

    let mut accumulators = Vec::new();
    for (name, definition) in fields.iter().filter(|(name, _)| name.as_str() != "_id") {
        let Some((op, expr)) = definition
            .as_object()
            .filter(|map| map.len() == 1)
            .and_then(|map| map.iter().next())
        else {
            return Err(AggregateError::invalid(
                "$group",
                format!("field '{name}' must be an accumulator object"),
            ));
        };
        Accumulator::new(op)?;
        // `{"$count": {}}` counts documents.
        let expr = if op == "$count" { Value::from(1) } else { expr.clone() };
        accumulators.push((name.clone(), op.clone(), expr));
    }

    let mut order: Vec<(Value, Vec<Accumulator>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for doc in &docs {
        let key = eval(doc, id_expr)?.unwrap_or(Value::Null);
        let slot = match index.get(&key.to_string()) {
            Some(slot) => *slot,
            None => {
                let fresh = accumulators
                    .iter()
                    .map(|(_, op, _)| Accumulator::new(op))
                    .collect::<Result<Vec<_>>>()?;
                index.insert(key.to_string(), order.len());
                order.push((key, fresh));
                order.len() - 1
            }
        };
        for ((_, _, expr), state) in accumulators.iter().zip(order[slot].1.iter_mut()) {
            state.add(eval(doc, expr)?);
        }
    }

    Ok(order
        .into_iter()
        .map(|(key, states)| {
            let mut out = Map::new();
            out.insert("_id".to_string(), key);
            for ((name, _, _), state) in accumulators.iter().zip(states) {
                out.insert(name.clone(), state.finish());
            }
            Value::Object(out)
        })
        .collect())
}
