use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use marquee_domain::parse_datetime;
use serde_json::{Map, Value};

/// Reads an extended-JSON date (`{"$date": ...}`).
pub fn as_date(value: &Value) -> Option<DateTime<Utc>> {
    let Value::Object(map) = value else {
        return None;
    };
    if map.len() != 1 {
        return None;
    }
    match map.get("$date")? {
        Value::String(text) => parse_datetime(text),
        Value::Number(ms) => ms.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::Object(inner) => inner
            .get("$numberLong")?
            .as_str()?
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn as_oid(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) if map.len() == 1 => map.get("$oid")?.as_str(),
        _ => None,
    }
}

/// Reads a number, including `{"$numberLong"}` / `{"$numberInt"}` /
/// `{"$numberDouble"}` wrappers.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Object(map) if map.len() == 1 => map
            .get("$numberLong")
            .or_else(|| map.get("$numberInt"))
            .or_else(|| map.get("$numberDouble"))
            .or_else(|| map.get("$numberDecimal"))?
            .as_str()?
            .parse()
            .ok(),
        _ => None,
    }
}

/// Whether an object is an extended-JSON scalar rather than a document.
pub fn is_wrapped_scalar(map: &Map<String, Value>) -> bool {
    map.len() == 1
        && map.keys().all(|key| {
            matches!(
                key.as_str(),
                "$date" | "$oid" | "$numberLong" | "$numberInt" | "$numberDouble" | "$numberDecimal"
            )
        })
}

/// Canonical type order used when comparing values of different kinds.
fn type_rank(value: &Value) -> u8 {
    if as_number(value).is_some() {
        return 2;
    }
    if as_oid(value).is_some() {
        return 7;
    }
    if as_date(value).is_some() {
        return 9;
    }
    match value {
        Value::Null => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Object(_) => 4,
        Value::Array(_) => 5,
        Value::Bool(_) => 8,
    }
}

/// Total order over values: first by type, then by content.
pub fn cmp_values(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }

    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    if let (Some(x), Some(y)) = (as_date(a), as_date(b)) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (as_oid(a), as_oid(b)) {
        return x.cmp(y);
    }

    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(x, y)| cmp_values(x, y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y.iter())
            .map(|((kx, vx), (ky, vy))| kx.cmp(ky).then_with(|| cmp_values(vx, vy)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => Ordering::Equal,
    }
}

/// Compares only values of the same kind, as range operators do.
pub fn cmp_same_kind(a: &Value, b: &Value) -> Option<Ordering> {
    if type_rank(a) != type_rank(b) {
        return None;
    }
    Some(cmp_values(a, b))
}

pub fn values_eq(a: &Value, b: &Value) -> bool {
    type_rank(a) == type_rank(b) && cmp_values(a, b) == Ordering::Equal
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        other => as_number(other).is_none_or(|n| n != 0.0),
    }
}

/// Values reachable at a dotted path, fanning out through arrays.
///
/// Used by query matching: `{"cast.name": "x"}` looks inside every element
/// of `cast`.
pub fn candidates(doc: &Value, path: &str) -> Vec<Value> {
    fn walk(value: &Value, parts: &[&str], out: &mut Vec<Value>) {
        let Some((head, rest)) = parts.split_first() else {
            out.push(value.clone());
            return;
        };
        match value {
            Value::Object(map) => {
                if let Some(next) = map.get(*head) {
                    walk(next, rest, out);
                }
            }
            Value::Array(items) => {
                if let Ok(index) = head.parse::<usize>() {
                    if let Some(item) = items.get(index) {
                        walk(item, rest, out);
                    }
                    return;
                }
                for item in items.iter().filter(|item| item.is_object()) {
                    walk(item, parts, out);
                }
            }
            _ => {}
        }
    }

    let parts = path.split('.').collect::<Vec<_>>();
    let mut out = Vec::new();
    walk(doc, &parts, &mut out);
    out
}

/// Resolves a field path for expressions. Arrays along the path produce an
/// array of the values found in their elements.
pub fn get_field(doc: &Value, path: &str) -> Option<Value> {
    fn walk(value: &Value, parts: &[&str]) -> Option<Value> {
        let Some((head, rest)) = parts.split_first() else {
            return Some(value.clone());
        };
        match value {
            Value::Object(map) => walk(map.get(*head)?, rest),
            Value::Array(items) => Some(Value::Array(
                items.iter().filter_map(|item| walk(item, parts)).collect(),
            )),
            _ => None,
        }
    }

    let parts = path.split('.').collect::<Vec<_>>();
    walk(doc, &parts)
}

/// Sets `path` inside `map`, creating intermediate objects.
pub fn set_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                set_path(inner, rest, value);
            }
        }
    }
}

pub fn remove_path(map: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            map.remove(path);
        }
        Some((head, rest)) => match map.get_mut(head) {
            Some(Value::Object(inner)) => remove_path(inner, rest),
            Some(Value::Array(items)) => {
                for item in items.iter_mut() {
                    if let Value::Object(inner) = item {
                        remove_path(inner, rest);
                    }
                }
            }
            _ => {}
        },
    }
}

/// Converts a float back into the tightest JSON number.
pub fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_dates_compare_chronologically() {
        let a = json!({"$date": "1999-12-31T00:00:00Z"});
        let b = json!({"$date": {"$numberLong": "1000000000000"}});
        assert_eq!(cmp_values(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_mixed_number_kinds_are_equal() {
        assert!(values_eq(&json!(8), &json!(8.0)));
        assert!(values_eq(&json!({"$numberInt": "3"}), &json!(3)));
    }

    #[test]
    fn test_cross_kind_ranges_do_not_compare() {
        assert_eq!(cmp_same_kind(&json!("9"), &json!(8)), None);
        assert_eq!(cmp_same_kind(&json!(9), &json!(8)), Some(Ordering::Greater));
    }

    #[test]
    fn test_null_sorts_first() {
        let mut fixture = vec![json!(3), json!("a"), json!(null), json!(1)];
        fixture.sort_by(cmp_values);
        assert_eq!(fixture, vec![json!(null), json!(1), json!(3), json!("a")]);
    }

    #[test]
    fn test_candidates_fan_out_through_arrays() {
        let fixture = json!({"awards": [{"wins": 1}, {"wins": 2}], "genres": ["A", "B"]});
        assert_eq!(candidates(&fixture, "awards.wins"), vec![json!(1), json!(2)]);
        assert_eq!(candidates(&fixture, "genres"), vec![json!(["A", "B"])]);
        assert_eq!(candidates(&fixture, "genres.1"), vec![json!("B")]);
        assert!(candidates(&fixture, "missing").is_empty());
    }

    #[test]
    fn test_set_and_remove_path() {
        let mut fixture = Map::new();
        set_path(&mut fixture, "imdb.rating", json!(8.1));
        set_path(&mut fixture, "title", json!("Heat"));
        assert_eq!(Value::Object(fixture.clone()), json!({"imdb": {"rating": 8.1}, "title": "Heat"}));

        remove_path(&mut fixture, "imdb.rating");
        assert_eq!(Value::Object(fixture), json!({"imdb": {}, "title": "Heat"}));
    }

    #[test]
    fn test_number_prefers_integers() {
        assert_eq!(number(4.0), json!(4));
        assert_eq!(number(2.5), json!(2.5));
    }
}
