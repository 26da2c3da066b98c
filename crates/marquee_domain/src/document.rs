use derive_more::{Deref, From};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::format_datetime;

/// What happens to the `_id` field of each result document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdPolicy {
    /// Keep `_id` as a display-safe string.
    #[default]
    Stringify,
    /// Drop `_id` entirely.
    Remove,
}

/// A query result with identifiers and dates rendered as plain strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Deref, From)]
#[serde(transparent)]
pub struct ResultDocument(Map<String, Value>);

impl ResultDocument {
    /// Converts a raw document from the store into its display-safe form.
    ///
    /// Non-object values are wrapped under a `value` key.
    pub fn from_raw(raw: Value, policy: IdPolicy) -> Self {
        let mut map = match display_safe(raw) {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        match policy {
            IdPolicy::Remove => {
                map.remove("_id");
            }
            IdPolicy::Stringify => {
                if let Some(id) = map.get_mut("_id") {
                    if !id.is_string() {
                        let text = match &*id {
                            Value::Null => "null".to_string(),
                            other => other.to_string(),
                        };
                        *id = Value::String(text);
                    }
                }
            }
        }

        Self(map)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// Replaces extended-JSON wrappers (`$oid`, `$date`, `$numberLong`) with
/// their plain string form, recursively.
pub fn display_safe(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(inner) = map.get("$oid").and_then(Value::as_str) {
                    return Value::String(inner.to_string());
                }
                if let Some(inner) = map.get("$date") {
                    return Value::String(date_text(inner));
                }
                if let Some(inner) = map.get("$numberLong").and_then(Value::as_str) {
                    return Value::String(inner.to_string());
                }
            }
            Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, display_safe(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(display_safe).collect()),
        other => other,
    }
}

fn date_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(map) => map
            .get("$numberLong")
            .and_then(Value::as_str)
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|date| format_datetime(&date))
            .unwrap_or_else(|| value.to_string()),
        Value::Number(ms) => ms
            .as_i64()
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|date| format_datetime(&date))
            .unwrap_or_else(|| ms.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_stringify_object_id() {
        let fixture = json!({
            "_id": {"$oid": "573a1390f29313caabcd4135"},
            "title": "Blacksmith Scene",
            "released": {"$date": "1893-05-09T00:00:00Z"}
        });
        let actual = ResultDocument::from_raw(fixture, IdPolicy::Stringify).to_value();
        let expected = json!({
            "_id": "573a1390f29313caabcd4135",
            "title": "Blacksmith Scene",
            "released": "1893-05-09T00:00:00Z"
        });
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_remove_id() {
        let fixture = json!({"_id": {"$oid": "abc"}, "title": "Jaws"});
        let actual = ResultDocument::from_raw(fixture, IdPolicy::Remove).to_value();
        let expected = json!({"title": "Jaws"});
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_group_id_objects_are_stringified() {
        let fixture = json!({"_id": {"genre": "Drama"}, "count": 3});
        let actual = ResultDocument::from_raw(fixture, IdPolicy::Stringify).to_value();
        let expected = json!({"_id": "{\"genre\":\"Drama\"}", "count": 3});
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_null_group_id() {
        let fixture = json!({"_id": null, "averageRating": 6.5});
        let actual = ResultDocument::from_raw(fixture, IdPolicy::Stringify).to_value();
        let expected = json!({"_id": "null", "averageRating": 6.5});
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_nested_dates_and_long_dates() {
        let fixture = json!({
            "tomatoes": {"lastUpdated": {"$date": {"$numberLong": "0"}}},
            "list": [{"$oid": "x1"}]
        });
        let actual = ResultDocument::from_raw(fixture, IdPolicy::Remove).to_value();
        let expected = json!({
            "tomatoes": {"lastUpdated": "1970-01-01T00:00:00.000Z"},
            "list": ["x1"]
        });
        assert_eq!(actual, expected);
    }
}
