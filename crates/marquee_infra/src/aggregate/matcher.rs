use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use super::error::{AggregateError, Result};
use super::value::{as_number, candidates, cmp_same_kind, is_wrapped_scalar, values_eq};

/// Evaluates a query filter against one document.
pub fn matches(doc: &Value, filter: &Value) -> Result<bool> {
    let Value::Object(filter) = filter else {
        return Err(AggregateError::invalid("$match", "filter must be an object"));
    };

    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => logical(doc, key, condition)?.iter().all(|b| *b),
            "$or" => logical(doc, key, condition)?.iter().any(|b| *b),
            "$nor" => !logical(doc, key, condition)?.iter().any(|b| *b),
            op if op.starts_with('$') => {
                return Err(AggregateError::UnsupportedOperator(op.to_string()));
            }
            path => field_matches(&candidates(doc, path), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn logical(doc: &Value, operator: &str, condition: &Value) -> Result<Vec<bool>> {
    let Value::Array(filters) = condition else {
        return Err(AggregateError::invalid(operator, "expected an array of filters"));
    };
    filters.iter().map(|filter| matches(doc, filter)).collect()
}

/// Whether an object is an operator expression like `{"$gt": 1}`.
fn is_operator_object(map: &Map<String, Value>) -> bool {
    !map.is_empty() && !is_wrapped_scalar(map) && map.keys().all(|k| k.starts_with('$'))
}

fn field_matches(found: &[Value], condition: &Value) -> Result<bool> {
    match condition {
        Value::Object(ops) if is_operator_object(ops) => {
            for (op, arg) in ops {
                if !apply_operator(found, op, arg, ops)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        literal => Ok(equals_any(found, literal)),
    }
}

/// Each found value, plus the elements of found arrays.
fn expanded(found: &[Value]) -> impl Iterator<Item = &Value> {
    found.iter().flat_map(|value| {
        let elements = match value {
            Value::Array(items) => items.as_slice(),
            _ => &[],
        };
        std::iter::once(value).chain(elements.iter())
    })
}

fn equals_any(found: &[Value], literal: &Value) -> bool {
    if literal.is_null() && found.is_empty() {
        return true;
    }
    expanded(found).any(|value| values_eq(value, literal))
}

fn apply_operator(found: &[Value], op: &str, arg: &Value, ops: &Map<String, Value>) -> Result<bool> {
    let range = |accept: fn(Ordering) -> bool| {
        expanded(found).any(|value| cmp_same_kind(value, arg).is_some_and(accept))
    };

    let ok = match op {
        "$eq" => equals_any(found, arg),
        "$ne" => !equals_any(found, arg),
        "$gt" => range(|o| o == Ordering::Greater),
        "$gte" => range(|o| o != Ordering::Less),
        "$lt" => range(|o| o == Ordering::Less),
        "$lte" => range(|o| o != Ordering::Greater),
        "$in" => in_list(found, op, arg)?,
        "$nin" => !in_list(found, op, arg)?,
        "$all" => {
            let Value::Array(required) = arg else {
                return Err(AggregateError::invalid(op, "expected an array"));
            };
            !required.is_empty() && required.iter().all(|item| equals_any(found, item))
        }
        "$exists" => found.is_empty() != super::value::is_truthy(arg),
        "$size" => {
            let size = as_number(arg)
                .ok_or_else(|| AggregateError::invalid(op, "expected a number"))?;
            found
                .iter()
                .any(|value| value.as_array().is_some_and(|a| a.len() as f64 == size))
        }
        "$regex" => {
            let regex = build_regex(arg, ops.get("$options"))?;
            expanded(found).any(|value| value.as_str().is_some_and(|s| regex.is_match(s)))
        }
        "$options" => true,
        "$elemMatch" => elem_match(found, arg)?,
        "$not" => match arg {
            Value::Object(inner) if is_operator_object(inner) => !field_matches(found, arg)?,
            Value::String(_) => {
                let regex = build_regex(arg, None)?;
                !expanded(found).any(|value| value.as_str().is_some_and(|s| regex.is_match(s)))
            }
            _ => return Err(AggregateError::invalid(op, "expected an operator expression")),
        },
        other => return Err(AggregateError::UnsupportedOperator(other.to_string())),
    };
    Ok(ok)
}

fn in_list(found: &[Value], op: &str, arg: &Value) -> Result<bool> {
    let Value::Array(options) = arg else {
        return Err(AggregateError::invalid(op, "expected an array"));
    };
    Ok(options.iter().any(|option| equals_any(found, option)))
}

fn elem_match(found: &[Value], condition: &Value) -> Result<bool> {
    let Value::Object(map) = condition else {
        return Err(AggregateError::invalid("$elemMatch", "expected an object"));
    };
    for items in found.iter().filter_map(Value::as_array) {
        for item in items {
            let ok = if is_operator_object(map) {
                field_matches(std::slice::from_ref(item), condition)?
            } else {
                matches(item, condition)?
            };
            if ok {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn build_regex(pattern: &Value, options: Option<&Value>) -> Result<Regex> {
    let pattern = pattern
        .as_str()
        .ok_or_else(|| AggregateError::invalid("$regex", "expected a string pattern"))?;
    let options = options.and_then(Value::as_str).unwrap_or_default();
    Ok(RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .ignore_whitespace(options.contains('x'))
        .build()?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn movie() -> Value {
        json!({
            "title": "The Great Train Robbery",
            "genres": ["Short", "Western"],
            "cast": ["A.C. Abadie", "Gilbert M. 'Broncho Billy' Anderson"],
            "year": 1903,
            "imdb": {"rating": 7.4, "votes": 9847},
            "released": {"$date": "1903-12-01T00:00:00Z"},
            "awards": {"wins": 1, "nominations": 0},
            "reviews": [{"score": 4, "by": "a"}, {"score": 9, "by": "b"}]
        })
    }

    fn check(filter: Value) -> bool {
        matches(&movie(), &filter).unwrap()
    }

    #[test]
    fn test_equality_and_array_membership() {
        assert!(check(json!({"genres": "Western"})));
        assert!(check(json!({"cast": "A.C. Abadie", "genres": "Western"})));
        assert!(!check(json!({"genres": "Comedy"})));
        assert!(check(json!({"genres": ["Short", "Western"]})));
    }

    #[test]
    fn test_ranges_on_dotted_paths() {
        assert!(check(json!({"imdb.rating": {"$gt": 7}, "imdb.votes": {"$lt": 10000}})));
        assert!(!check(json!({"imdb.rating": {"$gt": 8}})));
        assert!(check(json!({"year": {"$gte": 1900, "$lt": 1910}})));
    }

    #[test]
    fn test_dates() {
        assert!(check(json!({"released": {"$lt": {"$date": "1904-01-01T00:00:00.000Z"}}})));
        assert!(!check(json!({"released": {"$gte": {"$date": "1904-01-01T00:00:00.000Z"}}})));
    }

    #[test]
    fn test_set_operators() {
        assert!(check(json!({"genres": {"$all": ["Western", "Short"]}})));
        assert!(!check(json!({"genres": {"$all": ["Western", "Action"]}})));
        assert!(check(json!({"genres": {"$in": ["Action", "Short"]}})));
        assert!(check(json!({"genres": {"$nin": ["Action"]}})));
        assert!(check(json!({"genres": {"$size": 2}})));
    }

    #[test]
    fn test_exists_and_null() {
        assert!(check(json!({"poster": {"$exists": false}})));
        assert!(check(json!({"poster": null})));
        assert!(!check(json!({"title": {"$exists": false}})));
    }

    #[test]
    fn test_regex_and_not() {
        assert!(check(json!({"title": {"$regex": "train", "$options": "i"}})));
        assert!(!check(json!({"title": {"$regex": "train"}})));
        assert!(check(json!({"year": {"$not": {"$gt": 2000}}})));
    }

    #[test]
    fn test_logical_operators() {
        assert!(check(json!({"$or": [{"year": 1800}, {"genres": "Short"}]})));
        assert!(!check(json!({"$and": [{"year": 1903}, {"genres": "Drama"}]})));
        assert!(check(json!({"$nor": [{"year": 1800}]})));
    }

    #[test]
    fn test_elem_match() {
        assert!(check(json!({"reviews": {"$elemMatch": {"score": {"$gt": 8}, "by": "b"}}})));
        assert!(!check(json!({"reviews": {"$elemMatch": {"score": {"$gt": 8}, "by": "a"}}})));
    }

    #[test]
    fn test_unsupported_operator() {
        let actual = matches(&movie(), &json!({"year": {"$near": 3}}));
        assert!(matches!(actual, Err(AggregateError::UnsupportedOperator(ref op)) if op == "$near"));
        let actual = matches(&movie(), &json!({"$where": "1"})).is_err();
        assert_eq!(actual, true);
    }
}
