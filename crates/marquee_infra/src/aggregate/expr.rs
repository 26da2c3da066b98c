use chrono::Datelike;
use marquee_domain::display_safe;
use serde_json::{Map, Value};

use super::error::{AggregateError, Result};
use super::value::{as_date, as_number, cmp_values, get_field, is_truthy, is_wrapped_scalar, number};

/// Evaluates an aggregation expression against `doc`.
///
/// Missing fields evaluate to `None` so callers can tell them apart from an
/// explicit `null`.
pub fn eval(doc: &Value, expr: &Value) -> Result<Option<Value>> {
    match expr {
        Value::String(text) if text.starts_with("$$") => {
            Err(AggregateError::UnsupportedOperator(text.clone()))
        }
        Value::String(text) if text.starts_with('$') => Ok(get_field(doc, &text[1..])),
        Value::Array(items) => {
            let values = items
                .iter()
                .map(|item| Ok(eval(doc, item)?.unwrap_or(Value::Null)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(Value::Array(values)))
        }
        Value::Object(map) if is_wrapped_scalar(map) => Ok(Some(expr.clone())),
        Value::Object(map) if map.len() == 1 && map.keys().all(|k| k.starts_with('$')) => {
            let Some((op, arg)) = map.iter().next() else {
                return Ok(Some(Value::Object(Map::new())));
            };
            operator(doc, op, arg)
        }
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                if let Some(value) = eval(doc, value)? {
                    out.insert(key.clone(), value);
                }
            }
            Ok(Some(Value::Object(out)))
        }
        literal => Ok(Some(literal.clone())),
    }
}

fn eval_or_null(doc: &Value, expr: &Value) -> Result<Value> {
    Ok(eval(doc, expr)?.unwrap_or(Value::Null))
}

/// Arguments of an operator, accepting both `[a, b]` and a single `a`.
fn args(doc: &Value, arg: &Value) -> Result<Vec<Value>> {
    match arg {
        Value::Array(items) => items.iter().map(|item| eval_or_null(doc, item)).collect(),
        single => Ok(vec![eval_or_null(doc, single)?]),
    }
}

/// Numbers among the operands; a single array operand is flattened.
fn numbers(values: Vec<Value>) -> Vec<f64> {
    let values = match values.as_slice() {
        [Value::Array(items)] => items.clone(),
        _ => values,
    };
    values.iter().filter_map(as_number).collect()
}

fn binary(op: &str, values: &[Value]) -> Result<Option<(f64, f64)>> {
    let [a, b] = values else {
        return Err(AggregateError::invalid(op, "expected two arguments"));
    };
    if a.is_null() || b.is_null() {
        return Ok(None);
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => Ok(Some((x, y))),
        _ => Err(AggregateError::invalid(op, "arguments must be numbers")),
    }
}

fn operator(doc: &Value, op: &str, arg: &Value) -> Result<Option<Value>> {
    let value = match op {
        "$literal" => arg.clone(),
        "$size" => match eval_or_null(doc, arg)? {
            Value::Array(items) => Value::from(items.len()),
            _ => return Err(AggregateError::invalid(op, "argument must be an array")),
        },
        "$sum" => number(numbers(args(doc, arg)?).iter().sum()),
        "$avg" => {
            let values = numbers(args(doc, arg)?);
            if values.is_empty() {
                Value::Null
            } else {
                number(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        "$min" | "$max" => {
            let values = args(doc, arg)?;
            let values = match values.as_slice() {
                [Value::Array(items)] => items.clone(),
                _ => values,
            };
            let present = values.into_iter().filter(|v| !v.is_null());
            let best = if op == "$min" {
                present.min_by(cmp_values)
            } else {
                present.max_by(cmp_values)
            };
            best.unwrap_or(Value::Null)
        }
        "$add" => {
            let values = args(doc, arg)?;
            if values.iter().any(Value::is_null) {
                Value::Null
            } else {
                number(numbers(values).iter().sum())
            }
        }
        "$multiply" => {
            let values = args(doc, arg)?;
            if values.iter().any(Value::is_null) {
                Value::Null
            } else {
                number(numbers(values).iter().product())
            }
        }
        "$subtract" => match binary(op, &args(doc, arg)?)? {
            Some((x, y)) => number(x - y),
            None => Value::Null,
        },
        "$divide" => match binary(op, &args(doc, arg)?)? {
            Some((_, y)) if y == 0.0 => {
                return Err(AggregateError::invalid(op, "division by zero"));
            }
            Some((x, y)) => number(x / y),
            None => Value::Null,
        },
        "$round" => {
            let values = args(doc, arg)?;
            let places = values.get(1).and_then(as_number).unwrap_or(0.0) as i32;
            match values.first().and_then(as_number) {
                Some(x) => {
                    let factor = 10f64.powi(places);
                    number((x * factor).round() / factor)
                }
                None => Value::Null,
            }
        }
        "$concat" => {
            let values = args(doc, arg)?;
            if values.iter().any(Value::is_null) {
                Value::Null
            } else {
                let mut out = String::new();
                for value in values {
                    match value {
                        Value::String(s) => out.push_str(&s),
                        _ => return Err(AggregateError::invalid(op, "arguments must be strings")),
                    }
                }
                Value::String(out)
            }
        }
        "$toLower" | "$toUpper" => match eval_or_null(doc, first(arg))? {
            Value::Null => Value::String(String::new()),
            Value::String(s) if op == "$toLower" => Value::String(s.to_lowercase()),
            Value::String(s) => Value::String(s.to_uppercase()),
            other => Value::String(other.to_string()),
        },
        "$toString" => match eval_or_null(doc, first(arg))? {
            Value::Null => Value::Null,
            Value::String(s) => Value::String(s),
            other => match display_safe(other) {
                Value::String(s) => Value::String(s),
                other => Value::String(other.to_string()),
            },
        },
        "$ifNull" => {
            let values = args(doc, arg)?;
            values
                .into_iter()
                .find(|v| !v.is_null())
                .unwrap_or(Value::Null)
        }
        "$cond" => {
            let (condition, then, otherwise) = match arg {
                Value::Array(items) if items.len() == 3 => (&items[0], &items[1], &items[2]),
                Value::Object(map) => match (map.get("if"), map.get("then"), map.get("else")) {
                    (Some(c), Some(t), Some(e)) => (c, t, e),
                    _ => return Err(AggregateError::invalid(op, "expected if, then and else")),
                },
                _ => return Err(AggregateError::invalid(op, "expected three arguments")),
            };
            if is_truthy(&eval_or_null(doc, condition)?) {
                eval_or_null(doc, then)?
            } else {
                eval_or_null(doc, otherwise)?
            }
        }
        "$eq" | "$ne" | "$gt" | "$gte" | "$lt" | "$lte" => {
            let values = args(doc, arg)?;
            let [a, b] = values.as_slice() else {
                return Err(AggregateError::invalid(op, "expected two arguments"));
            };
            let ordering = cmp_values(a, b);
            Value::Bool(match op {
                "$eq" => ordering.is_eq(),
                "$ne" => ordering.is_ne(),
                "$gt" => ordering.is_gt(),
                "$gte" => ordering.is_ge(),
                "$lt" => ordering.is_lt(),
                _ => ordering.is_le(),
            })
        }
        "$arrayElemAt" => {
            let values = args(doc, arg)?;
            match values.as_slice() {
                [Value::Array(items), index] => {
                    let index = as_number(index)
                        .ok_or_else(|| AggregateError::invalid(op, "index must be a number"))?
                        as i64;
                    let position = if index < 0 { items.len() as i64 + index } else { index };
                    match usize::try_from(position).ok().and_then(|i| items.get(i)) {
                        Some(item) => item.clone(),
                        None => return Ok(None),
                    }
                }
                [Value::Null, _] => Value::Null,
                _ => return Err(AggregateError::invalid(op, "expected an array and an index")),
            }
        }
        "$year" | "$month" | "$dayOfMonth" => {
            let value = eval_or_null(doc, first(arg))?;
            if value.is_null() {
                Value::Null
            } else {
                let date = as_date(&value)
                    .or_else(|| value.as_str().and_then(marquee_domain::parse_datetime))
                    .ok_or_else(|| AggregateError::invalid(op, "argument must be a date"))?;
                Value::from(match op {
                    "$year" => date.year() as i64,
                    "$month" => date.month() as i64,
                    _ => date.day() as i64,
                })
            }
        }
        other => return Err(AggregateError::UnsupportedOperator(other.to_string())),
    };
    Ok(Some(value))
}

/// Unwraps the `[x]` form some operators accept.
fn first(arg: &Value) -> &Value {
    match arg {
        Value::Array(items) if items.len() == 1 => &items[0],
        other => other,
    }
}
