//! JSON <-> Value conversion utilities

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde_json::{Map, Number};

use crate::{executor::Row, literal, value::Value};

/// Convert serde_json::Value to Value
///
/// Integers stay integers; other numbers become decimals, or floats when out
/// of decimal range. Strings are kept as strings: the evaluator coerces them
/// when they are compared with typed literals.
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                match Decimal::try_from(f) {
                    Ok(d) if !literal::exceeds_decimal(f) => Value::Decimal(d),
                    _ => Value::Float(f),
                }
            } else {
                Value::Null
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => {
            Value::Object(obj.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())
        }
    }
}

/// Convert Value to serde_json::Value
///
/// Decimals become JSON numbers when representable as `f64`; uuids, dates
/// and points become their text form.
pub fn value_to_json(v: Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(b),
        Value::Integer(i) => serde_json::Value::Number(i.into()),
        Value::Decimal(d) => d
            .to_f64()
            .and_then(Number::from_f64)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(d.to_string())),
        Value::Float(x) => Number::from_f64(x)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Array(arr) => serde_json::Value::Array(arr.into_iter().map(value_to_json).collect()),
        Value::Object(obj) => serde_json::Value::Object(
            obj.into_iter()
                .map(|(k, v)| (k, value_to_json(v)))
                .collect(),
        ),
        other @ (Value::Uuid(_) | Value::Date(_) | Value::Point(_) | Value::String(_)) => {
            serde_json::Value::String(other.as_string())
        }
    }
}

/// Renders result rows as an array of objects. Column order is kept.
pub fn rows_to_json(rows: Vec<Row>) -> serde_json::Value {
    serde_json::Value::Array(
        rows.into_iter()
            .map(|row| {
                let mut object = Map::new();
                for (name, value) in row.columns {
                    object.insert(name, value_to_json(value));
                }
                serde_json::Value::Object(object)
            })
            .collect(),
    )
}
