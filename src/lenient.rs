// src/lenient.rs
//! Tolerant field deserializers for backend payloads.
//!
//! The PHP backend is loose about scalar types: ids show up as `12` or `"12"`,
//! bounds as `10` or `"10.5"`, units as `""` when absent. These helpers accept
//! both spellings so the typed structs stay strict everywhere else.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Numeric id from a JSON number or numeric string.
pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let v = Value::deserialize(d)?;
    value_to_id(&v).ok_or_else(|| D::Error::custom(format!("expected numeric id, got {v}")))
}

/// List of ids; `null` reads as empty, unparseable entries are dropped.
pub fn ids<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<i64>, D::Error> {
    let v = Value::deserialize(d)?;
    match v {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(values_to_ids(&items)),
        other => Err(D::Error::custom(format!("expected id list, got {other}"))),
    }
}

/// Product ids are opaque strings downstream; numbers are stringified.
pub fn string_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected product id, got {other}"))),
    }
}

/// Optional float from number or numeric string. Anything else reads as `None`.
pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    })
}

/// Optional string where blank means absent. Numbers and bools are
/// stringified (prices and ids often arrive unquoted); arrays/objects read as `None`.
pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
    .filter(|s| !s.is_empty()))
}

pub(crate) fn value_to_id(v: &Value) -> Option<i64> {
    match v {
        // `5.0` is an id, `5.7` is not.
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn values_to_ids(items: &[Value]) -> Vec<i64> {
    items.iter().filter_map(value_to_id).collect()
}
