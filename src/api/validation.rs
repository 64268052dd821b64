//! Schema check for `POST /api/sensor` bodies.
//!
//! The body arrives as raw JSON so that a missing field can be reported by
//! name instead of as a serde error. Keys not listed here are ignored.

use serde_json::{Map, Value};

use crate::db::models::NewSensorReading;

/// Fields that must be present, in the order they are reported.
pub const REQUIRED_FIELDS: [&str; 3] = ["deviceId", "vibration", "temperature"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid field values: {}", .0.join(", "))]
    Invalid(Vec<&'static str>),
}

/// Turn a request body into a [`NewSensorReading`].
///
/// A required key holding `null` counts as missing. Any non-object body is
/// treated as an empty object, so it fails with every required field listed.
pub fn parse_reading(body: &Value) -> Result<NewSensorReading, ValidationError> {
    let empty = Map::new();
    let fields = body.as_object().unwrap_or(&empty);

    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|name| fields.get(*name).map_or(true, Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::Missing(missing));
    }

    let mut invalid = Vec::new();

    let device_id = match fields.get("deviceId").and_then(Value::as_str) {
        Some(id) if !id.trim().is_empty() => id.to_owned(),
        _ => {
            invalid.push("deviceId");
            String::new()
        }
    };
    let vibration = required_number(fields, "vibration", &mut invalid);
    let temperature = required_number(fields, "temperature", &mut invalid);
    let humidity = optional_number(fields, "humidity", &mut invalid);
    let acc_x = optional_number(fields, "accX", &mut invalid);
    let acc_y = optional_number(fields, "accY", &mut invalid);
    let acc_z = optional_number(fields, "accZ", &mut invalid);
    let timestamp = optional_integer(fields, "timestamp", &mut invalid);

    if !invalid.is_empty() {
        return Err(ValidationError::Invalid(invalid));
    }

    Ok(NewSensorReading {
        device_id,
        vibration,
        temperature,
        humidity,
        acc_x,
        acc_y,
        acc_z,
        timestamp,
    })
}

fn required_number(
    fields: &Map<String, Value>,
    name: &'static str,
    invalid: &mut Vec<&'static str>,
) -> f64 {
    optional_number(fields, name, invalid).unwrap_or_default()
}

fn optional_number(
    fields: &Map<String, Value>,
    name: &'static str,
    invalid: &mut Vec<&'static str>,
) -> Option<f64> {
    match fields.get(name) {
        None | Some(Value::Null) => None,
        Some(value) => {
            let number = as_number(value);
            if number.is_none() {
                invalid.push(name);
            }
            number
        }
    }
}

fn optional_integer(
    fields: &Map<String, Value>,
    name: &'static str,
    invalid: &mut Vec<&'static str>,
) -> Option<i64> {
    match fields.get(name) {
        None | Some(Value::Null) => None,
        Some(value) => {
            let integer = as_integer(value);
            if integer.is_none() {
                invalid.push(name);
            }
            integer
        }
    }
}

/// A JSON number, or a string holding one (`"2.5"`). Non-finite values are
/// rejected.
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// An integer, or any number/numeric string with no fractional part that
/// fits in `i64` (`1.7e12`, `"1700000000000"`).
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    if let Value::String(s) = value {
        if let Ok(i) = s.trim().parse::<i64>() {
            return Some(i);
        }
    }
    as_number(value)
        .filter(|n| n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64)
        .map(|n| n as i64)
}
