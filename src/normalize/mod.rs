pub mod deals;
pub mod weather;

use std::fmt;

use serde_json::Value;

pub use deals::normalize_deal;
pub use weather::normalize_weather;

/// Why one raw item was rejected. Rejections fail a single unit, never
/// the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub field: &'static str,
    pub reason: String,
}

impl Rejection {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field `{}`: {}", self.field, self.reason)
    }
}

impl std::error::Error for Rejection {}

/// Accepts JSON numbers and numeric strings. CheapShark serializes prices
/// as strings, Weatherstack serializes coordinates as strings.
fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// The hard validation gate: a mandatory numeric field that cannot be
/// parsed rejects the whole record.
fn require_f64(raw: &Value, field: &'static str) -> Result<f64, Rejection> {
    match raw.get(field) {
        None | Some(Value::Null) => Err(Rejection::new(field, "missing mandatory numeric field")),
        Some(value) => coerce_f64(value)
            .ok_or_else(|| Rejection::new(field, format!("not a number: {value}"))),
    }
}

fn opt_f64(raw: &Value, field: &str) -> Option<f64> {
    raw.get(field).and_then(coerce_f64)
}

fn opt_i64(raw: &Value, field: &str) -> Option<i64> {
    raw.get(field).and_then(coerce_i64)
}

fn opt_str(raw: &Value, field: &str) -> Option<String> {
    raw.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
