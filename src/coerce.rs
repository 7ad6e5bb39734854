//! Numeric coercion of untyped JSON scalars
//!
//! Devices send numbers as JSON numbers or as numeric strings. Coercion is an
//! explicit step with a tagged outcome so callers decide what a failure means.

use serde_json::Value;

/// Outcome of coercing a JSON value to `f64`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coercion {
    /// The value is a finite number
    Numeric(f64),
    /// The value cannot be read as a finite number
    NonCoercible,
}

impl Coercion {
    pub fn numeric(self) -> Option<f64> {
        match self {
            Coercion::Numeric(v) => Some(v),
            Coercion::NonCoercible => None,
        }
    }
}

/// Coerce a JSON value to a finite `f64`
///
/// Accepts JSON numbers and strings holding a decimal number (surrounding
/// whitespace allowed). Booleans, null, arrays, objects, `NaN` and infinities
/// are non-coercible.
pub fn to_f64(value: &Value) -> Coercion {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Coercion::Numeric(v),
        _ => Coercion::NonCoercible,
    }
}

/// Render a JSON value as a free-form label
///
/// Strings pass through; every other value uses its JSON text.
pub fn to_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
