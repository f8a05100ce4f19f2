//! Conversions between payload text and typed values

use serde_json::{Number, Value};

/// Decimal places kept when formatting a computed number
const NUMBER_PRECISION: usize = 10;

/// Coerce text to its most specific scalar type
///
/// `true`/`false` become booleans, integral text an integer, other finite
/// numeric text a float. Everything else stays a string.
pub fn coerce(text: &str) -> Value {
    let trimmed = text.trim();

    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "" => return Value::String(text.to_string()),
        _ => {}
    }

    if let Ok(integer) = trimmed.parse::<i64>() {
        return Value::from(integer);
    }

    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(text.to_string()))
}

/// Render a value as payload text
///
/// Strings are used verbatim, scalars in their textual form, null as an empty
/// string and containers as compact JSON.
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Render an extracted leaf for substitution into a span
///
/// Arrays are flattened into a comma separated list.
pub(crate) fn render_leaf(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(render).collect::<Vec<_>>().join(","),
        other => render(other),
    }
}

/// Format a finite number with trailing zeros and decimal point trimmed
pub fn format_number(number: f64) -> String {
    let text = format!("{:.*}", NUMBER_PRECISION, number);
    let text = text.trim_end_matches('0').trim_end_matches('.');

    match text {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}
