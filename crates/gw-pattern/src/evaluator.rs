//! Template evaluation entry point

use crate::expression::{arithmetic, conditional};
use crate::extract::{format_value, json_value, url_value, xml_value};
use crate::scanner::{find_spans, tokenize};
use crate::value::coerce;
use crate::NULL_SENTINEL;
use serde_json::Value;
use tracing::trace;

/// Evaluate a binding template against one payload
///
/// An empty template coerces the payload itself. Otherwise every span is
/// resolved and substituted in place, and the resulting text is coerced;
/// the literal `_NULL_` yields [`Value::Null`].
pub fn evaluate(template: &str, payload: &[u8]) -> Value {
    if template.is_empty() {
        return coerce(&String::from_utf8_lossy(payload));
    }

    let mut output = String::with_capacity(template.len());
    let mut position = 0;

    for span in find_spans(template) {
        output.push_str(&template[position..span.start]);
        output.push_str(&evaluate_span(span.inner, payload));
        position = span.end;
    }

    output.push_str(&template[position..]);

    if output == NULL_SENTINEL {
        return Value::Null;
    }

    coerce(&output)
}

fn evaluate_span(inner: &str, payload: &[u8]) -> String {
    let raw = tokenize(inner);
    let tokens: Vec<String> = raw
        .iter()
        .map(|token| resolve_token(token, payload))
        .collect();

    if is_arithmetic_span(&raw, &tokens) {
        if let Some(number) = arithmetic(&tokens.join(" ")) {
            return number;
        }
    }

    conditional(&tokens)
}

/// Arithmetic needs an operator written in the template itself, and every
/// substituted value must be a plain number
fn is_arithmetic_span(raw: &[String], resolved: &[String]) -> bool {
    let has_operator = raw
        .iter()
        .any(|token| !is_reference(token) && token.contains(['+', '-', '*', '/', '%', '(', ')']));

    has_operator
        && raw
            .iter()
            .zip(resolved)
            .filter(|(token, _)| is_reference(token))
            .all(|(_, value)| value.trim().parse::<f64>().is_ok_and(f64::is_finite))
}

/// Tokens replaced by payload or format values
fn is_reference(token: &str) -> bool {
    token == "value"
        || token.starts_with('\\')
        || ["json.", "url.", "xml.", "format."]
            .iter()
            .any(|prefix| token.starts_with(prefix))
}

/// Resolve a single token to text
fn resolve_token(token: &str, payload: &[u8]) -> String {
    if let Some(literal) = token.strip_prefix('\\') {
        return literal.to_string();
    }

    let extracted = if let Some(key) = token.strip_prefix("format.") {
        format_value(key)
    } else if let Some(path) = token.strip_prefix("json.") {
        json_value(payload, path)
    } else if let Some(key) = token.strip_prefix("url.") {
        url_value(payload, key)
    } else if let Some(path) = token.strip_prefix("xml.") {
        xml_value(payload, path)
    } else if token == "value" {
        return String::from_utf8_lossy(payload).into_owned();
    } else {
        return token.to_string();
    };

    extracted.unwrap_or_else(|error| {
        trace!(token, %error, "Extraction yielded no value");
        String::new()
    })
}
