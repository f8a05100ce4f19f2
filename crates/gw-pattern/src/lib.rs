//! Binding pattern evaluator
//!
//! Turns a binding template plus one raw payload into a typed value, and is
//! used in reverse to render an outgoing property value into a device's native
//! payload. Evaluation is pure and never fails: malformed payloads and
//! expressions degrade to empty substitutions.
//!
//! # Template syntax
//!
//! A template is literal text with placeholder spans delimited by `{{` and
//! `}}`. Spans never nest: a `{` or `}` inside a span ends the match attempt.
//! Inside a span, whitespace separates tokens except within single quotes.
//!
//! Each token resolves to text:
//!
//! - `\token` - the literal `token`
//! - `format.timestamp` / `format.time` / `format.date` / `format.datetime` - current time
//! - `json.a.b.0` - leaf of the JSON payload (arrays indexed by number)
//! - `url.key` - field of a form-encoded payload
//! - `xml.root.child` - text of an element of the XML payload
//! - `value` - the payload itself
//! - anything else - the token verbatim
//!
//! The resolved tokens are then evaluated as arithmetic (`{{ value * 0.01 }}`)
//! when the template itself writes an operator and every substituted value
//! is a number, or otherwise as a conditional chain
//! (`{{ 'on' if == 1 else 'off' }}`, `{{ value if > 30 else 30 }}`).
//!
//! The final text is coerced to a boolean, number or string; the literal
//! `_NULL_` yields an explicit null.
//!
//! # Example
//!
//! ```
//! use gw_pattern::evaluate;
//! use serde_json::json;
//!
//! assert_eq!(evaluate("", b"42"), json!(42));
//! assert_eq!(evaluate("{{ json.temperature * 0.1 }}", br#"{"temperature": 215}"#), json!(21.5));
//! ```

mod evaluator;
mod expression;
mod extract;
mod scanner;
mod value;

pub use evaluator::evaluate;
pub use extract::ExtractError;
pub use scanner::{find_spans, tokenize, Span};
pub use value::{coerce, format_number, render};

/// Literal template output that evaluates to an explicit null
pub const NULL_SENTINEL: &str = "_NULL_";
