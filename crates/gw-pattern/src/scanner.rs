//! Span finder and quote-aware tokenizer
//!
//! Grammar constraint: a span is `{{`, any text without `{` or `}`, then `}}`.
//! Nested braces are not supported; `{{ a {{ b }} }}` yields the inner span only.

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A placeholder span within a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    /// Byte offset of the opening braces
    pub start: usize,
    /// Byte offset just past the closing braces
    pub end: usize,
    /// Text between the braces
    pub inner: &'a str,
}

/// Find all non-overlapping spans, left to right
pub fn find_spans(template: &str) -> Vec<Span<'_>> {
    let bytes = template.as_bytes();
    let mut spans = Vec::new();
    let mut position = 0;

    while let Some(offset) = template[position..].find(OPEN) {
        let start = position + offset;
        let content = start + OPEN.len();

        match bytes[content..].iter().position(|b| *b == b'{' || *b == b'}') {
            Some(stop) if template[content + stop..].starts_with(CLOSE) => {
                let end = content + stop + CLOSE.len();
                spans.push(Span {
                    start,
                    end,
                    inner: &template[content..content + stop],
                });
                position = end;
            }
            _ => position = start + 1,
        }
    }

    spans
}

/// Split a span body on whitespace outside single quotes
///
/// Quotes are kept in the token; `'a b'` is one token.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in input.chars() {
        if c == '\'' {
            quoted = !quoted;
            current.push(c);
        } else if c.is_whitespace() && !quoted {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Strip one pair of surrounding single quotes
pub(crate) fn unquote(token: &str) -> &str {
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        &token[1..token.len() - 1]
    } else {
        token
    }
}
