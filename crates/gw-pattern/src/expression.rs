//! Arithmetic stage and conditional chain

use crate::scanner::unquote;
use crate::value::format_number;
use tracing::trace;

/// Evaluate the joined tokens as arithmetic
///
/// Only attempted when the text consists of numeric literals, arithmetic and
/// comparison operators and parentheses. Integer literals are widened to
/// floats so division is never truncating. Returns `None` unless the result is
/// a finite number.
pub(crate) fn arithmetic(expression: &str) -> Option<String> {
    if !expression.chars().any(|c| c.is_ascii_digit()) || !expression.chars().all(is_arithmetic) {
        return None;
    }

    match evalexpr::eval_number(&widen_integers(expression)) {
        Ok(number) if number.is_finite() => Some(format_number(number)),
        Ok(_) => None,
        Err(error) => {
            trace!(expression, %error, "Not an arithmetic expression");
            None
        }
    }
}

fn is_arithmetic(c: char) -> bool {
    c.is_ascii_digit() || c.is_whitespace() || "+-*/%().<>=!".contains(c)
}

/// Append `.0` to every literal without a decimal point
fn widen_integers(expression: &str) -> String {
    let mut result = String::with_capacity(expression.len() + 8);
    let mut literal = String::new();

    for c in expression.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_digit() || c == '.' {
            literal.push(c);
            continue;
        }

        if !literal.is_empty() {
            if !literal.contains('.') {
                literal.push_str(".0");
            }
            result.push_str(&literal);
            literal.clear();
        }

        result.push(c);
    }

    result.pop();
    result
}

/// Collapse a conditional chain
///
/// Two window shapes are recognised at the head of the chain:
///
/// - `A if X OP B else REST...` compares `X OP B`
/// - `A if OP B else REST...` compares `A OP B`
///
/// A match yields `A`, otherwise evaluation continues with `REST`. What
/// remains when no window applies is joined with single spaces, except the
/// `A is defined` / `A is undefined` form which yields `true` or `false`.
pub(crate) fn conditional(tokens: &[String]) -> String {
    let tokens: Vec<&str> = tokens.iter().map(|t| unquote(t)).collect();
    let mut rest = tokens.as_slice();

    loop {
        let (matched, skip) = match rest {
            [_, "if", left, operator, right, "else", _, ..] if is_operator(operator) => {
                (compare(left, operator, right), 6)
            }
            [subject, "if", operator, right, "else", _, ..] if is_operator(operator) => {
                (compare(subject, operator, right), 5)
            }
            _ => break,
        };

        if matched {
            return rest[0].to_string();
        }
        rest = &rest[skip..];
    }

    match rest {
        [subject, "is", check @ ("defined" | "undefined")] => {
            compare(subject, "is", check).to_string()
        }
        _ => rest.join(" "),
    }
}

fn is_operator(token: &str) -> bool {
    matches!(token, "is" | "==" | "!=" | ">" | ">=" | "<" | "<=")
}

/// Evaluate `left OP right`
///
/// Ordering operators compare numerically and are false when either side is
/// not a number. Equality compares numerically when both sides are numbers,
/// textually otherwise.
fn compare(left: &str, operator: &str, right: &str) -> bool {
    let numbers = left
        .trim()
        .parse::<f64>()
        .ok()
        .zip(right.trim().parse::<f64>().ok());

    match operator {
        "is" => match right {
            "defined" => !left.is_empty(),
            "undefined" => left.is_empty(),
            _ => false,
        },
        "==" => numbers.map_or(left == right, |(l, r)| l == r),
        "!=" => numbers.map_or(left != right, |(l, r)| l != r),
        ">" => numbers.is_some_and(|(l, r)| l > r),
        ">=" => numbers.is_some_and(|(l, r)| l >= r),
        "<" => numbers.is_some_and(|(l, r)| l < r),
        "<=" => numbers.is_some_and(|(l, r)| l <= r),
        _ => {
            trace!(operator, "Unknown comparison operator");
            false
        }
    }
}
