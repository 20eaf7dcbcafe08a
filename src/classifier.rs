//! Literal classification for raw Popcorn tokens.
//!
//! Rules are tried in a fixed order and the first match wins: an all-digit
//! token must become a number before the catch-all turns it into a
//! function name.

use crate::token::Token;

pub fn classify(text: &str) -> Token {
    if let Some(value) = float_literal(text) {
        return Token::Float(value);
    }
    if is_integer_literal(text) {
        return match text.parse::<i64>() {
            Ok(n) => Token::Integer(n),
            Err(_) => Token::Float(parse_float(text)),
        };
    }
    if let Some(inner) = string_literal(text) {
        return Token::string(inner);
    }
    match text {
        "null" => return Token::Null,
        "true" => return Token::Bool(true),
        "false" => return Token::Bool(false),
        _ => {}
    }
    if let Some(index) = variable_ref(text) {
        return Token::VariableRef(index);
    }
    Token::function(text)
}

fn strip_sign(text: &str) -> &str {
    text.strip_prefix(['+', '-']).unwrap_or(text)
}

fn all_digits(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_digit())
}

fn is_integer_literal(text: &str) -> bool {
    let digits = strip_sign(text);
    !digits.is_empty() && all_digits(digits)
}

fn float_literal(text: &str) -> Option<f64> {
    let (whole, fraction) = strip_sign(text).split_once('.')?;
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !all_digits(whole) || !all_digits(fraction) {
        return None;
    }
    Some(parse_float(text))
}

// Only reached with text already shaped like a decimal literal, which Rust's
// float grammar accepts in full.
fn parse_float(text: &str) -> f64 {
    text.parse().unwrap_or(f64::NAN)
}

fn string_literal(text: &str) -> Option<&str> {
    if text.len() < 2 {
        return None;
    }
    text.strip_prefix('"')?.strip_suffix('"')
}

fn variable_ref(text: &str) -> Option<usize> {
    let digits = text.strip_prefix('$')?;
    if digits.is_empty() || !all_digits(digits) {
        return None;
    }
    digits.parse().ok()
}
