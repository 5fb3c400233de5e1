//! String-to-typed lifting for text transports.
//!
//! Query strings and form fields carry nothing but text, so a schema
//! expecting an int has to lift `"42"` itself. The rules here are
//! deliberately narrow: a signed digit run for ints, the exact words
//! `true`/`false` for booleans, standard decimal forms for floats.
//! Nothing is ever stringified in the other direction.

/// Outcome of lifting a digit run into an integer.
pub(crate) enum CoercedInt {
    Value(i64),
    /// The text is a digit run but does not fit the target width.
    OutOfRange,
    Mismatch,
}

pub(crate) fn int(text: &str) -> CoercedInt {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return CoercedInt::Mismatch;
    }
    match text.parse::<i64>() {
        Ok(value) => CoercedInt::Value(value),
        Err(_) => CoercedInt::OutOfRange,
    }
}

pub(crate) fn float(text: &str) -> Option<f64> {
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => None,
    }
}

pub(crate) fn boolean(text: &str) -> Option<bool> {
    match text {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
