//! Shape-tolerant helpers for values whose type is only known at runtime.
//!
//! Backend payloads and error bodies arrive as loose JSON. These helpers
//! never fail: an unexpected shape degrades to an empty string or a fixed
//! fallback message.

use serde_json::Value;

/// Message returned when no usable text can be extracted from an error value.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Coerce a JSON value into a string.
///
/// Strings are returned as-is, numbers and booleans are formatted, and
/// `null`, arrays and objects yield an empty string.
pub fn safe_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

pub fn safe_trim(value: &Value) -> String {
    safe_string(value).trim().to_string()
}

pub fn safe_lowercase(value: &Value) -> String {
    safe_string(value).to_lowercase()
}

/// True when the value is an object with a string `message` property.
pub fn has_message(value: &Value) -> bool {
    matches!(value.get("message"), Some(Value::String(_)))
}

/// Extract a display message from an arbitrary error value.
///
/// # Examples
/// ```
/// use hr_core::utils::type_utils::error_message;
/// use serde_json::json;
/// assert_eq!(error_message(&json!({"message": "x"})), "x");
/// assert_eq!(error_message(&json!("plain string")), "plain string");
/// assert_eq!(error_message(&json!(42)), "An unknown error occurred");
/// ```
pub fn error_message(value: &Value) -> String {
    match value {
        Value::Object(map) => match map.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => UNKNOWN_ERROR_MESSAGE.to_string(),
        },
        Value::String(s) => s.clone(),
        _ => UNKNOWN_ERROR_MESSAGE.to_string(),
    }
}

/// Like [`error_message`], for a value that may be absent altogether.
pub fn error_message_opt(value: Option<&Value>) -> String {
    value
        .map(error_message)
        .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string())
}

/// Message of a native error.
pub fn error_message_of(error: &dyn std::error::Error) -> String {
    error.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(&Value::Null), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(error_message_opt(None), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(error_message(&json!(42)), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(error_message(&json!("plain string")), "plain string");
        assert_eq!(error_message(&json!({})), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(error_message(&json!({"message": "x"})), "x");
    }

    #[test]
    fn test_error_message_of_native_error() {
        let err = std::io::Error::other("y");
        assert_eq!(error_message_of(&err), "y");
    }

    #[test]
    fn test_non_string_message_falls_back() {
        assert_eq!(error_message(&json!({"message": 7})), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(error_message(&json!({"message": null})), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(error_message(&json!(["message"])), UNKNOWN_ERROR_MESSAGE);
        assert!(!has_message(&json!({"message": 7})));
        assert!(has_message(&json!({"message": "ok", "code": "1"})));
    }

    #[test]
    fn test_safe_string_helpers() {
        assert_eq!(safe_string(&json!("abc")), "abc");
        assert_eq!(safe_string(&json!(12)), "12");
        assert_eq!(safe_string(&json!(true)), "true");
        assert_eq!(safe_string(&Value::Null), "");
        assert_eq!(safe_string(&json!({"a": 1})), "");
        assert_eq!(safe_trim(&json!("  padded  ")), "padded");
        assert_eq!(safe_lowercase(&json!("MiXeD")), "mixed");
    }
}
