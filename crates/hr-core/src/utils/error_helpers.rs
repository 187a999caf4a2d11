//! Conversion of raw transport errors into [`ApiError`].
//!
//! This is the only place that looks at reqwest, serde and websocket error
//! shapes. Everything above the client works with the tagged union.

use crate::api::client::DEFAULT_TIMEOUT_SECS;
use crate::error::ApiError;
use serde::Deserialize;

/// PostgREST / auth error body. Field names differ between the REST and auth
/// endpoints, so every field is optional.
#[derive(Debug, Deserialize, Default)]
struct ErrorBody {
    code: Option<serde_json::Value>,
    message: Option<String>,
    msg: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// Convert reqwest errors to ApiError with endpoint context
pub fn convert_request_error(error: reqwest::Error, endpoint: &str) -> ApiError {
    if error.is_timeout() {
        return convert_timeout_error(endpoint, DEFAULT_TIMEOUT_SECS);
    }
    if error.is_decode() {
        return ApiError::Decode {
            endpoint: endpoint.to_string(),
            message: error.to_string(),
        };
    }
    match error.status() {
        Some(status) => ApiError::Http {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            message: error.to_string(),
        },
        None => ApiError::Transport {
            endpoint: endpoint.to_string(),
            message: error.to_string(),
        },
    }
}

/// Convert timeout errors to ApiError with endpoint context
pub fn convert_timeout_error(endpoint: &str, timeout_secs: u64) -> ApiError {
    ApiError::Timeout {
        timeout_secs,
        endpoint: endpoint.to_string(),
    }
}

/// Convert JSON deserialization errors to ApiError with endpoint context
pub fn convert_json_error(error: serde_json::Error, endpoint: &str) -> ApiError {
    ApiError::Decode {
        endpoint: endpoint.to_string(),
        message: format!("JSON parse error: {}", error),
    }
}

/// Convert websocket errors to ApiError with the channel topic as context
pub fn convert_ws_error(error: tokio_tungstenite::tungstenite::Error, topic: &str) -> ApiError {
    ApiError::Realtime {
        topic: topic.to_string(),
        message: error.to_string(),
    }
}

/// Build an ApiError from a non-success response body.
///
/// Bodies carrying a backend `code` or `message` become [`ApiError::Backend`]
/// so the classifier can match on them; bare 401s become
/// [`ApiError::Unauthorized`]; anything else is a plain HTTP error.
pub fn convert_error_body(status: u16, endpoint: &str, body: &str) -> ApiError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();

    if let Some(parsed) = parsed {
        let code = parsed.code.and_then(|code| match code {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let message = parsed
            .message
            .or(parsed.msg)
            .or(parsed.error_description)
            .or(parsed.error);

        if code.is_some() || message.is_some() {
            if status == 401 && code.is_none() {
                return ApiError::Unauthorized {
                    status,
                    endpoint: endpoint.to_string(),
                    server_message: message.unwrap_or_default(),
                };
            }
            return ApiError::Backend {
                status,
                endpoint: endpoint.to_string(),
                code,
                message: message.unwrap_or_default(),
                details: parsed.details,
                hint: parsed.hint,
            };
        }
    }

    if status == 401 {
        return ApiError::Unauthorized {
            status,
            endpoint: endpoint.to_string(),
            server_message: body.to_string(),
        };
    }

    ApiError::Http {
        status,
        endpoint: endpoint.to_string(),
        message: if body.is_empty() {
            "Unknown error".to_string()
        } else {
            body.to_string()
        },
    }
}

/// Helper macro for standardizing map_err patterns
#[macro_export]
macro_rules! map_api_error {
    ($result:expr, $endpoint:expr) => {
        $result.map_err(|e| $crate::utils::error_helpers::convert_request_error(e, $endpoint))
    };
}

/// Helper macro for JSON parsing errors
#[macro_export]
macro_rules! map_json_error {
    ($result:expr, $endpoint:expr) => {
        $result.map_err(|e| $crate::utils::error_helpers::convert_json_error(e, $endpoint))
    };
}
