//! Error classification and result propagation.
//!
//! Every failure shown to a user goes through [`classify_message`], so the
//! same backend error always produces the same title and description.

use crate::core::notify::{Notification, Notifier, Variant};
use crate::error::{ApiError, AppError};
use crate::utils::type_utils::{error_message, has_message};
use serde_json::Value;
use std::future::Future;

/// Postgres `insufficient_privilege`.
pub const PERMISSION_DENIED_CODE: &str = "42501";

pub const PERMISSION_DENIED_TITLE: &str = "Permission Denied";
pub const DUPLICATE_ENTRY_TITLE: &str = "Duplicate Entry";
pub const INVALID_DATE_TITLE: &str = "Invalid Date";
pub const NOT_FOUND_TITLE: &str = "Not Found";
pub const GENERIC_TITLE: &str = "Error";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Display form of a classified error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDisplay {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

impl ErrorDisplay {
    fn destructive(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            variant: Variant::Destructive,
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.title = format!("{} ({})", self.title, context);
        self
    }
}

impl From<ErrorDisplay> for Notification {
    fn from(display: ErrorDisplay) -> Self {
        Notification::new(display.title, display.description, display.variant)
    }
}

/// Classify a raw message and optional backend code. First match wins.
pub fn classify_message(message: &str, code: Option<&str>) -> ErrorDisplay {
    let lowered = message.to_lowercase();

    if lowered.contains("row-level security") || code == Some(PERMISSION_DENIED_CODE) {
        return ErrorDisplay::destructive(
            PERMISSION_DENIED_TITLE,
            "You do not have sufficient permissions to perform this action.",
        );
    }
    if lowered.contains("duplicate key") {
        return ErrorDisplay::destructive(
            DUPLICATE_ENTRY_TITLE,
            "A record with this identifier already exists. Please use a unique value.",
        );
    }
    if lowered.contains("invalid input syntax for type date") {
        return ErrorDisplay::destructive(
            INVALID_DATE_TITLE,
            "Please use YYYY-MM-DD format for dates or leave empty.",
        );
    }
    if lowered.contains("not found") {
        return ErrorDisplay::destructive(
            NOT_FOUND_TITLE,
            "The record was not found. Please refresh the list and try again.",
        );
    }

    let description = if message.is_empty() {
        UNEXPECTED_ERROR_MESSAGE
    } else {
        message
    };
    ErrorDisplay::destructive(GENERIC_TITLE, description)
}

pub fn classify(error: &ApiError) -> ErrorDisplay {
    classify_message(&error.message(), error.code())
}

pub fn classify_app_error(error: &AppError) -> ErrorDisplay {
    match error {
        AppError::Api(api_error) => classify(api_error),
        other => classify_message(&other.display_friendly(), None),
    }
}

/// Classify an untyped error body such as `{"code": "...", "message": "..."}`.
pub fn classify_value(value: &Value) -> ErrorDisplay {
    let message = match value {
        Value::String(text) => text.clone(),
        _ if has_message(value) => error_message(value),
        _ => String::new(),
    };
    let code = value.get("code").and_then(Value::as_str);
    classify_message(&message, code)
}

/// Classify `error`, deliver it once and return what was shown.
pub fn notify_error(notifier: &dyn Notifier, error: &AppError) -> ErrorDisplay {
    let display = classify_app_error(error);
    notifier.notify(display.clone().into());
    display
}

/// Run `operation`; on failure notify the classified error, titled with
/// `context`, and return `None`.
pub async fn with_error_handling<T, F>(
    notifier: &dyn Notifier,
    context: &str,
    operation: F,
) -> Option<T>
where
    F: Future<Output = Result<T, AppError>>,
{
    match operation.await {
        Ok(value) => Some(value),
        Err(error) => {
            log::debug!("{} failed: {}", context, error);
            let display = classify_app_error(&error).with_context(context);
            notifier.notify(display.into());
            None
        }
    }
}

/// Report a mutation outcome: a success notification, or the classified
/// error. Returns whether the mutation succeeded.
pub fn handle_update_result<T>(
    notifier: &dyn Notifier,
    result: &Result<T, AppError>,
    success_message: &str,
) -> bool {
    match result {
        Ok(_) => {
            notifier.notify(Notification::success(success_message));
            true
        }
        Err(error) => {
            notify_error(notifier, error);
            false
        }
    }
}
