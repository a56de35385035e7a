//! Errors surfaced by the marketplace REST client.
//!
//! Every non-2xx response collapses into one shape, [`ApiError::Status`],
//! whose message is the friendliest text the backend offered.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Error returned by any call to the marketplace API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Status {
        /// HTTP status of the response.
        status: StatusCode,
        /// Message extracted from the body, or a generic fallback.
        message: String,
    },

    /// The request never produced a response (connect failure, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A success response did not have the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A request URL could not be built from the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Build a status error from a failed response's status and raw body.
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        Self::Status {
            status,
            message: error_message(status, body),
        }
    }

    /// The HTTP status, when the backend answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pick the message for a failed response.
///
/// The first of `detail`, `error` and `message` that is present and not null
/// decides: a non-empty string becomes the message. Anything else falls back
/// to `Request failed (<status>)` with the raw body appended when there is
/// one.
#[must_use]
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        let first = ["detail", "error", "message"]
            .iter()
            .find_map(|key| fields.get(*key).filter(|value| !value.is_null()));
        if let Some(Value::String(text)) = first
            && !text.is_empty()
        {
            return text.clone();
        }
    }

    if body.trim().is_empty() {
        format!("Request failed ({status})")
    } else {
        format!("Request failed ({status}): {body}")
    }
}
