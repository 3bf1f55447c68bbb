//! Error types for backend API calls and the login form.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures, HTTP status failures and body-decoding failures are
//! kept apart so pages can show a retryable banner for the first, treat a
//! 401 as a logout for the second, and report the third as a backend bug.
//! Login errors are tagged by where the form should render them.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use std::fmt;

use serde::Deserialize;

/// Generic message used when the backend gives no usable reason.
pub const LOGIN_RETRY_MESSAGE: &str = "Login failed, please try again later";

/// Failure of a non-login backend call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("not authenticated or session expired")]
    Unauthorized,
    #[error("resource not found")]
    NotFound,
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether the caller should drop its local session and send the user to login.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Login form field a validation message belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginField {
    UsernameOrEmail,
    Password,
}

impl fmt::Display for LoginField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsernameOrEmail => f.write_str("usernameOrEmail"),
            Self::Password => f.write_str("password"),
        }
    }
}

/// Failure of the login flow, tagged by where it should be shown.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    /// Rendered next to a single input.
    #[error("{field}: {message}")]
    FieldError { field: LoginField, message: String },
    /// Rendered as the form-level banner.
    #[error("{message}")]
    FormError { message: String },
    /// Transport failure; the form offers a manual retry.
    #[error("network error: {0}")]
    Network(String),
}

impl LoginError {
    pub(crate) fn field(field: LoginField, message: &str) -> Self {
        Self::FieldError { field, message: message.to_owned() }
    }

    pub(crate) fn form(message: impl Into<String>) -> Self {
        Self::FormError { message: message.into() }
    }
}

// =============================================================================
// STATUS MAPPING
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum MessageField {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<MessageField>,
}

/// Extract the backend's `message` field from an error body.
///
/// Validation failures carry a list of messages; they are joined with `; `.
pub(crate) fn backend_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let message = match parsed.message? {
        MessageField::One(message) => message,
        MessageField::Many(messages) => messages.join("; "),
    };
    let message = message.trim().to_owned();
    (!message.is_empty()).then_some(message)
}

/// Map a non-success login response to the form-level error shown to the user.
pub(crate) fn login_failure(status: u16, body: &str) -> LoginError {
    match status {
        401 => LoginError::form("Invalid username or password"),
        400 => LoginError::form("Malformed request, check your input"),
        _ => LoginError::form(backend_message(body).unwrap_or_else(|| LOGIN_RETRY_MESSAGE.to_owned())),
    }
}

/// Map a non-success response of any other endpoint.
pub(crate) fn api_failure(status: u16, body: &str) -> ApiError {
    match status {
        401 => ApiError::Unauthorized,
        404 => ApiError::NotFound,
        _ => ApiError::Status {
            status,
            message: backend_message(body).unwrap_or_else(|| format!("request failed with status {status}")),
        },
    }
}
