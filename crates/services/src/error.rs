//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::config::ConfigError;

/// Errors emitted by a `CourseApi` implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ApiError {
    #[error("authentication required")]
    AuthRequired,
    #[error("account suspended")]
    AccountSuspended,
    #[error("resource not found")]
    NotFound,
    #[error("request failed with status {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// User-facing failure of a player action.
///
/// Every server error is converted into one of these at the call site; none
/// escapes as a panic or an unhandled error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlowError {
    #[error("sign in required")]
    AuthRequired,
    #[error("account suspended")]
    AccountSuspended,
    #[error("not enrolled in this course")]
    NotEnrolled,
    #[error("a request for this action is already in flight")]
    InFlight,
    #[error("network or server error: {0}")]
    NetworkOrServer(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl FlowError {
    /// Text suitable for a toast or banner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            FlowError::AuthRequired => "Please sign in to continue.".to_string(),
            FlowError::AccountSuspended => {
                "Your account has been suspended. You have been signed out.".to_string()
            }
            FlowError::NotEnrolled => "Enroll in this course to start learning.".to_string(),
            FlowError::InFlight => "Still working on your last request.".to_string(),
            FlowError::NetworkOrServer(detail) => {
                format!("Something went wrong ({detail}). Please try again.")
            }
            FlowError::Validation(message) => message.clone(),
            FlowError::Unavailable(what) => format!("{what} is not available."),
        }
    }

    /// Whether the user can simply try the same action again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, FlowError::NetworkOrServer(_) | FlowError::InFlight)
    }
}

impl From<ApiError> for FlowError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::AuthRequired => FlowError::AuthRequired,
            ApiError::AccountSuspended => FlowError::AccountSuspended,
            ApiError::NotFound => FlowError::Unavailable("The requested content".to_string()),
            ApiError::HttpStatus { status, message } => {
                FlowError::NetworkOrServer(format!("{status}: {message}"))
            }
            ApiError::Network(detail) | ApiError::Decode(detail) => {
                FlowError::NetworkOrServer(detail)
            }
        }
    }
}

/// Errors emitted while bootstrapping player services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error("token must not be blank")]
    BlankToken,
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
