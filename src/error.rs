//! Error types for Chatterbox
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.
//! Friendship workflow failures keep their own enum so callers can
//! match on the exact rule that was violated.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::data::FriendRequestStatus;

/// Coarse classification shared by domain errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or malformed input (400)
    Validation,
    /// Unknown handle, id or request (404)
    NotFound,
    /// Request conflicts with current state (409)
    Conflict,
}

/// Friend-request and friendship rule violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FriendshipError {
    #[error("username is required")]
    MissingHandle,

    #[error("action must be either \"accept\" or \"reject\", got \"{0}\"")]
    InvalidAction(String),

    #[error("cannot send a friend request to yourself")]
    SelfRequest,

    #[error("username \"{0}\" not found")]
    UnknownRecipient(String),

    #[error("username \"{0}\" not found")]
    UnknownSender(String),

    #[error("you are already friends with {0}")]
    AlreadyFriends(String),

    #[error(
        "friend request {request_id} from {sender} to {recipient} is already {status}"
    )]
    RequestAlreadyPending {
        request_id: i64,
        sender: String,
        recipient: String,
        status: FriendRequestStatus,
    },

    #[error("no friend request found from {0} (must be pending or previously rejected)")]
    NoSuchRequest(String),
}

impl FriendshipError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingHandle | Self::InvalidAction(_) => ErrorCategory::Validation,
            Self::UnknownRecipient(_) | Self::UnknownSender(_) | Self::NoSuchRequest(_) => {
                ErrorCategory::NotFound
            }
            Self::SelfRequest | Self::AlreadyFriends(_) | Self::RequestAlreadyPending { .. } => {
                ErrorCategory::Conflict
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::MissingHandle => "missing_handle",
            Self::InvalidAction(_) => "invalid_action",
            Self::SelfRequest => "self_request",
            Self::UnknownRecipient(_) => "unknown_recipient",
            Self::UnknownSender(_) => "unknown_sender",
            Self::AlreadyFriends(_) => "already_friends",
            Self::RequestAlreadyPending { .. } => "request_already_pending",
            Self::NoSuchRequest(_) => "no_such_request",
        }
    }
}

/// Application-wide error type
///
/// This enum represents all possible errors that can occur
/// in the application. It implements `IntoResponse` to
/// automatically convert errors to appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Authentication required or failed (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Bearer token was valid once but has expired (401)
    #[error("Token has expired")]
    TokenExpired,

    /// Access denied (403)
    #[error("{0}")]
    Forbidden(String),

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflicts with existing state (409)
    #[error("{0}")]
    Conflict(String),

    /// Friendship workflow rule violation (400/404/409)
    #[error(transparent)]
    Friendship(#[from] FriendshipError),

    /// Database error (500, or 503 when the store is busy)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Verification mail could not be handed off (502)
    #[error("Mail error: {0}")]
    Mail(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Whether the failure came from infrastructure rather than the request.
    ///
    /// Nothing retries automatically; the flag is surfaced to callers.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Mail(_))
    }

    fn database_is_busy(&self) -> bool {
        let AppError::Database(sqlx::Error::Database(db_error)) = self else {
            return matches!(self, AppError::Database(sqlx::Error::PoolTimedOut));
        };
        // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes
        db_error
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, 5 | 6))
            .unwrap_or(false)
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), "not_found"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string(), "unauthorized"),
            AppError::TokenExpired => {
                (StatusCode::UNAUTHORIZED, self.to_string(), "token_expired")
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone(), "forbidden"),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation"),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), "conflict"),
            AppError::Friendship(err) => {
                let status = match err.category() {
                    ErrorCategory::Validation => StatusCode::BAD_REQUEST,
                    ErrorCategory::NotFound => StatusCode::NOT_FOUND,
                    ErrorCategory::Conflict => StatusCode::CONFLICT,
                };
                (status, err.to_string(), err.kind())
            }
            AppError::Database(error) => {
                tracing::error!(%error, "database failure");
                let status = if self.database_is_busy() {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (status, "Database error".to_string(), "database")
            }
            AppError::Mail(msg) => (StatusCode::BAD_GATEWAY, msg.clone(), "mail"),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "config"),
            AppError::Internal(error) => {
                tracing::error!(error = %error, "internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "internal",
                )
            }
        };

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let mut body = serde_json::json!({
            "error": error_message,
            "kind": error_type,
        });
        if self.is_retryable() {
            body["retryable"] = serde_json::Value::Bool(true);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
