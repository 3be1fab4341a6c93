//! Error types for the HTTP layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use latchkey_session::SessionError;
use serde_json::json;

/// Everything a request handler can fail with.
///
/// Each variant maps to exactly one status code and JSON body in
/// [`IntoResponse`], so handlers just use `?`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("email missing")]
    EmailMissing,

    #[error("password missing")]
    PasswordMissing,

    #[error("no user found for this email")]
    UnknownEmail,

    #[error("wrong password")]
    WrongPassword,

    #[error("email already registered")]
    EmailTaken,

    /// Logout without a live session.
    #[error("no session to destroy")]
    SessionNotFound,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("password hashing failed: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::EmailMissing | Self::PasswordMissing | Self::EmailTaken => {
                StatusCode::BAD_REQUEST
            }
            Self::UnknownEmail | Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::WrongPassword => StatusCode::UNAUTHORIZED,
            Self::Session(SessionError::InvalidArgument(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Session(SessionError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Session(SessionError::Unauthenticated) => StatusCode::FORBIDDEN,
            Self::Session(SessionError::StoreUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Password(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            // Registration reports under "message", like its success body.
            Self::EmailTaken => json!({ "message": self.to_string() }),
            Self::SessionNotFound => json!({ "error": "Not found" }),
            Self::Session(SessionError::Unauthenticated) => {
                json!({ "error": "Forbidden" })
            }
            Self::Session(SessionError::StoreUnavailable(_)) => {
                json!({ "error": "session store unavailable" })
            }
            Self::Password(_) | Self::Internal(_) => {
                json!({ "error": "internal error" })
            }
            _ => json!({ "error": self.to_string() }),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}

/// Errors that stop the server from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum LatchkeyError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
