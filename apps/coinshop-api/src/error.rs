//! Error types for the Coinshop API.
//!
//! ## Status Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LedgerError                      HTTP                                  │
//! │  ───────────                      ────                                  │
//! │  InvalidCredentials, InvalidToken 401 Unauthorized                      │
//! │  UserNotFound, ItemNotFound       400 Bad Request                       │
//! │  InsufficientBalance              400 Bad Request                       │
//! │  InvalidRequest                   400 Bad Request                       │
//! │  Storage                          500 Internal Server Error             │
//! │                                       (details logged, never returned)  │
//! │                                                                         │
//! │  Body is always {"error": "<message>"}                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coinshop_core::LedgerError;
use tracing::error;

/// Session and password errors raised below the facade.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("invalid password hashing parameters: {0}")]
    Params(String),
}

impl From<AuthError> for LedgerError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken => LedgerError::InvalidToken,
            other => LedgerError::Storage(other.to_string()),
        }
    }
}

/// Errors returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The body could not be parsed.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ApiError {
    /// Status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(err) => match err {
                LedgerError::InvalidCredentials | LedgerError::InvalidToken => {
                    StatusCode::UNAUTHORIZED
                }
                LedgerError::UserNotFound(_)
                | LedgerError::ItemNotFound(_)
                | LedgerError::InsufficientBalance { .. }
                | LedgerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
