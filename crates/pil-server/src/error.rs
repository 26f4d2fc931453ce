use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use pil_chain::ChainError;
use pil_ledger::LedgerError;
use pil_types::{ErrorCode, TypeError};

/// Startup and lifecycle failures of the server itself.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// A request failure, rendered as `{"code": ..., "message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Ledger(e) => e.code(),
            Self::Chain(e) => e.code(),
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
        }
    }
}

impl From<TypeError> for ApiError {
    fn from(error: TypeError) -> Self {
        Self::InvalidArgument(error.to_string())
    }
}

/// HTTP status for each stable code. `IntegrityViolation` and `Conflict`
/// share 409; callers tell them apart by `code`.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidArgument | ErrorCode::InvalidState => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::IntegrityViolation | ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Timeout | ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        if code == ErrorCode::Internal {
            error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            code,
            message: self.to_string(),
        };
        (status_for(code), Json(body)).into_response()
    }
}
