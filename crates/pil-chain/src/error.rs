use std::time::Duration;

use pil_crypto::HasherError;
use pil_types::{ErrorCode, TypeError};

use crate::traits::ChainStoreError;

/// Errors produced by hash chain operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("chain operation did not complete within {0:?}")]
    Timeout(Duration),

    #[error("chain store unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ChainError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::Unavailable(_) => ErrorCode::Unavailable,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<ChainStoreError> for ChainError {
    fn from(error: ChainStoreError) -> Self {
        match error {
            ChainStoreError::PositionTaken { .. } | ChainStoreError::DuplicateRecord(_) => {
                Self::Conflict(error.to_string())
            }
            ChainStoreError::Unavailable(detail) => Self::Unavailable(detail),
        }
    }
}

impl From<HasherError> for ChainError {
    fn from(error: HasherError) -> Self {
        Self::Internal(error.to_string())
    }
}

impl From<TypeError> for ChainError {
    fn from(error: TypeError) -> Self {
        Self::InvalidArgument(error.to_string())
    }
}

pub type ChainResult<T> = Result<T, ChainError>;
