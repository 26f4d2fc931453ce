use std::time::Duration;

use pil_types::{ErrorCode, TypeError};

use crate::traits::StoreError;

/// Errors produced by ledger operations.
///
/// Every variant maps onto one stable [`ErrorCode`]; none is swallowed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("transaction did not complete within {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::IntegrityViolation(_) => ErrorCode::IntegrityViolation,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::InvalidState(_) => ErrorCode::InvalidState,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::Unavailable(_) => ErrorCode::Unavailable,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UniqueViolation(detail) => Self::Conflict(detail),
            StoreError::SerializationFailure(detail) => Self::Conflict(detail),
            StoreError::MissingRow(detail) => Self::NotFound(detail),
            StoreError::Unavailable(detail) => Self::Unavailable(detail),
        }
    }
}

impl From<TypeError> for LedgerError {
    fn from(error: TypeError) -> Self {
        Self::InvalidArgument(error.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_taxonomy() {
        let conflict: LedgerError = StoreError::UniqueViolation("dup".into()).into();
        assert_eq!(conflict.code(), ErrorCode::Conflict);

        let lost_race: LedgerError = StoreError::SerializationFailure("retry".into()).into();
        assert_eq!(lost_race.code(), ErrorCode::Conflict);

        let down: LedgerError = StoreError::Unavailable("lock poisoned".into()).into();
        assert_eq!(down.code(), ErrorCode::Unavailable);
    }

    #[test]
    fn type_errors_are_invalid_arguments() {
        let err: LedgerError = TypeError::EmptyIdentifier { field: "partnerId" }.into();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert!(err.to_string().contains("partnerId"));
    }

    #[test]
    fn integrity_and_conflict_are_distinct() {
        assert_ne!(
            LedgerError::IntegrityViolation("x".into()).code(),
            LedgerError::Conflict("x".into()).code()
        );
    }
}
