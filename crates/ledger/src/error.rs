//! The module contains the errors the ledger can return.
//!
//! Every variant maps onto one of four [`ErrorKind`]s:
//!
//! - [`Validation`] caller-supplied data violates a precondition. Never
//!   retried, surfaced verbatim.
//! - [`NotFound`] the referenced group, expense or settlement is absent.
//! - [`Conflict`] a concurrent write raced this one and the bounded retries
//!   were exhausted.
//! - [`Internal`] storage failures and broken invariants.
//!
//!  [`Validation`]: ErrorKind::Validation
//!  [`NotFound`]: ErrorKind::NotFound
//!  [`Conflict`]: ErrorKind::Conflict
//!  [`Internal`]: ErrorKind::Internal
use sea_orm::DbErr;
use thiserror::Error;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Invalid member: {0}")]
    InvalidMember(String),
    #[error("Invalid group: {0}")]
    InvalidGroup(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Concurrent update: {0}")]
    Conflict(String),
    #[error("Unbalanced ledger: {0}")]
    Unbalanced(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Database(DbErr),
}

/// SQLite reports a write that lost a race for the database lock as
/// `SQLITE_BUSY`/`SQLITE_LOCKED`; those are retried like a version conflict.
impl From<DbErr> for LedgerError {
    fn from(err: DbErr) -> Self {
        let message = err.to_string();
        if message.contains("database is locked") || message.contains("database table is locked")
        {
            return Self::Conflict(message);
        }
        Self::Database(err)
    }
}

/// Coarse classification of a [`LedgerError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

impl LedgerError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_)
            | Self::InvalidSplit(_)
            | Self::InvalidMember(_)
            | Self::InvalidGroup(_)
            | Self::CurrencyMismatch(_) => ErrorKind::Validation,
            Self::KeyNotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unbalanced(_) | Self::InvalidId(_) | Self::Json(_) | Self::Database(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the whole read-modify-write may be attempted again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidSplit(a), Self::InvalidSplit(b)) => a == b,
            (Self::InvalidMember(a), Self::InvalidMember(b)) => a == b,
            (Self::InvalidGroup(a), Self::InvalidGroup(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Unbalanced(a), Self::Unbalanced(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Json(a), Self::Json(b)) => a.to_string() == b.to_string(),
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_variants_map_to_validation() {
        assert_eq!(
            LedgerError::InvalidAmount("x".to_string()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LedgerError::InvalidSplit("x".to_string()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LedgerError::InvalidMember("x".to_string()).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(LedgerError::Conflict("group".to_string()).is_retryable());
        assert!(!LedgerError::KeyNotFound("group".to_string()).is_retryable());
        assert!(!LedgerError::Unbalanced("batch".to_string()).is_retryable());
    }

    #[test]
    fn database_errors_are_internal() {
        let err = LedgerError::from(DbErr::Custom("boom".to_string()));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn lock_contention_is_a_conflict() {
        let err = LedgerError::from(DbErr::Custom(
            "error returned from database: (code: 5) database is locked".to_string(),
        ));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.is_retryable());
    }
}
