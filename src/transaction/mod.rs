//! Transaction primitive consumed from the host
//!
//! The revision core only needs nested savepoints: take one, then either
//! release it (keep everything done since) or roll back to it (discard
//! everything done since). Savepoints nest strictly; only the innermost open
//! savepoint may be released or rolled back.

use std::fmt;

use thiserror::Error;

/// Handle to one open savepoint
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SavepointId(u64);

impl SavepointId {
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SavepointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sp{}", self.0)
    }
}

/// Result type for transaction operations
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Transaction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("savepoints are not supported by this database")]
    Unsupported,

    #[error("savepoint {0} is not open")]
    UnknownSavepoint(SavepointId),

    #[error("savepoint {requested} is not the innermost open savepoint ({innermost})")]
    NotInnermost {
        requested: SavepointId,
        innermost: SavepointId,
    },
}

impl TransactionError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            TransactionError::Unsupported => "REV_TXN_UNSUPPORTED",
            TransactionError::UnknownSavepoint(_) => "REV_TXN_UNKNOWN_SAVEPOINT",
            TransactionError::NotInnermost { .. } => "REV_TXN_NOT_INNERMOST",
        }
    }
}

/// Nested-savepoint transaction control.
pub trait Transactional {
    /// Whether nested savepoints are available at all
    fn supports_savepoints(&self) -> bool {
        true
    }

    /// Open a savepoint nested inside any currently open one
    fn savepoint(&mut self) -> TransactionResult<SavepointId>;

    /// Keep all changes made since `id` and close it
    fn release_savepoint(&mut self, id: SavepointId) -> TransactionResult<()>;

    /// Discard all changes made since `id` and close it
    fn rollback_to_savepoint(&mut self, id: SavepointId) -> TransactionResult<()>;

    /// Number of open savepoints
    fn savepoint_depth(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransactionError::Unsupported.code(), "REV_TXN_UNSUPPORTED");
        let err = TransactionError::NotInnermost {
            requested: SavepointId::new(1),
            innermost: SavepointId::new(2),
        };
        assert_eq!(err.code(), "REV_TXN_NOT_INNERMOST");
        assert!(err.to_string().contains("sp1"));
    }
}
