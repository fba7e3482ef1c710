//! Crate-level error type
//!
//! | Code | Raised when |
//! |---|---|
//! | REV_REVERT_CONFLICT | a snapshot cannot be reinstated |
//! | REV_PERSISTENCE_FAILURE | the store rejects a write |
//! | REV_AMBIGUOUS_RELATION (and other REV_REGISTRY_*) | setup-time relation errors |
//! | REV_NOT_FOUND | a snapshot or revision id does not exist |

use thiserror::Error;

use crate::config::ConfigError;
use crate::observability::Severity;
use crate::registry::{RegistryError, SerializationError};
use crate::storage::{EntityKey, StorageError};
use crate::transaction::TransactionError;

/// Result type for revision operations
pub type RevisionResult<T> = Result<T, RevisionError>;

/// Errors surfaced by the revision core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevisionError {
    #[error("Cannot revert {key}: {reason}")]
    RevertConflict { key: EntityKey, reason: String },

    #[error("Persistence failure: {0}")]
    PersistenceFailure(StorageError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Savepoints are required but the database does not support them")]
    SavepointsUnsupported,

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for RevisionError {
    fn from(e: StorageError) -> Self {
        RevisionError::PersistenceFailure(e)
    }
}

impl RevisionError {
    pub fn revert_conflict(key: &EntityKey, reason: impl Into<String>) -> Self {
        RevisionError::RevertConflict {
            key: key.clone(),
            reason: reason.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        RevisionError::NotFound(what.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            RevisionError::RevertConflict { .. } => "REV_REVERT_CONFLICT",
            RevisionError::PersistenceFailure(_) => "REV_PERSISTENCE_FAILURE",
            RevisionError::Registry(e) => e.code(),
            RevisionError::Serialization(_) => "REV_SERIALIZATION_FAILED",
            RevisionError::Transaction(e) => e.code(),
            RevisionError::Config(e) => e.code(),
            RevisionError::SavepointsUnsupported => "REV_SAVEPOINTS_UNSUPPORTED",
            RevisionError::NotFound(_) => "REV_NOT_FOUND",
        }
    }

    /// Conflicts and lookups are expected outcomes of user-driven reverts
    pub fn severity(&self) -> Severity {
        match self {
            RevisionError::RevertConflict { .. } | RevisionError::NotFound(_) => Severity::Warn,
            _ => Severity::Error,
        }
    }

    /// Whether this is a setup-time configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RevisionError::Registry(_) | RevisionError::Config(_) | RevisionError::SavepointsUnsupported
        )
    }
}
