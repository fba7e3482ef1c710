//! Registry errors
//!
//! Every registry error is a configuration error raised during host setup,
//! never while a revision boundary is open.

use thiserror::Error;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registration and relation-resolution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown entity type: {0}")]
    UnknownType(String),

    #[error("Unknown field '{field}' on entity type '{entity_type}'")]
    UnknownField { entity_type: String, field: String },

    #[error("Entity type already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Entity type declared twice in model catalog: {0}")]
    DuplicateModel(String),

    #[error("Parent links of '{0}' form a cycle")]
    ParentCycle(String),

    #[error("No follow field for part '{part_type}' of '{root_type}': {reason}")]
    AmbiguousRelation {
        root_type: String,
        part_type: String,
        reason: String,
    },

    #[error("Invalid model catalog {source_name}: {reason}")]
    InvalidCatalog { source_name: String, reason: String },
}

impl RegistryError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::UnknownType(_) => "REV_REGISTRY_UNKNOWN_TYPE",
            RegistryError::UnknownField { .. } => "REV_REGISTRY_UNKNOWN_FIELD",
            RegistryError::AlreadyRegistered(_) => "REV_REGISTRY_ALREADY_REGISTERED",
            RegistryError::DuplicateModel(_) => "REV_REGISTRY_DUPLICATE_MODEL",
            RegistryError::ParentCycle(_) => "REV_REGISTRY_PARENT_CYCLE",
            RegistryError::AmbiguousRelation { .. } => "REV_AMBIGUOUS_RELATION",
            RegistryError::InvalidCatalog { .. } => "REV_REGISTRY_INVALID_CATALOG",
        }
    }

    pub(crate) fn unknown_field(entity_type: &str, field: &str) -> Self {
        RegistryError::UnknownField {
            entity_type: entity_type.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid_catalog(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        RegistryError::InvalidCatalog {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}
