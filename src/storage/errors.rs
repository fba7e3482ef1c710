//! Storage error types
//!
//! Error codes:
//! - REV_STORAGE_WRITE_FAILED (ERROR severity)
//! - REV_DATA_CORRUPTION (ERROR severity)

use std::fmt;

use crate::observability::Severity;

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Entity, revision or snapshot row could not be written
    RevStorageWriteFailed,
    /// Stored snapshot bytes do not match their checksum
    RevDataCorruption,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::RevStorageWriteFailed => "REV_STORAGE_WRITE_FAILED",
            StorageErrorCode::RevDataCorruption => "REV_DATA_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with code, message and optional row context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    details: Option<String>,
}

impl StorageError {
    /// A write was refused by the underlying store
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::RevStorageWriteFailed,
            message: message.into(),
            details: None,
        }
    }

    /// A write failed for a specific row
    pub fn write_failed_for(row: impl fmt::Display, message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::RevStorageWriteFailed,
            message: message.into(),
            details: Some(format!("row: {}", row)),
        }
    }

    /// Snapshot bytes failed checksum verification
    pub fn corruption_for_snapshot(snapshot_id: u64, reason: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::RevDataCorruption,
            message: reason.into(),
            details: Some(format!("snapshot_id: {}", snapshot_id)),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
