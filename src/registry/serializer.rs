//! Per-type snapshot serialization
//!
//! A serializer turns a record into the bytes stored in a snapshot and back.
//! The same bytes are compared for duplicate suppression, so a serializer
//! must be deterministic: equal records always produce equal bytes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::storage::{EntityKey, Record};

/// Serialization failure for one entity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{format} serialization failed for {key}: {reason}")]
pub struct SerializationError {
    pub format: String,
    pub key: EntityKey,
    pub reason: String,
}

/// Converts records to and from snapshot bytes.
pub trait EntitySerializer: fmt::Debug + Send + Sync {
    /// Format name stored alongside each snapshot
    fn format(&self) -> &str;

    fn serialize(&self, record: &Record) -> Result<Vec<u8>, SerializationError>;

    fn deserialize(&self, key: &EntityKey, data: &[u8]) -> Result<Record, SerializationError>;
}

#[derive(Serialize, Deserialize)]
struct JsonBody {
    fields: BTreeMap<String, Value>,
}

/// Compact JSON with fields in name order.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub const FORMAT: &'static str = "json";

    fn error(key: &EntityKey, reason: impl fmt::Display) -> SerializationError {
        SerializationError {
            format: Self::FORMAT.to_string(),
            key: key.clone(),
            reason: reason.to_string(),
        }
    }
}

impl EntitySerializer for JsonSerializer {
    fn format(&self) -> &str {
        Self::FORMAT
    }

    fn serialize(&self, record: &Record) -> Result<Vec<u8>, SerializationError> {
        let body = JsonBody {
            fields: record.fields().clone(),
        };
        serde_json::to_vec(&body).map_err(|e| Self::error(record.key(), e))
    }

    fn deserialize(&self, key: &EntityKey, data: &[u8]) -> Result<Record, SerializationError> {
        let body: JsonBody = serde_json::from_slice(data).map_err(|e| Self::error(key, e))?;
        Ok(Record::with_fields(key.clone(), body.fields))
    }
}
