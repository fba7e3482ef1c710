//! Revision and snapshot rows
//!
//! Both are append-only. A snapshot is keyed by `(revision_id, entity key)`
//! and carries a CRC32 of its serialized bytes, verified on every decode.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{StorageError, StorageResult};
use super::record::EntityKey;

/// Totally ordered revision identity, assigned by the store.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(u64);

impl RevisionId {
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Totally ordered snapshot identity, assigned by the store.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(u64);

impl SnapshotId {
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of whoever made a change, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Revision metadata supplied when a boundary closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRevision {
    pub actor: Option<Actor>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// One persisted revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    pub actor: Option<Actor>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Revision {
    /// Materialize a new revision row under a store-assigned id
    pub fn from_new(id: RevisionId, new: NewRevision) -> Self {
        Self {
            id,
            actor: new.actor,
            comment: new.comment,
            created_at: new.created_at,
        }
    }
}

/// Snapshot content supplied when a boundary closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSnapshot {
    pub revision_id: RevisionId,
    pub key: EntityKey,
    /// Name of the serializer that produced `data`
    pub format: String,
    pub data: Vec<u8>,
    pub label: String,
}

/// One entity's serialized state as of one revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub revision_id: RevisionId,
    pub key: EntityKey,
    pub format: String,
    pub data: Vec<u8>,
    pub checksum: u32,
    pub label: String,
}

impl Snapshot {
    /// Materialize a new snapshot row under a store-assigned id.
    ///
    /// The checksum is computed here so every store computes it the same way.
    pub fn from_new(id: SnapshotId, new: NewSnapshot) -> Self {
        let checksum = crc32fast::hash(&new.data);
        Self {
            id,
            revision_id: new.revision_id,
            key: new.key,
            format: new.format,
            data: new.data,
            checksum,
            label: new.label,
        }
    }

    /// Bytes of this snapshot after checksum verification
    pub fn verified_data(&self) -> StorageResult<&[u8]> {
        if crc32fast::hash(&self.data) != self.checksum {
            return Err(StorageError::corruption_for_snapshot(
                self.id.value(),
                "snapshot checksum mismatch",
            ));
        }
        Ok(&self.data)
    }

    /// Whether `other` holds byte-identical content
    pub fn same_content(&self, other: &Snapshot) -> bool {
        self.checksum == other.checksum && self.format == other.format && self.data == other.data
    }
}
