//! Storage primitives consumed from the host
//!
//! Two stores sit behind one transaction:
//! - `EntityStore`: the live records the host's workflows mutate
//! - `RevisionStore`: append-only revision and snapshot rows
//!
//! Both must sit behind the same savepoints: a revision write rolls back
//! together with the mutation it describes. `MemoryDatabase` implements
//! everything for hosts without a store of their own.

mod errors;
mod memory;
mod record;
mod rows;

pub use errors::{StorageError, StorageErrorCode, StorageResult};
pub use memory::{MemoryDatabase, WriteFailure};
pub use record::{EntityKey, Record};
pub use rows::{Actor, NewRevision, NewSnapshot, Revision, RevisionId, Snapshot, SnapshotId};

use crate::transaction::Transactional;

/// Live entity records.
pub trait EntityStore {
    /// Current state of an entity
    fn get(&self, key: &EntityKey) -> Option<Record>;

    /// Insert or replace a record
    fn put(&mut self, record: Record) -> StorageResult<()>;

    /// Remove a record, returning its last state
    fn delete(&mut self, key: &EntityKey) -> StorageResult<Option<Record>>;

    /// All records of a type, in id order
    fn scan(&self, entity_type: &str) -> Vec<Record>;

    fn exists(&self, key: &EntityKey) -> bool {
        self.get(key).is_some()
    }
}

/// Append-only revision history.
pub trait RevisionStore {
    fn insert_revision(&mut self, new: NewRevision) -> StorageResult<Revision>;

    fn insert_snapshot(&mut self, new: NewSnapshot) -> StorageResult<Snapshot>;

    fn revision(&self, id: RevisionId) -> Option<Revision>;

    fn snapshot(&self, id: SnapshotId) -> Option<Snapshot>;

    /// Snapshots of one entity, ascending by snapshot id
    fn snapshots_for_entity(&self, key: &EntityKey) -> Vec<Snapshot>;

    /// Snapshots of every entity of a type, ascending by snapshot id
    fn snapshots_of_type(&self, entity_type: &str) -> Vec<Snapshot>;

    /// Snapshots belonging to one revision, ascending by snapshot id
    fn snapshots_in_revision(&self, id: RevisionId) -> Vec<Snapshot>;

    fn revision_count(&self) -> usize;

    /// Most recent snapshot of one entity
    fn latest_snapshot(&self, key: &EntityKey) -> Option<Snapshot> {
        self.snapshots_for_entity(key).pop()
    }
}

/// Everything the revision core needs from the host, behind one transaction.
pub trait Database: Transactional + EntityStore + RevisionStore {}

impl<T: Transactional + EntityStore + RevisionStore> Database for T {}
