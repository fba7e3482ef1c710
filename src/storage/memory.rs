//! In-memory database with copy-on-savepoint transactions
//!
//! Each savepoint stores a full copy of the state taken when it opened.
//! Rolling back restores that copy; releasing drops it. Id counters live in
//! the state, so ids handed out inside a rolled-back savepoint are reused.

use std::collections::BTreeMap;

use crate::transaction::{SavepointId, TransactionError, TransactionResult, Transactional};

use super::errors::{StorageError, StorageResult};
use super::record::{EntityKey, Record};
use super::rows::{NewRevision, NewSnapshot, Revision, RevisionId, Snapshot, SnapshotId};
use super::{EntityStore, RevisionStore};

#[derive(Debug, Clone, Default)]
struct State {
    entities: BTreeMap<EntityKey, Record>,
    revisions: BTreeMap<RevisionId, Revision>,
    snapshots: BTreeMap<SnapshotId, Snapshot>,
    last_revision_id: u64,
    last_snapshot_id: u64,
}

/// Injected write failure, for exercising persistence error paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailure {
    /// Every revision insert fails
    Revisions,
    /// Snapshot inserts fail once this many more have succeeded
    SnapshotsAfter(usize),
}

/// In-memory `Database` implementation.
#[derive(Debug)]
pub struct MemoryDatabase {
    state: State,
    savepoints: Vec<(SavepointId, State)>,
    last_savepoint_id: u64,
    savepoints_enabled: bool,
    failure: Option<WriteFailure>,
    snapshot_writes_since_failure_set: usize,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            state: State::default(),
            savepoints: Vec::new(),
            last_savepoint_id: 0,
            savepoints_enabled: true,
            failure: None,
            snapshot_writes_since_failure_set: 0,
        }
    }

    /// A database whose transaction primitive has no savepoints.
    pub fn without_savepoints() -> Self {
        Self {
            savepoints_enabled: false,
            ..Self::new()
        }
    }

    /// Inject (or clear) a write failure.
    pub fn inject_write_failure(&mut self, failure: Option<WriteFailure>) {
        self.failure = failure;
        self.snapshot_writes_since_failure_set = 0;
    }

    /// Number of live entities across all types
    pub fn entity_count(&self) -> usize {
        self.state.entities.len()
    }

    /// Number of snapshot rows
    pub fn snapshot_count(&self) -> usize {
        self.state.snapshots.len()
    }

    /// All revisions, ascending
    pub fn revisions(&self) -> Vec<Revision> {
        self.state.revisions.values().cloned().collect()
    }

    fn innermost(&self) -> Option<SavepointId> {
        self.savepoints.last().map(|(id, _)| *id)
    }

    fn check_innermost(&self, id: SavepointId) -> TransactionResult<()> {
        match self.innermost() {
            None => Err(TransactionError::UnknownSavepoint(id)),
            Some(innermost) if innermost == id => Ok(()),
            Some(innermost) => {
                if self.savepoints.iter().any(|(open, _)| *open == id) {
                    Err(TransactionError::NotInnermost {
                        requested: id,
                        innermost,
                    })
                } else {
                    Err(TransactionError::UnknownSavepoint(id))
                }
            }
        }
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Transactional for MemoryDatabase {
    fn supports_savepoints(&self) -> bool {
        self.savepoints_enabled
    }

    fn savepoint(&mut self) -> TransactionResult<SavepointId> {
        if !self.savepoints_enabled {
            return Err(TransactionError::Unsupported);
        }
        self.last_savepoint_id += 1;
        let id = SavepointId::new(self.last_savepoint_id);
        self.savepoints.push((id, self.state.clone()));
        Ok(id)
    }

    fn release_savepoint(&mut self, id: SavepointId) -> TransactionResult<()> {
        self.check_innermost(id)?;
        self.savepoints.pop();
        Ok(())
    }

    fn rollback_to_savepoint(&mut self, id: SavepointId) -> TransactionResult<()> {
        self.check_innermost(id)?;
        if let Some((_, saved)) = self.savepoints.pop() {
            self.state = saved;
        }
        Ok(())
    }

    fn savepoint_depth(&self) -> usize {
        self.savepoints.len()
    }
}

impl EntityStore for MemoryDatabase {
    fn get(&self, key: &EntityKey) -> Option<Record> {
        self.state.entities.get(key).cloned()
    }

    fn put(&mut self, record: Record) -> StorageResult<()> {
        self.state.entities.insert(record.key().clone(), record);
        Ok(())
    }

    fn delete(&mut self, key: &EntityKey) -> StorageResult<Option<Record>> {
        Ok(self.state.entities.remove(key))
    }

    fn scan(&self, entity_type: &str) -> Vec<Record> {
        self.state
            .entities
            .values()
            .filter(|r| r.entity_type() == entity_type)
            .cloned()
            .collect()
    }
}

impl RevisionStore for MemoryDatabase {
    fn insert_revision(&mut self, new: NewRevision) -> StorageResult<Revision> {
        if self.failure == Some(WriteFailure::Revisions) {
            return Err(StorageError::write_failed("revision insert refused"));
        }
        self.state.last_revision_id += 1;
        let revision = Revision::from_new(RevisionId::new(self.state.last_revision_id), new);
        self.state.revisions.insert(revision.id, revision.clone());
        Ok(revision)
    }

    fn insert_snapshot(&mut self, new: NewSnapshot) -> StorageResult<Snapshot> {
        if let Some(WriteFailure::SnapshotsAfter(limit)) = self.failure {
            if self.snapshot_writes_since_failure_set >= limit {
                return Err(StorageError::write_failed_for(&new.key, "snapshot insert refused"));
            }
        }
        if !self.state.revisions.contains_key(&new.revision_id) {
            return Err(StorageError::write_failed_for(
                &new.key,
                format!("revision {} does not exist", new.revision_id),
            ));
        }
        self.snapshot_writes_since_failure_set += 1;
        self.state.last_snapshot_id += 1;
        let snapshot = Snapshot::from_new(SnapshotId::new(self.state.last_snapshot_id), new);
        self.state.snapshots.insert(snapshot.id, snapshot.clone());
        Ok(snapshot)
    }

    fn revision(&self, id: RevisionId) -> Option<Revision> {
        self.state.revisions.get(&id).cloned()
    }

    fn snapshot(&self, id: SnapshotId) -> Option<Snapshot> {
        self.state.snapshots.get(&id).cloned()
    }

    fn snapshots_for_entity(&self, key: &EntityKey) -> Vec<Snapshot> {
        self.state
            .snapshots
            .values()
            .filter(|s| &s.key == key)
            .cloned()
            .collect()
    }

    fn snapshots_of_type(&self, entity_type: &str) -> Vec<Snapshot> {
        self.state
            .snapshots
            .values()
            .filter(|s| s.key.entity_type == entity_type)
            .cloned()
            .collect()
    }

    fn snapshots_in_revision(&self, id: RevisionId) -> Vec<Snapshot> {
        self.state
            .snapshots
            .values()
            .filter(|s| s.revision_id == id)
            .cloned()
            .collect()
    }

    fn revision_count(&self) -> usize {
        self.state.revisions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post(id: &str, title: &str) -> Record {
        Record::new(EntityKey::new("post", id)).field("title", title)
    }

    fn new_revision() -> NewRevision {
        NewRevision {
            actor: None,
            comment: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_rollback_restores_entities() {
        let mut db = MemoryDatabase::new();
        db.put(post("1", "v1")).unwrap();

        let sp = db.savepoint().unwrap();
        db.put(post("1", "v2")).unwrap();
        db.put(post("2", "new")).unwrap();
        db.rollback_to_savepoint(sp).unwrap();

        let current = db.get(&EntityKey::new("post", "1")).unwrap();
        assert_eq!(current.display_field("title").as_deref(), Some("v1"));
        assert!(!db.exists(&EntityKey::new("post", "2")));
        assert_eq!(db.savepoint_depth(), 0);
    }

    #[test]
    fn test_release_keeps_changes() {
        let mut db = MemoryDatabase::new();
        let sp = db.savepoint().unwrap();
        db.put(post("1", "kept")).unwrap();
        db.release_savepoint(sp).unwrap();
        assert!(db.exists(&EntityKey::new("post", "1")));
    }

    #[test]
    fn test_inner_rollback_preserves_outer_work() {
        let mut db = MemoryDatabase::new();
        let outer = db.savepoint().unwrap();
        db.put(post("1", "outer")).unwrap();

        let inner = db.savepoint().unwrap();
        db.put(post("2", "inner")).unwrap();
        db.rollback_to_savepoint(inner).unwrap();

        assert!(db.exists(&EntityKey::new("post", "1")));
        assert!(!db.exists(&EntityKey::new("post", "2")));
        assert_eq!(db.savepoint_depth(), 1);
        db.release_savepoint(outer).unwrap();
    }

    #[test]
    fn test_only_innermost_may_close() {
        let mut db = MemoryDatabase::new();
        let outer = db.savepoint().unwrap();
        let _inner = db.savepoint().unwrap();
        let err = db.rollback_to_savepoint(outer).unwrap_err();
        assert!(matches!(err, TransactionError::NotInnermost { .. }));
        let err = db.release_savepoint(SavepointId::new(99)).unwrap_err();
        assert_eq!(err, TransactionError::UnknownSavepoint(SavepointId::new(99)));
    }

    #[test]
    fn test_without_savepoints() {
        let mut db = MemoryDatabase::without_savepoints();
        assert!(!db.supports_savepoints());
        assert_eq!(db.savepoint().unwrap_err(), TransactionError::Unsupported);
    }

    #[test]
    fn test_revision_ids_rolled_back() {
        let mut db = MemoryDatabase::new();
        let sp = db.savepoint().unwrap();
        let first = db.insert_revision(new_revision()).unwrap();
        db.rollback_to_savepoint(sp).unwrap();
        let again = db.insert_revision(new_revision()).unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(db.revision_count(), 1);
    }

    #[test]
    fn test_snapshot_requires_revision() {
        let mut db = MemoryDatabase::new();
        let err = db
            .insert_snapshot(NewSnapshot {
                revision_id: RevisionId::new(5),
                key: EntityKey::new("post", "1"),
                format: "json".to_string(),
                data: b"{}".to_vec(),
                label: String::new(),
            })
            .unwrap_err();
        assert!(err.message().contains("does not exist"));
    }

    #[test]
    fn test_injected_snapshot_failure() {
        let mut db = MemoryDatabase::new();
        let revision = db.insert_revision(new_revision()).unwrap();
        db.inject_write_failure(Some(WriteFailure::SnapshotsAfter(1)));

        let make = |id: &str| NewSnapshot {
            revision_id: revision.id,
            key: EntityKey::new("post", id),
            format: "json".to_string(),
            data: b"{}".to_vec(),
            label: String::new(),
        };
        assert!(db.insert_snapshot(make("1")).is_ok());
        assert!(db.insert_snapshot(make("2")).is_err());
    }

    #[test]
    fn test_snapshot_queries() {
        let mut db = MemoryDatabase::new();
        let revision = db.insert_revision(new_revision()).unwrap();
        for id in ["1", "2"] {
            db.insert_snapshot(NewSnapshot {
                revision_id: revision.id,
                key: EntityKey::new("post", id),
                format: "json".to_string(),
                data: id.as_bytes().to_vec(),
                label: String::new(),
            })
            .unwrap();
        }
        assert_eq!(db.snapshots_of_type("post").len(), 2);
        assert_eq!(db.snapshots_in_revision(revision.id).len(), 2);
        let latest = db.latest_snapshot(&EntityKey::new("post", "2")).unwrap();
        assert_eq!(latest.data, b"2".to_vec());
    }
}
