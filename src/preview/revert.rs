//! Whole-revision revert
//!
//! Reinstates every snapshot of a revision:
//! 1. Decode all snapshots first; an undecodable snapshot is a conflict
//!    before anything is touched.
//! 2. Delete records currently reachable from the revision's entities that
//!    the revision did not contain (parts added after it was taken).
//! 3. Write the decoded records, deferring any whose links point at a
//!    missing record until a later pass. A pass that makes no progress is a
//!    conflict.

use std::collections::HashSet;

use crate::error::{RevisionError, RevisionResult};
use crate::observability::{log_event, Event, Logger, Severity};
use crate::registry::{ModelCatalog, Registry};
use crate::storage::{Database, EntityKey, EntityStore, Record, RevisionId};

/// What a revert changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevertReport {
    /// Entities written back, in write order
    pub reinstated: Vec<EntityKey>,
    /// Entities deleted because the revision did not contain them
    pub pruned: Vec<EntityKey>,
}

/// Reinstate the entities of `revision_id`, pruning parts added since.
pub fn revert_revision<D: Database>(
    db: &mut D,
    registry: &Registry,
    revision_id: RevisionId,
) -> RevisionResult<RevertReport> {
    let snapshots = db.snapshots_in_revision(revision_id);
    if snapshots.is_empty() {
        return Err(RevisionError::not_found(format!("revision {}", revision_id)));
    }

    let mut decoded = Vec::with_capacity(snapshots.len());
    for snapshot in &snapshots {
        let registration = registry.registration(&snapshot.key.entity_type).ok_or_else(|| {
            RevisionError::revert_conflict(&snapshot.key, "entity type is no longer registered")
        })?;
        let data = snapshot
            .verified_data()
            .map_err(|e| RevisionError::revert_conflict(&snapshot.key, e.to_string()))?;
        if registration.serializer().format() != snapshot.format {
            return Err(RevisionError::revert_conflict(
                &snapshot.key,
                format!(
                    "snapshot format '{}' does not match serializer '{}'",
                    snapshot.format,
                    registration.serializer().format()
                ),
            ));
        }
        let record = registration
            .serializer()
            .deserialize(&snapshot.key, data)
            .map_err(|e| RevisionError::revert_conflict(&snapshot.key, e.reason))?;
        decoded.push(record);
    }

    let mut report = RevertReport::default();
    let revision_keys: HashSet<EntityKey> = decoded.iter().map(|r| r.key().clone()).collect();

    let current_roots: Vec<Record> = decoded.iter().filter_map(|r| db.get(r.key())).collect();
    let stale: Vec<EntityKey> = registry
        .collect_related(&*db, current_roots)
        .into_iter()
        .map(|r| r.key().clone())
        .filter(|key| !revision_keys.contains(key))
        .collect();
    for key in stale {
        db.delete(&key)?;
        if Logger::enabled(Severity::Trace) {
            log_event(Event::EntityPruned, &[("entity", &key.to_string())]);
        }
        report.pruned.push(key);
    }

    let mut pending = decoded;
    while !pending.is_empty() {
        let mut deferred = Vec::new();
        let mut blocked_reason = None;
        let before = pending.len();

        for record in pending {
            match missing_link(&*db, registry.catalog(), &record) {
                Some(reason) => {
                    blocked_reason.get_or_insert_with(|| (record.key().clone(), reason));
                    deferred.push(record);
                }
                None => {
                    let key = record.key().clone();
                    db.put(record)?;
                    if Logger::enabled(Severity::Trace) {
                        log_event(Event::EntityReinstated, &[("entity", &key.to_string())]);
                    }
                    report.reinstated.push(key);
                }
            }
        }

        if deferred.len() == before {
            let (key, reason) = blocked_reason
                .unwrap_or_else(|| (deferred[0].key().clone(), "no progress".to_string()));
            log_event(
                Event::RevertConflict,
                &[("entity", &key.to_string()), ("reason", &reason)],
            );
            return Err(RevisionError::revert_conflict(&key, reason));
        }
        pending = deferred;
    }

    Ok(report)
}

/// The first link of `record` pointing at a record that does not exist.
fn missing_link(store: &dyn EntityStore, catalog: &ModelCatalog, record: &Record) -> Option<String> {
    let model = catalog.get(record.entity_type())?;
    for parent in &model.parents {
        let id = record
            .link_id(&parent.field)
            .unwrap_or_else(|| record.id().to_string());
        let target = EntityKey::new(&parent.parent, id);
        if !store.exists(&target) {
            return Some(format!("parent {} is missing", target));
        }
    }
    for link in &model.links {
        if let Some(id) = record.link_id(&link.name) {
            let target = EntityKey::new(&link.target, id);
            if !store.exists(&target) {
                return Some(format!("link '{}' points at missing {}", link.name, target));
            }
        }
    }
    None
}
