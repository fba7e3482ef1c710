//! Read accessors over snapshot history
//!
//! Pure reads: usable with or without an open boundary, never mutating.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::storage::{Database, EntityKey, Revision, Snapshot};

/// Ordering of history reads by snapshot id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryOrder {
    Ascending,
    Descending,
}

impl HistoryOrder {
    fn apply<T>(self, mut items: Vec<T>) -> Vec<T> {
        if self == HistoryOrder::Descending {
            items.reverse();
        }
        items
    }
}

/// A snapshot together with the revision it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub snapshot: Snapshot,
    pub revision: Revision,
}

/// Every snapshot of one entity.
pub fn get_for_entity<D: Database>(db: &D, key: &EntityKey, order: HistoryOrder) -> Vec<Snapshot> {
    let mut snapshots = db.snapshots_for_entity(key);
    snapshots.sort_by_key(|s| s.id);
    order.apply(snapshots)
}

/// The latest snapshot of each entity of `entity_type` that no longer exists.
pub fn get_deleted<D: Database>(db: &D, entity_type: &str, order: HistoryOrder) -> Vec<Snapshot> {
    let mut latest: BTreeMap<String, Snapshot> = BTreeMap::new();
    for snapshot in db.snapshots_of_type(entity_type) {
        match latest.get(&snapshot.key.id) {
            Some(existing) if existing.id > snapshot.id => {}
            _ => {
                latest.insert(snapshot.key.id.clone(), snapshot);
            }
        }
    }
    let mut deleted: Vec<Snapshot> = latest
        .into_values()
        .filter(|s| !db.exists(&s.key))
        .collect();
    deleted.sort_by_key(|s| s.id);
    order.apply(deleted)
}

/// Snapshots of one entity paired with their revision metadata.
///
/// Snapshots whose revision row is missing are skipped.
pub fn history<D: Database>(db: &D, key: &EntityKey, order: HistoryOrder) -> Vec<HistoryEntry> {
    get_for_entity(db, key, order)
        .into_iter()
        .filter_map(|snapshot| {
            db.revision(snapshot.revision_id)
                .map(|revision| HistoryEntry { snapshot, revision })
        })
        .collect()
}
