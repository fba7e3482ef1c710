//! Revision Boundary Tests
//!
//! - Nested boundaries write exactly one revision
//! - A failed unit of work leaves no entities and no revision behind
//! - A failed revision write rolls back the unit of work
//! - Duplicate suppression compares against the latest snapshot
//! - Deletions capture the last state of the entity

use revcore::config::VersioningConfig;
use revcore::registry::{EntitySerializer, LinkField, ModelCatalog, ModelSchema, Registry};
use revcore::revision::{HistoryOrder, RevisionContext, RevisionManager};
use revcore::storage::{
    Actor, EntityKey, EntityStore, MemoryDatabase, Record, RevisionStore, WriteFailure,
};
use revcore::transaction::Transactional;
use revcore::RevisionError;

fn registry() -> Registry {
    let catalog = ModelCatalog::from_models([
        ModelSchema::new("post"),
        ModelSchema::new("comment").link(LinkField::new("post", "post")),
        ModelSchema::new("draft"),
    ])
    .unwrap();
    let mut registry = Registry::new(catalog);
    registry.register("post", ["comment_set"]).unwrap();
    registry.register("comment", Vec::<String>::new()).unwrap();
    registry
}

fn manager(config: VersioningConfig) -> RevisionManager {
    RevisionManager::new(registry(), config)
}

fn post(id: &str, title: &str) -> Record {
    Record::new(EntityKey::new("post", id)).field("title", title)
}

fn comment(id: &str, post_id: &str) -> Record {
    Record::new(EntityKey::new("comment", id)).field("post", post_id)
}

// =============================================================================
// Re-entrancy Tests
// =============================================================================

/// Two units of work inside an ambient boundary produce one revision.
#[test]
fn test_ambient_boundary_writes_once() {
    let manager = manager(VersioningConfig::default());
    let mut db = MemoryDatabase::new();
    let mut ctx = RevisionContext::new();

    ctx.begin();
    let (_, inner) = manager
        .create_revision(&mut db, &mut ctx, None, |s| -> Result<(), RevisionError> {
            s.save(post("1", "first"))
        })
        .unwrap();
    assert_eq!(inner, None);
    manager
        .create_revision(&mut db, &mut ctx, None, |s| -> Result<(), RevisionError> {
            s.save(post("2", "second"))
        })
        .unwrap();
    assert_eq!(db.revision_count(), 0);

    let id = ctx.end(&mut db, manager.registry()).unwrap().unwrap();
    assert_eq!(db.revision_count(), 1);
    assert_eq!(db.snapshots_in_revision(id).len(), 2);
    assert!(!ctx.is_active());
}

/// Work discarded by an inner failure leaves no trace in the outer revision.
#[test]
fn test_inner_failure_excluded_from_outer_revision() {
    let manager = manager(VersioningConfig::default());
    let mut db = MemoryDatabase::new();
    let mut ctx = RevisionContext::new();

    ctx.begin();
    manager
        .create_revision(&mut db, &mut ctx, None, |s| -> Result<(), RevisionError> {
            s.save(post("1", "kept"))
        })
        .unwrap();
    let failed = manager.create_revision(&mut db, &mut ctx, None, |s| -> Result<(), RevisionError> {
        s.save(post("2", "discarded"))?;
        Err(RevisionError::not_found("widget"))
    });
    assert!(failed.is_err());
    assert_eq!(ctx.depth(), 1);

    let id = ctx.end(&mut db, manager.registry()).unwrap().unwrap();
    let keys: Vec<EntityKey> = db.snapshots_in_revision(id).into_iter().map(|s| s.key).collect();
    assert_eq!(keys, vec![EntityKey::new("post", "1")]);
    assert!(!db.exists(&EntityKey::new("post", "2")));
}

// =============================================================================
// Atomicity Tests
// =============================================================================

/// A failing unit of work rolls back its writes and writes no revision.
#[test]
fn test_abort_is_atomic() {
    let manager = manager(VersioningConfig::default());
    let mut db = MemoryDatabase::new();
    let mut ctx = RevisionContext::new();

    let err = manager
        .create_revision(&mut db, &mut ctx, None, |s| -> Result<(), RevisionError> {
            s.save(post("1", "v1"))?;
            s.save(comment("a", "1"))?;
            Err(RevisionError::not_found("validation"))
        })
        .unwrap_err();

    assert_eq!(err.code(), "REV_NOT_FOUND");
    assert_eq!(db.entity_count(), 0);
    assert_eq!(db.revision_count(), 0);
    assert_eq!(db.savepoint_depth(), 0);
    assert!(!ctx.is_active());
}

/// A snapshot write failing halfway rolls back entities and the revision row.
#[test]
fn test_commit_is_atomic() {
    let manager = manager(VersioningConfig::default());
    let mut db = MemoryDatabase::new();
    let mut ctx = RevisionContext::new();
    db.inject_write_failure(Some(WriteFailure::SnapshotsAfter(1)));

    let err = manager
        .create_revision(&mut db, &mut ctx, None, |s| -> Result<(), RevisionError> {
            s.save(post("1", "v1"))?;
            s.save(comment("a", "1"))
        })
        .unwrap_err();

    assert_eq!(err.code(), "REV_PERSISTENCE_FAILURE");
    assert_eq!(db.entity_count(), 0);
    assert_eq!(db.revision_count(), 0);
    assert_eq!(db.snapshot_count(), 0);
    assert!(!ctx.is_active());

    db.inject_write_failure(None);
    let (_, id) = manager
        .create_revision(&mut db, &mut ctx, None, |s| -> Result<(), RevisionError> {
            s.save(post("1", "v1"))
        })
        .unwrap();
    assert!(id.is_some());
}

/// An invalidated boundary discards instead of writing.
#[test]
fn test_invalidated_boundary_discards() {
    let manager = manager(VersioningConfig::default());
    let mut db = MemoryDatabase::new();
    let mut ctx = RevisionContext::new();

    let (_, id) = manager
        .create_revision(&mut db, &mut ctx, None, |s| -> Result<(), RevisionError> {
            s.save(post("1", "v1"))?;
            Ok(())
        })
        .unwrap();
    assert!(id.is_some());

    ctx.begin();
    db.put(post("1", "v2")).unwrap();
    ctx.add(EntityKey::new("post", "1"));
    ctx.invalidate();
    assert_eq!(ctx.end(&mut db, manager.registry()).unwrap(), None);
    assert_eq!(db.revision_count(), 1);
}

// =============================================================================
// Capture Tests
// =============================================================================

/// Saving a post captures its comments; untracked types are ignored.
#[test]
fn test_follow_fields_and_untracked_types() {
    let manager = manager(VersioningConfig::default());
    let mut db = MemoryDatabase::new();
    let mut ctx = RevisionContext::new();
    db.put(comment("a", "1")).unwrap();
    db.put(comment("b", "2")).unwrap();

    let (_, id) = manager
        .create_revision(&mut db, &mut ctx, Some(Actor::new("alice")), |s| -> Result<(), RevisionError> {
            s.save(post("1", "v1"))?;
            s.save(Record::new(EntityKey::new("draft", "x")))?;
            s.log_addition(None);
            Ok(())
        })
        .unwrap();

    let id = id.unwrap();
    let keys: Vec<String> = db
        .snapshots_in_revision(id)
        .into_iter()
        .map(|s| s.key.to_string())
        .collect();
    assert_eq!(keys, vec!["post:1", "comment:a"]);

    let revision = db.revision(id).unwrap();
    assert_eq!(revision.comment, "Initial version.");
    assert_eq!(revision.actor.as_ref().map(|a| a.as_str()), Some("alice"));
    assert!(db.exists(&EntityKey::new("draft", "x")));
}

/// A deleted entity is captured with the state it had before deletion.
#[test]
fn test_deletion_captures_last_state() {
    let manager = manager(VersioningConfig::default());
    let mut db = MemoryDatabase::new();
    let mut ctx = RevisionContext::new();
    manager
        .create_revision(&mut db, &mut ctx, None, |s| -> Result<(), RevisionError> {
            s.save(post("1", "v1"))
        })
        .unwrap();

    manager
        .create_revision(&mut db, &mut ctx, None, |s| -> Result<(), RevisionError> {
            s.save(post("1", "final"))?;
            s.delete(&EntityKey::new("post", "1"))?;
            s.log_change("Deleted post");
            Ok(())
        })
        .unwrap();

    let deleted = manager.get_deleted(&db, "post");
    assert_eq!(deleted.len(), 1);
    let record = manager
        .registry()
        .require("post")
        .unwrap()
        .serializer()
        .deserialize(&deleted[0].key, &deleted[0].data)
        .unwrap();
    assert_eq!(record.display_field("title").as_deref(), Some("final"));
}

// =============================================================================
// Duplicate Suppression Tests
// =============================================================================

/// Byte-identical state is not written twice when suppression is on.
#[test]
fn test_duplicate_suppressed() {
    let manager = manager(VersioningConfig::default().ignoring_duplicates());
    let mut db = MemoryDatabase::new();
    let mut ctx = RevisionContext::new();

    for title in ["v1", "v1", "v2"] {
        manager
            .create_revision(&mut db, &mut ctx, None, |s| -> Result<(), RevisionError> {
                s.save(post("1", title))
            })
            .unwrap();
    }
    assert_eq!(db.revision_count(), 2);
}

/// Without suppression every unit of work writes a revision.
#[test]
fn test_duplicate_written_without_suppression() {
    let manager = manager(VersioningConfig::default());
    let mut db = MemoryDatabase::new();
    let mut ctx = RevisionContext::new();

    for _ in 0..2 {
        manager
            .create_revision(&mut db, &mut ctx, None, |s| -> Result<(), RevisionError> {
                s.save(post("1", "same"))
            })
            .unwrap();
    }
    assert_eq!(db.revision_count(), 2);
}

// =============================================================================
// History Tests
// =============================================================================

/// History pairs snapshots with revisions in either order.
#[test]
fn test_history_order() {
    let manager = manager(VersioningConfig::default());
    let mut db = MemoryDatabase::new();
    let mut ctx = RevisionContext::new();
    for (title, message) in [("v1", "created"), ("v2", "edited")] {
        manager
            .create_revision(&mut db, &mut ctx, None, |s| -> Result<(), RevisionError> {
                s.save(post("1", title))?;
                s.log_change(message);
                Ok(())
            })
            .unwrap();
    }

    let key = EntityKey::new("post", "1");
    let ascending: Vec<String> = manager
        .history(&db, &key)
        .into_iter()
        .map(|e| e.revision.comment)
        .collect();
    assert_eq!(ascending, vec!["created", "edited"]);

    let descending: Vec<String> = manager
        .history_ordered(&db, &key, HistoryOrder::Descending)
        .into_iter()
        .map(|e| e.revision.comment)
        .collect();
    assert_eq!(descending, vec!["edited", "created"]);
}
