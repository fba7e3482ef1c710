//! Revision boundary for one execution context
//!
//! A `RevisionContext` belongs to exactly one unit of work (one request, one
//! call stack) and is passed to it by `&mut`; it is never shared. Nested
//! `begin` calls share the outermost boundary. Only the outermost `end`
//! writes, and it writes at most one revision.
//!
//! `abort` at a nested level restores the boundary to what it was when that
//! level began, so work discarded by an inner savepoint leaves no trace in
//! the revision the outer level eventually writes.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{RevisionError, RevisionResult};
use crate::observability::{log_event, Event, Logger, Severity};
use crate::registry::Registry;
use crate::storage::{Actor, Database, EntityKey, NewRevision, NewSnapshot, Record, RevisionId};

#[derive(Debug, Clone, Default)]
struct Boundary {
    actor: Option<Actor>,
    comment: Option<String>,
    ignore_duplicates: bool,
    invalid: bool,
    touched: Vec<EntityKey>,
    deleted: Vec<Record>,
}

/// Snapshot content prepared before anything is written
struct Capture {
    key: EntityKey,
    format: String,
    data: Vec<u8>,
    label: String,
}

/// Per-execution-context revision boundary.
#[derive(Debug)]
pub struct RevisionContext {
    id: Uuid,
    boundary: Option<Boundary>,
    /// Boundary state saved by each open level, outermost first
    levels: Vec<Option<Boundary>>,
}

impl RevisionContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            boundary: None,
            levels: Vec::new(),
        }
    }

    /// Correlation id carried on every log line of this context
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.boundary.is_some()
    }

    /// Number of open levels
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Open a level. The first level creates the boundary.
    pub fn begin(&mut self) {
        self.levels.push(self.boundary.clone());
        if self.boundary.is_none() {
            self.boundary = Some(Boundary::default());
            log_event(Event::BoundaryOpened, &[("context_id", &self.id.to_string())]);
        }
    }

    pub fn set_actor(&mut self, actor: Actor) {
        if let Some(boundary) = self.boundary.as_mut() {
            boundary.actor = Some(actor);
        }
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        if let Some(boundary) = self.boundary.as_mut() {
            boundary.comment = Some(comment.into());
        }
    }

    pub fn set_ignore_duplicates(&mut self, ignore: bool) {
        if let Some(boundary) = self.boundary.as_mut() {
            boundary.ignore_duplicates = ignore;
        }
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.boundary.as_ref()?.actor.as_ref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.boundary.as_ref()?.comment.as_deref()
    }

    pub fn ignore_duplicates(&self) -> bool {
        self.boundary.as_ref().map_or(false, |b| b.ignore_duplicates)
    }

    /// Keys touched so far, in first-touch order
    pub fn touched(&self) -> &[EntityKey] {
        self.boundary.as_ref().map(|b| b.touched.as_slice()).unwrap_or(&[])
    }

    /// Mark an entity touched; its state is read when the boundary closes.
    pub fn add(&mut self, key: EntityKey) {
        if let Some(boundary) = self.boundary.as_mut() {
            boundary.deleted.retain(|r| r.key() != &key);
            if !boundary.touched.contains(&key) {
                boundary.touched.push(key);
            }
        }
    }

    /// Capture the state of an entity that is being deleted.
    pub fn add_deleted(&mut self, record: Record) {
        if let Some(boundary) = self.boundary.as_mut() {
            boundary.touched.retain(|k| k != record.key());
            boundary.deleted.retain(|r| r.key() != record.key());
            boundary.deleted.push(record);
        }
    }

    /// Make the outermost `end` discard instead of writing.
    pub fn invalidate(&mut self) {
        if let Some(boundary) = self.boundary.as_mut() {
            boundary.invalid = true;
        }
    }

    /// Close a level without writing; restores the boundary as it was when
    /// this level began. At the outermost level the boundary is cleared.
    pub fn abort(&mut self) {
        let Some(saved) = self.levels.pop() else {
            return;
        };
        self.boundary = saved;
        if self.levels.is_empty() {
            log_event(
                Event::RevisionDiscarded,
                &[("context_id", &self.id.to_string()), ("reason", "aborted")],
            );
        }
    }

    /// Close a level. The outermost close writes the revision, if any.
    ///
    /// The boundary is cleared whether or not the write succeeds. Calling
    /// `end` with no open level is a no-op.
    pub fn end<D: Database>(&mut self, db: &mut D, registry: &Registry) -> RevisionResult<Option<RevisionId>> {
        if self.levels.pop().is_none() {
            return Ok(None);
        }
        if !self.levels.is_empty() {
            return Ok(None);
        }
        let Some(boundary) = self.boundary.take() else {
            return Ok(None);
        };

        let context_id = self.id.to_string();
        if boundary.invalid {
            log_event(
                Event::RevisionDiscarded,
                &[("context_id", &context_id), ("reason", "invalidated")],
            );
            return Ok(None);
        }

        let result = persist(db, registry, boundary, &context_id);
        if let Err(ref e) = result {
            log_event(
                Event::RevisionPersistFailed,
                &[("context_id", &context_id), ("code", e.code()), ("error", &e.to_string())],
            );
        }
        result
    }
}

impl Default for RevisionContext {
    fn default() -> Self {
        Self::new()
    }
}

fn persist<D: Database>(
    db: &mut D,
    registry: &Registry,
    boundary: Boundary,
    context_id: &str,
) -> RevisionResult<Option<RevisionId>> {
    let mut roots: Vec<Record> = boundary.touched.iter().filter_map(|key| db.get(key)).collect();
    roots.extend(boundary.deleted);
    let records = registry.collect_related(&*db, roots);

    if records.is_empty() {
        log_event(
            Event::RevisionDiscarded,
            &[("context_id", context_id), ("reason", "nothing touched")],
        );
        return Ok(None);
    }

    let mut captures = Vec::with_capacity(records.len());
    for record in &records {
        let registration = registry.require(record.entity_type())?;
        let serializer = registration.serializer();
        captures.push(Capture {
            key: record.key().clone(),
            format: serializer.format().to_string(),
            data: serializer.serialize(record)?,
            label: registration.label_for(record),
        });
    }

    if boundary.ignore_duplicates && captures.iter().all(|c| unchanged_since_latest(db, c)) {
        let count = captures.len().to_string();
        log_event(
            Event::RevisionSkippedDuplicate,
            &[("context_id", context_id), ("snapshots", &count)],
        );
        return Ok(None);
    }

    let revision = db.insert_revision(NewRevision {
        actor: boundary.actor,
        comment: boundary.comment.unwrap_or_default(),
        created_at: Utc::now(),
    })?;

    let count = captures.len().to_string();
    for capture in captures {
        let snapshot = db
            .insert_snapshot(NewSnapshot {
                revision_id: revision.id,
                key: capture.key,
                format: capture.format,
                data: capture.data,
                label: capture.label,
            })
            .map_err(RevisionError::from)?;
        if Logger::enabled(Severity::Trace) {
            log_event(
                Event::SnapshotCaptured,
                &[
                    ("entity", &snapshot.key.to_string()),
                    ("revision_id", &revision.id.to_string()),
                    ("snapshot_id", &snapshot.id.to_string()),
                ],
            );
        }
    }

    log_event(
        Event::RevisionCommitted,
        &[
            ("context_id", context_id),
            ("revision_id", &revision.id.to_string()),
            ("snapshots", &count),
        ],
    );
    Ok(Some(revision.id))
}

fn unchanged_since_latest<D: Database>(db: &D, capture: &Capture) -> bool {
    match db.latest_snapshot(&capture.key) {
        Some(latest) => {
            latest.format == capture.format
                && latest.checksum == crc32fast::hash(&capture.data)
                && latest.data == capture.data
        }
        None => false,
    }
}
