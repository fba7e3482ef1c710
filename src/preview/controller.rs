//! Speculative revert: preview, then commit or unwind
//!
//! ## Protocol
//!
//! 1. Open a savepoint (nests under any savepoint the caller holds)
//! 2. Revert the snapshot's revision. A conflict rolls back and returns
//!    before any boundary level is opened
//! 3. Open a boundary level and run the render step
//! 4. `Completed`: materialize, close the level (persisting the revision
//!    when it is the outermost), release the savepoint. A failed
//!    materialization aborts the level first
//! 5. `AwaitingInput`: materialize against the reverted state, then discard
//!    the level and roll back to the savepoint
//!
//! A render error rolls back and is returned to the caller unchanged.

use crate::error::RevisionError;
use crate::observability::{log_event, Event, ObservationScope};
use crate::revision::{RevisionContext, RevisionManager, Session};
use crate::storage::{Actor, Database, EntityKey, RevisionId, Snapshot, SnapshotId};
use crate::transaction::{SavepointId, Transactional};

use super::artifact::Artifact;
use super::revert::revert_revision;

/// Whether the render step finished the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSignal {
    /// Keep the reverted state
    Completed,
    /// Show the reverted state, then discard it
    AwaitingInput,
}

/// What a render step hands back
#[derive(Debug)]
pub struct Rendered<A> {
    pub artifact: A,
    pub signal: DecisionSignal,
}

impl<A> Rendered<A> {
    pub fn completed(artifact: A) -> Self {
        Self {
            artifact,
            signal: DecisionSignal::Completed,
        }
    }

    pub fn awaiting_input(artifact: A) -> Self {
        Self {
            artifact,
            signal: DecisionSignal::AwaitingInput,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The revert was kept. `revision_id` is `None` when:
    /// - an enclosing boundary will write the revision
    /// - duplicate suppression found nothing changed since the latest snapshots
    /// - the render step touched no registered entity
    Committed { revision_id: Option<RevisionId> },
    /// The revert was rolled back after rendering
    Previewed,
}

/// Materialized artifact plus what happened to the reverted state
#[derive(Debug)]
pub struct PreviewOutcome<T> {
    pub artifact: T,
    pub decision: Decision,
}

impl<T> PreviewOutcome<T> {
    pub fn is_preview(&self) -> bool {
        self.decision == Decision::Previewed
    }
}

/// Runs revert workflows against a savepoint-capable database.
#[derive(Debug, Clone, Copy)]
pub struct PreviewController<'m> {
    manager: &'m RevisionManager,
}

impl<'m> PreviewController<'m> {
    /// Fails with `SavepointsUnsupported` when `db` cannot nest transactions.
    pub fn new<T: Transactional + ?Sized>(manager: &'m RevisionManager, db: &T) -> Result<Self, RevisionError> {
        if !db.supports_savepoints() {
            return Err(RevisionError::SavepointsUnsupported);
        }
        Ok(Self { manager })
    }

    pub fn manager(&self) -> &RevisionManager {
        self.manager
    }

    /// Revert to the revision holding `snapshot_id`, render, then keep or
    /// unwind the result according to the render step's signal.
    pub fn preview_and_decide<D, A, E, F>(
        &self,
        db: &mut D,
        ctx: &mut RevisionContext,
        snapshot_id: SnapshotId,
        actor: Option<Actor>,
        render: F,
    ) -> Result<PreviewOutcome<A::Output>, E>
    where
        D: Database,
        A: Artifact,
        E: From<RevisionError>,
        F: FnOnce(&mut Session<'_, D>) -> Result<Rendered<A>, E>,
    {
        let snapshot = self.snapshot(db, snapshot_id)?;
        self.run("PREVIEW", db, ctx, snapshot, actor, render)
    }

    /// `preview_and_decide` for the history page of one entity.
    ///
    /// The snapshot must belong to `key`.
    pub fn revision_preview<D, A, E, F>(
        &self,
        db: &mut D,
        ctx: &mut RevisionContext,
        key: &EntityKey,
        snapshot_id: SnapshotId,
        actor: Option<Actor>,
        render: F,
    ) -> Result<PreviewOutcome<A::Output>, E>
    where
        D: Database,
        A: Artifact,
        E: From<RevisionError>,
        F: FnOnce(&mut Session<'_, D>) -> Result<Rendered<A>, E>,
    {
        let snapshot = self.snapshot(db, snapshot_id)?;
        if &snapshot.key != key {
            return Err(RevisionError::not_found(format!("snapshot {} of {}", snapshot_id, key)).into());
        }
        self.run("PREVIEW", db, ctx, snapshot, actor, render)
    }

    /// `preview_and_decide` for bringing back a deleted entity.
    ///
    /// The snapshot's entity must not exist any more.
    pub fn recover_preview<D, A, E, F>(
        &self,
        db: &mut D,
        ctx: &mut RevisionContext,
        snapshot_id: SnapshotId,
        actor: Option<Actor>,
        render: F,
    ) -> Result<PreviewOutcome<A::Output>, E>
    where
        D: Database,
        A: Artifact,
        E: From<RevisionError>,
        F: FnOnce(&mut Session<'_, D>) -> Result<Rendered<A>, E>,
    {
        let snapshot = self.snapshot(db, snapshot_id)?;
        if db.exists(&snapshot.key) {
            return Err(RevisionError::not_found(format!("deleted {}", snapshot.key)).into());
        }
        self.run("RECOVER", db, ctx, snapshot, actor, render)
    }

    fn snapshot<D: Database>(&self, db: &D, snapshot_id: SnapshotId) -> Result<Snapshot, RevisionError> {
        db.snapshot(snapshot_id)
            .ok_or_else(|| RevisionError::not_found(format!("snapshot {}", snapshot_id)))
    }

    fn run<D, A, E, F>(
        &self,
        scope_name: &'static str,
        db: &mut D,
        ctx: &mut RevisionContext,
        snapshot: Snapshot,
        actor: Option<Actor>,
        render: F,
    ) -> Result<PreviewOutcome<A::Output>, E>
    where
        D: Database,
        A: Artifact,
        E: From<RevisionError>,
        F: FnOnce(&mut Session<'_, D>) -> Result<Rendered<A>, E>,
    {
        let revision = db
            .revision(snapshot.revision_id)
            .ok_or_else(|| RevisionError::not_found(format!("revision {}", snapshot.revision_id)))?;

        let savepoint = db.savepoint().map_err(RevisionError::from)?;
        if let Err(e) = revert_revision(db, self.manager.registry(), revision.id) {
            db.rollback_to_savepoint(savepoint).map_err(RevisionError::from)?;
            return Err(e.into());
        }

        let context_id = ctx.id().to_string();
        let snapshot_id = snapshot.id.to_string();
        let scope = ObservationScope::with_fields(
            scope_name,
            &[("context_id", &context_id), ("snapshot_id", &snapshot_id)],
        );

        ctx.begin();
        if let Some(actor) = actor {
            ctx.set_actor(actor);
        }
        ctx.set_ignore_duplicates(self.manager.config().ignore_duplicate_revisions);

        let rendered = {
            let mut session = Session::new(db, ctx, self.manager.registry(), self.manager.config());
            render(&mut session)
        };
        let rendered = match rendered {
            Ok(rendered) => rendered,
            Err(e) => {
                ctx.abort();
                unwind(db, savepoint)?;
                scope.fail("render failed");
                return Err(e);
            }
        };

        match rendered.signal {
            DecisionSignal::Completed => {
                // Level stays open until the artifact exists.
                let artifact = match rendered.artifact.materialize(&*db) {
                    Ok(artifact) => artifact,
                    Err(e) => {
                        ctx.abort();
                        unwind(db, savepoint)?;
                        scope.fail(e.code());
                        return Err(e.into());
                    }
                };
                ctx.set_comment(self.manager.config().revert_comment_for(revision.created_at));
                let revision_id = match ctx.end(db, self.manager.registry()) {
                    Ok(revision_id) => revision_id,
                    Err(e) => {
                        unwind(db, savepoint)?;
                        scope.fail(e.code());
                        return Err(e.into());
                    }
                };
                if let Err(e) = db.release_savepoint(savepoint) {
                    // The enclosing boundary already holds this level's keys.
                    ctx.invalidate();
                    let e = RevisionError::from(e);
                    scope.fail(e.code());
                    return Err(e.into());
                }
                let committed = revision_id.map(|id| id.to_string()).unwrap_or_default();
                log_event(
                    Event::PreviewCommitted,
                    &[("context_id", &context_id), ("revision_id", &committed)],
                );
                scope.complete_with_fields(&[("decision", "committed"), ("revision_id", &committed)]);
                Ok(PreviewOutcome {
                    artifact,
                    decision: Decision::Committed { revision_id },
                })
            }
            DecisionSignal::AwaitingInput => {
                let materialized = rendered.artifact.materialize(&*db);
                ctx.abort();
                unwind(db, savepoint)?;
                log_event(
                    Event::PreviewRolledBack,
                    &[("context_id", &context_id), ("snapshot_id", &snapshot_id)],
                );
                let artifact = match materialized {
                    Ok(artifact) => artifact,
                    Err(e) => {
                        scope.fail(e.code());
                        return Err(e.into());
                    }
                };
                scope.complete_with_fields(&[("decision", "previewed")]);
                Ok(PreviewOutcome {
                    artifact,
                    decision: Decision::Previewed,
                })
            }
        }
    }
}

fn unwind<D: Database>(db: &mut D, savepoint: SavepointId) -> Result<(), RevisionError> {
    db.rollback_to_savepoint(savepoint)?;
    Ok(())
}
