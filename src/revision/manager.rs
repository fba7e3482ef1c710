//! Revision manager: registry + configuration + the transactional wrapper
//! host workflows run inside

use crate::config::VersioningConfig;
use crate::error::RevisionError;
use crate::registry::Registry;
use crate::storage::{Actor, Database, EntityKey, RevisionId, Snapshot};

use super::context::RevisionContext;
use super::history::{self, HistoryEntry, HistoryOrder};
use super::session::Session;

/// Owns the registry and configuration shared by every boundary.
#[derive(Debug)]
pub struct RevisionManager {
    registry: Registry,
    config: VersioningConfig,
}

impl RevisionManager {
    pub fn new(registry: Registry, config: VersioningConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Setup-time access for late registrations
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn config(&self) -> &VersioningConfig {
        &self.config
    }

    /// Run `work` as one revisioned unit.
    ///
    /// Opens a savepoint and a boundary level, runs `work`, closes the level
    /// and releases the savepoint. If `work` or the revision write fails,
    /// everything since the savepoint is rolled back, the level is closed
    /// without writing and the error is returned. Returns the id of the
    /// revision written, which is `None` when nested inside an outer boundary
    /// or when there was nothing to write.
    pub fn create_revision<D, T, E, F>(
        &self,
        db: &mut D,
        ctx: &mut RevisionContext,
        actor: Option<Actor>,
        work: F,
    ) -> Result<(T, Option<RevisionId>), E>
    where
        D: Database,
        E: From<RevisionError>,
        F: FnOnce(&mut Session<'_, D>) -> Result<T, E>,
    {
        let savepoint = db.savepoint().map_err(RevisionError::from)?;
        ctx.begin();
        if let Some(actor) = actor {
            ctx.set_actor(actor);
        }
        ctx.set_ignore_duplicates(self.config.ignore_duplicate_revisions);

        let outcome = {
            let mut session = Session::new(db, ctx, &self.registry, &self.config);
            work(&mut session)
        };
        let value = match outcome {
            Ok(value) => value,
            Err(e) => {
                ctx.abort();
                db.rollback_to_savepoint(savepoint).map_err(RevisionError::from)?;
                return Err(e);
            }
        };

        match ctx.end(db, &self.registry) {
            Ok(revision_id) => {
                db.release_savepoint(savepoint).map_err(RevisionError::from)?;
                Ok((value, revision_id))
            }
            Err(e) => {
                db.rollback_to_savepoint(savepoint).map_err(RevisionError::from)?;
                Err(e.into())
            }
        }
    }

    /// Snapshots of one entity in the configured order
    pub fn get_for_entity<D: Database>(&self, db: &D, key: &EntityKey) -> Vec<Snapshot> {
        history::get_for_entity(db, key, self.config.history_order())
    }

    /// Latest snapshots of deleted entities of a type, in the configured order
    pub fn get_deleted<D: Database>(&self, db: &D, entity_type: &str) -> Vec<Snapshot> {
        history::get_deleted(db, entity_type, self.config.history_order())
    }

    /// History entries of one entity in the configured order
    pub fn history<D: Database>(&self, db: &D, key: &EntityKey) -> Vec<HistoryEntry> {
        history::history(db, key, self.config.history_order())
    }

    /// History entries in an explicit order
    pub fn history_ordered<D: Database>(&self, db: &D, key: &EntityKey, order: HistoryOrder) -> Vec<HistoryEntry> {
        history::history(db, key, order)
    }
}
