//! Mutation façade handed to host workflows inside a boundary
//!
//! Writes through a `Session` are recorded on the boundary automatically:
//! saves mark the entity touched, deletes capture its last state.

use crate::config::VersioningConfig;
use crate::error::RevisionResult;
use crate::registry::Registry;
use crate::storage::{Actor, Database, EntityKey, Record};

use super::context::RevisionContext;

/// Database access bound to one open boundary.
pub struct Session<'a, D: Database> {
    db: &'a mut D,
    ctx: &'a mut RevisionContext,
    registry: &'a Registry,
    config: &'a VersioningConfig,
}

impl<'a, D: Database> Session<'a, D> {
    pub fn new(
        db: &'a mut D,
        ctx: &'a mut RevisionContext,
        registry: &'a Registry,
        config: &'a VersioningConfig,
    ) -> Self {
        Self {
            db,
            ctx,
            registry,
            config,
        }
    }

    pub fn get(&self, key: &EntityKey) -> Option<Record> {
        self.db.get(key)
    }

    pub fn scan(&self, entity_type: &str) -> Vec<Record> {
        self.db.scan(entity_type)
    }

    /// Store a record and mark it touched if its type is tracked
    pub fn save(&mut self, record: Record) -> RevisionResult<()> {
        let key = record.key().clone();
        self.db.put(record)?;
        if self.registry.is_registered(&key.entity_type) {
            self.ctx.add(key);
        }
        Ok(())
    }

    /// Delete a record, capturing its last state if its type is tracked
    pub fn delete(&mut self, key: &EntityKey) -> RevisionResult<Option<Record>> {
        let removed = self.db.delete(key)?;
        if let Some(record) = &removed {
            if self.registry.is_registered(record.entity_type()) {
                self.ctx.add_deleted(record.clone());
            }
        }
        Ok(removed)
    }

    /// Record the comment for a workflow that created an entity.
    ///
    /// Without a message the configured initial comment is used.
    pub fn log_addition(&mut self, message: Option<&str>) {
        let comment = message.unwrap_or(&self.config.initial_comment).to_string();
        self.ctx.set_comment(comment);
    }

    /// Record the comment for a workflow that changed an entity
    pub fn log_change(&mut self, message: &str) {
        self.ctx.set_comment(message);
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.ctx.set_comment(comment);
    }

    pub fn set_actor(&mut self, actor: Actor) {
        self.ctx.set_actor(actor);
    }

    pub fn context(&self) -> &RevisionContext {
        self.ctx
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Read-only access to the underlying database
    pub fn database(&self) -> &D {
        self.db
    }
}
