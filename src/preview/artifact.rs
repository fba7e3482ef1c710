//! Rendered artifacts and their materialization
//!
//! A render step may hand back something that still has to read the store
//! to produce its final form. The controller materializes every artifact
//! while the speculative state is still visible, so a preview always shows
//! the state that is about to be rolled back.

use crate::error::RevisionResult;
use crate::storage::EntityStore;

/// Output of a render step that can be forced into its final form.
pub trait Artifact {
    type Output;

    fn materialize(self, store: &dyn EntityStore) -> RevisionResult<Self::Output>;
}

/// An artifact that is already fully evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ready<T>(pub T);

impl<T> Artifact for Ready<T> {
    type Output = T;

    fn materialize(self, _store: &dyn EntityStore) -> RevisionResult<T> {
        Ok(self.0)
    }
}

/// An artifact evaluated against the store when materialized.
pub struct Deferred<F>(F);

impl<F> Deferred<F> {
    pub fn new(render: F) -> Self {
        Self(render)
    }
}

impl<F, T> Artifact for Deferred<F>
where
    F: FnOnce(&dyn EntityStore) -> RevisionResult<T>,
{
    type Output = T;

    fn materialize(self, store: &dyn EntityStore) -> RevisionResult<T> {
        (self.0)(store)
    }
}
