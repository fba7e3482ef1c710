//! Observable events
//!
//! Every log line emitted by the core names one of these events.

use std::fmt;

use super::logger::Severity;

/// Observable events in revcore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Setup
    /// Configuration loaded
    ConfigLoaded,
    /// Model catalog loaded
    CatalogLoaded,
    /// Entity type registered for revision tracking
    TypeRegistered,
    /// Part-of relation resolved to a follow field
    PartResolved,

    // Revision boundary
    /// Outermost boundary opened
    BoundaryOpened,
    /// Boundary closed with a new revision
    RevisionCommitted,
    /// Boundary closed, every snapshot equal to its predecessor
    RevisionSkippedDuplicate,
    /// Boundary closed with nothing to write (invalidated or untouched)
    RevisionDiscarded,
    /// Revision write failed
    RevisionPersistFailed,
    /// One snapshot captured
    SnapshotCaptured,

    // Revert
    /// Entity reinstated from a snapshot
    EntityReinstated,
    /// Entity deleted because the target revision did not contain it
    EntityPruned,
    /// Revert could not reconstruct the revision
    RevertConflict,

    // Preview protocol
    /// Speculative revert committed
    PreviewCommitted,
    /// Speculative revert rolled back after rendering
    PreviewRolledBack,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::CatalogLoaded => "CATALOG_LOADED",
            Event::TypeRegistered => "TYPE_REGISTERED",
            Event::PartResolved => "PART_RESOLVED",

            Event::BoundaryOpened => "BOUNDARY_OPENED",
            Event::RevisionCommitted => "REVISION_COMMITTED",
            Event::RevisionSkippedDuplicate => "REVISION_SKIPPED_DUPLICATE",
            Event::RevisionDiscarded => "REVISION_DISCARDED",
            Event::RevisionPersistFailed => "REVISION_PERSIST_FAILED",
            Event::SnapshotCaptured => "SNAPSHOT_CAPTURED",

            Event::EntityReinstated => "ENTITY_REINSTATED",
            Event::EntityPruned => "ENTITY_PRUNED",
            Event::RevertConflict => "REVERT_CONFLICT",

            Event::PreviewCommitted => "PREVIEW_COMMITTED",
            Event::PreviewRolledBack => "PREVIEW_ROLLED_BACK",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::SnapshotCaptured | Event::EntityReinstated | Event::EntityPruned => {
                Severity::Trace
            }
            Event::RevertConflict => Severity::Warn,
            Event::RevisionPersistFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
