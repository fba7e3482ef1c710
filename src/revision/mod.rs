//! Revision scope
//!
//! - `RevisionContext`: the re-entrant boundary of one execution context
//! - `Session`: the mutation façade workflows use inside a boundary
//! - `RevisionManager`: savepoint-wrapped revision units and history reads
//!
//! A boundary accumulates touched entities; the outermost close walks their
//! follow fields and writes exactly one revision with one snapshot per
//! captured entity, or nothing at all.

mod context;
mod history;
mod manager;
mod session;

pub use context::RevisionContext;
pub use history::{get_deleted, get_for_entity, history, HistoryEntry, HistoryOrder};
pub use manager::RevisionManager;
pub use session::Session;
