//! revcore - revision tracking for hosted entity stores
//!
//! Three layers, each depending only on the ones below it:
//! - `registry`: which related records are captured together
//! - `revision`: re-entrant boundaries writing one revision per unit of work
//! - `preview`: speculative revert that renders before deciding to keep it
//!
//! `storage` and `transaction` describe what the host database provides;
//! `storage::MemoryDatabase` implements both for hosts without a store.

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod preview;
pub mod registry;
pub mod revision;
pub mod storage;
pub mod transaction;

pub use config::VersioningConfig;
pub use error::{RevisionError, RevisionResult};
pub use preview::{Decision, DecisionSignal, PreviewController, PreviewOutcome, Rendered};
pub use registry::{ModelCatalog, Registry};
pub use revision::{RevisionContext, RevisionManager, Session};
pub use storage::{Database, EntityKey, MemoryDatabase, Record};
