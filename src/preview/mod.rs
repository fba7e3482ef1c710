//! Preview / commit controller
//!
//! Reverts to an earlier revision inside a savepoint, lets the host render
//! the result, and only then decides whether the revert is kept.

mod artifact;
mod controller;
mod revert;

pub use artifact::{Artifact, Deferred, Ready};
pub use controller::{Decision, DecisionSignal, PreviewController, PreviewOutcome, Rendered};
pub use revert::{revert_revision, RevertReport};
