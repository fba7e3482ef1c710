//! Observability for revcore
//!
//! - Structured JSON log lines with deterministic key order
//! - Typed lifecycle events
//! - Begin/complete bracketing of long operations
//!
//! Observability is read-only: a failed log write never changes the outcome
//! of the operation being observed.
//!
//! ```ignore
//! use revcore::observability::{log_event, Event};
//!
//! log_event(Event::RevisionCommitted, &[("revision_id", "3")]);
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

/// Log a lifecycle event at its own severity.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
