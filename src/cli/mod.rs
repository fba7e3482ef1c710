//! CLI module for revcore
//!
//! Setup-time tooling for hosts:
//! - check: validate a versioning configuration file
//! - graph: print the registration order and follow fields for a root type

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, check_report, graph, graph_report, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
