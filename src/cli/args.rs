//! CLI argument definitions using clap
//!
//! Commands:
//! - revcore check --config <path>
//! - revcore graph --catalog <path> --root <type> [--part <type>]...

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// revcore - revision tracking setup tools
#[derive(Parser, Debug)]
#[command(name = "revcore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a versioning configuration file
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./revcore.json")]
        config: PathBuf,
    },

    /// Show what registering a root type would capture
    Graph {
        /// Path to the model catalog
        #[arg(long)]
        catalog: PathBuf,

        /// Root entity type
        #[arg(long)]
        root: String,

        /// Part types edited inline with the root
        #[arg(long = "part")]
        parts: Vec<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
