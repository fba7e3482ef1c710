//! CLI command implementations
//!
//! Commands only read their input files and print a JSON report; nothing is
//! written to any store.

use std::path::Path;

use serde_json::{json, Value};

use crate::config::VersioningConfig;
use crate::observability::{Logger, ObservationScope};
use crate::registry::{ModelCatalog, PartDescriptor, RegistrationOptions, Registry};

use super::args::Command;
use super::errors::CliResult;
use super::io::{write_error, write_response};

/// Main entry point for CLI
///
/// Log lines go to stderr so stdout carries only the JSON response.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    Logger::route_all_to_stderr();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let result = match cmd {
        Command::Check { config } => check(&config),
        Command::Graph {
            catalog,
            root,
            parts,
        } => graph(&catalog, &root, &parts),
    };
    if let Err(ref e) = result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Validate a configuration file and print the effective settings
pub fn check(config_path: &Path) -> CliResult<()> {
    write_response(check_report(config_path)?)
}

/// Effective configuration after defaults are applied
pub fn check_report(config_path: &Path) -> CliResult<Value> {
    let config = VersioningConfig::load(config_path)?;
    Ok(serde_json::to_value(&config)?)
}

/// Register `root` with `parts` and print what would be captured
pub fn graph(catalog_path: &Path, root: &str, parts: &[String]) -> CliResult<()> {
    write_response(graph_report(catalog_path, root, parts)?)
}

/// Registration order, follow fields and resolved parts for one root type.
///
/// Parts are discovered through their link fields; a part with no follow
/// field is reported with `follow_field: null`.
pub fn graph_report(catalog_path: &Path, root: &str, parts: &[String]) -> CliResult<Value> {
    let scope = ObservationScope::with_fields("GRAPH", &[("root", root)]);

    let catalog = ModelCatalog::load(catalog_path)?;
    let mut registry = Registry::new(catalog);
    let descriptors: Vec<PartDescriptor> = parts.iter().map(PartDescriptor::direct).collect();
    let resolved = match registry.register_root(root, &descriptors, RegistrationOptions::new()) {
        Ok(resolved) => resolved,
        Err(e) => {
            scope.fail(e.code());
            return Err(e.into());
        }
    };

    let order: Vec<Value> = registry
        .registration_order()
        .into_iter()
        .filter_map(|entity_type| registry.registration(entity_type))
        .map(|r| json!({ "type": r.entity_type(), "follow": r.follow() }))
        .collect();

    let count = order.len().to_string();
    scope.complete_with_fields(&[("registered", &count)]);
    Ok(json!({
        "root": root,
        "registrations": order,
        "parts": resolved,
    }))
}
