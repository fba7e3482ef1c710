//! Versioning configuration
//!
//! Loaded once at host setup from a JSON file; every field has a default so
//! an empty object is a valid configuration.

use std::fs;
use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event, Event, Logger, Severity};
use crate::revision::HistoryOrder;

/// Placeholder replaced by the reverted revision's timestamp
pub const DATETIME_PLACEHOLDER: &str = "{datetime}";

/// Result type for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "REV_CONFIG_READ",
            ConfigError::Parse(_) => "REV_CONFIG_PARSE",
            ConfigError::Invalid { .. } => "REV_CONFIG_INVALID",
        }
    }
}

/// Revision behaviour shared by every boundary the host opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersioningConfig {
    /// Skip writing a revision whose snapshots all equal their predecessors
    #[serde(default)]
    pub ignore_duplicate_revisions: bool,

    /// Default history ordering: newest snapshot first
    #[serde(default)]
    pub history_latest_first: bool,

    /// Comment for a boundary that created an entity without a message
    #[serde(default = "default_initial_comment")]
    pub initial_comment: String,

    /// Comment for a committed revert; must contain `{datetime}`
    #[serde(default = "default_revert_comment")]
    pub revert_comment: String,

    /// strftime format for `{datetime}`
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// Lowest log severity written
    #[serde(default = "default_log_level")]
    pub log_level: Severity,
}

fn default_initial_comment() -> String {
    "Initial version.".to_string()
}

fn default_revert_comment() -> String {
    format!("Reverted to previous version, saved on {}", DATETIME_PLACEHOLDER)
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S UTC".to_string()
}

fn default_log_level() -> Severity {
    Severity::Info
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            ignore_duplicate_revisions: false,
            history_latest_first: false,
            initial_comment: default_initial_comment(),
            revert_comment: default_revert_comment(),
            timestamp_format: default_timestamp_format(),
            log_level: default_log_level(),
        }
    }
}

impl VersioningConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_json(&content)?;
        log_event(Event::ConfigLoaded, &[("path", &path.display().to_string())]);
        Ok(config)
    }

    /// Parse and validate a configuration string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: VersioningConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.revert_comment.contains(DATETIME_PLACEHOLDER) {
            return Err(ConfigError::Invalid {
                field: "revert_comment",
                reason: format!("must contain {}", DATETIME_PLACEHOLDER),
            });
        }
        if self.timestamp_format.is_empty()
            || StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error))
        {
            return Err(ConfigError::Invalid {
                field: "timestamp_format",
                reason: format!("'{}' is not a valid strftime format", self.timestamp_format),
            });
        }
        Ok(())
    }

    /// Enable duplicate suppression
    pub fn ignoring_duplicates(mut self) -> Self {
        self.ignore_duplicate_revisions = true;
        self
    }

    /// Default ordering for history reads
    pub fn history_order(&self) -> HistoryOrder {
        if self.history_latest_first {
            HistoryOrder::Descending
        } else {
            HistoryOrder::Ascending
        }
    }

    /// Comment recorded when a revert to a revision made at `created_at` commits
    pub fn revert_comment_for(&self, created_at: DateTime<Utc>) -> String {
        let stamp = created_at.format(&self.timestamp_format).to_string();
        self.revert_comment.replace(DATETIME_PLACEHOLDER, &stamp)
    }

    /// Apply the configured log level process-wide
    pub fn apply_logging(&self) {
        Logger::set_min_severity(self.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = VersioningConfig::default();
        assert!(!config.ignore_duplicate_revisions);
        assert_eq!(config.history_order(), HistoryOrder::Ascending);
        assert_eq!(config.initial_comment, "Initial version.");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(VersioningConfig::from_json("{}").unwrap(), VersioningConfig::default());
    }

    #[test]
    fn test_revert_comment_for() {
        let config = VersioningConfig::default();
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(
            config.revert_comment_for(when),
            "Reverted to previous version, saved on 2024-03-01 12:30:00 UTC"
        );
    }

    #[test]
    fn test_revert_comment_requires_placeholder() {
        let err = VersioningConfig::from_json(r#"{"revert_comment": "Reverted"}"#).unwrap_err();
        assert_eq!(err.code(), "REV_CONFIG_INVALID");
    }

    #[test]
    fn test_bad_timestamp_format() {
        let err = VersioningConfig::from_json(r#"{"timestamp_format": "%Q"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "timestamp_format", .. }));
    }

    #[test]
    fn test_latest_first_ordering() {
        let config = VersioningConfig::from_json(r#"{"history_latest_first": true}"#).unwrap();
        assert_eq!(config.history_order(), HistoryOrder::Descending);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ignore_duplicate_revisions": true, "log_level": "warn"}}"#).unwrap();
        let config = VersioningConfig::load(file.path()).unwrap();
        assert!(config.ignore_duplicate_revisions);
        assert_eq!(config.log_level, Severity::Warn);
    }

    #[test]
    fn test_load_missing_file() {
        let err = VersioningConfig::load(Path::new("/nonexistent/revcore.json")).unwrap_err();
        assert_eq!(err.code(), "REV_CONFIG_READ");
    }
}
