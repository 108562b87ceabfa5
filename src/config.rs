//! Tool configuration.
//!
//! Handles loading, validating, and merging `trello2keep.toml`. Stock
//! defaults are overridden by the user file, which only needs the keys it
//! wants to change. A missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! credentials = "credentials.json"  # Trello + Google service account secrets
//!
//! [trello]
//! base_url = "https://api.trello.com/1"
//! timeout_secs = 10
//!
//! [keep]
//! base_url = "https://keep.googleapis.com/v1"
//! timeout_secs = 10
//! impersonated_user = "you@example.com"   # no default; see below
//!
//! [output]
//! csv_file = "courses_export.csv"
//! text_file = "courses_export.txt"
//! snapshot_file = "courses.json"
//! ```
//!
//! `keep.impersonated_user` has no default: it comes from this file or from
//! `note --impersonate`.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "trello2keep.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the credentials JSON file.
    pub credentials: String,
    pub trello: TrelloConfig,
    pub keep: KeepConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: "credentials.json".to_string(),
            trello: TrelloConfig::default(),
            keep: KeepConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.trim().is_empty() {
            return Err(ConfigError::Validation(
                "credentials must not be empty".into(),
            ));
        }
        for (key, url) in [
            ("trello.base_url", &self.trello.base_url),
            ("keep.base_url", &self.keep.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be an http(s) URL, got {url:?}"
                )));
            }
        }
        if self.trello.timeout_secs == 0 || self.keep.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        for (key, name) in [
            ("output.csv_file", &self.output.csv_file),
            ("output.text_file", &self.output.text_file),
            ("output.snapshot_file", &self.output.snapshot_file),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if let Some(user) = &self.keep.impersonated_user
            && !user.contains('@')
        {
            return Err(ConfigError::Validation(format!(
                "keep.impersonated_user must be an email address, got {user:?}"
            )));
        }
        Ok(())
    }
}

/// Trello REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrelloConfig {
    pub base_url: String,
    /// Upper bound for each request, in seconds.
    pub timeout_secs: u64,
}

impl Default for TrelloConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.trello.com/1".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Google Keep API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeepConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// User the service account acts for (domain-wide delegation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impersonated_user: Option<String>,
}

impl Default for KeepConfig {
    fn default() -> Self {
        Self {
            base_url: "https://keep.googleapis.com/v1".to_string(),
            timeout_secs: 10,
            impersonated_user: None,
        }
    }
}

/// Fixed output file names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub csv_file: String,
    pub text_file: String,
    pub snapshot_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_file: "courses_export.csv".to_string(),
            text_file: "courses_export.txt".to_string(),
            snapshot_file: "courses.json".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, on top of stock defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `trello2keep.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# trello2keep Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# JSON file holding the Google service account key, plus a "trello" object
# with "api_key" and "token". TRELLO_API_KEY / TRELLO_TOKEN override it.
credentials = "credentials.json"

# ---------------------------------------------------------------------------
# Trello
# ---------------------------------------------------------------------------
[trello]
base_url = "https://api.trello.com/1"

# Upper bound for each request, in seconds.
timeout_secs = 10

# ---------------------------------------------------------------------------
# Google Keep
# ---------------------------------------------------------------------------
[keep]
base_url = "https://keep.googleapis.com/v1"
timeout_secs = 10

# User the service account impersonates (domain-wide delegation).
# Required for `note` unless --impersonate is given.
# impersonated_user = "you@example.com"

# ---------------------------------------------------------------------------
# Output files
# ---------------------------------------------------------------------------
[output]
csv_file = "courses_export.csv"
text_file = "courses_export.txt"
snapshot_file = "courses.json"
"##
}
