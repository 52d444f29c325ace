//! Configuration file loading and setting resolution
//!
//! Settings are resolved per key in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (applied by the caller)
//!
//! Resolution usually runs before the tracing subscriber is installed (the
//! log level is itself a setting), so loading and resolution notes are
//! collected in a [`ConfigReport`] and emitted with [`ConfigReport::log`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Contents of a service TOML config file
///
/// Every field is optional; absent fields fall through to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Socket address the HTTP server binds to
    pub bind_address: Option<String>,
    /// Shared secret expected in the `X-API-Key` header
    pub api_key: Option<String>,
    /// Bearer token for the remote inference API
    pub model_token: Option<String>,
    /// Remote model identifier
    pub model_id: Option<String>,
    /// Base URL of the remote inference API
    pub inference_url: Option<String>,
    /// Analyze calls allowed per caller per minute
    pub rate_limit_per_minute: Option<u32>,
    /// Collapse concurrent identical requests onto one pipeline run
    pub dedupe_in_flight: Option<bool>,
    /// Shared cache REST endpoint; the in-process cache is used when absent
    pub cache_url: Option<String>,
    /// Bearer token for the shared cache
    pub cache_token: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[logging]` table
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default tracing level directive (e.g. "info", "debug")
    pub level: Option<String>,
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    CommandLine,
    Environment,
    TomlFile,
}

impl SettingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingSource::CommandLine => "command line",
            SettingSource::Environment => "environment",
            SettingSource::TomlFile => "TOML",
        }
    }
}

/// One buffered configuration note
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNote {
    FileLoaded(PathBuf),
    FileMissing(PathBuf),
    /// A required setting was found
    Resolved { name: String, source: SettingSource },
    /// A setting was present in more than one source; the first one won
    MultipleSources {
        name: String,
        sources: Vec<SettingSource>,
    },
}

/// Notes gathered while loading and resolving configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigReport {
    notes: Vec<ConfigNote>,
}

impl ConfigReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, note: ConfigNote) {
        self.notes.push(note);
    }

    pub fn notes(&self) -> &[ConfigNote] {
        &self.notes
    }

    /// Names of settings found in more than one source
    pub fn conflicts(&self) -> impl Iterator<Item = &str> + '_ {
        self.notes.iter().filter_map(|note| match note {
            ConfigNote::MultipleSources { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Emit every note through tracing
    pub fn log(&self) {
        for note in &self.notes {
            match note {
                ConfigNote::FileLoaded(path) => info!("Loaded config file: {}", path.display()),
                ConfigNote::FileMissing(path) => {
                    debug!("Config file not found, using defaults: {}", path.display())
                }
                ConfigNote::Resolved { name, source } => {
                    info!("{} loaded from {}", name, source.as_str())
                }
                ConfigNote::MultipleSources { name, sources } => {
                    let names: Vec<&str> = sources.iter().map(SettingSource::as_str).collect();
                    warn!(
                        "{} found in multiple sources: {}. Using {} (highest priority).",
                        name,
                        names.join(", "),
                        names.first().copied().unwrap_or("none")
                    );
                }
            }
        }
    }
}

/// Default config file location for a module
///
/// `~/.config/<module>/config.toml` on Linux, the platform config dir elsewhere.
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(module_name).join("config.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load a config file if one exists
///
/// A missing file yields the empty config. An explicit path that exists but
/// cannot be parsed is an error.
pub fn load_optional_toml_config(
    path: Option<&Path>,
    report: &mut ConfigReport,
) -> Result<TomlConfig> {
    match path {
        Some(path) if path.exists() => {
            let config = load_toml_config(path)?;
            report.record(ConfigNote::FileLoaded(path.to_path_buf()));
            Ok(config)
        }
        Some(path) => {
            report.record(ConfigNote::FileMissing(path.to_path_buf()));
            Ok(TomlConfig::default())
        }
        None => Ok(TomlConfig::default()),
    }
}

/// Validate a setting value (non-empty, non-whitespace)
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Resolve one setting from CLI, environment and TOML
///
/// `lookup` reads an environment variable; passing it in keeps resolution
/// testable without mutating the process environment. A value present in
/// more than one source is noted in `report`.
pub fn resolve_setting<F>(
    name: &str,
    cli_value: Option<&str>,
    env_var: &str,
    lookup: &F,
    toml_value: Option<&str>,
    report: &mut ConfigReport,
) -> Option<(String, SettingSource)>
where
    F: Fn(&str) -> Option<String>,
{
    let env_value = lookup(env_var);

    let candidates = [
        (cli_value.map(str::to_string), SettingSource::CommandLine),
        (env_value, SettingSource::Environment),
        (toml_value.map(str::to_string), SettingSource::TomlFile),
    ];

    let present: Vec<SettingSource> = candidates
        .iter()
        .filter(|(value, _)| value.as_deref().is_some_and(is_valid_value))
        .map(|(_, source)| *source)
        .collect();

    // Multiple sources is a likely misconfiguration
    if present.len() > 1 {
        report.record(ConfigNote::MultipleSources {
            name: name.to_string(),
            sources: present,
        });
    }

    candidates
        .into_iter()
        .find_map(|(value, source)| match value {
            Some(v) if is_valid_value(&v) => Some((v.trim().to_string(), source)),
            _ => None,
        })
}
