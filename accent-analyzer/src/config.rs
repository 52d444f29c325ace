//! Configuration resolution for accent-analyzer
//!
//! Each setting resolves CLI → ENV → TOML → compiled default. Secrets have no
//! default and must come from the environment or the TOML file.

use accent_common::auth::{is_strong_key, MIN_API_KEY_LEN};
use accent_common::config::{
    default_config_path, load_optional_toml_config, resolve_setting, ConfigNote, ConfigReport,
    SettingSource, TomlConfig,
};
use accent_common::{Error, Result};
use clap::Parser;
use std::fmt;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::path::PathBuf;

use crate::services::{DEFAULT_INFERENCE_URL, DEFAULT_MODEL_ID};

pub const MODULE_NAME: &str = "accent-analyzer";

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 10;
pub const MAX_RATE_LIMIT_PER_MINUTE: u32 = 100;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_MODEL_TOKEN: &str = "HF_TOKEN";
pub const ENV_MODEL_ID: &str = "HF_MODEL_ID";
pub const ENV_INFERENCE_URL: &str = "HF_INFERENCE_URL";
pub const ENV_RATE_LIMIT: &str = "RATE_LIMIT_PER_MINUTE";
pub const ENV_BIND_ADDRESS: &str = "ACCENT_BIND_ADDRESS";
pub const ENV_DEDUPE_IN_FLIGHT: &str = "ACCENT_DEDUPE_IN_FLIGHT";
pub const ENV_LOG_LEVEL: &str = "ACCENT_LOG_LEVEL";
pub const ENV_CACHE_URL: &str = "UPSTASH_REDIS_URL";
pub const ENV_CACHE_TOKEN: &str = "UPSTASH_REDIS_TOKEN";

/// Command-line arguments for accent-analyzer
#[derive(Parser, Debug, Default)]
#[command(name = "accent-analyzer")]
#[command(about = "English accent analysis service")]
#[command(version)]
pub struct Cli {
    /// TOML config file (defaults to the per-user config dir)
    #[arg(short, long, env = "ACCENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Socket address to listen on
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Default log level when RUST_LOG is unset
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Where analysis results are cached
#[derive(Clone, PartialEq)]
pub enum CacheBackend {
    /// In-process store, lost on restart and not shared between instances
    Memory,
    /// Shared REST cache endpoint
    Rest { url: String, token: String },
}

impl fmt::Debug for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBackend::Memory => f.write_str("Memory"),
            CacheBackend::Rest { url, .. } => f
                .debug_struct("Rest")
                .field("url", url)
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// Fully resolved service settings
#[derive(Clone)]
pub struct Settings {
    pub bind_address: SocketAddr,
    pub api_key: String,
    pub model_token: String,
    pub model_id: String,
    pub inference_url: String,
    pub rate_limit_per_minute: NonZeroU32,
    pub dedupe_in_flight: bool,
    pub cache: CacheBackend,
    pub log_level: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("bind_address", &self.bind_address)
            .field("api_key", &"<redacted>")
            .field("model_token", &"<redacted>")
            .field("model_id", &self.model_id)
            .field("inference_url", &self.inference_url)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("dedupe_in_flight", &self.dedupe_in_flight)
            .field("cache", &self.cache)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Settings {
    /// Load the TOML file named by the CLI (or the default path) and resolve
    /// against the process environment
    ///
    /// Runs before logging is initialized; the returned report holds the
    /// notes to log once it is.
    pub fn load(cli: &Cli) -> Result<(Self, ConfigReport)> {
        let mut report = ConfigReport::new();
        let path = cli
            .config
            .clone()
            .or_else(|| default_config_path(MODULE_NAME));
        let toml_config = load_optional_toml_config(path.as_deref(), &mut report)?;
        let settings = Self::resolve(
            cli,
            &toml_config,
            &|key: &str| std::env::var(key).ok(),
            &mut report,
        )?;
        Ok((settings, report))
    }

    /// Resolve every setting from the given sources
    pub fn resolve<F>(
        cli: &Cli,
        toml_config: &TomlConfig,
        lookup: &F,
        report: &mut ConfigReport,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = required(
            "API key",
            resolve_setting(
                "API key",
                None,
                ENV_API_KEY,
                lookup,
                toml_config.api_key.as_deref(),
                report,
            ),
            ENV_API_KEY,
            report,
        )?;
        if !is_strong_key(&api_key) {
            return Err(Error::Config(format!(
                "API key must be at least {} characters",
                MIN_API_KEY_LEN
            )));
        }

        let model_token = required(
            "model token",
            resolve_setting(
                "model token",
                None,
                ENV_MODEL_TOKEN,
                lookup,
                toml_config.model_token.as_deref(),
                report,
            ),
            ENV_MODEL_TOKEN,
            report,
        )?;

        let model_id = resolve_setting(
            "model id",
            None,
            ENV_MODEL_ID,
            lookup,
            toml_config.model_id.as_deref(),
            report,
        )
        .map(|(value, _)| value)
        .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());

        let inference_url = resolve_setting(
            "inference URL",
            None,
            ENV_INFERENCE_URL,
            lookup,
            toml_config.inference_url.as_deref(),
            report,
        )
        .map(|(value, _)| value)
        .unwrap_or_else(|| DEFAULT_INFERENCE_URL.to_string());
        reqwest::Url::parse(&inference_url)
            .map_err(|e| Error::Config(format!("inference URL '{}' is invalid: {}", inference_url, e)))?;

        let toml_rate = toml_config.rate_limit_per_minute.map(|n| n.to_string());
        let rate_limit_per_minute = match resolve_setting(
            "rate limit",
            None,
            ENV_RATE_LIMIT,
            lookup,
            toml_rate.as_deref(),
            report,
        ) {
            Some((value, source)) => parse_rate_limit(&value, source)?,
            None => NonZeroU32::new(DEFAULT_RATE_LIMIT_PER_MINUTE).unwrap_or(NonZeroU32::MIN),
        };

        let bind_value = resolve_setting(
            "bind address",
            cli.bind.as_deref(),
            ENV_BIND_ADDRESS,
            lookup,
            toml_config.bind_address.as_deref(),
            report,
        )
        .map(|(value, _)| value)
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address: SocketAddr = bind_value
            .parse()
            .map_err(|e| Error::Config(format!("bind address '{}' is invalid: {}", bind_value, e)))?;

        let toml_dedupe = toml_config.dedupe_in_flight.map(|b| b.to_string());
        let dedupe_in_flight = match resolve_setting(
            "in-flight dedup",
            None,
            ENV_DEDUPE_IN_FLIGHT,
            lookup,
            toml_dedupe.as_deref(),
            report,
        ) {
            Some((value, _)) => parse_bool(&value).ok_or_else(|| {
                Error::Config(format!("in-flight dedup must be true or false, got '{}'", value))
            })?,
            None => true,
        };

        let cache = resolve_cache_backend(toml_config, lookup, report)?;

        let log_level = resolve_setting(
            "log level",
            cli.log_level.as_deref(),
            ENV_LOG_LEVEL,
            lookup,
            toml_config.logging.level.as_deref(),
            report,
        )
        .map(|(value, _)| value)
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Ok(Self {
            bind_address,
            api_key,
            model_token,
            model_id,
            inference_url,
            rate_limit_per_minute,
            dedupe_in_flight,
            cache,
            log_level,
        })
    }
}

fn required(
    name: &str,
    resolved: Option<(String, SettingSource)>,
    env_var: &str,
    report: &mut ConfigReport,
) -> Result<String> {
    match resolved {
        Some((value, source)) => {
            report.record(ConfigNote::Resolved {
                name: name.to_string(),
                source,
            });
            Ok(value)
        }
        None => Err(Error::Config(format!(
            "{} not configured. Set the {} environment variable or add it to the TOML config",
            name, env_var
        ))),
    }
}

/// Shared cache when a URL is configured, in-process otherwise
///
/// A URL without a token (or the reverse) is rejected rather than silently
/// falling back to the in-process store.
fn resolve_cache_backend<F>(
    toml_config: &TomlConfig,
    lookup: &F,
    report: &mut ConfigReport,
) -> Result<CacheBackend>
where
    F: Fn(&str) -> Option<String>,
{
    let url = resolve_setting(
        "cache URL",
        None,
        ENV_CACHE_URL,
        lookup,
        toml_config.cache_url.as_deref(),
        report,
    );
    let token = resolve_setting(
        "cache token",
        None,
        ENV_CACHE_TOKEN,
        lookup,
        toml_config.cache_token.as_deref(),
        report,
    );

    match (url, token) {
        (None, None) => Ok(CacheBackend::Memory),
        (Some((url, url_source)), Some((token, token_source))) => {
            let parsed = reqwest::Url::parse(&url)
                .map_err(|e| Error::Config(format!("cache URL '{}' is invalid: {}", url, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "cache URL must start with http:// or https://, got '{}'",
                    url
                )));
            }
            report.record(ConfigNote::Resolved {
                name: "cache URL".to_string(),
                source: url_source,
            });
            report.record(ConfigNote::Resolved {
                name: "cache token".to_string(),
                source: token_source,
            });
            Ok(CacheBackend::Rest { url, token })
        }
        (Some(_), None) => Err(Error::Config(format!(
            "cache URL is set but {} is not",
            ENV_CACHE_TOKEN
        ))),
        (None, Some(_)) => Err(Error::Config(format!(
            "cache token is set but {} is not",
            ENV_CACHE_URL
        ))),
    }
}

fn parse_rate_limit(value: &str, source: SettingSource) -> Result<NonZeroU32> {
    value
        .parse::<u32>()
        .ok()
        .filter(|n| (1..=MAX_RATE_LIMIT_PER_MINUTE).contains(n))
        .and_then(NonZeroU32::new)
        .ok_or_else(|| {
            Error::Config(format!(
                "rate limit from {} must be between 1 and {}, got '{}'",
                source.as_str(),
                MAX_RATE_LIMIT_PER_MINUTE,
                value
            ))
        })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
