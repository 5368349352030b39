//! Configuration loading for visadex
//!
//! Settings come from a TOML file resolved in priority order:
//! 1. `VISADEX_CONFIG` environment variable (path to a TOML file)
//! 2. `~/.config/visadex/config.toml`
//!
//! A missing config file is not an error: the service starts with compiled
//! defaults and logs a warning. The OpenAI API key is the one setting with
//! no usable default; see [`resolve_openai_api_key`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Default enrichment tick period in seconds
pub const DEFAULT_INTERVAL_SECONDS: u64 = 30;
/// Default maximum batch size per enrichment tick
pub const DEFAULT_BATCH_LIMIT: i64 = 150;
/// Default HTTP listen port
pub const DEFAULT_PORT: u16 = 5810;

/// TOML configuration file schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite database file (default: platform data dir)
    pub database_path: Option<PathBuf>,
    /// OpenAI API key (overridden by VISADEX_OPENAI_API_KEY)
    pub openai_api_key: Option<String>,
    /// Override for the OpenAI API base URL
    pub openai_base_url: Option<String>,
    /// Chat model used for classification (default: gpt-3.5-turbo)
    pub openai_model: Option<String>,
    /// Append-only diagnostic log of raw model responses (disabled when unset)
    pub response_log: Option<PathBuf>,
    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Enrichment loop settings
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

/// Enrichment loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Seconds between ticks
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Maximum unresolved records fetched per tick
    #[serde(default = "default_batch_limit")]
    pub batch_limit: i64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_interval_seconds() -> u64 {
    DEFAULT_INTERVAL_SECONDS
}

fn default_batch_limit() -> i64 {
    DEFAULT_BATCH_LIMIT
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            openai_api_key: None,
            openai_base_url: None,
            openai_model: None,
            response_log: None,
            port: DEFAULT_PORT,
            enrichment: EnrichmentConfig::default(),
        }
    }
}

/// Resolve the config file path: VISADEX_CONFIG env var, then the
/// platform config directory.
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("VISADEX_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("visadex").join("config.toml"))
}

/// Load configuration, falling back to defaults when no file exists.
///
/// A file that exists but fails to parse is a hard error: silently
/// ignoring a present-but-broken config hides misconfiguration.
pub fn load_config() -> Result<TomlConfig> {
    let path = match config_file_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine config directory, using defaults");
            return Ok(TomlConfig::default());
        }
    };

    if !path.exists() {
        warn!("Config file not found: {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Default SQLite database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("visadex"))
        .unwrap_or_else(|| PathBuf::from("./visadex_data"))
        .join("visadex.db")
}

/// Resolve the OpenAI API key from ENV then TOML.
///
/// Warns when both are set (the environment wins). No valid key in either
/// source is a configuration error - the classifier cannot run without one.
pub fn resolve_openai_api_key(config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var("VISADEX_OPENAI_API_KEY")
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = config
        .openai_api_key
        .as_ref()
        .filter(|k| is_valid_key(k))
        .cloned();

    if env_key.is_some() && toml_key.is_some() {
        warn!("OpenAI API key set in both environment and TOML, using environment");
    }

    if let Some(key) = env_key {
        info!("OpenAI API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("OpenAI API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(
        "OpenAI API key not configured. Set one of:\n\
         1. Environment: VISADEX_OPENAI_API_KEY=your-key-here\n\
         2. TOML config: ~/.config/visadex/config.toml (openai_api_key = \"your-key\")"
            .to_string(),
    ))
}

/// Validate an API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
