//! Configuration loading and resolution
//!
//! Bootstrap settings come from a TOML file. Individual values are resolved
//! with the priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and compiled
//! defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const ENV_CONFIG_PATH: &str = "SONGBIRD_CONFIG";
/// Environment variable overriding the HTTP port
pub const ENV_PORT: &str = "SONGBIRD_PORT";
/// Environment variable overriding the Last.fm API key
pub const ENV_LASTFM_API_KEY: &str = "SONGBIRD_LASTFM_API_KEY";
/// Environment variable overriding the Last.fm shared secret
pub const ENV_LASTFM_SHARED_SECRET: &str = "SONGBIRD_LASTFM_SHARED_SECRET";

/// Bootstrap configuration loaded from TOML file
///
/// Every field has a compiled default so a partial (or empty) file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub lastfm: LastfmConfig,

    #[serde(default)]
    pub deezer: DeezerConfig,

    #[serde(default)]
    pub recommend: RecommendConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Last.fm provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastfmConfig {
    /// API key (overridden by `SONGBIRD_LASTFM_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Shared secret used for request signing (optional)
    #[serde(default)]
    pub shared_secret: Option<String>,

    #[serde(default = "default_lastfm_base_url")]
    pub base_url: String,

    /// Client-side request quota
    #[serde(default = "default_lastfm_rps")]
    pub requests_per_second: u32,
}

/// Deezer enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeezerConfig {
    /// When false, Deezer routes answer 503 and no IDs are attached
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_deezer_base_url")]
    pub base_url: String,

    #[serde(default = "default_deezer_rps")]
    pub requests_per_second: u32,
}

/// Recommendation engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendConfig {
    /// Deadline applied to every individual provider call
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Number of seed searches allowed in flight at once
    #[serde(default = "default_seed_concurrency")]
    pub seed_concurrency: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_lastfm_base_url() -> String {
    "https://ws.audioscrobbler.com/2.0".to_string()
}

fn default_lastfm_rps() -> u32 {
    5
}

fn default_deezer_base_url() -> String {
    "https://api.deezer.com".to_string()
}

fn default_deezer_rps() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

fn default_seed_concurrency() -> usize {
    4
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            logging: LoggingConfig::default(),
            lastfm: LastfmConfig::default(),
            deezer: DeezerConfig::default(),
            recommend: RecommendConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for LastfmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            shared_secret: None,
            base_url: default_lastfm_base_url(),
            requests_per_second: default_lastfm_rps(),
        }
    }
}

impl Default for DeezerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_deezer_base_url(),
            requests_per_second: default_deezer_rps(),
        }
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            seed_concurrency: default_seed_concurrency(),
        }
    }
}

impl TomlConfig {
    /// Load configuration from `path`
    ///
    /// A missing file yields compiled defaults with a warning. A file that
    /// exists but cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file not found at {}, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: TomlConfig = toml::from_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Locate the config file
///
/// **Priority:** CLI → `SONGBIRD_CONFIG` → `<config dir>/songbird/config.toml`
pub fn config_file_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("songbird").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Resolve HTTP port
///
/// **Priority:** CLI → `SONGBIRD_PORT` → TOML (which carries the default)
pub fn resolve_port(cli_arg: Option<u16>, toml_config: &TomlConfig) -> Result<u16> {
    if let Some(port) = cli_arg {
        return Ok(port);
    }

    if let Ok(value) = std::env::var(ENV_PORT) {
        return value
            .trim()
            .parse::<u16>()
            .map_err(|e| Error::Config(format!("{} is not a valid port: {}", ENV_PORT, e)));
    }

    Ok(toml_config.port)
}

/// Resolve Last.fm API key
///
/// **Priority:** ENV → TOML
pub fn resolve_lastfm_api_key(toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var(ENV_LASTFM_API_KEY).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config.lastfm.api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "Last.fm API key found in both environment and TOML. Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("Last.fm API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("Last.fm API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "Last.fm API key not configured. Please configure using one of:\n\
         1. Environment: {}=your-key-here\n\
         2. TOML config: [lastfm] api_key = \"your-key\"\n\
         \n\
         Obtain an API key at: https://www.last.fm/api/account/create",
        ENV_LASTFM_API_KEY
    )))
}

/// Resolve Last.fm shared secret (optional; requests are unsigned without it)
pub fn resolve_lastfm_shared_secret(toml_config: &TomlConfig) -> Option<String> {
    std::env::var(ENV_LASTFM_SHARED_SECRET)
        .ok()
        .filter(|s| is_valid_key(s))
        .or_else(|| {
            toml_config
                .lastfm
                .shared_secret
                .clone()
                .filter(|s| is_valid_key(s))
        })
}

/// Validate key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// User-agent sent by every outbound HTTP client
pub fn get_user_agent() -> String {
    format!(
        "Songbird/{} (https://github.com/songbird/songbird)",
        env!("CARGO_PKG_VERSION")
    )
}
