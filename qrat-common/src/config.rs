//! Configuration loading and value resolution
//!
//! Both binaries read one TOML file. Every value resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`QRAT_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: the binaries log a warning and run
//! on compiled defaults. A config file that exists but fails to parse is.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{DuplicatePhrases, Error, Result, SessionTag};

/// Environment variable naming the config file
pub const ENV_CONFIG: &str = "QRAT_CONFIG";
/// Environment variable overriding `upstream.base_url`
pub const ENV_UPSTREAM_URL: &str = "QRAT_UPSTREAM_URL";
/// Environment variable overriding `scanner.session`
pub const ENV_SESSION: &str = "QRAT_SESSION";
/// Environment variable overriding `proxy.bind_address`
pub const ENV_BIND: &str = "QRAT_BIND";
/// Environment variable overriding `logging.level`
pub const ENV_LOG_LEVEL: &str = "QRAT_LOG_LEVEL";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote attendance service
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Scanner terminal settings
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Forwarding proxy settings
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Substrings marking a reply as "already recorded today"
    #[serde(default)]
    pub duplicate_phrases: DuplicatePhrases,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Remote attendance service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL, without a trailing slash
    #[serde(default = "default_upstream_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Scanner terminal settings
///
/// Cooldown windows are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub session: SessionTag,

    /// Any admitted scan blocks every scan for this long
    #[serde(default = "default_global_cooldown_ms")]
    pub global_cooldown_ms: u64,

    /// Same decoded text is ignored for this long
    #[serde(default = "default_raw_text_window_ms")]
    pub raw_text_window_ms: u64,

    /// Same student number is ignored for this long
    #[serde(default = "default_identifier_window_ms")]
    pub identifier_window_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            session: SessionTag::default(),
            global_cooldown_ms: default_global_cooldown_ms(),
            raw_text_window_ms: default_raw_text_window_ms(),
            identifier_window_ms: default_identifier_window_ms(),
        }
    }
}

/// Forwarding proxy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:5730".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_global_cooldown_ms() -> u64 {
    1_000
}

fn default_raw_text_window_ms() -> u64 {
    3_000
}

fn default_identifier_window_ms() -> u64 {
    5_000
}

fn default_bind_address() -> String {
    "127.0.0.1:5731".to_string()
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load the config file if there is one.
    ///
    /// An explicitly named file must exist. Without one, the platform default
    /// location is tried and compiled defaults are used when it is absent.
    /// Nothing is logged here: callers load config before tracing is
    /// initialized and log the returned [`ConfigSource`] afterwards.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Ok((Self::load(path)?, ConfigSource::File(path.to_path_buf())));
        }

        match default_config_path() {
            Some(path) if path.exists() => Ok((Self::load(&path)?, ConfigSource::File(path))),
            Some(path) => Ok((Self::default(), ConfigSource::Missing(Some(path)))),
            None => Ok((Self::default(), ConfigSource::Missing(None))),
        }
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file; compiled defaults. Holds the location that was tried.
    Missing(Option<PathBuf>),
}

impl ConfigSource {
    /// Log the source; a missing file is a warning, not an error
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Missing(Some(path)) => warn!(
                "No config file at {}; using compiled defaults",
                path.display()
            ),
            ConfigSource::Missing(None) => {
                warn!("Could not determine config directory; using compiled defaults")
            }
        }
    }
}

/// `<config dir>/qrat/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("qrat").join("config.toml"))
}

/// Resolve one setting: CLI → ENV → TOML → default.
///
/// An environment value that does not parse is ignored with a warning rather
/// than aborting startup.
pub fn resolve<T>(cli: Option<T>, env_var: &str, toml: Option<T>, default: T) -> T
where
    T: FromStr,
{
    if let Some(value) = cli {
        return value;
    }

    if let Ok(raw) = std::env::var(env_var) {
        match raw.parse::<T>() {
            Ok(value) => return value,
            Err(_) => warn!("Ignoring unparseable {}={}", env_var, raw),
        }
    }

    toml.unwrap_or(default)
}
