//! Configuration loading for the fftiers service
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--config`, `--port`)
//! 2. Environment variables (`FFTIERS_CONFIG`, `FFTIERS_PORT`, `FFTIERS_LOG_LEVEL`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! A missing platform default file is not fatal: a warning is logged and
//! the built-in defaults are used. An explicitly named file must exist.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "FFTIERS_CONFIG";
/// Environment variable overriding the HTTP port
pub const PORT_ENV_VAR: &str = "FFTIERS_PORT";
/// Environment variable overriding the log level
pub const LOG_LEVEL_ENV_VAR: &str = "FFTIERS_LOG_LEVEL";
/// Upper bound for `cache.ttl_secs` and `cache.sweep_interval_secs` (one year)
pub const MAX_CACHE_SECS: u64 = 365 * 24 * 60 * 60;

/// Complete configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub tiers: TierConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
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

/// Tier computation defaults and request limits
#[derive(Debug, Clone, Deserialize)]
pub struct TierConfig {
    /// Tier count used when a request does not name one
    #[serde(default = "default_tiers")]
    pub default_tiers: usize,

    /// Requested tier counts are clamped to this ceiling
    #[serde(default = "default_max_tiers")]
    pub max_tiers: usize,

    /// Rank gap that opens a new tier in the rank-gap strategy
    #[serde(default = "default_gap_threshold")]
    pub gap_threshold: f64,

    /// Lower bound on the value-drop minimum tier size
    #[serde(default = "default_min_tier_size_floor")]
    pub min_tier_size_floor: usize,

    /// EM iteration ceiling
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// EM log-likelihood convergence tolerance
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            default_tiers: default_tiers(),
            max_tiers: default_max_tiers(),
            gap_threshold: default_gap_threshold(),
            min_tier_size_floor: default_min_tier_size_floor(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

/// Tier cache lifetime configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Entry time-to-live in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Interval between expired-entry sweeps in seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5740
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tiers() -> usize {
    6
}

fn default_max_tiers() -> usize {
    20
}

fn default_gap_threshold() -> f64 {
    3.0
}

fn default_min_tier_size_floor() -> usize {
    2
}

fn default_max_iterations() -> usize {
    100
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_ttl_secs() -> u64 {
    600 // 10 minutes
}

fn default_sweep_interval_secs() -> u64 {
    300 // 5 minutes
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Read and parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration following the documented priority order
    ///
    /// An explicitly named config file (CLI or environment) must parse;
    /// the platform default file is optional and falls back to defaults.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let explicit_path = overrides
            .config_path
            .clone()
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));

        let mut config = match explicit_path {
            Some(path) => {
                let config = Self::from_file(&path)?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    let config = Self::from_file(&path)?;
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                _ => {
                    warn!("No config file found, using built-in defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides()?;

        if let Some(port) = overrides.port {
            config.server.port = port;
        }
        if let Some(level) = &overrides.log_level {
            config.logging.level = level.clone();
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var(PORT_ENV_VAR) {
            self.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid {}: {}", PORT_ENV_VAR, e)))?;
        }
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV_VAR) {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Reject settings the tier engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.tiers.max_tiers == 0 {
            return Err(Error::Config("tiers.max_tiers must be at least 1".to_string()));
        }
        if self.tiers.default_tiers == 0 || self.tiers.default_tiers > self.tiers.max_tiers {
            return Err(Error::Config(format!(
                "tiers.default_tiers must be between 1 and {}",
                self.tiers.max_tiers
            )));
        }
        if !(self.tiers.gap_threshold.is_finite() && self.tiers.gap_threshold >= 0.0) {
            return Err(Error::Config(
                "tiers.gap_threshold must be a non-negative number".to_string(),
            ));
        }
        if self.tiers.max_iterations == 0 {
            return Err(Error::Config("tiers.max_iterations must be at least 1".to_string()));
        }
        if !(self.tiers.tolerance.is_finite() && self.tiers.tolerance >= 0.0) {
            return Err(Error::Config(
                "tiers.tolerance must be a non-negative number".to_string(),
            ));
        }
        if self.cache.ttl_secs > MAX_CACHE_SECS {
            return Err(Error::Config(format!(
                "cache.ttl_secs must be at most {}",
                MAX_CACHE_SECS
            )));
        }
        if self.cache.sweep_interval_secs == 0 || self.cache.sweep_interval_secs > MAX_CACHE_SECS {
            return Err(Error::Config(format!(
                "cache.sweep_interval_secs must be between 1 and {}",
                MAX_CACHE_SECS
            )));
        }
        Ok(())
    }
}

/// Platform config file location: `<config_dir>/fftiers/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fftiers").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.server.port, 5740);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.tiers.default_tiers, 6);
        assert_eq!(config.tiers.gap_threshold, 3.0);
        assert_eq!(config.cache.ttl_secs, 600);
        assert_eq!(config.cache.sweep_interval_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            [tiers]
            max_tiers = 12

            [cache]
            ttl_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.tiers.max_tiers, 12);
        assert_eq!(config.tiers.default_tiers, 6);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.sweep_interval_secs, 300);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = TomlConfig::from_toml_str("[tiers\nmax_tiers = ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_default_above_max() {
        let mut config = TomlConfig::default();
        config.tiers.max_tiers = 4;
        config.tiers.default_tiers = 6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_ttl_and_tolerance() {
        let mut config = TomlConfig::default();
        config.cache.ttl_secs = u64::MAX;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.cache.ttl_secs = MAX_CACHE_SECS;
        assert!(config.validate().is_ok());

        config.tiers.tolerance = f64::NAN;
        assert!(config.validate().is_err());
        config.tiers.tolerance = -1e-6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = TomlConfig::from_file(Path::new("/nonexistent/fftiers/config.toml"));
        match result {
            Err(Error::Io { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/fftiers/config.toml"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
