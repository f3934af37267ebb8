//! Bootstrap configuration loading and config-file discovery
//!
//! Configuration sources, highest priority first:
//! 1. Command-line arguments / environment variables (applied by the binary)
//! 2. TOML config file
//! 3. Compiled defaults
//!
//! A missing config file is not an error: the service logs a warning and
//! starts with compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name used under the platform config/data directories
pub const APP_DIR: &str = "scb";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    /// HTTP bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub google: GoogleConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
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

/// Which blob store backs the result cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// One JSON file per block in `cache.dir`
    #[default]
    File,
    /// SQLite table in `cache.database_path`
    Sqlite,
    /// Process memory (lost on restart)
    Memory,
}

/// Result cache configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Cache directory for the file backend (defaults under the data dir)
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Database file for the sqlite backend (defaults under the data dir)
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl CacheConfig {
    /// Cache directory, falling back to the platform default
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| default_data_dir().join("sheets-cache"))
    }

    /// SQLite path, falling back to the platform default
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("sheets-cache.db"))
    }
}

/// Google Sheets API configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GoogleConfig {
    /// API key (public or link-shared sheets)
    #[serde(default)]
    pub api_key: Option<String>,

    /// OAuth bearer token (private sheets)
    #[serde(default)]
    pub access_token: Option<String>,

    /// Sheets API base URL
    #[serde(default = "default_google_base_url")]
    pub base_url: String,

    /// Minimum spacing between batch reads
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            access_token: None,
            base_url: default_google_base_url(),
            min_request_interval_ms: default_min_request_interval_ms(),
        }
    }
}

/// Which column establishes the row domain the badge column aligns to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowDomainSource {
    /// Flattened label column length
    #[default]
    Labels,
    /// Flattened length of the first overlay column
    FirstOverlay,
}

/// Batch fetch pipeline configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Column holding per-row badges; unset means no badges are fetched
    #[serde(default)]
    pub badge_column: Option<String>,

    #[serde(default)]
    pub row_domain_source: RowDomainSource,

    /// Row window `[start, end]` used when a range string cannot be parsed
    #[serde(default = "default_row_window")]
    pub default_row_window: [u32; 2],

    /// Timeout around the single batched provider read
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            badge_column: None,
            row_domain_source: RowDomainSource::default(),
            default_row_window: default_row_window(),
            provider_timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_google_base_url() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}

fn default_min_request_interval_ms() -> u64 {
    1000
}

fn default_row_window() -> [u32; 2] {
    [2, 13]
}

fn default_provider_timeout_secs() -> u64 {
    30
}

/// OS-dependent data directory for caches
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./scb_data"))
}

/// Locate the config file for `module`
///
/// Order: explicit path, then `<config_dir>/scb/<module>.toml`, then
/// `/etc/scb/<module>.toml` on Linux. Returns `None` when nothing exists.
pub fn locate_config_file(explicit: Option<&Path>, module: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let file_name = format!("{}.toml", module);

    if let Some(user) = dirs::config_dir().map(|d| d.join(APP_DIR).join(&file_name)) {
        if user.exists() {
            return Some(user);
        }
    }

    if cfg!(target_os = "linux") {
        let system = PathBuf::from("/etc").join(APP_DIR).join(&file_name);
        if system.exists() {
            return Some(system);
        }
    }

    None
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    parse_toml_config(&content)
}

/// Parse TOML config text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Load config for `module`, degrading to compiled defaults
///
/// An explicitly named file that cannot be read or parsed is an error;
/// a discovered file that fails to parse is logged and ignored.
pub fn load_or_default(explicit: Option<&Path>, module: &str) -> Result<TomlConfig> {
    match locate_config_file(explicit, module) {
        Some(path) => match load_toml_config(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(e) if explicit.is_some() => Err(e),
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Ok(TomlConfig::with_defaults())
            }
        },
        None => {
            warn!("No config file found for {}, using compiled defaults", module);
            Ok(TomlConfig::with_defaults())
        }
    }
}

impl TomlConfig {
    /// Compiled defaults (serde defaults applied to an empty document)
    pub fn with_defaults() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logging: LoggingConfig::default(),
            cache: CacheConfig::default(),
            google: GoogleConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_matches_defaults() {
        let config = parse_toml_config("").unwrap();
        assert_eq!(config, TomlConfig::with_defaults());
        assert_eq!(config.port, 5780);
        assert_eq!(config.pipeline.default_row_window, [2, 13]);
        assert_eq!(config.pipeline.badge_column, None);
    }

    #[test]
    fn test_row_domain_source_snake_case() {
        let config = parse_toml_config("[pipeline]\nrow_domain_source = \"first_overlay\"\n").unwrap();
        assert_eq!(config.pipeline.row_domain_source, RowDomainSource::FirstOverlay);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = parse_toml_config("[cache]\nbackend = \"redis\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_resolved_cache_paths_prefer_explicit() {
        let cache = CacheConfig {
            backend: CacheBackend::File,
            dir: Some(PathBuf::from("/tmp/scb-cache")),
            database_path: None,
        };
        assert_eq!(cache.resolved_dir(), PathBuf::from("/tmp/scb-cache"));
        assert!(cache.resolved_database_path().ends_with("sheets-cache.db"));
    }
}
