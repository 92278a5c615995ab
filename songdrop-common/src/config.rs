//! Configuration loading
//!
//! Resolution priority (highest first):
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables (`SONGDROP_*`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing config file is not an error: a warning is logged and defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const ENV_CONFIG_PATH: &str = "SONGDROP_CONFIG";
/// Environment variable overriding `backend.url`
pub const ENV_BACKEND_URL: &str = "SONGDROP_BACKEND_URL";
/// Environment variable overriding `backend.api_key`
pub const ENV_API_KEY: &str = "SONGDROP_API_KEY";
/// Environment variable overriding `server.port`
pub const ENV_PORT: &str = "SONGDROP_PORT";

/// Default HTTP port for the form service
pub const DEFAULT_PORT: u16 = 5740;

/// Complete TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub submission: SubmissionConfig,
    pub logging: LoggingConfig,
}

/// Local HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Largest file body accepted by `POST /api/form/files/:slot`
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

/// Hosted backend connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub url: Option<String>,
    /// Public (anon) API key
    pub api_key: Option<String>,
    /// Connect timeout, and total timeout for row and signing calls
    ///
    /// File uploads have no total timeout.
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            request_timeout_secs: 60,
        }
    }
}

/// Table and bucket names
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub table: String,
    pub song_bucket: String,
    pub cover_bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            table: "songs".to_string(),
            song_bucket: "songs".to_string(),
            cover_bucket: "covers".to_string(),
        }
    }
}

/// OAuth sign-in settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    pub provider: String,
    /// Where the provider sends the browser after sign-in
    pub redirect_to: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider: "github".to_string(),
            redirect_to: None,
        }
    }
}

/// Which file selections must be present before a submission starts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SubmissionConfig {
    pub require_song: bool,
    pub require_cover: bool,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            require_song: true,
            require_cover: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, overridable with `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Apply `SONGDROP_*` environment overrides in place
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_BACKEND_URL) {
            self.backend.url = Some(url);
        }
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            self.backend.api_key = Some(key);
        }
        if let Ok(port) = std::env::var(ENV_PORT) {
            match port.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid {}={}", ENV_PORT, port),
            }
        }
    }

    /// Backend URL, trimmed of trailing slashes
    ///
    /// Fails when the URL is absent or blank.
    pub fn backend_url(&self) -> Result<String> {
        match self.backend.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url.trim_end_matches('/').to_string()),
            _ => Err(Error::Config(format!(
                "Backend URL not configured. Set [backend] url in the config file or {}",
                ENV_BACKEND_URL
            ))),
        }
    }

    /// Backend API key; fails when absent or blank
    pub fn api_key(&self) -> Result<String> {
        match self.backend.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ => Err(Error::Config(format!(
                "Backend API key not configured. Set [backend] api_key in the config file or {}",
                ENV_API_KEY
            ))),
        }
    }

    /// Check everything the service needs before it can start
    pub fn validate(&self) -> Result<()> {
        self.backend_url()?;
        self.api_key()?;
        if self.storage.table.trim().is_empty() {
            return Err(Error::Config("storage.table must not be empty".to_string()));
        }
        if self.storage.song_bucket.trim().is_empty() || self.storage.cover_bucket.trim().is_empty()
        {
            return Err(Error::Config("storage bucket names must not be empty".to_string()));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(Error::Config("server.max_upload_bytes must be positive".to_string()));
        }
        Ok(())
    }
}

/// Locates and loads the TOML config file
pub struct ConfigResolver {
    explicit_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// `explicit_path` usually comes from the `--config` CLI argument
    pub fn new(explicit_path: Option<PathBuf>) -> Self {
        Self { explicit_path }
    }

    /// Config file path: CLI → `SONGDROP_CONFIG` → platform config dir
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit_path {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            return Some(PathBuf::from(path));
        }
        default_config_path()
    }

    /// Load the config file (or defaults) and apply environment overrides
    ///
    /// Only a file that exists but cannot be parsed is an error.
    pub fn load(&self) -> Result<TomlConfig> {
        let mut config = match self.config_path() {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                TomlConfig::from_file(&path)?
            }
            Some(path) => {
                warn!("Config file {} not found, using defaults", path.display());
                TomlConfig::default()
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                TomlConfig::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }
}

/// `~/.config/songdrop/config.toml` on Linux, the platform equivalent elsewhere
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("songdrop").join("config.toml"))
}
