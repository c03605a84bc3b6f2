
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_ENDPOINT_PATH: &str = "/mcp";
pub const DEFAULT_SERVER_NAME: &str = "Railway MCP Server";
pub const DEFAULT_INSTRUCTIONS: &str = "A demo MCP server with HTTP streaming deployed on Railway";
pub const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 30 * 60;

/// Route reserved for the health check
const HEALTH_PATH: &str = "/health";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,
    #[serde(default = "default_server_name")]
    pub name: String,
    #[serde(default = "default_instructions")]
    pub instructions: String,
    /// Seconds an HTTP session may stay quiet before it is evicted
    #[serde(default = "default_session_idle_timeout_secs")]
    pub session_idle_timeout_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Invalid host: {0:?}")]
    InvalidHost(String),
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid endpoint path: {0:?} (must start with '/' and not be /health)")]
    InvalidEndpointPath(String),
    #[error("Invalid server name: {0:?} (cannot be empty)")]
    InvalidName(String),
    #[error("Invalid session idle timeout: {0}s (must be at least 1)")]
    InvalidSessionTimeout(u64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_endpoint_path() -> String {
    DEFAULT_ENDPOINT_PATH.to_string()
}

fn default_server_name() -> String {
    DEFAULT_SERVER_NAME.to_string()
}

fn default_instructions() -> String {
    DEFAULT_INSTRUCTIONS.to_string()
}

const fn default_session_idle_timeout_secs() -> u64 {
    DEFAULT_SESSION_IDLE_TIMEOUT_SECS
}

impl Default for ServerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            endpoint_path: default_endpoint_path(),
            name: default_server_name(),
            instructions: default_instructions(),
            session_idle_timeout_secs: default_session_idle_timeout_secs(),
        }
    }
}

impl Config {
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".railway-mcp"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("railway-mcp"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load the default config file, falling back to defaults when absent
    #[inline]
    pub fn load() -> Result<Self> {
        let config_path =
            Self::config_file_path().context("Failed to determine config file path")?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load an explicitly named config file, which must exist
    #[inline]
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()).into());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .map_err(ConfigError::from)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Load `path` when given, otherwise the default location
    #[inline]
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        }
    }

    #[inline]
    pub fn save(&self) -> Result<PathBuf> {
        let config_path =
            Self::config_file_path().context("Failed to determine config file path")?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    #[inline]
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        if let Some(config_dir) = path.parent() {
            fs::create_dir_all(config_dir).with_context(|| {
                format!(
                    "Failed to create config directory: {}",
                    config_dir.display()
                )
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(ConfigError::from)
            .context("Failed to serialize config to TOML")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()
    }
}

impl ServerConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        validate_host(&self.host)?;
        validate_endpoint_path(&self.endpoint_path)?;

        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidName(self.name.clone()));
        }

        if self.session_idle_timeout_secs == 0 {
            return Err(ConfigError::InvalidSessionTimeout(
                self.session_idle_timeout_secs,
            ));
        }

        self.endpoint_url()?;
        Ok(())
    }

    #[inline]
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }

    /// Socket address string handed to the listener
    #[inline]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", url_host(&self.host), self.port)
    }

    /// Full URL of the MCP endpoint
    #[inline]
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let base = format!("http://{}:{}", url_host(&self.host), self.port);
        Url::parse(&base)
            .and_then(|url| url.join(&self.endpoint_path))
            .map_err(|_| ConfigError::InvalidUrl(format!("{}{}", base, self.endpoint_path)))
    }

    /// Apply command-line and environment overrides on top of file values
    #[inline]
    pub fn apply_overrides(
        &mut self,
        host: Option<String>,
        port: Option<u16>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = host {
            self.set_host(host)?;
        }
        if let Some(port) = port {
            self.set_port(port)?;
        }
        Ok(())
    }

    #[inline]
    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        validate_host(&host)?;
        self.host = host;
        Ok(())
    }

    #[inline]
    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    #[inline]
    pub fn set_endpoint_path(&mut self, endpoint_path: String) -> Result<(), ConfigError> {
        validate_endpoint_path(&endpoint_path)?;
        self.endpoint_path = endpoint_path;
        Ok(())
    }
}

/// IPv6 literals need brackets inside URLs and socket addresses
fn url_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}

fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.trim().is_empty() || host.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidHost(host.to_string()));
    }

    let url_str = format!("http://{}:{}", url_host(host), DEFAULT_PORT);
    let url = Url::parse(&url_str).map_err(|_| ConfigError::InvalidHost(host.to_string()))?;
    if url.path() != "/" || url.query().is_some() || !url.username().is_empty() {
        return Err(ConfigError::InvalidHost(host.to_string()));
    }

    Ok(())
}

fn validate_endpoint_path(path: &str) -> Result<(), ConfigError> {
    let valid = path.starts_with('/')
        && path != HEALTH_PATH
        && !path.contains("//")
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidEndpointPath(path.to_string()))
    }
}
