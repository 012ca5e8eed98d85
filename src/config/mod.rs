//! Configuration
//!
//! Loads the bridge properties from a TOML file, applies environment
//! overrides and produces the runtime configuration owned by the adapter.

use crate::sharepoint::{FieldLookup, DEFAULT_TIMEOUT};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable pointing at the configuration file
pub const CONFIG_PATH_ENV: &str = "SHAREPOINT_BRIDGE_CONFIG";
pub const SERVER_URL_ENV: &str = "SHAREPOINT_SERVER_URL";
pub const USERNAME_ENV: &str = "SHAREPOINT_USERNAME";
pub const PASSWORD_ENV: &str = "SHAREPOINT_PASSWORD";

const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required property: {0}")]
    MissingProperty(&'static str),

    #[error("Invalid property {name}: {reason}")]
    InvalidProperty {
        name: &'static str,
        reason: &'static str,
    },
}

/// Basic authentication credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SharePoint connection properties
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SharepointSection {
    #[serde(default)]
    pub server_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuerySection {
    #[serde(default)]
    pub field_lookup: FieldLookup,
}

/// Configuration file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sharepoint: SharepointSection,
    #[serde(default)]
    pub http: HttpSection,
    #[serde(default)]
    pub query: QuerySection,
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Load from `$SHAREPOINT_BRIDGE_CONFIG` or `./config.toml`, then apply
    /// environment overrides. A missing default file is not an error when the
    /// environment carries the properties.
    pub fn load_default() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load(path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load(DEFAULT_CONFIG_FILE)?,
            Err(_) => {
                tracing::debug!("No config file found, using environment only");
                Self::default()
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override connection properties from `lookup` (normally the process env)
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(SERVER_URL_ENV) {
            self.sharepoint.server_url = value;
        }
        if let Some(value) = lookup(USERNAME_ENV) {
            self.sharepoint.username = value;
        }
        if let Some(value) = lookup(PASSWORD_ENV) {
            self.sharepoint.password = value;
        }
    }

    /// Validate and convert into the adapter's runtime configuration
    pub fn to_runtime(&self) -> Result<AdapterConfig, ConfigError> {
        let section = &self.sharepoint;
        if section.username.trim().is_empty() {
            return Err(ConfigError::MissingProperty("Username"));
        }
        if section.password.is_empty() {
            return Err(ConfigError::MissingProperty("Password"));
        }
        if section.server_url.trim().is_empty() {
            return Err(ConfigError::MissingProperty("Server URL"));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::InvalidProperty {
                name: "timeout_secs",
                reason: "must be at least one second",
            });
        }

        Ok(AdapterConfig {
            server_url: section.server_url.trim().to_string(),
            credentials: Credentials::new(section.username.trim(), section.password.clone()),
            timeout: Duration::from_secs(self.http.timeout_secs),
            field_lookup: self.query.field_lookup,
        })
    }
}

/// Read-only configuration owned by an adapter instance
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub server_url: String,
    pub credentials: Credentials,
    pub timeout: Duration,
    pub field_lookup: FieldLookup,
}

impl AdapterConfig {
    pub fn new(
        server_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            credentials: Credentials::new(username, password),
            timeout: DEFAULT_TIMEOUT,
            field_lookup: FieldLookup::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_field_lookup(mut self, field_lookup: FieldLookup) -> Self {
        self.field_lookup = field_lookup;
        self
    }
}
