//! TOML-based configuration for EduDesk
//!
//! Server, authentication, database and sharing settings are read from a TOML
//! file (`edudesk.toml`). Every section has defaults, so an empty file is a
//! valid configuration as long as the referenced secrets are set.
//!
//! Secrets are never written in the file itself: the `[auth]` section names
//! the environment variables that hold them.

use crate::auth::jwt::TokenCodec;
use crate::links::{
    ShareLinkIssuer, DEFAULT_LINK_LENGTH, DEFAULT_MAX_ATTEMPTS, DEFAULT_PIN_LENGTH,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure loaded from edudesk.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EduConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sharing: SharingConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============= Authentication Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable name containing the access token secret
    #[serde(default = "default_access_secret_env")]
    pub access_secret_env: String,

    /// Environment variable name containing the refresh token secret
    #[serde(default = "default_refresh_secret_env")]
    pub refresh_secret_env: String,

    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: i64,

    #[serde(default = "default_refresh_ttl_minutes")]
    pub refresh_ttl_minutes: i64,
}

fn default_access_secret_env() -> String {
    "EDUDESK_ACCESS_SECRET".to_string()
}

fn default_refresh_secret_env() -> String {
    "EDUDESK_REFRESH_SECRET".to_string()
}

fn default_access_ttl_minutes() -> i64 {
    60
}

fn default_refresh_ttl_minutes() -> i64 {
    180
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret_env: default_access_secret_env(),
            refresh_secret_env: default_refresh_secret_env(),
            access_ttl_minutes: default_access_ttl_minutes(),
            refresh_ttl_minutes: default_refresh_ttl_minutes(),
        }
    }
}

// ============= Database Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local database path, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Environment variable for Turso URL (optional cloud config)
    pub turso_url_env: Option<String>,

    /// Environment variable for Turso auth token
    pub turso_token_env: Option<String>,
}

fn default_database_url() -> String {
    "./data/edudesk.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            turso_url_env: None,
            turso_token_env: None,
        }
    }
}

// ============= Sharing Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharingConfig {
    #[serde(default = "default_link_length")]
    pub link_length: usize,

    #[serde(default = "default_pin_length")]
    pub pin_length: usize,

    /// Insert attempts before a link collision is reported
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_link_length() -> usize {
    DEFAULT_LINK_LENGTH
}

fn default_pin_length() -> usize {
    DEFAULT_PIN_LENGTH
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            link_length: default_link_length(),
            pin_length: default_pin_length(),
            max_attempts: default_max_attempts(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl EduConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_unchecked(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without validating it
    pub fn load_unchecked<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (access, refresh) = self.secrets()?;

        if access.is_empty() || refresh.is_empty() {
            return Err(ConfigError::ValidationError(
                "Token secrets must not be empty".to_string(),
            ));
        }
        if access == refresh {
            return Err(ConfigError::ValidationError(
                "Access and refresh secrets must differ".to_string(),
            ));
        }

        if self.auth.access_ttl_minutes <= 0 || self.auth.refresh_ttl_minutes <= 0 {
            return Err(ConfigError::ValidationError(
                "Token lifetimes must be positive".to_string(),
            ));
        }

        // Validate database env vars if specified
        if let Some(ref env) = self.database.turso_url_env {
            self.validate_env_var(env)?;
        }
        if let Some(ref env) = self.database.turso_token_env {
            self.validate_env_var(env)?;
        }

        if self.sharing.link_length < 8 {
            return Err(ConfigError::ValidationError(
                "Share links must be at least 8 characters".to_string(),
            ));
        }
        if !(4..=12).contains(&self.sharing.pin_length) {
            return Err(ConfigError::ValidationError(
                "PIN length must be between 4 and 12".to_string(),
            ));
        }
        if self.sharing.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        if !matches!(self.server.log_format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(format!(
                "Unknown log format '{}'",
                self.server.log_format
            )));
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok()
    }

    /// The access and refresh secrets, in that order
    pub fn secrets(&self) -> Result<(String, String), ConfigError> {
        let access = self
            .resolve_env(&self.auth.access_secret_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.auth.access_secret_env.clone()))?;
        let refresh = self
            .resolve_env(&self.auth.refresh_secret_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.auth.refresh_secret_env.clone()))?;
        Ok((access, refresh))
    }

    pub fn token_codec(&self) -> Result<TokenCodec, ConfigError> {
        let (access, refresh) = self.secrets()?;
        Ok(TokenCodec::new(&access, &refresh))
    }

    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.auth.access_ttl_minutes)
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.auth.refresh_ttl_minutes)
    }

    pub fn link_issuer(&self) -> ShareLinkIssuer {
        ShareLinkIssuer::new(
            self.sharing.link_length,
            self.sharing.pin_length,
            self.sharing.max_attempts,
        )
    }

    /// Socket address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Starter configuration written by `edudesk-server init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# EduDesk server configuration

[server]
host = "127.0.0.1"
port = 3000
log_level = "info"
# "pretty" or "json"
log_format = "pretty"

[auth]
# Names of the environment variables holding the token secrets.
# The two secrets must differ.
access_secret_env = "EDUDESK_ACCESS_SECRET"
refresh_secret_env = "EDUDESK_REFRESH_SECRET"
access_ttl_minutes = 60
refresh_ttl_minutes = 180

[database]
url = "./data/edudesk.db"
# turso_url_env = "TURSO_DATABASE_URL"
# turso_token_env = "TURSO_AUTH_TOKEN"

[sharing]
link_length = 11
pin_length = 6
max_attempts = 5
"#;
