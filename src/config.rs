//! TOML-based service configuration.

use std::fmt;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::Deserialize;

use crate::auth::Role;
use crate::error::GarduError;

/// Top-level configuration parsed from TOML.
///
/// Every section has defaults, so an empty file (or no file at all, via
/// [`AppConfig::default`]) yields a working local setup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// SQLite database location.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Dashboard alert thresholds.
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    /// Bearer tokens and their roles.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Log filter.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// SQLite database location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path to the database file; `":memory:"` keeps everything in memory.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "gardu.db".to_string(),
        }
    }
}

/// Dashboard alert thresholds, in percent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdsConfig {
    /// INDUK load at or above which a substation is listed as overloaded.
    pub overload_percent: f64,
    /// Phase imbalance at or above which a row is listed as unbalanced.
    pub unbalance_percent: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            overload_percent: 80.0,
            unbalance_percent: 20.0,
        }
    }
}

/// Access tokens. Empty means access control is off.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub tokens: Vec<TokenConfig>,
}

/// One configured token, stored as its SHA-256 hex digest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    pub role: Role,
    pub sha256: String,
}

/// Log filter, in `tracing_subscriber::EnvFilter` syntax.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"server.port"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl From<ConfigError> for GarduError {
    fn from(err: ConfigError) -> Self {
        GarduError::Config(format!("{}: {}", err.field, err.message))
    }
}

impl AppConfig {
    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Socket address built from `server.host` and `server.port`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the host is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.server.host.parse().map_err(|_| ConfigError {
            field: "server.host".into(),
            message: format!("\"{}\" is not an IP address", self.server.host),
        })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = self.socket_addr() {
            errors.push(e);
        }

        if self.database.path.trim().is_empty() {
            errors.push(ConfigError {
                field: "database.path".into(),
                message: "must not be empty".into(),
            });
        }

        let th = &self.thresholds;
        if th.overload_percent.is_nan() || th.overload_percent <= 0.0 {
            errors.push(ConfigError {
                field: "thresholds.overload_percent".into(),
                message: "must be > 0".into(),
            });
        }
        if th.unbalance_percent.is_nan() || th.unbalance_percent <= 0.0 {
            errors.push(ConfigError {
                field: "thresholds.unbalance_percent".into(),
                message: "must be > 0".into(),
            });
        }

        for (i, token) in self.auth.tokens.iter().enumerate() {
            let digest = token.sha256.trim();
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                errors.push(ConfigError {
                    field: format!("auth.tokens[{i}].sha256"),
                    message: "must be a 64-character hex SHA-256 digest".into(),
                });
            }
        }

        if self.logging.filter.trim().is_empty() {
            errors.push(ConfigError {
                field: "logging.filter".into(),
                message: "must not be empty".into(),
            });
        }

        errors
    }
}
