//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_JWT_SECRET: &str = "STOREFRONT_JWT_SECRET";
pub const ENV_BIND_ADDRESS: &str = "STOREFRONT_BIND_ADDRESS";
pub const ENV_RATE_LIMIT: &str = "STOREFRONT_RATE_LIMIT_PER_MINUTE";
pub const ENV_LOG_LEVEL: &str = "STOREFRONT_LOG_LEVEL";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, message: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, message } => write!(f, "Invalid {}: {}", var, message),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a TOML configuration file without validating it.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Overlay `STOREFRONT_*` environment variables onto `config`.
pub fn apply_env_overrides(config: &mut AppConfig) -> Result<(), ConfigError> {
    if let Ok(secret) = std::env::var(ENV_JWT_SECRET) {
        if !secret.is_empty() {
            config.auth.jwt_secret = secret;
        }
    }
    if let Ok(addr) = std::env::var(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr;
    }
    if let Ok(raw) = std::env::var(ENV_RATE_LIMIT) {
        config.rate_limit.per_minute = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::Env {
                var: ENV_RATE_LIMIT,
                message: e.to_string(),
            }
        })?;
    }
    if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
        config.observability.log_level = level;
    }
    Ok(())
}

/// Load the file (or defaults when `path` is `None`), apply the environment,
/// and validate the result.
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
