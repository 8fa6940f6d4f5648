//! Configuration validation.
//!
//! Returns every problem found rather than stopping at the first one.

use std::fmt;

use crate::auth::password::{validate_password_strength, MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::config::schema::AppConfig;
use crate::security::input::validate_email;

const MIN_SECRET_LEN: usize = 32;
/// One year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 365 * 24 * 60;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.auth.jwt_secret.len() < MIN_SECRET_LEN {
        errors.push(ValidationError::new(
            "auth.jwt_secret",
            format!("must be at least {} characters long", MIN_SECRET_LEN),
        ));
    }
    if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&config.auth.token_ttl_minutes) {
        errors.push(ValidationError::new(
            "auth.token_ttl_minutes",
            format!("must be between 1 and {}", MAX_TOKEN_TTL_MINUTES),
        ));
    }
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&config.auth.bcrypt_cost) {
        errors.push(ValidationError::new(
            "auth.bcrypt_cost",
            format!("must be between {} and {}", MIN_BCRYPT_COST, MAX_BCRYPT_COST),
        ));
    }
    if let Some(admin) = &config.auth.bootstrap_admin {
        if let Err(e) = validate_email(&admin.email) {
            errors.push(ValidationError::new("auth.bootstrap_admin.email", e.to_string()));
        }
        if let Err(rule) = validate_password_strength(&admin.password) {
            errors.push(ValidationError::new("auth.bootstrap_admin.password", rule.to_string()));
        }
    }
    if config.rate_limit.per_minute == 0 {
        errors.push(ValidationError::new("rate_limit.per_minute", "must be positive"));
    }
    if config.rate_limit.max_tracked_clients == 0 {
        errors.push(ValidationError::new("rate_limit.max_tracked_clients", "must be positive"));
    }
    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("rate_limit.sweep_interval_secs", "must be positive"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be positive"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be positive"));
    }
    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
