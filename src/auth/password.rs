//! Password hashing via bcrypt and the password strength policy.

use thiserror::Error;

use super::AuthError;

pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

pub const MIN_PASSWORD_LEN: usize = 8;
const SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Hash a password with bcrypt at `cost`.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Hashing(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Hashing(format!("bcrypt verify: {e}")))
}

/// The first strength rule a password failed. Rules are checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PasswordRule {
    #[error("Password must be at least 8 characters long")]
    MinLength,
    #[error("Password must contain at least one uppercase letter")]
    Uppercase,
    #[error("Password must contain at least one lowercase letter")]
    Lowercase,
    #[error("Password must contain at least one digit")]
    Digit,
    #[error("Password must contain at least one special character")]
    Symbol,
}

pub fn validate_password_strength(password: &str) -> Result<(), PasswordRule> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordRule::MinLength);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordRule::Uppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PasswordRule::Lowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordRule::Digit);
    }
    if !password.chars().any(|c| SYMBOLS.contains(c)) {
        return Err(PasswordRule::Symbol);
    }
    Ok(())
}
