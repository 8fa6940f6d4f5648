//! Token authority subsystem.
//!
//! # Data Flow
//! ```text
//! login / register
//!     → password.rs (strength policy, bcrypt hash/verify)
//!     → token.rs (issue signed token: sub = identity id, exp = now + ttl)
//!
//! protected request
//!     → extract.rs (Authorization: Bearer <token>)
//!     → token.rs (signature → expiry → identity lookup → active flag)
//!     → handler receives CurrentIdentity / ActiveIdentity / AdminIdentity
//! ```
//!
//! # Design Decisions
//! - Tokens are stateless; validity is signature + expiry + identity state
//! - No server-side revocation: a token lives until it expires
//! - Every verification failure is terminal for the request, never retried

pub mod extract;
pub mod password;
pub mod token;

use thiserror::Error;

use crate::identity::StoreError;
use crate::security::input::InputError;

pub use extract::{ActiveIdentity, AdminIdentity, CurrentIdentity};
pub use password::PasswordRule;
pub use token::{Claims, NewIdentity, TokenAuthority};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token signature or payload")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token subject does not resolve to an identity")]
    UnknownSubject,
    #[error("account is disabled")]
    InactiveAccount,
    #[error("insufficient privileges")]
    InsufficientPrivilege,
    #[error("incorrect email or password")]
    InvalidCredentials,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("identity not found")]
    NotFound,
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    WeakPassword(#[from] PasswordRule),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error("identity store: {0}")]
    Store(StoreError),
}

impl AuthError {
    /// Short label used in logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired",
            AuthError::UnknownSubject => "unknown_subject",
            AuthError::InactiveAccount => "inactive_account",
            AuthError::InsufficientPrivilege => "insufficient_privilege",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::DuplicateEmail => "duplicate_email",
            AuthError::NotFound => "not_found",
            AuthError::Input(_) => "invalid_input",
            AuthError::WeakPassword(_) => "weak_password",
            AuthError::Hashing(_) => "hashing",
            AuthError::Signing(_) => "signing",
            AuthError::Store(_) => "store",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            other => AuthError::Store(other),
        }
    }
}
