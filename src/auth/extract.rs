//! Request extractors that resolve the bearer token to an identity.
//!
//! Handlers ask for the weakest guarantee they need:
//! - `CurrentIdentity`: valid token for an existing, enabled identity
//! - `ActiveIdentity`: the same guarantee, named for routes that act on the account
//! - `AdminIdentity`: the above, and the account carries the administrator flag
//!
//! Disabled accounts never get past `TokenAuthority::verify_token`, so none of
//! the extractors re-check the active flag.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use super::{AuthError, TokenAuthority};
use crate::http::error::ApiError;
use crate::identity::Identity;
use crate::observability::metrics;

const BEARER_PREFIX: &str = "bearer ";

/// Pull the token out of `Authorization: Bearer <token>`. The scheme is case-insensitive.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let prefix = value.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = value[BEARER_PREFIX.len()..].trim();
    (!token.is_empty()).then_some(token)
}

#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    Arc<TokenAuthority>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            metrics::record_auth_failure(AuthError::MissingToken.reason());
            return Err(AuthError::MissingToken.into());
        };
        let authority = Arc::<TokenAuthority>::from_ref(state);
        let identity = authority.verify_token(token).await?;
        Ok(CurrentIdentity(identity))
    }
}

#[derive(Debug, Clone)]
pub struct ActiveIdentity(pub Identity);

impl<S> FromRequestParts<S> for ActiveIdentity
where
    Arc<TokenAuthority>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentIdentity(identity) = CurrentIdentity::from_request_parts(parts, state).await?;
        Ok(ActiveIdentity(identity))
    }
}

#[derive(Debug, Clone)]
pub struct AdminIdentity(pub Identity);

impl<S> FromRequestParts<S> for AdminIdentity
where
    Arc<TokenAuthority>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ActiveIdentity(identity) = ActiveIdentity::from_request_parts(parts, state).await?;
        let identity = TokenAuthority::require_admin(identity)?;
        Ok(AdminIdentity(identity))
    }
}
