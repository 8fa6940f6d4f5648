//! Registration, login and the current-identity endpoint.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::auth::{ActiveIdentity, NewIdentity, TokenAuthority};
use crate::http::{ApiForm, ApiJson, ApiResult};
use crate::identity::IdentityView;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// OAuth2 password-flow form. `username` carries the email.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: IdentityView,
}

pub async fn register(
    State(authority): State<Arc<TokenAuthority>>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<IdentityView>)> {
    let identity = authority
        .register(NewIdentity {
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(identity.view())))
}

pub async fn login(
    State(authority): State<Arc<TokenAuthority>>,
    ApiForm(form): ApiForm<LoginForm>,
) -> ApiResult<Json<LoginResponse>> {
    let identity = authority.authenticate(&form.username, &form.password).await?;
    let access_token = authority.issue_token(&identity, authority.token_ttl())?;

    tracing::info!(identity = %identity.id, "Login succeeded");
    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer",
        user: identity.view(),
    }))
}

pub async fn me(ActiveIdentity(identity): ActiveIdentity) -> Json<IdentityView> {
    Json(identity.view())
}
