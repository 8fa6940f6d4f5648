//! Administrator endpoints: role and status changes, block-list management.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::auth::{AdminIdentity, TokenAuthority};
use crate::http::error::{ApiError, ApiResult};
use crate::identity::IdentityView;
use crate::security::RequestGate;

#[derive(Debug, Serialize)]
pub struct BlockedClients {
    pub clients: Vec<String>,
}

pub async fn promote(
    AdminIdentity(admin): AdminIdentity,
    State(authority): State<Arc<TokenAuthority>>,
    Path(email): Path<String>,
) -> ApiResult<Json<IdentityView>> {
    let identity = authority.set_admin(&email, true).await?;
    tracing::info!(admin = %admin.id, target_identity = %identity.id, "Administrator flag granted");
    Ok(Json(identity.view()))
}

pub async fn disable(
    AdminIdentity(admin): AdminIdentity,
    State(authority): State<Arc<TokenAuthority>>,
    Path(email): Path<String>,
) -> ApiResult<Json<IdentityView>> {
    let identity = authority.set_active(&email, false).await?;
    tracing::info!(admin = %admin.id, target_identity = %identity.id, "Account disabled");
    Ok(Json(identity.view()))
}

pub async fn enable(
    AdminIdentity(admin): AdminIdentity,
    State(authority): State<Arc<TokenAuthority>>,
    Path(email): Path<String>,
) -> ApiResult<Json<IdentityView>> {
    let identity = authority.set_active(&email, true).await?;
    tracing::info!(admin = %admin.id, target_identity = %identity.id, "Account enabled");
    Ok(Json(identity.view()))
}

pub async fn list_blocked(
    _admin: AdminIdentity,
    State(gate): State<Arc<RequestGate>>,
) -> Json<BlockedClients> {
    Json(BlockedClients {
        clients: gate.blocked_clients(),
    })
}

pub async fn unblock(
    AdminIdentity(admin): AdminIdentity,
    State(gate): State<Arc<RequestGate>>,
    Path(client): Path<String>,
) -> ApiResult<StatusCode> {
    if gate.unblock(&client) {
        tracing::info!(admin = %admin.id, client = %client, "Block-list entry removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Client is not blocked".into()))
    }
}
