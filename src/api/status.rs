use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::security::RequestGate;

#[derive(Debug, Serialize)]
pub struct Welcome {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub tracked_clients: usize,
    pub blocked_clients: usize,
}

pub async fn root() -> Json<Welcome> {
    Json(Welcome {
        message: "Welcome to the storefront API",
    })
}

pub async fn health(State(gate): State<Arc<RequestGate>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        tracked_clients: gate.tracked_clients(),
        blocked_clients: gate.blocked_clients().len(),
    })
}
