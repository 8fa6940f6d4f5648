//! Request gate middleware.
//!
//! Runs before any handler: resolves the client, consults the block list and
//! rate window, and stamps the defensive headers onto whatever goes back out.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::error::ApiError;
use crate::observability::metrics;
use crate::security::client_ip::resolve_client_identifier;
use crate::security::headers::apply_defensive_headers;
use crate::security::rate_limit::RequestGate;

/// Client identifier resolved by the gate, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

pub async fn request_gate_middleware(
    State(gate): State<Arc<RequestGate>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = resolve_client_identifier(request.headers(), peer, gate.trust_forwarded_headers());

    let mut response = match gate.admit(&client) {
        Ok(()) => {
            request.extensions_mut().insert(ClientId(client));
            next.run(request).await
        }
        Err(rejection) => {
            tracing::debug!(client = %client, reason = %rejection, "Request rejected by gate");
            ApiError::from(rejection).into_response()
        }
    };

    apply_defensive_headers(response.headers_mut());
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
