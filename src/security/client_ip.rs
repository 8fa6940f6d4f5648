//! Client identifier resolution.
//!
//! Trust boundary: `X-Forwarded-For` and `X-Real-IP` are client-controlled
//! unless a reverse proxy in front of this service overwrites them. With
//! `trust_forwarded` off only the transport peer address is used.

use std::net::SocketAddr;

use axum::http::HeaderMap;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Pick the identifier the rate limiter keys on.
///
/// Precedence: first `X-Forwarded-For` entry, then `X-Real-IP`, then the peer
/// address, then `"unknown"`.
pub fn resolve_client_identifier(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded: bool,
) -> String {
    if trust_forwarded {
        let forwarded = header_str(headers, X_FORWARDED_FOR)
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(client) = forwarded {
            return client.to_string();
        }

        if let Some(real_ip) = header_str(headers, X_REAL_IP).map(str::trim).filter(|v| !v.is_empty()) {
            return real_ip.to_string();
        }
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN_CLIENT.to_string(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
