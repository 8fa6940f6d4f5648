//! Defensive response headers.
//!
//! Applied to every response leaving the service, error responses included.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const DEFENSIVE_HEADERS: [(&str, &str); 6] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "geolocation=(), microphone=(), camera=()"),
];

pub fn apply_defensive_headers(headers: &mut HeaderMap) {
    for (name, value) in DEFENSIVE_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
}
