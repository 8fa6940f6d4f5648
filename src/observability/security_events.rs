//! Security event sink.
//!
//! Fire-and-forget: emitting an event never fails and never blocks on I/O.

use std::fmt;

use crate::observability::metrics;

/// A security-relevant occurrence worth recording apart from request logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityEvent {
    /// A client went over its per-minute allowance.
    RateLimitExceeded { client: String, attempts: usize },
    /// A client was promoted to the block list.
    ClientBlocked { client: String, attempts: usize },
    /// A request from an already blocked client was turned away.
    BlockedRequestRejected { client: String },
    /// A token or login could not be authenticated.
    AuthenticationFailed { reason: &'static str, subject: Option<String> },
}

impl SecurityEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SecurityEvent::RateLimitExceeded { .. } => "rate_limit_exceeded",
            SecurityEvent::ClientBlocked { .. } => "client_blocked",
            SecurityEvent::BlockedRequestRejected { .. } => "blocked_request_rejected",
            SecurityEvent::AuthenticationFailed { .. } => "authentication_failed",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Receives security events.
pub trait SecurityEventSink: Send + Sync {
    fn log(&self, event: SecurityEvent);
}

/// Writes events to the `security` tracing target and bumps the matching counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl SecurityEventSink for TracingEventSink {
    fn log(&self, event: SecurityEvent) {
        match &event {
            SecurityEvent::RateLimitExceeded { client, attempts } => {
                tracing::warn!(target: "security", event = event.kind(), client = %client, attempts, "Rate limit exceeded");
                metrics::record_rate_limited("rate_limit");
            }
            SecurityEvent::ClientBlocked { client, attempts } => {
                tracing::error!(target: "security", event = event.kind(), client = %client, attempts, "Client blocked for excessive requests");
                metrics::record_rate_limited("block_promotion");
            }
            SecurityEvent::BlockedRequestRejected { client } => {
                tracing::debug!(target: "security", event = event.kind(), client = %client, "Blocked client rejected");
                metrics::record_rate_limited("blocked");
            }
            SecurityEvent::AuthenticationFailed { reason, subject } => {
                tracing::warn!(target: "security", event = event.kind(), reason, subject = ?subject, "Authentication failed");
                metrics::record_auth_failure(*reason);
            }
        }
    }
}
