//! Sliding-window rate limiting with block-list escalation.
//!
//! Each client has a window of accepted request timestamps from the trailing
//! 60 seconds, plus the denied attempts from the same span. A client is denied
//! once it has `per_minute` accepted requests in the window, and is blocked for
//! the life of the process once its attempts in the window reach twice that.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashSet;
use thiserror::Error;

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::observability::{metrics, SecurityEvent, SecurityEventSink};

/// Length of the trailing window.
pub const WINDOW_SECS: i64 = 60;

/// Attempts within one window, as a multiple of the limit, that put a client on the block list.
pub const BLOCK_MULTIPLIER: usize = 2;

/// Outcome of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    RateLimited,
    Blocked,
}

/// Why the gate turned a request away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateRejection {
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("IP address blocked due to excessive requests")]
    Blocked,
}

#[derive(Debug, Default)]
struct RateWindow {
    accepted: VecDeque<DateTime<Utc>>,
    rejected: VecDeque<DateTime<Utc>>,
}

impl RateWindow {
    /// Drop every timestamp at or before `cutoff`.
    fn prune(&mut self, cutoff: DateTime<Utc>) {
        while self.accepted.front().is_some_and(|t| *t <= cutoff) {
            self.accepted.pop_front();
        }
        while self.rejected.front().is_some_and(|t| *t <= cutoff) {
            self.rejected.pop_front();
        }
    }

    fn is_idle(&self) -> bool {
        self.accepted.is_empty() && self.rejected.is_empty()
    }

    fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.accepted.back().max(self.rejected.back()).copied()
    }
}

/// Shared rate-window table and block list.
pub struct RequestGate {
    windows: Mutex<HashMap<String, RateWindow>>,
    blocked: DashSet<String>,
    per_minute: usize,
    max_tracked_clients: usize,
    trust_forwarded_headers: bool,
    clock: Arc<dyn Clock>,
    events: Arc<dyn SecurityEventSink>,
}

impl RequestGate {
    pub fn new(
        config: &RateLimitConfig,
        clock: Arc<dyn Clock>,
        events: Arc<dyn SecurityEventSink>,
    ) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            blocked: DashSet::new(),
            per_minute: config.per_minute,
            max_tracked_clients: config.max_tracked_clients,
            trust_forwarded_headers: config.trust_forwarded_headers,
            clock,
            events,
        }
    }

    pub fn per_minute(&self) -> usize {
        self.per_minute
    }

    pub fn trust_forwarded_headers(&self) -> bool {
        self.trust_forwarded_headers
    }

    pub fn is_blocked(&self, client: &str) -> bool {
        self.blocked.contains(client)
    }

    /// Full gate check with the configured limit: block list first, then the window.
    pub fn admit(&self, client: &str) -> Result<(), GateRejection> {
        if self.is_blocked(client) {
            self.events.log(SecurityEvent::BlockedRequestRejected {
                client: client.to_string(),
            });
            return Err(GateRejection::Blocked);
        }
        match self.check_and_record(client, self.per_minute) {
            GateDecision::Allowed => Ok(()),
            GateDecision::RateLimited => Err(GateRejection::RateLimited),
            GateDecision::Blocked => Err(GateRejection::Blocked),
        }
    }

    /// Prune the client's window, then either record the request or deny it.
    pub fn check_and_record(&self, client: &str, per_minute_limit: usize) -> GateDecision {
        let now = self.clock.now();
        let cutoff = now - Duration::seconds(WINDOW_SECS);

        let (decision, attempts) = {
            let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
            if self.blocked.contains(client) {
                return GateDecision::Blocked;
            }

            if !windows.contains_key(client) && windows.len() >= self.max_tracked_clients {
                Self::make_room(&mut windows, cutoff, self.max_tracked_clients);
            }

            let window = windows.entry(client.to_string()).or_default();
            window.prune(cutoff);

            let accepted = window.accepted.len();
            if accepted < per_minute_limit {
                window.accepted.push_back(now);
                (GateDecision::Allowed, accepted + 1)
            } else {
                let attempts = accepted + window.rejected.len();
                if attempts >= BLOCK_MULTIPLIER * per_minute_limit {
                    windows.remove(client);
                    self.blocked.insert(client.to_string());
                    (GateDecision::Blocked, attempts)
                } else {
                    window.rejected.push_back(now);
                    (GateDecision::RateLimited, attempts + 1)
                }
            }
        };

        match decision {
            GateDecision::Allowed => {}
            GateDecision::RateLimited => self.events.log(SecurityEvent::RateLimitExceeded {
                client: client.to_string(),
                attempts,
            }),
            GateDecision::Blocked => {
                self.events.log(SecurityEvent::ClientBlocked {
                    client: client.to_string(),
                    attempts,
                });
                metrics::record_gate_size(self.tracked_clients(), self.blocked.len());
            }
        }
        decision
    }

    /// Evict idle windows, then the least recently active ones, until there is room for one more.
    fn make_room(windows: &mut HashMap<String, RateWindow>, cutoff: DateTime<Utc>, cap: usize) {
        windows.retain(|_, window| {
            window.prune(cutoff);
            !window.is_idle()
        });
        while windows.len() >= cap {
            let oldest = windows
                .iter()
                .min_by_key(|(_, window)| window.last_activity())
                .map(|(client, _)| client.clone());
            match oldest {
                Some(client) => {
                    windows.remove(&client);
                }
                None => break,
            }
        }
    }

    /// Drop windows whose timestamps have all aged out. Returns how many were removed.
    pub fn sweep_idle(&self) -> usize {
        let cutoff = self.clock.now() - Duration::seconds(WINDOW_SECS);
        let (removed, remaining) = {
            let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
            let before = windows.len();
            windows.retain(|_, window| {
                window.prune(cutoff);
                !window.is_idle()
            });
            (before - windows.len(), windows.len())
        };
        metrics::record_gate_size(remaining, self.blocked.len());
        removed
    }

    /// Number of clients with a live rate window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.lock().expect("rate limiter mutex poisoned").len()
    }

    /// Block-list members, sorted.
    pub fn blocked_clients(&self) -> Vec<String> {
        let mut clients: Vec<String> = self.blocked.iter().map(|c| c.key().clone()).collect();
        clients.sort();
        clients
    }

    /// Out-of-band removal from the block list. The gate never does this on its own.
    pub fn unblock(&self, client: &str) -> bool {
        let removed = self.blocked.remove(client).is_some();
        if removed {
            tracing::info!(target: "security", client = %client, "Client unblocked");
            metrics::record_gate_size(self.tracked_clients(), self.blocked.len());
        }
        removed
    }
}
