//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_ip.rs (resolve the client identifier)
//!     → rate_limit.rs (block list, then the sliding window)
//!     → handler (input.rs sanitizes and validates fields)
//!     → headers.rs (defensive headers on every response)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a blocked or rate-limited client never reaches a handler
//! - Blocking is permanent for the process lifetime; only an admin unblocks
//! - No trust in client input

pub mod client_ip;
pub mod headers;
pub mod input;
pub mod middleware;
pub mod rate_limit;
pub mod sweeper;

pub use middleware::{request_gate_middleware, ClientId};
pub use rate_limit::{GateDecision, GateRejection, RequestGate};
