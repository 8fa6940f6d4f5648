//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!     → security_events.rs (rate-limit breaches, block-list promotions, auth failures)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through all log lines of a request
//! - Security events use their own `security` target so they can be filtered apart

pub mod logging;
pub mod metrics;
pub mod security_events;

pub use security_events::{SecurityEvent, SecurityEventSink, TracingEventSink};
