//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer stack, request gate)
//!     → api/ handlers (extractors resolve bearer tokens)
//!     → error.rs (core failures mapped to status + JSON body)
//!     → Send to client
//! ```

pub mod error;
pub mod extract;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use extract::{ApiForm, ApiJson};
pub use server::{AppState, HttpServer};
