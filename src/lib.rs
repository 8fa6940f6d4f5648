//! Storefront backend core: token authority, request gate and input sanitization.

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod http;
pub mod identity;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
