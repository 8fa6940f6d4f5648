//! Route handlers consuming the core.
//!
//! # Routes
//! ```text
//! GET    /api/                               welcome message
//! GET    /api/health                         liveness + gate statistics
//! POST   /api/auth/register                  create identity (JSON)
//! POST   /api/auth/login                     form login, returns bearer token
//! GET    /api/auth/me                        current active identity
//! POST   /api/contact                        contact form capture
//! POST   /api/quotes                         quote request capture (status "pending")
//! POST   /api/newsletter/subscribe           idempotent subscription
//! POST   /api/newsletter/unsubscribe         deactivate subscription
//! POST   /api/admin/users/{email}/promote    grant administrator flag
//! POST   /api/admin/users/{email}/disable    disable account
//! POST   /api/admin/users/{email}/enable     enable account
//! GET    /api/admin/security/blocked         list block-list entries
//! DELETE /api/admin/security/blocked/{client} remove a block-list entry
//! ```
//!
//! Every route sits behind the request gate; see `http::server`.

pub mod admin;
pub mod auth;
pub mod contact;
pub mod status;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::http::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api", get(status::root))
        .route("/api/", get(status::root))
        .route("/api/health", get(status::health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/contact", post(contact::submit_contact))
        .route("/api/quotes", post(contact::submit_quote))
        .route("/api/newsletter/subscribe", post(contact::subscribe))
        .route("/api/newsletter/unsubscribe", post(contact::unsubscribe))
        .route("/api/admin/users/{email}/promote", post(admin::promote))
        .route("/api/admin/users/{email}/disable", post(admin::disable))
        .route("/api/admin/users/{email}/enable", post(admin::enable))
        .route("/api/admin/security/blocked", get(admin::list_blocked))
        .route("/api/admin/security/blocked/{client}", delete(admin::unblock))
}
