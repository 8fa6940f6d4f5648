//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (request gate, CORS, limits, timeouts, tracing, request ID)
//! - Bind server to listener
//! - Run the idle-window sweeper alongside the server
//! - Stop on the shutdown broadcast

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::FromRef,
    http::HeaderValue,
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any as CorsAny, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api::{self, contact::SubmissionStore};
use crate::auth::TokenAuthority;
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::http::error::ApiError;
use crate::identity::IdentityStore;
use crate::observability::SecurityEventSink;
use crate::security::{request_gate_middleware, sweeper::run_sweeper, RequestGate};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub authority: Arc<TokenAuthority>,
    pub gate: Arc<RequestGate>,
    pub submissions: Arc<SubmissionStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Assemble the core components from configuration and their collaborators.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn SecurityEventSink>,
    ) -> Self {
        let authority = Arc::new(TokenAuthority::new(
            &config.auth,
            store,
            clock.clone(),
            events.clone(),
        ));
        let gate = Arc::new(RequestGate::new(&config.rate_limit, clock.clone(), events));
        Self {
            authority,
            gate,
            submissions: Arc::new(SubmissionStore::new()),
            clock,
        }
    }
}

impl FromRef<AppState> for Arc<TokenAuthority> {
    fn from_ref(state: &AppState) -> Self {
        state.authority.clone()
    }
}

impl FromRef<AppState> for Arc<RequestGate> {
    fn from_ref(state: &AppState) -> Self {
        state.gate.clone()
    }
}

impl FromRef<AppState> for Arc<SubmissionStore> {
    fn from_ref(state: &AppState) -> Self {
        state.submissions.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Clock> {
    fn from_ref(state: &AppState) -> Self {
        state.clock.clone()
    }
}

/// HTTP server for the storefront API.
pub struct HttpServer {
    router: Router,
    state: AppState,
    config: AppConfig,
}

impl HttpServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            state,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Outermost first: request id, trace, request id propagation, request
    /// gate, CORS, body limit, panic capture, timeout.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let gate = state.gate.clone();
        api::router()
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(cors_layer(&config.security.cors_origins))
            .layer(middleware::from_fn_with_state(gate, request_gate_middleware))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for driving the service without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = tokio::spawn(run_sweeper(
            self.state.gate.clone(),
            Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
            shutdown.resubscribe(),
        ));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        if let Err(e) = sweeper.await {
            tracing::warn!(error = %e, "Sweeper task ended abnormally");
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(CorsAny).allow_headers(CorsAny);
    if origins.is_empty() {
        return layer.allow_origin(CorsAny);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    ApiError::Internal(format!("handler panicked: {message}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::identity::MemoryIdentityStore;
    use crate::observability::security_events::testing::RecordingSink;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    fn server(per_minute: usize) -> HttpServer {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "server-test-secret-at-least-32-bytes!".into();
        config.auth.bcrypt_cost = 4;
        config.rate_limit.per_minute = per_minute;

        let state = AppState::from_config(
            &config,
            Arc::new(MemoryIdentityStore::new(None)),
            Arc::new(ManualClock::default()),
            Arc::new(RecordingSink::default()),
        );
        HttpServer::new(config, state)
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header("x-forwarded-for", "192.0.2.10")
            .body(Body::empty())
            .unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let server = server(60);
        let response = server.router().oneshot(get("/api/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(json(response).await["message"], "Welcome to the storefront API");

        let response = server.router().oneshot(get("/api/health")).await.unwrap();
        let body = json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["trackedClients"], 1);
    }

    #[tokio::test]
    async fn test_unknown_route_still_gated_and_hardened() {
        let server = server(1);
        let response = server.router().oneshot(get("/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

        let response = server.router().oneshot(get("/api/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_register_login_me() {
        let server = server(60);
        let register = Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"email":"Buyer@Example.com","password":"Sh0pping!Cart","firstName":"Bea"}"#,
            ))
            .unwrap();
        let response = server.router().oneshot(register).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json(response).await;
        assert_eq!(body["email"], "buyer@example.com");
        assert_eq!(body["firstName"], "Bea");

        let login = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("username=buyer%40example.com&password=Sh0pping%21Cart"))
            .unwrap();
        let response = server.router().oneshot(login).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["token_type"], "bearer");
        let token = body["access_token"].as_str().unwrap().to_string();

        let me = Request::builder()
            .uri("/api/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = server.router().oneshot(me).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["email"], "buyer@example.com");
    }

    #[tokio::test]
    async fn test_contact_validation_reports_field() {
        let server = server(60);
        let contact = Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"name":"Ada","email":"ada@example.com","phone":"0123","message":"Hi"}"#,
            ))
            .unwrap();
        let response = server.router().oneshot(contact).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["field"], "phone");
        assert_eq!(server.state().submissions.contact_count(), 0);
    }

    fn post(path: &str, content_type: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_malformed_bodies_get_json_errors() {
        let server = server(60);
        let cases = [
            post("/api/auth/register", "application/json", r#"{"email":"a@example.com"}"#),
            post("/api/contact", "application/json", "{not json"),
            post("/api/auth/login", "application/x-www-form-urlencoded", "username=x"),
            post("/api/quotes", "text/plain", "{}"),
        ];

        for request in cases {
            let response = server.router().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
            assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
            let body = json(response).await;
            assert!(!body["detail"].as_str().unwrap().is_empty());
        }
        assert_eq!(server.state().submissions.contact_count(), 0);
    }

    #[tokio::test]
    async fn test_quote_request_created() {
        let server = server(60);
        let request = post(
            "/api/quotes",
            "application/json",
            r#"{"name":"Lin","email":"lin@example.com","project_description":"Kiosk"}"#,
        );
        let response = server.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json(response).await;
        assert_eq!(body["status"], "pending");
        assert_eq!(body["projectDescription"], "Kiosk");
        assert_eq!(server.state().submissions.quote_count(), 1);
    }

    #[test]
    fn test_panic_handler_hides_message() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
