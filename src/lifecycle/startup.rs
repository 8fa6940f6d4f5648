//! Startup orchestration.
//!
//! Builds the identity store, the core components and the HTTP server from a
//! validated configuration, seeds the bootstrap administrator, and binds the
//! listener last.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::auth::AuthError;
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::http::{AppState, HttpServer};
use crate::identity::{IdentityStore, MemoryIdentityStore, StoreError};
use crate::observability::{SecurityEventSink, TracingEventSink};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load identity snapshot: {0}")]
    Store(#[from] StoreError),
    #[error("failed to seed bootstrap administrator: {0}")]
    Bootstrap(#[from] AuthError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Open the identity store configured under `storage`.
pub fn open_identity_store(config: &AppConfig) -> Result<Arc<dyn IdentityStore>, StartupError> {
    let store = match &config.storage.identity_snapshot_path {
        Some(path) => MemoryIdentityStore::load_from_file(Path::new(path))?,
        None => {
            tracing::warn!("No identity snapshot path configured; identities are lost on restart");
            MemoryIdentityStore::new(None)
        }
    };
    Ok(Arc::new(store))
}

/// Assemble the server and bind its listener.
pub async fn start(config: AppConfig) -> Result<(HttpServer, TcpListener), StartupError> {
    let store = open_identity_store(&config)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let events: Arc<dyn SecurityEventSink> = Arc::new(TracingEventSink);
    let state = AppState::from_config(&config, store, clock, events);

    if let Some(admin) = &config.auth.bootstrap_admin {
        let identity = state.authority.ensure_bootstrap_admin(admin).await?;
        tracing::info!(identity = %identity.id, "Bootstrap administrator ready");
    }

    let address = config.listener.bind_address.clone();
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(source) => return Err(StartupError::Bind { address, source }),
    };
    let local_addr = listener
        .local_addr()
        .map_err(|source| StartupError::Bind { address, source })?;

    tracing::info!(
        address = %local_addr,
        per_minute = config.rate_limit.per_minute,
        token_ttl_minutes = config.auth.token_ttl_minutes,
        "Listening for connections"
    );

    Ok((HttpServer::new(config, state), listener))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BootstrapAdmin;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.auth.jwt_secret = "startup-test-secret-with-32-bytes!!".into();
        config.auth.bcrypt_cost = 4;
        config
    }

    #[tokio::test]
    async fn test_start_seeds_bootstrap_admin() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("identities.json");

        let mut config = config();
        config.storage.identity_snapshot_path = Some(snapshot.display().to_string());
        config.auth.bootstrap_admin = Some(BootstrapAdmin {
            email: "root@example.com".into(),
            password: "B00tstrap!Admin".into(),
        });

        let (server, listener) = start(config.clone()).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
        let admin = server
            .state()
            .authority
            .authenticate("root@example.com", "B00tstrap!Admin")
            .await
            .unwrap();
        assert!(admin.is_admin);
        drop((server, listener));

        // a restart reuses the snapshot instead of registering again
        let (server, _listener) = start(config).await.unwrap();
        let again = server
            .state()
            .authority
            .authenticate("root@example.com", "B00tstrap!Admin")
            .await
            .unwrap();
        assert_eq!(again.id, admin.id);
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = config();
        config.listener.bind_address = taken.local_addr().unwrap().to_string();

        assert!(matches!(start(config).await, Err(StartupError::Bind { .. })));
    }
}
