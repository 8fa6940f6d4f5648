//! Shared utilities for integration testing.

use std::net::SocketAddr;

use storefront_gate::config::{AppConfig, BootstrapAdmin};
use storefront_gate::lifecycle::{self, Shutdown};
use storefront_sdk::StorefrontClient;
use tokio::task::JoinHandle;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "Adm1n!Password";

/// A server running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client whose requests are keyed on `client` by the gate.
    pub fn client(&self, client: &str) -> StorefrontClient {
        StorefrontClient::new(&self.url()).with_forwarded_for(client)
    }

    /// Client logged in as the bootstrap administrator.
    #[allow(dead_code)]
    pub async fn admin(&self, client: &str) -> StorefrontClient {
        let mut admin = self.client(client);
        admin.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();
        admin
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        self.handle.await.unwrap();
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.auth.jwt_secret = "integration-test-secret-0123456789abcdef".into();
    config.auth.bcrypt_cost = 4;
    config.auth.bootstrap_admin = Some(BootstrapAdmin {
        email: ADMIN_EMAIL.into(),
        password: ADMIN_PASSWORD.into(),
    });
    config
}

pub async fn start_server(config: AppConfig) -> TestServer {
    let (server, listener) = lifecycle::start(config).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    TestServer {
        addr,
        shutdown,
        handle,
    }
}
