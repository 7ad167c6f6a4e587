//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use mock_router::config::{parse_config, MockConfig};
use mock_router::{Dispatcher, HttpServer, Shutdown};

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<MockConfig>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a server for `toml` config text.
pub async fn start_server(toml: &str) -> TestServer {
    let config = parse_config(toml).expect("test config must be valid");
    spawn(HttpServer::new(config)).await
}

/// Start a server around a code-built dispatcher.
pub async fn start_with_dispatcher(dispatcher: Dispatcher) -> TestServer {
    spawn(HttpServer::with_dispatcher(dispatcher, MockConfig::default())).await
}

async fn spawn(server: HttpServer) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    TestServer { addr, shutdown, updates }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
