//! Mock HTTP server.
//!
//! ```text
//!   Client ──▶ http (axum) ──▶ Dispatcher ──▶ Registry ──▶ RouteTable
//!                                  │
//!                                  ▼
//!                timeout → delay → headers → hooks → MockResponder
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use mock_router::config::{load_config, ConfigWatcher, MockConfig};
use mock_router::observability::{logging, metrics};
use mock_router::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "mock-router")]
#[command(about = "Serve mocked HTTP routes from a TOML file", long_about = None)]
struct Args {
    /// Route configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload routes when the config file changes.
    #[arg(short, long)]
    watch: bool,

    /// Override the listener address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => MockConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "mock-router starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        sources = config.sources.len(),
        engine = ?config.matcher.engine,
        request_timeout_ms = config.timeouts.request_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let (updates, _watcher) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (rx, Some(watcher.run()?))
        }
        _ => (mpsc::unbounded_channel().1, None),
    };

    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(config);
    let server_task = tokio::spawn(server.run(listener, updates, shutdown.subscribe()));

    tokio::signal::ctrl_c().await?;
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
