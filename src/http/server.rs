//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (tracing, request ID)
//! - Bridge each request into the dispatcher and back
//! - Swap in a rebuilt dispatcher when the config changes
//!
//! # Design Decisions
//! - The response is sent as soon as it ends, even if the chain is still
//!   running (e.g. a timed-out handler)
//! - Unmatched requests fall back to a JSON 404
//! - A matched route that produced nothing is closed with an empty body

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::MockConfig;
use crate::dispatch::{Dispatcher, Outcome, ResponseContext};
use crate::error::DispatchError;
use crate::http::request::into_context;
use crate::http::response::{error_response, into_response};
use crate::mock::build_dispatcher;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ArcSwap<Dispatcher>>,
    pub max_body_size: usize,
}

/// HTTP front end for the mock dispatcher.
pub struct HttpServer {
    router: Router,
    state: AppState,
    config: MockConfig,
}

impl HttpServer {
    pub fn new(config: MockConfig) -> Self {
        Self::with_dispatcher(build_dispatcher(&config), config)
    }

    /// Serve a dispatcher built elsewhere, e.g. with code-defined routes.
    pub fn with_dispatcher(dispatcher: Dispatcher, config: MockConfig) -> Self {
        let state = AppState {
            dispatcher: Arc::new(ArcSwap::from_pointee(dispatcher)),
            max_body_size: config.listener.max_body_size,
        };
        let router = Self::build_router(state.clone());
        Self { router, state, config }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(mock_handler)
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The dispatcher currently serving requests.
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.state.dispatcher.load_full()
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// Serve until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<MockConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;

        match self.dispatcher().registry().setup().await {
            Ok(routes) => tracing::info!(address = %addr, routes = routes.len(), "HTTP server starting"),
            Err(e) => tracing::error!(address = %addr, error = %e, "HTTP server starting with a broken registry"),
        }

        let swap = self.state.dispatcher.clone();
        let updater = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                let next = build_dispatcher(&config);
                match next.registry().setup().await {
                    Ok(routes) => {
                        swap.store(Arc::new(next));
                        tracing::info!(routes = routes.len(), "Dispatcher reloaded");
                    }
                    Err(e) => tracing::error!(error = %e, "Reloaded routes failed to load, keeping current set"),
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        updater.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: dispatch and wait for the response to end.
async fn mock_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let req = match into_context(request, state.max_body_size).await {
        Ok(req) => req,
        Err(err) => return error_response(&err),
    };

    let dispatcher = state.dispatcher.load_full();
    let res = ResponseContext::new();
    let worker = {
        let res = res.clone();
        tokio::spawn(async move {
            match dispatcher.dispatch(req, &res).await {
                Outcome::Unmatched(req) => {
                    res.fail(&DispatchError::NotFound {
                        method: req.method(),
                        path: req.path().to_string(),
                    });
                }
                Outcome::Handled => {
                    res.end_empty();
                }
            }
        })
    };

    tokio::select! {
        _ = res.done() => {}
        joined = worker => {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Dispatch task failed");
                res.fail(&DispatchError::Handler(e.to_string()));
            }
        }
    }

    into_response(res.snapshot())
}
