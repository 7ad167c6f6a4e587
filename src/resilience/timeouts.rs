//! Request deadline enforcement.
//!
//! # Responsibilities
//! - Start a timer when the chain is entered
//! - Write a 504 error response if the chain has not produced one in time
//!
//! # Design Decisions
//! - The inner chain keeps running on its own task after the deadline
//! - Whichever side ends the response first wins; the other write is dropped

use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::dispatch::{HandlerResult, Middleware, Next, RequestContext, ResponseContext};
use crate::error::DispatchError;

/// Chain position of the timeout middleware.
pub const TIMEOUT_ORDER: i32 = -100;

#[derive(Debug, Clone, Copy)]
pub struct Timeout {
    limit: Duration,
}

impl Timeout {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }
}

impl Middleware for Timeout {
    fn handle(&self, req: RequestContext, res: ResponseContext, next: Next) -> BoxFuture<'static, HandlerResult> {
        let limit = self.limit;
        let route = req.route_path().unwrap_or_default().to_string();
        let request_id = req.request_id().map(str::to_string);

        Box::pin(async move {
            let mut inner = next.run(req);
            tokio::select! {
                out = &mut inner => out,
                _ = tokio::time::sleep(limit) => {
                    if res.fail(&DispatchError::Timeout(limit)) {
                        tracing::warn!(
                            request_id = request_id.as_deref().unwrap_or("-"),
                            route = %route,
                            timeout_ms = limit.as_millis() as u64,
                            "Request timed out"
                        );
                    }
                    tokio::spawn(async move {
                        if let Err(e) = inner.await {
                            tracing::debug!(route = %route, error = %e, "Timed-out handler failed late");
                        }
                    });
                    Ok(None)
                }
            }
        })
    }
}
