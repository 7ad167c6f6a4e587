//! Simulated latency with jitter.

use std::time::Duration;

use futures_util::future::BoxFuture;
use rand::Rng;

use crate::dispatch::{HandlerResult, Middleware, Next, RequestContext, ResponseContext};

/// Chain position of the delay middleware.
pub const DELAY_ORDER: i32 = -50;

/// Route meta key holding a fixed per-route delay in milliseconds.
pub const DELAY_META_KEY: &str = "delay_ms";

/// Sleeps before the rest of the chain runs.
#[derive(Debug, Clone, Copy)]
pub struct Delay {
    min_ms: u64,
    max_ms: u64,
}

impl Delay {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: max_ms.max(min_ms),
        }
    }

    /// A delay drawn uniformly from `[min_ms, max_ms]`.
    pub fn sample(&self) -> Duration {
        if self.max_ms == 0 {
            return Duration::ZERO;
        }
        let ms = if self.min_ms == self.max_ms {
            self.min_ms
        } else {
            rand::thread_rng().gen_range(self.min_ms..=self.max_ms)
        };
        Duration::from_millis(ms)
    }

    fn delay_for(&self, req: &RequestContext) -> Duration {
        match req.meta().get(DELAY_META_KEY).and_then(|v| v.as_u64()) {
            Some(ms) => Duration::from_millis(ms),
            None => self.sample(),
        }
    }
}

impl Middleware for Delay {
    fn handle(&self, req: RequestContext, _res: ResponseContext, next: Next) -> BoxFuture<'static, HandlerResult> {
        let delay = self.delay_for(&req);
        Box::pin(async move {
            if !delay.is_zero() {
                tracing::trace!(delay_ms = delay.as_millis() as u64, "Simulating latency");
                tokio::time::sleep(delay).await;
            }
            next.run(req).await
        })
    }
}
