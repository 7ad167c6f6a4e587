//! Config-driven mocks.
//!
//! # Data Flow
//! ```text
//! MockConfig
//!     → source.rs (one ConfigSource per [[sources]] table)
//!     → Registry
//!     → Dispatcher + timeout, delay and default-header middleware
//! ```

pub mod responder;
pub mod source;

use std::sync::Arc;

use crate::config::MockConfig;
use crate::dispatch::Dispatcher;
use crate::registry::Registry;
use crate::resilience::{Delay, Timeout, DELAY_ORDER, TIMEOUT_ORDER};

pub use responder::{render, MockResponder, SetHeaders};
pub use source::ConfigSource;

/// Chain position of the default response headers.
pub const DEFAULT_HEADERS_ORDER: i32 = -10;

/// Registry holding every configured source.
pub fn build_registry(config: &MockConfig) -> Registry {
    let registry = Registry::new(config.matcher.options.clone()).with_engine(config.matcher.engine);
    for (index, source) in config.sources.iter().enumerate() {
        registry.use_source(ConfigSource::new(index, source.clone()));
    }
    registry
}

/// Dispatcher with the infrastructure middleware the config asks for.
pub fn build_dispatcher(config: &MockConfig) -> Dispatcher {
    let mut dispatcher = Dispatcher::new(Arc::new(build_registry(config)))
        .with_middleware(DELAY_ORDER, Delay::new(config.delay.min_ms, config.delay.max_ms));

    if config.timeouts.request_ms > 0 {
        dispatcher = dispatcher.with_middleware(TIMEOUT_ORDER, Timeout::from_millis(config.timeouts.request_ms));
    }
    if !config.response.headers.is_empty() {
        dispatcher = dispatcher.with_middleware(
            DEFAULT_HEADERS_ORDER,
            SetHeaders::new(config.response.headers.clone()),
        );
    }
    dispatcher
}
