//! Request routing and dispatch engine for mock HTTP servers.
//!
//! Routes are registered from sources (code or config), matched with a
//! segment trie and run through an ordered middleware chain whose response
//! is finalized exactly once.

// Core
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod routing;

// Mocks and transport
pub mod http;
pub mod mock;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::MockConfig;
pub use dispatch::{Dispatcher, Outcome, Payload, RequestContext, ResponseContext};
pub use error::{BoxError, DispatchError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use registry::{Hook, Module, Registry, Route};
pub use routing::{Method, RouteTable};
