//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext + ResponseContext (built by a transport shim)
//!     → pipeline.rs (registry setup, match, bind params and meta)
//!     → chain.rs (global middleware + scoped hooks by order, then the handler)
//!     → pipeline.rs (errors and panics to error responses, finalize result)
//!     → response.rs (single terminal write, done() waiters released)
//! ```
//!
//! # Design Decisions
//! - Unmatched requests are handed back to the caller for its fallback
//! - A link proceeds only by calling `Next::run`
//! - Contexts are owned per request; the response is a shared handle so
//!   infrastructure middleware can race the handler to finalize it

pub mod chain;
pub mod headers;
pub mod pipeline;
pub mod request;
pub mod response;

pub use chain::{Handler, HandlerResult, Middleware, Next};
pub use pipeline::{Dispatcher, Outcome};
pub use headers::Headers;
pub use request::RequestContext;
pub use response::{FinalResponse, Payload, ResponseContext};
