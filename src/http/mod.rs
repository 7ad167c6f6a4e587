//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum, request ID and trace layers)
//!     → request.rs (buffer body, build RequestContext)
//!     → Dispatcher
//!     → response.rs (FinalResponse to HTTP response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{into_context, X_REQUEST_ID};
pub use response::{error_response, into_response};
pub use server::{AppState, HttpServer};
