//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → build registry → first request (or warm-up) runs setup once
//!
//! Reload:
//!     Config change → new registry generation → dispatcher swapped in
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → broadcast → server drains, watcher stops
//! ```
//!
//! # Design Decisions
//! - Setup is memoized with a single-flight cell; failures are replayed
//! - Shutdown is a broadcast every long-running task subscribes to

pub mod shutdown;
pub mod single_flight;

pub use shutdown::Shutdown;
pub use single_flight::SingleFlight;
