//! Resilience subsystem: infrastructure middleware wrapping the dispatch chain.
//!
//! # Data Flow
//! ```text
//! Matched request:
//!     → timeouts.rs (order -100: race the rest of the chain against a deadline)
//!     → delay.rs (order -50: simulated latency with jitter)
//!     → hooks and handler
//! ```
//!
//! # Design Decisions
//! - Negative orders keep infrastructure outside every user hook
//! - A timed-out handler is not cancelled; its late writes are refused by
//!   the response's single-termination check

pub mod delay;
pub mod timeouts;

pub use delay::{Delay, DELAY_META_KEY, DELAY_ORDER};
pub use timeouts::{Timeout, TIMEOUT_ORDER};
