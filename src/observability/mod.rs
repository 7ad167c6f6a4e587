//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! matcher / registry / pipeline / transport
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout (pretty or compact)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the transport into every dispatch event
//! - Metric calls are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
