//! Route registry subsystem.
//!
//! # Data Flow
//! ```text
//! Route sources (static modules, setup callbacks)
//!     → store.rs (single-flight aggregation per generation)
//!     → route.rs (resolve base paths, "METHOD /path" sugar, `@` absolute paths)
//!     → route_set.rs (dedupe, sort by specificity, index into the trie)
//!     → Arc<RouteSet> shared by every in-flight request
//! ```
//!
//! # Design Decisions
//! - A RouteSet is immutable; reload builds a new one and swaps it in
//! - A route defined twice for the same method and path keeps the last definition
//! - Hooks inherit their source's base path as scope

pub mod route;
pub mod route_set;
pub mod source;
pub mod store;

use thiserror::Error;

use crate::routing::{MatchError, TemplateError};

pub use route::{resolve_path, split_method_prefix, Hook, Route};
pub use route_set::{MatchEngine, MatchedRoute, RouteInfo, RouteSet};
pub use source::{setup_fn, Module, RouteSource, SetupFn};
pub use store::Registry;

/// Errors raised while aggregating or querying routes.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("route source {source_name} failed: {message}")]
    Source { source_name: String, message: String },

    #[error("invalid route {path}: {error}")]
    Template {
        path: String,
        #[source]
        error: TemplateError,
    },

    #[error(transparent)]
    Match(#[from] MatchError),
}
