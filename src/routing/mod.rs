//! Path matching subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     "/users/{id}" + GET + payload
//!     → template.rs (parse, normalize, validate)
//!     → table.rs (walk/create trie nodes, store payload per method)
//!
//! Lookup:
//!     "/users/42" + GET
//!     → table.rs (cache → static shortcut → trie walk → wildcard fallback)
//!     → Return: payload + captured params, or no match
//! ```
//!
//! # Design Decisions
//! - Pure data structure: no I/O, no async
//! - Payload type is generic; the registry stores route indices
//! - Mutation needs `&mut`; readers share `&` (the cache is interior-mutable)

pub mod method;
pub mod table;
pub mod template;

use std::collections::BTreeMap;

pub use method::{Method, UnknownMethod};
pub use table::{MatchError, MatcherOptions, NodeKind, RouteMatch, RouteTable};
pub use template::{PathTemplate, Segment, TemplateError};

/// Captured path parameters, keyed by placeholder name.
pub type Params = BTreeMap<String, String>;
