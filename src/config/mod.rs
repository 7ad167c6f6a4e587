//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! mock.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (templates, ranges, duplicates)
//!     → MockConfig (validated, immutable)
//!     → mock::build_dispatcher
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs parses and validates the new text
//!     → HttpServer swaps in a freshly built dispatcher
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - An invalid reload is logged and ignored

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    DelayConfig, HookConfig, ListenerConfig, LogFormat, MatcherConfig, MockConfig, ObservabilityConfig,
    HeaderValues, ResponseConfig, RouteConfig, SourceConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
