//! Configuration schema definitions.
//!
//! Every field has a default so a minimal file only lists its routes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::registry::MatchEngine;
use crate::routing::{MatcherOptions, Method};

/// Root configuration for the mock server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MockConfig {
    pub listener: ListenerConfig,

    /// Path matching behavior.
    pub matcher: MatcherConfig,

    pub timeouts: TimeoutConfig,

    /// Simulated latency applied to every matched request.
    pub delay: DelayConfig,

    /// Headers added to every matched response.
    pub response: ResponseConfig,

    pub observability: ObservabilityConfig,

    /// Route sources, aggregated in file order.
    pub sources: Vec<SourceConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind_address: String,

    /// Largest request body accepted, in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MatcherConfig {
    #[serde(flatten)]
    pub options: MatcherOptions,

    pub engine: MatchEngine,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request deadline in milliseconds; 0 disables it.
    pub request_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_ms: 30_000 }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DelayConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A group of routes and hooks sharing a base path.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Identifier for logging.
    pub name: Option<String>,

    /// Prefix applied to every route and hook below.
    pub base: Option<String>,

    pub routes: Vec<RouteConfig>,

    pub hooks: Vec<HookConfig>,
}

/// One mocked endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path template; `"POST /search/{name}"` sugar is accepted.
    pub path: String,

    /// Overrides any method prefix in `path`.
    #[serde(default)]
    pub method: Option<Method>,

    #[serde(default = "default_status")]
    pub status: u16,

    /// Response body. Strings may reference request data as `{{name}}`.
    #[serde(default)]
    pub body: Option<Value>,

    /// A list value sends the header once per entry.
    #[serde(default)]
    pub headers: BTreeMap<String, HeaderValues>,

    /// Fixed latency for this route, overriding `[delay]`.
    #[serde(default)]
    pub delay_ms: Option<u64>,

    #[serde(default)]
    pub meta: Map<String, Value>,

    #[serde(default)]
    pub props: Value,
}

fn default_status() -> u16 {
    200
}

/// A header given as one value or as a list of values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl HeaderValues {
    pub fn values(&self) -> &[String] {
        match self {
            HeaderValues::One(value) => std::slice::from_ref(value),
            HeaderValues::Many(values) => values,
        }
    }
}

/// Declarative hook that sets response headers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HookConfig {
    /// Scope below the source base; unset covers the whole source.
    pub base: Option<String>,

    pub order: i32,

    pub headers: BTreeMap<String, String>,
}
