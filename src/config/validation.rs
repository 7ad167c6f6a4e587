//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every route template parses
//! - Validate value ranges (status codes, delay bounds, addresses)
//! - Check route headers are valid HTTP
//! - Detect duplicate route definitions
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};

use crate::config::schema::MockConfig;
use crate::registry::{resolve_path, split_method_prefix};
use crate::routing::{Method, PathTemplate};

/// One semantic problem in a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted location, e.g. `sources[0].routes[2].status`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &MockConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.observability.metrics_enabled && config.observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }
    if config.delay.min_ms > config.delay.max_ms {
        errors.push(ValidationError::new(
            "delay",
            format!("min_ms ({}) exceeds max_ms ({})", config.delay.min_ms, config.delay.max_ms),
        ));
    }

    let options = &config.matcher.options;
    let mut seen: HashSet<(Method, String)> = HashSet::new();

    for (s, source) in config.sources.iter().enumerate() {
        for (r, route) in source.routes.iter().enumerate() {
            let field = format!("sources[{s}].routes[{r}]");

            if !(100..=599).contains(&route.status) {
                errors.push(ValidationError::new(
                    format!("{field}.status"),
                    format!("{} is not an HTTP status", route.status),
                ));
            }

            for (name, values) in &route.headers {
                let valid = HeaderName::from_bytes(name.as_bytes()).is_ok()
                    && values.values().iter().all(|v| HeaderValue::from_str(v).is_ok());
                if !valid {
                    errors.push(ValidationError::new(
                        format!("{field}.headers.{name}"),
                        "not a valid HTTP header",
                    ));
                }
            }

            let (prefix, path) = split_method_prefix(&route.path);
            if let (Some(a), Some(b)) = (prefix, route.method) {
                if a != b {
                    errors.push(ValidationError::new(
                        format!("{field}.method"),
                        format!("{b} conflicts with path prefix {a}"),
                    ));
                }
            }
            let method = route.method.or(prefix).unwrap_or(Method::All);

            let resolved = resolve_path(source.base.as_deref(), path);
            match PathTemplate::parse(&resolved, options) {
                Ok(template) => {
                    if !seen.insert((method, template.as_str().to_string())) {
                        errors.push(ValidationError::new(
                            format!("{field}.path"),
                            format!("{method} {resolved} is defined more than once"),
                        ));
                    }
                }
                Err(e) => errors.push(ValidationError::new(format!("{field}.path"), e.to_string())),
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{HeaderValues, RouteConfig, SourceConfig};

    fn route(path: &str) -> RouteConfig {
        RouteConfig {
            path: path.to_string(),
            method: None,
            status: 200,
            body: None,
            headers: Default::default(),
            delay_ms: None,
            meta: Default::default(),
            props: Default::default(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MockConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = MockConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.delay.min_ms = 50;
        config.delay.max_ms = 10;

        let mut bad_status = route("/x");
        bad_status.status = 42;
        config.sources.push(SourceConfig {
            routes: vec![bad_status, route("/a/**/b/**")],
            ..Default::default()
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "delay",
                "sources[0].routes[0].status",
                "sources[0].routes[1].path",
            ]
        );
    }

    #[test]
    fn test_duplicates_detected_after_base_resolution() {
        let mut config = MockConfig::default();
        config.sources.push(SourceConfig {
            base: Some("/api".to_string()),
            routes: vec![route("GET /users")],
            ..Default::default()
        });
        config.sources.push(SourceConfig {
            routes: vec![route("GET /api/users/"), route("POST /api/users")],
            ..Default::default()
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "sources[1].routes[0].path");
    }

    #[test]
    fn test_invalid_route_header() {
        let mut config = MockConfig::default();
        let mut r = route("/cookies");
        r.headers.insert(
            "set-cookie".to_string(),
            HeaderValues::Many(vec!["a=1".to_string(), "b=\n2".to_string()]),
        );
        r.headers.insert("x-ok".to_string(), HeaderValues::One("fine".to_string()));
        config.sources.push(SourceConfig {
            routes: vec![r],
            ..Default::default()
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "sources[0].routes[0].headers.set-cookie");
    }

    #[test]
    fn test_method_conflict() {
        let mut config = MockConfig::default();
        let mut r = route("GET /x");
        r.method = Some(Method::Post);
        config.sources.push(SourceConfig {
            routes: vec![r],
            ..Default::default()
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "sources[0].routes[0].method");
    }
}
