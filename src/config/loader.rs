//! Configuration loading from disk.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::config::schema::MockConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<MockConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<MockConfig, ConfigError> {
    let config: MockConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MatchEngine;
    use crate::routing::Method;

    const SAMPLE: &str = r#"
        [listener]
        bind_address = "127.0.0.1:4000"

        [matcher]
        case_sensitive = true
        cache_size = 0
        engine = "linear"

        [timeouts]
        request_ms = 500

        [response.headers]
        x-mock = "yes"

        [[sources]]
        name = "users"
        base = "/api"

        [[sources.routes]]
        path = "GET /users/{id}"
        body = { id = "{{id}}", name = "Ada" }
        delay_ms = 5

        [[sources.routes]]
        path = "/users"
        method = "POST"
        status = 201
        headers = { set-cookie = ["session=1", "theme=dark"], location = "/users/1" }

        [[sources.hooks]]
        headers = { x-source = "users" }
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:4000");
        assert_eq!(config.listener.max_body_size, 2 * 1024 * 1024);
        assert!(config.matcher.options.case_sensitive);
        assert_eq!(config.matcher.options.cache_size, 0);
        assert_eq!(config.matcher.engine, MatchEngine::Linear);
        assert_eq!(config.timeouts.request_ms, 500);
        assert_eq!(config.response.headers["x-mock"], "yes");

        let source = &config.sources[0];
        assert_eq!(source.base.as_deref(), Some("/api"));
        assert_eq!(source.routes[0].status, 200);
        assert_eq!(source.routes[0].delay_ms, Some(5));
        assert_eq!(source.routes[1].method, Some(Method::Post));
        assert_eq!(source.routes[1].status, 201);
        assert_eq!(source.routes[1].headers["set-cookie"].values(), ["session=1", "theme=dark"]);
        assert_eq!(source.routes[1].headers["location"].values(), ["/users/1"]);
        assert_eq!(source.hooks[0].headers["x-source"], "users");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:3000");
        assert_eq!(config.timeouts.request_ms, 30_000);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        assert!(matches!(parse_config("[listener"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/mock.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
