//! Method tokens used as keys in the per-node payload tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An HTTP verb, or the `all` sentinel that matches any verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Connect,
    Trace,
    All,
}

/// Returned when a method token is not a known HTTP verb.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown HTTP method: {0}")]
pub struct UnknownMethod(pub String);

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Head => "head",
            Method::Post => "post",
            Method::Put => "put",
            Method::Patch => "patch",
            Method::Delete => "delete",
            Method::Options => "options",
            Method::Connect => "connect",
            Method::Trace => "trace",
            Method::All => "all",
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Method::All)
    }
}

impl Default for Method {
    fn default() -> Self {
        Method::All
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = UnknownMethod;

    /// Case-insensitive; `*` is accepted as an alias for `all`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = match s.trim().to_ascii_lowercase().as_str() {
            "get" => Method::Get,
            "head" => Method::Head,
            "post" => Method::Post,
            "put" => Method::Put,
            "patch" => Method::Patch,
            "delete" => Method::Delete,
            "options" => Method::Options,
            "connect" => Method::Connect,
            "trace" => Method::Trace,
            "all" | "*" => Method::All,
            _ => return Err(UnknownMethod(s.to_string())),
        };
        Ok(method)
    }
}

impl TryFrom<String> for Method {
    type Error = UnknownMethod;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.as_str().to_string()
    }
}

impl TryFrom<&axum::http::Method> for Method {
    type Error = UnknownMethod;

    fn try_from(value: &axum::http::Method) -> Result<Self, Self::Error> {
        value.as_str().parse()
    }
}
