//! Header map shared by request and response contexts.
//!
//! # Design Decisions
//! - Backed by `http::HeaderMap`: names are case-insensitive and a name may
//!   carry several values (`Set-Cookie`, repeated request headers)
//! - Names or values that are not valid HTTP are refused at insertion
//!   and logged, so the transport never sees them

use axum::http::{HeaderMap, HeaderName, HeaderValue};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(HeaderMap);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `name`, if it is valid UTF-8.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = parse_name(name)?;
        self.0.get(&name).and_then(|v| v.to_str().ok())
    }

    /// Every value for `name` in arrival order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        match parse_name(name) {
            Some(name) => self.0.get_all(&name).iter().filter_map(|v| v.to_str().ok()).collect(),
            None => Vec::new(),
        }
    }

    /// Replace all values for `name`. Returns `false` if the header is invalid.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> bool {
        match parse_pair(name.as_ref(), value.as_ref()) {
            Some((name, value)) => {
                self.0.insert(name, value);
                true
            }
            None => false,
        }
    }

    /// Add a value for `name`, keeping existing ones.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> bool {
        match parse_pair(name.as_ref(), value.as_ref()) {
            Some((name, value)) => {
                self.0.append(name, value);
                true
            }
            None => false,
        }
    }

    /// Remove every value for `name`, returning the first.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let name = parse_name(name)?;
        self.0.remove(&name).and_then(|v| v.to_str().ok().map(str::to_string))
    }

    pub fn contains(&self, name: &str) -> bool {
        parse_name(name).is_some_and(|name| self.0.contains_key(&name))
    }

    /// All (name, value) pairs; a repeated header yields one pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
    }

    /// Number of values, counting repeats.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &HeaderMap {
        &self.0
    }
}

impl From<HeaderMap> for Headers {
    fn from(map: HeaderMap) -> Self {
        Self(map)
    }
}

impl From<Headers> for HeaderMap {
    fn from(headers: Headers) -> Self {
        headers.0
    }
}

/// Collects with append semantics, so repeated names keep every value.
impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.append(k, v);
        }
        headers
    }
}

fn parse_name(name: &str) -> Option<HeaderName> {
    HeaderName::from_bytes(name.as_bytes()).ok()
}

fn parse_pair(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
    match (parse_name(name), HeaderValue::from_str(value)) {
        (Some(name), Ok(value)) => Some((name, value)),
        _ => {
            tracing::warn!(header = %name, "Dropping invalid header");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("X-Token", "abc");
        assert_eq!(headers.get("x-token"), Some("abc"));
        assert_eq!(headers.get("X-TOKEN"), Some("abc"));
        assert!(headers.contains("x-TOKEN"));
    }

    #[test]
    fn test_repeated_values_are_kept() {
        let mut headers = Headers::new();
        headers.append("set-cookie", "a=1");
        headers.append("Set-Cookie", "b=2");

        assert_eq!(headers.get("set-cookie"), Some("a=1"));
        assert_eq!(headers.get_all("set-cookie"), vec!["a=1", "b=2"]);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.iter().filter(|(n, _)| *n == "set-cookie").count(), 2);

        headers.insert("set-cookie", "c=3");
        assert_eq!(headers.get_all("set-cookie"), vec!["c=3"]);
    }

    #[test]
    fn test_invalid_header_refused() {
        let mut headers = Headers::new();
        assert!(!headers.insert("x-bad", "line\nbreak"));
        assert!(!headers.append("bad name", "v"));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_remove_drops_every_value() {
        let mut headers: Headers = [("x-tag", "a"), ("x-tag", "b")].into_iter().collect();
        assert_eq!(headers.remove("X-Tag").as_deref(), Some("a"));
        assert!(!headers.contains("x-tag"));
    }
}
