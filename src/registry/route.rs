//! Route and hook records.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::dispatch::{Handler, Middleware};
use crate::routing::{MatcherOptions, Method, PathTemplate};

/// One registered endpoint.
#[derive(Clone)]
pub struct Route {
    /// Path template, e.g. `/search/{name}`. Resolved against the source base
    /// once the registry aggregates it.
    pub path: String,
    /// `None` accepts every method.
    pub method: Option<Method>,
    pub handler: Arc<dyn Handler>,
    /// Free-form metadata passed through to documentation and to `RequestContext::meta`.
    pub meta: Map<String, Value>,
    /// Declarative parameter schema, passed through untouched.
    pub props: Value,
    /// Placeholder names in template order.
    pub path_params: Vec<String>,
}

impl Route {
    /// Create a route from `"METHOD /path"` or a bare `"/path"`.
    pub fn new(key: &str, handler: impl Handler) -> Self {
        let (method, path) = split_method_prefix(key);
        Self {
            path: path.to_string(),
            method,
            handler: Arc::new(handler),
            meta: Map::new(),
            props: Value::Null,
            path_params: param_names(path),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = (!method.is_all()).then_some(method);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn with_props(mut self, props: Value) -> Self {
        self.props = props;
        self
    }

    /// Method token used as the matcher key.
    pub fn method_token(&self) -> Method {
        self.method.unwrap_or(Method::All)
    }

    /// Copy of this route with its path resolved against `base`.
    pub(crate) fn resolved(&self, base: Option<&str>) -> Self {
        let path = resolve_path(base, &self.path);
        Self {
            path_params: param_names(&path),
            path,
            ..self.clone()
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("meta", &self.meta)
            .field("path_params", &self.path_params)
            .finish_non_exhaustive()
    }
}

/// A cross-cutting chain participant.
///
/// Without a `base` it runs for every matched request; otherwise only for
/// routes under that path. Lower `order` runs first; ties keep registration order.
#[derive(Clone)]
pub struct Hook {
    pub base: Option<String>,
    pub order: i32,
    pub middleware: Arc<dyn Middleware>,
}

impl Hook {
    pub fn new(middleware: impl Middleware) -> Self {
        Self {
            base: None,
            order: 0,
            middleware: Arc::new(middleware),
        }
    }

    pub fn scoped(base: impl Into<String>, middleware: impl Middleware) -> Self {
        Self {
            base: Some(base.into()),
            ..Self::new(middleware)
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Whether this hook runs for a route registered at `route_path`.
    pub fn applies_to(&self, route_path: &str) -> bool {
        let Some(base) = self.base.as_deref() else {
            return true;
        };
        let base = base.trim_end_matches('/');
        if base.is_empty() {
            return true;
        }
        match route_path.strip_prefix(base) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Copy of this hook with its base resolved against the source base.
    pub(crate) fn resolved(&self, source_base: Option<&str>) -> Self {
        let base = match (source_base, self.base.as_deref()) {
            (None, None) => None,
            (source_base, own) => Some(resolve_path(source_base, own.unwrap_or("/"))),
        };
        Self { base, ..self.clone() }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("base", &self.base)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// Split `"POST /search"` into its method and path.
pub fn split_method_prefix(key: &str) -> (Option<Method>, &str) {
    let key = key.trim();
    if let Some((head, rest)) = key.split_once(char::is_whitespace) {
        if let Ok(method) = head.parse::<Method>() {
            return ((!method.is_all()).then_some(method), rest.trim());
        }
    }
    (None, key)
}

/// Prefix `path` with `base`, collapsing duplicate separators.
///
/// A leading `@` marks the path as absolute: the base is not applied.
pub fn resolve_path(base: Option<&str>, path: &str) -> String {
    if let Some(absolute) = path.strip_prefix('@') {
        return clean_path(absolute);
    }
    match base {
        Some(base) if !base.is_empty() => clean_path(&format!("{base}/{path}")),
        _ => clean_path(path),
    }
}

fn clean_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    out.push('/');
    for ch in path.chars() {
        if ch == '/' && out.ends_with('/') {
            continue;
        }
        out.push(ch);
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

fn param_names(path: &str) -> Vec<String> {
    PathTemplate::parse(path, &MatcherOptions::default())
        .map(|t| t.param_names())
        .unwrap_or_default()
}

/// Specificity order for the linear engine.
///
/// A path sorts before any path that is a prefix of it; otherwise paths
/// compare in descending lexicographic order.
pub fn compare_specificity(a: &str, b: &str) -> Ordering {
    if a != b && a.starts_with(b) {
        Ordering::Less
    } else if a != b && b.starts_with(a) {
        Ordering::Greater
    } else {
        b.cmp(a)
    }
}
