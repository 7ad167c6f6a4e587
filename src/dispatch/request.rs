//! Request side of the dispatch context.
//!
//! # Responsibilities
//! - Hold the request description built by a transport shim
//! - Decode query strings and JSON / form bodies
//! - Expose the merged `data` view once matching filled in `params`
//!
//! # Design Decisions
//! - Headers keep every value of a repeated name
//! - `data()` is computed on every call; precedence is params > query > body

use std::collections::BTreeMap;

use bytes::Bytes;
use serde_json::{Map, Value};

use super::headers::Headers;
use crate::error::DispatchError;
use crate::routing::{Method, Params};

/// An incoming request as seen by hooks and handlers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    url: String,
    path: String,
    method: Method,
    headers: Headers,
    query: BTreeMap<String, String>,
    params: Params,
    body: Map<String, Value>,
    raw_body: Bytes,
    meta: Map<String, Value>,
    route_path: Option<String>,
    request_id: Option<String>,
}

impl RequestContext {
    /// Build a request for `url` (path plus optional query string).
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let url = url.into();
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path.to_string(), parse_pairs(query.as_bytes())),
            None => (url.clone(), BTreeMap::new()),
        };
        let path = if path.is_empty() { "/".to_string() } else { path };

        Self {
            url,
            path,
            method,
            headers: Headers::new(),
            query,
            params: Params::new(),
            body: Map::new(),
            raw_body: Bytes::new(),
            meta: Map::new(),
            route_path: None,
            request_id: None,
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace all headers, e.g. with the map a transport received.
    pub fn with_headers(mut self, headers: impl Into<Headers>) -> Self {
        self.headers = headers.into();
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Attach a raw body, decoding it according to `content-type`.
    ///
    /// JSON objects and urlencoded forms populate `body()`; anything else is
    /// only available through `raw_body()`.
    pub fn with_body(mut self, raw: impl Into<Bytes>) -> Result<Self, DispatchError> {
        let raw = raw.into();
        let content_type = self
            .headers
            .get("content-type")
            .unwrap_or_default()
            .to_ascii_lowercase();

        if !raw.is_empty() {
            if content_type.contains("json") {
                let value: Value = serde_json::from_slice(&raw)
                    .map_err(|e| DispatchError::BadRequest(format!("invalid JSON body: {e}")))?;
                if let Value::Object(map) = value {
                    self.body = map;
                }
            } else if content_type.starts_with("application/x-www-form-urlencoded") {
                self.body = parse_pairs(&raw)
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect();
            }
        }

        self.raw_body = raw;
        Ok(self)
    }

    /// Attach a JSON object body directly.
    pub fn with_json(mut self, body: Value) -> Self {
        self.raw_body = Bytes::from(body.to_string());
        if let Value::Object(map) = body {
            self.body = map;
        }
        self.headers.insert("content-type", "application/json");
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    /// Metadata of the matched route; empty before matching.
    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    /// Template of the matched route, e.g. `/search/{name}`.
    pub fn route_path(&self) -> Option<&str> {
        self.route_path.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Merged view of body, query and params; later sources win.
    pub fn data(&self) -> Map<String, Value> {
        let mut data = self.body.clone();
        for (k, v) in &self.query {
            data.insert(k.clone(), Value::String(v.clone()));
        }
        for (k, v) in &self.params {
            data.insert(k.clone(), Value::String(v.clone()));
        }
        data
    }

    pub(crate) fn apply_match(&mut self, route_path: &str, params: Params, meta: &Map<String, Value>) {
        self.route_path = Some(route_path.to_string());
        self.params = params;
        self.meta = meta.clone();
    }
}

fn parse_pairs(input: &[u8]) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(input).into_owned().collect()
}
