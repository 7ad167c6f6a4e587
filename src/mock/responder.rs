//! Canned responses and header-setting middleware.

use std::collections::BTreeMap;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};

use crate::config::RouteConfig;
use crate::dispatch::{Handler, HandlerResult, Middleware, Next, Payload, RequestContext, ResponseContext};

/// Answers with a fixed status, headers and an interpolated body.
#[derive(Debug, Clone)]
pub struct MockResponder {
    status: u16,
    headers: BTreeMap<String, Vec<String>>,
    body: Option<Value>,
}

impl MockResponder {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn from_config(route: &RouteConfig) -> Self {
        Self {
            status: route.status,
            headers: route
                .headers
                .iter()
                .map(|(name, values)| (name.clone(), values.values().to_vec()))
                .collect(),
            body: route.body.clone(),
        }
    }

    /// Add a header value; repeating a name sends it once per value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl Handler for MockResponder {
    fn call(&self, req: RequestContext, res: ResponseContext) -> BoxFuture<'static, HandlerResult> {
        res.set_status(self.status);
        for (name, values) in &self.headers {
            for (i, value) in values.iter().enumerate() {
                if i == 0 {
                    res.set_header(name, value);
                } else {
                    res.append_header(name, value);
                }
            }
        }
        let payload = self.body.as_ref().map(|body| Payload::from(render(body, &req.data())));
        Box::pin(async move { Ok(payload) })
    }
}

/// Substitute `{{name}}` references with request data.
///
/// A string that is exactly one reference takes the referenced value as is,
/// so `"{{count}}"` can yield a number. Unknown names are left untouched.
pub fn render(template: &Value, data: &Map<String, Value>) -> Value {
    match template {
        Value::String(text) => render_str(text, data),
        Value::Array(items) => Value::Array(items.iter().map(|v| render(v, data)).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), render(v, data))).collect()),
        other => other.clone(),
    }
}

fn render_str(text: &str, data: &Map<String, Value>) -> Value {
    if let Some(name) = sole_reference(text) {
        if let Some(value) = data.get(name) {
            return value.clone();
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        let name = rest[open + 2..open + 2 + close].trim();
        out.push_str(&rest[..open]);
        match data.get(name) {
            Some(Value::String(s)) => out.push_str(s),
            Some(other) => out.push_str(&other.to_string()),
            None => out.push_str(&rest[open..open + close + 4]),
        }
        rest = &rest[open + close + 4..];
    }
    out.push_str(rest);
    Value::String(out)
}

fn sole_reference(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix("{{")?.strip_suffix("}}")?;
    (!inner.contains("{{") && !inner.contains("}}")).then(|| inner.trim())
}

/// Sets headers on the response, then continues the chain.
#[derive(Debug, Clone)]
pub struct SetHeaders {
    headers: BTreeMap<String, String>,
}

impl SetHeaders {
    pub fn new(headers: BTreeMap<String, String>) -> Self {
        Self { headers }
    }
}

impl Middleware for SetHeaders {
    fn handle(&self, req: RequestContext, res: ResponseContext, next: Next) -> BoxFuture<'static, HandlerResult> {
        for (name, value) in &self.headers {
            res.set_header(name, value);
        }
        next.run(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data() -> Map<String, Value> {
        json!({"name": "abc", "count": 3, "tags": ["x"]})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_interpolates_inside_text() {
        assert_eq!(render(&json!("hello {{name}}!"), &data()), json!("hello abc!"));
        assert_eq!(render(&json!("{{ count }} items"), &data()), json!("3 items"));
    }

    #[test]
    fn test_sole_reference_keeps_type() {
        assert_eq!(render(&json!("{{count}}"), &data()), json!(3));
        assert_eq!(render(&json!("{{tags}}"), &data()), json!(["x"]));
    }

    #[test]
    fn test_nested_and_unknown() {
        let template = json!({"user": {"name": "{{name}}"}, "list": ["{{missing}}", 1]});
        assert_eq!(
            render(&template, &data()),
            json!({"user": {"name": "abc"}, "list": ["{{missing}}", 1]})
        );
        assert_eq!(render(&json!("open {{name"), &data()), json!("open {{name"));
    }

    #[tokio::test]
    async fn test_responder_sets_status_headers_and_body() {
        let responder = MockResponder::new(201)
            .with_header("x-mock", "1")
            .with_header("set-cookie", "a=1")
            .with_header("set-cookie", "b=2")
            .with_body(json!({"created": "{{name}}"}));
        let res = ResponseContext::new();
        let mut req = RequestContext::new(crate::routing::Method::Post, "/things?name=abc");
        req.headers_mut().insert("accept", "application/json");

        let out = responder.call(req, res.clone()).await.unwrap();
        assert_eq!(out, Some(Payload::Json(json!({"created": "abc"}))));
        assert_eq!(res.status(), 201);
        assert_eq!(res.header("x-mock").as_deref(), Some("1"));
        assert_eq!(res.headers().get_all("set-cookie"), vec!["a=1", "b=2"]);
    }
}
