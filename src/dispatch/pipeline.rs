//! The dispatch pipeline.
//!
//! # Responsibilities
//! - Ensure the registry is set up, then match the request
//! - Compose global middleware and route-scoped hooks into one chain
//! - Convert hook/handler failures (errors and panics) into error responses
//! - Finalize the response from the chain result
//!
//! # Design Decisions
//! - Matching happens before any link runs, so hooks can be scoped by the
//!   matched route path
//! - A response without a result is left open; the transport decides how to
//!   close it

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;

use super::chain::{Middleware, Next};
use super::request::RequestContext;
use super::response::ResponseContext;
use crate::error::DispatchError;
use crate::observability::metrics;
use crate::registry::{Hook, MatchedRoute, Registry, RouteSet};

/// What happened to a dispatched request.
#[derive(Debug)]
pub enum Outcome {
    /// A route matched, or matching itself failed with an error response.
    Handled,
    /// Nothing matched; the request is returned for the caller's fallback.
    Unmatched(RequestContext),
}

impl Outcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, Outcome::Handled)
    }
}

/// Runs requests against a [`Registry`].
pub struct Dispatcher {
    registry: Arc<Registry>,
    middleware: Vec<Arc<Hook>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            middleware: Vec::new(),
        }
    }

    /// Add global middleware. Lower `order` runs first; negative orders are
    /// reserved for infrastructure wrapping the whole chain.
    pub fn with_middleware(self, order: i32, middleware: impl Middleware) -> Self {
        self.with_hook(Hook::new(middleware).with_order(order))
    }

    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.middleware.push(Arc::new(hook));
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Dispatch `req`, writing into `res`.
    pub async fn dispatch(&self, req: RequestContext, res: &ResponseContext) -> Outcome {
        let start = Instant::now();
        let method = req.method();
        let outcome = self.run(req, res).await;

        let (status, matched) = match &outcome {
            Outcome::Handled => (res.status(), true),
            Outcome::Unmatched(_) => (404, false),
        };
        metrics::record_dispatch(method, status, matched, start);
        outcome
    }

    /// Dispatch, invoking `fallback` when no route matched.
    pub async fn handle<F, Fut>(&self, req: RequestContext, res: &ResponseContext, fallback: F)
    where
        F: FnOnce(RequestContext, ResponseContext) -> Fut,
        Fut: Future<Output = ()>,
    {
        if let Outcome::Unmatched(req) = self.dispatch(req, res).await {
            fallback(req, res.clone()).await;
        }
    }

    async fn run(&self, mut req: RequestContext, res: &ResponseContext) -> Outcome {
        let routes = match self.registry.setup().await {
            Ok(routes) => routes,
            Err(err) => {
                tracing::error!(error = %err, "Route registry unavailable");
                res.fail(&DispatchError::Handler(err.to_string()));
                return Outcome::Handled;
            }
        };

        let MatchedRoute { route, params } = match routes.lookup(req.path(), req.method()) {
            Ok(Some(found)) => found,
            Ok(None) => {
                tracing::debug!(method = %req.method(), path = %req.path(), "No route matched");
                return Outcome::Unmatched(req);
            }
            Err(err) => {
                let err = DispatchError::from(err);
                tracing::debug!(path = %req.path(), error = %err, "Match rejected");
                res.fail(&err);
                return Outcome::Handled;
            }
        };

        req.apply_match(&route.path, params, &route.meta);
        let links = self.chain_for(&routes, &route.path);
        tracing::debug!(
            request_id = req.request_id().unwrap_or("-"),
            method = %req.method(),
            route = %route.path,
            links = links.len(),
            "Route matched"
        );

        let next = Next::new(links, route.handler.clone(), res.clone());
        let ran = AssertUnwindSafe(async move { next.run(req).await })
            .catch_unwind()
            .await;

        let failure = match ran {
            Ok(Ok(_)) => None,
            Ok(Err(err)) => Some(DispatchError::from_boxed(err)),
            Err(panic) => Some(DispatchError::Handler(panic_message(panic.as_ref()))),
        };

        match failure {
            Some(err) => {
                tracing::warn!(route = %route.path, error = %err, "Handler failed");
                res.fail(&err);
            }
            None => {
                if let Some(payload) = res.result() {
                    res.end(payload);
                }
            }
        }
        Outcome::Handled
    }

    /// Global middleware plus matching hooks, stable-sorted by order.
    fn chain_for(&self, routes: &RouteSet, route_path: &str) -> Vec<Arc<dyn Middleware>> {
        let mut hooks: Vec<Arc<Hook>> = self
            .middleware
            .iter()
            .filter(|hook| hook.applies_to(route_path))
            .cloned()
            .chain(routes.hooks_for(route_path))
            .collect();
        hooks.sort_by_key(|hook| hook.order);
        hooks.into_iter().map(|hook| hook.middleware.clone()).collect()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{HandlerResult, Payload};
    use crate::error::BoxError;
    use crate::registry::{Module, Route};
    use crate::routing::{MatcherOptions, Method};
    use serde_json::json;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn recorder(log: &Log, name: &'static str) -> impl Middleware {
        let log = log.clone();
        move |req: RequestContext, _res: ResponseContext, next: Next| {
            log.lock().unwrap().push(name);
            next.run(req)
        }
    }

    async fn world(_req: RequestContext, _res: ResponseContext) -> HandlerResult {
        Ok(Some(Payload::from("world")))
    }

    fn dispatcher(modules: Vec<Module>) -> Dispatcher {
        let registry = Registry::default();
        for module in modules {
            registry.use_source(module);
        }
        Dispatcher::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_handler_result_finalizes_response() {
        let d = dispatcher(vec![Module::new().route(Route::new("GET /hello", world))]);
        let res = ResponseContext::new();

        let outcome = d.dispatch(RequestContext::new(Method::Get, "/hello"), &res).await;
        assert!(outcome.is_handled());
        assert!(res.is_ended());
        let out = res.snapshot();
        assert_eq!(out.status, 200);
        assert_eq!(&out.body[..], b"world");
        assert_eq!(out.headers.get("content-type"), Some("text/plain; charset=utf-8"));
    }

    #[tokio::test]
    async fn test_hook_scoped_by_route_path() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let d = dispatcher(vec![Module::new()
            .route(Route::new("GET /api/x", world))
            .route(Route::new("GET /public/x", world))
            .hook(Hook::scoped("/api", recorder(&log, "api")))]);

        d.dispatch(RequestContext::new(Method::Get, "/api/x"), &ResponseContext::new())
            .await;
        d.dispatch(RequestContext::new(Method::Get, "/public/x"), &ResponseContext::new())
            .await;
        assert_eq!(*log.lock().unwrap(), vec!["api"]);
    }

    #[tokio::test]
    async fn test_hook_without_next_short_circuits() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let handler_log = log.clone();
        let d = dispatcher(vec![Module::new()
            .route(Route::new("GET /secret", move |_req: RequestContext, _res: ResponseContext| {
                handler_log.lock().unwrap().push("handler");
                async { Ok::<_, BoxError>(Some(Payload::from("secret"))) }
            }))
            .hook(Hook::new(|_req: RequestContext, res: ResponseContext, _next: Next| async move {
                res.set_status(401);
                Ok::<_, BoxError>(Some(Payload::from("denied")))
            }))
            .hook(Hook::new(recorder(&log, "later")))]);

        let res = ResponseContext::new();
        d.dispatch(RequestContext::new(Method::Get, "/secret"), &res).await;

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(res.result(), Some(Payload::from("denied")));
        let out = res.snapshot();
        assert_eq!(out.status, 401);
        assert_eq!(&out.body[..], b"denied");
    }

    #[tokio::test]
    async fn test_handler_error_becomes_500_and_done_resolves() {
        let d = dispatcher(vec![Module::new().route(Route::new(
            "GET /boom",
            |_req: RequestContext, _res: ResponseContext| async { Err::<Option<Payload>, BoxError>("kaput".into()) },
        ))]);

        let res = ResponseContext::new();
        d.dispatch(RequestContext::new(Method::Get, "/boom"), &res).await;

        tokio::time::timeout(std::time::Duration::from_secs(1), res.done())
            .await
            .expect("done() must resolve after an error");
        let out = res.snapshot();
        assert_eq!(out.status, 500);
        let body: serde_json::Value = serde_json::from_slice(&out.body).unwrap();
        assert_eq!(body["error"], "HandlerError");
        assert_eq!(body["statusCode"], 500);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let d = dispatcher(vec![Module::new().route(Route::new(
            "GET /panic",
            |_req: RequestContext, _res: ResponseContext| async {
                if true {
                    panic!("handler exploded");
                }
                Ok::<Option<Payload>, BoxError>(None)
            },
        ))]);

        let res = ResponseContext::new();
        d.dispatch(RequestContext::new(Method::Get, "/panic"), &res).await;
        let out = res.snapshot();
        assert_eq!(out.status, 500);
        assert!(String::from_utf8_lossy(&out.body).contains("handler exploded"));
    }

    #[tokio::test]
    async fn test_typed_error_keeps_status() {
        let d = dispatcher(vec![Module::new().route(Route::new(
            "POST /strict",
            |_req: RequestContext, _res: ResponseContext| async {
                Err::<Option<Payload>, BoxError>(Box::new(DispatchError::BadRequest("name missing".into())))
            },
        ))]);

        let res = ResponseContext::new();
        d.dispatch(RequestContext::new(Method::Post, "/strict"), &res).await;
        assert_eq!(res.status(), 400);
    }

    #[tokio::test]
    async fn test_order_ties_keep_registration_order() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let registry = Registry::default();
        registry.use_source(
            Module::new()
                .route(Route::new("GET /x", world))
                .hook(Hook::new(recorder(&log, "hook"))),
        );
        let d = Dispatcher::new(Arc::new(registry))
            .with_middleware(5, recorder(&log, "late"))
            .with_middleware(-10, recorder(&log, "infra-a"))
            .with_middleware(-10, recorder(&log, "infra-b"))
            .with_middleware(0, recorder(&log, "global"));

        d.dispatch(RequestContext::new(Method::Get, "/x"), &ResponseContext::new())
            .await;
        assert_eq!(
            *log.lock().unwrap(),
            vec!["infra-a", "infra-b", "global", "hook", "late"]
        );
    }

    #[tokio::test]
    async fn test_unmatched_invokes_fallback() {
        let d = dispatcher(vec![Module::new().route(Route::new("GET /hello", world))]);
        let res = ResponseContext::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();

        d.handle(RequestContext::new(Method::Get, "/nope"), &res, |req, res| async move {
            *sink.lock().unwrap() = Some(req.path().to_string());
            res.end_with(404, "fallback");
        })
        .await;

        assert_eq!(seen.lock().unwrap().as_deref(), Some("/nope"));
        assert_eq!(res.status(), 404);
    }

    #[tokio::test]
    async fn test_params_meta_and_data_visible_to_handler() {
        let d = dispatcher(vec![Module::new().route(
            Route::new("POST /search/{name}", |req: RequestContext, _res: ResponseContext| async move {
                Ok::<_, BoxError>(Some(Payload::Json(json!({
                    "name": req.param("name"),
                    "count": req.param("name").map(str::len),
                    "tag": req.meta().get("tag").cloned(),
                    "data": req.data(),
                }))))
            })
            .with_meta("tag", "search"),
        )]);

        let res = ResponseContext::new();
        let req = RequestContext::new(Method::Post, "/search/abc?name=ignored&page=2")
            .with_json(json!({"page": "1", "extra": true}));
        d.dispatch(req, &res).await;

        let body: serde_json::Value = serde_json::from_slice(&res.snapshot().body).unwrap();
        assert_eq!(body["name"], "abc");
        assert_eq!(body["count"], 3);
        assert_eq!(body["tag"], "search");
        assert_eq!(body["data"], json!({"name": "abc", "page": "2", "extra": true}));
    }

    #[tokio::test]
    async fn test_method_not_allowed_in_strict_mode() {
        let registry = Registry::new(MatcherOptions {
            strict_methods: true,
            ..MatcherOptions::default()
        });
        registry.use_source(Module::new().route(Route::new("GET /only", world)));
        let d = Dispatcher::new(Arc::new(registry));

        let res = ResponseContext::new();
        let outcome = d.dispatch(RequestContext::new(Method::Delete, "/only"), &res).await;
        assert!(outcome.is_handled());
        assert_eq!(res.status(), 405);
        assert_eq!(res.header("content-type").as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_no_result_leaves_response_open() {
        let d = dispatcher(vec![Module::new().route(Route::new(
            "GET /silent",
            |_req: RequestContext, _res: ResponseContext| async { Ok::<Option<Payload>, BoxError>(None) },
        ))]);
        let res = ResponseContext::new();
        d.dispatch(RequestContext::new(Method::Get, "/silent"), &res).await;
        assert!(!res.is_ended());
    }
}
