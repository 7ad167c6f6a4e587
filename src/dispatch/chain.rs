//! Continuation chain of middleware ending in a route handler.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::request::RequestContext;
use super::response::{Payload, ResponseContext};
use crate::error::BoxError;

/// Outcome of a chain link: `Some` becomes the response result.
pub type HandlerResult = Result<Option<Payload>, BoxError>;

/// Terminal link: a route handler.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: RequestContext, res: ResponseContext) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestContext, ResponseContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: RequestContext, res: ResponseContext) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(req, res))
    }
}

/// A hook or global middleware. It proceeds by calling [`Next::run`];
/// returning without doing so ends the chain.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: RequestContext, res: ResponseContext, next: Next) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Middleware for F
where
    F: Fn(RequestContext, ResponseContext, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn handle(&self, req: RequestContext, res: ResponseContext, next: Next) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(req, res, next))
    }
}

/// The rest of the chain after the current link.
pub struct Next {
    links: Arc<[Arc<dyn Middleware>]>,
    position: usize,
    endpoint: Arc<dyn Handler>,
    response: ResponseContext,
}

impl Next {
    pub(crate) fn new(
        links: Vec<Arc<dyn Middleware>>,
        endpoint: Arc<dyn Handler>,
        response: ResponseContext,
    ) -> Self {
        Self {
            links: links.into(),
            position: 0,
            endpoint,
            response,
        }
    }

    /// Run the remaining links and the handler.
    pub fn run(self, req: RequestContext) -> BoxFuture<'static, HandlerResult> {
        let res = self.response.clone();
        let step = match self.links.get(self.position).cloned() {
            Some(link) => {
                let next = Next {
                    position: self.position + 1,
                    ..self
                };
                link.handle(req, res.clone(), next)
            }
            None => self.endpoint.call(req, res.clone()),
        };

        Box::pin(async move {
            let out = step.await?;
            if let Some(payload) = &out {
                res.set_result(payload.clone());
            }
            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Method;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Arc<dyn Middleware> {
        let log = log.clone();
        Arc::new(move |req: RequestContext, _res: ResponseContext, next: Next| {
            log.lock().unwrap().push(name);
            next.run(req)
        })
    }

    #[tokio::test]
    async fn test_links_run_in_order_then_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler_log = log.clone();
        let handler: Arc<dyn Handler> = Arc::new(move |_req: RequestContext, _res: ResponseContext| {
            handler_log.lock().unwrap().push("handler");
            async { Ok::<_, BoxError>(Some(Payload::from("done"))) }
        });

        let res = ResponseContext::new();
        let next = Next::new(vec![recorder(&log, "a"), recorder(&log, "b")], handler, res.clone());

        let out = next.run(RequestContext::new(Method::Get, "/")).await.unwrap();
        assert_eq!(out, Some(Payload::from("done")));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "handler"]);
        assert_eq!(res.result(), Some(Payload::from("done")));
    }

    #[tokio::test]
    async fn test_link_without_next_short_circuits() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let gate: Arc<dyn Middleware> = Arc::new(|_req: RequestContext, _res: ResponseContext, _next: Next| async {
            Ok::<_, BoxError>(Some(Payload::from("denied")))
        });
        let handler: Arc<dyn Handler> =
            Arc::new(|_req: RequestContext, _res: ResponseContext| async { Ok::<_, BoxError>(Some(Payload::from("reached"))) });

        let res = ResponseContext::new();
        let next = Next::new(vec![gate, recorder(&log, "after")], handler, res.clone());
        let out = next.run(RequestContext::new(Method::Get, "/")).await.unwrap();

        assert_eq!(out, Some(Payload::from("denied")));
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(res.result(), Some(Payload::from("denied")));
        assert!(!res.is_ended());
    }
}
