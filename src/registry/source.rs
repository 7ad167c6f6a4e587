//! Route sources: where routes and hooks come from.

use std::future::Future;

use futures_util::future::BoxFuture;

use super::route::{Hook, Route};
use crate::error::BoxError;

/// A batch of routes and hooks sharing one base path.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: Option<String>,
    /// Prefix applied to every route and hook in this module.
    pub base: Option<String>,
    pub routes: Vec<Route>,
    pub hooks: Vec<Hook>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }
}

/// Something the registry can aggregate routes from.
///
/// `setup` is invoked once per registry generation.
pub trait RouteSource: Send + Sync {
    fn name(&self) -> &str;

    fn setup(&self) -> BoxFuture<'_, Result<Module, BoxError>>;
}

/// A static list is its own source.
impl RouteSource for Module {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("static")
    }

    fn setup(&self) -> BoxFuture<'_, Result<Module, BoxError>> {
        Box::pin(async move { Ok(self.clone()) })
    }
}

/// A source backed by an async setup callback.
pub struct SetupFn<F> {
    name: String,
    setup: F,
}

/// Wrap `setup` as a named [`RouteSource`].
pub fn setup_fn<F, Fut>(name: impl Into<String>, setup: F) -> SetupFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Module, BoxError>> + Send + 'static,
{
    SetupFn {
        name: name.into(),
        setup,
    }
}

impl<F, Fut> RouteSource for SetupFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Module, BoxError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&self) -> BoxFuture<'_, Result<Module, BoxError>> {
        Box::pin((self.setup)())
    }
}
