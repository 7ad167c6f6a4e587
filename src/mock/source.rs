//! Config-defined route sources.

use futures_util::future::BoxFuture;
use serde_json::Value;

use super::responder::{MockResponder, SetHeaders};
use crate::config::SourceConfig;
use crate::error::BoxError;
use crate::registry::{Hook, Module, Route, RouteSource};
use crate::resilience::DELAY_META_KEY;

/// A `[[sources]]` table turned into routes and hooks.
pub struct ConfigSource {
    name: String,
    config: SourceConfig,
}

impl ConfigSource {
    pub fn new(index: usize, config: SourceConfig) -> Self {
        let name = config.name.clone().unwrap_or_else(|| format!("sources[{index}]"));
        Self { name, config }
    }

    fn module(&self) -> Module {
        let mut module = Module::new().named(self.name.clone());
        if let Some(base) = &self.config.base {
            module = module.with_base(base.clone());
        }

        for rc in &self.config.routes {
            let mut route = Route::new(&rc.path, MockResponder::from_config(rc)).with_props(rc.props.clone());
            if let Some(method) = rc.method {
                route = route.with_method(method);
            }
            route.meta = rc.meta.clone();
            if let Some(ms) = rc.delay_ms {
                route.meta.insert(DELAY_META_KEY.to_string(), Value::from(ms));
            }
            module = module.route(route);
        }

        for hc in &self.config.hooks {
            let hook = Hook::new(SetHeaders::new(hc.headers.clone())).with_order(hc.order);
            module = module.hook(Hook {
                base: hc.base.clone(),
                ..hook
            });
        }
        module
    }
}

impl RouteSource for ConfigSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&self) -> BoxFuture<'_, Result<Module, BoxError>> {
        Box::pin(async move { Ok(self.module()) })
    }
}
