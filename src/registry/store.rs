//! The live registry: sources in, route snapshots out.

use std::sync::{Arc, PoisonError, RwLock};

use arc_swap::ArcSwap;

use super::route::{Hook, Route};
use super::route_set::{MatchEngine, MatchedRoute, RouteSet};
use super::source::RouteSource;
use super::RegistryError;
use crate::lifecycle::SingleFlight;
use crate::observability::metrics;
use crate::routing::{MatcherOptions, Method};

type Generation = SingleFlight<Arc<RouteSet>, RegistryError>;

/// Aggregates route sources into a shared [`RouteSet`].
///
/// Aggregation runs at most once per generation no matter how many callers
/// race on [`setup`](Self::setup); [`reload`](Self::reload) starts a new one.
pub struct Registry {
    sources: RwLock<Vec<Arc<dyn RouteSource>>>,
    options: MatcherOptions,
    engine: MatchEngine,
    generation: ArcSwap<Generation>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(MatcherOptions::default())
    }
}

impl Registry {
    pub fn new(options: MatcherOptions) -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
            options,
            engine: MatchEngine::default(),
            generation: ArcSwap::from_pointee(Generation::new()),
        }
    }

    pub fn with_engine(mut self, engine: MatchEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Add a source. Takes effect on the next generation.
    pub fn use_source(&self, source: impl RouteSource + 'static) -> &Self {
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(source));
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Aggregate all sources once and return the shared snapshot.
    pub async fn setup(&self) -> Result<Arc<RouteSet>, RegistryError> {
        let generation = self.generation.load_full();
        generation.run(|| self.aggregate()).await
    }

    /// Discard the current snapshot and aggregate again.
    pub async fn reload(&self) -> Result<Arc<RouteSet>, RegistryError> {
        self.generation.store(Arc::new(Generation::new()));
        self.setup().await
    }

    pub async fn routes(&self) -> Result<Vec<Arc<Route>>, RegistryError> {
        Ok(self.setup().await?.routes().to_vec())
    }

    pub async fn hooks(&self) -> Result<Vec<Arc<Hook>>, RegistryError> {
        Ok(self.setup().await?.hooks().to_vec())
    }

    /// Best route for `path` and `method`.
    pub async fn lookup(&self, path: &str, method: Method) -> Result<Option<MatchedRoute>, RegistryError> {
        Ok(self.setup().await?.lookup(path, method)?)
    }

    async fn aggregate(&self) -> Result<Arc<RouteSet>, RegistryError> {
        let sources = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut modules = Vec::with_capacity(sources.len());
        for source in &sources {
            let module = source.setup().await.map_err(|e| {
                tracing::error!(source = source.name(), error = %e, "Route source setup failed");
                RegistryError::Source {
                    source_name: source.name().to_string(),
                    message: e.to_string(),
                }
            })?;
            tracing::debug!(
                source = source.name(),
                routes = module.routes.len(),
                hooks = module.hooks.len(),
                "Route source loaded"
            );
            modules.push(module);
        }

        let set = RouteSet::build(modules, self.options.clone(), self.engine)?;
        tracing::info!(
            sources = sources.len(),
            routes = set.len(),
            hooks = set.hooks().len(),
            engine = ?set.engine(),
            "Route registry ready"
        );
        metrics::record_routes_loaded(set.len());
        Ok(Arc::new(set))
    }
}
