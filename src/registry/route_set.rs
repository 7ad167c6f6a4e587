//! Immutable snapshot of aggregated routes and hooks.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::route::{compare_specificity, Hook, Route};
use super::source::Module;
use super::RegistryError;
use crate::routing::{MatchError, MatcherOptions, Method, Params, PathTemplate, RouteTable, Segment};

/// Which matcher resolves requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchEngine {
    /// Trie lookup with static shortcut and cache.
    #[default]
    Trie,
    /// Scan routes in specificity order, matching each template.
    Linear,
}

/// A route selected for a request.
#[derive(Debug, Clone)]
pub struct MatchedRoute {
    pub route: Arc<Route>,
    pub params: Params,
}

/// Documentation-facing view of one registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteInfo {
    pub method: Method,
    pub path: String,
    pub params: Vec<String>,
    pub meta: Map<String, Value>,
    pub props: Value,
}

/// Sort key ranking literal segments above placeholders above wildcards.
fn specificity_key(template: &PathTemplate) -> String {
    let mut key = String::new();
    for segment in template.segments() {
        key.push('/');
        match segment {
            Segment::Static(lit) => key.push_str(lit),
            Segment::Placeholder(_) => key.push('\u{1}'),
            Segment::Wildcard(_) => key.push('\u{0}'),
        }
    }
    key
}

#[derive(PartialEq, Eq)]
struct SpecificityKey(String);

impl PartialOrd for SpecificityKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SpecificityKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        compare_specificity(&self.0, &other.0)
    }
}

#[derive(Debug)]
pub struct RouteSet {
    /// Sorted most specific first.
    routes: Vec<Arc<Route>>,
    templates: Vec<PathTemplate>,
    hooks: Vec<Arc<Hook>>,
    table: RouteTable<usize>,
    engine: MatchEngine,
}

impl RouteSet {
    /// Resolve bases, drop redefinitions (last one wins), sort and index.
    pub fn build(modules: Vec<Module>, options: MatcherOptions, engine: MatchEngine) -> Result<Self, RegistryError> {
        let mut unique: Vec<(Route, PathTemplate)> = Vec::new();
        let mut seen: HashMap<(Method, String), usize> = HashMap::new();
        let mut hooks = Vec::new();

        for module in &modules {
            let base = module.base.as_deref();
            for route in &module.routes {
                let route = route.resolved(base);
                let template = PathTemplate::parse(&route.path, &options).map_err(|error| {
                    RegistryError::Template {
                        path: route.path.clone(),
                        error,
                    }
                })?;

                let key = (route.method_token(), template.as_str().to_string());
                match seen.get(&key) {
                    Some(&index) => {
                        tracing::warn!(
                            method = %key.0,
                            path = %key.1,
                            "Route redefined, last definition wins"
                        );
                        unique[index] = (route, template);
                    }
                    None => {
                        seen.insert(key, unique.len());
                        unique.push((route, template));
                    }
                }
            }
            hooks.extend(module.hooks.iter().map(|hook| Arc::new(hook.resolved(base))));
        }

        unique.sort_by_cached_key(|(_, template)| SpecificityKey(specificity_key(template)));

        let mut table = RouteTable::new(options);
        let mut routes = Vec::with_capacity(unique.len());
        let mut templates = Vec::with_capacity(unique.len());
        for (index, (route, template)) in unique.into_iter().enumerate() {
            table
                .add(&route.path, route.method_token(), index)
                .map_err(|error| RegistryError::Template {
                    path: route.path.clone(),
                    error,
                })?;
            routes.push(Arc::new(route));
            templates.push(template);
        }

        Ok(Self {
            routes,
            templates,
            hooks,
            table,
            engine,
        })
    }

    /// All routes, most specific first.
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// All hooks in registration order.
    pub fn hooks(&self) -> &[Arc<Hook>] {
        &self.hooks
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn engine(&self) -> MatchEngine {
        self.engine
    }

    /// Hooks whose base covers `route_path`, in registration order.
    pub fn hooks_for(&self, route_path: &str) -> Vec<Arc<Hook>> {
        self.hooks
            .iter()
            .filter(|hook| hook.applies_to(route_path))
            .cloned()
            .collect()
    }

    pub fn lookup(&self, path: &str, method: Method) -> Result<Option<MatchedRoute>, MatchError> {
        match self.engine {
            MatchEngine::Trie => Ok(self.table.lookup(path, method)?.map(|found| MatchedRoute {
                route: self.routes[found.payload].clone(),
                params: found.params.unwrap_or_default(),
            })),
            MatchEngine::Linear => self.lookup_linear(path, method),
        }
    }

    /// First route in specificity order whose template and method accept the request.
    pub fn lookup_linear(&self, path: &str, method: Method) -> Result<Option<MatchedRoute>, MatchError> {
        let options = self.table.options();
        let mut allowed = Vec::new();

        for (route, template) in self.routes.iter().zip(&self.templates) {
            let Some(params) = template.capture(path, options) else {
                continue;
            };
            match route.method {
                None => {
                    return Ok(Some(MatchedRoute {
                        route: route.clone(),
                        params,
                    }))
                }
                Some(m) if m == method => {
                    return Ok(Some(MatchedRoute {
                        route: route.clone(),
                        params,
                    }))
                }
                Some(m) => allowed.push(m),
            }
        }

        if options.strict_methods && !allowed.is_empty() {
            allowed.sort();
            allowed.dedup();
            return Err(MatchError::MethodNotAllowed {
                path: path.to_string(),
                method,
                allowed,
            });
        }
        Ok(None)
    }

    /// Every registration in path order, for documentation output.
    pub fn describe(&self) -> Vec<RouteInfo> {
        let mut out = Vec::with_capacity(self.routes.len());
        self.table.traverse(|index, path, method| {
            let route = &self.routes[*index];
            out.push(RouteInfo {
                method,
                path: path.to_string(),
                params: route.path_params.clone(),
                meta: route.meta.clone(),
                props: route.props.clone(),
            });
        });
        out
    }
}
