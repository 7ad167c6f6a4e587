//! Compressed path trie with per-node method tables.
//!
//! # Responsibilities
//! - Register (template, method, payload) triples
//! - Resolve (path, method) to the best payload plus captured parameters
//! - Enumerate every registered payload
//!
//! # Design Decisions
//! - Nodes live in an arena (`Vec`) and refer to each other by index, so the
//!   parent back-reference never owns anything
//! - Fully static templates are also indexed by their full path
//! - Resolved lookups (hits and misses) are cached per `path#method`; every
//!   mutation clears the whole cache
//! - Precedence at each depth: literal child, then placeholder child; a
//!   wildcard is only a fallback when nothing more specific matched

use std::collections::HashMap;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::method::Method;
use super::template::{
    fold_case, split_segments, trim_path, PathTemplate, Segment, TemplateError, PLACEHOLDER_KEY,
    WILDCARD_KEY,
};
use super::Params;
use crate::observability::metrics;

type NodeId = usize;

const ROOT: NodeId = 0;

/// Matcher behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherOptions {
    /// Compare literal segments case-sensitively.
    pub case_sensitive: bool,

    /// Treat `/a/` and `/a` as different paths.
    pub strict_trailing_slash: bool,

    /// Maximum cached lookups; 0 disables the cache.
    pub cache_size: usize,

    /// Fail with `MethodNotAllowed` when the path exists for other methods only.
    pub strict_methods: bool,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            strict_trailing_slash: false,
            cache_size: 1024,
            strict_methods: false,
        }
    }
}

/// Kind of a trie node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Static,
    Placeholder,
    Wildcard,
}

/// Errors raised by [`RouteTable::lookup`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("method {method} is not allowed for {path}")]
    MethodNotAllowed {
        path: String,
        method: Method,
        allowed: Vec<Method>,
    },
}

/// A resolved lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<T> {
    pub payload: T,
    /// `None` for fully static routes.
    pub params: Option<Params>,
}

#[derive(Debug, Clone)]
struct Entry<T> {
    payload: T,
    template: String,
    param_names: Vec<String>,
}

#[derive(Debug, Clone)]
struct RouteNode<T> {
    kind: NodeKind,
    /// Key of this node in its parent's `children`.
    key: String,
    parent: Option<NodeId>,
    children: HashMap<String, NodeId>,
    placeholder_child: Option<NodeId>,
    wildcard_child: Option<NodeId>,
    /// Name of the first template that created this node.
    param_name: Option<String>,
    payload: HashMap<Method, Entry<T>>,
}

impl<T> RouteNode<T> {
    fn new(kind: NodeKind, key: String, parent: Option<NodeId>, param_name: Option<String>) -> Self {
        Self {
            kind,
            key,
            parent,
            children: HashMap::new(),
            placeholder_child: None,
            wildcard_child: None,
            param_name,
            payload: HashMap::new(),
        }
    }

    fn entry_for(&self, method: Method) -> Option<&Entry<T>> {
        self.payload
            .get(&method)
            .or_else(|| self.payload.get(&Method::All))
    }

    fn allowed(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.payload.keys().copied().collect();
        methods.sort();
        methods
    }
}

/// The path matcher.
#[derive(Debug, Clone)]
pub struct RouteTable<T> {
    nodes: Vec<RouteNode<T>>,
    free: Vec<NodeId>,
    static_routes: HashMap<String, NodeId>,
    cache: DashMap<String, Option<RouteMatch<T>>>,
    options: MatcherOptions,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new(MatcherOptions::default())
    }
}

impl<T> RouteTable<T> {
    pub fn new(options: MatcherOptions) -> Self {
        Self {
            nodes: vec![RouteNode::new(NodeKind::Static, String::new(), None, None)],
            free: Vec::new(),
            static_routes: HashMap::new(),
            cache: DashMap::new(),
            options,
        }
    }

    pub fn options(&self) -> &MatcherOptions {
        &self.options
    }

    /// Register `payload` for `method` at `path`, replacing any previous one.
    pub fn add(&mut self, path: &str, method: Method, payload: T) -> Result<(), TemplateError> {
        let template = PathTemplate::parse(path, &self.options)?;

        let mut current = ROOT;
        for segment in template.segments() {
            current = self.child_for(current, segment);
        }

        self.nodes[current].payload.insert(
            method,
            Entry {
                payload,
                template: template.as_str().to_string(),
                param_names: template.param_names(),
            },
        );
        if template.is_static() {
            self.static_routes.insert(template.as_str().to_string(), current);
        }

        self.invalidate();
        Ok(())
    }

    /// Remove the payload registered for exactly `path` and `method`.
    ///
    /// Walks template segments literally; placeholders are not resolved
    /// against other registrations. Returns whether anything was removed.
    pub fn remove(&mut self, path: &str, method: Method) -> bool {
        let Ok(template) = PathTemplate::parse(path, &self.options) else {
            return false;
        };

        let mut current = ROOT;
        for segment in template.segments() {
            match self.nodes[current].children.get(segment.key()) {
                Some(&id) => current = id,
                None => return false,
            }
        }

        if self.nodes[current].payload.remove(&method).is_none() {
            return false;
        }
        if self.nodes[current].payload.is_empty() {
            self.static_routes.remove(template.as_str());
        }
        self.prune(current);
        self.invalidate();
        true
    }

    /// Depth-first walk over every stored payload as `(payload, template, method)`.
    ///
    /// Children are visited in key order and methods in declaration order, so
    /// the output is stable across runs.
    pub fn traverse<F>(&self, mut callback: F)
    where
        F: FnMut(&T, &str, Method),
    {
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];

            let mut methods: Vec<(&Method, &Entry<T>)> = node.payload.iter().collect();
            methods.sort_by_key(|(m, _)| **m);
            for (method, entry) in methods {
                callback(&entry.payload, &entry.template, *method);
            }

            let mut children: Vec<(&String, &NodeId)> = node.children.iter().collect();
            children.sort_by(|a, b| b.0.cmp(a.0));
            stack.extend(children.into_iter().map(|(_, id)| *id));
        }
    }

    /// Number of (template, method) registrations.
    pub fn len(&self) -> usize {
        let mut count = 0;
        self.traverse(|_, _, _| count += 1);
        count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn child_for(&mut self, parent: NodeId, segment: &Segment) -> NodeId {
        if let Some(&existing) = self.nodes[parent].children.get(segment.key()) {
            return existing;
        }

        let kind = match segment {
            Segment::Static(_) => NodeKind::Static,
            Segment::Placeholder(_) => NodeKind::Placeholder,
            Segment::Wildcard(_) => NodeKind::Wildcard,
        };
        let node = RouteNode::new(
            kind,
            segment.key().to_string(),
            Some(parent),
            segment.param_name().map(str::to_string),
        );
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        let parent_node = &mut self.nodes[parent];
        parent_node.children.insert(segment.key().to_string(), id);
        match kind {
            NodeKind::Placeholder => parent_node.placeholder_child = Some(id),
            NodeKind::Wildcard => parent_node.wildcard_child = Some(id),
            NodeKind::Static => {}
        }
        id
    }

    /// Detach empty leaves, walking towards the root.
    fn prune(&mut self, mut id: NodeId) {
        while id != ROOT {
            let node = &self.nodes[id];
            if !node.payload.is_empty() || !node.children.is_empty() {
                return;
            }
            let Some(parent) = node.parent else { return };
            let key = node.key.clone();

            let parent_node = &mut self.nodes[parent];
            parent_node.children.remove(&key);
            if parent_node.placeholder_child == Some(id) {
                parent_node.placeholder_child = None;
            }
            if parent_node.wildcard_child == Some(id) {
                parent_node.wildcard_child = None;
            }

            self.nodes[id] = RouteNode::new(NodeKind::Static, String::new(), None, None);
            self.free.push(id);
            id = parent;
        }
    }

    fn invalidate(&self) {
        self.cache.clear();
    }
}

impl<T: Clone> RouteTable<T> {
    /// Resolve `path` for `method`.
    ///
    /// Falls back to a payload registered for [`Method::All`]. Returns
    /// `Ok(None)` when nothing matches.
    pub fn lookup(&self, path: &str, method: Method) -> Result<Option<RouteMatch<T>>, MatchError> {
        let trimmed = trim_path(path, &self.options);
        let cache_id = format!("{trimmed}#{method}");

        if self.options.cache_size > 0 {
            if let Some(hit) = self.cache.get(&cache_id) {
                metrics::record_match_cache(true);
                return Ok(hit.value().clone());
            }
            metrics::record_match_cache(false);
        }

        let resolved = self.resolve(&trimmed, method)?;

        if self.options.cache_size > 0 {
            if self.cache.len() >= self.options.cache_size {
                self.cache.clear();
            }
            self.cache.insert(cache_id, resolved.clone());
        }
        Ok(resolved)
    }

    fn resolve(&self, trimmed: &str, method: Method) -> Result<Option<RouteMatch<T>>, MatchError> {
        let folded = fold_case(trimmed, &self.options);

        if let Some(&id) = self.static_routes.get(&folded) {
            if let Some(entry) = self.nodes[id].entry_for(method) {
                return Ok(Some(RouteMatch {
                    payload: entry.payload.clone(),
                    params: None,
                }));
            }
        }

        let original: Vec<&str> = split_segments(trimmed).collect();
        let lookup_keys: Vec<&str> = split_segments(&folded).collect();

        let mut node = Some(ROOT);
        let mut values: Vec<String> = Vec::new();
        // Every wildcard passed on the way down, shallowest first:
        // (wildcard node, captured values before it, remainder)
        let mut fallbacks: Vec<(NodeId, usize, String)> = Vec::new();

        for (i, key) in lookup_keys.iter().enumerate() {
            let Some(current_id) = node else { break };
            let current = &self.nodes[current_id];

            if let Some(wildcard) = current.wildcard_child {
                fallbacks.push((wildcard, values.len(), original[i..].join("/")));
            }

            let literal = (*key != PLACEHOLDER_KEY && *key != WILDCARD_KEY)
                .then(|| current.children.get(*key))
                .flatten()
                .filter(|id| self.nodes[**id].kind == NodeKind::Static);

            node = match (literal, current.placeholder_child) {
                (Some(&next), _) => Some(next),
                (None, Some(placeholder)) => {
                    values.push(original[i].to_string());
                    Some(placeholder)
                }
                (None, None) => None,
            };
        }

        if let Some(id) = node {
            if let Some(entry) = self.nodes[id].entry_for(method) {
                return Ok(Some(self.build(entry, values)));
            }
            // A wildcard directly below the final node matches an empty remainder.
            if let Some(wildcard) = self.nodes[id].wildcard_child {
                fallbacks.push((wildcard, values.len(), String::new()));
            }
        }

        // Deepest wildcard that accepts the method wins.
        for (wildcard, keep, rest) in fallbacks.iter().rev() {
            if let Some(entry) = self.nodes[*wildcard].entry_for(method) {
                values.truncate(*keep);
                values.push(rest.clone());
                return Ok(Some(self.build(entry, values)));
            }
        }

        if self.options.strict_methods {
            let mut allowed: Vec<Method> = node
                .into_iter()
                .chain(fallbacks.iter().map(|(w, _, _)| *w))
                .flat_map(|id| self.nodes[id].allowed())
                .collect();
            if !allowed.is_empty() {
                allowed.sort();
                allowed.dedup();
                return Err(MatchError::MethodNotAllowed {
                    path: trimmed.to_string(),
                    method,
                    allowed,
                });
            }
        }

        Ok(None)
    }

    fn build(&self, entry: &Entry<T>, values: Vec<String>) -> RouteMatch<T> {
        let params = if entry.param_names.is_empty() {
            None
        } else {
            Some(entry.param_names.iter().cloned().zip(values).collect())
        };
        RouteMatch {
            payload: entry.payload.clone(),
            params,
        }
    }
}
