//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over routes (acceptable for typical route counts)
//! - Precedence is an explicit key, never declaration order alone
//! - Explicit NoMatch rather than silent default

use std::sync::Arc;

use axum::http::Method;
use thiserror::Error;

use crate::config::{FilterConfig, RouteConfig};
use crate::filter::{Filter, FilterChain};
use crate::routing::matcher::{MethodMatcher, PathPattern, PatternError, Specificity};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route `{route}`: invalid path `{path}`: {source}")]
    Pattern {
        route: String,
        path: String,
        #[source]
        source: PatternError,
    },

    #[error("route `{route}`: invalid method `{method}`")]
    Method { route: String, method: String },
}

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    id: String,
    patterns: Vec<PathPattern>,
    methods: MethodMatcher,
    chain: FilterChain,
    upstream: String,
    priority: i32,
}

impl Route {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }

    pub fn methods(&self) -> &MethodMatcher {
        &self.methods
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Precedence of this route for `path`, or `None` if it does not match.
    fn precedence(&self, method: &Method, path: &str) -> Option<Precedence> {
        if !self.methods.matches(method) {
            return None;
        }

        let specificity = self
            .patterns
            .iter()
            .filter(|pattern| pattern.matches(path))
            .map(PathPattern::specificity)
            .max()?;

        Some(Precedence {
            priority: self.priority,
            method_qualified: self.methods.is_qualified(),
            specificity,
        })
    }
}

/// Ordering key among routes matching the same request. Fields compare in
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Precedence {
    priority: i32,
    method_qualified: bool,
    specificity: Specificity,
}

/// Immutable route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Compile the route table. `build` turns each filter entry into a filter.
    pub fn from_config<F>(configs: &[RouteConfig], build: F) -> Result<Self, RouteError>
    where
        F: Fn(&FilterConfig) -> Arc<dyn Filter>,
    {
        let routes = configs
            .iter()
            .map(|config| {
                let patterns = config
                    .paths
                    .iter()
                    .map(|path| {
                        PathPattern::parse(path).map_err(|source| RouteError::Pattern {
                            route: config.id.clone(),
                            path: path.clone(),
                            source,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                let methods = config
                    .methods
                    .iter()
                    .map(|method| {
                        Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
                            RouteError::Method {
                                route: config.id.clone(),
                                method: method.clone(),
                            }
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Route {
                    id: config.id.clone(),
                    patterns,
                    methods: MethodMatcher::new(methods),
                    chain: FilterChain::new(config.filters.iter().map(&build).collect()),
                    upstream: config.upstream.clone(),
                    priority: config.priority,
                })
            })
            .collect::<Result<Vec<_>, RouteError>>()?;

        Ok(Self { routes })
    }

    /// Find the route that handles `method path`.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<&Route> {
        let mut best: Option<(Precedence, &Route)> = None;

        for route in &self.routes {
            let Some(precedence) = route.precedence(method, path) else {
                continue;
            };
            // Strictly greater: ties keep the earlier declaration.
            if best.as_ref().map_or(true, |(current, _)| precedence > *current) {
                best = Some((precedence, route));
            }
        }

        best.map(|(_, route)| route)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
