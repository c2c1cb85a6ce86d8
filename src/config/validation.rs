//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference declared upstreams)
//! - Validate value ranges (timeouts > 0, bcrypt cost, addresses)
//! - Reject path globs the route matcher cannot compile
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use axum::http::{HeaderName, Method};
use thiserror::Error;

use crate::config::schema::{FilterConfig, GatewayConfig};
use crate::routing::matcher::PathPattern;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no routes configured")]
    NoRoutes,

    #[error("duplicate route id `{0}`")]
    DuplicateRoute(String),

    #[error("route `{0}` has no paths")]
    NoPaths(String),

    #[error("route `{route}`: invalid path `{path}`: {reason}")]
    InvalidPath { route: String, path: String, reason: String },

    #[error("route `{route}`: invalid method `{method}`")]
    InvalidMethod { route: String, method: String },

    #[error("route `{route}` references unknown upstream `{upstream}`")]
    UnknownUpstream { route: String, upstream: String },

    #[error("route `{route}`: hash_password sets both `parent` and `guard`")]
    AmbiguousPasswordLocation { route: String },

    #[error("duplicate upstream `{0}`")]
    DuplicateUpstream(String),

    #[error("upstream `{upstream}`: invalid address `{address}`")]
    InvalidAddress { upstream: String, address: String },

    #[error("upstream `{0}` has no addresses")]
    NoAddresses(String),

    #[error("auth.upstream `{0}` is not declared but authenticate filters need it")]
    MissingAuthUpstream(String),

    #[error("jwt.secret must not be empty")]
    EmptySecret,

    #[error("jwt.refresh_header `{0}` is not a valid header name")]
    InvalidRefreshHeader(String),

    #[error("hashing.cost {0} is outside 4..=31")]
    InvalidCost(u32),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.jwt.secret.is_empty() {
        errors.push(ValidationError::EmptySecret);
    }
    if HeaderName::try_from(config.jwt.refresh_header.as_str()).is_err() {
        errors.push(ValidationError::InvalidRefreshHeader(config.jwt.refresh_header.clone()));
    }
    if !(4..=31).contains(&config.hashing.cost) {
        errors.push(ValidationError::InvalidCost(config.hashing.cost));
    }
    if config.hashing.max_concurrent == 0 {
        errors.push(ValidationError::Zero("hashing.max_concurrent"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.upstream_secs"));
    }
    if config.auth.reissue_timeout_ms == 0 {
        errors.push(ValidationError::Zero("auth.reissue_timeout_ms"));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("listener.max_body_bytes"));
    }

    let mut upstreams = HashSet::new();
    for upstream in &config.upstreams {
        if !upstreams.insert(upstream.name.as_str()) {
            errors.push(ValidationError::DuplicateUpstream(upstream.name.clone()));
        }
        if upstream.addresses.is_empty() {
            errors.push(ValidationError::NoAddresses(upstream.name.clone()));
        }
        for address in &upstream.addresses {
            if address.parse::<SocketAddr>().is_err() {
                errors.push(ValidationError::InvalidAddress {
                    upstream: upstream.name.clone(),
                    address: address.clone(),
                });
            }
        }
    }

    if config.routes.is_empty() {
        errors.push(ValidationError::NoRoutes);
    }

    let mut route_ids = HashSet::new();
    let mut needs_auth_upstream = false;
    for route in &config.routes {
        if !route_ids.insert(route.id.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.id.clone()));
        }
        if route.paths.is_empty() {
            errors.push(ValidationError::NoPaths(route.id.clone()));
        }
        for path in &route.paths {
            if let Err(e) = PathPattern::parse(path) {
                errors.push(ValidationError::InvalidPath {
                    route: route.id.clone(),
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
        for method in &route.methods {
            if Method::from_bytes(method.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidMethod {
                    route: route.id.clone(),
                    method: method.clone(),
                });
            }
        }
        if !upstreams.contains(route.upstream.as_str()) {
            errors.push(ValidationError::UnknownUpstream {
                route: route.id.clone(),
                upstream: route.upstream.clone(),
            });
        }
        for filter in &route.filters {
            match filter {
                FilterConfig::Authenticate => needs_auth_upstream = true,
                FilterConfig::HashPassword { parent: Some(_), guard: Some(_) } => {
                    errors.push(ValidationError::AmbiguousPasswordLocation { route: route.id.clone() });
                }
                _ => {}
            }
        }
    }

    if needs_auth_upstream && !upstreams.contains(config.auth.upstream.as_str()) {
        errors.push(ValidationError::MissingAuthUpstream(config.auth.upstream.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
