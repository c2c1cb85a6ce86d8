//! Startup orchestration.
//!
//! # Responsibilities
//! - Build shared collaborators (HTTP client, resolver, codec, hasher)
//! - Compile the route table with each route's filter chain
//! - Hand the immutable state to the HTTP server
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::InvalidHeaderName;
use axum::http::HeaderName;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::filter::{build_filter, FilterContext};
use crate::http::server::AppState;
use crate::rewrite::PasswordHasher;
use crate::routing::{RouteError, Router};
use crate::token::TokenCodec;
use crate::upstream::{Forwarder, HttpReissuer, Reissuer, StaticResolver, UpstreamResolver};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("invalid refresh header name: {0}")]
    RefreshHeader(#[from] InvalidHeaderName),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Pooled client shared by forwarding and reissue.
pub fn http_client() -> Client<HttpConnector, Body> {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// Wire every subsystem the request path needs.
pub fn build_state(config: &GatewayConfig) -> Result<AppState, StartupError> {
    let client = http_client();
    let resolver: Arc<dyn UpstreamResolver> = Arc::new(StaticResolver::from_config(&config.upstreams));
    let refresh_header = HeaderName::try_from(config.jwt.refresh_header.as_str())?;

    let reissuer: Arc<dyn Reissuer> = Arc::new(HttpReissuer::new(
        client.clone(),
        resolver.clone(),
        config.auth.upstream.as_str(),
        config.auth.reissue_path.as_str(),
        refresh_header.clone(),
        Duration::from_millis(config.auth.reissue_timeout_ms),
    ));

    let context = FilterContext {
        codec: TokenCodec::from_config(&config.jwt),
        reissuer,
        hasher: PasswordHasher::from_config(&config.hashing),
        refresh_header,
        refresh_cookie: config.jwt.refresh_header.clone(),
        reissue_path: config.auth.reissue_path.clone(),
    };

    let router = Router::from_config(&config.routes, |filter| build_filter(filter, &context))?;
    tracing::info!(routes = router.routes().len(), "Route table compiled");

    Ok(AppState {
        router: Arc::new(router),
        resolver,
        forwarder: Forwarder::new(client, Duration::from_secs(config.timeouts.upstream_secs)),
        max_body_bytes: config.listener.max_body_bytes,
    })
}
