//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener, shut down gracefully
//! - Match route, buffer the body when the chain rewrites it, run filter
//!   chain, forward upstream
//! - Commit pending response headers and record per-request logs/metrics

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use bytes::Bytes;
use http_body_util::LengthLimitError;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::filter::{ChainOutcome, Exchange};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::commit;
use crate::lifecycle::startup::{build_state, StartupError};
use crate::observability::metrics;
use crate::routing::{Route, Router as RouteTable};
use crate::upstream::{Forwarder, OutboundBody, UpstreamResolver};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<RouteTable>,
    pub resolver: Arc<dyn UpstreamResolver>,
    pub forwarder: Forwarder,
    pub max_body_bytes: usize,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Build every subsystem from `config`.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let state = build_state(&config)?;
        Ok(Self::from_state(config, state))
    }

    pub fn from_state(config: GatewayConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::with_status_code(
                        StatusCode::REQUEST_TIMEOUT,
                        Duration::from_secs(config.timeouts.request_secs),
                    )),
            )
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.config.routes.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Route, filter and forward one request.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let request_id = request_id(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let Some(route) = state.router.match_route(&method, &path) else {
        tracing::warn!(request_id = %request_id, %method, %path, "No route matched");
        metrics::record_request("none", 404, started);
        return GatewayError::NoRoute {
            method: method.to_string(),
            path,
        }
        .into_response();
    };

    let response = handle(&state, route, request_id.clone(), request).await;

    let status = response.status();
    tracing::info!(
        request_id = %request_id,
        %method,
        %path,
        route = route.id(),
        status = status.as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );
    metrics::record_request(route.id(), status.as_u16(), started);

    response
}

async fn handle(state: &AppState, route: &Route, request_id: String, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();

    // Only chains that rewrite the body pay for buffering it.
    let (buffered, outbound) = if route.chain().reads_body() {
        match axum::body::to_bytes(body, state.max_body_bytes).await {
            Ok(bytes) => (bytes, OutboundBody::Buffered),
            Err(e) => {
                tracing::debug!(request_id = %request_id, error = %e, "Failed to buffer request body");
                return body_error(e, state.max_body_bytes).into_response();
            }
        }
    } else {
        (Bytes::new(), OutboundBody::Streaming(body))
    };

    let exchange = Exchange::new(request_id, parts.method, parts.uri, parts.headers, buffered);

    match route.chain().execute(exchange).await {
        ChainOutcome::Forward(exchange) => {
            let response = match forward(state, route, &exchange, outbound).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(request_id = exchange.request_id(), route = route.id(), error = %e, "Forward failed");
                    e.into_response()
                }
            };
            commit(response, exchange.pending())
        }
        ChainOutcome::Respond { response, pending } => commit(response, &pending),
    }
}

/// 413 only when the limit was hit; any other read failure is the client's.
fn body_error(error: axum::Error, limit: usize) -> GatewayError {
    let error = error.into_inner();
    if error.downcast_ref::<LengthLimitError>().is_some() {
        GatewayError::PayloadTooLarge { limit }
    } else {
        GatewayError::BodyRead(error.to_string())
    }
}

async fn forward(
    state: &AppState,
    route: &Route,
    exchange: &Exchange,
    body: OutboundBody,
) -> Result<Response, GatewayError> {
    let addr = state
        .resolver
        .resolve(route.upstream())
        .ok_or_else(|| GatewayError::UpstreamUnavailable(route.upstream().to_string()))?;

    tracing::debug!(request_id = exchange.request_id(), upstream = route.upstream(), %addr, "Forwarding");
    Ok(state.forwarder.forward(exchange, body, addr).await?)
}
