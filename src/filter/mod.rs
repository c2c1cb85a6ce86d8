//! Filter subsystem.
//!
//! # Data Flow
//! ```text
//! Exchange (method, uri, headers, body if buffered)
//!     → chain.rs (run route filters in declared order)
//!         → authenticate.rs (verify / reissue, inject identity headers)
//!         → admin.rs (require ROLE_ADMIN, strip path prefix)
//!         → password.rs (hash password field in JSON body)
//!         → login.rs (register X-USER-ID response header)
//!     → Forward(Exchange) | Respond { response, pending }
//! ```
//!
//! # Design Decisions
//! - One `Filter` trait; a chain is a `Vec<Arc<dyn Filter>>`
//! - Exchanges are values: a filter returns a new one instead of editing
//! - Response headers a filter wants are registered as pending and applied
//!   at commit time
//! - Filters are built once per route at startup and shared by all requests
//! - Only chains with a body-reading filter buffer the request body

pub mod admin;
pub mod authenticate;
pub mod chain;
pub mod exchange;
pub mod login;
pub mod password;

use std::fmt;
use std::sync::Arc;

use axum::http::HeaderName;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;

use crate::config::FilterConfig;
use crate::error::{AuthFailure, GatewayError};
use crate::observability::metrics;
use crate::rewrite::{FieldLocation, PasswordHasher};
use crate::token::TokenCodec;
use crate::upstream::Reissuer;

pub use admin::AdminAuthorizationFilter;
pub use authenticate::{AuthenticationFilter, USER_ID_HEADER, USER_ROLE_HEADER};
pub use chain::{ChainOutcome, FilterChain};
pub use exchange::{Exchange, PendingResponseHeader};
pub use login::LoginFilter;
pub use password::PasswordRewriteFilter;

/// Result of running one filter.
#[derive(Debug)]
pub enum FilterOutcome {
    /// Hand this exchange to the next filter.
    Continue(Exchange),
    /// Stop the chain and answer with this response.
    Terminal(Response),
}

impl FilterOutcome {
    /// The uniform 401, logged and counted under `filter`.
    pub fn unauthorized(filter: &'static str, failure: AuthFailure) -> Self {
        tracing::debug!(filter, reason = failure.as_str(), "Rejecting request");
        metrics::record_auth_outcome(filter, failure.as_str());
        FilterOutcome::Terminal(GatewayError::Unauthorized(failure).into_response())
    }
}

/// One unit of request processing within a route's chain.
pub trait Filter: Send + Sync + fmt::Debug {
    /// Stable name used in logs, metrics and the CLI.
    fn name(&self) -> &'static str;

    fn apply<'a>(&'a self, exchange: Exchange) -> BoxFuture<'a, Result<FilterOutcome, GatewayError>>;

    /// Whether the filter inspects the request body. Routes whose chain has
    /// no such filter stream the body upstream without buffering it.
    fn reads_body(&self) -> bool {
        false
    }
}

/// Shared collaborators filters are built from.
#[derive(Debug, Clone)]
pub struct FilterContext {
    pub codec: TokenCodec,
    pub reissuer: Arc<dyn Reissuer>,
    pub hasher: PasswordHasher,
    pub refresh_header: HeaderName,
    /// Cookie fallback for the refresh token; case-sensitive.
    pub refresh_cookie: String,
    pub reissue_path: String,
}

/// Instantiate the filter a config entry describes.
pub fn build_filter(config: &FilterConfig, context: &FilterContext) -> Arc<dyn Filter> {
    match config {
        FilterConfig::Authenticate => Arc::new(AuthenticationFilter::new(context.clone())),
        FilterConfig::AuthorizeAdmin { strip_prefix } => {
            Arc::new(AdminAuthorizationFilter::new(context.codec.clone(), *strip_prefix))
        }
        FilterConfig::HashPassword { parent, guard } => {
            let location = match (parent, guard) {
                (Some(parent), _) => FieldLocation::Nested { parent: parent.clone() },
                (None, Some(guard)) => FieldLocation::Guarded { guard: guard.clone() },
                (None, None) => FieldLocation::TopLevel,
            };
            Arc::new(PasswordRewriteFilter::new(location, context.hasher.clone()))
        }
        FilterConfig::Login => Arc::new(LoginFilter::new(context.codec.clone())),
    }
}
