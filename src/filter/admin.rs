//! Admin-only routes.
//!
//! No anonymous passthrough and no reissue: anything short of a valid,
//! unexpired `ROLE_ADMIN` access token is the uniform 401.

use axum::http::header;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::{AuthFailure, GatewayError};
use crate::filter::{Exchange, Filter, FilterOutcome};
use crate::observability::metrics;
use crate::token::{bearer_token, TokenCodec};

pub const ADMIN_ROLE: &str = "ROLE_ADMIN";

const NAME: &str = "authorize_admin";

#[derive(Debug)]
pub struct AdminAuthorizationFilter {
    codec: TokenCodec,
    strip_prefix: usize,
}

impl AdminAuthorizationFilter {
    pub fn new(codec: TokenCodec, strip_prefix: usize) -> Self {
        Self { codec, strip_prefix }
    }

    fn authorize(&self, exchange: &Exchange) -> Result<(), AuthFailure> {
        let token = exchange
            .header(header::AUTHORIZATION)
            .and_then(bearer_token)
            .ok_or(AuthFailure::MissingToken)?;
        let claims = self.codec.verify_access(token)?;

        if claims.role != ADMIN_ROLE {
            return Err(AuthFailure::RoleMismatch);
        }
        Ok(())
    }
}

impl Filter for AdminAuthorizationFilter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply<'a>(&'a self, exchange: Exchange) -> BoxFuture<'a, Result<FilterOutcome, GatewayError>> {
        async move {
            if let Err(failure) = self.authorize(&exchange) {
                return Ok(FilterOutcome::unauthorized(NAME, failure));
            }
            metrics::record_auth_outcome(NAME, "admin");

            if self.strip_prefix == 0 {
                return Ok(FilterOutcome::Continue(exchange));
            }
            let path = strip_segments(exchange.path(), self.strip_prefix);
            Ok(FilterOutcome::Continue(exchange.with_path(&path)?))
        }
        .boxed()
    }
}

/// Drop the first `count` segments: `/admin/api/books`, 1 → `/api/books`.
pub fn strip_segments(path: &str, count: usize) -> String {
    let rest: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .skip(count)
        .collect();

    let mut stripped = format!("/{}", rest.join("/"));
    if path.ends_with('/') && !rest.is_empty() {
        stripped.push('/');
    }
    stripped
}
