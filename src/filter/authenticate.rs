//! Access token validation with transparent reissue.
//!
//! # States
//! ```text
//! no Authorization ────────────────────────────────→ Continue (unmodified)
//! Authorization, not Bearer ──────────────────────→ 401
//! token → verify ─┬─ valid ──→ identity headers ──→ Continue
//!                 ├─ expired → reissue ─┬─ ok ────→ Continue with new token
//!                 │                     └─ failed → 401
//!                 └─ invalid ─────────────────────→ 401
//! ```
//!
//! Requests to the reissue endpoint itself always pass through, so a client
//! can refresh with an expired access token.

use axum::http::{header, HeaderName, HeaderValue};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::{AuthFailure, GatewayError};
use crate::filter::{Exchange, Filter, FilterContext, FilterOutcome, PendingResponseHeader};
use crate::observability::metrics;
use crate::token::{bearer_token, Claims, TokenError};
use crate::upstream::{ReissueRequest, ReissuedTokens};

pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
pub const USER_ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-role");

const NAME: &str = "authenticate";

#[derive(Debug)]
pub struct AuthenticationFilter {
    context: FilterContext,
}

impl AuthenticationFilter {
    pub fn new(context: FilterContext) -> Self {
        Self { context }
    }

    async fn authenticate(&self, exchange: Exchange) -> Result<FilterOutcome, GatewayError> {
        if exchange.path() == self.context.reissue_path {
            return Ok(FilterOutcome::Continue(exchange));
        }

        if !exchange.headers().contains_key(header::AUTHORIZATION) {
            metrics::record_auth_outcome(NAME, "anonymous");
            return Ok(FilterOutcome::Continue(exchange));
        }
        // Present but not a bearer credential: never relay it anonymously.
        let Some(token) = exchange.header(header::AUTHORIZATION).and_then(bearer_token) else {
            return Ok(FilterOutcome::unauthorized(NAME, AuthFailure::MalformedToken));
        };
        let verdict = self.context.codec.verify_access(token);

        match verdict {
            Ok(claims) => match with_identity(exchange, &claims) {
                Ok(exchange) => {
                    metrics::record_auth_outcome(NAME, "valid");
                    Ok(FilterOutcome::Continue(exchange))
                }
                Err(failure) => Ok(FilterOutcome::unauthorized(NAME, failure)),
            },
            Err(TokenError::Expired) => Ok(self.reissue(exchange).await),
            Err(e) => {
                tracing::debug!(request_id = exchange.request_id(), error = %e, "Token rejected");
                Ok(FilterOutcome::unauthorized(NAME, e.into()))
            }
        }
    }

    async fn reissue(&self, exchange: Exchange) -> FilterOutcome {
        let refresh = exchange
            .headers()
            .get(&self.context.refresh_header)
            .cloned()
            .or_else(|| {
                exchange
                    .cookie(&self.context.refresh_cookie)
                    .and_then(|value| HeaderValue::from_str(value).ok())
            });
        let (Some(authorization), Some(refresh)) =
            (exchange.headers().get(header::AUTHORIZATION).cloned(), refresh)
        else {
            return FilterOutcome::unauthorized(NAME, AuthFailure::ExpiredToken);
        };

        let request = ReissueRequest { authorization, refresh };
        let tokens = match self.context.reissuer.reissue(request).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(request_id = exchange.request_id(), error = %e, "Token reissue failed");
                metrics::record_reissue("failure");
                return FilterOutcome::unauthorized(NAME, AuthFailure::UpstreamReissueFailure);
            }
        };

        match self.apply_reissued(exchange, &tokens) {
            Ok(exchange) => {
                metrics::record_reissue("success");
                metrics::record_auth_outcome(NAME, "reissued");
                FilterOutcome::Continue(exchange)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Reissued token rejected");
                metrics::record_reissue("failure");
                FilterOutcome::unauthorized(NAME, AuthFailure::UpstreamReissueFailure)
            }
        }
    }

    /// Carry the new pair downstream and register it for the client response.
    fn apply_reissued(&self, exchange: Exchange, tokens: &ReissuedTokens) -> Result<Exchange, TokenError> {
        let token = tokens
            .authorization
            .to_str()
            .ok()
            .and_then(bearer_token)
            .ok_or_else(|| TokenError::Malformed("reissue returned no bearer token".into()))?;
        let claims = self.context.codec.verify_access(token)?;

        let mut exchange = with_identity(exchange, &claims)
            .map_err(|_| TokenError::Malformed("claims are not valid header values".into()))?
            .with_header(header::AUTHORIZATION, tokens.authorization.clone())
            .with_pending_header(PendingResponseHeader::append(
                header::AUTHORIZATION,
                tokens.authorization.clone(),
            ));

        if let Some(refresh) = tokens.cookie_value(&self.context.refresh_cookie) {
            exchange = exchange.with_header(self.context.refresh_header.clone(), refresh);
        }
        for cookie in &tokens.set_cookie {
            exchange = exchange.with_pending_header(PendingResponseHeader::append(
                header::SET_COOKIE,
                cookie.clone(),
            ));
        }

        Ok(exchange)
    }
}

impl Filter for AuthenticationFilter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply<'a>(&'a self, exchange: Exchange) -> BoxFuture<'a, Result<FilterOutcome, GatewayError>> {
        self.authenticate(exchange).boxed()
    }
}

/// Overwrite identity headers with the token's subject and role.
fn with_identity(exchange: Exchange, claims: &Claims) -> Result<Exchange, AuthFailure> {
    let user_id = HeaderValue::from_str(&claims.subject).map_err(|_| AuthFailure::MalformedToken)?;
    let role = HeaderValue::from_str(&claims.role).map_err(|_| AuthFailure::MalformedToken)?;

    Ok(exchange
        .with_header(USER_ID_HEADER, user_id)
        .with_header(USER_ROLE_HEADER, role))
}
