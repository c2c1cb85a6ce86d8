//! Gateway error types and their client-facing responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::response::{error_response, unauthorized};
use crate::rewrite::BodyRewriteError;
use crate::token::TokenError;
use crate::upstream::ForwardError;

/// Why a request failed authentication or authorization.
///
/// Every variant renders as the same 401; the kind is only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("malformed token")]
    MalformedToken,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("expired token")]
    ExpiredToken,

    #[error("missing token")]
    MissingToken,

    #[error("role mismatch")]
    RoleMismatch,

    #[error("token reissue failed")]
    UpstreamReissueFailure,
}

impl AuthFailure {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFailure::MalformedToken => "malformed_token",
            AuthFailure::InvalidSignature => "invalid_signature",
            AuthFailure::ExpiredToken => "expired_token",
            AuthFailure::MissingToken => "missing_token",
            AuthFailure::RoleMismatch => "role_mismatch",
            AuthFailure::UpstreamReissueFailure => "reissue_failure",
        }
    }
}

impl From<TokenError> for AuthFailure {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthFailure::ExpiredToken,
            TokenError::InvalidSignature => AuthFailure::InvalidSignature,
            TokenError::Malformed(_)
            | TokenError::WrongCategory { .. }
            | TokenError::MissingClaim(_)
            | TokenError::Signing(_) => AuthFailure::MalformedToken,
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no route for {method} {path}")]
    NoRoute { method: String, path: String },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error(transparent)]
    BodyParse(#[from] BodyRewriteError),

    #[error("unauthorized: {0}")]
    Unauthorized(AuthFailure),

    #[error("no address for upstream `{0}`")]
    UpstreamUnavailable(String),

    #[error(transparent)]
    Forward(#[from] ForwardError),

    #[error("failed to build request: {0}")]
    Http(#[from] axum::http::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NoRoute { .. } => StatusCode::NOT_FOUND,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::BodyRead(_) => StatusCode::BAD_REQUEST,
            GatewayError::BodyParse(_) | GatewayError::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Forward(ForwardError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Forward(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            // Auth details never leave the gateway.
            GatewayError::Unauthorized(_) => unauthorized(),
            GatewayError::Forward(_) | GatewayError::Http(_) => {
                let status = self.status();
                error_response(status, status.canonical_reason().unwrap_or_default())
            }
            other => error_response(other.status(), other.to_string()),
        }
    }
}
