//! Token reissue against the auth upstream.
//!
//! `POST <auth><reissue_path>` with the caller's `Authorization` and refresh
//! headers; the answer is bodiless and carries the new pair in
//! `Authorization` and `Set-Cookie`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, Method, Request, StatusCode};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use thiserror::Error;

use crate::resilience::timeouts::with_deadline;
use crate::upstream::UpstreamResolver;

#[derive(Debug, Clone, Error)]
pub enum ReissueError {
    #[error("auth upstream `{0}` is not resolvable")]
    UnknownUpstream(String),

    #[error("reissue timed out after {0:?}")]
    Timeout(Duration),

    #[error("reissue transport error: {0}")]
    Transport(String),

    #[error("auth upstream answered {0}")]
    Rejected(StatusCode),

    #[error("auth upstream returned no Authorization header")]
    MissingAuthorization,

    #[error("failed to build reissue request: {0}")]
    Request(String),
}

/// Credentials forwarded unchanged to the auth upstream.
#[derive(Debug, Clone)]
pub struct ReissueRequest {
    pub authorization: HeaderValue,
    pub refresh: HeaderValue,
}

/// New credentials returned by the auth upstream.
#[derive(Debug, Clone)]
pub struct ReissuedTokens {
    /// `Bearer <access token>`.
    pub authorization: HeaderValue,
    pub set_cookie: Vec<HeaderValue>,
}

impl ReissuedTokens {
    /// Value of cookie `name` among the `Set-Cookie` headers.
    pub fn cookie_value(&self, name: &str) -> Option<HeaderValue> {
        self.set_cookie
            .iter()
            .filter_map(|cookie| cookie.to_str().ok())
            .filter_map(|cookie| cookie.split(';').next())
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .and_then(|(_, value)| HeaderValue::from_str(value).ok())
    }
}

pub trait Reissuer: Send + Sync + fmt::Debug {
    fn reissue(&self, request: ReissueRequest) -> BoxFuture<'_, Result<ReissuedTokens, ReissueError>>;
}

/// Reissues over HTTP with the shared pooled client.
#[derive(Debug, Clone)]
pub struct HttpReissuer {
    client: Client<HttpConnector, Body>,
    resolver: Arc<dyn UpstreamResolver>,
    upstream: String,
    path: String,
    refresh_header: HeaderName,
    timeout: Duration,
}

impl HttpReissuer {
    pub fn new(
        client: Client<HttpConnector, Body>,
        resolver: Arc<dyn UpstreamResolver>,
        upstream: impl Into<String>,
        path: impl Into<String>,
        refresh_header: HeaderName,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            resolver,
            upstream: upstream.into(),
            path: path.into(),
            refresh_header,
            timeout,
        }
    }

    async fn call(&self, request: ReissueRequest) -> Result<ReissuedTokens, ReissueError> {
        let addr = self
            .resolver
            .resolve(&self.upstream)
            .ok_or_else(|| ReissueError::UnknownUpstream(self.upstream.clone()))?;

        let outbound = Request::builder()
            .method(Method::POST)
            .uri(format!("http://{addr}{}", self.path))
            .header(header::AUTHORIZATION, request.authorization)
            .header(self.refresh_header.clone(), request.refresh)
            .body(Body::empty())
            .map_err(|e| ReissueError::Request(e.to_string()))?;

        let response = with_deadline(self.timeout, self.client.request(outbound))
            .await
            .map_err(|_| ReissueError::Timeout(self.timeout))?
            .map_err(|e| ReissueError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ReissueError::Rejected(response.status()));
        }

        let headers = response.headers();
        let authorization = headers
            .get(header::AUTHORIZATION)
            .cloned()
            .ok_or(ReissueError::MissingAuthorization)?;
        let set_cookie = headers.get_all(header::SET_COOKIE).iter().cloned().collect();

        Ok(ReissuedTokens { authorization, set_cookie })
    }
}

impl Reissuer for HttpReissuer {
    fn reissue(&self, request: ReissueRequest) -> BoxFuture<'_, Result<ReissuedTokens, ReissueError>> {
        self.call(request).boxed()
    }
}
