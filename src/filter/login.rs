//! Exposes the user id of a token the auth service just issued.
//!
//! The token only exists on the upstream response, so the filter registers
//! a computed pending header that inspects the response at commit time.

use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::GatewayError;
use crate::filter::{Exchange, Filter, FilterOutcome, PendingResponseHeader, USER_ID_HEADER};
use crate::token::{bearer_token, TokenCodec};

#[derive(Debug)]
pub struct LoginFilter {
    codec: TokenCodec,
}

impl LoginFilter {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }
}

impl Filter for LoginFilter {
    fn name(&self) -> &'static str {
        "login"
    }

    fn apply<'a>(&'a self, exchange: Exchange) -> BoxFuture<'a, Result<FilterOutcome, GatewayError>> {
        let codec = self.codec.clone();
        let transform = move |headers: &mut HeaderMap| {
            let subject = headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(bearer_token)
                .and_then(|token| codec.verify_access(token).ok())
                .map(|claims| claims.subject);

            if let Some(value) = subject.and_then(|s| HeaderValue::from_str(&s).ok()) {
                headers.insert(USER_ID_HEADER, value);
            }
        };

        let exchange = exchange.with_pending_header(PendingResponseHeader::computed(Arc::new(transform)));
        async move { Ok(FilterOutcome::Continue(exchange)) }.boxed()
    }
}
