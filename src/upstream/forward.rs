//! Sends the final exchange to its upstream.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use axum::response::Response;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use thiserror::Error;

use crate::filter::Exchange;
use crate::http::request::X_REQUEST_ID;
use crate::http::response::{strip_hop_by_hop, HOP_BY_HOP};
use crate::resilience::timeouts::with_deadline;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),

    #[error("upstream request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("invalid upstream request: {0}")]
    Request(#[from] axum::http::Error),
}

/// Request body handed to the upstream.
#[derive(Debug)]
pub enum OutboundBody {
    /// The exchange's buffered bytes, possibly rewritten by a filter.
    Buffered,
    /// The client's body, relayed as it arrives.
    Streaming(Body),
}

/// Forwards exchanges over the pooled client.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(client: Client<HttpConnector, Body>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn forward(
        &self,
        exchange: &Exchange,
        body: OutboundBody,
        addr: SocketAddr,
    ) -> Result<Response, ForwardError> {
        let request = outbound_request(exchange, body, addr)?;

        let response: hyper::Response<hyper::body::Incoming> =
            with_deadline(self.timeout, self.client.request(request))
                .await
                .map_err(|_| ForwardError::Timeout(self.timeout))??;

        let (parts, body) = response.into_parts();
        Ok(strip_hop_by_hop(Response::from_parts(parts, Body::new(body))))
    }
}

fn outbound_request(
    exchange: &Exchange,
    body: OutboundBody,
    addr: SocketAddr,
) -> Result<Request<Body>, axum::http::Error> {
    let path_and_query = exchange
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let mut builder = Request::builder()
        .method(exchange.method().clone())
        .uri(format!("http://{addr}{path_and_query}"));

    // A rewritten body changes size; a streamed one keeps the client's length.
    let (body, length) = match body {
        OutboundBody::Buffered => {
            let bytes = exchange.body().clone();
            let length = (!bytes.is_empty()).then(|| HeaderValue::from(bytes.len()));
            (Body::from(bytes), length)
        }
        OutboundBody::Streaming(body) => (body, exchange.headers().get(header::CONTENT_LENGTH).cloned()),
    };

    if let Some(headers) = builder.headers_mut() {
        for (name, value) in exchange.headers() {
            // Host comes from the upstream address, length from the body sent.
            if *name == header::HOST || *name == header::CONTENT_LENGTH || HOP_BY_HOP.contains(name) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
        if let Ok(id) = HeaderValue::from_str(exchange.request_id()) {
            headers.insert(X_REQUEST_ID, id);
        }
        if let Some(length) = length {
            headers.insert(header::CONTENT_LENGTH, length);
        }
    }

    builder.body(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::testing::exchange;
    use axum::http::{HeaderName, Method};
    use bytes::Bytes;

    #[test]
    fn test_outbound_request_shape() {
        let exchange = exchange(Method::POST, "/api/members?x=1")
            .with_header(header::HOST, HeaderValue::from_static("gateway.example"))
            .with_header(header::CONTENT_LENGTH, HeaderValue::from_static("3"))
            .with_header(HeaderName::from_static("x-user-id"), HeaderValue::from_static("alice"))
            .with_body(Bytes::from_static(br#"{"password":"$2a$04$..."}"#));
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();

        let request = outbound_request(&exchange, OutboundBody::Buffered, addr).unwrap();

        assert_eq!(request.uri(), "http://127.0.0.1:9000/api/members?x=1");
        assert_eq!(request.method(), Method::POST);
        assert!(request.headers().get(header::HOST).is_none());
        assert_eq!(request.headers()[header::CONTENT_LENGTH], "25");
        assert_eq!(request.headers()["x-user-id"], "alice");
        assert_eq!(request.headers()[X_REQUEST_ID], "test");
    }

    #[test]
    fn test_streamed_body_keeps_client_length() {
        let exchange = exchange(Method::PUT, "/api/books/1")
            .with_header(header::CONTENT_LENGTH, HeaderValue::from_static("11"))
            .with_header(header::CONNECTION, HeaderValue::from_static("keep-alive"))
            .with_header(header::TE, HeaderValue::from_static("trailers"))
            .with_header(HeaderName::from_static("keep-alive"), HeaderValue::from_static("timeout=5"))
            .with_header(HeaderName::from_static("proxy-connection"), HeaderValue::from_static("keep-alive"));
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();

        let request =
            outbound_request(&exchange, OutboundBody::Streaming(Body::from("hello world")), addr).unwrap();

        assert_eq!(request.headers()[header::CONTENT_LENGTH], "11");
        for name in ["connection", "te", "keep-alive", "proxy-connection"] {
            assert!(request.headers().get(name).is_none(), "{name} relayed");
        }
    }

    #[test]
    fn test_empty_buffered_body_has_no_length() {
        let exchange = exchange(Method::GET, "/api/books");
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();

        let request = outbound_request(&exchange, OutboundBody::Buffered, addr).unwrap();

        assert!(request.headers().get(header::CONTENT_LENGTH).is_none());
    }
}
