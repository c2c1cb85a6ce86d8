//! Response construction and commit.
//!
//! # Responsibilities
//! - Render gateway errors in the shared JSON shape
//! - Apply pending response headers registered by filters
//! - Strip hop-by-hop headers from upstream responses
//!
//! # Design Decisions
//! - The 401 body is a fixed string, byte for byte, for every auth failure
//! - Pending headers are applied once, immediately before the response is returned

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;

use crate::filter::PendingResponseHeader;

/// Body of every 401 the gateway produces.
pub const UNAUTHORIZED_BODY: &str =
    r#"{"status": 401, "message": "UNAUTHORIZED", "details": "UNAUTHORIZED"}"#;

/// The uniform authentication failure response.
pub fn unauthorized() -> Response {
    json_response(StatusCode::UNAUTHORIZED, Body::from(UNAUTHORIZED_BODY))
}

/// `{"status": <code>, "message": "<REASON>", "details": <details>}`.
pub fn error_response(status: StatusCode, details: impl Into<String>) -> Response {
    let message = status
        .canonical_reason()
        .unwrap_or("ERROR")
        .to_ascii_uppercase()
        .replace(' ', "_");

    let body = serde_json::json!({
        "status": status.as_u16(),
        "message": message,
        "details": details.into(),
    });

    json_response(status, Body::from(body.to_string()))
}

/// Apply pending header transforms, in registration order.
pub fn commit(mut response: Response, pending: &[PendingResponseHeader]) -> Response {
    for transform in pending {
        transform.apply(response.headers_mut());
    }
    response
}

/// Connection-scoped headers; never relayed in either direction.
pub const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
];

/// Drop connection-scoped headers that must not be relayed to the client.
pub fn strip_hop_by_hop(mut response: Response) -> Response {
    let headers = response.headers_mut();
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
    response
}

fn json_response(status: StatusCode, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
