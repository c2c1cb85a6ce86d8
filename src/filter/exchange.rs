//! The per-request value threaded through a filter chain.

use std::fmt;
use std::sync::Arc;

use axum::http::uri::PathAndQuery;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use bytes::Bytes;

/// Request state as seen by one filter.
///
/// Fields are private and every `with_*` call yields a new value, so a
/// filter can only hand a changed request to the next step, never edit the
/// one it was given.
#[derive(Debug, Clone)]
pub struct Exchange {
    request_id: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    pending: Vec<PendingResponseHeader>,
}

impl Exchange {
    pub fn new(
        request_id: impl Into<String>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            method,
            uri,
            headers,
            body,
            pending: Vec::new(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text; `None` when absent or not visible ASCII.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers.get(name.as_ref()).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn pending(&self) -> &[PendingResponseHeader] {
        &self.pending
    }

    /// Value of the cookie `name`, if the request carries one.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(axum::http::header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Replaces any existing values of `name`.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Swap the path, keeping the query string.
    pub fn with_path(mut self, path: &str) -> Result<Self, axum::http::Error> {
        let path_and_query = match self.uri.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        };

        let mut parts = self.uri.into_parts();
        parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
        self.uri = Uri::from_parts(parts)?;
        Ok(self)
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn with_pending_header(mut self, header: PendingResponseHeader) -> Self {
        self.pending.push(header);
        self
    }
}

type HeaderTransform = dyn Fn(&mut HeaderMap) + Send + Sync;

/// A response header write deferred until the response is committed.
#[derive(Clone)]
pub enum PendingResponseHeader {
    /// Append a fixed value.
    Append { name: HeaderName, value: HeaderValue },
    /// Run against the final response headers, e.g. to read what the
    /// upstream returned.
    Computed(Arc<HeaderTransform>),
}

impl PendingResponseHeader {
    pub fn append(name: HeaderName, value: HeaderValue) -> Self {
        PendingResponseHeader::Append { name, value }
    }

    pub fn computed(transform: Arc<HeaderTransform>) -> Self {
        PendingResponseHeader::Computed(transform)
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        match self {
            PendingResponseHeader::Append { name, value } => {
                headers.append(name.clone(), value.clone());
            }
            PendingResponseHeader::Computed(transform) => transform(headers),
        }
    }
}

impl fmt::Debug for PendingResponseHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingResponseHeader::Append { name, value } => f
                .debug_struct("Append")
                .field("name", name)
                .field("value", value)
                .finish(),
            PendingResponseHeader::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}
