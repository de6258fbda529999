//! The immutable-after-parse request handed to handlers.

use bytes::Bytes;
use femto_http::protocol::RequestHead;
use http::{HeaderMap, Method};

/// Path parameters bound by a parameterized route pattern.
///
/// Values are the matched path segments verbatim; any numeric or typed
/// coercion is the handler's business.
#[derive(Debug, Clone, Default)]
pub struct PathParams {
    items: Vec<(String, String)>,
}

impl PathParams {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: &str, value: &str) {
        self.items.push((name.to_owned(), value.to_owned()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.items.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// One fully parsed request.
///
/// Owned by the connection handler for the request's lifetime and dropped
/// when the exchange completes. Headers hold only what the route's
/// save-set retained; the body is bounded by the route's `max_body_size`.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    query_string: String,
    headers: HeaderMap,
    body: Bytes,
    params: PathParams,
}

impl Request {
    pub(crate) fn new(head: &RequestHead, headers: HeaderMap, body: Bytes, params: PathParams) -> Self {
        Self {
            method: head.method().clone(),
            path: head.path().to_owned(),
            query_string: head.query().to_owned(),
            headers,
            body,
            params,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string, empty when the request line carried none.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Path parameter by name; shorthand for `params().get(name)`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}
