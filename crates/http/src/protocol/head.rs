//! Parsed request head with lazily materialized headers.
//!
//! The decoder hands out a [`RequestHead`] as soon as the head section is
//! complete, but header values stay as byte ranges into the frozen head
//! buffer until the route's save-set is known. Only the retained names are
//! ever copied into a `HeaderMap`; everything else is dropped with the
//! buffer. `Content-Length` is the one header the engine always scans,
//! since body framing cannot wait for route resolution.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Version};

use crate::protocol::PayloadSize;

/// Byte ranges of one header's name and value inside the head buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HeaderIndex {
    pub(crate) name: (usize, usize),
    pub(crate) value: (usize, usize),
}

/// The parsed head of an incoming request.
#[derive(Debug)]
pub struct RequestHead {
    method: Method,
    path: String,
    query: String,
    version: Version,
    head_bytes: Bytes,
    indices: Vec<HeaderIndex>,
    content_length: Option<u64>,
}

impl RequestHead {
    pub(crate) fn new(
        method: Method,
        path: String,
        query: String,
        version: Version,
        head_bytes: Bytes,
        indices: Vec<HeaderIndex>,
        content_length: Option<u64>,
    ) -> Self {
        Self { method, path, query, version, head_bytes, indices, content_length }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string; empty when the request line carried none.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// The always-scanned `Content-Length`, if the request carried one.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Whether this request's method carries a body at all.
    ///
    /// GET, HEAD, DELETE, OPTIONS and CONNECT never do, whatever their
    /// headers claim.
    pub fn need_body(&self) -> bool {
        !matches!(self.method(), &Method::GET | &Method::HEAD | &Method::DELETE | &Method::OPTIONS | &Method::CONNECT)
    }

    /// Body framing derived from the method gate and `Content-Length`.
    pub fn payload_size(&self) -> PayloadSize {
        if !self.need_body() {
            return PayloadSize::Empty;
        }
        match self.content_length {
            Some(0) | None => PayloadSize::Empty,
            Some(n) => PayloadSize::Length(n),
        }
    }

    /// Number of header lines in the head section.
    pub fn header_count(&self) -> usize {
        self.indices.len()
    }

    /// Materializes the retained headers.
    ///
    /// Only names listed in `save` are copied out of the head buffer; with
    /// `parse_headers` disabled (or an empty save-set) the result is empty
    /// and nothing allocates. Values share the frozen head buffer, so even
    /// retained headers cost no copy.
    pub fn retain_headers(&self, save: &[HeaderName], parse_headers: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if !parse_headers || save.is_empty() {
            return headers;
        }
        headers.reserve(save.len());
        for index in &self.indices {
            let name_bytes = &self.head_bytes[index.name.0..index.name.1];
            let Some(name) = save.iter().find(|n| n.as_str().as_bytes().eq_ignore_ascii_case(name_bytes)) else {
                continue;
            };
            // httparse already verified the value holds only visible ascii
            if let Ok(value) = HeaderValue::from_maybe_shared(self.head_bytes.slice(index.value.0..index.value.1)) {
                headers.append(name.clone(), value);
            }
        }
        headers
    }
}
