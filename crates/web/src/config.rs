//! Server-wide and per-route configuration.

use std::time::Duration;

use femto_http::protocol::AccessControl;
use http::{HeaderName, Method, header};

/// Knobs of the concurrency controller.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Deadline for parsing one request (head and body reads). A client
    /// that stays silent past it is disconnected without a response.
    pub request_timeout: Duration,
    /// Ceiling on simultaneously active connections. Keep this low on
    /// memory-constrained targets.
    pub max_concurrency: usize,
    /// Listen backlog handed to the OS; pending connections past the
    /// concurrency ceiling queue here and nowhere else.
    pub backlog: u32,
    /// Include diagnostic detail in 500 bodies.
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { request_timeout: Duration::from_secs(3), max_concurrency: 8, backlog: 16, debug: false }
    }
}

/// Per-route parsing and dispatch policy.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// Methods the route answers; anything else on a matching path is 405.
    pub methods: Vec<Method>,
    /// When disabled the header section is scanned but nothing except
    /// `Content-Length` is retained.
    pub parse_headers: bool,
    /// Header names worth materializing for this route. Everything else
    /// is discarded without allocating.
    pub save_headers: Vec<HeaderName>,
    /// Upper bound for request bodies; a larger `Content-Length` is
    /// answered with 413 before any body byte is read.
    pub max_body_size: usize,
    /// `Access-Control-Allow-Origin` value.
    pub allowed_origins: String,
    /// `Access-Control-Allow-Headers` value.
    pub allowed_headers: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            methods: vec![Method::GET],
            parse_headers: true,
            save_headers: Vec::new(),
            max_body_size: 1024,
            allowed_origins: "*".to_owned(),
            allowed_headers: "*".to_owned(),
        }
    }
}

impl RouteConfig {
    /// Defaults for a REST resource route: all four capability methods,
    /// and `Content-Type` retained so the dispatcher can decode bodies.
    pub fn resource() -> Self {
        Self {
            methods: vec![Method::GET, Method::POST, Method::PUT, Method::DELETE],
            save_headers: vec![header::CONTENT_TYPE],
            ..Default::default()
        }
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// The access-control triple stamped on REST and OPTIONS answers,
    /// with the methods list joined from the allowed set.
    pub fn access_control(&self) -> AccessControl {
        let methods = self.methods.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
        AccessControl { origin: self.allowed_origins.clone(), methods, headers: self.allowed_headers.clone() }
    }
}
