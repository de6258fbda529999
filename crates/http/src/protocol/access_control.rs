//! Access-control header triple for REST and preflight answers.

/// Values for the `Access-Control-Allow-*` response headers.
///
/// The web layer builds one per route (methods joined from the route's
/// allowed set); the writer only stamps the three headers.
#[derive(Debug, Clone)]
pub struct AccessControl {
    /// `Access-Control-Allow-Origin` value.
    pub origin: String,
    /// `Access-Control-Allow-Methods` value, e.g. `"GET, POST"`.
    pub methods: String,
    /// `Access-Control-Allow-Headers` value.
    pub headers: String,
}

impl Default for AccessControl {
    fn default() -> Self {
        Self { origin: "*".to_owned(), methods: "GET".to_owned(), headers: "*".to_owned() }
    }
}
