//! The server: route registration, the concurrency-limited accept loop and
//! graceful shutdown.
//!
//! Admission control happens before `accept`: a semaphore permit is taken
//! first, so at the concurrency ceiling the listener simply stops
//! accepting and pending connections queue in the OS backlog (sized by
//! `backlog`); the server itself never buffers pending connections. The
//! permit moves into the connection task and is released when the task
//! ends, on every path including panic and cancellation.

use std::io;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, trace, warn};

use crate::config::{RouteConfig, ServerConfig};
use crate::connection::serve_connection;
use crate::handler::RouteHandler;
use crate::resource::Resource;
use crate::router::{Endpoint, Pattern, Route, Router};

/// A route under construction: endpoint plus chainable policy.
pub struct RouteSpec {
    endpoint: Endpoint,
    config: RouteConfig,
}

macro_rules! method_route_spec {
    ($fn_name:ident, $method:expr) => {
        /// Creates a route answering this method, with default policy.
        pub fn $fn_name<H: RouteHandler + 'static>(handler: H) -> RouteSpec {
            RouteSpec {
                endpoint: Endpoint::Handler(Box::new(handler)),
                config: RouteConfig { methods: vec![$method], ..Default::default() },
            }
        }
    };
}

method_route_spec!(get, Method::GET);
method_route_spec!(post, Method::POST);
method_route_spec!(put, Method::PUT);
method_route_spec!(delete, Method::DELETE);

impl RouteSpec {
    /// Replaces the allowed method set.
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.config.methods = methods.into_iter().collect();
        self
    }

    /// Header names to retain for this route. Panics on an invalid name,
    /// which is a registration-time programming error.
    pub fn save_headers(mut self, names: &[&str]) -> Self {
        self.config.save_headers =
            names.iter().map(|name| name.parse().unwrap_or_else(|_| panic!("invalid header name {name:?}"))).collect();
        self
    }

    pub fn max_body_size(mut self, limit: usize) -> Self {
        self.config.max_body_size = limit;
        self
    }

    pub fn parse_headers(mut self, enabled: bool) -> Self {
        self.config.parse_headers = enabled;
        self
    }

    pub fn allow_origins(mut self, origins: impl Into<String>) -> Self {
        self.config.allowed_origins = origins.into();
        self
    }

    pub fn allow_headers(mut self, headers: impl Into<String>) -> Self {
        self.config.allowed_headers = headers.into();
        self
    }
}

impl std::fmt::Debug for RouteSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteSpec").field("config", &self.config).finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("listen address must be set")]
    MissingAddress,
    #[error("at least one route must be registered")]
    EmptyRouteTable,
}

/// Builder for [`Server`]. Routes are appended in priority order and the
/// table is immutable once built.
pub struct ServerBuilder {
    address: Option<Vec<SocketAddr>>,
    config: ServerConfig,
    routes: Vec<Route>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { address: None, config: ServerConfig::default(), routes: Vec::new() }
    }

    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().expect("invalid listen address").collect());
        self
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.config.request_timeout = request_timeout;
        self
    }

    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    pub fn backlog(mut self, backlog: u32) -> Self {
        self.config.backlog = backlog;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Registers a plain route. Panics on an invalid pattern, which is a
    /// registration-time programming error.
    pub fn route(mut self, pattern: &str, spec: RouteSpec) -> Self {
        let pattern = Pattern::parse(pattern).unwrap_or_else(|e| panic!("{e}"));
        self.routes.push(Route::new(pattern, spec.endpoint, spec.config));
        self
    }

    /// Registers a REST resource with the default resource policy.
    pub fn resource(self, pattern: &str, resource: impl Resource + 'static) -> Self {
        self.resource_with(pattern, resource, RouteConfig::resource())
    }

    /// Registers a REST resource with explicit policy.
    pub fn resource_with(mut self, pattern: &str, resource: impl Resource + 'static, config: RouteConfig) -> Self {
        let pattern = Pattern::parse(pattern).unwrap_or_else(|e| panic!("{e}"));
        self.routes.push(Route::new(pattern, Endpoint::Resource(Box::new(resource)), config));
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let addresses = self.address.ok_or(ServerBuildError::MissingAddress)?;
        if self.routes.is_empty() {
            return Err(ServerBuildError::EmptyRouteTable);
        }
        Ok(Server { addresses, shared: Arc::new(Shared { router: Router::new(self.routes), config: self.config }) })
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder").field("address", &self.address).field("config", &self.config).finish_non_exhaustive()
    }
}

/// State shared by the accept loop and every connection task.
pub(crate) struct Shared {
    pub(crate) router: Router,
    pub(crate) config: ServerConfig,
}

/// The assembled server, ready to bind.
pub struct Server {
    addresses: Vec<SocketAddr>,
    shared: Arc<Shared>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds the listener and spawns the accept loop, returning a handle
    /// for inspection and shutdown.
    pub async fn start(self) -> io::Result<ServerHandle> {
        let listener = bind_listener(&self.addresses, self.shared.config.backlog)?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "start listening");

        let max_concurrency = self.shared.config.max_concurrency;
        let permits = Arc::new(Semaphore::new(max_concurrency));
        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();

        let accept =
            tokio::spawn(accept_loop(listener, self.shared, shutdown.clone(), tracker.clone(), Arc::clone(&permits)));

        Ok(ServerHandle { local_addr, shutdown, tracker, permits, max_concurrency, accept })
    }

    /// Binds and serves until the process ends.
    pub async fn run(self) -> io::Result<()> {
        let handle = self.start().await?;
        handle.wait().await;
        Ok(())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").field("addresses", &self.addresses).finish_non_exhaustive()
    }
}

/// Binds through `TcpSocket` so the OS backlog size is explicit.
fn bind_listener(addresses: &[SocketAddr], backlog: u32) -> io::Result<TcpListener> {
    let mut last_error = None;
    for address in addresses {
        let bound = (|| {
            let socket = match address {
                SocketAddr::V4(_) => TcpSocket::new_v4()?,
                SocketAddr::V6(_) => TcpSocket::new_v6()?,
            };
            socket.set_reuseaddr(true)?;
            socket.bind(*address)?;
            socket.listen(backlog)
        })();
        match bound {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                warn!(%address, cause = %e, "failed to bind");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no listen address")))
}

/// Accept loop: permit first, then accept, then spawn.
async fn accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
) {
    loop {
        let permit = tokio::select! {
            _ = shutdown.cancelled() => break,
            permit = Arc::clone(&permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_closed) => break,
            },
        };

        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            },
        };
        trace!(%peer, "connection admitted");

        let shared = Arc::clone(&shared);
        let child = shutdown.child_token();
        tracker.spawn(async move {
            // slot released when the task ends, on every path
            let _permit = permit;
            serve_connection(stream, shared, child).await;
        });
    }

    // no further accepts; pending SYNs past the backlog are the OS's
    drop(listener);
    tracker.close();
}

/// Handle to a started server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
    max_concurrency: usize,
    accept: JoinHandle<()>,
}

impl ServerHandle {
    /// The bound address, useful with port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connections currently holding a slot.
    pub fn active_connections(&self) -> usize {
        self.max_concurrency - self.permits.available_permits()
    }

    /// Stops accepting, cancels every active connection task and waits
    /// for their cleanup before returning.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        let _ = self.accept.await;
        self.tracker.wait().await;
        info!("server shut down");
    }

    /// Waits for the server to end (it only does via `shutdown`).
    pub async fn wait(self) {
        let _ = self.accept.await;
        self.tracker.wait().await;
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("local_addr", &self.local_addr)
            .field("active_connections", &self.active_connections())
            .finish_non_exhaustive()
    }
}
