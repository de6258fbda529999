//! The femto embeddable HTTP/1.0 server.
//!
//! This crate assembles the protocol engine from `femto-http` into a
//! usable server: an append-only route table resolved in registration
//! order, REST-style resources with per-method capabilities, a
//! concurrency-limited accept loop, and graceful shutdown.
//!
//! # Example
//!
//! ```no_run
//! use femto_web::{get, handler_fn, HandlerResult, Request, ResponseWriter, Server};
//!
//! async fn index(_request: Request, response: &mut ResponseWriter) -> HandlerResult {
//!     response.start("text/html").await?;
//!     response.send("<html><h1>Hello, world!</h1></html>\n").await?;
//!     Ok(())
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let server = Server::builder()
//!         .address("127.0.0.1:8081")
//!         .route("/", get(handler_fn(index)))
//!         .build()
//!         .expect("server configuration");
//!     server.run().await.expect("server run");
//! }
//! ```

mod config;
mod connection;
mod handler;
mod request;
mod resource;
mod router;
mod server;
mod static_files;

pub use config::RouteConfig;
pub use config::ServerConfig;
pub use handler::FnHandler;
pub use handler::HandlerError;
pub use handler::HandlerResult;
pub use handler::RouteHandler;
pub use handler::handler_fn;
pub use request::PathParams;
pub use request::Request;
pub use resource::ApiOutcome;
pub use resource::ApiRequest;
pub use resource::Resource;
pub use router::Router;
pub use server::RouteSpec;
pub use server::Server;
pub use server::ServerBuildError;
pub use server::ServerBuilder;
pub use server::ServerHandle;
pub use server::delete;
pub use server::get;
pub use server::post;
pub use server::put;
pub use static_files::LocalFiles;
pub use static_files::mime_by_extension;

// the writer surface handlers program against
pub use femto_http::connection::{ResponseWriter, SendFileOptions, WriteState};
pub use femto_http::fs::{FileReader, FileSystem};
