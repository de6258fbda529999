//! Protocol engine of an embeddable HTTP/1.0 server for memory-constrained hosts.
//!
//! This crate provides the low-level half of the femto server: incremental
//! request parsing with bounded buffering, a fixed-length body decoder, a
//! response encoder, and the [`connection::ResponseWriter`] protocol state
//! machine. It deliberately speaks HTTP/1.0 (one request per connection,
//! close-delimited or fixed-length bodies, no chunked transfer-encoding,
//! no keep-alive) because the target environments cannot afford unbounded
//! buffers or long-lived per-connection state.
//!
//! # Architecture
//!
//! - [`protocol`]: shared protocol vocabulary: [`protocol::RequestHead`],
//!   [`protocol::Message`], payload sizing and the error taxonomy
//! - [`codec`]: `tokio_util` codec implementations for decoding requests
//!   and encoding responses
//! - [`connection`]: the per-connection reader and writer built on top of
//!   the codecs; every `await` they expose is a scheduler suspension point
//! - [`fs`]: the filesystem collaborator interface used by
//!   `ResponseWriter::send_file`; the engine never touches the disk itself
//!
//! # Memory contract
//!
//! Nothing in this crate grows a buffer past a fixed bound: the request
//! head is capped at [`codec::MAX_HEAD_BYTES`], header values are only
//! materialized once a route's save-set is known, and bodies are read in
//! chunks against a caller-supplied limit. Oversized input fails the parse
//! with a typed error instead of allocating.

pub mod codec;
pub mod connection;
pub mod fs;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
