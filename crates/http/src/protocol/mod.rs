//! Shared protocol vocabulary for the femto engine.
//!
//! The types here are what the codecs, the connection reader and the
//! response writer exchange:
//!
//! - [`Message`] / [`PayloadItem`] / [`PayloadSize`]: head-versus-payload
//!   framing of a single HTTP/1.0 exchange
//! - [`RequestHead`]: the parsed request line plus the raw header section,
//!   with headers materialized lazily once a route's save-set is known
//! - [`ResponseHead`]: status line + headers of an outgoing response
//! - [`AccessControl`]: the access-control header triple emitted on REST
//!   and preflight answers
//! - [`ParseError`] / [`SendError`] / [`HttpError`]: the error taxonomy

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

pub(crate) mod head;
pub use head::RequestHead;

mod response;
pub use response::ResponseHead;
pub use response::reason_phrase;

mod access_control;
pub use access_control::AccessControl;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
