use std::io;

use http::StatusCode;
use thiserror::Error;

/// Top-level error for one connection's exchange.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    Request {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    Response {
        #[from]
        source: SendError,
    },

    /// The request parse exceeded its deadline. The connection is torn
    /// down without a response.
    #[error("request parse exceeded the deadline")]
    Timeout,
}

/// Failures while reading and parsing a request.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("bad request: {reason}")]
    BadRequest { reason: String },

    #[error("header section too large, current: {current_size} exceed the limit {max_size}")]
    HeaderTooLarge { current_size: usize, max_size: usize },

    #[error("payload of {length} bytes exceed the route limit {limit}")]
    PayloadTooLarge { length: u64, limit: usize },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn bad_request<S: ToString>(reason: S) -> Self {
        Self::BadRequest { reason: reason.to_string() }
    }

    pub fn header_too_large(current_size: usize, max_size: usize) -> Self {
        Self::HeaderTooLarge { current_size, max_size }
    }

    pub fn payload_too_large(length: u64, limit: usize) -> Self {
        Self::PayloadTooLarge { length, limit }
    }

    pub fn invalid_content_length<S: ToString>(reason: S) -> Self {
        Self::InvalidContentLength { reason: reason.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// Status code to answer this failure with, or `None` when the
    /// connection must be torn down without a response (socket errors).
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::BadRequest { .. } | Self::InvalidContentLength { .. } | Self::HeaderTooLarge { .. } => {
                Some(StatusCode::BAD_REQUEST)
            }
            Self::PayloadTooLarge { .. } => Some(StatusCode::PAYLOAD_TOO_LARGE),
            Self::Io { .. } => None,
        }
    }
}

/// Failures while writing a response.
#[derive(Error, Debug)]
pub enum SendError {
    /// The response writer was driven outside its protocol state machine,
    /// e.g. a header mutation after the head went out. This is a contract
    /// violation surfaced to the handler author, never to the client.
    #[error("invalid response state: {reason}")]
    InvalidState { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_state<S: ToString>(reason: S) -> Self {
        Self::InvalidState { reason: reason.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
