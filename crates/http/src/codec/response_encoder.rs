//! Response encoder: status line, headers and payload framing.
//!
//! Mirrors the request side's state machine: a head must be encoded first,
//! then payload chunks, then EOF. The encoder owns the `Content-Length`
//! bookkeeping: a fixed-length payload is enforced byte-for-byte, an
//! empty payload is stamped `Content-Length: 0`, and an unbounded payload
//! is close-delimited, which is the HTTP/1.0 default for streamed bodies.

use std::io::Write;

use bytes::{Buf, BufMut, BytesMut};
use http::{HeaderValue, Version, header};
use tokio_util::codec::Encoder;

use crate::ensure;
use crate::protocol::{Message, PayloadItem, PayloadSize, ResponseHead, SendError, reason_phrase};

/// Space reserved up front for a typical head section.
const INIT_HEAD_SIZE: usize = 1024;

#[derive(Debug, Default)]
pub struct ResponseEncoder {
    payload_encoder: Option<PayloadEncoder>,
}

/// Payload accounting for the current response.
#[derive(Debug)]
enum PayloadEncoder {
    /// Fixed-length body; tracks the bytes still owed.
    Length { remaining: u64 },
    /// Close-delimited body, bytes pass straight through.
    Unbounded,
    /// No body may follow the head.
    Empty,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl From<PayloadSize> for PayloadEncoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(n) => PayloadEncoder::Length { remaining: n },
            PayloadSize::Unbounded => PayloadEncoder::Unbounded,
            PayloadSize::Empty => PayloadEncoder::Empty,
        }
    }
}

impl<D: Buf> Encoder<Message<(ResponseHead, PayloadSize), D>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(ResponseHead, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Head((head, payload_size)) => {
                ensure!(self.payload_encoder.is_none(), SendError::invalid_state("response head already sent"));
                encode_head(head, payload_size, dst)?;
                self.payload_encoder = Some(payload_size.into());
                Ok(())
            }

            Message::Payload(item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    return Err(SendError::invalid_state("payload before response head"));
                };

                match item {
                    PayloadItem::Chunk(mut data) => match payload_encoder {
                        PayloadEncoder::Empty => {
                            ensure!(data.remaining() == 0, SendError::invalid_state("body bytes on an empty response"));
                            Ok(())
                        }
                        PayloadEncoder::Length { remaining } => {
                            let len = data.remaining() as u64;
                            ensure!(len <= *remaining, SendError::invalid_state("body exceeds declared content-length"));
                            *remaining -= len;
                            dst.put(&mut data);
                            Ok(())
                        }
                        PayloadEncoder::Unbounded => {
                            dst.put(&mut data);
                            Ok(())
                        }
                    },
                    PayloadItem::Eof => {
                        let complete = match payload_encoder {
                            PayloadEncoder::Length { remaining } => *remaining == 0,
                            PayloadEncoder::Unbounded | PayloadEncoder::Empty => true,
                        };
                        ensure!(complete, SendError::invalid_state("eof before declared content-length was written"));
                        Ok(())
                    }
                }
            }
        }
    }
}

fn encode_head(mut head: ResponseHead, payload_size: PayloadSize, dst: &mut BytesMut) -> Result<(), SendError> {
    dst.reserve(INIT_HEAD_SIZE);

    let version = match head.version() {
        Version::HTTP_10 => "1.0",
        // REST replies are phrased with HTTP/1.1 framing for client
        // compatibility, always alongside `Connection: close`.
        Version::HTTP_11 => "1.1",
        v => return Err(SendError::invalid_state(format!("unsupported http version {v:?}"))),
    };
    write!(FastWrite(dst), "HTTP/{} {} {}\r\n", version, head.status().as_str(), reason_phrase(head.status()))?;

    // The encoder owns content framing, whatever the head already carries.
    match payload_size {
        PayloadSize::Length(n) => {
            head.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from(n));
        }
        PayloadSize::Empty => {
            const ZERO: HeaderValue = HeaderValue::from_static("0");
            head.headers_mut().insert(header::CONTENT_LENGTH, ZERO);
        }
        PayloadSize::Unbounded => {
            // close-delimited: a stale length would lie to the client
            head.headers_mut().remove(header::CONTENT_LENGTH);
        }
    }

    for (header_name, header_value) in head.headers().iter() {
        dst.put_slice(header_name.as_ref());
        dst.put_slice(b": ");
        dst.put_slice(header_value.as_ref());
        dst.put_slice(b"\r\n");
    }
    dst.put_slice(b"\r\n");
    Ok(())
}

/// Writes into the already-reserved `BytesMut` without the bounds checks
/// of the generic io path.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
