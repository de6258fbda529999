//! Read side of one connection.

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use crate::codec::RequestDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, RequestHead};

/// Initial read-buffer capacity; the buffer grows on demand up to the
/// decoder's head bound.
const READ_BUFFER_SIZE: usize = 1024;

/// Incremental request reader over an async byte stream.
///
/// `read_head` and `read_body` are the engine's read suspension points:
/// both park the task until the socket has more bytes, and both hand back
/// typed parse failures instead of growing buffers.
#[derive(Debug)]
pub struct RequestReader<R> {
    framed_read: FramedRead<R, RequestDecoder>,
}

impl<R> RequestReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self { framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), READ_BUFFER_SIZE) }
    }

    /// Reads the request head.
    ///
    /// Returns `Ok(None)` when the peer closed the connection without
    /// sending anything, a quiet end rather than an error.
    pub async fn read_head(&mut self) -> Result<Option<RequestHead>, ParseError> {
        match self.framed_read.next().await {
            Some(Ok(Message::Head(head))) => Ok(Some(head)),
            Some(Ok(Message::Payload(_))) => Err(ParseError::bad_request("payload before request head")),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    /// Collects the fixed-length request body.
    ///
    /// The caller has already validated `expected` against the route's
    /// body cap, so accumulating up to that many bytes is bounded by
    /// construction.
    pub async fn read_body(&mut self, expected: u64) -> Result<Bytes, ParseError> {
        let mut body = BytesMut::with_capacity(expected as usize);
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Payload(PayloadItem::Chunk(chunk)))) => body.extend_from_slice(&chunk),
                Some(Ok(Message::Payload(PayloadItem::Eof))) => break,
                Some(Ok(Message::Head(_))) => return Err(ParseError::bad_request("second head on a single-request connection")),
                Some(Err(e)) => return Err(e),
                None => return Err(ParseError::bad_request("connection closed mid body")),
            }
        }
        Ok(body.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::io::Cursor;

    #[tokio::test]
    async fn reads_head_and_body() {
        let str = indoc! {r##"
        POST /submit HTTP/1.0
        Content-Length: 11

        hello world"##};

        let mut reader = RequestReader::new(Cursor::new(str.as_bytes().to_vec()));

        let head = reader.read_head().await.unwrap().unwrap();
        assert_eq!(head.path(), "/submit");
        assert_eq!(head.content_length(), Some(11));

        let body = reader.read_body(11).await.unwrap();
        assert_eq!(&body[..], b"hello world");
    }

    #[tokio::test]
    async fn quiet_close_yields_no_head() {
        let mut reader = RequestReader::new(Cursor::new(Vec::new()));
        assert!(reader.read_head().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn truncated_body_is_an_error() {
        let str = indoc! {r##"
        PUT /thing HTTP/1.0
        Content-Length: 32

        only half"##};

        let mut reader = RequestReader::new(Cursor::new(str.as_bytes().to_vec()));
        reader.read_head().await.unwrap().unwrap();

        let result = reader.read_body(32).await;
        assert!(matches!(result, Err(ParseError::BadRequest { .. })));
    }
}
