//! Request decoder: the head-then-body state machine.
//!
//! Composes [`HeadDecoder`] and [`LengthDecoder`] behind one
//! [`Decoder`] whose state is the `length_decoder` field:
//!
//! - `None`: waiting for (more of) the head section
//! - `Some(_)`: head delivered, draining the fixed-length body
//!
//! HTTP/1.0 carries one request per connection, so the machine never
//! resets after the body's EOF.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::head_decoder::HeadDecoder;
use crate::codec::length_decoder::LengthDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHead};

#[derive(Debug)]
pub struct RequestDecoder {
    head_decoder: HeadDecoder,
    length_decoder: Option<LengthDecoder>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { head_decoder: HeadDecoder, length_decoder: None }
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<RequestHead>;
    type Error = ParseError;

    /// - `Ok(Some(Message::Head(_)))`: the head section is complete
    /// - `Ok(Some(Message::Payload(_)))`: a body chunk or body EOF
    /// - `Ok(None)`: need more bytes
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(length_decoder) = &mut self.length_decoder {
            let message = match length_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    // body complete, nothing more arrives on this connection
                    self.length_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        let message = match self.head_decoder.decode(src)? {
            Some((head, payload_size)) => {
                let length = match payload_size {
                    PayloadSize::Length(n) => n,
                    _ => 0,
                };
                self.length_decoder = Some(LengthDecoder::new(length));
                Some(Message::Head(head))
            }
            None => None,
        };

        Ok(message)
    }

    /// A disconnect in the middle of a request is a parse failure, not a
    /// silent end of stream.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None if src.is_empty() && self.length_decoder.is_none() => Ok(None),
            None => Err(ParseError::bad_request("connection closed mid request")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn head_then_body_then_eof() {
        let str = indoc! {r##"
        POST /submit HTTP/1.0
        Content-Length: 5

        hello"##};

        let mut decoder = RequestDecoder::new();
        let mut buf = BytesMut::from(str);

        let head = match decoder.decode(&mut buf).unwrap().unwrap() {
            Message::Head(head) => head,
            Message::Payload(_) => panic!("expected head first"),
        };
        assert_eq!(head.path(), "/submit");

        let chunk = decoder.decode(&mut buf).unwrap().unwrap().into_payload_item().unwrap();
        assert_eq!(&chunk.into_bytes().unwrap()[..], b"hello");

        let eof = decoder.decode(&mut buf).unwrap().unwrap().into_payload_item().unwrap();
        assert!(eof.is_eof());
    }

    #[test]
    fn bodyless_request_reports_immediate_eof() {
        let str = indoc! {r##"
        GET / HTTP/1.0
        Host: localhost

        "##};

        let mut decoder = RequestDecoder::new();
        let mut buf = BytesMut::from(str);

        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_head());
        let item = decoder.decode(&mut buf).unwrap().unwrap().into_payload_item().unwrap();
        assert!(item.is_eof());
    }

    #[test]
    fn eof_mid_body_is_a_parse_error() {
        let str = indoc! {r##"
        POST /submit HTTP/1.0
        Content-Length: 10

        hel"##};

        let mut decoder = RequestDecoder::new();
        let mut buf = BytesMut::from(str);

        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_head());
        // the three buffered bytes come through
        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_payload());
        // then the peer hangs up
        let result = decoder.decode_eof(&mut buf);
        assert!(matches!(result, Err(ParseError::BadRequest { .. })));
    }
}
