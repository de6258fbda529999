//! Incremental decoder for the request head.
//!
//! Buffers the head section up to a fixed bound, then parses it in one go
//! with `httparse`. Header name/value positions are recorded as byte
//! ranges rather than copied out, so headers a route never asked for are
//! dropped with the buffer. The one header scanned unconditionally is
//! `Content-Length`: body framing must be known before route policy is.
//!
//! # Limits
//!
//! - Maximum head section size: [`MAX_HEAD_BYTES`] → `HeaderTooLarge`
//! - Maximum number of headers: 32 → `BadRequest`
//! - HTTP/1.0 and HTTP/1.1 request lines only → `BadRequest`

use std::mem::MaybeUninit;

use bytes::{Buf, BytesMut};
use http::{Method, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::head::HeaderIndex;
use crate::protocol::{ParseError, PayloadSize, RequestHead};

/// Maximum number of headers accepted in a request.
const MAX_HEADER_NUM: usize = 32;

/// Maximum size in bytes of the whole head section (request line plus
/// headers plus terminator).
pub const MAX_HEAD_BYTES: usize = 4 * 1024;

/// Decoder producing a [`RequestHead`] and its [`PayloadSize`] once the
/// full head section has arrived.
#[derive(Debug, Default)]
pub struct HeadDecoder;

impl Decoder for HeadDecoder {
    type Item = (RequestHead, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Tolerate blank lines ahead of the request line, some clients
        // send a stray CRLF after a previous exchange.
        skip_blank_lines(src);

        // Not even "GET / HTTP/1.0\r\n\r\n" could fit yet.
        if src.len() < 14 {
            return Ok(None);
        }

        let mut req = httparse::Request::new(&mut []);
        let mut headers: [MaybeUninit<httparse::Header>; MAX_HEADER_NUM] = unsafe { MaybeUninit::uninit().assume_init() };

        let parsed = req.parse_with_uninit_headers(src, &mut headers).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::bad_request(format!("more than {MAX_HEADER_NUM} headers")),
            e => ParseError::bad_request(e.to_string()),
        });

        let head_end = match parsed? {
            Status::Complete(head_end) => head_end,
            Status::Partial => {
                // Keep buffering, but never past the head bound.
                ensure!(src.len() <= MAX_HEAD_BYTES, ParseError::header_too_large(src.len(), MAX_HEAD_BYTES));
                return Ok(None);
            }
        };
        trace!(head_size = head_end, "parsed request head");
        ensure!(head_end <= MAX_HEAD_BYTES, ParseError::header_too_large(head_end, MAX_HEAD_BYTES));

        let version = match req.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            v => return Err(ParseError::bad_request(format!("unsupported http version {v:?}"))),
        };

        let method = req
            .method
            .ok_or_else(|| ParseError::bad_request("missing method"))?
            .parse::<Method>()
            .map_err(|_| ParseError::bad_request("unsupported method"))?;

        let target = req.path.ok_or_else(|| ParseError::bad_request("missing request target"))?;
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_owned(), query.to_owned()),
            None => (target.to_owned(), String::new()),
        };

        let content_length = parse_content_length(req.headers)?;

        // Record name/value byte ranges while `req` still borrows `src`;
        // after the split only plain offsets survive.
        let indices = HeaderIndex::record(src, req.headers);

        let head_bytes = src.split_to(head_end).freeze();
        let head = RequestHead::new(method, path, query, version, head_bytes, indices, content_length);
        let payload_size = head.payload_size();

        Ok(Some((head, payload_size)))
    }
}

/// Consume any leading CRLF / bare-LF blank lines.
fn skip_blank_lines(src: &mut BytesMut) {
    loop {
        if src.starts_with(b"\r\n") {
            src.advance(2);
        } else if src.starts_with(b"\n") {
            src.advance(1);
        } else {
            break;
        }
    }
}

fn parse_content_length(headers: &[httparse::Header<'_>]) -> Result<Option<u64>, ParseError> {
    let mut found: Option<u64> = None;
    for header in headers {
        if !header.name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        let text = std::str::from_utf8(header.value).map_err(|_| ParseError::invalid_content_length("value is not utf-8"))?;
        let length =
            text.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {text} is not u64")))?;
        match found {
            None => found = Some(length),
            Some(previous) if previous == length => {}
            Some(_) => return Err(ParseError::invalid_content_length("conflicting duplicate values")),
        }
    }
    Ok(found)
}

impl HeaderIndex {
    /// Records the byte positions of header names and values relative to
    /// the start of the head buffer.
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>]) -> Vec<HeaderIndex> {
        let bytes_ptr = bytes.as_ptr() as usize;
        headers
            .iter()
            .map(|header| {
                let name_start = header.name.as_ptr() as usize - bytes_ptr;
                let name_end = name_start + header.name.len();
                let value_start = header.value.as_ptr() as usize - bytes_ptr;
                let value_end = value_start + header.value.len();
                HeaderIndex { name: (name_start, name_end), value: (value_start, value_end) }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{HeaderName, CONTENT_TYPE, HOST};
    use indoc::indoc;

    fn decode(input: &str) -> Result<Option<(RequestHead, PayloadSize)>, ParseError> {
        let mut buf = BytesMut::from(input);
        HeadDecoder.decode(&mut buf)
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.0
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##};

        let (head, payload_size) = decode(str).unwrap().unwrap();

        assert!(payload_size.is_empty());
        assert_eq!(head.method(), &Method::GET);
        assert_eq!(head.version(), Version::HTTP_10);
        assert_eq!(head.path(), "/index.html");
        assert_eq!(head.query(), "");
        assert_eq!(head.header_count(), 3);
        assert_eq!(head.content_length(), None);
    }

    #[test]
    fn query_string_is_split_from_path() {
        let str = indoc! {r##"
        GET /index/?a=1&b=2&a=3 HTTP/1.1
        Host: 127.0.0.1:8080

        "##};

        let (head, _) = decode(str).unwrap().unwrap();
        assert_eq!(head.path(), "/index/");
        assert_eq!(head.query(), "a=1&b=2&a=3");
    }

    #[test]
    fn leading_blank_lines_are_skipped() {
        let str = "\r\n\r\nGET / HTTP/1.0\r\nHost: localhost\r\n\r\n";
        let (head, _) = decode(str).unwrap().unwrap();
        assert_eq!(head.path(), "/");
    }

    #[test]
    fn partial_head_asks_for_more() {
        let mut buf = BytesMut::from("POST /submit HTTP/1.0\r\nContent-Len");
        assert!(HeadDecoder.decode(&mut buf).unwrap().is_none());
        // nothing was consumed while incomplete
        assert!(buf.starts_with(b"POST"));
    }

    #[test]
    fn split_leaves_body_bytes_in_buffer() {
        let str = indoc! {r##"
        POST /submit HTTP/1.0
        Content-Length: 3

        abc"##};

        let mut buf = BytesMut::from(str);
        let (head, payload_size) = HeadDecoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(head.content_length(), Some(3));
        assert_eq!(payload_size, PayloadSize::Length(3));
        assert_eq!(&buf[..], b"abc");
    }

    #[test]
    fn body_is_gated_on_method() {
        // a GET never reads a body, whatever content-length claims
        let str = indoc! {r##"
        GET / HTTP/1.0
        Content-Length: 10

        "##};

        let (head, payload_size) = decode(str).unwrap().unwrap();
        assert_eq!(head.content_length(), Some(10));
        assert!(payload_size.is_empty());
    }

    #[test]
    fn malformed_request_line_is_rejected() {
        let result = decode("GET/index HTTP/1.0 extra\r\n\r\n");
        assert!(matches!(result, Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn invalid_content_length_is_rejected() {
        let str = indoc! {r##"
        POST / HTTP/1.0
        Content-Length: banana

        "##};

        assert!(matches!(decode(str), Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn oversized_head_fails_before_completion() {
        // a single endless header line, never terminated
        let mut request = String::from("GET / HTTP/1.0\r\nX-Filler: ");
        request.push_str(&"a".repeat(MAX_HEAD_BYTES));
        let result = decode(&request);
        assert!(matches!(result, Err(ParseError::HeaderTooLarge { .. })));
    }

    #[test]
    fn retained_headers_follow_the_save_set() {
        let str = indoc! {r##"
        POST /api HTTP/1.0
        Host: 127.0.0.1:8080
        Content-Type: application/json
        X-Secret: hunter2
        Content-Length: 2

        {}"##};

        let mut buf = BytesMut::from(str);
        let (head, _) = HeadDecoder.decode(&mut buf).unwrap().unwrap();

        let save = [CONTENT_TYPE, HOST];
        let headers = head.retain_headers(&save, true);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.get(HOST).unwrap(), "127.0.0.1:8080");
        assert!(headers.get(HeaderName::from_static("x-secret")).is_none());

        // disabling header parsing yields an empty map
        assert!(head.retain_headers(&save, false).is_empty());
    }
}
