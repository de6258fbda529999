//! Write side of one connection: the response protocol state machine.

use bytes::Bytes;
use futures::SinkExt;
use http::{HeaderName, HeaderValue, StatusCode, Version, header};
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;
use tracing::warn;

use crate::codec::ResponseEncoder;
use crate::fs::FileSystem;
use crate::protocol::{AccessControl, Message, PayloadItem, PayloadSize, ResponseHead, SendError};

/// Where the response stands on the wire.
///
/// Transitions only move forward; `Done` is terminal. The writer refuses
/// any operation that does not fit the current state with
/// [`SendError::InvalidState`], which keeps a half-written body from ever
/// being resumed after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// Nothing has been emitted; status and headers are still mutable.
    NotStarted,
    /// Status line and headers are out.
    HeadersSent,
    /// At least one body chunk is out.
    BodyStreaming,
    /// The exchange is complete; further sends are errors.
    Done,
}

/// Options for [`ResponseWriter::send_file`].
#[derive(Debug, Clone, Copy)]
pub struct SendFileOptions<'a> {
    /// Overrides the collaborator's detected content type.
    pub content_type: Option<&'a str>,
    /// Emitted as `Content-Encoding` when present.
    pub content_encoding: Option<&'a str>,
    /// `Cache-Control: max-age=<n>, public`; `0` disables caching.
    pub max_age: u32,
}

impl Default for SendFileOptions<'_> {
    fn default() -> Self {
        // 30 days, the default a small device serving static assets wants
        Self { content_type: None, content_encoding: None, max_age: 2_592_000 }
    }
}

/// Streaming response writer for one connection.
///
/// Every public async method may park the task on socket writability.
/// The socket type is erased so handler traits stay object-safe.
pub struct ResponseWriter {
    framed_write: FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, ResponseEncoder>,
    state: WriteState,
    status: StatusCode,
    version: Version,
    headers: http::HeaderMap,
}

impl ResponseWriter {
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            framed_write: FramedWrite::new(Box::new(writer), ResponseEncoder::new()),
            state: WriteState::NotStarted,
            status: StatusCode::OK,
            version: Version::HTTP_10,
            headers: http::HeaderMap::new(),
        }
    }

    pub fn state(&self) -> WriteState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == WriteState::Done
    }

    fn ensure_not_started(&self, operation: &str) -> Result<(), SendError> {
        match self.state {
            WriteState::NotStarted => Ok(()),
            state => Err(SendError::invalid_state(format!("{operation} in state {state:?}"))),
        }
    }

    /// Sets the status code. Valid only before the head went out.
    pub fn set_status(&mut self, status: StatusCode) -> Result<(), SendError> {
        self.ensure_not_started("set_status")?;
        self.status = status;
        Ok(())
    }

    /// Overrides the response version (HTTP/1.0 by default). The REST
    /// dispatcher uses this for its fixed HTTP/1.1 + `Connection: close`
    /// framing.
    pub fn set_version(&mut self, version: Version) -> Result<(), SendError> {
        self.ensure_not_started("set_version")?;
        self.version = version;
        Ok(())
    }

    /// Sets a response header. Valid only before the head went out.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), SendError> {
        self.ensure_not_started("insert_header")?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Stamps the `Access-Control-Allow-*` triple.
    pub fn add_access_control_headers(&mut self, access_control: &AccessControl) -> Result<(), SendError> {
        self.ensure_not_started("add_access_control_headers")?;
        let origin = header_value(&access_control.origin)?;
        let methods = header_value(&access_control.methods)?;
        let headers = header_value(&access_control.headers)?;
        self.headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        self.headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
        self.headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, headers);
        Ok(())
    }

    /// Emits the status line and headers with the given content type,
    /// moving to `HeadersSent`. Calling twice is an `InvalidState` error.
    ///
    /// Body framing: a `Content-Length` header set beforehand makes the
    /// body fixed-length (enforced by the encoder); otherwise the body is
    /// close-delimited.
    pub async fn start(&mut self, content_type: &str) -> Result<(), SendError> {
        self.ensure_not_started("start")?;
        self.headers.insert(header::CONTENT_TYPE, header_value(content_type)?);

        let payload_size = match self.declared_content_length()? {
            Some(n) => PayloadSize::Length(n),
            None => PayloadSize::Unbounded,
        };
        self.send_head(payload_size).await?;
        self.state = WriteState::HeadersSent;
        Ok(())
    }

    /// Writes one body chunk, starting the response with a `text/plain`
    /// content type if it has not been started yet.
    pub async fn send(&mut self, data: impl Into<Bytes>) -> Result<(), SendError> {
        match self.state {
            WriteState::NotStarted => self.start(mime::TEXT_PLAIN.as_ref()).await?,
            WriteState::HeadersSent | WriteState::BodyStreaming => {}
            WriteState::Done => return Err(SendError::invalid_state("send after response finished")),
        }
        self.state = WriteState::BodyStreaming;
        self.framed_write.send(Message::Payload(PayloadItem::Chunk(data.into()))).await
    }

    /// Emits the head with an empty body (`Content-Length: 0`) and
    /// finishes the response. Used for OPTIONS answers and handlers that
    /// legitimately reply with headers only.
    pub async fn empty(&mut self) -> Result<(), SendError> {
        self.ensure_not_started("empty")?;
        self.send_head(PayloadSize::Empty).await?;
        self.state = WriteState::Done;
        Ok(())
    }

    /// Emits a minimal error response: status line, headers, and the
    /// message as a fixed-length plain-text body when given.
    pub async fn error(&mut self, status: StatusCode, message: Option<&str>) -> Result<(), SendError> {
        self.ensure_not_started("error")?;
        self.status = status;
        match message {
            Some(message) if !message.is_empty() => {
                let body = Bytes::copy_from_slice(message.as_bytes());
                self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                self.send_head(PayloadSize::Length(body.len() as u64)).await?;
                self.framed_write.send(Message::Payload(PayloadItem::Chunk(body))).await?;
                self.framed_write.send(Message::Payload(PayloadItem::<Bytes>::Eof)).await?;
            }
            _ => self.send_head(PayloadSize::Empty).await?,
        }
        self.state = WriteState::Done;
        Ok(())
    }

    /// Emits a 302 redirect to `location` with an empty body.
    pub async fn redirect(&mut self, location: &str) -> Result<(), SendError> {
        self.ensure_not_started("redirect")?;
        self.status = StatusCode::FOUND;
        self.headers.insert(header::LOCATION, header_value(location)?);
        self.send_head(PayloadSize::Empty).await?;
        self.state = WriteState::Done;
        Ok(())
    }

    /// Streams a file through the filesystem collaborator.
    ///
    /// Emits `Content-Length`, `Content-Type` (override or detected),
    /// `Cache-Control` and optionally `Content-Encoding`, then the file in
    /// the collaborator's fixed-size chunks. A file that cannot be opened
    /// becomes a 404 answer instead of an error.
    pub async fn send_file(&mut self, fs: &dyn FileSystem, path: &str, options: SendFileOptions<'_>) -> Result<(), SendError> {
        self.ensure_not_started("send_file")?;

        let mut file = match fs.open(path).await {
            Ok(file) => file,
            Err(e) => {
                warn!(path, cause = %e, "send_file could not open");
                return self.error(StatusCode::NOT_FOUND, Some("File Not Found")).await;
            }
        };

        let content_type = options.content_type.unwrap_or_else(|| file.content_type());
        self.headers.insert(header::CONTENT_TYPE, header_value(content_type)?);
        if let Some(encoding) = options.content_encoding {
            self.headers.insert(header::CONTENT_ENCODING, header_value(encoding)?);
        }
        let cache_control = match options.max_age {
            0 => "no-cache".to_owned(),
            max_age => format!("max-age={max_age}, public"),
        };
        self.headers.insert(header::CACHE_CONTROL, header_value(&cache_control)?);

        self.send_head(PayloadSize::Length(file.len())).await?;
        self.state = WriteState::HeadersSent;

        while let Some(chunk) = file.chunk().await.map_err(SendError::io)? {
            self.state = WriteState::BodyStreaming;
            self.framed_write.send(Message::Payload(PayloadItem::Chunk(chunk))).await?;
        }
        self.framed_write.send(Message::Payload(PayloadItem::<Bytes>::Eof)).await?;
        self.state = WriteState::Done;
        Ok(())
    }

    /// Marks the response complete: sends the body EOF (verifying a
    /// declared `Content-Length` was honored) and flushes. Idempotent once
    /// `Done`.
    pub async fn finish(&mut self) -> Result<(), SendError> {
        match self.state {
            WriteState::Done => Ok(()),
            WriteState::NotStarted => Err(SendError::invalid_state("finish before start")),
            WriteState::HeadersSent | WriteState::BodyStreaming => {
                self.framed_write.send(Message::Payload(PayloadItem::<Bytes>::Eof)).await?;
                self.state = WriteState::Done;
                Ok(())
            }
        }
    }

    /// Abandons the response after a mid-body failure. No further bytes
    /// will be written; the connection closes with a truncated body rather
    /// than a corrupt resumed one.
    pub fn abort(&mut self) {
        self.state = WriteState::Done;
    }

    async fn send_head(&mut self, payload_size: PayloadSize) -> Result<(), SendError> {
        let mut head = ResponseHead::new(());
        *head.status_mut() = self.status;
        *head.version_mut() = self.version;
        *head.headers_mut() = std::mem::take(&mut self.headers);
        self.framed_write.send(Message::<_, Bytes>::Head((head, payload_size))).await
    }

    fn declared_content_length(&self) -> Result<Option<u64>, SendError> {
        let Some(value) = self.headers.get(header::CONTENT_LENGTH) else {
            return Ok(None);
        };
        value
            .to_str()
            .ok()
            .and_then(|text| text.trim().parse::<u64>().ok())
            .map(Some)
            .ok_or_else(|| SendError::invalid_state("content-length header is not a number"))
    }
}

impl std::fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseWriter").field("state", &self.state).field("status", &self.status).finish_non_exhaustive()
    }
}

fn header_value(text: &str) -> Result<HeaderValue, SendError> {
    HeaderValue::from_str(text).map_err(|_| SendError::invalid_state(format!("invalid header value {text:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileReader, FileSystem};
    use async_trait::async_trait;
    use std::io;
    use tokio::io::AsyncReadExt;

    /// Runs `f` against a writer wired to an in-memory duplex and returns
    /// everything that reached the other end.
    async fn capture<F, Fut>(f: F) -> (Vec<u8>, Fut::Output)
    where
        F: FnOnce(ResponseWriter) -> Fut,
        Fut: Future,
    {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let writer = ResponseWriter::new(server);
        let output = f(writer).await;

        let mut bytes = Vec::new();
        client.read_to_end(&mut bytes).await.unwrap();
        (bytes, output)
    }

    #[tokio::test]
    async fn start_and_send_stream_a_close_delimited_body() {
        let (bytes, ()) = capture(|mut writer| async move {
            writer.start("text/html").await.unwrap();
            writer.send("<html>").await.unwrap();
            writer.send("</html>").await.unwrap();
            writer.finish().await.unwrap();
        })
        .await;

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(text.contains("content-type: text/html\r\n"));
        // close-delimited: no content-length announced
        assert!(!text.contains("content-length"));
        assert!(text.ends_with("\r\n\r\n<html></html>"));
    }

    #[tokio::test]
    async fn implicit_start_uses_text_plain() {
        let (bytes, ()) = capture(|mut writer| async move {
            writer.send("hi").await.unwrap();
            writer.finish().await.unwrap();
        })
        .await;

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("content-type: text/plain\r\n"));
        assert!(text.ends_with("hi"));
    }

    #[tokio::test]
    async fn header_mutation_after_start_is_invalid_state() {
        let (_bytes, results) = capture(|mut writer| async move {
            writer.start("text/plain").await.unwrap();
            let status = writer.set_status(StatusCode::NOT_FOUND);
            let header = writer.insert_header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            let restart = writer.start("text/plain").await;
            writer.finish().await.unwrap();
            (status, header, restart)
        })
        .await;

        assert!(matches!(results.0, Err(SendError::InvalidState { .. })));
        assert!(matches!(results.1, Err(SendError::InvalidState { .. })));
        assert!(matches!(results.2, Err(SendError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn send_after_finish_is_invalid_state() {
        let (_bytes, result) = capture(|mut writer| async move {
            writer.send("body").await.unwrap();
            writer.finish().await.unwrap();
            // finish is idempotent, a second one is fine
            writer.finish().await.unwrap();
            writer.send("more").await
        })
        .await;

        assert!(matches!(result, Err(SendError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn redirect_emits_302_with_location() {
        let (bytes, ()) = capture(|mut writer| async move {
            writer.redirect("/somewhere").await.unwrap();
        })
        .await;

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.0 302 Found\r\n"));
        assert!(text.contains("location: /somewhere\r\n"));
        assert!(text.contains("content-length: 0\r\n"));
    }

    #[tokio::test]
    async fn error_with_message_carries_a_fixed_length_body() {
        let (bytes, ()) = capture(|mut writer| async move {
            writer.error(StatusCode::NOT_FOUND, Some("Page Not Found")).await.unwrap();
        })
        .await;

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.0 404 Not Found\r\n"));
        assert!(text.contains("content-length: 14\r\n"));
        assert!(text.ends_with("Page Not Found"));
    }

    struct OneFile {
        content: &'static [u8],
    }

    struct OneFileReader {
        content: &'static [u8],
        offset: usize,
    }

    #[async_trait]
    impl FileSystem for OneFile {
        async fn open(&self, path: &str) -> io::Result<Box<dyn FileReader>> {
            if path == "/present.html" {
                Ok(Box::new(OneFileReader { content: self.content, offset: 0 }))
            } else {
                Err(io::Error::new(io::ErrorKind::NotFound, "no such file"))
            }
        }
    }

    #[async_trait]
    impl FileReader for OneFileReader {
        fn len(&self) -> u64 {
            self.content.len() as u64
        }

        fn content_type(&self) -> &str {
            "text/html"
        }

        async fn chunk(&mut self) -> io::Result<Option<Bytes>> {
            // three-byte chunks to exercise the streaming loop
            if self.offset >= self.content.len() {
                return Ok(None);
            }
            let end = usize::min(self.offset + 3, self.content.len());
            let chunk = Bytes::copy_from_slice(&self.content[self.offset..end]);
            self.offset = end;
            Ok(Some(chunk))
        }
    }

    #[tokio::test]
    async fn send_file_streams_with_metadata() {
        let fs = OneFile { content: b"<h1>hi</h1>" };
        let (bytes, ()) = capture(|mut writer| async move {
            writer.send_file(&fs, "/present.html", SendFileOptions::default()).await.unwrap();
        })
        .await;

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(text.contains("content-type: text/html\r\n"));
        assert!(text.contains("content-length: 11\r\n"));
        assert!(text.contains("cache-control: max-age=2592000, public\r\n"));
        assert!(text.ends_with("<h1>hi</h1>"));
    }

    #[tokio::test]
    async fn send_file_missing_becomes_404() {
        let fs = OneFile { content: b"" };
        let (bytes, ()) = capture(|mut writer| async move {
            writer.send_file(&fs, "/absent.html", SendFileOptions::default()).await.unwrap();
            assert!(writer.is_done());
        })
        .await;

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.0 404 Not Found\r\n"));
        assert!(text.ends_with("File Not Found"));
    }

    #[tokio::test]
    async fn send_file_honors_max_age_zero() {
        let fs = OneFile { content: b"x" };
        let (bytes, ()) = capture(|mut writer| async move {
            let options = SendFileOptions { max_age: 0, ..Default::default() };
            writer.send_file(&fs, "/present.html", options).await.unwrap();
        })
        .await;

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("cache-control: no-cache\r\n"));
    }

    #[tokio::test]
    async fn access_control_headers_are_stamped() {
        let ac = AccessControl { origin: "*".to_owned(), methods: "GET, POST".to_owned(), headers: "*".to_owned() };
        let (bytes, ()) = capture(|mut writer| async move {
            writer.add_access_control_headers(&ac).unwrap();
            writer.empty().await.unwrap();
        })
        .await;

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("access-control-allow-origin: *\r\n"));
        assert!(text.contains("access-control-allow-methods: GET, POST\r\n"));
        assert!(text.contains("access-control-allow-headers: *\r\n"));
        assert!(text.contains("content-length: 0\r\n"));
    }
}
