//! Filesystem collaborator interface.
//!
//! The engine never opens files itself. `ResponseWriter::send_file` talks
//! to these two traits: open a path, learn its size and content type, then
//! pull fixed-size chunks until the file is drained. The web layer ships a
//! disk-backed implementation; tests substitute in-memory ones.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;

/// Opens files by path.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Opens `path` for streaming. Errors map to a 404 answer at the
    /// writer, matching "missing file" semantics.
    async fn open(&self, path: &str) -> io::Result<Box<dyn FileReader>>;
}

/// One opened file: metadata plus chunked reads.
#[async_trait]
pub trait FileReader: Send {
    /// Total size in bytes, used for the `Content-Length` header.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Detected content type, used unless the caller overrides it.
    fn content_type(&self) -> &str;

    /// Next chunk of the file, `None` once drained. Implementations keep
    /// chunks at a small fixed size; the writer never buffers the file.
    async fn chunk(&mut self) -> io::Result<Option<Bytes>>;
}
