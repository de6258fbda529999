//! Disk-backed filesystem collaborator.
//!
//! [`LocalFiles`] implements the `femto-http` filesystem seam with
//! `tokio::fs`: files are served in small fixed-size chunks (never
//! buffered whole) and their content type is detected from the extension,
//! the short list a tiny device actually serves.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use femto_http::fs::{FileReader, FileSystem};

/// Bytes per read chunk; small on purpose, the writer streams each chunk
/// straight to the socket.
const FILE_CHUNK_SIZE: usize = 1024;

/// Content type from a filename extension (lowercase extensions only,
/// like the platforms this serves).
pub fn mime_by_extension(path: &str) -> &'static str {
    let Some(idx) = path.rfind('.') else {
        return mime::TEXT_PLAIN.as_ref();
    };
    match &path[idx + 1..] {
        "html" => mime::TEXT_HTML.as_ref(),
        "css" => mime::TEXT_CSS.as_ref(),
        "js" => "application/javascript",
        "png" => mime::IMAGE_PNG.as_ref(),
        "jpg" | "jpeg" => mime::IMAGE_JPEG.as_ref(),
        "gif" => mime::IMAGE_GIF.as_ref(),
        _ => mime::TEXT_PLAIN.as_ref(),
    }
}

/// Serves files from below a root directory.
#[derive(Debug, Clone)]
pub struct LocalFiles {
    root: PathBuf,
}

impl LocalFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileSystem for LocalFiles {
    async fn open(&self, path: &str) -> io::Result<Box<dyn FileReader>> {
        let relative = Path::new(path.trim_start_matches('/'));
        // stay below the root
        if relative.components().any(|component| matches!(component, Component::ParentDir)) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "path escapes the root"));
        }

        let full = self.root.join(relative);
        let file = File::open(&full).await?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not a regular file"));
        }

        Ok(Box::new(LocalFile { file, len: metadata.len(), content_type: mime_by_extension(path) }))
    }
}

struct LocalFile {
    file: File,
    len: u64,
    content_type: &'static str,
}

#[async_trait]
impl FileReader for LocalFile {
    fn len(&self) -> u64 {
        self.len
    }

    fn content_type(&self) -> &str {
        self.content_type
    }

    async fn chunk(&mut self) -> io::Result<Option<Bytes>> {
        let mut buf = vec![0u8; FILE_CHUNK_SIZE];
        let n = self.file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }
}
