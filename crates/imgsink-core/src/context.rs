//! Per-upload context handed to the sink.

use bytes::Bytes;
use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// The upload's byte source.
///
/// A reader source is a single, sequential, one-pass-consumable sequence; it
/// is consumed exactly once, by the engine's source fan-out. Memory and file
/// sources are convenience constructors for callers that already hold the
/// full content.
pub enum UploadSource {
    Reader(Pin<Box<dyn AsyncRead + Send + Unpin>>),
    Memory(Bytes),
    File(PathBuf),
}

impl UploadSource {
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        UploadSource::Reader(Box::pin(reader))
    }

    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        UploadSource::Memory(data.into())
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        UploadSource::File(path.into())
    }
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadSource::Reader(_) => f.write_str("UploadSource::Reader"),
            UploadSource::Memory(data) => write!(f, "UploadSource::Memory({} bytes)", data.len()),
            UploadSource::File(path) => write!(f, "UploadSource::File({})", path.display()),
        }
    }
}

/// Immutable per-request bundle: the byte source plus the declared content
/// type, original filename, and arbitrary caller-supplied request metadata.
///
/// Created once per upload by the caller and consumed by value by the
/// engine; destination and filename strategies may read every field except
/// the source.
#[derive(Debug)]
pub struct UploadContext {
    pub source: UploadSource,
    pub content_type: String,
    pub original_filename: String,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UploadContext {
    pub fn new(
        source: UploadSource,
        content_type: impl Into<String>,
        original_filename: impl Into<String>,
    ) -> Self {
        Self {
            source,
            content_type: content_type.into(),
            original_filename: original_filename.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Attach a caller-supplied metadata entry, readable by destination and
    /// filename strategies.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}
