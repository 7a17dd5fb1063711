//! Source fan-out: materialize once, read many.
//!
//! An upload's byte stream is single-pass; handing the same stream object
//! to more than one concurrent consumer corrupts all but (at most) one of
//! them. The engine therefore materializes the source exactly once
//! (in-memory for bounded sizes, spilled to a temporary file above the
//! configured threshold), and every variant task gets its own independent,
//! start-positioned [`SourceHandle`] over the materialized content.

use bytes::{Bytes, BytesMut};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use imgsink_core::UploadSource;

use crate::error::{StoreError, StoreResult};

const READ_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug)]
enum Inner {
    Memory(Bytes),
    // The temp file lives as long as the materialized source; handles read
    // it by path and must not outlive this value.
    Spilled(NamedTempFile),
}

/// The fully materialized upload source, shared read-only by all variant
/// tasks of one upload.
#[derive(Debug)]
pub struct MaterializedSource {
    inner: Inner,
    len: u64,
}

impl MaterializedSource {
    /// Consume the upload source and materialize its complete content.
    ///
    /// Fails with [`StoreError::SourceMaterialization`] on I/O errors or
    /// when the content exceeds `max_source_size_bytes`, in both cases
    /// before any variant task starts.
    pub async fn materialize(
        source: UploadSource,
        spill_threshold_bytes: usize,
        max_source_size_bytes: usize,
    ) -> StoreResult<Self> {
        match source {
            UploadSource::Memory(data) => {
                check_size(data.len() as u64, max_source_size_bytes)?;
                Ok(MaterializedSource {
                    len: data.len() as u64,
                    inner: Inner::Memory(data),
                })
            }
            UploadSource::File(path) => {
                let file = tokio::fs::File::open(&path).await.map_err(|e| {
                    StoreError::SourceMaterialization(format!(
                        "Failed to open source file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Self::from_reader(file, spill_threshold_bytes, max_source_size_bytes).await
            }
            UploadSource::Reader(reader) => {
                Self::from_reader(reader, spill_threshold_bytes, max_source_size_bytes).await
            }
        }
    }

    async fn from_reader(
        mut reader: impl AsyncRead + Unpin,
        spill_threshold_bytes: usize,
        max_source_size_bytes: usize,
    ) -> StoreResult<Self> {
        let mut buf = BytesMut::with_capacity(READ_CHUNK_BYTES);

        loop {
            buf.reserve(READ_CHUNK_BYTES);
            let n = reader.read_buf(&mut buf).await.map_err(|e| {
                StoreError::SourceMaterialization(format!("Failed to read source: {}", e))
            })?;
            if n == 0 {
                let len = buf.len() as u64;
                check_size(len, max_source_size_bytes)?;
                return Ok(MaterializedSource {
                    inner: Inner::Memory(buf.freeze()),
                    len,
                });
            }
            check_size(buf.len() as u64, max_source_size_bytes)?;
            if buf.len() > spill_threshold_bytes {
                break;
            }
        }

        // Over the in-memory threshold: spill what we have plus the rest of
        // the stream to a temp file that lives as long as this value.
        let tmp = NamedTempFile::new().map_err(|e| {
            StoreError::SourceMaterialization(format!("Failed to create spill file: {}", e))
        })?;
        let mut file = tokio::fs::File::create(tmp.path()).await.map_err(|e| {
            StoreError::SourceMaterialization(format!("Failed to open spill file: {}", e))
        })?;

        file.write_all(&buf).await.map_err(spill_write_error)?;
        let mut total = buf.len() as u64;
        let mut chunk = vec![0u8; READ_CHUNK_BYTES];

        loop {
            let n = reader.read(&mut chunk).await.map_err(|e| {
                StoreError::SourceMaterialization(format!("Failed to read source: {}", e))
            })?;
            if n == 0 {
                break;
            }
            total += n as u64;
            check_size(total, max_source_size_bytes)?;
            file.write_all(&chunk[..n]).await.map_err(spill_write_error)?;
        }

        file.flush().await.map_err(spill_write_error)?;

        tracing::debug!(
            size_bytes = total,
            spill_threshold_bytes,
            path = %tmp.path().display(),
            "Source spilled to temporary file"
        );

        Ok(MaterializedSource {
            inner: Inner::Spilled(tmp),
            len: total,
        })
    }

    /// Total size of the materialized content in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_spilled(&self) -> bool {
        matches!(self.inner, Inner::Spilled(_))
    }

    /// An independent read handle over the complete content, positioned at
    /// the start. Any number of handles may be taken; each yields the full
    /// content regardless of the others.
    pub fn handle(&self) -> SourceHandle {
        match &self.inner {
            Inner::Memory(data) => SourceHandle {
                inner: HandleInner::Memory(data.clone()),
            },
            Inner::Spilled(tmp) => SourceHandle {
                inner: HandleInner::Spilled(tmp.path().to_path_buf()),
            },
        }
    }
}

enum HandleInner {
    Memory(Bytes),
    Spilled(PathBuf),
}

/// One independent view of the materialized source.
pub struct SourceHandle {
    inner: HandleInner,
}

impl SourceHandle {
    /// Read the complete source content.
    pub async fn read_all(self) -> std::io::Result<Bytes> {
        match self.inner {
            HandleInner::Memory(data) => Ok(data),
            HandleInner::Spilled(path) => Ok(Bytes::from(tokio::fs::read(&path).await?)),
        }
    }
}

fn check_size(len: u64, max_source_size_bytes: usize) -> StoreResult<()> {
    if len > max_source_size_bytes as u64 {
        return Err(StoreError::SourceMaterialization(format!(
            "Source too large: {} bytes (max: {} bytes)",
            len, max_source_size_bytes
        )));
    }
    Ok(())
}

fn spill_write_error(e: std::io::Error) -> StoreError {
    StoreError::SourceMaterialization(format!("Failed to write spill file: {}", e))
}
