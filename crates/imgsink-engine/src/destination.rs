//! Destination resolution.
//!
//! Computes the target directory and base filename for an upload, once,
//! before any variant work starts. The default directory is the configured
//! root (created if absent); the default base filename is the original
//! filename, unmodified. Both are overridable through the strategies on
//! [`SinkConfig`].

use std::path::PathBuf;
use tokio::fs;

use imgsink_core::{SinkConfig, UploadContext, VariantTaskSpec};

use crate::error::{StoreError, StoreResult};

/// Resolved storage target: every variant path is derived from this as
/// `directory/base_filename[_suffix].extension`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub directory: PathBuf,
    pub base_filename: String,
}

impl Destination {
    /// The deterministic output path for one variant of this upload.
    pub fn variant_path(&self, spec: &VariantTaskSpec) -> PathBuf {
        self.directory.join(spec.file_name(&self.base_filename))
    }
}

/// Resolve directory and base filename for an upload and ensure the
/// directory exists.
///
/// The only side effect is directory creation (idempotent, non-exclusive);
/// any failure here fails the upload before source materialization.
pub(crate) async fn resolve(
    config: &SinkConfig,
    ctx: &UploadContext,
) -> StoreResult<Destination> {
    let directory = match &config.destination_strategy {
        Some(strategy) => {
            let resolved = strategy(ctx)
                .map_err(|e| StoreError::Destination(format!("Destination strategy failed: {}", e)))?;
            PathBuf::from(resolved)
        }
        None => config.root_directory.clone(),
    };

    fs::create_dir_all(&directory).await.map_err(|e| {
        StoreError::Destination(format!(
            "Failed to create destination directory {}: {}",
            directory.display(),
            e
        ))
    })?;

    let base_filename = match &config.filename_strategy {
        Some(strategy) => strategy(ctx)
            .map_err(|e| StoreError::Destination(format!("Filename strategy failed: {}", e)))?,
        None => ctx.original_filename.clone(),
    };

    if base_filename.is_empty() {
        return Err(StoreError::Destination(
            "Resolved base filename is empty".to_string(),
        ));
    }

    Ok(Destination {
        directory,
        base_filename,
    })
}
