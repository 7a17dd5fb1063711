//! The variant store: transcoding pipeline, result aggregation, cleanup.

use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use imgsink_core::{
    SinkConfig, SourceValidator, StoredFileDescriptor, UploadContext, VariantResult,
    VariantTaskSpec,
};
use imgsink_transform::{probe, CodecTransform, VariantTransform};

use crate::destination::{self, Destination};
use crate::error::{StoreError, StoreResult};
use crate::fanout::{MaterializedSource, SourceHandle};

/// Concurrent multi-variant storage sink.
///
/// Construction takes the full configuration and (optionally) a custom
/// transform capability; the store itself is cheap to share and reentrant
/// across concurrent uploads.
pub struct VariantStore {
    config: SinkConfig,
    transform: Arc<dyn VariantTransform>,
}

impl VariantStore {
    /// Create a store using the default codec transform.
    pub fn new(config: SinkConfig) -> Self {
        Self::with_transform(config, Arc::new(CodecTransform::new()))
    }

    /// Create a store with an injected transform capability.
    pub fn with_transform(config: SinkConfig, transform: Arc<dyn VariantTransform>) -> Self {
        Self { config, transform }
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Resolve the destination this upload would store under, creating the
    /// directory. Useful for deriving variant paths for cleanup after a
    /// failed request.
    pub async fn resolve_destination(&self, ctx: &UploadContext) -> StoreResult<Destination> {
        destination::resolve(&self.config, ctx).await
    }

    /// Store the upload through the configured variant profile.
    pub async fn transcode(&self, ctx: UploadContext) -> StoreResult<StoredFileDescriptor> {
        let tasks = self.config.tasks.clone();
        self.transcode_with(ctx, &tasks).await
    }

    /// Store the upload through the given variant profile.
    ///
    /// On success the descriptor holds one result per spec, in spec order,
    /// independent of which variant task physically finished first. On
    /// failure the error of the lowest-indexed failing variant is returned;
    /// sibling tasks are not cancelled and their completed files remain on
    /// disk.
    pub async fn transcode_with(
        &self,
        ctx: UploadContext,
        specs: &[VariantTaskSpec],
    ) -> StoreResult<StoredFileDescriptor> {
        if specs.is_empty() {
            return Err(StoreError::MissingConfiguration);
        }
        for (index, spec) in specs.iter().enumerate() {
            spec.validate()
                .map_err(|e| StoreError::InvalidSpec {
                    index,
                    message: e.to_string(),
                })?;
        }

        let validator = SourceValidator::new(self.config.allowed_content_types.clone());
        validator
            .validate_content_type(&ctx.content_type)
            .map_err(|e| StoreError::UnsupportedSource(e.to_string()))?;

        let start = Instant::now();
        let destination = destination::resolve(&self.config, &ctx).await?;

        let UploadContext { source, .. } = ctx;
        let materialized = MaterializedSource::materialize(
            source,
            self.config.spill_threshold_bytes,
            self.config.max_source_size_bytes,
        )
        .await?;

        let mut handles = Vec::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            let path = destination.variant_path(spec);
            let source = materialized.handle();
            let transform = Arc::clone(&self.transform);
            let spec = spec.clone();
            handles.push(tokio::spawn(run_variant(
                index, spec, path, source, transform,
            )));
        }

        // Await every task before inspecting outcomes: siblings of a failed
        // variant run to completion, and output order follows the supplied
        // specs, not completion order.
        let joined = join_all(handles).await;

        let mut results = Vec::with_capacity(joined.len());
        let mut first_error: Option<StoreError> = None;
        for (index, outcome) in joined.into_iter().enumerate() {
            match outcome {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(err)) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
                Err(join_err) => {
                    if first_error.is_none() {
                        first_error = Some(StoreError::Transcode {
                            index,
                            path: destination.variant_path(&specs[index]),
                            message: format!("Variant task panicked: {}", join_err),
                        });
                    }
                }
            }
        }

        if let Some(err) = first_error {
            tracing::warn!(
                error = %err,
                completed = results.len(),
                total = specs.len(),
                "Variant transcoding failed; completed sibling files are left in place"
            );
            return Err(err);
        }

        tracing::info!(
            variants = results.len(),
            source_bytes = materialized.len(),
            directory = %destination.directory.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "All variants stored"
        );

        Ok(StoredFileDescriptor { results })
    }

    /// Delete a previously stored artifact; no-op if the path does not
    /// exist. Operates on a single path; callers needing full rollback
    /// invoke this once per recorded variant path.
    pub async fn cleanup(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();

        if !fs::try_exists(path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(path).await.map_err(|e| {
            StoreError::Cleanup(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(path = %path.display(), "Stored artifact removed");
        Ok(())
    }
}

/// One variant task: transform, write, read back authoritative metadata.
async fn run_variant(
    index: usize,
    spec: VariantTaskSpec,
    path: PathBuf,
    source: SourceHandle,
    transform: Arc<dyn VariantTransform>,
) -> StoreResult<VariantResult> {
    let start = Instant::now();

    let data = source.read_all().await.map_err(|e| StoreError::Transcode {
        index,
        path: path.clone(),
        message: format!("Failed to read materialized source: {}", e),
    })?;

    let encoded = transform
        .transform(data, &spec)
        .await
        .map_err(|e| StoreError::Transcode {
            index,
            path: path.clone(),
            message: e.to_string(),
        })?;

    let mut file = fs::File::create(&path)
        .await
        .map_err(|e| StoreError::Transcode {
            index,
            path: path.clone(),
            message: format!("Failed to create file {}: {}", path.display(), e),
        })?;

    file.write_all(&encoded)
        .await
        .map_err(|e| StoreError::Transcode {
            index,
            path: path.clone(),
            message: format!("Failed to write file {}: {}", path.display(), e),
        })?;

    file.sync_all().await.map_err(|e| StoreError::Transcode {
        index,
        path: path.clone(),
        message: format!("Failed to sync file {}: {}", path.display(), e),
    })?;

    // Authoritative dimensions come from the artifact on disk, decoded
    // independently of the transform's in-memory knowledge.
    let (width, height) =
        probe::dimensions_from_file(&path)
            .await
            .map_err(|e| StoreError::MetadataRead {
                index,
                path: path.clone(),
                message: e.to_string(),
            })?;

    tracing::debug!(
        index,
        path = %path.display(),
        width,
        height,
        size_bytes = encoded.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Variant stored"
    );

    Ok(VariantResult {
        path,
        width,
        height,
    })
}
