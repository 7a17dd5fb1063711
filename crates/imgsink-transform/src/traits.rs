//! Variant transform abstraction trait.

use async_trait::async_trait;
use bytes::Bytes;
use imgsink_core::VariantTaskSpec;

/// Produces the re-encoded bytes of one variant from the complete source
/// image bytes.
///
/// Implementations receive the full materialized source (never a shared
/// stream position) and resize as a non-cropping fit into the requested
/// box: output dimensions preserve the source aspect ratio and may differ
/// from `width × height`. When the decoded source carries an alpha channel
/// and the target format cannot, the transform flattens onto an opaque
/// white background before encoding.
#[async_trait]
pub trait VariantTransform: Send + Sync {
    async fn transform(&self, source: Bytes, spec: &VariantTaskSpec) -> anyhow::Result<Bytes>;
}
