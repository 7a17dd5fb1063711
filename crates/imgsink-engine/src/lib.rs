//! Imgsink Engine Library
//!
//! Concurrent multi-variant transcoding storage sink: one logical upload
//! in, N variant files out. For each upload the engine resolves a
//! destination, materializes the source exactly once, fans it out to an
//! independent read handle per variant, transcodes and writes all variants
//! concurrently, reads authoritative dimensions back from every written
//! artifact, and returns an ordered descriptor or the first failure.
//!
//! # Partial-failure contract
//!
//! A failing variant does not cancel its siblings; they run to completion
//! and their files stay on disk. Callers that need rollback invoke
//! [`VariantStore::cleanup`] per recorded path.

pub mod destination;
pub mod error;
pub mod fanout;
pub mod store;

// Re-export commonly used types
pub use destination::Destination;
pub use error::{StoreError, StoreResult};
pub use fanout::{MaterializedSource, SourceHandle};
pub use store::VariantStore;

// Domain types callers need alongside the engine
pub use imgsink_core::{
    SinkConfig, StoredFileDescriptor, UploadContext, UploadSource, VariantFormat, VariantResult,
    VariantTaskSpec,
};
pub use imgsink_transform::{CodecTransform, VariantTransform};
