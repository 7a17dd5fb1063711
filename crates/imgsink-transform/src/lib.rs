//! Imgsink Transform Library
//!
//! This crate provides the variant transform capability boundary: the
//! [`VariantTransform`] trait the storage engine depends on, the default
//! codec implementation backed by the `image` crate, and the metadata probe
//! used to read authoritative dimensions back from written artifacts.

pub mod codec;
pub mod probe;
pub mod traits;

// Re-export commonly used types
pub use codec::CodecTransform;
pub use traits::VariantTransform;
