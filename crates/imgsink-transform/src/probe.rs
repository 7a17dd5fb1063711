//! Metadata probe - reads authoritative dimensions from encoded bytes.
//!
//! The engine calls this against the artifact it just wrote, as an
//! independent decode of the on-disk bytes; a partial or corrupt write
//! surfaces here rather than being reported with dimensions copied from the
//! variant spec.

use image::{GenericImageView, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Decode and return (width, height) of encoded image bytes.
pub fn dimensions(data: &[u8]) -> anyhow::Result<(u32, u32)> {
    let cursor = Cursor::new(data);
    let img = ImageReader::new(cursor).with_guessed_format()?.decode()?;
    Ok(img.dimensions())
}

/// Read the file at `path` and decode its dimensions.
pub async fn dimensions_from_file(path: impl AsRef<Path>) -> anyhow::Result<(u32, u32)> {
    let data = tokio::fs::read(path.as_ref()).await?;
    // Decode is CPU-bound; run off the async pool.
    tokio::task::spawn_blocking(move || dimensions(&data)).await?
}
