//! Default codec transform backed by the `image` crate.

use async_trait::async_trait;
use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, Rgb, RgbImage};
use std::io::Cursor;

use imgsink_core::{VariantFormat, VariantTaskSpec};

use crate::traits::VariantTransform;

/// Default [`VariantTransform`] implementation: decode, fit-in-box resize,
/// alpha flattening where the target format requires it, re-encode.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecTransform;

impl CodecTransform {
    pub fn new() -> Self {
        CodecTransform
    }
}

#[async_trait]
impl VariantTransform for CodecTransform {
    async fn transform(&self, source: Bytes, spec: &VariantTaskSpec) -> anyhow::Result<Bytes> {
        let spec = spec.clone();
        // Decode/resize/encode is CPU-bound; run off the async pool to avoid
        // blocking other tasks.
        let encoded =
            tokio::task::spawn_blocking(move || render_variant(&source, &spec)).await??;
        Ok(Bytes::from(encoded))
    }
}

/// Map a variant format to the codec format used for encoding.
pub fn image_format(format: VariantFormat) -> ImageFormat {
    match format {
        VariantFormat::Jpeg => ImageFormat::Jpeg,
        VariantFormat::Png => ImageFormat::Png,
        VariantFormat::WebP => ImageFormat::WebP,
    }
}

fn render_variant(data: &[u8], spec: &VariantTaskSpec) -> anyhow::Result<Vec<u8>> {
    let cursor = Cursor::new(data);
    let img = ImageReader::new(cursor).with_guessed_format()?.decode()?;

    let (source_width, source_height) = img.dimensions();
    let filter = select_filter((source_width, source_height), (spec.width, spec.height));

    // Non-cropping fit: preserves aspect ratio within the requested box.
    let resized = img.resize(spec.width, spec.height, filter);

    let resized = if spec.format.supports_alpha() {
        resized
    } else if resized.color().has_alpha() {
        tracing::debug!(
            format = ?spec.format,
            "Flattening alpha channel onto white background"
        );
        flatten_onto_white(&resized)
    } else {
        DynamicImage::ImageRgb8(resized.to_rgb8())
    };

    let (width, height) = resized.dimensions();
    let estimated_size = (width * height * 3) as usize;
    let mut buffer = Vec::with_capacity(estimated_size);
    let mut cursor = Cursor::new(&mut buffer);
    resized.write_to(&mut cursor, image_format(spec.format))?;

    Ok(buffer)
}

/// Pick a resampling filter by scale direction: Lanczos3 when shrinking,
/// CatmullRom when enlarging.
fn select_filter(source: (u32, u32), target: (u32, u32)) -> FilterType {
    if target.0 < source.0 || target.1 < source.1 {
        FilterType::Lanczos3
    } else {
        FilterType::CatmullRom
    }
}

/// Compose every pixel onto an opaque white background, discarding the
/// alpha channel.
fn flatten_onto_white(img: &DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let blend = |channel: u8| ((channel as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        rgb.put_pixel(
            x,
            y,
            Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]),
        );
    }

    DynamicImage::ImageRgb8(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, pixel);
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        buffer
    }

    #[test]
    fn test_fit_resize_preserves_aspect_ratio() {
        let source = png_bytes(200, 100, Rgba([255, 0, 0, 255]));
        let spec = VariantTaskSpec::new(50, 50, VariantFormat::Png);

        let out = render_variant(&source, &spec).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (50, 25));
    }

    #[test]
    fn test_exact_box_when_aspect_matches() {
        let source = png_bytes(800, 600, Rgba([0, 255, 0, 255]));
        let spec = VariantTaskSpec::new(400, 300, VariantFormat::Jpeg);

        let out = render_variant(&source, &spec).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (400, 300));
    }

    #[test]
    fn test_jpeg_output_flattens_transparency_to_white() {
        // Fully transparent source; flattening must produce pure white
        // before the (lossy) jpeg encode.
        let source = png_bytes(64, 64, Rgba([0, 0, 0, 0]));
        let spec = VariantTaskSpec::new(64, 64, VariantFormat::Jpeg);

        let out = render_variant(&source, &spec).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert!(!decoded.color().has_alpha());

        let rgb = decoded.to_rgb8();
        let pixel = rgb.get_pixel(32, 32);
        assert!(pixel[0] >= 250 && pixel[1] >= 250 && pixel[2] >= 250);
    }

    #[test]
    fn test_png_output_retains_transparency() {
        let source = png_bytes(64, 64, Rgba([0, 128, 255, 128]));
        let spec = VariantTaskSpec::new(64, 64, VariantFormat::Png);

        let out = render_variant(&source, &spec).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert!(decoded.color().has_alpha());

        let rgba = decoded.to_rgba8();
        assert_eq!(rgba.get_pixel(32, 32)[3], 128);
    }

    #[test]
    fn test_partial_alpha_blends_toward_white() {
        // Black at 50% alpha over white lands mid-gray.
        let source = png_bytes(16, 16, Rgba([0, 0, 0, 128]));
        let flattened = flatten_onto_white(&image::load_from_memory(&source).unwrap());
        let rgb = flattened.to_rgb8();
        let pixel = rgb.get_pixel(8, 8);
        assert!(pixel[0] > 120 && pixel[0] < 135);
    }

    #[test]
    fn test_select_filter() {
        assert!(matches!(
            select_filter((800, 600), (400, 300)),
            FilterType::Lanczos3
        ));
        assert!(matches!(
            select_filter((100, 100), (200, 200)),
            FilterType::CatmullRom
        ));
        assert!(matches!(
            select_filter((100, 100), (100, 100)),
            FilterType::CatmullRom
        ));
    }

    #[test]
    fn test_invalid_source_fails() {
        let spec = VariantTaskSpec::new(64, 64, VariantFormat::Png);
        assert!(render_variant(b"not an image", &spec).is_err());
    }

    #[tokio::test]
    async fn test_transform_capability() {
        let source = Bytes::from(png_bytes(100, 100, Rgba([255, 0, 0, 255])));
        let spec = VariantTaskSpec::new(10, 10, VariantFormat::Png);

        let out = CodecTransform::new().transform(source, &spec).await.unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (10, 10));
    }
}
