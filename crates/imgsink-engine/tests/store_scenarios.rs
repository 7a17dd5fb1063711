//! End-to-end scenarios for the variant store: a full upload profile
//! (full-size plus icon), and transparency handling across output formats.

use image::{GenericImageView, ImageFormat, Rgba, RgbaImage};
use imgsink_engine::{
    SinkConfig, StoreError, UploadContext, UploadSource, VariantFormat, VariantStore,
    VariantTaskSpec,
};
use std::io::Cursor;
use tempfile::tempdir;

fn encode_png(img: &RgbaImage) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    img.write_to(&mut cursor, ImageFormat::Png).unwrap();
    buffer
}

fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([80, 120, 40]),
    ));
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    img.write_to(&mut cursor, ImageFormat::Jpeg).unwrap();
    buffer
}

#[tokio::test]
async fn full_size_and_icon_profile() {
    let dir = tempdir().unwrap();
    let store = VariantStore::new(SinkConfig::new(dir.path()));

    // Source aspect ratios match both requested boxes exactly.
    let ctx = UploadContext::new(
        UploadSource::from_bytes(encode_jpeg(800, 600)),
        "image/jpeg",
        "photo",
    );
    let specs = vec![
        VariantTaskSpec::new(800, 600, VariantFormat::Jpeg),
        VariantTaskSpec::new(150, 150, VariantFormat::Jpeg).with_suffix("icon"),
    ];

    let descriptor = store.transcode_with(ctx, &specs).await.unwrap();

    assert_eq!(descriptor.results.len(), 2);

    let full = &descriptor.results[0];
    assert_eq!(full.path, dir.path().join("photo.jpeg"));
    assert_eq!((full.width, full.height), (800, 600));

    let icon = &descriptor.results[1];
    assert_eq!(icon.path, dir.path().join("photo_icon.jpeg"));
    // 800x600 into a 150x150 box fits to 150x113 (aspect preserved,
    // 112.5 rounds away from zero).
    assert_eq!((icon.width, icon.height), (150, 113));

    for result in &descriptor.results {
        let on_disk = image::open(&result.path).unwrap();
        assert_eq!(on_disk.dimensions(), (result.width, result.height));
    }
}

#[tokio::test]
async fn transparency_retained_for_png_flattened_for_jpeg() {
    let dir = tempdir().unwrap();
    let store = VariantStore::new(SinkConfig::new(dir.path()));

    // Fully transparent source.
    let source = RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 0]));
    let ctx = UploadContext::new(
        UploadSource::from_bytes(encode_png(&source)),
        "image/png",
        "logo",
    );
    let specs = vec![
        VariantTaskSpec::new(64, 64, VariantFormat::Png),
        VariantTaskSpec::new(64, 64, VariantFormat::Jpeg).with_suffix("flat"),
    ];

    let descriptor = store.transcode_with(ctx, &specs).await.unwrap();

    let png_out = image::open(&descriptor.results[0].path).unwrap();
    assert!(png_out.color().has_alpha());
    assert_eq!(png_out.to_rgba8().get_pixel(10, 10)[3], 0);

    let jpeg_out = image::open(&descriptor.results[1].path).unwrap();
    assert!(!jpeg_out.color().has_alpha());
    let pixel = jpeg_out.to_rgb8().get_pixel(10, 10).0;
    assert!(pixel.iter().all(|&channel| channel >= 250), "expected white background, got {:?}", pixel);
}

#[tokio::test]
async fn failed_upload_supports_deterministic_cleanup() {
    let dir = tempdir().unwrap();
    let store = VariantStore::new(SinkConfig::new(dir.path()));

    let ctx = UploadContext::new(
        UploadSource::from_bytes(encode_jpeg(400, 300)),
        "image/jpeg",
        "report",
    );
    let specs = vec![VariantTaskSpec::new(400, 300, VariantFormat::Jpeg)];

    let descriptor = store.transcode_with(ctx, &specs).await.unwrap();
    let stored = descriptor.primary().unwrap().path.clone();
    assert!(stored.is_file());

    // The surrounding request failed after storage: the caller removes the
    // recorded primary path.
    store.cleanup(&stored).await.unwrap();
    assert!(!stored.exists());
    store.cleanup(&stored).await.unwrap(); // idempotent
}

#[tokio::test]
async fn undecodable_source_fails_each_variant() {
    let dir = tempdir().unwrap();
    let store = VariantStore::new(SinkConfig::new(dir.path()));

    let ctx = UploadContext::new(
        UploadSource::from_bytes(b"declared as png, not actually one".to_vec()),
        "image/png",
        "broken",
    );
    let specs = vec![VariantTaskSpec::new(10, 10, VariantFormat::Png)];

    let err = store.transcode_with(ctx, &specs).await.unwrap_err();
    assert!(matches!(err, StoreError::Transcode { index: 0, .. }));
}
