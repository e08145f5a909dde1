//! End-to-end tests against the real libwebp tools.
//!
//! These download the prebuilt release on first run (or use `VENDOR_PATH` /
//! `SKIP_DOWNLOAD`), so they are ignored by default:
//!
//! ```sh
//! cargo test -p webpbin-core --test roundtrip -- --ignored
//! ```

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageFormat, RgbaImage};
use webpbin_core::{BinWrapper, CWebP, DWebP, DecodeFormat, Tool, DEFAULT_LIBWEBP_VERSION};

fn gradient(width: u32, height: u32) -> DynamicImage {
    let mut img = RgbaImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = image::Rgba([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            128,
            255,
        ]);
    }
    DynamicImage::ImageRgba8(img)
}

fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn assert_webp(bytes: &[u8]) {
    assert!(bytes.len() > 12, "output too short: {} bytes", bytes.len());
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WEBP");
}

#[tokio::test]
#[ignore = "downloads libwebp"]
async fn encode_file_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("gradient.png");
    let output = dir.path().join("gradient.webp");
    gradient(64, 48).save(&input).unwrap();

    let mut encoder = CWebP::new(BinWrapper::from_env());
    encoder.quality(80.0).input_file(&input).output_file(&output);
    encoder.run().await.unwrap();

    let webp = std::fs::read(&output).unwrap();
    assert_webp(&webp);
    let decoded = image::load_from_memory(&webp).unwrap();
    assert_eq!(decoded.dimensions(), (64, 48));
}

#[tokio::test]
#[ignore = "downloads libwebp"]
async fn encode_stream_and_image_inputs() {
    let bin = BinWrapper::from_env();
    let source = gradient(40, 30);
    let dir = tempfile::tempdir().unwrap();

    let input = dir.path().join("source.png");
    let path_out = dir.path().join("path.webp");
    std::fs::write(&input, png_bytes(&source)).unwrap();
    let mut encoder = CWebP::new(bin.clone());
    encoder.input_file(&input).output_file(&path_out);
    encoder.run().await.unwrap();

    let stream_out = dir.path().join("stream.webp");
    let writer = tokio::fs::File::create(&stream_out).await.unwrap();
    let mut encoder = CWebP::new(bin.clone());
    encoder
        .input(Cursor::new(png_bytes(&source)))
        .output(writer);
    encoder.run().await.unwrap();

    let image_out = dir.path().join("image.webp");
    let mut encoder = CWebP::new(bin);
    encoder
        .lossless(true)
        .input_image(source.clone())
        .output_file(&image_out);
    encoder.run().await.unwrap();

    for path in [&path_out, &stream_out, &image_out] {
        let webp = std::fs::read(path).unwrap();
        assert_webp(&webp);
        let decoded = image::load_from_memory(&webp).unwrap();
        assert_eq!(decoded.dimensions(), source.dimensions(), "{}", path.display());
    }
    assert_eq!(std::fs::read(&path_out).unwrap(), std::fs::read(&stream_out).unwrap());

    let decoded = image::open(&image_out).unwrap();
    assert_eq!(decoded.to_rgba8(), source.to_rgba8());
}

#[tokio::test]
#[ignore = "downloads libwebp"]
async fn decode_to_image_and_file() {
    let bin = BinWrapper::from_env();
    let dir = tempfile::tempdir().unwrap();
    let webp = dir.path().join("in.webp");

    let mut encoder = CWebP::new(bin.clone());
    encoder
        .lossless(true)
        .input_image(gradient(32, 16))
        .output_file(&webp);
    encoder.run().await.unwrap();

    let mut decoder = DWebP::new(bin);
    decoder.input_file(&webp);
    let image = decoder.decode_image().await.unwrap();
    assert_eq!(image.dimensions(), (32, 16));

    let tiff = dir.path().join("out.tiff");
    decoder.format(DecodeFormat::Tiff).output_file(&tiff);
    decoder.run().await.unwrap();
    assert!(std::fs::metadata(&tiff).unwrap().len() > 0);
}

#[tokio::test]
#[ignore = "downloads libwebp"]
async fn version_matches_release() {
    let bin = BinWrapper::from_env();
    if bin.config().version != DEFAULT_LIBWEBP_VERSION {
        return;
    }
    let version = bin.version(Tool::Cwebp).await.unwrap();
    assert!(version.contains(DEFAULT_LIBWEBP_VERSION), "got {version}");
    assert!(!version.contains('\n'));
}
