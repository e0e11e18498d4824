//! Image encoding: `DynamicImage` → base64 JPEG wrapped in `ImageData`.
//!
//! Only the issuer name has to be legible, so a lossy JPEG at quality 85 is
//! plenty and keeps the request body small. JPEG has no alpha channel, so
//! the image is flattened to RGB first.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

pub const JPEG_MIME: &str = "image/jpeg";

/// Encode a rendered page as a base64 JPEG ready for the VLM API.
pub fn encode_page(img: &DynamicImage, quality: u8) -> Result<ImageData, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)))?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} page → {} bytes JPEG, {} bytes base64",
        img.width(),
        img.height(),
        buf.len(),
        b64.len()
    );

    Ok(ImageData::new(b64, JPEG_MIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_rgba_image_as_jpeg() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([0, 128, 255, 255])));
        let data = encode_page(&img, 85).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/jpeg");

        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        // JPEG SOI marker
        assert_eq!(&decoded[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn lower_quality_is_not_larger() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8, 255])
        }));
        let high = encode_page(&img, 95).unwrap();
        let low = encode_page(&img, 10).unwrap();
        assert!(low.data.len() <= high.data.len());
    }
}
