//! Image Intake
//!
//! Validates, downsizes, and re-encodes a user-supplied image into a
//! bounded-size embeddable form before it is attached to a message. The
//! output is a self-describing `data:image/jpeg;base64,…` string small
//! enough to stay under the request-size ceiling enforced downstream by the
//! orchestrator.
//!
//! No error escapes this boundary untyped: every failure mode is an
//! [`IntakeError`] with a user-facing message.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

/// Maximum accepted input size (5 MiB)
pub const MAX_INPUT_BYTES: usize = 5 * 1024 * 1024;

/// Both output dimensions are bounded to this (downscale only)
pub const MAX_DIMENSION: u32 = 800;

/// Why an image was rejected
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// Declared content type is not an image
    #[error("please select an image file")]
    NotAnImage,
    /// Input exceeds the 5 MiB cap
    #[error("the file is too large; the maximum size is 5 MB")]
    TooLarge,
    /// The bytes could not be decoded as an image
    #[error("the image could not be read; please try a different one")]
    Decode(#[source] image::ImageError),
    /// Re-encoding failed
    #[error("the image could not be processed; please try a different one")]
    Encode(#[source] image::ImageError),
}

/// A validated, downsized, re-encoded image ready for embedding
#[derive(Clone, Debug)]
pub struct EncodedImage {
    /// Self-describing embeddable form: `data:image/jpeg;base64,…`
    pub data_url: String,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// JPEG quality selected by the area policy
    pub quality: u8,
}

/// Validate and re-encode a user-selected image
///
/// `declared_mime` is the content type the upload claims; the decoder then
/// sniffs the real format, so a lying MIME type surfaces as a decode error
/// rather than a panic.
pub fn validate_and_encode(bytes: &[u8], declared_mime: &str) -> Result<EncodedImage, IntakeError> {
    if !declared_mime.starts_with("image/") {
        return Err(IntakeError::NotAnImage);
    }
    if bytes.len() > MAX_INPUT_BYTES {
        return Err(IntakeError::TooLarge);
    }

    let decoded = image::load_from_memory(bytes).map_err(IntakeError::Decode)?;
    let (width, height) = (decoded.width(), decoded.height());
    let (target_w, target_h) = bounded_dimensions(width, height);

    let resized = if (target_w, target_h) == (width, height) {
        decoded
    } else {
        decoded.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Triangle)
    };

    let quality = quality_for_area(u64::from(resized.width()) * u64::from(resized.height()));

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode_image(&DynamicImage::ImageRgb8(resized.to_rgb8()))
        .map_err(IntakeError::Encode)?;

    tracing::debug!(
        width = resized.width(),
        height = resized.height(),
        quality,
        kib = jpeg.len() / 1024,
        "image re-encoded for embedding"
    );

    Ok(EncodedImage {
        data_url: format!("data:image/jpeg;base64,{}", BASE64.encode(&jpeg)),
        width: resized.width(),
        height: resized.height(),
        quality,
    })
}

/// Scale both dimensions to fit within [`MAX_DIMENSION`], preserving aspect
/// ratio. Never scales up.
fn bounded_dimensions(width: u32, height: u32) -> (u32, u32) {
    if width <= MAX_DIMENSION && height <= MAX_DIMENSION {
        return (width, height);
    }
    if width > height {
        let scaled = (f64::from(height) * f64::from(MAX_DIMENSION) / f64::from(width)) as u32;
        (MAX_DIMENSION, scaled.max(1))
    } else {
        let scaled = (f64::from(width) * f64::from(MAX_DIMENSION) / f64::from(height)) as u32;
        (scaled.max(1), MAX_DIMENSION)
    }
}

/// Three-tier quality policy on scaled pixel area
///
/// Larger images take stronger compression so the embedded payload stays
/// under the downstream request-size ceiling.
fn quality_for_area(area: u64) -> u8 {
    if area > 600_000 {
        50
    } else if area > 400_000 {
        60
    } else {
        70
    }
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 40, 200]),
        ));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_rejects_non_image_mime() {
        let err = validate_and_encode(b"plain text", "text/plain").unwrap_err();
        assert!(matches!(err, IntakeError::NotAnImage));
    }

    #[test]
    fn test_rejects_oversized_input() {
        let big = vec![0u8; MAX_INPUT_BYTES + 1];
        let err = validate_and_encode(&big, "image/png").unwrap_err();
        assert!(matches!(err, IntakeError::TooLarge));
    }

    #[test]
    fn test_rejects_undecodable_bytes() {
        let err = validate_and_encode(b"not actually an image", "image/png").unwrap_err();
        assert!(matches!(err, IntakeError::Decode(_)));
    }

    #[test]
    fn test_bounded_dimensions_policy() {
        assert_eq!(bounded_dimensions(1600, 1200), (800, 600));
        assert_eq!(bounded_dimensions(1200, 1600), (600, 800));
        assert_eq!(bounded_dimensions(800, 800), (800, 800));
        // Never scales up
        assert_eq!(bounded_dimensions(320, 200), (320, 200));
    }

    #[test]
    fn test_quality_tiers() {
        assert_eq!(quality_for_area(300_000), 70);
        assert_eq!(quality_for_area(400_000), 70);
        assert_eq!(quality_for_area(480_000), 60);
        assert_eq!(quality_for_area(600_000), 60);
        assert_eq!(quality_for_area(640_000), 50);
    }

    #[test]
    fn test_landscape_downscale_selects_mid_quality() {
        // 1600x1200 scales to 800x600; 480,000 px² lands in the middle tier.
        let encoded = validate_and_encode(&png_bytes(1600, 1200), "image/jpeg").unwrap();
        assert_eq!((encoded.width, encoded.height), (800, 600));
        assert_eq!(encoded.quality, 60);
        assert!(encoded.data_url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_small_image_kept_at_full_size() {
        let encoded = validate_and_encode(&png_bytes(320, 240), "image/png").unwrap();
        assert_eq!((encoded.width, encoded.height), (320, 240));
        assert_eq!(encoded.quality, 70);
    }

    #[test]
    fn test_data_url_payload_is_valid_base64() {
        let encoded = validate_and_encode(&png_bytes(64, 64), "image/png").unwrap();
        let payload = encoded
            .data_url
            .strip_prefix("data:image/jpeg;base64,")
            .unwrap();
        assert!(BASE64.decode(payload).is_ok());
    }
}
