//! JPEG encoding.
//!
//! Uses the `image` crate's JPEG encoder. JPEG has no alpha channel, so the
//! alpha of every pixel is discarded before encoding.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use image::ImageEncoder;
use std::io::Cursor;

use super::{validate_view, EncodeError, EncoderBackend};
use crate::buffer::PixelView;

/// Encode RGBA pixel data to JPEG bytes.
///
/// # Arguments
///
/// * `view` - RGBA pixel data (4 bytes per pixel, row-major order)
/// * `quality` - JPEG quality (0-100, 0 is treated as 1)
///
/// # Quality Guidelines
///
/// * 90-100: High quality, suitable for archival or further editing
/// * 60-90: Good quality for most uses (pipeline default: 80)
/// * Below 60: Low quality, visible artifacts
pub fn encode_jpeg(view: PixelView<'_>, quality: u8) -> Result<Vec<u8>, EncodeError> {
    validate_view(&view)?;

    // Clamp quality to the encoder's valid range (1-100)
    let quality = quality.clamp(1, 100);

    let rgb: Vec<u8> = view
        .data
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .write_image(&rgb, view.width, view.height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;

    Ok(buffer.into_inner())
}

/// [`EncoderBackend`] for JPEG.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegBackend;

impl EncoderBackend for JpegBackend {
    fn encode(&self, view: PixelView<'_>, quality: u8) -> Result<Vec<u8>, EncodeError> {
        encode_jpeg(view, quality)
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for generating image dimensions (keep small for speed).
    fn dimensions_strategy() -> impl Strategy<Value = (u32, u32)> {
        (1u32..=32, 1u32..=32)
    }

    proptest! {
        /// Property: Encoding always produces valid JPEG when given valid input.
        #[test]
        fn prop_valid_input_produces_valid_jpeg(
            (width, height) in dimensions_strategy(),
            quality in 0u8..=100,
        ) {
            let pixels = vec![128u8; (width * height * 4) as usize];
            let view = PixelView { width, height, data: &pixels };

            let jpeg_bytes = encode_jpeg(view, quality).unwrap();
            prop_assert_eq!(&jpeg_bytes[0..2], &[0xFF, 0xD8], "Should have SOI marker");
            let len = jpeg_bytes.len();
            prop_assert_eq!(&jpeg_bytes[len - 2..], &[0xFF, 0xD9], "Should have EOI marker");
        }

        /// Property: Same input always produces same output (deterministic).
        #[test]
        fn prop_deterministic_output(
            (width, height) in (1u32..=16, 1u32..=16),
            quality in 1u8..=100,
        ) {
            let pixels = vec![100u8; (width * height * 4) as usize];
            let view = PixelView { width, height, data: &pixels };
            prop_assert_eq!(encode_jpeg(view, quality).unwrap(), encode_jpeg(view, quality).unwrap());
        }

        /// Property: Invalid pixel data length always returns error.
        #[test]
        fn prop_invalid_pixel_length_returns_error(
            (width, height) in dimensions_strategy(),
            delta in 1usize..=10,
            longer in any::<bool>(),
        ) {
            let expected = (width * height * 4) as usize;
            let actual = if longer { expected + delta } else { expected.saturating_sub(delta) };
            let pixels = vec![128u8; actual];
            let view = PixelView { width, height, data: &pixels };
            let rejected = matches!(
                encode_jpeg(view, 90),
                Err(EncodeError::InvalidPixelData { .. })
            );
            prop_assert!(rejected);
        }
    }
}
