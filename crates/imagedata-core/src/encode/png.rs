//! PNG encoding. Lossless, so the quality setting is ignored.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::{validate_view, EncodeError, EncoderBackend};
use crate::buffer::PixelView;

/// Encode RGBA pixel data to PNG bytes.
pub fn encode_png(view: PixelView<'_>) -> Result<Vec<u8>, EncodeError> {
    validate_view(&view)?;

    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(view.data, view.width, view.height, ExtendedColorType::Rgba8)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;
    Ok(out)
}

/// [`EncoderBackend`] for PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngBackend;

impl EncoderBackend for PngBackend {
    fn encode(&self, view: PixelView<'_>, _quality: u8) -> Result<Vec<u8>, EncodeError> {
        encode_png(view)
    }
}
