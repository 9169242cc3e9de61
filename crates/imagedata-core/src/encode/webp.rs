//! WEBP encoding.
//!
//! Lossy libwebp encoding through the `webp` crate; quality 0..=100 maps
//! directly onto libwebp's quality factor.

use super::{validate_view, EncodeError, EncoderBackend};
use crate::buffer::PixelView;

/// Encode RGBA pixel data to lossy WEBP bytes.
pub fn encode_webp(view: PixelView<'_>, quality: u8) -> Result<Vec<u8>, EncodeError> {
    validate_view(&view)?;

    let quality = f32::from(quality.min(100));
    let encoded = webp::Encoder::from_rgba(view.data, view.width, view.height)
        .encode_simple(false, quality)
        .map_err(|e| EncodeError::EncodingFailed(format!("{e:?}")))?;
    Ok(encoded.to_vec())
}

/// [`EncoderBackend`] for WEBP.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebpBackend;

impl EncoderBackend for WebpBackend {
    fn encode(&self, view: PixelView<'_>, quality: u8) -> Result<Vec<u8>, EncodeError> {
        encode_webp(view, quality)
    }
}
