//! Encoder backend contract and shared validation.

use thiserror::Error;

use crate::buffer::{rgba_len, PixelView};

/// Errors that can occur while encoding pixel data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 4), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The codec reported a failure
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    /// The backend panicked or otherwise aborted
    #[error("Encoder backend aborted: {0}")]
    Aborted(String),
}

/// One compressed-format encoder.
///
/// Backends run on codec worker threads, so they must be `Send + Sync`.
/// An encoder either returns the complete output or an error, never a
/// partial buffer.
pub trait EncoderBackend: Send + Sync {
    /// Encode RGBA8 pixels. `quality` is 0..=100; backends that have no
    /// notion of quality ignore it.
    fn encode(&self, view: PixelView<'_>, quality: u8) -> Result<Vec<u8>, EncodeError>;
}

/// Check that a view describes a complete, non-empty RGBA8 image.
pub fn validate_view(view: &PixelView<'_>) -> Result<(), EncodeError> {
    let (width, height) = (view.width, view.height);
    let expected = rgba_len(width, height).map_err(|_| EncodeError::InvalidDimensions { width, height })?;
    if view.data.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: view.data.len(),
        });
    }
    Ok(())
}
