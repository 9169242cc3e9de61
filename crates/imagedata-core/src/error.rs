//! Rejection reasons for pipeline operations.

use thiserror::Error;

use crate::buffer::BufferError;
use crate::decode::DecodeError;
use crate::encode::EncodeError;
use crate::source::SourceError;

/// Why a pending result was rejected or a pipeline could not be built.
///
/// Validation errors (`OperationInProgress`, `NoPixelData`,
/// `UnsupportedType`, `InvalidQuality`, `SourceAttached`) are raised synchronously before any
/// worker exists. Backend errors are raised on the worker and reach the
/// caller only after the owning thread has processed the completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Another decode or encode is still pending on this pipeline.
    #[error("Image has pending activities")]
    OperationInProgress,

    /// Encode requested before any pixel data exists.
    #[error("Image has no pixel data available")]
    NoPixelData,

    /// The requested MIME type is not an encode kind.
    #[error("Unsupported encode type: {0}")]
    UnsupportedType(String),

    /// Quality outside 0..=100.
    #[error("Unsupported quality {0}, should be between 0 and 100")]
    InvalidQuality(i32),

    /// The source is already feeding another pipeline's pending load.
    #[error("Image source is already attached to a pending load")]
    SourceAttached,

    /// The image element or blob failed to deliver its bytes.
    #[error("Failed to load image data: {0}")]
    SourceLoadFailed(#[source] SourceError),

    /// The compressed bytes have no recognizable header.
    #[error("Failed to load image data: {0}")]
    DimensionsUnavailable(#[source] DecodeError),

    /// The decoder backend failed on the worker.
    #[error("Failed to decode image: {0}")]
    DecodeFailed(#[source] DecodeError),

    /// The encoder backend failed on the worker.
    #[error("Failed to encode image: {0}")]
    EncodeFailed(#[source] EncodeError),

    /// Direct construction from raw pixels was rejected.
    #[error("Invalid pixel buffer: {0}")]
    InvalidBuffer(#[from] BufferError),

    /// The pipeline was dropped before the operation settled.
    #[error("Operation abandoned: the image was destroyed before it completed")]
    Abandoned,

    /// Waiting found nothing in flight that could ever settle the result.
    #[error("Operation stalled: no codec work or source read is in flight")]
    Stalled,
}

impl CodecError {
    /// True for errors detected before dispatch.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CodecError::OperationInProgress
                | CodecError::NoPixelData
                | CodecError::UnsupportedType(_)
                | CodecError::InvalidQuality(_)
                | CodecError::SourceAttached
                | CodecError::InvalidBuffer(_)
        )
    }
}
