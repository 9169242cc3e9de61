//! Image encoding for the codec pipeline.
//!
//! This module provides functionality for:
//! - Encoding RGBA8 pixels to JPEG (with quality), PNG and lossy WEBP (with quality)
//! - Packaging the output as an immutable [`EncodedBlob`]
//!
//! # Architecture
//!
//! Encoding runs on a codec worker thread through the [`EncoderBackend`]
//! trait. Quality and type are validated by the pipeline before a job is
//! dispatched; encoders only re-check the pixel layout.

mod blob;
mod jpeg;
mod png;
mod types;
mod webp;

pub use blob::EncodedBlob;
pub use jpeg::{encode_jpeg, JpegBackend};
pub use png::{encode_png, PngBackend};
pub use types::{validate_view, EncodeError, EncoderBackend};
pub use webp::{encode_webp, WebpBackend};
