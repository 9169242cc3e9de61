//! Image decoding for the codec pipeline.
//!
//! This module provides functionality for:
//! - Probing compressed bytes for their format and natural dimensions
//! - Decoding JPEG, PNG, GIF, WEBP, BMP and ICO into RGBA8
//! - Scaling the decoded frame to the size the pipeline allocated
//!
//! # Architecture
//!
//! Probing runs on the owning thread (it only reads the header). The full
//! decode runs on a codec worker thread through the [`DecoderBackend`]
//! trait, which lets callers swap in their own decoder.

mod backend;
mod scale;
mod types;

pub use backend::{DecoderBackend, ImageCrateDecoder};
pub use scale::scale_rgba;
pub use types::{DecodeError, FilterType, ImageHeader};
