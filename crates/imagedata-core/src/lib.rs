//! ImageData Core - Asynchronous image codec pipeline
//!
//! This crate provides an RGBA pixel buffer that decodes compressed images
//! into itself and encodes itself to JPEG, PNG or WEBP on background worker
//! threads, with at most one operation in flight per buffer.
//!
//! Pipelines live on a single owning thread driven by a [`Dispatcher`]:
//! requests return a [`PendingResult`] immediately and settle when the
//! dispatcher processes the worker's completion.

pub mod buffer;
pub mod codecs;
pub mod config;
pub mod decode;
pub mod dispatch;
pub mod encode;
pub mod error;
pub mod format;
pub mod pending;
pub mod pipeline;
pub mod source;
mod worker;

pub use buffer::{AllocatorKind, PixelBuffer, PixelView, SharedAllocator};
pub use codecs::CodecSet;
pub use config::PipelineConfig;
pub use dispatch::Dispatcher;
pub use encode::EncodedBlob;
pub use error::CodecError;
pub use format::{can_decode_type, can_encode_type, DecodeKind, EncodeKind, TypeSupport};
pub use pending::PendingResult;
pub use pipeline::{CodecPipeline, EncodeOptions, PipelineBuilder, PipelineState};
pub use source::{
    BlobSource, BytesBlob, FileBlob, ImageElement, ImageSource, LoadingImage, SourceError,
};
