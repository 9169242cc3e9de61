//! The set of codec backends a pipeline dispatches to.
//!
//! A `CodecSet` pairs one [`DecoderBackend`] with one [`EncoderBackend`] per
//! [`EncodeKind`]. It is cheap to clone and is moved into each worker job.

use std::fmt;
use std::sync::Arc;

use crate::decode::{DecoderBackend, FilterType, ImageCrateDecoder};
use crate::encode::{EncoderBackend, JpegBackend, PngBackend, WebpBackend};
use crate::format::EncodeKind;

#[derive(Clone)]
pub struct CodecSet {
    decoder: Arc<dyn DecoderBackend>,
    jpeg: Arc<dyn EncoderBackend>,
    png: Arc<dyn EncoderBackend>,
    webp: Arc<dyn EncoderBackend>,
}

impl fmt::Debug for CodecSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecSet").finish_non_exhaustive()
    }
}

impl Default for CodecSet {
    fn default() -> Self {
        Self::with_filter(FilterType::default())
    }
}

impl CodecSet {
    /// The `image` crate backends, scaling decodes with `filter`.
    pub fn with_filter(filter: FilterType) -> Self {
        Self {
            decoder: Arc::new(ImageCrateDecoder::new(filter)),
            jpeg: Arc::new(JpegBackend),
            png: Arc::new(PngBackend),
            webp: Arc::new(WebpBackend),
        }
    }

    /// Replace the decoder backend.
    pub fn decoder(mut self, decoder: Arc<dyn DecoderBackend>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Replace the encoder backend for one kind.
    pub fn encoder(mut self, kind: EncodeKind, encoder: Arc<dyn EncoderBackend>) -> Self {
        match kind {
            EncodeKind::Jpeg => self.jpeg = encoder,
            EncodeKind::Png => self.png = encoder,
            EncodeKind::Webp => self.webp = encoder,
        }
        self
    }

    pub fn decoder_backend(&self) -> &dyn DecoderBackend {
        self.decoder.as_ref()
    }

    /// The encoder registered for `kind`.
    pub fn encoder_for(&self, kind: EncodeKind) -> &dyn EncoderBackend {
        match kind {
            EncodeKind::Jpeg => self.jpeg.as_ref(),
            EncodeKind::Png => self.png.as_ref(),
            EncodeKind::Webp => self.webp.as_ref(),
        }
    }
}
