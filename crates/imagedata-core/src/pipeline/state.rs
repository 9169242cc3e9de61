//! Pipeline lifecycle states.

use std::fmt;
use std::rc::Rc;

use super::CodecPipeline;
use crate::encode::EncodedBlob;
use crate::format::EncodeKind;
use crate::pending::Resolver;
use crate::source::{BlobSource, ImageElement, SourceKey, SubscriptionId};
use crate::worker::CodecWorker;

/// Observable state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Idle without pixel data.
    Empty,
    /// Waiting for an image element or blob to deliver its bytes.
    Loading,
    /// A worker is decoding into the pixel buffer.
    Decoding,
    /// Idle with pixel data.
    Ready,
    /// A worker is encoding the pixel buffer.
    Encoding,
}

impl PipelineState {
    /// True while an operation is pending.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            PipelineState::Loading | PipelineState::Decoding | PipelineState::Encoding
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Empty => "empty",
            PipelineState::Loading => "loading",
            PipelineState::Decoding => "decoding",
            PipelineState::Ready => "ready",
            PipelineState::Encoding => "encoding",
        };
        f.write_str(name)
    }
}

/// What a loading pipeline is attached to.
pub(super) enum SourceAttachment {
    /// `subscription` is `None` when the element was already complete.
    Element {
        element: Rc<dyn ImageElement>,
        subscription: Option<SubscriptionId>,
    },
    Blob {
        blob: Rc<dyn BlobSource>,
    },
}

impl SourceAttachment {
    pub(super) fn key(&self) -> SourceKey {
        match self {
            SourceAttachment::Element { element, .. } => SourceKey::of(element),
            SourceAttachment::Blob { blob } => SourceKey::of(blob),
        }
    }
}

/// The single pending operation, if any. A resolver exists only here, so a
/// pipeline can never hold two.
pub(super) enum Phase {
    Idle,
    Loading {
        resolver: Resolver<CodecPipeline>,
        attachment: SourceAttachment,
    },
    Decoding {
        resolver: Resolver<CodecPipeline>,
        worker: CodecWorker,
    },
    Encoding {
        resolver: Resolver<EncodedBlob>,
        worker: CodecWorker,
        kind: EncodeKind,
    },
}

impl Phase {
    pub(super) fn is_idle(&self) -> bool {
        matches!(self, Phase::Idle)
    }

    pub(super) fn state(&self, has_pixels: bool) -> PipelineState {
        match self {
            Phase::Idle if has_pixels => PipelineState::Ready,
            Phase::Idle => PipelineState::Empty,
            Phase::Loading { .. } => PipelineState::Loading,
            Phase::Decoding { .. } => PipelineState::Decoding,
            Phase::Encoding { .. } => PipelineState::Encoding,
        }
    }
}
