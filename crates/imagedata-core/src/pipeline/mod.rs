//! The image codec pipeline.
//!
//! A [`CodecPipeline`] owns one RGBA pixel buffer and runs at most one
//! decode or encode at a time. Requests are validated synchronously on the
//! owning thread; accepted ones hand the buffer to a codec worker and return
//! a [`PendingResult`] that settles when the dispatcher processes the
//! worker's completion.
//!
//! # Lifecycle
//!
//! ```text
//! Empty --decode--> Loading --bytes--> Decoding --ok--> Ready
//!                                          \--err--> Empty
//! Ready --encode--> Encoding --done--> Ready
//! ```
//!
//! Dropping a pipeline mid-operation detaches its worker and settles the
//! outstanding result as [`CodecError::Abandoned`]; the late completion is
//! discarded by the dispatcher.

mod state;

use std::cell::{Ref, RefCell};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use state::PipelineState;
use state::{Phase, SourceAttachment};

use crate::buffer::{PixelBuffer, PixelView, SharedAllocator};
use crate::codecs::CodecSet;
use crate::config::PipelineConfig;
use crate::decode::DecodeError;
use crate::dispatch::{CompletionSink, Dispatcher};
use crate::encode::{EncodeError, EncodedBlob};
use crate::error::CodecError;
use crate::format::EncodeKind;
use crate::pending::{pending, PendingResult, Resolver};
use crate::source::{
    BlobSource, ImageElement, ImageSource, SourceError, SourceKey, SubscriptionId,
};
use crate::worker::{CodecJob, CodecWorker, Completion, JobToken, Outcome, SpawnFailure};

/// Options for [`CodecPipeline::to_blob`]. Unset fields use the pipeline's
/// configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Target MIME type.
    #[serde(rename = "type")]
    pub mime: Option<String>,
    /// Quality in 0..=100.
    pub quality: Option<i32>,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn quality(mut self, quality: i32) -> Self {
        self.quality = Some(quality);
        self
    }
}

/// Configures and constructs a [`CodecPipeline`].
#[derive(Debug)]
pub struct PipelineBuilder {
    dispatcher: Dispatcher,
    config: PipelineConfig,
    codecs: Option<CodecSet>,
}

impl PipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use custom codec backends instead of the `image` crate ones.
    pub fn codecs(mut self, codecs: CodecSet) -> Self {
        self.codecs = Some(codecs);
        self
    }

    fn assemble(self, allocator: SharedAllocator, pixels: Option<PixelBuffer>) -> CodecPipeline {
        let codecs = self
            .codecs
            .unwrap_or_else(|| CodecSet::with_filter(self.config.scale_filter));
        let size = pixels.as_ref().map_or((0, 0), PixelBuffer::dimensions);
        let inner = Rc::new(RefCell::new(PipelineInner {
            id: 0,
            dispatcher: self.dispatcher.clone(),
            config: self.config,
            codecs,
            allocator,
            pixels,
            size,
            phase: Phase::Idle,
            generation: 0,
        }));
        let sink = Rc::downgrade(&inner);
        let sink: Weak<dyn CompletionSink> = sink;
        let id = self.dispatcher.register(sink);
        inner.borrow_mut().id = id;
        debug!(pipeline = id, width = size.0, height = size.1, "pipeline created");
        CodecPipeline { inner }
    }

    /// A pipeline with no pixel data.
    pub fn empty(self) -> CodecPipeline {
        let allocator = self.config.allocator.build();
        self.assemble(allocator, None)
    }

    /// A pipeline holding `width x height` transparent black pixels.
    pub fn zeroed(self, width: u32, height: u32) -> Result<CodecPipeline, CodecError> {
        let allocator = self.config.allocator.build();
        let pixels = PixelBuffer::zeroed(allocator.clone(), width, height)?;
        Ok(self.assemble(allocator, Some(pixels)))
    }

    /// A pipeline adopting caller-supplied RGBA bytes.
    pub fn from_rgba(
        self,
        data: Vec<u8>,
        width: u32,
        height: Option<u32>,
    ) -> Result<CodecPipeline, CodecError> {
        let allocator = self.config.allocator.build();
        let pixels = PixelBuffer::from_rgba(allocator.clone(), data, width, height)?;
        Ok(self.assemble(allocator, Some(pixels)))
    }

    /// A new pipeline decoding `source`. The pipeline is kept alive by the
    /// returned result until it settles.
    pub fn from_source(self, source: ImageSource) -> PendingResult<CodecPipeline> {
        let pipeline = self.empty();
        pipeline
            .request_decode_from_source(source)
            .keep_alive(pipeline)
    }
}

struct PipelineInner {
    id: u64,
    dispatcher: Dispatcher,
    config: PipelineConfig,
    codecs: CodecSet,
    allocator: SharedAllocator,
    /// `None` while a worker holds the buffer, after release, and after a
    /// failed decode.
    pixels: Option<PixelBuffer>,
    /// Dimensions of the current or in-flight buffer.
    size: (u32, u32),
    phase: Phase,
    /// Bumped for every accepted operation; completions carry it back.
    generation: u64,
}

impl PipelineInner {
    fn ensure_idle(&self) -> Result<(), CodecError> {
        if self.phase.is_idle() {
            Ok(())
        } else {
            Err(CodecError::OperationInProgress)
        }
    }

    fn has_pixels(&self) -> bool {
        self.pixels.as_ref().is_some_and(|p| !p.is_empty())
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn token(&self, generation: u64) -> JobToken {
        JobToken {
            pipeline: self.id,
            generation,
        }
    }

    fn sync_size(&mut self) {
        self.size = self
            .pixels
            .as_ref()
            .map_or((0, 0), PixelBuffer::dimensions);
    }

    /// Validation order: pending work, pixel data, type, quality.
    fn validate_encode(
        &self,
        kind: Result<EncodeKind, &str>,
        quality: i32,
    ) -> Result<(EncodeKind, u8), CodecError> {
        self.ensure_idle()?;
        if !self.has_pixels() {
            return Err(CodecError::NoPixelData);
        }
        let kind = kind.map_err(|mime| CodecError::UnsupportedType(mime.to_string()))?;
        let quality = u8::try_from(quality)
            .ok()
            .filter(|q| *q <= 100)
            .ok_or(CodecError::InvalidQuality(quality))?;
        Ok((kind, quality))
    }

    fn spawn(&self, job: CodecJob, generation: u64) -> Result<CodecWorker, SpawnFailure> {
        let worker = CodecWorker::spawn(
            &self.config.worker_thread_name,
            job,
            self.codecs.clone(),
            self.token(generation),
            self.dispatcher.completion_sender(),
        )?;
        self.dispatcher.job_started();
        Ok(worker)
    }

    fn take_element_load(
        &mut self,
        generation: u64,
    ) -> Option<(Resolver<CodecPipeline>, Rc<dyn ImageElement>, Option<SubscriptionId>)> {
        if self.generation != generation {
            return None;
        }
        match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Loading {
                resolver,
                attachment:
                    SourceAttachment::Element {
                        element,
                        subscription,
                    },
            } => {
                self.dispatcher.release_source(SourceKey::of(&element));
                Some((resolver, element, subscription))
            }
            other => {
                self.phase = other;
                None
            }
        }
    }

    fn take_blob_load(&mut self, generation: u64) -> Option<Resolver<CodecPipeline>> {
        if self.generation != generation {
            return None;
        }
        match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Loading {
                resolver,
                attachment: SourceAttachment::Blob { blob },
            } => {
                self.dispatcher.release_source(SourceKey::of(&blob));
                Some(resolver)
            }
            other => {
                self.phase = other;
                None
            }
        }
    }
}

impl Drop for PipelineInner {
    fn drop(&mut self) {
        self.dispatcher.unregister(self.id);
        match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {}
            Phase::Loading { attachment, .. } => {
                self.dispatcher.release_source(attachment.key());
                if let SourceAttachment::Element {
                    element,
                    subscription: Some(id),
                } = attachment
                {
                    element.unsubscribe(id);
                }
                debug!(pipeline = self.id, "pipeline dropped while loading");
            }
            Phase::Decoding { worker, .. } | Phase::Encoding { worker, .. } => {
                debug!(pipeline = self.id, "pipeline dropped with codec work in flight");
                drop(worker);
            }
        }
    }
}

impl CompletionSink for RefCell<PipelineInner> {
    fn on_worker_complete(self: Rc<Self>, completion: Completion) {
        CodecPipeline { inner: self }.on_worker_complete(completion);
    }
}

/// Handle to a pixel buffer with asynchronous decode and encode.
///
/// Cloning yields another handle to the same pipeline. The pipeline lives
/// on the thread of the [`Dispatcher`] it was built with.
#[derive(Clone)]
pub struct CodecPipeline {
    inner: Rc<RefCell<PipelineInner>>,
}

impl fmt::Debug for CodecPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("CodecPipeline")
                .field("id", &inner.id)
                .field("state", &inner.phase.state(inner.has_pixels()))
                .field("size", &inner.size)
                .finish(),
            Err(_) => f.write_str("CodecPipeline { <borrowed> }"),
        }
    }
}

/// Handles compare equal when they refer to the same pipeline.
impl PartialEq for CodecPipeline {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for CodecPipeline {}

impl CodecPipeline {
    pub fn builder(dispatcher: &Dispatcher) -> PipelineBuilder {
        PipelineBuilder {
            dispatcher: dispatcher.clone(),
            config: PipelineConfig::default(),
            codecs: None,
        }
    }

    /// A `width x height` pipeline of transparent black pixels.
    pub fn new(dispatcher: &Dispatcher, width: u32, height: u32) -> Result<Self, CodecError> {
        Self::builder(dispatcher).zeroed(width, height)
    }

    /// Adopt RGBA bytes. `height` is derived from the data when omitted.
    pub fn from_rgba(
        dispatcher: &Dispatcher,
        data: Vec<u8>,
        width: u32,
        height: Option<u32>,
    ) -> Result<Self, CodecError> {
        Self::builder(dispatcher).from_rgba(data, width, height)
    }

    /// Decode an image element into a new pipeline.
    pub fn from_element(
        dispatcher: &Dispatcher,
        element: Rc<dyn ImageElement>,
    ) -> PendingResult<Self> {
        Self::builder(dispatcher).from_source(ImageSource::Element(element))
    }

    /// Decode a blob into a new pipeline.
    pub fn from_blob(dispatcher: &Dispatcher, blob: Rc<dyn BlobSource>) -> PendingResult<Self> {
        Self::builder(dispatcher).from_source(ImageSource::Blob(blob))
    }

    /// True if both handles refer to the same pipeline.
    pub fn ptr_eq(&self, other: &CodecPipeline) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn state(&self) -> PipelineState {
        let inner = self.inner.borrow();
        inner.phase.state(inner.has_pixels())
    }

    pub fn width(&self) -> u32 {
        self.inner.borrow().size.0
    }

    pub fn height(&self) -> u32 {
        self.inner.borrow().size.1
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.borrow().size
    }

    pub fn config(&self) -> PipelineConfig {
        self.inner.borrow().config.clone()
    }

    /// Borrow the RGBA bytes. `None` when empty or while a worker holds them.
    pub fn pixel_data(&self) -> Option<Ref<'_, [u8]>> {
        Ref::filter_map(self.inner.borrow(), |inner| {
            inner
                .pixels
                .as_ref()
                .filter(|p| !p.is_empty())
                .map(PixelBuffer::as_bytes)
        })
        .ok()
    }

    /// Run `f` over a view of the pixels, if any are available.
    pub fn with_pixels<R>(&self, f: impl FnOnce(PixelView<'_>) -> R) -> Option<R> {
        let inner = self.inner.borrow();
        inner
            .pixels
            .as_ref()
            .filter(|p| !p.is_empty())
            .map(|p| f(p.view()))
    }

    /// Free the pixel buffer. Calling it again is a no-op.
    pub fn release_local_buffer(&self) -> Result<(), CodecError> {
        let mut inner = self.inner.borrow_mut();
        inner.ensure_idle()?;
        if let Some(mut pixels) = inner.pixels.take() {
            pixels.release();
            debug!(pipeline = inner.id, "released local pixel buffer");
        }
        inner.size = (0, 0);
        Ok(())
    }

    /// Replace the pixels with the decoded contents of `source`.
    ///
    /// The result resolves with this same pipeline once the pixels are in
    /// place. Source failures keep the previous pixels; a failed decode
    /// leaves the pipeline empty.
    ///
    /// A source can feed only one pending load at a time among pipelines
    /// sharing a dispatcher; a second request for it is rejected with
    /// [`CodecError::SourceAttached`] until the first load has its bytes.
    pub fn request_decode_from_source(&self, source: ImageSource) -> PendingResult<CodecPipeline> {
        let generation = {
            let mut inner = self.inner.borrow_mut();
            if let Err(e) = inner.ensure_idle() {
                debug!(pipeline = inner.id, error = %e, "decode rejected");
                return PendingResult::rejected(e);
            }
            if !inner.dispatcher.claim_source(source.key()) {
                debug!(pipeline = inner.id, "decode rejected: source already attached");
                return PendingResult::rejected(CodecError::SourceAttached);
            }
            inner.next_generation()
        };

        let (resolver, pending) = pending();
        match source {
            ImageSource::Element(element) => self.attach_element(generation, resolver, element),
            ImageSource::Blob(blob) => self.attach_blob(generation, resolver, blob),
        }
        pending
    }

    fn attach_element(
        &self,
        generation: u64,
        resolver: Resolver<CodecPipeline>,
        element: Rc<dyn ImageElement>,
    ) {
        if element.is_complete() {
            self.inner.borrow_mut().phase = Phase::Loading {
                resolver,
                attachment: SourceAttachment::Element {
                    element,
                    subscription: None,
                },
            };
            self.on_element_loaded(generation, true);
            return;
        }

        let weak = Rc::downgrade(&self.inner);
        let subscription = element.subscribe(Box::new(move |ok| {
            if let Some(inner) = weak.upgrade() {
                CodecPipeline { inner }.on_element_loaded(generation, ok);
            }
        }));
        let mut inner = self.inner.borrow_mut();
        inner.phase = Phase::Loading {
            resolver,
            attachment: SourceAttachment::Element {
                element,
                subscription: Some(subscription),
            },
        };
        debug!(pipeline = inner.id, "waiting for image element to load");
    }

    fn attach_blob(&self, generation: u64, resolver: Resolver<CodecPipeline>, blob: Rc<dyn BlobSource>) {
        self.inner.borrow_mut().phase = Phase::Loading {
            resolver,
            attachment: SourceAttachment::Blob { blob: blob.clone() },
        };
        let weak = Rc::downgrade(&self.inner);
        blob.start_read(Box::new(move |result| {
            if let Some(inner) = weak.upgrade() {
                CodecPipeline { inner }.on_blob_read(generation, result);
            }
        }));
    }

    fn on_element_loaded(&self, generation: u64, ok: bool) {
        let taken = self.inner.borrow_mut().take_element_load(generation);
        let Some((resolver, element, subscription)) = taken else {
            debug!(generation, "ignoring stale image element notification");
            return;
        };
        if let Some(id) = subscription {
            element.unsubscribe(id);
        }
        if !ok {
            debug!("image element failed to load");
            resolver.reject(CodecError::SourceLoadFailed(SourceError::ElementLoadFailed));
            return;
        }
        let (width, height) = element.dimensions();
        let bytes = element.current_compressed_bytes();
        self.dispatch_decode(generation, resolver, bytes, width, height);
    }

    fn on_blob_read(&self, generation: u64, result: Result<Vec<u8>, SourceError>) {
        let taken = self.inner.borrow_mut().take_blob_load(generation);
        let Some(resolver) = taken else {
            debug!(generation, "ignoring stale blob read");
            return;
        };
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(error = %e, "blob read failed");
                resolver.reject(CodecError::SourceLoadFailed(e));
                return;
            }
        };
        let probed = self
            .inner
            .borrow()
            .codecs
            .decoder_backend()
            .probe_dimensions(&bytes);
        match probed {
            Ok((width, height)) => self.dispatch_decode(generation, resolver, bytes, width, height),
            Err(e) => {
                debug!(error = %e, "blob has no readable image header");
                resolver.reject(CodecError::DimensionsUnavailable(e));
            }
        }
    }

    fn dispatch_decode(
        &self,
        generation: u64,
        resolver: Resolver<CodecPipeline>,
        bytes: Vec<u8>,
        width: u32,
        height: u32,
    ) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;

        let mut target = match inner.pixels.take() {
            Some(buffer) => buffer,
            None => PixelBuffer::empty(inner.allocator.clone()),
        };
        // allocate() validates before releasing, so on error the old pixels survive
        if let Err(e) = target.allocate(width, height) {
            debug!(error = %e, width, height, "cannot allocate decode target");
            inner.pixels = (!target.is_empty()).then_some(target);
            drop(guard);
            resolver.reject(CodecError::DimensionsUnavailable(
                DecodeError::InvalidDimensions { width, height },
            ));
            return;
        }
        inner.size = (width, height);

        let job = CodecJob::Decode { bytes, target };
        match inner.spawn(job, generation) {
            Ok(worker) => {
                debug!(pipeline = inner.id, width, height, "decode dispatched");
                inner.phase = Phase::Decoding { resolver, worker };
            }
            Err(failure) => {
                warn!(error = %failure.error, "failed to start codec worker");
                drop(failure.job);
                inner.size = (0, 0);
                drop(guard);
                resolver.reject(CodecError::DecodeFailed(DecodeError::Aborted(
                    failure.error.to_string(),
                )));
            }
        }
    }

    /// Encode the pixels as `mime` at `quality` (0..=100).
    ///
    /// Rejected synchronously, in this order, when another operation is
    /// pending, there are no pixels, the type is not encodable, or the
    /// quality is out of range.
    pub fn request_encode(&self, mime: &str, quality: i32) -> PendingResult<EncodedBlob> {
        self.start_encode(EncodeKind::from_mime(mime).ok_or(mime), quality)
    }

    /// Encode with the configured defaults filling in unset options.
    pub fn to_blob(&self, options: EncodeOptions) -> PendingResult<EncodedBlob> {
        let (default_kind, default_quality) = {
            let inner = self.inner.borrow();
            (inner.config.default_encode_kind, inner.config.default_quality)
        };
        let kind = match options.mime.as_deref() {
            Some(mime) => EncodeKind::from_mime(mime).ok_or(mime),
            None => Ok(default_kind),
        };
        self.start_encode(kind, options.quality.unwrap_or(i32::from(default_quality)))
    }

    fn start_encode(&self, kind: Result<EncodeKind, &str>, quality: i32) -> PendingResult<EncodedBlob> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;

        let (kind, quality) = match inner.validate_encode(kind, quality) {
            Ok(checked) => checked,
            Err(e) => {
                debug!(pipeline = inner.id, error = %e, "encode rejected");
                return PendingResult::rejected(e);
            }
        };
        let Some(source) = inner.pixels.take() else {
            return PendingResult::rejected(CodecError::NoPixelData);
        };

        let generation = inner.next_generation();
        let (resolver, pending) = pending();
        let job = CodecJob::Encode {
            source,
            kind,
            quality,
        };
        match inner.spawn(job, generation) {
            Ok(worker) => {
                debug!(pipeline = inner.id, %kind, quality, "encode dispatched");
                inner.phase = Phase::Encoding {
                    resolver,
                    worker,
                    kind,
                };
            }
            Err(failure) => {
                warn!(error = %failure.error, "failed to start codec worker");
                inner.pixels = Some(failure.job.into_buffer());
                resolver.reject(CodecError::EncodeFailed(EncodeError::Aborted(
                    failure.error.to_string(),
                )));
            }
        }
        pending
    }

    /// Apply a worker's result. The only place an accepted decode or encode
    /// settles.
    fn on_worker_complete(&self, completion: Completion) {
        let Completion {
            token,
            buffer,
            outcome,
        } = completion;

        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        if token.generation != inner.generation {
            debug!(pipeline = inner.id, generation = token.generation, "ignoring stale completion");
            return;
        }

        match (mem::replace(&mut inner.phase, Phase::Idle), outcome) {
            (Phase::Decoding { resolver, worker }, Outcome::Decoded(result)) => {
                debug_assert_eq!(worker.token(), token);
                worker.release();
                match result {
                    Ok(()) => {
                        inner.pixels = Some(buffer);
                        inner.sync_size();
                        info!(
                            pipeline = inner.id,
                            width = inner.size.0,
                            height = inner.size.1,
                            "image decoded"
                        );
                        drop(guard);
                        resolver.resolve(self.clone());
                    }
                    Err(e) => {
                        drop(buffer);
                        inner.pixels = None;
                        inner.size = (0, 0);
                        warn!(pipeline = inner.id, error = %e, "decode failed");
                        drop(guard);
                        resolver.reject(e);
                    }
                }
            }
            (
                Phase::Encoding {
                    resolver,
                    worker,
                    kind,
                },
                Outcome::Encoded(result),
            ) => {
                debug_assert_eq!(worker.token(), token);
                worker.release();
                inner.pixels = Some(buffer);
                inner.sync_size();
                drop(guard);
                match result {
                    Ok(bytes) => {
                        let blob = EncodedBlob::new(kind, bytes);
                        info!(%kind, bytes = blob.len(), "image encoded");
                        resolver.resolve(blob);
                    }
                    Err(e) => {
                        warn!(%kind, error = %e, "encode failed");
                        resolver.reject(e);
                    }
                }
            }
            (phase, outcome) => {
                inner.phase = phase;
                debug!(pipeline = inner.id, ?outcome, "completion does not match pending operation");
            }
        }
    }
}
