//! Where compressed image bytes come from.
//!
//! The pipeline consumes two collaborator contracts:
//!
//! - [`ImageElement`]: an image that may still be loading. The pipeline either
//!   decodes it right away (already complete) or subscribes for the load
//!   notification and decodes from the callback.
//! - [`BlobSource`]: a binary object read asynchronously in full.
//!
//! Both hand the pipeline `(bytes, width, height)`; for blobs the size comes
//! from probing the header. Callbacks run on the owning thread and hold only
//! a weak reference back into the pipeline.

mod blob;
mod element;

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

pub use blob::{BytesBlob, FileBlob};
pub use element::LoadingImage;

/// Errors reported by a source while producing its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The image element reported an unsuccessful load.
    #[error("image element failed to load")]
    ElementLoadFailed,

    /// Reading the blob failed.
    #[error("blob read failed: {0}")]
    ReadFailed(String),
}

/// Identity of a source object, used to keep it attached to at most one
/// pending load. Only meaningful while the source is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SourceKey(usize);

impl SourceKey {
    pub(crate) fn of<T: ?Sized>(source: &Rc<T>) -> Self {
        SourceKey(Rc::as_ptr(source).cast::<()>() as usize)
    }
}

/// Handle returned by [`ImageElement::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Load-completion callback. The argument is `true` when the load succeeded.
pub type LoadCallback = Box<dyn FnMut(bool)>;

/// Blob read callback, invoked once with the full contents or an error.
pub type ReadCallback = Box<dyn FnOnce(Result<Vec<u8>, SourceError>)>;

/// An image element that owns (or is still fetching) compressed bytes.
pub trait ImageElement {
    /// True once the element has finished loading successfully.
    fn is_complete(&self) -> bool;

    /// Register for the load notification.
    fn subscribe(&self, callback: LoadCallback) -> SubscriptionId;

    /// Drop a registration. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    /// The compressed bytes currently held by the element.
    fn current_compressed_bytes(&self) -> Vec<u8>;

    /// Natural size of the image.
    fn dimensions(&self) -> (u32, u32);
}

/// A binary object that is read asynchronously.
pub trait BlobSource {
    /// Start reading the full contents. `callback` must run later on the
    /// owning thread, never from inside this call.
    fn start_read(&self, callback: ReadCallback);
}

/// Input for [`CodecPipeline::request_decode_from_source`].
///
/// [`CodecPipeline::request_decode_from_source`]: crate::pipeline::CodecPipeline::request_decode_from_source
#[derive(Clone)]
pub enum ImageSource {
    Element(Rc<dyn ImageElement>),
    Blob(Rc<dyn BlobSource>),
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Element(_) => f.write_str("ImageSource::Element"),
            ImageSource::Blob(_) => f.write_str("ImageSource::Blob"),
        }
    }
}

impl ImageSource {
    pub fn element(element: impl ImageElement + 'static) -> Self {
        ImageSource::Element(Rc::new(element))
    }

    pub fn blob(blob: impl BlobSource + 'static) -> Self {
        ImageSource::Blob(Rc::new(blob))
    }

    pub(crate) fn key(&self) -> SourceKey {
        match self {
            ImageSource::Element(element) => SourceKey::of(element),
            ImageSource::Blob(blob) => SourceKey::of(blob),
        }
    }
}
