//! An in-memory image element with an observable load lifecycle.

use std::cell::{Cell, RefCell};
use std::fmt;

use tracing::debug;

use super::{ImageElement, LoadCallback, SubscriptionId};
use crate::decode::{DecodeError, DecoderBackend, ImageCrateDecoder};

enum LoadState {
    Pending,
    Loaded {
        bytes: Vec<u8>,
        width: u32,
        height: u32,
    },
    Failed,
}

/// An image element whose bytes arrive later.
///
/// Call [`finish`](Self::finish) or [`fail`](Self::fail) to complete the
/// load; subscribers are notified synchronously from that call.
pub struct LoadingImage {
    state: RefCell<LoadState>,
    subscribers: RefCell<Vec<(SubscriptionId, LoadCallback)>>,
    /// Ids unsubscribed while their callbacks were out for notification.
    removed: RefCell<Vec<SubscriptionId>>,
    notifying: Cell<bool>,
    next_id: Cell<u64>,
}

impl fmt::Debug for LoadingImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.borrow() {
            LoadState::Pending => "pending",
            LoadState::Loaded { .. } => "loaded",
            LoadState::Failed => "failed",
        };
        f.debug_struct("LoadingImage")
            .field("state", &state)
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

impl Default for LoadingImage {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadingImage {
    /// An element that has not loaded yet.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(LoadState::Pending),
            subscribers: RefCell::new(Vec::new()),
            removed: RefCell::new(Vec::new()),
            notifying: Cell::new(false),
            next_id: Cell::new(1),
        }
    }

    /// An element that is already complete with `bytes`.
    pub fn loaded(bytes: Vec<u8>) -> Result<Self, DecodeError> {
        let element = Self::new();
        let (width, height) = ImageCrateDecoder::default().probe_dimensions(&bytes)?;
        *element.state.borrow_mut() = LoadState::Loaded {
            bytes,
            width,
            height,
        };
        Ok(element)
    }

    /// Complete the load with `bytes` and notify subscribers.
    ///
    /// Bytes without a readable header complete the load as failed.
    pub fn finish(&self, bytes: Vec<u8>) {
        let ok = match ImageCrateDecoder::default().probe_dimensions(&bytes) {
            Ok((width, height)) => {
                *self.state.borrow_mut() = LoadState::Loaded {
                    bytes,
                    width,
                    height,
                };
                true
            }
            Err(e) => {
                debug!(error = %e, "image element bytes are not decodable");
                *self.state.borrow_mut() = LoadState::Failed;
                false
            }
        };
        self.notify(ok);
    }

    /// Complete the load as failed and notify subscribers.
    pub fn fail(&self) {
        *self.state.borrow_mut() = LoadState::Failed;
        self.notify(false);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    fn notify(&self, ok: bool) {
        let mut subscribers = std::mem::take(&mut *self.subscribers.borrow_mut());
        self.notifying.set(true);
        for (_, callback) in subscribers.iter_mut() {
            callback(ok);
        }
        self.notifying.set(false);

        let removed = std::mem::take(&mut *self.removed.borrow_mut());
        subscribers.retain(|(id, _)| !removed.contains(id));
        // Keep registrations added during notification after the existing ones
        let mut current = self.subscribers.borrow_mut();
        let added = std::mem::replace(&mut *current, subscribers);
        current.extend(added);
    }
}

impl ImageElement for LoadingImage {
    fn is_complete(&self) -> bool {
        matches!(&*self.state.borrow(), LoadState::Loaded { .. })
    }

    fn subscribe(&self, callback: LoadCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers.borrow_mut().push((id, callback));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(s, _)| *s != id);
        if subscribers.len() == before && self.notifying.get() {
            self.removed.borrow_mut().push(id);
        }
    }

    fn current_compressed_bytes(&self) -> Vec<u8> {
        match &*self.state.borrow() {
            LoadState::Loaded { bytes, .. } => bytes.clone(),
            _ => Vec::new(),
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        match &*self.state.borrow() {
            LoadState::Loaded { width, height, .. } => (*width, *height),
            _ => (0, 0),
        }
    }
}
