//! Single-resolution result slots.
//!
//! Every accepted request hands its caller a [`PendingResult`] and keeps the
//! matching [`Resolver`]. The resolver is consumed by `resolve`/`reject`, so a
//! result can settle at most once. Dropping the resolver without settling it
//! (the pipeline was destroyed) settles the result as
//! [`CodecError::Abandoned`].

use std::fmt;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

use crate::error::CodecError;
use crate::pipeline::CodecPipeline;

/// Create a connected resolver / pending result pair.
pub(crate) fn pending<T>() -> (Resolver<T>, PendingResult<T>) {
    let (tx, rx) = channel::bounded(1);
    (
        Resolver { tx },
        PendingResult {
            rx,
            ready: None,
            taken: false,
            owner: None,
        },
    )
}

/// Sending half of a pending result. Consumed when the result settles.
pub(crate) struct Resolver<T> {
    tx: Sender<Result<T, CodecError>>,
}

impl<T> Resolver<T> {
    pub(crate) fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    pub(crate) fn reject(self, error: CodecError) {
        self.settle(Err(error));
    }

    fn settle(self, result: Result<T, CodecError>) {
        // The caller may have dropped its PendingResult; nothing to deliver then
        let _ = self.tx.try_send(result);
    }
}

/// The caller's view of an asynchronous request.
///
/// Results are produced on the owning thread by the [`Dispatcher`]; poll with
/// [`try_take`](Self::try_take) after [`Dispatcher::turn`], or wait with
/// [`Dispatcher::block_on`].
///
/// [`Dispatcher`]: crate::dispatch::Dispatcher
/// [`Dispatcher::turn`]: crate::dispatch::Dispatcher::turn
/// [`Dispatcher::block_on`]: crate::dispatch::Dispatcher::block_on
pub struct PendingResult<T> {
    rx: Receiver<Result<T, CodecError>>,
    ready: Option<Result<T, CodecError>>,
    taken: bool,
    /// Keeps a source-constructed pipeline alive until it settles.
    owner: Option<CodecPipeline>,
}

impl<T> fmt::Debug for PendingResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult")
            .field("settled", &(self.ready.is_some() || !self.rx.is_empty()))
            .field("taken", &self.taken)
            .finish()
    }
}

impl<T> PendingResult<T> {
    /// A result that is already rejected.
    pub(crate) fn rejected(error: CodecError) -> Self {
        let (resolver, pending) = pending();
        resolver.reject(error);
        pending
    }

    /// Hold a strong reference to `owner` for as long as this result lives.
    pub(crate) fn keep_alive(mut self, owner: CodecPipeline) -> Self {
        self.owner = Some(owner);
        self
    }

    fn refresh(&mut self) {
        if self.ready.is_some() || self.taken {
            return;
        }
        match self.rx.try_recv() {
            Ok(result) => self.ready = Some(result),
            Err(TryRecvError::Disconnected) => self.ready = Some(Err(CodecError::Abandoned)),
            Err(TryRecvError::Empty) => {}
        }
    }

    /// True once the result can be taken.
    pub fn is_settled(&mut self) -> bool {
        self.refresh();
        self.ready.is_some()
    }

    /// Take the outcome if it has settled. Returns `Some` at most once.
    pub fn try_take(&mut self) -> Option<Result<T, CodecError>> {
        self.refresh();
        let result = self.ready.take();
        if result.is_some() {
            self.taken = true;
            self.owner = None;
        }
        result
    }
}
