//! The owning thread's event loop.
//!
//! Pipelines are single-threaded objects. Everything that happens off the
//! owning thread (codec workers, file reads) reports back by posting an
//! [`OwnerMessage`] to the dispatcher's channel, and all state transitions
//! run when the owner drives the dispatcher with [`Dispatcher::turn`] or
//! [`Dispatcher::block_on`].
//!
//! Completions are routed by pipeline id through weak references, so a
//! completion for a pipeline that has been dropped is discarded together
//! with the pixel buffer it carries.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};
use std::thread;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use tracing::{debug, warn};

use crate::error::CodecError;
use crate::pending::PendingResult;
use crate::source::{ReadCallback, SourceError, SourceKey};
use crate::worker::Completion;

/// Messages delivered to the owning thread.
#[derive(Debug)]
pub(crate) enum OwnerMessage {
    /// A codec worker finished its job.
    Codec(Completion),
    /// A blocking blob read finished.
    BlobRead {
        read: u64,
        result: Result<Vec<u8>, SourceError>,
    },
}

/// Receiver of worker completions, implemented by the pipeline state.
pub(crate) trait CompletionSink {
    fn on_worker_complete(self: Rc<Self>, completion: Completion);
}

type LocalTask = Box<dyn FnOnce()>;

struct DispatcherInner {
    tx: Sender<OwnerMessage>,
    rx: Receiver<OwnerMessage>,
    sinks: RefCell<HashMap<u64, Weak<dyn CompletionSink>>>,
    reads: RefCell<HashMap<u64, ReadCallback>>,
    local: RefCell<VecDeque<LocalTask>>,
    /// Sources currently attached to a loading pipeline.
    attached: RefCell<HashSet<SourceKey>>,
    next_id: Cell<u64>,
    /// Worker jobs and file reads whose message has not arrived yet.
    in_flight: Cell<usize>,
}

/// Owner-thread event loop shared by all pipelines created from it.
///
/// Cloning yields another handle to the same loop. The dispatcher is not
/// `Send`; it lives on the thread that owns the pipelines.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Rc<DispatcherInner>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pipelines", &self.inner.sinks.borrow().len())
            .field("queued", &self.inner.local.borrow().len())
            .field("in_flight", &self.inner.in_flight.get())
            .finish()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            inner: Rc::new(DispatcherInner {
                tx,
                rx,
                sinks: RefCell::new(HashMap::new()),
                reads: RefCell::new(HashMap::new()),
                local: RefCell::new(VecDeque::new()),
                attached: RefCell::new(HashSet::new()),
                next_id: Cell::new(1),
                in_flight: Cell::new(0),
            }),
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        id
    }

    pub(crate) fn register(&self, sink: Weak<dyn CompletionSink>) -> u64 {
        let id = self.next_id();
        self.inner.sinks.borrow_mut().insert(id, sink);
        id
    }

    pub(crate) fn unregister(&self, id: u64) {
        self.inner.sinks.borrow_mut().remove(&id);
    }

    /// Mark `key` as attached to a pending load. False if it already is.
    pub(crate) fn claim_source(&self, key: SourceKey) -> bool {
        self.inner.attached.borrow_mut().insert(key)
    }

    pub(crate) fn release_source(&self, key: SourceKey) {
        self.inner.attached.borrow_mut().remove(&key);
    }

    /// Sender for worker completions.
    pub(crate) fn completion_sender(&self) -> Sender<OwnerMessage> {
        self.inner.tx.clone()
    }

    /// Record a worker whose completion is now expected.
    pub(crate) fn job_started(&self) {
        self.inner.in_flight.set(self.inner.in_flight.get() + 1);
    }

    fn message_received(&self) {
        let n = self.inner.in_flight.get();
        self.inner.in_flight.set(n.saturating_sub(1));
    }

    /// Queue `task` to run on the owning thread during the next turn.
    pub fn post(&self, task: impl FnOnce() + 'static) {
        self.inner.local.borrow_mut().push_back(Box::new(task));
    }

    /// Run `read` on a helper thread and deliver its result to `callback`
    /// on the owning thread.
    pub fn read_blocking<F>(&self, read: F, callback: ReadCallback)
    where
        F: FnOnce() -> Result<Vec<u8>, SourceError> + Send + 'static,
    {
        let id = self.next_id();
        let tx = self.inner.tx.clone();
        let spawned = thread::Builder::new()
            .name("blob-read".to_string())
            .spawn(move || {
                let result = read();
                let _ = tx.send(OwnerMessage::BlobRead { read: id, result });
            });

        match spawned {
            Ok(_) => {
                self.inner.reads.borrow_mut().insert(id, callback);
                self.job_started();
            }
            Err(e) => {
                warn!(error = %e, "failed to spawn blob read thread");
                let reason = e.to_string();
                self.post(move || callback(Err(SourceError::ReadFailed(reason))));
            }
        }
    }

    /// True while a local task is queued or off-thread work is outstanding.
    pub fn has_pending_work(&self) -> bool {
        !self.inner.local.borrow().is_empty() || self.inner.in_flight.get() > 0
    }

    fn run_local(&self) -> usize {
        let mut ran = 0;
        loop {
            // Tasks may post more tasks; never hold the queue while running one
            let task = self.inner.local.borrow_mut().pop_front();
            let Some(task) = task else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    fn handle(&self, message: OwnerMessage) {
        self.message_received();
        match message {
            OwnerMessage::Codec(completion) => {
                let sink = self
                    .inner
                    .sinks
                    .borrow()
                    .get(&completion.token.pipeline)
                    .and_then(Weak::upgrade);
                match sink {
                    Some(sink) => sink.on_worker_complete(completion),
                    None => debug!(
                        pipeline = completion.token.pipeline,
                        "discarding completion for a destroyed pipeline"
                    ),
                }
            }
            OwnerMessage::BlobRead { read, result } => {
                let callback = self.inner.reads.borrow_mut().remove(&read);
                match callback {
                    Some(callback) => callback(result),
                    None => debug!(read, "discarding unclaimed blob read"),
                }
            }
        }
    }

    /// Process everything that is ready without blocking.
    ///
    /// Returns the number of tasks and messages handled.
    pub fn turn(&self) -> usize {
        let mut handled = self.run_local();
        loop {
            match self.inner.rx.try_recv() {
                Ok(message) => {
                    self.handle(message);
                    handled += 1;
                    handled += self.run_local();
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        handled
    }

    /// Drive the loop until `pending` settles.
    ///
    /// Fails with [`CodecError::Stalled`] when nothing queued or in flight
    /// could settle it, such as an image element that never finishes loading.
    pub fn block_on<T>(&self, mut pending: PendingResult<T>) -> Result<T, CodecError> {
        loop {
            if let Some(result) = pending.try_take() {
                return result;
            }
            if self.run_local() > 0 {
                continue;
            }
            if self.inner.in_flight.get() == 0 {
                return pending.try_take().unwrap_or(Err(CodecError::Stalled));
            }
            match self.inner.rx.recv() {
                Ok(message) => self.handle(message),
                Err(_) => return Err(CodecError::Stalled),
            }
        }
    }

    /// Block until no local tasks or off-thread work remain.
    pub fn run_until_idle(&self) {
        loop {
            self.run_local();
            if self.inner.in_flight.get() == 0 {
                if self.inner.local.borrow().is_empty() {
                    break;
                }
                continue;
            }
            match self.inner.rx.recv() {
                Ok(message) => self.handle(message),
                Err(_) => break,
            }
        }
    }
}
