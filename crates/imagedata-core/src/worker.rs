//! Codec worker threads.
//!
//! Each accepted decode or encode runs on its own named thread. The job owns
//! the pixel buffer for the duration of the work and hands it back inside the
//! [`Completion`], which is posted to the owning thread's dispatcher. A worker
//! sends exactly one completion per job, including when the backend panics.

use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender};
use tracing::{debug, warn};

use crate::buffer::PixelBuffer;
use crate::codecs::CodecSet;
use crate::decode::DecodeError;
use crate::dispatch::OwnerMessage;
use crate::encode::EncodeError;
use crate::error::CodecError;
use crate::format::EncodeKind;

/// Identifies the pipeline and the operation a completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct JobToken {
    pub pipeline: u64,
    pub generation: u64,
}

/// Work handed to a codec worker.
pub(crate) enum CodecJob {
    /// Decode `bytes` into `target`, which is already sized to the output.
    Decode { bytes: Vec<u8>, target: PixelBuffer },
    /// Encode the pixels in `source`. `quality` is already validated.
    Encode {
        source: PixelBuffer,
        kind: EncodeKind,
        quality: u8,
    },
}

impl fmt::Debug for CodecJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecJob::Decode { bytes, target } => f
                .debug_struct("Decode")
                .field("bytes", &bytes.len())
                .field("target", &target.dimensions())
                .finish(),
            CodecJob::Encode {
                source,
                kind,
                quality,
            } => f
                .debug_struct("Encode")
                .field("source", &source.dimensions())
                .field("kind", kind)
                .field("quality", quality)
                .finish(),
        }
    }
}

impl CodecJob {
    /// Give back the pixel buffer of a job that never ran.
    pub(crate) fn into_buffer(self) -> PixelBuffer {
        match self {
            CodecJob::Decode { target, .. } => target,
            CodecJob::Encode { source, .. } => source,
        }
    }

    /// Run the job. Only the backend call sits inside the unwind boundary,
    /// so the buffer comes back even when the backend panics.
    fn run(self, codecs: &CodecSet) -> (PixelBuffer, Outcome) {
        match self {
            CodecJob::Decode { bytes, mut target } => {
                let (width, height) = target.dimensions();
                let dest = target.as_bytes_mut();
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    codecs
                        .decoder_backend()
                        .decode_scaled(&bytes, width, height, dest)
                }))
                .unwrap_or_else(|payload| Err(DecodeError::Aborted(abort_reason(payload))))
                .map_err(CodecError::DecodeFailed);
                (target, Outcome::Decoded(result))
            }
            CodecJob::Encode {
                source,
                kind,
                quality,
            } => {
                let view = source.view();
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    codecs.encoder_for(kind).encode(view, quality)
                }))
                .unwrap_or_else(|payload| Err(EncodeError::Aborted(abort_reason(payload))))
                .map_err(CodecError::EncodeFailed);
                (source, Outcome::Encoded(result))
            }
        }
    }
}

fn abort_reason(payload: Box<dyn Any + Send>) -> String {
    let reason = panic_message(payload.as_ref());
    warn!(%reason, "codec backend panicked");
    reason
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Result of a job as seen by the owning thread.
#[derive(Debug)]
pub(crate) enum Outcome {
    Decoded(Result<(), CodecError>),
    Encoded(Result<Vec<u8>, CodecError>),
}

/// Message posted back when a job finishes.
#[derive(Debug)]
pub(crate) struct Completion {
    pub token: JobToken,
    /// The job's pixel buffer, returned whatever the outcome.
    pub buffer: PixelBuffer,
    pub outcome: Outcome,
}

/// The job could not be started. The job is handed back untouched.
pub(crate) struct SpawnFailure {
    pub job: CodecJob,
    pub error: io::Error,
}

/// Owner-side handle for a running codec worker.
///
/// Dropping the handle detaches the thread; the worker still finishes and
/// posts its completion, which the dispatcher then discards.
#[derive(Debug)]
pub(crate) struct CodecWorker {
    token: JobToken,
    handle: Option<JoinHandle<()>>,
}

impl CodecWorker {
    /// Start a named worker thread and hand it `job`.
    pub(crate) fn spawn(
        name: &str,
        job: CodecJob,
        codecs: CodecSet,
        token: JobToken,
        completions: Sender<OwnerMessage>,
    ) -> Result<Self, SpawnFailure> {
        let (job_tx, job_rx) = channel::bounded::<CodecJob>(1);

        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            let Ok(job) = job_rx.recv() else {
                return;
            };
            debug!(?job, "codec worker started");
            let (buffer, outcome) = job.run(&codecs);
            let completion = Completion {
                token,
                buffer,
                outcome,
            };
            if completions.send(OwnerMessage::Codec(completion)).is_err() {
                debug!("codec worker: owner channel closed, dropping completion");
            }
        });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(error) => return Err(SpawnFailure { job, error }),
        };

        if let Err(returned) = job_tx.send(job) {
            // The thread already exited; treat it like a failed spawn
            let _ = handle.join();
            return Err(SpawnFailure {
                job: returned.into_inner(),
                error: io::Error::new(io::ErrorKind::BrokenPipe, "codec worker exited early"),
            });
        }

        Ok(Self {
            token,
            handle: Some(handle),
        })
    }

    pub(crate) fn token(&self) -> JobToken {
        self.token
    }

    /// Join the thread after its completion has been received.
    pub(crate) fn release(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(pipeline = self.token.pipeline, "codec worker thread panicked");
            }
        }
    }
}
