//! Blob sources: bytes held in memory or read from a file.

use std::fs;
use std::path::{Path, PathBuf};

use super::{BlobSource, ReadCallback, SourceError};
use crate::dispatch::Dispatcher;

/// A blob backed by bytes already in memory.
///
/// The read completes on the next dispatcher turn.
#[derive(Debug, Clone)]
pub struct BytesBlob {
    dispatcher: Dispatcher,
    bytes: Vec<u8>,
}

impl BytesBlob {
    pub fn new(dispatcher: &Dispatcher, bytes: Vec<u8>) -> Self {
        Self {
            dispatcher: dispatcher.clone(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl BlobSource for BytesBlob {
    fn start_read(&self, callback: ReadCallback) {
        let bytes = self.bytes.clone();
        self.dispatcher.post(move || callback(Ok(bytes)));
    }
}

/// A blob read from the filesystem on a helper thread.
#[derive(Debug, Clone)]
pub struct FileBlob {
    dispatcher: Dispatcher,
    path: PathBuf,
}

impl FileBlob {
    pub fn new(dispatcher: &Dispatcher, path: impl Into<PathBuf>) -> Self {
        Self {
            dispatcher: dispatcher.clone(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlobSource for FileBlob {
    fn start_read(&self, callback: ReadCallback) {
        let path = self.path.clone();
        self.dispatcher.read_blocking(
            move || {
                fs::read(&path)
                    .map_err(|e| SourceError::ReadFailed(format!("{}: {e}", path.display())))
            },
            callback,
        );
    }
}
