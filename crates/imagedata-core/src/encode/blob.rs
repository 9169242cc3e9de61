//! Binary-object handle for encoded output.

use std::fmt;
use std::sync::Arc;

use crate::format::EncodeKind;

/// Immutable, cheaply clonable handle to an encoded image.
///
/// Produced only by a successful encode; a failed encode never yields one.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedBlob {
    kind: EncodeKind,
    bytes: Arc<[u8]>,
}

impl fmt::Debug for EncodedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedBlob")
            .field("type", &self.kind.mime())
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl EncodedBlob {
    /// Package encoder output, taking ownership of the bytes.
    pub fn new(kind: EncodeKind, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            bytes: bytes.into(),
        }
    }

    pub fn kind(&self) -> EncodeKind {
        self.kind
    }

    /// MIME type of the payload.
    pub fn mime(&self) -> &'static str {
        self.kind.mime()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for EncodedBlob {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
