//! Allocation strategies for pixel storage.
//!
//! A `PixelBuffer` never calls the global allocator directly; it asks its
//! `SharedAllocator` for zeroed storage and hands the storage back on release.
//! Two strategies exist:
//!
//! - **System**: every allocation is a fresh `Vec<u8>`, every release frees it.
//! - **Pooled**: released storage is cached (up to `max_cached` buffers) and
//!   reused by later allocations that fit in it. Useful when the same pipeline
//!   decodes many similarly sized images.
//!
//! The strategy is chosen through [`AllocatorKind`] in the pipeline config.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Source of zeroed byte storage for pixel buffers.
///
/// Implementations are shared between the owning thread and codec workers,
/// so they must be `Send + Sync`.
pub trait PixelAllocator: Send + Sync + fmt::Debug {
    /// Return a zero-filled buffer of exactly `len` bytes.
    fn allocate(&self, len: usize) -> Vec<u8>;

    /// Take back storage that is no longer in use.
    fn free(&self, bytes: Vec<u8>);
}

/// Thread-safe handle to an allocator.
pub type SharedAllocator = Arc<dyn PixelAllocator>;

/// Allocation strategy selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum AllocatorKind {
    /// Plain heap allocations.
    #[default]
    System,
    /// Reuse released buffers, keeping at most `max_cached` of them.
    Pooled { max_cached: usize },
}

impl AllocatorKind {
    /// Build a shared allocator for this strategy.
    pub fn build(self) -> SharedAllocator {
        match self {
            AllocatorKind::System => Arc::new(SystemAllocator),
            AllocatorKind::Pooled { max_cached } => Arc::new(PooledAllocator::new(max_cached)),
        }
    }
}

/// Allocates straight from the heap.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl PixelAllocator for SystemAllocator {
    fn allocate(&self, len: usize) -> Vec<u8> {
        vec![0u8; len]
    }

    fn free(&self, bytes: Vec<u8>) {
        drop(bytes);
    }
}

/// Caches released buffers and hands them out again.
pub struct PooledAllocator {
    /// Released buffers available for reuse.
    cache: Mutex<Vec<Vec<u8>>>,
    /// Upper bound on cached buffers; extra releases are freed.
    max_cached: usize,
}

impl fmt::Debug for PooledAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledAllocator")
            .field("cached", &self.cache.lock().len())
            .field("max_cached", &self.max_cached)
            .finish()
    }
}

impl PooledAllocator {
    pub fn new(max_cached: usize) -> Self {
        Self {
            cache: Mutex::new(Vec::with_capacity(max_cached)),
            max_cached,
        }
    }

    /// Number of buffers currently held for reuse.
    pub fn cached_count(&self) -> usize {
        self.cache.lock().len()
    }
}

impl PixelAllocator for PooledAllocator {
    fn allocate(&self, len: usize) -> Vec<u8> {
        let reused = {
            let mut cache = self.cache.lock();
            // Smallest cached buffer that can hold `len` bytes
            let best = cache
                .iter()
                .enumerate()
                .filter(|(_, buf)| buf.capacity() >= len)
                .min_by_key(|(_, buf)| buf.capacity())
                .map(|(idx, _)| idx);
            best.map(|idx| cache.swap_remove(idx))
        };

        match reused {
            Some(mut bytes) => {
                debug!(len, capacity = bytes.capacity(), "Reusing pooled pixel storage");
                bytes.clear();
                bytes.resize(len, 0);
                bytes
            }
            None => vec![0u8; len],
        }
    }

    fn free(&self, bytes: Vec<u8>) {
        if bytes.capacity() == 0 {
            return;
        }
        let mut cache = self.cache.lock();
        if cache.len() < self.max_cached {
            cache.push(bytes);
        }
    }
}
