//! Pipeline configuration.

use serde::{Deserialize, Serialize};

pub use crate::buffer::AllocatorKind;
pub use crate::decode::FilterType;
use crate::format::EncodeKind;

/// Quality used when `to_blob` is called without one.
pub const DEFAULT_QUALITY: u8 = 80;

/// Name given to codec worker threads.
pub const DEFAULT_WORKER_THREAD_NAME: &str = "image-codec";

/// Settings shared by a pipeline for its whole lifetime.
///
/// Missing fields fall back to their defaults when deserializing, so a
/// partial document such as `{"default_quality": 92}` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Quality for `to_blob` when the caller supplies none.
    pub default_quality: u8,

    /// Encode kind for `to_blob` when the caller supplies no MIME type.
    pub default_encode_kind: EncodeKind,

    /// Pixel storage strategy.
    pub allocator: AllocatorKind,

    /// Interpolation used when a decoded image is scaled to the target size.
    pub scale_filter: FilterType,

    /// Thread name for codec workers.
    pub worker_thread_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_quality: DEFAULT_QUALITY,
            default_encode_kind: EncodeKind::default(),
            allocator: AllocatorKind::default(),
            scale_filter: FilterType::default(),
            worker_thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
        }
    }
}
