//! Owned RGBA8 pixel storage.
//!
//! A [`PixelBuffer`] holds `width * height * 4` bytes in row-major RGBA
//! order together with its dimensions. The buffer is never shared: it is
//! moved into a codec worker for the duration of a job and moved back when
//! the job reports completion.

mod allocator;

use std::fmt;

use thiserror::Error;

pub use allocator::{
    AllocatorKind, PixelAllocator, PooledAllocator, SharedAllocator, SystemAllocator,
};

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Errors raised when constructing or allocating a pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Width is zero.
    #[error("The source width is zero")]
    ZeroWidth,

    /// Height is zero.
    #[error("The source height is zero")]
    ZeroHeight,

    /// `4 * width * height` does not fit the supported range.
    #[error("The requested image size ({width}x{height}) exceeds the supported range")]
    TooLarge { width: u32, height: u32 },

    /// The supplied pixel data is empty.
    #[error("The input data has a zero byte length")]
    EmptyData,

    /// The supplied pixel data is not whole RGBA pixels.
    #[error("The input data byte length ({len}) is not a multiple of 4")]
    NotWholePixels { len: usize },

    /// The supplied pixel data is not whole rows.
    #[error("The input data byte length ({len}) is not a multiple of (4 * width) with width {width}")]
    NotWholeRows { len: usize, width: u32 },

    /// The supplied pixel data does not match the requested height.
    #[error("The input data byte length ({len}) is not equal to (4 * width * height) for {width}x{height}")]
    HeightMismatch { len: usize, width: u32, height: u32 },
}

/// Compute `4 * width * height`, rejecting zero sizes and overflow.
pub fn rgba_len(width: u32, height: u32) -> Result<usize, BufferError> {
    if width == 0 {
        return Err(BufferError::ZeroWidth);
    }
    if height == 0 {
        return Err(BufferError::ZeroHeight);
    }
    (BYTES_PER_PIXEL as u32)
        .checked_mul(width)
        .and_then(|n| n.checked_mul(height))
        .map(|n| n as usize)
        .ok_or(BufferError::TooLarge { width, height })
}

/// Borrowed, read-only view of RGBA8 pixels.
#[derive(Clone, Copy)]
pub struct PixelView<'a> {
    pub width: u32,
    pub height: u32,
    pub data: &'a [u8],
}

impl fmt::Debug for PixelView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelView")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl<'a> PixelView<'a> {
    /// RGBA value at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = self.data.get(idx..idx + BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Row `y` as a byte slice.
    pub fn row(&self, y: u32) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.width as usize * BYTES_PER_PIXEL;
        let start = y as usize * stride;
        self.data.get(start..start + stride)
    }

    /// True when every pixel is fully opaque.
    pub fn is_opaque(&self) -> bool {
        self.data.chunks_exact(BYTES_PER_PIXEL).all(|px| px[3] == 255)
    }
}

/// Exclusively owned RGBA8 pixel storage with its dimensions.
///
/// Invariant: `bytes.len() == width * height * 4` whenever the buffer is
/// non-empty; an empty buffer reports `0x0`.
pub struct PixelBuffer {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
    allocator: SharedAllocator,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .field("allocator", &self.allocator)
            .finish()
    }
}

impl PixelBuffer {
    /// Create an empty buffer backed by `allocator`.
    pub fn empty(allocator: SharedAllocator) -> Self {
        Self {
            width: 0,
            height: 0,
            bytes: Vec::new(),
            allocator,
        }
    }

    /// Create a zero-filled buffer of the given size.
    pub fn zeroed(allocator: SharedAllocator, width: u32, height: u32) -> Result<Self, BufferError> {
        let mut buffer = Self::empty(allocator);
        buffer.allocate(width, height)?;
        Ok(buffer)
    }

    /// Adopt caller-supplied RGBA bytes.
    ///
    /// With `height` omitted it is derived from the data length. Validation
    /// order: zero width, empty data, partial pixels, partial rows, and
    /// finally the height check.
    pub fn from_rgba(
        allocator: SharedAllocator,
        data: Vec<u8>,
        width: u32,
        height: Option<u32>,
    ) -> Result<Self, BufferError> {
        if width == 0 {
            return Err(BufferError::ZeroWidth);
        }
        let len = data.len();
        if len == 0 {
            return Err(BufferError::EmptyData);
        }
        if len % BYTES_PER_PIXEL != 0 {
            return Err(BufferError::NotWholePixels { len });
        }
        let pixels = len / BYTES_PER_PIXEL;
        if pixels % width as usize != 0 {
            return Err(BufferError::NotWholeRows { len, width });
        }
        let rows = pixels / width as usize;
        let derived = u32::try_from(rows).map_err(|_| BufferError::TooLarge {
            width,
            height: u32::MAX,
        })?;
        if let Some(height) = height {
            if height != derived {
                return Err(BufferError::HeightMismatch { len, width, height });
            }
        }
        // Also enforces the overall size limit
        rgba_len(width, derived)?;

        Ok(Self {
            width,
            height: derived,
            bytes: data,
            allocator,
        })
    }

    /// Release any existing storage and allocate `width * height * 4` zeroed bytes.
    pub fn allocate(&mut self, width: u32, height: u32) -> Result<(), BufferError> {
        let len = rgba_len(width, height)?;
        self.release();
        self.bytes = self.allocator.allocate(len);
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Free the storage and reset the dimensions. Safe to call repeatedly.
    pub fn release(&mut self) {
        let bytes = std::mem::take(&mut self.bytes);
        if bytes.capacity() > 0 {
            self.allocator.free(bytes);
        }
        self.width = 0;
        self.height = 0;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Size of the pixel data in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Read-only view for encoders.
    pub fn view(&self) -> PixelView<'_> {
        PixelView {
            width: self.width,
            height: self.height,
            data: &self.bytes,
        }
    }

    /// The allocator backing this buffer.
    pub fn allocator(&self) -> &SharedAllocator {
        &self.allocator
    }
}

impl Drop for PixelBuffer {
    fn drop(&mut self) {
        self.release();
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
