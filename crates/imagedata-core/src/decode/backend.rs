//! Decoder backends: header probing and decode-and-scale into RGBA8.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use super::{scale_rgba, DecodeError, FilterType, ImageHeader};
use crate::buffer::rgba_len;
use crate::format::DecodeKind;

/// A frame-decoding backend.
///
/// Backends run on codec worker threads and are shared between pipelines,
/// so they must be `Send + Sync`.
pub trait DecoderBackend: Send + Sync {
    /// Sniff the format and read the natural dimensions from the header.
    fn probe(&self, bytes: &[u8]) -> Result<ImageHeader, DecodeError>;

    /// Decode `bytes` and write RGBA8 pixels scaled to `width x height` into `dest`.
    ///
    /// `dest` must hold exactly `width * height * 4` bytes.
    fn decode_scaled(
        &self,
        bytes: &[u8],
        width: u32,
        height: u32,
        dest: &mut [u8],
    ) -> Result<(), DecodeError>;

    /// Natural dimensions of the encoded image.
    fn probe_dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), DecodeError> {
        self.probe(bytes).map(|header| header.dimensions())
    }
}

/// Decoder backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder {
    /// Interpolation used when the target size differs from the natural size.
    pub filter: FilterType,
}

impl ImageCrateDecoder {
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }
}

/// Sniff the format of `bytes`, accepting only decodable kinds.
fn sniff(bytes: &[u8]) -> Result<(DecodeKind, ImageFormat), DecodeError> {
    let format = image::guess_format(bytes).map_err(|_| DecodeError::InvalidFormat)?;
    let kind = DecodeKind::from_image_format(format)
        .ok_or_else(|| DecodeError::UnsupportedFormat(format!("{format:?}")))?;
    Ok((kind, format))
}

impl DecoderBackend for ImageCrateDecoder {
    fn probe(&self, bytes: &[u8]) -> Result<ImageHeader, DecodeError> {
        let (kind, format) = sniff(bytes)?;
        let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

        if width == 0 || height == 0 {
            return Err(DecodeError::InvalidDimensions { width, height });
        }
        Ok(ImageHeader {
            kind,
            width,
            height,
        })
    }

    fn decode_scaled(
        &self,
        bytes: &[u8],
        width: u32,
        height: u32,
        dest: &mut [u8],
    ) -> Result<(), DecodeError> {
        let expected =
            rgba_len(width, height).map_err(|_| DecodeError::InvalidDimensions { width, height })?;
        if dest.len() != expected {
            return Err(DecodeError::BufferMismatch {
                expected,
                actual: dest.len(),
            });
        }

        let (_, format) = sniff(bytes)?;
        let decoded = ImageReader::with_format(Cursor::new(bytes), format)
            .decode()
            .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

        let scaled = scale_rgba(decoded.into_rgba8(), width, height, self.filter)?;
        dest.copy_from_slice(scaled.as_raw());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder};

    // Minimal valid JPEG bytes (1x1 gray pixel)
    const MINIMAL_JPEG: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xDB, 0x00, 0x43, 0x00, 0x08, 0x06, 0x06, 0x07, 0x06,
        0x05, 0x08, 0x07, 0x07, 0x07, 0x09, 0x09, 0x08, 0x0A, 0x0C, 0x14, 0x0D, 0x0C, 0x0B, 0x0B,
        0x0C, 0x19, 0x12, 0x13, 0x0F, 0x14, 0x1D, 0x1A, 0x1F, 0x1E, 0x1D, 0x1A, 0x1C, 0x1C, 0x20,
        0x24, 0x2E, 0x27, 0x20, 0x22, 0x2C, 0x23, 0x1C, 0x1C, 0x28, 0x37, 0x29, 0x2C, 0x30, 0x31,
        0x34, 0x34, 0x34, 0x1F, 0x27, 0x39, 0x3D, 0x38, 0x32, 0x3C, 0x2E, 0x33, 0x34, 0x32, 0xFF,
        0xC0, 0x00, 0x0B, 0x08, 0x00, 0x01, 0x00, 0x01, 0x01, 0x01, 0x11, 0x00, 0xFF, 0xC4, 0x00,
        0x1F, 0x00, 0x00, 0x01, 0x05, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,
        0xFF, 0xC4, 0x00, 0xB5, 0x10, 0x00, 0x02, 0x01, 0x03, 0x03, 0x02, 0x04, 0x03, 0x05, 0x05,
        0x04, 0x04, 0x00, 0x00, 0x01, 0x7D, 0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21,
        0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08,
        0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52, 0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A,
        0x16, 0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x34, 0x35, 0x36, 0x37,
        0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56,
        0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75,
        0x76, 0x77, 0x78, 0x79, 0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93,
        0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9,
        0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6,
        0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2,
        0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7,
        0xF8, 0xF9, 0xFA, 0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, 0xFB, 0xD5,
        0xDB, 0x20, 0xA8, 0xF1, 0x7E, 0xFF, 0xD9,
    ];

    fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let pixels: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(&pixels, width, height, ExtendedColorType::Rgba8)
            .unwrap();
        out
    }

    #[test]
    fn test_probe_png() {
        let bytes = png_bytes(7, 3, [1, 2, 3, 255]);
        let header = ImageCrateDecoder::default().probe(&bytes).unwrap();
        assert_eq!(header.kind, DecodeKind::Png);
        assert_eq!(header.dimensions(), (7, 3));
    }

    #[test]
    fn test_probe_jpeg() {
        let decoder = ImageCrateDecoder::default();
        assert_eq!(decoder.probe_dimensions(MINIMAL_JPEG).unwrap(), (1, 1));
        assert_eq!(decoder.probe(MINIMAL_JPEG).unwrap().kind, DecodeKind::Jpeg);
    }

    #[test]
    fn test_probe_garbage_is_invalid_format() {
        let decoder = ImageCrateDecoder::default();
        assert_eq!(
            decoder.probe(&[0x00, 0x01, 0x02, 0x03, 0x04]),
            Err(DecodeError::InvalidFormat)
        );
        assert_eq!(decoder.probe(&[]), Err(DecodeError::InvalidFormat));
    }

    #[test]
    fn test_probe_tiff_is_unsupported() {
        let tiff_header = [0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00];
        let result = ImageCrateDecoder::default().probe(&tiff_header);
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_probe_truncated_png() {
        let bytes = png_bytes(4, 4, [0, 0, 0, 255]);
        let result = ImageCrateDecoder::default().probe(&bytes[..12]);
        assert!(matches!(result, Err(DecodeError::CorruptedFile(_))));
    }

    #[test]
    fn test_decode_scaled_natural_size() {
        let bytes = png_bytes(2, 2, [255, 0, 0, 255]);
        let mut dest = vec![0u8; 16];
        ImageCrateDecoder::default()
            .decode_scaled(&bytes, 2, 2, &mut dest)
            .unwrap();
        assert_eq!(dest, [255, 0, 0, 255].repeat(4));
    }

    #[test]
    fn test_decode_scaled_resizes() {
        let bytes = png_bytes(8, 8, [0, 128, 255, 255]);
        let mut dest = vec![0u8; 4 * 4 * 4];
        ImageCrateDecoder::new(FilterType::Nearest)
            .decode_scaled(&bytes, 4, 4, &mut dest)
            .unwrap();
        assert!(dest.chunks_exact(4).all(|px| px == [0, 128, 255, 255]));
    }

    #[test]
    fn test_decode_scaled_grayscale_jpeg_expands_to_rgba() {
        let mut dest = vec![0u8; 4];
        ImageCrateDecoder::default()
            .decode_scaled(MINIMAL_JPEG, 1, 1, &mut dest)
            .unwrap();
        assert_eq!(dest[0], dest[1]);
        assert_eq!(dest[1], dest[2]);
        assert_eq!(dest[3], 255);
    }

    #[test]
    fn test_decode_scaled_buffer_mismatch() {
        let bytes = png_bytes(2, 2, [255, 0, 0, 255]);
        let mut dest = vec![0u8; 15];
        let result = ImageCrateDecoder::default().decode_scaled(&bytes, 2, 2, &mut dest);
        assert_eq!(
            result,
            Err(DecodeError::BufferMismatch {
                expected: 16,
                actual: 15
            })
        );
    }

    #[test]
    fn test_decode_scaled_corrupt_data_leaves_dest_untouched() {
        let bytes = png_bytes(4, 4, [9, 9, 9, 255]);
        let mut dest = vec![0u8; 64];
        let result = ImageCrateDecoder::default().decode_scaled(&bytes[..40], 4, 4, &mut dest);
        assert!(matches!(result, Err(DecodeError::CorruptedFile(_))));
        assert!(dest.iter().all(|&b| b == 0));
    }
}
