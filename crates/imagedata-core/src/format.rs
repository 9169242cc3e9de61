//! Compressed image kinds and MIME type support queries.
//!
//! Encoding is limited to JPEG, PNG and WEBP. Decoding (and header probing)
//! additionally accepts GIF, BMP and ICO.

use std::fmt;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

/// A compressed format the pipeline can encode to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeKind {
    /// Lossy JPEG (alpha is dropped).
    #[default]
    Jpeg,
    /// Lossless PNG.
    Png,
    /// Lossless WEBP.
    Webp,
}

impl EncodeKind {
    /// All encode kinds, in a stable order.
    pub const ALL: [EncodeKind; 3] = [EncodeKind::Jpeg, EncodeKind::Png, EncodeKind::Webp];

    /// Parse an encode kind from a MIME type string.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(EncodeKind::Jpeg),
            "image/png" => Some(EncodeKind::Png),
            "image/webp" => Some(EncodeKind::Webp),
            _ => None,
        }
    }

    /// The canonical MIME type for this kind.
    pub fn mime(self) -> &'static str {
        match self {
            EncodeKind::Jpeg => "image/jpeg",
            EncodeKind::Png => "image/png",
            EncodeKind::Webp => "image/webp",
        }
    }
}

impl fmt::Display for EncodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// A compressed format the pipeline can probe and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeKind {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
    Ico,
}

impl DecodeKind {
    /// Parse a decode kind from a MIME type string, including the icon aliases.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(DecodeKind::Jpeg),
            "image/png" => Some(DecodeKind::Png),
            "image/gif" => Some(DecodeKind::Gif),
            "image/webp" => Some(DecodeKind::Webp),
            "image/bmp" => Some(DecodeKind::Bmp),
            "image/ico" | "image/icon" | "image/vnd.microsoft.icon" | "image/x-icon" => {
                Some(DecodeKind::Ico)
            }
            _ => None,
        }
    }

    /// Map a sniffed `image` crate format onto a decode kind.
    ///
    /// Formats the `image` crate recognizes but the pipeline does not accept
    /// (TIFF, AVIF, ...) map to `None`.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(DecodeKind::Jpeg),
            ImageFormat::Png => Some(DecodeKind::Png),
            ImageFormat::Gif => Some(DecodeKind::Gif),
            ImageFormat::WebP => Some(DecodeKind::Webp),
            ImageFormat::Bmp => Some(DecodeKind::Bmp),
            ImageFormat::Ico => Some(DecodeKind::Ico),
            _ => None,
        }
    }

    /// The `image` crate format used to decode this kind.
    pub fn image_format(self) -> ImageFormat {
        match self {
            DecodeKind::Jpeg => ImageFormat::Jpeg,
            DecodeKind::Png => ImageFormat::Png,
            DecodeKind::Gif => ImageFormat::Gif,
            DecodeKind::Webp => ImageFormat::WebP,
            DecodeKind::Bmp => ImageFormat::Bmp,
            DecodeKind::Ico => ImageFormat::Ico,
        }
    }
}

/// Answer to a `can_decode_type` / `can_encode_type` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSupport {
    Supported,
    Unsupported,
}

impl TypeSupport {
    pub fn is_supported(self) -> bool {
        self == TypeSupport::Supported
    }
}

impl From<bool> for TypeSupport {
    fn from(supported: bool) -> Self {
        if supported {
            TypeSupport::Supported
        } else {
            TypeSupport::Unsupported
        }
    }
}

impl fmt::Display for TypeSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSupport::Supported => f.write_str("supported"),
            TypeSupport::Unsupported => f.write_str("unsupported"),
        }
    }
}

/// Report whether a MIME type can be decoded.
pub fn can_decode_type(mime: &str) -> TypeSupport {
    DecodeKind::from_mime(mime).is_some().into()
}

/// Report whether a MIME type can be encoded.
pub fn can_encode_type(mime: &str) -> TypeSupport {
    EncodeKind::from_mime(mime).is_some().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_decode_type() {
        assert_eq!(can_decode_type("image/png"), TypeSupport::Supported);
        assert_eq!(can_decode_type("image/jpeg"), TypeSupport::Supported);
        assert_eq!(can_decode_type("image/gif"), TypeSupport::Supported);
        assert_eq!(can_decode_type("image/x-icon"), TypeSupport::Supported);
        assert_eq!(can_decode_type("image/tiff"), TypeSupport::Unsupported);
        assert_eq!(can_decode_type(""), TypeSupport::Unsupported);
    }

    #[test]
    fn test_can_encode_type() {
        assert!(can_encode_type("image/webp").is_supported());
        assert!(!can_encode_type("image/gif").is_supported());
        // Matching is exact, like MIME comparisons elsewhere in the pipeline
        assert!(!can_encode_type("IMAGE/PNG").is_supported());
    }

    #[test]
    fn test_icon_aliases() {
        for mime in [
            "image/ico",
            "image/icon",
            "image/vnd.microsoft.icon",
            "image/x-icon",
        ] {
            assert_eq!(DecodeKind::from_mime(mime), Some(DecodeKind::Ico));
        }
    }

    #[test]
    fn test_encode_kind_mime_round_trip() {
        for kind in EncodeKind::ALL {
            assert_eq!(EncodeKind::from_mime(kind.mime()), Some(kind));
        }
    }

    #[test]
    fn test_from_image_format_rejects_tiff() {
        assert_eq!(DecodeKind::from_image_format(ImageFormat::Tiff), None);
        assert_eq!(
            DecodeKind::from_image_format(ImageFormat::WebP),
            Some(DecodeKind::Webp)
        );
    }

    #[test]
    fn test_type_support_display() {
        assert_eq!(TypeSupport::Supported.to_string(), "supported");
        assert_eq!(TypeSupport::Unsupported.to_string(), "unsupported");
    }
}
