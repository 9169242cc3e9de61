//! Scaling of decoded frames to the requested output size.

use image::RgbaImage;

use super::{DecodeError, FilterType};

/// Scale an RGBA frame to exact dimensions.
///
/// Frames that already have the requested size are returned untouched.
///
/// # Errors
///
/// Returns `DecodeError::InvalidDimensions` if either target dimension is zero.
pub fn scale_rgba(
    image: RgbaImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<RgbaImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidDimensions { width, height });
    }

    // Fast path: nothing to do
    if image.dimensions() == (width, height) {
        return Ok(image);
    }

    Ok(image::imageops::resize(
        &image,
        width,
        height,
        filter.to_image_filter(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_image(width: u32, height: u32) -> RgbaImage {
        // Simple gradient for testing
        RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([
                ((x * 255) / width.max(1)) as u8,
                ((y * 255) / height.max(1)) as u8,
                128,
                255,
            ])
        })
    }

    #[test]
    fn test_scale_down() {
        let img = create_test_image(100, 50);
        let scaled = scale_rgba(img, 50, 25, FilterType::Bilinear).unwrap();
        assert_eq!(scaled.dimensions(), (50, 25));
        assert_eq!(scaled.as_raw().len(), 50 * 25 * 4);
    }

    #[test]
    fn test_scale_same_dimensions_is_identity() {
        let img = create_test_image(10, 10);
        let original = img.clone();
        let scaled = scale_rgba(img, 10, 10, FilterType::Lanczos3).unwrap();
        assert_eq!(scaled, original);
    }

    #[test]
    fn test_scale_up() {
        let img = create_test_image(8, 4);
        let scaled = scale_rgba(img, 16, 8, FilterType::Nearest).unwrap();
        assert_eq!(scaled.dimensions(), (16, 8));
    }

    #[test]
    fn test_scale_zero_dimensions_error() {
        assert!(scale_rgba(create_test_image(4, 4), 0, 4, FilterType::Bilinear).is_err());
        assert!(scale_rgba(create_test_image(4, 4), 4, 0, FilterType::Bilinear).is_err());
    }

    #[test]
    fn test_solid_color_survives_all_filters() {
        for filter in [
            FilterType::Nearest,
            FilterType::Bilinear,
            FilterType::Lanczos3,
        ] {
            let img = RgbaImage::from_pixel(6, 6, image::Rgba([10, 20, 30, 255]));
            let scaled = scale_rgba(img, 3, 3, filter).unwrap();
            assert!(scaled.pixels().all(|p| p.0 == [10, 20, 30, 255]));
        }
    }
}
