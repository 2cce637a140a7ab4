//! Fixed preprocessing applied to every decoded image.

use image::DynamicImage;
use image::imageops::FilterType;

use crate::config::ColorMode;

/// Map a raw pixel value into the unit interval: 255 -> 1.0, 0 -> 0.0.
pub fn rescale(value: u8) -> f32 {
    f32::from(value) / 255.0
}

/// Resize to the target geometry, convert per color mode, and rescale.
///
/// Output length is `width * height * color_mode.channels()`, row-major with
/// interleaved channels.
pub fn preprocess(image: &DynamicImage, width: u32, height: u32, color_mode: ColorMode) -> Vec<f32> {
    let resized = image.resize_exact(width, height, FilterType::Triangle);
    let raw: Vec<u8> = match color_mode {
        ColorMode::Rgb => resized.to_rgb8().into_raw(),
        ColorMode::Grayscale => resized.to_luma8().into_raw(),
    };
    raw.into_iter().map(rescale).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rescale_endpoints() {
        assert_eq!(rescale(255), 1.0);
        assert_eq!(rescale(0), 0.0);
    }

    #[test]
    fn test_rescale_is_linear() {
        assert!((rescale(51) - 0.2).abs() < 1e-6);
        assert!((rescale(204) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_shape_rgb() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            10,
            10,
            image::Rgb([255, 0, 128]),
        ));
        let pixels = preprocess(&img, 4, 4, ColorMode::Rgb);
        assert_eq!(pixels.len(), 4 * 4 * 3);
        assert_eq!(pixels[0], 1.0);
        assert_eq!(pixels[1], 0.0);
    }

    #[test]
    fn test_preprocess_shape_grayscale() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            8,
            8,
            image::Rgb([255, 255, 255]),
        ));
        let pixels = preprocess(&img, 4, 4, ColorMode::Grayscale);
        assert_eq!(pixels.len(), 4 * 4);
        assert!(pixels.iter().all(|&p| (p - 1.0).abs() < 1e-3));
    }
}
