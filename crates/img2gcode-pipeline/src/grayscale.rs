//! Grayscale conversion.
//!
//! The first step of extraction: any decoded pixel grid in, a
//! single-channel `GrayImage` out.

use image::{DynamicImage, GrayImage};

/// Convert a decoded image to single-channel grayscale.
///
/// Color images are reduced with the `image` crate's luminance weights;
/// alpha is dropped. Images that are already `L8` are copied unchanged.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_pixel(r: u8, g: u8, b: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_pixel(1, 1, image::Rgb([r, g, b])))
    }

    #[test]
    fn white_stays_white() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            3,
            2,
            image::Rgb([255, 255, 255]),
        ));
        let gray = to_grayscale(&img);
        assert!(gray.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::new(17, 31));
        let gray = to_grayscale(&img);
        assert_eq!(gray.width(), 17);
        assert_eq!(gray.height(), 31);
    }

    #[test]
    fn gray_input_is_preserved() {
        let src = GrayImage::from_fn(4, 4, |x, y| image::Luma([u8::try_from(x * 16 + y).unwrap_or(0)]));
        let gray = to_grayscale(&DynamicImage::ImageLuma8(src.clone()));
        assert_eq!(gray, src);
    }

    #[test]
    fn weighted_luminance_orders_channels() {
        let r = to_grayscale(&rgb_pixel(255, 0, 0)).get_pixel(0, 0).0[0];
        let g = to_grayscale(&rgb_pixel(0, 255, 0)).get_pixel(0, 0).0[0];
        let b = to_grayscale(&rgb_pixel(0, 0, 255)).get_pixel(0, 0).0[0];
        assert!(
            g > r && r > b,
            "expected green > red > blue luminance, got R={r} G={g} B={b}",
        );
    }
}
