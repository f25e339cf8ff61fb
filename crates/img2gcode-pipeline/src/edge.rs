//! Binary mask construction: thresholding, inversion, and Canny edges.
//!
//! Every function here returns a binary image where white pixels (255)
//! are foreground and black pixels (0) are background. Contour tracing
//! follows the borders of the white regions.

use image::GrayImage;

/// Minimum allowed Canny threshold.
///
/// A low threshold of zero marks every pixel with any gradient at all as
/// a candidate edge, which floods the mask with noise.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Binarize at `level`: pixels at or above it become 255, the rest 0.
#[must_use = "returns the binary mask"]
pub fn threshold(image: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y).0[0] >= level {
            image::Luma([255])
        } else {
            image::Luma([0])
        }
    })
}

/// Invert a binary mask (bitwise NOT).
///
/// Swaps foreground pixels (255 -> 0) and background pixels (0 -> 255).
#[must_use = "returns the inverted mask"]
pub fn invert(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        image::Luma([!mask.get_pixel(x, y).0[0]])
    })
}

/// Detect edges using the Canny algorithm.
///
/// Returns a binary image: 255 for edge pixels, 0 for non-edge.
///
/// Both thresholds are clamped to a minimum of [`MIN_THRESHOLD`] and
/// `low_threshold` is clamped to be at most `high_threshold`. The input
/// is expected to be blurred already; no further smoothing is applied.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    crate::canny::canny(image, low, high)
}
