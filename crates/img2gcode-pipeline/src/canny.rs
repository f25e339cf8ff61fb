//! Canny edge detection on a pre-blurred grayscale image.
//!
//! Derived from `imageproc::edges::canny` (0.26) with three changes:
//!
//! 1. **No internal blur.** Upstream always applies a sigma 1.4 Gaussian
//!    first. The extraction pipeline has already blurred with the
//!    configured kernel size, so a second blur would make `blur_ksize`
//!    meaningless in Canny mode.
//!
//! 2. **Border-safe hysteresis.** Upstream computes `nx - 1` on `u32`
//!    coordinates, which underflows when the search reaches the image
//!    border (<https://github.com/image-rs/imageproc/issues/705>).
//!    Neighbors are bounds-checked here instead.
//!
//! 3. **All eight neighbors.** Upstream's hysteresis omits the north and
//!    northeast neighbors
//!    (<https://github.com/image-rs/imageproc/pull/746>).
//!
//! Gradient magnitude is the L1 norm `|gx| + |gy|`, so thresholds keep
//! the scale of the usual Canny defaults (50/150 on 8-bit input).
//!
//! Images narrower or shorter than 3 pixels have no interior and yield an
//! all-black map.

use std::f32::consts::PI;

use image::{GrayImage, Luma};
use imageproc::definitions::{HasBlack, HasWhite, Image};
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Run Sobel gradients, non-maximum suppression, and hysteresis.
///
/// Callers must pass `low_threshold <= high_threshold`; see
/// [`crate::edge::canny`] for the clamping wrapper.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (w, h) = (image.width(), image.height());
    if w < 3 || h < 3 {
        return GrayImage::from_pixel(w, h, Luma::black());
    }

    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    let magnitude = Image::from_fn(w, h, |x, y| {
        Luma([gradient_magnitude(gx.get_pixel(x, y).0[0], gy.get_pixel(x, y).0[0])])
    });

    let thinned = non_maximum_suppression(&magnitude, &gx, &gy);
    hysteresis(&thinned, low_threshold, high_threshold)
}

/// L1 gradient magnitude.
fn gradient_magnitude(x_gradient: i16, y_gradient: i16) -> f32 {
    f32::from(x_gradient).abs() + f32::from(y_gradient).abs()
}

/// Offsets of the two neighbors along the gradient direction, bucketed
/// to the nearest multiple of 45 degrees.
fn gradient_neighbors(x_gradient: f32, y_gradient: f32) -> [(i64, i64); 2] {
    let mut angle = y_gradient.atan2(x_gradient) * (180.0 / PI);
    if angle < 0.0 {
        angle += 180.0;
    }
    if (22.5..67.5).contains(&angle) {
        [(1, 1), (-1, -1)]
    } else if (67.5..112.5).contains(&angle) {
        [(0, -1), (0, 1)]
    } else if (112.5..157.5).contains(&angle) {
        [(-1, 1), (1, -1)]
    } else {
        [(-1, 0), (1, 0)]
    }
}

/// Keep only pixels that are local maxima along their gradient direction.
///
/// The outermost ring of pixels is always suppressed.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn non_maximum_suppression(
    g: &Image<Luma<f32>>,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Image<Luma<f32>> {
    let mut out = Image::from_pixel(g.width(), g.height(), Luma([0.0]));
    for y in 1..g.height() - 1 {
        for x in 1..g.width() - 1 {
            let neighbors = gradient_neighbors(
                f32::from(gx.get_pixel(x, y).0[0]),
                f32::from(gy.get_pixel(x, y).0[0]),
            );
            let pixel = g.get_pixel(x, y).0[0];
            let is_maximum = neighbors.iter().all(|&(dx, dy)| {
                let nx = (i64::from(x) + dx) as u32;
                let ny = (i64::from(y) + dy) as u32;
                pixel >= g.get_pixel(nx, ny).0[0]
            });
            if is_maximum {
                out.put_pixel(x, y, Luma([pixel]));
            }
        }
    }
    out
}

const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Keep strong edges and the weak edges connected to them.
///
/// Depth-first flood from every pixel at or above `high_thresh`,
/// following 8-connected neighbors at or above `low_thresh`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn hysteresis(input: &Image<Luma<f32>>, low_thresh: f32, high_thresh: f32) -> GrayImage {
    let (w, h) = (input.width(), input.height());
    let mut out = GrayImage::from_pixel(w, h, Luma::black());
    let mut stack = Vec::new();

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            if input.get_pixel(x, y).0[0] < high_thresh || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, Luma::white());
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in NEIGHBOR_OFFSETS {
                    let nx = i64::from(cx) + dx;
                    let ny = i64::from(cy) + dy;
                    if nx < 0 || ny < 0 || nx >= i64::from(w) || ny >= i64::from(h) {
                        continue;
                    }
                    let (nx, ny) = (nx as u32, ny as u32);
                    if input.get_pixel(nx, ny).0[0] >= low_thresh && out.get_pixel(nx, ny).0[0] == 0
                    {
                        out.put_pixel(nx, ny, Luma::white());
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}
