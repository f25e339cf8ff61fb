//! Contour tracing: extract closed outlines from a binary mask.
//!
//! Borders are found with Suzuki-Abe border following
//! ([`imageproc::contours::find_contours`]). Outer borders and hole
//! borders are returned together as one flat list in discovery order
//! (raster scan); the parent/child hierarchy is discarded.
//!
//! Border following yields every border pixel. Straight runs along the
//! eight chain directions are then compressed to their end points, which
//! keeps the emitted SVG small without changing the outline.

use image::GrayImage;

use crate::types::{Contour, MIN_CONTOUR_AREA, MIN_CONTOUR_POINTS, Point};

/// Trace every border in `mask` (white = foreground).
///
/// A mask without any background pixel has no foreground/background
/// boundary and produces no contours, so a uniform image never yields
/// an outline of the canvas itself.
#[must_use]
pub fn trace_contours(mask: &GrayImage) -> Vec<Contour> {
    if mask.pixels().all(|p| p.0[0] > 0) {
        return Vec::new();
    }

    let contours: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(mask);

    contours
        .into_iter()
        .map(|c| {
            let points: Vec<Point> = c
                .points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            Contour::new(compress_runs(&points))
        })
        .collect()
}

/// Drop points that continue a straight run in the same chain direction.
///
/// The input is a closed chain, so the first and last points are
/// compared with their cyclic neighbors as well. Chains of one or two
/// points are returned as-is.
#[must_use]
pub fn compress_runs(points: &[Point]) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let step = |from: Point, to: Point| (to.x - from.x, to.y - from.y);
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let curr = points[i];
            let next = points[(i + 1) % n];
            step(prev, curr) != step(curr, next)
        })
        .map(|i| points[i])
        .collect()
}

/// Whether a contour survives the size filter.
///
/// Contours need at least [`MIN_CONTOUR_POINTS`] points and an enclosed
/// area strictly greater than [`MIN_CONTOUR_AREA`].
#[must_use]
pub fn is_significant(contour: &Contour) -> bool {
    contour.len() >= MIN_CONTOUR_POINTS && contour.area() > MIN_CONTOUR_AREA
}

/// Keep only significant contours, preserving order.
#[must_use]
pub fn filter_contours(contours: Vec<Contour>) -> Vec<Contour> {
    contours.into_iter().filter(is_significant).collect()
}
