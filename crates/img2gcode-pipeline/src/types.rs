//! Shared types for the img2gcode extraction pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `DynamicImage`, the decoded pixel grid handed to
/// [`extract`](crate::extract).
pub use image::DynamicImage;

/// Contours enclosing this many square pixels or fewer are dropped.
///
/// This is a fixed constant. The persisted `max_artifact_size` setting is
/// a different quantity and is not consulted here.
pub const MIN_CONTOUR_AREA: f64 = 5.0;

/// Contours need at least this many points to describe an area.
pub const MIN_CONTOUR_POINTS: usize = 3;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A closed polygonal outline traced from a binary mask.
///
/// The closing segment from the last point back to the first is
/// implicit: the first point is not repeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour(Vec<Point>);

impl Contour {
    /// Create a new contour from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the contour has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the contour.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the contour and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Enclosed area of the closed polygon (shoelace formula).
    ///
    /// Always non-negative regardless of winding direction. Degenerate
    /// contours (fewer than 3 points, or all points collinear) have
    /// zero area.
    #[must_use]
    pub fn area(&self) -> f64 {
        let points = &self.0;
        if points.len() < MIN_CONTOUR_POINTS {
            return 0.0;
        }
        let twice_signed: f64 = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| a.x.mul_add(b.y, -(b.x * a.y)))
            .sum();
        twice_signed.abs() / 2.0
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Extraction mode selected by the `svg_mode` setting.
///
/// Only `"canny"` and `"threshold"` are recognised literally. Any other
/// string (including the default `"contour"`) selects
/// [`Contour`](Self::Contour), which traces the inverted threshold mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SvgMode {
    /// Canny edge detection.
    Canny,
    /// Plain binary threshold: bright pixels are foreground.
    Threshold,
    /// Inverted binary threshold: dark pixels are foreground.
    #[default]
    Contour,
}

impl SvgMode {
    /// Interpret a persisted `svg_mode` string.
    #[must_use]
    pub fn from_setting(mode: &str) -> Self {
        match mode {
            "canny" => Self::Canny,
            "threshold" => Self::Threshold,
            _ => Self::Contour,
        }
    }
}

/// The intermediate vector representation handed to the toolpath
/// translator: contours in trace order plus the canvas size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    /// Canvas dimensions, equal to the source image dimensions.
    pub dimensions: Dimensions,
    /// Surviving contours, in trace discovery order.
    pub contours: Vec<Contour>,
}

/// Result of running [`extract_staged`](crate::extract_staged) with all
/// intermediate rasters preserved.
///
/// Does not derive `PartialEq` since comparing full rasters is rarely
/// what a caller wants; compare individual fields instead.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Stage 1: grayscale conversion.
    pub grayscale: GrayImage,
    /// Stage 2: blurred image.
    pub blurred: GrayImage,
    /// Stage 3: binary mask (edges, threshold, or inverted threshold).
    pub mask: GrayImage,
    /// Stage 4: every traced contour, before area filtering.
    pub traced: Vec<Contour>,
    /// Stages 5 and 6: the emitted document.
    pub document: VectorDocument,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f64) -> Contour {
        Contour::new(vec![
            Point::new(0.0, 0.0),
            Point::new(side, 0.0),
            Point::new(side, side),
            Point::new(0.0, side),
        ])
    }

    #[test]
    fn area_of_square() {
        assert!((square(4.0).area() - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn area_ignores_winding_direction() {
        let mut points = square(3.0).into_points();
        points.reverse();
        assert!((Contour::new(points).area() - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn area_of_degenerate_contours_is_zero() {
        assert!(Contour::new(vec![]).area().abs() < f64::EPSILON);
        let two = Contour::new(vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)]);
        assert!(two.area().abs() < f64::EPSILON);
        let line = Contour::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        ]);
        assert!(line.area().abs() < f64::EPSILON);
    }

    #[test]
    fn svg_mode_parses_named_modes() {
        assert_eq!(SvgMode::from_setting("canny"), SvgMode::Canny);
        assert_eq!(SvgMode::from_setting("threshold"), SvgMode::Threshold);
        assert_eq!(SvgMode::from_setting("contour"), SvgMode::Contour);
    }

    #[test]
    fn unrecognised_svg_mode_falls_back_to_contour() {
        assert_eq!(SvgMode::from_setting("potrace"), SvgMode::Contour);
        assert_eq!(SvgMode::from_setting(""), SvgMode::Contour);
        assert_eq!(SvgMode::from_setting("Canny"), SvgMode::Contour);
    }
}
