//! SVG export serializer.
//!
//! Converts a vector document into an SVG string using the [`svg`] crate
//! for document construction, XML escaping, and path data formatting.
//!
//! The canvas is sized in pixels (`width`/`height` equal to the source
//! image). Each contour becomes one closed `<path>` (`M`, `L` ... `z`)
//! with no fill and a black stroke; the translator only reads the
//! geometry but the stroke keeps the document meaningful to viewers.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::Value;
use svg::node::element::Path;
use svg::node::element::path::Data;

use img2gcode_pipeline::{Contour, VectorDocument};

/// Build a closed SVG path `d` attribute string from a contour.
///
/// Uses `M` for the first point, `L` for the rest, and `z` to close back
/// to the start. Returns an empty string for contours with fewer than
/// 2 points.
///
/// Coordinates are formatted by the [`svg`] crate using `f32` precision,
/// which is exact for pixel coordinates.
///
/// # Examples
///
/// ```
/// use img2gcode_pipeline::{Contour, Point};
/// use img2gcode_export::build_path_data;
///
/// let contour = Contour::new(vec![
///     Point::new(10.0, 20.0),
///     Point::new(30.0, 20.0),
///     Point::new(30.0, 40.0),
/// ]);
/// assert_eq!(build_path_data(&contour), "M10,20 L30,20 L30,40 z");
/// ```
#[must_use]
pub fn build_path_data(contour: &Contour) -> String {
    let points = contour.points();
    if points.len() < 2 {
        return String::new();
    }

    let first = &points[0];
    let mut data = Data::new().move_to((first.x, first.y));
    for p in &points[1..] {
        data = data.line_to((p.x, p.y));
    }
    String::from(Value::from(data.close()))
}

/// Serialize a vector document into an SVG string.
///
/// Contours are emitted in document order. An empty document still
/// produces a well-formed SVG declaring the canvas size.
#[must_use]
pub fn to_svg(document: &VectorDocument) -> String {
    let width = document.dimensions.width;
    let height = document.dimensions.height;
    let mut doc = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", (0, 0, width, height));

    for contour in &document.contours {
        let d = build_path_data(contour);
        if d.is_empty() {
            continue;
        }
        let path = Path::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", "black");
        doc = doc.add(path);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
