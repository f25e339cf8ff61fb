//! img2gcode-pipeline: Pure raster-to-contour extraction (sans-IO).
//!
//! Converts a decoded raster image into a [`VectorDocument`] of closed
//! contours through:
//! grayscale -> blur -> mask (threshold, inverted threshold, or Canny)
//! -> contour tracing -> area filtering.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images and returns structured data. File access, persistence, and the
//! external toolpath translator live in `img2gcode-io`.

pub mod blur;
pub mod canny;
pub mod contour;
pub mod edge;
pub mod grayscale;
pub mod settings;
pub mod types;

pub use settings::{SettingError, SettingKey, SettingType, SettingValue, Settings};
pub use types::{
    Contour, Dimensions, DynamicImage, GrayImage, MIN_CONTOUR_AREA, Point, StagedResult, SvgMode,
    VectorDocument,
};

/// Extract the vector document from a decoded image.
///
/// Infallible: an image with no traceable foreground yields a document
/// with zero contours. The same image and settings always produce the
/// same document.
///
/// # Pipeline steps
///
/// 1. Grayscale conversion
/// 2. Gaussian blur with a `blur_ksize` square kernel
/// 3. Mask by `svg_mode`: Canny edges, threshold, or inverted threshold
/// 4. Border following (flat list, discovery order)
/// 5. Drop contours with fewer than 3 points or area <= [`MIN_CONTOUR_AREA`]
#[must_use]
pub fn extract(image: &DynamicImage, settings: &Settings) -> VectorDocument {
    extract_staged(image, settings).document
}

/// Like [`extract`] but keeps every intermediate raster and the
/// unfiltered contour list.
#[must_use]
pub fn extract_staged(image: &DynamicImage, settings: &Settings) -> StagedResult {
    // 1. Grayscale.
    let grayscale = grayscale::to_grayscale(image);

    // 2. Blur.
    let blurred = blur::gaussian_blur(&grayscale, settings.blur_kernel_size());

    // 3. Mask.
    let mask = match settings.mode() {
        SvgMode::Canny => {
            let (low, high) = settings.canny_thresholds();
            edge::canny(&blurred, low, high)
        }
        SvgMode::Threshold => edge::threshold(&blurred, settings.threshold_level()),
        SvgMode::Contour => edge::invert(&edge::threshold(&blurred, settings.threshold_level())),
    };

    // 4. Trace.
    let traced = contour::trace_contours(&mask);

    // 5. Filter.
    let contours = contour::filter_contours(traced.clone());

    let document = VectorDocument {
        dimensions: Dimensions {
            width: mask.width(),
            height: mask.height(),
        },
        contours,
    };

    StagedResult {
        grayscale,
        blurred,
        mask,
        traced,
        document,
    }
}
