//! Image ingest: validate and decode a raster file from disk.
//!
//! Loading happens in two separate passes over the file. The first pass
//! opens the file, identifies the format, and reads only the header to
//! verify the image is structurally sound and non-empty. The second pass
//! re-opens the file from scratch and decodes all pixel data. The reader
//! used for verification is consumed by it and never reused for
//! decoding.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, ImageReader};

/// File extensions accepted by [`load`], lowercase and without the dot.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "gif", "tiff"];

/// Errors that can occur while loading an image.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The path does not exist.
    #[error("image file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The extension is not in [`SUPPORTED_EXTENSIONS`].
    #[error("unsupported file type: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// The file could not be read or decoded as an image.
    #[error("failed to load image {}: {reason}", .path.display())]
    Corrupt {
        /// The offending file.
        path: PathBuf,
        /// What the decoder reported.
        reason: String,
    },
}

/// Whether `path` has one of the [`SUPPORTED_EXTENSIONS`]
/// (case-insensitive).
#[must_use]
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Load and decode the image at `path`.
///
/// # Errors
///
/// Returns [`IngestError::NotFound`] if the path does not exist,
/// [`IngestError::UnsupportedFormat`] if the extension is not supported
/// (no decode is attempted), and [`IngestError::Corrupt`] if either the
/// verification or the decode pass fails, or the image has a zero
/// dimension.
pub fn load(path: &Path) -> Result<DynamicImage, IngestError> {
    if !path.exists() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }
    if !is_supported(path) {
        return Err(IngestError::UnsupportedFormat(path.to_path_buf()));
    }

    let corrupt = |reason: String| IngestError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    // Pass 1: structural verification (header only).
    let (width, height) = open_reader(path)
        .and_then(|reader| reader.into_dimensions().map_err(|e| e.to_string()))
        .map_err(corrupt)?;
    if width == 0 || height == 0 {
        return Err(corrupt(format!("image has zero size ({width}x{height})")));
    }
    tracing::debug!(path = %path.display(), width, height, "verified image header");

    // Pass 2: full decode from a fresh reader.
    let image = open_reader(path)
        .and_then(|reader| reader.decode().map_err(|e| e.to_string()))
        .map_err(corrupt)?;
    tracing::debug!(path = %path.display(), color = ?image.color(), "decoded image");
    Ok(image)
}

/// Open a reader with the format sniffed from the file contents,
/// falling back to the format implied by the extension.
fn open_reader(path: &Path) -> Result<ImageReader<std::io::BufReader<std::fs::File>>, String> {
    let mut reader = ImageReader::open(path).map_err(|e| e.to_string())?;
    if let Ok(format) = ImageFormat::from_path(path) {
        reader.set_format(format);
    }
    reader.with_guessed_format().map_err(|e| e.to_string())
}
