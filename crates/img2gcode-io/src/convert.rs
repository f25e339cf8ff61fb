//! Conversion jobs: image file in, SVG and G-code files out.

use std::path::{Path, PathBuf};

use img2gcode_pipeline::{Settings, StagedResult};

use crate::emit::{EmitError, ToolpathEmitter};
use crate::ingest::{self, IngestError};
use crate::translator::Translator;

/// One image to convert.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    /// The raster image to read.
    pub image_path: PathBuf,
    /// File stem for the `.svg` and `.gcode` outputs.
    pub output_base_name: String,
    /// Settings captured when the job was created.
    pub settings: Settings,
}

impl ConversionJob {
    /// A job writing outputs named after `settings.output_filename`.
    #[must_use]
    pub fn new(image_path: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            image_path: image_path.into(),
            output_base_name: settings.output_filename.clone(),
            settings,
        }
    }

    /// Override the output file stem.
    #[must_use]
    pub fn with_output_base_name(mut self, name: impl Into<String>) -> Self {
        self.output_base_name = name.into();
        self
    }
}

/// Errors that abort a conversion job. Stage errors pass through
/// unchanged.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The image could not be loaded.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// The toolpath could not be emitted.
    #[error(transparent)]
    Emit(#[from] EmitError),

    /// The output directory or SVG document could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Everything a finished job produced.
#[derive(Debug)]
pub struct Conversion {
    /// The vector path document.
    pub svg_path: PathBuf,
    /// The finished toolpath program.
    pub gcode_path: PathBuf,
    /// Intermediate rasters and contours from extraction.
    pub staged: StagedResult,
}

/// Runs conversion jobs into a fixed output directory.
#[derive(Debug, Clone)]
pub struct Converter<T> {
    output_root: PathBuf,
    emitter: ToolpathEmitter<T>,
}

impl<T: Translator> Converter<T> {
    /// Write outputs under `output_root` using `translator` for the
    /// toolpath stage.
    pub fn new(output_root: impl Into<PathBuf>, translator: T) -> Self {
        Self {
            output_root: output_root.into(),
            emitter: ToolpathEmitter::new(translator),
        }
    }

    /// The directory outputs are written to.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// `<output_root>/<base>.svg` and `<output_root>/<base>.gcode`.
    pub fn output_paths(&self, base_name: &str) -> (PathBuf, PathBuf) {
        (
            self.output_root.join(format!("{base_name}.svg")),
            self.output_root.join(format!("{base_name}.gcode")),
        )
    }

    /// Run `job` and return the path of the G-code program.
    ///
    /// # Errors
    ///
    /// The first failing stage aborts the job. See [`ConvertError`].
    pub fn run(&self, job: &ConversionJob) -> Result<PathBuf, ConvertError> {
        self.run_staged(job).map(|conversion| conversion.gcode_path)
    }

    /// Like [`run`](Self::run) but also returns the output paths and
    /// the extraction intermediates.
    ///
    /// # Errors
    ///
    /// The first failing stage aborts the job. See [`ConvertError`].
    pub fn run_staged(&self, job: &ConversionJob) -> Result<Conversion, ConvertError> {
        tracing::info!(image = %job.image_path.display(), base = %job.output_base_name, "starting conversion");

        std::fs::create_dir_all(&self.output_root).map_err(|source| ConvertError::WriteFailed {
            path: self.output_root.clone(),
            source,
        })?;
        let (svg_path, gcode_path) = self.output_paths(&job.output_base_name);

        let image = ingest::load(&job.image_path)?;
        let staged = img2gcode_pipeline::extract_staged(&image, &job.settings);
        tracing::debug!(
            traced = staged.traced.len(),
            kept = staged.document.contours.len(),
            mode = ?job.settings.mode(),
            "extracted contours"
        );

        let svg = img2gcode_export::to_svg(&staged.document);
        std::fs::write(&svg_path, svg).map_err(|source| ConvertError::WriteFailed {
            path: svg_path.clone(),
            source,
        })?;

        self.emitter.emit(
            &svg_path,
            &gcode_path,
            &job.settings.tool_on_cmd,
            &job.settings.tool_off_cmd,
        )?;

        tracing::info!(gcode = %gcode_path.display(), "conversion finished");
        Ok(Conversion {
            svg_path,
            gcode_path,
            staged,
        })
    }
}
