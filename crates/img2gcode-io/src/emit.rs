//! Toolpath emission: translate a vector path document into a finished
//! G-code program.

use std::io::Write;
use std::path::{Path, PathBuf};

use img2gcode_export::{BracketError, PROGRAM_END, check_tool_bracketing};

use crate::translator::{TranslateError, TranslateRequest, Translator};

/// Errors that can occur while emitting a toolpath program.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// The translator could not be located or started.
    #[error("toolpath translator unavailable: {0}")]
    ExternalToolUnavailable(#[source] TranslateError),

    /// The translator ran but did not produce a program.
    #[error("toolpath translation failed: {detail}")]
    TranslationFailed {
        /// The translator's diagnostic output, verbatim.
        detail: String,
    },

    /// The produced program leaves the tool engaged.
    #[error("invalid toolpath program: {0}")]
    ToolLeftEngaged(#[from] BracketError),

    /// An output file or directory could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl From<TranslateError> for EmitError {
    fn from(err: TranslateError) -> Self {
        match err {
            TranslateError::Unavailable { .. } => Self::ExternalToolUnavailable(err),
            TranslateError::Failed { stderr } => Self::TranslationFailed { detail: stderr },
            other @ (TranslateError::TimedOut(_) | TranslateError::Io(_)) => {
                Self::TranslationFailed {
                    detail: other.to_string(),
                }
            }
        }
    }
}

/// Drives a [`Translator`] and finishes its output.
#[derive(Debug, Clone)]
pub struct ToolpathEmitter<T> {
    translator: T,
}

impl<T: Translator> ToolpathEmitter<T> {
    /// Emit through `translator`.
    pub const fn new(translator: T) -> Self {
        Self { translator }
    }

    /// The wrapped translator.
    pub const fn translator(&self) -> &T {
        &self.translator
    }

    /// Translate `svg_path` into `gcode_path`, verify the program's
    /// tool-state bracketing, and append [`PROGRAM_END`].
    ///
    /// A translator that succeeds without writing a file yields a
    /// program consisting of the end marker alone.
    ///
    /// # Errors
    ///
    /// On any translator failure nothing is appended. See [`EmitError`].
    pub fn emit(
        &self,
        svg_path: &Path,
        gcode_path: &Path,
        tool_on: &str,
        tool_off: &str,
    ) -> Result<(), EmitError> {
        if let Some(parent) = gcode_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| EmitError::WriteFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        self.translator.translate(&TranslateRequest {
            svg_path,
            gcode_path,
            tool_on,
            tool_off,
        })?;

        let program = match std::fs::read_to_string(gcode_path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(EmitError::TranslationFailed {
                    detail: format!("cannot read {}: {e}", gcode_path.display()),
                });
            }
        };
        check_tool_bracketing(&program, tool_on, tool_off)?;

        append_end_marker(gcode_path, &program).map_err(|source| EmitError::WriteFailed {
            path: gcode_path.to_path_buf(),
            source,
        })?;
        tracing::debug!(gcode = %gcode_path.display(), lines = program.lines().count(), "emitted toolpath program");
        Ok(())
    }
}

/// Append the end marker, starting a new line first if the program
/// does not end with one.
fn append_end_marker(gcode_path: &Path, program: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(gcode_path)?;
    if !program.is_empty() && !program.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    file.write_all(PROGRAM_END.as_bytes())?;
    file.flush()
}
