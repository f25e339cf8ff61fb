//! img2gcode-export: Pure format serializers (sans-IO)
//!
//! Converts a [`VectorDocument`](img2gcode_pipeline::VectorDocument) into
//! the SVG text handed to the toolpath translator, and provides the
//! text-level rules for the G-code program the translator produces
//! (end marker, tool-state bracketing).

pub mod gcode;
pub mod svg;

pub use gcode::{BracketError, PROGRAM_END, check_tool_bracketing};
pub use svg::{build_path_data, to_svg};
