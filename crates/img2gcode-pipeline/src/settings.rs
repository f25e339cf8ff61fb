//! Conversion settings: the fixed set of named, typed parameters.
//!
//! [`Settings`] is a plain value. Conversion jobs receive a snapshot of it
//! by value; persistence lives in `img2gcode-io`. Individual keys can be
//! read and written generically through [`SettingKey`] and
//! [`SettingValue`], which is what the settings store and the CLI use.
//!
//! `color_tolerance`, `remove_background`, `background_tolerance`,
//! `max_artifact_size`, `group_by_color`, `potrace_turdsize` and
//! `potrace_alphamax` are persisted but not read by the extraction
//! pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::SvgMode;

/// Errors from generic key/value access to [`Settings`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingError {
    /// The key name is not one of the fixed setting keys.
    #[error("unknown setting key: {0}")]
    UnknownKey(String),

    /// The value's type does not match the key's type.
    #[error("setting '{key}' expects {expected}, got {found}")]
    TypeMismatch {
        /// The key being set.
        key: SettingKey,
        /// The type the key holds.
        expected: SettingType,
        /// The type of the rejected value.
        found: SettingType,
    },

    /// Floating-point settings must be finite to round-trip through the
    /// persisted document.
    #[error("setting '{0}' must be a finite number")]
    NonFinite(SettingKey),
}

/// The type held by a setting key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingType {
    /// Signed integer.
    Int,
    /// Floating-point number.
    Float,
    /// Boolean flag.
    Bool,
    /// Free-form text.
    Text,
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int => "an integer",
            Self::Float => "a number",
            Self::Bool => "a boolean",
            Self::Text => "a string",
        })
    }
}

/// A dynamically typed setting value.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Boolean flag.
    Bool(bool),
    /// Free-form text.
    Text(String),
}

impl SettingValue {
    /// The type of this value.
    #[must_use]
    pub const fn setting_type(&self) -> SettingType {
        match self {
            Self::Int(_) => SettingType::Int,
            Self::Float(_) => SettingType::Float,
            Self::Bool(_) => SettingType::Bool,
            Self::Text(_) => SettingType::Text,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Every setting key. The string form is the persisted key name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    ColorTolerance,
    RemoveBackground,
    BackgroundTolerance,
    MaxArtifactSize,
    GroupByColor,
    ToolOnCmd,
    ToolOffCmd,
    OutputFilename,
    SvgMode,
    Threshold,
    BlurKsize,
    CannyLow,
    CannyHigh,
    PotraceTurdsize,
    PotraceAlphamax,
}

impl SettingKey {
    /// All keys, in persisted document order.
    pub const ALL: [Self; 15] = [
        Self::ColorTolerance,
        Self::RemoveBackground,
        Self::BackgroundTolerance,
        Self::MaxArtifactSize,
        Self::GroupByColor,
        Self::ToolOnCmd,
        Self::ToolOffCmd,
        Self::OutputFilename,
        Self::SvgMode,
        Self::Threshold,
        Self::BlurKsize,
        Self::CannyLow,
        Self::CannyHigh,
        Self::PotraceTurdsize,
        Self::PotraceAlphamax,
    ];

    /// The persisted key name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ColorTolerance => "color_tolerance",
            Self::RemoveBackground => "remove_background",
            Self::BackgroundTolerance => "background_tolerance",
            Self::MaxArtifactSize => "max_artifact_size",
            Self::GroupByColor => "group_by_color",
            Self::ToolOnCmd => "tool_on_cmd",
            Self::ToolOffCmd => "tool_off_cmd",
            Self::OutputFilename => "output_filename",
            Self::SvgMode => "svg_mode",
            Self::Threshold => "threshold",
            Self::BlurKsize => "blur_ksize",
            Self::CannyLow => "canny_low",
            Self::CannyHigh => "canny_high",
            Self::PotraceTurdsize => "potrace_turdsize",
            Self::PotraceAlphamax => "potrace_alphamax",
        }
    }

    /// The type of value this key holds.
    #[must_use]
    pub const fn setting_type(self) -> SettingType {
        match self {
            Self::ColorTolerance
            | Self::Threshold
            | Self::BlurKsize
            | Self::CannyLow
            | Self::CannyHigh
            | Self::PotraceTurdsize => SettingType::Int,
            Self::BackgroundTolerance | Self::MaxArtifactSize | Self::PotraceAlphamax => {
                SettingType::Float
            }
            Self::RemoveBackground | Self::GroupByColor => SettingType::Bool,
            Self::ToolOnCmd | Self::ToolOffCmd | Self::OutputFilename | Self::SvgMode => {
                SettingType::Text
            }
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = SettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| SettingError::UnknownKey(s.to_owned()))
    }
}

/// The full set of conversion settings.
///
/// Field names are the persisted key names. Every field always holds a
/// value; [`Default`] supplies the documented defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub color_tolerance: i64,
    pub remove_background: bool,
    pub background_tolerance: f64,
    pub max_artifact_size: f64,
    pub group_by_color: bool,
    /// Command that engages the tool (laser, spindle, pen).
    pub tool_on_cmd: String,
    /// Command that disengages the tool.
    pub tool_off_cmd: String,
    /// Default base name for output files.
    pub output_filename: String,
    /// Extraction mode name; see [`SvgMode::from_setting`].
    pub svg_mode: String,
    /// Binarization threshold. Pixels at or above it are bright.
    pub threshold: i64,
    /// Blur kernel side length. Expected to be odd.
    pub blur_ksize: i64,
    /// Canny hysteresis low threshold.
    pub canny_low: i64,
    /// Canny hysteresis high threshold.
    pub canny_high: i64,
    pub potrace_turdsize: i64,
    pub potrace_alphamax: f64,
}

impl Settings {
    /// Default value for `threshold`.
    pub const DEFAULT_THRESHOLD: i64 = 128;
    /// Default value for `blur_ksize`.
    pub const DEFAULT_BLUR_KSIZE: i64 = 3;
    /// Default value for `canny_low`.
    pub const DEFAULT_CANNY_LOW: i64 = 50;
    /// Default value for `canny_high`.
    pub const DEFAULT_CANNY_HIGH: i64 = 150;
    /// Default value for `svg_mode`.
    pub const DEFAULT_SVG_MODE: &'static str = "contour";
    /// Default value for `tool_on_cmd`.
    pub const DEFAULT_TOOL_ON_CMD: &'static str = "M3";
    /// Default value for `tool_off_cmd`.
    pub const DEFAULT_TOOL_OFF_CMD: &'static str = "M5";
    /// Default value for `output_filename`.
    pub const DEFAULT_OUTPUT_FILENAME: &'static str = "output";

    /// Read one setting by key.
    #[must_use]
    pub fn get(&self, key: SettingKey) -> SettingValue {
        match key {
            SettingKey::ColorTolerance => SettingValue::Int(self.color_tolerance),
            SettingKey::RemoveBackground => SettingValue::Bool(self.remove_background),
            SettingKey::BackgroundTolerance => SettingValue::Float(self.background_tolerance),
            SettingKey::MaxArtifactSize => SettingValue::Float(self.max_artifact_size),
            SettingKey::GroupByColor => SettingValue::Bool(self.group_by_color),
            SettingKey::ToolOnCmd => SettingValue::Text(self.tool_on_cmd.clone()),
            SettingKey::ToolOffCmd => SettingValue::Text(self.tool_off_cmd.clone()),
            SettingKey::OutputFilename => SettingValue::Text(self.output_filename.clone()),
            SettingKey::SvgMode => SettingValue::Text(self.svg_mode.clone()),
            SettingKey::Threshold => SettingValue::Int(self.threshold),
            SettingKey::BlurKsize => SettingValue::Int(self.blur_ksize),
            SettingKey::CannyLow => SettingValue::Int(self.canny_low),
            SettingKey::CannyHigh => SettingValue::Int(self.canny_high),
            SettingKey::PotraceTurdsize => SettingValue::Int(self.potrace_turdsize),
            SettingKey::PotraceAlphamax => SettingValue::Float(self.potrace_alphamax),
        }
    }

    /// Write one setting by key.
    ///
    /// Integer values are accepted for float keys. Nothing is changed
    /// when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`SettingError::TypeMismatch`] if the value's type does not
    /// fit the key, or [`SettingError::NonFinite`] for a NaN or infinite
    /// float.
    pub fn set(&mut self, key: SettingKey, value: SettingValue) -> Result<(), SettingError> {
        match key {
            SettingKey::ColorTolerance => self.color_tolerance = int_value(key, value)?,
            SettingKey::RemoveBackground => self.remove_background = bool_value(key, value)?,
            SettingKey::BackgroundTolerance => {
                self.background_tolerance = float_value(key, value)?;
            }
            SettingKey::MaxArtifactSize => self.max_artifact_size = float_value(key, value)?,
            SettingKey::GroupByColor => self.group_by_color = bool_value(key, value)?,
            SettingKey::ToolOnCmd => self.tool_on_cmd = text_value(key, value)?,
            SettingKey::ToolOffCmd => self.tool_off_cmd = text_value(key, value)?,
            SettingKey::OutputFilename => self.output_filename = text_value(key, value)?,
            SettingKey::SvgMode => self.svg_mode = text_value(key, value)?,
            SettingKey::Threshold => self.threshold = int_value(key, value)?,
            SettingKey::BlurKsize => self.blur_ksize = int_value(key, value)?,
            SettingKey::CannyLow => self.canny_low = int_value(key, value)?,
            SettingKey::CannyHigh => self.canny_high = int_value(key, value)?,
            SettingKey::PotraceTurdsize => self.potrace_turdsize = int_value(key, value)?,
            SettingKey::PotraceAlphamax => self.potrace_alphamax = float_value(key, value)?,
        }
        Ok(())
    }

    /// Extraction mode selected by `svg_mode`.
    #[must_use]
    pub fn mode(&self) -> SvgMode {
        SvgMode::from_setting(&self.svg_mode)
    }

    /// `threshold` clamped into the pixel intensity range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn threshold_level(&self) -> u8 {
        self.threshold.clamp(0, i64::from(u8::MAX)) as u8
    }

    /// `blur_ksize` as a kernel side length; negative values become 0.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn blur_kernel_size(&self) -> u32 {
        self.blur_ksize.clamp(0, i64::from(u32::MAX)) as u32
    }

    /// `(canny_low, canny_high)` as gradient thresholds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn canny_thresholds(&self) -> (f32, f32) {
        (self.canny_low as f32, self.canny_high as f32)
    }
}

fn mismatch(key: SettingKey, value: &SettingValue) -> SettingError {
    SettingError::TypeMismatch {
        key,
        expected: key.setting_type(),
        found: value.setting_type(),
    }
}

fn int_value(key: SettingKey, value: SettingValue) -> Result<i64, SettingError> {
    match value {
        SettingValue::Int(v) => Ok(v),
        other => Err(mismatch(key, &other)),
    }
}

/// Integers are accepted for float keys.
#[allow(clippy::cast_precision_loss)]
fn float_value(key: SettingKey, value: SettingValue) -> Result<f64, SettingError> {
    let v = match value {
        SettingValue::Float(v) => v,
        SettingValue::Int(v) => v as f64,
        other => return Err(mismatch(key, &other)),
    };
    if v.is_finite() {
        Ok(v)
    } else {
        Err(SettingError::NonFinite(key))
    }
}

fn bool_value(key: SettingKey, value: SettingValue) -> Result<bool, SettingError> {
    match value {
        SettingValue::Bool(v) => Ok(v),
        other => Err(mismatch(key, &other)),
    }
}

fn text_value(key: SettingKey, value: SettingValue) -> Result<String, SettingError> {
    match value {
        SettingValue::Text(v) => Ok(v),
        other => Err(mismatch(key, &other)),
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color_tolerance: 1,
            remove_background: false,
            background_tolerance: 1.0,
            max_artifact_size: 0.02,
            group_by_color: true,
            tool_on_cmd: Self::DEFAULT_TOOL_ON_CMD.to_owned(),
            tool_off_cmd: Self::DEFAULT_TOOL_OFF_CMD.to_owned(),
            output_filename: Self::DEFAULT_OUTPUT_FILENAME.to_owned(),
            svg_mode: Self::DEFAULT_SVG_MODE.to_owned(),
            threshold: Self::DEFAULT_THRESHOLD,
            blur_ksize: Self::DEFAULT_BLUR_KSIZE,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            potrace_turdsize: 2,
            potrace_alphamax: 1.0,
        }
    }
}
