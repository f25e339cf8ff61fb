//! img2gcode: convert a raster image into a G-code toolpath.
//!
//! Loads the persisted settings, applies any command-line overrides,
//! extracts contours from the image, writes them as an SVG path
//! document, and hands that to the `svg2gcode` translator.
//!
//! # Usage
//!
//! ```text
//! img2gcode [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Logging verbosity follows `RUST_LOG` (default `info`).

#![allow(clippy::print_stdout)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use img2gcode_io::{ConversionJob, Converter, SettingsStore, Svg2Gcode};
use img2gcode_pipeline::{SettingError, SettingKey, SettingValue, Settings};
use tracing_subscriber::EnvFilter;

/// Convert a raster image into a G-code toolpath via `svg2gcode`.
#[derive(Parser)]
#[command(name = "img2gcode", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, GIF, TIFF).
    image_path: PathBuf,

    /// Settings file. Created with defaults if missing.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Directory the `.svg` and `.gcode` files are written to.
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Output file stem (default: the `output_filename` setting).
    #[arg(long)]
    name: Option<String>,

    /// Mask strategy.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Binarization threshold (0-255).
    #[arg(long)]
    threshold: Option<i64>,

    /// Gaussian blur kernel size in pixels.
    #[arg(long)]
    blur_ksize: Option<i64>,

    /// Canny low hysteresis threshold.
    #[arg(long)]
    canny_low: Option<i64>,

    /// Canny high hysteresis threshold.
    #[arg(long)]
    canny_high: Option<i64>,

    /// Command that engages the tool.
    #[arg(long)]
    tool_on: Option<String>,

    /// Command that disengages the tool.
    #[arg(long)]
    tool_off: Option<String>,

    /// Persist the overrides above to the settings file.
    #[arg(long)]
    save: bool,

    /// Toolpath translator executable.
    #[arg(long, default_value = Svg2Gcode::DEFAULT_PROGRAM)]
    translator: PathBuf,

    /// Kill the translator after this many seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Also write the binary mask as a PNG for inspection.
    #[arg(long, value_name = "PATH")]
    dump_mask: Option<PathBuf>,
}

/// Mask strategy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Dark regions become foreground.
    Contour,
    /// Light regions become foreground.
    Threshold,
    /// Canny edge map.
    Canny,
}

impl Mode {
    const fn as_setting(self) -> &'static str {
        match self {
            Self::Contour => "contour",
            Self::Threshold => "threshold",
            Self::Canny => "canny",
        }
    }
}

impl Cli {
    /// The settings overridden on the command line, in key order.
    fn overrides(&self) -> Vec<(SettingKey, SettingValue)> {
        let mut overrides = Vec::new();
        if let Some(mode) = self.mode {
            overrides.push((
                SettingKey::SvgMode,
                SettingValue::Text(mode.as_setting().to_owned()),
            ));
        }
        let ints = [
            (SettingKey::Threshold, self.threshold),
            (SettingKey::BlurKsize, self.blur_ksize),
            (SettingKey::CannyLow, self.canny_low),
            (SettingKey::CannyHigh, self.canny_high),
        ];
        overrides.extend(
            ints.into_iter()
                .filter_map(|(key, value)| value.map(|v| (key, SettingValue::Int(v)))),
        );
        let texts = [
            (SettingKey::ToolOnCmd, &self.tool_on),
            (SettingKey::ToolOffCmd, &self.tool_off),
        ];
        overrides.extend(texts.into_iter().filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|v| (key, SettingValue::Text(v.clone())))
        }));
        overrides
    }
}

fn apply(
    settings: &mut Settings,
    overrides: &[(SettingKey, SettingValue)],
) -> Result<(), SettingError> {
    for (key, value) in overrides {
        settings.set(*key, value.clone())?;
    }
    Ok(())
}

/// Render an error and its sources as `outer: inner: ...`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}

fn run(cli: &Cli) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let store = SettingsStore::open(&cli.config);
    let overrides = cli.overrides();

    let settings = if cli.save {
        store.update(|settings| apply(settings, &overrides))?;
        tracing::info!(config = %store.path().display(), count = overrides.len(), "saved settings");
        store.snapshot()
    } else {
        let mut settings = store.snapshot();
        apply(&mut settings, &overrides)?;
        settings
    };

    let mut translator = Svg2Gcode::new(&cli.translator);
    if let Some(secs) = cli.timeout {
        translator = translator.with_timeout(Duration::from_secs(secs));
    }
    let converter = Converter::new(&cli.output_dir, translator);

    let mut job = ConversionJob::new(&cli.image_path, settings);
    if let Some(name) = &cli.name {
        job = job.with_output_base_name(name.clone());
    }

    let conversion = converter.run_staged(&job)?;
    if let Some(path) = &cli.dump_mask {
        conversion.staged.mask.save(path)?;
        tracing::info!(mask = %path.display(), "wrote mask");
    }
    Ok(conversion.gcode_path)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(gcode_path) => {
            println!("{}", gcode_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", error_chain(e.as_ref()));
            ExitCode::FAILURE
        }
    }
}
