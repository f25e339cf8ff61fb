//! The toolpath translator capability.
//!
//! Compiling an SVG path document into G-code is delegated to an
//! external component. The emitter only depends on the [`Translator`]
//! trait; [`Svg2Gcode`] implements it by running the `svg2gcode`
//! command-line tool.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Inputs for one translation.
#[derive(Debug, Clone, Copy)]
pub struct TranslateRequest<'a> {
    /// The SVG path document to compile.
    pub svg_path: &'a Path,
    /// Where the G-code program is written.
    pub gcode_path: &'a Path,
    /// Command that engages the tool.
    pub tool_on: &'a str,
    /// Command that disengages the tool.
    pub tool_off: &'a str,
}

/// Errors reported by a [`Translator`].
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// The translator could not be located or started.
    #[error("translator '{program}' is unavailable: {source}")]
    Unavailable {
        /// The program that could not be started.
        program: String,
        /// Why it could not be started.
        source: std::io::Error,
    },

    /// The translator ran and reported failure.
    #[error("translator failed: {stderr}")]
    Failed {
        /// The translator's diagnostic output, verbatim.
        stderr: String,
    },

    /// The translator did not finish within the configured timeout and
    /// was killed.
    #[error("translator timed out after {0:?}")]
    TimedOut(Duration),

    /// Communicating with the translator process failed.
    #[error("translator I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Compiles an SVG path document into a G-code program.
pub trait Translator {
    /// Translate `request.svg_path` into `request.gcode_path`.
    ///
    /// # Errors
    ///
    /// See [`TranslateError`].
    fn translate(&self, request: &TranslateRequest<'_>) -> Result<(), TranslateError>;
}

impl<T: Translator + ?Sized> Translator for &T {
    fn translate(&self, request: &TranslateRequest<'_>) -> Result<(), TranslateError> {
        (**self).translate(request)
    }
}

impl<T: Translator + ?Sized> Translator for Box<T> {
    fn translate(&self, request: &TranslateRequest<'_>) -> Result<(), TranslateError> {
        (**self).translate(request)
    }
}

/// Runs the `svg2gcode` command-line tool:
/// `svg2gcode <svg> --off <tool_off> --on <tool_on> -o <gcode>`.
#[derive(Debug, Clone)]
pub struct Svg2Gcode {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Svg2Gcode {
    /// Executable name looked up on `PATH` by default.
    pub const DEFAULT_PROGRAM: &'static str = "svg2gcode";

    /// Interval between exit checks while a timeout is armed.
    const POLL_INTERVAL: Duration = Duration::from_millis(20);

    /// Use the given executable (a bare name is looked up on `PATH`).
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill the translator and fail if it runs longer than `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The executable this translator runs.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, request: &TranslateRequest<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(request.svg_path)
            .arg("--off")
            .arg(request.tool_off)
            .arg("--on")
            .arg(request.tool_on)
            .arg("-o")
            .arg(request.gcode_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Default for Svg2Gcode {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROGRAM)
    }
}

impl Translator for Svg2Gcode {
    fn translate(&self, request: &TranslateRequest<'_>) -> Result<(), TranslateError> {
        tracing::debug!(program = %self.program.display(), svg = %request.svg_path.display(), "running translator");

        let mut child = self
            .command(request)
            .spawn()
            .map_err(|source| TranslateError::Unavailable {
                program: self.program.display().to_string(),
                source,
            })?;

        // Drain stderr on its own thread so a chatty translator cannot
        // block on a full pipe while we wait for it.
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });
        let collect_stderr = |reader: Option<std::thread::JoinHandle<Vec<u8>>>| {
            reader
                .and_then(|handle| handle.join().ok())
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default()
        };

        let status = match self.timeout {
            None => child.wait()?,
            Some(timeout) => {
                let started = Instant::now();
                loop {
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    if started.elapsed() >= timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        // A grandchild may still hold the stderr pipe open;
                        // detach the reader instead of joining it.
                        drop(stderr_reader);
                        return Err(TranslateError::TimedOut(timeout));
                    }
                    std::thread::sleep(Self::POLL_INTERVAL);
                }
            }
        };

        let stderr = collect_stderr(stderr_reader);
        if status.success() {
            Ok(())
        } else {
            tracing::debug!(%status, "translator exited with failure");
            Err(TranslateError::Failed { stderr })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn request<'a>(svg: &'a Path, gcode: &'a Path) -> TranslateRequest<'a> {
        TranslateRequest {
            svg_path: svg,
            gcode_path: gcode,
            tool_on: "M3",
            tool_off: "M5",
        }
    }

    #[test]
    fn command_line_matches_svg2gcode_interface() {
        let translator = Svg2Gcode::default();
        let cmd = translator.command(&request(Path::new("in.svg"), Path::new("out.gcode")));
        assert_eq!(cmd.get_program(), "svg2gcode");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(
            args,
            ["in.svg", "--off", "M5", "--on", "M3", "-o", "out.gcode"]
        );
    }

    #[test]
    fn missing_program_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let translator = Svg2Gcode::new(dir.path().join("no-such-translator"));
        let svg = dir.path().join("in.svg");
        let gcode = dir.path().join("out.gcode");
        let err = translator.translate(&request(&svg, &gcode)).unwrap_err();
        assert!(matches!(err, TranslateError::Unavailable { .. }), "{err:?}");
        assert!(!gcode.exists());
    }

    #[cfg(unix)]
    mod unix {
        use std::os::unix::fs::PermissionsExt;

        use super::*;

        /// Write an executable shell script and return its path.
        fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn successful_run_passes_arguments() {
            let dir = tempfile::tempdir().unwrap();
            // Echo the on/off commands into the output file given by -o.
            let program = script(dir.path(), "fake", r#"printf '%s\n%s\n' "$5" "$3" > "$7""#);
            let svg = dir.path().join("in.svg");
            let gcode = dir.path().join("out.gcode");
            Svg2Gcode::new(program)
                .translate(&request(&svg, &gcode))
                .unwrap();
            assert_eq!(std::fs::read_to_string(&gcode).unwrap(), "M3\nM5\n");
        }

        #[test]
        fn failure_carries_stderr_verbatim() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(dir.path(), "fail", "printf 'bad svg\\n  at line 3\\n' >&2\nexit 2");
            let svg = dir.path().join("in.svg");
            let gcode = dir.path().join("out.gcode");
            let err = Svg2Gcode::new(program)
                .translate(&request(&svg, &gcode))
                .unwrap_err();
            match err {
                TranslateError::Failed { stderr } => assert_eq!(stderr, "bad svg\n  at line 3\n"),
                other => panic!("expected Failed, got {other:?}"),
            }
        }

        #[test]
        fn slow_translator_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(dir.path(), "slow", "sleep 5");
            let svg = dir.path().join("in.svg");
            let gcode = dir.path().join("out.gcode");
            let started = Instant::now();
            let err = Svg2Gcode::new(program)
                .with_timeout(Duration::from_millis(100))
                .translate(&request(&svg, &gcode))
                .unwrap_err();
            assert!(matches!(err, TranslateError::TimedOut(_)), "{err:?}");
            assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
        }

        #[test]
        fn timeout_is_not_held_up_by_background_children() {
            let dir = tempfile::tempdir().unwrap();
            // The background sleep inherits stderr and outlives the kill.
            let program = script(dir.path(), "forks", "sleep 5 &\nsleep 5");
            let svg = dir.path().join("in.svg");
            let gcode = dir.path().join("out.gcode");
            let started = Instant::now();
            let err = Svg2Gcode::new(program)
                .with_timeout(Duration::from_millis(100))
                .translate(&request(&svg, &gcode))
                .unwrap_err();
            assert!(matches!(err, TranslateError::TimedOut(_)), "{err:?}");
            assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
        }

        #[test]
        fn fast_translator_finishes_within_timeout() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(dir.path(), "fast", r#": > "$7""#);
            let svg = dir.path().join("in.svg");
            let gcode = dir.path().join("out.gcode");
            Svg2Gcode::new(program)
                .with_timeout(Duration::from_secs(10))
                .translate(&request(&svg, &gcode))
                .unwrap();
            assert!(gcode.exists());
        }
    }
}
