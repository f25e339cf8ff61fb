//! G-code program text rules.
//!
//! The toolpath translator writes the motion program; these helpers
//! check and finish it:
//!
//! - [`check_tool_bracketing`] verifies that every tool-on command is
//!   closed by a tool-off command before the tool is engaged again and
//!   before the program ends.
//! - [`PROGRAM_END`] is the end-of-program line appended after a
//!   successful translation.
//!
//! Commands are compared as G-code words, not as text. The translator
//! re-formats the configured commands before writing them: `M05` comes
//! out as `M5`, and `M5 G4 P0.2` is split into one command per line. Each
//! line is therefore read as a sequence of command groups (a `G`/`M` word
//! followed by its parameter words), with letters upper-cased, numbers
//! compared by value, and comments (`;` to end of line, `( ... )`) and
//! `N` line numbers ignored. A configured command is recognised by its
//! first group.

/// The end-of-program line, including its terminator.
pub const PROGRAM_END: &str = "M2; End\n";

/// A tool-state bracketing violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BracketError {
    /// A tool-on command at `line` (1-based) is not followed by a
    /// tool-off command before the next tool-on or the end of program.
    #[error("tool engaged at line {line} is never disengaged")]
    ToolLeftEngaged {
        /// Line number of the unclosed tool-on command.
        line: usize,
    },
}

/// One G-code word: an upper-case letter and its value.
///
/// Values that parse as numbers are stored in canonical form, so `05`,
/// `5` and `5.0` are the same word.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Word {
    letter: char,
    value: String,
}

impl Word {
    fn new(letter: char, raw: &str) -> Self {
        let value = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map_or_else(|| raw.to_owned(), |v| format!("{}", v + 0.0));
        Self {
            letter: letter.to_ascii_uppercase(),
            value,
        }
    }

    const fn is_command(&self) -> bool {
        matches!(self.letter, 'G' | 'M')
    }
}

/// A command word and the parameter words that follow it on its line.
/// Parameters are kept sorted since their order carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Group {
    command: Option<Word>,
    parameters: Vec<Word>,
}

/// Split one line into words, dropping comments and `N` line numbers.
fn words(line: &str) -> Vec<Word> {
    let code = line.split(';').next().unwrap_or_default();
    let mut out = Vec::new();
    let mut chars = code.chars().peekable();
    let mut in_paren_comment = false;

    while let Some(c) = chars.next() {
        if in_paren_comment {
            in_paren_comment = c != ')';
            continue;
        }
        if c == '(' {
            in_paren_comment = true;
            continue;
        }
        if !c.is_ascii_alphabetic() {
            continue;
        }
        while chars.peek().is_some_and(|n| n.is_whitespace()) {
            chars.next();
        }
        let mut raw = String::new();
        while let Some(&n) = chars.peek() {
            if n.is_ascii_digit() || matches!(n, '.' | '+' | '-') {
                raw.push(n);
                chars.next();
            } else {
                break;
            }
        }
        let word = Word::new(c, &raw);
        if word.letter != 'N' {
            out.push(word);
        }
    }
    out
}

/// Group the words of one line by command.
fn groups(line: &str) -> Vec<Group> {
    let mut out: Vec<Group> = Vec::new();
    for word in words(line) {
        if word.is_command() {
            out.push(Group {
                command: Some(word),
                parameters: Vec::new(),
            });
        } else if let Some(group) = out.last_mut() {
            group.parameters.push(word);
        } else {
            out.push(Group {
                command: None,
                parameters: vec![word],
            });
        }
    }
    for group in &mut out {
        group.parameters.sort();
    }
    out
}

/// The group a configured command is recognised by: the first group of
/// its first non-empty line.
fn command_signature(command: &str) -> Option<Group> {
    command.lines().flat_map(groups).next()
}

/// Verify tool-on/tool-off bracketing in a G-code program.
///
/// Checking is skipped when either command has no G-code words or when
/// both are recognised by the same group, since the states cannot be
/// told apart. A program with no tool commands at all is valid.
///
/// # Errors
///
/// Returns [`BracketError::ToolLeftEngaged`] for the first tool-on line
/// that is not closed.
pub fn check_tool_bracketing(
    program: &str,
    tool_on: &str,
    tool_off: &str,
) -> Result<(), BracketError> {
    let (Some(on), Some(off)) = (command_signature(tool_on), command_signature(tool_off)) else {
        return Ok(());
    };
    if on == off {
        return Ok(());
    }

    let mut engaged_at: Option<usize> = None;
    for (index, line) in program.lines().enumerate() {
        let line_number = index + 1;
        for group in groups(line) {
            if group == on {
                if let Some(line) = engaged_at {
                    return Err(BracketError::ToolLeftEngaged { line });
                }
                engaged_at = Some(line_number);
            } else if group == off {
                engaged_at = None;
            }
        }
    }

    engaged_at.map_or(Ok(()), |line| Err(BracketError::ToolLeftEngaged { line }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_marker_is_m2_with_comment_and_newline() {
        assert_eq!(PROGRAM_END, "M2; End\n");
        assert!(PROGRAM_END.ends_with('\n'));
        assert_eq!(PROGRAM_END.lines().count(), 1);
    }

    #[test]
    fn empty_program_is_valid() {
        assert_eq!(check_tool_bracketing("", "M3", "M5"), Ok(()));
    }

    #[test]
    fn bracketed_program_is_valid() {
        let program = "G21\nG90\nM5\nG0 X1 Y1\nM3\nG1 X2 Y2\nG1 X3 Y1\nM5\nG0 X0 Y0\nM3\nG1 X1 Y0\nM5\n";
        assert_eq!(check_tool_bracketing(program, "M3", "M5"), Ok(()));
    }

    #[test]
    fn unclosed_tool_at_end_is_reported() {
        let program = "M5\nG0 X1 Y1\nM3\nG1 X2 Y2\n";
        assert_eq!(
            check_tool_bracketing(program, "M3", "M5"),
            Err(BracketError::ToolLeftEngaged { line: 3 })
        );
    }

    #[test]
    fn double_engage_reports_first_on() {
        let program = "M3\nG1 X1\nM3\nG1 X2\nM5\n";
        assert_eq!(
            check_tool_bracketing(program, "M3", "M5"),
            Err(BracketError::ToolLeftEngaged { line: 1 })
        );
    }

    #[test]
    fn comments_spacing_and_case_are_ignored() {
        let program = "m3  s1000 ; laser on\nG1 X1\n  M5;off\n";
        assert_eq!(check_tool_bracketing(program, "M3 S1000", "M5"), Ok(()));
    }

    #[test]
    fn commands_match_whole_lines_only() {
        // "M30" is not the tool-on command "M3".
        let program = "M3\nG1 X1\nM5\nM30\n";
        assert_eq!(check_tool_bracketing(program, "M3", "M5"), Ok(()));
    }

    #[test]
    fn multi_line_command_uses_first_line() {
        let program = "M3 S255\nG4 P0.2\nG1 X1\nM5\n";
        assert_eq!(check_tool_bracketing(program, "M3 S255\nG4 P0.2", "M5"), Ok(()));
        assert!(check_tool_bracketing("M3 S255\nG1 X1\n", "M3 S255\nG4 P0.2", "M5").is_err());
    }

    #[test]
    fn empty_or_identical_commands_skip_checking() {
        assert_eq!(check_tool_bracketing("M3\n", "", "M5"), Ok(()));
        assert_eq!(check_tool_bracketing("M3\n", "M3", "  "), Ok(()));
        assert_eq!(check_tool_bracketing("M3\n", "M3", "m3"), Ok(()));
    }

    /// Program in the translator's output layout: one command per line,
    /// `M5` for the configured `M05`, and a dwell split onto its own line.
    const TRANSLATED: &str = "G21\nG90\nG0 X10 Y10\nM3 S1000\nG1 X20 Y10 F300\nG1 X20 Y20 F300\nM5\nG4 P0.2\nG0 X40 Y40\nM3 S1000\nG1 X50 Y40 F300\nM5\nG4 P0.2\n";

    #[test]
    fn leading_zeros_are_not_significant() {
        assert_eq!(check_tool_bracketing(TRANSLATED, "M3 S1000", "M05"), Ok(()));
        assert_eq!(check_tool_bracketing(TRANSLATED, "M03 S1000.0", "M5"), Ok(()));
    }

    #[test]
    fn multi_command_line_is_recognised_when_split() {
        assert_eq!(
            check_tool_bracketing(TRANSLATED, "M3 S1000", "M5 G4 P0.2"),
            Ok(())
        );
    }

    #[test]
    fn split_command_still_catches_unclosed_tool() {
        let program = "G21\nM3 S1000\nG1 X1 Y1\nG4 P0.2\n";
        assert_eq!(
            check_tool_bracketing(program, "M3 S1000", "M5 G4 P0.2"),
            Err(BracketError::ToolLeftEngaged { line: 2 })
        );
    }

    #[test]
    fn commands_on_one_line_are_read_in_order() {
        assert_eq!(check_tool_bracketing("M3 G1 X1 M5\n", "M3", "M5"), Ok(()));
        assert_eq!(
            check_tool_bracketing("M5 G1 X1 M3\n", "M3", "M5"),
            Err(BracketError::ToolLeftEngaged { line: 1 })
        );
    }

    #[test]
    fn parameter_values_still_distinguish_commands() {
        // The same spindle command at another power is not this tool-on.
        let program = "M3 S500\nG1 X1\n";
        assert_eq!(check_tool_bracketing(program, "M3 S1000", "M5"), Ok(()));
    }

    #[test]
    fn paren_comments_and_line_numbers_are_ignored() {
        let program = "N10 M3 (laser on)\nN20 G1 X1\nN30 M5\n";
        assert_eq!(check_tool_bracketing(program, "M3", "M5"), Ok(()));
    }

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(Word::new('m', "05"), Word::new('M', "5"));
        assert_eq!(Word::new('P', "0.20"), Word::new('P', ".2"));
        assert_eq!(Word::new('X', "-0"), Word::new('X', "0"));
        assert_ne!(Word::new('M', "30"), Word::new('M', "3"));
    }
}
