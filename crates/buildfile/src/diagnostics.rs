use once_cell::sync::Lazy;
use regex::Regex;

/// Lines containing this marker are never treated as diagnostics
pub const IGNORE_MARKER: &str = "$IGNORE$";

/// Appended after every probe so the tool stops right after the candidate
/// lines instead of evaluating the whole project.
pub fn sentinel_line() -> String {
    format!(
        "error('This error is produced to speed up checks and can be ignored ({IGNORE_MARKER})')"
    )
}

const MISSING_PROJECT: &str = "First statement must be a call to project";

/// How a probe ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// No diagnostic
    Clean,
    /// `<path>:<line>:<col>: ERROR: <msg>`
    Error,
    /// A warning, with warnings treated as errors
    Warning,
    /// The file does not start with `project()`
    MissingProject,
    /// Anything on stderr
    Crash,
    /// An `ERROR` line in an unknown shape
    FormatDrift,
    Timeout,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::MissingProject => "missing-project",
            Self::Crash => "crash",
            Self::FormatDrift => "format-drift",
            Self::Timeout => "timeout",
        }
    }
}

/// Classification of one reconfigure run, with an absolute 1-based line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub line: Option<usize>,
    pub message: String,
    pub kind: DiagnosticKind,
}

static ERROR_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<path>\S*meson\.build):(?P<line>\d+):(?P<col>\d+): ERROR: (?P<msg>.*)$")
        .expect("diagnostic regex is valid")
});

/// Classify reconfigure output. `lines_before` is the line count before
/// the candidate lines were appended; attributions without a line number
/// point at the first candidate line (`lines_before + 1`).
pub fn classify(
    stdout: &str,
    stderr: &str,
    lines_before: usize,
    warnings_as_errors: bool,
) -> Classification {
    let first_candidate = lines_before + 1;
    let mut result = Classification {
        line: None,
        message: String::new(),
        kind: DiagnosticKind::Clean,
    };

    for raw in stdout.lines() {
        let line = raw.trim_end_matches('\r');
        if line.contains(IGNORE_MARKER) {
            continue;
        }
        if line.contains("ERROR") && line.contains(MISSING_PROJECT) {
            log::warn!("No project() call in meson.build file");
            result = Classification {
                line: Some(first_candidate),
                message: MISSING_PROJECT.to_string(),
                kind: DiagnosticKind::MissingProject,
            };
            continue;
        }
        if let Some(caps) = ERROR_LINE.captures(line) {
            if let Ok(number) = caps["line"].parse::<usize>() {
                result = Classification {
                    line: Some(number),
                    message: caps["msg"].trim().to_string(),
                    kind: DiagnosticKind::Error,
                };
                break;
            }
        }
        if warnings_as_errors && line.contains("WARNING") {
            let message = line
                .split_once("WARNING:")
                .map_or(line, |(_, rest)| rest)
                .trim()
                .to_string();
            result = Classification {
                line: Some(first_candidate),
                message,
                kind: DiagnosticKind::Warning,
            };
            break;
        }
        if line.contains("ERROR") {
            log::warn!("ERROR line found, but the diagnostic pattern did not match: {line}");
            if result.kind == DiagnosticKind::Clean {
                result.kind = DiagnosticKind::FormatDrift;
                result.message = line.trim().to_string();
            }
        }
    }

    if !stderr.is_empty() {
        result = Classification {
            line: Some(first_candidate),
            message: "Meson has crashed".to_string(),
            kind: DiagnosticKind::Crash,
        };
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BANNER: &str = "The Meson build system\nVersion: 1.3.0\nProject name: generated\n";

    #[test]
    fn test_clean_output() {
        let out = format!(
            "{BANNER}../meson.build:7:0: ERROR: Problem encountered: This error is produced to speed up checks and can be ignored ($IGNORE$)\n"
        );
        let c = classify(&out, "", 5, false);
        assert_eq!(c.kind, DiagnosticKind::Clean);
        assert_eq!(c.line, None);
    }

    #[test]
    fn test_error_line_parsed() {
        let out = format!(
            "{BANNER}../meson.build:6:0: ERROR: executable keyword argument 'install' was of type str but should have been bool\n"
        );
        let c = classify(&out, "", 5, false);
        assert_eq!(c.kind, DiagnosticKind::Error);
        assert_eq!(c.line, Some(6));
        assert_eq!(
            c.message,
            "executable keyword argument 'install' was of type str but should have been bool"
        );
    }

    #[test]
    fn test_windows_separator() {
        let c = classify("..\\meson.build:3:4: ERROR: bad\r\n", "", 2, false);
        assert_eq!(c.line, Some(3));
        assert_eq!(c.message, "bad");
    }

    #[test]
    fn test_warnings_only_when_enabled() {
        let out = "WARNING: Deprecated features used:\n";
        assert_eq!(classify(out, "", 4, false).kind, DiagnosticKind::Clean);
        let c = classify(out, "", 4, true);
        assert_eq!(c.kind, DiagnosticKind::Warning);
        assert_eq!(c.line, Some(5));
        assert_eq!(c.message, "Deprecated features used:");
    }

    #[test]
    fn test_missing_project() {
        let out = "../meson.build:1:0: ERROR: First statement must be a call to project()\n";
        let c = classify(out, "", 0, false);
        assert_eq!(c.kind, DiagnosticKind::MissingProject);
        assert_eq!(c.line, Some(1));
    }

    #[test]
    fn test_format_drift_is_not_attributed() {
        let c = classify("ERROR: something new and different\n", "", 3, false);
        assert_eq!(c.kind, DiagnosticKind::FormatDrift);
        assert_eq!(c.line, None);
    }

    #[test]
    fn test_stderr_means_crash_regardless_of_stdout() {
        let out = "../meson.build:6:0: ERROR: real error\n";
        let c = classify(out, "Traceback (most recent call last):\n", 5, false);
        assert_eq!(c.kind, DiagnosticKind::Crash);
        assert_eq!(c.line, Some(6));
    }

    #[test]
    fn test_blank_stderr_is_still_a_crash() {
        let c = classify("The Meson build system\n", "\n", 3, false);
        assert_eq!(c.kind, DiagnosticKind::Crash);
        assert_eq!(c.line, Some(4));
    }

    #[test]
    fn test_sentinel_carries_marker() {
        assert!(sentinel_line().contains(IGNORE_MARKER));
        assert!(sentinel_line().starts_with("error('"));
    }
}
