use console::style;
use sigcheck_buildfile::{DiagnosticKind, ProbeOutcome};

/// Pass/fail tally, threaded through a run and handed back at the end
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResultAccumulator {
    successes: usize,
    failures: usize,
}

impl ResultAccumulator {
    pub fn record(&mut self, passed: bool) {
        if passed {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }

    pub fn successes(&self) -> usize {
        self.successes
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn total(&self) -> usize {
        self.successes + self.failures
    }

    pub fn summary(&self) -> String {
        format!(
            "Out of {} total checks, {} were successful and {} were failures.",
            self.total(),
            self.successes,
            self.failures
        )
    }
}

/// Which part of a probe the tool complained about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSite {
    /// Lines that build the receiver or the value under test
    Setup,
    /// The call itself or its argument setup
    Call,
    /// Methods called on the returned value
    ReturnValue,
}

/// Console output for check results and internal notices
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    verbose: bool,
}

impl Reporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn success(&self, description: &str) {
        if self.verbose {
            println!("{} {description}", style("[ OK ]").green());
        }
    }

    pub fn failure(&self, description: &str, site: FailureSite, outcome: &ProbeOutcome, lines: &[String]) {
        println!(
            "{} {}",
            style("[FAIL]").red().bold(),
            failure_text(description, site, outcome, lines)
        );

        if self.verbose {
            println!("######## PROBED LINES ########");
            for line in lines {
                println!("{line}");
            }
            println!("########## STDOUT ############");
            println!("{}", outcome.stdout.trim_end());
            if !outcome.stderr.is_empty() {
                println!("########## STDERR ############");
                println!("{}", outcome.stderr.trim_end());
            }
        }
    }

    pub fn internal(&self, message: impl std::fmt::Display) {
        println!("{}:: {message}", style("INTERNAL").yellow());
    }

    pub fn summary(&self, results: &ResultAccumulator) {
        println!("{}", results.summary());
    }
}

/// `<description>: <what went wrong>`, plus the probed line the tool
/// pointed at when the offset lands inside `lines`.
fn failure_text(description: &str, site: FailureSite, outcome: &ProbeOutcome, lines: &[String]) -> String {
    let what = match (outcome.kind, site) {
        (DiagnosticKind::Crash, _) => "meson crashed".to_string(),
        (DiagnosticKind::Timeout, _) => "timed out".to_string(),
        (DiagnosticKind::Warning, _) => format!("(WARNING) {}", outcome.message),
        (_, FailureSite::Setup) => format!("setup failed: {}", outcome.message),
        (_, FailureSite::Call) => outcome.message.clone(),
        (_, FailureSite::ReturnValue) => {
            format!("returned value misbehaves: {}", outcome.message)
        }
    };
    let culprit = outcome
        .offset
        .and_then(|offset| usize::try_from(offset).ok())
        .and_then(|offset| lines.get(offset));
    match culprit {
        Some(line) => format!("{description}: {what} (at `{line}`)"),
        None => format!("{description}: {what}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_counts() {
        let mut acc = ResultAccumulator::default();
        acc.record(true);
        acc.record(false);
        acc.record(true);
        assert_eq!(acc.successes(), 2);
        assert_eq!(acc.failures(), 1);
        assert_eq!(acc.total(), 3);
    }

    #[test]
    fn test_summary_sentence() {
        let mut acc = ResultAccumulator::default();
        for passed in [true, true, false] {
            acc.record(passed);
        }
        assert_eq!(
            acc.summary(),
            "Out of 3 total checks, 2 were successful and 1 were failures."
        );
    }

    fn outcome(kind: DiagnosticKind, offset: i64, message: &str) -> ProbeOutcome {
        ProbeOutcome {
            offset: Some(offset),
            message: message.to_string(),
            kind,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    fn probed() -> Vec<String> {
        vec!["obj = 'x'".to_string(), "ret = obj.f(42)".to_string()]
    }

    #[test]
    fn test_failure_names_the_offending_line() {
        let out = outcome(DiagnosticKind::Error, 1, "argument was of type int");
        assert_eq!(
            failure_text("String.f(Number)", FailureSite::Call, &out, &probed()),
            "String.f(Number): argument was of type int (at `ret = obj.f(42)`)"
        );
    }

    #[test]
    fn test_failure_offset_outside_probed_lines() {
        let out = outcome(DiagnosticKind::Error, 5, "odd");
        assert_eq!(
            failure_text("f()", FailureSite::ReturnValue, &out, &probed()),
            "f(): returned value misbehaves: odd"
        );
        let out = outcome(DiagnosticKind::Error, -1, "before");
        assert_eq!(failure_text("f()", FailureSite::Setup, &out, &[]), "f(): setup failed: before");
    }

    #[test]
    fn test_warning_failures_are_tagged() {
        let out = outcome(DiagnosticKind::Warning, 0, "Deprecated features used");
        assert_eq!(
            failure_text("f()", FailureSite::Setup, &out, &probed()),
            "f(): (WARNING) Deprecated features used (at `obj = 'x'`)"
        );
    }

    #[test]
    fn test_crash_keeps_attribution() {
        let out = outcome(DiagnosticKind::Crash, 0, "Meson has crashed");
        assert_eq!(
            failure_text("f()", FailureSite::Setup, &out, &probed()),
            "f(): meson crashed (at `obj = 'x'`)"
        );
    }
}
