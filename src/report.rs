//! Per-fixture verdicts and the run summary.
//!
//! The reporter accumulates records in processing order. In text mode it
//! writes one line per fixture as it arrives (plus failure detail) and a
//! summary at the end; in JSON mode it stays silent until [`Reporter::finish`]
//! and then writes the whole run as one document.

use std::io;

use difference::{Changeset, Difference};
use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::runner::{FixtureRecord, Outcome};

// =============================================================================
// CONFIGURATION
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorMode {
    /// Color when stdout is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn choice(self) -> ColorChoice {
        match self {
            ColorMode::Auto if atty::is(atty::Stream::Stdout) => ColorChoice::Auto,
            ColorMode::Auto => ColorChoice::Never,
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
        }
    }
}

/// How the run is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportConfig {
    pub format: ReportFormat,
    pub color: ColorMode,
}

impl ReportConfig {
    /// A reporter writing to stdout.
    pub fn stdout(&self) -> Reporter<StandardStream> {
        Reporter::new(StandardStream::stdout(self.color.choice()), self.format)
    }
}

// =============================================================================
// RUN RESULT
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub malformed: usize,
}

/// Every verdict of a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunResult {
    #[serde(rename = "fixtures")]
    pub records: Vec<FixtureRecord>,
    /// The run stopped early at a fixture that did not pass.
    pub halted: bool,
}

impl RunResult {
    /// True when every fixture passed. A run with no fixtures passes.
    pub fn all_passed(&self) -> bool {
        self.records.iter().all(|r| r.outcome.is_pass())
    }

    pub fn summary(&self) -> Summary {
        let total = self.records.len();
        let passed = self.records.iter().filter(|r| r.outcome.is_pass()).count();
        let malformed = self.records.iter().filter(|r| r.outcome.is_malformed()).count();
        Summary {
            total,
            passed,
            failed: total - passed - malformed,
            malformed,
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    run: &'a RunResult,
    summary: Summary,
    all_passed: bool,
}

// =============================================================================
// REPORTER
// =============================================================================

pub struct Reporter<W> {
    out: W,
    format: ReportFormat,
    result: RunResult,
}

impl<W: WriteColor> Reporter<W> {
    pub fn new(out: W, format: ReportFormat) -> Self {
        Self {
            out,
            format,
            result: RunResult::default(),
        }
    }

    pub fn begin(&mut self) -> io::Result<()> {
        if self.format == ReportFormat::Text {
            writeln!(self.out, "*** Start Tests ***")?;
        }
        Ok(())
    }

    pub fn record(&mut self, record: FixtureRecord) -> io::Result<()> {
        if self.format == ReportFormat::Text {
            self.write_record(&record)?;
        }
        self.result.records.push(record);
        Ok(())
    }

    pub fn halt(&mut self) {
        self.result.halted = true;
    }

    pub fn finish(mut self) -> io::Result<RunResult> {
        match self.format {
            ReportFormat::Text => self.write_summary()?,
            ReportFormat::Json => {
                let report = JsonReport {
                    run: &self.result,
                    summary: self.result.summary(),
                    all_passed: self.result.all_passed(),
                };
                serde_json::to_writer_pretty(&mut self.out, &report)?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()?;
        Ok(self.result)
    }

    // =========================================================================
    // TEXT OUTPUT
    // =========================================================================

    fn write_record(&mut self, record: &FixtureRecord) -> io::Result<()> {
        let (label, color) = match record.outcome {
            Outcome::Pass { .. } => (" OK ", Color::Green),
            Outcome::MalformedFixture { .. } => ("ERR ", Color::Yellow),
            _ => ("FAIL", Color::Red),
        };
        self.marker(label, color)?;
        write!(self.out, " {} ({})", record.name, record.path.display())?;

        match &record.outcome {
            Outcome::Pass { caught: None } => writeln!(self.out),
            Outcome::Pass { caught: Some(kind) } => {
                writeln!(self.out, ": caught expected {kind}")
            }
            Outcome::OutputMismatch { expected, actual } => {
                writeln!(self.out, ": output does not match expected")?;
                self.write_diff(expected, actual)
            }
            Outcome::MissingExpectedFailure { expected } => {
                writeln!(self.out, ": expected failure {expected} was not raised")
            }
            Outcome::WrongFailureKind {
                expected,
                actual,
                message,
            } => {
                writeln!(self.out, ": expected failure {expected}, caught {actual}")?;
                writeln!(self.out, "    {message}")
            }
            Outcome::UnexpectedFailure { kind, message } => {
                writeln!(self.out, ": no failure expected, caught {kind}")?;
                writeln!(self.out, "    {message}")
            }
            Outcome::MalformedFixture { reason } => {
                writeln!(self.out, ": malformed fixture: {reason}")?;
                match &record.diagnostic {
                    Some(diagnostic) => self.write_indented(diagnostic),
                    None => Ok(()),
                }
            }
        }
    }

    /// Line diff of the trimmed expected and actual output.
    fn write_diff(&mut self, expected: &str, actual: &str) -> io::Result<()> {
        let changeset = Changeset::new(expected.trim(), actual.trim(), "\n");
        for diff in &changeset.diffs {
            let (prefix, text, color) = match diff {
                Difference::Same(x) => ("  ", x, None),
                Difference::Rem(x) => ("- ", x, Some(Color::Red)),
                Difference::Add(x) => ("+ ", x, Some(Color::Green)),
            };
            if let Some(color) = color {
                self.out.set_color(ColorSpec::new().set_fg(Some(color)))?;
            }
            for line in text.split('\n') {
                writeln!(self.out, "    {prefix}{line}")?;
            }
            self.out.reset()?;
        }
        Ok(())
    }

    fn write_indented(&mut self, text: &str) -> io::Result<()> {
        for line in text.lines() {
            writeln!(self.out, "    {line}")?;
        }
        Ok(())
    }

    fn write_summary(&mut self) -> io::Result<()> {
        let summary = self.result.summary();
        writeln!(
            self.out,
            "\n*** Done: {} fixtures, {} passed, {} failed, {} malformed ***",
            summary.total, summary.passed, summary.failed, summary.malformed
        )?;
        if self.result.halted {
            writeln!(self.out, "Run halted at the first fixture that did not pass.")?;
        }
        if self.result.all_passed() {
            self.out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
            writeln!(self.out, "All fixtures passed.")?;
        } else {
            self.out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
            writeln!(self.out, "Some fixtures did not pass.")?;
        }
        self.out.reset()
    }

    fn marker(&mut self, label: &str, color: Color) -> io::Result<()> {
        self.out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        write!(self.out, "[{label}]")?;
        self.out.reset()
    }
}
