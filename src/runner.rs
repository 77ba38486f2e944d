//! # Conformance Execution
//!
//! Runs fixtures through an engine and classifies what happened.
//!
//! The pipeline for one fixture is linear: parse the fixture, interpret its
//! header, create a fresh engine from the header, register the body, render
//! it, classify. Every fixture-local problem becomes an [`Outcome`]; only a
//! missing or unreadable test directory stops a run.

use std::path::PathBuf;

use serde::Serialize;

use crate::discovery::{FixtureLocator, FixtureSource, UnreadableFixture};
use crate::engine::{EngineFactory, EngineFailure, RenderOptions, TemplateEngine};
use crate::errors::{FixtureError, HarnessError};
use crate::fixture::{DelimiterMode, ParsedFixture};
use crate::header::{Expectation, Header};
use crate::report::{Reporter, RunResult};
use crate::taxonomy::{ErrorKind, ErrorTaxonomy};

// =============================================================================
// CORE TYPES
// =============================================================================

/// The classification of one fixture.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Outcome {
    /// Output matched, or the expected failure (or a specialization of it)
    /// was raised. `caught` names the raised kind in the latter case.
    Pass { caught: Option<ErrorKind> },
    OutputMismatch { expected: String, actual: String },
    MissingExpectedFailure { expected: ErrorKind },
    WrongFailureKind {
        expected: ErrorKind,
        actual: ErrorKind,
        message: String,
    },
    UnexpectedFailure { kind: ErrorKind, message: String },
    MalformedFixture { reason: String },
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Outcome::MalformedFixture { .. })
    }
}

/// One fixture's verdict as recorded by the reporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureRecord {
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Rendered diagnostic for malformed fixtures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl FixtureRecord {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, outcome: Outcome) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            outcome,
            diagnostic: None,
        }
    }

    fn malformed(name: impl Into<String>, path: impl Into<PathBuf>, error: &FixtureError) -> Self {
        Self {
            diagnostic: Some(error.render()),
            ..Self::new(
                name,
                path,
                Outcome::MalformedFixture {
                    reason: error.to_string(),
                },
            )
        }
    }
}

// =============================================================================
// EXECUTOR
// =============================================================================

/// Classifies engine results against a fixture's expectation.
#[derive(Debug, Clone, Copy)]
pub struct ConformanceExecutor<'t> {
    taxonomy: &'t ErrorTaxonomy,
}

impl<'t> ConformanceExecutor<'t> {
    pub fn new(taxonomy: &'t ErrorTaxonomy) -> Self {
        Self { taxonomy }
    }

    /// Registers `body` under `template_name`, renders it and classifies the
    /// result. A failure while registering is treated like a render failure.
    pub fn execute<E: TemplateEngine>(
        &self,
        engine: &mut E,
        template_name: &str,
        body: &str,
        expected: &str,
        options: RenderOptions,
        expectation: Expectation,
    ) -> Outcome {
        let rendered = engine
            .add_template(template_name, body)
            .and_then(|()| engine.render(template_name, options));
        self.classify(expectation, rendered, expected)
    }

    pub fn classify(
        &self,
        expectation: Expectation,
        rendered: Result<String, EngineFailure>,
        expected: &str,
    ) -> Outcome {
        match (rendered, expectation) {
            (Ok(_), Expectation::FailureExpected(kind)) => {
                Outcome::MissingExpectedFailure { expected: kind }
            }
            (Ok(actual), Expectation::NoFailureExpected) => {
                if actual.trim() == expected.trim() {
                    Outcome::Pass { caught: None }
                } else {
                    Outcome::OutputMismatch {
                        expected: expected.to_string(),
                        actual,
                    }
                }
            }
            (Err(failure), Expectation::NoFailureExpected) => Outcome::UnexpectedFailure {
                kind: failure.kind,
                message: failure.message,
            },
            (Err(failure), Expectation::FailureExpected(kind))
                if self.taxonomy.is_a(failure.kind, kind) =>
            {
                Outcome::Pass {
                    caught: Some(failure.kind),
                }
            }
            (Err(failure), Expectation::FailureExpected(kind)) => Outcome::WrongFailureKind {
                expected: kind,
                actual: failure.kind,
                message: failure.message,
            },
        }
    }
}

// =============================================================================
// HARNESS
// =============================================================================

/// Configuration for one harness run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub root: PathBuf,
    /// Accepted fixture extensions; empty accepts every file.
    pub extensions: Vec<String>,
    pub delimiters: DelimiterMode,
    /// Stop after the first fixture that does not pass.
    pub fail_fast: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("tests"),
            extensions: Vec::new(),
            delimiters: DelimiterMode::default(),
            fail_fast: false,
        }
    }
}

/// Drives every fixture under a root directory through an engine.
pub struct Harness<F> {
    factory: F,
    config: RunConfig,
}

impl<F: EngineFactory> Harness<F> {
    pub fn new(factory: F, config: RunConfig) -> Self {
        Self { factory, config }
    }

    /// Runs every fixture, feeding verdicts to `reporter` in discovery order.
    ///
    /// Fails before reporting anything if the test directory cannot be read.
    pub fn run<W: termcolor::WriteColor>(
        &self,
        mut reporter: Reporter<W>,
    ) -> Result<RunResult, HarnessError> {
        let locator = FixtureLocator::new(&self.config.root)?
            .with_extensions(self.config.extensions.iter().cloned());
        reporter.begin().map_err(HarnessError::Report)?;

        for entry in &locator {
            let record = match entry {
                Ok(source) => self.evaluate(&source),
                Err(UnreadableFixture { name, path, error }) => {
                    tracing::warn!(path = %path.display(), %error, "skipping unreadable fixture");
                    FixtureRecord::malformed(name, path, &error)
                }
            };
            let halt = self.config.fail_fast && !record.outcome.is_pass();
            reporter.record(record).map_err(HarnessError::Report)?;
            if halt {
                tracing::debug!("halting after first fixture that did not pass");
                reporter.halt();
                break;
            }
        }

        reporter.finish().map_err(HarnessError::Report)
    }

    /// Parses, interprets and executes a single fixture.
    pub fn evaluate(&self, source: &FixtureSource) -> FixtureRecord {
        let path_label = source.path.display().to_string();
        tracing::debug!(fixture = %source.template_name, path = %path_label, "running fixture");

        match self.prepare(&path_label, source) {
            Ok(outcome) => FixtureRecord::new(&source.logical_name, &source.path, outcome),
            Err(error) => FixtureRecord::malformed(&source.logical_name, &source.path, &error),
        }
    }

    fn prepare(&self, path_label: &str, source: &FixtureSource) -> Result<Outcome, FixtureError> {
        let fixture = ParsedFixture::parse(path_label, &source.raw_text, self.config.delimiters)?;
        let taxonomy = self.factory.taxonomy();
        let header = Header::interpret(&fixture, taxonomy)?;
        tracing::debug!(
            fixture = %source.template_name,
            expectation = ?header.expectation,
            options = ?header.options,
            "header interpreted"
        );

        let mut engine = self.factory.create(&header.config);
        let outcome = ConformanceExecutor::new(taxonomy).execute(
            &mut engine,
            &source.template_name,
            fixture.body.text,
            fixture.expected.text,
            header.options,
            header.expectation,
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::KindDecl;

    const BASE: ErrorKind = ErrorKind::new("TemplateError");
    const UNDEFINED: ErrorKind = ErrorKind::new("UndefinedVariableError");
    const SYNTAX: ErrorKind = ErrorKind::new("TemplateSyntaxError");

    fn taxonomy() -> ErrorTaxonomy {
        ErrorTaxonomy::new(&[
            KindDecl::root(BASE),
            KindDecl::child(UNDEFINED, BASE),
            KindDecl::child(SYNTAX, BASE),
        ])
        .unwrap()
    }

    #[test]
    fn trimmed_output_match_passes() {
        let taxonomy = taxonomy();
        let executor = ConformanceExecutor::new(&taxonomy);
        let outcome = executor.classify(
            Expectation::NoFailureExpected,
            Ok("  Hello World\n".to_string()),
            "\nHello World  \n",
        );
        assert_eq!(outcome, Outcome::Pass { caught: None });
    }

    #[test]
    fn internal_whitespace_is_significant() {
        let taxonomy = taxonomy();
        let executor = ConformanceExecutor::new(&taxonomy);
        let outcome = executor.classify(
            Expectation::NoFailureExpected,
            Ok("a\nb".to_string()),
            "a\n  b\n",
        );
        assert_eq!(
            outcome,
            Outcome::OutputMismatch {
                expected: "a\n  b\n".to_string(),
                actual: "a\nb".to_string()
            }
        );
    }

    #[test]
    fn failure_kinds_are_matched_through_the_taxonomy() {
        let taxonomy = taxonomy();
        let executor = ConformanceExecutor::new(&taxonomy);
        let raised = || Err(EngineFailure::new(UNDEFINED, "undefined variable 'x'"));

        assert_eq!(
            executor.classify(Expectation::FailureExpected(UNDEFINED), raised(), ""),
            Outcome::Pass {
                caught: Some(UNDEFINED)
            }
        );
        assert_eq!(
            executor.classify(Expectation::FailureExpected(BASE), raised(), ""),
            Outcome::Pass {
                caught: Some(UNDEFINED)
            }
        );
        assert_eq!(
            executor.classify(Expectation::FailureExpected(SYNTAX), raised(), ""),
            Outcome::WrongFailureKind {
                expected: SYNTAX,
                actual: UNDEFINED,
                message: "undefined variable 'x'".to_string()
            }
        );
        assert_eq!(
            executor.classify(Expectation::NoFailureExpected, raised(), ""),
            Outcome::UnexpectedFailure {
                kind: UNDEFINED,
                message: "undefined variable 'x'".to_string()
            }
        );
    }

    #[test]
    fn success_when_failure_expected_is_missing_failure() {
        let taxonomy = taxonomy();
        let executor = ConformanceExecutor::new(&taxonomy);
        let outcome = executor.classify(
            Expectation::FailureExpected(UNDEFINED),
            Ok("rendered anyway".to_string()),
            "placeholder",
        );
        assert_eq!(outcome, Outcome::MissingExpectedFailure { expected: UNDEFINED });
    }

    #[test]
    fn outcome_serializes_with_verdict_tag() {
        let record = FixtureRecord::new(
            "hello",
            "tests/hello.tpl",
            Outcome::WrongFailureKind {
                expected: SYNTAX,
                actual: UNDEFINED,
                message: "m".to_string(),
            },
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["verdict"], "wrong_failure_kind");
        assert_eq!(json["expected"], "TemplateSyntaxError");
        assert_eq!(json["actual"], "UndefinedVariableError");
        assert_eq!(json["name"], "hello");
        assert!(json.get("diagnostic").is_none());
    }
}
