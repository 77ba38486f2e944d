//! Error types for the harness.
//!
//! Two families live here. [`HarnessError`] is fatal: it stops the run before
//! any fixture is evaluated. [`FixtureError`] is local to one fixture: the
//! pipeline converts it into a `MalformedFixture` outcome and moves on.
//!
//! Fixture errors carry the fixture text as a `miette` source so reports can
//! point at the offending region.

use std::io;
use std::path::PathBuf;

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, NamedSource, SourceSpan};
use thiserror::Error;

use crate::taxonomy::{TaxonomyError, UnknownErrorKind};

// =============================================================================
// FATAL ERRORS
// =============================================================================

#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("cannot read test directory '{}'", path.display())]
    #[diagnostic(
        code(tmplcheck::io),
        help("pass the fixture directory as the first argument")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{}' is not a directory", path.display())]
    #[diagnostic(code(tmplcheck::io))]
    NotADirectory { path: PathBuf },

    #[error("engine declares an invalid error taxonomy")]
    #[diagnostic(code(tmplcheck::engine::taxonomy))]
    Taxonomy(#[from] TaxonomyError),

    #[error("failed to write report")]
    #[diagnostic(code(tmplcheck::report))]
    Report(#[source] io::Error),
}

// =============================================================================
// PER-FIXTURE ERRORS
// =============================================================================

#[derive(Debug, Error, Diagnostic)]
pub enum FixtureError {
    #[error("cannot read fixture '{}'", path.display())]
    #[diagnostic(code(tmplcheck::fixture::unreadable))]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot walk '{}': {message}", path.display())]
    #[diagnostic(code(tmplcheck::fixture::unreadable))]
    Walk { path: PathBuf, message: String },

    #[error("expected three '---' delimiter lines, found {found}")]
    #[diagnostic(
        code(tmplcheck::fixture::delimiters),
        help("a fixture is a '---' line, the YAML header, '---', the template body, '---', then the expected output")
    )]
    Delimiters {
        found: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("{label}")]
        span: SourceSpan,
        label: &'static str,
    },

    #[error("header is not valid YAML: {message}")]
    #[diagnostic(code(tmplcheck::header::syntax))]
    HeaderSyntax {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("header must be a flat mapping: {reason}")]
    #[diagnostic(
        code(tmplcheck::header::shape),
        help("header values must be strings, booleans, numbers or null")
    )]
    HeaderShape {
        reason: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("in this header")]
        span: SourceSpan,
    },

    #[error("header is missing required key '{key}'")]
    #[diagnostic(
        code(tmplcheck::header::missing_key),
        help("add `exception: nil` when the template is expected to render")
    )]
    MissingKey {
        key: &'static str,
        #[source_code]
        src: NamedSource<String>,
        #[label("in this header")]
        span: SourceSpan,
    },

    #[error("header key '{key}' must be {expected}")]
    #[diagnostic(code(tmplcheck::header::value))]
    InvalidValue {
        key: String,
        expected: &'static str,
        #[source_code]
        src: NamedSource<String>,
        #[label("this key")]
        span: SourceSpan,
    },

    #[error("{unknown}")]
    #[diagnostic(code(tmplcheck::header::unknown_kind))]
    UnknownKind {
        unknown: UnknownErrorKind,
        #[source_code]
        src: NamedSource<String>,
        #[label("not declared by the engine")]
        span: SourceSpan,
    },
}

impl FixtureError {
    /// Renders the full diagnostic without color, for reports and logs.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor());
        if handler.render_report(&mut out, self).is_err() {
            return self.to_string();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_diagnostic_points_into_fixture() {
        let err = FixtureError::Delimiters {
            found: 2,
            src: NamedSource::new("t/a.tpl", "---\nx: 1\n---\nbody\n".to_string()),
            span: (17, 0).into(),
            label: "third delimiter expected here",
        };
        let rendered = err.render();
        assert!(rendered.contains("found 2"));
        assert!(rendered.contains("t/a.tpl"));
        assert!(rendered.contains("third delimiter expected here"));
    }

    #[test]
    fn io_error_names_the_directory() {
        let err = HarnessError::Io {
            path: PathBuf::from("missing-dir"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        let report = miette::Report::new(err);
        let output = format!("{report:?}");
        assert!(output.contains("missing-dir"));
    }
}
