//! # Header Interpretation
//!
//! The header section is a flat YAML mapping. Three keys mean something to
//! the harness:
//!
//! - `exception`: required. `nil` when the template must render, otherwise
//!   the name of the engine error kind the render must raise.
//! - `config/keepWhitespace`, `config/keepComments`: render options,
//!   `false` when absent.
//!
//! Every key, recognized or not, is also handed to the engine as its render
//! context.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_yaml::Value;

use crate::engine::RenderOptions;
use crate::errors::FixtureError;
use crate::fixture::ParsedFixture;
use crate::taxonomy::{ErrorKind, ErrorTaxonomy};

pub const EXCEPTION_KEY: &str = "exception";
pub const NO_EXCEPTION: &str = "nil";
pub const KEEP_WHITESPACE_KEY: &str = "config/keepWhitespace";
pub const KEEP_COMMENTS_KEY: &str = "config/keepComments";

// =============================================================================
// CORE TYPES
// =============================================================================

/// A scalar header value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Null => Ok(()),
            HeaderValue::Bool(b) => write!(f, "{b}"),
            HeaderValue::Int(n) => write!(f, "{n}"),
            HeaderValue::Float(x) => write!(f, "{x}"),
            HeaderValue::String(s) => f.write_str(s),
        }
    }
}

/// The decoded header: a flat mapping from key to scalar value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureConfig {
    entries: BTreeMap<String, HeaderValue>,
}

impl FixtureConfig {
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, HeaderValue)> for FixtureConfig {
    fn from_iter<I: IntoIterator<Item = (String, HeaderValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// What the fixture requires of the render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    NoFailureExpected,
    FailureExpected(ErrorKind),
}

/// Everything the header decides for one fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub config: FixtureConfig,
    pub expectation: Expectation,
    pub options: RenderOptions,
}

// =============================================================================
// INTERPRETATION
// =============================================================================

impl Header {
    /// Decodes the header of `fixture` and resolves its expectation against
    /// the engine's error taxonomy.
    pub fn interpret(fixture: &ParsedFixture<'_>, taxonomy: &ErrorTaxonomy) -> Result<Self, FixtureError> {
        let config = decode(fixture)?;
        let expectation = resolve_expectation(&config, fixture, taxonomy)?;
        let options = RenderOptions {
            keep_whitespace: flag(&config, KEEP_WHITESPACE_KEY, fixture)?,
            keep_comments: flag(&config, KEEP_COMMENTS_KEY, fixture)?,
        };
        Ok(Self {
            config,
            expectation,
            options,
        })
    }
}

/// Parses the header text into a flat mapping. An empty header is an empty
/// mapping.
pub fn decode(fixture: &ParsedFixture<'_>) -> Result<FixtureConfig, FixtureError> {
    let header = fixture.header;
    let document: Value = serde_yaml::from_str(header.text).map_err(|e| {
        let at = e.location().map_or(0, |loc| loc.index());
        FixtureError::HeaderSyntax {
            message: e.to_string(),
            src: fixture.named_source(),
            span: (header.offset(at), 0).into(),
        }
    })?;

    let mapping = match document {
        Value::Null => return Ok(FixtureConfig::default()),
        Value::Mapping(mapping) => mapping,
        other => {
            return Err(shape_error(
                fixture,
                format!("the header is {}, not a mapping", describe(&other)),
            ))
        }
    };

    let mut entries = BTreeMap::new();
    for (key, value) in mapping {
        let Value::String(key) = key else {
            return Err(shape_error(
                fixture,
                format!("keys must be strings, found {}", describe(&key)),
            ));
        };
        let value = match value {
            Value::Null => HeaderValue::Null,
            Value::Bool(b) => HeaderValue::Bool(b),
            Value::String(s) => HeaderValue::String(s),
            Value::Number(n) => match n.as_i64() {
                Some(i) => HeaderValue::Int(i),
                None => HeaderValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            other => {
                return Err(shape_error(
                    fixture,
                    format!("value of '{key}' is {}", describe(&other)),
                ))
            }
        };
        entries.insert(key, value);
    }
    Ok(FixtureConfig { entries })
}

fn resolve_expectation(
    config: &FixtureConfig,
    fixture: &ParsedFixture<'_>,
    taxonomy: &ErrorTaxonomy,
) -> Result<Expectation, FixtureError> {
    let Some(value) = config.get(EXCEPTION_KEY) else {
        return Err(FixtureError::MissingKey {
            key: EXCEPTION_KEY,
            src: fixture.named_source(),
            span: header_span(fixture),
        });
    };
    let HeaderValue::String(name) = value else {
        return Err(invalid_value(fixture, EXCEPTION_KEY, "an error kind name or `nil`"));
    };
    if name == NO_EXCEPTION {
        return Ok(Expectation::NoFailureExpected);
    }
    taxonomy
        .resolve(name)
        .map(Expectation::FailureExpected)
        .map_err(|unknown| FixtureError::UnknownKind {
            unknown,
            src: fixture.named_source(),
            span: key_span(fixture, EXCEPTION_KEY),
        })
}

fn flag(config: &FixtureConfig, key: &str, fixture: &ParsedFixture<'_>) -> Result<bool, FixtureError> {
    match config.get(key) {
        None => Ok(false),
        Some(HeaderValue::Bool(b)) => Ok(*b),
        Some(HeaderValue::String(word)) => {
            yaml11_bool(word).ok_or_else(|| invalid_value(fixture, key, "a boolean"))
        }
        Some(_) => Err(invalid_value(fixture, key, "a boolean")),
    }
}

/// YAML 1.1 boolean words, which YAML 1.2 reads as plain strings.
fn yaml11_bool(word: &str) -> Option<bool> {
    match word {
        "y" | "Y" | "yes" | "Yes" | "YES" | "on" | "On" | "ON" => Some(true),
        "n" | "N" | "no" | "No" | "NO" | "off" | "Off" | "OFF" => Some(false),
        _ => None,
    }
}

// =============================================================================
// DIAGNOSTIC HELPERS
// =============================================================================

fn shape_error(fixture: &ParsedFixture<'_>, reason: String) -> FixtureError {
    FixtureError::HeaderShape {
        reason,
        src: fixture.named_source(),
        span: header_span(fixture),
    }
}

fn invalid_value(fixture: &ParsedFixture<'_>, key: &str, expected: &'static str) -> FixtureError {
    FixtureError::InvalidValue {
        key: key.to_string(),
        expected,
        src: fixture.named_source(),
        span: key_span(fixture, key),
    }
}

fn header_span(fixture: &ParsedFixture<'_>) -> miette::SourceSpan {
    let span = fixture.header.span();
    (span.start, span.len()).into()
}

/// Span of the line defining `key`, falling back to the whole header.
fn key_span(fixture: &ParsedFixture<'_>, key: &str) -> miette::SourceSpan {
    let text = fixture.header.text;
    let mut line_start = 0;
    for line in text.split_inclusive('\n') {
        if defines_key(line, key) {
            let line = line.trim_end();
            return (fixture.header.offset(line_start), line.len()).into();
        }
        line_start += line.len();
    }
    header_span(fixture)
}

/// True when `line` is `key:`, optionally quoted, at the start of the line.
fn defines_key(line: &str, key: &str) -> bool {
    let unquoted = line.trim_start_matches(['\'', '"']);
    unquoted
        .strip_prefix(key)
        .map(|rest| rest.trim_start_matches(['\'', '"']).trim_start())
        .is_some_and(|rest| rest.starts_with(':'))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
