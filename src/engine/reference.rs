//! A small reference engine, so the harness runs out of the box and its own
//! end-to-end tests have something real to drive.
//!
//! Syntax:
//! - `{{ name }}` substitutes the context value `name`.
//! - `{# ... #}` is a comment, dropped unless `keep_comments` is set, in which
//!   case it is emitted verbatim.
//!
//! Unless `keep_whitespace` is set, every output line is trimmed and blank
//! lines are dropped.

use std::collections::HashMap;

use crate::engine::{EngineFactory, EngineFailure, EngineSettings, RenderOptions, TemplateEngine};
use crate::header::FixtureConfig;
use crate::taxonomy::{ErrorKind, ErrorTaxonomy, KindDecl, TaxonomyError};

// =============================================================================
// ERROR TAXONOMY
// =============================================================================

pub const TEMPLATE_ERROR: ErrorKind = ErrorKind::new("TemplateError");
pub const TEMPLATE_SYNTAX_ERROR: ErrorKind = ErrorKind::new("TemplateSyntaxError");
pub const UNCLOSED_TAG_ERROR: ErrorKind = ErrorKind::new("UnclosedTagError");
pub const EMPTY_TAG_ERROR: ErrorKind = ErrorKind::new("EmptyTagError");
pub const RENDER_ERROR: ErrorKind = ErrorKind::new("RenderError");
pub const UNDEFINED_VARIABLE_ERROR: ErrorKind = ErrorKind::new("UndefinedVariableError");
pub const TEMPLATE_NOT_FOUND_ERROR: ErrorKind = ErrorKind::new("TemplateNotFoundError");

pub const TAXONOMY: &[KindDecl] = &[
    KindDecl::root(TEMPLATE_ERROR),
    KindDecl::child(TEMPLATE_SYNTAX_ERROR, TEMPLATE_ERROR),
    KindDecl::child(UNCLOSED_TAG_ERROR, TEMPLATE_SYNTAX_ERROR),
    KindDecl::child(EMPTY_TAG_ERROR, TEMPLATE_SYNTAX_ERROR),
    KindDecl::child(RENDER_ERROR, TEMPLATE_ERROR),
    KindDecl::child(UNDEFINED_VARIABLE_ERROR, RENDER_ERROR),
    KindDecl::child(TEMPLATE_NOT_FOUND_ERROR, TEMPLATE_ERROR),
];

// =============================================================================
// FACTORY
// =============================================================================

#[derive(Debug, Clone)]
pub struct ReferenceEngineFactory {
    taxonomy: ErrorTaxonomy,
    settings: EngineSettings,
}

impl ReferenceEngineFactory {
    pub fn new(settings: EngineSettings) -> Result<Self, TaxonomyError> {
        Ok(Self {
            taxonomy: ErrorTaxonomy::new(TAXONOMY)?,
            settings,
        })
    }
}

impl EngineFactory for ReferenceEngineFactory {
    type Engine = ReferenceEngine;

    fn taxonomy(&self) -> &ErrorTaxonomy {
        &self.taxonomy
    }

    fn create(&self, context: &FixtureConfig) -> ReferenceEngine {
        ReferenceEngine::new(context.clone(), self.settings)
    }
}

// =============================================================================
// ENGINE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Variable { name: String, line: usize },
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct ReferenceEngine {
    context: FixtureConfig,
    settings: EngineSettings,
    templates: HashMap<String, Vec<Segment>>,
}

impl ReferenceEngine {
    pub fn new(context: FixtureConfig, settings: EngineSettings) -> Self {
        Self {
            context,
            settings,
            templates: HashMap::new(),
        }
    }
}

impl TemplateEngine for ReferenceEngine {
    fn add_template(&mut self, name: &str, source: &str) -> Result<(), EngineFailure> {
        let segments = compile(source)?;
        if self.settings.verbose {
            tracing::debug!(template = name, segments = segments.len(), "template registered");
        }
        self.templates.insert(name.to_string(), segments);
        Ok(())
    }

    fn render(&self, name: &str, options: RenderOptions) -> Result<String, EngineFailure> {
        let segments = self.templates.get(name).ok_or_else(|| {
            EngineFailure::new(TEMPLATE_NOT_FOUND_ERROR, format!("no template named '{name}'"))
        })?;

        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Variable { name, line } => {
                    let value = self.context.get(name).ok_or_else(|| {
                        EngineFailure::new(
                            UNDEFINED_VARIABLE_ERROR,
                            format!("undefined variable '{name}' on line {line}"),
                        )
                    })?;
                    out.push_str(&value.to_string());
                }
                Segment::Comment(raw) if options.keep_comments => out.push_str(raw),
                Segment::Comment(_) => {}
            }
        }

        if !options.keep_whitespace {
            out = out
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
        }

        if self.settings.verbose {
            tracing::debug!(template = name, ?options, bytes = out.len(), "template rendered");
        }
        Ok(out)
    }
}

fn compile(source: &str) -> Result<Vec<Segment>, EngineFailure> {
    let mut segments = Vec::new();
    let mut rest = source;
    let mut consumed = 0;

    loop {
        let open = match (rest.find("{{"), rest.find("{#")) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let Some(open) = open else {
            if !rest.is_empty() {
                segments.push(Segment::Text(rest.to_string()));
            }
            return Ok(segments);
        };
        if open > 0 {
            segments.push(Segment::Text(rest[..open].to_string()));
        }

        let tag = &rest[open..];
        let line = line_of(source, consumed + open);
        let (opener, closer) = if tag.starts_with("{{") { ("{{", "}}") } else { ("{#", "#}") };
        let Some(close) = tag[2..].find(closer) else {
            return Err(EngineFailure::new(
                UNCLOSED_TAG_ERROR,
                format!("unclosed '{opener}' on line {line}"),
            ));
        };
        let whole = &tag[..close + 4];
        let inner = &tag[2..close + 2];

        if opener == "{#" {
            segments.push(Segment::Comment(whole.to_string()));
        } else {
            let name = inner.trim();
            if name.is_empty() {
                return Err(EngineFailure::new(
                    EMPTY_TAG_ERROR,
                    format!("empty '{{{{ }}}}' on line {line}"),
                ));
            }
            segments.push(Segment::Variable {
                name: name.to_string(),
                line,
            });
        }

        let advance = open + whole.len();
        rest = &rest[advance..];
        consumed += advance;
    }
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}
