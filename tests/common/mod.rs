//! Shared helpers for the integration tests: fixture files in a temporary
//! directory and a scripted engine whose behavior is spelled out in the
//! template body.
#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use termcolor::NoColor;
use tmplcheck::engine::{EngineFactory, EngineFailure, RenderOptions, TemplateEngine};
use tmplcheck::header::FixtureConfig;
use tmplcheck::report::{ReportFormat, Reporter};
use tmplcheck::runner::{Harness, RunConfig};
use tmplcheck::taxonomy::{ErrorKind, ErrorTaxonomy, KindDecl};
use tmplcheck::{HarnessError, RunResult};

pub const BASE: ErrorKind = ErrorKind::new("BaseError");
pub const CHILD: ErrorKind = ErrorKind::new("ChildError");
pub const OTHER: ErrorKind = ErrorKind::new("OtherError");

// =====================
// Fixture files
// =====================

pub fn fixture_text(header: &str, body: &str, expected: &str) -> String {
    format!("---\n{header}\n---\n{body}\n---\n{expected}\n")
}

pub fn write_fixture(root: &Path, relative: &str, header: &str, body: &str, expected: &str) {
    write_raw(root, relative, &fixture_text(header, body, expected));
}

pub fn write_raw(root: &Path, relative: &str, contents: impl AsRef<[u8]>) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

// =====================
// Scripted engine
// =====================

/// Bodies are scripts:
/// - `reject <Kind>` fails when the template is registered,
/// - `raise <Kind>` fails when it is rendered,
/// - `echo <key>` renders the context value of `key`,
/// - anything else renders unchanged.
#[derive(Clone)]
pub struct ScriptedFactory {
    taxonomy: ErrorTaxonomy,
    pub created: Rc<RefCell<Vec<FixtureConfig>>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self {
            taxonomy: ErrorTaxonomy::new(&[
                KindDecl::root(BASE),
                KindDecl::child(CHILD, BASE),
                KindDecl::root(OTHER),
            ])
            .unwrap(),
            created: Rc::default(),
        }
    }

    pub fn engines_created(&self) -> usize {
        self.created.borrow().len()
    }
}

pub struct ScriptedEngine {
    context: FixtureConfig,
    templates: Vec<(String, String)>,
    taxonomy: ErrorTaxonomy,
}

impl EngineFactory for ScriptedFactory {
    type Engine = ScriptedEngine;

    fn taxonomy(&self) -> &ErrorTaxonomy {
        &self.taxonomy
    }

    fn create(&self, context: &FixtureConfig) -> ScriptedEngine {
        self.created.borrow_mut().push(context.clone());
        ScriptedEngine {
            context: context.clone(),
            templates: Vec::new(),
            taxonomy: self.taxonomy.clone(),
        }
    }
}

impl ScriptedEngine {
    fn failure(&self, name: &str) -> EngineFailure {
        let kind = self.taxonomy.resolve(name).unwrap();
        EngineFailure::new(kind, format!("scripted {name}"))
    }
}

impl TemplateEngine for ScriptedEngine {
    fn add_template(&mut self, name: &str, source: &str) -> Result<(), EngineFailure> {
        if let Some(kind) = source.trim().strip_prefix("reject ") {
            return Err(self.failure(kind));
        }
        assert!(
            self.templates.is_empty(),
            "each fixture gets a fresh engine"
        );
        self.templates.push((name.to_string(), source.to_string()));
        Ok(())
    }

    fn render(&self, name: &str, _options: RenderOptions) -> Result<String, EngineFailure> {
        let (_, source) = self
            .templates
            .iter()
            .find(|(registered, _)| registered == name)
            .expect("rendered a template that was never registered");
        let script = source.trim();
        if let Some(kind) = script.strip_prefix("raise ") {
            return Err(self.failure(kind));
        }
        if let Some(key) = script.strip_prefix("echo ") {
            return Ok(self
                .context
                .get(key)
                .map(|v| v.to_string())
                .unwrap_or_default());
        }
        Ok(source.clone())
    }
}

// =====================
// Running
// =====================

/// Runs the harness with a text reporter and returns the result and output.
pub fn run_text<F: EngineFactory>(factory: F, config: RunConfig) -> Result<(RunResult, String), HarnessError> {
    run_with(factory, config, ReportFormat::Text)
}

pub fn run_with<F: EngineFactory>(
    factory: F,
    config: RunConfig,
    format: ReportFormat,
) -> Result<(RunResult, String), HarnessError> {
    let mut buffer = NoColor::new(Vec::new());
    let result = Harness::new(factory, config).run(Reporter::new(&mut buffer, format))?;
    Ok((result, String::from_utf8(buffer.into_inner()).unwrap()))
}

pub fn config_for(root: &Path) -> RunConfig {
    RunConfig {
        root: root.to_path_buf(),
        ..RunConfig::default()
    }
}
