//! The engine contract the harness drives.
//!
//! An engine is consumed through two operations only: register a template
//! under a name, then render it by name. Failures carry a kind from the
//! engine's published [`ErrorTaxonomy`] so fixtures can name the failure they
//! expect.
//!
//! Engines are created per fixture by an [`EngineFactory`], which receives
//! the fixture's decoded header as the render context. Run-wide engine
//! settings (verbose logging) are fixed when the factory is built.

use serde::Serialize;
use thiserror::Error;

use crate::header::FixtureConfig;
use crate::taxonomy::{ErrorKind, ErrorTaxonomy};

pub mod reference;

/// Options passed to every render call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderOptions {
    pub keep_whitespace: bool,
    pub keep_comments: bool,
}

/// Run-wide engine configuration, set once before the first fixture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineSettings {
    pub verbose: bool,
}

/// A failure raised by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct EngineFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl EngineFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub trait TemplateEngine {
    /// Registers `source` under `name`. Syntax errors may surface here.
    fn add_template(&mut self, name: &str, source: &str) -> Result<(), EngineFailure>;

    /// Renders a previously registered template.
    fn render(&self, name: &str, options: RenderOptions) -> Result<String, EngineFailure>;
}

pub trait EngineFactory {
    type Engine: TemplateEngine;

    /// The engine's error taxonomy, used to resolve fixture expectations.
    fn taxonomy(&self) -> &ErrorTaxonomy;

    /// A fresh engine for one fixture.
    fn create(&self, context: &FixtureConfig) -> Self::Engine;
}
