//! Conformance-test harness for template engines.
//!
//! Fixtures are plain files with three `---`-delimited sections: a YAML
//! header, a template body and the expected output. The harness walks a
//! directory of fixtures, runs each one through a fresh engine and reports a
//! verdict per fixture.

pub use crate::engine::{EngineFactory, EngineFailure, RenderOptions, TemplateEngine};
pub use crate::errors::{FixtureError, HarnessError};
pub use crate::report::{Reporter, RunResult};
pub use crate::runner::{Harness, Outcome, RunConfig};
pub use crate::taxonomy::{ErrorKind, ErrorTaxonomy};

pub mod cli;
pub mod discovery;
pub mod engine;
pub mod errors;
pub mod fixture;
pub mod header;
pub mod report;
pub mod runner;
pub mod taxonomy;
