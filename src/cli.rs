//! Command-line entry point.
//!
//! Exit status: 0 when every fixture passed (including an empty run), 1 when
//! any fixture failed or was malformed, 2 when the run could not start.

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{
    engine::{reference::ReferenceEngineFactory, EngineSettings},
    fixture::DelimiterMode,
    report::{ColorMode, ReportConfig, ReportFormat},
    runner::{Harness, RunConfig},
    HarnessError,
};

// ============================================================================
// CLI ARGUMENTS
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "tmplcheck",
    version,
    about = "Run template conformance fixtures against the reference engine."
)]
pub struct Args {
    /// Directory containing the fixtures.
    #[arg(default_value = "tests")]
    pub path: PathBuf,

    /// Only run files with this extension. Repeatable; default is every file.
    #[arg(short = 'e', long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// How the three section delimiters are chosen.
    #[arg(long, value_enum, default_value_t = DelimiterMode::Greedy)]
    pub delimiters: DelimiterMode,

    /// Stop the run at the first fixture that does not pass.
    #[arg(long)]
    pub fail_fast: bool,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Debug logging for the harness and the engine.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            root: self.path.clone(),
            extensions: self.extensions.clone(),
            delimiters: self.delimiters,
            fail_fast: self.fail_fast,
        }
    }

    pub fn report_config(&self) -> ReportConfig {
        ReportConfig {
            format: self.format,
            color: self.color,
        }
    }
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

pub fn run() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match execute(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            print_error(e);
            ExitCode::from(2)
        }
    }
}

/// Runs the harness and returns whether every fixture passed.
pub fn execute(args: &Args) -> Result<bool, HarnessError> {
    let factory = ReferenceEngineFactory::new(EngineSettings {
        verbose: args.verbose,
    })?;
    let harness = Harness::new(factory, args.run_config());
    let result = harness.run(args.report_config().stdout())?;
    Ok(result.all_passed())
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    // A second init (as in tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn print_error(e: HarnessError) {
    let report = miette::Report::new(e);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_behavior() {
        let args = Args::parse_from(["tmplcheck"]);
        let config = args.run_config();
        assert_eq!(config.root, PathBuf::from("tests"));
        assert!(config.extensions.is_empty());
        assert_eq!(config.delimiters, DelimiterMode::Greedy);
        assert!(!config.fail_fast);
        assert_eq!(args.report_config(), ReportConfig::default());
    }

    #[test]
    fn flags_are_parsed() {
        let args = Args::parse_from([
            "tmplcheck",
            "fixtures",
            "-e",
            "tpl",
            "--ext",
            ".txt",
            "--delimiters",
            "first",
            "--fail-fast",
            "--format",
            "json",
            "--color",
            "never",
            "-v",
        ]);
        let config = args.run_config();
        assert_eq!(config.root, PathBuf::from("fixtures"));
        assert_eq!(config.extensions, vec!["tpl".to_string(), ".txt".to_string()]);
        assert_eq!(config.delimiters, DelimiterMode::First);
        assert!(config.fail_fast);
        assert_eq!(args.format, ReportFormat::Json);
        assert_eq!(args.color, ColorMode::Never);
        assert!(args.verbose);
    }
}
