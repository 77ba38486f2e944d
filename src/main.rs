use std::process::ExitCode;

fn main() -> ExitCode {
    tmplcheck::cli::run()
}
