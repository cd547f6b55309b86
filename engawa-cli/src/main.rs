//! CLI entry point for the engawa clustering pipeline.
//!
//! Logging is installed before anything else so every later step can emit
//! structured diagnostics. The run itself lives in [`engawa_cli::cli`]; the
//! binary only maps its outcome to an exit code, logging the engine's stable
//! error codes on failure.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use engawa_cli::{
    cli::{Cli, CliError, Summary, render_summary, run_cli},
    logging,
};

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    match run_cli(Cli::parse()) {
        Ok(summary) => match write_summary(&summary) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!(error = %err, "failed to write summary");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            report_failure(&err);
            ExitCode::FAILURE
        }
    }
}

fn write_summary(summary: &Summary) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    render_summary(summary, &mut stdout)?;
    stdout.flush()
}

/// Logs a failed run, attaching the stable engine codes when the failure came
/// out of the core pipeline.
fn report_failure(err: &CliError) {
    if let CliError::Core(core) = err {
        error!(
            error = %err,
            code = core.code().as_str(),
            dataset_code = ?core.dataset_code().map(|c| c.as_str()),
            "clustering failed"
        );
    } else {
        error!(error = %err, "command failed");
    }
}
