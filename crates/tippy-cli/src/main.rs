//! CLI entrypoint for the Tippy devnet controller.
//!
//! The binary delegates to [`tippy_cli::run`], which loads configuration,
//! parses the command and drives the process supervisor.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    tippy_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
