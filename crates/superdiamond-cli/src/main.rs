//! CLI entrypoint for the `superdiamond` configuration tool.
//!
//! The binary delegates to [`superdiamond_cli::run`], which parses arguments,
//! loads the requested configuration and writes it to stdout.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    superdiamond_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
