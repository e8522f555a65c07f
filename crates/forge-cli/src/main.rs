//! Terminal entrypoint for the dataforge bridge.
//!
//! The binary delegates to [`forge_cli::run`], which loads configuration,
//! runs `dataforge` on every file argument, and renders the outcomes.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Worker threads log to stderr, so the handles are not held locked.
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    forge_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
