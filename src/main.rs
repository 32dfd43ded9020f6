//! # Function Deploy CLI
//!
//! This is the binary entry point for the `function-deploy` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Translating failures into a diagnostic on stderr and an exit status. A
//!   failed `gcloud` invocation exits with `gcloud`'s own status.
//!
//! The core application logic is defined in the `lib.rs` library crate, ensuring
//! that the binary is a thin wrapper around the reusable library functionality.

mod cli;
mod commands;

use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cli::Cli::parse_with_passthrough();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<function_deploy::error::Error>()
                .map(|error| error.exit_code())
                .unwrap_or(function_deploy::error::EXIT_FAILURE);
            ExitCode::from(code)
        }
    }
}
