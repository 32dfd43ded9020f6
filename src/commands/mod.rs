//! # CLI Command Implementations
//!
//! Each subcommand of the `function-deploy` tool lives in its own file with:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args`, calls into the
//!   `function_deploy` library and reports progress on stdout.

pub mod completions;
pub mod deploy;
pub mod import;
