//! CLI argument parsing and command dispatch
//!
//! `deploy` forwards every flag it does not recognize to the deploy backend.
//! Such flags may appear anywhere on the command line, interleaved with the
//! tool's own options, so the arguments are split before clap sees them:
//! recognized options (and their values) plus the function name go to clap,
//! everything else becomes the pass-through list in its original order.

use std::collections::HashMap;
use std::ffi::OsString;

use anyhow::Result;
use clap::{Command, CommandFactory, Parser, Subcommand};

use crate::commands;

const DEPLOY_COMMAND: &str = "deploy";

/// Function Deploy - Deploy serverless functions built from shared common code
#[derive(Parser, Debug)]
#[command(name = "function-deploy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deploy a function, then grant invokers if any were given
    Deploy(commands::deploy::DeployArgs),

    /// Import the common package into a function's source tree
    ImportCommon(commands::import::ImportArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Parse the process arguments, routing unrecognized `deploy` flags to
    /// the pass-through list.
    pub fn parse_with_passthrough() -> Self {
        Self::parse_from_with_passthrough(std::env::args_os())
    }

    fn parse_from_with_passthrough<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let (args, passthrough) = split_passthrough(args);
        let mut cli = Self::parse_from(args);
        if let Commands::Deploy(deploy) = &mut cli.command {
            deploy.passthrough = passthrough;
        }
        cli
    }

    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let output = function_deploy::output::OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Deploy(args) => commands::deploy::execute(args, &output),
            Commands::ImportCommon(args) => commands::import::execute(args, &output),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A logger may already be installed when running under a test harness.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

/// Options a command accepts, keyed by name, mapped to whether they take a
/// value.
#[derive(Debug, Default)]
struct OptionTable {
    longs: HashMap<String, bool>,
    shorts: HashMap<char, bool>,
}

impl OptionTable {
    fn extend_from(&mut self, cmd: &Command) {
        for arg in cmd.get_arguments().filter(|arg| !arg.is_positional()) {
            let takes_value = arg.get_action().takes_values();
            if let Some(long) = arg.get_long() {
                self.longs.insert(long.to_string(), takes_value);
            }
            if let Some(short) = arg.get_short() {
                self.shorts.insert(short, takes_value);
            }
        }
    }

    /// `Some(needs_next_token)` when `token` is a recognized option.
    fn lookup(&self, token: &str) -> Option<bool> {
        if let Some(long) = token.strip_prefix("--") {
            let (name, inline) = match long.split_once('=') {
                Some((name, _)) => (name, true),
                None => (long, false),
            };
            return self.longs.get(name).map(|takes_value| *takes_value && !inline);
        }

        let mut chars = token.strip_prefix('-')?.chars();
        match (chars.next(), chars.next()) {
            (Some(short), None) => self.shorts.get(&short).copied(),
            _ => None,
        }
    }
}

/// Splits raw arguments into those clap should parse and the `deploy`
/// pass-through tokens.
///
/// Arguments of any other subcommand are returned untouched. For `deploy`:
///
/// - a recognized option keeps its value token, wherever it appears
/// - the first bare token is the function name
/// - any other token is passed through, as is everything after `--`
fn split_passthrough<I, T>(args: I) -> (Vec<OsString>, Vec<String>)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut cmd = Cli::command();
    cmd.build();

    let mut root = OptionTable::default();
    root.extend_from(&cmd);
    let mut options = OptionTable::default();
    options.extend_from(&cmd);
    if let Some(deploy) = cmd.find_subcommand(DEPLOY_COMMAND) {
        options.extend_from(deploy);
    }

    let mut tokens = args.into_iter().map(Into::<OsString>::into);
    let mut known: Vec<OsString> = tokens.by_ref().take(1).collect();
    let mut passthrough = Vec::new();

    // Global options up to the subcommand.
    loop {
        let Some(token) = tokens.next() else {
            return (known, passthrough);
        };
        let text = token.to_string_lossy().into_owned();
        known.push(token);
        if !text.starts_with('-') {
            if text != DEPLOY_COMMAND {
                known.extend(tokens.by_ref());
                return (known, passthrough);
            }
            break;
        }
        if root.lookup(&text) == Some(true) {
            known.extend(tokens.next());
        }
    }

    let mut has_name = false;
    while let Some(token) = tokens.next() {
        let text = token.to_string_lossy().into_owned();
        if text == "--" {
            passthrough.extend(tokens.by_ref().map(|t| t.to_string_lossy().into_owned()));
            break;
        }
        if text.starts_with('-') && text.len() > 1 {
            match options.lookup(&text) {
                Some(needs_value) => {
                    known.push(token);
                    if needs_value {
                        known.extend(tokens.next());
                    }
                }
                None => passthrough.push(text),
            }
        } else if !has_name {
            has_name = true;
            known.push(token);
        } else {
            passthrough.push(text);
        }
    }

    (known, passthrough)
}
