//! Import-common command implementation
//!
//! Makes a function self-contained: imports of the common package in the
//! function's own files are retargeted to the function package, then the
//! common tree is copied in (hidden files excluded).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use function_deploy::output::OutputConfig;
use function_deploy::pipeline::{self, ImportOptions, RemoteSource, DEFAULT_COMMON_PACKAGE, DEFAULT_REMOTE_BRANCH};
use function_deploy::process::SystemCommandRunner;
use function_deploy::remote::DEFAULT_GIT_PROGRAM;

/// Arguments for the import-common command
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// The path of the function to import into
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub function_path: PathBuf,

    /// The directory containing the common files (relative to the clone root with --remote-uri)
    #[arg(long, value_name = "PATH", default_value = "../common")]
    pub common_path: PathBuf,

    /// The base package of the common code; replaced with the function package
    #[arg(long, value_name = "PACKAGE", default_value = DEFAULT_COMMON_PACKAGE)]
    pub common_package: String,

    /// The base package of the function; derived from the directory names when omitted
    #[arg(long, value_name = "PACKAGE")]
    pub function_package: Option<String>,

    /// Git URI the common files are cloned from
    #[arg(long, value_name = "URI")]
    pub remote_uri: Option<String>,

    /// The remote's branch to clone
    #[arg(long, value_name = "BRANCH", default_value = DEFAULT_REMOTE_BRANCH)]
    pub remote_branch: String,

    /// Base path remotes are cloned into
    #[arg(long, value_name = "PATH", default_value = "../remotes")]
    pub remote_clone_path: PathBuf,

    /// Git executable
    #[arg(long, value_name = "PATH", env = "FUNCTION_DEPLOY_GIT", default_value = DEFAULT_GIT_PROGRAM)]
    pub git: String,

    /// Seconds a clone may run before it is killed
    #[arg(long, value_name = "SECS", env = "FUNCTION_DEPLOY_TIMEOUT", default_value_t = 300)]
    pub command_timeout: u64,
}

/// Execute the import-common command
pub fn execute(args: ImportArgs, output: &OutputConfig) -> Result<()> {
    let remote = args.remote_uri.map(|uri| RemoteSource {
        uri,
        branch: args.remote_branch,
        clone_path: args.remote_clone_path,
        git_program: args.git,
    });
    let options = ImportOptions {
        function_path: args.function_path,
        common_path: args.common_path,
        common_package: args.common_package,
        function_package: args.function_package,
        remote,
    };

    let runner = SystemCommandRunner::new(Duration::from_secs(args.command_timeout));
    let report = pipeline::import_common(&options, &runner)?;

    println!(
        "{}",
        output.success(&format!(
            "Imported {} into {}",
            report.common_path.display(),
            options.function_path.display()
        ))
    );
    println!(
        "{}",
        output.detail(&format!(
            "{} of {} source file(s) retargeted to {}",
            report.rewrite.files_rewritten, report.rewrite.files_scanned, report.function_package
        ))
    );
    println!(
        "{}",
        output.detail(&format!("{} file(s) copied", report.merge.files_copied))
    );
    Ok(())
}
