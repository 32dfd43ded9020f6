//! Deploy command implementation
//!
//! Flags the tool does not recognize are forwarded to the deploy backend
//! untouched, in order, wherever they appear, so backend flags can be given
//! directly:
//!
//! ```bash
//! function-deploy deploy hello --project acme-prod --invoker user:a@x.com \
//!     --runtime=python311 --trigger-http
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use function_deploy::deploy::{DeployRequest, DEFAULT_PROGRAM};
use function_deploy::iam::{GrantTarget, IamPolicyComposer};
use function_deploy::output::OutputConfig;
use function_deploy::params::{DeployParams, OVERRIDE_FILE_NAME};
use function_deploy::pipeline::{self, DeploySettings};
use function_deploy::process::SystemCommandRunner;

/// Arguments for the deploy command
#[derive(Args, Debug)]
#[command(
    after_help = "Any other flag, anywhere on the command line, is forwarded to the deploy backend unchanged (e.g. --runtime=python311 --trigger-http). Use -- to forward everything that follows."
)]
pub struct DeployArgs {
    /// Function name
    pub name: String,

    /// The project where the function will be deployed
    #[arg(long)]
    pub project: String,

    /// Invoker authorisation; repeatable, each value may be comma-separated
    #[arg(long = "invoker", value_name = "PRINCIPALS")]
    pub invokers: Vec<String>,

    /// Deploy backend executable
    #[arg(long, value_name = "PATH", env = "FUNCTION_DEPLOY_GCLOUD", default_value = DEFAULT_PROGRAM)]
    pub gcloud: String,

    /// Override document with project-specific deploy parameters
    #[arg(long, value_name = "PATH", env = "FUNCTION_DEPLOY_OVERRIDE", default_value = OVERRIDE_FILE_NAME)]
    pub override_file: PathBuf,

    /// Seconds each backend command may run before it is killed
    #[arg(long, value_name = "SECS", env = "FUNCTION_DEPLOY_TIMEOUT", default_value_t = 300)]
    pub command_timeout: u64,

    /// Print the commands without running them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Flags forwarded verbatim to the deploy backend, collected by
    /// `Cli::parse_with_passthrough`
    #[arg(skip)]
    pub passthrough: Vec<String>,
}

/// Execute the deploy command
pub fn execute(args: DeployArgs, output: &OutputConfig) -> Result<()> {
    let work_dir = std::env::current_dir()?;
    let request = DeployRequest::new(args.name, args.project)
        .with_invokers(args.invokers)
        .with_passthrough(args.passthrough);
    let settings = DeploySettings {
        program: args.gcloud,
        override_file: args.override_file,
        work_dir,
    };

    let plan = pipeline::plan_deploy(&request, &DeployParams::builtin(), &settings)?;
    println!("{}", output.step(&plan.deploy.to_string()));

    if args.dry_run {
        if let Some(region) = &plan.invoker_region {
            let composer = IamPolicyComposer::new(settings.program.as_str(), settings.work_dir.as_path());
            let target = GrantTarget {
                project: &request.project,
                function: &request.name,
                region,
            };
            let command = composer.policy_command(&target, &composer.policy_path());
            println!("{}", output.step(&command.join(" ")));
        }
        return Ok(());
    }

    let runner = SystemCommandRunner::new(Duration::from_secs(args.command_timeout));
    pipeline::execute_plan(&request, &plan, &settings, &runner)?;

    println!("{}", output.success(&format!("Deployed {}", request.name)));
    if let Some(region) = &plan.invoker_region {
        println!(
            "{}",
            output.detail(&format!("Invoker policy applied in {}", region))
        );
    }
    Ok(())
}
