//! # Pipelines
//!
//! The two end-to-end flows the binary exposes.
//!
//! ## Deploy
//!
//! 1. Resolve deploy parameters (built-in defaults + `deploy.json`).
//! 2. Build and run the deploy command.
//! 3. If invokers were requested, write the invoker policy and apply it in
//!    the resolved region, then remove the policy file.
//!
//! ## Import
//!
//! 1. Optionally clone the common tree from a remote.
//! 2. Check both trees are directories.
//! 3. Work out the function package.
//! 4. Rewrite the function's own imports of the common package.
//! 5. Merge the common tree into the function tree.
//!
//! Each flow stops at the first failing step. Nothing already done is rolled
//! back: a function that deployed before its invoker grant failed stays
//! deployed.

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::deploy::{resolve_region, DeployCommand, DeployCommandBuilder, DeployRequest};
use crate::error::{Error, Result};
use crate::iam::{GrantTarget, IamPolicyComposer};
use crate::merge::{ensure_directory, merge, MergeSummary};
use crate::params::{self, DeployParams};
use crate::process::{CommandOutcome, CommandRunner};
use crate::remote::RemoteFetcher;
use crate::rewrite::{ImportRewriter, RewriteSummary};

/// Default package of the shared common code.
pub const DEFAULT_COMMON_PACKAGE: &str = "functions.common";

/// Default branch cloned from a remote common tree.
pub const DEFAULT_REMOTE_BRANCH: &str = "master";

/// Where and how the deploy flow runs.
#[derive(Debug, Clone)]
pub struct DeploySettings {
    /// Deploy backend program.
    pub program: String,
    /// Location of the override document.
    pub override_file: PathBuf,
    /// Directory receiving the transient policy file.
    pub work_dir: PathBuf,
}

/// Commands the deploy flow ran (or would run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployPlan {
    pub params: DeployParams,
    pub deploy: DeployCommand,
    /// Region invokers are granted in, when invokers were requested.
    pub invoker_region: Option<String>,
}

/// Resolves parameters and synthesizes the deploy command without running it.
pub fn plan_deploy(
    request: &DeployRequest,
    defaults: &DeployParams,
    settings: &DeploySettings,
) -> Result<DeployPlan> {
    let params = params::resolve(defaults, &settings.override_file)?;
    let deploy = DeployCommandBuilder::new(settings.program.as_str()).build(request, &params);

    let invoker_region = if request.invokers.is_empty() {
        None
    } else {
        let region =
            resolve_region(&params, &request.passthrough)?.ok_or_else(|| Error::MissingParameter {
                key: "region".to_string(),
            })?;
        Some(region)
    };

    Ok(DeployPlan {
        params,
        deploy,
        invoker_region,
    })
}

/// Runs the deploy flow end to end.
pub fn deploy(
    request: &DeployRequest,
    defaults: &DeployParams,
    settings: &DeploySettings,
    runner: &dyn CommandRunner,
) -> Result<DeployPlan> {
    let plan = plan_deploy(request, defaults, settings)?;
    execute_plan(request, &plan, settings, runner)?;
    Ok(plan)
}

/// Runs a planned deploy and, when requested, the invoker grant.
pub fn execute_plan(
    request: &DeployRequest,
    plan: &DeployPlan,
    settings: &DeploySettings,
    runner: &dyn CommandRunner,
) -> Result<()> {
    info!("{}", plan.deploy);
    let outcome = runner.run(plan.deploy.tokens())?;
    check_outcome(&plan.deploy.to_string(), outcome)?;

    if let Some(region) = &plan.invoker_region {
        let composer = IamPolicyComposer::new(settings.program.as_str(), settings.work_dir.as_path());
        let target = GrantTarget {
            project: &request.project,
            function: &request.name,
            region,
        };
        let result = composer.grant_invokers(request.invokers.as_slice(), &target, runner);

        let policy_path = composer.policy_path();
        if policy_path.exists() {
            if let Err(e) = fs::remove_file(&policy_path) {
                warn!("Could not remove {}: {}", policy_path.display(), e);
            }
        }

        check_outcome("set-iam-policy", result?)?;
    }

    Ok(())
}

fn check_outcome(command: &str, outcome: CommandOutcome) -> Result<()> {
    if outcome.success() {
        return Ok(());
    }
    if !outcome.stderr.trim().is_empty() {
        error!("{}", outcome.stderr.trim_end());
    }
    Err(Error::ExternalCommandFailed {
        command: command.to_string(),
        status: outcome.status,
        stderr: outcome.stderr,
    })
}

/// Where the common tree comes from when it is not local.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    pub uri: String,
    pub branch: String,
    /// Base directory for clones.
    pub clone_path: PathBuf,
    /// `git` program.
    pub git_program: String,
}

/// Inputs of the import flow.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub function_path: PathBuf,
    /// Common tree; relative to the clone root when `remote` is set.
    pub common_path: PathBuf,
    pub common_package: String,
    pub function_package: Option<String>,
    pub remote: Option<RemoteSource>,
}

/// What the import flow did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub common_path: PathBuf,
    pub function_package: String,
    pub rewrite: RewriteSummary,
    pub merge: MergeSummary,
}

/// Derives the function package from the common package.
///
/// The common tree's directory name is replaced by the function tree's
/// directory name, so `functions.common` imported from `functions/common`
/// into `functions/billing` becomes `functions.billing`.
pub fn derive_function_package(common_package: &str, common_path: &Path, function_path: &Path) -> Result<String> {
    let common_dir = directory_name(common_path)?;
    let function_dir = directory_name(function_path)?;

    if common_dir.is_empty() || !common_package.contains(common_dir.as_str()) {
        return Err(Error::PackageResolution {
            common_package: common_package.to_string(),
            common_dir,
        });
    }
    Ok(common_package.replace(common_dir.as_str(), &function_dir))
}

fn directory_name(path: &Path) -> Result<String> {
    let resolved = fs::canonicalize(path).map_err(|_| Error::InvalidTree {
        path: path.display().to_string(),
    })?;
    Ok(resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default())
}

/// Runs the import flow end to end.
pub fn import_common(options: &ImportOptions, runner: &dyn CommandRunner) -> Result<ImportReport> {
    let common_path = match &options.remote {
        Some(remote) => {
            let fetcher = RemoteFetcher::new(remote.git_program.as_str(), runner);
            fetcher
                .fetch(&remote.uri, &remote.branch, &remote.clone_path)?
                .join(&options.common_path)
        }
        None => options.common_path.clone(),
    };

    ensure_directory(&options.function_path)?;
    ensure_directory(&common_path)?;

    let function_package = match &options.function_package {
        Some(package) => package.clone(),
        None => derive_function_package(&options.common_package, &common_path, &options.function_path)?,
    };
    info!(
        "Importing {} into {} as {}",
        options.common_package,
        options.function_path.display(),
        function_package
    );

    let rewritten = ImportRewriter::new(options.common_package.as_str(), function_package.as_str())?
        .rewrite_tree(&options.function_path)?;
    let merged = merge(&common_path, &options.function_path)?;

    Ok(ImportReport {
        common_path,
        function_package,
        rewrite: rewritten,
        merge: merged,
    })
}
