//! # Invoker Policy Provisioning
//!
//! After a successful deploy, principals passed with `--invoker` are granted
//! the invoker role on the function. The policy document is written to a
//! transient file next to the project and applied with
//! `gcloud functions set-iam-policy`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::process::{CommandOutcome, CommandRunner};

/// Role granted to every invoker.
pub const INVOKER_ROLE: &str = "roles/cloudfunctions.invoker";

/// File name of the transient policy document.
pub const POLICY_FILE_NAME: &str = "iam_file.json";

/// A single role binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBinding {
    pub role: String,
    pub members: Vec<String>,
}

/// Policy document accepted by `set-iam-policy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub bindings: Vec<PolicyBinding>,
}

impl PolicyDocument {
    /// A document granting [`INVOKER_ROLE`] to `members`.
    pub fn invokers(members: BTreeSet<String>) -> Self {
        Self {
            bindings: vec![PolicyBinding {
                role: INVOKER_ROLE.to_string(),
                members: members.into_iter().collect(),
            }],
        }
    }
}

/// Flattens comma-joined invoker specs into a duplicate-free member set.
///
/// Surrounding whitespace is trimmed and empty entries are dropped.
pub fn collect_members<S: AsRef<str>>(specs: &[S]) -> BTreeSet<String> {
    specs
        .iter()
        .flat_map(|spec| spec.as_ref().split(','))
        .map(str::trim)
        .filter(|member| !member.is_empty())
        .map(str::to_string)
        .collect()
}

/// Where a grant runs: which function, in which project and region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantTarget<'a> {
    pub project: &'a str,
    pub function: &'a str,
    pub region: &'a str,
}

/// Builds policy documents and the commands that apply them.
#[derive(Debug, Clone)]
pub struct IamPolicyComposer {
    program: String,
    work_dir: PathBuf,
}

impl IamPolicyComposer {
    /// `work_dir` is where the transient policy file is written.
    pub fn new(program: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Path of the transient policy file.
    pub fn policy_path(&self) -> PathBuf {
        self.work_dir.join(POLICY_FILE_NAME)
    }

    /// Serializes `document` to the transient policy file.
    pub fn write_policy(&self, document: &PolicyDocument) -> Result<PathBuf> {
        let path = self.policy_path();
        let json = serde_json::to_string(document)?;
        fs::write(&path, json)?;
        debug!("Wrote invoker policy to {}", path.display());
        Ok(path)
    }

    /// The `set-iam-policy` invocation applying `policy_file` to `target`.
    pub fn policy_command(&self, target: &GrantTarget<'_>, policy_file: &Path) -> Vec<String> {
        vec![
            self.program.clone(),
            "functions".to_string(),
            "set-iam-policy".to_string(),
            target.function.to_string(),
            format!("--project={}", target.project),
            format!("--region={}", target.region),
            policy_file.display().to_string(),
        ]
    }

    /// Grants the invoker role to every principal in `specs` and returns the
    /// outcome of the policy-apply command unchanged.
    ///
    /// The policy file is left in place; removing it is up to the caller.
    pub fn grant_invokers<S: AsRef<str>>(
        &self,
        specs: &[S],
        target: &GrantTarget<'_>,
        runner: &dyn CommandRunner,
    ) -> Result<CommandOutcome> {
        let document = PolicyDocument::invokers(collect_members(specs));
        let policy_file = self.write_policy(&document)?;
        let command = self.policy_command(target, &policy_file);

        info!("{}", command.join(" "));
        runner.run(&command)
    }
}
