//! # Remote Common Trees
//!
//! The common package can live in another repository. [`RemoteFetcher`]
//! clones it to a deterministic location under a base directory:
//!
//! ```text
//! <base>/<owner>/<repository>/<branch>
//! ```
//!
//! The directory doubles as the cache. If it already exists the clone is
//! skipped without looking at what is inside, so repeated imports are cheap
//! but can serve stale content until the directory is removed.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use regex::Regex;

use crate::error::{Error, Result};
use crate::process::CommandRunner;

/// Program used for clones when no other is configured.
pub const DEFAULT_GIT_PROGRAM: &str = "git";

const HTTPS_GIT_PATTERN: &str = r"^https://([^/]+)/([^/]+)/([^/]+)\.git$";

/// Identity of a remote repository parsed from its HTTPS clone URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteReference {
    pub uri: String,
    pub host: String,
    pub owner: String,
    pub repository: String,
}

impl RemoteReference {
    /// Parses `https://<host>/<owner>/<repository>.git`.
    pub fn parse(uri: &str) -> Result<Self> {
        let pattern = Regex::new(HTTPS_GIT_PATTERN)?;
        let captures = pattern.captures(uri).ok_or_else(|| Error::InvalidReference {
            uri: uri.to_string(),
        })?;

        Ok(Self {
            uri: uri.to_string(),
            host: captures[1].to_string(),
            owner: captures[2].to_string(),
            repository: captures[3].to_string(),
        })
    }

    /// Where `branch` of this repository lives under `base`.
    pub fn local_path(&self, base: &Path, branch: &str) -> PathBuf {
        base.join(&self.owner).join(&self.repository).join(branch)
    }
}

/// Clones remotes into a path-keyed cache.
pub struct RemoteFetcher<'a> {
    git_program: String,
    runner: &'a dyn CommandRunner,
}

impl<'a> RemoteFetcher<'a> {
    pub fn new(git_program: impl Into<String>, runner: &'a dyn CommandRunner) -> Self {
        Self {
            git_program: git_program.into(),
            runner,
        }
    }

    /// The clone invocation for `branch` of `reference` into `destination`.
    pub fn clone_command(&self, reference: &RemoteReference, branch: &str, destination: &Path) -> Vec<String> {
        vec![
            self.git_program.clone(),
            "clone".to_string(),
            "--depth=1".to_string(),
            "--branch".to_string(),
            branch.to_string(),
            reference.uri.clone(),
            destination.display().to_string(),
        ]
    }

    /// Makes `branch` of `uri` available locally and returns its path.
    ///
    /// An existing directory at the target path is reused as-is. A failed
    /// clone leaves nothing behind at that path.
    pub fn fetch(&self, uri: &str, branch: &str, base: &Path) -> Result<PathBuf> {
        let reference = RemoteReference::parse(uri)?;
        let destination = reference.local_path(base, branch);

        if destination.exists() {
            info!("Remote already cloned at {}, moving on", destination.display());
            return Ok(destination);
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let command = self.clone_command(&reference, branch, &destination);
        debug!("{}", command.join(" "));

        let message = match self.runner.run(&command) {
            Ok(outcome) if outcome.success() => {
                info!("Cloned {} ({}) into {}", uri, branch, destination.display());
                return Ok(destination);
            }
            Ok(outcome) => format!(
                "git exited with {}: {}",
                outcome
                    .status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "no status".to_string()),
                outcome.stderr.trim()
            ),
            Err(e) => e.to_string(),
        };

        // Whatever a failed clone left behind would be taken for a cache hit
        // on the next fetch.
        discard_partial_clone(&destination);
        Err(Error::FetchFailed {
            uri: uri.to_string(),
            branch: branch.to_string(),
            message,
        })
    }
}

fn discard_partial_clone(destination: &Path) {
    if !destination.exists() {
        return;
    }
    match fs::remove_dir_all(destination) {
        Ok(()) => debug!("Removed partial clone at {}", destination.display()),
        Err(e) => warn!(
            "Could not remove partial clone at {}: {}",
            destination.display(),
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::RecordingRunner;
    use crate::process::CommandOutcome;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_reference() {
        let reference = RemoteReference::parse("https://github.com/acme/functions.git").unwrap();
        assert_eq!(reference.host, "github.com");
        assert_eq!(reference.owner, "acme");
        assert_eq!(reference.repository, "functions");
    }

    #[test]
    fn test_parse_rejects_other_forms() {
        for uri in [
            "git@github.com:acme/functions.git",
            "https://github.com/acme/functions",
            "https://github.com/acme/group/functions.git",
            "http://github.com/acme/functions.git",
            "https://github.com/acme/functionsxgit",
        ] {
            assert!(
                matches!(RemoteReference::parse(uri), Err(Error::InvalidReference { .. })),
                "{} should be rejected",
                uri
            );
        }
    }

    #[test]
    fn test_fetch_clones_into_deterministic_path() {
        let temp_dir = TempDir::new().unwrap();
        let runner = RecordingRunner::new();
        let fetcher = RemoteFetcher::new("git", &runner);

        let path = fetcher
            .fetch("https://github.com/acme/functions.git", "develop", temp_dir.path())
            .unwrap();

        let expected = temp_dir.path().join("acme").join("functions").join("develop");
        assert_eq!(path, expected);
        assert!(path.is_dir());

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec![
                "git".to_string(),
                "clone".to_string(),
                "--depth=1".to_string(),
                "--branch".to_string(),
                "develop".to_string(),
                "https://github.com/acme/functions.git".to_string(),
                expected.display().to_string(),
            ]
        );
    }

    #[test]
    fn test_fetch_reuses_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let runner = RecordingRunner::new();
        let fetcher = RemoteFetcher::new("git", &runner);
        let uri = "https://github.com/acme/functions.git";

        let first = fetcher.fetch(uri, "master", temp_dir.path()).unwrap();
        let second = fetcher.fetch(uri, "master", temp_dir.path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_fetch_invalid_uri_runs_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let runner = RecordingRunner::new();
        let fetcher = RemoteFetcher::new("git", &runner);

        let result = fetcher.fetch("ftp://example.com/acme/functions.git", "master", temp_dir.path());
        assert!(matches!(result, Err(Error::InvalidReference { .. })));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_fetch_failure() {
        let temp_dir = TempDir::new().unwrap();
        let runner = RecordingRunner::with_outcomes(vec![CommandOutcome {
            status: Some(128),
            stderr: "fatal: Remote branch nope not found in upstream origin\n".to_string(),
        }]);
        let fetcher = RemoteFetcher::new("git", &runner);

        let result = fetcher.fetch("https://github.com/acme/functions.git", "nope", temp_dir.path());
        match result {
            Err(Error::FetchFailed { branch, message, .. }) => {
                assert_eq!(branch, "nope");
                assert!(message.contains("128"));
                assert!(message.contains("not found in upstream"));
            }
            other => panic!("expected FetchFailed, got {:?}", other),
        }
        assert!(!temp_dir.path().join("acme/functions/nope").exists());
    }

    /// Creates the clone destination, then gives up as a killed `git` would.
    struct AbandonedClone;

    impl CommandRunner for AbandonedClone {
        fn run(&self, tokens: &[String]) -> Result<CommandOutcome> {
            let destination = Path::new(tokens.last().unwrap());
            fs::create_dir_all(destination.join(".git")).unwrap();
            fs::write(destination.join("half.py"), "import os\n").unwrap();
            Err(Error::CommandTimedOut {
                command: tokens.join(" "),
                timeout_secs: 0,
            })
        }
    }

    #[test]
    fn test_timed_out_clone_is_not_cached() {
        let temp_dir = TempDir::new().unwrap();
        let uri = "https://github.com/acme/functions.git";
        let destination = temp_dir.path().join("acme/functions/main");

        let result = RemoteFetcher::new("git", &AbandonedClone).fetch(uri, "main", temp_dir.path());
        match result {
            Err(Error::FetchFailed { message, .. }) => assert!(message.contains("timed out")),
            other => panic!("expected FetchFailed, got {:?}", other),
        }
        assert!(!destination.exists());

        // The next fetch clones again instead of serving the partial tree.
        let runner = RecordingRunner::new();
        let path = RemoteFetcher::new("git", &runner)
            .fetch(uri, "main", temp_dir.path())
            .unwrap();
        assert_eq!(path, destination);
        assert_eq!(runner.calls().len(), 1);
        assert!(!destination.join("half.py").exists());
    }

    #[test]
    fn test_failed_clone_removes_destination() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("acme/functions/main");

        struct FailingClone;
        impl CommandRunner for FailingClone {
            fn run(&self, tokens: &[String]) -> Result<CommandOutcome> {
                fs::create_dir_all(Path::new(tokens.last().unwrap())).unwrap();
                Ok(CommandOutcome::with_status(128))
            }
        }

        let result = RemoteFetcher::new("git", &FailingClone).fetch(
            "https://github.com/acme/functions.git",
            "main",
            temp_dir.path(),
        );
        assert!(matches!(result, Err(Error::FetchFailed { .. })));
        assert!(!destination.exists());
    }

    proptest! {
        #[test]
        fn prop_local_path_is_owner_repo_branch(
            host in "[a-z]{1,8}\\.(com|org)",
            owner in "[A-Za-z0-9_-]{1,10}",
            repo in "[A-Za-z0-9_-]{1,10}",
            branch in "[a-z0-9-]{1,10}",
        ) {
            let uri = format!("https://{}/{}/{}.git", host, owner, repo);
            let reference = RemoteReference::parse(&uri).unwrap();
            let base = Path::new("/remotes");
            prop_assert_eq!(
                reference.local_path(base, &branch),
                base.join(&owner).join(&repo).join(&branch)
            );
        }
    }
}
