//! Shared test utilities for the CLI end-to-end tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_fake_tool("gcloud", scripts::RECORD_AND_SUCCEED);
//!     fixture.command().arg("deploy").arg("hello").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::scripts;
    pub use super::TestFixture;
}

/// Fake `gcloud` and `git` executables.
///
/// Every script appends its arguments to `calls.log` next to itself.
#[allow(dead_code)]
pub mod scripts {
    /// Records the call; a `set-iam-policy` call also keeps a copy of the
    /// policy document as `policy.json`.
    pub const RECORD_AND_SUCCEED: &str = r#"#!/bin/sh
printf '%s\n' "$*" >> "$(dirname "$0")/calls.log"
if [ "$2" = "set-iam-policy" ]; then
    for last; do :; done
    cp "$last" "$(dirname "$0")/policy.json"
fi
exit 0
"#;

    /// Records the call, complains on stderr and exits with status 3.
    pub const RECORD_AND_FAIL: &str = r#"#!/bin/sh
printf '%s\n' "$*" >> "$(dirname "$0")/calls.log"
echo "ERROR: (gcloud.functions.deploy) PERMISSION_DENIED" >&2
exit 3
"#;

    /// Never finishes on its own.
    pub const HANG: &str = r#"#!/bin/sh
exec sleep 30
"#;

    /// Fake `git clone`: creates the destination with a `shared` package.
    pub const CLONE: &str = r#"#!/bin/sh
printf '%s\n' "$*" >> "$(dirname "$0")/calls.log"
mkdir -p "$6/shared"
echo "from functions.shared.db import connect" > "$6/shared/store.py"
echo "token" > "$6/shared/.token"
exit 0
"#;

    /// Fake `git clone` that starts writing the destination and then hangs
    /// on its first call; later calls behave like [`CLONE`].
    pub const HANG_THEN_CLONE: &str = r#"#!/bin/sh
log="$(dirname "$0")/calls.log"
[ -f "$log" ] && first=no || first=yes
printf '%s\n' "$*" >> "$log"
mkdir -p "$6/shared"
if [ "$first" = yes ]; then
    echo "partial" > "$6/shared/half.py"
    exec sleep 30
fi
echo "from functions.shared.db import connect" > "$6/shared/store.py"
exit 0
"#;

    /// Fake `git clone` that cannot find the branch.
    pub const CLONE_FAIL: &str = r#"#!/bin/sh
printf '%s\n' "$*" >> "$(dirname "$0")/calls.log"
echo "fatal: Remote branch $4 not found in upstream origin" >&2
exit 128
"#;
}

/// A temporary workspace with optional fake tools.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add an empty directory.
    pub fn with_dir(self, path: &str) -> Self {
        self.temp_dir
            .child(path)
            .create_dir_all()
            .expect("Failed to create directory");
        self
    }

    /// Install an executable script under `bin/<name>`.
    #[cfg(unix)]
    pub fn with_fake_tool(self, name: &str, script: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let path = self.tool_path(name);
        fs::create_dir_all(path.parent().expect("bin has a parent")).expect("Failed to create bin");
        fs::write(&path, script).expect("Failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make script executable");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of a fake tool installed with `with_fake_tool`.
    pub fn tool_path(&self, name: &str) -> PathBuf {
        self.path().join("bin").join(name)
    }

    /// Lines recorded by the fake tools, empty if none ran.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.path().join("bin/calls.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Read a file relative to the fixture root.
    pub fn read(&self, path: &str) -> String {
        fs::read_to_string(self.path().join(path)).expect("Failed to read file")
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A command running in this fixture's directory with color and
    /// inherited configuration switched off.
    pub fn command(&self) -> assert_cmd::Command {
        self.command_in("")
    }

    /// Like `command`, running in a subdirectory of the fixture.
    pub fn command_in(&self, dir: &str) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("function-deploy");
        cmd.current_dir(self.path().join(dir))
            .env_remove("RUST_LOG")
            .env_remove("FUNCTION_DEPLOY_GCLOUD")
            .env_remove("FUNCTION_DEPLOY_GIT")
            .env_remove("FUNCTION_DEPLOY_OVERRIDE")
            .env_remove("FUNCTION_DEPLOY_TIMEOUT")
            .arg("--color")
            .arg("never");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
