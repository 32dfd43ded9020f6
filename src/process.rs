//! # External Command Execution
//!
//! Every external collaborator (the deploy backend, the policy-apply command
//! and `git`) is reached through the [`CommandRunner`] trait. The system
//! implementation spawns the program directly (never through a shell), waits
//! for it with a hard timeout and captures its standard error for
//! diagnostics. Standard output is inherited so the backend's progress output
//! reaches the user unchanged.
//!
//! Tests swap in a recording runner so pipelines can be exercised without
//! spawning real processes.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use log::debug;
use wait_timeout::ChildExt;

use crate::error::{Error, Result};

/// Timeout applied to every external command unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// What an external command left behind once it exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit status, or `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
}

impl CommandOutcome {
    /// An outcome with the given status and no diagnostic output.
    pub fn with_status(status: i32) -> Self {
        Self {
            status: Some(status),
            stderr: String::new(),
        }
    }

    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Trait for running external commands - allows mocking in tests
pub trait CommandRunner: Send + Sync {
    /// Runs `tokens[0]` with the remaining tokens as its arguments and blocks
    /// until it exits.
    ///
    /// A non-zero exit status is reported through the returned outcome, not
    /// as an error. Errors are reserved for commands that could not be
    /// started or that ran past their timeout.
    fn run(&self, tokens: &[String]) -> Result<CommandOutcome>;
}

/// Runs commands as child processes of the current process.
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    timeout: Duration,
}

impl SystemCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, tokens: &[String]) -> Result<CommandOutcome> {
        let (program, args) = tokens.split_first().ok_or_else(|| Error::CommandSpawn {
            program: String::new(),
            message: "empty command".to_string(),
        })?;

        debug!("Spawning {} with {} argument(s)", program, args.len());
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::CommandSpawn {
                program: program.clone(),
                message: e.to_string(),
            })?;

        // Drain stderr on a helper thread so a child writing more than the
        // pipe buffer cannot block while we wait on it.
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buffer = Vec::new();
                let _ = pipe.read_to_end(&mut buffer);
                buffer
            })
        });

        let Some(status) = child.wait_timeout(self.timeout)? else {
            let _ = child.kill();
            let _ = child.wait();
            // The reader thread is left detached: a grandchild may still hold
            // the pipe open.
            return Err(Error::CommandTimedOut {
                command: tokens.join(" "),
                timeout_secs: self.timeout.as_secs(),
            });
        };

        let stderr = stderr_reader
            .and_then(|reader| reader.join().ok())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();

        debug!("{} exited with {:?}", program, status.code());
        Ok(CommandOutcome {
            status: status.code(),
            stderr,
        })
    }
}
