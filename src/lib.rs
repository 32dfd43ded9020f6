//! # Function Deploy Library
//!
//! Deployment orchestration for serverless functions built from a shared
//! "common" code library. It is the engine behind the `function-deploy`
//! command-line tool and covers two independent flows.
//!
//! ## Quick Example
//!
//! ```
//! use function_deploy::deploy::{DeployCommandBuilder, DeployRequest};
//! use function_deploy::params::DeployParams;
//!
//! let request = DeployRequest::new("hello", "acme-prod")
//!     .with_passthrough(vec!["--trigger-http".to_string()]);
//! let command = DeployCommandBuilder::default().build(&request, &DeployParams::builtin());
//!
//! assert!(command.contains("--security-level=secure-always"));
//! assert!(command.contains("--region=europe-west1"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Parameters (`params`)**: built-in deploy defaults merged with the
//!   project's optional `deploy.json`.
//! - **Command synthesis (`deploy`)**: the ordered token list handed to the
//!   deploy backend, with trigger-specific flags and default back-fill.
//! - **Invoker provisioning (`iam`)**: a de-duplicated invoker policy applied
//!   after a successful deploy.
//! - **Remote trees (`remote`)**: clones of a remote common tree, cached by
//!   path.
//! - **Import rewriting (`rewrite`)** and **tree merge (`merge`)**: make a
//!   function self-contained by retargeting its common imports and copying
//!   the common tree into it.
//! - **External commands (`process`)**: the single seam through which
//!   `gcloud` and `git` are run, with a hard timeout.
//!
//! The `pipeline` module strings these together into the deploy and import
//! flows.

pub mod deploy;
pub mod error;
pub mod iam;
pub mod merge;
pub mod output;
pub mod params;
pub mod pipeline;
pub mod process;
pub mod remote;
pub mod rewrite;
