//! # Deploy Command Synthesis
//!
//! Turns a [`DeployRequest`] and the resolved [`DeployParams`] into the exact
//! token sequence handed to the deploy backend. Token order is fixed:
//!
//! 1. program and subcommand (`gcloud functions deploy`) plus the function name
//! 2. explicit deploy flags from the request (`--project=...`)
//! 3. pass-through tokens, verbatim and in order
//! 4. `--security-level=secure-always` when an HTTP trigger is requested
//! 5. back-filled defaults for every parameter nothing above already covers
//!
//! "Covers" is deliberately loose: a parameter counts as present when any
//! token contains its name as a substring (see [`covers_parameter`]). The
//! same rule picks the region override out of the pass-through tokens in
//! [`resolve_region`].

use std::fmt;

use crate::error::{Error, Result};
use crate::params::DeployParams;

/// Program invoked when no other deploy backend is configured.
pub const DEFAULT_PROGRAM: &str = "gcloud";

/// Pass-through token that requests an HTTP trigger.
pub const HTTP_TRIGGER_FLAG: &str = "--trigger-http";

/// Flag appended whenever an HTTP trigger is requested.
pub const SECURE_ALWAYS_FLAG: &str = "--security-level=secure-always";

const REGION_KEY: &str = "region";

/// Everything the caller asked for in one deploy invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    /// Name of the function to deploy.
    pub name: String,
    /// Project the function is deployed to.
    pub project: String,
    /// Invoker specs, each possibly a comma-joined list of principals.
    pub invokers: Vec<String>,
    /// Flags not modeled by the request, forwarded verbatim.
    pub passthrough: Vec<String>,
}

impl DeployRequest {
    pub fn new(name: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
            invokers: Vec::new(),
            passthrough: Vec::new(),
        }
    }

    pub fn with_invokers(mut self, invokers: Vec<String>) -> Self {
        self.invokers = invokers;
        self
    }

    pub fn with_passthrough(mut self, passthrough: Vec<String>) -> Self {
        self.passthrough = passthrough;
        self
    }

    /// Deploy flags the caller set explicitly, in emission order.
    ///
    /// The name is positional and invokers are provisioned separately, so
    /// neither appears here.
    pub fn explicit_flags(&self) -> Vec<(&'static str, &str)> {
        vec![("project", self.project.as_str())]
    }

    /// Whether an HTTP trigger was requested.
    pub fn wants_http_trigger(&self) -> bool {
        self.passthrough.iter().any(|token| token == HTTP_TRIGGER_FLAG)
    }
}

/// A fully assembled command: program followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployCommand {
    tokens: Vec<String>,
}

impl DeployCommand {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }

    /// Whether some token equals `token` exactly.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }
}

impl fmt::Display for DeployCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

/// Whether `token` already accounts for the parameter `key`.
///
/// This is a plain substring test, so `--region-code=x` also covers
/// `region`. Both default back-fill and region resolution go through here.
pub fn covers_parameter(token: &str, key: &str) -> bool {
    token.contains(key)
}

/// Renders a parameter as a flag token.
pub fn flag_token(key: &str, value: Option<&str>) -> String {
    match value {
        Some(value) if !value.is_empty() => format!("--{}={}", key, value),
        _ => format!("--{}", key),
    }
}

/// Assembles deploy commands for one backend program.
#[derive(Debug, Clone)]
pub struct DeployCommandBuilder {
    program: String,
}

impl DeployCommandBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Builds the deploy command for `request` with `params` as defaults.
    pub fn build(&self, request: &DeployRequest, params: &DeployParams) -> DeployCommand {
        let mut tokens = vec![
            self.program.clone(),
            "functions".to_string(),
            "deploy".to_string(),
            request.name.clone(),
        ];

        for (flag, value) in request.explicit_flags() {
            tokens.push(format!("--{}={}", flag, value));
        }

        tokens.extend(request.passthrough.iter().cloned());

        if request.wants_http_trigger() {
            tokens.push(SECURE_ALWAYS_FLAG.to_string());
        }

        for (key, value) in params.iter() {
            if !tokens.iter().any(|token| covers_parameter(token, key)) {
                tokens.push(flag_token(key, value));
            }
        }

        DeployCommand { tokens }
    }
}

impl Default for DeployCommandBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

/// Determines the region the function ends up in.
///
/// The resolved `region` parameter is the default. Any pass-through token
/// covering `region` overrides it with the value after its first `=`, or
/// with the following token when it was given as `--region VALUE`; the last
/// one wins. A covering token without a value is an error, since the deploy
/// backend will not use the default region in that case either.
pub fn resolve_region(params: &DeployParams, passthrough: &[String]) -> Result<Option<String>> {
    let missing = || Error::MissingParameter {
        key: REGION_KEY.to_string(),
    };
    let mut region = params
        .get(REGION_KEY)
        .flatten()
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let mut tokens = passthrough.iter().peekable();
    while let Some(token) = tokens.next() {
        if !covers_parameter(token, REGION_KEY) {
            continue;
        }
        let value = match token.split_once('=') {
            Some((_, value)) => value,
            None => tokens
                .next_if(|next| !next.starts_with('-'))
                .map(String::as_str)
                .ok_or_else(missing)?,
        };
        if value.is_empty() {
            return Err(missing());
        }
        region = Some(value.to_string());
    }

    Ok(region)
}
