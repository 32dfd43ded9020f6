//! # Deploy Parameter Resolution
//!
//! Deploy parameters are the flags every deployment carries unless the caller
//! says otherwise. They start from an explicit set of built-in defaults and
//! can be overridden per project with a `deploy.json` document in the working
//! directory:
//!
//! ```json
//! { "memory": "256MB", "runtime": "python39", "allow-unauthenticated": true }
//! ```
//!
//! Keys in the document replace defaults of the same name and any other key is
//! appended, so projects can add flags the defaults know nothing about. A
//! missing document is not an error; a malformed one is.
//!
//! ## Value Conversion
//!
//! - strings are used verbatim; an empty string becomes a bare flag
//! - numbers are rendered in decimal
//! - `true`, `false` and `null` become bare flags (`--key`)
//! - arrays and objects are rejected

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Default name of the project-local override document.
pub const OVERRIDE_FILE_NAME: &str = "deploy.json";

/// Ordered mapping from flag name to an optional value.
///
/// A `None` value is a boolean flag, emitted as `--key`. Insertion order is
/// preserved and a key never appears twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployParams {
    entries: Vec<(String, Option<String>)>,
}

impl DeployParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in defaults: one instance, 128MB of memory, `europe-west1`.
    pub fn builtin() -> Self {
        let mut params = Self::new();
        params.set("max-instances", Some("1"));
        params.set("memory", Some("128MB"));
        params.set("region", Some("europe-west1"));
        params
    }

    /// Sets `key`, replacing the value in place if the key already exists.
    pub fn set<K, V>(&mut self, key: K, value: Option<V>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        let value = value.map(Into::into);
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Looks up `key`. The outer `Option` is presence, the inner one the value.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }
}

/// Resolves the deploy parameters for a project.
///
/// Starts from `defaults` and applies the override document at
/// `override_path` if it exists. A missing document is logged and the
/// defaults are returned unchanged.
pub fn resolve(defaults: &DeployParams, override_path: &Path) -> Result<DeployParams> {
    let content = match fs::read_to_string(override_path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(
                "No {} found, using default deploy parameters",
                override_path.display()
            );
            return Ok(defaults.clone());
        }
        Err(e) => return Err(Error::Io(e)),
    };

    debug!("Applying overrides from {}", override_path.display());
    apply_overrides(defaults, &content, &override_path.display().to_string())
}

/// Applies the override document `content` on top of `defaults`.
///
/// `origin` names the document in error messages.
pub fn apply_overrides(defaults: &DeployParams, content: &str, origin: &str) -> Result<DeployParams> {
    let document: Value = serde_json::from_str(content).map_err(|e| Error::ConfigParse {
        path: origin.to_string(),
        message: e.to_string(),
        hint: None,
    })?;

    let Value::Object(overrides) = document else {
        return Err(Error::ConfigParse {
            path: origin.to_string(),
            message: "expected a JSON object at the top level".to_string(),
            hint: Some("Use an object such as {\"memory\": \"256MB\"}".to_string()),
        });
    };

    let mut params = defaults.clone();
    merge_object(&mut params, overrides, origin)?;
    Ok(params)
}

fn merge_object(params: &mut DeployParams, overrides: Map<String, Value>, origin: &str) -> Result<()> {
    for (key, value) in overrides {
        let value = match value {
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(text),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(_) | Value::Null => None,
            Value::Array(_) | Value::Object(_) => {
                return Err(Error::ConfigParse {
                    path: origin.to_string(),
                    message: format!("value for '{}' must be a string, number or boolean", key),
                    hint: None,
                });
            }
        };
        params.set(key, value);
    }
    Ok(())
}
