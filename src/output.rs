//! # Output Configuration
//!
//! Controls how status lines look on the terminal. Color and emoji are used
//! only when the terminal can show them and the user has not opted out.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;

use console::style;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `always` and `never` are taken at their word; anything else falls back
    /// to detecting what the environment supports.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }

    /// A step that is about to run, e.g. the command being executed.
    pub fn step(&self, message: &str) -> String {
        if self.use_color {
            format!("🚀 {}", message)
        } else {
            format!("[RUN] {}", message)
        }
    }

    /// A step that finished successfully.
    pub fn success(&self, message: &str) -> String {
        if self.use_color {
            format!("✅ {}", style(message).green())
        } else {
            format!("[OK] {}", message)
        }
    }

    /// A secondary detail under a step.
    pub fn detail(&self, message: &str) -> String {
        if self.use_color {
            format!("   {}", style(message).dim())
        } else {
            format!("   {}", message)
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}
