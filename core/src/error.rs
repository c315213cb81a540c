//! Error taxonomy for lint computations.
//!
//! Every variant is recoverable from the host's point of view: the service
//! boundary logs it and falls back to the host's own diagnostics.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LintError {
    /// The external linter crashed or exited with unusable output.
    #[error("lint engine failed: {0}")]
    Engine(String),

    /// The linter ran but its report was missing required parts.
    #[error("malformed lint report: {0}")]
    MalformedReport(String),

    /// The linter executable or library could not be located.
    #[error("failed to load module '{name}': not found in any search root")]
    ModuleNotFound { name: String },

    /// The host has no document registered under this name.
    #[error("file '{0}' is not known to the language service")]
    UnknownFile(String),

    #[error("position {line}:{character} is outside of '{file}'")]
    PositionOutOfRange {
        file: String,
        line: usize,
        character: usize,
    },

    #[error("edit range [{start}, {end}) cannot be applied")]
    InvalidEdit { start: usize, end: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LintError {
    /// Short name of the stage that produced the error, used in log lines.
    pub fn origin(&self) -> &'static str {
        match self {
            LintError::Engine(_) | LintError::MalformedReport(_) | LintError::Json(_) => {
                "lint engine"
            }
            LintError::ModuleNotFound { .. } => "module resolution",
            LintError::UnknownFile(_) | LintError::PositionOutOfRange { .. } => {
                "offset translation"
            }
            LintError::InvalidEdit { .. } => "edit application",
            LintError::Config(_) => "configuration",
            LintError::Io(_) => "io",
        }
    }
}

pub type Result<T, E = LintError> = std::result::Result<T, E>;
