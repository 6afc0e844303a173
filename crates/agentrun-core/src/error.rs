//! Configuration errors raised before the agent is launched.

use std::path::PathBuf;

use thiserror::Error;

/// Errors in the task inputs or the materialized settings.
///
/// All of these are terminal and happen before any process exists, so there
/// is never partial state to clean up.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Both the literal and the file variant of an input were supplied.
    #[error("inputs '{name}' and '{name}_file' are mutually exclusive, supply only one")]
    ConflictingInput { name: String },

    /// A required input was supplied in neither form.
    #[error("input '{name}' is required (supply '{name}' or '{name}_file')")]
    MissingInput { name: String },

    /// A file-path input points at nothing.
    #[error("file for input '{name}' not found: {}", path.display())]
    FileNotFound { name: String, path: PathBuf },

    /// A file-path input exists but could not be read.
    #[error("failed to read file for input '{name}' at {}: {source}", path.display())]
    Unreadable {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input was supplied but its value cannot be used.
    #[error("invalid value for input '{name}': {reason}")]
    InvalidInput { name: String, reason: String },

    /// The raw settings string is not valid JSON.
    #[error("invalid settings JSON: {0}")]
    InvalidConfig(#[source] serde_json::Error),

    /// The settings file could not be written.
    #[error("failed to write settings to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigurationError {
    /// Name of the input involved, when the error concerns a single input.
    pub fn input_name(&self) -> Option<&str> {
        match self {
            Self::ConflictingInput { name }
            | Self::MissingInput { name }
            | Self::FileNotFound { name, .. }
            | Self::Unreadable { name, .. }
            | Self::InvalidInput { name, .. } => Some(name),
            Self::InvalidConfig(_) | Self::Persist { .. } => None,
        }
    }
}
