//! Pattern error types

use thiserror::Error;

/// Errors produced while registering a pattern
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("invalid glob '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    /// A custom pattern was added without a match function
    #[error("custom pattern '{0}' has no match function")]
    MissingCustomFunction(String),

    #[error("no pattern matcher registered for '{0}'")]
    UnknownPlugin(String),

    /// A plugin refused the pattern during validation
    #[error("pattern '{pattern}' rejected by '{plugin}': {message}")]
    Rejected {
        plugin: String,
        pattern: String,
        message: String,
    },
}

/// Result type for pattern operations
pub type Result<T> = std::result::Result<T, PatternError>;
