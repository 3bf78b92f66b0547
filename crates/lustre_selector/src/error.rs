//! Selector error types

use thiserror::Error;

/// Errors produced while parsing a selector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// Empty or whitespace-only selector
    #[error("selector is empty")]
    Empty,

    /// Malformed selector syntax
    #[error("invalid selector '{selector}' at column {column}: {message}")]
    Syntax {
        selector: String,
        /// Column number (1-indexed)
        column: usize,
        message: String,
    },
}

/// Result type for selector operations
pub type Result<T> = std::result::Result<T, SelectorError>;
