//! Theme engine error types

use lustre_core::PropertyValue;
use lustre_selector::SelectorError;
use thiserror::Error;

/// Errors returned when registering a mapping rule
///
/// Nothing is registered when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error(transparent)]
    InvalidSelector(#[from] SelectorError),

    #[error("rule for '{0}' has no properties")]
    EmptyProperties(String),

    /// A registered validator rejected the rule
    #[error("rule for '{selector}' rejected: {reason}")]
    Rejected { selector: String, reason: String },
}

/// Result type for mapping operations
pub type Result<T> = std::result::Result<T, MappingError>;

/// Errors returned by typed property setters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The value cannot be converted to the property type
    #[error("property '{property}': cannot convert {value} ({kind}) to {expected}")]
    Coercion {
        property: String,
        value: PropertyValue,
        kind: &'static str,
        expected: &'static str,
    },

    #[error("property '{property}': {message}")]
    Constraint { property: String, message: String },
}

/// Errors loading an engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}
