//! Error types for lookup and conversion.

use thiserror::Error;

/// A value was present but could not be turned into the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Neither an explicit, implicit nor list converter exists for the type.
    #[error("no converter for type {type_name}")]
    NoConverter { type_name: String },

    /// The converter rejected the raw value.
    #[error("cannot convert '{value}' to {type_name}: {reason}")]
    Invalid {
        type_name: String,
        value: String,
        reason: String,
    },

    /// The registered converter produces a different type than requested.
    #[error("converter registered for {registered} does not produce {requested}")]
    TypeMismatch {
        registered: String,
        requested: String,
    },
}

/// Errors raised while reading sources or resolving keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Required key is absent (or empty) in every source.
    #[error("No configured value found for config key {0}")]
    MissingKey(String),

    /// Key is configured but malformed for the requested type.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A source failed to answer (e.g. a network-backed source).
    #[error("config source '{name}' failed: {message}")]
    Source { name: String, message: String },

    /// A file source could not be parsed.
    #[error("failed to parse {location}: {message}")]
    Parse { location: String, message: String },

    /// A file source could not be read.
    #[error("failed to read {location}: {message}")]
    Io { location: String, message: String },
}

impl ConfigError {
    /// True for "not configured", false for every other failure.
    pub fn is_missing_key(&self) -> bool {
        matches!(self, ConfigError::MissingKey(_))
    }

    /// True when the value exists but could not be converted.
    pub fn is_conversion(&self) -> bool {
        matches!(self, ConfigError::Conversion(_))
    }
}
