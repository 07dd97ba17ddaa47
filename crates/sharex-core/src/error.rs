//! Error types for the Sharex SDK.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Invalid construction options.
///
/// Returned synchronously while building a client; never delivered through
/// a callback.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The options value was not a JSON object.
    #[error("options must be an object")]
    NotAnObject,

    /// An option had the wrong type.
    #[error("{field} must be {expected}")]
    InvalidType {
        /// Option name.
        field: &'static str,
        /// Human readable description of the accepted type.
        expected: &'static str,
    },

    /// The debug endpoint is missing `host` or `port`.
    #[error("debug must have a property called host and port")]
    IncompleteDebug,

    /// A port could not be parsed or is out of range.
    #[error("invalid port: {0}")]
    InvalidPort(String),

    /// No debug endpoint and no host location were supplied.
    #[error("a host location is required when no debug endpoint is configured")]
    MissingLocation,

    /// A page address could not be parsed into a host location.
    #[error("invalid page address: {0}")]
    InvalidLocation(String),

    /// Configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Invalid arguments to an SDK operation.
///
/// Raised before anything is written to the connection, so a failed call
/// leaves no registered callback and no partial state behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required string argument was empty.
    #[error("{0} must be a non-empty string")]
    EmptyString(&'static str),

    /// An argument that must be a JSON object was something else.
    #[error("{0} must be an object")]
    NotAnObject(&'static str),

    /// An argument that must be an object or an array was something else.
    #[error("{0} must be an object or an array")]
    NotObjectOrArray(&'static str),

    /// A bulk payload contained a non-object element.
    #[error("data must be an array of objects")]
    NotArrayOfObjects,

    /// An identifier contained a character that cannot be quoted in a filter.
    #[error("{0} must not contain a single quote")]
    UnquotableId(&'static str),

    /// Insert options were not an object.
    #[error("options must be an object")]
    InvalidOptions,

    /// `options.identity` was present but not a boolean.
    #[error("options.identity must be a boolean")]
    IdentityNotBoolean,
}

/// Core error type for SDK operations.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Argument validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Transport-level failure.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A network operation was issued before `init`.
    #[error("WebSocket not initialized")]
    NotInitialized,

    /// `init` was called twice on the same client.
    #[error("connection already initialized")]
    AlreadyInitialized,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
