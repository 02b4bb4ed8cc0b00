//! Error types for the si-registry crate.

use std::path::PathBuf;

/// Errors that can occur while declaring schema objects or generating code.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A property was not found on an attribute list.
    #[error("cannot find property '{name}' for {type_name}")]
    PropNotFound { name: String, type_name: String },

    /// A requested object was not found in the registry.
    #[error("cannot get object named '{type_name}' in the registry (available: {available})")]
    ObjectNotFound { type_name: String, available: String },

    /// An object with the same type name was already registered.
    #[error("object '{type_name}' is already registered")]
    DuplicateObject { type_name: String },

    /// No association is registered under a field name.
    #[error("cannot find association for field '{field_name}'")]
    AssociationNotFound { field_name: String },

    /// A dotted property path could not be resolved.
    #[error("property lookup failed: {0}")]
    PropLookup(String),

    /// A formatter was constructed with no objects to render.
    #[error("no objects to generate for service '{0}'")]
    EmptyService(String),

    /// A property kind has no representation in the target language.
    #[error("unsupported property kind '{kind}' for '{prop}' on {type_name}")]
    Unsupported {
        type_name: String,
        prop: String,
        kind: String,
    },

    /// A formatter value was requested from the wrong kind of object.
    #[error("invalid object kind: {0}")]
    InvalidObject(String),

    /// A generated document failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Failed to write generated files.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read a file from disk.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// External formatter failure (spawning or running rustfmt).
    #[error("rustfmt failed: {0}")]
    Format(String),

    /// JSON conversion error with context.
    #[error("failed to convert JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error from a parsed code property.
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
