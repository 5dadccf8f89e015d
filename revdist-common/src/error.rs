//! Common error types for revdist

use thiserror::Error;

/// Common result type for revdist operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across revdist crates
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error talking to a remote system (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A remote record lacked a field the caller depends on
    #[error("Field missing: {entity}.{field}")]
    FieldMissing { entity: String, field: String },

    /// Remote system answered, but with an error
    #[error("Remote error: {0}")]
    Remote(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Shorthand for [`Error::FieldMissing`]
    pub fn field_missing(entity: &str, field: &str) -> Self {
        Error::FieldMissing {
            entity: entity.to_string(),
            field: field.to_string(),
        }
    }
}
