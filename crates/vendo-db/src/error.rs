//! Store error types.

use thiserror::Error;

/// Errors that can occur when using the record store.
#[derive(Error, Debug)]
pub enum DbError {
    /// No record found for the given key.
    #[error("No record found")]
    NotFound,

    /// A record with the same key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Failed to serialize or deserialize a record.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::SerializationError(e.to_string())
    }
}
