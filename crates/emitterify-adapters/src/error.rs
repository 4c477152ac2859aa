//! Error types for the adapters crate.

use thiserror::Error;

/// Errors that can occur while writing to a [`Store`](crate::Store).
#[derive(Error, Debug)]
pub enum StoreError {
    /// A path segment runs through a value that is not an object.
    #[error("Cannot write '{path}': '{segment}' is not an object")]
    NotAnObject { path: String, segment: String },

    /// A path contains an empty segment (`"a..b"`, `".a"`).
    #[error("Invalid path '{0}'")]
    InvalidPath(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
