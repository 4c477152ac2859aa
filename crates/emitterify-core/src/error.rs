//! Error handling for emitterify
//!
//! Provides the error types used across the crate:
//! - Dispatch errors (listener faults caught at the fan-out boundary)
//! - Node errors (awaiting a node that was cancelled)
//! - Configuration errors (invalid or unreadable emitter configuration)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::observable::NodeId;

/// Dispatch error type
///
/// Represents a fault raised by a single listener or operator during fan-out.
/// These never escape `emit`/`next` and are not part of [`Error`]: they are
/// logged and the loop continues.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Listener returned an error
    #[error("Listener for '{event}' failed: {source}")]
    Rejected {
        /// The event type being dispatched.
        event: String,
        /// The error returned by the listener.
        #[source]
        source: anyhow::Error,
    },

    /// Listener panicked
    #[error("Listener for '{event}' panicked: {message}")]
    Panicked {
        /// The event type being dispatched.
        event: String,
        /// The panic payload, when it was a string.
        message: String,
    },
}

impl DispatchError {
    /// The event type that was being dispatched when the fault occurred
    pub fn event(&self) -> &str {
        match self {
            DispatchError::Rejected { event, .. } | DispatchError::Panicked { event, .. } => event,
        }
    }
}

/// Main error type for emitterify
///
/// Everything a caller can get back from the crate's fallible operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Node was stopped before its value slot settled
    #[error("Node {node} was cancelled before it settled")]
    Cancelled {
        /// The cancelled node.
        node: NodeId,
    },

    /// Invalid configuration
    #[error("Invalid emitter configuration: {reason}")]
    Config {
        /// The reason the configuration was rejected.
        reason: String,
    },

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error from a message
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// Check if this is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
