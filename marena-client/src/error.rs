//! Error types for the marena client.

use thiserror::Error;

/// Errors that can occur when using the marena client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The arena rejected an operation.
    #[error("{operation} rejected: {message}")]
    Rejected {
        /// Operation that failed.
        operation: &'static str,
        /// Reason reported by the arena.
        message: String,
    },

    /// A stored value could not be parsed as the handle's type.
    #[error("Failed to decode '{value}' as {type_tag}")]
    Decode {
        /// Type tag of the handle.
        type_tag: &'static str,
        /// Text returned by the arena.
        value: String,
    },

    /// The transport could not be reached or answered out of protocol.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ClientError {
    pub(crate) fn rejected(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            message: message.into(),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
