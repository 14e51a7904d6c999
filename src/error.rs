//! Error taxonomy for the collaboration core

use crate::types::{ConnectionId, DocumentId};

/// Result type for core operations
pub type CollabResult<T> = Result<T, CollabError>;

/// WebSocket close status for a malformed connect path (invalid frame payload data)
pub const CLOSE_INVALID_DATA: u16 = 1007;
/// WebSocket close status for a protocol violation
pub const CLOSE_PROTOCOL_ERROR: u16 = 1002;
/// WebSocket close status for a policy violation (slow consumer eviction)
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Errors raised while handling connection events
#[derive(Debug, thiserror::Error)]
pub enum CollabError {
    #[error("Invalid document ID in URI: {0}")]
    MissingDocumentId(String),

    #[error("Username is required to join.")]
    InvalidName,

    #[error("Cannot {0}: user not properly joined.")]
    NotJoined(&'static str),

    #[error("Already joined document {0}.")]
    AlreadyJoined(DocumentId),

    #[error("Document ID mismatch.")]
    DocumentMismatch {
        bound: DocumentId,
        requested: DocumentId,
    },

    #[error("{0}")]
    MalformedMessage(String),

    #[error("Server error: document store unavailable.")]
    StoreUnavailable(#[from] StoreError),

    #[error("Connection {0} is not registered.")]
    UnknownConnection(ConnectionId),
}

impl CollabError {
    /// Close status for errors that end the connection. `None` means the
    /// connection stays open after the error reply.
    pub fn close_code(&self) -> Option<(u16, &'static str)> {
        match self {
            CollabError::MissingDocumentId(_) => {
                Some((CLOSE_INVALID_DATA, "Invalid document ID in URI"))
            }
            CollabError::InvalidName => Some((CLOSE_PROTOCOL_ERROR, "Username required")),
            _ => None,
        }
    }
}

/// Errors from the external document store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Stored document {0} is not valid UTF-8")]
    Corrupt(DocumentId),
}
