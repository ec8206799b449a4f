//! Block store error types.

use std::io;

use tabula_types::BlockId;
use thiserror::Error;

/// Errors a block store call can fail with.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Block not found in the store.
    #[error("block not found: {0:?}")]
    NotFound(BlockId),

    /// A block with this ID already exists.
    #[error("block already exists: {0:?}")]
    AlreadyExists(BlockId),

    /// The store rejected the payload.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The request never completed (network, server unavailable).
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed or unsupported archive.
    #[error("archive error: {0}")]
    Archive(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Create a Validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a Transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an Archive error.
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }
}

/// Block store result type.
pub type ClientResult<T> = Result<T, ClientError>;
