//! Mutator error types.

use tabula_client::ClientError;
use tabula_types::{BlockId, OptionId, PropertyId};
use thiserror::Error;

use crate::history::GroupClosed;

/// Errors a mutator call can fail with.
#[derive(Error, Debug)]
pub enum MutatorError {
    /// The block store rejected or failed the call.
    #[error(transparent)]
    Store(#[from] ClientError),

    /// The edit does not apply to this block.
    #[error("{operation} not supported: {reason}")]
    UnsupportedOperation {
        operation: &'static str,
        reason: String,
    },

    /// No card property with this ID on the board.
    #[error("property not found: {0:?}")]
    PropertyNotFound(PropertyId),

    /// No option with this ID on the property.
    #[error("option {option:?} not found on property {property:?}")]
    OptionNotFound {
        property: PropertyId,
        option: OptionId,
    },

    #[error("block {0:?} is not a board")]
    NotABoard(BlockId),

    #[error("block {0:?} is not a view")]
    NotAView(BlockId),

    #[error("block {0:?} is not a card")]
    NotACard(BlockId),

    /// Insert or move target past the end of a list.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// History navigation attempted from inside an undo group.
    #[error("{0} is not allowed inside an undo group")]
    InsideUndoGroup(&'static str),

    /// A group-scoped mutator was used after its group finished.
    #[error(transparent)]
    GroupClosed(#[from] GroupClosed),
}

impl MutatorError {
    pub fn unsupported(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation,
            reason: reason.into(),
        }
    }
}

/// Mutator result type.
pub type MutatorResult<T> = Result<T, MutatorError>;
