//! Error types for Satchel.

use thiserror::Error;

use crate::ids::{CharacterId, ItemRef};

/// Top-level error type for Satchel operations.
#[derive(Debug, Error)]
pub enum SatchelError {
    /// World model errors
    #[error("World error: {0}")]
    World(#[from] WorldError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },
}

/// Item graph errors.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Item reference does not resolve
    #[error("Item not found: {0}")]
    ItemNotFound(ItemRef),

    /// Character does not exist
    #[error("Character not found: {0:?}")]
    CharacterNotFound(CharacterId),

    /// Pocket index out of range
    #[error("Item {item} has no pocket {pocket}")]
    PocketNotFound {
        /// Container item
        item: ItemRef,
        /// Requested pocket index
        pocket: usize,
    },

    /// Invalid world data
    #[error("Invalid world data: {0}")]
    InvalidData(String),
}

/// Result type alias for Satchel operations.
pub type SatchelResult<T> = Result<T, SatchelError>;

/// Result type alias for item graph operations.
pub type WorldResult<T> = Result<T, WorldError>;
