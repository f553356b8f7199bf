//! Error types for the inventory engine.
//!
//! None of these escape a running selector session: structural violations
//! are logged where they happen and the operation degrades to a no-op.

use satchel_common::{ItemRef, WorldError};
use thiserror::Error;

/// Structural errors raised by columns and selectors.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// An identical entry is already present in the column.
    #[error("Duplicate entry for {item}")]
    DuplicateEntry {
        /// First item of the rejected entry
        item: ItemRef,
    },

    /// Cell index past the preset's cell count.
    #[error("Invalid cell index {index} (preset has {count} cells)")]
    InvalidCellIndex {
        /// Requested index
        index: usize,
        /// Number of cells
        count: usize,
    },

    /// Column index past the selector's column list.
    #[error("Column {index} out of range ({count} columns)")]
    ColumnOutOfRange {
        /// Requested index
        index: usize,
        /// Number of columns
        count: usize,
    },

    /// Item graph lookup failed.
    #[error(transparent)]
    World(#[from] WorldError),

    /// Unknown input action name.
    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

/// Result type for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;
