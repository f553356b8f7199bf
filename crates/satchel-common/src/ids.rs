//! Handle types for items, characters, selectors and display entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for selector IDs.
static SELECTOR_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Global counter for entry IDs.
static ENTRY_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque handle to one item instance owned by the game world.
///
/// The handle never owns the item; it is an index into the world's item arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemRef(u32);

impl ItemRef {
    /// Creates an item reference from a raw arena index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw arena index.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the arena index as a `usize`.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Identifier of a character (player or NPC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CharacterId(u32);

impl CharacterId {
    /// Creates a character ID from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The player character.
    pub const PLAYER: Self = Self(0);
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "character#{}", self.0)
    }
}

/// Unique identifier of a live selector instance.
///
/// Used to check ownership of hover and focus reports when several selectors
/// render in the same frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectorId(u64);

impl SelectorId {
    /// Creates a new unique selector ID.
    #[must_use]
    pub fn new() -> Self {
        Self(SELECTOR_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Null/invalid selector ID.
    pub const NULL: Self = Self(0);

    /// Checks if this is a valid (non-null) selector ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for SelectorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable identity of one display entry.
///
/// Survives sorting and moves between columns; a fresh ID is minted whenever
/// an entry is synthesized rather than moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(u64);

impl EntryId {
    /// Mints a new unique entry ID.
    #[must_use]
    pub fn next() -> Self {
        Self(ENTRY_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ItemRef::new(3).to_string(), "item#3");
        assert_eq!(CharacterId::PLAYER.to_string(), "character#0");
        assert_eq!(CharacterId::new(7).to_string(), "character#7");
    }

    #[test]
    fn test_selector_ids_are_unique() {
        let a = SelectorId::new();
        let b = SelectorId::new();
        assert_ne!(a, b);
        assert!(a.is_valid());
        assert!(!SelectorId::NULL.is_valid());
    }
}
