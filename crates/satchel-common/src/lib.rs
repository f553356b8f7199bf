//! # Satchel Common
//!
//! Common types shared by every Satchel crate.
//!
//! This crate provides:
//! - Handle types (ItemRef, CharacterId, SelectorId, EntryId)
//! - Tile coordinates and compass directions
//! - Display colors
//! - Version information for data files
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod color;
pub mod coords;
pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::color::*;
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_suffix_of_neighbour() {
        let origin = Tripoint::new(10, 10, 0);
        let target = Tripoint::new(11, 9, 0);
        assert_eq!(direction_suffix(origin, target), "1NE");
    }

    #[test]
    fn test_selector_id_generation() {
        let a = SelectorId::new();
        let b = SelectorId::new();
        assert_ne!(a, b);
        assert!(a.is_valid());
    }

    #[test]
    fn test_version_compatibility() {
        let v1 = SchemaVersion::new(1, 0, 0);
        let v2 = SchemaVersion::new(1, 1, 0);
        let v3 = SchemaVersion::new(2, 0, 0);

        assert!(v2.is_compatible_with(&v1));
        assert!(!v1.is_compatible_with(&v3));
    }
}
