//! Interned item categories.
//!
//! Categories are compared by handle. Synthesized directional variants are
//! memoized by id so the same direction always yields the same handle.

use std::cmp::Ordering;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Label, identity and sort rank of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCategory {
    /// Unique id
    pub id: String,
    /// Display name
    pub name: String,
    /// Sort rank, lower first
    #[serde(default)]
    pub sort_rank: i32,
}

impl ItemCategory {
    /// Creates a category.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, sort_rank: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sort_rank,
        }
    }
}

/// Stable handle into a [`CategoryTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(u32);

impl CategoryId {
    /// Bionics and mutations.
    pub const INTEGRATED: Self = Self(0);
    /// Worn bionic fuel sources.
    pub const BIONIC_FUEL_SOURCE: Self = Self(1);
    /// Wielded weapon.
    pub const WEAPON_HELD: Self = Self(2);
    /// Worn clothing.
    pub const ITEMS_WORN: Self = Self(3);
    /// Fallback for unknown categories.
    pub const OTHER: Self = Self(4);

    /// Index in the table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Categories that mark equipment on a character.
    #[must_use]
    pub const fn is_worn(self) -> bool {
        matches!(
            self,
            Self::ITEMS_WORN | Self::INTEGRATED | Self::BIONIC_FUEL_SOURCE
        )
    }
}

/// Interned category table.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    categories: Vec<ItemCategory>,
    by_id: AHashMap<String, CategoryId>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryTable {
    /// Creates a table holding the built-in equipment categories.
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self {
            categories: Vec::new(),
            by_id: AHashMap::new(),
        };
        table.intern(ItemCategory::new("INTEGRATED", "INTEGRATED", -300));
        table.intern(ItemCategory::new(
            "BIONIC_FUEL_SOURCE",
            "BIONIC FUEL SOURCE",
            -250,
        ));
        table.intern(ItemCategory::new("WEAPON_HELD", "WEAPON HELD", -200));
        table.intern(ItemCategory::new("ITEMS_WORN", "ITEMS WORN", -100));
        table.intern(ItemCategory::new("OTHER", "OTHER", 1000));
        table
    }

    /// Returns the handle for `category`, inserting it when the id is new.
    pub fn intern(&mut self, category: ItemCategory) -> CategoryId {
        if let Some(id) = self.by_id.get(&category.id) {
            return *id;
        }
        let id = CategoryId(self.categories.len() as u32);
        self.by_id.insert(category.id.clone(), id);
        self.categories.push(category);
        id
    }

    /// Looks a category up by id.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<CategoryId> {
        self.by_id.get(id).copied()
    }

    /// Looks a category up by id, falling back to [`CategoryId::OTHER`].
    #[must_use]
    pub fn resolve(&self, id: &str) -> CategoryId {
        self.lookup(id).unwrap_or(CategoryId::OTHER)
    }

    /// Returns the category behind a handle.
    #[must_use]
    pub fn get(&self, id: CategoryId) -> Option<&ItemCategory> {
        self.categories.get(id.index())
    }

    /// Display name, empty for a stale handle.
    #[must_use]
    pub fn name(&self, id: CategoryId) -> &str {
        self.get(id).map_or("", |c| c.name.as_str())
    }

    /// Number of interned categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Always false; the built-ins are present from the start.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Synthesizes a directional variant of `base`.
    ///
    /// At distance zero the base category is returned unchanged. Otherwise
    /// the variant gets `"{id}_{suffix}"` as id, `"{name} {suffix}"` as name
    /// and the distance added to its rank.
    pub fn naturalize(&mut self, base: ItemCategory, suffix: &str, dist: i32) -> CategoryId {
        if dist == 0 {
            return self.intern(base);
        }
        let id = format!("{}_{suffix}", base.id);
        if let Some(existing) = self.lookup(&id) {
            return existing;
        }
        trace!("Synthesized category {id}");
        self.intern(ItemCategory {
            id,
            name: format!("{} {suffix}", base.name),
            sort_rank: base.sort_rank + dist,
        })
    }

    /// Orders by rank, then by name, then by id. Distinct ids never
    /// compare equal.
    #[must_use]
    pub fn compare(&self, a: CategoryId, b: CategoryId) -> Ordering {
        match (self.get(a), self.get(b)) {
            (Some(x), Some(y)) => x
                .sort_rank
                .cmp(&y.sort_rank)
                .then_with(|| x.name.cmp(&y.name))
                .then_with(|| a.cmp(&b)),
            _ => a.cmp(&b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_stable() {
        let table = CategoryTable::new();
        assert_eq!(table.lookup("ITEMS_WORN"), Some(CategoryId::ITEMS_WORN));
        assert_eq!(table.name(CategoryId::WEAPON_HELD), "WEAPON HELD");
        assert!(CategoryId::BIONIC_FUEL_SOURCE.is_worn());
        assert!(!CategoryId::WEAPON_HELD.is_worn());
    }

    #[test]
    fn test_naturalize_memoizes() {
        let mut table = CategoryTable::new();
        let base = ItemCategory::new("GRASS", "GRASS", 100);
        let a = table.naturalize(base.clone(), "1N", 1);
        let b = table.naturalize(base.clone(), "1N", 1);
        assert_eq!(a, b);
        let cat = table.get(a).expect("category");
        assert_eq!(cat.id, "GRASS_1N");
        assert_eq!(cat.name, "GRASS 1N");
        assert_eq!(cat.sort_rank, 101);

        let here = table.naturalize(base, "", 0);
        assert_ne!(here, a);
        assert_eq!(table.get(here).map(|c| c.sort_rank), Some(100));
    }

    #[test]
    fn test_compare_by_rank_then_name() {
        let mut table = CategoryTable::new();
        let food = table.intern(ItemCategory::new("food", "FOOD", 10));
        let ammo = table.intern(ItemCategory::new("ammo", "AMMO", 10));
        assert_eq!(table.compare(ammo, food), Ordering::Less);
        assert_eq!(
            table.compare(CategoryId::WEAPON_HELD, ammo),
            Ordering::Less
        );
    }

    #[test]
    fn test_compare_same_name_and_rank_by_id() {
        let mut table = CategoryTable::new();
        let first = table.intern(ItemCategory::new("drink", "SUPPLIES", 0));
        let second = table.intern(ItemCategory::new("water", "SUPPLIES", 0));
        assert_eq!(table.compare(first, second), first.cmp(&second));
        assert_eq!(table.compare(second, first), second.cmp(&first));
        assert_ne!(table.compare(first, second), Ordering::Equal);
        assert_eq!(table.compare(first, first), Ordering::Equal);
    }
}
