//! Free-text item filter.
//!
//! Terms are separated by commas. A leading `-` excludes matches, a `c:`
//! prefix matches the category name instead of the item name. An item passes
//! when it matches any inclusive term (or there is none) and no exclusive
//! term. Matching is a case-insensitive substring test.

use satchel_common::ItemRef;

use crate::category::CategoryTable;
use crate::world::ItemWorld;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Name,
    Category,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    field: Field,
    needle: String,
    exclude: bool,
}

/// Parsed filter string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    terms: Vec<Term>,
}

impl ItemFilter {
    /// Parses a filter string.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let terms = text
            .split(',')
            .filter_map(|raw| {
                let mut term = raw.trim();
                let exclude = term.starts_with('-');
                if exclude {
                    term = &term[1..];
                }
                let (field, needle) = match term.strip_prefix("c:") {
                    Some(rest) => (Field::Category, rest),
                    None => (Field::Name, term),
                };
                let needle = needle.trim().to_lowercase();
                (!needle.is_empty()).then_some(Term {
                    field,
                    needle,
                    exclude,
                })
            })
            .collect();
        Self { terms }
    }

    /// Matches everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Tests one item.
    #[must_use]
    pub fn matches(&self, world: &ItemWorld, categories: &CategoryTable, item: ItemRef) -> bool {
        if self.terms.is_empty() {
            return true;
        }
        let Some(it) = world.get(item) else {
            return false;
        };
        let name = it.display_name().to_lowercase();
        let category = categories
            .name(categories.resolve(&it.category))
            .to_lowercase();
        let hit = |t: &Term| match t.field {
            Field::Name => name.contains(&t.needle),
            Field::Category => category.contains(&t.needle),
        };

        if self.terms.iter().filter(|t| t.exclude).any(hit) {
            return false;
        }
        let mut inclusive = self.terms.iter().filter(|t| !t.exclude).peekable();
        inclusive.peek().is_none() || inclusive.any(hit)
    }
}
