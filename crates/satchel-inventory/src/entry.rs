//! Display rows: category headers and item stacks.

use satchel_common::{Color, EntryId, ItemRef};

use crate::category::CategoryId;
use crate::preset::{Preset, PresetContext};
use crate::world::ItemWorld;

/// Handle of a collation group inside a column's [`CollationArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollationId(usize);

impl CollationId {
    /// Index in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Moves the handle by `offset` slots.
    #[must_use]
    pub const fn shifted(self, offset: usize) -> Self {
        Self(self.0 + offset)
    }
}

/// State shared by a collation header and its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollationGroup {
    /// Representative item of the group
    pub tip: ItemRef,
    /// Members are folded away
    pub collapsed: bool,
    /// The header is selectable
    pub enabled: bool,
}

/// Collation groups of one column.
#[derive(Debug, Clone, Default)]
pub struct CollationArena {
    groups: Vec<CollationGroup>,
}

impl CollationArena {
    /// Adds a group.
    pub fn insert(&mut self, group: CollationGroup) -> CollationId {
        self.groups.push(group);
        CollationId(self.groups.len() - 1)
    }

    /// Returns a group.
    #[must_use]
    pub fn get(&self, id: CollationId) -> Option<&CollationGroup> {
        self.groups.get(id.0)
    }

    /// Returns a group mutably.
    pub fn get_mut(&mut self, id: CollationId) -> Option<&mut CollationGroup> {
        self.groups.get_mut(id.0)
    }

    /// Moves every group of `other` in; returns the offset to apply to its
    /// handles.
    pub fn absorb(&mut self, other: &mut Self) -> usize {
        let offset = self.groups.len();
        self.groups.append(&mut other.groups);
        offset
    }

    /// Drops every group.
    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if there is no group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Quick-select key state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CustomInvlet {
    /// Falls back to the item's own letter
    #[default]
    Unset,
    /// Explicitly no key
    None,
    /// Assigned key
    Key(char),
}

/// Rendered text and color of an entry for one preset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryCells {
    /// Main color
    pub color: Color,
    /// One text per preset cell
    pub text: Vec<String>,
}

/// One display row.
#[derive(Debug, Clone)]
pub struct Entry {
    id: EntryId,
    /// Stack members, all mutually stackable. Empty for headers and dummies.
    pub locations: Vec<ItemRef>,
    /// Category this entry heads; set only for category headers
    pub header: Option<CategoryId>,
    /// Overrides the item's natural category
    pub custom_category: Option<CategoryId>,
    /// Nearest ancestor still shown as an entry, for hierarchy indent
    pub topmost_parent: Option<ItemRef>,
    /// Insertion order tie-break
    pub generation: u64,
    /// Units chosen in a multiselector
    pub chosen_count: u32,
    /// Has visible children (or is a collation header)
    pub chevron: bool,
    /// Children are folded away
    pub collapsed: bool,
    /// Hierarchy indent in characters
    pub indent: usize,
    /// Holds the parent of the highlighted entry
    pub highlight_as_parent: bool,
    /// Is contained in the highlighted entry
    pub highlight_as_child: bool,
    /// Quick-select key
    pub custom_invlet: CustomInvlet,
    /// Collation group membership
    pub collation: Option<CollationId>,
    /// Keyboard focus sits on this row
    pub highlighted: bool,
    enabled: bool,
    denial: Option<String>,
    cached_name: String,
    cached_name_full: String,
    cells: Option<EntryCells>,
}

impl Default for Entry {
    fn default() -> Self {
        Self::dummy()
    }
}

impl Entry {
    fn blank() -> Self {
        Self {
            id: EntryId::next(),
            locations: Vec::new(),
            header: None,
            custom_category: None,
            topmost_parent: None,
            generation: 0,
            chosen_count: 0,
            chevron: false,
            collapsed: false,
            indent: 0,
            highlight_as_parent: false,
            highlight_as_child: false,
            custom_invlet: CustomInvlet::Unset,
            collation: None,
            highlighted: false,
            enabled: true,
            denial: None,
            cached_name: String::new(),
            cached_name_full: String::new(),
            cells: None,
        }
    }

    /// The empty sentinel.
    #[must_use]
    pub fn dummy() -> Self {
        Self::blank()
    }

    /// A category separator.
    #[must_use]
    pub fn category(category: CategoryId) -> Self {
        Self {
            header: Some(category),
            enabled: false,
            ..Self::blank()
        }
    }

    /// An item stack.
    #[must_use]
    pub fn item(
        locations: Vec<ItemRef>,
        custom_category: Option<CategoryId>,
        chosen_count: u32,
        generation: u64,
        topmost_parent: Option<ItemRef>,
    ) -> Self {
        Self {
            locations,
            custom_category,
            chosen_count,
            generation,
            topmost_parent,
            ..Self::blank()
        }
    }

    /// Copy of this entry under another category, with its own identity.
    #[must_use]
    pub fn recategorized(&self, category: CategoryId) -> Self {
        let mut copy = self.clone();
        copy.id = EntryId::next();
        copy.custom_category = Some(category);
        copy.highlighted = false;
        copy.cells = None;
        copy
    }

    /// Copy of this entry with its own identity.
    #[must_use]
    pub fn fresh_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.id = EntryId::next();
        copy.highlighted = false;
        copy
    }

    /// Stable identity of this row.
    #[must_use]
    pub const fn id(&self) -> EntryId {
        self.id
    }

    /// Holds at least one item.
    #[must_use]
    pub fn is_item(&self) -> bool {
        !self.locations.is_empty()
    }

    /// Is a category separator.
    #[must_use]
    pub fn is_category(&self) -> bool {
        self.locations.is_empty() && self.header.is_some()
    }

    /// Is the empty sentinel.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.locations.is_empty() && self.header.is_none()
    }

    /// First stack member.
    #[must_use]
    pub fn any_item(&self) -> Option<ItemRef> {
        self.locations.first().copied()
    }

    /// Belongs to a collation group.
    #[must_use]
    pub const fn is_collated(&self) -> bool {
        self.collation.is_some()
    }

    /// Synthetic row folding a collation group.
    #[must_use]
    pub const fn is_collation_header(&self) -> bool {
        self.collation.is_some() && self.chevron
    }

    /// Member folded under a collation header.
    #[must_use]
    pub const fn is_collation_entry(&self) -> bool {
        self.collation.is_some() && !self.chevron
    }

    /// Leaves the collation group.
    pub fn reset_collation(&mut self) {
        self.collation = None;
    }

    /// Overrides selectability; used for comparison stand-ins.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Selectable under the active preset.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        self.is_item() && self.enabled
    }

    /// Can take keyboard focus.
    #[must_use]
    pub fn is_highlightable(&self, skip_unselectable: bool) -> bool {
        self.is_item() && (self.enabled || !skip_unselectable)
    }

    /// Cached denial text; `None` until computed.
    #[must_use]
    pub fn denial(&self) -> Option<&str> {
        self.denial.as_deref()
    }

    /// Category used for grouping: the override, else the header's, else
    /// the item's natural category.
    #[must_use]
    pub fn category_id(&self, ctx: &PresetContext<'_>) -> Option<CategoryId> {
        if let Some(custom) = self.custom_category {
            return Some(custom);
        }
        if let Some(header) = self.header {
            return Some(header);
        }
        let item = ctx.world.get(self.any_item()?)?;
        Some(ctx.categories.resolve(&item.category))
    }

    /// Units available: the charges of a lone stack, else the number of
    /// members.
    #[must_use]
    pub fn get_available_count(&self, world: &ItemWorld) -> u32 {
        match self.locations.as_slice() {
            [only] => world.get(*only).map_or(0, |it| it.count()),
            many => many.len() as u32,
        }
    }

    /// Number of members.
    #[must_use]
    pub fn get_stack_size(&self) -> usize {
        self.locations.len()
    }

    /// Charges summed over all members.
    #[must_use]
    pub fn get_total_charges(&self, world: &ItemWorld) -> u32 {
        self.locations
            .iter()
            .filter_map(|r| world.get(*r))
            .map(|it| it.charges.unwrap_or(0))
            .sum()
    }

    /// Charges summed over the first `chosen_count` members.
    #[must_use]
    pub fn get_selected_charges(&self, world: &ItemWorld) -> u32 {
        self.locations
            .iter()
            .take(self.chosen_count as usize)
            .filter_map(|r| world.get(*r))
            .map(|it| it.charges.unwrap_or(0))
            .sum()
    }

    /// Quick-select key to show, if any.
    #[must_use]
    pub fn get_invlet(&self, world: &ItemWorld) -> Option<char> {
        match self.custom_invlet {
            CustomInvlet::Key(c) => Some(c),
            CustomInvlet::None => None,
            CustomInvlet::Unset => world.get(self.any_item()?)?.invlet,
        }
    }

    /// Color of the quick-select key.
    #[must_use]
    pub fn get_invlet_color(&self, world: &ItemWorld) -> Color {
        let user_assigned = self
            .any_item()
            .and_then(|r| world.get(r))
            .and_then(|it| it.invlet)
            .is_some_and(|own| self.get_invlet(world) == Some(own));
        if !self.is_selectable() {
            Color::DarkGray
        } else if user_assigned {
            Color::Yellow
        } else {
            Color::White
        }
    }

    /// Hidden by a collapsed ancestor pocket or a folded collation group.
    #[must_use]
    pub fn is_hidden(
        &self,
        world: &ItemWorld,
        collations: &CollationArena,
        hide_override: Option<bool>,
    ) -> bool {
        let Some(first) = self.any_item() else {
            return false;
        };
        if self.is_collation_entry()
            && self
                .collation
                .and_then(|id| collations.get(id))
                .is_some_and(|g| g.collapsed)
        {
            return true;
        }
        let Some(topmost) = self.topmost_parent else {
            return false;
        };
        if let Some(hide) = hide_override {
            if world.get(topmost).is_some_and(|t| t.is_container()) {
                return hide;
            }
        }
        let mut cur = first;
        while cur != topmost {
            let Some(parent) = world.parent(cur) else {
                break;
            };
            if world.parent_pocket(cur).is_some_and(|p| p.collapsed) {
                return true;
            }
            cur = parent;
        }
        false
    }

    /// Refreshes the name keys used for sorting.
    pub fn update_cache(&mut self, world: &ItemWorld) {
        if let Some(item) = self.any_item().and_then(|r| world.get(r)) {
            self.cached_name = item.name.to_lowercase();
            self.cached_name_full = item.display_name().to_lowercase();
        }
    }

    /// Sort key: lowercased name, lowercased full name, generation.
    #[must_use]
    pub fn sort_key(&self) -> (&str, &str, u64) {
        (&self.cached_name, &self.cached_name_full, self.generation)
    }

    /// Computes the denial once and updates `enabled` and the collation
    /// group.
    pub fn cache_denial(
        &mut self,
        preset: &dyn Preset,
        ctx: &PresetContext<'_>,
        collations: &mut CollationArena,
    ) {
        if self.denial.is_none() {
            let denial = preset.entry_denial(ctx, self);
            self.enabled = denial.is_empty();
            self.denial = Some(denial);
        }
        if self.is_collation_header() {
            let enabled = self.enabled;
            if let Some(group) = self.collation.and_then(|id| collations.get_mut(id)) {
                group.enabled = enabled;
            }
        }
    }

    /// Forgets the cached denial.
    pub fn reset_denial(&mut self) {
        self.denial = None;
        self.enabled = true;
    }

    /// Rebuilds the rendered cells. With `update_only` nothing happens unless
    /// a cache already exists.
    pub fn make_cell_cache(&mut self, preset: &dyn Preset, ctx: &PresetContext<'_>, update_only: bool) {
        if update_only && self.cells.is_none() {
            return;
        }
        let text = (0..preset.cells().len())
            .map(|idx| crate::preset::cell_text(preset, ctx, self, idx))
            .collect();
        self.cells = Some(EntryCells {
            color: preset.color(ctx, self),
            text,
        });
    }

    /// Drops the rendered cells.
    pub fn reset_cell_cache(&mut self) {
        self.cells = None;
    }

    /// Rendered cells, built on first use together with the denial.
    pub fn cell_cache(
        &mut self,
        preset: &dyn Preset,
        ctx: &PresetContext<'_>,
        collations: &mut CollationArena,
    ) -> &EntryCells {
        if self.cells.is_none() {
            self.make_cell_cache(preset, ctx, false);
            self.cache_denial(preset, ctx, collations);
        }
        self.cells.get_or_insert_with(EntryCells::default)
    }

    /// Previously rendered cells.
    #[must_use]
    pub fn cached_cells(&self) -> Option<&EntryCells> {
        self.cells.as_ref()
    }

    /// Same category and same members, in order.
    #[must_use]
    pub fn same_entry(&self, other: &Self) -> bool {
        self.custom_category == other.custom_category
            && self.header == other.header
            && self.locations == other.locations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Item, Location, Pocket, PocketKind};
    use satchel_common::{CharacterId, Tripoint};

    fn arrows(world: &mut ItemWorld, charges: u32) -> ItemRef {
        world
            .spawn(
                Item::new("arrow", "arrow", "ammo").with_charges(charges),
                Location::Map(Tripoint::default()),
            )
            .expect("spawn")
    }

    #[test]
    fn test_available_count_single_stack_uses_charges() {
        let mut world = ItemWorld::new();
        let a = arrows(&mut world, 20);
        let entry = Entry::item(vec![a], None, 0, 0, None);
        assert_eq!(entry.get_available_count(&world), 20);
        assert_eq!(entry.get_total_charges(&world), 20);
    }

    #[test]
    fn test_available_count_many_refs() {
        let mut world = ItemWorld::new();
        let a = arrows(&mut world, 5);
        let b = arrows(&mut world, 7);
        let mut entry = Entry::item(vec![a, b], None, 1, 0, None);
        assert_eq!(entry.get_available_count(&world), 2);
        assert_eq!(entry.get_selected_charges(&world), 5);
        entry.chosen_count = 2;
        assert_eq!(entry.get_selected_charges(&world), 12);
    }

    #[test]
    fn test_kind_discriminators() {
        assert!(Entry::dummy().is_null());
        let header = Entry::category(CategoryId::OTHER);
        assert!(header.is_category());
        assert!(!header.is_item());
        assert!(!header.is_selectable());
    }

    #[test]
    fn test_hidden_by_collapsed_pocket() {
        let mut world = ItemWorld::new();
        world.add_character(crate::world::Character::new(
            CharacterId::PLAYER,
            "You",
            Tripoint::default(),
        ));
        let bag = world
            .spawn(
                Item::new("bag", "bag", "container")
                    .with_pocket(Pocket::new(PocketKind::Container, 1000, 1000)),
                Location::Worn(CharacterId::PLAYER),
            )
            .expect("spawn");
        let rock = world
            .spawn(
                Item::new("rock", "rock", "other"),
                Location::Contained {
                    parent: bag,
                    pocket: 0,
                },
            )
            .expect("spawn");
        let arena = CollationArena::default();
        let entry = Entry::item(vec![rock], None, 0, 0, Some(bag));
        assert!(!entry.is_hidden(&world, &arena, None));
        world.set_collapsed(bag, true);
        assert!(entry.is_hidden(&world, &arena, None));
        assert!(!entry.is_hidden(&world, &arena, Some(false)));
    }

    #[test]
    fn test_collation_member_hidden_when_group_collapsed() {
        let mut world = ItemWorld::new();
        let a = arrows(&mut world, 1);
        let mut arena = CollationArena::default();
        let group = arena.insert(CollationGroup {
            tip: a,
            collapsed: true,
            enabled: true,
        });
        let mut member = Entry::item(vec![a], None, 0, 0, None);
        member.collation = Some(group);
        assert!(member.is_collation_entry());
        assert!(member.is_hidden(&world, &arena, None));
        member.chevron = true;
        assert!(member.is_collation_header());
        assert!(!member.is_hidden(&world, &arena, None));
    }

    #[test]
    fn test_same_entry_is_order_sensitive() {
        let a = ItemRef::new(1);
        let b = ItemRef::new(2);
        let x = Entry::item(vec![a, b], None, 0, 0, None);
        let y = Entry::item(vec![b, a], None, 0, 1, None);
        assert!(!x.same_entry(&y));
        assert!(x.same_entry(&x.clone()));
        assert_ne!(x.recategorized(CategoryId::OTHER).id(), x.id());
    }
}
