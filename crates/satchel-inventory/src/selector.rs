//! The selector: walks the item graph into columns and runs the session
//! level input handling shared by every specialized selector.
//!
//! Columns 0..3 are fixed: own inventory, map, own gear. Multiselectors
//! append a selection column after them.

use std::num::IntErrorKind;
use std::sync::Arc;
use std::time::Instant;

use satchel_common::{
    closest_points_first, direction_suffix, rl_dist, CharacterId, Color, EntryId, ItemRef,
    SelectorId, Tripoint,
};
use tracing::{debug, trace, warn};

use crate::category::{CategoryId, CategoryTable, ItemCategory};
use crate::column::{Column, NavigationMode};
use crate::entry::Entry;
use crate::error::InventoryError;
use crate::examine::{item_info, ExamineResult, InventoryExaminer};
use crate::focus::{FocusTarget, SharedFocus};
use crate::input::{Action, InventoryInput};
use crate::preset::{Preset, PresetContext};
use crate::render::{Align, LineSpec, RenderSurface, RightCell, TextSpan, UiDriver};
use crate::settings::{HighlightStyle, LayoutSettings, UiMode};
use crate::stats::{layout_stats, weight_volume_holster_stats, StatsBlock};
use crate::world::{ItemWorld, LocationKind};

/// Items carried in containers, or everything when columns merge.
pub const OWN_INV_COLUMN: usize = 0;
/// Items on the ground and in vehicles.
pub const MAP_COLUMN: usize = 1;
/// Wielded and worn items.
pub const OWN_GEAR_COLUMN: usize = 2;

/// How quick-select keys are handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvletPolicy {
    /// Digits for items the character does not carry
    #[default]
    Default,
    /// Digits, same as default
    Numeric,
    /// Letters from the hotkey pool
    Alpha,
}

/// Column a walk step writes into.
enum Dest<'c> {
    /// The selector's gear column
    Gear,
    /// Any other column
    Col(&'c mut Column),
}

/// Counters carried across graph walks.
#[derive(Debug, Default)]
struct WalkState {
    generation: u64,
    added_any: bool,
}

/// One pass over the containment graph.
struct Walk<'a> {
    world: &'a ItemWorld,
    preset: &'a Arc<dyn Preset>,
    categories: &'a CategoryTable,
    layout: &'a LayoutSettings,
    who: CharacterId,
    hierarchy: bool,
    state: &'a mut WalkState,
}

impl Walk<'_> {
    fn ctx(&self) -> PresetContext<'_> {
        PresetContext::new(self.world, self.categories, self.layout, self.who)
    }

    fn temp_column(&self) -> Column {
        let mut column = Column::new(Arc::clone(self.preset));
        column.set_hierarchy(self.hierarchy);
        column
    }

    fn add_entry<'c>(
        &mut self,
        column: &'c mut Column,
        locations: Vec<ItemRef>,
        custom: Option<CategoryId>,
        topmost: Option<ItemRef>,
    ) -> Option<&'c mut Entry> {
        let first = *locations.first()?;
        if !self.preset.is_shown(self.world, first) {
            return None;
        }
        self.state.added_any = true;
        self.state.generation += 1;
        let mut entry = Entry::item(locations, custom, 0, self.state.generation, topmost);
        entry.collapsed = self.world.get(first).is_some_and(|it| it.is_collapsed());
        let ctx = self.ctx();
        Some(column.add_entry(&ctx, entry))
    }

    fn splice(&self, from: &mut Column, into: &mut Column) {
        let ctx = self.ctx();
        for entry in from.drain_items() {
            into.add_entry(&ctx, entry);
        }
    }

    /// Children first, then the item itself, then the children are spliced
    /// into their column. Returns true if anything became visible.
    #[allow(clippy::too_many_arguments)]
    fn add_entry_rec<'c>(
        &mut self,
        gear: &mut Column,
        mut entry_dest: Dest<'c>,
        children_dest: Option<Dest<'c>>,
        loc: ItemRef,
        entry_cat: Option<CategoryId>,
        children_cat: Option<CategoryId>,
        topmost: Option<ItemRef>,
        indent: usize,
    ) -> bool {
        let shown = self.preset.is_shown(self.world, loc);
        let child_topmost = if shown { topmost.or(Some(loc)) } else { None };
        let child_indent = if shown { indent + 2 } else { indent };

        let mut children = self.temp_column();
        let mut visible = self.add_contained_items(
            gear,
            loc,
            &mut children,
            children_cat,
            child_topmost,
            child_indent,
        );

        let added = match &mut entry_dest {
            Dest::Gear => self.add_entry(gear, vec![loc], entry_cat, topmost),
            Dest::Col(col) => self.add_entry(col, vec![loc], entry_cat, topmost),
        };
        if let Some(entry) = added {
            entry.chevron = visible;
            entry.indent = indent;
            visible = true;
        }

        match children_dest.unwrap_or(entry_dest) {
            Dest::Gear => self.splice(&mut children, gear),
            Dest::Col(col) => self.splice(&mut children, col),
        }
        visible
    }

    /// Walks the standard pockets of `container`. Ablative plates worn in
    /// a carrier are routed to the gear column as worn items.
    fn add_contained_items(
        &mut self,
        gear: &mut Column,
        container: ItemRef,
        column: &mut Column,
        custom: Option<CategoryId>,
        topmost: Option<ItemRef>,
        indent: usize,
    ) -> bool {
        match self.world.get(container) {
            Some(it) if !it.flags.no_unload => {}
            _ => return false,
        }
        let mut visible = false;
        for child in self.world.contents(container) {
            if self.world.is_worn_ablative(container, child) {
                let worn = Some(CategoryId::ITEMS_WORN);
                visible |= self.add_entry_rec(gear, Dest::Gear, None, child, worn, worn, topmost, indent);
            } else {
                visible |= self.add_entry_rec(
                    gear,
                    Dest::Col(&mut *column),
                    None,
                    child,
                    custom,
                    custom,
                    topmost,
                    indent,
                );
            }
        }
        visible
    }
}

/// Category of wielded or worn equipment, if the item is either.
#[must_use]
pub fn wielded_worn_category(world: &ItemWorld, who: CharacterId, loc: ItemRef) -> Option<CategoryId> {
    if world.is_wielded_by(who, loc) {
        return Some(CategoryId::WEAPON_HELD);
    }
    let ablative = world
        .parent(loc)
        .is_some_and(|parent| world.is_worn_ablative(parent, loc));
    if world.is_worn_by(who, loc) || ablative {
        let item = world.get(loc)?;
        return Some(if item.flags.fuel_source {
            CategoryId::BIONIC_FUEL_SOURCE
        } else if item.flags.integrated {
            CategoryId::INTEGRATED
        } else {
            CategoryId::ITEMS_WORN
        });
    }
    None
}

/// Base of all selectors.
#[derive(Debug)]
pub struct InventorySelector {
    id: SelectorId,
    who: CharacterId,
    preset: Arc<dyn Preset>,
    categories: CategoryTable,
    layout: LayoutSettings,
    columns: Vec<Column>,
    active_column: usize,
    mode: NavigationMode,
    ui_mode: UiMode,
    filter: String,
    walk: WalkState,
    categorize_map_items: bool,
    invlet_policy: InvletPolicy,
    use_invlet: bool,
    multiselect: bool,
    display_stats: bool,
    title: String,
    hint: String,
    focus: SharedFocus,
    hovered: Option<(usize, EntryId)>,
    viewport_width: f32,
    forced_width: Option<f32>,
}

impl InventorySelector {
    /// Creates a selector browsing as `who`.
    #[must_use]
    pub fn new(
        who: CharacterId,
        preset: Arc<dyn Preset>,
        layout: LayoutSettings,
        ui_mode: UiMode,
        focus: SharedFocus,
    ) -> Self {
        let hierarchy = ui_mode == UiMode::Hierarchy;
        let columns = (0..3)
            .map(|_| {
                let mut column = Column::new(Arc::clone(&preset));
                column.set_hierarchy(hierarchy);
                column
            })
            .collect();
        Self {
            id: SelectorId::new(),
            who,
            preset,
            categories: CategoryTable::new(),
            layout,
            columns,
            active_column: OWN_INV_COLUMN,
            mode: NavigationMode::Item,
            ui_mode,
            filter: String::new(),
            walk: WalkState::default(),
            categorize_map_items: false,
            invlet_policy: InvletPolicy::Default,
            use_invlet: true,
            multiselect: false,
            display_stats: true,
            title: String::new(),
            hint: String::new(),
            focus,
            hovered: None,
            viewport_width: 0.0,
            forced_width: None,
        }
    }

    /// Registers the world's category definitions.
    pub fn load_categories(&mut self, world: &ItemWorld) {
        for category in world.categories() {
            self.categories.intern(category.clone());
        }
    }

    /// Identity used for focus ownership.
    #[must_use]
    pub const fn id(&self) -> SelectorId {
        self.id
    }

    /// Character browsing.
    #[must_use]
    pub const fn who(&self) -> CharacterId {
        self.who
    }

    /// Preset in use.
    #[must_use]
    pub fn preset(&self) -> &Arc<dyn Preset> {
        &self.preset
    }

    /// Interned categories.
    #[must_use]
    pub const fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    /// Interned categories, mutably.
    pub fn categories_mut(&mut self) -> &mut CategoryTable {
        &mut self.categories
    }

    /// Layout tunables.
    #[must_use]
    pub const fn layout(&self) -> &LayoutSettings {
        &self.layout
    }

    /// Focus broker shared with sibling selectors.
    #[must_use]
    pub fn focus(&self) -> &SharedFocus {
        &self.focus
    }

    /// Preset context over this selector's state.
    #[must_use]
    pub fn ctx<'a>(&'a self, world: &'a ItemWorld) -> PresetContext<'a> {
        PresetContext::new(world, &self.categories, &self.layout, self.who)
    }

    /// All columns.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// All columns, mutably.
    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// A column; logs and returns `None` past the end.
    #[must_use]
    pub fn column(&self, index: usize) -> Option<&Column> {
        let column = self.columns.get(index);
        if column.is_none() {
            warn!(
                "{}",
                InventoryError::ColumnOutOfRange {
                    index,
                    count: self.columns.len()
                }
            );
        }
        column
    }

    /// Appends a column and returns its index.
    pub fn append_column(&mut self, mut column: Column) -> usize {
        column.on_mode_change(self.mode);
        column.set_hierarchy(self.ui_mode == UiMode::Hierarchy);
        self.columns.push(column);
        self.columns.len() - 1
    }

    /// Title line.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Title line.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Hint lines, separated by newlines.
    pub fn set_hint(&mut self, hint: impl Into<String>) {
        self.hint = hint.into();
    }

    /// Hint lines.
    #[must_use]
    pub fn hint(&self) -> &str {
        &self.hint
    }

    /// Shows or hides the stats block.
    pub fn set_display_stats(&mut self, display: bool) {
        self.display_stats = display;
    }

    /// Whether the stats block is drawn.
    #[must_use]
    pub const fn display_stats(&self) -> bool {
        self.display_stats
    }

    /// Sets the key assignment policy.
    pub fn set_invlet_policy(&mut self, policy: InvletPolicy) {
        self.invlet_policy = policy;
    }

    /// Key assignment policy.
    #[must_use]
    pub const fn invlet_policy(&self) -> InvletPolicy {
        self.invlet_policy
    }

    /// Turns assigned keys on or off.
    pub fn set_use_invlet(&mut self, use_invlet: bool) {
        self.use_invlet = use_invlet;
    }

    /// Routes map items into the own-inventory column.
    pub fn set_categorize_map_items(&mut self, categorize: bool) {
        self.categorize_map_items = categorize;
    }

    /// Marks the selector as choosing several entries.
    pub fn set_multiselect(&mut self, multiselect: bool) {
        self.multiselect = multiselect;
    }

    /// Whether several entries may be chosen.
    #[must_use]
    pub const fn is_multiselect(&self) -> bool {
        self.multiselect
    }

    /// Lays everything out as if the client were `width` wide. Zero forces a
    /// single column.
    pub fn force_width(&mut self, width: Option<f32>) {
        self.forced_width = width;
    }

    /// Hierarchy or categories.
    #[must_use]
    pub const fn ui_mode(&self) -> UiMode {
        self.ui_mode
    }

    /// Item or category navigation.
    #[must_use]
    pub const fn navigation_mode(&self) -> NavigationMode {
        self.mode
    }

    /// No item got an entry.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.walk.added_any
    }

    /// Current filter text.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Index of the active column.
    #[must_use]
    pub const fn active_column(&self) -> usize {
        self.active_column
    }

    /// Makes a column active.
    pub fn set_active_column(&mut self, index: usize) {
        if index < self.columns.len() {
            self.active_column = index;
        } else {
            warn!(
                "{}",
                InventoryError::ColumnOutOfRange {
                    index,
                    count: self.columns.len()
                }
            );
        }
    }

    // Graph walk

    /// Adds an entry straight into a column.
    pub fn add_entry(
        &mut self,
        world: &ItemWorld,
        column: usize,
        locations: Vec<ItemRef>,
        custom: Option<CategoryId>,
    ) -> Option<EntryId> {
        let mut walk = Walk {
            world,
            preset: &self.preset,
            categories: &self.categories,
            layout: &self.layout,
            who: self.who,
            hierarchy: self.ui_mode == UiMode::Hierarchy,
            state: &mut self.walk,
        };
        let Some(col) = self.columns.get_mut(column) else {
            warn!(
                "{}",
                InventoryError::ColumnOutOfRange {
                    index: column,
                    count: self.columns.len()
                }
            );
            return None;
        };
        walk.add_entry(col, locations, custom, None).map(|e| e.id())
    }

    /// Adds the contents of a container to the own-inventory column.
    pub fn add_contained_items(&mut self, world: &ItemWorld, container: ItemRef) {
        let hierarchy = self.ui_mode == UiMode::Hierarchy;
        let mut walk = Walk {
            world,
            preset: &self.preset,
            categories: &self.categories,
            layout: &self.layout,
            who: self.who,
            hierarchy,
            state: &mut self.walk,
        };
        let [inv, _, gear, ..] = self.columns.as_mut_slice() else {
            return;
        };
        walk.add_contained_items(gear, container, inv, None, None, 0);
        if !hierarchy {
            inv.set_indent_override(Some(false));
        }
    }

    /// Adds the wielded item and worn items of a character.
    pub fn add_character_items(&mut self, world: &ItemWorld, character: CharacterId) {
        let Ok(ch) = world.character(character) else {
            warn!("No character {character} to list items of");
            return;
        };
        let hierarchy = self.ui_mode == UiMode::Hierarchy;
        let mut walk = Walk {
            world,
            preset: &self.preset,
            categories: &self.categories,
            layout: &self.layout,
            who: self.who,
            hierarchy,
            state: &mut self.walk,
        };
        let [inv, _, gear, ..] = self.columns.as_mut_slice() else {
            return;
        };
        for top in ch.wielded.iter().chain(&ch.worn).copied() {
            let cat = if ch.wielded == Some(top) {
                Some(CategoryId::WEAPON_HELD)
            } else {
                wielded_worn_category(world, character, top)
            };
            if hierarchy {
                walk.add_entry_rec(gear, Dest::Gear, None, top, cat, cat, None, 0);
            } else {
                walk.add_entry_rec(gear, Dest::Gear, Some(Dest::Col(&mut *inv)), top, cat, None, None, 0);
            }
        }
        if !hierarchy {
            inv.set_indent_override(Some(false));
        }
    }

    /// Directional variant of `base` as seen from the browsing character.
    pub fn naturalize_category(&mut self, world: &ItemWorld, base: ItemCategory, pos: Tripoint) -> CategoryId {
        let from = world
            .character(self.who)
            .map(|c| c.position)
            .unwrap_or_default();
        let dist = rl_dist(from, pos);
        self.categories
            .naturalize(base, &direction_suffix(from, pos), dist)
    }

    fn add_map_like_items(&mut self, world: &ItemWorld, pos: Tripoint, base: ItemCategory, items: &[ItemRef]) {
        let hierarchy = self.ui_mode == UiMode::Hierarchy;
        let custom = hierarchy.then(|| self.naturalize_category(world, base, pos));
        let target = if self.categorize_map_items {
            OWN_INV_COLUMN
        } else {
            MAP_COLUMN
        };
        let mut walk = Walk {
            world,
            preset: &self.preset,
            categories: &self.categories,
            layout: &self.layout,
            who: self.who,
            hierarchy,
            state: &mut self.walk,
        };
        let mut temp = walk.temp_column();
        let mut temp_cont = walk.temp_column();
        let [inv, map, gear, ..] = self.columns.as_mut_slice() else {
            return;
        };
        for &item in items {
            walk.add_entry_rec(
                gear,
                Dest::Col(&mut temp),
                Some(Dest::Col(&mut temp_cont)),
                item,
                custom,
                custom,
                None,
                0,
            );
        }
        let col = if target == OWN_INV_COLUMN { inv } else { map };
        walk.splice(&mut temp, col);
        walk.splice(&mut temp_cont, col);
        if !hierarchy {
            col.set_indent_override(Some(false));
        }
    }

    /// Adds the items lying on a tile.
    pub fn add_map_items(&mut self, world: &ItemWorld, pos: Tripoint) {
        let Some(tile) = world.tile(pos) else {
            return;
        };
        if !tile.accessible || tile.items.is_empty() {
            return;
        }
        let name = tile.name.to_uppercase();
        let items = tile.items.clone();
        self.add_map_like_items(world, pos, ItemCategory::new(name.clone(), name, 100), &items);
    }

    /// Adds the cargo of a vehicle part on a tile.
    pub fn add_vehicle_items(&mut self, world: &ItemWorld, pos: Tripoint) {
        let Some(cargo) = world.tile(pos).and_then(|t| t.vehicle.as_ref()) else {
            return;
        };
        if cargo.items.is_empty() {
            return;
        }
        let name = cargo.name.to_uppercase();
        let items = cargo.items.clone();
        self.add_map_like_items(world, pos, ItemCategory::new(name.clone(), name, 200), &items);
    }

    /// Adds ground and vehicle items around the character, nearest first.
    pub fn add_nearby_items(&mut self, world: &ItemWorld, radius: i32) {
        let Ok(center) = world.character(self.who).map(|c| c.position) else {
            return;
        };
        for pos in closest_points_first(center, radius) {
            let reachable = pos == center || world.tile(pos).is_some_and(|t| t.accessible);
            if !reachable {
                continue;
            }
            self.add_map_items(world, pos);
            self.add_vehicle_items(world, pos);
        }
    }

    /// Drops every entry.
    pub fn clear_items(&mut self) {
        for column in &mut self.columns {
            column.clear();
        }
        self.walk.added_any = false;
        self.hovered = None;
    }

    // Layout

    /// Applies a filter to every column.
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
        for column in &mut self.columns {
            column.invalidate();
        }
        debug!("Filter set to {:?}", self.filter);
    }

    /// Paging, column merging, key assignment and the active column.
    pub fn prepare_layout(&mut self, world: &ItemWorld) {
        let started = Instant::now();
        let ctx = PresetContext::new(world, &self.categories, &self.layout, self.who);
        for column in &mut self.columns {
            column.prepare_paging(&ctx, &self.filter);
        }
        let width = self
            .forced_width
            .or((self.viewport_width > 0.0).then_some(self.viewport_width));
        if let Some(width) = width {
            self.rearrange_columns(world, width);
        }
        self.reassign_custom_invlets(world);
        self.refresh_active_column();
        debug!("prepare_layout took {} ms", started.elapsed().as_millis());
    }

    /// Merges the gear and map columns into own inventory when the widest
    /// column takes more than the overflow threshold of `client_width`.
    pub fn rearrange_columns(&mut self, world: &ItemWorld, client_width: f32) {
        for column in self.columns.iter_mut().filter(|c| c.is_selection()) {
            column.set_visibility(true);
        }
        let ctx = PresetContext::new(world, &self.categories, &self.layout, self.who);
        let mut max_width = 0.0_f32;
        for column in self.columns.iter_mut().filter(|c| c.visible()) {
            column.calculate_cell_widths(&ctx);
            max_width = max_width.max(column.cells_width());
        }
        let overflowed =
            client_width <= 0.0 || max_width / client_width > self.layout.overflow_threshold;
        if overflowed {
            if let [inv, map, gear, ..] = self.columns.as_mut_slice() {
                for source in [gear, map] {
                    if source.is_empty() {
                        continue;
                    }
                    if inv.is_empty() {
                        inv.set_indent_override(Some(source.indent_entries()));
                    }
                    source.move_entries_to(inv);
                    debug!("Merged a column into own inventory ({max_width} of {client_width} px)");
                }
                inv.prepare_paging(&ctx, &self.filter);
                inv.calculate_cell_widths(&ctx);
            }
        }
        let show_selection = client_width >= self.layout.selection_column_min_width;
        for column in self.columns.iter_mut().filter(|c| c.is_selection()) {
            column.set_visibility(show_selection);
        }
    }

    /// Hands out quick-select keys under the active policy.
    pub fn reassign_custom_invlets(&mut self, world: &ItemWorld) {
        let ctx = PresetContext::new(world, &self.categories, &self.layout, self.who);
        match self.invlet_policy {
            InvletPolicy::Default | InvletPolicy::Numeric => {
                let use_invlet = self.use_invlet && self.layout.numeric_invlets;
                let mut next = 0;
                for column in &mut self.columns {
                    column.prepare_paging(&ctx, &self.filter);
                    next = column.reassign_numeric_invlets(world, self.who, next, use_invlet);
                }
            }
            InvletPolicy::Alpha => {
                let mut pool: Vec<char> = if self.use_invlet {
                    self.layout.pickup_hotkeys.chars().collect()
                } else {
                    Vec::new()
                };
                for column in &self.columns {
                    for entry in column.entries() {
                        let own = entry
                            .any_item()
                            .and_then(|r| world.get(r))
                            .and_then(|it| it.invlet);
                        if let Some(c) = own {
                            pool.retain(|p| *p != c);
                        }
                    }
                }
                let mut idx = 0;
                for column in &mut self.columns {
                    column.prepare_paging(&ctx, &self.filter);
                    idx = column.reassign_alpha_invlets(world, idx, &pool);
                }
            }
        }
    }

    /// Moves to another column if the active one can no longer take focus.
    pub fn refresh_active_column(&mut self) {
        let usable = |c: &Column| c.visible() && c.activatable();
        if self.columns.get(self.active_column).is_some_and(usable) {
            return;
        }
        if let Some(next) = (1..=self.columns.len())
            .map(|step| (self.active_column + step) % self.columns.len())
            .find(|i| usable(&self.columns[*i]))
        {
            trace!("Active column {} -> {next}", self.active_column);
            self.active_column = next;
        }
    }

    // Highlight and focus

    /// Column and identity of the hovered entry, else the focused one.
    #[must_use]
    pub fn highlighted(&self) -> Option<(usize, EntryId)> {
        if let Some((col, id)) = self.hovered {
            if self.columns.get(col).and_then(|c| c.find_by_id(id)).is_some() {
                return Some((col, id));
            }
        }
        let focused_in = |i: usize| {
            self.columns
                .get(i)
                .and_then(Column::get_highlighted)
                .map(|e| (i, e.id()))
        };
        focused_in(self.active_column).or_else(|| (0..self.columns.len()).find_map(focused_in))
    }

    /// The hovered entry, else the focused one.
    #[must_use]
    pub fn get_highlighted(&self) -> Option<&Entry> {
        let (col, id) = self.highlighted()?;
        self.columns.get(col)?.find_any(id)
    }

    /// The entry under the pointer, if this selector drew it.
    #[must_use]
    pub fn hovered(&self) -> Option<(usize, EntryId)> {
        self.hovered
    }

    /// Entry with a given identity in any column.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.columns.iter().find_map(|c| c.find_any(id))
    }

    /// Entry with a given identity in any column, mutably.
    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.columns.iter_mut().find_map(|c| c.find_any_mut(id))
    }

    /// Broadcasts a changed entry to every column.
    pub fn on_change(&mut self, world: &ItemWorld, entry: &Entry) {
        let ctx = PresetContext::new(world, &self.categories, &self.layout, self.who);
        for column in &mut self.columns {
            column.on_change(&ctx, entry);
        }
    }

    /// Column holding the entry.
    #[must_use]
    pub fn column_of(&self, id: EntryId) -> Option<usize> {
        self.columns.iter().position(|c| c.find_any(id).is_some())
    }

    /// The entry belongs to one of this selector's columns.
    #[must_use]
    pub fn is_mine(&self, id: EntryId) -> bool {
        self.column_of(id).is_some()
    }

    /// Shown item entry answering to a key.
    #[must_use]
    pub fn find_by_invlet(&self, world: &ItemWorld, ch: char) -> Option<(usize, EntryId)> {
        self.columns.iter().enumerate().find_map(|(i, c)| {
            c.find_by_invlet(world, ch)
                .map(|idx| (i, c.entries()[idx].id()))
        })
    }

    /// Highlights the entry holding `loc`. With `hidden` the entry may be
    /// folded away; its parent is expanded first.
    pub fn highlight(&mut self, world: &mut ItemWorld, loc: ItemRef, hidden: bool, front_only: bool) -> bool {
        let mut res = false;
        for i in 0..self.columns.len() {
            if !self.columns[i].visible() {
                continue;
            }
            let found = if hidden {
                self.unfold_and_highlight(world, i, loc)
            } else {
                self.columns[i].highlight_location(loc, front_only)
            };
            if found && !res && self.columns[i].activatable() {
                self.set_active_column(i);
                res = true;
            }
        }
        res
    }

    fn unfold_and_highlight(&mut self, world: &mut ItemWorld, col: usize, loc: ItemRef) -> bool {
        let column = &self.columns[col];
        let Some(idx) = column.find_by_location(loc, true) else {
            return false;
        };
        let hidden = &column.hidden_entries()[idx];
        let parent = if hidden.is_collation_entry() {
            hidden
                .collation
                .and_then(|g| column.collations().get(g))
                .map(|g| g.tip)
        } else {
            hidden.topmost_parent
        };
        let Some(parent) = parent else {
            return false;
        };
        let Some(pidx) = column.find_by_location(parent, false) else {
            return false;
        };
        self.columns[col].set_collapsed(world, pidx, false);
        self.prepare_layout(world);
        self.columns[col].highlight_location(loc, true)
    }

    /// Highlights the first of `locs` found.
    pub fn highlight_one_of(&mut self, world: &mut ItemWorld, locs: &[ItemRef], hidden: bool) -> bool {
        self.prepare_layout(world);
        locs.iter().any(|loc| self.highlight(world, *loc, hidden, false))
    }

    /// Marks entries holding the highlighted item's parent and entries
    /// inside the highlighted item.
    pub fn update_parent_child_highlight(&mut self, world: &ItemWorld) {
        let selected = self
            .get_highlighted()
            .filter(|e| e.is_item())
            .map(|e| e.locations.clone());
        let parent = selected
            .as_ref()
            .and_then(|l| l.first())
            .and_then(|r| world.parent(*r));
        for column in &mut self.columns {
            for entry in column.entries_mut() {
                let as_parent = parent.is_some_and(|p| entry.locations.contains(&p));
                let as_child = selected.as_ref().is_some_and(|sel| {
                    entry
                        .any_item()
                        .and_then(|r| world.parent(r))
                        .is_some_and(|p| sel.contains(&p))
                });
                entry.highlight_as_parent = as_parent;
                entry.highlight_as_child = as_child;
            }
        }
    }

    /// Next member of the highlighted collation group; the previous one when
    /// the highlighted member is last.
    #[must_use]
    pub fn get_collation_next(&self) -> Option<ItemRef> {
        let column = self.columns.get(self.active_column)?;
        let entry = column.get_highlighted()?;
        if !entry.is_collated() {
            return None;
        }
        let current = entry.any_item()?;
        if entry.is_collation_header() {
            return Some(current);
        }
        let tip = entry
            .collation
            .and_then(|g| column.collations().get(g))?
            .tip;
        let header = &column.entries()[column.find_by_location(tip, false)?];
        let pos = header.locations.iter().position(|l| *l == current)?;
        if pos + 1 < header.locations.len() {
            header.locations.get(pos + 1).copied()
        } else {
            pos.checked_sub(1).and_then(|p| header.locations.get(p).copied())
        }
    }

    /// Reads this frame's focus reports from the broker.
    pub fn sync_focus(&mut self, world: &ItemWorld) {
        let (focused, hovered) = {
            let broker = self.focus.lock();
            (broker.focused_for(self.id), broker.hovered_for(self.id))
        };
        self.hovered = hovered.map(|t| (t.column, t.entry));
        if let Some(target) = focused {
            let owned = self
                .columns
                .get(target.column)
                .and_then(|c| c.find_by_id(target.entry))
                .is_some();
            if owned {
                for (i, column) in self.columns.iter_mut().enumerate() {
                    column.set_highlighted((i == target.column).then_some(target.entry));
                }
                self.active_column = target.column;
            }
        } else if self.get_highlighted().is_none() {
            self.refresh_active_column();
            if let Some(column) = self.columns.get_mut(self.active_column) {
                column.highlight_first();
            }
        }
        self.update_parent_child_highlight(world);
    }

    // Mode switches

    /// Switches item and category navigation.
    pub fn toggle_navigation_mode(&mut self) {
        self.mode = self.mode.toggled();
        for column in &mut self.columns {
            column.on_mode_change(self.mode);
        }
        debug!("Navigation mode is now {:?}", self.mode);
    }

    /// Skips or stops skipping unselectable rows.
    pub fn toggle_skip_unselectable(&mut self) {
        let skip = !self
            .columns
            .first()
            .is_some_and(Column::skip_unselectable);
        for column in &mut self.columns {
            column.toggle_skip_unselectable(skip);
        }
    }

    /// Switches between hierarchy and categories, re-deriving every custom
    /// category and keeping the highlighted item highlighted.
    pub fn toggle_categorize_contained(&mut self, world: &mut ItemWorld) {
        let highlighted = self
            .get_highlighted()
            .filter(|e| e.is_item())
            .map(|e| e.locations.clone())
            .unwrap_or_default();
        let ctx = PresetContext::new(world, &self.categories, &self.layout, self.who);

        if self.ui_mode == UiMode::Hierarchy {
            if let [inv, _, gear, ..] = self.columns.as_mut_slice() {
                let mut keep = Vec::new();
                for entry in gear.drain_items() {
                    let contained = entry.any_item().and_then(|loc| {
                        world
                            .parent(loc)
                            .filter(|parent| !world.is_worn_ablative(*parent, loc))
                    });
                    if contained.is_some() {
                        inv.add_entry(&ctx, entry);
                    } else {
                        keep.push(entry);
                    }
                }
                for entry in keep {
                    gear.add_entry(&ctx, entry);
                }
            }
            for column in self.columns.iter_mut().filter(|c| !c.is_selection()) {
                column.uncollate();
                for entry in column.items_mut() {
                    entry.custom_category = entry
                        .any_item()
                        .and_then(|loc| wielded_worn_category(world, self.who, loc));
                    entry.reset_cell_cache();
                }
                column.set_indent_override(Some(false));
                column.set_hierarchy(false);
                column.invalidate();
            }
            self.ui_mode = UiMode::Categories;
        } else {
            if let [inv, _, gear, ..] = self.columns.as_mut_slice() {
                for entry in inv.drain_items() {
                    gear.add_entry(&ctx, entry);
                }
            }
            let mut recategorized = Vec::new();
            for (ci, column) in self.columns.iter().enumerate() {
                if column.is_selection() {
                    continue;
                }
                for entry in column.items() {
                    let Some(loc) = entry.any_item() else { continue };
                    let root = world.root(loc);
                    let on_character = world
                        .get(root)
                        .is_some_and(|it| it.location().kind() == LocationKind::Character);
                    recategorized.push((ci, entry.id(), root, on_character));
                }
            }
            for (ci, id, root, on_character) in recategorized {
                let custom = if on_character {
                    wielded_worn_category(world, self.who, root)
                } else {
                    let name = world.describe_location(root).to_uppercase();
                    let pos = world.position(root);
                    Some(self.naturalize_category(world, ItemCategory::new(name.clone(), name, 100), pos))
                };
                if let Some(entry) = self.columns[ci].find_any_mut(id) {
                    entry.custom_category = custom;
                    entry.reset_cell_cache();
                }
            }
            for column in self.columns.iter_mut().filter(|c| !c.is_selection()) {
                column.uncollate();
                column.set_indent_override(None);
                column.set_hierarchy(true);
                column.invalidate();
            }
            self.ui_mode = UiMode::Hierarchy;
        }
        debug!("Switched to {} mode", self.ui_mode.display_name());

        if !highlighted.is_empty() {
            self.highlight_one_of(world, &highlighted, false);
        }
        self.prepare_layout(world);
    }

    // Header, footer and input

    /// Footer text and color.
    #[must_use]
    pub fn get_footer(&self) -> (String, Color) {
        if self.has_available_choices() {
            (self.mode.label().to_string(), self.mode.color())
        } else {
            ("There are no available choices".to_string(), Color::Red)
        }
    }

    /// Some column offers a selectable entry.
    #[must_use]
    pub fn has_available_choices(&self) -> bool {
        self.columns.iter().any(Column::has_available_choices)
    }

    /// Carry stats of the browsing character.
    #[must_use]
    pub fn default_stats(&self, world: &ItemWorld) -> Option<StatsBlock> {
        world
            .carry_stats(self.who)
            .ok()
            .map(|s| weight_volume_holster_stats(&s))
    }

    /// Asks for a number. Garbage yields `None`, overflow the maximum.
    pub fn query_count(&self, driver: &mut dyn UiDriver, init: Option<char>) -> Option<u32> {
        let initial = init.map(String::from).unwrap_or_default();
        let text = driver.query_text("Enter amount", &initial)?;
        match text.trim().parse::<u32>() {
            Ok(n) => Some(n),
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => Some(u32::MAX),
            Err(_) => None,
        }
    }

    /// Shows the details of an item.
    pub fn action_examine(&self, world: &ItemWorld, driver: &mut dyn UiDriver, item: ItemRef) {
        driver.notify(&item_info(world, item).join("\n"));
    }

    /// Session-level input: mode switches, filtering, examining; everything
    /// else goes to the columns.
    pub fn on_input(&mut self, world: &mut ItemWorld, driver: &mut dyn UiDriver, input: InventoryInput) {
        let highlighted_item = self.get_highlighted().and_then(Entry::any_item);
        match input.action {
            Action::CategorySelection => self.toggle_navigation_mode(),
            Action::ViewCategoryMode => self.toggle_categorize_contained(world),
            Action::ExamineContents => {
                if let Some(item) = highlighted_item {
                    let mut examiner = InventoryExaminer::new(
                        world,
                        self.who,
                        item,
                        self.layout.clone(),
                        Arc::clone(&self.focus),
                    );
                    match examiner.execute(world, driver) {
                        ExamineResult::NoContentsToExamine => self.action_examine(world, driver, item),
                        ExamineResult::ExaminedWithChanges => {
                            for column in &mut self.columns {
                                column.invalidate();
                            }
                            self.prepare_layout(world);
                        }
                        ExamineResult::ExaminedUnchanged => {}
                    }
                }
            }
            Action::Examine => {
                if let Some(item) = highlighted_item {
                    self.action_examine(world, driver, item);
                }
            }
            Action::InventoryFilter => {
                if let Some(text) = driver.query_text("Enter new inventory filter:", &self.filter) {
                    self.set_filter(text);
                    self.prepare_layout(world);
                }
            }
            Action::ResetFilter => {
                self.set_filter("");
                self.prepare_layout(world);
            }
            Action::ToggleSkipUnselectable => self.toggle_skip_unselectable(),
            action => {
                let highlighted = self
                    .get_highlighted()
                    .map(|e| e.locations.clone())
                    .unwrap_or_default();
                for column in &mut self.columns {
                    column.on_input(world, action);
                }
                if action == Action::ShowHideContentsAll {
                    for column in &mut self.columns {
                        column.cycle_hide_override();
                    }
                }
                if matches!(action, Action::ShowHideContents | Action::ShowHideContentsAll) {
                    for column in &mut self.columns {
                        column.invalidate();
                    }
                    self.highlight_one_of(world, &highlighted, false);
                } else {
                    self.prepare_layout(world);
                }
                self.refresh_active_column();
            }
        }
    }

    // Drawing

    /// Draws one frame and records what the surface reported.
    pub fn draw(&mut self, world: &ItemWorld, surface: &mut dyn RenderSurface, stats: Option<&StatsBlock>) {
        let viewport = surface.viewport();
        if (viewport.width - self.viewport_width).abs() > f32::EPSILON
            || self.columns.iter().any(|c| !c.is_valid())
        {
            self.viewport_width = viewport.width;
            self.prepare_layout(world);
        }
        self.draw_header(surface, stats);
        surface.separator();
        let visible: Vec<usize> = (0..self.columns.len())
            .filter(|i| self.columns[*i].visible())
            .collect();
        for &i in &visible {
            surface.begin_column(i, self.columns[i].cells_width());
            self.draw_column(world, surface, i);
            surface.end_column();
        }
        surface.separator();
        let (footer, color) = self.get_footer();
        if !footer.is_empty() {
            surface.draw_line(&LineSpec::text(footer, color));
        }
    }

    /// Title, hint lines and the stats block.
    pub fn draw_header(&self, surface: &mut dyn RenderSurface, stats: Option<&StatsBlock>) {
        if !self.title.is_empty() {
            surface.draw_line(&LineSpec::text(self.title.clone(), Color::White));
        }
        for line in self.hint.lines() {
            surface.draw_line(&LineSpec::text(line, Color::LightGray));
        }
        if !self.display_stats {
            return;
        }
        if let Some(block) = stats {
            for spans in layout_stats(block) {
                surface.draw_line(&LineSpec {
                    spans,
                    align: Align::Right,
                    ..LineSpec::text("", Color::LightGray)
                });
            }
        }
    }

    /// Draws the shown entries of one column.
    pub fn draw_column(&mut self, world: &ItemWorld, surface: &mut dyn RenderSurface, index: usize) {
        let ctx = PresetContext::new(world, &self.categories, &self.layout, self.who);
        let Some(column) = self.columns.get_mut(index) else {
            return;
        };
        column.refresh_cells(&ctx);
        let request = column.take_focus_request();
        let column = &self.columns[index];

        let mut focused = None;
        let mut hovered = None;
        for entry in column.entries() {
            let line = entry_line(world, &self.layout, column, entry, self.multiselect, request);
            let response = surface.draw_line(&line);
            if !line.interactive {
                continue;
            }
            if response.focused {
                focused = Some(entry.id());
            }
            if response.hovered {
                hovered = Some(entry.id());
            }
        }

        let mut broker = self.focus.lock();
        let target = |entry| FocusTarget {
            owner: self.id,
            column: index,
            entry,
        };
        if let Some(id) = focused {
            broker.report_focus(target(id));
        }
        if let Some(id) = hovered {
            broker.report_hover(target(id));
        }
    }

    /// Runs one frame through the driver and syncs focus afterwards.
    pub fn render(&mut self, world: &ItemWorld, driver: &mut dyn UiDriver, stats: Option<&StatsBlock>) {
        self.focus.lock().begin_frame();
        driver.frame(&mut |surface| self.draw(world, surface, stats));
        self.sync_focus(world);
    }
}

fn chevron_span(column: &Column, entry: &Entry, world: &ItemWorld) -> TextSpan {
    let is_container = entry
        .any_item()
        .and_then(|r| world.get(r))
        .is_some_and(|it| it.is_container());
    let hide_override = column.hide_override().filter(|_| is_container);
    let color = if entry.is_collation_header() {
        Color::LightBlue
    } else {
        match hide_override {
            Some(true) => Color::Red,
            Some(false) => Color::Green,
            None => Color::DarkGray,
        }
    };
    let folded = match hide_override {
        Some(hide) if !entry.is_collation_entry() => hide,
        _ => entry.collapsed,
    };
    TextSpan::new(if folded { "▶ " } else { "▼ " }, color)
}

fn entry_line(
    world: &ItemWorld,
    layout: &LayoutSettings,
    column: &Column,
    entry: &Entry,
    multiselect: bool,
    request: Option<EntryId>,
) -> LineSpec {
    let cells = entry.cached_cells();
    let text = |i: usize| {
        cells
            .and_then(|c| c.text.get(i))
            .cloned()
            .unwrap_or_default()
    };
    let widths = column.cell_widths();
    let right_cells = (1..widths.len())
        .map(|i| RightCell {
            text: text(i),
            color: Color::LightGray,
            width: widths[i],
        })
        .collect();

    if !entry.is_item() {
        let mut line = LineSpec::text(text(0), Color::Magenta);
        line.key = entry.id().raw();
        line.right_cells = right_cells;
        return line;
    }

    let selectable = entry.is_selectable();
    let color = if selectable {
        cells.map_or(Color::LightGray, |c| c.color)
    } else {
        Color::DarkGray
    };
    let mut spans = Vec::with_capacity(6);
    spans.push(match entry.get_invlet(world) {
        Some(c) => TextSpan::new(format!("{c} "), entry.get_invlet_color(world)),
        None => TextSpan::new("  ", Color::LightGray),
    });
    let marks = multiselect && column.allows_selecting() && column.activatable();
    if marks {
        let available = entry.get_available_count(world);
        spans.push(match entry.chosen_count {
            0 => TextSpan::new("- ", Color::DarkGray),
            n if n >= available => TextSpan::new("+ ", Color::LightGreen),
            _ => TextSpan::new("# ", Color::Yellow),
        });
    }
    let fixed = 2 + if layout.item_symbols { 2 } else { 0 } + if marks { 2 } else { 0 };
    let nest = column
        .get_entry_indent(entry, layout.item_symbols, multiselect)
        .saturating_sub(fixed);
    if nest > 0 {
        spans.push(TextSpan::new(" ".repeat(nest), Color::LightGray));
    }
    if layout.item_symbols {
        spans.push(TextSpan::new("* ", color));
    }
    if entry.chevron {
        spans.push(chevron_span(column, entry, world));
    }
    let mut main = color;
    if entry.highlight_as_parent || entry.highlight_as_child {
        match layout.highlight_style {
            HighlightStyle::Symbol => {
                let mark = if entry.highlight_as_parent { "<" } else { ">" };
                spans.push(TextSpan::new(mark, Color::White));
            }
            HighlightStyle::Color => main = Color::White,
        }
    }
    spans.push(TextSpan::new(text(0), main));

    LineSpec {
        key: entry.id().raw(),
        indent: 0,
        spans,
        right_cells,
        align: Align::Left,
        max_width: 0.0,
        interactive: selectable,
        request_focus: request == Some(entry.id()),
    }
}
