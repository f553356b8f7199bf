//! Sorted, filtered and collated lists of entries.
//!
//! A column keeps two lists: `entries` (shown, in display order, including
//! category headers after paging) and `hidden` (filtered out, folded away or
//! collated). Their union is the full entry set.

use std::cmp::Ordering;
use std::sync::Arc;

use satchel_common::{CharacterId, Color, EntryId, ItemRef};
use tracing::{debug, trace, warn};

use crate::category::CategoryId;
use crate::entry::{CollationArena, CollationGroup, CustomInvlet, Entry};
use crate::error::InventoryError;
use crate::filter::ItemFilter;
use crate::input::Action;
use crate::preset::{Preset, PresetContext, SelectionPreset};
use crate::world::ItemWorld;

/// What a "select all in context" action acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NavigationMode {
    /// Single entries
    #[default]
    Item,
    /// Whole category blocks
    Category,
}

impl NavigationMode {
    /// Returns the other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Item => Self::Category,
            Self::Category => Self::Item,
        }
    }

    /// Footer label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Item => "",
            Self::Category => "Category selection mode",
        }
    }

    /// Footer color.
    #[must_use]
    pub const fn color(self) -> Color {
        match self {
            Self::Item => Color::LightGray,
            Self::Category => Color::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Regular,
    /// Mirrors chosen entries under one fixed category.
    Selection(CategoryId),
}

/// One logical list of entries.
#[derive(Debug)]
pub struct Column {
    preset: Arc<dyn Preset>,
    kind: ColumnKind,
    entries: Vec<Entry>,
    hidden: Vec<Entry>,
    collations: CollationArena,
    cell_widths: Vec<f32>,
    paging_valid: bool,
    collated: bool,
    visibility: bool,
    hierarchy: bool,
    indent_override: Option<bool>,
    hide_override: Option<bool>,
    skip_unselectable: bool,
    mode: NavigationMode,
    focus_request: Option<EntryId>,
}

impl Column {
    /// Creates an empty column.
    #[must_use]
    pub fn new(preset: Arc<dyn Preset>) -> Self {
        let cells = preset.cells().len();
        Self {
            preset,
            kind: ColumnKind::Regular,
            entries: Vec::new(),
            hidden: Vec::new(),
            collations: CollationArena::default(),
            cell_widths: vec![0.0; cells],
            paging_valid: false,
            collated: false,
            visibility: true,
            hierarchy: false,
            indent_override: None,
            hide_override: None,
            skip_unselectable: false,
            mode: NavigationMode::Item,
            focus_request: None,
        }
    }

    /// Creates the selection summary column. It ignores filters, never hides
    /// entries and always shows its category header.
    #[must_use]
    pub fn selection(category: CategoryId) -> Self {
        let mut column = Self::new(Arc::new(SelectionPreset::default()));
        column.kind = ColumnKind::Selection(category);
        column.hide_override = Some(false);
        column.indent_override = Some(false);
        column
    }

    /// Preset in use.
    #[must_use]
    pub fn preset(&self) -> &Arc<dyn Preset> {
        &self.preset
    }

    /// Is the selection summary column.
    #[must_use]
    pub const fn is_selection(&self) -> bool {
        matches!(self.kind, ColumnKind::Selection(_))
    }

    /// Shown entries in display order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Shown entries, mutably.
    pub fn entries_mut(&mut self) -> &mut [Entry] {
        &mut self.entries
    }

    /// Hidden entries.
    #[must_use]
    pub fn hidden_entries(&self) -> &[Entry] {
        &self.hidden
    }

    /// Hidden entries, mutably.
    pub fn hidden_entries_mut(&mut self) -> &mut [Entry] {
        &mut self.hidden
    }

    /// Collation groups.
    #[must_use]
    pub fn collations(&self) -> &CollationArena {
        &self.collations
    }

    /// No shown entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Has something to show.
    #[must_use]
    pub fn visible(&self) -> bool {
        !self.entries.is_empty() && self.visibility && !self.preset.cells().is_empty()
    }

    /// Shows or hides the whole column.
    pub fn set_visibility(&mut self, visibility: bool) {
        self.visibility = visibility;
    }

    /// Entries may be chosen from this column.
    #[must_use]
    pub const fn allows_selecting(&self) -> bool {
        !self.is_selection()
    }

    /// Marks paging stale.
    pub fn invalidate(&mut self) {
        self.paging_valid = false;
    }

    /// Paging is up to date.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.paging_valid
    }

    /// Follows the selector's hierarchy mode.
    pub fn set_hierarchy(&mut self, hierarchy: bool) {
        if self.hierarchy != hierarchy {
            self.hierarchy = hierarchy;
            self.paging_valid = false;
        }
    }

    /// Forces indenting on or off, or back to the selector's mode.
    pub fn set_indent_override(&mut self, indent: Option<bool>) {
        self.indent_override = indent;
        self.paging_valid = false;
    }

    /// Entries are nested under their parents.
    #[must_use]
    pub fn indent_entries(&self) -> bool {
        self.indent_override.unwrap_or(self.hierarchy)
    }

    /// Identical siblings fold into groups.
    #[must_use]
    pub const fn collate_entries(&self) -> bool {
        !self.is_selection()
    }

    /// Column-wide fold override.
    #[must_use]
    pub const fn hide_override(&self) -> Option<bool> {
        self.hide_override
    }

    /// Cycles the fold override: none, show all, hide all.
    pub fn cycle_hide_override(&mut self) {
        if self.is_selection() {
            return;
        }
        self.hide_override = match self.hide_override {
            None => Some(false),
            Some(false) => Some(true),
            Some(true) => None,
        };
        self.paging_valid = false;
    }

    /// Skips unselectable rows when navigating.
    pub fn toggle_skip_unselectable(&mut self, skip: bool) {
        self.skip_unselectable = skip;
    }

    /// Follows the selector's navigation mode.
    pub fn on_mode_change(&mut self, mode: NavigationMode) {
        self.mode = mode;
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hidden.clear();
        self.collations.clear();
        self.collated = false;
        self.paging_valid = false;
    }

    /// Adds an entry, merging it into a stackable one when possible.
    pub fn add_entry(&mut self, ctx: &PresetContext<'_>, entry: Entry) -> &mut Entry {
        let hidden = entry.is_hidden(ctx.world, &self.collations, self.hide_override);
        let existing = {
            let dest = if hidden { &self.hidden } else { &self.entries };
            dest.iter().position(|e| e.same_entry(&entry))
        };
        if let Some(pos) = existing {
            if let Some(item) = entry.any_item() {
                warn!("{}", InventoryError::DuplicateEntry { item });
            }
            let dest = if hidden { &mut self.hidden } else { &mut self.entries };
            return &mut dest[pos];
        }
        self.paging_valid = false;

        let merge_into = entry.any_item().and_then(|first| {
            let world = ctx.world;
            let item = world.get(first)?;
            let category = entry.category_id(ctx);
            let where_ = item.location().kind();
            let position = world.position(first);
            let parent = world.parent(first);
            let collapsed = item.is_collapsed();
            let dest = if hidden { &self.hidden } else { &self.entries };
            dest.iter().position(|e| {
                let Some(found) = e.any_item() else {
                    return false;
                };
                !e.is_collated()
                    && e.category_id(ctx) == category
                    && world.get(found).is_some_and(|f| {
                        f.location().kind() == where_ && f.is_collapsed() == collapsed
                    })
                    && world.position(found) == position
                    && world.parent(found) == parent
                    && world.displays_stacked_with(first, found)
            })
        });

        let dest = if hidden { &mut self.hidden } else { &mut self.entries };
        if let Some(pos) = merge_into {
            trace!("Merged {} refs into a stack", entry.locations.len());
            dest[pos].locations.extend(entry.locations);
            return &mut dest[pos];
        }
        let mut entry = entry;
        entry.update_cache(ctx.world);
        dest.push(entry);
        let last = dest.len() - 1;
        &mut dest[last]
    }

    /// Moves every entry into `dest` without merging.
    pub fn move_entries_to(&mut self, dest: &mut Self) {
        let offset = dest.collations.absorb(&mut self.collations);
        let shift = |mut e: Entry| {
            e.collation = e.collation.map(|c| c.shifted(offset));
            e
        };
        dest.entries.extend(self.entries.drain(..).map(shift));
        dest.hidden.extend(self.hidden.drain(..).map(shift));
        dest.paging_valid = false;
        self.clear();
    }

    /// Partitions, sorts, collates and inserts category headers. Does
    /// nothing while paging is valid.
    pub fn prepare_paging(&mut self, ctx: &PresetContext<'_>, filter: &str) {
        let filter = match self.kind {
            ColumnKind::Regular => filter,
            ColumnKind::Selection(_) => "",
        };
        if !self.paging_valid {
            self.rebuild_paging(ctx, filter);
        }
        if let ColumnKind::Selection(category) = self.kind {
            if self.entries.is_empty() {
                self.entries.push(Entry::category(category));
            }
        }
    }

    fn rebuild_paging(&mut self, ctx: &PresetContext<'_>, filter: &str) {
        let item_filter = ItemFilter::parse(filter);
        let filtering = !item_filter.is_empty();
        let hide = self.hide_override;
        let is_visible = |e: &Entry, collations: &CollationArena| {
            e.any_item()
                .is_some_and(|r| item_filter.matches(ctx.world, ctx.categories, r))
                && ((filtering && !e.is_collation_entry())
                    || !e.is_hidden(ctx.world, collations, hide))
        };

        for e in std::mem::take(&mut self.hidden) {
            if is_visible(&e, &self.collations) {
                self.entries.push(e);
            } else {
                self.hidden.push(e);
            }
        }
        let preset = Arc::clone(&self.preset);
        for mut e in std::mem::take(&mut self.entries) {
            if !e.is_item() {
                continue;
            }
            e.cache_denial(preset.as_ref(), ctx, &mut self.collations);
            if is_visible(&e, &self.collations) {
                self.entries.push(e);
            } else {
                self.hidden.push(e);
            }
        }

        let mut entries = std::mem::take(&mut self.entries);
        entries.sort_by(|a, b| self.entry_order(ctx, a, b));
        self.entries = entries;

        if !self.collated && self.collate_entries() {
            self.collate(ctx);
        }

        let mut out = Vec::with_capacity(self.entries.len() + 8);
        let mut current = None;
        for e in self.entries.drain(..) {
            let category = e.category_id(ctx);
            if category != current {
                current = category;
                if let Some(c) = category {
                    out.push(Entry::category(c));
                }
            }
            out.push(e);
        }
        self.entries = out;
        self.paging_valid = true;
    }

    fn entry_order(&self, ctx: &PresetContext<'_>, a: &Entry, b: &Entry) -> Ordering {
        let (ca, cb) = (a.category_id(ctx), b.category_id(ctx));
        if ca == cb {
            if self.collated {
                return self.collated_sort_compare(ctx, a, b);
            }
            if self.indent_entries() {
                return self.indented_sort_compare(ctx, a, b);
            }
            return self.sort_compare(ctx, a, b);
        }
        match (ca, cb) {
            (Some(x), Some(y)) => self.preset.cat_sort_compare(ctx.categories, x, y),
            _ => ca.cmp(&cb),
        }
    }

    /// Selectable first, then user-lettered, then favorites, then the preset.
    #[must_use]
    pub fn sort_compare(&self, ctx: &PresetContext<'_>, a: &Entry, b: &Entry) -> Ordering {
        if a.is_selectable() != b.is_selectable() {
            return if a.is_selectable() {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
        let item = |e: &Entry| e.any_item().and_then(|r| ctx.world.get(r));
        let lettered = |e: &Entry| item(e).is_some_and(|it| it.invlet.is_some());
        if lettered(a) != lettered(b) {
            return if lettered(a) {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
        let favorite = |e: &Entry| item(e).is_some_and(|it| it.favorite);
        if favorite(a) != favorite(b) {
            return if favorite(a) {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
        self.preset.sort_compare(a, b)
    }

    /// The item followed by its ancestors that get entries of their own.
    fn path_to_top(&self, world: &ItemWorld, e: &Entry) -> Vec<ItemRef> {
        let Some(mut it) = e.any_item() else {
            return Vec::new();
        };
        let mut path = vec![it];
        while let Some(parent) = world.parent(it) {
            it = parent;
            if self.preset.is_shown(world, it) {
                path.push(it);
            }
        }
        path
    }

    fn stand_in(ctx: &PresetContext<'_>, item: ItemRef, generation: u64, enabled: bool) -> Entry {
        let mut e = Entry::item(vec![item], None, 0, generation, None).with_enabled(enabled);
        e.update_cache(ctx.world);
        e
    }

    /// Keeps children right below their parents.
    #[must_use]
    pub fn indented_sort_compare(&self, ctx: &PresetContext<'_>, a: &Entry, b: &Entry) -> Ordering {
        let pa = self.path_to_top(ctx.world, a);
        let pb = self.path_to_top(ctx.world, b);
        if pa.is_empty() || pb.is_empty() {
            return self.sort_compare(ctx, a, b);
        }
        let common = pa.len().min(pb.len());
        let mut li = pa.len() - common;
        let mut ri = pb.len() - common;
        let (mut pl, mut pr) = (pa[li], pb[ri]);
        if pl == pr {
            return pa.len().cmp(&pb.len());
        }
        while li < pa.len() && pa[li] != pb[ri] {
            pl = pa[li];
            pr = pb[ri];
            li += 1;
            ri += 1;
        }
        let ea = Self::stand_in(ctx, pl, a.generation, true);
        let eb = Self::stand_in(ctx, pr, b.generation, true);
        self.sort_compare(ctx, &ea, &eb)
    }

    /// Keeps collation headers on top of their members and sorts groups by
    /// their tip.
    #[must_use]
    pub fn collated_sort_compare(&self, ctx: &PresetContext<'_>, a: &Entry, b: &Entry) -> Ordering {
        if a.is_collated() && a.collation == b.collation {
            return match (a.is_collation_header(), b.is_collation_header()) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => self.sort_compare(ctx, a, b),
            };
        }
        let tip = |e: &Entry| match e.collation.and_then(|id| self.collations.get(id)) {
            Some(group) => Some((group.tip, group.enabled)),
            None => e.any_item().map(|r| (r, e.is_selectable())),
        };
        let (Some((ta, ena)), Some((tb, enb))) = (tip(a), tip(b)) else {
            return self.sort_compare(ctx, a, b);
        };
        let ea = Self::stand_in(ctx, ta, a.generation, ena);
        let eb = Self::stand_in(ctx, tb, b.generation, enb);
        if self.indent_entries() {
            self.indented_sort_compare(ctx, &ea, &eb)
        } else {
            self.sort_compare(ctx, &ea, &eb)
        }
    }

    fn collatable(&self, ctx: &PresetContext<'_>, outer: &Entry, e: &Entry, indent: bool) -> bool {
        let (Some(o), Some(x)) = (outer.any_item(), e.any_item()) else {
            return false;
        };
        let (Some(oi), Some(xi)) = (ctx.world.get(o), ctx.world.get(x)) else {
            return false;
        };
        e.category_id(ctx) == outer.category_id(ctx)
            && xi.favorite == oi.favorite
            && xi.type_id == oi.type_id
            && (!indent || ctx.world.parent(x) == ctx.world.parent(o))
            && (e.is_collation_header() || !e.chevron)
            && xi.is_same_relic(oi)
    }

    /// Folds identical siblings under a header entry.
    pub fn collate(&mut self, ctx: &PresetContext<'_>) {
        let indent = self.indent_entries();
        let mut groups = 0;
        let mut i = 0;
        while i < self.entries.len() {
            let outer = &self.entries[i];
            let Some(tip) = outer.any_item() else {
                i += 1;
                continue;
            };
            if outer.is_collated() || outer.chevron {
                i += 1;
                continue;
            }
            let mut j = i + 1;
            while j < self.entries.len() {
                if self.entries[j].is_collated()
                    || !self.collatable(ctx, &self.entries[i], &self.entries[j], indent)
                {
                    j += 1;
                    continue;
                }
                if !self.entries[i].is_collated() {
                    let outer = &mut self.entries[i];
                    let group = self.collations.insert(CollationGroup {
                        tip,
                        collapsed: true,
                        enabled: outer.is_selectable(),
                    });
                    outer.collation = Some(group);
                    self.hidden.push(outer.fresh_copy());
                    outer.chevron = true;
                    outer.collapsed = true;
                    outer.reset_cell_cache();
                    groups += 1;
                }
                let mut member = self.entries.remove(j);
                member.collation = self.entries[i].collation;
                self.entries[i]
                    .locations
                    .extend(member.locations.iter().copied());
                self.hidden.push(member);
            }
            i += 1;
        }
        if groups > 0 {
            debug!("Collated {groups} groups");
        }
        self.collated = true;
    }

    /// Removes collation headers and releases every member.
    pub fn uncollate(&mut self) {
        if !self.collated {
            return;
        }
        for list in [&mut self.entries, &mut self.hidden] {
            list.retain(|e| !e.is_collation_header());
            for e in list.iter_mut() {
                e.reset_collation();
            }
        }
        self.collations.clear();
        self.collated = false;
        self.paging_valid = false;
    }

    /// Collapses or expands a shown entry. On a collation header this folds
    /// the group.
    pub fn set_collapsed(&mut self, world: &mut ItemWorld, index: usize, collapse: bool) {
        let Some(entry) = self.entries.get_mut(index) else {
            return;
        };
        let mut collapsed = false;
        if entry.is_collation_header() {
            if let Some(group) = entry.collation.and_then(|id| self.collations.get_mut(id)) {
                group.collapsed = collapse;
                collapsed = true;
            }
        } else {
            for loc in &entry.locations {
                collapsed |= world.set_collapsed(*loc, collapse);
            }
        }
        if collapsed {
            entry.collapsed = collapse;
            entry.reset_cell_cache();
            self.paging_valid = false;
        }
    }

    /// Sets the favorite flag on every stack member.
    pub fn set_stack_favorite(&mut self, world: &mut ItemWorld, index: usize, favorite: bool) {
        let Some(entry) = self.entries.get_mut(index) else {
            return;
        };
        for loc in &entry.locations {
            world.set_favorite(*loc, favorite);
        }
        entry.update_cache(world);
        entry.reset_cell_cache();
    }

    /// Handles entry-level actions on the highlighted entry.
    pub fn on_input(&mut self, world: &mut ItemWorld, action: Action) {
        if self.visible() {
            if let Some(index) = self.highlighted_index() {
                match action {
                    Action::ToggleFavorite => {
                        let favorite = self.entries[index]
                            .any_item()
                            .and_then(|r| world.get(r))
                            .is_some_and(|it| it.favorite);
                        self.set_stack_favorite(world, index, !favorite);
                    }
                    Action::ShowHideContents => {
                        let collapsed = self.entries[index].collapsed;
                        self.set_collapsed(world, index, !collapsed);
                    }
                    _ => {}
                }
            }
        }
        if action == Action::ToggleFavorite {
            self.paging_valid = false;
        }
    }

    /// Keeps the selection column in sync with a changed entry.
    pub fn on_change(&mut self, ctx: &PresetContext<'_>, entry: &Entry) {
        let ColumnKind::Selection(category) = self.kind else {
            return;
        };
        let mut mine = entry.recategorized(category);
        mine.reset_collation();
        mine.chevron = false;
        match self.entries.iter().position(|e| e.same_entry(&mine)) {
            None => {
                if mine.chosen_count == 0 {
                    return;
                }
                self.add_entry(ctx, mine);
                self.paging_valid = false;
            }
            Some(pos) if self.entries[pos].chosen_count != mine.chosen_count => {
                if mine.chosen_count > 0 {
                    self.entries[pos].chosen_count = mine.chosen_count;
                    self.entries[pos].reset_cell_cache();
                } else {
                    self.entries.remove(pos);
                }
                self.paging_valid = false;
            }
            Some(_) => {}
        }
    }

    /// Indent of an entry's first cell, in characters.
    #[must_use]
    pub fn get_entry_indent(&self, entry: &Entry, item_symbols: bool, multiselect: bool) -> usize {
        if !entry.is_item() {
            return 0;
        }
        let mut res = 2;
        if item_symbols {
            res += 2;
        }
        if self.allows_selecting() && self.activatable() && multiselect {
            res += 2;
        }
        if self.collate_entries() && entry.is_collation_entry() {
            res += 2;
        }
        if self.indent_entries() {
            res += entry.indent;
        }
        res
    }

    /// Recomputes every cell width from the rendered texts.
    pub fn calculate_cell_widths(&mut self, ctx: &PresetContext<'_>) {
        let preset = Arc::clone(&self.preset);
        let cells = preset.cells().len();
        let mut longest = vec![0usize; cells];
        for entry in &mut self.entries {
            let cache = entry.cell_cache(preset.as_ref(), ctx, &mut self.collations);
            for (slot, text) in longest.iter_mut().zip(&cache.text) {
                *slot = (*slot).max(text.chars().count());
            }
        }
        self.cell_widths = longest
            .into_iter()
            .map(|n| (n + 1) as f32 * ctx.layout.font_width)
            .collect();
    }

    /// Width of each cell from the last calculation.
    #[must_use]
    pub fn cell_widths(&self) -> &[f32] {
        &self.cell_widths
    }

    /// Sum of all cell widths.
    #[must_use]
    pub fn cells_width(&self) -> f32 {
        self.cell_widths.iter().sum()
    }

    /// Some entry can take focus.
    #[must_use]
    pub fn activatable(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.is_highlightable(self.skip_unselectable))
    }

    /// Some entry can be chosen.
    #[must_use]
    pub fn has_available_choices(&self) -> bool {
        self.allows_selecting()
            && self.activatable()
            && self.entries.iter().any(Entry::is_selectable)
    }

    /// Hands `'0'..='9'` to selectable entries the character does not carry.
    /// Returns the next digit index.
    pub fn reassign_numeric_invlets(
        &mut self,
        world: &ItemWorld,
        who: CharacterId,
        mut next: u32,
        use_invlet: bool,
    ) -> u32 {
        for e in &mut self.entries {
            let Some(item) = e.any_item() else { continue };
            if e.is_selectable() && !world.possesses(who, item) {
                e.custom_invlet = match char::from_digit(next, 10) {
                    Some(c) if use_invlet => {
                        next += 1;
                        CustomInvlet::Key(c)
                    }
                    _ => CustomInvlet::None,
                };
            }
        }
        next
    }

    /// Hands keys from `pool` to selectable entries without their own
    /// letter. Returns the next pool index.
    pub fn reassign_alpha_invlets(&mut self, world: &ItemWorld, mut idx: usize, pool: &[char]) -> usize {
        for e in &mut self.entries {
            let Some(item) = e.any_item().and_then(|r| world.get(r)) else {
                continue;
            };
            if e.is_selectable() && item.invlet.is_none() {
                e.custom_invlet = pool
                    .get(idx)
                    .map_or(CustomInvlet::None, |c| CustomInvlet::Key(*c));
                idx += 1;
            }
        }
        idx
    }

    /// Shown item entry answering to a key.
    #[must_use]
    pub fn find_by_invlet(&self, world: &ItemWorld, ch: char) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.is_item() && e.get_invlet(world) == Some(ch))
    }

    /// Entry holding an item.
    #[must_use]
    pub fn find_by_location(&self, loc: ItemRef, hidden: bool) -> Option<usize> {
        let list = if hidden { &self.hidden } else { &self.entries };
        list.iter().position(|e| e.locations.contains(&loc))
    }

    /// Shown entry with a given identity.
    #[must_use]
    pub fn find_by_id(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    /// Entry with a given identity, shown or hidden.
    #[must_use]
    pub fn find_any(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().chain(&self.hidden).find(|e| e.id() == id)
    }

    /// Entry with a given identity, shown or hidden, mutably.
    pub fn find_any_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.entries
            .iter_mut()
            .chain(self.hidden.iter_mut())
            .find(|e| e.id() == id)
    }

    /// Every item entry, shown or hidden.
    pub fn items(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().chain(&self.hidden).filter(|e| e.is_item())
    }

    /// Every item entry, shown or hidden, mutably.
    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries
            .iter_mut()
            .chain(self.hidden.iter_mut())
            .filter(|e| e.is_item())
    }

    /// Takes every item entry out, dropping headers and collation groups.
    pub fn drain_items(&mut self) -> Vec<Entry> {
        self.uncollate();
        let mut out: Vec<Entry> = self
            .entries
            .drain(..)
            .chain(self.hidden.drain(..))
            .filter(Entry::is_item)
            .collect();
        for e in &mut out {
            e.reset_collation();
        }
        self.clear();
        out
    }

    /// Index of the highlighted item entry.
    #[must_use]
    pub fn highlighted_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.is_item() && e.highlighted)
    }

    /// The highlighted item entry.
    #[must_use]
    pub fn get_highlighted(&self) -> Option<&Entry> {
        self.highlighted_index().map(|i| &self.entries[i])
    }

    /// Moves the highlight to the entry with `id`; clears it when `None`.
    pub fn set_highlighted(&mut self, id: Option<EntryId>) {
        for e in self.entries.iter_mut().chain(self.hidden.iter_mut()) {
            e.highlighted = Some(e.id()) == id;
        }
    }

    /// Highlights the entry holding `loc` and asks the renderer to focus it.
    pub fn highlight_location(&mut self, loc: ItemRef, front_only: bool) -> bool {
        let found = self.entries.iter().position(|e| {
            e.is_item()
                && ((!front_only && e.locations.contains(&loc))
                    || (!e.is_collation_header() && e.any_item() == Some(loc)))
        });
        let Some(index) = found else {
            return false;
        };
        let id = self.entries[index].id();
        self.set_highlighted(Some(id));
        self.focus_request = Some(id);
        true
    }

    /// Highlights the first entry that can take focus.
    pub fn highlight_first(&mut self) -> bool {
        let skip = self.skip_unselectable;
        let Some(id) = self
            .entries
            .iter()
            .find(|e| e.is_highlightable(skip))
            .map(Entry::id)
        else {
            return false;
        };
        self.set_highlighted(Some(id));
        self.focus_request = Some(id);
        true
    }

    /// Pending keyboard focus request for the renderer.
    pub fn take_focus_request(&mut self) -> Option<EntryId> {
        self.focus_request.take()
    }

    /// Whether skip-unselectable is on.
    #[must_use]
    pub const fn skip_unselectable(&self) -> bool {
        self.skip_unselectable
    }

    /// In category mode: selectable and in the highlighted entry's category.
    #[must_use]
    pub fn is_selected_by_category(&self, ctx: &PresetContext<'_>, entry: &Entry) -> bool {
        entry.is_selectable()
            && self.mode == NavigationMode::Category
            && self
                .get_highlighted()
                .is_some_and(|h| h.category_id(ctx) == entry.category_id(ctx))
    }

    /// Builds the rendered cells of every shown entry.
    pub fn refresh_cells(&mut self, ctx: &PresetContext<'_>) {
        let preset = Arc::clone(&self.preset);
        for entry in &mut self.entries {
            entry.cell_cache(preset.as_ref(), ctx, &mut self.collations);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{CategoryTable, ItemCategory};
    use crate::preset::DefaultPreset;
    use crate::settings::LayoutSettings;
    use crate::trade::{PriceTable, TradePreset};
    use crate::world::{Character, Item, Location, Pocket, PocketKind};
    use proptest::prelude::*;
    use satchel_common::Tripoint;

    struct Fixture {
        world: ItemWorld,
        categories: CategoryTable,
        layout: LayoutSettings,
    }

    impl Fixture {
        fn new() -> Self {
            let mut world = ItemWorld::new();
            world.add_character(Character::new(CharacterId::PLAYER, "You", Tripoint::default()));
            let mut categories = CategoryTable::new();
            categories.intern(ItemCategory::new("food", "FOOD", 10));
            categories.intern(ItemCategory::new("tools", "TOOLS", 20));
            Self {
                world,
                categories,
                layout: LayoutSettings::default(),
            }
        }

        fn ctx(&self) -> PresetContext<'_> {
            PresetContext {
                world: &self.world,
                categories: &self.categories,
                layout: &self.layout,
                who: CharacterId::PLAYER,
            }
        }

        fn ground(&mut self, item: Item) -> ItemRef {
            self.world
                .spawn(item, Location::Map(Tripoint::new(1, 0, 0)))
                .expect("spawn")
        }
    }

    fn column() -> Column {
        Column::new(Arc::new(DefaultPreset::default()))
    }

    fn item_refs(col: &Column) -> Vec<Vec<ItemRef>> {
        col.entries()
            .iter()
            .filter(|e| e.is_item())
            .map(|e| e.locations.clone())
            .collect()
    }

    #[test]
    fn test_add_entry_merges_stackable() {
        let mut fx = Fixture::new();
        let a = fx.ground(Item::new("apple", "apple", "food"));
        let b = fx.ground(Item::new("apple", "apple", "food"));
        let mut col = column();
        col.add_entry(&fx.ctx(), Entry::item(vec![a], None, 0, 0, None));
        col.add_entry(&fx.ctx(), Entry::item(vec![b], None, 0, 1, None));
        assert_eq!(col.entries().len(), 1);
        assert_eq!(col.entries()[0].locations, vec![a, b]);
    }

    #[test]
    fn test_add_same_entry_twice_keeps_one() {
        let mut fx = Fixture::new();
        let a = fx.ground(Item::new("apple", "apple", "food"));
        let mut col = column();
        col.add_entry(&fx.ctx(), Entry::item(vec![a], None, 0, 0, None));
        col.add_entry(&fx.ctx(), Entry::item(vec![a], None, 0, 1, None));
        assert_eq!(col.entries().len(), 1);
        assert_eq!(col.entries()[0].locations, vec![a]);
    }

    #[test]
    fn test_paging_inserts_headers_in_rank_order() {
        let mut fx = Fixture::new();
        let knife = fx.ground(Item::new("knife", "knife", "tools"));
        let apple = fx.ground(Item::new("apple", "apple", "food"));
        let mut col = column();
        col.add_entry(&fx.ctx(), Entry::item(vec![knife], None, 0, 0, None));
        col.add_entry(&fx.ctx(), Entry::item(vec![apple], None, 0, 1, None));
        col.prepare_paging(&fx.ctx(), "");
        let names: Vec<_> = col
            .entries()
            .iter()
            .map(|e| {
                if e.is_category() {
                    format!("#{}", fx.categories.name(e.header.unwrap_or(CategoryId::OTHER)))
                } else {
                    fx.world.get(e.locations[0]).map(|i| i.name.clone()).unwrap_or_default()
                }
            })
            .collect();
        assert_eq!(names, vec!["#FOOD", "apple", "#TOOLS", "knife"]);
        assert!(col.is_valid());
    }

    #[test]
    fn test_trade_column_groups_equal_rank_categories() {
        let mut fx = Fixture::new();
        fx.categories.intern(ItemCategory::new("drink", "DRINK", 10));
        let zeta = fx.ground(Item::new("zeta", "zeta", "food"));
        let beta = fx.ground(Item::new("beta", "beta", "drink"));
        let alpha = fx.ground(Item::new("alpha", "alpha", "food"));
        let preset = TradePreset::new(CharacterId::PLAYER, CharacterId::new(1), Arc::new(PriceTable::new()));
        let mut col = Column::new(Arc::new(preset));
        for (i, item) in [zeta, beta, alpha].into_iter().enumerate() {
            col.add_entry(&fx.ctx(), Entry::item(vec![item], None, 0, i as u64, None));
        }
        col.prepare_paging(&fx.ctx(), "");

        let names: Vec<_> = col
            .entries()
            .iter()
            .map(|e| {
                if e.is_category() {
                    format!("#{}", fx.categories.name(e.header.unwrap_or(CategoryId::OTHER)))
                } else {
                    fx.world.get(e.locations[0]).map(|i| i.name.clone()).unwrap_or_default()
                }
            })
            .collect();
        assert_eq!(names, vec!["#DRINK", "beta", "#FOOD", "alpha", "zeta"]);
    }

    #[test]
    fn test_filter_hides_and_restores() {
        let mut fx = Fixture::new();
        let knife = fx.ground(Item::new("knife", "knife", "tools"));
        let apple = fx.ground(Item::new("apple", "apple", "food"));
        let mut col = column();
        col.add_entry(&fx.ctx(), Entry::item(vec![knife], None, 0, 0, None));
        col.add_entry(&fx.ctx(), Entry::item(vec![apple], None, 0, 1, None));
        col.prepare_paging(&fx.ctx(), "kni");
        assert_eq!(item_refs(&col), vec![vec![knife]]);
        col.invalidate();
        col.prepare_paging(&fx.ctx(), "");
        assert_eq!(item_refs(&col).len(), 2);
    }

    #[test]
    fn test_filter_scenario_three_coins() {
        let mut fx = Fixture::new();
        let purse = fx.ground(
            Item::new("purse", "purse", "tools")
                .with_pocket(Pocket::new(PocketKind::Container, 500, 500)),
        );
        let mut coins = Vec::new();
        for _ in 0..3 {
            coins.push(
                fx.world
                    .spawn(
                        Item::new("coin", "coin", "tools"),
                        Location::Contained {
                            parent: purse,
                            pocket: 0,
                        },
                    )
                    .expect("spawn"),
            );
        }
        let mut col = column();
        col.add_entry(&fx.ctx(), Entry::item(vec![purse], None, 0, 0, None));
        for (n, c) in coins.iter().enumerate() {
            col.add_entry(&fx.ctx(), Entry::item(vec![*c], None, 0, n as u64 + 1, Some(purse)));
        }
        col.prepare_paging(&fx.ctx(), "coin");
        let visible: Vec<_> = col.entries().iter().filter(|e| e.is_item()).collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].get_available_count(&fx.world), 3);
    }

    fn distinct_arrows(fx: &mut Fixture, n: u32) -> Vec<ItemRef> {
        (0..n)
            .map(|i| fx.ground(Item::new("arrow", "arrow", "tools").with_charges(i + 1)))
            .collect()
    }

    fn groups(col: &Column) -> Vec<Vec<ItemRef>> {
        let mut out: Vec<_> = col
            .entries()
            .iter()
            .filter(|e| e.is_collation_header())
            .map(|e| {
                let mut l = e.locations.clone();
                l.sort();
                l
            })
            .collect();
        out.sort();
        out
    }

    #[test]
    fn test_collate_folds_identical_types() {
        let mut fx = Fixture::new();
        let arrows = distinct_arrows(&mut fx, 3);
        let mut col = column();
        for (n, a) in arrows.iter().enumerate() {
            col.add_entry(&fx.ctx(), Entry::item(vec![*a], None, 0, n as u64, None));
        }
        assert_eq!(col.entries().len(), 3);
        col.prepare_paging(&fx.ctx(), "");
        let items: Vec<_> = col.entries().iter().filter(|e| e.is_item()).collect();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_collation_header());
        assert_eq!(items[0].locations.len(), 3);
        assert_eq!(col.hidden_entries().len(), 3);
        assert!(col.hidden_entries().iter().all(Entry::is_collation_entry));
    }

    #[test]
    fn test_collation_is_idempotent() {
        let mut fx = Fixture::new();
        let arrows = distinct_arrows(&mut fx, 4);
        let knife = fx.ground(Item::new("knife", "knife", "tools"));
        let mut col = column();
        for (n, a) in arrows.iter().chain([knife].iter()).enumerate() {
            col.add_entry(&fx.ctx(), Entry::item(vec![*a], None, 0, n as u64, None));
        }
        col.prepare_paging(&fx.ctx(), "");
        let first = groups(&col);
        col.uncollate();
        col.prepare_paging(&fx.ctx(), "");
        assert_eq!(groups(&col), first);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_unfold_collation_group() {
        let mut fx = Fixture::new();
        let arrows = distinct_arrows(&mut fx, 2);
        let mut col = column();
        for (n, a) in arrows.iter().enumerate() {
            col.add_entry(&fx.ctx(), Entry::item(vec![*a], None, 0, n as u64, None));
        }
        col.prepare_paging(&fx.ctx(), "");
        let header = col.entries().iter().position(Entry::is_collation_header).expect("header");
        col.set_collapsed(&mut fx.world, header, false);
        col.prepare_paging(&fx.ctx(), "");
        let items: Vec<_> = col.entries().iter().filter(|e| e.is_item()).collect();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_collation_header());
        assert_eq!(items[0].locations.len(), 2);
        assert!(items[1].is_collation_entry());
        assert_eq!(
            col.get_entry_indent(items[1], false, false),
            col.get_entry_indent(items[0], false, false) + 2
        );
    }

    #[test]
    fn test_reassign_alpha_pool() {
        let mut fx = Fixture::new();
        let refs: Vec<_> = ["a1", "b2", "c3"]
            .iter()
            .map(|t| fx.ground(Item::new(*t, *t, "tools")))
            .collect();
        let mut col = column();
        for (n, r) in refs.iter().enumerate() {
            col.add_entry(&fx.ctx(), Entry::item(vec![*r], None, 0, n as u64, None));
        }
        let next = col.reassign_alpha_invlets(&fx.world, 0, &['a', 'b']);
        assert_eq!(next, 3);
        let keys: Vec<_> = col.entries().iter().map(|e| e.custom_invlet).collect();
        assert_eq!(
            keys,
            vec![CustomInvlet::Key('a'), CustomInvlet::Key('b'), CustomInvlet::None]
        );
        assert_eq!(col.find_by_invlet(&fx.world, 'b'), Some(1));
    }

    #[test]
    fn test_reassign_numeric_skips_carried() {
        let mut fx = Fixture::new();
        let worn = fx
            .world
            .spawn(Item::new("hat", "hat", "tools"), Location::Worn(CharacterId::PLAYER))
            .expect("spawn");
        let rock = fx.ground(Item::new("rock", "rock", "tools"));
        let mut col = column();
        col.add_entry(&fx.ctx(), Entry::item(vec![worn], None, 0, 0, None));
        col.add_entry(&fx.ctx(), Entry::item(vec![rock], None, 0, 1, None));
        let next = col.reassign_numeric_invlets(&fx.world, CharacterId::PLAYER, 0, true);
        assert_eq!(next, 1);
        assert_eq!(col.entries()[0].custom_invlet, CustomInvlet::Unset);
        assert_eq!(col.entries()[1].custom_invlet, CustomInvlet::Key('0'));
    }

    #[test]
    fn test_cycle_hide_override() {
        let mut col = column();
        assert_eq!(col.hide_override(), None);
        col.cycle_hide_override();
        assert_eq!(col.hide_override(), Some(false));
        col.cycle_hide_override();
        assert_eq!(col.hide_override(), Some(true));
        col.cycle_hide_override();
        assert_eq!(col.hide_override(), None);

        let mut sel = Column::selection(CategoryId::OTHER);
        sel.cycle_hide_override();
        assert_eq!(sel.hide_override(), Some(false));
    }

    #[test]
    fn test_selection_column_tracks_changes() {
        let mut fx = Fixture::new();
        let sel_cat = fx.categories.intern(ItemCategory::new("SELECTION_COLUMN", "Selected", 0));
        let a = fx.ground(Item::new("apple", "apple", "food"));
        let mut col = Column::selection(sel_cat);
        col.prepare_paging(&fx.ctx(), "anything");
        assert_eq!(col.entries().len(), 1);
        assert!(col.entries()[0].is_category());

        let mut entry = Entry::item(vec![a], None, 1, 0, None);
        col.on_change(&fx.ctx(), &entry);
        col.prepare_paging(&fx.ctx(), "zzz");
        assert_eq!(item_refs(&col), vec![vec![a]]);

        entry.chosen_count = 0;
        col.on_change(&fx.ctx(), &entry);
        col.prepare_paging(&fx.ctx(), "");
        assert!(item_refs(&col).is_empty());
        assert!(col.entries()[0].is_category());
    }

    #[test]
    fn test_move_entries_keeps_groups() {
        let mut fx = Fixture::new();
        let arrows = distinct_arrows(&mut fx, 2);
        let mut src = column();
        let mut dest = column();
        for (n, a) in arrows.iter().enumerate() {
            src.add_entry(&fx.ctx(), Entry::item(vec![*a], None, 0, n as u64, None));
        }
        src.prepare_paging(&fx.ctx(), "");
        src.move_entries_to(&mut dest);
        assert!(src.is_empty());
        assert!(!dest.is_valid());
        dest.prepare_paging(&fx.ctx(), "");
        let header = dest.entries().iter().find(|e| e.is_collation_header()).expect("header");
        let group = header.collation.and_then(|c| dest.collations().get(c)).expect("group");
        assert_eq!(group.tip, arrows[0]);
    }

    proptest! {
        #[test]
        fn prop_paging_is_stable(names in proptest::collection::vec("[a-e]{1,3}", 1..20), favs in proptest::collection::vec(any::<bool>(), 20)) {
            let mut fx = Fixture::new();
            let mut col = column();
            for (n, name) in names.iter().enumerate() {
                let r = fx.ground(Item::new(name.clone(), name.clone(), "tools").with_favorite(favs[n]).with_charges(n as u32 + 1));
                col.add_entry(&fx.ctx(), Entry::item(vec![r], None, 0, n as u64, None));
            }
            col.prepare_paging(&fx.ctx(), "");
            let first: Vec<_> = col.entries().iter().map(|e| (e.locations.clone(), e.header)).collect();
            col.prepare_paging(&fx.ctx(), "");
            let second: Vec<_> = col.entries().iter().map(|e| (e.locations.clone(), e.header)).collect();
            prop_assert_eq!(&first, &second);

            col.uncollate();
            col.prepare_paging(&fx.ctx(), "");
            let third: Vec<_> = col.entries().iter().map(|e| (e.locations.clone(), e.header)).collect();
            prop_assert_eq!(first, third);
        }
    }
}
