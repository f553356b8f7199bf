//! Policy objects deciding eligibility, captions and ordering.

use std::cmp::Ordering;
use std::fmt::Debug;

use satchel_common::{CharacterId, Color, ItemRef};
use tracing::warn;

use crate::category::{CategoryId, CategoryTable};
use crate::entry::Entry;
use crate::error::InventoryError;
use crate::settings::{DetailedContainers, LayoutSettings};
use crate::world::ItemWorld;

/// Read-only state a preset may consult.
#[derive(Debug, Clone, Copy)]
pub struct PresetContext<'a> {
    /// Item graph
    pub world: &'a ItemWorld,
    /// Interned categories of the selector
    pub categories: &'a CategoryTable,
    /// Layout tunables
    pub layout: &'a LayoutSettings,
    /// Character browsing
    pub who: CharacterId,
}

impl<'a> PresetContext<'a> {
    /// Bundles the borrowed state.
    #[must_use]
    pub const fn new(
        world: &'a ItemWorld,
        categories: &'a CategoryTable,
        layout: &'a LayoutSettings,
        who: CharacterId,
    ) -> Self {
        Self {
            world,
            categories,
            layout,
            who,
        }
    }
}

/// One display cell of a preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Shown on category header rows
    pub title: String,
    /// Placeholder meaning "nothing to show"
    pub stub: String,
}

impl Cell {
    /// Creates a cell.
    #[must_use]
    pub fn new(title: impl Into<String>, stub: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            stub: stub.into(),
        }
    }
}

/// Per-use-case rules for a selector.
///
/// Cell 0 is always the caption; presets with more cells render them in
/// [`Preset::cell_content`].
pub trait Preset: Send + Sync + Debug {
    /// Cells shown per row.
    fn cells(&self) -> &[Cell];

    /// Whether an item gets an entry at all.
    fn is_shown(&self, _world: &ItemWorld, _item: ItemRef) -> bool {
        true
    }

    /// Why the item cannot be chosen; empty when it can.
    fn get_denial(&self, _ctx: &PresetContext<'_>, _item: ItemRef) -> String {
        String::new()
    }

    /// Denial for a whole entry.
    fn entry_denial(&self, ctx: &PresetContext<'_>, entry: &Entry) -> String {
        entry
            .any_item()
            .map(|item| self.get_denial(ctx, item))
            .unwrap_or_default()
    }

    /// Main row text.
    fn caption(&self, ctx: &PresetContext<'_>, entry: &Entry) -> String {
        default_caption(ctx, entry)
    }

    /// Text of an item row's cell.
    fn cell_content(&self, ctx: &PresetContext<'_>, entry: &Entry, index: usize) -> String {
        if index == 0 {
            self.caption(ctx, entry)
        } else {
            String::new()
        }
    }

    /// Order within a category. Names compare lowercased, by code point;
    /// there is no locale collation.
    fn sort_compare(&self, a: &Entry, b: &Entry) -> Ordering {
        a.sort_key().cmp(&b.sort_key())
    }

    /// Order between categories.
    fn cat_sort_compare(&self, categories: &CategoryTable, a: CategoryId, b: CategoryId) -> Ordering {
        categories.compare(a, b)
    }

    /// Row color.
    fn color(&self, ctx: &PresetContext<'_>, entry: &Entry) -> Color {
        entry
            .any_item()
            .and_then(|r| ctx.world.get(r))
            .map_or(Color::Magenta, |it| it.color)
    }
}

/// Caption used by most presets: `"<count> <name>"` for stacks.
#[must_use]
pub fn default_caption(ctx: &PresetContext<'_>, entry: &Entry) -> String {
    let Some(item) = entry.any_item().and_then(|r| ctx.world.get(r)) else {
        return String::new();
    };
    let mut count = entry.get_stack_size();
    let name = if entry.is_collation_header() && item.count_by_charges() {
        count = 1;
        format!("{} ({})", item.name, entry.get_total_charges(ctx.world))
    } else {
        item.display_name()
    };
    if count > 1 {
        format!("{count} {name}")
    } else {
        name
    }
}

/// Resolves the text of one cell, including container details and header
/// titles.
pub fn cell_text(preset: &dyn Preset, ctx: &PresetContext<'_>, entry: &Entry, index: usize) -> String {
    let cells = preset.cells();
    if index >= cells.len() {
        warn!(
            "{}",
            InventoryError::InvalidCellIndex {
                index,
                count: cells.len()
            }
        );
        return String::new();
    }
    if entry.is_null() {
        return String::new();
    }
    let Some(first) = entry.any_item() else {
        return if index == 0 {
            entry
                .header
                .map(|c| ctx.categories.name(c).to_string())
                .unwrap_or_default()
        } else {
            cells[index].title.clone()
        };
    };

    let text = preset.cell_content(ctx, entry, index);
    if index != 0 || text.is_empty() {
        return text;
    }
    let Some(item) = ctx.world.get(first) else {
        return text;
    };
    let wants_details = match ctx.layout.detailed_containers {
        DetailedContainers::None => false,
        DetailedContainers::All => true,
        DetailedContainers::Worn => {
            entry.category_id(ctx).is_some_and(CategoryId::is_worn)
                && ctx.world.is_worn_by(ctx.who, first)
        }
    };
    if wants_details && item.is_container() {
        let stats = ctx.world.container_stats(first);
        format!(
            "{text} ({:.2}/{:.2} L) ({:.2}/{:.2} kg) ({} mm)",
            f64::from(stats.contained_volume_ml) / 1000.0,
            f64::from(stats.volume_capacity_ml) / 1000.0,
            f64::from(stats.contained_weight_g) / 1000.0,
            f64::from(stats.weight_capacity_g) / 1000.0,
            stats.max_containable_length_mm,
        )
    } else {
        text
    }
}

/// Whether the cell holds nothing worth showing.
#[must_use]
pub fn is_stub_cell(preset: &dyn Preset, entry: &Entry, index: usize) -> bool {
    if !entry.is_item() {
        return false;
    }
    let Some(text) = entry.cached_cells().and_then(|c| c.text.get(index)) else {
        return true;
    };
    text.is_empty() || preset.cells().get(index).is_some_and(|c| *text == c.stub)
}

/// Shows everything, denies nothing.
#[derive(Debug, Clone)]
pub struct DefaultPreset {
    cells: Vec<Cell>,
}

impl Default for DefaultPreset {
    fn default() -> Self {
        Self {
            cells: vec![Cell::new("", "")],
        }
    }
}

impl Preset for DefaultPreset {
    fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

/// Preset of the selection summary column.
#[derive(Debug, Clone)]
pub struct SelectionPreset {
    cells: Vec<Cell>,
}

impl Default for SelectionPreset {
    fn default() -> Self {
        Self {
            cells: vec![Cell::new("", "")],
        }
    }
}

impl Preset for SelectionPreset {
    fn cells(&self) -> &[Cell] {
        &self.cells
    }

    fn caption(&self, ctx: &PresetContext<'_>, entry: &Entry) -> String {
        let Some(item) = entry.any_item().and_then(|r| ctx.world.get(r)) else {
            return String::new();
        };
        let available = entry.get_available_count(ctx.world);
        let mut res = String::new();
        if entry.chosen_count > 0 && entry.chosen_count < available {
            res.push_str(&format!("{} of {available} ", entry.chosen_count));
        } else if available != 1 {
            res.push_str(&format!("{available} "));
        }
        res.push_str(&item.display_name());
        res
    }

    fn color(&self, ctx: &PresetContext<'_>, entry: &Entry) -> Color {
        if let Some(item) = entry.any_item() {
            if ctx.world.is_wielded_by(ctx.who, item) {
                return Color::LightBlue;
            }
            if ctx.world.is_worn_by(ctx.who, item) {
                return Color::Cyan;
            }
            return ctx.world.get(item).map_or(Color::Magenta, |it| it.color);
        }
        Color::Magenta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Character, Item, Location, Pocket, PocketKind};
    use satchel_common::Tripoint;

    fn ctx_parts() -> (ItemWorld, CategoryTable, LayoutSettings) {
        let mut world = ItemWorld::new();
        world.add_character(Character::new(CharacterId::PLAYER, "You", Tripoint::default()));
        (world, CategoryTable::new(), LayoutSettings::default())
    }

    #[test]
    fn test_default_caption_counts_stack() {
        let (mut world, table, layout) = ctx_parts();
        let a = world
            .spawn(Item::new("rock", "rock", "other"), Location::Map(Tripoint::default()))
            .expect("spawn");
        let b = world
            .spawn(Item::new("rock", "rock", "other"), Location::Map(Tripoint::default()))
            .expect("spawn");
        let ctx = PresetContext {
            world: &world,
            categories: &table,
            layout: &layout,
            who: CharacterId::PLAYER,
        };
        let entry = Entry::item(vec![a, b], None, 0, 0, None);
        assert_eq!(DefaultPreset::default().caption(&ctx, &entry), "2 rock");
    }

    #[test]
    fn test_sort_ignores_case() {
        let (mut world, _, _) = ctx_parts();
        let mut spawn = |name: &str| {
            world
                .spawn(Item::new(name, name, "other"), Location::Map(Tripoint::default()))
                .expect("spawn")
        };
        let (zebra, apple, upper_apple) = (spawn("Zebra"), spawn("apple"), spawn("Apple"));
        let entry = |r, generation| {
            let mut e = Entry::item(vec![r], None, 0, generation, None);
            e.update_cache(&world);
            e
        };
        let (zebra, apple, upper_apple) = (entry(zebra, 0), entry(apple, 1), entry(upper_apple, 2));
        let preset = DefaultPreset::default();
        assert_eq!(preset.sort_compare(&apple, &zebra), Ordering::Less);
        assert_eq!(preset.sort_compare(&apple, &upper_apple), Ordering::Less);
        assert_eq!(preset.sort_compare(&upper_apple, &apple), Ordering::Greater);
    }

    #[test]
    fn test_selection_caption() {
        let (mut world, table, layout) = ctx_parts();
        let refs: Vec<_> = (0..3)
            .map(|_| {
                world
                    .spawn(Item::new("coin", "coin", "other"), Location::Map(Tripoint::default()))
                    .expect("spawn")
            })
            .collect();
        let ctx = PresetContext {
            world: &world,
            categories: &table,
            layout: &layout,
            who: CharacterId::PLAYER,
        };
        let preset = SelectionPreset::default();
        let mut entry = Entry::item(refs, None, 2, 0, None);
        assert_eq!(preset.caption(&ctx, &entry), "2 of 3 coin");
        entry.chosen_count = 3;
        assert_eq!(preset.caption(&ctx, &entry), "3 coin");
    }

    #[test]
    fn test_header_cell_text_and_bad_index() {
        let (world, table, layout) = ctx_parts();
        let ctx = PresetContext {
            world: &world,
            categories: &table,
            layout: &layout,
            who: CharacterId::PLAYER,
        };
        let preset = DefaultPreset::default();
        let header = Entry::category(CategoryId::ITEMS_WORN);
        assert_eq!(cell_text(&preset, &ctx, &header, 0), "ITEMS WORN");
        assert_eq!(cell_text(&preset, &ctx, &header, 5), "");
    }

    #[test]
    fn test_detailed_container_caption() {
        let (mut world, table, mut layout) = ctx_parts();
        layout.detailed_containers = DetailedContainers::All;
        let bag = world
            .spawn(
                Item::new("bag", "bag", "other")
                    .with_pocket(Pocket::new(PocketKind::Container, 2000, 5000).with_max_length(300)),
                Location::Worn(CharacterId::PLAYER),
            )
            .expect("spawn");
        let ctx = PresetContext {
            world: &world,
            categories: &table,
            layout: &layout,
            who: CharacterId::PLAYER,
        };
        let entry = Entry::item(vec![bag], None, 0, 0, None);
        let text = cell_text(&DefaultPreset::default(), &ctx, &entry, 0);
        assert_eq!(text, "bag (0.00/2.00 L) (0.00/5.00 kg) (300 mm)");
    }
}
