//! Multiselector: a selector with a ledger of chosen quantities and a
//! selection summary column.

use std::fmt;
use std::sync::Arc;

use satchel_common::{CharacterId, EntryId, ItemRef};
use tracing::{debug, info, warn};

use crate::category::ItemCategory;
use crate::column::Column;
use crate::entry::Entry;
use crate::focus::SharedFocus;
use crate::input::{Action, InventoryInput};
use crate::preset::Preset;
use crate::render::UiDriver;
use crate::selector::InventorySelector;
use crate::settings::{LayoutSettings, UiMode};
use crate::stats::StatsBlock;
use crate::world::{ItemWorld, Location};

/// Chosen (item, quantity) rows.
pub type Ledger = Vec<(ItemRef, u32)>;

/// Computes the header stats from the tentative ledger.
pub type StatsFn = Box<dyn Fn(&ItemWorld, &[(ItemRef, u32)]) -> Option<StatsBlock> + Send + Sync>;

/// Which entry a bulk toggle acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleMode {
    /// The highlighted (or hovered) entry
    Selected,
    /// The first selectable, non-favorite, non-worn entry of the active column
    NonFavoriteNonWorn,
}

/// Selector choosing quantities of many entries.
pub struct InventoryMultiselector {
    base: InventorySelector,
    to_use: Ledger,
    max_chosen_count: u32,
    allow_select_contained: bool,
    selection_column: usize,
    get_stats: Option<StatsFn>,
}

impl fmt::Debug for InventoryMultiselector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventoryMultiselector")
            .field("base", &self.base)
            .field("to_use", &self.to_use)
            .field("max_chosen_count", &self.max_chosen_count)
            .field("allow_select_contained", &self.allow_select_contained)
            .finish_non_exhaustive()
    }
}

impl InventoryMultiselector {
    /// Creates a multiselector whose summary column carries `selection_title`.
    pub fn new(
        world: &ItemWorld,
        who: CharacterId,
        preset: Arc<dyn Preset>,
        selection_title: &str,
        layout: LayoutSettings,
        ui_mode: UiMode,
        focus: SharedFocus,
    ) -> Self {
        let mut base = InventorySelector::new(who, preset, layout, ui_mode, focus);
        base.load_categories(world);
        base.set_multiselect(true);
        let category = base
            .categories_mut()
            .intern(ItemCategory::new("SELECTION_COLUMN", selection_title, 0));
        let selection_column = base.append_column(Column::selection(category));
        Self {
            base,
            to_use: Vec::new(),
            max_chosen_count: u32::MAX,
            allow_select_contained: false,
            selection_column,
            get_stats: None,
        }
    }

    /// Installs the header stats callback.
    #[must_use]
    pub fn with_stats(mut self, get_stats: StatsFn) -> Self {
        self.get_stats = Some(get_stats);
        self
    }

    /// Allows choosing a container together with its contents.
    pub fn set_allow_select_contained(&mut self, allow: bool) {
        self.allow_select_contained = allow;
    }

    /// Caps the count any entry may be set to.
    pub fn set_max_chosen_count(&mut self, max: u32) {
        self.max_chosen_count = max;
    }

    /// Upper bound for a single entry.
    #[must_use]
    pub const fn max_chosen_count(&self) -> u32 {
        self.max_chosen_count
    }

    /// The underlying selector.
    #[must_use]
    pub const fn selector(&self) -> &InventorySelector {
        &self.base
    }

    /// The underlying selector, mutably.
    pub fn selector_mut(&mut self) -> &mut InventorySelector {
        &mut self.base
    }

    /// Index of the selection summary column.
    #[must_use]
    pub const fn selection_column(&self) -> usize {
        self.selection_column
    }

    /// Current ledger.
    #[must_use]
    pub fn to_use(&self) -> &[(ItemRef, u32)] {
        &self.to_use
    }

    /// Forgets the first ledger row of an item.
    pub fn remove_from_to_use(&mut self, item: ItemRef) {
        if let Some(pos) = self.to_use.iter().position(|(r, _)| *r == item) {
            self.to_use.remove(pos);
        }
    }

    /// Header stats for the current ledger.
    #[must_use]
    pub fn stats(&self, world: &ItemWorld) -> Option<StatsBlock> {
        self.get_stats.as_ref().and_then(|f| f(world, &self.to_use))
    }

    /// Source entry behind a row; rows of the summary column stand for the
    /// entry they mirror.
    fn source_entry(&self, id: EntryId) -> Option<EntryId> {
        let column = self.base.column_of(id)?;
        if column != self.selection_column {
            return Some(id);
        }
        let mirror = self.base.columns()[column].find_any(id)?;
        self.base
            .columns()
            .iter()
            .filter(|c| !c.is_selection())
            .flat_map(Column::items)
            .find(|e| e.locations == mirror.locations)
            .map(Entry::id)
    }

    /// Sets the chosen count of an entry and rebuilds its ledger rows.
    ///
    /// Items counted by charges get one row holding the whole count; other
    /// stacks get one row per chosen member.
    pub fn set_chosen_count(&mut self, world: &ItemWorld, id: EntryId, count: u32) {
        let Some(source) = self.source_entry(id) else {
            warn!("Entry {id:?} has no source entry to choose from");
            return;
        };
        let max = self.max_chosen_count;
        let Some(entry) = self.base.entry_mut(source) else {
            return;
        };
        self.to_use.retain(|(r, _)| !entry.locations.contains(r));

        entry.chosen_count = if count == 0 {
            0
        } else {
            count.min(max).min(entry.get_available_count(world))
        };
        if entry.chosen_count > 0 {
            let first = entry.locations[0];
            if world.get(first).is_some_and(|it| it.count_by_charges()) {
                self.to_use.push((first, entry.chosen_count));
            } else {
                self.to_use.extend(
                    entry
                        .locations
                        .iter()
                        .take(entry.chosen_count as usize)
                        .map(|loc| (*loc, 1)),
                );
            }
        }
        entry.reset_cell_cache();
        let snapshot = entry.clone();
        self.base.on_change(world, &snapshot);
    }

    /// Sets the count of one entry owned by this selector.
    pub fn toggle_entry(&mut self, world: &ItemWorld, id: EntryId, count: u32) {
        if !self.base.is_mine(id) {
            return;
        }
        self.set_chosen_count(world, id, count);
        self.base.prepare_layout(world);
    }

    fn toggle_target(&self, world: &ItemWorld, mode: ToggleMode, mouse_only: bool) -> Option<EntryId> {
        match mode {
            ToggleMode::Selected if mouse_only => self.base.hovered().map(|(_, id)| id),
            ToggleMode::Selected => self.base.highlighted().map(|(_, id)| id),
            ToggleMode::NonFavoriteNonWorn => {
                let column = self.base.column(self.base.active_column())?;
                column
                    .entries()
                    .iter()
                    .find(|e| {
                        e.is_selectable()
                            && e.any_item().is_some_and(|r| {
                                world.get(r).is_some_and(|it| !it.favorite) && !world.is_worn(r)
                            })
                    })
                    .map(Entry::id)
            }
        }
    }

    /// Chooses `count` units of the targeted entry. A zero count selects
    /// everything, or deselects an entry that already has units chosen.
    /// Returns whether anything was toggled.
    pub fn toggle_entries(&mut self, world: &ItemWorld, count: u32, mode: ToggleMode, mouse_only: bool) -> bool {
        let Some(id) = self.toggle_target(world, mode, mouse_only) else {
            return false;
        };
        if !self.base.is_mine(id) {
            return false;
        }
        let Some(entry) = self.base.entry(id) else {
            return false;
        };
        if !entry.is_selectable() {
            return false;
        }

        let count = if count > 0 {
            count
        } else if entry.chosen_count > 0 {
            0
        } else {
            match mode {
                ToggleMode::Selected => u32::MAX,
                ToggleMode::NonFavoriteNonWorn => self.max_chosen_count,
            }
        };
        self.set_chosen_count(world, id, count);

        if !self.allow_select_contained {
            self.deselect_contained_items(world);
        }
        self.base.prepare_layout(world);
        true
    }

    /// Drops chosen contents of chosen containers, and frozen liquids that
    /// cannot be taken loose where they are.
    pub fn deselect_contained_items(&mut self, world: &ItemWorld) {
        let mut contained = Vec::new();
        for (container, _) in &self.to_use {
            contained.extend(world.all_contents(*container));
        }
        let chosen: Vec<(EntryId, Vec<ItemRef>)> = self
            .base
            .columns()
            .iter()
            .filter(|c| !c.is_selection())
            .flat_map(Column::items)
            .filter(|e| e.chosen_count > 0)
            .map(|e| (e.id(), e.locations.clone()))
            .collect();

        let who = self.base.who();
        let (can_crush, weapon) = world
            .character(who)
            .map_or((false, None), |c| (c.can_crush_frozen, c.wielded));
        let stuck_frozen = |loc: ItemRef| {
            let Some(it) = world.get(loc) else {
                return false;
            };
            if !it.is_frozen_liquid() || it.flags.shredded {
                return false;
            }
            match it.location() {
                Location::Map(_) | Location::Contained { .. } => !can_crush,
                Location::Wielded(_) | Location::Worn(_) => weapon != Some(loc),
                Location::Vehicle(_) | Location::Nowhere => false,
            }
        };

        for (id, locations) in chosen {
            let inside = locations.iter().any(|l| contained.contains(l));
            let frozen = locations.first().is_some_and(|l| stuck_frozen(*l));
            if inside || frozen {
                debug!("Deselecting entry {id:?}: contained {inside}, frozen {frozen}");
                self.set_chosen_count(world, id, 0);
            }
        }
    }

    /// Switches hierarchy and categories mode, then re-applies every choice.
    pub fn toggle_categorize_contained(&mut self, world: &mut ItemWorld) {
        if let Some(column) = self.base.columns_mut().get_mut(self.selection_column) {
            column.clear();
        }
        self.base.toggle_categorize_contained(world);
        let chosen: Vec<(EntryId, u32)> = self
            .base
            .columns()
            .iter()
            .filter(|c| !c.is_selection())
            .flat_map(Column::items)
            .filter(|e| e.chosen_count > 0)
            .map(|e| (e.id(), e.chosen_count))
            .collect();
        for (id, count) in chosen {
            self.set_chosen_count(world, id, count);
        }
        self.base.prepare_layout(world);
    }

    /// Handles choosing input; everything else goes to the selector.
    /// Returns whether the ledger may have changed.
    pub fn on_input(&mut self, world: &mut ItemWorld, driver: &mut dyn UiDriver, input: InventoryInput) -> bool {
        match input.action {
            Action::Select => self.toggle_entries(world, 0, ToggleMode::Selected, true),
            Action::ToggleNonFavorite => self.toggle_entries(world, 0, ToggleMode::NonFavoriteNonWorn, false),
            Action::ToggleEntry => self.toggle_entries(world, 0, ToggleMode::Selected, false),
            Action::MarkWithCount => match self.base.query_count(driver, None) {
                Some(n) => self.toggle_entries(world, n, ToggleMode::Selected, false),
                None => false,
            },
            Action::AnyInput => match input.ch {
                Some(ch) if ch.is_ascii_digit() => match self.base.query_count(driver, Some(ch)) {
                    Some(n) => self.toggle_entries(world, n, ToggleMode::Selected, false),
                    None => false,
                },
                Some(ch) => {
                    let Some((_, id)) = self.base.find_by_invlet(world, ch) else {
                        return false;
                    };
                    let Some(loc) = self.base.entry(id).and_then(Entry::any_item) else {
                        return false;
                    };
                    self.base.highlight(world, loc, false, true);
                    self.toggle_entries(world, 0, ToggleMode::Selected, false)
                }
                None => false,
            },
            Action::IncreaseCount | Action::DecreaseCount => {
                let Some(entry) = self.base.get_highlighted().filter(|e| e.is_selectable()) else {
                    return false;
                };
                let id = entry.id();
                let count = entry.chosen_count;
                let max = entry.get_available_count(world);
                let new_count = if input.action == Action::IncreaseCount {
                    count.saturating_add(1).min(max)
                } else {
                    count.saturating_sub(1)
                };
                self.toggle_entry(world, id, new_count);
                true
            }
            Action::ViewCategoryMode => {
                self.toggle_categorize_contained(world);
                false
            }
            _ => {
                self.base.on_input(world, driver, input);
                false
            }
        }
    }

    /// Draws one frame with the ledger's stats.
    pub fn render(&mut self, world: &ItemWorld, driver: &mut dyn UiDriver) {
        let stats = self.stats(world);
        self.base.render(world, driver, stats.as_ref());
    }

    /// Runs the session until the ledger is confirmed or the user quits.
    pub fn execute(&mut self, world: &mut ItemWorld, driver: &mut dyn UiDriver) -> Ledger {
        self.base.prepare_layout(world);
        loop {
            self.render(world, driver);
            let input = driver.next_input();
            match input.action {
                Action::Confirm if self.to_use.is_empty() => {
                    driver.notify("No items were selected.  Use TOGGLE_ENTRY to select them.");
                }
                Action::Confirm => break,
                Action::Quit => {
                    self.release_focus();
                    return Vec::new();
                }
                _ => {
                    self.on_input(world, driver, input);
                }
            }
        }
        self.release_focus();
        info!("Confirmed {} ledger rows", self.to_use.len());
        self.to_use.clone()
    }

    /// Hands hover and focus reports back to other selectors.
    pub fn release_focus(&self) {
        self.base.focus().lock().release(self.base.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::FocusBroker;
    use crate::preset::DefaultPreset;
    use crate::render::{ScriptStep, ScriptedDriver};
    use crate::selector::{OWN_GEAR_COLUMN, OWN_INV_COLUMN};
    use crate::world::{Character, Item, Phase, Pocket, PocketKind};
    use proptest::prelude::*;
    use satchel_common::Tripoint;

    const YOU: CharacterId = CharacterId::PLAYER;

    struct Pack {
        world: ItemWorld,
        bag: ItemRef,
        coins: Vec<ItemRef>,
        arrows: ItemRef,
    }

    fn pack() -> Pack {
        let mut world = ItemWorld::new();
        world.add_character(Character::new(YOU, "You", Tripoint::default()));
        let bag = world
            .spawn(
                Item::new("bag", "bag", "containers")
                    .with_pocket(Pocket::new(PocketKind::Container, 5_000, 10_000)),
                Location::Worn(YOU),
            )
            .expect("bag");
        let pocket = Location::Contained { parent: bag, pocket: 0 };
        let coins = (0..3)
            .map(|_| world.spawn(Item::new("coin", "coin", "other"), pocket).expect("coin"))
            .collect();
        let arrows = world
            .spawn(Item::new("arrow", "arrow", "ammo").with_charges(20), pocket)
            .expect("arrows");
        Pack {
            world,
            bag,
            coins,
            arrows,
        }
    }

    fn multiselector(world: &ItemWorld) -> InventoryMultiselector {
        let mut ms = InventoryMultiselector::new(
            world,
            YOU,
            Arc::new(DefaultPreset::default()),
            "CHOSEN",
            LayoutSettings::default(),
            UiMode::Categories,
            FocusBroker::shared(),
        );
        ms.selector_mut().add_character_items(world, YOU);
        ms.selector_mut().prepare_layout(world);
        ms
    }

    fn entry_of(ms: &InventoryMultiselector, loc: ItemRef) -> EntryId {
        ms.selector()
            .columns()
            .iter()
            .filter(|c| !c.is_selection())
            .flat_map(Column::items)
            .find(|e| e.locations.contains(&loc))
            .map(Entry::id)
            .expect("entry")
    }

    #[test]
    fn test_coins_collate_into_one_entry() {
        let p = pack();
        let ms = multiselector(&p.world);
        let inv = &ms.selector().columns()[OWN_INV_COLUMN];
        let coins: Vec<_> = inv
            .entries()
            .iter()
            .filter(|e| e.locations.contains(&p.coins[0]))
            .collect();
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].get_available_count(&p.world), 3);
    }

    #[test]
    fn test_set_chosen_count_rebuilds_ledger() {
        let p = pack();
        let mut ms = multiselector(&p.world);
        let coins = entry_of(&ms, p.coins[0]);
        ms.set_chosen_count(&p.world, coins, 2);
        assert_eq!(ms.to_use().len(), 2);
        ms.set_chosen_count(&p.world, coins, 3);
        assert_eq!(ms.to_use().len(), 3);
        ms.set_chosen_count(&p.world, coins, 1);
        assert_eq!(ms.to_use(), &[(p.coins[0], 1)]);
        ms.set_chosen_count(&p.world, coins, 0);
        assert!(ms.to_use().is_empty());
    }

    #[test]
    fn test_charges_use_one_row() {
        let p = pack();
        let mut ms = multiselector(&p.world);
        let arrows = entry_of(&ms, p.arrows);
        ms.set_chosen_count(&p.world, arrows, 50);
        assert_eq!(ms.to_use(), &[(p.arrows, 20)]);
        ms.set_max_chosen_count(5);
        ms.set_chosen_count(&p.world, arrows, 50);
        assert_eq!(ms.to_use(), &[(p.arrows, 5)]);
    }

    #[test]
    fn test_selection_column_mirrors_choices() {
        let p = pack();
        let mut ms = multiselector(&p.world);
        let arrows = entry_of(&ms, p.arrows);
        ms.toggle_entry(&p.world, arrows, 4);
        let selection = &ms.selector().columns()[ms.selection_column()];
        let mirror = selection
            .entries()
            .iter()
            .find(|e| e.is_item())
            .expect("mirror");
        assert_eq!(mirror.chosen_count, 4);

        let mirror = mirror.id();
        ms.toggle_entry(&p.world, mirror, 0);
        assert!(ms.to_use().is_empty());
        let selection = &ms.selector().columns()[ms.selection_column()];
        assert!(selection.entries().iter().all(|e| !e.is_item()));
    }

    #[test]
    fn test_full_toggle_deselects() {
        let mut p = pack();
        let mut ms = multiselector(&p.world);
        let mut driver = ScriptedDriver::new(vec![ScriptStep::Focus("arrow".into())]);
        ms.render(&p.world, &mut driver);
        assert!(ms.on_input(&mut p.world, &mut driver, Action::ToggleEntry.into()));
        assert_eq!(ms.to_use(), &[(p.arrows, 20)]);
        assert!(ms.on_input(&mut p.world, &mut driver, Action::ToggleEntry.into()));
        assert!(ms.to_use().is_empty());
    }

    #[test]
    fn test_increase_and_decrease_clamp() {
        let mut p = pack();
        let mut ms = multiselector(&p.world);
        let mut driver = ScriptedDriver::new(vec![ScriptStep::Focus("coin".into())]);
        ms.render(&p.world, &mut driver);
        for _ in 0..5 {
            ms.on_input(&mut p.world, &mut driver, Action::IncreaseCount.into());
        }
        assert_eq!(ms.to_use().len(), 3);
        for _ in 0..5 {
            ms.on_input(&mut p.world, &mut driver, Action::DecreaseCount.into());
        }
        assert!(ms.to_use().is_empty());
    }

    #[test]
    fn test_container_choice_drops_contents() {
        let p = pack();
        let mut ms = multiselector(&p.world);
        let arrows = entry_of(&ms, p.arrows);
        ms.set_chosen_count(&p.world, arrows, 3);
        let bag = ms.selector().columns()[OWN_GEAR_COLUMN]
            .find_by_location(p.bag, false)
            .map(|i| ms.selector().columns()[OWN_GEAR_COLUMN].entries()[i].id())
            .expect("bag entry");
        ms.set_chosen_count(&p.world, bag, 1);
        ms.deselect_contained_items(&p.world);
        assert_eq!(ms.to_use(), &[(p.bag, 1)]);
    }

    #[test]
    fn test_frozen_liquid_on_ground_is_deselected() {
        let mut p = pack();
        let ice = p
            .world
            .spawn(
                Item::new("water", "water", "drinks").with_phase(Phase::Liquid, true),
                Location::Map(Tripoint::new(1, 0, 0)),
            )
            .expect("ice");
        let mut ms = multiselector(&p.world);
        ms.selector_mut().add_map_items(&p.world, Tripoint::new(1, 0, 0));
        ms.selector_mut().prepare_layout(&p.world);
        let id = entry_of(&ms, ice);
        ms.set_chosen_count(&p.world, id, 1);
        ms.deselect_contained_items(&p.world);
        assert!(ms.to_use().is_empty());
    }

    #[test]
    fn test_frozen_liquid_wielded_only_as_weapon() {
        let mut p = pack();
        let ice = p
            .world
            .spawn(
                Item::new("water", "water", "drinks").with_phase(Phase::Liquid, true),
                Location::Wielded(YOU),
            )
            .expect("ice");
        let mut ms = multiselector(&p.world);
        let id = entry_of(&ms, ice);

        ms.set_chosen_count(&p.world, id, 1);
        ms.deselect_contained_items(&p.world);
        assert_eq!(ms.to_use(), &[(ice, 1)]);

        p.world.character_mut(YOU).expect("you").wielded = None;
        ms.deselect_contained_items(&p.world);
        assert!(ms.to_use().is_empty());
    }

    #[test]
    fn test_frozen_liquid_in_container_needs_crushing() {
        let mut p = pack();
        let ice = p
            .world
            .spawn(
                Item::new("water", "water", "drinks").with_phase(Phase::Liquid, true),
                Location::Contained {
                    parent: p.bag,
                    pocket: 0,
                },
            )
            .expect("ice");
        let mut ms = multiselector(&p.world);
        let id = entry_of(&ms, ice);

        p.world.character_mut(YOU).expect("you").can_crush_frozen = true;
        ms.set_chosen_count(&p.world, id, 1);
        ms.deselect_contained_items(&p.world);
        assert_eq!(ms.to_use(), &[(ice, 1)]);

        p.world.character_mut(YOU).expect("you").can_crush_frozen = false;
        ms.deselect_contained_items(&p.world);
        assert!(ms.to_use().is_empty());
    }

    #[test]
    fn test_toggle_non_favorite_skips_favorites_and_worn() {
        let mut world = ItemWorld::new();
        world.add_character(Character::new(YOU, "You", Tripoint::default()));
        let bag = world
            .spawn(
                Item::new("bag", "bag", "containers")
                    .with_pocket(Pocket::new(PocketKind::Container, 5_000, 10_000)),
                Location::Worn(YOU),
            )
            .expect("bag");
        let pocket = Location::Contained { parent: bag, pocket: 0 };
        let amulet = world.spawn(Item::new("amulet", "amulet", "other"), pocket).expect("amulet");
        world.set_favorite(amulet, true);
        let arrows = world
            .spawn(Item::new("arrow", "arrow", "other").with_charges(20), pocket)
            .expect("arrows");
        let mut ms = multiselector(&world);

        ms.selector_mut().set_active_column(OWN_GEAR_COLUMN);
        assert!(!ms.toggle_entries(&world, 0, ToggleMode::NonFavoriteNonWorn, false));
        assert!(ms.to_use().is_empty());

        ms.selector_mut().set_active_column(OWN_INV_COLUMN);
        assert!(ms.toggle_entries(&world, 0, ToggleMode::NonFavoriteNonWorn, false));
        assert_eq!(ms.to_use(), &[(arrows, 20)]);

        assert!(ms.toggle_entries(&world, 0, ToggleMode::NonFavoriteNonWorn, false));
        assert!(ms.to_use().is_empty());

        ms.set_max_chosen_count(5);
        assert!(ms.toggle_entries(&world, 0, ToggleMode::NonFavoriteNonWorn, false));
        assert_eq!(ms.to_use(), &[(arrows, 5)]);
    }

    #[test]
    fn test_confirm_requires_a_choice() {
        let mut p = pack();
        let mut ms = multiselector(&p.world);
        let mut driver = ScriptedDriver::new(vec![
            ScriptStep::Input(Action::Confirm),
            ScriptStep::Focus("coin".into()),
            ScriptStep::Input(Action::ToggleEntry),
            ScriptStep::Input(Action::Confirm),
        ]);
        let ledger = ms.execute(&mut p.world, &mut driver);
        assert_eq!(
            driver.notifications(),
            &["No items were selected.  Use TOGGLE_ENTRY to select them.".to_string()]
        );
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_quit_returns_nothing() {
        let mut p = pack();
        let mut ms = multiselector(&p.world);
        let arrows = entry_of(&ms, p.arrows);
        ms.set_chosen_count(&p.world, arrows, 2);
        let mut driver = ScriptedDriver::new(vec![ScriptStep::Input(Action::Quit)]);
        assert!(ms.execute(&mut p.world, &mut driver).is_empty());
    }

    #[test]
    fn test_mode_switch_keeps_choices() {
        let mut p = pack();
        let mut ms = multiselector(&p.world);
        let arrows = entry_of(&ms, p.arrows);
        ms.set_chosen_count(&p.world, arrows, 7);
        ms.toggle_categorize_contained(&mut p.world);
        assert_eq!(ms.to_use(), &[(p.arrows, 7)]);
        let selection = &ms.selector().columns()[ms.selection_column()];
        assert_eq!(selection.entries().iter().filter(|e| e.is_item()).count(), 1);
    }

    proptest! {
        #[test]
        fn test_chosen_count_never_exceeds_available(counts in proptest::collection::vec(0u32..40, 1..12)) {
            let p = pack();
            let mut ms = multiselector(&p.world);
            let arrows = entry_of(&ms, p.arrows);
            let coins = entry_of(&ms, p.coins[0]);
            for count in counts {
                ms.set_chosen_count(&p.world, arrows, count);
                ms.set_chosen_count(&p.world, coins, count);
                for entry in ms.selector().columns().iter().flat_map(Column::items) {
                    prop_assert!(entry.chosen_count <= entry.get_available_count(&p.world));
                }
                let coin_rows = ms.to_use().iter().filter(|(r, _)| p.coins.contains(r)).count();
                prop_assert_eq!(coin_rows as u32, count.min(3));
            }
        }
    }
}
