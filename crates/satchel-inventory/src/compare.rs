//! Pairwise pick for item comparison.

use std::sync::Arc;

use satchel_common::{CharacterId, EntryId, ItemRef};
use tracing::debug;

use crate::entry::Entry;
use crate::focus::SharedFocus;
use crate::input::Action;
use crate::multiselect::InventoryMultiselector;
use crate::preset::DefaultPreset;
use crate::render::UiDriver;
use crate::settings::{LayoutSettings, UiMode};
use crate::world::ItemWorld;

/// Collects exactly two items to compare.
#[derive(Debug)]
pub struct InventoryCompareSelector {
    ms: InventoryMultiselector,
    compared: Vec<(EntryId, ItemRef)>,
}

impl InventoryCompareSelector {
    /// Creates a compare selector over the default preset.
    pub fn new(world: &ItemWorld, who: CharacterId, layout: LayoutSettings, ui_mode: UiMode, focus: SharedFocus) -> Self {
        let ms = InventoryMultiselector::new(
            world,
            who,
            Arc::new(DefaultPreset::default()),
            "ITEMS TO COMPARE",
            layout,
            ui_mode,
            focus,
        );
        Self {
            ms,
            compared: Vec::new(),
        }
    }

    /// The underlying multiselector.
    #[must_use]
    pub const fn multiselector(&self) -> &InventoryMultiselector {
        &self.ms
    }

    /// The underlying multiselector, mutably.
    pub fn multiselector_mut(&mut self) -> &mut InventoryMultiselector {
        &mut self.ms
    }

    /// Items picked so far, oldest first.
    #[must_use]
    pub fn compared(&self) -> Vec<ItemRef> {
        self.compared.iter().map(|(_, item)| *item).collect()
    }

    fn set_mark(&mut self, world: &ItemWorld, id: EntryId, chosen: u32) {
        let base = self.ms.selector_mut();
        let Some(entry) = base.entry_mut(id) else {
            return;
        };
        entry.chosen_count = chosen;
        entry.reset_cell_cache();
        let snapshot = entry.clone();
        base.on_change(world, &snapshot);
    }

    /// Marks or unmarks an entry. A third mark evicts the oldest.
    pub fn toggle_entry(&mut self, world: &ItemWorld, id: EntryId) {
        let base = self.ms.selector();
        if !base.is_mine(id) {
            return;
        }
        let Some(item) = base.entry(id).and_then(Entry::any_item) else {
            return;
        };
        if let Some(pos) = self.compared.iter().position(|(_, it)| *it == item) {
            let (old, _) = self.compared.remove(pos);
            self.set_mark(world, old, 0);
        } else {
            if self.compared.len() == 2 {
                let (oldest, evicted) = self.compared.remove(0);
                debug!("Evicting {evicted} from comparison");
                self.set_mark(world, oldest, 0);
            }
            self.compared.push((id, item));
            self.set_mark(world, id, 1);
        }
        self.ms.selector_mut().prepare_layout(world);
    }

    /// Runs until two items are picked. Quitting yields `None`.
    pub fn execute(&mut self, world: &mut ItemWorld, driver: &mut dyn UiDriver) -> Option<(ItemRef, ItemRef)> {
        self.ms.selector_mut().prepare_layout(world);
        loop {
            self.ms.render(world, driver);
            let input = driver.next_input();
            let mut just_selected = None;
            match input.action {
                Action::Select => {
                    if let Some((_, id)) = self.ms.selector().hovered() {
                        self.toggle_entry(world, id);
                        just_selected = Some(id);
                    }
                }
                Action::AnyInput => {
                    let keyed = input.ch.and_then(|ch| self.ms.selector().find_by_invlet(world, ch));
                    if let Some((_, id)) = keyed {
                        self.toggle_entry(world, id);
                        just_selected = Some(id);
                    }
                }
                Action::ToggleEntry => {
                    if let Some((_, id)) = self.ms.selector().highlighted() {
                        self.toggle_entry(world, id);
                        just_selected = Some(id);
                    }
                }
                Action::Confirm => {
                    driver.notify("You need two items for comparison.  Use TOGGLE_ENTRY to select them.");
                }
                Action::Quit => {
                    self.ms.release_focus();
                    return None;
                }
                // Favoriting would drop the marks on re-layout.
                Action::ToggleFavorite => {}
                _ => self.ms.selector_mut().on_input(world, driver, input),
            }

            if let [(_, a), (_, b)] = self.compared[..] {
                // Unmark the second pick so reopening starts from one item.
                if let Some(id) = just_selected {
                    self.toggle_entry(world, id);
                }
                self.ms.release_focus();
                return Some((a, b));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::FocusBroker;
    use crate::render::{ScriptStep, ScriptedDriver};
    use crate::world::{Character, Item, Location};
    use satchel_common::Tripoint;

    const YOU: CharacterId = CharacterId::PLAYER;

    fn setup() -> (ItemWorld, Vec<ItemRef>) {
        let mut world = ItemWorld::new();
        world.add_character(Character::new(YOU, "You", Tripoint::default()));
        let items = ["axe", "bow", "cap"]
            .into_iter()
            .map(|name| {
                world
                    .spawn(Item::new(name, name, "tools"), Location::Map(Tripoint::new(0, 1, 0)))
                    .expect("spawn")
            })
            .collect();
        (world, items)
    }

    fn compare(world: &ItemWorld) -> InventoryCompareSelector {
        let mut cmp = InventoryCompareSelector::new(
            world,
            YOU,
            LayoutSettings::default(),
            UiMode::Categories,
            FocusBroker::shared(),
        );
        cmp.multiselector_mut()
            .selector_mut()
            .add_map_items(world, Tripoint::new(0, 1, 0));
        cmp.multiselector_mut().selector_mut().prepare_layout(world);
        cmp
    }

    fn id_of(cmp: &InventoryCompareSelector, item: ItemRef) -> EntryId {
        cmp.multiselector()
            .selector()
            .columns()
            .iter()
            .flat_map(|c| c.items())
            .find(|e| e.locations == [item])
            .map(Entry::id)
            .expect("entry")
    }

    #[test]
    fn test_third_pick_evicts_oldest() {
        let (world, items) = setup();
        let mut cmp = compare(&world);
        for item in &items {
            let id = id_of(&cmp, *item);
            cmp.toggle_entry(&world, id);
        }
        assert_eq!(cmp.compared(), vec![items[1], items[2]]);
        let first = id_of(&cmp, items[0]);
        let unmarked = cmp.multiselector().selector().entry(first).map(|e| e.chosen_count);
        assert_eq!(unmarked, Some(0));
    }

    #[test]
    fn test_toggle_twice_unmarks() {
        let (world, items) = setup();
        let mut cmp = compare(&world);
        let id = id_of(&cmp, items[0]);
        cmp.toggle_entry(&world, id);
        cmp.toggle_entry(&world, id);
        assert!(cmp.compared().is_empty());
    }

    #[test]
    fn test_execute_returns_pair() {
        let (mut world, items) = setup();
        let mut cmp = compare(&world);
        let mut driver = ScriptedDriver::new(vec![
            ScriptStep::Input(Action::Confirm),
            ScriptStep::Focus("axe".into()),
            ScriptStep::Input(Action::ToggleEntry),
            ScriptStep::Focus("bow".into()),
            ScriptStep::Input(Action::ToggleEntry),
        ]);
        let pair = cmp.execute(&mut world, &mut driver);
        assert_eq!(pair, Some((items[0], items[1])));
        assert_eq!(
            driver.notifications(),
            &["You need two items for comparison.  Use TOGGLE_ENTRY to select them.".to_string()]
        );
        assert_eq!(cmp.compared(), vec![items[0]]);
    }
}
