//! Single-item pick selector.

use std::sync::Arc;

use satchel_common::{CharacterId, ItemRef};
use tracing::info;

use crate::entry::Entry;
use crate::focus::SharedFocus;
use crate::input::Action;
use crate::preset::Preset;
use crate::render::UiDriver;
use crate::selector::InventorySelector;
use crate::settings::{LayoutSettings, UiMode};
use crate::world::ItemWorld;

/// Picks one item: by click, quick-select key or confirming the highlight.
#[derive(Debug)]
pub struct InventoryPickSelector {
    base: InventorySelector,
}

impl InventoryPickSelector {
    /// Creates a pick selector.
    pub fn new(
        world: &ItemWorld,
        who: CharacterId,
        preset: Arc<dyn Preset>,
        layout: LayoutSettings,
        ui_mode: UiMode,
        focus: SharedFocus,
    ) -> Self {
        let mut base = InventorySelector::new(who, preset, layout, ui_mode, focus);
        base.load_categories(world);
        Self { base }
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

    fn finish(&self, picked: Option<ItemRef>) -> Option<ItemRef> {
        self.base.focus().lock().release(self.base.id());
        if let Some(item) = picked {
            info!("Picked item {item}");
        }
        picked
    }

    /// Runs the session. Quitting yields `None`.
    pub fn execute(&mut self, world: &mut ItemWorld, driver: &mut dyn UiDriver) -> Option<ItemRef> {
        self.base.prepare_layout(world);
        loop {
            let stats = self.base.default_stats(world);
            self.base.render(world, driver, stats.as_ref());
            let input = driver.next_input();
            match input.action {
                Action::Quit => return self.finish(None),
                Action::Select => {
                    let hovered = self
                        .base
                        .hovered()
                        .and_then(|(_, id)| self.base.entry(id))
                        .and_then(Entry::any_item);
                    match hovered {
                        Some(item) => return self.finish(Some(item)),
                        None => self.base.on_input(world, driver, input),
                    }
                }
                Action::AnyInput => {
                    let keyed = input
                        .ch
                        .and_then(|ch| self.base.find_by_invlet(world, ch))
                        .and_then(|(_, id)| self.base.entry(id))
                        .and_then(Entry::any_item);
                    if let Some(item) = keyed {
                        return self.finish(Some(item));
                    }
                }
                Action::Confirm => {
                    let highlighted = self
                        .base
                        .get_highlighted()
                        .filter(|e| e.is_selectable())
                        .and_then(Entry::any_item);
                    if let Some(item) = highlighted {
                        return self.finish(Some(item));
                    }
                }
                _ => self.base.on_input(world, driver, input),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::FocusBroker;
    use crate::preset::DefaultPreset;
    use crate::render::{ScriptStep, ScriptedDriver};
    use crate::world::{Character, Item, Location};
    use satchel_common::Tripoint;

    const YOU: CharacterId = CharacterId::PLAYER;

    fn setup() -> (ItemWorld, ItemRef, ItemRef) {
        let mut world = ItemWorld::new();
        world.add_character(Character::new(YOU, "You", Tripoint::default()));
        let sword = world
            .spawn(Item::new("sword", "sword", "weapons"), Location::Wielded(YOU))
            .expect("sword");
        let hat = world
            .spawn(Item::new("hat", "hat", "clothing").with_invlet('h'), Location::Worn(YOU))
            .expect("hat");
        (world, sword, hat)
    }

    fn picker(world: &ItemWorld) -> InventoryPickSelector {
        let mut pick = InventoryPickSelector::new(
            world,
            YOU,
            Arc::new(DefaultPreset::default()),
            LayoutSettings::default(),
            UiMode::Categories,
            FocusBroker::shared(),
        );
        pick.selector_mut().add_character_items(world, YOU);
        pick
    }

    #[test]
    fn test_confirm_picks_highlighted() {
        let (mut world, sword, _) = setup();
        let mut pick = picker(&world);
        let mut driver = ScriptedDriver::new(vec![
            ScriptStep::Focus("sword".into()),
            ScriptStep::Input(Action::Confirm),
        ]);
        assert_eq!(pick.execute(&mut world, &mut driver), Some(sword));
    }

    #[test]
    fn test_hotkey_picks_item() {
        let (mut world, _, hat) = setup();
        let mut pick = picker(&world);
        let mut driver = ScriptedDriver::new(vec![ScriptStep::Key('h')]);
        assert_eq!(pick.execute(&mut world, &mut driver), Some(hat));
    }

    #[test]
    fn test_click_picks_hovered() {
        let (mut world, _, hat) = setup();
        let mut pick = picker(&world);
        let mut driver = ScriptedDriver::new(vec![
            ScriptStep::Hover("hat".into()),
            ScriptStep::Input(Action::Select),
        ]);
        assert_eq!(pick.execute(&mut world, &mut driver), Some(hat));
    }

    #[test]
    fn test_quit_picks_nothing() {
        let (mut world, _, _) = setup();
        let mut pick = picker(&world);
        let mut driver = ScriptedDriver::default();
        assert_eq!(pick.execute(&mut world, &mut driver), None);
    }
}
