//! Drop selector: a multiselector that warns before spilling liquids.

use std::sync::Arc;

use satchel_common::CharacterId;
use tracing::info;

use crate::focus::SharedFocus;
use crate::multiselect::{InventoryMultiselector, Ledger, StatsFn};
use crate::preset::Preset;
use crate::render::UiDriver;
use crate::settings::{LayoutSettings, UiMode};
use crate::stats::weight_volume_holster_stats;
use crate::world::{ItemWorld, Phase};

/// Asked once per session before liquids leave their container.
pub const LIQUID_WARNING: &str =
    "You are dropping liquid from its container.  You might not be able to pick it back up.  Really do so?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropLiquid {
    Ask,
    No,
    Yes,
}

/// Carried stats with the ledger taken away.
#[must_use]
pub fn drop_stats(who: CharacterId) -> StatsFn {
    Box::new(move |world, ledger| {
        world
            .carry_stats_excluding(who, ledger)
            .ok()
            .map(|s| weight_volume_holster_stats(&s))
    })
}

/// Chooses items to drop.
#[derive(Debug)]
pub struct InventoryDropSelector {
    ms: InventoryMultiselector,
    warn_liquid: bool,
}

impl InventoryDropSelector {
    /// Creates a drop selector showing what stays carried in its header.
    pub fn new(
        world: &ItemWorld,
        who: CharacterId,
        preset: Arc<dyn Preset>,
        selection_title: &str,
        layout: LayoutSettings,
        ui_mode: UiMode,
        focus: SharedFocus,
    ) -> Self {
        let ms = InventoryMultiselector::new(world, who, preset, selection_title, layout, ui_mode, focus)
            .with_stats(drop_stats(who));
        Self::from_multiselector(ms)
    }

    /// Wraps a prepared multiselector.
    #[must_use]
    pub const fn from_multiselector(ms: InventoryMultiselector) -> Self {
        Self { ms, warn_liquid: true }
    }

    /// Enables or disables the liquid prompt.
    pub fn set_warn_liquid(&mut self, warn: bool) {
        self.warn_liquid = warn;
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

    /// Runs the session and returns the rows to drop.
    pub fn execute(&mut self, world: &mut ItemWorld, driver: &mut dyn UiDriver) -> Ledger {
        let ledger = self.ms.execute(world, driver);
        self.filter_liquids(world, driver, ledger)
    }

    /// Drops liquid rows the user declines to spill. The first answer holds
    /// for every later liquid row.
    pub fn filter_liquids(&self, world: &ItemWorld, driver: &mut dyn UiDriver, ledger: Ledger) -> Ledger {
        let mut should_drop_liquid = DropLiquid::Ask;
        let total = ledger.len();
        let kept: Ledger = ledger
            .into_iter()
            .filter(|(item, _)| {
                let spills = world
                    .get(*item)
                    .is_some_and(|it| it.phase == Phase::Liquid && !it.is_frozen_liquid());
                if !spills {
                    return true;
                }
                if should_drop_liquid == DropLiquid::Ask {
                    should_drop_liquid = if !self.warn_liquid || driver.confirm(LIQUID_WARNING) {
                        DropLiquid::Yes
                    } else {
                        DropLiquid::No
                    };
                }
                should_drop_liquid == DropLiquid::Yes
            })
            .collect();
        if kept.len() != total {
            info!("Kept {} liquid rows in their containers", total - kept.len());
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::FocusBroker;
    use crate::preset::DefaultPreset;
    use crate::world::{Character, Item, Location, Pocket, PocketKind};
    use crate::render::ScriptedDriver;
    use satchel_common::{ItemRef, Tripoint};

    const YOU: CharacterId = CharacterId::PLAYER;

    fn setup() -> (ItemWorld, ItemRef, ItemRef, ItemRef) {
        let mut world = ItemWorld::new();
        world.add_character(Character::new(YOU, "You", Tripoint::default()));
        let canteen = world
            .spawn(
                Item::new("canteen", "canteen", "containers")
                    .with_size(200, 100)
                    .with_pocket(Pocket::new(PocketKind::Container, 1_000, 1_000).watertight()),
                Location::Worn(YOU),
            )
            .expect("canteen");
        let inside = Location::Contained {
            parent: canteen,
            pocket: 0,
        };
        let water = world
            .spawn(
                Item::new("water", "water", "drinks")
                    .with_charges(4)
                    .with_size(250, 250)
                    .with_phase(Phase::Liquid, false),
                inside,
            )
            .expect("water");
        let ice = world
            .spawn(
                Item::new("ice", "ice", "drinks").with_phase(Phase::Liquid, true),
                inside,
            )
            .expect("ice");
        (world, canteen, water, ice)
    }

    fn dropper(world: &ItemWorld) -> InventoryDropSelector {
        InventoryDropSelector::new(
            world,
            YOU,
            Arc::new(DefaultPreset::default()),
            "ITEMS TO DROP",
            LayoutSettings::default(),
            UiMode::Categories,
            FocusBroker::shared(),
        )
    }

    #[test]
    fn test_declined_liquid_stays() {
        let (world, canteen, water, ice) = setup();
        let sel = dropper(&world);
        let mut driver = ScriptedDriver::default().with_confirms([false]);
        let kept = sel.filter_liquids(&world, &mut driver, vec![(water, 2), (ice, 1), (canteen, 1)]);
        assert_eq!(kept, vec![(ice, 1), (canteen, 1)]);
        assert_eq!(driver.questions(), &[LIQUID_WARNING.to_string()]);
    }

    #[test]
    fn test_answer_applies_to_every_liquid() {
        let (mut world, canteen, water, _) = setup();
        let juice = world
            .spawn(
                Item::new("juice", "juice", "drinks").with_phase(Phase::Liquid, false),
                Location::Contained {
                    parent: canteen,
                    pocket: 0,
                },
            )
            .expect("juice");
        let sel = dropper(&world);
        let mut driver = ScriptedDriver::default().with_confirms([true]);
        let kept = sel.filter_liquids(&world, &mut driver, vec![(water, 1), (juice, 1)]);
        assert_eq!(kept.len(), 2);
        assert_eq!(driver.questions().len(), 1);
    }

    #[test]
    fn test_no_prompt_without_warning() {
        let (world, _, water, _) = setup();
        let mut sel = dropper(&world);
        sel.set_warn_liquid(false);
        let mut driver = ScriptedDriver::default();
        let kept = sel.filter_liquids(&world, &mut driver, vec![(water, 1)]);
        assert_eq!(kept, vec![(water, 1)]);
        assert!(driver.questions().is_empty());
    }

    #[test]
    fn test_stats_subtract_ledger() {
        let (world, _, water, _) = setup();
        let stats = drop_stats(YOU);
        let before = stats(&world, &[]).expect("stats");
        let after = stats(&world, &[(water, 2)]).expect("stats");
        assert_eq!(before[0].value, "1.2");
        assert_eq!(after[0].value, "0.7");
        assert_eq!(after[1].value, "0.50");
    }
}
