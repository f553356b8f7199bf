//! Pickup selector: choose items from the ground, or wield and wear them
//! straight away.

use std::sync::Arc;

use satchel_common::{CharacterId, EntryId, ItemRef, Tripoint};
use tracing::{debug, info};

use crate::column::Column;
use crate::entry::Entry;
use crate::focus::SharedFocus;
use crate::input::Action;
use crate::multiselect::{InventoryMultiselector, Ledger, StatsFn};
use crate::preset::Preset;
use crate::render::UiDriver;
use crate::selector::InvletPolicy;
use crate::settings::{LayoutSettings, UiMode};
use crate::stats::weight_volume_holster_stats;
use crate::world::ItemWorld;

/// How a pickup session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickupOutcome {
    /// Take the chosen rows
    Take(Ledger),
    /// Wield one item, then reopen with the remaining rows
    Wield {
        /// Item to wield
        item: ItemRef,
        /// Charges to take when the item counts by charges
        charges: Option<u32>,
        /// Rows to restore when the menu reopens
        reopen: Ledger,
    },
    /// Wear one item, then reopen with the remaining rows
    Wear {
        /// Item to wear
        item: ItemRef,
        /// Rows to restore when the menu reopens
        reopen: Ledger,
    },
    /// Nothing picked up
    Cancelled,
}

/// Carried stats with the ledger added.
#[must_use]
pub fn pickup_stats(who: CharacterId) -> StatsFn {
    Box::new(move |world, ledger| {
        let mut stats = world.carry_stats(who).ok()?;
        for &(item, qty) in ledger {
            let Some(it) = world.get(item) else { continue };
            let (weight, volume) = if it.count_by_charges() {
                (it.weight_g.saturating_mul(qty), it.volume_ml.saturating_mul(qty))
            } else {
                (
                    world.total_weight(item).saturating_mul(qty),
                    world.total_volume(item).saturating_mul(qty),
                )
            };
            stats.weight_g = stats.weight_g.saturating_add(weight);
            stats.volume_ml = stats.volume_ml.saturating_add(volume);
        }
        Some(weight_volume_holster_stats(&stats))
    })
}

fn pickup_hint() -> String {
    format!(
        "{} wield {} wear\n{} expand {} all\n{} examine {}/{}/{} quantity (or type number then {})",
        Action::Wield,
        Action::Wear,
        Action::ShowHideContents,
        Action::ShowHideContentsAll,
        Action::Examine,
        Action::MarkWithCount,
        Action::IncreaseCount,
        Action::DecreaseCount,
        Action::ToggleEntry,
    )
}

/// Chooses items to pick up.
#[derive(Debug)]
pub struct PickupSelector {
    ms: InventoryMultiselector,
    where_: Option<Tripoint>,
}

impl PickupSelector {
    /// Creates a pickup selector. `where_` is the tile being picked from, if
    /// the menu was opened on one.
    pub fn new(
        world: &ItemWorld,
        who: CharacterId,
        preset: Arc<dyn Preset>,
        where_: Option<Tripoint>,
        layout: LayoutSettings,
        ui_mode: UiMode,
        focus: SharedFocus,
    ) -> Self {
        let mut ms = InventoryMultiselector::new(world, who, preset, "ITEMS TO PICK UP", layout, ui_mode, focus)
            .with_stats(pickup_stats(who));
        let base = ms.selector_mut();
        base.set_hint(pickup_hint());
        if base.invlet_policy() == InvletPolicy::Default {
            base.set_invlet_policy(InvletPolicy::Alpha);
        }
        Self { ms, where_ }
    }

    /// Tile the menu was opened on.
    #[must_use]
    pub const fn where_(&self) -> Option<Tripoint> {
        self.where_
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

    fn find_entry(&self, loc: ItemRef) -> Option<EntryId> {
        self.ms
            .selector()
            .columns()
            .iter()
            .filter(|c| !c.is_selection())
            .flat_map(Column::items)
            .find(|e| e.locations.contains(&loc))
            .map(Entry::id)
    }

    /// Restores a previous ledger, adding to whatever is already chosen.
    pub fn apply_selection(&mut self, world: &ItemWorld, selection: &[(ItemRef, u32)]) {
        for &(loc, qty) in selection {
            let Some(id) = self.find_entry(loc) else {
                debug!("Item {loc} is no longer offered");
                continue;
            };
            let current = self.ms.selector().entry(id).map_or(0, |e| e.chosen_count);
            self.ms.set_chosen_count(world, id, current.saturating_add(qty));
        }
        self.ms.selector_mut().prepare_layout(world);
    }

    fn wield(&mut self, world: &ItemWorld, driver: &mut dyn UiDriver) -> Option<PickupOutcome> {
        let entry = self.ms.selector().get_highlighted().filter(|e| e.is_item())?;
        let item = entry.any_item()?;
        let count = match entry.chosen_count {
            0 => u32::MAX,
            n => n,
        };
        let it = world.get(item)?;
        match world.can_wield(self.ms.selector().who(), item) {
            Ok(()) => {
                let charges = it.charges.map(|c| c.min(count));
                self.ms.remove_from_to_use(item);
                Some(PickupOutcome::Wield {
                    item,
                    charges,
                    reopen: self.ms.to_use().to_vec(),
                })
            }
            Err(_) => {
                driver.notify(&format!("You can't wield the {}.", it.display_name()));
                None
            }
        }
    }

    fn wear(&mut self, world: &ItemWorld, driver: &mut dyn UiDriver) -> Option<PickupOutcome> {
        let item = self
            .ms
            .selector()
            .get_highlighted()
            .filter(|e| e.is_item())
            .and_then(Entry::any_item)?;
        let it = world.get(item)?;
        match world.can_wear(self.ms.selector().who(), item) {
            Ok(()) => {
                self.ms.remove_from_to_use(item);
                Some(PickupOutcome::Wear {
                    item,
                    reopen: self.ms.to_use().to_vec(),
                })
            }
            Err(_) => {
                driver.notify(&format!("You can't wear the {}.", it.display_name()));
                None
            }
        }
    }

    /// Runs the session.
    pub fn execute(&mut self, world: &mut ItemWorld, driver: &mut dyn UiDriver) -> PickupOutcome {
        self.ms.selector_mut().prepare_layout(world);
        let outcome = loop {
            self.ms.render(world, driver);
            let input = driver.next_input();
            match input.action {
                Action::Confirm if self.ms.to_use().is_empty() => {
                    driver.notify("No items were selected.  Use TOGGLE_ENTRY to select them.");
                }
                Action::Confirm => break PickupOutcome::Take(self.ms.to_use().to_vec()),
                Action::Wield => {
                    if let Some(outcome) = self.wield(world, driver) {
                        break outcome;
                    }
                }
                Action::Wear => {
                    if let Some(outcome) = self.wear(world, driver) {
                        break outcome;
                    }
                }
                Action::Quit => break PickupOutcome::Cancelled,
                _ => {
                    self.ms.on_input(world, driver, input);
                }
            }
        };
        self.ms.release_focus();
        info!("Pickup finished: {outcome:?}");
        outcome
    }
}
