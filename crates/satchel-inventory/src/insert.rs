//! Insert selector: choose items to put into one container.

use std::sync::Arc;

use satchel_common::{CharacterId, ItemRef};

use crate::drop::InventoryDropSelector;
use crate::focus::SharedFocus;
use crate::multiselect::{InventoryMultiselector, Ledger, StatsFn};
use crate::preset::{Cell, Preset, PresetContext};
use crate::render::UiDriver;
use crate::settings::{LayoutSettings, UiMode};
use crate::stats::{weight_volume_holster_stats, StatsBlock};
use crate::world::{CarryStats, ItemWorld, Phase, PocketKind};

/// Shows what fits into a destination container.
#[derive(Debug, Clone)]
pub struct HolsterPreset {
    holster: ItemRef,
    cells: Vec<Cell>,
}

impl HolsterPreset {
    /// Preset for inserting into `holster`.
    #[must_use]
    pub fn new(holster: ItemRef) -> Self {
        Self {
            holster,
            cells: vec![Cell::new("", "")],
        }
    }

    /// The destination container.
    #[must_use]
    pub const fn holster(&self) -> ItemRef {
        self.holster
    }
}

impl Preset for HolsterPreset {
    fn cells(&self) -> &[Cell] {
        &self.cells
    }

    fn is_shown(&self, world: &ItemWorld, item: ItemRef) -> bool {
        let holster = self.holster;
        if item == holster
            || world.eventually_contains(item, holster)
            || world.eventually_contains(holster, item)
        {
            return false;
        }
        let (Some(it), Some(dest)) = (world.get(item), world.get(holster)) else {
            return false;
        };
        let liquid = it.phase == Phase::Liquid;
        // Spilt liquid cannot be picked up.
        if !it.is_container() && liquid && !it.is_frozen_liquid() {
            return false;
        }
        if liquid && !dest.is_watertight_container() {
            return false;
        }
        if !world.container_accepts(holster, item) {
            return false;
        }
        // Shuffling inside the same bag is fine, re-inserting is not.
        if world.contents(holster).contains(&item) {
            return false;
        }
        if !dest.all_pockets_rigid() {
            let mut ancestor = world.parent(holster);
            while let Some(parent) = ancestor {
                if !world.container_accepts(parent, item) {
                    return false;
                }
                ancestor = world.parent(parent);
            }
        }
        true
    }

    fn get_denial(&self, ctx: &PresetContext<'_>, item: ItemRef) -> String {
        if ctx.world.is_worn_by(ctx.who, item) {
            if let Err(reason) = ctx.world.can_takeoff(ctx.who, item) {
                return reason;
            }
        }
        String::new()
    }
}

/// Capacity of `holster` once the ledger is inserted.
///
/// Each chosen row claims the tightest unused, non-full holster pocket that
/// accepts it; the rest counts against general storage.
#[must_use]
pub fn insert_stats(world: &ItemWorld, holster: ItemRef, ledger: &[(ItemRef, u32)]) -> StatsBlock {
    let pockets = world
        .get(holster)
        .map(|h| h.pockets.as_slice())
        .unwrap_or_default();
    let mut used_pockets: Vec<usize> = Vec::new();
    let (mut selected_weight, mut selected_volume) = (0u32, 0u32);
    let (mut holstered, mut holster_weight, mut holster_volume) = (0u32, 0u32, 0u32);

    for &(item, qty) in ledger {
        let Some(it) = world.get(item) else { continue };
        let (weight, volume) = if it.count_by_charges() {
            (it.weight_g.saturating_mul(qty), it.volume_ml.saturating_mul(qty))
        } else {
            (world.total_weight(item), world.total_volume(item))
        };
        let best = pockets
            .iter()
            .enumerate()
            .filter(|(i, p)| {
                p.kind == PocketKind::Holster
                    && !p.holster_full()
                    && !used_pockets.contains(i)
                    && world.can_contain(holster, *i, item).is_ok()
            })
            .min_by_key(|(_, p)| p.max_volume_ml)
            .map(|(i, _)| i);
        if let Some(index) = best {
            used_pockets.push(index);
            holstered += 1;
            holster_weight = holster_weight.saturating_add(weight);
            holster_volume = holster_volume.saturating_add(volume);
        } else {
            selected_weight = selected_weight.saturating_add(weight);
            selected_volume = selected_volume.saturating_add(volume);
        }
    }

    let c = world.container_stats(holster);
    let stats = CarryStats {
        weight_g: c.contained_weight_g + selected_weight + holster_weight + c.used_holster_weight_g,
        max_weight_g: c.weight_capacity_g + holster_weight,
        volume_ml: c.contained_volume_ml + selected_volume + holster_volume,
        max_volume_ml: c.volume_capacity_ml,
        largest_free_volume_ml: c.max_containable_volume_ml,
        longest_length_mm: c.max_containable_length_mm,
        free_holster_volume_ml: c
            .holster_volume_ml
            .saturating_sub(c.used_holster_volume_ml + holster_volume),
        used_holsters: c.used_holsters + holstered,
        total_holsters: c.total_holsters,
    };
    weight_volume_holster_stats(&stats)
}

/// Chooses items to insert into a container.
#[derive(Debug)]
pub struct InventoryInsertSelector {
    drop: InventoryDropSelector,
    holster: ItemRef,
}

impl InventoryInsertSelector {
    /// Creates an insert selector for `holster`.
    pub fn new(
        world: &ItemWorld,
        who: CharacterId,
        holster: ItemRef,
        selection_title: &str,
        layout: LayoutSettings,
        ui_mode: UiMode,
        focus: SharedFocus,
    ) -> Self {
        let stats: StatsFn = Box::new(move |world, ledger| Some(insert_stats(world, holster, ledger)));
        let ms = InventoryMultiselector::new(
            world,
            who,
            Arc::new(HolsterPreset::new(holster)),
            selection_title,
            layout,
            ui_mode,
            focus,
        )
        .with_stats(stats);
        let mut sel = Self {
            drop: InventoryDropSelector::from_multiselector(ms),
            holster,
        };
        if let Some(dest) = world.get(holster) {
            sel.multiselector_mut()
                .selector_mut()
                .set_title(format!("Insert into {}", dest.display_name()));
        }
        sel
    }

    /// Destination container.
    #[must_use]
    pub const fn holster(&self) -> ItemRef {
        self.holster
    }

    /// Enables or disables the liquid prompt.
    pub fn set_warn_liquid(&mut self, warn: bool) {
        self.drop.set_warn_liquid(warn);
    }

    /// The underlying multiselector.
    #[must_use]
    pub const fn multiselector(&self) -> &InventoryMultiselector {
        self.drop.multiselector()
    }

    /// The underlying multiselector, mutably.
    pub fn multiselector_mut(&mut self) -> &mut InventoryMultiselector {
        self.drop.multiselector_mut()
    }

    /// Runs the session and returns the rows to insert.
    pub fn execute(&mut self, world: &mut ItemWorld, driver: &mut dyn UiDriver) -> Ledger {
        self.drop.execute(world, driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryTable;
    use crate::world::{Character, Item, ItemFlags, Location, Pocket};
    use satchel_common::Tripoint;

    const YOU: CharacterId = CharacterId::PLAYER;

    struct Kit {
        world: ItemWorld,
        belt: ItemRef,
        knife: ItemRef,
        pistol: ItemRef,
        water: ItemRef,
    }

    fn kit() -> Kit {
        let mut world = ItemWorld::new();
        world.add_character(Character::new(YOU, "You", Tripoint::default()));
        let belt = world
            .spawn(
                Item::new("belt", "tool belt", "clothing")
                    .with_pocket(Pocket::new(PocketKind::Holster, 300, 1_000))
                    .with_pocket(Pocket::new(PocketKind::Holster, 800, 2_000))
                    .with_pocket(Pocket::new(PocketKind::Container, 1_000, 3_000).rigid()),
                Location::Worn(YOU),
            )
            .expect("belt");
        let ground = Location::Map(Tripoint::new(0, 1, 0));
        let knife = world
            .spawn(Item::new("knife", "knife", "tools").with_size(200, 250), ground)
            .expect("knife");
        let pistol = world
            .spawn(Item::new("pistol", "pistol", "guns").with_size(900, 700), ground)
            .expect("pistol");
        let water = world
            .spawn(Item::new("water", "water", "drinks").with_phase(Phase::Liquid, false), ground)
            .expect("water");
        Kit {
            world,
            belt,
            knife,
            pistol,
            water,
        }
    }

    #[test]
    fn test_holster_preset_filters() {
        let k = kit();
        let preset = HolsterPreset::new(k.belt);
        assert!(preset.is_shown(&k.world, k.knife));
        assert!(!preset.is_shown(&k.world, k.belt));
        assert!(!preset.is_shown(&k.world, k.water));
    }

    #[test]
    fn test_denial_for_stuck_worn_item() {
        let mut k = kit();
        let implant = k
            .world
            .spawn(
                Item::new("plate", "subdermal plate", "bionics").with_flags(ItemFlags {
                    integrated: true,
                    ..ItemFlags::default()
                }),
                Location::Worn(YOU),
            )
            .expect("implant");
        let categories = CategoryTable::new();
        let layout = LayoutSettings::default();
        let ctx = PresetContext::new(&k.world, &categories, &layout, YOU);
        let preset = HolsterPreset::new(k.belt);
        assert_eq!(preset.get_denial(&ctx, implant), "You can't take off your subdermal plate.");
        assert!(preset.get_denial(&ctx, k.knife).is_empty());
    }

    #[test]
    fn test_stats_claim_tightest_holster() {
        let k = kit();
        let stats = insert_stats(&k.world, k.belt, &[(k.knife, 1), (k.pistol, 1)]);
        // Knife takes the small holster, pistol the large one.
        assert_eq!(stats[2].value, "2");
        assert_eq!(stats[2].max, "2");
        assert!(stats[2].caption.contains("Free Holster Volume (L): 0.15"));

        let stats = insert_stats(&k.world, k.belt, &[(k.pistol, 1)]);
        assert_eq!(stats[2].value, "1");
        assert!(stats[2].caption.contains("Free Holster Volume (L): 0.40"));
    }

    #[test]
    fn test_overflow_counts_against_storage() {
        let mut k = kit();
        let second = k
            .world
            .spawn(
                Item::new("pistol", "pistol", "guns").with_size(900, 700),
                Location::Map(Tripoint::new(0, 1, 0)),
            )
            .expect("second pistol");
        let stats = insert_stats(&k.world, k.belt, &[(k.pistol, 1), (second, 1)]);
        assert_eq!(stats[2].value, "1");
        assert_eq!(stats[1].value, "1.40");
        assert_eq!(stats[1].max, "1.00");
    }
}
