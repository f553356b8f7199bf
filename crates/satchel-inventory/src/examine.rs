//! Read-only browsing of one container's contents with a detail pane.

use std::sync::Arc;

use satchel_common::{CharacterId, Color, ItemRef};
use tracing::debug;

use crate::focus::SharedFocus;
use crate::input::Action;
use crate::preset::{DefaultPreset, Preset};
use crate::render::{LineSpec, UiDriver};
use crate::selector::InventorySelector;
use crate::settings::{LayoutSettings, UiMode};
use crate::world::{ItemWorld, Phase};

/// Outcome of an examine session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamineResult {
    /// The container is empty or nothing in it is shown
    NoContentsToExamine,
    /// Pockets were collapsed or expanded
    ExaminedWithChanges,
    /// Nothing changed
    ExaminedUnchanged,
}

/// Detail lines of an item.
#[must_use]
pub fn item_info(world: &ItemWorld, item: ItemRef) -> Vec<String> {
    let Some(it) = world.get(item) else {
        return vec!["Item not found".to_string()];
    };
    let mut lines = vec![
        it.display_name(),
        format!("Category: {}", it.category),
        format!("Location: {}", world.describe_location(item)),
        format!(
            "Weight: {:.2} kg  Volume: {:.2} L",
            f64::from(world.total_weight(item)) / 1000.0,
            f64::from(world.total_volume(item)) / 1000.0
        ),
    ];
    if it.length_mm > 0 {
        lines.push(format!("Length: {} mm", it.length_mm));
    }
    if let Some(charges) = it.charges {
        lines.push(format!("Charges: {charges}"));
    }
    if it.price != 0 {
        lines.push(format!("Price: {}", it.price));
    }
    match it.phase {
        Phase::Liquid if it.frozen => lines.push("Frozen liquid".to_string()),
        Phase::Liquid => lines.push("Liquid".to_string()),
        Phase::Gas => lines.push("Gas".to_string()),
        Phase::Solid => {}
    }
    if it.is_container() {
        let stats = world.container_stats(item);
        lines.push(format!(
            "Contains {} items ({:.2}/{:.2} L)",
            world.contents(item).len(),
            f64::from(stats.contained_volume_ml) / 1000.0,
            f64::from(stats.volume_capacity_ml) / 1000.0
        ));
    }
    if it.favorite {
        lines.push("Favorite".to_string());
    }
    lines
}

/// Examine-contents session.
#[derive(Debug)]
pub struct InventoryExaminer {
    base: InventorySelector,
    parent_item: ItemRef,
    changes_made: bool,
}

impl InventoryExaminer {
    /// Lists the contents of `item` with the default preset.
    pub fn new(
        world: &ItemWorld,
        who: CharacterId,
        item: ItemRef,
        layout: LayoutSettings,
        focus: SharedFocus,
    ) -> Self {
        Self::with_preset(world, who, item, Arc::new(DefaultPreset::default()), layout, focus)
    }

    /// Lists the contents of `item` under a custom preset.
    pub fn with_preset(
        world: &ItemWorld,
        who: CharacterId,
        item: ItemRef,
        preset: Arc<dyn Preset>,
        layout: LayoutSettings,
        focus: SharedFocus,
    ) -> Self {
        let mut base = InventorySelector::new(who, preset, layout, UiMode::Hierarchy, focus);
        base.load_categories(world);
        base.set_display_stats(false);
        base.force_width(Some(0.0));
        match world.get(item) {
            Some(it) => base.set_title(it.display_name()),
            None => base.set_title("ERROR: Item not found"),
        }
        base.add_contained_items(world, item);
        Self {
            base,
            parent_item: item,
            changes_made: false,
        }
    }

    /// The underlying selector.
    #[must_use]
    pub const fn selector(&self) -> &InventorySelector {
        &self.base
    }

    fn has_contents(&self, world: &ItemWorld) -> bool {
        !world.contents(self.parent_item).is_empty() && !self.base.is_empty()
    }

    fn cleanup(&self) -> ExamineResult {
        self.base.focus().lock().release(self.base.id());
        if self.changes_made {
            ExamineResult::ExaminedWithChanges
        } else {
            ExamineResult::ExaminedUnchanged
        }
    }

    fn render(&mut self, world: &ItemWorld, driver: &mut dyn UiDriver) {
        self.base.focus().lock().begin_frame();
        let base = &mut self.base;
        driver.frame(&mut |surface| {
            base.draw_header(surface, None);
            surface.separator();
            if base.columns().iter().any(|c| !c.is_valid()) {
                base.prepare_layout(world);
            }
            if let Some(first) = (0..base.columns().len()).find(|i| base.columns()[*i].visible()) {
                base.draw_column(world, surface, first);
            }
            surface.separator();
            match base.get_highlighted().and_then(|e| e.any_item()) {
                Some(item) => {
                    for line in item_info(world, item) {
                        surface.draw_line(&LineSpec::text(line, Color::LightGray));
                    }
                }
                None => {
                    surface.draw_line(&LineSpec::text("No focused entry.", Color::DarkGray));
                }
            }
        });
        self.base.sync_focus(world);
    }

    /// Runs the session.
    pub fn execute(&mut self, world: &mut ItemWorld, driver: &mut dyn UiDriver) -> ExamineResult {
        if !self.has_contents(world) {
            debug!("Nothing to examine inside {}", self.parent_item);
            return ExamineResult::NoContentsToExamine;
        }
        self.base.prepare_layout(world);
        loop {
            self.render(world, driver);
            let input = driver.next_input();
            match input.action {
                Action::Quit | Action::Confirm | Action::Select => return self.cleanup(),
                action => {
                    if matches!(action, Action::ShowHideContents | Action::ShowHideContentsAll) {
                        self.changes_made = true;
                    }
                    self.base.on_input(world, driver, input);
                }
            }
        }
    }
}
