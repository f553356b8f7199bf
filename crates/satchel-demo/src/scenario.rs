//! Scripted selector sessions.
//!
//! Each session builds a fresh world from its description, queues its input steps
//! on an [`EguiDriver`] and runs one selector to completion. The outcome is
//! collected into a serializable [`ScenarioReport`].

use std::sync::Arc;

use satchel_common::{CharacterId, ItemRef, WorldError};
use satchel_egui::{EguiDriver, Keymap, KeymapError};
use satchel_inventory::{
    DefaultPreset, ExamineResult, FocusBroker, InventoryCompareSelector, InventoryDropSelector, InventoryExaminer,
    InventoryInsertSelector, InventoryPickSelector, ItemWorld, LayoutSettings, Ledger, PickupOutcome,
    PickupSelector, PriceTable, SavedModes, TradeParties, TradeSession, UiContext, UiMode, WorldSpec,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{DemoConfig, ScenarioConfig, ScenarioKind};

/// Errors from running a scripted session.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A step could not be parsed
    #[error("Invalid input step '{0}'")]
    InvalidStep(String),

    /// A key chord in a step is unknown
    #[error(transparent)]
    Keymap(#[from] KeymapError),

    /// The world could not be built
    #[error(transparent)]
    World(#[from] WorldError),

    /// The player wears no container
    #[error("{0} wears no container")]
    NoContainer(String),

    /// Nobody to trade with
    #[error("No other character to trade with")]
    NoTrader,
}

/// Result type for scripted sessions.
pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// One queued input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputStep {
    /// A key chord such as `Ctrl+H`
    Press(String),
    /// Typed text
    Text(String),
    /// Pointer move to a screen position
    Move(f32, f32),
    /// Primary click at a screen position
    Click(f32, f32),
}

impl InputStep {
    /// Parses `press:<chord>`, `text:<chars>`, `move:<x>,<y>` or
    /// `click:<x>,<y>`.
    pub fn parse(step: &str) -> ScenarioResult<Self> {
        let invalid = || ScenarioError::InvalidStep(step.to_string());
        let (kind, arg) = step.split_once(':').ok_or_else(invalid)?;
        let point = || -> ScenarioResult<(f32, f32)> {
            let (x, y) = arg.split_once(',').ok_or_else(invalid)?;
            let x = x.trim().parse().map_err(|_| invalid())?;
            let y = y.trim().parse().map_err(|_| invalid())?;
            Ok((x, y))
        };
        match kind.trim() {
            "press" => Ok(Self::Press(arg.trim().to_string())),
            "text" => Ok(Self::Text(arg.to_string())),
            "move" => point().map(|(x, y)| Self::Move(x, y)),
            "click" => point().map(|(x, y)| Self::Click(x, y)),
            _ => Err(invalid()),
        }
    }

    /// Queues the step on a driver.
    pub fn queue(&self, driver: &mut EguiDriver) -> ScenarioResult<()> {
        match self {
            Self::Press(chord) => driver.press(chord)?,
            Self::Text(text) => driver.type_text(text),
            Self::Move(x, y) => driver.move_pointer(egui::pos2(*x, *y)),
            Self::Click(x, y) => driver.click(egui::pos2(*x, *y)),
        }
        Ok(())
    }
}

/// One ledger row in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow {
    /// Arena index of the item
    pub item: u32,
    /// Display name
    pub name: String,
    /// Chosen count
    pub count: u32,
}

/// Balance of an accepted trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeSummary {
    /// Final balance, positive in the player's favor
    pub balance: i64,
    /// Value the player gives
    pub value_you: i64,
    /// Value the partner gives
    pub value_trader: i64,
    /// Rows the partner gives
    pub received: Vec<LedgerRow>,
}

/// What one session produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    /// Session kind
    pub scenario: &'static str,
    /// How the session ended
    pub outcome: String,
    /// Chosen rows
    pub rows: Vec<LedgerRow>,
    /// Trade details, for accepted trades
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade: Option<TradeSummary>,
    /// View mode the selector ended in
    #[serde(skip)]
    pub ui_mode: Option<(UiContext, UiMode)>,
    /// Frames drawn
    pub frames: u64,
    /// Messages shown to the player
    pub notifications: Vec<String>,
    /// Questions asked of the player
    pub questions: Vec<String>,
}

/// Shared state for running sessions.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    spec: WorldSpec,
    keymap: Keymap,
    layout: LayoutSettings,
    modes: SavedModes,
    prices: PriceTable,
    viewport: (f32, f32),
    font_size: f32,
}

impl ScenarioRunner {
    /// Creates a runner over a world description.
    pub fn new(spec: WorldSpec, keymap: Keymap, config: &DemoConfig) -> Self {
        let prices = config
            .prices
            .iter()
            .fold(PriceTable::new(), |table, (type_id, cents)| table.with_price(type_id.clone(), *cents));
        Self {
            spec,
            keymap,
            layout: LayoutSettings::default(),
            modes: SavedModes::default(),
            prices,
            viewport: (config.viewport_width, config.viewport_height),
            font_size: config.font_size,
        }
    }

    /// Uses stored layout settings and remembered modes.
    #[must_use]
    pub fn with_settings(mut self, layout: LayoutSettings, modes: SavedModes) -> Self {
        self.layout = layout;
        self.modes = modes;
        self
    }

    /// Remembers the mode a session ended in for the next one.
    pub fn remember_mode(&mut self, context: UiContext, mode: UiMode) {
        self.modes.set(context, mode);
    }

    fn driver(&self, steps: &[String]) -> ScenarioResult<EguiDriver> {
        let mut driver = EguiDriver::new(self.keymap.clone())
            .with_viewport(self.viewport.0, self.viewport.1)
            .with_font_size(self.font_size);
        for step in steps {
            InputStep::parse(step)?.queue(&mut driver)?;
        }
        debug!("Queued {} input steps", steps.len());
        Ok(driver)
    }

    /// Runs one scripted session on a fresh world.
    pub fn run(&self, scenario: &ScenarioConfig) -> ScenarioResult<ScenarioReport> {
        let mut world = self.spec.build()?;
        let mut driver = self.driver(&scenario.steps)?;
        let you = CharacterId::PLAYER;
        let focus = FocusBroker::shared();
        let preset = Arc::new(DefaultPreset::default());
        let layout = self.layout.clone();
        let sel_mode = self.modes.get(UiContext::InventorySel);

        let mut trade = None;
        let (outcome, rows, ui_mode) = match scenario.kind {
            ScenarioKind::Pick => {
                let mut pick = InventoryPickSelector::new(&world, you, preset, layout, sel_mode, focus);
                pick.selector_mut().add_character_items(&world, you);
                let picked = pick.execute(&mut world, &mut driver);
                let rows: Ledger = picked.map(|item| (item, 1)).into_iter().collect();
                let outcome = if picked.is_some() { "picked" } else { "cancelled" };
                (outcome.to_string(), rows, pick.selector().ui_mode())
            },
            ScenarioKind::Drop => {
                let mut dropper =
                    InventoryDropSelector::new(&world, you, preset, "ITEMS TO DROP", layout, sel_mode, focus);
                dropper.multiselector_mut().selector_mut().add_character_items(&world, you);
                let rows = dropper.execute(&mut world, &mut driver);
                let mode = dropper.multiselector().selector().ui_mode();
                (ledger_outcome(&rows, "dropped"), rows, mode)
            },
            ScenarioKind::Pickup => {
                let mut pickup = PickupSelector::new(
                    &world,
                    you,
                    preset,
                    None,
                    layout,
                    self.modes.get(UiContext::PickupSel),
                    focus,
                );
                pickup.multiselector_mut().selector_mut().add_nearby_items(&world, 1);
                let outcome = pickup.execute(&mut world, &mut driver);
                let mode = pickup.multiselector().selector().ui_mode();
                let (label, rows) = match outcome {
                    PickupOutcome::Take(rows) => (ledger_outcome(&rows, "taken"), rows),
                    PickupOutcome::Wield { item, charges, .. } => {
                        ("wield".to_string(), vec![(item, charges.unwrap_or(1))])
                    },
                    PickupOutcome::Wear { item, .. } => ("wear".to_string(), vec![(item, 1)]),
                    PickupOutcome::Cancelled => ("cancelled".to_string(), Vec::new()),
                };
                (label, rows, mode)
            },
            ScenarioKind::Examine => {
                let container = first_worn_container(&world, you)?;
                let mut examiner = InventoryExaminer::new(&world, you, container, layout, focus);
                let label = match examiner.execute(&mut world, &mut driver) {
                    ExamineResult::NoContentsToExamine => "empty",
                    ExamineResult::ExaminedWithChanges => "changed",
                    ExamineResult::ExaminedUnchanged => "unchanged",
                };
                (label.to_string(), Vec::new(), examiner.selector().ui_mode())
            },
            ScenarioKind::Insert => {
                let holster = first_worn_container(&world, you)?;
                let mut insert =
                    InventoryInsertSelector::new(&world, you, holster, "ITEMS TO INSERT", layout, sel_mode, focus);
                insert.multiselector_mut().selector_mut().add_character_items(&world, you);
                let rows = insert.execute(&mut world, &mut driver);
                let mode = insert.multiselector().selector().ui_mode();
                (ledger_outcome(&rows, "inserted"), rows, mode)
            },
            ScenarioKind::Compare => {
                let mut compare = InventoryCompareSelector::new(&world, you, layout, sel_mode, focus);
                compare.multiselector_mut().selector_mut().add_character_items(&world, you);
                compare.multiselector_mut().selector_mut().add_nearby_items(&world, 1);
                let pair = compare.execute(&mut world, &mut driver);
                let mode = compare.multiselector().selector().ui_mode();
                match pair {
                    Some((a, b)) => ("compared".to_string(), vec![(a, 1), (b, 1)], mode),
                    None => ("cancelled".to_string(), Vec::new(), mode),
                }
            },
            ScenarioKind::Trade => {
                let trader = world
                    .characters()
                    .find(|c| c.id != you)
                    .map(|c| c.id)
                    .ok_or(ScenarioError::NoTrader)?;
                let mut session = TradeSession::new(
                    &world,
                    TradeParties { you, trader },
                    0,
                    Arc::new(self.prices.clone()),
                    layout,
                    sel_mode,
                    focus,
                );
                let result = session.perform_trade(&mut world, &mut driver);
                if result.traded {
                    trade = Some(TradeSummary {
                        balance: result.balance,
                        value_you: result.value_you,
                        value_trader: result.value_trader,
                        received: ledger_rows(&world, &result.items_trader),
                    });
                }
                let label = if result.traded { "traded" } else { "cancelled" };
                (label.to_string(), result.items_you, sel_mode)
            },
        };

        let context = match scenario.kind {
            ScenarioKind::Pickup => UiContext::PickupSel,
            _ => UiContext::InventorySel,
        };
        info!("Scenario {} finished: {outcome}", scenario.kind.name());
        Ok(ScenarioReport {
            scenario: scenario.kind.name(),
            outcome,
            rows: ledger_rows(&world, &rows),
            trade,
            ui_mode: Some((context, ui_mode)),
            frames: driver.frames(),
            notifications: driver.notifications().to_vec(),
            questions: driver.questions().to_vec(),
        })
    }
}

fn ledger_outcome(rows: &Ledger, done: &str) -> String {
    if rows.is_empty() {
        "cancelled".to_string()
    } else {
        done.to_string()
    }
}

fn ledger_rows(world: &ItemWorld, rows: &[(ItemRef, u32)]) -> Vec<LedgerRow> {
    rows.iter()
        .map(|&(item, count)| LedgerRow {
            item: item.raw(),
            name: world.get(item).map_or_else(|| item.to_string(), |it| it.display_name()),
            count,
        })
        .collect()
}

fn first_worn_container(world: &ItemWorld, who: CharacterId) -> ScenarioResult<ItemRef> {
    let character = world.character(who)?;
    character
        .worn
        .iter()
        .copied()
        .find(|&item| world.get(item).is_some_and(|it| it.is_container()))
        .ok_or_else(|| ScenarioError::NoContainer(character.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMP: &str = r#"
(
    characters: [
        (
            id: 0,
            name: "You",
            wielded: Some((type_id: "knife", category: "tools", invlet: Some('k'), weight_g: 200)),
            worn: [
                (
                    type_id: "backpack",
                    category: "clothing",
                    invlet: Some('b'),
                    pockets: [
                        (
                            max_volume_ml: 15000,
                            max_weight_g: 30000,
                            contents: [
                                (type_id: "coin", name: Some("silver coin"), price: 100),
                                (type_id: "arrow", charges: Some(20), category: "ammo"),
                            ],
                        ),
                    ],
                ),
            ],
        ),
        (
            id: 1,
            name: "Hector",
            position: (x: 1, y: 0, z: 0),
            worn: [(type_id: "lantern", category: "tools", price: 2500)],
        ),
    ],
    tiles: [
        (position: (x: 0, y: 1, z: 0), name: "grass", items: [(type_id: "rock", count: 2)]),
    ],
)
"#;

    fn runner() -> ScenarioRunner {
        let spec = WorldSpec::from_ron(CAMP).expect("world");
        ScenarioRunner::new(spec, Keymap::default(), &DemoConfig::default())
    }

    #[test]
    fn test_bundled_world_runs_pickup() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/camp.ron");
        let spec = WorldSpec::load(path).expect("camp");
        let runner = ScenarioRunner::new(spec, Keymap::default(), &DemoConfig::default());
        let report = runner
            .run(&ScenarioConfig::new(ScenarioKind::Pickup, ["press:Ctrl+A", "press:Enter"]))
            .expect("pickup");
        assert_eq!(report.outcome, "taken");
        assert!(!report.rows.is_empty());
        assert!(report.rows.iter().all(|r| r.name == report.rows[0].name));
        assert_eq!(report.ui_mode.map(|(context, _)| context), Some(UiContext::PickupSel));
    }

    #[test]
    fn test_parse_steps() {
        assert_eq!(InputStep::parse("press:Ctrl+H").expect("press"), InputStep::Press("Ctrl+H".to_string()));
        assert_eq!(InputStep::parse("text:ab").expect("text"), InputStep::Text("ab".to_string()));
        assert_eq!(InputStep::parse("click:10, 20").expect("click"), InputStep::Click(10.0, 20.0));
        assert!(matches!(InputStep::parse("jump:1"), Err(ScenarioError::InvalidStep(_))));
        assert!(matches!(InputStep::parse("move:1"), Err(ScenarioError::InvalidStep(_))));
        assert!(matches!(InputStep::parse("Enter"), Err(ScenarioError::InvalidStep(_))));
    }

    #[test]
    fn test_unknown_chord_fails_before_running() {
        let err = runner()
            .run(&ScenarioConfig::new(ScenarioKind::Pick, ["press:Hyper+Q"]))
            .expect_err("chord");
        assert!(matches!(err, ScenarioError::Keymap(_)));
    }

    #[test]
    fn test_pick_by_invlet() {
        let report = runner()
            .run(&ScenarioConfig::new(ScenarioKind::Pick, ["text:k"]))
            .expect("pick");
        assert_eq!(report.scenario, "pick");
        assert_eq!(report.outcome, "picked");
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].name, "knife");
        assert!(report.frames >= 1);
    }

    #[test]
    fn test_empty_script_cancels() {
        let report = runner()
            .run(&ScenarioConfig::new(ScenarioKind::Drop, Vec::<String>::new()))
            .expect("drop");
        assert_eq!(report.outcome, "cancelled");
        assert!(report.rows.is_empty());
    }

    #[test]
    fn test_drop_skips_worn() {
        let report = runner()
            .run(&ScenarioConfig::new(ScenarioKind::Drop, ["press:Ctrl+A", "press:Enter"]))
            .expect("drop");
        assert_eq!(report.outcome, "dropped");
        assert!(!report.rows.is_empty());
        assert!(report.rows.iter().all(|r| r.name == report.rows[0].name && r.name != "backpack"));
    }

    #[test]
    fn test_examine_uses_backpack() {
        let report = runner()
            .run(&ScenarioConfig::new(ScenarioKind::Examine, Vec::<String>::new()))
            .expect("examine");
        assert_eq!(report.outcome, "unchanged");
        assert_eq!(report.ui_mode.map(|(_, mode)| mode), Some(UiMode::Hierarchy));
    }

    #[test]
    fn test_trade_without_agreement_is_cancelled() {
        let report = runner()
            .run(&ScenarioConfig::new(ScenarioKind::Trade, ["press:Ctrl+A", "press:Enter"]))
            .expect("trade");
        assert_eq!(report.outcome, "cancelled");
        assert!(report.trade.is_none());
    }

    #[test]
    fn test_report_serializes_without_mode() {
        let report = runner()
            .run(&ScenarioConfig::new(ScenarioKind::Pick, ["text:k"]))
            .expect("pick");
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["scenario"], "pick");
        assert_eq!(json["rows"][0]["count"], 1);
        assert!(json.get("ui_mode").is_none());
        assert!(json.get("trade").is_none());
    }
}
