//! Two-pane trade session.
//!
//! Each party gets its own multiselector pane. The session keeps a running
//! balance from an injected [`TradePricing`] and reacts to pane events
//! (switch, ok, cancel) queued on a bounded channel.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use satchel_common::{CharacterId, Color, ItemRef};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::category::{CategoryId, CategoryTable};
use crate::drop::drop_stats;
use crate::entry::Entry;
use crate::focus::SharedFocus;
use crate::input::Action;
use crate::multiselect::{InventoryMultiselector, Ledger};
use crate::preset::{default_caption, Cell, Preset, PresetContext};
use crate::render::{Align, LineSpec, UiDriver};
use crate::selector::InvletPolicy;
use crate::settings::{LayoutSettings, UiMode};
use crate::world::{Character, ItemWorld, Phase, TradeProfile};

/// Radius searched for a shopkeeper's stock.
pub const PICKUP_RANGE: i32 = 6;

const EVENT_CAPACITY: usize = 16;

/// Price and willingness rules of the trading parties.
pub trait TradePricing: Send + Sync + Debug {
    /// What `buyer` pays `seller` for `qty` units of `item`, in cents.
    fn trading_price(&self, world: &ItemWorld, buyer: CharacterId, seller: CharacterId, item: ItemRef, qty: u32)
        -> i64;

    /// Whether an NPC seller parts with the item. An empty error falls back
    /// to a generic refusal.
    fn wants_to_sell(&self, _world: &ItemWorld, _seller: &Character, _item: ItemRef, _price: i64) -> Result<(), String> {
        Ok(())
    }

    /// Whether an NPC buyer takes the item. An empty error falls back to a
    /// generic refusal.
    fn wants_to_buy(&self, _world: &ItemWorld, _buyer: &Character, _item: ItemRef, _price: i64) -> Result<(), String> {
        Ok(())
    }
}

/// Fixed unit prices keyed by item type, falling back to the item's own
/// price.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceTable {
    /// Unit price overrides in cents
    pub prices: BTreeMap<String, i64>,
}

impl PriceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the unit price of an item type.
    #[must_use]
    pub fn with_price(mut self, type_id: impl Into<String>, cents: i64) -> Self {
        self.prices.insert(type_id.into(), cents);
        self
    }

    fn unit_price(&self, world: &ItemWorld, item: ItemRef) -> i64 {
        world.get(item).map_or(0, |it| {
            self.prices.get(&it.type_id).copied().unwrap_or(it.price)
        })
    }
}

impl TradePricing for PriceTable {
    fn trading_price(&self, world: &ItemWorld, _buyer: CharacterId, _seller: CharacterId, item: ItemRef, qty: u32) -> i64 {
        self.unit_price(world, item).saturating_mul(i64::from(qty))
    }

    fn wants_to_buy(&self, world: &ItemWorld, _buyer: &Character, item: ItemRef, _price: i64) -> Result<(), String> {
        if self.unit_price(world, item) > 0 {
            Ok(())
        } else {
            Err(String::new())
        }
    }
}

/// Money in dollars and cents.
#[must_use]
pub fn format_money(cents: i64) -> String {
    format!("${:.2}", cents as f64 / 100.0)
}

/// Whether a partner accepts `balance` from the player's side.
#[must_use]
pub const fn will_accept_trade(profile: &TradeProfile, balance: i64) -> bool {
    profile.free_exchange || balance + profile.max_credit >= 0
}

/// Part of a positive balance the partner agrees to owe.
#[must_use]
pub fn owes_you(profile: &TradeProfile, balance: i64) -> i64 {
    if profile.free_exchange {
        return 0;
    }
    if balance > profile.owed && balance > profile.max_willing_to_owe {
        return profile.owed.max(profile.max_willing_to_owe);
    }
    balance
}

/// Whether `who` has room for the ledger in their containers.
#[must_use]
pub fn can_fit_items(world: &ItemWorld, who: CharacterId, ledger: &[(ItemRef, u32)]) -> bool {
    let Ok(stats) = world.carry_stats(who) else {
        return false;
    };
    let needed = ledger.iter().fold(0u32, |acc, &(item, qty)| {
        let volume = match world.get(item) {
            Some(it) if it.count_by_charges() => it.volume_ml.saturating_mul(qty),
            Some(_) => world.total_volume(item),
            None => 0,
        };
        acc.saturating_add(volume)
    });
    needed <= stats.max_volume_ml.saturating_sub(stats.volume_ml)
}

/// Which party a pane belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    /// The trading partner
    Trader,
    /// The player's side
    You,
}

impl TradeSide {
    /// Index into per-party arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Trader => 0,
            Self::You => 1,
        }
    }

    /// The other side.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Trader => Self::You,
            Self::You => Self::Trader,
        }
    }
}

/// Events a pane raises for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeEvent {
    /// Make the other pane active
    Switch,
    /// Try to close the deal
    TradeOk,
    /// Leave without trading
    TradeCancel,
}

/// Eligibility and pricing of one party's goods.
#[derive(Debug, Clone)]
pub struct TradePreset {
    you: CharacterId,
    trader: CharacterId,
    pricing: Arc<dyn TradePricing>,
    cells: Vec<Cell>,
}

impl TradePreset {
    /// Preset for `you` selling to `trader`.
    #[must_use]
    pub fn new(you: CharacterId, trader: CharacterId, pricing: Arc<dyn TradePricing>) -> Self {
        Self {
            you,
            trader,
            pricing,
            cells: vec![Cell::new("", ""), Cell::new("Unit price", "-")],
        }
    }

    fn owned(&self, world: &ItemWorld, item: ItemRef) -> bool {
        world.get(item).is_some_and(|it| match it.owner {
            Some(owner) => owner == self.you,
            None => world.holder(item) == Some(self.you),
        })
    }
}

impl Preset for TradePreset {
    fn cells(&self) -> &[Cell] {
        &self.cells
    }

    fn is_shown(&self, world: &ItemWorld, item: ItemRef) -> bool {
        let Some(it) = world.get(item) else {
            return false;
        };
        !it.flags.trade_ignore
            && self.owned(world, item)
            && it.phase == Phase::Solid
            && !it.is_frozen_liquid()
            && !(world.is_wielded_by(self.you, item) && it.flags.no_unwield)
    }

    fn get_denial(&self, ctx: &PresetContext<'_>, item: ItemRef) -> String {
        let world = ctx.world;
        let price = self.pricing.trading_price(world, self.trader, self.you, item, 1);
        let (Ok(you), Ok(trader)) = (world.character(self.you), world.character(self.trader)) else {
            return String::new();
        };

        if you.npc {
            if let Err(reason) = self.pricing.wants_to_sell(world, you, item, price) {
                return if reason.is_empty() {
                    format!("{} does not want to sell this", you.name)
                } else {
                    reason
                };
            }
        } else if trader.npc {
            if let Err(reason) = self.pricing.wants_to_buy(world, trader, item, price) {
                return if reason.is_empty() {
                    format!("{} does not want to buy this", trader.name)
                } else {
                    reason
                };
            }
        }

        if world.is_worn_by(self.you, item) {
            if let Err(reason) = world.can_takeoff(self.you, item) {
                return reason;
            }
        }
        String::new()
    }

    fn cell_content(&self, ctx: &PresetContext<'_>, entry: &Entry, index: usize) -> String {
        match index {
            0 => default_caption(ctx, entry),
            1 => entry.any_item().map_or_else(String::new, |item| {
                format_money(self.pricing.trading_price(ctx.world, self.trader, self.you, item, 1))
            }),
            _ => String::new(),
        }
    }

    fn cat_sort_compare(&self, categories: &CategoryTable, a: CategoryId, b: CategoryId) -> Ordering {
        // Equipment is rarely traded, so it goes last.
        let fudge_rank = |id: CategoryId| {
            let rank = categories.get(id).map_or(0, |c| c.sort_rank);
            if id == CategoryId::ITEMS_WORN || id == CategoryId::WEAPON_HELD {
                rank + 10_000
            } else {
                rank
            }
        };
        fudge_rank(a)
            .cmp(&fudge_rank(b))
            .then_with(|| categories.compare(a, b))
    }
}

/// The two parties of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeParties {
    /// The player's side
    pub you: CharacterId,
    /// The trading partner
    pub trader: CharacterId,
}

impl TradeParties {
    /// Character on a side.
    #[must_use]
    pub const fn get(&self, side: TradeSide) -> CharacterId {
        match side {
            TradeSide::Trader => self.trader,
            TradeSide::You => self.you,
        }
    }
}

/// What a finished session hands back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeResult {
    /// The deal was accepted
    pub traded: bool,
    /// Final balance, positive in the player's favor
    pub balance: i64,
    /// Value of what the player gives
    pub value_you: i64,
    /// Value of what the partner gives
    pub value_trader: i64,
    /// Rows the player gives
    pub items_you: Ledger,
    /// Rows the partner gives
    pub items_trader: Ledger,
}

/// Trade screen coordinating both panes.
#[derive(Debug)]
pub struct TradeSession {
    panes: [InventoryMultiselector; 2],
    parties: TradeParties,
    pricing: Arc<dyn TradePricing>,
    focus: SharedFocus,
    active: TradeSide,
    cost: i64,
    balance: i64,
    trade_values: [i64; 2],
    free_exchange: bool,
    events_tx: Sender<TradeEvent>,
    events_rx: Receiver<TradeEvent>,
    exit: bool,
    traded: bool,
}

impl TradeSession {
    /// Opens a trade. `cost` is what the player already owes for a service.
    pub fn new(
        world: &ItemWorld,
        parties: TradeParties,
        cost: i64,
        pricing: Arc<dyn TradePricing>,
        layout: LayoutSettings,
        ui_mode: UiMode,
        focus: SharedFocus,
    ) -> Self {
        let pane = |side: TradeSide, title: &str| {
            let who = parties.get(side);
            let other = parties.get(side.other());
            let preset = Arc::new(TradePreset::new(who, other, Arc::clone(&pricing)));
            let mut ms = InventoryMultiselector::new(
                world,
                who,
                preset,
                "",
                layout.clone(),
                ui_mode,
                Arc::clone(&focus),
            )
            .with_stats(drop_stats(who));
            let base = ms.selector_mut();
            base.set_title(title);
            base.set_invlet_policy(InvletPolicy::Alpha);
            ms
        };
        let mut trader_pane = pane(TradeSide::Trader, "Trader Inventory");
        let mut you_pane = pane(TradeSide::You, "Your Inventory");

        you_pane.selector_mut().add_character_items(world, parties.you);
        you_pane.selector_mut().add_nearby_items(world, 1);
        trader_pane.selector_mut().add_character_items(world, parties.trader);

        let profile = world
            .character(parties.trader)
            .map(|c| c.trade)
            .unwrap_or_default();
        if profile.shopkeeper {
            let base = trader_pane.selector_mut();
            base.set_categorize_map_items(true);
            base.add_nearby_items(world, PICKUP_RANGE);
        } else if !profile.ally {
            trader_pane.selector_mut().add_nearby_items(world, 1);
        }

        let cost = if profile.free_exchange {
            0
        } else {
            profile.owed - cost
        };
        let (events_tx, events_rx) = crossbeam_channel::bounded(EVENT_CAPACITY);
        info!(
            "Trade opened between {:?} and {:?}, starting balance {}",
            parties.you, parties.trader, cost
        );
        Self {
            panes: [trader_pane, you_pane],
            parties,
            pricing,
            focus,
            active: TradeSide::Trader,
            cost,
            balance: cost,
            trade_values: [0; 2],
            free_exchange: profile.free_exchange,
            events_tx,
            events_rx,
            exit: false,
            traded: false,
        }
    }

    /// Pane of one side.
    #[must_use]
    pub fn pane(&self, side: TradeSide) -> &InventoryMultiselector {
        &self.panes[side.index()]
    }

    /// Pane of one side, mutably.
    pub fn pane_mut(&mut self, side: TradeSide) -> &mut InventoryMultiselector {
        &mut self.panes[side.index()]
    }

    /// Side taking keyboard input.
    #[must_use]
    pub const fn active_side(&self) -> TradeSide {
        self.active
    }

    /// Running balance, positive in the player's favor.
    #[must_use]
    pub const fn balance(&self) -> i64 {
        self.balance
    }

    /// Value of one side's chosen goods.
    #[must_use]
    pub const fn trade_value(&self, side: TradeSide) -> i64 {
        self.trade_values[side.index()]
    }

    /// Queues an event for the session.
    pub fn push_event(&self, event: TradeEvent) {
        if self.events_tx.try_send(event).is_err() {
            warn!("Trade event queue full, dropping {event:?}");
        }
    }

    /// Recomputes the value of the active side's goods and the balance.
    pub fn recalc_values(&mut self, world: &ItemWorld) {
        let side = self.active;
        let seller = self.parties.get(side);
        let buyer = self.parties.get(side.other());
        let value = self.panes[side.index()]
            .to_use()
            .iter()
            .map(|&(item, qty)| self.pricing.trading_price(world, buyer, seller, item, qty))
            .sum();
        self.trade_values[side.index()] = value;
        if !self.free_exchange {
            self.balance = self.cost + self.trade_values[TradeSide::You.index()]
                - self.trade_values[TradeSide::Trader.index()];
        }
        debug!("{side:?} offers {value}, balance {}", self.balance);
    }

    /// Adds just enough of the highlighted item to close the balance. Only
    /// acts when the active side is the one behind.
    pub fn autobalance(&mut self, world: &ItemWorld) {
        let side = self.active;
        let sign: i64 = if side == TradeSide::You { -1 } else { 1 };
        if !((sign < 0 && self.balance < 0) || (sign > 0 && self.balance > 0)) {
            return;
        }
        let pane = &self.panes[side.index()];
        let Some(entry) = pane.selector().get_highlighted().filter(|e| e.is_selectable()) else {
            return;
        };
        let Some(item) = entry.any_item() else {
            return;
        };
        let (id, chosen) = (entry.id(), entry.chosen_count);
        let avail = entry.get_available_count(world).saturating_sub(chosen);
        let price = self.pricing.trading_price(
            world,
            self.parties.get(side.other()),
            self.parties.get(side),
            item,
            1,
        ) * sign;
        if price == 0 {
            return;
        }
        let num = self.balance as f64 / price as f64;
        let extra = if sign < 0 { num.ceil() } else { num.floor() };
        let extra = (extra.max(0.0) as u32).min(avail);
        debug!("Autobalance adds {extra} of {item}");
        self.panes[side.index()].toggle_entry(world, id, chosen + extra);
        self.recalc_values(world);
    }

    fn controls(&self, world: &ItemWorld) -> Vec<LineSpec> {
        let profile = world
            .character(self.parties.trader)
            .map(|c| c.trade)
            .unwrap_or_default();
        let color = if will_accept_trade(&profile, self.balance) {
            Color::Green
        } else {
            Color::Red
        };
        let cost = if self.free_exchange {
            "Exchange".to_string()
        } else if self.balance >= 0 {
            format!("Credit {}", format_money(self.balance))
        } else {
            format!("Debt {}", format_money(self.balance.abs()))
        };
        let name = world
            .character(self.parties.trader)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        let centered = |text: String, color| LineSpec {
            align: Align::Center,
            ..LineSpec::text(text, color)
        };
        vec![
            centered(cost, color),
            LineSpec::text(format!("{name} / You"), Color::White),
            centered(format!("{} to switch panes", Action::SwitchLists), Color::White),
            centered(
                format!("{} to auto balance with highlighted item", Action::Autobalance),
                Color::White,
            ),
        ]
    }

    /// Draws both panes in one frame.
    pub fn render(&mut self, world: &ItemWorld, driver: &mut dyn UiDriver) {
        let controls = self.controls(world);
        let stats = [self.panes[0].stats(world), self.panes[1].stats(world)];
        self.focus.lock().begin_frame();
        let [trader, you] = &mut self.panes;
        driver.frame(&mut |surface| {
            for line in &controls {
                surface.draw_line(line);
            }
            trader.selector_mut().draw(world, surface, stats[0].as_ref());
            you.selector_mut().draw(world, surface, stats[1].as_ref());
        });
        for pane in &mut self.panes {
            pane.selector_mut().sync_focus(world);
        }
        // Keyboard focus follows the pane the renderer focused.
        let other = self.active.other();
        let other_id = self.panes[other.index()].selector().id();
        if self.focus.lock().focused_for(other_id).is_some() {
            self.active = other;
        }
    }

    /// Input loop of the active pane; returns once an event was queued or
    /// the pointer moved.
    fn run_active_pane(&mut self, world: &mut ItemWorld, driver: &mut dyn UiDriver) {
        loop {
            self.render(world, driver);
            let input = driver.next_input();
            match input.action {
                Action::SwitchLists => {
                    self.push_event(TradeEvent::Switch);
                    return;
                }
                Action::Confirm => {
                    self.push_event(TradeEvent::TradeOk);
                    return;
                }
                Action::Quit => {
                    self.push_event(TradeEvent::TradeCancel);
                    return;
                }
                Action::Autobalance => self.autobalance(world),
                Action::MouseMove => return,
                _ => {
                    if self.panes[self.active.index()].on_input(world, driver, input) {
                        self.recalc_values(world);
                    }
                }
            }
        }
    }

    fn confirm_trade(&self, world: &ItemWorld, driver: &mut dyn UiDriver) -> bool {
        let Ok(trader) = world.character(self.parties.trader) else {
            return false;
        };
        let profile = &trader.trade;
        if !will_accept_trade(profile, self.balance) {
            if profile.max_credit == 0 {
                driver.notify("You'll need to offer me more than that.");
            } else {
                driver.notify(&format!(
                    "Sorry, I'm only willing to extend you {} in credit.",
                    format_money(profile.max_credit)
                ));
            }
            false
        } else if !profile.shopkeeper
            && !can_fit_items(world, trader.id, self.panes[TradeSide::You.index()].to_use())
        {
            driver.notify(&format!(
                "{} doesn't have the appropriate pockets to accept that.",
                trader.name
            ));
            false
        } else if owes_you(profile, self.balance) < self.balance {
            driver.confirm(&format!(
                "I'm never going to be able to pay you back for all that.  The most I'm willing to owe you is {}.\n\nContinue with trade?",
                format_money(profile.max_willing_to_owe)
            ))
        } else {
            driver.confirm("Looks like a deal!  Accept this trade?")
        }
    }

    fn process(&mut self, world: &mut ItemWorld, driver: &mut dyn UiDriver, event: TradeEvent) {
        match event {
            TradeEvent::TradeCancel => {
                self.traded = false;
                self.exit = true;
            }
            TradeEvent::TradeOk => {
                self.traded = self.confirm_trade(world, driver);
                self.exit = self.traded;
            }
            TradeEvent::Switch => {
                self.active = self.active.other();
                let pane = &mut self.panes[self.active.index()];
                let first = pane
                    .selector()
                    .columns()
                    .iter()
                    .filter(|c| c.visible())
                    .flat_map(|c| c.items())
                    .find_map(Entry::any_item);
                if let Some(item) = first {
                    pane.selector_mut().highlight(world, item, false, true);
                }
            }
        }
    }

    /// Runs the trade until it is accepted or cancelled.
    pub fn perform_trade(&mut self, world: &mut ItemWorld, driver: &mut dyn UiDriver) -> TradeResult {
        self.exit = false;
        self.traded = false;
        for pane in &mut self.panes {
            pane.selector_mut().prepare_layout(world);
        }
        while !self.exit {
            self.run_active_pane(world, driver);
            let mut had_events = false;
            while let Ok(event) = self.events_rx.try_recv() {
                had_events = true;
                self.process(world, driver, event);
            }
            if !had_events {
                self.switch_to_hovered();
            }
        }
        for pane in &self.panes {
            pane.release_focus();
        }

        if !self.traded {
            info!("Trade cancelled");
            return TradeResult::default();
        }
        info!("Trade accepted with balance {}", self.balance);
        TradeResult {
            traded: true,
            balance: self.balance,
            value_you: self.trade_value(TradeSide::You),
            value_trader: self.trade_value(TradeSide::Trader),
            items_you: self.panes[TradeSide::You.index()].to_use().to_vec(),
            items_trader: self.panes[TradeSide::Trader.index()].to_use().to_vec(),
        }
    }

    fn switch_to_hovered(&mut self) {
        for side in [TradeSide::Trader, TradeSide::You] {
            let base = self.panes[side.index()].selector();
            let on_item = base
                .hovered()
                .and_then(|(_, id)| base.entry(id))
                .is_some_and(Entry::is_item);
            if on_item {
                self.active = side;
                break;
            }
        }
    }
}
