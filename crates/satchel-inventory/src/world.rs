//! Item graph model.
//!
//! The world exclusively owns every item instance. Selectors only hold
//! [`ItemRef`] handles into the arena and re-read item data on demand.

use ahash::AHashMap;
use satchel_common::{CharacterId, Color, ItemRef, Tripoint, WorldError, WorldResult};
use serde::{Deserialize, Serialize};

use crate::category::ItemCategory;

/// Matter phase of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Solid matter
    #[default]
    Solid,
    /// Liquid (may be frozen)
    Liquid,
    /// Gas
    Gas,
}

/// Kind of pocket on a container item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PocketKind {
    /// General storage
    #[default]
    Container,
    /// Holds a single item (sheath, holster)
    Holster,
    /// Armor plate slot, part of the wearer's loadout
    Ablative,
    /// Ammunition feed; never browsed
    Magazine,
}

impl PocketKind {
    /// Returns true for pockets whose contents are shown as nested items.
    #[must_use]
    pub const fn is_standard(self) -> bool {
        !matches!(self, Self::Magazine)
    }
}

/// One pocket of a container item.
#[derive(Debug, Clone, Default)]
pub struct Pocket {
    /// Pocket kind
    pub kind: PocketKind,
    /// Contents hidden in hierarchy views
    pub collapsed: bool,
    /// Volume limit in milliliters
    pub max_volume_ml: u32,
    /// Weight limit in grams
    pub max_weight_g: u32,
    /// Longest item accepted, 0 for unlimited
    pub max_length_mm: u32,
    /// Rigid pockets do not grow with their contents
    pub rigid: bool,
    /// Can hold liquids
    pub watertight: bool,
    /// Items stored directly in this pocket
    pub contents: Vec<ItemRef>,
}

impl Pocket {
    /// Creates an empty pocket.
    #[must_use]
    pub fn new(kind: PocketKind, max_volume_ml: u32, max_weight_g: u32) -> Self {
        Self {
            kind,
            max_volume_ml,
            max_weight_g,
            ..Self::default()
        }
    }

    /// Sets the length limit.
    #[must_use]
    pub fn with_max_length(mut self, max_length_mm: u32) -> Self {
        self.max_length_mm = max_length_mm;
        self
    }

    /// Marks the pocket rigid.
    #[must_use]
    pub fn rigid(mut self) -> Self {
        self.rigid = true;
        self
    }

    /// Marks the pocket watertight.
    #[must_use]
    pub fn watertight(mut self) -> Self {
        self.watertight = true;
        self
    }

    /// Returns true if this is a holster already holding something.
    #[must_use]
    pub fn holster_full(&self) -> bool {
        self.kind == PocketKind::Holster && !self.contents.is_empty()
    }
}

/// Behaviour flags of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemFlags {
    /// Contents cannot be taken out
    pub no_unload: bool,
    /// Frozen liquid already broken into pieces
    pub shredded: bool,
    /// Cannot be unwielded once held
    pub no_unwield: bool,
    /// Part of the body (bionic, mutation)
    pub integrated: bool,
    /// Feeds a bionic power source
    pub fuel_source: bool,
    /// Excluded from trading
    pub trade_ignore: bool,
    /// Can be worn
    pub wearable: bool,
}

/// Where an item physically is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Location {
    /// Held in a character's hands
    Wielded(CharacterId),
    /// Worn by a character
    Worn(CharacterId),
    /// Lying on a map tile
    Map(Tripoint),
    /// In the cargo space of a vehicle on a tile
    Vehicle(Tripoint),
    /// Inside a pocket of another item
    Contained {
        /// Container item
        parent: ItemRef,
        /// Pocket index on the container
        pocket: usize,
    },
    /// Not placed yet
    #[default]
    Nowhere,
}

/// Coarse classification of a [`Location`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    /// Wielded or worn
    Character,
    /// On the ground
    Map,
    /// Vehicle cargo
    Vehicle,
    /// Inside another item
    Container,
    /// Nowhere
    Invalid,
}

impl Location {
    /// Returns the location kind.
    #[must_use]
    pub const fn kind(self) -> LocationKind {
        match self {
            Self::Wielded(_) | Self::Worn(_) => LocationKind::Character,
            Self::Map(_) => LocationKind::Map,
            Self::Vehicle(_) => LocationKind::Vehicle,
            Self::Contained { .. } => LocationKind::Container,
            Self::Nowhere => LocationKind::Invalid,
        }
    }
}

/// One item instance.
#[derive(Debug, Clone)]
pub struct Item {
    /// Item type identifier; items of one type collate together
    pub type_id: String,
    /// Display name
    pub name: String,
    /// Natural category id
    pub category: String,
    /// Display color
    pub color: Color,
    /// Stack size for items counted by charges
    pub charges: Option<u32>,
    /// Favorite flag
    pub favorite: bool,
    /// User-assigned inventory letter
    pub invlet: Option<char>,
    /// Matter phase
    pub phase: Phase,
    /// Frozen (liquids only)
    pub frozen: bool,
    /// Behaviour flags
    pub flags: ItemFlags,
    /// Relic identity; relics only collate with the same relic
    pub relic: Option<String>,
    /// Weight per unit in grams
    pub weight_g: u32,
    /// Volume per unit in milliliters
    pub volume_ml: u32,
    /// Length in millimeters
    pub length_mm: u32,
    /// Base value per unit in cents
    pub price: i64,
    /// Owning character, if any
    pub owner: Option<CharacterId>,
    /// Pockets
    pub pockets: Vec<Pocket>,
    location: Location,
}

impl Item {
    /// Creates a plain solid item.
    #[must_use]
    pub fn new(type_id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            name: name.into(),
            category: category.into(),
            color: Color::default(),
            charges: None,
            favorite: false,
            invlet: None,
            phase: Phase::Solid,
            frozen: false,
            flags: ItemFlags::default(),
            relic: None,
            weight_g: 0,
            volume_ml: 0,
            length_mm: 0,
            price: 0,
            owner: None,
            pockets: Vec::new(),
            location: Location::Nowhere,
        }
    }

    /// Makes the item counted by charges.
    #[must_use]
    pub fn with_charges(mut self, charges: u32) -> Self {
        self.charges = Some(charges);
        self
    }

    /// Sets weight and volume per unit.
    #[must_use]
    pub fn with_size(mut self, weight_g: u32, volume_ml: u32) -> Self {
        self.weight_g = weight_g;
        self.volume_ml = volume_ml;
        self
    }

    /// Sets the length.
    #[must_use]
    pub fn with_length(mut self, length_mm: u32) -> Self {
        self.length_mm = length_mm;
        self
    }

    /// Sets the base price per unit.
    #[must_use]
    pub fn with_price(mut self, price: i64) -> Self {
        self.price = price;
        self
    }

    /// Sets the display color.
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Adds a pocket.
    #[must_use]
    pub fn with_pocket(mut self, pocket: Pocket) -> Self {
        self.pockets.push(pocket);
        self
    }

    /// Sets the flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ItemFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the matter phase and frozen state.
    #[must_use]
    pub fn with_phase(mut self, phase: Phase, frozen: bool) -> Self {
        self.phase = phase;
        self.frozen = frozen;
        self
    }

    /// Sets the favorite flag.
    #[must_use]
    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.favorite = favorite;
        self
    }

    /// Sets the user-assigned inventory letter.
    #[must_use]
    pub fn with_invlet(mut self, invlet: char) -> Self {
        self.invlet = Some(invlet);
        self
    }

    /// Sets the relic identity.
    #[must_use]
    pub fn with_relic(mut self, relic: impl Into<String>) -> Self {
        self.relic = Some(relic.into());
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn with_owner(mut self, owner: CharacterId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Where the item is.
    #[must_use]
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Number of units: charges, or 1 for discrete items.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.charges.unwrap_or(1)
    }

    /// Returns true when the item is counted by charges.
    #[must_use]
    pub const fn count_by_charges(&self) -> bool {
        self.charges.is_some()
    }

    /// Display name including charges and the favorite marker.
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut name = match self.charges {
            Some(charges) => format!("{} ({charges})", self.name),
            None => self.name.clone(),
        };
        if self.favorite {
            name.push_str(" *");
        }
        name
    }

    /// Has at least one general storage pocket.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.pockets
            .iter()
            .any(|p| matches!(p.kind, PocketKind::Container | PocketKind::Holster | PocketKind::Ablative))
    }

    /// Has at least one ablative pocket.
    #[must_use]
    pub fn is_ablative(&self) -> bool {
        self.pockets.iter().any(|p| p.kind == PocketKind::Ablative)
    }

    /// Liquid in frozen state.
    #[must_use]
    pub fn is_frozen_liquid(&self) -> bool {
        self.phase == Phase::Liquid && self.frozen
    }

    /// Any standard pocket is collapsed.
    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        self.pockets
            .iter()
            .any(|p| p.kind.is_standard() && p.collapsed)
    }

    /// Has a watertight storage pocket.
    #[must_use]
    pub fn is_watertight_container(&self) -> bool {
        self.pockets
            .iter()
            .any(|p| p.kind == PocketKind::Container && p.watertight)
    }

    /// Every pocket is rigid.
    #[must_use]
    pub fn all_pockets_rigid(&self) -> bool {
        self.pockets.iter().all(|p| p.rigid)
    }

    /// Same relic identity (both none counts as same).
    #[must_use]
    pub fn is_same_relic(&self, other: &Self) -> bool {
        self.relic == other.relic
    }
}

/// Trading attitudes of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeProfile {
    /// Runs a shop; skips the pocket-fit check
    pub shopkeeper: bool,
    /// Exchanges items without any balance
    pub free_exchange: bool,
    /// Allied with the player; accepts any balance
    pub ally: bool,
    /// Money the character currently owes the player
    pub owed: i64,
    /// Credit the character will extend to the player
    pub max_credit: i64,
    /// Debt the character is willing to carry towards the player
    pub max_willing_to_owe: i64,
}

/// A player or NPC.
#[derive(Debug, Clone)]
pub struct Character {
    /// Identifier
    pub id: CharacterId,
    /// Display name
    pub name: String,
    /// Tile the character stands on
    pub position: Tripoint,
    /// Item in hands
    pub wielded: Option<ItemRef>,
    /// Worn items, outermost last
    pub worn: Vec<ItemRef>,
    /// Carry weight limit in grams
    pub max_weight_g: u32,
    /// Owns a tool able to crush frozen liquids
    pub can_crush_frozen: bool,
    /// Non-player character
    pub npc: bool,
    /// Trading attitudes
    pub trade: TradeProfile,
}

impl Character {
    /// Creates a character with nothing equipped.
    #[must_use]
    pub fn new(id: CharacterId, name: impl Into<String>, position: Tripoint) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            wielded: None,
            worn: Vec::new(),
            max_weight_g: 50_000,
            can_crush_frozen: false,
            npc: id != CharacterId::PLAYER,
            trade: TradeProfile::default(),
        }
    }
}

/// Cargo space of a vehicle part.
#[derive(Debug, Clone, Default)]
pub struct VehicleCargo {
    /// Part name
    pub name: String,
    /// Items in the cargo space
    pub items: Vec<ItemRef>,
}

/// One map tile.
#[derive(Debug, Clone)]
pub struct Tile {
    /// Terrain name
    pub name: String,
    /// Reachable from the character's position
    pub accessible: bool,
    /// Items on the ground
    pub items: Vec<ItemRef>,
    /// Vehicle cargo on this tile
    pub vehicle: Option<VehicleCargo>,
}

impl Tile {
    /// Creates an accessible empty tile.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accessible: true,
            items: Vec::new(),
            vehicle: None,
        }
    }
}

/// Carried weight/volume/holster aggregates for the stats header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CarryStats {
    /// Carried weight in grams
    pub weight_g: u32,
    /// Weight limit in grams
    pub max_weight_g: u32,
    /// Stored volume in milliliters
    pub volume_ml: u32,
    /// Storage volume limit
    pub max_volume_ml: u32,
    /// Largest free space of a single pocket
    pub largest_free_volume_ml: u32,
    /// Longest item any pocket accepts
    pub longest_length_mm: u32,
    /// Free holster volume
    pub free_holster_volume_ml: u32,
    /// Holsters holding something
    pub used_holsters: u32,
    /// All holsters
    pub total_holsters: u32,
}

/// The item graph.
#[derive(Debug, Default)]
pub struct ItemWorld {
    items: Vec<Item>,
    characters: Vec<Character>,
    tiles: AHashMap<Tripoint, Tile>,
    categories: Vec<ItemCategory>,
}

impl ItemWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a character. Replaces any character with the same id.
    pub fn add_character(&mut self, character: Character) -> CharacterId {
        let id = character.id;
        self.characters.retain(|c| c.id != id);
        self.characters.push(character);
        id
    }

    /// Returns a character.
    pub fn character(&self, id: CharacterId) -> WorldResult<&Character> {
        self.characters
            .iter()
            .find(|c| c.id == id)
            .ok_or(WorldError::CharacterNotFound(id))
    }

    /// Returns a character mutably.
    pub fn character_mut(&mut self, id: CharacterId) -> WorldResult<&mut Character> {
        self.characters
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(WorldError::CharacterNotFound(id))
    }

    /// Iterates over all characters.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.iter()
    }

    /// Registers or replaces a tile.
    pub fn add_tile(&mut self, pos: Tripoint, tile: Tile) {
        self.tiles.insert(pos, tile);
    }

    /// Returns a tile.
    #[must_use]
    pub fn tile(&self, pos: Tripoint) -> Option<&Tile> {
        self.tiles.get(&pos)
    }

    /// Registers a category definition shipped with the world.
    pub fn add_category(&mut self, category: ItemCategory) {
        self.categories.push(category);
    }

    /// Category definitions shipped with the world.
    #[must_use]
    pub fn categories(&self) -> &[ItemCategory] {
        &self.categories
    }

    /// Number of items ever spawned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no item was spawned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Places a new item and returns its handle.
    pub fn spawn(&mut self, mut item: Item, at: Location) -> WorldResult<ItemRef> {
        let item_ref = ItemRef::new(self.items.len() as u32);
        match at {
            Location::Wielded(id) => {
                let ch = self.character_mut(id)?;
                if ch.wielded.is_some() {
                    return Err(WorldError::InvalidData(format!(
                        "{} already wields an item",
                        ch.name
                    )));
                }
                ch.wielded = Some(item_ref);
            }
            Location::Worn(id) => self.character_mut(id)?.worn.push(item_ref),
            Location::Map(pos) => self
                .tiles
                .entry(pos)
                .or_insert_with(|| Tile::new("ground"))
                .items
                .push(item_ref),
            Location::Vehicle(pos) => {
                let cargo = self
                    .tiles
                    .get_mut(&pos)
                    .and_then(|t| t.vehicle.as_mut())
                    .ok_or_else(|| WorldError::InvalidData(format!("no vehicle cargo at {pos}")))?;
                cargo.items.push(item_ref);
            }
            Location::Contained { parent, pocket } => {
                let container = self
                    .items
                    .get_mut(parent.index())
                    .ok_or(WorldError::ItemNotFound(parent))?;
                container
                    .pockets
                    .get_mut(pocket)
                    .ok_or(WorldError::PocketNotFound {
                        item: parent,
                        pocket,
                    })?
                    .contents
                    .push(item_ref);
            }
            Location::Nowhere => {
                return Err(WorldError::InvalidData("cannot spawn nowhere".to_string()));
            }
        }
        item.location = at;
        self.items.push(item);
        Ok(item_ref)
    }

    /// Returns an item.
    pub fn item(&self, item: ItemRef) -> WorldResult<&Item> {
        self.items
            .get(item.index())
            .ok_or(WorldError::ItemNotFound(item))
    }

    /// Returns an item if the handle resolves.
    #[must_use]
    pub fn get(&self, item: ItemRef) -> Option<&Item> {
        self.items.get(item.index())
    }

    /// Returns the containing item.
    #[must_use]
    pub fn parent(&self, item: ItemRef) -> Option<ItemRef> {
        match self.get(item)?.location {
            Location::Contained { parent, .. } => Some(parent),
            _ => None,
        }
    }

    /// Returns the pocket holding the item.
    #[must_use]
    pub fn parent_pocket(&self, item: ItemRef) -> Option<&Pocket> {
        match self.get(item)?.location {
            Location::Contained { parent, pocket } => self.get(parent)?.pockets.get(pocket),
            _ => None,
        }
    }

    /// Top-level contents of the standard pockets.
    #[must_use]
    pub fn contents(&self, item: ItemRef) -> Vec<ItemRef> {
        self.get(item)
            .map(|it| {
                it.pockets
                    .iter()
                    .filter(|p| p.kind.is_standard())
                    .flat_map(|p| p.contents.iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All contents of the standard pockets, depth first.
    #[must_use]
    pub fn all_contents(&self, item: ItemRef) -> Vec<ItemRef> {
        let mut out = Vec::new();
        let mut stack = self.contents(item);
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut children = self.contents(next);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// True if `item` sits somewhere inside `container`.
    #[must_use]
    pub fn eventually_contains(&self, container: ItemRef, item: ItemRef) -> bool {
        let mut cur = self.parent(item);
        while let Some(p) = cur {
            if p == container {
                return true;
            }
            cur = self.parent(p);
        }
        false
    }

    /// Outermost container of the item (the item itself when top level).
    #[must_use]
    pub fn root(&self, item: ItemRef) -> ItemRef {
        let mut cur = item;
        while let Some(p) = self.parent(cur) {
            cur = p;
        }
        cur
    }

    /// Character carrying the item, directly or in a container.
    #[must_use]
    pub fn holder(&self, item: ItemRef) -> Option<CharacterId> {
        match self.get(self.root(item))?.location {
            Location::Wielded(id) | Location::Worn(id) => Some(id),
            _ => None,
        }
    }

    /// Tile position of the item.
    #[must_use]
    pub fn position(&self, item: ItemRef) -> Tripoint {
        match self.get(self.root(item)).map(Item::location) {
            Some(Location::Map(pos) | Location::Vehicle(pos)) => pos,
            Some(Location::Wielded(id) | Location::Worn(id)) => self
                .character(id)
                .map(|c| c.position)
                .unwrap_or_default(),
            _ => Tripoint::default(),
        }
    }

    /// Short description of where a top-level item is.
    #[must_use]
    pub fn describe_location(&self, item: ItemRef) -> String {
        let root = self.root(item);
        match self.get(root).map(Item::location) {
            Some(Location::Map(pos)) => self
                .tile(pos)
                .map(|t| t.name.clone())
                .unwrap_or_default(),
            Some(Location::Vehicle(pos)) => self
                .tile(pos)
                .and_then(|t| t.vehicle.as_ref())
                .map(|v| v.name.clone())
                .unwrap_or_default(),
            Some(Location::Wielded(id) | Location::Worn(id)) => self
                .character(id)
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            _ => String::new(),
        }
    }

    /// The item is in `who`'s hands.
    #[must_use]
    pub fn is_wielded_by(&self, who: CharacterId, item: ItemRef) -> bool {
        self.get(item)
            .is_some_and(|it| it.location == Location::Wielded(who))
    }

    /// The item is worn by `who` (top level only).
    #[must_use]
    pub fn is_worn_by(&self, who: CharacterId, item: ItemRef) -> bool {
        self.get(item)
            .is_some_and(|it| it.location == Location::Worn(who))
    }

    /// The item is worn by anyone.
    #[must_use]
    pub fn is_worn(&self, item: ItemRef) -> bool {
        self.get(item)
            .is_some_and(|it| matches!(it.location, Location::Worn(_)))
    }

    /// `who` carries the item somewhere on their person.
    #[must_use]
    pub fn possesses(&self, who: CharacterId, item: ItemRef) -> bool {
        self.holder(item) == Some(who)
    }

    /// The child sits in an ablative pocket of a worn container.
    #[must_use]
    pub fn is_worn_ablative(&self, container: ItemRef, child: ItemRef) -> bool {
        let Some(it) = self.get(container) else {
            return false;
        };
        it.is_ablative()
            && self.is_worn(container)
            && self
                .parent_pocket(child)
                .is_some_and(|p| p.kind == PocketKind::Ablative)
    }

    /// Sets the favorite flag.
    pub fn set_favorite(&mut self, item: ItemRef, favorite: bool) {
        if let Some(it) = self.items.get_mut(item.index()) {
            it.favorite = favorite;
        }
    }

    /// Collapses or expands every standard pocket. Returns true if the item
    /// has any.
    pub fn set_collapsed(&mut self, item: ItemRef, collapsed: bool) -> bool {
        let Some(it) = self.items.get_mut(item.index()) else {
            return false;
        };
        let mut any = false;
        for pocket in it.pockets.iter_mut().filter(|p| p.kind.is_standard()) {
            pocket.collapsed = collapsed;
            any = true;
        }
        any
    }

    /// True if the two items would be shown as one stack.
    #[must_use]
    pub fn displays_stacked_with(&self, a: ItemRef, b: ItemRef) -> bool {
        let (Some(x), Some(y)) = (self.get(a), self.get(b)) else {
            return false;
        };
        x.type_id == y.type_id
            && x.name == y.name
            && x.charges == y.charges
            && x.favorite == y.favorite
            && x.frozen == y.frozen
            && x.owner == y.owner
            && x.is_same_relic(y)
            && self.contents(a).is_empty()
            && self.contents(b).is_empty()
    }

    /// Weight of the item and everything inside it.
    #[must_use]
    pub fn total_weight(&self, item: ItemRef) -> u32 {
        let Some(it) = self.get(item) else {
            return 0;
        };
        let own = it.weight_g.saturating_mul(it.count());
        self.contents(item)
            .into_iter()
            .fold(own, |acc, c| acc.saturating_add(self.total_weight(c)))
    }

    /// Volume of the item, grown by the contents of soft pockets.
    #[must_use]
    pub fn total_volume(&self, item: ItemRef) -> u32 {
        let Some(it) = self.get(item) else {
            return 0;
        };
        let own = it.volume_ml.saturating_mul(it.count());
        it.pockets
            .iter()
            .filter(|p| p.kind.is_standard() && !p.rigid)
            .flat_map(|p| p.contents.iter())
            .fold(own, |acc, c| acc.saturating_add(self.total_volume(*c)))
    }

    fn pocket_used_volume(&self, pocket: &Pocket) -> u32 {
        pocket.contents.iter().map(|c| self.total_volume(*c)).sum()
    }

    fn pocket_used_weight(&self, pocket: &Pocket) -> u32 {
        pocket.contents.iter().map(|c| self.total_weight(*c)).sum()
    }

    /// Checks whether one unit of `item` fits into the given pocket.
    pub fn can_contain(&self, container: ItemRef, pocket: usize, item: ItemRef) -> Result<(), String> {
        let holder = self.item(container).map_err(|e| e.to_string())?;
        let p = holder
            .pockets
            .get(pocket)
            .ok_or_else(|| format!("{} has no such pocket", holder.name))?;
        let it = self.item(item).map_err(|e| e.to_string())?;
        if !p.kind.is_standard() {
            return Err(format!("{} can't go in a magazine", it.name));
        }
        if it.phase == Phase::Liquid && !it.frozen && !p.watertight {
            return Err(format!("{} would spill", it.name));
        }
        if p.holster_full() {
            return Err("holster is full".to_string());
        }
        if p.max_length_mm > 0 && it.length_mm > p.max_length_mm {
            return Err(format!("{} is too long", it.name));
        }
        let free_volume = p.max_volume_ml.saturating_sub(self.pocket_used_volume(p));
        if it.volume_ml > free_volume {
            return Err(format!("{} is too big", it.name));
        }
        let free_weight = p.max_weight_g.saturating_sub(self.pocket_used_weight(p));
        if it.weight_g > free_weight {
            return Err(format!("{} is too heavy", it.name));
        }
        Ok(())
    }

    /// Whether any pocket of `container` accepts one unit of `item`.
    #[must_use]
    pub fn container_accepts(&self, container: ItemRef, item: ItemRef) -> bool {
        self.get(container).is_some_and(|c| {
            (0..c.pockets.len()).any(|idx| self.can_contain(container, idx, item).is_ok())
        })
    }

    /// Carry aggregates for a character.
    pub fn carry_stats(&self, who: CharacterId) -> WorldResult<CarryStats> {
        self.carry_stats_excluding(who, &[])
    }

    /// Carry aggregates with some (item, quantity) rows taken away.
    pub fn carry_stats_excluding(
        &self,
        who: CharacterId,
        removed: &[(ItemRef, u32)],
    ) -> WorldResult<CarryStats> {
        let ch = self.character(who)?;
        let mut stats = CarryStats {
            max_weight_g: ch.max_weight_g,
            ..CarryStats::default()
        };
        let removed_whole = |r: ItemRef| removed.iter().any(|(x, _)| *x == r);

        for top in ch.wielded.iter().chain(ch.worn.iter()).copied() {
            stats.weight_g = stats.weight_g.saturating_add(self.total_weight(top));
            let Some(it) = self.get(top) else { continue };
            if removed_whole(top) {
                continue;
            }
            for pocket in &it.pockets {
                match pocket.kind {
                    PocketKind::Container => {
                        let used = self.pocket_used_volume(pocket);
                        stats.volume_ml = stats.volume_ml.saturating_add(used);
                        stats.max_volume_ml = stats.max_volume_ml.saturating_add(pocket.max_volume_ml);
                        stats.largest_free_volume_ml = stats
                            .largest_free_volume_ml
                            .max(pocket.max_volume_ml.saturating_sub(used));
                        stats.longest_length_mm = stats.longest_length_mm.max(pocket.max_length_mm);
                    }
                    PocketKind::Holster => {
                        stats.total_holsters += 1;
                        if pocket.contents.is_empty() {
                            stats.free_holster_volume_ml =
                                stats.free_holster_volume_ml.saturating_add(pocket.max_volume_ml);
                        } else {
                            stats.used_holsters += 1;
                        }
                    }
                    PocketKind::Ablative | PocketKind::Magazine => {}
                }
            }
        }

        for &(item, qty) in removed {
            if self.holder(item) != Some(who) {
                continue;
            }
            let Some(it) = self.get(item) else { continue };
            let weight = if it.count_by_charges() {
                it.weight_g.saturating_mul(qty)
            } else {
                self.total_weight(item)
            };
            stats.weight_g = stats.weight_g.saturating_sub(weight);
            if self.parent(item).is_some() {
                let volume = if it.count_by_charges() {
                    it.volume_ml.saturating_mul(qty)
                } else {
                    self.total_volume(item)
                };
                stats.volume_ml = stats.volume_ml.saturating_sub(volume);
            }
        }
        Ok(stats)
    }

    /// Capacity aggregates of a single container item.
    #[must_use]
    pub fn container_stats(&self, container: ItemRef) -> ContainerStats {
        let mut stats = ContainerStats::default();
        let Some(it) = self.get(container) else {
            return stats;
        };
        for pocket in &it.pockets {
            match pocket.kind {
                PocketKind::Container | PocketKind::Ablative => {
                    let used = self.pocket_used_volume(pocket);
                    stats.contained_volume_ml += used;
                    stats.contained_weight_g += self.pocket_used_weight(pocket);
                    stats.volume_capacity_ml += pocket.max_volume_ml;
                    stats.weight_capacity_g += pocket.max_weight_g;
                    stats.max_containable_length_mm =
                        stats.max_containable_length_mm.max(pocket.max_length_mm);
                    stats.max_containable_volume_ml = stats
                        .max_containable_volume_ml
                        .max(pocket.max_volume_ml.saturating_sub(used));
                }
                PocketKind::Holster => {
                    stats.total_holsters += 1;
                    stats.holster_volume_ml += pocket.max_volume_ml;
                    if !pocket.contents.is_empty() {
                        stats.used_holsters += 1;
                        stats.used_holster_volume_ml += self.pocket_used_volume(pocket);
                        stats.used_holster_weight_g += self.pocket_used_weight(pocket);
                    }
                }
                PocketKind::Magazine => {}
            }
        }
        stats
    }

    /// Checks whether `who` can wield the item.
    pub fn can_wield(&self, who: CharacterId, item: ItemRef) -> Result<(), String> {
        let it = self.item(item).map_err(|e| e.to_string())?;
        if it.flags.integrated {
            return Err(format!("You can't wield the {}.", it.name));
        }
        if self.is_wielded_by(who, item) {
            return Err(format!("You are already wielding the {}.", it.name));
        }
        Ok(())
    }

    /// Checks whether `who` can wear the item.
    pub fn can_wear(&self, who: CharacterId, item: ItemRef) -> Result<(), String> {
        let it = self.item(item).map_err(|e| e.to_string())?;
        if !it.flags.wearable || self.is_worn_by(who, item) {
            return Err(format!("You can't wear the {}.", it.name));
        }
        Ok(())
    }

    /// Checks whether `who` can take the worn item off.
    pub fn can_takeoff(&self, who: CharacterId, item: ItemRef) -> Result<(), String> {
        let it = self.item(item).map_err(|e| e.to_string())?;
        if !self.is_worn_by(who, item) {
            return Err(format!("You are not wearing the {}.", it.name));
        }
        if it.flags.integrated {
            return Err(format!("You can't take off your {}.", it.name));
        }
        Ok(())
    }
}

/// Capacity aggregates of one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContainerStats {
    /// Weight of the contents
    pub contained_weight_g: u32,
    /// Weight limit
    pub weight_capacity_g: u32,
    /// Volume of the contents
    pub contained_volume_ml: u32,
    /// Volume limit
    pub volume_capacity_ml: u32,
    /// Longest item any pocket accepts
    pub max_containable_length_mm: u32,
    /// Largest free space of a single pocket
    pub max_containable_volume_ml: u32,
    /// Volume of all holsters
    pub holster_volume_ml: u32,
    /// Volume of holstered items
    pub used_holster_volume_ml: u32,
    /// Weight of holstered items
    pub used_holster_weight_g: u32,
    /// Holsters holding something
    pub used_holsters: u32,
    /// All holsters
    pub total_holsters: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_backpack() -> (ItemWorld, ItemRef, ItemRef) {
        let mut world = ItemWorld::new();
        world.add_character(Character::new(CharacterId::PLAYER, "You", Tripoint::default()));
        let pack = world
            .spawn(
                Item::new("backpack", "backpack", "clothing")
                    .with_size(600, 2000)
                    .with_pocket(Pocket::new(PocketKind::Container, 15_000, 30_000)),
                Location::Worn(CharacterId::PLAYER),
            )
            .expect("spawn pack");
        let coin = world
            .spawn(
                Item::new("coin", "coin", "other").with_size(5, 1),
                Location::Contained {
                    parent: pack,
                    pocket: 0,
                },
            )
            .expect("spawn coin");
        (world, pack, coin)
    }

    #[test]
    fn test_spawn_links_parent() {
        let (world, pack, coin) = world_with_backpack();
        assert_eq!(world.parent(coin), Some(pack));
        assert_eq!(world.contents(pack), vec![coin]);
        assert!(world.eventually_contains(pack, coin));
        assert_eq!(world.holder(coin), Some(CharacterId::PLAYER));
        assert!(world.is_worn_by(CharacterId::PLAYER, pack));
    }

    #[test]
    fn test_spawn_into_missing_pocket_fails() {
        let (mut world, pack, _) = world_with_backpack();
        let err = world.spawn(
            Item::new("coin", "coin", "other"),
            Location::Contained {
                parent: pack,
                pocket: 3,
            },
        );
        assert!(matches!(err, Err(WorldError::PocketNotFound { .. })));
    }

    #[test]
    fn test_displays_stacked_with() {
        let (mut world, pack, coin) = world_with_backpack();
        let coin2 = world
            .spawn(
                Item::new("coin", "coin", "other").with_size(5, 1),
                Location::Contained {
                    parent: pack,
                    pocket: 0,
                },
            )
            .expect("spawn");
        assert!(world.displays_stacked_with(coin, coin2));
        world.set_favorite(coin2, true);
        assert!(!world.displays_stacked_with(coin, coin2));
    }

    #[test]
    fn test_collapse_round_trip() {
        let (mut world, pack, coin) = world_with_backpack();
        assert!(world.set_collapsed(pack, true));
        assert!(world.get(pack).is_some_and(Item::is_collapsed));
        assert!(!world.set_collapsed(coin, true));
    }

    #[test]
    fn test_carry_stats_excluding() {
        let (world, _, coin) = world_with_backpack();
        let full = world.carry_stats(CharacterId::PLAYER).expect("stats");
        assert_eq!(full.weight_g, 605);
        assert_eq!(full.volume_ml, 1);
        let less = world
            .carry_stats_excluding(CharacterId::PLAYER, &[(coin, 1)])
            .expect("stats");
        assert_eq!(less.weight_g, 600);
        assert_eq!(less.volume_ml, 0);
    }

    #[test]
    fn test_can_contain_rejects_spilling_liquid() {
        let (mut world, pack, _) = world_with_backpack();
        let water = world
            .spawn(
                Item::new("water", "water", "drink")
                    .with_phase(Phase::Liquid, false)
                    .with_charges(2),
                Location::Map(Tripoint::new(1, 0, 0)),
            )
            .expect("spawn");
        assert!(world.can_contain(pack, 0, water).is_err());
        assert!(!world.container_accepts(pack, water));
    }
}
