//! Serializable description of an item world.
//!
//! Worlds are written in RON: characters carry their wielded and worn items
//! as nested specs, tiles carry ground and vehicle items, and every item spec
//! carries its pockets' contents.

use std::fs;
use std::path::Path;

use satchel_common::{
    CharacterId, Color, ItemRef, SatchelError, SatchelResult, SchemaVersion, Tripoint, WorldResult,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::category::ItemCategory;
use crate::world::{
    Character, Item, ItemFlags, ItemWorld, Location, Phase, Pocket, PocketKind, Tile, TradeProfile, VehicleCargo,
};

/// Root of a world file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSpec {
    /// Format version
    pub version: SchemaVersion,
    /// Extra category definitions
    pub categories: Vec<ItemCategory>,
    /// Characters with their equipment
    pub characters: Vec<CharacterSpec>,
    /// Tiles with their items
    pub tiles: Vec<TileSpec>,
}

impl Default for WorldSpec {
    fn default() -> Self {
        Self {
            version: SchemaVersion::WORLD_FILE,
            categories: Vec::new(),
            characters: Vec::new(),
            tiles: Vec::new(),
        }
    }
}

/// A character and what it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterSpec {
    /// Character id; 0 is the player
    pub id: u32,
    /// Display name
    pub name: String,
    /// Standing position
    pub position: Tripoint,
    /// Carry weight limit in grams
    pub max_weight_g: u32,
    /// Can break frozen liquids loose
    pub can_crush_frozen: bool,
    /// Trading attitudes
    pub trade: TradeProfile,
    /// Item in hands
    pub wielded: Option<ItemSpec>,
    /// Worn items, outermost last
    pub worn: Vec<ItemSpec>,
}

impl Default for CharacterSpec {
    fn default() -> Self {
        Self {
            id: 0,
            name: "You".to_string(),
            position: Tripoint::default(),
            max_weight_g: 50_000,
            can_crush_frozen: false,
            trade: TradeProfile::default(),
            wielded: None,
            worn: Vec::new(),
        }
    }
}

/// Vehicle cargo on a tile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSpec {
    /// Part name
    pub name: String,
    /// Cargo
    pub items: Vec<ItemSpec>,
}

/// A map tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileSpec {
    /// Tile position
    pub position: Tripoint,
    /// Terrain name
    pub name: String,
    /// Reachable without obstacles
    pub accessible: bool,
    /// Items on the ground
    pub items: Vec<ItemSpec>,
    /// Optional vehicle cargo
    pub vehicle: Option<VehicleSpec>,
}

impl Default for TileSpec {
    fn default() -> Self {
        Self {
            position: Tripoint::default(),
            name: "ground".to_string(),
            accessible: true,
            items: Vec::new(),
            vehicle: None,
        }
    }
}

/// One pocket and its contents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PocketSpec {
    /// Pocket kind
    pub kind: PocketKind,
    /// Volume limit
    pub max_volume_ml: u32,
    /// Weight limit
    pub max_weight_g: u32,
    /// Length limit, 0 for none
    pub max_length_mm: u32,
    /// Does not grow with contents
    pub rigid: bool,
    /// Holds liquids
    pub watertight: bool,
    /// Folded in hierarchy views
    pub collapsed: bool,
    /// Items inside
    pub contents: Vec<ItemSpec>,
}

/// One item, spawned `count` times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemSpec {
    /// Type id
    pub type_id: String,
    /// Display name, defaults to the type id
    pub name: Option<String>,
    /// Natural category
    pub category: String,
    /// Display color
    pub color: Color,
    /// Number of copies to spawn
    pub count: u32,
    /// Charges for items counted by charges
    pub charges: Option<u32>,
    /// Favorite flag
    pub favorite: bool,
    /// User-assigned letter
    pub invlet: Option<char>,
    /// Matter phase
    pub phase: Phase,
    /// Frozen liquid
    pub frozen: bool,
    /// Behaviour flags
    pub flags: ItemFlags,
    /// Relic identity
    pub relic: Option<String>,
    /// Weight per unit
    pub weight_g: u32,
    /// Volume per unit
    pub volume_ml: u32,
    /// Length
    pub length_mm: u32,
    /// Value per unit in cents
    pub price: i64,
    /// Owning character id
    pub owner: Option<u32>,
    /// Pockets with contents
    pub pockets: Vec<PocketSpec>,
}

impl Default for ItemSpec {
    fn default() -> Self {
        Self {
            type_id: String::new(),
            name: None,
            category: "other".to_string(),
            color: Color::default(),
            count: 1,
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
        }
    }
}

impl ItemSpec {
    fn to_item(&self) -> Item {
        let mut item = Item::new(
            self.type_id.clone(),
            self.name.clone().unwrap_or_else(|| self.type_id.clone()),
            self.category.clone(),
        );
        item.color = self.color;
        item.charges = self.charges;
        item.favorite = self.favorite;
        item.invlet = self.invlet;
        item.phase = self.phase;
        item.frozen = self.frozen;
        item.flags = self.flags;
        item.relic.clone_from(&self.relic);
        item.weight_g = self.weight_g;
        item.volume_ml = self.volume_ml;
        item.length_mm = self.length_mm;
        item.price = self.price;
        item.owner = self.owner.map(CharacterId::new);
        item.pockets = self
            .pockets
            .iter()
            .map(|p| Pocket {
                kind: p.kind,
                collapsed: p.collapsed,
                max_volume_ml: p.max_volume_ml,
                max_weight_g: p.max_weight_g,
                max_length_mm: p.max_length_mm,
                rigid: p.rigid,
                watertight: p.watertight,
                contents: Vec::new(),
            })
            .collect();
        item
    }

    /// Spawns every copy and, recursively, the contents.
    fn spawn(&self, world: &mut ItemWorld, at: Location) -> WorldResult<Vec<ItemRef>> {
        if self.count == 0 {
            warn!("Item spec {} has count 0, skipping", self.type_id);
        }
        let mut spawned = Vec::with_capacity(self.count as usize);
        for _ in 0..self.count {
            let item = world.spawn(self.to_item(), at)?;
            for (pocket, spec) in self.pockets.iter().enumerate() {
                for content in &spec.contents {
                    content.spawn(world, Location::Contained { parent: item, pocket })?;
                }
            }
            spawned.push(item);
        }
        Ok(spawned)
    }
}

impl WorldSpec {
    /// Parses a RON world description.
    pub fn from_ron(text: &str) -> SatchelResult<Self> {
        let spec: Self = ron::from_str(text).map_err(|e| SatchelError::Serialization(e.to_string()))?;
        if !SchemaVersion::WORLD_FILE.is_compatible_with(&spec.version) {
            return Err(SatchelError::VersionMismatch {
                expected: SchemaVersion::WORLD_FILE.to_string(),
                actual: spec.version.to_string(),
            });
        }
        Ok(spec)
    }

    /// Reads a RON world file.
    pub fn load(path: impl AsRef<Path>) -> SatchelResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let spec = Self::from_ron(&text)?;
        info!(
            "Loaded world {} ({} characters, {} tiles)",
            path.display(),
            spec.characters.len(),
            spec.tiles.len()
        );
        Ok(spec)
    }

    /// Writes the description as pretty RON.
    pub fn to_ron(&self) -> SatchelResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SatchelError::Serialization(e.to_string()))
    }

    /// Builds the item graph.
    pub fn build(&self) -> WorldResult<ItemWorld> {
        let mut world = ItemWorld::new();
        for category in &self.categories {
            world.add_category(category.clone());
        }
        for tile in &self.tiles {
            world.add_tile(
                tile.position,
                Tile {
                    name: tile.name.clone(),
                    accessible: tile.accessible,
                    items: Vec::new(),
                    vehicle: tile.vehicle.as_ref().map(|v| VehicleCargo {
                        name: v.name.clone(),
                        items: Vec::new(),
                    }),
                },
            );
        }
        for spec in &self.characters {
            let id = CharacterId::new(spec.id);
            let mut character = Character::new(id, spec.name.clone(), spec.position);
            character.max_weight_g = spec.max_weight_g;
            character.can_crush_frozen = spec.can_crush_frozen;
            character.trade = spec.trade;
            world.add_character(character);
            if let Some(wielded) = &spec.wielded {
                wielded.spawn(&mut world, Location::Wielded(id))?;
            }
            for worn in &spec.worn {
                worn.spawn(&mut world, Location::Worn(id))?;
            }
        }
        for tile in &self.tiles {
            for item in &tile.items {
                item.spawn(&mut world, Location::Map(tile.position))?;
            }
            if let Some(vehicle) = &tile.vehicle {
                for item in &vehicle.items {
                    item.spawn(&mut world, Location::Vehicle(tile.position))?;
                }
            }
        }
        debug!("Built world with {} items", world.len());
        Ok(world)
    }
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
            wielded: Some((type_id: "knife", category: "tools", weight_g: 200)),
            worn: [
                (
                    type_id: "backpack",
                    category: "clothing",
                    pockets: [
                        (
                            max_volume_ml: 15000,
                            max_weight_g: 30000,
                            contents: [
                                (type_id: "coin", name: Some("silver coin"), count: 3, price: 100),
                                (type_id: "arrow", charges: Some(20), category: "ammo"),
                            ],
                        ),
                    ],
                ),
            ],
        ),
        (id: 1, name: "Hector", position: (x: 1, y: 0, z: 0), trade: (shopkeeper: true)),
    ],
    tiles: [
        (position: (x: 0, y: 1, z: 0), name: "grass", items: [(type_id: "rock", count: 2)]),
        (
            position: (x: 1, y: 1, z: 0),
            vehicle: Some((name: "trunk", items: [(type_id: "tire")])),
        ),
    ],
)
"#;

    #[test]
    fn test_build_camp() {
        let spec = WorldSpec::from_ron(CAMP).expect("parse");
        let world = spec.build().expect("build");
        let you = world.character(CharacterId::PLAYER).expect("you");
        assert!(you.wielded.is_some());
        assert_eq!(you.worn.len(), 1);
        let pack = you.worn[0];
        assert_eq!(world.contents(pack).len(), 4);
        let coin = world.contents(pack)[0];
        assert_eq!(world.get(coin).map(|c| c.name.as_str()), Some("silver coin"));

        let hector = world.character(CharacterId::new(1)).expect("hector");
        assert!(hector.trade.shopkeeper);
        assert!(hector.npc);

        let grass = world.tile(Tripoint::new(0, 1, 0)).expect("grass");
        assert_eq!(grass.name, "grass");
        assert_eq!(grass.items.len(), 2);
        let trunk = world
            .tile(Tripoint::new(1, 1, 0))
            .and_then(|t| t.vehicle.as_ref())
            .expect("trunk");
        assert_eq!(trunk.items.len(), 1);
    }

    #[test]
    fn test_ron_roundtrip_keeps_spec() {
        let spec = WorldSpec::from_ron(CAMP).expect("parse");
        let text = spec.to_ron().expect("write");
        assert_eq!(WorldSpec::from_ron(&text).expect("reparse"), spec);
    }

    #[test]
    fn test_newer_major_version_rejected() {
        let err = WorldSpec::from_ron("(version: (major: 2, minor: 0, patch: 0))").expect_err("version");
        assert!(matches!(err, SatchelError::VersionMismatch { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("camp.ron");
        fs::write(&path, CAMP).expect("write");
        let spec = WorldSpec::load(&path).expect("load");
        assert_eq!(spec.characters.len(), 2);
    }

    #[test]
    fn test_tile_items_spawn_with_contents() {
        let spec = WorldSpec {
            characters: vec![CharacterSpec::default()],
            tiles: vec![TileSpec {
                items: vec![ItemSpec {
                    type_id: "box".to_string(),
                    pockets: vec![PocketSpec {
                        contents: vec![ItemSpec {
                            type_id: "ball".to_string(),
                            ..ItemSpec::default()
                        }],
                        ..PocketSpec::default()
                    }],
                    ..ItemSpec::default()
                }],
                ..TileSpec::default()
            }],
            ..WorldSpec::default()
        };
        let world = spec.build().expect("build");
        assert_eq!(world.len(), 2);
    }
}
