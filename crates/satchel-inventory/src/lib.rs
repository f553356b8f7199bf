//! # Satchel Inventory
//!
//! Inventory selection and layout engine.
//!
//! This crate turns an item graph into paged, categorized columns and runs
//! the selection sessions built on top of them:
//! - Item graph model and RON world descriptions
//! - Entries, collation groups and columns with paging
//! - Presets deciding eligibility, captions and ordering
//! - The selector and the multiselector with its ledger
//! - Pick, compare, drop, insert, pickup and examine selectors
//! - Two-pane trade session
//! - Settings persistence and the rendering seam

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod category;
pub mod column;
pub mod compare;
pub mod drop;
pub mod entry;
pub mod error;
pub mod examine;
pub mod filter;
pub mod focus;
pub mod input;
pub mod insert;
pub mod multiselect;
pub mod pick;
pub mod pickup;
pub mod preset;
pub mod render;
pub mod selector;
pub mod settings;
pub mod stats;
pub mod trade;
pub mod world;
pub mod world_spec;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::category::*;
    pub use crate::column::*;
    pub use crate::compare::*;
    pub use crate::drop::*;
    pub use crate::entry::*;
    pub use crate::error::*;
    pub use crate::examine::*;
    pub use crate::filter::*;
    pub use crate::focus::*;
    pub use crate::input::*;
    pub use crate::insert::*;
    pub use crate::multiselect::*;
    pub use crate::pick::*;
    pub use crate::pickup::*;
    pub use crate::preset::*;
    pub use crate::render::*;
    pub use crate::selector::*;
    pub use crate::settings::*;
    pub use crate::stats::*;
    pub use crate::trade::*;
    pub use crate::world::*;
    pub use crate::world_spec::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_common::{CharacterId, Tripoint};

    #[test]
    fn test_selector_over_spec_world() {
        let spec = WorldSpec {
            characters: vec![CharacterSpec {
                worn: vec![ItemSpec {
                    type_id: "jacket".to_string(),
                    category: "clothing".to_string(),
                    ..ItemSpec::default()
                }],
                ..CharacterSpec::default()
            }],
            tiles: vec![TileSpec {
                position: Tripoint::new(1, 0, 0),
                items: vec![ItemSpec {
                    type_id: "apple".to_string(),
                    category: "food".to_string(),
                    count: 3,
                    ..ItemSpec::default()
                }],
                ..TileSpec::default()
            }],
            ..WorldSpec::default()
        };
        let world = spec.build().expect("world");
        assert_eq!(world.len(), 4);
        assert_eq!(
            world.character(CharacterId::PLAYER).map(|c| c.worn.len()).ok(),
            Some(1)
        );
    }

    #[test]
    fn test_money_and_trade_acceptance() {
        assert_eq!(format_money(1234), "$12.34");
        let profile = TradeProfile {
            max_credit: 500,
            ..TradeProfile::default()
        };
        assert!(will_accept_trade(&profile, -500));
        assert!(!will_accept_trade(&profile, -501));
    }
}
