//! Selector layout benchmarks.
//!
//! Run with `cargo bench --package satchel-inventory --bench paging`.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use satchel_common::{CharacterId, Tripoint};
use satchel_inventory::{
    Character, DefaultPreset, FocusBroker, InventorySelector, Item, ItemWorld, LayoutSettings, Location, Pocket,
    PocketKind, UiMode,
};

const CATEGORIES: [&str; 6] = ["food", "tools", "clothing", "ammo", "guns", "books"];

/// A player with a stuffed backpack and loose items on the adjacent tiles.
fn create_world(items: usize) -> ItemWorld {
    let mut world = ItemWorld::new();
    let you = CharacterId::PLAYER;
    world.add_character(Character::new(you, "You", Tripoint::default()));
    let pack = world
        .spawn(
            Item::new("backpack", "backpack", "clothing")
                .with_pocket(Pocket::new(PocketKind::Container, u32::MAX, u32::MAX)),
            Location::Worn(you),
        )
        .expect("backpack");
    for i in 0..items {
        let category = CATEGORIES[i % CATEGORIES.len()];
        let item = Item::new(format!("thing_{}", i % 97), format!("thing {}", i % 97), category).with_size(100, 100);
        let at = if i % 2 == 0 {
            Location::Contained { parent: pack, pocket: 0 }
        } else {
            Location::Map(Tripoint::new((i % 3) as i32 - 1, 1, 0))
        };
        world.spawn(item, at).expect("spawn");
    }
    world
}

fn selector(world: &ItemWorld, ui_mode: UiMode) -> InventorySelector {
    let mut sel = InventorySelector::new(
        CharacterId::PLAYER,
        Arc::new(DefaultPreset::default()),
        LayoutSettings::default(),
        ui_mode,
        FocusBroker::shared(),
    );
    sel.add_character_items(world, CharacterId::PLAYER);
    sel.add_nearby_items(world, 1);
    sel
}

fn bench_prepare_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare_layout");
    for size in [100usize, 1_000, 5_000] {
        let world = create_world(size);
        for mode in [UiMode::Categories, UiMode::Hierarchy] {
            group.bench_with_input(BenchmarkId::new(format!("{mode:?}"), size), &size, |b, _| {
                b.iter(|| {
                    let mut sel = selector(&world, mode);
                    sel.prepare_layout(black_box(&world));
                    black_box(sel.columns().len())
                });
            });
        }
    }
    group.finish();
}

fn bench_filtered_layout(c: &mut Criterion) {
    let world = create_world(2_000);
    c.bench_function("filtered_layout_2000", |b| {
        b.iter(|| {
            let mut sel = selector(&world, UiMode::Categories);
            sel.set_filter(black_box("c:food"));
            sel.prepare_layout(&world);
            black_box(sel.columns().len())
        });
    });
}

criterion_group!(benches, bench_prepare_layout, bench_filtered_layout);
criterion_main!(benches);
