use bevy::math::Vec3;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::ffi::CString;

use dungeon_core::bridge::*;
use dungeon_core::collision::{CollisionConfig, CollisionResolver};
use dungeon_core::generation::dag::{DagDocument, DungeonNode};
use dungeon_core::generation::direction::RelativeDirection;
use dungeon_core::generation::fallback::{fallback_layout, fallback_seed};
use dungeon_core::generation::layout::LayoutGenerator;
use dungeon_core::grid::GridIndex;

/// Hub room with a ring of hallway spurs, each ending in a room
fn branching_document(branches: usize) -> DagDocument {
    let mut nodes = Vec::with_capacity(1 + branches * 2);
    let mut hub_children = Vec::with_capacity(branches);
    for i in 0..branches {
        let hall = format!("hall-{i}");
        let room = format!("room-{i}");
        let turn = match i % 3 {
            0 => RelativeDirection::Center,
            1 => RelativeDirection::Left,
            _ => RelativeDirection::Right,
        };
        hub_children.push(hall.clone());
        nodes.push(
            DungeonNode::hallway(hall, 4 + (i as u32 % 4) * 3)
                .attached(turn, (i as u32 / 3) * 5 + 2)
                .with_children([room.clone()]),
        );
        nodes.push(DungeonNode::room(room, 5, 5));
    }
    nodes.insert(0, DungeonNode::room("hub", 40, 40).with_children(hub_children));
    DagDocument::new("bench-floor", nodes)
}

fn chain_document(length: usize) -> DagDocument {
    let mut nodes = vec![DungeonNode::room("root", 5, 5).with_children(["h0"])];
    for i in 0..length {
        let mut hall = DungeonNode::hallway(format!("h{i}"), 2);
        if i + 1 < length {
            hall = hall.with_children([format!("h{}", i + 1)]);
        }
        nodes.push(hall);
    }
    DagDocument::new("bench-chain", nodes)
}

fn bench_layout(c: &mut Criterion) {
    let generator = LayoutGenerator::default();
    let branching = branching_document(21);
    let chain = chain_document(2_000);

    c.bench_function("generate_branching_43", |b| {
        b.iter(|| generator.generate(black_box(&branching)))
    });

    c.bench_function("generate_chain_2000", |b| {
        b.iter(|| generator.generate(black_box(&chain)))
    });

    c.bench_function("fallback_layout", |b| {
        b.iter(|| {
            let seed = fallback_seed(black_box("bench-floor"), 42);
            fallback_layout(&generator, "bench-floor", seed)
        })
    });

    let layout = generator.generate(&branching).unwrap();
    c.bench_function("layout_fingerprint", |b| b.iter(|| black_box(&layout).fingerprint()));
}

fn bench_grid(c: &mut Criterion) {
    let layout = LayoutGenerator::default()
        .generate(&branching_document(21))
        .unwrap();

    c.bench_function("grid_with_perimeter_walls", |b| {
        b.iter(|| GridIndex::with_perimeter_walls(black_box(&layout), 0.0))
    });
}

fn bench_collision(c: &mut Criterion) {
    let layout = LayoutGenerator::default()
        .generate(&branching_document(21))
        .unwrap();
    let resolver = CollisionResolver::new(
        GridIndex::with_perimeter_walls(&layout, 0.0),
        CollisionConfig::default(),
    );
    let center = Vec3::new(40.0, 0.0, 40.0);

    c.bench_function("resolve_step_clear", |b| {
        b.iter(|| resolver.resolve_step(black_box(center), black_box(center + Vec3::new(0.3, 0.0, 0.2))))
    });

    c.bench_function("resolve_step_wall", |b| {
        let near = Vec3::new(0.5, 0.0, 40.0);
        b.iter(|| resolver.resolve_step(black_box(near), black_box(near - Vec3::new(0.3, 0.0, 0.0))))
    });

    c.bench_function("sweep_step_across_hub", |b| {
        b.iter(|| resolver.sweep_step(black_box(center), black_box(center + Vec3::new(60.0, 0.0, 0.0))))
    });

    let moves: Vec<(Vec3, Vec3)> = (0..1_000)
        .map(|i| {
            let angle = i as f32 * 0.37;
            (center, center + Vec3::new(angle.cos(), 0.0, angle.sin()) * 30.0)
        })
        .collect();
    c.bench_function("sweep_many_1000", |b| b.iter(|| resolver.sweep_many(black_box(&moves))));
}

fn bench_ffi(c: &mut Criterion) {
    let dag = CString::new(branching_document(21).to_json()).unwrap();

    c.bench_function("ffi_generate_dungeon_layout", |b| {
        b.iter(|| {
            let ptr = generate_dungeon_layout(black_box(dag.as_ptr()));
            free_string(ptr);
        })
    });

    let handle = floor_context_create(dag.as_ptr(), std::ptr::null());
    c.bench_function("ffi_move_agent", |b| {
        b.iter(|| floor_context_move_agent(handle, 40.0, 0.0, 40.0, black_box(41.0), 0.0, 40.0))
    });
    floor_context_free(handle);
}

criterion_group!(benches, bench_layout, bench_grid, bench_collision, bench_ffi);
criterion_main!(benches);
