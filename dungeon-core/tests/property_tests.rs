//! Property-based tests using proptest
//!
//! Invariants that must hold for every input:
//! - Layout: any tree-shaped DAG either places without overlap or fails with `Overlap`
//! - Layout: doors line up with the hallways and rooms they lead to
//! - Layout: identical documents give identical layouts and fingerprints
//! - Collision: resolving an already-resolved position changes nothing
//! - Collision: sweeps never end inside a wall
//! - Collision: a sweep across a wall collides however long it is

use bevy::math::Vec3;
use proptest::prelude::*;

use dungeon_core::collision::CollisionAxis;
use dungeon_core::config::DungeonConfig;
use dungeon_core::floor::{FloorContext, FloorGeometry};
use dungeon_core::generation::dag::{DagDocument, DungeonNode};
use dungeon_core::generation::direction::RelativeDirection;
use dungeon_core::generation::layout::{CellRect, FloorLayout, LayoutGenerator};
use dungeon_core::generation::{GridPos, LayoutError};

// ============================================================
// Strategies
// ============================================================

#[derive(Debug, Clone)]
struct NodeSpec {
    parent: usize,
    is_room: bool,
    a: u32,
    b: u32,
    turn: RelativeDirection,
    offset: u32,
}

fn turn() -> impl Strategy<Value = RelativeDirection> {
    prop_oneof![
        Just(RelativeDirection::Center),
        Just(RelativeDirection::Left),
        Just(RelativeDirection::Right),
    ]
}

fn node_spec() -> impl Strategy<Value = NodeSpec> {
    (any::<usize>(), any::<bool>(), 1u32..7, 1u32..7, turn(), 0u32..8).prop_map(
        |(parent, is_room, a, b, turn, offset)| NodeSpec {
            parent,
            is_room,
            a,
            b,
            turn,
            offset,
        },
    )
}

/// Random tree: node 0 is a room, node i hangs off some node before it
fn tree_document() -> impl Strategy<Value = DagDocument> {
    (2u32..8, 2u32..8, prop::collection::vec(node_spec(), 0..12)).prop_map(|(w, h, specs)| {
        let mut nodes = vec![DungeonNode::room("n0", w, h)];
        for (i, spec) in specs.iter().enumerate() {
            let name = format!("n{}", i + 1);
            let parent = spec.parent % (i + 1);
            let node = if spec.is_room {
                DungeonNode::room(name.clone(), spec.a, spec.b)
            } else {
                DungeonNode::hallway(name.clone(), spec.a)
            };
            nodes.push(node.attached(spec.turn, spec.offset));
            nodes[parent].children.push(name);
        }
        DagDocument::new("prop-floor", nodes)
    })
}

fn footprints(layout: &FloorLayout) -> Vec<(String, CellRect)> {
    layout
        .rooms
        .iter()
        .map(|r| (r.name.clone(), r.rect()))
        .chain(layout.hallways.iter().map(|h| (h.name.clone(), h.rect())))
        .collect()
}

fn manhattan(a: GridPos, b: GridPos) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

fn test_floor() -> FloorContext {
    let doc = DagDocument::new(
        "collision-prop",
        vec![
            DungeonNode::room("hub", 8, 6).with_children(["north", "east"]),
            DungeonNode::hallway("north", 5)
                .attached(RelativeDirection::Center, 4)
                .with_children(["far"]),
            DungeonNode::room("far", 5, 5),
            DungeonNode::hallway("east", 4).attached(RelativeDirection::Right, 2),
        ],
    );
    FloorContext::load(&doc, FloorGeometry::Derived, &DungeonConfig::default()).unwrap()
}

// ============================================================
// Layout Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_placement_is_disjoint_or_overlap_error(doc in tree_document()) {
        match LayoutGenerator::default().generate(&doc) {
            Ok(layout) => {
                prop_assert_eq!(layout.node_count(), doc.nodes.len());
                let rects = footprints(&layout);
                for (i, (a_name, a)) in rects.iter().enumerate() {
                    for (b_name, b) in &rects[i + 1..] {
                        prop_assert!(
                            a.intersection(b).is_none(),
                            "{} overlaps {}", a_name, b_name
                        );
                    }
                }
            }
            Err(LayoutError::Overlap { node, existing, .. }) => {
                prop_assert!(doc.nodes.iter().any(|n| n.name == node));
                prop_assert!(doc.nodes.iter().any(|n| n.name == existing));
                prop_assert_ne!(node, existing);
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    #[test]
    fn prop_children_connect_to_parents(doc in tree_document()) {
        let Ok(layout) = LayoutGenerator::default().generate(&doc) else {
            return Ok(());
        };

        let roots: Vec<_> = layout
            .rooms
            .iter()
            .filter(|r| r.parent.is_none())
            .map(|r| r.name.as_str())
            .collect();
        prop_assert_eq!(roots, vec![layout.root.as_str()]);

        for hallway in &layout.hallways {
            let parent = hallway.parent.as_deref().unwrap();
            if let Some(room) = layout.room(parent) {
                let exit = room.exit_to(&hallway.name).unwrap();
                prop_assert_eq!(exit.position + hallway.step(), hallway.start_position);
            } else {
                let prev = layout.hallway(parent).unwrap();
                prop_assert_eq!(prev.last_cell() + hallway.step(), hallway.start_position);
            }
        }

        for room in layout.rooms.iter().filter(|r| r.parent.is_some()) {
            let parent = room.parent.as_deref().unwrap();
            let from = match layout.room(parent) {
                Some(p) => p.exit_to(&room.name).unwrap().position,
                None => layout.hallway(parent).unwrap().last_cell(),
            };
            prop_assert_eq!(manhattan(from, room.door_position), 1);
            prop_assert!(room.rect().contains(room.door_position));
        }
    }

    #[test]
    fn prop_generation_is_deterministic(doc in tree_document()) {
        let generator = LayoutGenerator::default();
        match (generator.generate(&doc), generator.generate(&doc)) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.fingerprint(), b.fingerprint());
                prop_assert_eq!(a, b);
            }
            (Err(a), Err(b)) => prop_assert_eq!(a, b),
            _ => prop_assert!(false, "outcomes differ"),
        }
    }

    #[test]
    fn prop_fallback_always_yields_a_floor(doc in tree_document(), seed in any::<u64>()) {
        let outcome = LayoutGenerator::default().generate_or_fallback(&doc, seed);
        prop_assert!(!outcome.layout.rooms.is_empty());
        prop_assert_eq!(outcome.is_degraded(), LayoutGenerator::default().generate(&doc).is_err());
    }
}

// ============================================================
// Collision Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_resolve_step_is_idempotent(dx in -3.0f32..3.0, dz in -3.0f32..3.0, start in 0usize..4) {
        let floor = test_floor();
        let resolver = floor.collision();
        let spawn = floor.spawn_point();
        let current = spawn + Vec3::new(start as f32 - 1.5, 0.0, 0.0);
        prop_assume!(!resolver.is_blocked(current));

        let first = resolver.resolve_step(current, current + Vec3::new(dx, 0.0, dz));
        prop_assert!(!resolver.is_blocked(first.corrected));
        let second = resolver.resolve_step(current, first.corrected);
        prop_assert!(!second.collided);
        prop_assert_eq!(second.corrected, first.corrected);
    }

    #[test]
    fn prop_sweep_never_ends_inside_walls(dx in -25.0f32..25.0, dz in -25.0f32..25.0) {
        let floor = test_floor();
        let resolver = floor.collision();
        let from = floor.spawn_point();
        let result = resolver.sweep_step(from, from + Vec3::new(dx, 0.0, dz));
        prop_assert!(!resolver.is_blocked(result.corrected));
        if !result.collided {
            prop_assert_eq!(result.corrected, from + Vec3::new(dx, 0.0, dz));
        }
    }

    #[test]
    fn prop_sweep_across_wall_always_collides(
        x in 1.0f32..15.0,
        z in 0.5f32..11.5,
        beyond in 2.5f32..1.0e5,
    ) {
        // the hub's west wall column covers every z in the room
        let floor = test_floor();
        let resolver = floor.collision();
        let from = Vec3::new(x, 0.0, z);
        let to = Vec3::new(-beyond, 0.0, z);
        prop_assume!(!resolver.is_blocked(from));
        prop_assert!((to - from).length() > resolver.config().cell_size);

        let result = resolver.sweep_step(from, to);
        prop_assert!(result.collided);
        prop_assert_eq!(result.axis, CollisionAxis::X);
        prop_assert!(result.corrected.x > 0.0);
        prop_assert!(!resolver.is_blocked(result.corrected));
    }
}
