//! Degraded-mode floor used when the server's DAG cannot be placed.
//!
//! The fallback is an entrance room with one to three "bridge" hallways, each
//! ending in a small landing room. All variation comes from an explicit seed,
//! so a given (source id, seed) pair always produces the same floor.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use sha3::{Digest, Sha3_256};
use tracing::error;

use super::dag::{DagDocument, DungeonNode, StairInfo};
use super::direction::{DoorSide, GridPos, RelativeDirection};
use super::layout::{Bounds, FloorLayout, LayoutGenerator, NodeRef, PositionedRoom};

pub const ENTRANCE_WIDTH: u32 = 8;
pub const ENTRANCE_HEIGHT: u32 = 6;

const BRIDGE_LENGTH: (u32, u32) = (2, 6);
const LANDING_SIZE: (u32, u32) = (3, 5);

/// Derive a per-floor fallback seed from a base seed
pub fn fallback_seed(source_id: &str, base_seed: u64) -> u64 {
    let mut hasher = Sha3_256::new();
    hasher.update(base_seed.to_le_bytes());
    hasher.update(source_id.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(out)
}

/// Seeded stand-in document.
///
/// Bridges leave the entrance through distinct walls (center through the top,
/// left/right through the sides at mid-height) and landing rooms are at most
/// five cells across, so no two footprints can meet.
pub fn fallback_document(source_id: &str, seed: u64) -> DagDocument {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    let mut turns = vec![RelativeDirection::Center];
    if rng.gen_bool(0.5) {
        turns.push(RelativeDirection::Left);
    }
    if rng.gen_bool(0.5) {
        turns.push(RelativeDirection::Right);
    }

    let mut nodes = Vec::with_capacity(1 + turns.len() * 2);
    let mut bridges = Vec::with_capacity(turns.len());
    for (i, turn) in turns.into_iter().enumerate() {
        let bridge = format!("fallback-bridge-{i}");
        let landing = format!("fallback-landing-{i}");
        let offset = match turn {
            RelativeDirection::Center => ENTRANCE_WIDTH / 2,
            RelativeDirection::Left | RelativeDirection::Right => ENTRANCE_HEIGHT / 2,
        };
        let length = rng.gen_range(BRIDGE_LENGTH.0..=BRIDGE_LENGTH.1);
        let width = rng.gen_range(LANDING_SIZE.0..=LANDING_SIZE.1);
        let height = rng.gen_range(LANDING_SIZE.0..=LANDING_SIZE.1);

        nodes.push(
            DungeonNode::hallway(bridge.clone(), length)
                .attached(turn, offset)
                .with_children([landing.clone()]),
        );
        nodes.push(DungeonNode::room(landing, width, height));
        bridges.push(bridge);
    }

    let entrance = DungeonNode::room("fallback-entrance", ENTRANCE_WIDTH, ENTRANCE_HEIGHT)
        .with_children(bridges)
        .with_stairs(StairInfo {
            has_down_stairs: true,
            ..Default::default()
        });
    nodes.insert(0, entrance);

    DagDocument::new(source_id, nodes)
}

/// Fallback layout for `source_id`, placed by the regular generator.
pub fn fallback_layout(generator: &LayoutGenerator, source_id: &str, seed: u64) -> FloorLayout {
    let doc = fallback_document(source_id, seed);
    match generator.generate(&doc) {
        Ok(layout) => layout,
        Err(err) => {
            error!(floor = source_id, error = %err, "fallback document rejected, using a single room");
            single_room_layout(source_id)
        }
    }
}

/// Last resort: the entrance room alone
pub fn single_room_layout(source_id: &str) -> FloorLayout {
    let name = "fallback-entrance".to_string();
    let room = PositionedRoom {
        id: name.clone(),
        name: name.clone(),
        parent: None,
        position: GridPos::ORIGIN,
        width: ENTRANCE_WIDTH,
        height: ENTRANCE_HEIGHT,
        door_side: DoorSide::Top,
        door_position: GridPos::new(ENTRANCE_WIDTH as i32 / 2, ENTRANCE_HEIGHT as i32 - 1),
        stairs: StairInfo::default(),
        children: Vec::new(),
        exits: Vec::new(),
    };
    FloorLayout {
        source_id: source_id.to_string(),
        root: name.clone(),
        rooms: vec![room],
        hallways: Vec::new(),
        node_index: [(name, NodeRef::Room(0))].into_iter().collect(),
        bounds: Bounds {
            min: GridPos::ORIGIN,
            max: GridPos::new(ENTRANCE_WIDTH as i32, ENTRANCE_HEIGHT as i32),
        },
    }
}
