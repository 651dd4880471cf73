//! Floor loading inside a Bevy app.
//!
//! A DAG arrives from the floor service, gets placed (or replaced by the
//! fallback floor), goes out to the renderer, and comes back as wall and
//! ceiling cells. Only then is the [`FloorContext`] swapped. With
//! `derive_perimeter_walls` the renderer round trip is skipped.

use std::collections::HashMap;

use bevy::prelude::*;

use super::dag::DagDocument;
use super::direction::GridPos;
use super::fallback::fallback_seed;
use super::layout::{FloorLayout, FloorOutcome, LayoutGenerator};
use crate::config::DungeonConfig;
use crate::floor::{FloorContext, FloorGeometry};
use crate::movement::MovementInput;

/// Systems that replace the active floor. Movement runs after this set.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct FloorLoadSet;

/// Event: the floor service delivered a DAG
#[derive(Event, Debug, Clone)]
pub struct FloorDagReceived {
    pub document: DagDocument,
}

/// Event: layout placed, waiting on level geometry
#[derive(Event, Debug, Clone)]
pub struct FloorLayoutReady {
    pub layout: FloorLayout,
    pub degraded: bool,
}

/// Event: renderer built the level and reports its collision cells
#[derive(Event, Debug, Clone)]
pub struct FloorGeometryReady {
    pub source_id: String,
    pub walls: Vec<GridPos>,
    pub ceilings: Vec<GridPos>,
}

/// Event: a new floor context is active
#[derive(Event, Debug, Clone)]
pub struct FloorReadyEvent {
    pub source_id: String,
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloorDirection {
    Up,
    Down,
}

/// Event: an agent used the stairs of the room it stands in
#[derive(Event, Debug, Clone)]
pub struct FloorTransitionEvent {
    pub entity: Entity,
    pub direction: FloorDirection,
}

/// Layouts waiting for geometry, keyed by source id
#[derive(Resource, Debug, Default)]
pub struct PendingFloors {
    floors: HashMap<String, FloorOutcome>,
}

impl PendingFloors {
    pub fn len(&self) -> usize {
        self.floors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.floors.contains_key(source_id)
    }
}

fn install(commands: &mut Commands, ready: &mut EventWriter<FloorReadyEvent>, context: FloorContext) {
    let source_id = context.source_id().to_string();
    let degraded = context.degraded().is_some();
    info!(
        floor = %source_id,
        degraded,
        floor_cells = context.grid().floor_count(),
        wall_cells = context.grid().wall_count(),
        "floor context installed"
    );
    commands.insert_resource(context);
    ready.send(FloorReadyEvent { source_id, degraded });
}

/// System: place every received DAG
pub fn generate_floor_layouts(
    mut received: EventReader<FloorDagReceived>,
    mut layout_ready: EventWriter<FloorLayoutReady>,
    mut floor_ready: EventWriter<FloorReadyEvent>,
    mut pending: ResMut<PendingFloors>,
    config: Res<DungeonConfig>,
    mut commands: Commands,
) {
    let generator = LayoutGenerator::new(config.layout.clone());
    for event in received.read() {
        let doc = &event.document;
        let seed = fallback_seed(&doc.root_hint, config.fallback_seed);
        let outcome = generator.generate_or_fallback(doc, seed);

        layout_ready.send(FloorLayoutReady {
            layout: outcome.layout.clone(),
            degraded: outcome.is_degraded(),
        });

        // A newer floor supersedes anything still waiting on geometry
        let source_id = outcome.layout.source_id.clone();
        let waiting = pending.floors.len();
        pending.floors.retain(|id, _| *id == source_id);
        if pending.floors.len() < waiting {
            debug!(
                floor = %source_id,
                dropped = waiting - pending.floors.len(),
                "discarded stale pending floors"
            );
        }

        if config.derive_perimeter_walls {
            let context = FloorContext::from_outcome(outcome, FloorGeometry::Derived, &config);
            install(&mut commands, &mut floor_ready, context);
        } else {
            pending.floors.insert(source_id, outcome);
        }
    }
}

/// System: rebuild the grid once the renderer reports geometry
pub fn install_floor_geometry(
    mut geometry: EventReader<FloorGeometryReady>,
    mut floor_ready: EventWriter<FloorReadyEvent>,
    mut pending: ResMut<PendingFloors>,
    config: Res<DungeonConfig>,
    mut commands: Commands,
) {
    for event in geometry.read() {
        let Some(outcome) = pending.floors.remove(&event.source_id) else {
            warn!(floor = %event.source_id, "geometry for a floor that is not pending, ignoring");
            continue;
        };
        let cells = FloorGeometry::cells(event.walls.clone(), event.ceilings.clone());
        let context = FloorContext::from_outcome(outcome, cells, &config);
        install(&mut commands, &mut floor_ready, context);
    }
}

/// System: agents pressing interact inside a stair room request a transition
pub fn detect_stair_use(
    floor: Option<Res<FloorContext>>,
    agents: Query<(Entity, &Transform, &MovementInput)>,
    mut transitions: EventWriter<FloorTransitionEvent>,
) {
    let Some(floor) = floor else {
        return;
    };
    for (entity, transform, input) in &agents {
        if !input.interact {
            continue;
        }
        let Some(room) = floor.room_at(transform.translation) else {
            continue;
        };
        let direction = if room.stairs.has_up_stairs {
            FloorDirection::Up
        } else if room.stairs.has_down_stairs {
            FloorDirection::Down
        } else {
            continue;
        };
        debug!(room = %room.name, ?direction, "stairs used");
        transitions.send(FloorTransitionEvent { entity, direction });
    }
}
