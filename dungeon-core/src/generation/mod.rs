pub mod dag;
pub mod direction;
pub mod error;
pub mod fallback;
pub mod floor_manager;
pub mod layout;

use bevy::prelude::*;

use crate::config::DungeonConfig;

pub use dag::{DagDocument, DagGraph, DungeonNode, NodeKind, StairInfo};
pub use direction::{absolute_direction, opposite, step_vector, Direction, DoorSide, GridPos, RelativeDirection};
pub use error::{LayoutError, LayoutErrorKind};
pub use layout::{
    CellRect, DoorOffsetPolicy, Doorway, FloorLayout, FloorOutcome, LayoutConfig, LayoutGenerator,
    PositionedHallway, PositionedRoom,
};

pub struct GenerationPlugin;

impl Plugin for GenerationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DungeonConfig>()
            .init_resource::<floor_manager::PendingFloors>()
            .add_event::<floor_manager::FloorDagReceived>()
            .add_event::<floor_manager::FloorLayoutReady>()
            .add_event::<floor_manager::FloorGeometryReady>()
            .add_event::<floor_manager::FloorReadyEvent>()
            .add_event::<floor_manager::FloorTransitionEvent>()
            .add_systems(
                Update,
                (
                    (
                        floor_manager::generate_floor_layouts,
                        floor_manager::install_floor_geometry,
                    )
                        .chain()
                        .in_set(floor_manager::FloorLoadSet),
                    floor_manager::detect_stair_use.after(floor_manager::FloorLoadSet),
                ),
            );
    }
}
