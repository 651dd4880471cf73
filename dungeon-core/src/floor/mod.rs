//! Per-floor context: the placed layout and the collision snapshot built
//! from it. A new floor replaces the whole context; nothing inside is
//! mutated after construction.

use bevy::math::Vec3;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::collision::CollisionResolver;
use crate::config::DungeonConfig;
use crate::generation::dag::DagDocument;
use crate::generation::direction::GridPos;
use crate::generation::error::LayoutError;
use crate::generation::fallback::fallback_seed;
use crate::generation::layout::{FloorLayout, FloorOutcome, LayoutGenerator, PositionedRoom};
use crate::grid::GridIndex;

/// Wall and ceiling cells from the level geometry, or `Derived` to wall in
/// the floor outline. Decodes from `null` as `Derived`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FloorGeometry {
    Cells {
        #[serde(default)]
        walls: Vec<GridPos>,
        #[serde(default)]
        ceilings: Vec<GridPos>,
    },
    Derived,
}

impl FloorGeometry {
    pub fn cells(walls: Vec<GridPos>, ceilings: Vec<GridPos>) -> Self {
        Self::Cells { walls, ceilings }
    }
}

#[derive(Resource, Debug, Clone)]
pub struct FloorContext {
    layout: FloorLayout,
    collision: CollisionResolver,
    degraded: Option<LayoutError>,
}

impl FloorContext {
    /// Generate the layout for `doc` and build its collision grid
    pub fn load(
        doc: &DagDocument,
        geometry: FloorGeometry,
        config: &DungeonConfig,
    ) -> Result<Self, LayoutError> {
        let layout = LayoutGenerator::new(config.layout.clone()).generate(doc)?;
        Ok(Self::from_layout(layout, geometry, config))
    }

    /// Like [`load`](Self::load), but a rejected document becomes the seeded
    /// fallback floor. The rejection is kept in [`degraded`](Self::degraded).
    pub fn load_or_fallback(doc: &DagDocument, geometry: FloorGeometry, config: &DungeonConfig) -> Self {
        let seed = fallback_seed(&doc.root_hint, config.fallback_seed);
        let outcome = LayoutGenerator::new(config.layout.clone()).generate_or_fallback(doc, seed);
        // Renderer cells were built for the rejected layout, not the fallback
        let geometry = if outcome.is_degraded() {
            FloorGeometry::Derived
        } else {
            geometry
        };
        Self::from_outcome(outcome, geometry, config)
    }

    pub fn from_outcome(outcome: FloorOutcome, geometry: FloorGeometry, config: &DungeonConfig) -> Self {
        let mut context = Self::from_layout(outcome.layout, geometry, config);
        context.degraded = outcome.degraded;
        context
    }

    pub fn from_layout(layout: FloorLayout, geometry: FloorGeometry, config: &DungeonConfig) -> Self {
        let floor_top = config.collision.floor_top;
        let grid = match geometry {
            FloorGeometry::Cells { walls, ceilings } => {
                GridIndex::rebuild(&layout, walls, ceilings, floor_top)
            }
            FloorGeometry::Derived => GridIndex::with_perimeter_walls(&layout, floor_top),
        };
        Self {
            collision: CollisionResolver::new(grid, config.collision.clone()),
            layout,
            degraded: None,
        }
    }

    pub fn layout(&self) -> &FloorLayout {
        &self.layout
    }

    pub fn collision(&self) -> &CollisionResolver {
        &self.collision
    }

    pub fn grid(&self) -> &GridIndex {
        self.collision.grid()
    }

    pub fn source_id(&self) -> &str {
        &self.layout.source_id
    }

    pub fn degraded(&self) -> Option<&LayoutError> {
        self.degraded.as_ref()
    }

    /// Room whose footprint contains the world position, if any
    pub fn room_at(&self, pos: Vec3) -> Option<&PositionedRoom> {
        let cell = GridIndex::cell_at(pos.x, pos.z, self.collision.config().cell_size);
        self.layout.rooms.iter().find(|r| r.rect().contains(cell))
    }

    /// Feet position at the centre of the root room
    pub fn spawn_point(&self) -> Vec3 {
        let cs = self.collision.config().cell_size;
        let cell = self
            .layout
            .room(&self.layout.root)
            .map(|r| GridPos::new(r.position.x + r.width as i32 / 2, r.position.y + r.height as i32 / 2))
            .or_else(|| self.layout.hallways.first().map(|h| h.start_position))
            .unwrap_or(GridPos::ORIGIN);
        let x = (cell.x as f32 + 0.5) * cs;
        let z = (cell.y as f32 + 0.5) * cs;
        Vec3::new(x, self.collision.floor_height_at(Vec3::new(x, 0.0, z)), z)
    }
}
