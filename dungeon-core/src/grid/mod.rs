//! Sparse occupancy grid built from a floor layout.
//!
//! Floor cells come from rasterizing the layout; wall and ceiling cells are
//! handed in by whoever builds the level geometry. The three sets are kept
//! disjoint (wall beats ceiling beats floor) so every query is one lookup.
//! A ceiling over a floor cell still keeps that cell's floor height.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info};

use crate::generation::direction::GridPos;
use crate::generation::layout::FloorLayout;
use crate::logging::TimingSpan;

/// Occupied cells of one floor, by category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridIndex {
    floor: HashSet<GridPos>,
    heights: HashMap<GridPos, f32>,
    walls: HashSet<GridPos>,
    ceilings: HashSet<GridPos>,
}

impl GridIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rebuild from scratch: rasterized floor at `floor_top`, plus external
    /// wall and ceiling cells copied verbatim.
    pub fn rebuild<W, C>(layout: &FloorLayout, walls: W, ceilings: C, floor_top: f32) -> Self
    where
        W: IntoIterator<Item = GridPos>,
        C: IntoIterator<Item = GridPos>,
    {
        let _span = TimingSpan::new("grid_rebuild");

        let walls: HashSet<GridPos> = walls.into_iter().collect();
        let ceilings: HashSet<GridPos> = ceilings
            .into_iter()
            .filter(|cell| !walls.contains(cell))
            .collect();

        let rasterized = Self::floor_cells(layout);
        let covered = rasterized.len();
        let heights: HashMap<GridPos, f32> = rasterized
            .into_iter()
            .filter(|cell| !walls.contains(cell))
            .map(|cell| (cell, floor_top))
            .collect();
        let floor: HashSet<GridPos> = heights
            .keys()
            .filter(|cell| !ceilings.contains(cell))
            .copied()
            .collect();
        if floor.len() < covered {
            debug!(
                dropped = covered - floor.len(),
                "floor cells shadowed by wall or ceiling cells"
            );
        }

        info!(
            floor = %layout.source_id,
            floor_cells = floor.len(),
            wall_cells = walls.len(),
            ceiling_cells = ceilings.len(),
            "grid index rebuilt"
        );
        Self {
            floor,
            heights,
            walls,
            ceilings,
        }
    }

    /// Rebuild with walls derived from the floor outline and no ceilings
    pub fn with_perimeter_walls(layout: &FloorLayout, floor_top: f32) -> Self {
        let walls = perimeter_walls(&Self::floor_cells(layout));
        Self::rebuild(layout, walls, std::iter::empty(), floor_top)
    }

    /// Every room cell in `[position, position + size)` and every hallway
    /// cell sampled at unit steps.
    pub fn floor_cells(layout: &FloorLayout) -> BTreeSet<GridPos> {
        let mut cells = BTreeSet::new();
        for room in &layout.rooms {
            cells.extend(room.rect().cells());
        }
        for hallway in &layout.hallways {
            cells.extend(hallway.cells());
        }
        cells
    }

    /// Cell containing a world-space horizontal position
    pub fn cell_at(world_x: f32, world_z: f32, cell_size: f32) -> GridPos {
        GridPos::new(
            (world_x / cell_size).floor() as i32,
            (world_z / cell_size).floor() as i32,
        )
    }

    pub fn is_floor(&self, cell: GridPos) -> bool {
        self.floor.contains(&cell)
    }

    pub fn is_wall(&self, cell: GridPos) -> bool {
        self.walls.contains(&cell)
    }

    pub fn is_ceiling(&self, cell: GridPos) -> bool {
        self.ceilings.contains(&cell)
    }

    /// Top surface of the floor under `cell`, ceiling cells included
    pub fn floor_top(&self, cell: GridPos) -> Option<f32> {
        self.heights.get(&cell).copied()
    }

    pub fn floor_count(&self) -> usize {
        self.floor.len()
    }

    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    pub fn ceiling_count(&self) -> usize {
        self.ceilings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.floor.is_empty() && self.walls.is_empty() && self.ceilings.is_empty()
    }

    pub fn walls(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.walls.iter().copied()
    }

    pub fn ceilings(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.ceilings.iter().copied()
    }

    /// Inclusive cell extent of everything in the index
    pub fn extent(&self) -> Option<(GridPos, GridPos)> {
        let mut cells = self
            .floor
            .iter()
            .chain(self.walls.iter())
            .chain(self.ceilings.iter());
        let first = *cells.next()?;
        Some(cells.fold((first, first), |(lo, hi), c| {
            (
                GridPos::new(lo.x.min(c.x), lo.y.min(c.y)),
                GridPos::new(hi.x.max(c.x), hi.y.max(c.y)),
            )
        }))
    }
}

/// Non-floor cells touching a floor cell (8-neighbourhood). Stands in for
/// renderer-built walls when no renderer is attached.
pub fn perimeter_walls(floor: &BTreeSet<GridPos>) -> BTreeSet<GridPos> {
    let mut walls = BTreeSet::new();
    for cell in floor {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let n = GridPos::new(cell.x + dx, cell.y + dy);
                if !floor.contains(&n) {
                    walls.insert(n);
                }
            }
        }
    }
    walls
}
