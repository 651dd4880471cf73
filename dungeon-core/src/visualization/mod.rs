//! Debug views of a loaded floor.
//!
//! `render_ascii` prints the grid with north up (used by the CLI and in test
//! failure output). `VisualizationPlugin` spawns one cube per cell whenever a
//! new floor context is installed.

use bevy::prelude::*;

use crate::floor::FloorContext;
use crate::generation::direction::GridPos;
use crate::generation::floor_manager::FloorReadyEvent;

pub struct VisualizationPlugin;

impl Plugin for VisualizationPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, render_floor_cells);
    }
}

/// Marker for spawned cell cubes, cleared when the floor changes
#[derive(Component)]
pub struct FloorCellMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Empty,
    RoomFloor,
    HallwayFloor,
    Wall,
    Ceiling,
    Door,
    Exit,
    StairsUp,
    StairsDown,
}

impl CellKind {
    pub fn glyph(self) -> char {
        match self {
            CellKind::Empty => ' ',
            CellKind::RoomFloor => '.',
            CellKind::HallwayFloor => ':',
            CellKind::Wall => '#',
            CellKind::Ceiling => '^',
            CellKind::Door => 'D',
            CellKind::Exit => '+',
            CellKind::StairsUp => '<',
            CellKind::StairsDown => '>',
        }
    }
}

/// What a cell shows as, walls and ceilings first, then room markings
pub fn classify(floor: &FloorContext, cell: GridPos) -> CellKind {
    let grid = floor.grid();
    if grid.is_wall(cell) {
        return CellKind::Wall;
    }
    if grid.is_ceiling(cell) {
        return CellKind::Ceiling;
    }
    if !grid.is_floor(cell) {
        return CellKind::Empty;
    }

    let layout = floor.layout();
    let Some(room) = layout.rooms.iter().find(|r| r.rect().contains(cell)) else {
        return CellKind::HallwayFloor;
    };
    if room.door_position == cell {
        return CellKind::Door;
    }
    if room.exits.iter().any(|d| d.position == cell) {
        return CellKind::Exit;
    }
    let local = GridPos::new(cell.x - room.position.x, cell.y - room.position.y);
    if room.stairs.up_stairs_location == Some(local) {
        return CellKind::StairsUp;
    }
    if room.stairs.down_stairs_location == Some(local) {
        return CellKind::StairsDown;
    }
    CellKind::RoomFloor
}

/// One line per grid row, north at the top, trailing blanks trimmed
pub fn render_ascii(floor: &FloorContext) -> String {
    let Some((lo, hi)) = floor.grid().extent() else {
        return String::new();
    };
    let mut out = String::new();
    for y in (lo.y..=hi.y).rev() {
        let row: String = (lo.x..=hi.x)
            .map(|x| classify(floor, GridPos::new(x, y)).glyph())
            .collect();
        out.push_str(row.trim_end());
        out.push('\n');
    }
    out
}

fn cell_color(kind: CellKind) -> Color {
    match kind {
        CellKind::Empty => Color::BLACK,
        CellKind::RoomFloor => Color::srgb(0.6, 0.6, 0.6),
        CellKind::HallwayFloor => Color::srgb(0.5, 0.5, 0.45),
        CellKind::Wall => Color::srgb(0.3, 0.3, 0.35),
        CellKind::Ceiling => Color::srgb(0.25, 0.2, 0.3),
        CellKind::Door => Color::srgb(0.6, 0.4, 0.2),
        CellKind::Exit => Color::srgb(0.7, 0.5, 0.3),
        CellKind::StairsUp => Color::srgb(0.2, 0.8, 0.2),
        CellKind::StairsDown => Color::srgb(0.2, 0.2, 0.8),
    }
}

/// Height of the debug cube and the Y of its base
fn cell_extent(kind: CellKind, floor: &FloorContext) -> (f32, f32) {
    let c = floor.collision().config();
    match kind {
        CellKind::Wall => (c.ceiling_height, c.floor_top),
        CellKind::Ceiling => (c.ceiling_thickness, c.ceiling_height),
        CellKind::StairsUp => (0.8, c.floor_top),
        _ => (0.1, c.floor_top - 0.1),
    }
}

fn render_floor_cells(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut ready: EventReader<FloorReadyEvent>,
    floor: Option<Res<FloorContext>>,
    existing: Query<Entity, With<FloorCellMarker>>,
) {
    if ready.read().last().is_none() {
        return;
    }
    let Some(floor) = floor else {
        return;
    };
    for entity in &existing {
        commands.entity(entity).despawn();
    }

    let Some((lo, hi)) = floor.grid().extent() else {
        return;
    };
    let size = floor.collision().config().cell_size;
    let mut spawned = 0usize;
    for y in lo.y..=hi.y {
        for x in lo.x..=hi.x {
            let kind = classify(&floor, GridPos::new(x, y));
            if kind == CellKind::Empty {
                continue;
            }
            let (height, base) = cell_extent(kind, &floor);
            let pos = Vec3::new(
                (x as f32 + 0.5) * size,
                base + height / 2.0,
                (y as f32 + 0.5) * size,
            );
            commands.spawn((
                Mesh3d(meshes.add(Cuboid::new(size * 0.95, height, size * 0.95))),
                MeshMaterial3d(materials.add(StandardMaterial {
                    base_color: cell_color(kind),
                    perceptual_roughness: 0.8,
                    ..default()
                })),
                Transform::from_translation(pos),
                FloorCellMarker,
            ));
            spawned += 1;
        }
    }

    info!(floor = %floor.source_id(), cells = spawned, "rendered debug floor");
}
