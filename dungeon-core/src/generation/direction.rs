//! Cardinal direction math for layout placement.
//!
//! Layout space is a 2D integer grid: +x is east, +y is north.

use serde::{Deserialize, Serialize};

/// Integer cell coordinate in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const ORIGIN: GridPos = GridPos { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Move `n` cells along `direction`.
    pub fn offset(self, direction: Direction, n: i32) -> Self {
        let step = direction.step();
        Self {
            x: self.x + step.x * n,
            y: self.y + step.y * n,
        }
    }
}

impl std::ops::Add for GridPos {
    type Output = GridPos;

    fn add(self, rhs: GridPos) -> GridPos {
        GridPos::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::fmt::Display for GridPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Absolute cardinal direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

/// Turn relative to a facing direction, as declared on a DAG node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelativeDirection {
    Left,
    Right,
    #[default]
    Center,
}

/// Wall of a room rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorSide {
    Top,
    Right,
    Bottom,
    Left,
}

impl Direction {
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
        ]
    }

    /// Absolute direction after turning `relative` while facing `self`.
    /// Left of north is west, but left of east is north.
    pub fn turn(self, relative: RelativeDirection) -> Direction {
        use Direction::*;
        use RelativeDirection::{Center, Left, Right};
        match (self, relative) {
            (North, Left) => West,
            (North, Right) => East,
            (North, Center) => North,
            (South, Left) => East,
            (South, Right) => West,
            (South, Center) => South,
            (East, Left) => North,
            (East, Right) => South,
            (East, Center) => East,
            (West, Left) => South,
            (West, Right) => North,
            (West, Center) => West,
        }
    }

    /// Unit step vector
    pub fn step(self) -> GridPos {
        match self {
            Direction::North => GridPos::new(0, 1),
            Direction::South => GridPos::new(0, -1),
            Direction::East => GridPos::new(1, 0),
            Direction::West => GridPos::new(-1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Wall of a room that faces this direction
    pub fn door_side(self) -> DoorSide {
        match self {
            Direction::North => DoorSide::Top,
            Direction::South => DoorSide::Bottom,
            Direction::East => DoorSide::Right,
            Direction::West => DoorSide::Left,
        }
    }

    /// True for north/south (travel along the y axis)
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }
}

/// Free-function form of [`Direction::turn`].
pub fn absolute_direction(facing: Direction, relative: RelativeDirection) -> Direction {
    facing.turn(relative)
}

/// Free-function form of [`Direction::step`].
pub fn step_vector(direction: Direction) -> GridPos {
    direction.step()
}

/// Free-function form of [`Direction::opposite`].
pub fn opposite(direction: Direction) -> Direction {
    direction.opposite()
}
