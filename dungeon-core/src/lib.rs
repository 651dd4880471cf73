//! Dungeon Core Library
//!
//! Client-side core for the dungeon crawler:
//! - Deterministic placement of server-supplied room/hallway DAGs
//! - Seeded fallback floors when a DAG cannot be placed
//! - Grid occupancy index (floor, wall and ceiling cells)
//! - Grid collision: penetration resolution, wall sliding, swept movement
//! - Per-floor context, Bevy plugins for floor loading and agent movement
//! - FFI bridge for engine integration

pub mod bridge;
pub mod collision;
pub mod config;
pub mod constants;
pub mod floor;
pub mod generation;
pub mod grid;
pub mod logging;
pub mod movement;
pub mod visualization;
