//! Centralized tuning constants for the dungeon core.
//!
//! These are the defaults behind `DungeonConfig`; per-floor values come from
//! configuration, not from these constants directly.

// =====================================================
// Layout
// =====================================================

/// Largest accepted room side or hallway length, in cells
pub const MAX_NODE_EXTENT: u32 = 4096;

// =====================================================
// Grid
// =====================================================

/// World units per grid cell
pub const CELL_SIZE: f32 = 2.0;

/// Top surface of rasterized floor cells
pub const FLOOR_TOP: f32 = 0.0;

/// Underside of ceiling cells (matches rendered wall height)
pub const CEILING_HEIGHT: f32 = 3.0;

/// Vertical extent of a ceiling slab
pub const CEILING_THICKNESS: f32 = 0.5;

// =====================================================
// Agent box
// =====================================================

/// Agent box width and depth as a fraction of one cell (0.8 units at 2.0 cells)
pub const AGENT_WIDTH_FRACTION: f32 = 0.4;

/// Agent box height (1.8m capsule)
pub const AGENT_HEIGHT: f32 = 1.8;

// =====================================================
// Collision
// =====================================================

/// Overlap below this is treated as touching, not intersecting
pub const CONTACT_EPSILON: f32 = 1e-4;

/// Gap left between a resolved agent box and the face it was pushed to
pub const PUSH_BUFFER: f32 = 0.01;

/// Ground tolerance as a fraction of one cell
pub const GROUND_EPSILON_FRACTION: f32 = 0.1;

/// Resolution passes per discrete step (corners need two)
pub const MAX_RESOLVE_PASSES: usize = 4;

/// Sweep step as a fraction of one cell
pub const SWEEP_CELL_FRACTION: f32 = 0.2;

/// Sweep step as a fraction of the path length
pub const SWEEP_PATH_FRACTION: f32 = 0.1;

/// Minimum samples along any sweep
pub const MIN_SWEEP_SAMPLES: usize = 5;

/// Upper bound on sweep samples for teleport-sized displacements
pub const MAX_SWEEP_SAMPLES: usize = 10_000;

// =====================================================
// Movement
// =====================================================

pub const GRAVITY: f32 = -20.0;
pub const TERMINAL_VELOCITY: f32 = -50.0;
