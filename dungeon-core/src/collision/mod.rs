//! Grid-cell collision for a single agent box.
//!
//! Cell `(i, j)` of the [`GridIndex`] covers `[i*cs, (i+1)*cs)` on world X
//! and `[j*cs, (j+1)*cs)` on world Z. Walls extend infinitely up and down;
//! ceiling cells are slabs starting at `ceiling_height`.
//!
//! The resolver never mutates: every query takes `&self`, so one snapshot can
//! serve any number of agents at once (see [`CollisionResolver::sweep_many`]).

use bevy::math::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::constants::*;
use crate::generation::direction::GridPos;
use crate::grid::GridIndex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// World units per grid cell
    pub cell_size: f32,
    pub agent_width_fraction: f32,
    pub agent_height: f32,
    pub contact_epsilon: f32,
    pub push_buffer: f32,
    pub ground_epsilon: f32,
    pub floor_top: f32,
    pub ceiling_height: f32,
    pub ceiling_thickness: f32,
    pub max_sweep_samples: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            cell_size: CELL_SIZE,
            agent_width_fraction: AGENT_WIDTH_FRACTION,
            agent_height: AGENT_HEIGHT,
            contact_epsilon: CONTACT_EPSILON,
            push_buffer: PUSH_BUFFER,
            ground_epsilon: GROUND_EPSILON_FRACTION * CELL_SIZE,
            floor_top: FLOOR_TOP,
            ceiling_height: CEILING_HEIGHT,
            ceiling_thickness: CEILING_THICKNESS,
            max_sweep_samples: MAX_SWEEP_SAMPLES,
        }
    }
}

impl CollisionConfig {
    pub fn agent_width(&self) -> f32 {
        self.agent_width_fraction * self.cell_size
    }

    pub fn half_width(&self) -> f32 {
        self.agent_width() * 0.5
    }
}

/// Axis-aligned box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Agent box: centred horizontally on `pos`, feet at `pos.y`
    pub fn agent(pos: Vec3, config: &CollisionConfig) -> Self {
        let half = config.half_width();
        Self {
            min: Vec3::new(pos.x - half, pos.y, pos.z - half),
            max: Vec3::new(pos.x + half, pos.y + config.agent_height, pos.z + half),
        }
    }

    /// Overlap length on X and Z against a grid cell (negative when apart)
    fn horizontal_overlap(&self, cell: GridPos, cell_size: f32) -> (f32, f32) {
        let (x0, z0) = (cell.x as f32 * cell_size, cell.y as f32 * cell_size);
        let ox = self.max.x.min(x0 + cell_size) - self.min.x.max(x0);
        let oz = self.max.z.min(z0 + cell_size) - self.min.z.max(z0);
        (ox, oz)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CollisionAxis {
    #[default]
    None = 0,
    X = 1,
    Y = 2,
    Z = 3,
}

impl CollisionAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    pub collided: bool,
    pub corrected: Vec3,
    pub axis: CollisionAxis,
}

impl StepResult {
    fn clear(pos: Vec3) -> Self {
        Self {
            collided: false,
            corrected: pos,
            axis: CollisionAxis::None,
        }
    }
}

/// Smallest move that takes the box off one wall face
#[derive(Debug, Clone, Copy)]
struct Push {
    axis: CollisionAxis,
    target: f32,
    depth: f32,
}

/// First contact along a swept segment: distance travelled and the face axis
#[derive(Debug, Clone, Copy)]
struct SweepHit {
    distance: f32,
    axis: CollisionAxis,
}

/// Entry/exit distances of a ray against the open interval `(lo, hi)` on one
/// axis. `None` if a ray parallel to the axis starts outside it.
fn slab(origin: f32, dir: f32, lo: f32, hi: f32) -> Option<(f32, f32)> {
    if dir.abs() <= f32::EPSILON {
        return (origin > lo && origin < hi).then_some((f32::NEG_INFINITY, f32::INFINITY));
    }
    let a = (lo - origin) / dir;
    let b = (hi - origin) / dir;
    Some((a.min(b), a.max(b)))
}

#[derive(Debug, Clone, Default)]
pub struct CollisionResolver {
    grid: GridIndex,
    config: CollisionConfig,
}

impl CollisionResolver {
    pub fn new(grid: GridIndex, config: CollisionConfig) -> Self {
        Self { grid, config }
    }

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    fn cell_at(&self, pos: Vec3) -> GridPos {
        GridIndex::cell_at(pos.x, pos.z, self.config.cell_size)
    }

    /// Top of the floor cell under `pos`, or `0.0` off the floor
    pub fn floor_height_at(&self, pos: Vec3) -> f32 {
        self.grid.floor_top(self.cell_at(pos)).unwrap_or(0.0)
    }

    pub fn is_on_ground(&self, pos: Vec3) -> bool {
        (pos.y - self.floor_height_at(pos)).abs() < self.config.ground_epsilon
    }

    /// Wall cells the box at `pos` truly intersects
    fn wall_contacts(&self, pos: Vec3) -> Vec<GridPos> {
        let cs = self.config.cell_size;
        let eps = self.config.contact_epsilon;
        let bbox = Aabb::agent(pos, &self.config);
        let lo = GridIndex::cell_at(bbox.min.x, bbox.min.z, cs);
        let hi = GridIndex::cell_at(bbox.max.x, bbox.max.z, cs);

        let mut contacts = Vec::new();
        for j in lo.y..=hi.y {
            for i in lo.x..=hi.x {
                let cell = GridPos::new(i, j);
                if !self.grid.is_wall(cell) {
                    continue;
                }
                let (ox, oz) = bbox.horizontal_overlap(cell, cs);
                if ox > eps && oz > eps {
                    contacts.push(cell);
                }
            }
        }
        contacts
    }

    fn intersects_ceiling(&self, pos: Vec3) -> bool {
        if !self.grid.is_ceiling(self.cell_at(pos)) {
            return false;
        }
        let eps = self.config.contact_epsilon;
        let underside = self.config.ceiling_height;
        let top = underside + self.config.ceiling_thickness;
        pos.y + self.config.agent_height > underside + eps && pos.y < top - eps
    }

    /// True if the agent box at `pos` intersects any wall or ceiling
    pub fn is_blocked(&self, pos: Vec3) -> bool {
        !self.wall_contacts(pos).is_empty() || self.intersects_ceiling(pos)
    }

    /// Minimum-depth push over the exposed faces of every contacted wall.
    /// The face is picked from the side of the cell `current` is on.
    fn shallowest_push(&self, current: Vec3, pos: Vec3, contacts: &[GridPos]) -> Option<Push> {
        let cs = self.config.cell_size;
        let half = self.config.half_width();
        let buffer = self.config.push_buffer;

        let mut best: Option<Push> = None;
        let mut consider = |push: Push| {
            if best.map_or(true, |b| push.depth < b.depth) {
                best = Some(push);
            }
        };

        for &cell in contacts {
            let x0 = cell.x as f32 * cs;
            let z0 = cell.y as f32 * cs;

            let (target_x, neighbour_x) = if current.x < x0 + cs * 0.5 {
                (x0 - half - buffer, GridPos::new(cell.x - 1, cell.y))
            } else {
                (x0 + cs + half + buffer, GridPos::new(cell.x + 1, cell.y))
            };
            if !self.grid.is_wall(neighbour_x) {
                consider(Push {
                    axis: CollisionAxis::X,
                    target: target_x,
                    depth: (target_x - pos.x).abs(),
                });
            }

            let (target_z, neighbour_z) = if current.z < z0 + cs * 0.5 {
                (z0 - half - buffer, GridPos::new(cell.x, cell.y - 1))
            } else {
                (z0 + cs + half + buffer, GridPos::new(cell.x, cell.y + 1))
            };
            if !self.grid.is_wall(neighbour_z) {
                consider(Push {
                    axis: CollisionAxis::Z,
                    target: target_z,
                    depth: (target_z - pos.z).abs(),
                });
            }
        }
        best
    }

    /// Resolve one discrete step. Walls push the box out along the shallowest
    /// exposed face, leaving the other axis alone so the agent slides; a
    /// ceiling clamps Y below its underside.
    pub fn resolve_step(&self, current: Vec3, proposed: Vec3) -> StepResult {
        let mut pos = proposed;
        let mut axis = CollisionAxis::None;

        // One pass per contacted face: pushing off one wall of an inside
        // corner can land the box in its neighbour, which the next pass clears
        for _ in 0..MAX_RESOLVE_PASSES {
            let contacts = self.wall_contacts(pos);
            if contacts.is_empty() {
                break;
            }
            let Some(push) = self.shallowest_push(current, pos, &contacts) else {
                break;
            };
            match push.axis {
                CollisionAxis::X => pos.x = push.target,
                CollisionAxis::Z => pos.z = push.target,
                CollisionAxis::Y | CollisionAxis::None => {}
            }
            if axis == CollisionAxis::None {
                axis = push.axis;
            }
            trace!(axis = push.axis.as_str(), depth = push.depth, "wall push");
        }

        if !self.wall_contacts(pos).is_empty() {
            debug!(
                x = proposed.x,
                z = proposed.z,
                "agent box could not be cleared, keeping current position"
            );
            return StepResult {
                collided: true,
                corrected: current,
                axis: if axis == CollisionAxis::None {
                    CollisionAxis::X
                } else {
                    axis
                },
            };
        }

        if self.intersects_ceiling(pos) {
            pos.y = self.config.ceiling_height - self.config.agent_height - self.config.push_buffer;
            if axis == CollisionAxis::None {
                axis = CollisionAxis::Y;
            }
        }

        if axis == CollisionAxis::None {
            StepResult::clear(proposed)
        } else {
            StepResult {
                collided: true,
                corrected: pos,
                axis,
            }
        }
    }

    /// Axis of the obstacle met when moving from clear `from` into `blocked`
    fn contact_axis(&self, from: Vec3, blocked: Vec3) -> CollisionAxis {
        let contacts = self.wall_contacts(blocked);
        if contacts.is_empty() {
            return CollisionAxis::Y;
        }
        self.shallowest_push(from, blocked, &contacts)
            .map(|p| p.axis)
            .unwrap_or_else(|| {
                let d = blocked - from;
                if d.x.abs() >= d.z.abs() {
                    CollisionAxis::X
                } else {
                    CollisionAxis::Z
                }
            })
    }

    /// Samples a sweep of `length` takes, or `None` when the cap would space
    /// them wider than a fifth of a cell and the sweep is traced exactly instead.
    pub fn sweep_samples(&self, length: f32) -> Option<usize> {
        let cell_step = SWEEP_CELL_FRACTION * self.config.cell_size;
        let step = cell_step.min(SWEEP_PATH_FRACTION * length);
        let wanted = ((length / step).ceil() as usize).max(MIN_SWEEP_SAMPLES);
        let cap = self.config.max_sweep_samples.max(MIN_SWEEP_SAMPLES);
        if wanted <= cap || length / cap as f32 <= cell_step {
            Some(wanted.min(cap))
        } else {
            None
        }
    }

    /// Continuous test from `from` to `to`. Samples the path at no more than
    /// a fifth of a cell apart so a one-cell wall cannot be skipped, and stops
    /// at the last clear sample. Paths too long for the sample budget are
    /// traced against every wall and ceiling cell instead.
    pub fn sweep_step(&self, from: Vec3, to: Vec3) -> StepResult {
        let delta = to - from;
        let length = delta.length();
        if length <= f32::EPSILON {
            return self.resolve_step(from, to);
        }
        let Some(samples) = self.sweep_samples(length) else {
            return self.trace_step(from, to);
        };

        let mut last_clear = from;
        for k in 1..=samples {
            let sample = from + delta * (k as f32 / samples as f32);
            if !self.is_blocked(sample) {
                last_clear = sample;
                continue;
            }

            let axis = self.contact_axis(last_clear, sample);
            let corrected = if self.is_blocked(last_clear) {
                self.resolve_step(from, last_clear).corrected
            } else {
                last_clear
            };
            trace!(sample = k, samples, axis = axis.as_str(), "sweep hit");
            return StepResult {
                collided: true,
                corrected,
                axis,
            };
        }
        StepResult::clear(to)
    }

    /// Exact sweep for long paths: nearest entry of the agent's feet point
    /// into any wall cell grown by the half width, or into the band under a
    /// ceiling cell where the head would hit it.
    fn trace_step(&self, from: Vec3, to: Vec3) -> StepResult {
        if self.is_blocked(from) {
            let mut result = self.resolve_step(from, from);
            result.collided = true;
            return result;
        }

        let delta = to - from;
        let length = delta.length();
        let dir = delta / length;
        let cs = self.config.cell_size;
        let eps = self.config.contact_epsilon;
        let half = self.config.half_width();

        let walls = self.grid.walls().map(|cell| (cell, half - eps, None::<(f32, f32)>));
        let underside = self.config.ceiling_height;
        let band = (
            underside - self.config.agent_height + eps,
            underside + self.config.ceiling_thickness - eps,
        );
        let ceilings = self.grid.ceilings().map(|cell| (cell, 0.0, Some(band)));

        let mut nearest: Option<SweepHit> = None;
        for (cell, grow, vertical) in walls.chain(ceilings) {
            let (x0, z0) = (cell.x as f32 * cs, cell.y as f32 * cs);
            let Some(x) = slab(from.x, dir.x, x0 - grow, x0 + cs + grow) else {
                continue;
            };
            let Some(z) = slab(from.z, dir.z, z0 - grow, z0 + cs + grow) else {
                continue;
            };
            let y = match vertical {
                Some((lo, hi)) => match slab(from.y, dir.y, lo, hi) {
                    Some(y) => y,
                    None => continue,
                },
                None => (f32::NEG_INFINITY, f32::INFINITY),
            };

            let (enter, axis) = [(x.0, CollisionAxis::X), (y.0, CollisionAxis::Y), (z.0, CollisionAxis::Z)]
                .into_iter()
                .fold((f32::NEG_INFINITY, CollisionAxis::None), |best, c| {
                    if c.0 > best.0 {
                        c
                    } else {
                        best
                    }
                });
            let exit = x.1.min(y.1).min(z.1);
            if enter >= exit || enter < 0.0 || enter > length {
                continue;
            }
            if nearest.map_or(true, |n| enter < n.distance) {
                nearest = Some(SweepHit { distance: enter, axis });
            }
        }

        let Some(hit) = nearest else {
            return StepResult::clear(to);
        };
        let mut corrected = from + dir * (hit.distance - self.config.push_buffer).max(0.0);
        if self.is_blocked(corrected) {
            corrected = self.resolve_step(from, corrected).corrected;
        }
        debug!(
            distance = hit.distance,
            length,
            axis = hit.axis.as_str(),
            "long sweep traced to first contact"
        );
        StepResult {
            collided: true,
            corrected,
            axis: hit.axis,
        }
    }

    /// Short moves resolve in place (sliding); anything longer than half the
    /// agent width is swept.
    pub fn move_agent(&self, current: Vec3, proposed: Vec3) -> StepResult {
        if (proposed - current).length() <= self.config.half_width() {
            self.resolve_step(current, proposed)
        } else {
            self.sweep_step(current, proposed)
        }
    }

    /// Sweep every `(from, to)` pair in parallel against this snapshot
    pub fn sweep_many(&self, moves: &[(Vec3, Vec3)]) -> Vec<StepResult> {
        moves
            .par_iter()
            .map(|&(from, to)| self.sweep_step(from, to))
            .collect()
    }
}
