use bevy::prelude::*;

use crate::collision::{CollisionAxis, CollisionResolver};
use crate::constants::{GRAVITY, TERMINAL_VELOCITY};
use crate::floor::FloorContext;
use crate::generation::floor_manager::FloorLoadSet;

pub struct MovementPlugin;

impl Plugin for MovementPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (apply_gravity, process_movement_input, apply_dash, step_agent)
                .chain()
                .after(FloorLoadSet),
        );
    }
}

/// Movement capabilities for any entity
#[derive(Component, Debug)]
pub struct MovementState {
    pub velocity: Vec3,
    pub grounded: bool,
    pub move_speed: f32,
    pub jump_force: f32,
    pub gravity_scale: f32,
    pub dash_cooldown: f32,
    pub dash_timer: f32,
    pub facing: Vec3,
}

impl Default for MovementState {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            grounded: false,
            move_speed: 8.0,
            jump_force: 12.0,
            gravity_scale: 1.0,
            dash_cooldown: 0.0,
            dash_timer: 0.0,
            facing: Vec3::NEG_Z,
        }
    }
}

/// Input vector from player or AI controller
#[derive(Component, Debug, Default)]
pub struct MovementInput {
    pub direction: Vec2, // normalized XZ movement
    pub jump: bool,
    pub dash: bool,
    pub interact: bool,
}

#[derive(Component, Debug)]
pub struct DashAbility {
    pub speed: f32,
    pub duration: f32,
    pub cooldown: f32,
}

impl Default for DashAbility {
    fn default() -> Self {
        Self {
            speed: 25.0,
            duration: 0.2,
            cooldown: 1.5,
        }
    }
}

fn apply_gravity(time: Res<Time>, mut query: Query<&mut MovementState>) {
    let dt = time.delta_secs();
    for mut state in &mut query {
        if !state.grounded {
            state.velocity.y += GRAVITY * state.gravity_scale * dt;
            state.velocity.y = state.velocity.y.max(TERMINAL_VELOCITY);
        }
    }
}

fn process_movement_input(mut query: Query<(&mut MovementState, &MovementInput)>) {
    for (mut state, input) in &mut query {
        let move_dir = Vec3::new(input.direction.x, 0.0, input.direction.y);
        state.velocity.x = move_dir.x * state.move_speed;
        state.velocity.z = move_dir.z * state.move_speed;

        if move_dir.length_squared() > 0.01 {
            state.facing = move_dir.normalize();
        }

        if input.jump && state.grounded {
            state.velocity.y = state.jump_force;
            state.grounded = false;
        }
    }
}

fn apply_dash(
    time: Res<Time>,
    mut query: Query<(&mut MovementState, &MovementInput, &DashAbility)>,
) {
    let dt = time.delta_secs();
    for (mut state, input, dash) in &mut query {
        state.dash_cooldown = (state.dash_cooldown - dt).max(0.0);
        state.dash_timer = (state.dash_timer - dt).max(0.0);

        if input.dash && state.dash_cooldown <= 0.0 && state.dash_timer <= 0.0 {
            state.dash_timer = dash.duration;
            state.dash_cooldown = dash.cooldown;
        }

        if state.dash_timer > 0.0 {
            let dash_dir = if state.facing.length_squared() > 0.01 {
                state.facing.normalize()
            } else {
                Vec3::NEG_Z
            };
            // Horizontal only, gravity keeps acting
            state.velocity.x = dash_dir.x * dash.speed;
            state.velocity.z = dash_dir.z * dash.speed;
        }
    }
}

/// Advance one agent by `dt` against the floor's collision snapshot (or the
/// plane y = 0 when no floor is loaded). Returns the new feet position.
pub fn advance_agent(
    resolver: Option<&CollisionResolver>,
    state: &mut MovementState,
    position: Vec3,
    dt: f32,
) -> Vec3 {
    let proposed = position + state.velocity * dt;

    let (mut next, ground, epsilon) = match resolver {
        Some(resolver) => {
            let step = resolver.move_agent(position, proposed);
            if step.collided {
                match step.axis {
                    CollisionAxis::X => state.velocity.x = 0.0,
                    CollisionAxis::Z => state.velocity.z = 0.0,
                    CollisionAxis::Y => state.velocity.y = state.velocity.y.min(0.0),
                    CollisionAxis::None => {}
                }
            }
            (
                step.corrected,
                resolver.floor_height_at(step.corrected),
                resolver.config().ground_epsilon,
            )
        }
        None => (proposed, 0.0, 0.0),
    };

    let landing = next.y <= ground || (next.y - ground < epsilon && state.velocity.y <= 0.0);
    if landing {
        next.y = ground;
        state.velocity.y = state.velocity.y.max(0.0);
        state.grounded = true;
    } else {
        state.grounded = false;
    }
    next
}

fn step_agent(
    time: Res<Time>,
    floor: Option<Res<FloorContext>>,
    mut query: Query<(&mut MovementState, &mut Transform)>,
) {
    let dt = time.delta_secs();
    let resolver = floor.as_deref().map(FloorContext::collision);
    for (mut state, mut transform) in &mut query {
        transform.translation = advance_agent(resolver, &mut state, transform.translation, dt);
    }
}
