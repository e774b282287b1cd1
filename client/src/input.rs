//! Local player movement sampling
//!
//! Kinematic WASD movement on the ground plane. The sampled position is what
//! the periodic position report sends to the server; no physics simulation
//! runs here.

use macroquad::prelude::{is_key_down, KeyCode};
use shared::{
    Color, Vec3, CAUGHT_COLOR, DEFAULT_COLOR, FIELD_HALF_DEPTH, FIELD_HALF_WIDTH, GROUND_Y,
    PLAYER_SPEED, SPAWN_X,
};

/// Locally controlled player state.
pub struct LocalPlayer {
    pub position: Vec3,
    moving: bool,
}

impl LocalPlayer {
    /// Spawns at the starting line with a randomized depth offset so players
    /// don't stack on one another.
    pub fn new(spawn_z: f32) -> Self {
        Self {
            position: Vec3::new(SPAWN_X, GROUND_Y, spawn_z),
            moving: false,
        }
    }

    /// Reads the current movement keys. X runs toward the sentinel, Z across
    /// the field.
    pub fn sample_direction() -> (f32, f32) {
        let mut dx = 0.0;
        let mut dz = 0.0;
        if is_key_down(KeyCode::W) {
            dx += 1.0;
        }
        if is_key_down(KeyCode::S) {
            dx -= 1.0;
        }
        if is_key_down(KeyCode::A) {
            dz += 1.0;
        }
        if is_key_down(KeyCode::D) {
            dz -= 1.0;
        }
        (dx, dz)
    }

    /// Applies one tick of movement, clamped to the field bounds.
    pub fn apply_direction(&mut self, direction: (f32, f32), dt: f32) {
        let (dx, dz) = direction;
        let magnitude = (dx * dx + dz * dz).sqrt();
        self.moving = magnitude > 0.0;

        if self.moving {
            self.position.x += dx / magnitude * PLAYER_SPEED * dt;
            self.position.z += dz / magnitude * PLAYER_SPEED * dt;

            self.position.x = self.position.x.clamp(-FIELD_HALF_WIDTH, FIELD_HALF_WIDTH);
            self.position.z = self.position.z.clamp(-FIELD_HALF_DEPTH, FIELD_HALF_DEPTH);
        }
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Color included in position reports: caught-red while moving under the
    /// sentinel's gaze, the base color otherwise.
    pub fn report_color(&self, sentinel_facing: bool) -> Color {
        if sentinel_facing && self.moving {
            CAUGHT_COLOR
        } else {
            DEFAULT_COLOR
        }
    }
}
