use crate::cache::RemoteCache;
use macroquad::prelude::*;
use shared::{Vec3, FIELD_HALF_DEPTH, FIELD_HALF_WIDTH, PLAYER_SIZE, SENTINEL_X};

/// Top-down view of the field: x runs left to right toward the sentinel,
/// z runs down the screen.
pub struct Renderer {
    width: f32,
    height: f32,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Renderer {
            width: width as f32,
            height: height as f32,
        }
    }

    fn to_screen(&self, position: Vec3) -> (f32, f32) {
        let sx = (position.x + FIELD_HALF_WIDTH) / (FIELD_HALF_WIDTH * 2.0) * self.width;
        let sy = (FIELD_HALF_DEPTH - position.z) / (FIELD_HALF_DEPTH * 2.0) * self.height;
        (sx, sy)
    }

    fn player_px(&self) -> f32 {
        PLAYER_SIZE / (FIELD_HALF_WIDTH * 2.0) * self.width
    }

    pub fn render(
        &mut self,
        local_position: Vec3,
        local_color: shared::Color,
        remotes: &RemoteCache,
        sentinel_angle: f32,
        connected: bool,
    ) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        self.draw_field();
        self.draw_sentinel(sentinel_angle);

        for (_, entry) in remotes.iter() {
            self.draw_player(entry.proxy, entry.color);
        }
        self.draw_player(local_position, local_color);

        self.draw_ui(connected, remotes.len() + 1);
    }

    fn draw_field(&mut self) {
        draw_rectangle(
            0.0,
            0.0,
            self.width,
            self.height,
            Color::from_rgba(48, 58, 72, 255),
        );

        // Starting line on the left, sentinel line on the right.
        let (start_x, _) = self.to_screen(Vec3::new(shared::SPAWN_X, 0.0, 0.0));
        let (sentinel_x, _) = self.to_screen(Vec3::new(SENTINEL_X, 0.0, 0.0));
        draw_line(start_x, 0.0, start_x, self.height, 2.0, GRAY);
        draw_line(sentinel_x, 0.0, sentinel_x, self.height, 2.0, GRAY);
    }

    fn draw_player(&mut self, position: Vec3, color: shared::Color) {
        let (sx, sy) = self.to_screen(position);
        let size = self.player_px();

        draw_rectangle(
            sx - size / 2.0,
            sy - size / 2.0,
            size,
            size,
            Color::from_rgba(color.r, color.g, color.b, 255),
        );
        draw_rectangle_lines(sx - size / 2.0, sy - size / 2.0, size, size, 1.0, WHITE);
    }

    /// The sentinel is a box whose red face points along its yaw: angle 0
    /// looks down the field at the players, pi looks away.
    fn draw_sentinel(&mut self, angle: f32) {
        let (sx, sy) = self.to_screen(Vec3::new(SENTINEL_X, 0.0, 0.0));
        let size = self.player_px() * 4.0;

        draw_rectangle(
            sx - size / 2.0,
            sy - size / 2.0,
            size,
            size,
            Color::from_rgba(128, 204, 153, 255),
        );

        // Face direction indicator; -cos(angle) points toward the players
        // (negative screen x) when facing.
        let face_len = size;
        let fx = sx + face_len * -angle.cos();
        let fy = sy + face_len * angle.sin();
        draw_line(sx, sy, fx, fy, 3.0, RED);
    }

    fn draw_ui(&mut self, connected: bool, participant_count: usize) {
        let connection_color = if connected { GREEN } else { RED };
        draw_rectangle(10.0, 10.0, 8.0, 8.0, connection_color);
        draw_text("CON", 22.0, 18.0, 12.0, WHITE);

        let count_text = format!("{} players", participant_count);
        draw_text(&count_text, 10.0, 34.0, 12.0, WHITE);
    }
}
