//! Keyboard/mouse sampling into per-frame move intents.

use crate::game::MoveIntent;
use macroquad::prelude::*;

const MOUSE_SENSITIVITY: f32 = 0.002;

pub struct InputManager {
    /// `None` until the first sample; construction must not touch the
    /// devices, which only exist once the window is up.
    last_mouse_x: Option<f32>,
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputManager {
    pub fn new() -> Self {
        Self { last_mouse_x: None }
    }

    /// Samples the devices once. Called exactly once per rendered frame,
    /// inside the window's frame loop. The first sample anchors the mouse
    /// and reports no yaw.
    pub fn sample(&mut self) -> MoveIntent {
        let (mouse_x, _) = mouse_position();
        let yaw_delta = match self.last_mouse_x {
            Some(last) => (last - mouse_x) * MOUSE_SENSITIVITY,
            None => 0.0,
        };
        self.last_mouse_x = Some(mouse_x);

        MoveIntent {
            forward: is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
            backward: is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
            left: is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
            right: is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
            sprint: is_key_down(KeyCode::LeftShift),
            jump: is_key_down(KeyCode::Space),
            yaw_delta,
        }
    }
}
