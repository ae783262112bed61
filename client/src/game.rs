//! Local player simulation: a single rigid body with gravity, a ground
//! plane, and damped horizontal movement. The sync core only reads the
//! resulting pose; everything here is single-actor and synchronous.

use shared::{Vec3, GRAVITY, JUMP_VELOCITY, LINEAR_DAMPING, PLAYER_RADIUS, SPAWN_POSITION};

pub const WALK_SPEED: f32 = 2.0;
pub const RUN_SPEED: f32 = 6.0;

/// One tick of player intent, sampled from the input devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveIntent {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub sprint: bool,
    pub jump: bool,
    pub yaw_delta: f32,
}

/// The local participant's rigid body.
#[derive(Debug)]
pub struct PlayerBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub on_ground: bool,
}

impl Default for PlayerBody {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerBody {
    /// Spawns airborne at the shared spawn point and falls to the ground.
    pub fn new() -> Self {
        Self {
            position: SPAWN_POSITION,
            velocity: Vec3::ZERO,
            yaw: 0.0,
            on_ground: false,
        }
    }

    pub fn apply_intent(&mut self, intent: &MoveIntent) {
        self.yaw += intent.yaw_delta;

        let mut dx = 0.0;
        let mut dz = 0.0;
        if intent.forward {
            dz += 1.0;
        }
        if intent.backward {
            dz -= 1.0;
        }
        if intent.left {
            dx -= 1.0;
        }
        if intent.right {
            dx += 1.0;
        }

        if dx != 0.0 || dz != 0.0 {
            let len = ((dx * dx + dz * dz) as f32).sqrt();
            let speed = if intent.sprint { RUN_SPEED } else { WALK_SPEED };
            let (sin, cos) = self.yaw.sin_cos();
            // Rotate the local move direction into world space.
            let wx = (dx * cos + dz * sin) / len;
            let wz = (dz * cos - dx * sin) / len;
            self.velocity.x = wx * speed;
            self.velocity.z = wz * speed;
        }

        if intent.jump && self.on_ground {
            self.velocity.y = JUMP_VELOCITY;
            self.on_ground = false;
        }
    }

    pub fn step(&mut self, dt: f32) {
        if !self.on_ground {
            self.velocity.y += GRAVITY * dt;
        }

        self.position.x += self.velocity.x * dt;
        self.position.y += self.velocity.y * dt;
        self.position.z += self.velocity.z * dt;

        if self.position.y <= PLAYER_RADIUS {
            self.position.y = PLAYER_RADIUS;
            self.velocity.y = 0.0;
            self.on_ground = true;
        }

        // Exponential horizontal damping.
        let damp = (1.0 - LINEAR_DAMPING).powf(dt);
        self.velocity.x *= damp;
        self.velocity.z *= damp;
    }

    /// Horizontal speed magnitude; the scalar the wire protocol carries.
    pub fn speed(&self) -> f32 {
        (self.velocity.x * self.velocity.x + self.velocity.z * self.velocity.z).sqrt()
    }

    pub fn is_jumping(&self) -> bool {
        !self.on_ground
    }

    pub fn rotation(&self) -> Vec3 {
        Vec3::new(0.0, self.yaw, 0.0)
    }
}
