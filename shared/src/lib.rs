//! Wire protocol and tuning constants shared between the relay server and
//! the world client: vector math, player state, the event vocabulary, and
//! the animation state machine derived from reported motion.

use serde::{Deserialize, Serialize};

pub mod codec;

/// Fixed physics step used by the client simulation.
pub const TIME_STEP: f32 = 1.0 / 60.0;
pub const GRAVITY: f32 = -25.0;
pub const JUMP_VELOCITY: f32 = 20.0;
pub const LINEAR_DAMPING: f32 = 0.9;
pub const PLAYER_RADIUS: f32 = 0.3;

/// Seconds without qualifying movement before the server evicts a player.
pub const INACTIVITY_TIMEOUT_SECS: u64 = 30;
/// Minimum displacement that counts as movement for the inactivity check.
/// Sub-threshold jitter never resets the inactivity clock.
pub const MIN_MOVEMENT_DISTANCE: f32 = 1.0;

/// Reported speed above which a remote player is shown running.
pub const RUN_SPEED_THRESHOLD: f32 = 5.0;
/// Reported speed above which a remote player is shown walking.
pub const WALK_SPEED_THRESHOLD: f32 = 0.1;

/// World-space position every player spawns at.
pub const SPAWN_POSITION: Vec3 = Vec3 {
    x: 0.0,
    y: 5.0,
    z: 0.0,
};

/// Largest frame the stream codec will accept.
pub const MAX_PACKET_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// One connected participant as seen on the wire. The server keeps extra
/// inactivity bookkeeping per entry, but that never leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: u32,
    pub position: Vec3,
    /// Euler angles; only yaw matters for the placeholder characters.
    pub rotation: Vec3,
    /// Scalar speed magnitude, used purely for animation selection.
    pub velocity: f32,
    pub is_jumping: bool,
}

impl PlayerState {
    /// Default spawn pose assigned at registration.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            position: SPAWN_POSITION,
            rotation: Vec3::ZERO,
            velocity: 0.0,
            is_jumping: false,
        }
    }
}

/// Every message exchanged over a connection. Fire-and-forget notifications
/// only; ordering is guaranteed per connection by the TCP stream, nothing
/// is guaranteed across connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Packet {
    // client -> server
    /// Latest locally sampled state, sent once per simulation tick.
    UpdatePosition {
        position: Vec3,
        rotation: Vec3,
        velocity: f32,
        is_jumping: bool,
    },
    /// Voluntary leave.
    Disconnect,

    // server -> client
    /// Sent exactly once, immediately after registration. The roster
    /// excludes the recipient's own entry.
    Init {
        player_id: u32,
        players: Vec<PlayerState>,
    },
    /// A participant other than the recipient joined.
    PlayerJoined { player: PlayerState },
    /// Relay of another participant's latest state.
    PlayerMoved { player: PlayerState },
    /// A participant left, voluntarily or by eviction.
    PlayerLeft { player_id: u32 },
}

/// Animation a character should play, derived from reported motion.
/// Jumping wins over any speed; otherwise speed thresholds pick run/walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Idle,
    Walk,
    Run,
    Jump,
}

impl AnimationState {
    pub fn from_motion(is_jumping: bool, velocity: f32) -> Self {
        if is_jumping {
            AnimationState::Jump
        } else if velocity > RUN_SPEED_THRESHOLD {
            AnimationState::Run
        } else if velocity > WALK_SPEED_THRESHOLD {
            AnimationState::Walk
        } else {
            AnimationState::Idle
        }
    }

    /// Clip name understood by the scene collaborator.
    pub fn clip_name(&self) -> &'static str {
        match self {
            AnimationState::Idle => "idle",
            AnimationState::Walk => "walk",
            AnimationState::Run => "run",
            AnimationState::Jump => "jump",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_vec3_distance() {
        let a = Vec3::new(0.0, 5.0, 0.0);
        let b = Vec3::new(3.0, 5.0, 4.0);
        assert_approx_eq!(a.distance(&b), 5.0, 1e-6);
        assert_approx_eq!(b.distance(&a), 5.0, 1e-6);
        assert_approx_eq!(a.distance(&a), 0.0, 1e-6);
    }

    #[test]
    fn test_vec3_length() {
        let v = Vec3::new(2.0, 3.0, 6.0);
        assert_approx_eq!(v.length(), 7.0, 1e-6);
        assert_approx_eq!(Vec3::ZERO.length(), 0.0, 1e-6);
    }

    #[test]
    fn test_spawn_pose() {
        let player = PlayerState::new(7);
        assert_eq!(player.id, 7);
        assert_eq!(player.position, SPAWN_POSITION);
        assert_eq!(player.rotation, Vec3::ZERO);
        assert_eq!(player.velocity, 0.0);
        assert!(!player.is_jumping);
    }

    #[test]
    fn test_animation_jump_wins_over_speed() {
        assert_eq!(AnimationState::from_motion(true, 0.0), AnimationState::Jump);
        assert_eq!(
            AnimationState::from_motion(true, 100.0),
            AnimationState::Jump
        );
    }

    #[test]
    fn test_animation_speed_thresholds() {
        assert_eq!(AnimationState::from_motion(false, 0.0), AnimationState::Idle);
        assert_eq!(
            AnimationState::from_motion(false, WALK_SPEED_THRESHOLD),
            AnimationState::Idle
        );
        assert_eq!(AnimationState::from_motion(false, 0.5), AnimationState::Walk);
        assert_eq!(
            AnimationState::from_motion(false, RUN_SPEED_THRESHOLD),
            AnimationState::Walk
        );
        assert_eq!(AnimationState::from_motion(false, 5.1), AnimationState::Run);
    }

    #[test]
    fn test_clip_names() {
        assert_eq!(AnimationState::Idle.clip_name(), "idle");
        assert_eq!(AnimationState::Walk.clip_name(), "walk");
        assert_eq!(AnimationState::Run.clip_name(), "run");
        assert_eq!(AnimationState::Jump.clip_name(), "jump");
    }

    #[test]
    fn test_packet_serialization_update() {
        let packet = Packet::UpdatePosition {
            position: Vec3::new(1.0, 5.0, 0.0),
            rotation: Vec3::new(0.0, 1.5, 0.0),
            velocity: 3.2,
            is_jumping: true,
        };

        let bytes = bincode::serialize(&packet).unwrap();
        let decoded: Packet = bincode::deserialize(&bytes).unwrap();

        match decoded {
            Packet::UpdatePosition {
                position,
                rotation,
                velocity,
                is_jumping,
            } => {
                assert_eq!(position, Vec3::new(1.0, 5.0, 0.0));
                assert_eq!(rotation, Vec3::new(0.0, 1.5, 0.0));
                assert_approx_eq!(velocity, 3.2, 1e-6);
                assert!(is_jumping);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_init() {
        let packet = Packet::Init {
            player_id: 2,
            players: vec![PlayerState::new(1)],
        };

        let bytes = bincode::serialize(&packet).unwrap();
        let decoded: Packet = bincode::deserialize(&bytes).unwrap();

        match decoded {
            Packet::Init { player_id, players } => {
                assert_eq!(player_id, 2);
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].id, 1);
                assert_eq!(players[0].position, SPAWN_POSITION);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_player_left() {
        let bytes = bincode::serialize(&Packet::PlayerLeft { player_id: 9 }).unwrap();
        match bincode::deserialize(&bytes).unwrap() {
            Packet::PlayerLeft { player_id } => assert_eq!(player_id, 9),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }
}
