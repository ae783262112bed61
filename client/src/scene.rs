//! Scene boundary: the rendering/animation collaborator the reconciler
//! drives, plus the placeholder macroquad implementation used by the
//! client binary.

use crate::game::PlayerBody;
use log::debug;
use macroquad::prelude as mq;
use rand::Rng;
use shared::{AnimationState, Vec3, PLAYER_RADIUS};
use std::collections::HashMap;
use std::fmt;

/// Character model construction failed; the player stays invisible on this
/// client, the roster is unaffected.
#[derive(Debug)]
pub struct CharacterLoadError(pub String);

impl fmt::Display for CharacterLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "character load failed: {}", self.0)
    }
}

impl std::error::Error for CharacterLoadError {}

/// A loaded, animatable character model. A full renderer would stream a
/// skinned mesh; the placeholder is a tinted capsule-ish block.
#[derive(Debug, Clone)]
pub struct Character {
    pub tint: (f32, f32, f32),
    pub height: f32,
}

impl Character {
    /// Asynchronous model construction. The placeholder build cannot
    /// actually fail but callers must handle failure: a missing or corrupt
    /// asset is logged and the player simply never appears here.
    pub async fn load(id: u32) -> Result<Character, CharacterLoadError> {
        // Yield so completion always arrives as a separate event, exactly
        // like a real asset fetch.
        tokio::task::yield_now().await;
        Ok(Character::placeholder(id))
    }

    pub fn placeholder(id: u32) -> Character {
        let mut rng = rand::thread_rng();
        let hue = (id as f32 * 0.61803) % 1.0;
        Character {
            tint: (hue, 0.6 + rng.gen::<f32>() * 0.3, 0.9),
            height: 2.0,
        }
    }
}

/// What the reconciler needs from the rendering/animation services:
/// attach/detach characters, move them, and pick their animation clip.
pub trait Scene {
    fn attach(&mut self, id: u32, character: Character);
    fn set_transform(&mut self, id: u32, position: Vec3, rotation: Vec3);
    fn play_animation(&mut self, id: u32, animation: AnimationState);
    fn remove(&mut self, id: u32);

    /// Draws one frame. Headless scenes (tests) skip this.
    fn render(&mut self, _local: &PlayerBody) {}
}

struct SceneCharacter {
    character: Character,
    position: Vec3,
    rotation: Vec3,
    animation: AnimationState,
}

/// Placeholder 3D view: a ground grid plus one block per remote player,
/// colored per id and labeled with the active animation clip.
#[derive(Default)]
pub struct WorldScene {
    characters: HashMap<u32, SceneCharacter>,
}

impl WorldScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    fn color_of(character: &Character) -> mq::Color {
        let (h, s, v) = character.tint;
        // Cheap HSV to RGB, full saturation band only.
        let i = (h * 6.0).floor();
        let f = h * 6.0 - i;
        let p = v * (1.0 - s);
        let q = v * (1.0 - f * s);
        let t = v * (1.0 - (1.0 - f) * s);
        let (r, g, b) = match (i as i32).rem_euclid(6) {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        mq::Color::new(r, g, b, 1.0)
    }
}

impl Scene for WorldScene {
    fn attach(&mut self, id: u32, character: Character) {
        self.characters.insert(
            id,
            SceneCharacter {
                character,
                position: Vec3::ZERO,
                rotation: Vec3::ZERO,
                animation: AnimationState::Idle,
            },
        );
    }

    fn set_transform(&mut self, id: u32, position: Vec3, rotation: Vec3) {
        if let Some(entry) = self.characters.get_mut(&id) {
            entry.position = position;
            entry.rotation = rotation;
        }
    }

    fn play_animation(&mut self, id: u32, animation: AnimationState) {
        if let Some(entry) = self.characters.get_mut(&id) {
            if entry.animation != animation {
                debug!("Player {} now playing '{}'", id, animation.clip_name());
                entry.animation = animation;
            }
        }
    }

    fn remove(&mut self, id: u32) {
        self.characters.remove(&id);
    }

    fn render(&mut self, local: &PlayerBody) {
        mq::clear_background(mq::Color::new(0.05, 0.05, 0.08, 1.0));

        let eye = mq::vec3(
            local.position.x - local.yaw.sin() * 6.0,
            local.position.y + 3.0,
            local.position.z - local.yaw.cos() * 6.0,
        );
        mq::set_camera(&mq::Camera3D {
            position: eye,
            target: mq::vec3(local.position.x, local.position.y, local.position.z),
            up: mq::vec3(0.0, 1.0, 0.0),
            ..Default::default()
        });

        mq::draw_grid(60, 1.0, mq::DARKGRAY, mq::GRAY);

        // Local player.
        mq::draw_cube(
            mq::vec3(local.position.x, local.position.y, local.position.z),
            mq::vec3(PLAYER_RADIUS * 2.0, 2.0, PLAYER_RADIUS * 2.0),
            None,
            mq::GREEN,
        );

        for entry in self.characters.values() {
            mq::draw_cube(
                mq::vec3(entry.position.x, entry.position.y, entry.position.z),
                mq::vec3(
                    PLAYER_RADIUS * 2.0,
                    entry.character.height,
                    PLAYER_RADIUS * 2.0,
                ),
                None,
                Self::color_of(&entry.character),
            );
        }

        mq::set_default_camera();
        mq::draw_text(
            &format!("remote players: {}", self.characters.len()),
            10.0,
            20.0,
            20.0,
            mq::WHITE,
        );
    }
}
