//! Remote state reconciliation: turns inbound network events into scene
//! mutations while owning the remote-player handle table.
//!
//! Character models load asynchronously, so the table reserves an id the
//! moment a join (or roster entry) is seen and only attaches to the scene
//! once the load completes. The reservation doubles as a cancellation
//! token: if the player leaves before the load finishes, the completed
//! model finds no reservation and is discarded without touching the scene.

use crate::scene::{Character, Scene};
use log::{debug, info, warn};
use shared::{AnimationState, PlayerState};
use std::collections::HashMap;

/// One tracked remote participant.
#[derive(Debug)]
enum RemotePlayer {
    /// Reserved; model construction in flight. The latest seen state is
    /// retained so the eventual attach starts from a fresh pose.
    Loading { snapshot: PlayerState },
    /// Model attached to the scene.
    Ready,
}

/// Client-side mirror of the roster, local participant excluded.
#[derive(Debug, Default)]
pub struct Reconciler {
    local_id: Option<u32>,
    remotes: HashMap<u32, RemotePlayer>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local_id(&self) -> Option<u32> {
        self.local_id
    }

    /// Number of currently tracked remote players, loading included.
    pub fn remote_count(&self) -> usize {
        self.remotes.len()
    }

    /// Handles the one-time roster snapshot. Returns the states whose
    /// character models need loading.
    pub fn on_init(&mut self, player_id: u32, players: Vec<PlayerState>) -> Vec<PlayerState> {
        info!(
            "Joined as player {} with {} other players present",
            player_id,
            players.len()
        );
        self.local_id = Some(player_id);

        let mut to_load = Vec::new();
        for player in players {
            // The contract excludes our own entry from the snapshot, but a
            // misbehaving server must not make us mirror ourselves.
            if player.id == player_id || self.remotes.contains_key(&player.id) {
                continue;
            }
            self.remotes.insert(
                player.id,
                RemotePlayer::Loading {
                    snapshot: player.clone(),
                },
            );
            to_load.push(player);
        }
        to_load
    }

    /// Handles a join announcement. Returns the state to load a model for,
    /// or `None` when the id is already tracked (idempotent join) or is
    /// our own.
    pub fn on_player_joined(&mut self, player: PlayerState) -> Option<PlayerState> {
        if Some(player.id) == self.local_id {
            warn!("Server announced our own join; ignoring");
            return None;
        }
        if self.remotes.contains_key(&player.id) {
            debug!("Duplicate join for player {}", player.id);
            return None;
        }

        info!("Player {} joined", player.id);
        self.remotes.insert(
            player.id,
            RemotePlayer::Loading {
                snapshot: player.clone(),
            },
        );
        Some(player)
    }

    /// Applies a relayed state report. Misses are benign: the join for
    /// this id may still be loading, or the player may already be gone.
    pub fn on_player_moved<S: Scene>(&mut self, player: PlayerState, scene: &mut S) {
        match self.remotes.get_mut(&player.id) {
            Some(RemotePlayer::Ready) => {
                scene.set_transform(player.id, player.position, player.rotation);
                scene.play_animation(
                    player.id,
                    AnimationState::from_motion(player.is_jumping, player.velocity),
                );
            }
            Some(RemotePlayer::Loading { snapshot }) => {
                // Not in the scene yet; just keep the pose fresh.
                *snapshot = player;
            }
            None => debug!("Move for untracked player {}", player.id),
        }
    }

    /// Removes a participant. Removing an unknown id is a no-op; removing
    /// a loading one cancels the pending attach.
    pub fn on_player_left<S: Scene>(&mut self, player_id: u32, scene: &mut S) {
        match self.remotes.remove(&player_id) {
            Some(RemotePlayer::Ready) => {
                info!("Player {} left", player_id);
                scene.remove(player_id);
            }
            Some(RemotePlayer::Loading { .. }) => {
                info!("Player {} left before its model finished loading", player_id);
            }
            None => debug!("Leave for untracked player {}", player_id),
        }
    }

    /// Completes an asynchronous model load. If the reservation is gone
    /// the player left in the meantime and the model is dropped.
    pub fn on_character_ready<S: Scene>(&mut self, id: u32, character: Character, scene: &mut S) {
        match self.remotes.get(&id) {
            Some(RemotePlayer::Loading { snapshot }) => {
                let snapshot = snapshot.clone();
                scene.attach(id, character);
                scene.set_transform(id, snapshot.position, snapshot.rotation);
                scene.play_animation(
                    id,
                    AnimationState::from_motion(snapshot.is_jumping, snapshot.velocity),
                );
                self.remotes.insert(id, RemotePlayer::Ready);
            }
            Some(RemotePlayer::Ready) => warn!("Duplicate model load for player {}", id),
            None => debug!("Discarding model for departed player {}", id),
        }
    }

    /// A model load failed: the player stays invisible on this client but
    /// the roster is unaffected. Not retried.
    pub fn on_load_failed(&mut self, id: u32) {
        if matches!(self.remotes.get(&id), Some(RemotePlayer::Loading { .. })) {
            self.remotes.remove(&id);
        }
    }
}
