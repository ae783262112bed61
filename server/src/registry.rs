//! Connection registry: the single source of truth for every registered
//! player on the relay.
//!
//! The registry is a plain owned store with no interior mutability; the
//! server's main loop is the only actor that touches it, and every
//! time-dependent operation takes the current `Instant` as an argument so
//! tests can drive it with a synthetic clock.
//!
//! Inactivity bookkeeping follows the minimum-movement rule: the per-entry
//! clock only advances when a reported position is displaced from the last
//! recorded one by more than `MIN_MOVEMENT_DISTANCE`, so sub-threshold
//! jitter never keeps an idle player alive.

use log::info;
use shared::{PlayerState, Vec3, MIN_MOVEMENT_DISTANCE};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// One registered player plus the bookkeeping the inactivity sweep needs.
#[derive(Debug, Clone)]
pub struct PlayerEntry {
    pub state: PlayerState,
    /// Position the last qualifying move was measured against.
    last_position: Vec3,
    /// Advances only on qualifying moves; registration starts the clock.
    last_move_time: Instant,
}

impl PlayerEntry {
    fn new(state: PlayerState, now: Instant) -> Self {
        let last_position = state.position;
        Self {
            state,
            last_position,
            last_move_time: now,
        }
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_move_time)
    }
}

/// Mapping from connection identity to player state. Connection ids and
/// player ids are the same space: exactly one entry per live connection.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    players: HashMap<u32, PlayerEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Registers a new connection with the default spawn pose and returns
    /// the freshly created state. The caller announces it: snapshot to the
    /// newcomer, join broadcast to everyone else.
    pub fn register(&mut self, connection_id: u32, now: Instant) -> PlayerState {
        let state = PlayerState::new(connection_id);
        info!("Player {} registered", connection_id);
        self.players
            .insert(connection_id, PlayerEntry::new(state.clone(), now));
        state
    }

    /// Applies a position report from the owning connection. Returns the
    /// mutated state for relaying, or `None` if the connection is not
    /// registered (an update arriving after eviction is silently dropped).
    pub fn apply_update(
        &mut self,
        connection_id: u32,
        position: Vec3,
        rotation: Vec3,
        velocity: f32,
        is_jumping: bool,
        now: Instant,
    ) -> Option<PlayerState> {
        let entry = self.players.get_mut(&connection_id)?;

        if entry.last_position.distance(&position) > MIN_MOVEMENT_DISTANCE {
            entry.last_position = entry.state.position;
            entry.last_move_time = now;
        }

        entry.state.position = position;
        entry.state.rotation = rotation;
        entry.state.velocity = velocity;
        entry.state.is_jumping = is_jumping;

        Some(entry.state.clone())
    }

    /// Removes an entry. Idempotent; returns whether anything was removed
    /// so the caller only broadcasts a leave for a real departure.
    pub fn unregister(&mut self, connection_id: u32) -> bool {
        if self.players.remove(&connection_id).is_some() {
            info!("Player {} unregistered", connection_id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, connection_id: u32) -> bool {
        self.players.contains_key(&connection_id)
    }

    /// Roster snapshot for the initial state message, without the
    /// recipient's own entry so a participant is never told about itself.
    pub fn roster_excluding(&self, connection_id: u32) -> Vec<PlayerState> {
        self.players
            .values()
            .filter(|entry| entry.state.id != connection_id)
            .map(|entry| entry.state.clone())
            .collect()
    }

    /// Ids whose inactivity exceeds the timeout, snapshotted so the caller
    /// can evict while the sweep no longer iterates the map.
    pub fn idle_ids(&self, timeout: Duration, now: Instant) -> Vec<u32> {
        self.players
            .iter()
            .filter(|(_, entry)| entry.idle_for(now) > timeout)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
