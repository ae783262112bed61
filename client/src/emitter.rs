//! Local state emission: one `UpdatePosition` per simulation tick, sampled
//! after the physics step. No coalescing happens here; throttling is the
//! tick rate and back-pressure belongs to the channel.

use crate::game::PlayerBody;
use log::debug;
use shared::Packet;

#[derive(Debug, Default)]
pub struct LocalStateEmitter {
    ticks_emitted: u64,
}

impl LocalStateEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packages the body's current pose. Exactly one packet per call.
    pub fn emit(&mut self, body: &PlayerBody) -> Packet {
        self.ticks_emitted += 1;
        if self.ticks_emitted % 600 == 0 {
            debug!(
                "Emitted {} updates, at {:?} speed {:.2}",
                self.ticks_emitted,
                body.position,
                body.speed()
            );
        }

        Packet::UpdatePosition {
            position: body.position,
            rotation: body.rotation(),
            velocity: body.speed(),
            is_jumping: body.is_jumping(),
        }
    }
}
