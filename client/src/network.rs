//! Client socket plumbing and the per-frame driver.
//!
//! macroquad owns the main thread, so the tokio runtime only runs the
//! socket tasks: a reader pushing inbound packets onto a channel and a
//! writer draining outbound ones. The frame loop polls those channels
//! without blocking once per rendered frame and steps the fixed-rate
//! simulation through an accumulator, so network handlers never stall a
//! frame and the reconciler always runs between physics steps. Character
//! model loading happens on spawned tasks; completion re-enters the loop
//! as an event.

use crate::emitter::LocalStateEmitter;
use crate::game::{MoveIntent, PlayerBody};
use crate::input::InputManager;
use crate::reconciler::Reconciler;
use crate::scene::{Character, Scene};
use log::{error, info, warn};
use shared::codec::{read_packet, write_packet, CodecError};
use shared::{Packet, PlayerState, TIME_STEP};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Longest stretch of real time one frame may simulate; a stall beyond
/// this is dropped rather than replayed as a burst of catch-up steps.
const MAX_FRAME_TIME: f32 = 0.25;

/// Channel ends of a live server connection. The reader and writer tasks
/// run on the tokio runtime; the frame loop polls this synchronously.
pub struct Connection {
    incoming_rx: mpsc::UnboundedReceiver<Packet>,
    outgoing_tx: mpsc::UnboundedSender<Packet>,
}

impl Connection {
    /// Dials the relay and spawns the socket tasks. Must run inside the
    /// runtime (`Runtime::block_on` from the frame thread).
    pub async fn connect(addr: &str) -> Result<Connection, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", addr);

        let (mut read_half, mut write_half) = stream.into_split();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<Packet>();

        // Reader: decodes frames until the server hangs up. Dropping the
        // sender is what tells the frame loop the connection is gone.
        tokio::spawn(async move {
            loop {
                match read_packet(&mut read_half).await {
                    Ok(packet) => {
                        if incoming_tx.send(packet).is_err() {
                            break;
                        }
                    }
                    Err(CodecError::ConnectionClosed) => {
                        info!("Server closed the connection");
                        break;
                    }
                    Err(e) => {
                        error!("Transport error: {}", e);
                        break;
                    }
                }
            }
        });

        // Writer: drains the outbound queue, then sends FIN.
        tokio::spawn(async move {
            while let Some(packet) = outgoing_rx.recv().await {
                if let Err(e) = write_packet(&mut write_half, &packet).await {
                    error!("Failed to send packet: {}", e);
                    break;
                }
            }
            use tokio::io::AsyncWriteExt;
            let _ = write_half.shutdown().await;
        });

        Ok(Connection {
            incoming_rx,
            outgoing_tx,
        })
    }

    fn try_recv(&mut self) -> Result<Packet, TryRecvError> {
        self.incoming_rx.try_recv()
    }

    fn send(&self, packet: Packet) -> bool {
        self.outgoing_tx.send(packet).is_ok()
    }
}

/// A completed (or failed) out-of-band character model load.
enum LoadEvent {
    Ready { id: u32, character: Character },
    Failed { id: u32 },
}

pub struct Client<S: Scene> {
    connection: Connection,

    reconciler: Reconciler,
    scene: S,
    body: PlayerBody,
    input: InputManager,
    emitter: LocalStateEmitter,

    runtime: Handle,
    loads_tx: mpsc::UnboundedSender<LoadEvent>,
    loads_rx: mpsc::UnboundedReceiver<LoadEvent>,

    /// Real time not yet consumed by fixed-rate simulation steps.
    accumulator: f32,
}

impl<S: Scene> Client<S> {
    pub fn new(connection: Connection, scene: S, runtime: Handle) -> Self {
        let (loads_tx, loads_rx) = mpsc::unbounded_channel();

        Client {
            connection,
            reconciler: Reconciler::new(),
            scene,
            body: PlayerBody::new(),
            input: InputManager::new(),
            emitter: LocalStateEmitter::new(),
            runtime,
            loads_tx,
            loads_rx,
            accumulator: 0.0,
        }
    }

    /// Advances one rendered frame: samples the devices, drains the event
    /// queues, steps the simulation, draws. Returns `false` once the
    /// server connection is gone.
    pub fn frame(&mut self, frame_time: f32) -> bool {
        let intent = self.input.sample();
        let alive = self.advance(intent, frame_time);
        self.scene.render(&self.body);
        alive
    }

    /// Frame logic minus device sampling and drawing.
    fn advance(&mut self, intent: MoveIntent, frame_time: f32) -> bool {
        loop {
            match self.connection.try_recv() {
                Ok(packet) => self.handle_packet(packet),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("Disconnected from server");
                    return false;
                }
            }
        }

        while let Ok(event) = self.loads_rx.try_recv() {
            match event {
                LoadEvent::Ready { id, character } => {
                    self.reconciler
                        .on_character_ready(id, character, &mut self.scene);
                }
                LoadEvent::Failed { id } => self.reconciler.on_load_failed(id),
            }
        }

        self.body.apply_intent(&intent);
        self.accumulator += frame_time.min(MAX_FRAME_TIME);
        while self.accumulator >= TIME_STEP {
            self.accumulator -= TIME_STEP;
            self.body.step(TIME_STEP);

            // One emission per simulation step, only once registered.
            if self.reconciler.local_id().is_some() {
                let update = self.emitter.emit(&self.body);
                if !self.connection.send(update) {
                    return false;
                }
            }
        }

        true
    }

    /// Announces a voluntary leave; the writer task flushes it out.
    pub fn shutdown(self) {
        let _ = self.connection.send(Packet::Disconnect);
    }

    fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Init { player_id, players } => {
                for state in self.reconciler.on_init(player_id, players) {
                    self.spawn_load(state);
                }
            }

            Packet::PlayerJoined { player } => {
                if let Some(state) = self.reconciler.on_player_joined(player) {
                    self.spawn_load(state);
                }
            }

            Packet::PlayerMoved { player } => {
                self.reconciler.on_player_moved(player, &mut self.scene);
            }

            Packet::PlayerLeft { player_id } => {
                self.reconciler.on_player_left(player_id, &mut self.scene);
            }

            _ => {
                warn!("Unexpected packet type from server");
            }
        }
    }

    /// Kicks off an out-of-band model load; completion (or failure)
    /// re-enters the event queue and is reconciled on a later frame.
    fn spawn_load(&self, state: PlayerState) {
        let loads_tx = self.loads_tx.clone();
        self.runtime.spawn(async move {
            match Character::load(state.id).await {
                Ok(character) => {
                    let _ = loads_tx.send(LoadEvent::Ready {
                        id: state.id,
                        character,
                    });
                }
                Err(e) => {
                    error!("Character load for player {} failed: {}", state.id, e);
                    let _ = loads_tx.send(LoadEvent::Failed { id: state.id });
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{AnimationState, Vec3};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingScene {
        attached: Vec<u32>,
    }

    impl Scene for RecordingScene {
        fn attach(&mut self, id: u32, _character: Character) {
            self.attached.push(id);
        }

        fn set_transform(&mut self, _id: u32, _position: Vec3, _rotation: Vec3) {}

        fn play_animation(&mut self, _id: u32, _animation: AnimationState) {}

        fn remove(&mut self, _id: u32) {}
    }

    struct Harness {
        client: Client<RecordingScene>,
        incoming_tx: mpsc::UnboundedSender<Packet>,
        outgoing_rx: mpsc::UnboundedReceiver<Packet>,
    }

    fn harness() -> Harness {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let connection = Connection {
            incoming_rx,
            outgoing_tx,
        };

        Harness {
            client: Client::new(connection, RecordingScene::default(), Handle::current()),
            incoming_tx,
            outgoing_rx,
        }
    }

    // There is no window or input context under `cargo test`; the whole
    // client (input manager included) must construct and advance anyway.
    #[tokio::test]
    async fn test_client_constructs_and_advances_without_a_window() {
        let mut h = harness();

        assert!(h.client.advance(MoveIntent::default(), TIME_STEP));
    }

    #[tokio::test]
    async fn test_no_emission_before_init() {
        let mut h = harness();

        assert!(h.client.advance(MoveIntent::default(), TIME_STEP * 3.5));

        assert!(h.outgoing_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_one_update_per_simulation_step_once_registered() {
        let mut h = harness();
        h.incoming_tx
            .send(Packet::Init {
                player_id: 1,
                players: vec![],
            })
            .unwrap();

        assert!(h.client.advance(MoveIntent::default(), TIME_STEP * 3.5));

        let mut updates = 0;
        while let Ok(packet) = h.outgoing_rx.try_recv() {
            match packet {
                Packet::UpdatePosition { .. } => updates += 1,
                other => panic!("Expected UpdatePosition, got {:?}", other),
            }
        }
        assert_eq!(updates, 3);
    }

    #[tokio::test]
    async fn test_stall_does_not_replay_as_step_burst() {
        let mut h = harness();
        h.incoming_tx
            .send(Packet::Init {
                player_id: 1,
                players: vec![],
            })
            .unwrap();

        // A multi-second hiccup simulates at most MAX_FRAME_TIME.
        assert!(h.client.advance(MoveIntent::default(), 5.0));

        let mut updates = 0;
        while h.outgoing_rx.try_recv().is_ok() {
            updates += 1;
        }
        assert!(updates as f32 <= MAX_FRAME_TIME / TIME_STEP + 1.0);
    }

    #[tokio::test]
    async fn test_closed_connection_stops_the_loop() {
        let mut h = harness();

        drop(h.incoming_tx);

        assert!(!h.client.advance(MoveIntent::default(), TIME_STEP));
    }

    #[tokio::test]
    async fn test_joined_player_attaches_after_load_completes() {
        let mut h = harness();
        h.incoming_tx
            .send(Packet::Init {
                player_id: 1,
                players: vec![],
            })
            .unwrap();
        h.incoming_tx
            .send(Packet::PlayerJoined {
                player: PlayerState::new(2),
            })
            .unwrap();

        // First frame reserves the handle and spawns the load.
        assert!(h.client.advance(MoveIntent::default(), 0.0));
        assert!(h.client.scene.attached.is_empty());

        tokio::time::sleep(Duration::from_millis(10)).await;

        // A later frame reconciles the completed load.
        assert!(h.client.advance(MoveIntent::default(), 0.0));
        assert_eq!(h.client.scene.attached, vec![2]);
    }

    #[tokio::test]
    async fn test_shutdown_sends_voluntary_disconnect() {
        let mut h = harness();

        h.client.shutdown();

        match h.outgoing_rx.try_recv() {
            Ok(Packet::Disconnect) => {}
            other => panic!("Expected Disconnect, got {:?}", other),
        }
    }
}
