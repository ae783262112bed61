//! Server network layer: TCP accept loop, per-connection reader/writer
//! tasks, and the relay loop that owns the registry.
//!
//! Every connection gets one reader task (decodes frames, forwards events)
//! and one writer task (drains an unbounded outbound queue), so a slow or
//! dead recipient can never block delivery to anyone else. All registry
//! mutation happens on the single relay loop; connection tasks only talk to
//! it through the event channel.

use crate::registry::ConnectionRegistry;
use log::{debug, error, info, warn};
use shared::codec::{read_packet, write_packet, CodecError};
use shared::Packet;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;

/// Events flowing from connection tasks into the relay loop.
#[derive(Debug)]
pub enum ServerEvent {
    Connected {
        connection_id: u32,
        outbox: mpsc::UnboundedSender<Packet>,
        shutdown: oneshot::Sender<()>,
    },
    PacketReceived {
        connection_id: u32,
        packet: Packet,
    },
    Disconnected {
        connection_id: u32,
    },
}

/// Send side of one live connection.
struct Peer {
    outbox: mpsc::UnboundedSender<Packet>,
    /// Force-closes the connection's reader task when fired.
    shutdown: oneshot::Sender<()>,
}

/// Registry plus peer map behind the event boundary. Split from the socket
/// plumbing so the whole relay logic runs under test with synthetic
/// connections and a synthetic clock.
struct Relay {
    registry: ConnectionRegistry,
    peers: HashMap<u32, Peer>,
    timeout: Duration,
}

impl Relay {
    fn new(timeout: Duration) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            peers: HashMap::new(),
            timeout,
        }
    }

    fn handle_event(&mut self, event: ServerEvent, now: Instant) {
        match event {
            ServerEvent::Connected {
                connection_id,
                outbox,
                shutdown,
            } => {
                let state = self.registry.register(connection_id, now);

                // Snapshot to the newcomer only; join broadcast to the
                // others. A participant is never told about its own arrival.
                let init = Packet::Init {
                    player_id: connection_id,
                    players: self.registry.roster_excluding(connection_id),
                };
                if outbox.send(init).is_err() {
                    debug!("Connection {} closed before init", connection_id);
                }

                self.peers.insert(connection_id, Peer { outbox, shutdown });
                self.broadcast(&Packet::PlayerJoined { player: state }, Some(connection_id));
            }

            ServerEvent::PacketReceived {
                connection_id,
                packet,
            } => self.handle_packet(connection_id, packet, now),

            ServerEvent::Disconnected { connection_id } => {
                self.peers.remove(&connection_id);
                if self.registry.unregister(connection_id) {
                    self.broadcast(
                        &Packet::PlayerLeft {
                            player_id: connection_id,
                        },
                        None,
                    );
                }
            }
        }
    }

    fn handle_packet(&mut self, connection_id: u32, packet: Packet, now: Instant) {
        match packet {
            Packet::UpdatePosition {
                position,
                rotation,
                velocity,
                is_jumping,
            } => {
                match self.registry.apply_update(
                    connection_id,
                    position,
                    rotation,
                    velocity,
                    is_jumping,
                    now,
                ) {
                    // Relay to everyone but the reporting connection.
                    Some(state) => {
                        self.broadcast(&Packet::PlayerMoved { player: state }, Some(connection_id))
                    }
                    // Update raced a disconnect or eviction.
                    None => debug!(
                        "Ignoring update from unregistered connection {}",
                        connection_id
                    ),
                }
            }

            Packet::Disconnect => {
                info!("Player {} disconnecting", connection_id);
                self.drop_connection(connection_id);
            }

            _ => {
                warn!("Unexpected packet type from connection {}", connection_id);
            }
        }
    }

    /// Evicts every player whose inactivity exceeds the timeout. The id
    /// list is snapshotted first so removal never happens mid-iteration.
    fn sweep_inactive(&mut self, now: Instant) {
        for connection_id in self.registry.idle_ids(self.timeout, now) {
            info!("Disconnecting inactive player {}", connection_id);
            self.drop_connection(connection_id);
        }
    }

    /// Force-closes a connection and announces the departure. The registry
    /// entry goes away even if the shutdown signal no longer delivers.
    fn drop_connection(&mut self, connection_id: u32) {
        if let Some(peer) = self.peers.remove(&connection_id) {
            let _ = peer.shutdown.send(());
        }
        if self.registry.unregister(connection_id) {
            self.broadcast(
                &Packet::PlayerLeft {
                    player_id: connection_id,
                },
                None,
            );
        }
    }

    /// Best-effort fan-out. A closed peer just drops its copy.
    fn broadcast(&self, packet: &Packet, exclude: Option<u32>) {
        for (connection_id, peer) in &self.peers {
            if Some(*connection_id) == exclude {
                continue;
            }
            if peer.outbox.send(packet.clone()).is_err() {
                debug!("Dropping broadcast to closed connection {}", connection_id);
            }
        }
    }
}

/// The relay server: accepts connections and runs the event loop.
pub struct Server {
    listener: TcpListener,
    relay: Relay,
    events_tx: mpsc::UnboundedSender<ServerEvent>,
    events_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn new(addr: &str, timeout: Duration) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            relay: Relay::new(timeout),
            events_tx,
            events_rx,
        })
    }

    /// Bound address, useful when binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop and the relay loop until the process is
    /// stopped. The inactivity sweep shares the relay loop, so its
    /// scan-then-evict never races connection handlers.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        let events_tx = self.events_tx.clone();
        let listener = self.listener;

        tokio::spawn(async move {
            let mut next_connection_id: u32 = 1;
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let connection_id = next_connection_id;
                        next_connection_id += 1;
                        info!("Connection {} accepted from {}", connection_id, addr);
                        spawn_connection(stream, connection_id, events_tx.clone());
                    }
                    Err(e) => {
                        error!("Accept failed: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });

        // Sweep period equals the timeout window, as the relay always has.
        let mut sweep_interval = interval(self.relay.timeout);
        sweep_interval.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                event = self.events_rx.recv() => {
                    match event {
                        Some(event) => self.relay.handle_event(event, Instant::now()),
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },
                _ = sweep_interval.tick() => {
                    self.relay.sweep_inactive(Instant::now());
                },
            }
        }

        Ok(())
    }
}

/// Spawns the reader and writer tasks for one accepted connection.
fn spawn_connection(
    stream: TcpStream,
    connection_id: u32,
    events_tx: mpsc::UnboundedSender<ServerEvent>,
) {
    let (mut read_half, mut write_half) = stream.into_split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Packet>();
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    if events_tx
        .send(ServerEvent::Connected {
            connection_id,
            outbox: out_tx,
            shutdown: shutdown_tx,
        })
        .is_err()
    {
        return;
    }

    // Writer: drains the outbound queue until the relay drops the sender
    // or the socket dies, then sends FIN.
    tokio::spawn(async move {
        while let Some(packet) = out_rx.recv().await {
            if let Err(e) = write_packet(&mut write_half, &packet).await {
                debug!("Send to connection {} failed: {}", connection_id, e);
                break;
            }
        }
        use tokio::io::AsyncWriteExt;
        let _ = write_half.shutdown().await;
    });

    // Reader: decodes frames until the peer hangs up, a frame is bad, or
    // the relay force-closes the connection.
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!("Connection {} force-closed", connection_id);
                    break;
                },
                result = read_packet(&mut read_half) => {
                    match result {
                        Ok(packet) => {
                            if events_tx
                                .send(ServerEvent::PacketReceived { connection_id, packet })
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(CodecError::ConnectionClosed) => break,
                        Err(e) => {
                            warn!("Bad frame from connection {}: {}", connection_id, e);
                            break;
                        }
                    }
                },
            }
        }
        let _ = events_tx.send(ServerEvent::Disconnected { connection_id });
    });
}
