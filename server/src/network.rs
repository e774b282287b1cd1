//! Server network layer: UDP event loop and snapshot broadcasting
//!
//! All registry mutation happens inside the single `run` loop, one packet per
//! turn, and the resulting snapshot broadcast is queued before the next packet
//! is processed. That makes mutate-then-broadcast an indivisible step without
//! any locking on the registry itself; only the connection table is shared
//! with the background sender and timeout tasks.

use crate::connections::ConnectionManager;
use crate::registry::Registry;
use crate::sentinel::SentinelDriver;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Messages sent from background tasks to the main server loop.
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the main loop (and the sentinel driver) to the
/// network sender task.
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    BroadcastPacket { packet: Packet },
}

/// Main server coordinating the registry, connection table, and broadcaster.
pub struct Server {
    socket: Arc<UdpSocket>,
    connections: Arc<RwLock<ConnectionManager>>,
    registry: Registry,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        max_clients: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            connections: Arc::new(RwLock::new(ConnectionManager::new(max_clients))),
            registry: Registry::new(),
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Spawns the task that continuously listens for incoming packets.
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the outgoing packet queue.
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let connections = Arc::clone(&self.connections);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet } => {
                        let client_addrs = {
                            let connections_guard = connections.read().await;
                            connections_guard.client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            // A failed send to a dead client is absorbed; the
                            // timeout sweep will clean the entry up.
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns the task that sweeps for silent connections.
    fn spawn_timeout_checker(&self) {
        let connections = Arc::clone(&self.connections);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut connections_guard = connections.write().await;
                    connections_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    /// Spawns the sentinel driver with its own handle to the broadcaster.
    fn spawn_sentinel_driver(&self) {
        let game_tx = self.game_tx.clone();
        tokio::spawn(async move {
            SentinelDriver::new().run(game_tx).await;
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Queues the full current registry for every connected client,
    /// including whichever client triggered the mutation.
    fn broadcast_snapshot(&self) {
        let packet = Packet::Snapshot {
            participants: self.registry.snapshot(),
        };

        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { packet }) {
            error!("Failed to queue snapshot broadcast: {}", e);
        }
    }

    /// Processes one incoming packet; any registry mutation ends with a
    /// snapshot broadcast before this function returns.
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        {
            let mut connections = self.connections.write().await;
            connections.touch(addr);
        }

        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                // A reconnect from the same address replaces the old entry.
                let existing = {
                    let connections = self.connections.read().await;
                    connections.find_by_addr(addr)
                };

                if let Some(existing_id) = existing {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    let mut connections = self.connections.write().await;
                    connections.remove(existing_id);
                    self.registry.disconnect(existing_id);
                }

                let client_id = {
                    let mut connections = self.connections.write().await;
                    connections.add(addr)
                };

                if let Some(client_id) = client_id {
                    self.registry.connect(client_id);
                    self.send_packet(&Packet::Connected { client_id }, addr);
                    self.broadcast_snapshot();
                } else {
                    let response = Packet::Disconnected {
                        reason: "Server full".to_string(),
                    };
                    self.send_packet(&response, addr);
                }
            }

            Packet::UpdatePosition { position, color } => {
                let client_id = {
                    let connections = self.connections.read().await;
                    connections.find_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    if self.registry.apply_update(client_id, position, color) {
                        self.broadcast_snapshot();
                    } else {
                        // Update from an id that was just disconnected.
                        debug!("Dropping stale update for client {}", client_id);
                    }
                }
            }

            Packet::Disconnect => {
                let client_id = {
                    let connections = self.connections.read().await;
                    connections.find_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    {
                        let mut connections = self.connections.write().await;
                        connections.remove(client_id);
                    }
                    self.registry.disconnect(client_id);
                    self.broadcast_snapshot();
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Main server loop coordinating all operations.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();
        self.spawn_sentinel_driver();

        info!("Server started successfully");

        loop {
            match self.server_rx.recv().await {
                Some(ServerMessage::PacketReceived { packet, addr }) => {
                    self.handle_packet(packet, addr).await;
                }
                Some(ServerMessage::ClientTimeout { client_id }) => {
                    // The sweeper already dropped the connection entry.
                    if self.registry.disconnect(client_id) {
                        self.broadcast_snapshot();
                    }
                }
                Some(ServerMessage::Shutdown) | None => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
