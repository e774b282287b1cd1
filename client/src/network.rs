use crate::cache::RemoteCache;
use crate::input::LocalPlayer;
use crate::rendering::Renderer;
use crate::sentinel::{ClockOffset, SentinelScheduler};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use macroquad::prelude::{is_key_down, KeyCode};
use shared::{Packet, POSITION_SEND_INTERVAL_MS};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::interval;

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    client_id: Option<u32>,
    connected: bool,

    /// Anchor of the local monotonic render clock; all scheduler times are
    /// milliseconds since this instant.
    clock_anchor: Instant,

    cache: RemoteCache,
    scheduler: SentinelScheduler,
    player: LocalPlayer,
    renderer: Renderer,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        spawn_z: f32,
        width: usize,
        height: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            client_id: None,
            connected: false,
            clock_anchor: Instant::now(),
            cache: RemoteCache::new(),
            scheduler: SentinelScheduler::new(),
            player: LocalPlayer::new(spawn_z),
            renderer: Renderer::new(width, height),
        })
    }

    fn monotonic_ms(&self) -> u64 {
        self.clock_anchor.elapsed().as_millis() as u64
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server...");
        self.send_packet(&Packet::Connect { client_version: 1 }).await?;
        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.connected = true;
            }

            Packet::Snapshot { participants } => {
                let removed = self.cache.apply_snapshot(&participants, self.client_id);
                for id in removed {
                    debug!("Participant {} left, entry released", id);
                }
            }

            Packet::SentinelTurn {
                phase,
                duration_ms,
                start_time_ms,
            } => {
                // Sample both clocks at receipt; one offset per announcement.
                let offset = ClockOffset::sample(self.clock_anchor);
                self.scheduler.announce(
                    phase,
                    duration_ms,
                    start_time_ms,
                    &offset,
                    self.monotonic_ms(),
                );
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.client_id = None;
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    async fn report_position(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.connected {
            return Ok(());
        }

        let packet = Packet::UpdatePosition {
            position: self.player.position,
            color: self.player.report_color(self.scheduler.is_facing()),
        };
        self.send_packet(&packet).await
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut position_interval = interval(Duration::from_millis(POSITION_SEND_INTERVAL_MS));
        let mut render_interval = interval(Duration::from_millis(16));

        let mut buffer = [0u8; 2048];

        loop {
            if is_key_down(KeyCode::Escape) {
                break;
            }

            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                                self.handle_packet(packet);
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = position_interval.tick() => {
                    if let Err(e) = self.report_position().await {
                        error!("Error sending position update: {}", e);
                    }
                },

                _ = render_interval.tick() => {
                    let dt = 1.0 / 60.0;
                    self.player.apply_direction(LocalPlayer::sample_direction(), dt);

                    self.cache.step();
                    self.scheduler.tick(self.monotonic_ms());

                    self.renderer.render(
                        self.player.position,
                        self.player.report_color(self.scheduler.is_facing()),
                        &self.cache,
                        self.scheduler.angle(),
                        self.connected,
                    );
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}
