//! Sentinel turn driver
//!
//! Runs the recurring two-phase state flip that every client must render at
//! the same real-world moment. Each cycle flips the phase, stamps the turn
//! with the server's wall clock, announces it to all clients, and then sleeps
//! through the turn's full visible duration plus a randomized pause. Because
//! the sleep always covers `duration + pause`, no two announced turns can
//! overlap.

use crate::network::GameMessage;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{epoch_millis, Packet, Phase, TURN_DURATION_MS, TURN_PAUSE_MAX_MS, TURN_PAUSE_MIN_MS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// One announced sentinel turn plus the pause that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn {
    pub phase: Phase,
    pub duration_ms: u64,
    /// Absolute wall-clock instant (epoch ms) at which the turn begins.
    pub start_time_ms: u64,
    /// Idle time after the turn completes, before the next announcement.
    pub pause_ms: u64,
}

impl Turn {
    pub fn packet(&self) -> Packet {
        Packet::SentinelTurn {
            phase: self.phase,
            duration_ms: self.duration_ms,
            start_time_ms: self.start_time_ms,
        }
    }
}

/// Perpetual driver for the sentinel's phase flips.
///
/// Independent of any client connection; a broadcast that reaches no one is
/// absorbed by the transport, and the next cycle reaches whoever reconnected.
pub struct SentinelDriver {
    phase: Phase,
    rng: StdRng,
}

impl SentinelDriver {
    /// The sentinel starts with its back turned, so the first announced turn
    /// faces the field.
    pub fn new() -> Self {
        Self {
            phase: Phase::Away,
            rng: StdRng::from_entropy(),
        }
    }

    /// Produces the next turn: flips the phase and draws the pause.
    pub fn next_turn(&mut self, now_ms: u64) -> Turn {
        self.phase = self.phase.flipped();
        Turn {
            phase: self.phase,
            duration_ms: TURN_DURATION_MS,
            start_time_ms: now_ms,
            pause_ms: self.rng.gen_range(TURN_PAUSE_MIN_MS..=TURN_PAUSE_MAX_MS),
        }
    }

    /// Announce-then-wait-full-cycle loop. Exits only when the network sender
    /// side has shut down.
    pub async fn run(mut self, game_tx: mpsc::UnboundedSender<GameMessage>) {
        info!("Sentinel driver started");

        loop {
            let turn = self.next_turn(epoch_millis());
            debug!(
                "Sentinel turning {:?} at {} for {}ms, next cycle in {}ms",
                turn.phase,
                turn.start_time_ms,
                turn.duration_ms,
                turn.duration_ms + turn.pause_ms
            );

            if game_tx
                .send(GameMessage::BroadcastPacket {
                    packet: turn.packet(),
                })
                .is_err()
            {
                info!("Sentinel driver stopping: broadcast channel closed");
                break;
            }

            sleep(Duration::from_millis(turn.duration_ms + turn.pause_ms)).await;
        }
    }
}

impl Default for SentinelDriver {
    fn default() -> Self {
        Self::new()
    }
}
