//! Clock-compensated sentinel turn scheduler
//!
//! The server stamps each turn with its own wall clock, but the client
//! animates on a monotonic render clock that shares no epoch with the server.
//! On every announcement the client samples its wall clock and monotonic
//! clock at the same instant; the difference maps the server's absolute start
//! time into the local monotonic domain. The offset is sampled fresh per
//! announcement, so slow clock drift never accumulates across turns.
//!
//! Per-turn state machine: announced turns become `Scheduled` with a local
//! deadline, begin `Turning` once the render clock reaches that deadline (a
//! deadline already in the past fires on the next tick, never with a negative
//! delay), and `Settle` after exactly the announced duration with the angle
//! snapped to the target.

use log::{debug, warn};
use shared::{epoch_millis, Phase};
use std::time::Instant;

/// One-shot pairing of a wall-clock reading and a monotonic reading taken at
/// the same instant.
#[derive(Debug, Clone, Copy)]
pub struct ClockOffset {
    pub epoch_at_sample: u64,
    /// Milliseconds on the local monotonic clock (relative to its anchor).
    pub monotonic_at_sample: u64,
}

impl ClockOffset {
    /// Samples both clocks back to back. `anchor` is the instant the client's
    /// monotonic clock started counting from.
    pub fn sample(anchor: Instant) -> Self {
        Self {
            epoch_at_sample: epoch_millis(),
            monotonic_at_sample: anchor.elapsed().as_millis() as u64,
        }
    }

    pub fn from_parts(epoch_at_sample: u64, monotonic_at_sample: u64) -> Self {
        Self {
            epoch_at_sample,
            monotonic_at_sample,
        }
    }

    /// Wall-clock minus monotonic at the sample instant.
    pub fn offset_ms(&self) -> i64 {
        self.epoch_at_sample as i64 - self.monotonic_at_sample as i64
    }

    /// Translates a server wall-clock stamp into the local monotonic domain.
    /// Negative results mean the stamped instant predates the local clock's
    /// anchor; results below "now" mean the deadline has already passed.
    pub fn epoch_to_monotonic_ms(&self, epoch_ms: u64) -> i64 {
        epoch_ms as i64 - self.offset_ms()
    }
}

/// Lifecycle of the currently tracked turn.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TurnState {
    /// No turn pending; terminal state between announcements.
    Settled,
    /// Deadline computed, waiting for the render clock to reach it.
    Scheduled {
        phase: Phase,
        duration_ms: u64,
        deadline_ms: i64,
    },
    /// Time-parameterized sweep from the starting angle to the phase angle.
    Turning {
        phase: Phase,
        duration_ms: u64,
        started_ms: u64,
        from_angle: f32,
    },
}

/// Drives the sentinel's visible yaw from announced turns and render ticks.
///
/// All methods take "now" as milliseconds on the caller's monotonic clock so
/// the scheduler itself never reads a clock.
pub struct SentinelScheduler {
    state: TurnState,
    angle: f32,
    facing: bool,
}

impl SentinelScheduler {
    /// Starts with the sentinel's back turned, matching the server driver.
    pub fn new() -> Self {
        Self {
            state: TurnState::Settled,
            angle: Phase::Away.angle(),
            facing: false,
        }
    }

    /// Handles a turn announcement received from the server.
    ///
    /// The announcement is dropped while a previous turn is still scheduled
    /// or in progress: the driver's pacing makes that unreachable from a
    /// well-behaved server, and running two sweeps at once would fight over
    /// the angle.
    pub fn announce(
        &mut self,
        phase: Phase,
        duration_ms: u64,
        start_time_ms: u64,
        offset: &ClockOffset,
        now_ms: u64,
    ) {
        match self.state {
            TurnState::Settled => {
                let deadline_ms = offset.epoch_to_monotonic_ms(start_time_ms);
                debug!(
                    "Sentinel turn {:?} scheduled: server start {}, local deadline {} (now {})",
                    phase, start_time_ms, deadline_ms, now_ms
                );
                self.state = TurnState::Scheduled {
                    phase,
                    duration_ms,
                    deadline_ms,
                };
                // A deadline already behind us fires on this same tick.
                self.tick(now_ms);
            }
            TurnState::Scheduled { .. } | TurnState::Turning { .. } => {
                warn!("Ignoring sentinel turn announced while a turn is pending");
            }
        }
    }

    /// Advances the state machine to `now_ms` on the render clock.
    pub fn tick(&mut self, now_ms: u64) {
        match self.state {
            TurnState::Settled => {}

            TurnState::Scheduled {
                phase,
                duration_ms,
                deadline_ms,
            } => {
                if now_ms as i64 >= deadline_ms {
                    self.state = TurnState::Turning {
                        phase,
                        duration_ms,
                        started_ms: now_ms,
                        from_angle: self.angle,
                    };
                }
            }

            TurnState::Turning {
                phase,
                duration_ms,
                started_ms,
                from_angle,
            } => {
                let elapsed = now_ms.saturating_sub(started_ms);
                let t = if duration_ms == 0 {
                    1.0
                } else {
                    (elapsed as f32 / duration_ms as f32).min(1.0)
                };

                let target = phase.angle();
                self.angle = from_angle + (target - from_angle) * t;

                if t >= 1.0 {
                    self.angle = target;
                    self.facing = phase == Phase::Facing;
                    self.state = TurnState::Settled;
                }
            }
        }
    }

    /// Current yaw to render.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Terminal facing flag of the last settled turn. Stays false while a
    /// turn toward the field is still sweeping.
    pub fn is_facing(&self) -> bool {
        self.facing
    }

    pub fn is_turning(&self) -> bool {
        matches!(self.state, TurnState::Turning { .. })
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.state, TurnState::Settled)
    }
}

impl Default for SentinelScheduler {
    fn default() -> Self {
        Self::new()
    }
}
