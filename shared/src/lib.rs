use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const PLAYER_SPEED: f32 = 20.0;
pub const PLAYER_SIZE: f32 = 5.0;
pub const FIELD_HALF_WIDTH: f32 = 350.0;
pub const FIELD_HALF_DEPTH: f32 = 100.0;
pub const GROUND_Y: f32 = 10.0;

pub const SPAWN_X: f32 = -340.0;
pub const SENTINEL_X: f32 = 330.0;

pub const DEFAULT_COLOR: Color = Color::new(0x33, 0x99, 0xff);
pub const CAUGHT_COLOR: Color = Color::new(0xff, 0x00, 0x00);

/// Cadence at which each client reports its own position.
pub const POSITION_SEND_INTERVAL_MS: u64 = 50;

/// Visible duration of one sentinel turn.
pub const TURN_DURATION_MS: u64 = 1000;
/// Bounds of the randomized pause between a finished turn and the next one.
pub const TURN_PAUSE_MIN_MS: u64 = 1000;
pub const TURN_PAUSE_MAX_MS: u64 = 7000;

/// Fraction of the remaining proxy-to-target gap closed per render tick.
pub const CONVERGENCE_FACTOR: f32 = 0.2;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn spawn() -> Self {
        Self::new(SPAWN_X, GROUND_Y, 0.0)
    }

    /// Moves this point a fraction `f` of the way toward `target`.
    pub fn lerp(&self, target: Vec3, f: f32) -> Vec3 {
        Vec3 {
            x: self.x + (target.x - self.x) * f,
            y: self.y + (target.y - self.y) * f,
            z: self.z + (target.z - self.z) * f,
        }
    }

    pub fn distance(&self, other: Vec3) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// RGB color carried on the wire as a fixed-format `#rrggbb` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
        let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
        let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).ok_or_else(|| D::Error::custom(format!("invalid hex color: {}", s)))
    }
}

/// The sentinel's two-state phase: back turned (`Away`, yaw pi) or
/// watching the field (`Facing`, yaw 0).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Away,
    Facing,
}

impl Phase {
    pub fn flipped(self) -> Phase {
        match self {
            Phase::Away => Phase::Facing,
            Phase::Facing => Phase::Away,
        }
    }

    /// Target yaw of the sentinel for this phase.
    pub fn angle(self) -> f32 {
        match self {
            Phase::Away => std::f32::consts::PI,
            Phase::Facing => 0.0,
        }
    }
}

/// Last-known authoritative state of one connected participant.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Participant {
    pub position: Vec3,
    pub color: Color,
}

impl Participant {
    pub fn spawn() -> Self {
        Self {
            position: Vec3::spawn(),
            color: DEFAULT_COLOR,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    UpdatePosition {
        position: Vec3,
        color: Color,
    },
    Disconnect,

    Connected {
        client_id: u32,
    },
    /// Full replace of the registry, never a delta. Receivers drop any
    /// cached id absent from `participants`.
    Snapshot {
        participants: HashMap<u32, Participant>,
    },
    SentinelTurn {
        phase: Phase,
        duration_ms: u64,
        start_time_ms: u64,
    },
    Disconnected {
        reason: String,
    },
}

/// Current wall-clock time as milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}
