//! Core type definitions for the scaling difficulty system.
//!
//! All persistent types are serializable and keyed by stable identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Stable identifier for a player (the game account UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Create a new random player ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Namespaced dimension key, e.g. `minecraft:overworld`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DimensionId(pub String);

impl DimensionId {
    /// The overworld dimension.
    #[must_use]
    pub fn overworld() -> Self {
        Self("minecraft:overworld".to_string())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DimensionId {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A 3D position in the game world (block units).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate (height).
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Position {
    /// World origin.
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create a position.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in three dimensions.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance on the horizontal (x/z) plane; height is ignored.
    #[must_use]
    pub fn horizontal_distance(&self, other: &Self) -> f64 {
        let (dx, dz) = (self.x - other.x, self.z - other.z);
        (dx * dx + dz * dz).sqrt()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Game ticks per second of simulated time.
pub const TICKS_PER_SECOND: u64 = 20;

/// Game ticks per in-game day.
pub const TICKS_PER_DAY: u64 = 24_000;

/// In-game timestamp measured in game-ticks since world creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameTimestamp {
    /// Game tick (monotonically increasing).
    pub tick: u64,
    /// Corresponding real-world wall-clock time (for save metadata).
    pub real_time: DateTime<Utc>,
}

impl GameTimestamp {
    /// Create a new game timestamp at the current wall-clock time.
    #[must_use]
    pub fn now(tick: u64) -> Self {
        Self {
            tick,
            real_time: Utc::now(),
        }
    }

    /// Simulated seconds elapsed since `other` (zero if `other` is later).
    #[must_use]
    pub fn seconds_since(&self, other: &Self) -> f64 {
        self.tick.saturating_sub(other.tick) as f64 / TICKS_PER_SECOND as f64
    }

    /// Moon phase `0..8` for this tick (0 = full moon).
    #[must_use]
    pub fn moon_phase(&self) -> u8 {
        ((self.tick / TICKS_PER_DAY) % 8) as u8
    }

    /// Whether this tick falls in the night half of the day cycle.
    #[must_use]
    pub fn is_night(&self) -> bool {
        let time_of_day = self.tick % TICKS_PER_DAY;
        (13_000..23_000).contains(&time_of_day)
    }
}

// ---------------------------------------------------------------------------
// Difficulty Bounds
// ---------------------------------------------------------------------------

/// Inclusive range every stored difficulty value is clamped into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyBounds {
    /// Lowest allowed difficulty.
    pub min: f64,
    /// Highest allowed difficulty.
    pub max: f64,
}

impl DifficultyBounds {
    /// Create bounds. Swaps the ends if given in the wrong order and treats
    /// non-finite ends as the default bounds.
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        if !min.is_finite() || !max.is_finite() {
            return Self::default();
        }
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Clamp `value` into `[min, max]`.
    ///
    /// Never fails: NaN maps to `min`, infinities map to the matching end.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        }
    }

    /// Width of the range.
    #[must_use]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

impl Default for DifficultyBounds {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 250.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Area Mode
// ---------------------------------------------------------------------------

/// Strategy for combining several players' difficulty into one area value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaMode {
    /// Mean of in-range players, weighted inversely by distance.
    #[default]
    WeightedAverage,
    /// Unweighted mean of in-range players.
    Average,
    /// Lowest in-range player.
    Min,
    /// Highest in-range player.
    Max,
    /// Horizontal distance from world spawn times the distance factor.
    DistanceFromSpawn,
    /// Horizontal distance from (0, 0) times the distance factor.
    DistanceFromOrigin,
    /// Weighted average plus the distance-from-spawn term.
    DistanceAndTime,
    /// The dimension's own accumulated value; players are ignored.
    DimensionWide,
}

impl AreaMode {
    /// All modes, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::WeightedAverage,
        Self::Average,
        Self::Min,
        Self::Max,
        Self::DistanceFromSpawn,
        Self::DistanceFromOrigin,
        Self::DistanceAndTime,
        Self::DimensionWide,
    ];

    /// Whether this mode reads player difficulty at all.
    #[must_use]
    pub fn uses_players(self) -> bool {
        matches!(
            self,
            Self::WeightedAverage | Self::Average | Self::Min | Self::Max | Self::DistanceAndTime
        )
    }
}

// ---------------------------------------------------------------------------
// Entity Categories
// ---------------------------------------------------------------------------

/// Category of a killed entity, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityCategory {
    /// Monsters that attack players.
    Hostile,
    /// Animals and other passive mobs.
    Peaceful,
    /// Boss mobs.
    Boss,
    /// Elite mobs spawned with boosted stats.
    Blight,
    /// Another player.
    Player,
    /// Anything the host reported that we have no rule for.
    Unrecognized(String),
}

impl EntityCategory {
    /// Parse a host category string (case-insensitive).
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hostile" | "monster" => Self::Hostile,
            "peaceful" | "passive" | "animal" | "creature" => Self::Peaceful,
            "boss" => Self::Boss,
            "blight" => Self::Blight,
            "player" => Self::Player,
            _ => Self::Unrecognized(raw.to_string()),
        }
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hostile => f.write_str("hostile"),
            Self::Peaceful => f.write_str("peaceful"),
            Self::Boss => f.write_str("boss"),
            Self::Blight => f.write_str("blight"),
            Self::Player => f.write_str("player"),
            Self::Unrecognized(raw) => write!(f, "unrecognized({raw})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A player's accumulated difficulty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDifficulty {
    /// Owning player.
    pub player: PlayerId,
    /// Current value, always within the store's bounds (or 0 if exempt).
    pub difficulty: f64,
    /// When the value was last written.
    pub last_update: GameTimestamp,
}

/// A dimension's accumulated difficulty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionDifficulty {
    /// Owning dimension.
    pub dimension: DimensionId,
    /// Current value, always within the store's bounds.
    pub difficulty: f64,
    /// When the value was last written.
    pub last_update: GameTimestamp,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
