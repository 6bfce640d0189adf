//! Difficulty Store: per-player and per-dimension difficulty values.
//!
//! The store is the single owner of every live difficulty value. Players
//! enter on [`DifficultyStore::connect`] and leave on
//! [`DifficultyStore::disconnect`]; there is no background sweep. Every write
//! goes through one clamp so the value is always inside the configured
//! bounds, except for exempt players, who are pinned at 0.
//!
//! Effective writes are recorded twice:
//! - as a [`DifficultyChange`] for sync subscribers ([`DifficultyStore::drain_changes`])
//! - as a dirty key for persistence ([`DifficultyStore::take_dirty_players`])

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::ScalingConfig;
use crate::types::{
    DifficultyBounds, DimensionDifficulty, DimensionId, GameTimestamp, PlayerDifficulty, PlayerId,
};

/// Whose difficulty changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DifficultyTarget {
    /// A player's personal difficulty.
    Player(PlayerId),
    /// A dimension's difficulty.
    Dimension(DimensionId),
}

/// One effective write to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyChange {
    /// Whose value changed.
    pub target: DifficultyTarget,
    /// Value before the write.
    pub old: f64,
    /// Value after the write.
    pub new: f64,
    /// Tick of the write.
    pub tick: u64,
}

/// Holds current difficulty for connected players and known dimensions.
#[derive(Debug, Clone)]
pub struct DifficultyStore {
    bounds: DifficultyBounds,
    starting_value: f64,
    change_per_second: f64,
    players: HashMap<PlayerId, PlayerDifficulty>,
    dimensions: HashMap<DimensionId, DimensionDifficulty>,
    exempt: HashSet<PlayerId>,
    changes: Vec<DifficultyChange>,
    dirty_players: HashSet<PlayerId>,
    dirty_dimensions: HashSet<DimensionId>,
}

impl DifficultyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(bounds: DifficultyBounds, starting_value: f64, change_per_second: f64) -> Self {
        Self {
            bounds,
            starting_value: bounds.clamp(starting_value),
            change_per_second: if change_per_second.is_finite() {
                change_per_second
            } else {
                0.0
            },
            players: HashMap::new(),
            dimensions: HashMap::new(),
            exempt: HashSet::new(),
            changes: Vec::new(),
            dirty_players: HashSet::new(),
            dirty_dimensions: HashSet::new(),
        }
    }

    /// Create a store from (sanitized) configuration, including its exempt list.
    #[must_use]
    pub fn from_config(config: &ScalingConfig) -> Self {
        let mut store = Self::new(
            config.bounds(),
            config.difficulty.starting_value,
            config.difficulty.change_per_second,
        );
        store.exempt.extend(config.difficulty.exempt_players.iter().copied());
        store
    }

    /// Configured bounds.
    #[must_use]
    pub fn bounds(&self) -> DifficultyBounds {
        self.bounds
    }

    /// Value given to players and dimensions on first observation.
    #[must_use]
    pub fn starting_value(&self) -> f64 {
        self.starting_value
    }

    /// Difficulty gained per second at multiplier 1.
    #[must_use]
    pub fn change_per_second(&self) -> f64 {
        self.change_per_second
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Insert a player on connect.
    ///
    /// `loaded` is the record restored from persistence, if any; its value is
    /// re-clamped against the current bounds. Returns the resulting value.
    pub fn connect(
        &mut self,
        player: PlayerId,
        loaded: Option<PlayerDifficulty>,
        now: GameTimestamp,
    ) -> f64 {
        let (value, last_update) = match loaded {
            Some(record) => {
                let clamped = self.pinned_or_clamped(player, record.difficulty);
                if clamped != record.difficulty {
                    self.dirty_players.insert(player);
                }
                (clamped, record.last_update)
            }
            None => (self.pinned_or_clamped(player, self.starting_value), now),
        };

        self.players.insert(
            player,
            PlayerDifficulty {
                player,
                difficulty: value,
                last_update,
            },
        );
        debug!(player = %player, difficulty = value, "Player difficulty connected");
        value
    }

    /// Evict a player on disconnect, returning the final record for saving.
    pub fn disconnect(&mut self, player: PlayerId) -> Option<PlayerDifficulty> {
        self.dirty_players.remove(&player);
        let record = self.players.remove(&player);
        if let Some(r) = &record {
            debug!(player = %player, difficulty = r.difficulty, "Player difficulty evicted");
        }
        record
    }

    /// Whether the player currently has a live entry.
    #[must_use]
    pub fn is_connected(&self, player: PlayerId) -> bool {
        self.players.contains_key(&player)
    }

    /// Live player records.
    pub fn players(&self) -> impl Iterator<Item = &PlayerDifficulty> {
        self.players.values()
    }

    /// Number of live players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    // ------------------------------------------------------------------
    // Player values
    // ------------------------------------------------------------------

    /// Current difficulty. Exempt players resolve to 0; unknown players to
    /// the starting value.
    #[must_use]
    pub fn get(&self, player: PlayerId) -> f64 {
        if self.exempt.contains(&player) {
            return 0.0;
        }
        self.players
            .get(&player)
            .map_or(self.starting_value, |r| r.difficulty)
    }

    /// The live record, if the player is connected.
    #[must_use]
    pub fn record(&self, player: PlayerId) -> Option<&PlayerDifficulty> {
        self.players.get(&player)
    }

    /// Set a player's difficulty, clamped. Creates the entry if absent.
    /// Returns the stored value.
    pub fn set(&mut self, player: PlayerId, value: f64, now: GameTimestamp) -> f64 {
        let new = self.pinned_or_clamped(player, value);
        let starting = self.pinned_or_clamped(player, self.starting_value);
        let record = self.players.entry(player).or_insert_with(|| PlayerDifficulty {
            player,
            difficulty: starting,
            last_update: now,
        });

        let old = record.difficulty;
        record.last_update = now;
        if old != new {
            record.difficulty = new;
            self.dirty_players.insert(player);
            self.changes.push(DifficultyChange {
                target: DifficultyTarget::Player(player),
                old,
                new,
                tick: now.tick,
            });
        }
        new
    }

    /// Add `delta` to a player's difficulty, clamped. A NaN delta is ignored.
    pub fn add(&mut self, player: PlayerId, delta: f64, now: GameTimestamp) -> f64 {
        let delta = if delta.is_nan() { 0.0 } else { delta };
        self.set(player, self.get(player) + delta, now)
    }

    /// Accumulate `change_per_second * elapsed_seconds * multiplier`.
    pub fn advance(
        &mut self,
        player: PlayerId,
        elapsed_seconds: f64,
        multiplier: f64,
        now: GameTimestamp,
    ) -> f64 {
        self.add(player, self.growth(elapsed_seconds, multiplier), now)
    }

    // ------------------------------------------------------------------
    // Exemption
    // ------------------------------------------------------------------

    /// Mark or unmark a player as exempt. Exempt players are pinned at 0.
    pub fn set_exempt(&mut self, player: PlayerId, exempt: bool, now: GameTimestamp) {
        let changed = if exempt {
            self.exempt.insert(player)
        } else {
            self.exempt.remove(&player)
        };
        if changed && self.players.contains_key(&player) {
            let current = self.players.get(&player).map_or(0.0, |r| r.difficulty);
            self.set(player, current, now);
        }
    }

    /// Whether the player is exempt.
    #[must_use]
    pub fn is_exempt(&self, player: PlayerId) -> bool {
        self.exempt.contains(&player)
    }

    // ------------------------------------------------------------------
    // Dimension values
    // ------------------------------------------------------------------

    /// Current dimension difficulty (starting value if never written).
    #[must_use]
    pub fn dimension(&self, dimension: &DimensionId) -> f64 {
        self.dimensions
            .get(dimension)
            .map_or(self.starting_value, |r| r.difficulty)
    }

    /// The live dimension record, if any.
    #[must_use]
    pub fn dimension_record(&self, dimension: &DimensionId) -> Option<&DimensionDifficulty> {
        self.dimensions.get(dimension)
    }

    /// Known dimension records.
    pub fn dimensions(&self) -> impl Iterator<Item = &DimensionDifficulty> {
        self.dimensions.values()
    }

    /// Restore a dimension record loaded from persistence (re-clamped).
    pub fn restore_dimension(&mut self, mut record: DimensionDifficulty) {
        let clamped = self.bounds.clamp(record.difficulty);
        if clamped != record.difficulty {
            self.dirty_dimensions.insert(record.dimension.clone());
            record.difficulty = clamped;
        }
        self.dimensions.insert(record.dimension.clone(), record);
    }

    /// Set a dimension's difficulty, clamped. Returns the stored value.
    pub fn set_dimension(&mut self, dimension: &DimensionId, value: f64, now: GameTimestamp) -> f64 {
        let new = self.bounds.clamp(value);
        let starting = self.starting_value;
        let record = self
            .dimensions
            .entry(dimension.clone())
            .or_insert_with(|| DimensionDifficulty {
                dimension: dimension.clone(),
                difficulty: starting,
                last_update: now,
            });

        let old = record.difficulty;
        record.last_update = now;
        if old != new {
            record.difficulty = new;
            self.dirty_dimensions.insert(dimension.clone());
            self.changes.push(DifficultyChange {
                target: DifficultyTarget::Dimension(dimension.clone()),
                old,
                new,
                tick: now.tick,
            });
        }
        new
    }

    /// Accumulate dimension difficulty over `elapsed_seconds`.
    pub fn advance_dimension(
        &mut self,
        dimension: &DimensionId,
        elapsed_seconds: f64,
        multiplier: f64,
        now: GameTimestamp,
    ) -> f64 {
        let next = self.dimension(dimension) + self.growth(elapsed_seconds, multiplier);
        self.set_dimension(dimension, next, now)
    }

    // ------------------------------------------------------------------
    // Subscribers
    // ------------------------------------------------------------------

    /// Take every change recorded since the last drain, oldest first.
    pub fn drain_changes(&mut self) -> Vec<DifficultyChange> {
        std::mem::take(&mut self.changes)
    }

    /// Take the players written since the last call (for saving).
    pub fn take_dirty_players(&mut self) -> Vec<PlayerId> {
        let mut dirty: Vec<_> = self.dirty_players.drain().collect();
        dirty.sort_unstable();
        dirty
    }

    /// Take the dimensions written since the last call (for saving).
    pub fn take_dirty_dimensions(&mut self) -> Vec<DimensionId> {
        let mut dirty: Vec<_> = self.dirty_dimensions.drain().collect();
        dirty.sort_unstable();
        dirty
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn pinned_or_clamped(&self, player: PlayerId, value: f64) -> f64 {
        if self.exempt.contains(&player) {
            0.0
        } else {
            self.bounds.clamp(value)
        }
    }

    fn growth(&self, elapsed_seconds: f64, multiplier: f64) -> f64 {
        let delta = self.change_per_second * elapsed_seconds * multiplier;
        if delta.is_finite() { delta } else { 0.0 }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
