//! Difficulty Rule: binds host callbacks to the difficulty accumulator.
//!
//! The rule owns every piece of difficulty state for one server: the store,
//! player sessions, the compiled mutators and an optional persistence
//! engine. Handlers are plain functions taking `&mut DifficultyRule`, so a
//! thin engine-side adapter can call them from its own event bus and tick
//! scheduler. Nothing here spawns threads or blocks on I/O beyond `SQLite`.
//!
//! Failures never abort a tick. Persistence errors are logged and the
//! in-memory value stays authoritative until the next save.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, warn};

use scaling_core::area::{AreaAggregator, AreaQuery, DifficultySource};
use scaling_core::error::Result;
use scaling_core::health::PlayerHealth;
use scaling_core::items::{HeartItem, ItemEffects};
use scaling_core::mobs::{MobScaler, MobScaling, MobStats};
use scaling_core::mutator::{EventMutator, MutationOutcome, TriggerEvent};
use scaling_core::persistence::PersistenceEngine;
use scaling_core::store::DifficultyStore;
use scaling_core::types::{
    DimensionDifficulty, DimensionId, EntityCategory, GameTimestamp, PlayerDifficulty, PlayerId,
    Position, TICKS_PER_SECOND,
};

use crate::components::PlayerSession;
use crate::config::{HostConfig, TickBudget};
use crate::events::GameEvent;
use crate::sync::{self, SyncMessage, SyncPacket};

// ---------------------------------------------------------------------------
// Difficulty Rule State
// ---------------------------------------------------------------------------

/// Central state for the difficulty rule.
pub struct DifficultyRule {
    /// Host configuration (sanitized on construction).
    pub config: HostConfig,
    /// Live difficulty values.
    pub store: DifficultyStore,
    /// Area aggregation under the configured mode.
    pub aggregator: AreaAggregator,
    /// Compiled event mutators.
    pub mutator: EventMutator,
    /// Mob spawn scaling.
    pub mobs: MobScaler,
    /// Heart item effects.
    pub items: ItemEffects,
    /// Connected players.
    pub sessions: HashMap<PlayerId, PlayerSession>,
    /// Current game tick (updated by [`on_tick`]).
    pub current_tick: u64,
    /// Timings of the last tick.
    pub budget: TickBudget,
    persistence: Option<PersistenceEngine>,
    last_step_tick: Option<u64>,
    last_sync_tick: u64,
    last_save_tick: u64,
    dirty_health: HashSet<PlayerId>,
    outbox: Vec<SyncPacket>,
    rng: StdRng,
}

impl std::fmt::Debug for DifficultyRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DifficultyRule")
            .field("players", &self.sessions.len())
            .field("current_tick", &self.current_tick)
            .field("persistence", &self.persistence)
            .finish_non_exhaustive()
    }
}

impl DifficultyRule {
    /// Create a rule without persistence. The scaling config is sanitized
    /// here; rejected values are logged and replaced by defaults.
    #[must_use]
    pub fn new(mut config: HostConfig) -> Self {
        let warnings = config.scaling.sanitize();
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "Difficulty config had invalid values");
        }
        let bounds = config.scaling.bounds();
        Self {
            store: DifficultyStore::from_config(&config.scaling),
            aggregator: AreaAggregator::from_config(&config.scaling),
            mutator: EventMutator::from_config(&config.scaling.mutators, bounds),
            mobs: MobScaler::new(config.scaling.mobs.clone(), bounds),
            items: ItemEffects::from_config(&config.scaling),
            config,
            sessions: HashMap::new(),
            current_tick: 0,
            budget: TickBudget::default(),
            persistence: None,
            last_step_tick: None,
            last_sync_tick: 0,
            last_save_tick: 0,
            dirty_health: HashSet::new(),
            outbox: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a rule backed by `engine`, restoring saved dimension values.
    ///
    /// # Errors
    /// Returns an error if saved dimensions cannot be read.
    pub fn with_persistence(config: HostConfig, engine: PersistenceEngine) -> Result<Self> {
        let mut rule = Self::new(config);
        let dimensions = engine.load_dimensions()?;
        info!(
            dimensions = dimensions.len(),
            saved_players = engine.player_count()?,
            "Restored difficulty state"
        );
        for record in dimensions {
            rule.store.restore_dimension(record);
        }
        rule.persistence = Some(engine);
        Ok(rule)
    }

    /// Reseed the generator behind chance hearts.
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// The persistence engine, if any.
    #[must_use]
    pub fn persistence(&self) -> Option<&PersistenceEngine> {
        self.persistence.as_ref()
    }

    /// Whether difficulty changes are enabled.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.scaling.general.enabled
    }

    /// A player's current difficulty.
    #[must_use]
    pub fn difficulty(&self, player: PlayerId) -> f64 {
        self.store.get(player)
    }

    /// A connected player's max health.
    #[must_use]
    pub fn max_health(&self, player: PlayerId) -> Option<f64> {
        self.sessions
            .get(&player)
            .map(|s| s.health.max_health(&self.config.scaling.player_health))
    }

    /// Number of connected players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.sessions.len()
    }

    /// Take every queued sync packet.
    pub fn take_outbox(&mut self) -> Vec<SyncPacket> {
        std::mem::take(&mut self.outbox)
    }

    /// Difficulty at `position` in `dimension` under the configured area mode,
    /// scaled by the first location multiplier matching `dimension` and `biome`.
    ///
    /// Candidates are the connected, non-exempt players in the same dimension.
    #[must_use]
    pub fn area_difficulty_at(
        &self,
        dimension: &DimensionId,
        biome: Option<&str>,
        position: Position,
    ) -> f64 {
        let sources: Vec<DifficultySource> = self
            .sessions
            .iter()
            .filter(|(p, s)| s.dimension == *dimension && !self.store.is_exempt(**p))
            .map(|(p, s)| DifficultySource {
                player: *p,
                position: s.position,
                difficulty: self.store.get(*p),
            })
            .collect();
        let area = self.aggregator.aggregate(&AreaQuery {
            position,
            spawn: self.config.spawn(dimension),
            dimension_value: self.store.dimension(dimension),
            sources: &sources,
            time: Some(GameTimestamp::now(self.current_tick)),
        });
        self.located(area, dimension, biome)
    }

    fn located(&self, area: f64, dimension: &DimensionId, biome: Option<&str>) -> f64 {
        let scale = self
            .config
            .scaling
            .difficulty
            .location_multiplier(dimension, biome);
        self.store.bounds().clamp(area * scale)
    }

    fn player_message(&self, player: PlayerId) -> SyncMessage {
        SyncMessage::PlayerDifficulty {
            player,
            difficulty: self.store.get(player),
            max_health: self.max_health(player).unwrap_or_default(),
        }
    }

    fn send(&mut self, recipient: PlayerId, message: SyncMessage) {
        self.outbox.push(SyncPacket { recipient, message });
    }
}

/// Log a persistence failure and carry on.
fn logged<T>(result: Result<T>, action: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!(action, error = %e, "Difficulty persistence failed");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle Handlers
// ---------------------------------------------------------------------------

fn queue_full_sync(rule: &mut DifficultyRule, player: PlayerId, dimension: &DimensionId) {
    let own = rule.player_message(player);
    rule.send(player, own);
    let difficulty = rule.store.dimension(dimension);
    rule.send(
        player,
        SyncMessage::DimensionDifficulty {
            dimension: dimension.clone(),
            difficulty,
        },
    );
}

/// A player connected. Restores saved state and queues a full sync to them.
///
/// A join for a player who is already connected (a respawn or a host
/// re-announcing the player) keeps the live state and only moves them.
///
/// Returns the player's difficulty.
pub fn on_player_join(
    rule: &mut DifficultyRule,
    player: PlayerId,
    dimension: DimensionId,
    position: Position,
    timestamp: GameTimestamp,
) -> f64 {
    if let Some(session) = rule.sessions.get_mut(&player) {
        session.move_to(dimension.clone(), position);
        queue_full_sync(rule, player, &dimension);
        let difficulty = rule.store.get(player);
        debug!(
            player = %player,
            dimension = %dimension,
            difficulty,
            "Join for connected player"
        );
        return difficulty;
    }

    let (saved, health) = match &rule.persistence {
        Some(engine) => (
            logged(engine.load_player(player), "load_player").flatten(),
            logged(engine.load_health(player), "load_health")
                .flatten()
                .unwrap_or_default(),
        ),
        None => (None, PlayerHealth::default()),
    };

    let restored = saved.is_some();
    let difficulty = rule.store.connect(player, saved, timestamp);
    rule.sessions.insert(
        player,
        PlayerSession::new(dimension.clone(), position, health, timestamp),
    );

    queue_full_sync(rule, player, &dimension);

    info!(
        player = %player,
        dimension = %dimension,
        difficulty,
        restored,
        "Player joined"
    );
    difficulty
}

/// A player disconnected. Saves and evicts their state.
pub fn on_player_leave(rule: &mut DifficultyRule, player: PlayerId, timestamp: GameTimestamp) {
    let session = rule.sessions.remove(&player);
    rule.dirty_health.remove(&player);
    let Some(record) = rule.store.disconnect(player) else {
        debug!(player = %player, "Leave for unknown player ignored");
        return;
    };

    if let Some(engine) = &rule.persistence {
        logged(engine.save_player(&record), "save_player");
        if let Some(s) = &session {
            logged(engine.save_health(player, &s.health), "save_health");
        }
    }

    info!(
        player = %player,
        difficulty = record.difficulty,
        tick = timestamp.tick,
        "Player left"
    );
}

/// A player moved or changed dimension.
pub fn on_player_moved(
    rule: &mut DifficultyRule,
    player: PlayerId,
    dimension: DimensionId,
    position: Position,
    _timestamp: GameTimestamp,
) {
    match rule.sessions.get_mut(&player) {
        Some(session) => session.move_to(dimension, position),
        None => debug!(player = %player, "Move for unknown player ignored"),
    }
}

/// A player entered another biome.
pub fn on_player_biome_changed(rule: &mut DifficultyRule, player: PlayerId, biome: Option<String>) {
    match rule.sessions.get_mut(&player) {
        Some(session) => session.biome = biome,
        None => debug!(player = %player, "Biome change for unknown player ignored"),
    }
}

// ---------------------------------------------------------------------------
// Mutation Handlers
// ---------------------------------------------------------------------------

fn mutate(
    rule: &mut DifficultyRule,
    player: PlayerId,
    event: &TriggerEvent,
    timestamp: GameTimestamp,
) -> Option<MutationOutcome> {
    if !rule.enabled() {
        return None;
    }
    if !rule.sessions.contains_key(&player) {
        debug!(player = %player, ?event, "Event for unknown player ignored");
        return None;
    }
    Some(rule.mutator.apply(&mut rule.store, player, event, timestamp))
}

/// A player killed an entity. Returns the applied mutation, if any.
pub fn on_entity_killed(
    rule: &mut DifficultyRule,
    killer: PlayerId,
    category: EntityCategory,
    entity_type: Option<String>,
    timestamp: GameTimestamp,
) -> Option<MutationOutcome> {
    let event = TriggerEvent::EntityKilled {
        category,
        entity_type,
    };
    mutate(rule, killer, &event, timestamp)
}

/// A player died. Applies the death mutator and the health penalty.
pub fn on_player_died(
    rule: &mut DifficultyRule,
    player: PlayerId,
    timestamp: GameTimestamp,
) -> Option<MutationOutcome> {
    let outcome = mutate(rule, player, &TriggerEvent::PlayerDied, timestamp);

    let health_config = rule.config.scaling.player_health.clone();
    if let Some(session) = rule.sessions.get_mut(&player) {
        let before = session.health;
        let max_health = session.health.on_death(&health_config);
        if session.health != before {
            rule.dirty_health.insert(player);
            debug!(player = %player, max_health, "Death penalty applied");
            let message = rule.player_message(player);
            rule.send(player, message);
        }
    }
    outcome
}

/// A player slept through the night.
pub fn on_player_slept(
    rule: &mut DifficultyRule,
    player: PlayerId,
    timestamp: GameTimestamp,
) -> Option<MutationOutcome> {
    mutate(rule, player, &TriggerEvent::PlayerSlept, timestamp)
}

/// A player used a cursed, enchanted or chance heart. The change is resolved
/// from the `[items]` config and applied like any other mutation.
pub fn on_heart_item_used(
    rule: &mut DifficultyRule,
    player: PlayerId,
    item: HeartItem,
    timestamp: GameTimestamp,
) -> Option<MutationOutcome> {
    let event = rule.items.trigger(item, &mut rule.rng);
    mutate(rule, player, &event, timestamp)
}

/// Result of using a heart container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartContainerUse {
    /// Max health after the container.
    pub max_health: f64,
    /// Health the host should heal the player by.
    pub healed: f64,
}

/// A player used a heart container. Raises max health and reports how much
/// the host should heal.
pub fn on_heart_container_used(
    rule: &mut DifficultyRule,
    player: PlayerId,
    _timestamp: GameTimestamp,
) -> Option<HeartContainerUse> {
    let health_config = rule.config.scaling.player_health.clone();
    let session = rule.sessions.get_mut(&player)?;
    let before = session.health.max_health(&health_config);
    let max_health = session.health.add_heart(&health_config);
    let healed = rule.items.health_restored(max_health - before);
    rule.dirty_health.insert(player);
    let message = rule.player_message(player);
    rule.send(player, message);
    Some(HeartContainerUse { max_health, healed })
}

// ---------------------------------------------------------------------------
// Tick
// ---------------------------------------------------------------------------

fn elapsed_us(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX)
}

/// Per-tick entry point. Runs the accumulation step every
/// `ticks_per_update`, flushes sync every `sync_interval_ticks` and saves
/// dirty records every `auto_save_interval_seconds`.
pub fn on_tick(rule: &mut DifficultyRule, tick: u64) {
    rule.current_tick = tick;
    rule.budget.reset();
    let now = GameTimestamp::now(tick);

    let step_every = rule.config.ticks_per_update.max(1);
    match rule.last_step_tick {
        None => rule.last_step_tick = Some(tick),
        Some(last) if tick.saturating_sub(last) >= step_every => {
            let start = Instant::now();
            let elapsed = tick.saturating_sub(last) as f64 / TICKS_PER_SECOND as f64;
            accumulate(rule, elapsed, now);
            rule.last_step_tick = Some(tick);
            rule.budget.accumulation_us = elapsed_us(start);
        }
        Some(_) => {}
    }

    if tick.saturating_sub(rule.last_sync_tick) >= rule.config.sync_interval_ticks.max(1) {
        let start = Instant::now();
        flush_sync(rule);
        rule.last_sync_tick = tick;
        rule.budget.sync_us = elapsed_us(start);
    }

    if rule.persistence.is_some()
        && tick.saturating_sub(rule.last_save_tick) >= rule.config.auto_save_interval_ticks().max(1)
    {
        let start = Instant::now();
        logged(save_dirty(rule), "auto_save");
        rule.last_save_tick = tick;
        rule.budget.save_us = elapsed_us(start);
    }

    if !rule.budget.within(rule.config.tick_budget_us) {
        warn!(
            tick,
            total_us = rule.budget.total_us(),
            players = rule.budget.players_processed,
            "Difficulty tick over budget"
        );
    }
}

/// Advance every connected player and every occupied dimension.
fn accumulate(rule: &mut DifficultyRule, elapsed_seconds: f64, now: GameTimestamp) {
    if !rule.enabled() {
        return;
    }
    let idle_multiplier = rule.config.scaling.difficulty.idle_multiplier;
    let idle_threshold = rule.config.scaling.difficulty.idle_move_threshold;

    let mut players: Vec<PlayerId> = rule.sessions.keys().copied().collect();
    players.sort_unstable();
    let mut occupied = BTreeSet::new();

    for player in players {
        let Some(session) = rule.sessions.get_mut(&player) else {
            continue;
        };
        let multiplier = if session.is_idle(idle_threshold) {
            idle_multiplier
        } else {
            1.0
        };
        session.end_step();
        occupied.insert(session.dimension.clone());

        rule.store.advance(player, elapsed_seconds, multiplier, now);
        rule.budget.players_processed += 1;
    }

    for dimension in occupied {
        rule.store
            .advance_dimension(&dimension, elapsed_seconds, 1.0, now);
    }
}

/// Turn drained store changes into addressed packets.
fn flush_sync(rule: &mut DifficultyRule) {
    let changes = rule.store.drain_changes();
    if changes.is_empty() {
        return;
    }
    let packets = sync::packets_for_changes(
        &changes,
        &rule.sessions,
        &rule.config.scaling.player_health,
        rule.config.sync_radius,
    );
    debug!(changes = changes.len(), packets = packets.len(), "Queued difficulty sync");
    rule.outbox.extend(packets);
}

/// Save records written since the last save. Returns how many were saved.
fn save_dirty(rule: &mut DifficultyRule) -> Result<usize> {
    let Some(engine) = &rule.persistence else {
        return Ok(0);
    };
    let players: Vec<PlayerDifficulty> = rule
        .store
        .take_dirty_players()
        .into_iter()
        .filter_map(|p| rule.store.record(p).cloned())
        .collect();
    let dimensions: Vec<DimensionDifficulty> = rule
        .store
        .take_dirty_dimensions()
        .iter()
        .filter_map(|d| rule.store.dimension_record(d).cloned())
        .collect();
    engine.save_snapshot(&players, &dimensions)?;

    let mut saved = players.len() + dimensions.len();
    for player in rule.dirty_health.drain() {
        if let Some(session) = rule.sessions.get(&player) {
            engine.save_health(player, &session.health)?;
            saved += 1;
        }
    }
    debug!(saved, "Auto-saved difficulty");
    Ok(saved)
}

/// Save every connected player, their health and every known dimension.
/// Call on shutdown. Returns how many records were written.
///
/// # Errors
/// Returns an error if any write fails.
pub fn save_all(rule: &mut DifficultyRule) -> Result<usize> {
    let Some(engine) = &rule.persistence else {
        return Ok(0);
    };
    let players: Vec<PlayerDifficulty> = rule.store.players().cloned().collect();
    let dimensions: Vec<DimensionDifficulty> = rule.store.dimensions().cloned().collect();
    engine.save_snapshot(&players, &dimensions)?;
    for (player, session) in &rule.sessions {
        engine.save_health(*player, &session.health)?;
    }

    rule.store.take_dirty_players();
    rule.store.take_dirty_dimensions();
    rule.dirty_health.clear();
    rule.last_save_tick = rule.current_tick;

    let saved = players.len() + dimensions.len() + rule.sessions.len();
    info!(saved, "Saved all difficulty state");
    Ok(saved)
}

// ---------------------------------------------------------------------------
// Spawns & Direct Updates
// ---------------------------------------------------------------------------

/// Scale a mob spawning at `position` (in `biome`, if known), rolling the
/// blight chance with `rng`.
pub fn scale_mob_spawn<R: Rng + ?Sized>(
    rule: &DifficultyRule,
    dimension: &DimensionId,
    biome: Option<&str>,
    position: Position,
    category: &EntityCategory,
    base: MobStats,
    rng: &mut R,
) -> MobScaling {
    let difficulty = rule.area_difficulty_at(dimension, biome, position);
    let scaled = rule.mobs.scale(category, base, difficulty, rng);
    if scaled.blight {
        debug!(%dimension, %position, difficulty, "Blight spawned");
    }
    scaled
}

/// Direct update for hosts that run their own scheduler instead of
/// [`on_tick`].
///
/// Moves `player` to `position` (joining them in the overworld if unknown),
/// advances their difficulty by `elapsed_seconds` (idle multiplier applies
/// if they moved less than the idle threshold since the last update), and
/// returns the difficulty in effect at their position: the area value over
/// the player and the `nearby` players, scaled by the location multiplier of
/// their dimension and biome.
pub fn update_player(
    rule: &mut DifficultyRule,
    player: PlayerId,
    position: Position,
    elapsed_seconds: f64,
    nearby: &[(PlayerId, Position)],
) -> f64 {
    let now = GameTimestamp::now(rule.current_tick);
    let (dimension, biome) = match rule.sessions.get_mut(&player) {
        Some(session) => {
            let dimension = session.dimension.clone();
            session.move_to(dimension.clone(), position);
            (dimension, session.biome.clone())
        }
        None => {
            let dimension = DimensionId::overworld();
            on_player_join(rule, player, dimension.clone(), position, now);
            (dimension, None)
        }
    };

    if rule.enabled() {
        let idle_threshold = rule.config.scaling.difficulty.idle_move_threshold;
        let mut multiplier = 1.0;
        if let Some(session) = rule.sessions.get_mut(&player) {
            if session.is_idle(idle_threshold) {
                multiplier = rule.config.scaling.difficulty.idle_multiplier;
            }
            session.end_step();
        }
        rule.store.advance(player, elapsed_seconds, multiplier, now);
    }

    let sources: Vec<DifficultySource> = std::iter::once((player, position))
        .chain(nearby.iter().copied().filter(|(p, _)| *p != player))
        .filter(|(p, _)| !rule.store.is_exempt(*p))
        .map(|(p, pos)| DifficultySource {
            player: p,
            position: pos,
            difficulty: rule.store.get(p),
        })
        .collect();
    let area = rule.aggregator.aggregate(&AreaQuery {
        position,
        spawn: rule.config.spawn(&dimension),
        dimension_value: rule.store.dimension(&dimension),
        sources: &sources,
        time: Some(now),
    });
    rule.located(area, &dimension, biome.as_deref())
}

// ---------------------------------------------------------------------------
// Event Dispatch
// ---------------------------------------------------------------------------

/// Process a [`GameEvent`], dispatching to the matching handler.
pub fn handle_event(rule: &mut DifficultyRule, event: &GameEvent) {
    let timestamp = *event.timestamp();
    match event {
        GameEvent::PlayerJoined {
            player,
            dimension,
            position,
            ..
        } => {
            on_player_join(rule, *player, dimension.clone(), *position, timestamp);
        }
        GameEvent::PlayerLeft { player, .. } => on_player_leave(rule, *player, timestamp),
        GameEvent::PlayerMoved {
            player,
            dimension,
            position,
            ..
        } => on_player_moved(rule, *player, dimension.clone(), *position, timestamp),
        GameEvent::BiomeChanged { player, biome, .. } => {
            on_player_biome_changed(rule, *player, biome.clone());
        }
        GameEvent::EntityKilled {
            killer,
            category,
            entity_type,
            ..
        } => {
            on_entity_killed(rule, *killer, category.clone(), entity_type.clone(), timestamp);
        }
        GameEvent::PlayerDied { player, .. } => {
            on_player_died(rule, *player, timestamp);
        }
        GameEvent::PlayerSlept { player, .. } => {
            on_player_slept(rule, *player, timestamp);
        }
        GameEvent::HeartContainerUsed { player, .. } => {
            on_heart_container_used(rule, *player, timestamp);
        }
        GameEvent::HeartItemUsed { player, item, .. } => {
            on_heart_item_used(rule, *player, *item, timestamp);
        }
        GameEvent::Tick { .. } => on_tick(rule, timestamp.tick),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use scaling_core::config::{LocationMultiplier, ScalingConfig};
    use scaling_core::types::AreaMode;

    use crate::hooks;

    fn ts(tick: u64) -> GameTimestamp {
        GameTimestamp::now(tick)
    }

    fn config() -> HostConfig {
        let mut scaling = ScalingConfig::default();
        scaling.difficulty.max_value = 100.0;
        scaling.difficulty.change_per_second = 1.0;
        scaling.difficulty.idle_multiplier = 0.5;
        scaling.mutators.on_hostile_killed = "d + 2".to_string();
        scaling.mutators.on_player_death = "d - 5".to_string();
        scaling.player_health.death_penalty = 2.0;
        HostConfig::with_scaling(scaling)
    }

    fn overworld() -> DimensionId {
        DimensionId::overworld()
    }

    fn joined(rule: &mut DifficultyRule) -> PlayerId {
        let player = PlayerId::new();
        on_player_join(rule, player, overworld(), Position::ORIGIN, ts(0));
        player
    }

    /// Drive `on_tick` for `seconds` simulated seconds, moving `walker` one
    /// block per tick if given.
    fn run(rule: &mut DifficultyRule, from: u64, seconds: u64, walker: Option<PlayerId>) -> u64 {
        let end = from + seconds * TICKS_PER_SECOND;
        for tick in from..=end {
            if let Some(p) = walker {
                on_player_moved(rule, p, overworld(), Position::new(tick as f64, 64.0, 0.0), ts(tick));
            }
            on_tick(rule, tick);
        }
        end
    }

    #[test]
    fn join_queues_full_sync() {
        let mut rule = DifficultyRule::new(config());
        let player = joined(&mut rule);
        let packets = rule.take_outbox();
        assert_eq!(packets.len(), 2);
        assert!(packets.iter().all(|p| p.recipient == player));
        assert!(rule.take_outbox().is_empty());
    }

    #[test]
    fn moving_players_accumulate_at_full_rate() {
        let mut rule = DifficultyRule::new(config());
        let player = joined(&mut rule);
        run(&mut rule, 0, 10, Some(player));
        assert!((rule.difficulty(player) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn idle_players_accumulate_slower() {
        let mut rule = DifficultyRule::new(config());
        let player = joined(&mut rule);
        run(&mut rule, 0, 10, None);
        assert!((rule.difficulty(player) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn occupied_dimension_accumulates() {
        let mut rule = DifficultyRule::new(config());
        joined(&mut rule);
        run(&mut rule, 0, 4, None);
        assert!((rule.store.dimension(&overworld()) - 4.0).abs() < 1e-9);
        let nether = DimensionId::from("minecraft:the_nether");
        assert!(rule.store.dimension(&nether).abs() < f64::EPSILON);
    }

    #[test]
    fn disabled_rule_freezes_difficulty() {
        let mut config = config();
        config.scaling.general.enabled = false;
        let mut rule = DifficultyRule::new(config);
        let player = joined(&mut rule);
        run(&mut rule, 0, 10, Some(player));
        assert!(on_entity_killed(&mut rule, player, EntityCategory::Hostile, None, ts(300)).is_none());
        assert!(rule.difficulty(player).abs() < f64::EPSILON);
    }

    #[test]
    fn kills_and_deaths_mutate() {
        let mut rule = DifficultyRule::new(config());
        let player = joined(&mut rule);
        rule.store.set(player, 20.0, ts(1));

        let outcome = on_entity_killed(&mut rule, player, EntityCategory::Hostile, None, ts(2))
            .expect("outcome");
        assert!((outcome.new - 22.0).abs() < 1e-9);

        on_player_died(&mut rule, player, ts(3));
        assert!((rule.difficulty(player) - 17.0).abs() < 1e-9);
        assert!((rule.max_health(player).expect("health") - 18.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_player_events_are_ignored() {
        let mut rule = DifficultyRule::new(config());
        let stranger = PlayerId::new();
        assert!(on_player_slept(&mut rule, stranger, ts(1)).is_none());
        assert!(on_heart_container_used(&mut rule, stranger, ts(1)).is_none());
        on_player_leave(&mut rule, stranger, ts(1));
        assert_eq!(rule.player_count(), 0);
    }

    #[test]
    fn sync_flush_addresses_changes() {
        let mut rule = DifficultyRule::new(config());
        let player = joined(&mut rule);
        rule.take_outbox();

        run(&mut rule, 0, 5, None);
        let packets = rule.take_outbox();
        assert!(packets.iter().any(|p| p.recipient == player
            && matches!(p.message, SyncMessage::PlayerDifficulty { .. })));
        assert!(packets.iter().all(|p| p.message.to_json().is_ok()));
    }

    #[test]
    fn area_excludes_exempt_and_other_dimensions() {
        let mut scaling = config().scaling;
        scaling.area.mode = AreaMode::Max;
        let mut rule = DifficultyRule::new(HostConfig::with_scaling(scaling));

        let (a, b, c) = (joined(&mut rule), joined(&mut rule), PlayerId::new());
        on_player_join(&mut rule, c, DimensionId::from("minecraft:the_nether"), Position::ORIGIN, ts(0));
        rule.store.set(a, 10.0, ts(1));
        rule.store.set(b, 80.0, ts(1));
        rule.store.set(c, 99.0, ts(1));
        rule.store.set_exempt(b, true, ts(2));

        let area = rule.area_difficulty_at(&overworld(), None, Position::new(5.0, 64.0, 0.0));
        assert!((area - 10.0).abs() < 1e-9);
    }

    #[test]
    fn location_multiplier_scales_area() {
        let mut scaling = config().scaling;
        scaling.area.mode = AreaMode::Max;
        scaling.difficulty.location_multipliers = vec![LocationMultiplier {
            dimensions: Vec::new(),
            biomes: vec!["minecraft:desert".to_string()],
            scale: 1.5,
        }];
        let mut rule = DifficultyRule::new(HostConfig::with_scaling(scaling));
        let player = joined(&mut rule);
        rule.store.set(player, 40.0, ts(1));

        let here = Position::new(4.0, 64.0, 0.0);
        assert!((rule.area_difficulty_at(&overworld(), None, here) - 40.0).abs() < 1e-9);
        assert!(
            (rule.area_difficulty_at(&overworld(), Some("minecraft:desert"), here) - 60.0).abs()
                < 1e-9
        );

        // Clamped to the configured maximum.
        rule.store.set(player, 90.0, ts(2));
        assert!(
            (rule.area_difficulty_at(&overworld(), Some("desert"), here) - 100.0).abs() < 1e-9
        );

        on_player_biome_changed(&mut rule, player, Some("minecraft:desert".to_string()));
        let value = update_player(&mut rule, player, here, 0.0, &[]);
        assert!((value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn mob_spawn_uses_area_difficulty() {
        let mut rule = DifficultyRule::new(config());
        let player = joined(&mut rule);
        rule.store.set(player, 100.0, ts(1));

        let base = MobStats {
            health: 20.0,
            damage: 3.0,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let scaled = scale_mob_spawn(
            &rule,
            &overworld(),
            None,
            Position::new(8.0, 64.0, 8.0),
            &EntityCategory::Peaceful,
            base,
            &mut rng,
        );
        let expected = 20.0 + 100.0 * rule.config.scaling.mobs.peaceful_health_per_difficulty;
        assert!((scaled.health - expected).abs() < 1e-9);
        assert!(!scaled.blight);
    }

    #[test]
    fn update_player_returns_area_value() {
        let mut scaling = config().scaling;
        scaling.area.mode = AreaMode::Average;
        let mut rule = DifficultyRule::new(HostConfig::with_scaling(scaling));

        let player = PlayerId::new();
        let value = update_player(&mut rule, player, Position::ORIGIN, 0.0, &[]);
        assert!(value.abs() < f64::EPSILON);
        assert_eq!(rule.player_count(), 1);

        // Moved 10 blocks: full rate.
        let own = update_player(&mut rule, player, Position::new(10.0, 64.0, 0.0), 10.0, &[]);
        assert!((own - 10.0).abs() < 1e-9);

        let friend = joined(&mut rule);
        rule.store.set(friend, 30.0, ts(1));
        let shared = update_player(
            &mut rule,
            player,
            Position::new(10.0, 64.0, 0.0),
            0.0,
            &[(friend, Position::new(12.0, 64.0, 0.0))],
        );
        // Mean of 10 and 30, plus 5% for the second player.
        assert!((shared - 21.0).abs() < 1e-9);
    }

    #[test]
    fn repeat_join_keeps_live_difficulty() {
        let engine = PersistenceEngine::open_in_memory().expect("open");
        let mut rule = DifficultyRule::with_persistence(config(), engine).expect("rule");
        let player = joined(&mut rule);
        let tick = run(&mut rule, 0, 2, Some(player));
        save_all(&mut rule).expect("save_all");
        run(&mut rule, tick + 1, 2, Some(player));
        let before = rule.difficulty(player);
        let saved = rule.persistence().expect("engine").load_player(player).expect("load");
        assert!(saved.expect("saved").difficulty < before);
        rule.take_outbox();

        let nether = DimensionId::from("minecraft:the_nether");
        let value = on_player_join(&mut rule, player, nether.clone(), Position::ORIGIN, ts(100));
        assert!((value - before).abs() < f64::EPSILON);
        assert!((rule.difficulty(player) - before).abs() < f64::EPSILON);
        assert_eq!(rule.player_count(), 1);
        assert_eq!(rule.sessions[&player].dimension, nether);
        assert_eq!(rule.take_outbox().len(), 2);
    }

    #[test]
    fn heart_items_change_difficulty() {
        let mut rule = DifficultyRule::new(config());
        rule.seed_rng(5);
        let player = joined(&mut rule);
        rule.store.set(player, 50.0, ts(1));

        let outcome = on_heart_item_used(&mut rule, player, HeartItem::Cursed, ts(2)).expect("outcome");
        assert!((outcome.new - 60.0).abs() < 1e-9);
        on_heart_item_used(&mut rule, player, HeartItem::Enchanted, ts(3));
        assert!((rule.difficulty(player) - 50.0).abs() < 1e-9);

        let outcome = on_heart_item_used(&mut rule, player, HeartItem::Chance, ts(4)).expect("outcome");
        let change = outcome.new - outcome.old;
        assert!((-10.0..=10.0).contains(&change));
        assert!(change.fract().abs() < 1e-9);

        rule.store.set_exempt(player, true, ts(5));
        let outcome = on_heart_item_used(&mut rule, player, HeartItem::Cursed, ts(6)).expect("outcome");
        assert!(outcome.new.abs() < f64::EPSILON);
    }

    #[test]
    fn heart_container_reports_healing() {
        let mut rule = DifficultyRule::new(config());
        let player = joined(&mut rule);
        let used = on_heart_container_used(&mut rule, player, ts(1)).expect("used");
        assert!((used.max_health - 22.0).abs() < f64::EPSILON);
        assert!((used.healed - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn handle_event_dispatches() {
        let mut rule = DifficultyRule::new(config());
        let player = PlayerId::new();
        handle_event(&mut rule, &hooks::on_player_join(player, overworld(), Position::ORIGIN, ts(0)));
        handle_event(&mut rule, &hooks::on_entity_killed(player, "monster", None, ts(1)));
        assert!((rule.difficulty(player) - 2.0).abs() < 1e-9);

        handle_event(&mut rule, &hooks::on_heart_container_used(player, ts(2)));
        assert!((rule.max_health(player).expect("health") - 22.0).abs() < f64::EPSILON);

        handle_event(&mut rule, &hooks::on_heart_item_used(player, HeartItem::Cursed, ts(3)));
        assert!((rule.difficulty(player) - 12.0).abs() < 1e-9);

        handle_event(&mut rule, &hooks::on_biome_changed(player, Some("minecraft:plains"), ts(4)));
        assert_eq!(rule.sessions[&player].biome.as_deref(), Some("minecraft:plains"));

        handle_event(&mut rule, &hooks::on_tick(40));
        assert_eq!(rule.current_tick, 40);

        handle_event(&mut rule, &hooks::on_player_leave(player, ts(41)));
        assert_eq!(rule.player_count(), 0);
    }

    #[test]
    fn state_survives_reconnect_and_restart() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("difficulty.db");
        let persistence = config().scaling.persistence;

        let player = PlayerId::new();
        {
            let engine = PersistenceEngine::open(&path, &persistence).expect("open");
            let mut rule = DifficultyRule::with_persistence(config(), engine).expect("rule");
            on_player_join(&mut rule, player, overworld(), Position::ORIGIN, ts(0));
            rule.store.set(player, 42.0, ts(1));
            on_heart_container_used(&mut rule, player, ts(2));
            run(&mut rule, 0, 2, Some(player));

            on_player_leave(&mut rule, player, ts(100));
            assert!(rule.persistence().expect("engine").load_player(player).expect("load").is_some());

            on_player_join(&mut rule, player, overworld(), Position::ORIGIN, ts(200));
            assert!((rule.difficulty(player) - 44.0).abs() < 1e-9);
            assert!(save_all(&mut rule).expect("save_all") >= 2);
        }

        let engine = PersistenceEngine::open(&path, &persistence).expect("reopen");
        let mut rule = DifficultyRule::with_persistence(config(), engine).expect("rule");
        assert!((rule.store.dimension(&overworld()) - 2.0).abs() < 1e-9);
        on_player_join(&mut rule, player, overworld(), Position::ORIGIN, ts(0));
        assert!((rule.difficulty(player) - 44.0).abs() < 1e-9);
        assert!((rule.max_health(player).expect("health") - 22.0).abs() < f64::EPSILON);
    }

    #[test]
    fn auto_save_flushes_dirty_records() {
        let mut config = config();
        config.scaling.persistence.auto_save_interval_seconds = 1;
        let engine = PersistenceEngine::open_in_memory().expect("open");
        let mut rule = DifficultyRule::with_persistence(config, engine).expect("rule");
        let player = joined(&mut rule);

        run(&mut rule, 0, 3, Some(player));
        let saved = rule
            .persistence()
            .expect("engine")
            .load_player(player)
            .expect("load")
            .expect("auto-saved");
        assert!(saved.difficulty > 0.0);
    }
}
