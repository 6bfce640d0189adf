//! Host-side configuration for the difficulty rule.
//!
//! Wraps the engine-agnostic [`ScalingConfig`] with the tick cadence, sync
//! radius and world spawn points that only the embedding engine knows about.

use std::collections::BTreeMap;

use scaling_core::config::ScalingConfig;
use scaling_core::types::{DimensionId, Position, TICKS_PER_SECOND};

// ---------------------------------------------------------------------------
// Host Configuration
// ---------------------------------------------------------------------------

/// Extended configuration for the host integration layer.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Engine-agnostic difficulty configuration.
    pub scaling: ScalingConfig,
    /// Ticks between accumulation steps (20 = once per simulated second).
    pub ticks_per_update: u64,
    /// Ticks between client sync flushes.
    pub sync_interval_ticks: u64,
    /// Radius (blocks) within which players receive each other's values.
    pub sync_radius: f64,
    /// World spawn per dimension. Missing dimensions use the origin.
    pub spawn_points: BTreeMap<DimensionId, Position>,
    /// Per-tick time budget (μs) above which a tick is logged as slow.
    pub tick_budget_us: u64,
}

impl HostConfig {
    /// Wrap a (sanitized) scaling config with default host tuning.
    #[must_use]
    pub fn with_scaling(scaling: ScalingConfig) -> Self {
        Self {
            scaling,
            ..Self::default()
        }
    }

    /// Spawn point of `dimension`.
    #[must_use]
    pub fn spawn(&self, dimension: &DimensionId) -> Position {
        self.spawn_points
            .get(dimension)
            .copied()
            .unwrap_or(Position::ORIGIN)
    }

    /// Ticks between auto-saves.
    #[must_use]
    pub fn auto_save_interval_ticks(&self) -> u64 {
        u64::from(self.scaling.persistence.auto_save_interval_seconds) * TICKS_PER_SECOND
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            scaling: ScalingConfig::default(),
            ticks_per_update: TICKS_PER_SECOND,
            sync_interval_ticks: 5 * TICKS_PER_SECOND,
            sync_radius: 256.0,
            spawn_points: BTreeMap::new(),
            tick_budget_us: 2000,
        }
    }
}

// ---------------------------------------------------------------------------
// Tick Budget Tracker
// ---------------------------------------------------------------------------

/// Time spent in each phase of the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickBudget {
    /// Accumulation step time (μs).
    pub accumulation_us: u64,
    /// Sync flush time (μs).
    pub sync_us: u64,
    /// Auto-save time (μs).
    pub save_us: u64,
    /// Players advanced this tick.
    pub players_processed: u32,
}

impl TickBudget {
    /// Total time spent this tick (μs).
    #[must_use]
    pub fn total_us(&self) -> u64 {
        self.accumulation_us + self.sync_us + self.save_us
    }

    /// Whether the tick stayed under `limit_us`.
    #[must_use]
    pub fn within(&self, limit_us: u64) -> bool {
        self.total_us() < limit_us
    }

    /// Reset counters for a new tick.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_update_once_per_second() {
        let config = HostConfig::default();
        assert_eq!(config.ticks_per_update, 20);
        assert_eq!(config.auto_save_interval_ticks(), 300 * 20);
    }

    #[test]
    fn missing_spawn_is_origin() {
        let mut config = HostConfig::default();
        let nether = DimensionId::from("minecraft:the_nether");
        assert_eq!(config.spawn(&nether), Position::ORIGIN);

        config.spawn_points.insert(nether.clone(), Position::new(8.0, 70.0, -8.0));
        assert_eq!(config.spawn(&nether), Position::new(8.0, 70.0, -8.0));
    }

    #[test]
    fn tick_budget_tracking() {
        let mut budget = TickBudget {
            accumulation_us: 400,
            sync_us: 300,
            save_us: 0,
            players_processed: 10,
        };
        assert_eq!(budget.total_us(), 700);
        assert!(budget.within(2000));

        budget.save_us = 1500;
        assert!(!budget.within(2000));

        budget.reset();
        assert_eq!(budget.total_us(), 0);
    }
}
