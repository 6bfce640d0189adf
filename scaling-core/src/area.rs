//! Area Aggregator: one difficulty value for a point in the world.
//!
//! Mob spawns and area displays do not belong to a single player, so the
//! difficulty at a position is derived from the players around it (or from
//! the position itself) according to the configured [`AreaMode`].
//!
//! | Mode                    | Result                                          |
//! |-------------------------|-------------------------------------------------|
//! | `WeightedAverage`       | Σ wᵢ·dᵢ / Σ wᵢ with wᵢ = 1 / (1 + distanceᵢ)    |
//! | `Average`               | mean of dᵢ                                      |
//! | `Min` / `Max`           | extremal dᵢ                                     |
//! | `DistanceFromSpawn`     | horizontal distance to spawn × factor           |
//! | `DistanceFromOrigin`    | horizontal distance to (0, 0) × factor          |
//! | `DistanceAndTime`       | weighted average + distance-from-spawn term     |
//! | `DimensionWide`         | the dimension's own value                       |
//!
//! Player-based modes return the dimension value unchanged when nobody is
//! within `search_radius`. With `ignore_y_axis` (the default) player
//! distances are measured on the horizontal plane.

use serde::{Deserialize, Serialize};

use crate::config::{AreaConfig, ScalingConfig};
use crate::types::{AreaMode, DifficultyBounds, GameTimestamp, PlayerId, Position};

/// One candidate contributor to an area value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultySource {
    /// Contributing player.
    pub player: PlayerId,
    /// Where the player stands.
    pub position: Position,
    /// The player's current difficulty.
    pub difficulty: f64,
}

/// Everything the aggregator needs to know about the queried point.
#[derive(Debug, Clone, Copy)]
pub struct AreaQuery<'a> {
    /// The point being evaluated.
    pub position: Position,
    /// World spawn of the point's dimension.
    pub spawn: Position,
    /// The dimension's accumulated difficulty.
    pub dimension_value: f64,
    /// Players in the same dimension; range filtering happens here.
    pub sources: &'a [DifficultySource],
    /// Query time, for moon-phase multipliers. `None` disables them.
    pub time: Option<GameTimestamp>,
}

/// Combines difficulty sources under an [`AreaMode`].
#[derive(Debug, Clone)]
pub struct AreaAggregator {
    config: AreaConfig,
    bounds: DifficultyBounds,
}

impl AreaAggregator {
    /// Create an aggregator.
    #[must_use]
    pub fn new(config: AreaConfig, bounds: DifficultyBounds) -> Self {
        Self { config, bounds }
    }

    /// Create an aggregator from (sanitized) configuration.
    #[must_use]
    pub fn from_config(config: &ScalingConfig) -> Self {
        Self::new(config.area.clone(), config.bounds())
    }

    /// Configured mode.
    #[must_use]
    pub fn mode(&self) -> AreaMode {
        self.config.mode
    }

    /// Search radius in blocks.
    #[must_use]
    pub fn search_radius(&self) -> f64 {
        self.config.search_radius
    }

    /// Distance from `position` to a source, honouring `ignore_y_axis`.
    #[must_use]
    pub fn distance(&self, position: &Position, source: &Position) -> f64 {
        if self.config.ignore_y_axis {
            source.horizontal_distance(position)
        } else {
            source.distance(position)
        }
    }

    /// Sources within the search radius of `position`, paired with distance.
    #[must_use]
    pub fn in_range<'s>(
        &self,
        position: &Position,
        sources: &'s [DifficultySource],
    ) -> Vec<(f64, &'s DifficultySource)> {
        sources
            .iter()
            .map(|s| (self.distance(position, &s.position), s))
            .filter(|(d, _)| *d <= self.config.search_radius)
            .collect()
    }

    /// Area difficulty under the configured mode.
    #[must_use]
    pub fn aggregate(&self, query: &AreaQuery<'_>) -> f64 {
        self.aggregate_with(self.config.mode, query)
    }

    /// Area difficulty under an explicit mode.
    #[must_use]
    pub fn aggregate_with(&self, mode: AreaMode, query: &AreaQuery<'_>) -> f64 {
        let raw = match mode {
            AreaMode::DimensionWide => query.dimension_value,
            AreaMode::DistanceFromSpawn => self.distance_term(&query.position, &query.spawn),
            AreaMode::DistanceFromOrigin => self.distance_term(&query.position, &Position::ORIGIN),
            AreaMode::DistanceAndTime => {
                let nearby = self.in_range(&query.position, query.sources);
                let time_term = if nearby.is_empty() {
                    query.dimension_value
                } else {
                    weighted_average(&nearby) * self.group_multiplier(nearby.len())
                };
                time_term + self.distance_term(&query.position, &query.spawn)
            }
            AreaMode::WeightedAverage | AreaMode::Average | AreaMode::Min | AreaMode::Max => {
                let nearby = self.in_range(&query.position, query.sources);
                if nearby.is_empty() {
                    return query.dimension_value;
                }
                let base = match mode {
                    AreaMode::Average => {
                        nearby.iter().map(|(_, s)| s.difficulty).sum::<f64>() / nearby.len() as f64
                    }
                    AreaMode::Min => nearby
                        .iter()
                        .map(|(_, s)| s.difficulty)
                        .fold(f64::INFINITY, f64::min),
                    AreaMode::Max => nearby
                        .iter()
                        .map(|(_, s)| s.difficulty)
                        .fold(f64::NEG_INFINITY, f64::max),
                    _ => weighted_average(&nearby),
                };
                base * self.group_multiplier(nearby.len())
            }
        };

        self.bounds.clamp(raw * self.lunar_multiplier(query.time))
    }

    fn distance_term(&self, position: &Position, reference: &Position) -> f64 {
        position.horizontal_distance(reference) * self.config.distance_factor
    }

    fn group_multiplier(&self, players: usize) -> f64 {
        let extra = players.saturating_sub(1) as f64;
        1.0 + self.config.group_bonus_per_player * extra
    }

    fn lunar_multiplier(&self, time: Option<GameTimestamp>) -> f64 {
        if !self.config.lunar.enabled {
            return 1.0;
        }
        match time {
            Some(t) if t.is_night() => self
                .config
                .lunar
                .multipliers
                .get(usize::from(t.moon_phase()))
                .copied()
                .unwrap_or(1.0),
            _ => 1.0,
        }
    }
}

/// Mean weighted by `1 / (1 + distance)`. Always a convex combination, so
/// the result lies between the smallest and largest input.
fn weighted_average(nearby: &[(f64, &DifficultySource)]) -> f64 {
    let (total, weight_sum) = nearby
        .iter()
        .fold((0.0, 0.0), |(total, weights), (distance, source)| {
            let weight = 1.0 / (1.0 + distance);
            (total + weight * source.difficulty, weights + weight)
        });
    if weight_sum > 0.0 { total / weight_sum } else { 0.0 }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TICKS_PER_DAY;

    fn aggregator(mode: AreaMode) -> AreaAggregator {
        let config = AreaConfig {
            mode,
            search_radius: 100.0,
            distance_factor: 0.01,
            group_bonus_per_player: 0.0,
            ..AreaConfig::default()
        };
        AreaAggregator::new(config, DifficultyBounds::new(0.0, 250.0))
    }

    fn source(x: f64, difficulty: f64) -> DifficultySource {
        DifficultySource {
            player: PlayerId::new(),
            position: Position::new(x, 64.0, 0.0),
            difficulty,
        }
    }

    fn query(sources: &[DifficultySource]) -> AreaQuery<'_> {
        AreaQuery {
            position: Position::new(0.0, 64.0, 0.0),
            spawn: Position::ORIGIN,
            dimension_value: 7.0,
            sources,
            time: None,
        }
    }

    #[test]
    fn average_and_extremes() {
        let sources = [source(10.0, 10.0), source(20.0, 30.0), source(30.0, 50.0)];
        let q = query(&sources);
        assert!((aggregator(AreaMode::Average).aggregate(&q) - 30.0).abs() < 1e-9);
        assert!((aggregator(AreaMode::Min).aggregate(&q) - 10.0).abs() < 1e-9);
        assert!((aggregator(AreaMode::Max).aggregate(&q) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn weighted_average_favours_closer_players() {
        let sources = [source(1.0, 100.0), source(90.0, 0.0)];
        let value = aggregator(AreaMode::WeightedAverage).aggregate(&query(&sources));
        assert!(value > 50.0, "closer player should dominate, got {value}");
        assert!(value < 100.0);
    }

    #[test]
    fn out_of_range_players_are_ignored() {
        let sources = [source(10.0, 40.0), source(5000.0, 250.0)];
        let value = aggregator(AreaMode::Max).aggregate(&query(&sources));
        assert!((value - 40.0).abs() < 1e-9);
    }

    #[test]
    fn height_is_ignored_by_default() {
        let above = [DifficultySource {
            player: PlayerId::new(),
            position: Position::new(0.0, 300.0, 0.0),
            difficulty: 100.0,
        }];
        let mut q = query(&above);
        q.position = Position::ORIGIN;
        q.dimension_value = 3.0;

        let flat = AreaAggregator::new(
            AreaConfig {
                mode: AreaMode::Max,
                ..AreaConfig::default()
            },
            DifficultyBounds::new(0.0, 250.0),
        );
        assert!((flat.aggregate(&q) - 100.0).abs() < 1e-9);

        let spherical = AreaAggregator::new(
            AreaConfig {
                mode: AreaMode::Max,
                ignore_y_axis: false,
                ..AreaConfig::default()
            },
            DifficultyBounds::new(0.0, 250.0),
        );
        assert!((spherical.aggregate(&q) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_range_returns_dimension_value_unchanged() {
        let sources = [source(5000.0, 250.0)];
        for mode in [AreaMode::WeightedAverage, AreaMode::Average, AreaMode::Min, AreaMode::Max] {
            let value = aggregator(mode).aggregate(&query(&sources));
            assert!((value - 7.0).abs() < f64::EPSILON, "{mode:?}");
        }
    }

    #[test]
    fn distance_modes_ignore_players() {
        let sources = [source(10.0, 200.0)];
        let mut q = query(&sources);
        q.position = Position::new(3000.0, 10.0, 4000.0);
        q.spawn = Position::new(0.0, 70.0, 1000.0);

        let from_origin = aggregator(AreaMode::DistanceFromOrigin).aggregate(&q);
        assert!((from_origin - 50.0).abs() < 1e-9);

        let from_spawn = aggregator(AreaMode::DistanceFromSpawn).aggregate(&q);
        assert!((from_spawn - 3000.0_f64.hypot(3000.0) * 0.01).abs() < 1e-9);
    }

    #[test]
    fn distance_and_time_adds_terms() {
        let sources = [source(0.0, 20.0)];
        let mut q = query(&sources);
        q.position = Position::new(0.0, 64.0, 0.0);
        q.spawn = Position::new(0.0, 64.0, 1000.0);
        let value = aggregator(AreaMode::DistanceAndTime).aggregate(&q);
        assert!((value - 30.0).abs() < 1e-9);

        q.sources = &[];
        let value = aggregator(AreaMode::DistanceAndTime).aggregate(&q);
        assert!((value - 17.0).abs() < 1e-9);
    }

    #[test]
    fn dimension_wide_ignores_positions() {
        let near = [source(1.0, 200.0)];
        let far = [source(99.0, 3.0)];
        let agg = aggregator(AreaMode::DimensionWide);
        assert!((agg.aggregate(&query(&near)) - agg.aggregate(&query(&far))).abs() < f64::EPSILON);
        assert!((agg.aggregate(&query(&near)) - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn group_bonus_scales_with_player_count() {
        let config = AreaConfig {
            mode: AreaMode::Average,
            group_bonus_per_player: 0.1,
            ..AreaConfig::default()
        };
        let agg = AreaAggregator::new(config, DifficultyBounds::new(0.0, 250.0));
        let sources = [source(1.0, 10.0), source(2.0, 10.0), source(3.0, 10.0)];
        assert!((agg.aggregate(&query(&sources)) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn lunar_multiplier_applies_only_at_night() {
        let mut config = AreaConfig {
            mode: AreaMode::DimensionWide,
            ..AreaConfig::default()
        };
        config.lunar.enabled = true;
        let agg = AreaAggregator::new(config, DifficultyBounds::new(0.0, 250.0));

        let mut q = query(&[]);
        q.dimension_value = 10.0;
        q.time = Some(GameTimestamp::now(18_000)); // night, full moon
        assert!((agg.aggregate(&q) - 15.0).abs() < 1e-9);

        q.time = Some(GameTimestamp::now(TICKS_PER_DAY * 4 + 18_000)); // night, new moon
        assert!((agg.aggregate(&q) - 8.0).abs() < 1e-9);

        q.time = Some(GameTimestamp::now(6_000)); // noon
        assert!((agg.aggregate(&q) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn results_are_clamped() {
        let sources = [source(1.0, 10.0)];
        let mut q = query(&sources);
        q.position = Position::new(1e9, 0.0, 0.0);
        let value = aggregator(AreaMode::DistanceFromOrigin).aggregate(&q);
        assert!((value - 250.0).abs() < f64::EPSILON);
    }
}
