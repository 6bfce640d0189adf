//! Per-player state the rule tracks alongside the difficulty store.
//!
//! The store only knows values. Where a player stands, which dimension and
//! biome they are in and how far they moved since the last accumulation step
//! live here.

use scaling_core::health::PlayerHealth;
use scaling_core::types::{DimensionId, GameTimestamp, Position};

/// A connected player's session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSession {
    /// Current dimension.
    pub dimension: DimensionId,
    /// Last reported position.
    pub position: Position,
    /// Last reported biome id, if the host reports biomes.
    pub biome: Option<String>,
    /// Position at the last accumulation step.
    pub step_position: Position,
    /// Bonus max health.
    pub health: PlayerHealth,
    /// When the player joined.
    pub joined_at: GameTimestamp,
}

impl PlayerSession {
    /// Start a session at `position`.
    #[must_use]
    pub fn new(
        dimension: DimensionId,
        position: Position,
        health: PlayerHealth,
        joined_at: GameTimestamp,
    ) -> Self {
        Self {
            dimension,
            position,
            biome: None,
            step_position: position,
            health,
            joined_at,
        }
    }

    /// Record a new position. Changing dimension resets the idle baseline.
    pub fn move_to(&mut self, dimension: DimensionId, position: Position) {
        if dimension != self.dimension {
            self.dimension = dimension;
            self.step_position = position;
        }
        self.position = position;
    }

    /// Horizontal distance moved since the last step.
    #[must_use]
    pub fn moved_since_step(&self) -> f64 {
        self.position.horizontal_distance(&self.step_position)
    }

    /// Whether the player moved less than `threshold` blocks since the last step.
    #[must_use]
    pub fn is_idle(&self, threshold: f64) -> bool {
        self.moved_since_step() < threshold
    }

    /// Close the current step.
    pub fn end_step(&mut self) {
        self.step_position = self.position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> PlayerSession {
        PlayerSession::new(
            DimensionId::overworld(),
            Position::new(0.0, 64.0, 0.0),
            PlayerHealth::default(),
            GameTimestamp::now(0),
        )
    }

    #[test]
    fn standing_still_is_idle() {
        let mut s = session();
        s.move_to(DimensionId::overworld(), Position::new(0.2, 80.0, 0.1));
        assert!(s.is_idle(0.5));
    }

    #[test]
    fn walking_is_not_idle_until_step_ends() {
        let mut s = session();
        s.move_to(DimensionId::overworld(), Position::new(3.0, 64.0, 4.0));
        assert!((s.moved_since_step() - 5.0).abs() < 1e-9);
        assert!(!s.is_idle(0.5));
        s.end_step();
        assert!(s.is_idle(0.5));
    }

    #[test]
    fn dimension_change_resets_baseline() {
        let mut s = session();
        let nether = DimensionId::from("minecraft:the_nether");
        s.move_to(nether.clone(), Position::new(500.0, 64.0, 500.0));
        assert_eq!(s.dimension, nether);
        assert!(s.moved_since_step().abs() < f64::EPSILON);
    }
}
