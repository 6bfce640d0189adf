//! Player max-health tracking (heart containers and death penalty).

use serde::{Deserialize, Serialize};

use crate::config::PlayerHealthConfig;

/// A player's bonus max health on top of the configured starting health.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerHealth {
    /// Health gained (or lost, if negative) relative to `starting_health`.
    pub bonus_health: f64,
}

impl PlayerHealth {
    /// Effective max health, clamped to the configured limits.
    #[must_use]
    pub fn max_health(&self, config: &PlayerHealthConfig) -> f64 {
        clamp_health(config, config.starting_health + self.bonus_health)
    }

    /// Add one heart container. Returns the new max health.
    pub fn add_heart(&mut self, config: &PlayerHealthConfig) -> f64 {
        self.adjust(config, config.heart_container_health)
    }

    /// Apply the death penalty. Returns the new max health.
    pub fn on_death(&mut self, config: &PlayerHealthConfig) -> f64 {
        self.adjust(config, -config.death_penalty)
    }

    /// Change max health by `amount`, storing the clamped result so that
    /// hitting a limit does not bank invisible health.
    pub fn adjust(&mut self, config: &PlayerHealthConfig, amount: f64) -> f64 {
        let amount = if amount.is_finite() { amount } else { 0.0 };
        let target = clamp_health(config, self.max_health(config) + amount);
        self.bonus_health = target - config.starting_health;
        target
    }
}

fn clamp_health(config: &PlayerHealthConfig, value: f64) -> f64 {
    let value = value.max(config.min_health);
    if config.max_health > 0.0 {
        value.min(config.max_health)
    } else {
        value
    }
}
