//! Mob scaling: spawn-time stat bonuses derived from area difficulty.
//!
//! A mob spawning at a point receives bonus health and attack damage
//! proportional to the area difficulty there. Hostile mobs may additionally
//! roll to become a **blight**, an elite variant that scales as if the
//! difficulty were `blight_difficulty_multiplier` times higher.
//!
//! ```text
//! d       = difficulty × (blight_difficulty_multiplier if blight, else 1)
//! health  = base + d × health_per_difficulty
//! damage  = base + min(d × damage_per_difficulty, max_damage_bonus)
//! P(blight) = clamp(blight_chance_multiplier × difficulty / max, 0, 1)
//! ```
//!
//! The roll takes any `rand::Rng`, so a seeded RNG gives reproducible spawns.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::MobConfig;
use crate::types::{DifficultyBounds, EntityCategory};

/// Base stats of a mob before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MobStats {
    /// Max health.
    pub health: f64,
    /// Attack damage.
    pub damage: f64,
}

/// Stats of a mob after scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MobScaling {
    /// Scaled max health.
    pub health: f64,
    /// Scaled attack damage.
    pub damage: f64,
    /// Whether the mob spawned as a blight.
    pub blight: bool,
}

/// Computes spawn-time mob stats.
#[derive(Debug, Clone)]
pub struct MobScaler {
    config: MobConfig,
    bounds: DifficultyBounds,
}

impl MobScaler {
    /// Create a scaler.
    #[must_use]
    pub fn new(config: MobConfig, bounds: DifficultyBounds) -> Self {
        Self { config, bounds }
    }

    /// Probability that a mob of `category` becomes a blight at `difficulty`.
    #[must_use]
    pub fn blight_chance(&self, category: &EntityCategory, difficulty: f64) -> f64 {
        if !can_be_blight(category) || self.bounds.max <= 0.0 {
            return 0.0;
        }
        let fraction = self.bounds.clamp(difficulty) / self.bounds.max;
        (self.config.blight_chance_multiplier * fraction).clamp(0.0, 1.0)
    }

    /// Scale stats deterministically, with the blight decision supplied.
    #[must_use]
    pub fn scale_with(
        &self,
        category: &EntityCategory,
        base: MobStats,
        difficulty: f64,
        blight: bool,
    ) -> MobScaling {
        let blight = blight && can_be_blight(category);
        let mut difficulty = self.bounds.clamp(difficulty).max(0.0);
        if blight {
            difficulty *= self.config.blight_difficulty_multiplier;
        }
        let health_rate = match category {
            EntityCategory::Peaceful => self.config.peaceful_health_per_difficulty,
            _ => self.config.hostile_health_per_difficulty,
        };

        let health = base.health + difficulty * health_rate;
        let damage = base.damage
            + (difficulty * self.config.damage_per_difficulty).min(self.config.max_damage_bonus);

        MobScaling {
            health,
            damage,
            blight,
        }
    }

    /// Scale stats, rolling the blight chance with `rng`.
    pub fn scale<R: Rng + ?Sized>(
        &self,
        category: &EntityCategory,
        base: MobStats,
        difficulty: f64,
        rng: &mut R,
    ) -> MobScaling {
        let chance = self.blight_chance(category, difficulty);
        let blight = chance > 0.0 && rng.gen_bool(chance);
        self.scale_with(category, base, difficulty, blight)
    }
}

/// Bosses, peaceful mobs and players never roll for blight.
fn can_be_blight(category: &EntityCategory) -> bool {
    matches!(
        category,
        EntityCategory::Hostile | EntityCategory::Blight | EntityCategory::Unrecognized(_)
    )
}
