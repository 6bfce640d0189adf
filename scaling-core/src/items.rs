//! Heart items: consumables that move a player's difficulty.
//!
//! | Item            | Difficulty change                                   |
//! |-----------------|-----------------------------------------------------|
//! | cursed heart    | `cursed_heart_change` (+10 by default)              |
//! | enchanted heart | `enchanted_heart_change` (-10 by default)           |
//! | chance heart    | with n = `chance_heart_change`: +n at odds 1 in 2n + 1, otherwise -k for each k in 1..=n at odds 2 in 2n + 1 |
//!
//! The change is resolved here and applied through the event mutator as
//! [`TriggerEvent::ItemUsed`], so clamping and exemption work as for any
//! other trigger.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ItemConfig, ScalingConfig};
use crate::mutator::TriggerEvent;

/// A heart item that changes difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartItem {
    /// Raises difficulty.
    Cursed,
    /// Lowers difficulty.
    Enchanted,
    /// Small gamble, usually lowers difficulty.
    Chance,
}

impl HeartItem {
    /// Parse a host item id such as `cursed_heart` or `scalinghealth:chance_heart`.
    #[must_use]
    pub fn parse(id: &str) -> Option<Self> {
        let name = id.rsplit(':').next().unwrap_or(id);
        match name.to_ascii_lowercase().as_str() {
            "cursed_heart" | "cursed" => Some(Self::Cursed),
            "enchanted_heart" | "enchanted" => Some(Self::Enchanted),
            "chance_heart" | "chance" => Some(Self::Chance),
            _ => None,
        }
    }

    /// Config-style name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cursed => "cursed_heart",
            Self::Enchanted => "enchanted_heart",
            Self::Chance => "chance_heart",
        }
    }
}

impl fmt::Display for HeartItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roll a chance heart with spread `n` (rounded to a whole number).
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn roll_chance_heart<R: Rng + ?Sized>(n: f64, rng: &mut R) -> f64 {
    if !n.is_finite() || n < 0.5 {
        return 0.0;
    }
    let n = n.round().min(f64::from(u32::MAX)) as u64;
    let roll = rng.gen_range(0..=2 * n);
    if roll == 0 {
        n as f64
    } else {
        -(roll.div_ceil(2) as f64)
    }
}

/// Resolves heart item effects from the `[items]` config.
#[derive(Debug, Clone, Default)]
pub struct ItemEffects {
    config: ItemConfig,
}

impl ItemEffects {
    /// Create from an (already sanitized) item config.
    #[must_use]
    pub fn new(config: ItemConfig) -> Self {
        Self { config }
    }

    /// Create from the full configuration.
    #[must_use]
    pub fn from_config(config: &ScalingConfig) -> Self {
        Self::new(config.items.clone())
    }

    /// Difficulty change for one use of `item`. Only the chance heart reads `rng`.
    pub fn difficulty_change<R: Rng + ?Sized>(&self, item: HeartItem, rng: &mut R) -> f64 {
        match item {
            HeartItem::Cursed => self.config.cursed_heart_change,
            HeartItem::Enchanted => self.config.enchanted_heart_change,
            HeartItem::Chance => roll_chance_heart(self.config.chance_heart_change, rng),
        }
    }

    /// The mutator trigger for one use of `item`.
    pub fn trigger<R: Rng + ?Sized>(&self, item: HeartItem, rng: &mut R) -> TriggerEvent {
        TriggerEvent::ItemUsed {
            item,
            change: self.difficulty_change(item, rng),
        }
    }

    /// Health a heart container heals when it raised max health by `added`.
    #[must_use]
    pub fn health_restored(&self, added: f64) -> f64 {
        added.max(0.0) + self.config.heart_crystal_health_restored
    }
}
