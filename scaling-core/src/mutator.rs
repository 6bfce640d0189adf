//! Event Mutator: discrete difficulty adjustments on game events.
//!
//! Each trigger maps to a compiled [`Formula`]. Resolution order for a kill:
//!
//! 1. a per-entity-type override (`mutators.by_entity`)
//! 2. the rule for the victim's [`EntityCategory`]
//! 3. for an unrecognized category, the hostile-kill rule
//!
//! Step 3 is a fallback, not a silent default: the first time a category is
//! seen it is logged with `warn!`, and every outcome reports `fell_back`.
//!
//! Heart items carry their already-resolved change (see [`crate::items`]) and
//! apply it as `difficulty + change`.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::MutatorConfig;
use crate::formula::Formula;
use crate::items::HeartItem;
use crate::store::DifficultyStore;
use crate::types::{DifficultyBounds, EntityCategory, GameTimestamp, PlayerId};

/// A game event that can adjust a player's difficulty.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerEvent {
    /// The player killed an entity.
    EntityKilled {
        /// Victim category as reported by the host.
        category: EntityCategory,
        /// Victim entity type id, e.g. `minecraft:zombie`.
        entity_type: Option<String>,
    },
    /// The player died.
    PlayerDied,
    /// The player slept through the night.
    PlayerSlept,
    /// The player used a heart item.
    ItemUsed {
        /// Which item.
        item: HeartItem,
        /// Difficulty change it resolved to.
        change: f64,
    },
}

/// Which configured rule handled an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKey {
    /// `on_hostile_killed`.
    HostileKilled,
    /// `on_peaceful_killed`.
    PeacefulKilled,
    /// `on_boss_killed`.
    BossKilled,
    /// `on_blight_killed`.
    BlightKilled,
    /// `on_player_killed`.
    PlayerKilled,
    /// `on_player_death`.
    PlayerDeath,
    /// `on_player_sleep`.
    PlayerSleep,
    /// `by_entity` override for this entity type.
    Entity(String),
    /// `[items]` change for this heart item.
    Item(HeartItem),
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostileKilled => f.write_str("on_hostile_killed"),
            Self::PeacefulKilled => f.write_str("on_peaceful_killed"),
            Self::BossKilled => f.write_str("on_boss_killed"),
            Self::BlightKilled => f.write_str("on_blight_killed"),
            Self::PlayerKilled => f.write_str("on_player_killed"),
            Self::PlayerDeath => f.write_str("on_player_death"),
            Self::PlayerSleep => f.write_str("on_player_sleep"),
            Self::Entity(id) => write!(f, "by_entity.{id}"),
            Self::Item(item) => write!(f, "items.{item}"),
        }
    }
}

/// A trigger paired with its compiled formula.
#[derive(Debug, Clone, PartialEq)]
pub struct MutatorRule {
    /// The trigger this rule answers.
    pub trigger: RuleKey,
    /// The adjustment.
    pub formula: Formula,
}

/// Result of applying a mutator.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    /// Rule that was applied.
    pub rule: RuleKey,
    /// Difficulty before.
    pub old: f64,
    /// Difficulty after (clamped, or 0 for exempt players).
    pub new: f64,
    /// Whether an unrecognized category fell back to the hostile rule.
    pub fell_back: bool,
}

/// Applies configured formulas to the store on game events.
#[derive(Debug, Clone)]
pub struct EventMutator {
    rules: HashMap<RuleKey, Formula>,
    warned_categories: HashSet<String>,
}

impl EventMutator {
    /// Build from rules. Any category rule not supplied is the identity.
    #[must_use]
    pub fn new(rules: impl IntoIterator<Item = MutatorRule>) -> Self {
        Self {
            rules: rules.into_iter().map(|r| (r.trigger, r.formula)).collect(),
            warned_categories: HashSet::new(),
        }
    }

    /// Compile every formula in `config`. A formula that fails to compile is
    /// logged and replaced by the identity; run
    /// [`crate::config::ScalingConfig::sanitize`] first to get config-level
    /// defaults instead.
    #[must_use]
    pub fn from_config(config: &MutatorConfig, bounds: DifficultyBounds) -> Self {
        let compile = |key: RuleKey, text: &str| {
            let formula = Formula::compile(text, bounds).unwrap_or_else(|e| {
                warn!(rule = %key, error = %e, "Mutator formula rejected; rule disabled");
                Formula::identity()
            });
            MutatorRule {
                trigger: key,
                formula,
            }
        };

        let mut rules = vec![
            compile(RuleKey::HostileKilled, config.on_hostile_killed.as_str()),
            compile(RuleKey::PeacefulKilled, config.on_peaceful_killed.as_str()),
            compile(RuleKey::BossKilled, config.on_boss_killed.as_str()),
            compile(RuleKey::BlightKilled, config.on_blight_killed.as_str()),
            compile(RuleKey::PlayerKilled, config.on_player_killed.as_str()),
            compile(RuleKey::PlayerDeath, config.on_player_death.as_str()),
            compile(RuleKey::PlayerSleep, config.on_player_sleep.as_str()),
        ];
        rules.extend(
            config
                .by_entity
                .iter()
                .map(|(entity, text)| compile(RuleKey::Entity(entity.clone()), text.as_str())),
        );
        Self::new(rules)
    }

    /// The formula for `key` (identity if none is configured).
    #[must_use]
    pub fn rule(&self, key: &RuleKey) -> Formula {
        self.rules.get(key).cloned().unwrap_or_default()
    }

    /// Decide which rule handles `event`. Returns the key and whether the
    /// hostile fallback was used.
    pub fn resolve(&mut self, event: &TriggerEvent) -> (RuleKey, bool) {
        match event {
            TriggerEvent::PlayerDied => (RuleKey::PlayerDeath, false),
            TriggerEvent::PlayerSlept => (RuleKey::PlayerSleep, false),
            TriggerEvent::ItemUsed { item, .. } => (RuleKey::Item(*item), false),
            TriggerEvent::EntityKilled {
                category,
                entity_type,
            } => {
                if let Some(entity) = entity_type {
                    let key = RuleKey::Entity(entity.clone());
                    if self.rules.contains_key(&key) {
                        return (key, false);
                    }
                }
                match category {
                    EntityCategory::Hostile => (RuleKey::HostileKilled, false),
                    EntityCategory::Peaceful => (RuleKey::PeacefulKilled, false),
                    EntityCategory::Boss => (RuleKey::BossKilled, false),
                    EntityCategory::Blight => (RuleKey::BlightKilled, false),
                    EntityCategory::Player => (RuleKey::PlayerKilled, false),
                    EntityCategory::Unrecognized(raw) => {
                        if self.warned_categories.insert(raw.clone()) {
                            warn!(
                                category = %raw,
                                entity = ?entity_type,
                                "Unrecognized entity category; applying on_hostile_killed"
                            );
                        }
                        (RuleKey::HostileKilled, true)
                    }
                }
            }
        }
    }

    /// Apply the rule for `event` to `player` through the store.
    pub fn apply(
        &mut self,
        store: &mut DifficultyStore,
        player: PlayerId,
        event: &TriggerEvent,
        now: GameTimestamp,
    ) -> MutationOutcome {
        let (rule, fell_back) = self.resolve(event);
        let formula = match event {
            TriggerEvent::ItemUsed { change, .. } => Formula::delta(*change),
            _ => self.rule(&rule),
        };
        let old = store.get(player);
        let new = store.set(player, formula.evaluate(old), now);

        debug!(
            player = %player,
            rule = %rule,
            old,
            new,
            "Applied difficulty mutator"
        );

        MutationOutcome {
            rule,
            old,
            new,
            fell_back,
        }
    }
}

impl Default for EventMutator {
    fn default() -> Self {
        Self::from_config(&MutatorConfig::default(), DifficultyBounds::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
