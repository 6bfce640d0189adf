//! Configuration for the scaling difficulty system.
//!
//! Maps directly to `scaling.toml`. Every field has a serde default, so a
//! partial file (or an empty one) is valid. Syntax errors fail the load;
//! semantically bad values are caught by [`ScalingConfig::sanitize`], which
//! logs a warning and substitutes the default.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ScalingError};
use crate::formula::Formula;
use crate::types::{AreaMode, DifficultyBounds, DimensionId, PlayerId};

/// Smallest accepted `area.search_radius`.
pub const MIN_SEARCH_RADIUS: f64 = 64.0;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScalingConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Difficulty range and accumulation rate.
    #[serde(default)]
    pub difficulty: DifficultyConfig,
    /// Area aggregation settings.
    #[serde(default)]
    pub area: AreaConfig,
    /// Event mutator formulas.
    #[serde(default)]
    pub mutators: MutatorConfig,
    /// Mob stat scaling.
    #[serde(default)]
    pub mobs: MobConfig,
    /// Heart items that change difficulty or health.
    #[serde(default)]
    pub items: ItemConfig,
    /// Player max-health settings.
    #[serde(default)]
    pub player_health: PlayerHealthConfig,
    /// Persistence / save settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl ScalingConfig {
    /// Parse configuration from a TOML string. Does not sanitize.
    ///
    /// # Errors
    /// Returns `ScalingError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| ScalingError::Config(e.to_string()))
    }

    /// Parse configuration from a TOML file. Does not sanitize.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and sanitize a TOML file. Warnings are logged, not returned.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.sanitize();
        Ok(config)
    }

    /// Serialize back to TOML.
    ///
    /// # Errors
    /// Returns `ScalingError::Serialization` if encoding fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ScalingError::Serialization(e.to_string()))
    }

    /// Configured difficulty bounds.
    #[must_use]
    pub fn bounds(&self) -> DifficultyBounds {
        DifficultyBounds::new(self.difficulty.min_value, self.difficulty.max_value)
    }

    /// Replace every out-of-range value and unparseable formula with its
    /// default. Each substitution is logged with `warn!` and returned.
    pub fn sanitize(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        self.difficulty.sanitize(&mut warnings);
        self.area.sanitize(&mut warnings);
        let bounds = self.bounds();
        self.mutators.sanitize(bounds, &mut warnings);
        self.mobs.sanitize(&mut warnings);
        self.items.sanitize(bounds, &mut warnings);
        self.player_health.sanitize(&mut warnings);
        self.persistence.sanitize(&mut warnings);

        for w in &warnings {
            warn!(field = %w.field, "{}", w.message);
        }
        warnings
    }
}

/// A config value that was rejected and replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human-readable description, including the substituted value.
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn reject(warnings: &mut Vec<ConfigWarning>, field: &str, message: String) {
    warnings.push(ConfigWarning {
        field: field.to_string(),
        message,
    });
}

/// Replace `value` with `default` unless it is finite and passes `valid`.
fn check_f64(
    warnings: &mut Vec<ConfigWarning>,
    field: &str,
    value: &mut f64,
    default: f64,
    requirement: &str,
    valid: impl Fn(f64) -> bool,
) {
    if !value.is_finite() || !valid(*value) {
        reject(
            warnings,
            field,
            format!("{value} is invalid (must be {requirement}); using {default}"),
        );
        *value = default;
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether difficulty scaling is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
        }
    }
}

/// Difficulty range and accumulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyConfig {
    /// Lowest difficulty any player or dimension can have.
    #[serde(default)]
    pub min_value: f64,
    /// Highest difficulty any player or dimension can have.
    #[serde(default = "default_max_value")]
    pub max_value: f64,
    /// Difficulty given to players and dimensions seen for the first time.
    #[serde(default)]
    pub starting_value: f64,
    /// Difficulty gained per second of play.
    #[serde(default = "default_change_per_second")]
    pub change_per_second: f64,
    /// Rate multiplier while a player is idle.
    #[serde(default = "default_idle_multiplier")]
    pub idle_multiplier: f64,
    /// Players moving less than this many blocks between updates count as idle.
    #[serde(default = "default_idle_move_threshold")]
    pub idle_move_threshold: f64,
    /// Players whose difficulty is pinned at 0.
    #[serde(default)]
    pub exempt_players: Vec<PlayerId>,
    /// Area difficulty multipliers by dimension and biome. First match wins.
    #[serde(default)]
    pub location_multipliers: Vec<LocationMultiplier>,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            min_value: 0.0,
            max_value: 250.0,
            starting_value: 0.0,
            change_per_second: 0.001_157_5,
            idle_multiplier: 0.5,
            idle_move_threshold: 0.5,
            exempt_players: Vec::new(),
            location_multipliers: Vec::new(),
        }
    }
}

impl DifficultyConfig {
    /// Multiplier for area difficulty in `dimension`, optionally inside
    /// `biome`. 1 when no entry matches.
    #[must_use]
    pub fn location_multiplier(&self, dimension: &DimensionId, biome: Option<&str>) -> f64 {
        self.location_multipliers
            .iter()
            .find(|m| m.matches(dimension, biome))
            .map_or(1.0, |m| m.scale)
    }
}

/// One `[[difficulty.location_multipliers]]` entry.
///
/// An empty `dimensions` or `biomes` list matches everything; an entry with
/// both lists empty matches nothing. Ids without a namespace are read as
/// `minecraft:` ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMultiplier {
    /// Dimensions this entry applies to.
    #[serde(default)]
    pub dimensions: Vec<String>,
    /// Biomes this entry applies to.
    #[serde(default)]
    pub biomes: Vec<String>,
    /// Multiplier on area difficulty.
    #[serde(default = "default_1_0")]
    pub scale: f64,
}

impl LocationMultiplier {
    /// Whether this entry covers `dimension` / `biome`.
    #[must_use]
    pub fn matches(&self, dimension: &DimensionId, biome: Option<&str>) -> bool {
        if self.dimensions.is_empty() && self.biomes.is_empty() {
            return false;
        }
        let dimension_ok = self.dimensions.is_empty()
            || self.dimensions.iter().any(|d| same_id(d, dimension.as_str()));
        let biome_ok = self.biomes.is_empty()
            || biome.is_some_and(|b| self.biomes.iter().any(|pattern| same_id(pattern, b)));
        dimension_ok && biome_ok
    }
}

/// `overworld` and `minecraft:overworld` name the same id.
fn same_id(pattern: &str, id: &str) -> bool {
    fn bare(id: &str) -> &str {
        id.strip_prefix("minecraft:").unwrap_or(id)
    }
    bare(pattern) == bare(id)
}

impl DifficultyConfig {
    fn sanitize(&mut self, warnings: &mut Vec<ConfigWarning>) {
        let defaults = Self::default();
        if !self.min_value.is_finite() || !self.max_value.is_finite() || self.min_value > self.max_value
        {
            reject(
                warnings,
                "difficulty.min_value",
                format!(
                    "range [{}, {}] is invalid; using [{}, {}]",
                    self.min_value, self.max_value, defaults.min_value, defaults.max_value
                ),
            );
            self.min_value = defaults.min_value;
            self.max_value = defaults.max_value;
        }

        let (min, max) = (self.min_value, self.max_value);
        check_f64(
            warnings,
            "difficulty.starting_value",
            &mut self.starting_value,
            min,
            "within [min_value, max_value]",
            |v| (min..=max).contains(&v),
        );
        check_f64(
            warnings,
            "difficulty.change_per_second",
            &mut self.change_per_second,
            defaults.change_per_second,
            "a finite number",
            |_| true,
        );
        check_f64(
            warnings,
            "difficulty.idle_multiplier",
            &mut self.idle_multiplier,
            defaults.idle_multiplier,
            "non-negative",
            |v| v >= 0.0,
        );
        check_f64(
            warnings,
            "difficulty.idle_move_threshold",
            &mut self.idle_move_threshold,
            defaults.idle_move_threshold,
            "non-negative",
            |v| v >= 0.0,
        );

        let mut index = 0;
        self.location_multipliers.retain(|entry| {
            let field = format!("difficulty.location_multipliers[{index}]");
            index += 1;
            if entry.dimensions.is_empty() && entry.biomes.is_empty() {
                reject(warnings, &field, "matches no dimension or biome; entry removed".to_string());
                false
            } else if !entry.scale.is_finite() || entry.scale < 0.0 {
                reject(
                    warnings,
                    &field,
                    format!("scale {} is invalid (must be non-negative); entry removed", entry.scale),
                );
                false
            } else {
                true
            }
        });
    }
}

/// Area aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaConfig {
    /// How nearby players' difficulty is combined.
    #[serde(default)]
    pub mode: AreaMode,
    /// Players farther than this (blocks) are ignored. At least 64.
    #[serde(default = "default_search_radius")]
    pub search_radius: f64,
    /// Measure distances on the horizontal plane only.
    #[serde(default = "default_true")]
    pub ignore_y_axis: bool,
    /// Difficulty per block of distance for distance-based modes.
    #[serde(default = "default_distance_factor")]
    pub distance_factor: f64,
    /// Extra multiplier per additional in-range player.
    #[serde(default = "default_group_bonus")]
    pub group_bonus_per_player: f64,
    /// Moon-phase multipliers.
    #[serde(default)]
    pub lunar: LunarConfig,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            mode: AreaMode::WeightedAverage,
            search_radius: 256.0,
            ignore_y_axis: true,
            distance_factor: 0.0025,
            group_bonus_per_player: 0.05,
            lunar: LunarConfig::default(),
        }
    }
}

impl AreaConfig {
    fn sanitize(&mut self, warnings: &mut Vec<ConfigWarning>) {
        let defaults = Self::default();
        check_f64(
            warnings,
            "area.search_radius",
            &mut self.search_radius,
            defaults.search_radius,
            "at least 64",
            |v| v >= MIN_SEARCH_RADIUS,
        );
        check_f64(
            warnings,
            "area.distance_factor",
            &mut self.distance_factor,
            defaults.distance_factor,
            "non-negative",
            |v| v >= 0.0,
        );
        check_f64(
            warnings,
            "area.group_bonus_per_player",
            &mut self.group_bonus_per_player,
            defaults.group_bonus_per_player,
            "non-negative",
            |v| v >= 0.0,
        );

        let lunar_ok = self.lunar.multipliers.len() == 8
            && self.lunar.multipliers.iter().all(|m| m.is_finite() && *m >= 0.0);
        if !lunar_ok {
            reject(
                warnings,
                "area.lunar.multipliers",
                format!(
                    "expected 8 non-negative multipliers, got {:?}; using defaults",
                    self.lunar.multipliers
                ),
            );
            self.lunar.multipliers = default_lunar_multipliers();
        }
    }
}

/// Night-time multipliers indexed by moon phase (0 = full moon).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LunarConfig {
    /// Opt-in.
    #[serde(default)]
    pub enabled: bool,
    /// One multiplier per phase, 8 entries.
    #[serde(default = "default_lunar_multipliers")]
    pub multipliers: Vec<f64>,
}

impl Default for LunarConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            multipliers: default_lunar_multipliers(),
        }
    }
}

/// Mutator formulas, written in the [`crate::formula`] language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutatorConfig {
    /// Player killed a hostile mob. Also used for unrecognized categories.
    #[serde(default = "default_identity")]
    pub on_hostile_killed: String,
    /// Player killed a peaceful mob.
    #[serde(default = "default_identity")]
    pub on_peaceful_killed: String,
    /// Player killed a boss.
    #[serde(default = "default_identity")]
    pub on_boss_killed: String,
    /// Player killed a blight.
    #[serde(default = "default_identity")]
    pub on_blight_killed: String,
    /// Player killed another player.
    #[serde(default = "default_on_player_killed")]
    pub on_player_killed: String,
    /// Player died.
    #[serde(default = "default_identity")]
    pub on_player_death: String,
    /// Player slept through the night.
    #[serde(default = "default_identity")]
    pub on_player_sleep: String,
    /// Per-entity-type overrides, keyed by entity id (e.g. `minecraft:zombie`).
    #[serde(default = "default_by_entity")]
    pub by_entity: BTreeMap<String, String>,
}

impl Default for MutatorConfig {
    fn default() -> Self {
        Self {
            on_hostile_killed: default_identity(),
            on_peaceful_killed: default_identity(),
            on_boss_killed: default_identity(),
            on_blight_killed: default_identity(),
            on_player_killed: default_on_player_killed(),
            on_player_death: default_identity(),
            on_player_sleep: default_identity(),
            by_entity: default_by_entity(),
        }
    }
}

impl MutatorConfig {
    fn sanitize(&mut self, bounds: DifficultyBounds, warnings: &mut Vec<ConfigWarning>) {
        let defaults = Self::default();
        let slots: [(&str, &mut String, String); 7] = [
            ("mutators.on_hostile_killed", &mut self.on_hostile_killed, defaults.on_hostile_killed),
            ("mutators.on_peaceful_killed", &mut self.on_peaceful_killed, defaults.on_peaceful_killed),
            ("mutators.on_boss_killed", &mut self.on_boss_killed, defaults.on_boss_killed),
            ("mutators.on_blight_killed", &mut self.on_blight_killed, defaults.on_blight_killed),
            ("mutators.on_player_killed", &mut self.on_player_killed, defaults.on_player_killed),
            ("mutators.on_player_death", &mut self.on_player_death, defaults.on_player_death),
            ("mutators.on_player_sleep", &mut self.on_player_sleep, defaults.on_player_sleep),
        ];
        for (field, text, default) in slots {
            if let Err(e) = Formula::compile(text.as_str(), bounds) {
                reject(warnings, field, format!("{e}; using `{default}`"));
                *text = default;
            }
        }

        // A broken override is dropped so the category rule applies instead.
        self.by_entity.retain(|entity, text| match Formula::compile(text.as_str(), bounds) {
            Ok(_) => true,
            Err(e) => {
                reject(
                    warnings,
                    &format!("mutators.by_entity.\"{entity}\""),
                    format!("{e}; override removed"),
                );
                false
            }
        });
    }
}

/// Mob stat scaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobConfig {
    /// Bonus health per point of difficulty for hostile mobs.
    #[serde(default = "default_0_5")]
    pub hostile_health_per_difficulty: f64,
    /// Bonus health per point of difficulty for peaceful mobs.
    #[serde(default = "default_0_25")]
    pub peaceful_health_per_difficulty: f64,
    /// Bonus attack damage per point of difficulty.
    #[serde(default = "default_0_05")]
    pub damage_per_difficulty: f64,
    /// Cap on bonus attack damage.
    #[serde(default = "default_10_0")]
    pub max_damage_bonus: f64,
    /// Blight chance at maximum difficulty.
    #[serde(default = "default_0_05")]
    pub blight_chance_multiplier: f64,
    /// Blights scale as if difficulty were this many times higher.
    #[serde(default = "default_2_0")]
    pub blight_difficulty_multiplier: f64,
}

impl Default for MobConfig {
    fn default() -> Self {
        Self {
            hostile_health_per_difficulty: 0.5,
            peaceful_health_per_difficulty: 0.25,
            damage_per_difficulty: 0.05,
            max_damage_bonus: 10.0,
            blight_chance_multiplier: 0.05,
            blight_difficulty_multiplier: 2.0,
        }
    }
}

impl MobConfig {
    fn sanitize(&mut self, warnings: &mut Vec<ConfigWarning>) {
        let d = Self::default();
        let non_negative = |v: f64| v >= 0.0;
        let rates: [(&str, &mut f64, f64); 4] = [
            (
                "mobs.hostile_health_per_difficulty",
                &mut self.hostile_health_per_difficulty,
                d.hostile_health_per_difficulty,
            ),
            (
                "mobs.peaceful_health_per_difficulty",
                &mut self.peaceful_health_per_difficulty,
                d.peaceful_health_per_difficulty,
            ),
            ("mobs.damage_per_difficulty", &mut self.damage_per_difficulty, d.damage_per_difficulty),
            ("mobs.max_damage_bonus", &mut self.max_damage_bonus, d.max_damage_bonus),
        ];
        for (field, value, default) in rates {
            check_f64(warnings, field, value, default, "non-negative", non_negative);
        }

        check_f64(
            warnings,
            "mobs.blight_chance_multiplier",
            &mut self.blight_chance_multiplier,
            d.blight_chance_multiplier,
            "within [0, 1]",
            |v| (0.0..=1.0).contains(&v),
        );
        check_f64(
            warnings,
            "mobs.blight_difficulty_multiplier",
            &mut self.blight_difficulty_multiplier,
            d.blight_difficulty_multiplier,
            "at least 1",
            |v| v >= 1.0,
        );
    }
}

/// Heart items. Difficulty changes go through the event mutator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemConfig {
    /// Difficulty change when a cursed heart is used.
    #[serde(default = "default_10_0")]
    pub cursed_heart_change: f64,
    /// Difficulty change when an enchanted heart is used.
    #[serde(default = "default_enchanted_heart_change")]
    pub enchanted_heart_change: f64,
    /// Spread `n` of a chance heart: +n with odds 1 in 2n + 1, otherwise
    /// -1 to -n.
    #[serde(default = "default_10_0")]
    pub chance_heart_change: f64,
    /// Health restored by a heart container on top of the max health it adds.
    #[serde(default = "default_4_0")]
    pub heart_crystal_health_restored: f64,
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            cursed_heart_change: 10.0,
            enchanted_heart_change: -10.0,
            chance_heart_change: 10.0,
            heart_crystal_health_restored: 4.0,
        }
    }
}

impl ItemConfig {
    fn sanitize(&mut self, bounds: DifficultyBounds, warnings: &mut Vec<ConfigWarning>) {
        let d = Self::default();
        for (field, value, default) in [
            ("items.cursed_heart_change", &mut self.cursed_heart_change, d.cursed_heart_change),
            (
                "items.enchanted_heart_change",
                &mut self.enchanted_heart_change,
                d.enchanted_heart_change,
            ),
        ] {
            check_f64(warnings, field, value, default, "a finite number", |_| true);
        }

        let span = bounds.span();
        check_f64(
            warnings,
            "items.chance_heart_change",
            &mut self.chance_heart_change,
            d.chance_heart_change.min(span),
            "within [0, max_value - min_value]",
            |v| (0.0..=span).contains(&v),
        );
        check_f64(
            warnings,
            "items.heart_crystal_health_restored",
            &mut self.heart_crystal_health_restored,
            d.heart_crystal_health_restored,
            "non-negative",
            |v| v >= 0.0,
        );
    }
}

/// Player max-health settings (in half-hearts, like the host's health attribute).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerHealthConfig {
    /// Max health of a fresh player.
    #[serde(default = "default_20_0")]
    pub starting_health: f64,
    /// Max health never drops below this.
    #[serde(default = "default_2_0")]
    pub min_health: f64,
    /// Max health never rises above this; 0 means unbounded.
    #[serde(default)]
    pub max_health: f64,
    /// Health granted by one heart container.
    #[serde(default = "default_2_0")]
    pub heart_container_health: f64,
    /// Max health removed on death.
    #[serde(default)]
    pub death_penalty: f64,
}

impl Default for PlayerHealthConfig {
    fn default() -> Self {
        Self {
            starting_health: 20.0,
            min_health: 2.0,
            max_health: 0.0,
            heart_container_health: 2.0,
            death_penalty: 0.0,
        }
    }
}

impl PlayerHealthConfig {
    fn sanitize(&mut self, warnings: &mut Vec<ConfigWarning>) {
        let d = Self::default();
        check_f64(
            warnings,
            "player_health.starting_health",
            &mut self.starting_health,
            d.starting_health,
            "positive",
            |v| v > 0.0,
        );
        let starting = self.starting_health;
        check_f64(
            warnings,
            "player_health.min_health",
            &mut self.min_health,
            d.min_health.min(starting),
            "within [0, starting_health]",
            |v| (0.0..=starting).contains(&v),
        );
        check_f64(
            warnings,
            "player_health.max_health",
            &mut self.max_health,
            0.0,
            "0 or at least starting_health",
            |v| v == 0.0 || v >= starting,
        );
        check_f64(
            warnings,
            "player_health.heart_container_health",
            &mut self.heart_container_health,
            d.heart_container_health,
            "non-negative",
            |v| v >= 0.0,
        );
        check_f64(
            warnings,
            "player_health.death_penalty",
            &mut self.death_penalty,
            d.death_penalty,
            "non-negative",
            |v| v >= 0.0,
        );
    }
}

/// Persistence / save configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Auto-save interval in seconds.
    #[serde(default = "default_300")]
    pub auto_save_interval_seconds: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            auto_save_interval_seconds: 300,
        }
    }
}

impl PersistenceConfig {
    fn sanitize(&mut self, warnings: &mut Vec<ConfigWarning>) {
        if self.auto_save_interval_seconds == 0 {
            reject(
                warnings,
                "persistence.auto_save_interval_seconds",
                "0 is invalid (must be positive); using 300".to_string(),
            );
            self.auto_save_interval_seconds = 300;
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_identity() -> String { "difficulty".to_string() }
fn default_on_player_killed() -> String { "difficulty + 1.0".to_string() }
fn default_by_entity() -> BTreeMap<String, String> {
    BTreeMap::from([("minecraft:villager".to_string(), "difficulty + 0.01".to_string())])
}
fn default_lunar_multipliers() -> Vec<f64> { vec![1.5, 1.3, 1.2, 1.0, 0.8, 1.0, 1.2, 1.3] }
fn default_max_value() -> f64 { 250.0 }
fn default_change_per_second() -> f64 { 0.001_157_5 }
fn default_idle_multiplier() -> f64 { 0.5 }
fn default_idle_move_threshold() -> f64 { 0.5 }
fn default_search_radius() -> f64 { 256.0 }
fn default_distance_factor() -> f64 { 0.0025 }
fn default_group_bonus() -> f64 { 0.05 }
fn default_enchanted_heart_change() -> f64 { -10.0 }
fn default_1_0() -> f64 { 1.0 }
fn default_0_05() -> f64 { 0.05 }
fn default_0_25() -> f64 { 0.25 }
fn default_0_5() -> f64 { 0.5 }
fn default_2_0() -> f64 { 2.0 }
fn default_4_0() -> f64 { 4.0 }
fn default_10_0() -> f64 { 10.0 }
fn default_20_0() -> f64 { 20.0 }
fn default_300() -> u32 { 300 }

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let mut config = ScalingConfig::from_toml("").expect("parse");
        assert!(config.sanitize().is_empty());
        assert_eq!(config.area.mode, AreaMode::WeightedAverage);
        assert!((config.difficulty.max_value - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_file_overrides() {
        let config = ScalingConfig::from_toml(
            r#"
            [difficulty]
            max_value = 100.0

            [area]
            mode = "max"
            "#,
        )
        .expect("parse");
        assert_eq!(config.area.mode, AreaMode::Max);
        assert!((config.bounds().max - 100.0).abs() < f64::EPSILON);
        assert!((config.area.search_radius - 256.0).abs() < f64::EPSILON);
    }

    #[test]
    fn syntax_error_is_config_error() {
        let err = ScalingConfig::from_toml("[difficulty\nmax_value = ").expect_err("should fail");
        assert!(matches!(err, ScalingError::Config(_)));
    }

    #[test]
    fn unknown_area_mode_is_config_error() {
        let err = ScalingConfig::from_toml("[area]\nmode = \"server_wide\"").expect_err("should fail");
        assert!(matches!(err, ScalingError::Config(_)));
    }

    #[test]
    fn inverted_range_falls_back_to_default() {
        let mut config = ScalingConfig::default();
        config.difficulty.min_value = 50.0;
        config.difficulty.max_value = 10.0;
        let warnings = config.sanitize();
        assert!(warnings.iter().any(|w| w.field == "difficulty.min_value"));
        assert!(config.difficulty.min_value.abs() < f64::EPSILON);
        assert!((config.difficulty.max_value - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn starting_value_outside_range_is_replaced() {
        let mut config = ScalingConfig::default();
        config.difficulty.starting_value = 900.0;
        let warnings = config.sanitize();
        assert_eq!(warnings.len(), 1);
        assert!(config.difficulty.starting_value.abs() < f64::EPSILON);
    }

    #[test]
    fn bad_numbers_are_replaced() {
        let mut config = ScalingConfig::default();
        config.area.search_radius = -5.0;
        config.difficulty.change_per_second = f64::NAN;
        config.mobs.blight_chance_multiplier = 3.0;
        config.area.lunar.multipliers = vec![1.0; 3];
        config.persistence.auto_save_interval_seconds = 0;

        let warnings = config.sanitize();
        assert_eq!(warnings.len(), 5);
        assert!((config.area.search_radius - 256.0).abs() < f64::EPSILON);
        assert!(config.difficulty.change_per_second.is_finite());
        assert_eq!(config.area.lunar.multipliers.len(), 8);
        assert_eq!(config.persistence.auto_save_interval_seconds, 300);
    }

    #[test]
    fn unparseable_formula_is_replaced() {
        let mut config = ScalingConfig::from_toml(
            r#"
            [mutators]
            on_player_death = "difficulty ** 2"
            on_player_sleep = "difficulty * 0.9"

            [mutators.by_entity]
            "minecraft:zombie" = "difficulty + 0.1"
            "minecraft:creeper" = "boom"
            "#,
        )
        .expect("parse");

        let warnings = config.sanitize();
        assert_eq!(warnings.len(), 2);
        assert_eq!(config.mutators.on_player_death, "difficulty");
        assert_eq!(config.mutators.on_player_sleep, "difficulty * 0.9");
        assert!(config.mutators.by_entity.contains_key("minecraft:zombie"));
        assert!(!config.mutators.by_entity.contains_key("minecraft:creeper"));
    }

    #[test]
    fn toml_round_trip_preserves_mode() {
        let mut config = ScalingConfig::default();
        config.area.mode = AreaMode::DistanceFromSpawn;
        let text = config.to_toml().expect("serialize");
        let back = ScalingConfig::from_toml(&text).expect("parse");
        assert_eq!(back.area.mode, AreaMode::DistanceFromSpawn);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = ScalingConfig::default();
        assert_eq!(config.mutators.on_player_killed, "difficulty + 1.0");
        for rule in [
            &config.mutators.on_hostile_killed,
            &config.mutators.on_peaceful_killed,
            &config.mutators.on_boss_killed,
            &config.mutators.on_blight_killed,
            &config.mutators.on_player_death,
            &config.mutators.on_player_sleep,
        ] {
            assert_eq!(rule, "difficulty");
        }
        assert_eq!(
            config.mutators.by_entity.get("minecraft:villager").map(String::as_str),
            Some("difficulty + 0.01")
        );
        assert!((config.difficulty.idle_multiplier - 0.5).abs() < f64::EPSILON);
        assert!((config.difficulty.change_per_second - 0.001_157_5).abs() < f64::EPSILON);
        assert!((config.area.group_bonus_per_player - 0.05).abs() < f64::EPSILON);
        assert!(config.area.ignore_y_axis);
        assert!((config.mobs.blight_difficulty_multiplier - 2.0).abs() < f64::EPSILON);
        assert!((config.items.cursed_heart_change - 10.0).abs() < f64::EPSILON);
        assert!((config.items.enchanted_heart_change + 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn serde_defaults_match_default_impl() {
        let parsed = ScalingConfig::from_toml("").expect("parse");
        let built = ScalingConfig::default();
        assert_eq!(parsed.mutators.by_entity, built.mutators.by_entity);
        assert_eq!(parsed.mutators.on_player_killed, built.mutators.on_player_killed);
        assert!((parsed.difficulty.idle_multiplier - built.difficulty.idle_multiplier).abs() < f64::EPSILON);
        assert!(
            (parsed.area.group_bonus_per_player - built.area.group_bonus_per_player).abs()
                < f64::EPSILON
        );
        assert_eq!(parsed.area.ignore_y_axis, built.area.ignore_y_axis);
    }

    #[test]
    fn search_radius_below_minimum_is_replaced() {
        let mut config = ScalingConfig::default();
        config.area.search_radius = 32.0;
        let warnings = config.sanitize();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "area.search_radius");
        assert!((config.area.search_radius - 256.0).abs() < f64::EPSILON);

        config.area.search_radius = MIN_SEARCH_RADIUS;
        assert!(config.sanitize().is_empty());
    }

    #[test]
    fn location_multipliers_match_dimension_and_biome() {
        let mut config = ScalingConfig::from_toml(
            r#"
            [[difficulty.location_multipliers]]
            dimensions = ["the_nether"]
            scale = 2.0

            [[difficulty.location_multipliers]]
            dimensions = ["overworld"]
            biomes = ["minecraft:desert"]
            scale = 1.5

            [[difficulty.location_multipliers]]
            biomes = ["badlands"]
            scale = 3.0
            "#,
        )
        .expect("parse");
        assert!(config.sanitize().is_empty());

        let difficulty = &config.difficulty;
        let overworld = DimensionId::overworld();
        let nether = DimensionId::from("minecraft:the_nether");
        let end = DimensionId::from("minecraft:the_end");

        assert!((difficulty.location_multiplier(&nether, None) - 2.0).abs() < f64::EPSILON);
        assert!(
            (difficulty.location_multiplier(&overworld, Some("minecraft:desert")) - 1.5).abs()
                < f64::EPSILON
        );
        assert!((difficulty.location_multiplier(&overworld, None) - 1.0).abs() < f64::EPSILON);
        assert!(
            (difficulty.location_multiplier(&end, Some("minecraft:badlands")) - 3.0).abs()
                < f64::EPSILON
        );
        assert!(
            (difficulty.location_multiplier(&end, Some("minecraft:plains")) - 1.0).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn bad_location_multipliers_are_removed() {
        let mut config = ScalingConfig::default();
        config.difficulty.location_multipliers = vec![
            LocationMultiplier {
                dimensions: Vec::new(),
                biomes: Vec::new(),
                scale: 2.0,
            },
            LocationMultiplier {
                dimensions: vec!["overworld".to_string()],
                biomes: Vec::new(),
                scale: -1.0,
            },
            LocationMultiplier {
                dimensions: vec!["the_end".to_string()],
                biomes: Vec::new(),
                scale: 0.5,
            },
        ];
        let warnings = config.sanitize();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].field, "difficulty.location_multipliers[0]");
        assert_eq!(warnings[1].field, "difficulty.location_multipliers[1]");
        assert_eq!(config.difficulty.location_multipliers.len(), 1);
    }

    #[test]
    fn item_section_parses_and_sanitizes() {
        let mut config = ScalingConfig::from_toml(
            r#"
            [items]
            cursed_heart_change = 25.0
            chance_heart_change = 1000.0
            heart_crystal_health_restored = -2.0
            "#,
        )
        .expect("parse");
        let warnings = config.sanitize();
        let fields: Vec<_> = warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(
            fields,
            ["items.chance_heart_change", "items.heart_crystal_health_restored"]
        );
        assert!((config.items.cursed_heart_change - 25.0).abs() < f64::EPSILON);
        assert!((config.items.enchanted_heart_change + 10.0).abs() < f64::EPSILON);
        assert!((config.items.chance_heart_change - 10.0).abs() < f64::EPSILON);
        assert!((config.items.heart_crystal_health_restored - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn exempt_players_parse_as_uuids() {
        let config = ScalingConfig::from_toml(
            r#"
            [difficulty]
            exempt_players = ["67e55044-10b1-426f-9247-bb680e5fe0c8"]
            "#,
        )
        .expect("parse");
        assert_eq!(config.difficulty.exempt_players.len(), 1);
    }
}
