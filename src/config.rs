//! Sandbox configuration
//!
//! Everything a host UI can tweak. Values arrive from form readback or a
//! shared link, so parsing never fails: any missing, non-numeric or
//! non-finite field falls back to its default.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use std::str::FromStr;

use crate::consts::{
    BARRAGE_REPEAT_DAMAGE, MAX_CONFIG_COUNT, MAX_PROJECTILE_SPEED, WHIRLWIND_STAGE_BONUS,
};

/// Arena boundary shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArenaKind {
    #[default]
    Circle,
    Square,
    Corridor,
    Polygon,
}

impl ArenaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArenaKind::Circle => "circle",
            ArenaKind::Square => "square",
            ArenaKind::Corridor => "corridor",
            ArenaKind::Polygon => "polygon",
        }
    }

}

impl FromStr for ArenaKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "circle" => Ok(ArenaKind::Circle),
            "square" | "rect" => Ok(ArenaKind::Square),
            "corridor" | "t" => Ok(ArenaKind::Corridor),
            "polygon" | "poly" => Ok(ArenaKind::Polygon),
            _ => Err(()),
        }
    }
}

/// How projectiles are partitioned into cooldown pools.
///
/// Barrage repeats are always their own pool. The policies differ only in
/// whether seal salvos share the base emission's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HitGroupPolicy {
    /// Every salvo group (base and one per seal) is an independent pool
    #[default]
    #[serde(alias = "independentsalvos")]
    Independent,
    /// Seal salvos share the base emission's pool
    #[serde(alias = "mergedsalvos")]
    Merged,
}

impl HitGroupPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            HitGroupPolicy::Independent => "independent",
            HitGroupPolicy::Merged => "merged",
        }
    }

}

impl FromStr for HitGroupPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "independent" | "i" => Ok(HitGroupPolicy::Independent),
            "merged" | "m" => Ok(HitGroupPolicy::Merged),
            _ => Err(()),
        }
    }
}

/// Hollow-T corridor dimensions (world units, before fitting to the viewport)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorridorDims {
    /// Width of the horizontal bar
    pub bar_width: f64,
    /// Height of the horizontal bar
    pub bar_height: f64,
    /// Width of the vertical stem
    pub stem_width: f64,
    /// Length of the stem below the bar
    pub stem_length: f64,
}

impl Default for CorridorDims {
    fn default() -> Self {
        Self {
            bar_width: 16.0,
            bar_height: 4.0,
            stem_width: 4.0,
            stem_length: 12.0,
        }
    }
}

impl CorridorDims {
    fn sanitize(&mut self) {
        let d = Self::default();
        self.bar_width = positive_or(self.bar_width, d.bar_width);
        self.bar_height = positive_or(self.bar_height, d.bar_height);
        self.stem_width = positive_or(self.stem_width, d.stem_width);
        self.stem_length = positive_or(self.stem_length, d.stem_length);
        if self.stem_width > self.bar_width {
            self.stem_width = self.bar_width;
        }
    }
}

/// Skill and arena parameters (world units, seconds, percent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Arena ===
    pub arena: ArenaKind,
    /// Arena radius (world units); sets the pixel scale
    pub arena_radius: f64,
    pub corridor: CorridorDims,

    // === Damage ===
    /// Average damage of a single hit
    pub avg_hit: f64,

    // === Projectiles ===
    /// Base projectile speed (units/s)
    pub projectile_speed: f64,
    /// Increased projectile speed (%)
    pub projectile_speed_increase: f64,
    /// Projectiles in the base emission before whirlwind stages
    pub base_projectiles: u32,
    /// Whirlwind stages: +1 projectile and +damage each
    pub whirlwind_stages: u32,
    /// Projectile lifetime (seconds, negative = infinite)
    pub projectile_duration: f64,
    pub projectile_radius: f64,
    pub target_radius: f64,

    // === Seals ===
    pub max_seals: u32,
    /// Seals gained per second
    pub seal_frequency: f64,
    /// Increased seal gain frequency (%)
    pub seal_frequency_increase: f64,
    /// Seals required to cast (0 behaves as 1)
    pub seal_threshold: u32,

    // === Barrage ===
    /// Delayed repeats of each cast
    pub barrage_count: u32,
    /// Seconds between repeats
    pub barrage_interval: f64,

    // === Behaviors ===
    pub pierce: u32,
    pub fork: u32,
    pub chain: u32,
    pub split: u32,
    /// Chance (%) for a fork to also continue straight
    pub fork_chance: f64,
    /// Skill variant that only supports pierce
    pub pierce_only: bool,

    pub hit_group_policy: HitGroupPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            arena: ArenaKind::Circle,
            arena_radius: 10.0,
            corridor: CorridorDims::default(),

            avg_hit: 1000.0,

            projectile_speed: 30.0,
            projectile_speed_increase: 0.0,
            base_projectiles: 1,
            whirlwind_stages: 0,
            projectile_duration: 1.5,
            projectile_radius: 0.3,
            target_radius: 1.0,

            max_seals: 3,
            seal_frequency: 2.0,
            seal_frequency_increase: 0.0,
            seal_threshold: 1,

            barrage_count: 0,
            barrage_interval: 0.15,

            pierce: 0,
            fork: 0,
            chain: 0,
            split: 0,
            fork_chance: 0.0,
            pierce_only: false,

            hit_group_policy: HitGroupPolicy::Independent,
        }
    }
}

impl SimConfig {
    /// Parse a config from JSON text, defaulting anything unusable
    pub fn from_json_str(json: &str) -> Self {
        match serde_json::from_str::<Value>(json) {
            Ok(value) => Self::from_json_value(&value),
            Err(e) => {
                log::warn!("Config is not valid JSON ({e}), using defaults");
                Self::default()
            }
        }
    }

    /// Read each field independently from a JSON object.
    ///
    /// Accepts numbers, numeric strings and booleans where they make sense.
    pub fn from_json_value(value: &Value) -> Self {
        let d = Self::default();
        let Some(obj) = value.as_object() else {
            log::warn!("Config is not a JSON object, using defaults");
            return d;
        };

        let corridor = match obj.get("corridor").and_then(Value::as_object) {
            Some(c) => {
                let cd = CorridorDims::default();
                CorridorDims {
                    bar_width: read_f64(c, "bar_width", cd.bar_width),
                    bar_height: read_f64(c, "bar_height", cd.bar_height),
                    stem_width: read_f64(c, "stem_width", cd.stem_width),
                    stem_length: read_f64(c, "stem_length", cd.stem_length),
                }
            }
            None => d.corridor,
        };

        let mut config = Self {
            arena: obj
                .get("arena")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.arena),
            arena_radius: read_f64(obj, "arena_radius", d.arena_radius),
            corridor,

            avg_hit: read_f64(obj, "avg_hit", d.avg_hit),

            projectile_speed: read_f64(obj, "projectile_speed", d.projectile_speed),
            projectile_speed_increase: read_f64(
                obj,
                "projectile_speed_increase",
                d.projectile_speed_increase,
            ),
            base_projectiles: read_u32(obj, "base_projectiles", d.base_projectiles),
            whirlwind_stages: read_u32(obj, "whirlwind_stages", d.whirlwind_stages),
            projectile_duration: read_f64(obj, "projectile_duration", d.projectile_duration),
            projectile_radius: read_f64(obj, "projectile_radius", d.projectile_radius),
            target_radius: read_f64(obj, "target_radius", d.target_radius),

            max_seals: read_u32(obj, "max_seals", d.max_seals),
            seal_frequency: read_f64(obj, "seal_frequency", d.seal_frequency),
            seal_frequency_increase: read_f64(
                obj,
                "seal_frequency_increase",
                d.seal_frequency_increase,
            ),
            seal_threshold: read_u32(obj, "seal_threshold", d.seal_threshold),

            barrage_count: read_u32(obj, "barrage_count", d.barrage_count),
            barrage_interval: read_f64(obj, "barrage_interval", d.barrage_interval),

            pierce: read_u32(obj, "pierce", d.pierce),
            fork: read_u32(obj, "fork", d.fork),
            chain: read_u32(obj, "chain", d.chain),
            split: read_u32(obj, "split", d.split),
            fork_chance: read_f64(obj, "fork_chance", d.fork_chance),
            pierce_only: read_bool(obj, "pierce_only", d.pierce_only),

            hit_group_policy: obj
                .get("hit_group_policy")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.hit_group_policy),
        };
        config.sanitize();
        config
    }

    /// Replace out-of-domain values with their defaults
    pub fn sanitize(&mut self) {
        let d = Self::default();
        self.arena_radius = positive_or(self.arena_radius, d.arena_radius);
        self.corridor.sanitize();
        self.avg_hit = non_negative_or(self.avg_hit, d.avg_hit);
        self.projectile_speed =
            non_negative_or(self.projectile_speed, d.projectile_speed).min(MAX_PROJECTILE_SPEED);
        self.projectile_speed_increase =
            finite_or(self.projectile_speed_increase, d.projectile_speed_increase).max(-100.0);
        // Negative duration is meaningful (infinite), only NaN/inf are faults
        self.projectile_duration = finite_or(self.projectile_duration, d.projectile_duration);
        self.projectile_radius = positive_or(self.projectile_radius, d.projectile_radius);
        self.target_radius = positive_or(self.target_radius, d.target_radius);
        self.seal_frequency = non_negative_or(self.seal_frequency, d.seal_frequency);
        self.seal_frequency_increase =
            finite_or(self.seal_frequency_increase, d.seal_frequency_increase).max(-100.0);
        self.barrage_interval = non_negative_or(self.barrage_interval, d.barrage_interval);
        self.fork_chance = finite_or(self.fork_chance, d.fork_chance).clamp(0.0, 100.0);

        for count in [
            &mut self.base_projectiles,
            &mut self.whirlwind_stages,
            &mut self.max_seals,
            &mut self.seal_threshold,
            &mut self.barrage_count,
            &mut self.pierce,
            &mut self.fork,
            &mut self.chain,
            &mut self.split,
        ] {
            *count = (*count).min(MAX_CONFIG_COUNT);
        }
    }

    /// Seals gained per second after increases
    pub fn effective_seal_frequency(&self) -> f64 {
        self.seal_frequency * (1.0 + self.seal_frequency_increase / 100.0)
    }

    /// Seconds per seal, or `None` when seals never accrue
    pub fn seal_interval(&self) -> Option<f64> {
        let freq = self.effective_seal_frequency();
        (freq > 0.0 && freq.is_finite()).then(|| 1.0 / freq)
    }

    /// Projectile speed after increases (units/s)
    pub fn effective_speed(&self) -> f64 {
        (self.projectile_speed * (1.0 + self.projectile_speed_increase / 100.0))
            .clamp(0.0, MAX_PROJECTILE_SPEED)
    }

    /// Seals needed to trigger a cast
    pub fn cast_threshold(&self) -> u32 {
        self.seal_threshold.max(1)
    }

    /// Projectiles in the base salvo of one emission
    pub fn base_count(&self) -> u32 {
        self.base_projectiles.saturating_add(self.whirlwind_stages)
    }

    /// Projectiles in one emission (base plus two per seal)
    pub fn emission_count(&self, seals: u32) -> u32 {
        self.base_count().saturating_add(seals.saturating_mul(2))
    }

    /// Projectiles a cast instance emits over the main cast and all repeats
    pub fn expected_projectile_count(&self, seals: u32) -> u32 {
        self.emission_count(seals)
            .saturating_mul(self.barrage_count.saturating_add(1))
    }

    /// Damage multiplier for an emission at the given barrage repeat index
    pub fn damage_multiplier(&self, barrage_index: u32) -> f64 {
        let stage_bonus = 1.0 + self.whirlwind_stages as f64 * WHIRLWIND_STAGE_BONUS;
        if barrage_index > 0 {
            stage_bonus * BARRAGE_REPEAT_DAMAGE
        } else {
            stage_bonus
        }
    }
}

/// Caster and target placement in arena-radius units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityLayout {
    pub caster: DVec2,
    pub target: DVec2,
}

impl Default for EntityLayout {
    fn default() -> Self {
        Self {
            caster: DVec2::new(0.0, -0.4),
            target: DVec2::new(0.0, 0.4),
        }
    }
}

#[inline]
fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() { value } else { default }
}

#[inline]
fn non_negative_or(value: f64, default: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        default
    }
}

#[inline]
fn positive_or(value: f64, default: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        default
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

pub(crate) fn read_f64(obj: &Map<String, Value>, key: &str, default: f64) -> f64 {
    obj.get(key).and_then(parse_number).unwrap_or(default)
}

pub(crate) fn read_u32(obj: &Map<String, Value>, key: &str, default: u32) -> u32 {
    match obj.get(key).and_then(parse_number) {
        Some(n) => n.round().clamp(0.0, u32::MAX as f64) as u32,
        None => default,
    }
}

pub(crate) fn read_bool(obj: &Map<String, Value>, key: &str, default: bool) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => match s.trim() {
            "true" | "1" | "on" => true,
            "false" | "0" | "off" | "" => false,
            _ => default,
        },
        Some(other) => parse_number(other).map(|n| n != 0.0).unwrap_or(default),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_default() {
        let config = SimConfig::from_json_value(&json!({}));
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_non_numeric_fields_default() {
        let config = SimConfig::from_json_value(&json!({
            "avg_hit": "lots",
            "projectile_speed": null,
            "whirlwind_stages": [1, 2],
            "seal_frequency": "3.5",
            "pierce": 2.6,
        }));
        let d = SimConfig::default();
        assert_eq!(config.avg_hit, d.avg_hit);
        assert_eq!(config.projectile_speed, d.projectile_speed);
        assert_eq!(config.whirlwind_stages, d.whirlwind_stages);
        assert_eq!(config.seal_frequency, 3.5);
        assert_eq!(config.pierce, 3);
    }

    #[test]
    fn test_negative_counts_clamp_to_zero() {
        let config = SimConfig::from_json_value(&json!({ "barrage_count": -4 }));
        assert_eq!(config.barrage_count, 0);
    }

    #[test]
    fn test_huge_counts_are_clamped() {
        let config = SimConfig::from_json_str(
            r#"{"whirlwind_stages": 4294967295, "barrage_count": 3e9, "max_seals": 1e12,
                "split": 500, "projectile_speed": 1e300, "seal_frequency": 1e300}"#,
        );
        assert_eq!(config.whirlwind_stages, MAX_CONFIG_COUNT);
        assert_eq!(config.barrage_count, MAX_CONFIG_COUNT);
        assert_eq!(config.max_seals, MAX_CONFIG_COUNT);
        assert_eq!(config.split, MAX_CONFIG_COUNT);
        assert_eq!(config.projectile_speed, MAX_PROJECTILE_SPEED);
        assert_eq!(config.expected_projectile_count(MAX_CONFIG_COUNT), 301 * 101);

        let unsanitized = SimConfig {
            base_projectiles: u32::MAX,
            whirlwind_stages: u32::MAX,
            barrage_count: u32::MAX,
            ..Default::default()
        };
        assert_eq!(unsanitized.expected_projectile_count(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_speed_increase_is_bounded() {
        let config = SimConfig {
            projectile_speed: MAX_PROJECTILE_SPEED,
            projectile_speed_increase: 1e9,
            ..Default::default()
        };
        assert_eq!(config.effective_speed(), MAX_PROJECTILE_SPEED);
    }

    #[test]
    fn test_malformed_json_defaults() {
        assert_eq!(SimConfig::from_json_str("{not json"), SimConfig::default());
        assert_eq!(SimConfig::from_json_str("[1,2,3]"), SimConfig::default());
    }

    #[test]
    fn test_sanitize_replaces_nan() {
        let mut config = SimConfig {
            projectile_speed: f64::NAN,
            target_radius: -1.0,
            fork_chance: 250.0,
            projectile_duration: -1.0,
            ..Default::default()
        };
        config.sanitize();
        let d = SimConfig::default();
        assert_eq!(config.projectile_speed, d.projectile_speed);
        assert_eq!(config.target_radius, d.target_radius);
        assert_eq!(config.fork_chance, 100.0);
        assert_eq!(config.projectile_duration, -1.0);
    }

    #[test]
    fn test_threshold_zero_behaves_as_one() {
        let config = SimConfig {
            seal_threshold: 0,
            ..Default::default()
        };
        assert_eq!(config.cast_threshold(), 1);
    }

    #[test]
    fn test_expected_projectile_count() {
        let config = SimConfig {
            whirlwind_stages: 3,
            barrage_count: 2,
            ..Default::default()
        };
        // (1 + 3 + 2*2) * (1 + 2)
        assert_eq!(config.expected_projectile_count(2), 24);
    }

    #[test]
    fn test_damage_multiplier() {
        let config = SimConfig {
            whirlwind_stages: 2,
            ..Default::default()
        };
        let main = config.damage_multiplier(0);
        let repeat = config.damage_multiplier(1);
        assert!((main - (1.0 + 2.0 * WHIRLWIND_STAGE_BONUS)).abs() < 1e-12);
        assert!((repeat - main * BARRAGE_REPEAT_DAMAGE).abs() < 1e-12);
    }

    #[test]
    fn test_seal_interval() {
        let config = SimConfig {
            seal_frequency: 2.0,
            seal_frequency_increase: 100.0,
            ..Default::default()
        };
        assert!((config.seal_interval().unwrap() - 0.25).abs() < 1e-12);

        let config = SimConfig {
            seal_frequency: 0.0,
            ..Default::default()
        };
        assert!(config.seal_interval().is_none());
    }

    #[test]
    fn test_enum_parsing() {
        let config = SimConfig::from_json_value(&json!({
            "arena": "Corridor",
            "hit_group_policy": "merged",
        }));
        assert_eq!(config.arena, ArenaKind::Corridor);
        assert_eq!(config.hit_group_policy, HitGroupPolicy::Merged);
        assert_eq!("poly".parse::<ArenaKind>(), Ok(ArenaKind::Polygon));
        assert_eq!(" I ".parse::<HitGroupPolicy>(), Ok(HitGroupPolicy::Independent));
        assert_eq!("hexagon".parse::<ArenaKind>(), Err(()));
    }
}
