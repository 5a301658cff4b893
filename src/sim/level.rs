//! Level difficulty curve
//!
//! `resolve_level_params` is a pure function of (level, overrides). Levels
//! 1-5 come from hand-tuned tables, later levels from closed-form formulas,
//! and an external override table can replace any field.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::consts::MAX_LEVEL;
use crate::error::{ConfigError, Result};

/// Resolved difficulty for one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelParams {
    pub level: u32,
    pub stars_needed: u32,
    pub player_speed: f32,
    pub enemy_speed: f32,
    pub enemy_count: u32,
    pub enemy_shoot_percent: u32,
    pub enemy_shield_percent: u32,
    pub enemy_upgrade_level: u8,
    pub enemy_shoot_cooldown_ms: f64,
    pub killer_saw_count: u32,
    pub floating_cannon_count: u32,
    pub resentful_snake_count: u32,
    pub health_box_count: u32,
    /// Number of food items kept on the map
    pub xp_points: u32,
    pub map_size: u32,
    pub central_cell: bool,
}

/// Partial per-level override as supplied by level designers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LevelOverride {
    pub stars_needed: Option<u32>,
    pub player_speed: Option<f32>,
    pub enemy_speed: Option<f32>,
    pub enemy_count: Option<u32>,
    pub enemy_shoot_percent: Option<u32>,
    pub enemy_shield_percent: Option<u32>,
    pub enemy_upgrade_level: Option<u8>,
    pub enemy_shoot_cooldown: Option<f64>,
    pub killer_saw_count: Option<u32>,
    pub floating_cannon_count: Option<u32>,
    pub resentful_snake_count: Option<u32>,
    pub health_box_count: Option<u32>,
    pub xp_points: Option<u32>,
    /// Older name for `xp_points`
    pub xp_density: Option<u32>,
    pub map_size: Option<u32>,
    pub central_cell: Option<bool>,
}

/// Largest counts an override may ask for
const MAX_OVERRIDE_STARS: u32 = 200;
const MAX_OVERRIDE_ACTORS: u32 = 200;
const MAX_OVERRIDE_FOOD: u32 = 2000;
const MAX_OVERRIDE_MAP_SIZE: u32 = 100;

impl LevelOverride {
    /// Reject counts no level could spawn in reasonable time
    fn check_limits(&self, level: u32) -> Result<()> {
        let counts = [
            ("starsNeeded", self.stars_needed, MAX_OVERRIDE_STARS),
            ("enemyCount", self.enemy_count, MAX_OVERRIDE_ACTORS),
            ("killerSawCount", self.killer_saw_count, MAX_OVERRIDE_ACTORS),
            ("floatingCannonCount", self.floating_cannon_count, MAX_OVERRIDE_ACTORS),
            ("resentfulSnakeCount", self.resentful_snake_count, MAX_OVERRIDE_ACTORS),
            ("healthBoxCount", self.health_box_count, MAX_OVERRIDE_ACTORS),
            ("xpPoints", self.xp_points, MAX_OVERRIDE_FOOD),
            ("xpDensity", self.xp_density, MAX_OVERRIDE_FOOD),
            ("mapSize", self.map_size, MAX_OVERRIDE_MAP_SIZE),
        ];
        for (field, value, max) in counts {
            if let Some(value) = value.filter(|v| *v > max) {
                return Err(ConfigError::OverrideOutOfRange {
                    level,
                    field,
                    value,
                    max,
                });
            }
        }
        Ok(())
    }
}

/// Override table keyed by level number
#[derive(Debug, Clone, Default)]
pub struct LevelOverrides {
    levels: HashMap<u32, LevelOverride>,
}

impl LevelOverrides {
    /// Parse a JSON object of `{"<level>": {..partial..}}`
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, LevelOverride> =
            serde_json::from_str(json).map_err(|source| ConfigError::Parse {
                what: "level overrides",
                source,
            })?;

        let mut levels = HashMap::with_capacity(raw.len());
        for (key, entry) in raw {
            let level = key
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidLevelKey(key.clone()))?;
            entry.check_limits(level)?;
            levels.insert(level, entry);
        }
        Ok(Self { levels })
    }

    /// Parse, or log and fall back to an empty table
    pub fn from_json_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(table) => {
                log::info!("Loaded level overrides for {} levels", table.levels.len());
                table
            }
            Err(e) => {
                log::warn!("{e}; using built-in level curve");
                Self::default()
            }
        }
    }

    pub fn get(&self, level: u32) -> Option<&LevelOverride> {
        self.levels.get(&level)
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Default enemy upgrade tier when nothing else specifies it
#[inline]
pub fn default_enemy_upgrade_level(level: u32) -> u8 {
    ((level.saturating_sub(1) * 10) / 24).min(10) as u8
}

/// Resolve the parameters for `level` (clamped to 1..=25)
pub fn resolve_level_params(level: u32, overrides: Option<&LevelOverrides>) -> LevelParams {
    let level = level.clamp(1, MAX_LEVEL);
    let base = hand_tuned(level).unwrap_or_else(|| formula(level));

    match overrides.and_then(|table| table.get(level)) {
        Some(entry) => apply_override(base, entry),
        None => base,
    }
}

fn apply_override(base: LevelParams, o: &LevelOverride) -> LevelParams {
    let level = base.level;
    LevelParams {
        level,
        stars_needed: checked(level, "starsNeeded", o.stars_needed, base.stars_needed, |v| *v >= 1),
        player_speed: checked(level, "playerSpeed", o.player_speed, base.player_speed, valid_speed),
        enemy_speed: checked(level, "enemySpeed", o.enemy_speed, base.enemy_speed, valid_speed),
        enemy_count: o.enemy_count.unwrap_or(base.enemy_count),
        enemy_shoot_percent: checked(
            level,
            "enemyShootPercent",
            o.enemy_shoot_percent,
            base.enemy_shoot_percent,
            |v| *v <= 100,
        ),
        enemy_shield_percent: checked(
            level,
            "enemyShieldPercent",
            o.enemy_shield_percent,
            base.enemy_shield_percent,
            |v| *v <= 100,
        ),
        enemy_upgrade_level: checked(
            level,
            "enemyUpgradeLevel",
            o.enemy_upgrade_level,
            default_enemy_upgrade_level(level),
            |v| *v <= 10,
        ),
        enemy_shoot_cooldown_ms: checked(
            level,
            "enemyShootCooldown",
            o.enemy_shoot_cooldown,
            base.enemy_shoot_cooldown_ms,
            |v| v.is_finite() && *v > 0.0,
        ),
        killer_saw_count: o.killer_saw_count.unwrap_or(base.killer_saw_count),
        floating_cannon_count: o.floating_cannon_count.unwrap_or(base.floating_cannon_count),
        resentful_snake_count: o.resentful_snake_count.unwrap_or(base.resentful_snake_count),
        health_box_count: o.health_box_count.unwrap_or(base.health_box_count),
        xp_points: o.xp_points.or(o.xp_density).unwrap_or(base.xp_points),
        map_size: checked(level, "mapSize", o.map_size, base.map_size, |v| *v >= 10),
        central_cell: o.central_cell.unwrap_or(base.central_cell),
    }
}

fn valid_speed(v: &f32) -> bool {
    v.is_finite() && *v > 0.0
}

/// Take an override value if it passes `valid`, otherwise warn and keep the fallback
fn checked<T: Copy + std::fmt::Debug>(
    level: u32,
    field: &str,
    value: Option<T>,
    fallback: T,
    valid: impl Fn(&T) -> bool,
) -> T {
    match value {
        Some(v) if valid(&v) => v,
        Some(v) => {
            log::warn!("Level {level}: ignoring invalid override {field}={v:?}");
            fallback
        }
        None => fallback,
    }
}

#[allow(clippy::too_many_arguments)]
const fn tuned(
    level: u32,
    stars_needed: u32,
    player_speed: f32,
    enemy_speed: f32,
    enemy_count: u32,
    enemy_shoot_percent: u32,
    enemy_shield_percent: u32,
    enemy_upgrade_level: u8,
    enemy_shoot_cooldown_ms: f64,
    killer_saw_count: u32,
    floating_cannon_count: u32,
    health_box_count: u32,
    xp_points: u32,
    map_size: u32,
    central_cell: bool,
) -> LevelParams {
    LevelParams {
        level,
        stars_needed,
        player_speed,
        enemy_speed,
        enemy_count,
        enemy_shoot_percent,
        enemy_shield_percent,
        enemy_upgrade_level,
        enemy_shoot_cooldown_ms,
        killer_saw_count,
        floating_cannon_count,
        resentful_snake_count: 0,
        health_box_count,
        xp_points,
        map_size,
        central_cell,
    }
}

/// Hand-tuned opening levels
fn hand_tuned(level: u32) -> Option<LevelParams> {
    let params = match level {
        1 => tuned(1, 1, 3.0, 1.8, 3, 0, 0, 0, 5000.0, 0, 0, 2, 60, 16, false),
        2 => tuned(2, 2, 3.0, 1.9, 4, 10, 0, 0, 4800.0, 0, 0, 2, 70, 18, false),
        3 => tuned(3, 2, 3.1, 2.0, 4, 15, 5, 0, 4700.0, 1, 0, 2, 80, 18, false),
        4 => tuned(4, 3, 3.1, 2.1, 5, 20, 10, 1, 4600.0, 1, 0, 3, 90, 20, false),
        5 => tuned(5, 3, 3.2, 2.2, 5, 25, 10, 1, 4500.0, 2, 1, 3, 100, 20, true),
        _ => return None,
    };
    Some(params)
}

/// Closed-form curve used past the tuned levels
fn formula(level: u32) -> LevelParams {
    let l = level as f32;
    let enemy_count = match level {
        0..=8 => 6,
        9..=15 => 8,
        16..=20 => 10,
        _ => 12,
    };

    LevelParams {
        level,
        stars_needed: ((l * 0.5).floor() as u32 + 1).max(1),
        player_speed: (3.0 + l * 0.04).min(4.2),
        enemy_speed: (1.8 + l * 0.08).min(4.0),
        enemy_count,
        enemy_shoot_percent: (10 + level * 3).min(85),
        enemy_shield_percent: (level * 2).min(60),
        enemy_upgrade_level: default_enemy_upgrade_level(level),
        enemy_shoot_cooldown_ms: (5000.0 - level as f64 * 100.0).max(2000.0),
        killer_saw_count: (level / 2).min(8),
        floating_cannon_count: (level.saturating_sub(3) / 3).min(6),
        resentful_snake_count: if level >= 10 { 1 + (level - 10) / 8 } else { 0 },
        health_box_count: 3 + level / 6,
        xp_points: 100 + level.saturating_sub(5) * 5,
        map_size: (20 + level.saturating_sub(5) / 2).min(30),
        central_cell: level >= 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_formula_examples() {
        let p = resolve_level_params(10, None);
        assert_eq!(p.stars_needed, 6);
        assert_eq!(p.enemy_shoot_cooldown_ms, 4000.0);
        assert_eq!(p.enemy_upgrade_level, 3);
        assert_eq!(p.resentful_snake_count, 1);

        let last = resolve_level_params(25, None);
        assert_eq!(last.stars_needed, 13);
        assert_eq!(last.enemy_shoot_cooldown_ms, 2500.0);
        assert_eq!(last.enemy_upgrade_level, 10);
    }

    #[test]
    fn test_hand_tuned_take_precedence() {
        let p = resolve_level_params(1, None);
        assert_eq!(p.stars_needed, 1);
        assert_eq!(p.enemy_count, 3);
        assert!(!p.central_cell);
    }

    #[test]
    fn test_level_is_clamped() {
        assert_eq!(resolve_level_params(0, None).level, 1);
        assert_eq!(resolve_level_params(99, None).level, 25);
    }

    #[test]
    fn test_override_with_fallbacks() {
        let json = r#"{ "7": { "starsNeeded": 2, "xpDensity": 40, "enemySpeed": -1.0 } }"#;
        let table = LevelOverrides::from_json(json).unwrap();
        let p = resolve_level_params(7, Some(&table));
        let base = resolve_level_params(7, None);

        assert_eq!(p.stars_needed, 2);
        // xpPoints falls back to xpDensity
        assert_eq!(p.xp_points, 40);
        // invalid value replaced by the default
        assert_eq!(p.enemy_speed, base.enemy_speed);
        assert_eq!(p.enemy_upgrade_level, default_enemy_upgrade_level(7));
        // other levels untouched
        assert_eq!(resolve_level_params(8, Some(&table)), resolve_level_params(8, None));
    }

    #[test]
    fn test_xp_points_wins_over_density() {
        let json = r#"{ "3": { "xpPoints": 12, "xpDensity": 40 } }"#;
        let table = LevelOverrides::from_json(json).unwrap();
        assert_eq!(resolve_level_params(3, Some(&table)).xp_points, 12);
    }

    #[test]
    fn test_malformed_overrides() {
        assert!(matches!(
            LevelOverrides::from_json("{ not json"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            LevelOverrides::from_json(r#"{ "seven": {} }"#),
            Err(ConfigError::InvalidLevelKey(_))
        ));
        assert!(LevelOverrides::from_json_or_default("[1, 2]").is_empty());
    }

    #[test]
    fn test_oversized_counts_are_rejected() {
        let json = r#"{ "1": { "enemyCount": 500000000, "xpPoints": 1 } }"#;
        assert!(matches!(
            LevelOverrides::from_json(json),
            Err(ConfigError::OverrideOutOfRange {
                level: 1,
                field: "enemyCount",
                ..
            })
        ));
        assert!(LevelOverrides::from_json_or_default(json).is_empty());

        let at_limit = r#"{ "2": { "killerSawCount": 200, "mapSize": 100 } }"#;
        let table = LevelOverrides::from_json(at_limit).unwrap();
        assert_eq!(resolve_level_params(2, Some(&table)).killer_saw_count, 200);
    }

    proptest! {
        #[test]
        fn difficulty_is_monotonic(level in 1u32..25) {
            let a = resolve_level_params(level, None);
            let b = resolve_level_params(level + 1, None);
            prop_assert!(b.stars_needed >= a.stars_needed);
            prop_assert!(b.player_speed >= a.player_speed);
            prop_assert!(b.enemy_speed >= a.enemy_speed);
            prop_assert!(b.enemy_count >= a.enemy_count);
            prop_assert!(b.enemy_upgrade_level >= a.enemy_upgrade_level);
            prop_assert!(b.enemy_shoot_cooldown_ms <= a.enemy_shoot_cooldown_ms);
            prop_assert!(b.killer_saw_count >= a.killer_saw_count);
            prop_assert!(b.map_size >= a.map_size);
        }
    }
}
