use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const PRESET_ENV: &str = "SCREAM_HERO_PRESET";
pub const CONFIG_ENV: &str = "SCREAM_HERO_CONFIG";
pub const THRESHOLD_ENV: &str = "SCREAM_HERO_THRESHOLD";

/// Shared tuning constants. Per-preset physics lives in [`Preset`].
#[derive(Debug, Clone, Copy)]
pub struct Params;

impl Params {
    // Field
    pub const FIELD_WIDTH: f64 = 900.0;
    pub const FIELD_HEIGHT: f64 = 420.0;
    pub const FLOOR_MARGIN: f64 = 36.0;

    // Hero
    pub const HERO_X: f64 = 130.0;
    pub const HERO_SIZE: f64 = 36.0;

    // Scrolling
    pub const BASE_SPEED: f64 = 2.6;
    pub const SPEED_STEP: f64 = 0.03; // per passed pair
    pub const SCORE_ACCEL: f64 = 0.02; // bonus per point of score

    // Spawning
    pub const SPAWN_EVERY: u32 = 110; // frames
    pub const SPAWN_MIN: u32 = 70;
    pub const SPAWN_SCORE_DIVISOR: u32 = 12;
    pub const GAP_MIN: f64 = 110.0;
    pub const GAP_RANGE: f64 = 70.0;
    pub const TOP_MIN: f64 = 50.0;
    pub const TOP_RESERVE: f64 = 260.0;
    pub const OBSTACLE_WIDTH: f64 = 56.0;
    pub const SPAWN_OFFSET: f64 = 20.0;
    pub const CULL_MARGIN: f64 = 40.0;

    // Loudness
    pub const LOUDNESS_CEILING: f64 = 0.4;
    pub const EXTRA_IMPULSE: f64 = 12.0;
    pub const THRESHOLD: f64 = 0.15;
    pub const THRESHOLD_MIN: f64 = 0.0;
    pub const THRESHOLD_MAX: f64 = 1.0;
    pub const THRESHOLD_STEP: f64 = 0.01;
    pub const WINDOW_LEN: usize = 1024;
}

/// The two shipped tunings of the game. They differ only in constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    Classic,
    Gentle,
}

impl Preset {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Some(Preset::Classic),
            "gentle" => Some(Preset::Gentle),
            _ => None,
        }
    }

    pub fn config(self) -> EngineConfig {
        let base = EngineConfig::classic();
        match self {
            Preset::Classic => base,
            Preset::Gentle => EngineConfig {
                preset: Preset::Gentle,
                gravity: 0.5,
                base_jump: -7.5,
                manual_jump: -9.0,
                jump_cooldown_ms: 160.0,
                speed_bonus_cap: 3.5,
                ..base
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub preset: Preset,

    pub field_width: f64,
    pub field_height: f64,
    pub floor_margin: f64,

    pub hero_x: f64,
    pub hero_w: f64,
    pub hero_h: f64,

    pub gravity: f64,
    pub base_jump: f64,
    pub manual_jump: f64,
    pub jump_cooldown_ms: f64,

    pub base_speed: f64,
    pub speed_step: f64,
    pub score_accel: f64,
    pub speed_bonus_cap: f64,

    pub spawn_every: u32,
    pub spawn_min: u32,
    pub spawn_score_divisor: u32,
    pub gap_min: f64,
    pub gap_range: f64,
    pub top_min: f64,
    pub top_reserve: f64,
    pub obstacle_w: f64,
    pub spawn_offset: f64,
    pub cull_margin: f64,

    pub loudness_ceiling: f64,
    pub extra_impulse: f64,
    pub threshold: f64,
    pub threshold_min: f64,
    pub threshold_max: f64,
    pub threshold_step: f64,
    pub window_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::classic()
    }
}

impl EngineConfig {
    pub fn classic() -> Self {
        Self {
            preset: Preset::Classic,
            field_width: Params::FIELD_WIDTH,
            field_height: Params::FIELD_HEIGHT,
            floor_margin: Params::FLOOR_MARGIN,
            hero_x: Params::HERO_X,
            hero_w: Params::HERO_SIZE,
            hero_h: Params::HERO_SIZE,
            gravity: 0.55,
            base_jump: -8.0,
            manual_jump: -10.0,
            jump_cooldown_ms: 140.0,
            base_speed: Params::BASE_SPEED,
            speed_step: Params::SPEED_STEP,
            score_accel: Params::SCORE_ACCEL,
            speed_bonus_cap: 4.0,
            spawn_every: Params::SPAWN_EVERY,
            spawn_min: Params::SPAWN_MIN,
            spawn_score_divisor: Params::SPAWN_SCORE_DIVISOR,
            gap_min: Params::GAP_MIN,
            gap_range: Params::GAP_RANGE,
            top_min: Params::TOP_MIN,
            top_reserve: Params::TOP_RESERVE,
            obstacle_w: Params::OBSTACLE_WIDTH,
            spawn_offset: Params::SPAWN_OFFSET,
            cull_margin: Params::CULL_MARGIN,
            loudness_ceiling: Params::LOUDNESS_CEILING,
            extra_impulse: Params::EXTRA_IMPULSE,
            threshold: Params::THRESHOLD,
            threshold_min: Params::THRESHOLD_MIN,
            threshold_max: Params::THRESHOLD_MAX,
            threshold_step: Params::THRESHOLD_STEP,
            window_len: Params::WINDOW_LEN,
        }
    }

    /// Y coordinate of the ground line.
    pub fn floor_y(&self) -> f64 {
        self.field_height - self.floor_margin
    }

    /// Resolve the config from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::load(|key| std::env::var(key).ok())
    }

    /// Resolve the config through `lookup`: preset, then an optional JSON
    /// overrides file, then the initial threshold.
    pub fn load(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let preset = match lookup(PRESET_ENV) {
            Some(raw) => Preset::parse(&raw).ok_or(Error::ConfigValue {
                key: PRESET_ENV,
                value: raw,
            })?,
            None => Preset::default(),
        };

        let mut config = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(preset, PathBuf::from(path))?,
            None => preset.config(),
        };

        if let Some(raw) = lookup(THRESHOLD_ENV) {
            config.threshold = raw.trim().parse().map_err(|_| Error::ConfigValue {
                key: THRESHOLD_ENV,
                value: raw,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    fn from_file(preset: Preset, path: PathBuf) -> Result<Self> {
        let text = fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
            path: path.clone(),
            source,
        })?;
        Self::from_json(preset, &text).map_err(|source| Error::ConfigParse { path, source })
    }

    /// Apply a JSON object of overrides on top of `preset`. Keys absent from
    /// the document keep the preset's value. The result is not validated;
    /// [`EngineConfig::load`] runs [`EngineConfig::validate`] on it.
    pub fn from_json(preset: Preset, text: &str) -> std::result::Result<Self, serde_json::Error> {
        let overrides: serde_json::Value = serde_json::from_str(text)?;
        let mut merged = serde_json::to_value(preset.config())?;
        if let (Some(base), serde_json::Value::Object(patch)) = (merged.as_object_mut(), overrides)
        {
            for (key, value) in patch {
                base.insert(key, value);
            }
        }
        serde_json::from_value(merged)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::InvalidConfig(msg));

        if !(self.field_width > 0.0 && self.field_height > 0.0) {
            return fail(format!(
                "field must be positive, got {}x{}",
                self.field_width, self.field_height
            ));
        }
        if self.hero_w <= 0.0 || self.hero_h <= 0.0 {
            return fail("hero size must be positive".into());
        }
        if self.hero_h >= self.floor_y() {
            return fail("hero does not fit above the floor".into());
        }
        let tallest = self.top_min + self.gap_min + self.gap_range + self.floor_margin;
        if tallest > self.field_height {
            return fail(format!(
                "field height {} cannot hold an obstacle pair ({tallest} needed)",
                self.field_height
            ));
        }
        if self.spawn_min == 0 || self.spawn_score_divisor == 0 {
            return fail("spawn_min and spawn_score_divisor must be non-zero".into());
        }
        if self.jump_cooldown_ms < 0.0 {
            return fail("jump_cooldown_ms must not be negative".into());
        }
        if self.threshold_min > self.threshold_max {
            return fail("threshold_min exceeds threshold_max".into());
        }
        if !(self.threshold_min..=self.threshold_max).contains(&self.threshold) {
            return fail(format!(
                "threshold {} outside [{}, {}]",
                self.threshold, self.threshold_min, self.threshold_max
            ));
        }
        if self.window_len == 0 {
            return fail("window_len must be non-zero".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_is_classic() {
        let config = EngineConfig::load(env(&[])).unwrap();
        assert_eq!(config, EngineConfig::classic());
        assert_eq!(config.floor_y(), 384.0);
    }

    #[test]
    fn test_gentle_preset_differs_in_physics_only() {
        let gentle = Preset::Gentle.config();
        let classic = Preset::Classic.config();
        assert_eq!(gentle.speed_bonus_cap, 3.5);
        assert_ne!(gentle.gravity, classic.gravity);
        assert_eq!(gentle.field_width, classic.field_width);
        assert_eq!(gentle.spawn_every, classic.spawn_every);
    }

    #[test]
    fn test_env_preset_and_threshold() {
        let config = EngineConfig::load(env(&[
            (PRESET_ENV, "Gentle"),
            (THRESHOLD_ENV, " 0.3 "),
        ]))
        .unwrap();
        assert_eq!(config.preset, Preset::Gentle);
        assert_eq!(config.threshold, 0.3);
    }

    #[test]
    fn test_bad_preset_is_rejected() {
        let err = EngineConfig::load(env(&[(PRESET_ENV, "loud")])).unwrap_err();
        assert!(matches!(err, Error::ConfigValue { key: PRESET_ENV, .. }));
    }

    #[test]
    fn test_json_overrides_keep_preset_values() {
        let config =
            EngineConfig::from_json(Preset::Gentle, r#"{ "gravity": 0.7, "spawn_every": 90 }"#)
                .unwrap();
        assert_eq!(config.gravity, 0.7);
        assert_eq!(config.spawn_every, 90);
        assert_eq!(config.speed_bonus_cap, 3.5);
        assert_eq!(config.base_jump, -7.5);
    }

    #[test]
    fn test_missing_config_file() {
        let err = EngineConfig::load(env(&[(CONFIG_ENV, "/nonexistent/scream.json")]))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn test_threshold_outside_slider_range_is_rejected() {
        let err = EngineConfig::load(env(&[(THRESHOLD_ENV, "1.5")])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let config = EngineConfig::load(env(&[(THRESHOLD_ENV, "1")])).unwrap();
        assert_eq!(config.threshold, 1.0);
    }

    #[test]
    fn test_json_zero_divisor_parses_but_fails_validation() {
        let config =
            EngineConfig::from_json(Preset::Classic, r#"{ "spawn_score_divisor": 0 }"#).unwrap();
        assert_eq!(config.spawn_score_divisor, 0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_short_field_fails_validation() {
        let config = EngineConfig {
            field_height: 200.0,
            ..EngineConfig::classic()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
