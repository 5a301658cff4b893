//! Game settings and preferences
//!
//! Persisted separately from progress. Loading never fails: anything
//! unreadable falls back to defaults with a warning.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Cosmetic snake skin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum SkinId {
    #[default]
    Classic,
    Neon,
    Ember,
    Frost,
    Venom,
}

impl SkinId {
    pub const ALL: [SkinId; 5] = [
        SkinId::Classic,
        SkinId::Neon,
        SkinId::Ember,
        SkinId::Frost,
        SkinId::Venom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkinId::Classic => "Classic",
            SkinId::Neon => "Neon",
            SkinId::Ember => "Ember",
            SkinId::Frost => "Frost",
            SkinId::Venom => "Venom",
        }
    }

    /// Case-insensitive name lookup, plus a few legacy aliases
    pub fn from_str(s: &str) -> Option<Self> {
        let name = s.trim();
        if let Some(skin) = SkinId::ALL
            .into_iter()
            .find(|skin| skin.as_str().eq_ignore_ascii_case(name))
        {
            return Some(skin);
        }
        match name.to_lowercase().as_str() {
            "default" => Some(SkinId::Classic),
            "fire" => Some(SkinId::Ember),
            "ice" => Some(SkinId::Frost),
            _ => None,
        }
    }

    /// Like `from_str`, but unknown names become `Classic` (logged)
    pub fn parse(s: &str) -> Self {
        Self::from_str(s).unwrap_or_else(|| {
            log::warn!("Unknown skin '{s}', using {}", SkinId::Classic);
            SkinId::Classic
        })
    }

    /// Head/body tint (0xRRGGBB)
    pub fn colors(&self) -> (u32, u32) {
        match self {
            SkinId::Classic => (0x3fbf3f, 0x2e8b2e),
            SkinId::Neon => (0x39ff14, 0xff00ff),
            SkinId::Ember => (0xff7a1a, 0xb22222),
            SkinId::Frost => (0xbfefff, 0x4682b4),
            SkinId::Venom => (0x9acd32, 0x4b0082),
        }
    }
}

impl fmt::Display for SkinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Stored skins are free text; never reject a settings file over one
impl<'de> Deserialize<'de> for SkinId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SkinId::parse(&raw))
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub skin: SkinId,
    /// Pin the enemy upgrade tier (0-10) instead of deriving it from the level
    pub admin_enemy_tier: Option<u8>,

    // === HUD ===
    /// Show FPS counter
    pub show_fps: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            skin: SkinId::Classic,
            admin_enemy_tier: None,
            show_fps: true,
        }
    }
}

impl Settings {
    /// Parse settings JSON, falling back to defaults
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Settings>(json) {
            Ok(mut settings) => {
                settings.admin_enemy_tier = settings.admin_enemy_tier.map(|t| t.min(10));
                log::info!("Loaded settings (skin {})", settings.skin);
                settings
            }
            Err(e) => {
                log::warn!("Settings unreadable ({e}), using defaults");
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> String {
        // Plain data with string keys always serializes
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skin_lookup_is_lenient() {
        assert_eq!(SkinId::from_str("NEON"), Some(SkinId::Neon));
        assert_eq!(SkinId::from_str(" ice "), Some(SkinId::Frost));
        assert_eq!(SkinId::from_str("gold"), None);
        assert_eq!(SkinId::parse("gold"), SkinId::Classic);
    }

    #[test]
    fn test_every_skin_name_resolves() {
        for skin in SkinId::ALL {
            assert_eq!(SkinId::from_str(skin.as_str()), Some(skin));
            assert_eq!(SkinId::parse(&skin.to_string().to_uppercase()), skin);
        }
        assert_eq!(SkinId::from_str("Default"), Some(SkinId::Classic));
        assert_eq!(SkinId::from_str("fire"), Some(SkinId::Ember));
    }

    #[test]
    fn test_unknown_skin_in_file_falls_back() {
        let settings = Settings::from_json(r#"{"skin":"rainbow","show_fps":false}"#);
        assert_eq!(settings.skin, SkinId::Classic);
        assert!(!settings.show_fps);
    }

    #[test]
    fn test_partial_and_broken_files() {
        let settings = Settings::from_json(r#"{"admin_enemy_tier":42}"#);
        assert_eq!(settings.admin_enemy_tier, Some(10));
        assert_eq!(settings.skin, SkinId::Classic);
        assert_eq!(Settings::from_json("not json"), Settings::default());
    }

    #[test]
    fn test_round_trip() {
        let settings = Settings {
            skin: SkinId::Ember,
            admin_enemy_tier: Some(3),
            show_fps: false,
        };
        assert_eq!(Settings::from_json(&settings.to_json()), settings);
    }
}
