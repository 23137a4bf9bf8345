//! Environment state - lighting, travel pace, underwater combat and light sources

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{GameTime, SECONDS_PER_MINUTE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AmbientLight {
    #[default]
    Bright,
    Dim,
    Darkness,
}

impl AmbientLight {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bright => "bright",
            Self::Dim => "dim",
            Self::Darkness => "darkness",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TravelPace {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl TravelPace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Normal => "normal",
            Self::Fast => "fast",
        }
    }

    /// Miles covered in a day of travel
    pub fn miles_per_day(&self) -> u32 {
        match self {
            Self::Slow => 18,
            Self::Normal => 24,
            Self::Fast => 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub ambient_light: AmbientLight,
    pub underwater_combat: bool,
    pub travel_pace: TravelPace,
}

/// A burning torch, lantern or spell tracked against the game clock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveLightSource {
    pub entity_name: String,
    pub source_name: String,
    pub lit_at: GameTime,
    /// `None` for permanent sources
    pub expires_at: Option<GameTime>,
}

impl ActiveLightSource {
    pub fn light(
        entity_name: impl Into<String>,
        source_name: impl Into<String>,
        now: GameTime,
        duration_minutes: Option<u32>,
    ) -> Self {
        let source_name = source_name.into();
        let minutes = duration_minutes.or_else(|| known_duration_minutes(&source_name));
        Self {
            entity_name: entity_name.into(),
            expires_at: minutes.map(|m| now.advanced_by(u64::from(m) * SECONDS_PER_MINUTE)),
            source_name,
            lit_at: now,
        }
    }

    pub fn is_expired(&self, now: GameTime) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub fn matches(&self, entity_name: &str, source_name: &str) -> bool {
        self.entity_name.eq_ignore_ascii_case(entity_name)
            && self.source_name.eq_ignore_ascii_case(source_name)
    }
}

/// Default burn time for a light source; `None` means it never goes out
pub fn known_duration_minutes(source_name: &str) -> Option<u32> {
    match source_name.trim().to_lowercase().as_str() {
        "torch" | "candle" | "light" | "light spell" => Some(60),
        "lantern" | "hooded lantern" | "bullseye lantern" => Some(360),
        "continual flame" => None,
        _ => Some(60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_durations() {
        assert_eq!(known_duration_minutes("Torch"), Some(60));
        assert_eq!(known_duration_minutes("lantern"), Some(360));
        assert_eq!(known_duration_minutes("Continual Flame"), None);
        assert_eq!(known_duration_minutes("glowing moss"), Some(60));
    }

    #[test]
    fn test_torch_expires_after_an_hour() {
        let start = GameTime::from_parts(1, 20, 0);
        let torch = ActiveLightSource::light("Aria", "Torch", start, None);
        assert!(!torch.is_expired(start.advanced_by(59 * SECONDS_PER_MINUTE)));
        assert!(torch.is_expired(start.advanced_by(60 * SECONDS_PER_MINUTE)));
    }

    #[test]
    fn test_explicit_duration_wins() {
        let start = GameTime::default();
        let source = ActiveLightSource::light("Bram", "Lantern", start, Some(10));
        assert_eq!(
            source.expires_at,
            Some(start.advanced_by(10 * SECONDS_PER_MINUTE))
        );
    }

    #[test]
    fn test_permanent_source_never_expires() {
        let start = GameTime::default();
        let flame = ActiveLightSource::light("Altar", "Continual Flame", start, None);
        assert!(!flame.is_expired(start.advanced_by(u64::MAX / 2)));
    }
}
