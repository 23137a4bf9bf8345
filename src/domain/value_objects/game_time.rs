//! In-game clock

use std::fmt;

use serde::{Deserialize, Serialize};

pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
pub const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// Elapsed in-game time since the campaign's day 1, 00:00
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct GameTime(u64);

impl GameTime {
    pub fn from_seconds(seconds: u64) -> Self {
        Self(seconds)
    }

    /// Build from a 1-based day plus time of day
    pub fn from_parts(day: u32, hour: u32, minute: u32) -> Self {
        let day_index = u64::from(day.max(1) - 1);
        Self(
            day_index * SECONDS_PER_DAY
                + u64::from(hour) * SECONDS_PER_HOUR
                + u64::from(minute) * SECONDS_PER_MINUTE,
        )
    }

    pub fn total_seconds(&self) -> u64 {
        self.0
    }

    pub fn advanced_by(&self, seconds: u64) -> Self {
        Self(self.0.saturating_add(seconds))
    }

    /// 1-based day number
    pub fn day(&self) -> u32 {
        (self.0 / SECONDS_PER_DAY) as u32 + 1
    }

    pub fn hour(&self) -> u32 {
        ((self.0 % SECONDS_PER_DAY) / SECONDS_PER_HOUR) as u32
    }

    pub fn minute(&self) -> u32 {
        ((self.0 % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE) as u32
    }

    /// Coarse label used in narration
    pub fn period(&self) -> &'static str {
        match self.hour() {
            5..=7 => "dawn",
            8..=11 => "morning",
            12..=16 => "afternoon",
            17..=19 => "dusk",
            20..=23 => "night",
            _ => "deep night",
        }
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Day {}, {:02}:{:02} ({})",
            self.day(),
            self.hour(),
            self.minute(),
            self.period()
        )
    }
}

/// Human-readable span, e.g. "1 hour 30 minutes"
pub fn describe_duration(seconds: u64) -> String {
    let days = seconds / SECONDS_PER_DAY;
    let hours = (seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
    let minutes = (seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let secs = seconds % SECONDS_PER_MINUTE;

    let mut parts = Vec::new();
    for (amount, unit) in [(days, "day"), (hours, "hour"), (minutes, "minute"), (secs, "second")] {
        if amount > 0 {
            let plural = if amount == 1 { "" } else { "s" };
            parts.push(format!("{} {}{}", amount, unit, plural));
        }
    }

    if parts.is_empty() {
        "no time".to_string()
    } else {
        parts.join(" ")
    }
}
