//! Chat log, DM sidebar and the session countdown timer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who may see a chat entry or outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Audience {
    Everyone,
    DmOnly,
    /// Every player but not the DM
    Players,
    Player(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub sender: String,
    pub text: String,
    pub audience: Audience,
    pub sent_at: DateTime<Utc>,
}

impl ChatEntry {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            sender: "System".to_string(),
            text: text.into(),
            audience: Audience::Everyone,
            sent_at: Utc::now(),
        }
    }

    pub fn to(mut self, audience: Audience) -> Self {
        self.audience = audience;
        self
    }

    pub fn visible_to_player(&self, player: &str) -> bool {
        match &self.audience {
            Audience::Everyone | Audience::Players => true,
            Audience::DmOnly => false,
            Audience::Player(name) => name.eq_ignore_ascii_case(player),
        }
    }
}

/// DM reference list a sidebar entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidebarCategory {
    Npcs,
    Locations,
    Items,
    Quests,
    Notes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarEntry {
    pub category: SidebarCategory,
    pub name: String,
    pub description: Option<String>,
}

/// A visible countdown, e.g. "the ritual completes"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTimer {
    pub target_name: String,
    pub seconds: u32,
    pub started_at: DateTime<Utc>,
}

impl SessionTimer {
    pub fn start(target_name: impl Into<String>, seconds: u32) -> Self {
        Self {
            target_name: target_name.into(),
            seconds,
            started_at: Utc::now(),
        }
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u32 {
        let elapsed = (now - self.started_at).num_seconds().max(0);
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.seconds.saturating_sub(elapsed)
    }
}
