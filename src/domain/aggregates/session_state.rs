//! Session State Aggregate - The authoritative state of one game session
//!
//! Everything the host owns for a session lives here: maps and their tokens,
//! the initiative tracker, conditions, the clock, environment, shop, DM
//! sidebar, chat and the approval queue. Only the action executor mutates it;
//! the broadcaster and snapshot builders read it.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    ActiveLightSource, Character, ChatEntry, Condition, Environment, GameMap, InitiativeTracker,
    Player, SessionTimer, Shop, SidebarEntry, Token,
};
use crate::domain::value_objects::{ApprovalBatchId, CustomEffect, GameTime, MapId};

pub const DEFAULT_CHAT_HISTORY: usize = 200;

/// Per-session switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    /// Hold every DM action batch for explicit approval
    pub require_approval: bool,
    pub max_chat_history: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            require_approval: false,
            max_chat_history: DEFAULT_CHAT_HISTORY,
        }
    }
}

/// A batch of raw actions waiting for the DM's decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingActionBatch {
    pub id: ApprovalBatchId,
    pub actions: Vec<serde_json::Value>,
    /// One human-readable line per action
    pub summary: Vec<String>,
    pub requested_at: DateTime<Utc>,
}

/// The Session State Aggregate Root
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub maps: Vec<GameMap>,
    pub active_map: Option<MapId>,
    pub initiative: InitiativeTracker,
    pub conditions: Vec<Condition>,
    pub time: GameTime,
    pub environment: Environment,
    pub light_sources: Vec<ActiveLightSource>,
    pub shop: Shop,
    pub sidebar: Vec<SidebarEntry>,
    pub timer: Option<SessionTimer>,
    pub chat: VecDeque<ChatEntry>,
    pub players: Vec<Player>,
    pub characters: Vec<Character>,
    pub custom_effects: Vec<CustomEffect>,
    pub pending_batches: Vec<PendingActionBatch>,
    pub settings: SessionSettings,
}

impl SessionState {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    // ========================================================================
    // Maps and tokens
    // ========================================================================

    /// Add a map; the first map added becomes active
    pub fn add_map(&mut self, map: GameMap) -> MapId {
        let id = map.id;
        self.maps.push(map);
        if self.active_map.is_none() {
            self.active_map = Some(id);
        }
        id
    }

    pub fn map(&self, id: MapId) -> Option<&GameMap> {
        self.maps.iter().find(|m| m.id == id)
    }

    pub fn map_mut(&mut self, id: MapId) -> Option<&mut GameMap> {
        self.maps.iter_mut().find(|m| m.id == id)
    }

    pub fn active_map(&self) -> Option<&GameMap> {
        self.active_map.and_then(|id| self.map(id))
    }

    pub fn active_map_mut(&mut self) -> Option<&mut GameMap> {
        let id = self.active_map?;
        self.map_mut(id)
    }

    /// Tokens on the active map, or nothing when no map is active
    pub fn active_tokens(&self) -> &[Token] {
        self.active_map().map(|m| m.tokens.as_slice()).unwrap_or(&[])
    }

    /// Walking speed for an entity's turn budget, falling back to 30 ft
    pub fn movement_for(&self, entity_ref: &str) -> u32 {
        self.active_tokens()
            .iter()
            .find(|t| {
                t.id.to_string() == entity_ref
                    || t.label.eq_ignore_ascii_case(entity_ref)
                    || t.entity_ref
                        .as_deref()
                        .is_some_and(|r| r.eq_ignore_ascii_case(entity_ref))
            })
            .map(|t| t.speeds.walk)
            .unwrap_or(30)
    }

    // ========================================================================
    // Characters and players
    // ========================================================================

    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Insert or replace a character sheet by name
    pub fn upsert_character(&mut self, character: Character) {
        match self
            .characters
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(&character.name))
        {
            Some(existing) => *existing = character,
            None => self.characters.push(character),
        }
    }

    pub fn add_player(&mut self, player: Player) {
        if !self.players.iter().any(|p| p.name == player.name) {
            self.players.push(player);
        }
    }

    // ========================================================================
    // Chat and approvals
    // ========================================================================

    /// Append to the chat log, dropping the oldest entries past the cap
    pub fn push_chat(&mut self, entry: ChatEntry) {
        self.chat.push_back(entry);
        while self.chat.len() > self.settings.max_chat_history.max(1) {
            self.chat.pop_front();
        }
    }

    pub fn take_pending_batch(&mut self, id: ApprovalBatchId) -> Option<PendingActionBatch> {
        let index = self.pending_batches.iter().position(|b| b.id == id)?;
        Some(self.pending_batches.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_map_becomes_active() {
        let mut state = SessionState::default();
        let first = state.add_map(GameMap::new("Road", 10, 10));
        state.add_map(GameMap::new("Cave", 10, 10));
        assert_eq!(state.active_map, Some(first));
        assert_eq!(state.active_map().map(|m| m.name.as_str()), Some("Road"));
    }

    #[test]
    fn test_movement_defaults_to_thirty() {
        let mut state = SessionState::default();
        let mut map = GameMap::new("Road", 10, 10);
        let mut wolf = Token::new("Wolf 1", 0, 0);
        wolf.speeds.walk = 40;
        map.tokens.push(wolf);
        state.add_map(map);

        assert_eq!(state.movement_for("wolf 1"), 40);
        assert_eq!(state.movement_for("Aria"), 30);
    }

    #[test]
    fn test_chat_history_is_capped() {
        let mut state = SessionState::new(SessionSettings {
            require_approval: false,
            max_chat_history: 2,
        });
        for text in ["one", "two", "three"] {
            state.push_chat(ChatEntry::system(text));
        }
        let texts: Vec<_> = state.chat.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["two", "three"]);
    }

    #[test]
    fn test_upsert_character_replaces_by_name() {
        let mut state = SessionState::default();
        state.upsert_character(Character::new("Aria", 3));
        state.upsert_character(Character::new("aria", 4));
        assert_eq!(state.characters.len(), 1);
        assert_eq!(state.character("ARIA").map(|c| c.level), Some(4));
    }
}
