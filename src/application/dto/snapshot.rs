//! Session snapshot - the full state a client needs on join or resync
//!
//! The DM sees everything. Players lose hidden tokens, the DM sidebar, DM-only
//! and other players' chat, and the approval queue.

use serde::{Deserialize, Serialize};

use crate::application::dto::ConditionStatus;
use crate::domain::aggregates::{PendingActionBatch, SessionState};
use crate::domain::entities::{
    ActiveLightSource, ChatEntry, Environment, GameMap, InitiativeEntry, SessionTimer, Shop,
    SidebarEntry,
};
use crate::domain::value_objects::{GameTime, MapId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiativeView {
    pub entries: Vec<InitiativeEntry>,
    pub current_index: Option<usize>,
    pub round: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub maps: Vec<GameMap>,
    pub active_map: Option<MapId>,
    pub initiative: InitiativeView,
    pub conditions: Vec<ConditionStatus>,
    pub time: GameTime,
    pub time_display: String,
    pub environment: Environment,
    pub light_sources: Vec<ActiveLightSource>,
    pub shop: Shop,
    pub sidebar: Vec<SidebarEntry>,
    pub timer: Option<SessionTimer>,
    pub chat: Vec<ChatEntry>,
    pub pending_batches: Vec<PendingActionBatch>,
    pub require_approval: bool,
}

pub fn condition_statuses(state: &SessionState) -> Vec<ConditionStatus> {
    let round = state.initiative.round();
    state
        .conditions
        .iter()
        .map(|c| ConditionStatus {
            target: c.target.clone(),
            name: c.name.clone(),
            active: c.is_active(round),
        })
        .collect()
}

pub fn initiative_view(state: &SessionState) -> InitiativeView {
    InitiativeView {
        entries: state.initiative.entries().to_vec(),
        current_index: state.initiative.current_index(),
        round: state.initiative.round(),
    }
}

impl SessionSnapshot {
    pub fn for_dm(state: &SessionState) -> Self {
        Self {
            maps: state.maps.clone(),
            active_map: state.active_map,
            initiative: initiative_view(state),
            conditions: condition_statuses(state),
            time: state.time,
            time_display: state.time.to_string(),
            environment: state.environment,
            light_sources: state.light_sources.clone(),
            shop: state.shop.clone(),
            sidebar: state.sidebar.clone(),
            timer: state.timer.clone(),
            chat: state.chat.iter().cloned().collect(),
            pending_batches: state.pending_batches.clone(),
            require_approval: state.settings.require_approval,
        }
    }

    pub fn for_player(state: &SessionState, player_name: &str) -> Self {
        let mut snapshot = Self::for_dm(state);
        for map in &mut snapshot.maps {
            map.tokens.retain(|t| t.visible);
        }
        snapshot.sidebar.clear();
        snapshot.pending_batches.clear();
        snapshot.chat.retain(|c| c.visible_to_player(player_name));
        snapshot
    }
}
