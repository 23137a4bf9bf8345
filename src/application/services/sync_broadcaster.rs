//! Sync Broadcaster - builds full-resync messages from the current state
//!
//! Builders re-read the authoritative state after a mutation and produce the
//! complete slice (turn order, token positions, conditions). `publish` hands
//! the results to a [`BroadcastPort`].

use tracing::debug;

use crate::application::dto::{condition_statuses, OutboundMessage, SyncMessage, TokenPosition};
use crate::application::ports::outbound::BroadcastPort;
use crate::domain::aggregates::SessionState;
use crate::domain::entities::GameMap;

/// Initiative order, current index and round, for everyone
pub fn initiative_sync(state: &SessionState) -> OutboundMessage {
    OutboundMessage::everyone(SyncMessage::InitiativeSync {
        entries: state.initiative.entries().to_vec(),
        current_index: state.initiative.current_index(),
        round: state.initiative.round(),
    })
}

/// Positions of every token on the active map.
///
/// The DM receives all tokens; players receive only visible ones.
pub fn token_positions(state: &SessionState) -> Vec<OutboundMessage> {
    let Some(map) = state.active_map() else {
        return Vec::new();
    };

    let all = map.tokens.iter().map(TokenPosition::from).collect();
    let visible = map
        .tokens
        .iter()
        .filter(|t| t.visible)
        .map(TokenPosition::from)
        .collect();

    vec![
        OutboundMessage::dm_only(SyncMessage::TokenPositions {
            map_id: map.id,
            tokens: all,
        }),
        OutboundMessage::players(SyncMessage::TokenPositions {
            map_id: map.id,
            tokens: visible,
        }),
    ]
}

/// Target / name / active triple for every tracked condition
pub fn condition_sync(state: &SessionState) -> OutboundMessage {
    OutboundMessage::everyone(SyncMessage::ConditionSync {
        conditions: condition_statuses(state),
    })
}

/// Every revealed cell of a map
pub fn fog_sync(map: &GameMap) -> OutboundMessage {
    OutboundMessage::everyone(SyncMessage::FogUpdated {
        map_id: map.id,
        revealed: map.revealed_cells.iter().copied().collect(),
    })
}

pub fn time_sync(state: &SessionState) -> OutboundMessage {
    OutboundMessage::everyone(SyncMessage::TimeUpdated {
        time: state.time,
        display: state.time.to_string(),
    })
}

pub fn light_sources_sync(state: &SessionState) -> OutboundMessage {
    OutboundMessage::everyone(SyncMessage::LightSourcesUpdated {
        sources: state.light_sources.clone(),
    })
}

/// Everything a reconnecting viewer needs to be consistent again
pub fn full_resync(state: &SessionState) -> Vec<OutboundMessage> {
    let mut messages = vec![initiative_sync(state)];
    messages.extend(token_positions(state));
    messages.push(condition_sync(state));
    if let Some(map) = state.active_map() {
        messages.push(fog_sync(map));
    }
    messages.push(time_sync(state));
    messages
}

/// Hand messages to the transport; returns total deliveries
pub fn publish(port: &dyn BroadcastPort, messages: &[OutboundMessage]) -> usize {
    let delivered = messages.iter().map(|m| port.deliver(m)).sum();
    debug!(
        messages = messages.len(),
        delivered, "Published sync messages"
    );
    delivered
}
