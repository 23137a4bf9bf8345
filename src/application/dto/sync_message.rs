//! Sync messages - host-to-client state propagation
//!
//! Initiative, token positions and conditions are always sent as full
//! resyncs of the relevant slice, never as diffs, so a dropped message is
//! repaired by the next one.

use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    ActiveLightSource, Audience, ChatEntry, Environment, GridCell, InitiativeEntry,
    SessionTimer, Shop, SidebarEntry, Token,
};
use crate::domain::value_objects::{ApprovalBatchId, GameTime, MapId, RollOutcome, TokenId};

/// Grid position of one token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPosition {
    pub id: TokenId,
    pub label: String,
    pub grid_x: i32,
    pub grid_y: i32,
}

impl From<&Token> for TokenPosition {
    fn from(token: &Token) -> Self {
        Self {
            id: token.id,
            label: token.label.clone(),
            grid_x: token.grid_x,
            grid_y: token.grid_y,
        }
    }
}

/// Target / name / active triple for one tracked condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionStatus {
    pub target: String,
    pub name: String,
    pub active: bool,
}

/// Messages sent from the host to connected viewers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum SyncMessage {
    InitiativeSync {
        entries: Vec<InitiativeEntry>,
        current_index: Option<usize>,
        round: u32,
    },
    TokenPositions {
        map_id: MapId,
        tokens: Vec<TokenPosition>,
    },
    ConditionSync {
        conditions: Vec<ConditionStatus>,
    },
    TokenPlaced {
        map_id: MapId,
        token: Token,
    },
    TokenUpdated {
        map_id: MapId,
        token: Token,
    },
    TokenRemoved {
        map_id: MapId,
        token_id: TokenId,
    },
    MapSwitched {
        map_id: MapId,
        name: String,
    },
    FogUpdated {
        map_id: MapId,
        revealed: Vec<GridCell>,
    },
    EnvironmentChanged {
        environment: Environment,
    },
    TimeUpdated {
        time: GameTime,
        display: String,
    },
    LightSourcesUpdated {
        sources: Vec<ActiveLightSource>,
    },
    ShopUpdated {
        shop: Shop,
    },
    SidebarUpdated {
        entries: Vec<SidebarEntry>,
    },
    TimerStarted {
        timer: SessionTimer,
    },
    TimerStopped,
    Chat {
        entry: ChatEntry,
    },
    HiddenRoll {
        outcome: RollOutcome,
        reason: Option<String>,
    },
    ApprovalRequired {
        batch_id: ApprovalBatchId,
        summary: Vec<String>,
    },
}

/// A sync message addressed to part of the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub audience: Audience,
    pub message: SyncMessage,
}

impl OutboundMessage {
    pub fn everyone(message: SyncMessage) -> Self {
        Self {
            audience: Audience::Everyone,
            message,
        }
    }

    pub fn dm_only(message: SyncMessage) -> Self {
        Self {
            audience: Audience::DmOnly,
            message,
        }
    }

    pub fn players(message: SyncMessage) -> Self {
        Self {
            audience: Audience::Players,
            message,
        }
    }

    pub fn player(name: impl Into<String>, message: SyncMessage) -> Self {
        Self {
            audience: Audience::Player(name.into()),
            message,
        }
    }

    /// Audience for something about a token: hidden tokens stay with the DM
    pub fn about_token(token: &Token, message: SyncMessage) -> Self {
        if token.visible {
            Self::everyone(message)
        } else {
            Self::dm_only(message)
        }
    }
}
