//! WebSocket wire messages
//!
//! Both directions are JSON objects tagged with `type`.

use serde::{Deserialize, Serialize};

use crate::application::dto::{ExecutionReport, FailedAction, SessionSnapshot, SyncMessage};
use crate::domain::value_objects::{ApprovalBatchId, DmAction};

/// Participant role in the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantRole {
    DungeonMaster,
    Player,
}

/// Messages from client to host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Join a session; a DM without a session id opens a new one
    JoinSession {
        user_id: String,
        role: ParticipantRole,
        #[serde(default)]
        session_id: Option<String>,
        /// Character the player controls
        #[serde(default)]
        character_name: Option<String>,
    },
    /// DM submits a batch of raw actions
    SubmitDmActions { actions: Vec<serde_json::Value> },
    ApproveActionBatch { batch_id: String },
    RejectActionBatch {
        batch_id: String,
        #[serde(default)]
        reason: Option<String>,
    },
    SetApprovalRequired { enabled: bool },
    /// Player drags their own token
    PlayerMoveToken { label: String, grid_x: i32, grid_y: i32 },
    RequestSnapshot,
    Heartbeat,
}

/// Messages from host to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    SessionJoined {
        session_id: String,
        role: ParticipantRole,
        snapshot: Box<SessionSnapshot>,
    },
    /// Another participant joined (sent to everyone else)
    ParticipantJoined {
        user_id: String,
        role: ParticipantRole,
        character_name: Option<String>,
    },
    ParticipantLeft { user_id: String },
    /// Incremental state update
    Sync { message: SyncMessage },
    /// Full state, on request
    Snapshot { snapshot: Box<SessionSnapshot> },
    /// Outcome of a DM batch (DM only)
    ActionResults {
        executed: Vec<DmAction>,
        failed: Vec<FailedAction>,
        truncated: usize,
        queued_batch_id: Option<ApprovalBatchId>,
    },
    Error { code: String, message: String },
    Pong,
}

impl ServerMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl From<&ExecutionReport> for ServerMessage {
    fn from(report: &ExecutionReport) -> Self {
        Self::ActionResults {
            executed: report.executed.clone(),
            failed: report.failed.clone(),
            truncated: report.truncated,
            queued_batch_id: report.queued_batch_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_client_messages_parse() {
        let join: ClientMessage = serde_json::from_value(json!({
            "type": "JoinSession",
            "user_id": "sam",
            "role": "Player",
            "character_name": "Aria"
        }))
        .unwrap();
        assert!(matches!(
            join,
            ClientMessage::JoinSession { session_id: None, character_name: Some(_), .. }
        ));

        let submit: ClientMessage = serde_json::from_value(json!({
            "type": "SubmitDmActions",
            "actions": [{"action": "next_turn"}]
        }))
        .unwrap();
        assert!(matches!(submit, ClientMessage::SubmitDmActions { actions } if actions.len() == 1));

        let reject: ClientMessage = serde_json::from_value(json!({
            "type": "RejectActionBatch",
            "batch_id": ApprovalBatchId::new().to_string()
        }))
        .unwrap();
        assert!(matches!(reject, ClientMessage::RejectActionBatch { reason: None, .. }));
    }

    #[test]
    fn test_sync_is_nested_under_message() {
        let value = serde_json::to_value(ServerMessage::Sync {
            message: SyncMessage::TimerStopped,
        })
        .unwrap();
        assert_eq!(value["type"], "Sync");
        assert_eq!(value["message"]["type"], "timer_stopped");
    }

    #[test]
    fn test_action_results_from_report() {
        let report = ExecutionReport {
            truncated: 3,
            ..ExecutionReport::default()
        };
        let value = serde_json::to_value(ServerMessage::from(&report)).unwrap();
        assert_eq!(value["type"], "ActionResults");
        assert_eq!(value["truncated"], 3);
        assert_eq!(value["queued_batch_id"], serde_json::Value::Null);
    }
}
