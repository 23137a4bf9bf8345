//! Execution report - what happened to a submitted batch of DM actions

use serde::{Deserialize, Serialize};

use crate::application::dto::OutboundMessage;
use crate::domain::value_objects::{ApprovalBatchId, DmAction};

/// An action that could not be applied, with the raw payload as submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedAction {
    pub action: serde_json::Value,
    pub reason: String,
}

/// Result of `execute_dm_actions`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub executed: Vec<DmAction>,
    pub failed: Vec<FailedAction>,
    /// Actions dropped from the tail of an oversized batch
    pub truncated: usize,
    /// Set when the whole batch was held for DM approval
    pub queued_batch_id: Option<ApprovalBatchId>,
    /// Sync messages produced while executing; delivered by the session host
    #[serde(skip)]
    pub messages: Vec<OutboundMessage>,
}

impl ExecutionReport {
    pub fn queued(batch_id: ApprovalBatchId, messages: Vec<OutboundMessage>) -> Self {
        Self {
            queued_batch_id: Some(batch_id),
            messages,
            ..Self::default()
        }
    }

    /// Human-readable failure lines for narrating back to the DM
    pub fn failure_lines(&self) -> Vec<String> {
        self.failed
            .iter()
            .map(|f| {
                let tag = f
                    .action
                    .get("action")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("?");
                format!("{}: {}", tag, f.reason)
            })
            .collect()
    }

    pub fn take_messages(&mut self) -> Vec<OutboundMessage> {
        std::mem::take(&mut self.messages)
    }
}
