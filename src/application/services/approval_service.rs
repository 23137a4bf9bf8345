//! Approval Service - DM approval workflow for queued action batches
//!
//! When a session requires approval, the executor queues each submitted batch
//! instead of running it. The DM can then:
//! - Approve the batch, which runs it exactly as submitted
//! - Reject it with an optional reason, which discards it
//!
//! Only the DM may decide. Nothing in a batch touches the session state until
//! it is approved.

use tracing::info;

use crate::application::dto::{ExecutionReport, OutboundMessage, SyncMessage};
use crate::application::services::action_executor::DmActionExecutor;
use crate::domain::aggregates::{PendingActionBatch, SessionState};
use crate::domain::entities::{Audience, ChatEntry};
use crate::domain::value_objects::ApprovalBatchId;

/// Errors that can occur during approval processing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApprovalError {
    #[error("Approval batch not found: {0}")]
    NotFound(ApprovalBatchId),

    #[error("Only the DM may approve or reject action batches")]
    NotAuthorized,
}

/// DM's decision on a queued batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Run the batch as submitted
    Approve,
    /// Discard the batch
    Reject { reason: Option<String> },
}

/// Result of processing an approval decision
#[derive(Debug, Clone)]
pub enum ApprovalOutcome {
    Executed(ExecutionReport),
    Rejected {
        batch_id: ApprovalBatchId,
        /// DM notice to deliver
        messages: Vec<OutboundMessage>,
    },
}

/// Service for handling the DM approval workflow
#[derive(Debug, Default, Clone, Copy)]
pub struct ApprovalService;

impl ApprovalService {
    pub fn new() -> Self {
        Self
    }

    /// Batches waiting for a decision, oldest first
    pub fn pending<'a>(&self, state: &'a SessionState) -> &'a [PendingActionBatch] {
        &state.pending_batches
    }

    /// Process a DM decision on a queued batch
    pub fn process_decision(
        &self,
        executor: &mut DmActionExecutor,
        state: &mut SessionState,
        caller_is_dm: bool,
        batch_id: ApprovalBatchId,
        decision: ApprovalDecision,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        if !caller_is_dm {
            return Err(ApprovalError::NotAuthorized);
        }

        match decision {
            ApprovalDecision::Approve => self
                .approve(executor, state, batch_id)
                .map(ApprovalOutcome::Executed),
            ApprovalDecision::Reject { reason } => {
                let messages = self.reject(state, batch_id, reason.as_deref())?;
                Ok(ApprovalOutcome::Rejected { batch_id, messages })
            }
        }
    }

    /// Remove the batch and execute it with the approval gate bypassed
    pub fn approve(
        &self,
        executor: &mut DmActionExecutor,
        state: &mut SessionState,
        batch_id: ApprovalBatchId,
    ) -> Result<ExecutionReport, ApprovalError> {
        let batch = state
            .take_pending_batch(batch_id)
            .ok_or(ApprovalError::NotFound(batch_id))?;

        info!(
            batch_id = %batch_id,
            actions = batch.actions.len(),
            "DM approved action batch"
        );
        Ok(executor.execute_dm_actions(state, batch.actions, true))
    }

    /// Remove the batch without running it and notify the DM
    pub fn reject(
        &self,
        state: &mut SessionState,
        batch_id: ApprovalBatchId,
        reason: Option<&str>,
    ) -> Result<Vec<OutboundMessage>, ApprovalError> {
        let batch = state
            .take_pending_batch(batch_id)
            .ok_or(ApprovalError::NotFound(batch_id))?;

        info!(
            batch_id = %batch_id,
            actions = batch.actions.len(),
            reason = reason.unwrap_or(""),
            "DM rejected action batch"
        );

        let text = match reason.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reason) => format!(
                "Rejected {} queued action(s): {}",
                batch.actions.len(),
                reason
            ),
            None => format!("Rejected {} queued action(s).", batch.actions.len()),
        };
        let entry = ChatEntry::system(text).to(Audience::DmOnly);
        state.push_chat(entry.clone());
        Ok(vec![OutboundMessage::dm_only(SyncMessage::Chat { entry })])
    }
}
