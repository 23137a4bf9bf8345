//! Application services - Use case implementations
//!
//! The action executor applies DM action batches to a session's state, the
//! approval service decides queued batches, and the sync broadcaster turns the
//! resulting state into outbound messages.

pub mod action_executor;
pub mod approval_service;
pub mod sync_broadcaster;

pub use action_executor::{ActionError, DmActionExecutor, MAX_BATCH_SIZE};
pub use approval_service::{ApprovalDecision, ApprovalError, ApprovalOutcome, ApprovalService};
