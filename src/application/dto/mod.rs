//! Data Transfer Objects - For API boundaries
//!
//! DTOs live in the application layer so infrastructure (HTTP/WebSocket) can
//! serialize them without knowing how the executor produced them.

mod execution_report;
mod snapshot;
mod sync_message;

pub use execution_report::{ExecutionReport, FailedAction};
pub use snapshot::{condition_statuses, initiative_view, InitiativeView, SessionSnapshot};
pub use sync_message::{ConditionStatus, OutboundMessage, SyncMessage, TokenPosition};
