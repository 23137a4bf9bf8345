//! Aggregates - Cluster of domain objects treated as a single unit

pub mod session_state;

pub use session_state::{PendingActionBatch, SessionSettings, SessionState, DEFAULT_CHAT_HISTORY};
