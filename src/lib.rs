//! WrldBldr Combat - Host-authoritative tabletop combat engine
//!
//! The host owns each session's state: maps and tokens, initiative, conditions,
//! the clock and the approval queue. DM clients and AI planners submit batches
//! of actions, the executor applies them one by one, and the resulting sync
//! messages fan out to connected viewers over WebSocket.

pub mod application;
pub mod domain;
pub mod infrastructure;
