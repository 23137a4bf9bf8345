//! Broadcast port - delivery of sync messages to connected viewers
//!
//! Delivery is fire-and-forget: there is no acknowledgement or retry, and a
//! lost message is repaired by the next full resync.

use crate::application::dto::OutboundMessage;

/// Port for sending messages to the participants of one session
pub trait BroadcastPort: Send + Sync {
    /// Deliver a message to its audience; returns how many participants it reached
    fn deliver(&self, message: &OutboundMessage) -> usize;
}
