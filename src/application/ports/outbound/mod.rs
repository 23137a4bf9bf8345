//! Outbound ports - Interfaces that the application requires from external systems

mod broadcast_port;
mod creature_catalog;

pub use broadcast_port::BroadcastPort;
pub use creature_catalog::CreatureCatalog;
