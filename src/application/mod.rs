//! Application layer - Use cases over the authoritative session state
//!
//! This layer contains:
//! - Services: the DM action executor, approval handling, sync broadcasting
//! - Ports: interfaces the application requires from infrastructure
//! - DTOs: sync messages, execution reports and snapshots

pub mod dto;
pub mod ports;
pub mod services;
