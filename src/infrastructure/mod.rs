//! Infrastructure layer - External adapters and implementations
//!
//! This layer contains:
//! - Config: Application configuration
//! - Creature catalog: Built-in and file-loaded stat blocks
//! - Session: Game session hosting and message routing
//! - State: Shared application state
//! - HTTP: REST API routes
//! - WebSocket: Real-time communication with DM and player clients

pub mod config;
pub mod creature_catalog;
pub mod http;
pub mod session;
pub mod state;
pub mod websocket;
