//! Domain layer - Core rules logic with no transport or runtime dependencies
//!
//! This layer contains:
//! - Entities: tokens, maps, initiative, conditions, characters, creatures
//! - Value Objects: ids, dice, area geometry, mechanical effects, DM actions
//! - Aggregates: the per-session authoritative state
//! - Domain Services: effect resolution

pub mod aggregates;
pub mod entities;
pub mod services;
pub mod value_objects;
