//! Domain services - Pure rules logic over domain entities

mod effect_catalog;
mod effect_resolution;

pub use effect_catalog::{feat_effects, fighting_style_effects};
pub use effect_resolution::{
    collect_sources, resolve_effects, ContextualEffect, ExtraDamage, ResolvedEffects,
    WeaponContext,
};
