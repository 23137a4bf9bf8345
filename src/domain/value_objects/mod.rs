//! Value objects - Immutable objects defined by their attributes

mod dice;
mod dm_action;
mod game_time;
mod geometry;
mod ids;
mod mechanical_effect;

#[cfg(test)]
pub use dice::ScriptedRoller;
pub use dice::{
    parse_formula, DiceError, DiceFormula, DiceRoller, DiceTerm, RandomRoller, RollOutcome,
};
pub use dm_action::{DmAction, InitiativeEntryInput, ShopItemInput};
pub use game_time::{
    describe_duration, GameTime, SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE,
};
pub use geometry::{
    feet_to_cells, find_tokens_in_area, AreaShape, AreaTemplate, Direction, FEET_PER_CELL,
};
pub use ids::*;
pub use mechanical_effect::{
    Ability, CustomEffect, EffectCondition, EffectKind, EffectOrigin, EffectScope, EffectSource,
    MechanicalEffect,
};
