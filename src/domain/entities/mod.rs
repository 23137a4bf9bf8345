//! Domain entities - Session objects with identity

mod character;
mod condition;
mod creature;
mod environment;
mod initiative;
mod map;
mod session_log;
mod shop;
mod token;

pub use character::{ArmorCategory, Character, MagicItem, Player};
pub use condition::{Condition, ConditionDuration};
pub use creature::CreatureTemplate;
pub use environment::{
    known_duration_minutes, ActiveLightSource, AmbientLight, Environment, TravelPace,
};
pub use initiative::{
    EntityCategory, InitiativeEntry, InitiativeTracker, LegendaryActions, LegendaryResistances,
    RechargeAbility, RechargeResult, TurnAdvance, TurnResources,
};
pub use map::{GameMap, GridCell};
pub use session_log::{Audience, ChatEntry, SessionTimer, SidebarCategory, SidebarEntry};
pub use shop::{parse_price, Shop, ShopItem};
pub use token::{CreatureSize, MovementSpeeds, Token};
