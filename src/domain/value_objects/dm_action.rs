//! DM actions - the vocabulary accepted by the action executor
//!
//! Actions arrive as loosely-typed JSON records `{ "action": <name>, ...fields }`
//! from the DM's client or an AI planner. They are parsed into this closed sum
//! type at the boundary so handlers can match exhaustively.

use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    AmbientLight, CreatureSize, EntityCategory, GridCell, RechargeAbility, SidebarCategory,
    TravelPace,
};
use crate::domain::value_objects::{AreaShape, Direction, MechanicalEffect};

/// A combatant supplied to `start_initiative` or `add_to_initiative`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiativeEntryInput {
    pub name: String,
    pub roll: i32,
    #[serde(default)]
    pub modifier: i32,
    #[serde(default)]
    pub category: Option<EntityCategory>,
    /// Token this entry stands for when it differs from `name`
    #[serde(default)]
    pub token_label: Option<String>,
    #[serde(default)]
    pub legendary_actions: Option<u32>,
    #[serde(default)]
    pub legendary_resistances: Option<u32>,
    #[serde(default)]
    pub recharge_abilities: Vec<RechargeAbility>,
}

/// An item offered by a shop; price accepts "15 gp", "2 sp" or a copper count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopItemInput {
    pub name: String,
    pub price: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

fn default_cost() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// Every action the executor understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum DmAction {
    // Token lifecycle
    PlaceToken {
        grid_x: i32,
        grid_y: i32,
        label: String,
        size: Option<CreatureSize>,
        hp: Option<i32>,
        max_hp: Option<i32>,
        armor_class: Option<i32>,
        entity_ref: Option<String>,
        visible: Option<bool>,
    },
    /// Place a token from a creature template; degrades to a bare token when
    /// the template is unknown
    PlaceCreature {
        grid_x: i32,
        grid_y: i32,
        creature_name: String,
        label: Option<String>,
        hp: Option<i32>,
        visible: Option<bool>,
    },
    MoveToken {
        label: String,
        grid_x: i32,
        grid_y: i32,
    },
    UpdateToken {
        label: String,
        new_label: Option<String>,
        hp: Option<i32>,
        max_hp: Option<i32>,
        armor_class: Option<i32>,
        size: Option<CreatureSize>,
        visible: Option<bool>,
    },
    RemoveToken {
        label: String,
    },

    // Initiative lifecycle
    StartInitiative {
        entries: Vec<InitiativeEntryInput>,
    },
    AddToInitiative(InitiativeEntryInput),
    RemoveFromInitiative {
        label: String,
    },
    NextTurn,
    EndInitiative,

    // Legendary and recharge resources
    UseLegendaryAction {
        entity_label: String,
        #[serde(default = "default_cost")]
        cost: u32,
    },
    UseLegendaryResistance {
        entity_label: String,
    },
    RechargeRoll {
        entity_label: String,
        ability_name: String,
        recharge_on: u32,
    },
    UseRechargeAbility {
        entity_label: String,
        ability_name: String,
    },

    // Environment
    RevealFog {
        cells: Vec<GridCell>,
        map_name: Option<String>,
    },
    HideFog {
        cells: Vec<GridCell>,
        map_name: Option<String>,
    },
    SetAmbientLight {
        #[serde(alias = "mode", alias = "value")]
        level: AmbientLight,
    },
    SetUnderwaterCombat {
        #[serde(alias = "value")]
        enabled: bool,
    },
    SetTravelPace {
        #[serde(alias = "value")]
        pace: TravelPace,
    },

    // Shop
    OpenShop {
        name: String,
        #[serde(default)]
        items: Vec<ShopItemInput>,
    },
    CloseShop,
    AddShopItem(ShopItemInput),
    RemoveShopItem {
        name: String,
    },

    // Maps and DM reference lists
    SwitchMap {
        map_name: String,
    },
    AddSidebarEntry {
        category: SidebarCategory,
        name: String,
        description: Option<String>,
    },
    RemoveSidebarEntry {
        category: SidebarCategory,
        name: String,
    },

    // Countdown timer
    StartTimer {
        seconds: u32,
        target_name: String,
    },
    StopTimer,

    // Communication
    HiddenDiceRoll {
        formula: String,
        reason: Option<String>,
    },
    WhisperPlayer {
        player_name: String,
        message: String,
    },
    SystemMessage {
        message: String,
    },

    // Conditions
    AddEntityCondition {
        entity_label: String,
        condition: String,
        value: Option<i32>,
        duration_rounds: Option<u32>,
        source: Option<String>,
    },
    RemoveEntityCondition {
        entity_label: String,
        condition: String,
    },

    // Clock, rests and light
    AdvanceTime {
        #[serde(default)]
        seconds: u64,
        #[serde(default)]
        minutes: u64,
        #[serde(default)]
        hours: u64,
        #[serde(default)]
        days: u64,
    },
    SetTime {
        day: Option<u32>,
        hour: u32,
        #[serde(default)]
        minute: u32,
    },
    ShareTime,
    LightSource {
        entity_name: String,
        source_name: String,
        duration_minutes: Option<u32>,
    },
    ExtinguishSource {
        entity_name: String,
        source_name: String,
    },
    ShortRest {
        character_names: Vec<String>,
    },
    LongRest {
        character_names: Vec<String>,
    },

    // Area effects
    ApplyAreaEffect {
        origin_x: i32,
        origin_y: i32,
        /// Radius, edge or line length in feet
        radius_or_length: u32,
        #[serde(default)]
        shape: AreaShape,
        width_ft: Option<u32>,
        direction: Option<Direction>,
        damage_formula: Option<String>,
        damage_type: Option<String>,
        save_type: Option<String>,
        #[serde(rename = "saveDC", alias = "saveDc")]
        save_dc: Option<u32>,
        #[serde(default = "default_true")]
        half_on_save: bool,
        condition: Option<String>,
    },

    // DM-authored effect sources
    AddCustomEffect {
        target_name: String,
        source_name: String,
        effects: Vec<MechanicalEffect>,
    },
    RemoveCustomEffect {
        target_name: String,
        source_name: String,
    },
}

impl DmAction {
    /// Wire names of every action, in declaration order
    pub const NAMES: &'static [&'static str] = &[
        "place_token",
        "place_creature",
        "move_token",
        "update_token",
        "remove_token",
        "start_initiative",
        "add_to_initiative",
        "remove_from_initiative",
        "next_turn",
        "end_initiative",
        "use_legendary_action",
        "use_legendary_resistance",
        "recharge_roll",
        "use_recharge_ability",
        "reveal_fog",
        "hide_fog",
        "set_ambient_light",
        "set_underwater_combat",
        "set_travel_pace",
        "open_shop",
        "close_shop",
        "add_shop_item",
        "remove_shop_item",
        "switch_map",
        "add_sidebar_entry",
        "remove_sidebar_entry",
        "start_timer",
        "stop_timer",
        "hidden_dice_roll",
        "whisper_player",
        "system_message",
        "add_entity_condition",
        "remove_entity_condition",
        "advance_time",
        "set_time",
        "share_time",
        "light_source",
        "extinguish_source",
        "short_rest",
        "long_rest",
        "apply_area_effect",
        "add_custom_effect",
        "remove_custom_effect",
    ];

    pub fn is_known(name: &str) -> bool {
        Self::NAMES.contains(&name)
    }

    /// Get the wire name for this variant
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlaceToken { .. } => "place_token",
            Self::PlaceCreature { .. } => "place_creature",
            Self::MoveToken { .. } => "move_token",
            Self::UpdateToken { .. } => "update_token",
            Self::RemoveToken { .. } => "remove_token",
            Self::StartInitiative { .. } => "start_initiative",
            Self::AddToInitiative(_) => "add_to_initiative",
            Self::RemoveFromInitiative { .. } => "remove_from_initiative",
            Self::NextTurn => "next_turn",
            Self::EndInitiative => "end_initiative",
            Self::UseLegendaryAction { .. } => "use_legendary_action",
            Self::UseLegendaryResistance { .. } => "use_legendary_resistance",
            Self::RechargeRoll { .. } => "recharge_roll",
            Self::UseRechargeAbility { .. } => "use_recharge_ability",
            Self::RevealFog { .. } => "reveal_fog",
            Self::HideFog { .. } => "hide_fog",
            Self::SetAmbientLight { .. } => "set_ambient_light",
            Self::SetUnderwaterCombat { .. } => "set_underwater_combat",
            Self::SetTravelPace { .. } => "set_travel_pace",
            Self::OpenShop { .. } => "open_shop",
            Self::CloseShop => "close_shop",
            Self::AddShopItem(_) => "add_shop_item",
            Self::RemoveShopItem { .. } => "remove_shop_item",
            Self::SwitchMap { .. } => "switch_map",
            Self::AddSidebarEntry { .. } => "add_sidebar_entry",
            Self::RemoveSidebarEntry { .. } => "remove_sidebar_entry",
            Self::StartTimer { .. } => "start_timer",
            Self::StopTimer => "stop_timer",
            Self::HiddenDiceRoll { .. } => "hidden_dice_roll",
            Self::WhisperPlayer { .. } => "whisper_player",
            Self::SystemMessage { .. } => "system_message",
            Self::AddEntityCondition { .. } => "add_entity_condition",
            Self::RemoveEntityCondition { .. } => "remove_entity_condition",
            Self::AdvanceTime { .. } => "advance_time",
            Self::SetTime { .. } => "set_time",
            Self::ShareTime => "share_time",
            Self::LightSource { .. } => "light_source",
            Self::ExtinguishSource { .. } => "extinguish_source",
            Self::ShortRest { .. } => "short_rest",
            Self::LongRest { .. } => "long_rest",
            Self::ApplyAreaEffect { .. } => "apply_area_effect",
            Self::AddCustomEffect { .. } => "add_custom_effect",
            Self::RemoveCustomEffect { .. } => "remove_custom_effect",
        }
    }

    /// One-line summary shown to the DM when a batch awaits approval
    pub fn describe(&self) -> String {
        match self {
            Self::PlaceToken {
                label, grid_x, grid_y, ..
            } => format!("Place token '{}' at ({}, {})", label, grid_x, grid_y),
            Self::PlaceCreature {
                creature_name,
                grid_x,
                grid_y,
                ..
            } => format!("Place a {} at ({}, {})", creature_name, grid_x, grid_y),
            Self::MoveToken {
                label, grid_x, grid_y,
            } => format!("Move '{}' to ({}, {})", label, grid_x, grid_y),
            Self::UpdateToken { label, .. } => format!("Update token '{}'", label),
            Self::RemoveToken { label } => format!("Remove token '{}'", label),
            Self::StartInitiative { entries } => {
                format!("Start initiative with {} combatants", entries.len())
            }
            Self::AddToInitiative(entry) => {
                format!("Add {} to initiative ({})", entry.name, entry.roll + entry.modifier)
            }
            Self::RemoveFromInitiative { label } => format!("Remove {} from initiative", label),
            Self::NextTurn => "Advance to the next turn".to_string(),
            Self::EndInitiative => "End the encounter".to_string(),
            Self::UseLegendaryAction { entity_label, cost } => {
                format!("{} spends {} legendary action(s)", entity_label, cost)
            }
            Self::UseLegendaryResistance { entity_label } => {
                format!("{} uses a legendary resistance", entity_label)
            }
            Self::RechargeRoll {
                entity_label,
                ability_name,
                recharge_on,
            } => format!(
                "Roll recharge {}-6 for {}'s {}",
                recharge_on, entity_label, ability_name
            ),
            Self::UseRechargeAbility {
                entity_label,
                ability_name,
            } => format!("{} uses {}", entity_label, ability_name),
            Self::RevealFog { cells, .. } => format!("Reveal {} fog cells", cells.len()),
            Self::HideFog { cells, .. } => format!("Hide {} fog cells", cells.len()),
            Self::SetAmbientLight { level } => format!("Set ambient light to {:?}", level),
            Self::SetUnderwaterCombat { enabled } => {
                format!("Underwater combat {}", if *enabled { "on" } else { "off" })
            }
            Self::SetTravelPace { pace } => format!("Set travel pace to {:?}", pace),
            Self::OpenShop { name, .. } => format!("Open shop '{}'", name),
            Self::CloseShop => "Close the shop".to_string(),
            Self::AddShopItem(item) => format!("Stock {} x{}", item.name, item.quantity),
            Self::RemoveShopItem { name } => format!("Remove {} from the shop", name),
            Self::SwitchMap { map_name } => format!("Switch to map '{}'", map_name),
            Self::AddSidebarEntry { category, name, .. } => {
                format!("Add '{}' to {:?}", name, category)
            }
            Self::RemoveSidebarEntry { category, name } => {
                format!("Remove '{}' from {:?}", name, category)
            }
            Self::StartTimer {
                seconds,
                target_name,
            } => format!("Start a {}s timer for {}", seconds, target_name),
            Self::StopTimer => "Stop the timer".to_string(),
            Self::HiddenDiceRoll { formula, .. } => format!("Secretly roll {}", formula),
            Self::WhisperPlayer { player_name, .. } => format!("Whisper to {}", player_name),
            Self::SystemMessage { message } => format!("Announce: {}", message),
            Self::AddEntityCondition {
                entity_label,
                condition,
                ..
            } => format!("Apply {} to {}", condition, entity_label),
            Self::RemoveEntityCondition {
                entity_label,
                condition,
            } => format!("Remove {} from {}", condition, entity_label),
            Self::AdvanceTime {
                seconds,
                minutes,
                hours,
                days,
            } => format!(
                "Advance time by {}d {}h {}m {}s",
                days, hours, minutes, seconds
            ),
            Self::SetTime { day, hour, minute } => match day {
                Some(day) => format!("Set time to day {}, {:02}:{:02}", day, hour, minute),
                None => format!("Set time to {:02}:{:02}", hour, minute),
            },
            Self::ShareTime => "Tell the players the time".to_string(),
            Self::LightSource {
                entity_name,
                source_name,
                ..
            } => format!("{} lights a {}", entity_name, source_name),
            Self::ExtinguishSource {
                entity_name,
                source_name,
            } => format!("{} puts out their {}", entity_name, source_name),
            Self::ShortRest { character_names } => {
                format!("Short rest for {}", character_names.join(", "))
            }
            Self::LongRest { character_names } => {
                format!("Long rest for {}", character_names.join(", "))
            }
            Self::ApplyAreaEffect {
                radius_or_length,
                shape,
                origin_x,
                origin_y,
                damage_formula,
                ..
            } => format!(
                "{}ft {} at ({}, {}){}",
                radius_or_length,
                shape.as_str(),
                origin_x,
                origin_y,
                damage_formula
                    .as_deref()
                    .map(|f| format!(" dealing {}", f))
                    .unwrap_or_default()
            ),
            Self::AddCustomEffect {
                target_name,
                source_name,
                ..
            } => format!("Grant '{}' to {}", source_name, target_name),
            Self::RemoveCustomEffect {
                target_name,
                source_name,
            } => format!("Revoke '{}' from {}", source_name, target_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> DmAction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_camel_case_fields() {
        let action = parse(json!({"action": "move_token", "label": "Goblin", "gridX": 3, "gridY": 4}));
        assert_eq!(
            action,
            DmAction::MoveToken {
                label: "Goblin".into(),
                grid_x: 3,
                grid_y: 4
            }
        );
    }

    #[test]
    fn test_legendary_cost_defaults_to_one() {
        let action = parse(json!({"action": "use_legendary_action", "entityLabel": "Dragon"}));
        assert_eq!(
            action,
            DmAction::UseLegendaryAction {
                entity_label: "Dragon".into(),
                cost: 1
            }
        );
    }

    #[test]
    fn test_area_effect_defaults() {
        let action = parse(json!({
            "action": "apply_area_effect",
            "originX": 0,
            "originY": 0,
            "radiusOrLength": 20,
            "saveDC": 15,
            "saveType": "dex",
            "damageFormula": "8d6"
        }));
        match action {
            DmAction::ApplyAreaEffect {
                shape,
                save_dc,
                half_on_save,
                ..
            } => {
                assert_eq!(shape, AreaShape::Sphere);
                assert_eq!(save_dc, Some(15));
                assert!(half_on_save);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_shape_parses_as_other() {
        let action = parse(json!({
            "action": "apply_area_effect",
            "originX": 1, "originY": 1, "radiusOrLength": 10, "shape": "hexagon"
        }));
        assert!(matches!(
            action,
            DmAction::ApplyAreaEffect {
                shape: AreaShape::Other,
                ..
            }
        ));
    }

    #[test]
    fn test_newtype_variants_parse_flat() {
        let action = parse(json!({"action": "add_to_initiative", "name": "Ogre", "roll": 14}));
        match action {
            DmAction::AddToInitiative(entry) => {
                assert_eq!(entry.name, "Ogre");
                assert_eq!(entry.modifier, 0);
            }
            other => panic!("unexpected {:?}", other),
        }

        let action = parse(json!({"action": "add_shop_item", "name": "Rope", "price": "1 gp"}));
        assert_eq!(action.name(), "add_shop_item");
    }

    #[test]
    fn test_unit_variants() {
        assert_eq!(parse(json!({"action": "next_turn"})), DmAction::NextTurn);
        assert_eq!(parse(json!({"action": "share_time"})), DmAction::ShareTime);
    }

    #[test]
    fn test_names_cover_parsed_actions() {
        for value in [
            json!({"action": "next_turn"}),
            json!({"action": "close_shop"}),
            json!({"action": "system_message", "message": "hi"}),
            json!({"action": "long_rest", "characterNames": ["Aria"]}),
        ] {
            let action = parse(value);
            assert!(DmAction::is_known(action.name()));
        }
        assert!(!DmAction::is_known("levitate_building"));
    }

    #[test]
    fn test_describe() {
        let action = parse(json!({"action": "place_creature", "creatureName": "Goblin", "gridX": 1, "gridY": 2}));
        assert_eq!(action.describe(), "Place a Goblin at (1, 2)");
    }
}
