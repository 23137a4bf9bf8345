//! Token entity - a placed combatant or object on a map

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::TokenId;

/// Creature size category, which determines the token footprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CreatureSize {
    Tiny,
    Small,
    #[default]
    Medium,
    Large,
    Huge,
    Gargantuan,
}

impl CreatureSize {
    /// Footprint edge length in grid cells
    pub fn footprint(&self) -> u32 {
        match self {
            Self::Tiny | Self::Small | Self::Medium => 1,
            Self::Large => 2,
            Self::Huge => 3,
            Self::Gargantuan => 4,
        }
    }
}

/// Movement speeds in feet per round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementSpeeds {
    pub walk: u32,
    #[serde(default)]
    pub fly: u32,
    #[serde(default)]
    pub swim: u32,
    #[serde(default)]
    pub climb: u32,
    #[serde(default)]
    pub burrow: u32,
}

impl Default for MovementSpeeds {
    fn default() -> Self {
        Self::walking(30)
    }
}

impl MovementSpeeds {
    pub fn walking(walk: u32) -> Self {
        Self {
            walk,
            fly: 0,
            swim: 0,
            climb: 0,
            burrow: 0,
        }
    }

    /// Fastest available mode; used to seed a turn's movement budget
    pub fn fastest(&self) -> u32 {
        [self.walk, self.fly, self.swim, self.climb, self.burrow]
            .into_iter()
            .max()
            .unwrap_or(0)
    }
}

/// A token placed on a map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: TokenId,
    /// Character or NPC this token stands for, if any
    pub entity_ref: Option<String>,
    pub label: String,
    pub grid_x: i32,
    pub grid_y: i32,
    /// Footprint edge length in cells
    pub size: u32,
    pub hp: Option<i32>,
    pub max_hp: Option<i32>,
    pub armor_class: Option<i32>,
    pub speeds: MovementSpeeds,
    /// Names of status conditions shown on the token
    pub conditions: Vec<String>,
    pub visible: bool,
    /// Creature template this token was created from
    pub creature: Option<String>,
}

impl Token {
    pub fn new(label: impl Into<String>, grid_x: i32, grid_y: i32) -> Self {
        Self {
            id: TokenId::new(),
            entity_ref: None,
            label: label.into(),
            grid_x,
            grid_y,
            size: 1,
            hp: None,
            max_hp: None,
            armor_class: None,
            speeds: MovementSpeeds::default(),
            conditions: Vec::new(),
            visible: true,
            creature: None,
        }
    }

    /// Centre of the footprint in cell coordinates
    pub fn center(&self) -> (f64, f64) {
        let offset = f64::from(self.size.max(1) - 1) / 2.0;
        (f64::from(self.grid_x) + offset, f64::from(self.grid_y) + offset)
    }

    pub fn has_condition(&self, name: &str) -> bool {
        self.conditions.iter().any(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn add_condition(&mut self, name: &str) {
        if !self.has_condition(name) {
            self.conditions.push(name.to_string());
        }
    }

    /// Remove a condition by name; returns whether it was present
    pub fn remove_condition(&mut self, name: &str) -> bool {
        let before = self.conditions.len();
        self.conditions.retain(|c| !c.eq_ignore_ascii_case(name));
        before != self.conditions.len()
    }

    /// Apply damage, clamping hit points at zero. Returns the new HP if tracked.
    pub fn apply_damage(&mut self, amount: i32) -> Option<i32> {
        let hp = self.hp?;
        let new_hp = (hp - amount.max(0)).max(0);
        self.hp = Some(new_hp);
        Some(new_hp)
    }
}
