//! Character entity - a player character sheet as seen by combat math

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{CharacterId, MechanicalEffect};

/// Armor category worn, used by armor-conditioned effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmorCategory {
    Light,
    Medium,
    Heavy,
}

/// A magic item carried by a character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagicItem {
    pub name: String,
    #[serde(default)]
    pub equipped: bool,
    #[serde(default)]
    pub attuned: bool,
    #[serde(default)]
    pub requires_attunement: bool,
    #[serde(default)]
    pub effects: Vec<MechanicalEffect>,
}

impl MagicItem {
    pub fn new(name: impl Into<String>, effects: Vec<MechanicalEffect>) -> Self {
        Self {
            name: name.into(),
            equipped: true,
            attuned: false,
            requires_attunement: false,
            effects,
        }
    }

    pub fn requiring_attunement(mut self, attuned: bool) -> Self {
        self.requires_attunement = true;
        self.attuned = attuned;
        self
    }

    /// Items only contribute while worn, and attunement items only once attuned
    pub fn is_active(&self) -> bool {
        if self.requires_attunement {
            self.attuned
        } else {
            self.equipped
        }
    }
}

/// A player character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    #[serde(default)]
    pub id: CharacterId,
    pub name: String,
    #[serde(default = "default_level")]
    pub level: u32,
    /// Display name of the controlling player
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub armor: Option<ArmorCategory>,
    #[serde(default)]
    pub shield: bool,
    #[serde(default)]
    pub items: Vec<MagicItem>,
    #[serde(default)]
    pub feats: Vec<String>,
    #[serde(default)]
    pub fighting_style: Option<String>,
    #[serde(default)]
    pub walk_speed: Option<u32>,
}

fn default_level() -> u32 {
    1
}

impl Character {
    pub fn new(name: impl Into<String>, level: u32) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            level,
            player_name: None,
            armor: None,
            shield: false,
            items: Vec::new(),
            feats: Vec::new(),
            fighting_style: None,
            walk_speed: None,
        }
    }

    pub fn with_armor(mut self, armor: ArmorCategory) -> Self {
        self.armor = Some(armor);
        self
    }

    pub fn with_item(mut self, item: MagicItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_feat(mut self, feat: impl Into<String>) -> Self {
        self.feats.push(feat.into());
        self
    }

    pub fn with_fighting_style(mut self, style: impl Into<String>) -> Self {
        self.fighting_style = Some(style.into());
        self
    }

    pub fn is_wearing_armor(&self) -> bool {
        self.armor.is_some()
    }
}

/// A connected human player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: String,
    pub character_name: Option<String>,
}

impl Player {
    /// Whether a label names this player or their character
    pub fn answers_to(&self, label: &str) -> bool {
        self.name.eq_ignore_ascii_case(label)
            || self
                .character_name
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(label))
    }
}
