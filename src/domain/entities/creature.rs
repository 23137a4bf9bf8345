//! Creature templates - stat blocks that `place_creature` stamps onto tokens

use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    CreatureSize, EntityCategory, InitiativeEntry, LegendaryActions, LegendaryResistances,
    MovementSpeeds, RechargeAbility, Token,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatureTemplate {
    pub name: String,
    #[serde(default)]
    pub size: CreatureSize,
    pub hp: i32,
    pub armor_class: i32,
    #[serde(default)]
    pub speeds: MovementSpeeds,
    #[serde(default)]
    pub initiative_modifier: i32,
    #[serde(default)]
    pub category: EntityCategory,
    #[serde(default)]
    pub legendary_actions: Option<u32>,
    #[serde(default)]
    pub legendary_resistances: Option<u32>,
    #[serde(default)]
    pub recharge_abilities: Vec<RechargeAbility>,
}

impl CreatureTemplate {
    pub fn new(name: impl Into<String>, size: CreatureSize, hp: i32, armor_class: i32) -> Self {
        Self {
            name: name.into(),
            size,
            hp,
            armor_class,
            speeds: MovementSpeeds::default(),
            initiative_modifier: 0,
            category: EntityCategory::Enemy,
            legendary_actions: None,
            legendary_resistances: None,
            recharge_abilities: Vec::new(),
        }
    }

    pub fn with_speeds(mut self, speeds: MovementSpeeds) -> Self {
        self.speeds = speeds;
        self
    }

    pub fn with_initiative(mut self, modifier: i32) -> Self {
        self.initiative_modifier = modifier;
        self
    }

    pub fn with_legendary(mut self, actions: u32, resistances: u32) -> Self {
        self.legendary_actions = Some(actions);
        self.legendary_resistances = Some(resistances);
        self
    }

    pub fn with_recharge(mut self, name: impl Into<String>, recharge_on: u32) -> Self {
        self.recharge_abilities
            .push(RechargeAbility::new(name, recharge_on));
        self
    }

    /// Copy combat statistics onto a token
    pub fn stamp(&self, token: &mut Token) {
        token.size = self.size.footprint();
        token.hp = Some(self.hp);
        token.max_hp = Some(self.hp);
        token.armor_class = Some(self.armor_class);
        token.speeds = self.speeds;
        token.creature = Some(self.name.clone());
    }

    /// Copy legendary pools and recharge abilities onto an initiative entry
    pub fn equip_entry(&self, entry: &mut InitiativeEntry) {
        if entry.legendary_actions.is_none() {
            entry.legendary_actions = self.legendary_actions.map(LegendaryActions::new);
        }
        if entry.legendary_resistances.is_none() {
            entry.legendary_resistances = self.legendary_resistances.map(LegendaryResistances::new);
        }
        if entry.recharge_abilities.is_empty() {
            entry.recharge_abilities = self.recharge_abilities.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_copies_stats_and_footprint() {
        let ogre = CreatureTemplate::new("Ogre", CreatureSize::Large, 59, 11);
        let mut token = Token::new("Ogre 1", 4, 4);
        ogre.stamp(&mut token);
        assert_eq!(token.size, 2);
        assert_eq!(token.hp, Some(59));
        assert_eq!(token.max_hp, Some(59));
        assert_eq!(token.armor_class, Some(11));
        assert_eq!(token.creature.as_deref(), Some("Ogre"));
    }

    #[test]
    fn test_equip_entry_keeps_caller_pools() {
        let dragon = CreatureTemplate::new("Adult Red Dragon", CreatureSize::Huge, 256, 19)
            .with_legendary(3, 3)
            .with_recharge("Fire Breath", 5);
        let mut entry = InitiativeEntry::new("Dragon", EntityCategory::Enemy, 15, 0);
        entry.legendary_actions = Some(LegendaryActions::new(2));
        dragon.equip_entry(&mut entry);

        assert_eq!(entry.legendary_actions.map(|l| l.max), Some(2));
        assert_eq!(entry.legendary_resistances.map(|l| l.remaining), Some(3));
        assert_eq!(entry.recharge_abilities.len(), 1);
    }
}
