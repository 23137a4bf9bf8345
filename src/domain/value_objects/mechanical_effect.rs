//! Mechanical effects produced by items, feats, fighting styles and DM rulings

use serde::{Deserialize, Serialize};

/// The six ability scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    #[serde(alias = "str")]
    Strength,
    #[serde(alias = "dex")]
    Dexterity,
    #[serde(alias = "con")]
    Constitution,
    #[serde(alias = "int")]
    Intelligence,
    #[serde(alias = "wis")]
    Wisdom,
    #[serde(alias = "cha")]
    Charisma,
}

/// What a single effect does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectKind {
    AcBonus { value: i32 },
    AttackBonus { value: i32 },
    DamageBonus { value: i32 },
    SpellDcBonus { value: i32 },
    SpellAttackBonus { value: i32 },
    /// Bonus to every saving throw
    SaveBonus { value: i32 },
    InitiativeBonus { value: i32 },
    SpeedBonus { value: i32 },
    HpBonus { value: i32 },
    /// Multiplied by character level at resolve time
    HpPerLevel { value: i32 },
    DamageReduction { value: i32 },
    AbilityBonus { ability: Ability, value: i32 },
    /// Sets the score to at least `value` (e.g. Gauntlets of Ogre Power)
    AbilitySet { ability: Ability, value: i32 },
    Resistance { damage_type: String },
    Immunity { damage_type: String },
    Vulnerability { damage_type: String },
    AdvantageOn { check: String },
    CritPrevention,
    OnHitEffect { description: String },
    OnCritEffect { description: String },
    ExtraDamageDice { dice: String, damage_type: Option<String> },
}

impl EffectKind {
    /// Kinds evaluated per attack instead of folded into passive totals
    pub fn is_contextual(&self) -> bool {
        matches!(
            self,
            Self::AttackBonus { .. }
                | Self::DamageBonus { .. }
                | Self::OnHitEffect { .. }
                | Self::OnCritEffect { .. }
                | Self::ExtraDamageDice { .. }
        )
    }
}

/// Which uses an effect applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EffectScope {
    #[default]
    All,
    /// Any weapon attack (not spells)
    Weapon,
    Melee,
    Ranged,
    Spell,
    Thrown,
    Crossbow,
    /// Melee attacks with a heavy weapon
    HeavyMelee,
    /// Ranged spell attacks
    RangedSpell,
}

/// Requirement that must hold for an effect to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EffectCondition {
    #[default]
    Always,
    Equipped,
    Attuned,
    WearingArmor,
    NotWearingArmor,
    WieldingShield,
    /// Only when explicitly activated; never part of passive resolution
    OnUse,
}

/// One typed effect with its scope and activation condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MechanicalEffect {
    #[serde(flatten)]
    pub kind: EffectKind,
    #[serde(default)]
    pub scope: EffectScope,
    #[serde(default)]
    pub condition: EffectCondition,
}

impl MechanicalEffect {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            scope: EffectScope::All,
            condition: EffectCondition::Always,
        }
    }

    pub fn scoped(mut self, scope: EffectScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn when(mut self, condition: EffectCondition) -> Self {
        self.condition = condition;
        self
    }
}

/// Where a group of effects comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectOrigin {
    MagicItem,
    Feat,
    FightingStyle,
    Custom,
}

/// A named origin with the effects it grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectSource {
    pub name: String,
    pub origin: EffectOrigin,
    pub effects: Vec<MechanicalEffect>,
}

impl EffectSource {
    pub fn new(
        name: impl Into<String>,
        origin: EffectOrigin,
        effects: Vec<MechanicalEffect>,
    ) -> Self {
        Self {
            name: name.into(),
            origin,
            effects,
        }
    }
}

/// An effect source authored by the DM for one character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEffect {
    pub target_name: String,
    pub source_name: String,
    pub effects: Vec<MechanicalEffect>,
}

impl CustomEffect {
    pub fn targets(&self, character_name: &str) -> bool {
        self.target_name.eq_ignore_ascii_case(character_name)
    }
}
