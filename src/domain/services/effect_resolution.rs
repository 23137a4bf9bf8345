//! Effect resolution - folds every modifier a character carries into one bundle
//!
//! Sources are collected fresh on each call: active magic items, feats, the
//! chosen fighting style and any DM-authored custom effects aimed at the
//! character. Passive effects stack additively into scalar totals. Attack and
//! damage riders are kept aside and evaluated per weapon or spell use.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::entities::{Character, MagicItem};
use crate::domain::services::effect_catalog::{feat_effects, fighting_style_effects};
use crate::domain::value_objects::{
    Ability, CustomEffect, EffectCondition, EffectKind, EffectOrigin, EffectScope, EffectSource,
    MechanicalEffect,
};

/// What kind of attack a contextual effect is being evaluated for
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeaponContext {
    pub is_melee: bool,
    pub is_ranged: bool,
    pub is_heavy: bool,
    pub is_thrown: bool,
    pub is_crossbow: bool,
    pub is_spell: bool,
    pub damage_type: Option<String>,
}

impl WeaponContext {
    pub fn melee() -> Self {
        Self {
            is_melee: true,
            ..Self::default()
        }
    }

    pub fn ranged() -> Self {
        Self {
            is_ranged: true,
            ..Self::default()
        }
    }

    pub fn spell() -> Self {
        Self {
            is_spell: true,
            ..Self::default()
        }
    }
}

fn scope_matches(scope: EffectScope, context: Option<&WeaponContext>) -> bool {
    let Some(ctx) = context else {
        return scope == EffectScope::All;
    };
    match scope {
        EffectScope::All => true,
        EffectScope::Weapon => !ctx.is_spell,
        EffectScope::Melee => ctx.is_melee,
        EffectScope::Ranged => ctx.is_ranged,
        EffectScope::Spell => ctx.is_spell,
        EffectScope::Thrown => ctx.is_thrown,
        EffectScope::Crossbow => ctx.is_crossbow,
        EffectScope::HeavyMelee => ctx.is_melee && ctx.is_heavy,
        EffectScope::RangedSpell => ctx.is_ranged && ctx.is_spell,
    }
}

/// Extra damage dice added on a hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraDamage {
    pub dice: String,
    pub damage_type: Option<String>,
    pub source: String,
}

/// An attack/damage rider kept for per-use evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextualEffect {
    pub source: String,
    pub effect: MechanicalEffect,
}

/// The net mechanical effect of everything a character carries
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEffects {
    pub ac_bonus: i32,
    pub hp_bonus: i32,
    pub speed_bonus: i32,
    pub initiative_bonus: i32,
    pub spell_dc_bonus: i32,
    pub spell_attack_bonus: i32,
    /// Applies to every saving throw
    pub save_bonus: i32,
    pub damage_reduction: i32,
    pub ability_bonuses: BTreeMap<Ability, i32>,
    /// Highest "set score to" override per ability
    pub ability_overrides: BTreeMap<Ability, i32>,
    pub resistances: BTreeSet<String>,
    pub immunities: BTreeSet<String>,
    pub vulnerabilities: BTreeSet<String>,
    pub advantage_on: BTreeSet<String>,
    pub crit_prevention: bool,
    /// Names of sources that contributed at least one admitted effect
    pub sources: Vec<String>,
    pub contextual: Vec<ContextualEffect>,
}

impl ResolvedEffects {
    fn matching<'a>(
        &'a self,
        context: Option<&'a WeaponContext>,
    ) -> impl Iterator<Item = &'a ContextualEffect> + 'a {
        self.contextual
            .iter()
            .filter(move |c| scope_matches(c.effect.scope, context))
    }

    /// Total attack bonus for a use; `None` counts only unscoped effects
    pub fn attack_bonus(&self, context: Option<&WeaponContext>) -> i32 {
        self.matching(context)
            .filter_map(|c| match c.effect.kind {
                EffectKind::AttackBonus { value } => Some(value),
                _ => None,
            })
            .fold(0, i32::saturating_add)
    }

    /// Total flat damage bonus for a use; `None` counts only unscoped effects
    pub fn damage_bonus(&self, context: Option<&WeaponContext>) -> i32 {
        self.matching(context)
            .filter_map(|c| match c.effect.kind {
                EffectKind::DamageBonus { value } => Some(value),
                _ => None,
            })
            .fold(0, i32::saturating_add)
    }

    pub fn on_hit_effects(&self, context: Option<&WeaponContext>) -> Vec<String> {
        self.matching(context)
            .filter_map(|c| match &c.effect.kind {
                EffectKind::OnHitEffect { description } => Some(description.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn on_crit_effects(&self, context: Option<&WeaponContext>) -> Vec<String> {
        self.matching(context)
            .filter_map(|c| match &c.effect.kind {
                EffectKind::OnCritEffect { description } => Some(description.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn extra_damage_dice(&self, context: Option<&WeaponContext>) -> Vec<ExtraDamage> {
        self.matching(context)
            .filter_map(|c| match &c.effect.kind {
                EffectKind::ExtraDamageDice { dice, damage_type } => Some(ExtraDamage {
                    dice: dice.clone(),
                    damage_type: damage_type.clone(),
                    source: c.source.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    fn admit(&mut self, source: &str, effect: &MechanicalEffect, level: u32) {
        if effect.kind.is_contextual() {
            self.contextual.push(ContextualEffect {
                source: source.to_string(),
                effect: effect.clone(),
            });
            return;
        }

        match &effect.kind {
            EffectKind::AcBonus { value } => add(&mut self.ac_bonus, *value),
            EffectKind::HpBonus { value } => add(&mut self.hp_bonus, *value),
            EffectKind::HpPerLevel { value } => {
                let level = i32::try_from(level).unwrap_or(i32::MAX);
                add(&mut self.hp_bonus, value.saturating_mul(level))
            }
            EffectKind::SpeedBonus { value } => add(&mut self.speed_bonus, *value),
            EffectKind::InitiativeBonus { value } => add(&mut self.initiative_bonus, *value),
            EffectKind::SpellDcBonus { value } => add(&mut self.spell_dc_bonus, *value),
            EffectKind::SpellAttackBonus { value } => add(&mut self.spell_attack_bonus, *value),
            EffectKind::SaveBonus { value } => add(&mut self.save_bonus, *value),
            EffectKind::DamageReduction { value } => add(&mut self.damage_reduction, *value),
            EffectKind::AbilityBonus { ability, value } => {
                add(self.ability_bonuses.entry(*ability).or_insert(0), *value)
            }
            EffectKind::AbilitySet { ability, value } => {
                let current = self.ability_overrides.entry(*ability).or_insert(*value);
                *current = (*current).max(*value);
            }
            EffectKind::Resistance { damage_type } => {
                self.resistances.insert(damage_type.to_lowercase());
            }
            EffectKind::Immunity { damage_type } => {
                self.immunities.insert(damage_type.to_lowercase());
            }
            EffectKind::Vulnerability { damage_type } => {
                self.vulnerabilities.insert(damage_type.to_lowercase());
            }
            EffectKind::AdvantageOn { check } => {
                self.advantage_on.insert(check.to_lowercase());
            }
            EffectKind::CritPrevention => self.crit_prevention = true,
            EffectKind::AttackBonus { .. }
            | EffectKind::DamageBonus { .. }
            | EffectKind::OnHitEffect { .. }
            | EffectKind::OnCritEffect { .. }
            | EffectKind::ExtraDamageDice { .. } => {}
        }
    }
}

fn add(total: &mut i32, value: i32) {
    *total = total.saturating_add(value);
}

/// Whether an effect's activation condition holds for this character
fn condition_met(
    condition: EffectCondition,
    character: &Character,
    item: Option<&MagicItem>,
) -> bool {
    match condition {
        EffectCondition::Always => true,
        EffectCondition::Equipped => item.map_or(true, |i| i.equipped),
        EffectCondition::Attuned => item.map_or(true, |i| i.attuned),
        EffectCondition::WearingArmor => character.is_wearing_armor(),
        EffectCondition::NotWearingArmor => !character.is_wearing_armor(),
        EffectCondition::WieldingShield => character.shield,
        EffectCondition::OnUse => false,
    }
}

/// Every effect source that currently applies to the character
pub fn collect_sources<'a>(
    character: &'a Character,
    custom_effects: &'a [CustomEffect],
) -> Vec<(EffectSource, Option<&'a MagicItem>)> {
    let mut sources = Vec::new();

    for item in character.items.iter().filter(|i| i.is_active()) {
        sources.push((
            EffectSource::new(&item.name, EffectOrigin::MagicItem, item.effects.clone()),
            Some(item),
        ));
    }
    sources.extend(
        character
            .feats
            .iter()
            .filter_map(|feat| feat_effects(feat))
            .map(|source| (source, None)),
    );
    if let Some(style) = character
        .fighting_style
        .as_deref()
        .and_then(fighting_style_effects)
    {
        sources.push((style, None));
    }
    sources.extend(
        custom_effects
            .iter()
            .filter(|custom| custom.targets(&character.name))
            .map(|custom| {
                (
                    EffectSource::new(
                        &custom.source_name,
                        EffectOrigin::Custom,
                        custom.effects.clone(),
                    ),
                    None,
                )
            }),
    );

    sources
}

/// Resolve all effects on a character into one bundle. Pure; never cached.
pub fn resolve_effects(character: &Character, custom_effects: &[CustomEffect]) -> ResolvedEffects {
    let mut resolved = ResolvedEffects::default();

    for (source, item) in collect_sources(character, custom_effects) {
        let mut contributed = false;
        for effect in source
            .effects
            .iter()
            .filter(|e| condition_met(e.condition, character, item))
        {
            resolved.admit(&source.name, effect, character.level);
            contributed = true;
        }
        if contributed {
            resolved.sources.push(source.name);
        }
    }

    resolved
}
