//! Built-in effects granted by feats and fighting styles

use crate::domain::value_objects::{
    EffectCondition, EffectKind, EffectOrigin, EffectScope, EffectSource, MechanicalEffect,
};

/// Effects granted by a feat, matched case-insensitively
pub fn feat_effects(name: &str) -> Option<EffectSource> {
    let effects = match name.trim().to_lowercase().as_str() {
        "tough" => vec![MechanicalEffect::new(EffectKind::HpPerLevel { value: 2 })],
        "alert" => vec![MechanicalEffect::new(EffectKind::InitiativeBonus { value: 5 })],
        "mobile" => vec![MechanicalEffect::new(EffectKind::SpeedBonus { value: 10 })],
        "war caster" => vec![MechanicalEffect::new(EffectKind::AdvantageOn {
            check: "concentration".to_string(),
        })],
        "sharpshooter" => vec![
            MechanicalEffect::new(EffectKind::AttackBonus { value: -5 })
                .scoped(EffectScope::Ranged)
                .when(EffectCondition::OnUse),
            MechanicalEffect::new(EffectKind::DamageBonus { value: 10 })
                .scoped(EffectScope::Ranged)
                .when(EffectCondition::OnUse),
        ],
        "great weapon master" => vec![
            MechanicalEffect::new(EffectKind::AttackBonus { value: -5 })
                .scoped(EffectScope::HeavyMelee)
                .when(EffectCondition::OnUse),
            MechanicalEffect::new(EffectKind::DamageBonus { value: 10 })
                .scoped(EffectScope::HeavyMelee)
                .when(EffectCondition::OnUse),
        ],
        "spell sniper" => vec![MechanicalEffect::new(EffectKind::OnHitEffect {
            description: "Ignores half and three-quarters cover".to_string(),
        })
        .scoped(EffectScope::RangedSpell)],
        "crossbow expert" => vec![MechanicalEffect::new(EffectKind::OnHitEffect {
            description: "No disadvantage on ranged attacks within 5 feet".to_string(),
        })
        .scoped(EffectScope::Crossbow)],
        _ => return None,
    };
    Some(EffectSource::new(name, EffectOrigin::Feat, effects))
}

/// Effects granted by a fighting style, matched case-insensitively
pub fn fighting_style_effects(name: &str) -> Option<EffectSource> {
    let effects = match name.trim().to_lowercase().as_str() {
        "archery" => vec![
            MechanicalEffect::new(EffectKind::AttackBonus { value: 2 }).scoped(EffectScope::Ranged)
        ],
        "defense" | "defence" => vec![MechanicalEffect::new(EffectKind::AcBonus { value: 1 })
            .when(EffectCondition::WearingArmor)],
        "dueling" | "duelling" => vec![
            MechanicalEffect::new(EffectKind::DamageBonus { value: 2 }).scoped(EffectScope::Melee)
        ],
        "thrown weapon fighting" => vec![
            MechanicalEffect::new(EffectKind::DamageBonus { value: 2 }).scoped(EffectScope::Thrown)
        ],
        "great weapon fighting" => vec![MechanicalEffect::new(EffectKind::OnHitEffect {
            description: "Reroll 1s and 2s on damage dice".to_string(),
        })
        .scoped(EffectScope::HeavyMelee)],
        "protection" => vec![MechanicalEffect::new(EffectKind::OnHitEffect {
            description: "Reaction: impose disadvantage on an attack against an adjacent ally"
                .to_string(),
        })
        .when(EffectCondition::WieldingShield)],
        _ => return None,
    };
    Some(EffectSource::new(name, EffectOrigin::FightingStyle, effects))
}
