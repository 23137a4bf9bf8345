//! Initiative lifecycle, legendary pools and recharge abilities

use std::collections::HashMap;

use tracing::debug;

use super::resolve;
use super::{ActionContext, ActionError};
use crate::application::services::sync_broadcaster;
use crate::domain::entities::{
    EntityCategory, InitiativeEntry, LegendaryActions, LegendaryResistances, RechargeAbility,
};
use crate::domain::value_objects::InitiativeEntryInput;

/// Build a tracker entry, linking it to its token and creature template when known
fn build_entry(
    ctx: &ActionContext<'_>,
    input: &InitiativeEntryInput,
) -> Result<InitiativeEntry, ActionError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ActionError::invalid("initiative entry name must not be empty"));
    }

    let token = ctx.state.active_map().and_then(|map| {
        let label = input.token_label.as_deref().unwrap_or(name);
        resolve::token_on(map, label)
            .ok()
            .and_then(|id| map.token(id))
    });

    let category = input.category.unwrap_or_else(|| {
        let is_player = ctx.state.character(name).is_some()
            || ctx.state.players.iter().any(|p| p.answers_to(name));
        if is_player {
            EntityCategory::Player
        } else {
            EntityCategory::Enemy
        }
    });

    let mut entry = InitiativeEntry::new(name, category, input.roll, input.modifier);
    if let Some(token) = token {
        entry.entity_ref = token.label.clone();
    }
    entry.legendary_actions = input.legendary_actions.map(LegendaryActions::new);
    entry.legendary_resistances = input.legendary_resistances.map(LegendaryResistances::new);
    entry.recharge_abilities = input.recharge_abilities.clone();

    if let Some(template) = token
        .and_then(|t| t.creature.as_deref())
        .and_then(|creature| ctx.catalog.find(creature))
    {
        template.equip_entry(&mut entry);
    }
    Ok(entry)
}

fn emit_sync(ctx: &mut ActionContext<'_>) {
    let message = sync_broadcaster::initiative_sync(ctx.state);
    ctx.emit(message);
}

pub(super) fn start(
    ctx: &mut ActionContext<'_>,
    inputs: &[InitiativeEntryInput],
) -> Result<(), ActionError> {
    if inputs.is_empty() {
        return Err(ActionError::invalid("entries must not be empty"));
    }
    let mut entries = Vec::with_capacity(inputs.len());
    for input in inputs {
        entries.push(build_entry(ctx, input)?);
    }

    let order = entries
        .iter()
        .map(|e| format!("{} ({})", e.name, e.total))
        .collect::<Vec<_>>()
        .join(", ");
    let speeds: Vec<(String, u32)> = entries
        .iter()
        .map(|e| (e.entity_ref.clone(), ctx.state.movement_for(&e.entity_ref)))
        .collect();

    ctx.state.initiative.start(entries);
    for (entity_ref, movement) in speeds {
        ctx.state.initiative.seed_turn_state(&entity_ref, movement);
    }

    let first = ctx
        .state
        .initiative
        .current_entry()
        .map(|e| e.name.clone())
        .unwrap_or_default();
    ctx.announce(format!("Roll for initiative! Order: {}. {} goes first.", order, first));
    emit_sync(ctx);
    Ok(())
}

pub(super) fn add(
    ctx: &mut ActionContext<'_>,
    input: &InitiativeEntryInput,
) -> Result<(), ActionError> {
    if !ctx.state.initiative.is_active() {
        return Err(ActionError::NoActiveEncounter);
    }
    let entry = build_entry(ctx, input)?;
    let duplicate = ctx
        .state
        .initiative
        .entries()
        .iter()
        .any(|e| e.entity_ref == entry.entity_ref || e.name.eq_ignore_ascii_case(&entry.name));
    if duplicate {
        return Err(ActionError::invalid(format!("{} is already in initiative", entry.name)));
    }

    let movement = ctx.state.movement_for(&entry.entity_ref);
    let (name, entity_ref, total) = (entry.name.clone(), entry.entity_ref.clone(), entry.total);
    ctx.state.initiative.add(entry);
    ctx.state.initiative.seed_turn_state(&entity_ref, movement);

    ctx.announce(format!("{} joins the initiative order ({}).", name, total));
    emit_sync(ctx);
    Ok(())
}

pub(super) fn remove(ctx: &mut ActionContext<'_>, label: &str) -> Result<(), ActionError> {
    let index = resolve::initiative_entry(&ctx.state.initiative, label)?;
    let removed = ctx
        .state
        .initiative
        .remove(index)
        .ok_or_else(|| ActionError::not_found("Combatant", label))?;

    if ctx.state.initiative.is_active() {
        ctx.announce(format!("{} leaves the initiative order.", removed.name));
    } else {
        ctx.announce(format!("{} leaves the initiative order. Combat has ended.", removed.name));
    }
    emit_sync(ctx);
    Ok(())
}

pub(super) fn next_turn(ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
    if !ctx.state.initiative.is_active() {
        return Err(ActionError::NoActiveEncounter);
    }
    let speeds: HashMap<String, u32> = ctx
        .state
        .initiative
        .entries()
        .iter()
        .map(|e| (e.entity_ref.clone(), ctx.state.movement_for(&e.entity_ref)))
        .collect();

    let step = ctx
        .state
        .initiative
        .advance(&mut *ctx.roller, |entity| speeds.get(entity).copied().unwrap_or(30))
        .ok_or(ActionError::NoActiveEncounter)?;

    if step.new_round {
        ctx.announce(format!("Round {} begins.", step.round));
    }
    ctx.announce(format!("It is {}'s turn.", step.name));
    for recharge in &step.recharges {
        if recharge.recharged {
            ctx.announce(format!(
                "{}'s {} recharges! (rolled {})",
                recharge.entity, recharge.ability, recharge.rolled
            ));
        } else {
            debug!(
                entity = %recharge.entity,
                ability = %recharge.ability,
                rolled = recharge.rolled,
                needed = recharge.recharge_on,
                "Recharge roll failed"
            );
        }
    }
    emit_sync(ctx);
    Ok(())
}

pub(super) fn end(ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
    if !ctx.state.initiative.is_active() {
        return Err(ActionError::NoActiveEncounter);
    }
    let rounds = ctx.state.initiative.round();
    ctx.state.initiative.end();
    ctx.announce(format!("Combat has ended after {} round(s).", rounds));
    emit_sync(ctx);
    Ok(())
}

pub(super) fn use_legendary_action(
    ctx: &mut ActionContext<'_>,
    label: &str,
    cost: u32,
) -> Result<(), ActionError> {
    if cost == 0 {
        return Err(ActionError::invalid("cost must be at least 1"));
    }
    let index = resolve::initiative_entry(&ctx.state.initiative, label)?;
    let entry = &mut ctx.state.initiative.entries_mut()[index];
    let name = entry.name.clone();
    let pool = entry
        .legendary_actions
        .as_mut()
        .ok_or_else(|| {
            ActionError::InsufficientResource(format!("{} has no legendary actions", name))
        })?;
    if cost > pool.remaining() {
        return Err(ActionError::InsufficientResource(format!(
            "{} has {} legendary action(s) left but needs {}",
            name,
            pool.remaining(),
            cost
        )));
    }
    pool.used += cost;
    let (remaining, max) = (pool.remaining(), pool.max);

    ctx.announce(format!(
        "{} takes a legendary action ({}/{} remaining).",
        name, remaining, max
    ));
    emit_sync(ctx);
    Ok(())
}

pub(super) fn use_legendary_resistance(
    ctx: &mut ActionContext<'_>,
    label: &str,
) -> Result<(), ActionError> {
    let index = resolve::initiative_entry(&ctx.state.initiative, label)?;
    let entry = &mut ctx.state.initiative.entries_mut()[index];
    let name = entry.name.clone();
    let pool = entry.legendary_resistances.as_mut().ok_or_else(|| {
        ActionError::InsufficientResource(format!("{} has no legendary resistances", name))
    })?;
    if pool.remaining == 0 {
        return Err(ActionError::InsufficientResource(format!(
            "{} has no legendary resistances left",
            name
        )));
    }
    pool.remaining -= 1;
    let remaining = pool.remaining;

    ctx.announce(format!(
        "{} uses Legendary Resistance to succeed instead ({} left).",
        name, remaining
    ));
    emit_sync(ctx);
    Ok(())
}

pub(super) fn recharge_roll(
    ctx: &mut ActionContext<'_>,
    label: &str,
    ability_name: &str,
    recharge_on: u32,
) -> Result<(), ActionError> {
    if !(1..=6).contains(&recharge_on) {
        return Err(ActionError::invalid("rechargeOn must be between 1 and 6"));
    }
    if ability_name.trim().is_empty() {
        return Err(ActionError::invalid("abilityName must not be empty"));
    }
    let index = resolve::initiative_entry(&ctx.state.initiative, label)?;

    let rolled = ctx.roller.roll_die(6);
    let recharged = rolled >= recharge_on;
    let entry = &mut ctx.state.initiative.entries_mut()[index];
    let name = entry.name.clone();
    match entry.recharge_ability_mut(ability_name) {
        Some(ability) => {
            ability.recharge_on = recharge_on;
            ability.available = recharged;
        }
        None => entry.recharge_abilities.push(RechargeAbility {
            name: ability_name.trim().to_string(),
            recharge_on,
            available: recharged,
        }),
    }

    let outcome = if recharged { "recharged!" } else { "not yet." };
    ctx.announce(format!(
        "{} rolls {} to recharge {} ({}-6): {}",
        name, rolled, ability_name, recharge_on, outcome
    ));
    emit_sync(ctx);
    Ok(())
}

pub(super) fn use_recharge_ability(
    ctx: &mut ActionContext<'_>,
    label: &str,
    ability_name: &str,
) -> Result<(), ActionError> {
    let index = resolve::initiative_entry(&ctx.state.initiative, label)?;
    let entry = &mut ctx.state.initiative.entries_mut()[index];
    let name = entry.name.clone();
    let ability = entry
        .recharge_ability_mut(ability_name)
        .ok_or_else(|| ActionError::not_found("Recharge ability", ability_name))?;
    if !ability.available {
        return Err(ActionError::InsufficientResource(format!(
            "{}'s {} has not recharged",
            name, ability.name
        )));
    }
    ability.available = false;
    let ability = ability.name.clone();

    ctx.announce(format!("{} uses {}!", name, ability));
    emit_sync(ctx);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::test_support::*;
    use crate::domain::entities::{EntityCategory, LegendaryActions};

    #[test]
    fn test_next_turn_recharges_on_threshold() {
        for (face, expected) in [(5, true), (6, true), (4, false)] {
            let mut executor = executor([face]);
            let mut state = state_with_tokens(&[]);
            let report = run(
                &mut executor,
                &mut state,
                vec![
                    json!({"action": "start_initiative", "entries": [
                        {"name": "Aria", "roll": 18, "category": "player"},
                        {"name": "Ogre", "roll": 14, "rechargeAbilities": [
                            {"name": "Boulder Toss", "rechargeOn": 5, "available": false}
                        ]}
                    ]}),
                    json!({"action": "next_turn"}),
                ],
            );
            assert_eq!(report.executed.len(), 2);
            let ogre = &state.initiative.entries()[1];
            assert_eq!(ogre.recharge_abilities[0].available, expected, "face {}", face);
        }
    }

    #[test]
    fn test_recharge_announcement() {
        let mut executor = executor([6]);
        let mut state = state_with_tokens(&[]);
        run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "start_initiative", "entries": [
                    {"name": "Ogre", "roll": 14, "rechargeAbilities": [
                        {"name": "Boulder Toss", "rechargeOn": 5, "available": false}
                    ]}
                ]}),
                json!({"action": "next_turn"}),
            ],
        );
        assert!(state
            .chat
            .iter()
            .any(|c| c.text == "Ogre's Boulder Toss recharges! (rolled 6)"));
        assert_eq!(state.initiative.round(), 2);
    }

    #[test]
    fn test_start_initiative_seeds_movement_from_tokens() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "place_creature", "creatureName": "Ogre", "gridX": 0, "gridY": 0}),
                json!({"action": "start_initiative", "entries": [
                    {"name": "Ogre 1", "roll": 9},
                    {"name": "Aria", "roll": 17}
                ]}),
            ],
        );
        assert_eq!(state.initiative.turn_state("Ogre 1").map(|t| t.movement), Some(40));
        assert_eq!(state.initiative.turn_state("Aria").map(|t| t.movement), Some(30));
        let ogre = &state.initiative.entries()[0];
        assert_eq!(ogre.recharge_abilities[0].name, "Boulder Toss");
        assert_eq!(state.initiative.current_index(), Some(0));
    }

    #[test]
    fn test_start_replaces_previous_encounter() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "start_initiative", "entries": [{"name": "A", "roll": 1}, {"name": "B", "roll": 2}]}),
                json!({"action": "next_turn"}),
                json!({"action": "start_initiative", "entries": [{"name": "C", "roll": 3}]}),
            ],
        );
        assert_eq!(state.initiative.entries().len(), 1);
        assert_eq!(state.initiative.current_index(), Some(0));
        assert_eq!(state.initiative.round(), 1);
    }

    #[test]
    fn test_legendary_action_cost_exceeding_pool_fails_unchanged() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        let report = run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "start_initiative", "entries": [
                    {"name": "Dragon", "roll": 20, "legendaryActions": 3}
                ]}),
                json!({"action": "use_legendary_action", "entityLabel": "Dragon", "cost": 2}),
                json!({"action": "use_legendary_action", "entityLabel": "Dragon", "cost": 2}),
            ],
        );
        assert_eq!(report.executed.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(
            report.failed[0].reason,
            "Dragon has 1 legendary action(s) left but needs 2"
        );
        assert_eq!(
            state.initiative.entries()[0].legendary_actions,
            Some(LegendaryActions { max: 3, used: 2 })
        );
    }

    #[test]
    fn test_legendary_resistance_runs_out() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        let report = run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "start_initiative", "entries": [
                    {"name": "Lich", "roll": 20, "legendaryResistances": 1}
                ]}),
                json!({"action": "use_legendary_resistance", "entityLabel": "lich"}),
                json!({"action": "use_legendary_resistance", "entityLabel": "lich"}),
            ],
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(
            state.initiative.entries()[0]
                .legendary_resistances
                .map(|p| p.remaining),
            Some(0)
        );
    }

    #[test]
    fn test_next_turn_resets_legendary_actions() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "start_initiative", "entries": [
                    {"name": "Aria", "roll": 20},
                    {"name": "Dragon", "roll": 15, "legendaryActions": 3}
                ]}),
                json!({"action": "use_legendary_action", "entityLabel": "Dragon", "cost": 3}),
                json!({"action": "next_turn"}),
            ],
        );
        assert_eq!(
            state.initiative.entries()[1].legendary_actions,
            Some(LegendaryActions { max: 3, used: 0 })
        );
    }

    #[test]
    fn test_recharge_roll_creates_and_updates_ability() {
        let mut executor = executor([3, 6]);
        let mut state = state_with_tokens(&[]);
        let roll = json!({"action": "recharge_roll", "entityLabel": "Drake", "abilityName": "Breath", "rechargeOn": 5});
        run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "start_initiative", "entries": [{"name": "Drake", "roll": 12}]}),
                roll.clone(),
            ],
        );
        assert!(!state.initiative.entries()[0].recharge_abilities[0].available);
        run(&mut executor, &mut state, vec![roll]);
        assert_eq!(state.initiative.entries()[0].recharge_abilities.len(), 1);
        assert!(state.initiative.entries()[0].recharge_abilities[0].available);
    }

    #[test]
    fn test_use_recharge_ability_requires_availability() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        let report = run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "start_initiative", "entries": [
                    {
                        "name": "Drake",
                        "roll": 12,
                        "rechargeAbilities": [{"name": "Breath", "rechargeOn": 5}]
                    }
                ]}),
                json!({"action": "use_recharge_ability", "entityLabel": "Drake", "abilityName": "breath"}),
                json!({"action": "use_recharge_ability", "entityLabel": "Drake", "abilityName": "breath"}),
            ],
        );
        assert_eq!(report.executed.len(), 2);
        assert_eq!(report.failed[0].reason, "Drake's Breath has not recharged");
    }

    #[test]
    fn test_add_and_remove_keep_current_combatant() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "start_initiative", "entries": [{"name": "A", "roll": 20}, {"name": "B", "roll": 10}]}),
                json!({"action": "next_turn"}),
                json!({"action": "add_to_initiative", "name": "C", "roll": 15}),
                json!({"action": "remove_from_initiative", "label": "A"}),
            ],
        );
        let current = state.initiative.current_entry().map(|e| e.name.clone());
        assert_eq!(current.as_deref(), Some("B"));
        assert_eq!(state.initiative.entries().len(), 2);
    }

    #[test]
    fn test_end_initiative_and_actions_without_encounter() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        let report = run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "next_turn"}),
                json!({"action": "start_initiative", "entries": [{"name": "A", "roll": 20}]}),
                json!({"action": "end_initiative"}),
                json!({"action": "end_initiative"}),
            ],
        );
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed.iter().all(|f| f.reason == "No active encounter"));
        assert!(!state.initiative.is_active());
    }

    #[test]
    fn test_category_inferred_for_known_characters() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        state.upsert_character(crate::domain::entities::Character::new("Aria", 3));
        run(
            &mut executor,
            &mut state,
            vec![json!({"action": "start_initiative", "entries": [{"name": "Aria", "roll": 12}, {"name": "Bandit", "roll": 8}]})],
        );
        assert_eq!(state.initiative.entries()[0].category, EntityCategory::Player);
        assert_eq!(state.initiative.entries()[1].category, EntityCategory::Enemy);
    }
}
