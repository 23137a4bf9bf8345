//! Hidden rolls, chat, status conditions and DM-authored effect sources

use chrono::Utc;

use super::resolve;
use super::{ActionContext, ActionError};
use crate::application::dto::{OutboundMessage, SyncMessage};
use crate::application::services::sync_broadcaster;
use crate::domain::entities::{Audience, ChatEntry, Condition, ConditionDuration};
use crate::domain::value_objects::{
    parse_formula, CustomEffect, DmAction, MechanicalEffect, TokenId,
};

pub(super) fn hidden_dice_roll(
    ctx: &mut ActionContext<'_>,
    formula: &str,
    reason: Option<&str>,
) -> Result<(), ActionError> {
    let formula = parse_formula(formula)?;
    let outcome = formula.roll(&mut *ctx.roller);

    let line = match reason {
        Some(reason) => format!("Hidden roll {} ({}): {}", outcome.formula, reason, outcome.total),
        None => format!("Hidden roll {}: {}", outcome.formula, outcome.total),
    };
    ctx.emit(OutboundMessage::dm_only(SyncMessage::HiddenRoll {
        outcome,
        reason: reason.map(str::to_string),
    }));
    ctx.notify_dm(line);
    Ok(())
}

pub(super) fn whisper_player(
    ctx: &mut ActionContext<'_>,
    player_name: &str,
    message: &str,
) -> Result<(), ActionError> {
    if message.trim().is_empty() {
        return Err(ActionError::invalid("message must not be empty"));
    }
    let player = resolve::player(ctx.state, player_name)?.name.clone();
    ctx.chat(ChatEntry {
        sender: "DM".to_string(),
        text: message.trim().to_string(),
        audience: Audience::Player(player),
        sent_at: Utc::now(),
    });
    Ok(())
}

pub(super) fn system_message(
    ctx: &mut ActionContext<'_>,
    message: &str,
) -> Result<(), ActionError> {
    if message.trim().is_empty() {
        return Err(ActionError::invalid("message must not be empty"));
    }
    ctx.announce(message.trim());
    Ok(())
}

// ============================================================================
// Conditions
// ============================================================================

/// Who a condition lands on
struct ConditionTarget {
    name: String,
    token: Option<TokenId>,
    visible: bool,
}

/// Tokens on the active map first, then combatants, then character sheets
fn condition_target(ctx: &ActionContext<'_>, label: &str) -> Result<ConditionTarget, ActionError> {
    match resolve::active_token(ctx.state, label) {
        Ok(id) => {
            if let Some(token) = ctx.state.active_map().and_then(|m| m.token(id)) {
                return Ok(ConditionTarget {
                    name: token.label.clone(),
                    token: Some(id),
                    visible: token.visible,
                });
            }
        }
        Err(ActionError::NotFound { .. } | ActionError::NoActiveMap) => {}
        Err(error) => return Err(error),
    }

    match resolve::initiative_entry(&ctx.state.initiative, label) {
        Ok(index) => {
            return Ok(ConditionTarget {
                name: ctx.state.initiative.entries()[index].name.clone(),
                token: None,
                visible: true,
            })
        }
        Err(ActionError::NotFound { .. } | ActionError::NoActiveEncounter) => {}
        Err(error) => return Err(error),
    }

    ctx.state
        .character(label.trim())
        .map(|c| ConditionTarget {
            name: c.name.clone(),
            token: None,
            visible: true,
        })
        .ok_or_else(|| ActionError::not_found("Entity", label))
}

fn announce_to(ctx: &mut ActionContext<'_>, visible: bool, text: String) {
    if visible {
        ctx.announce(text);
    } else {
        ctx.notify_dm(text);
    }
}

pub(super) fn add_entity_condition(
    ctx: &mut ActionContext<'_>,
    action: &DmAction,
) -> Result<(), ActionError> {
    let DmAction::AddEntityCondition {
        entity_label,
        condition,
        value,
        duration_rounds,
        source,
    } = action
    else {
        return Err(ActionError::invalid("expected add_entity_condition"));
    };

    let name = condition.trim();
    if name.is_empty() {
        return Err(ActionError::invalid("condition must not be empty"));
    }
    let target = condition_target(ctx, entity_label)?;

    let duration = duration_rounds.map_or(ConditionDuration::Permanent, ConditionDuration::Rounds);
    let applied = Condition::new(target.name.clone(), name, ctx.state.initiative.round())
        .with_duration(duration)
        .with_value(*value)
        .with_source(source.clone());

    match ctx
        .state
        .conditions
        .iter_mut()
        .find(|c| c.matches(&target.name, name))
    {
        Some(existing) => *existing = Condition { id: existing.id, ..applied },
        None => ctx.state.conditions.push(applied),
    }
    if let Some(id) = target.token {
        if let Some(token) = ctx.state.active_map_mut().and_then(|m| m.token_mut(id)) {
            token.add_condition(name);
        }
    }

    let sync = sync_broadcaster::condition_sync(ctx.state);
    ctx.emit(sync);
    let text = match duration {
        ConditionDuration::Rounds(rounds) => {
            format!("{} is {} for {} round(s).", target.name, name, rounds)
        }
        ConditionDuration::Permanent => format!("{} is {}.", target.name, name),
    };
    announce_to(ctx, target.visible, text);
    Ok(())
}

pub(super) fn remove_entity_condition(
    ctx: &mut ActionContext<'_>,
    entity_label: &str,
    condition: &str,
) -> Result<(), ActionError> {
    let target = condition_target(ctx, entity_label)?;
    let index = ctx
        .state
        .conditions
        .iter()
        .position(|c| c.matches(&target.name, condition.trim()))
        .ok_or_else(|| {
            ActionError::not_found("Condition", format!("{} on {}", condition, target.name))
        })?;
    let removed = ctx.state.conditions.remove(index);

    if let Some(id) = target.token {
        if let Some(token) = ctx.state.active_map_mut().and_then(|m| m.token_mut(id)) {
            token.remove_condition(&removed.name);
        }
    }

    let sync = sync_broadcaster::condition_sync(ctx.state);
    ctx.emit(sync);
    announce_to(
        ctx,
        target.visible,
        format!("{} is no longer {}.", target.name, removed.name),
    );
    Ok(())
}

// ============================================================================
// Custom effect sources
// ============================================================================

pub(super) fn add_custom_effect(
    ctx: &mut ActionContext<'_>,
    target_name: &str,
    source_name: &str,
    effects: &[MechanicalEffect],
) -> Result<(), ActionError> {
    let (target_name, source_name) = (target_name.trim(), source_name.trim());
    if target_name.is_empty() || source_name.is_empty() {
        return Err(ActionError::invalid("targetName and sourceName are required"));
    }
    if effects.is_empty() {
        return Err(ActionError::invalid("effects must not be empty"));
    }

    let effect = CustomEffect {
        target_name: target_name.to_string(),
        source_name: source_name.to_string(),
        effects: effects.to_vec(),
    };
    match ctx
        .state
        .custom_effects
        .iter_mut()
        .find(|e| e.targets(target_name) && e.source_name.eq_ignore_ascii_case(source_name))
    {
        Some(existing) => *existing = effect,
        None => ctx.state.custom_effects.push(effect),
    }

    ctx.notify_dm(format!(
        "{} now carries {} ({} effect(s)).",
        target_name,
        source_name,
        effects.len()
    ));
    Ok(())
}

pub(super) fn remove_custom_effect(
    ctx: &mut ActionContext<'_>,
    target_name: &str,
    source_name: &str,
) -> Result<(), ActionError> {
    let index = ctx
        .state
        .custom_effects
        .iter()
        .position(|e| {
            e.targets(target_name.trim()) && e.source_name.eq_ignore_ascii_case(source_name.trim())
        })
        .ok_or_else(|| ActionError::not_found("Custom effect", source_name))?;
    let removed = ctx.state.custom_effects.remove(index);
    ctx.notify_dm(format!(
        "{} no longer carries {}.",
        removed.target_name, removed.source_name
    ));
    Ok(())
}
