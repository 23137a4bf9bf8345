//! Token lifecycle: place, place from a creature template, move, update, remove

use tracing::debug;

use super::resolve;
use super::{ActionContext, ActionError};
use crate::application::dto::{OutboundMessage, SyncMessage};
use crate::application::services::sync_broadcaster;
use crate::domain::entities::Token;
use crate::domain::value_objects::DmAction;

fn wrong_variant(expected: &str) -> ActionError {
    ActionError::invalid(format!("expected {}", expected))
}

/// Push the new token onto the active map and tell everyone who may see it
fn place(ctx: &mut ActionContext<'_>, token: Token) -> Result<(), ActionError> {
    let map = ctx.state.active_map_mut().ok_or(ActionError::NoActiveMap)?;
    let map_id = map.id;
    let message = OutboundMessage::about_token(
        &token,
        SyncMessage::TokenPlaced {
            map_id,
            token: token.clone(),
        },
    );
    let label = token.label.clone();
    let walk = token.speeds.walk;
    map.tokens.push(token);

    if ctx.state.initiative.is_active() {
        ctx.state.initiative.seed_turn_state(&label, walk);
    }

    ctx.emit(message);
    let positions = sync_broadcaster::token_positions(ctx.state);
    ctx.emit_all(positions);
    Ok(())
}

pub(super) fn place_token(
    ctx: &mut ActionContext<'_>,
    action: &DmAction,
) -> Result<(), ActionError> {
    let DmAction::PlaceToken {
        grid_x,
        grid_y,
        label,
        size,
        hp,
        max_hp,
        armor_class,
        entity_ref,
        visible,
    } = action
    else {
        return Err(wrong_variant("place_token"));
    };

    if label.trim().is_empty() {
        return Err(ActionError::invalid("label must not be empty"));
    }
    if ctx.state.active_map().is_none() {
        return Err(ActionError::NoActiveMap);
    }

    let mut token = Token::new(label.trim(), *grid_x, *grid_y);
    if let Some(size) = size {
        token.size = size.footprint();
    }
    token.hp = *hp;
    token.max_hp = max_hp.or(*hp);
    token.armor_class = *armor_class;
    token.entity_ref = entity_ref.clone();
    token.visible = visible.unwrap_or(true);

    place(ctx, token)
}

pub(super) fn place_creature(
    ctx: &mut ActionContext<'_>,
    grid_x: i32,
    grid_y: i32,
    creature_name: &str,
    label: Option<&str>,
    hp: Option<i32>,
    visible: Option<bool>,
) -> Result<(), ActionError> {
    if creature_name.trim().is_empty() {
        return Err(ActionError::invalid("creatureName must not be empty"));
    }
    let map = ctx.state.active_map().ok_or(ActionError::NoActiveMap)?;

    let template = ctx.catalog.find(creature_name);
    let base = template
        .as_ref()
        .map(|t| t.name.clone())
        .unwrap_or_else(|| creature_name.trim().to_string());
    let label = match label.map(str::trim).filter(|l| !l.is_empty()) {
        Some(label) => label.to_string(),
        None => map.next_numbered_label(&base),
    };

    let mut token = Token::new(label, grid_x, grid_y);
    match &template {
        Some(template) => template.stamp(&mut token),
        None => debug!(
            creature = creature_name,
            "Creature template not found, placing a bare token"
        ),
    }
    if let Some(hp) = hp {
        token.hp = Some(hp);
        token.max_hp = Some(token.max_hp.map_or(hp, |max| max.max(hp)));
    }
    token.visible = visible.unwrap_or(true);

    place(ctx, token)
}

pub(super) fn move_token(
    ctx: &mut ActionContext<'_>,
    label: &str,
    grid_x: i32,
    grid_y: i32,
) -> Result<(), ActionError> {
    let id = resolve::active_token(ctx.state, label)?;
    let map = ctx.state.active_map_mut().ok_or(ActionError::NoActiveMap)?;
    let token = map
        .token_mut(id)
        .ok_or_else(|| ActionError::not_found("Token", label))?;
    token.grid_x = grid_x;
    token.grid_y = grid_y;

    let positions = sync_broadcaster::token_positions(ctx.state);
    ctx.emit_all(positions);
    Ok(())
}

pub(super) fn update_token(
    ctx: &mut ActionContext<'_>,
    action: &DmAction,
) -> Result<(), ActionError> {
    let DmAction::UpdateToken {
        label,
        new_label,
        hp,
        max_hp,
        armor_class,
        size,
        visible,
    } = action
    else {
        return Err(wrong_variant("update_token"));
    };

    if new_label.as_deref().is_some_and(|l| l.trim().is_empty()) {
        return Err(ActionError::invalid("newLabel must not be empty"));
    }
    let id = resolve::active_token(ctx.state, label)?;
    let map = ctx.state.active_map_mut().ok_or(ActionError::NoActiveMap)?;
    let map_id = map.id;
    let token = map
        .token_mut(id)
        .ok_or_else(|| ActionError::not_found("Token", label.as_str()))?;

    let was_visible = token.visible;
    if let Some(new_label) = new_label {
        token.label = new_label.trim().to_string();
    }
    if let Some(max_hp) = max_hp {
        token.max_hp = Some((*max_hp).max(0));
    }
    if let Some(hp) = hp {
        let ceiling = token.max_hp.unwrap_or(i32::MAX);
        token.hp = Some((*hp).clamp(0, ceiling.max(0)));
    }
    if let Some(armor_class) = armor_class {
        token.armor_class = Some(*armor_class);
    }
    if let Some(size) = size {
        token.size = size.footprint();
    }
    if let Some(visible) = visible {
        token.visible = *visible;
    }

    let token = token.clone();
    if was_visible && !token.visible {
        // Players must drop a token that was just hidden from them
        ctx.emit(OutboundMessage::players(SyncMessage::TokenRemoved {
            map_id,
            token_id: token.id,
        }));
    }
    ctx.emit(OutboundMessage::about_token(
        &token,
        SyncMessage::TokenUpdated { map_id, token: token.clone() },
    ));
    let positions = sync_broadcaster::token_positions(ctx.state);
    ctx.emit_all(positions);
    Ok(())
}

pub(super) fn remove_token(ctx: &mut ActionContext<'_>, label: &str) -> Result<(), ActionError> {
    let id = resolve::active_token(ctx.state, label)?;
    let map = ctx.state.active_map_mut().ok_or(ActionError::NoActiveMap)?;
    let map_id = map.id;
    let token = map
        .remove_token(id)
        .ok_or_else(|| ActionError::not_found("Token", label))?;

    ctx.emit(OutboundMessage::about_token(
        &token,
        SyncMessage::TokenRemoved {
            map_id,
            token_id: token.id,
        },
    ));
    let positions = sync_broadcaster::token_positions(ctx.state);
    ctx.emit_all(positions);
    Ok(())
}
