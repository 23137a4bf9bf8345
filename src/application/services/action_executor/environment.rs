//! Fog, environment flags, shop, map switching, sidebar and the countdown timer

use super::resolve;
use super::{ActionContext, ActionError};
use crate::application::dto::{OutboundMessage, SyncMessage};
use crate::application::services::sync_broadcaster;
use crate::domain::entities::{
    parse_price, AmbientLight, GridCell, SessionTimer, ShopItem, SidebarCategory, SidebarEntry,
    TravelPace,
};
use crate::domain::value_objects::ShopItemInput;

// ============================================================================
// Fog of war
// ============================================================================

pub(super) fn set_fog(
    ctx: &mut ActionContext<'_>,
    cells: &[GridCell],
    map_name: Option<&str>,
    reveal: bool,
) -> Result<(), ActionError> {
    if cells.is_empty() {
        return Err(ActionError::invalid("cells must not be empty"));
    }
    let map_id = match map_name {
        Some(name) => resolve::map_named(ctx.state, name)?,
        None => ctx.state.active_map.ok_or(ActionError::NoActiveMap)?,
    };
    let map = ctx
        .state
        .map_mut(map_id)
        .ok_or(ActionError::NoActiveMap)?;

    let out_of_bounds = cells.iter().find(|cell| {
        cell.x < 0 || cell.y < 0 || cell.x as u32 >= map.width || cell.y as u32 >= map.height
    });
    if let Some(cell) = out_of_bounds {
        return Err(ActionError::invalid(format!(
            "cell ({}, {}) is outside {} ({}x{})",
            cell.x, cell.y, map.name, map.width, map.height
        )));
    }

    if reveal {
        map.reveal(cells);
    } else {
        map.hide(cells);
    }
    let message = sync_broadcaster::fog_sync(map);
    ctx.emit(message);
    Ok(())
}

// ============================================================================
// Environment flags
// ============================================================================

fn emit_environment(ctx: &mut ActionContext<'_>) {
    let environment = ctx.state.environment;
    ctx.emit(OutboundMessage::everyone(SyncMessage::EnvironmentChanged {
        environment,
    }));
}

pub(super) fn set_ambient_light(
    ctx: &mut ActionContext<'_>,
    level: AmbientLight,
) -> Result<(), ActionError> {
    ctx.state.environment.ambient_light = level;
    emit_environment(ctx);
    ctx.announce(format!("The light is now {}.", level.as_str()));
    Ok(())
}

pub(super) fn set_underwater_combat(
    ctx: &mut ActionContext<'_>,
    enabled: bool,
) -> Result<(), ActionError> {
    ctx.state.environment.underwater_combat = enabled;
    emit_environment(ctx);
    if enabled {
        ctx.announce("The fight continues underwater.");
    } else {
        ctx.announce("The fight is no longer underwater.");
    }
    Ok(())
}

pub(super) fn set_travel_pace(
    ctx: &mut ActionContext<'_>,
    pace: TravelPace,
) -> Result<(), ActionError> {
    ctx.state.environment.travel_pace = pace;
    emit_environment(ctx);
    ctx.announce(format!(
        "Travel pace set to {} ({} miles per day).",
        pace.as_str(),
        pace.miles_per_day()
    ));
    Ok(())
}

// ============================================================================
// Shop
// ============================================================================

fn shop_item(input: &ShopItemInput) -> Result<ShopItem, ActionError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ActionError::invalid("shop item name must not be empty"));
    }
    let price_cp = parse_price(&input.price)
        .ok_or_else(|| ActionError::invalid(format!("invalid price '{}'", input.price)))?;
    Ok(ShopItem {
        name: name.to_string(),
        price_cp,
        quantity: input.quantity,
    })
}

fn emit_shop(ctx: &mut ActionContext<'_>) {
    let shop = ctx.state.shop.clone();
    ctx.emit(OutboundMessage::everyone(SyncMessage::ShopUpdated { shop }));
}

pub(super) fn open_shop(
    ctx: &mut ActionContext<'_>,
    name: &str,
    items: &[ShopItemInput],
) -> Result<(), ActionError> {
    if name.trim().is_empty() {
        return Err(ActionError::invalid("shop name must not be empty"));
    }
    let items = items.iter().map(shop_item).collect::<Result<Vec<_>, _>>()?;

    let shop = &mut ctx.state.shop;
    shop.items.clear();
    for item in items {
        shop.add_item(item);
    }
    shop.open(name.trim());

    emit_shop(ctx);
    ctx.announce(format!("{} is open for business.", name.trim()));
    Ok(())
}

pub(super) fn close_shop(ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
    ctx.state.shop.close();
    emit_shop(ctx);
    Ok(())
}

pub(super) fn add_shop_item(
    ctx: &mut ActionContext<'_>,
    input: &ShopItemInput,
) -> Result<(), ActionError> {
    if !ctx.state.shop.open {
        return Err(ActionError::invalid("no shop is open"));
    }
    let item = shop_item(input)?;
    ctx.state.shop.add_item(item);
    emit_shop(ctx);
    Ok(())
}

pub(super) fn remove_shop_item(ctx: &mut ActionContext<'_>, name: &str) -> Result<(), ActionError> {
    ctx.state
        .shop
        .remove_item(name.trim())
        .ok_or_else(|| ActionError::not_found("Shop item", name))?;
    emit_shop(ctx);
    Ok(())
}

// ============================================================================
// Maps
// ============================================================================

pub(super) fn switch_map(ctx: &mut ActionContext<'_>, map_name: &str) -> Result<(), ActionError> {
    let map_id = resolve::map_named(ctx.state, map_name)?;
    ctx.state.active_map = Some(map_id);
    let map = ctx.state.map(map_id).ok_or_else(|| ActionError::not_found("Map", map_name))?;

    let switched = OutboundMessage::everyone(SyncMessage::MapSwitched {
        map_id,
        name: map.name.clone(),
    });
    let fog = sync_broadcaster::fog_sync(map);
    let name = map.name.clone();

    ctx.emit(switched);
    let positions = sync_broadcaster::token_positions(ctx.state);
    ctx.emit_all(positions);
    ctx.emit(fog);
    ctx.announce(format!("The scene shifts to {}.", name));
    Ok(())
}

// ============================================================================
// DM sidebar
// ============================================================================

fn emit_sidebar(ctx: &mut ActionContext<'_>) {
    let entries = ctx.state.sidebar.clone();
    ctx.emit(OutboundMessage::dm_only(SyncMessage::SidebarUpdated { entries }));
}

pub(super) fn add_sidebar_entry(
    ctx: &mut ActionContext<'_>,
    category: SidebarCategory,
    name: &str,
    description: Option<&str>,
) -> Result<(), ActionError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ActionError::invalid("sidebar entry name must not be empty"));
    }
    let entry = SidebarEntry {
        category,
        name: name.to_string(),
        description: description.map(str::to_string),
    };
    match ctx
        .state
        .sidebar
        .iter_mut()
        .find(|e| e.category == category && e.name.eq_ignore_ascii_case(name))
    {
        Some(existing) => *existing = entry,
        None => ctx.state.sidebar.push(entry),
    }
    emit_sidebar(ctx);
    Ok(())
}

pub(super) fn remove_sidebar_entry(
    ctx: &mut ActionContext<'_>,
    category: SidebarCategory,
    name: &str,
) -> Result<(), ActionError> {
    let index = ctx
        .state
        .sidebar
        .iter()
        .position(|e| e.category == category && e.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| ActionError::not_found("Sidebar entry", name))?;
    ctx.state.sidebar.remove(index);
    emit_sidebar(ctx);
    Ok(())
}

// ============================================================================
// Countdown timer
// ============================================================================

pub(super) fn start_timer(
    ctx: &mut ActionContext<'_>,
    seconds: u32,
    target_name: &str,
) -> Result<(), ActionError> {
    if seconds == 0 {
        return Err(ActionError::invalid("seconds must be greater than zero"));
    }
    if target_name.trim().is_empty() {
        return Err(ActionError::invalid("targetName must not be empty"));
    }
    let timer = SessionTimer::start(target_name.trim(), seconds);
    ctx.state.timer = Some(timer.clone());
    ctx.emit(OutboundMessage::everyone(SyncMessage::TimerStarted { timer }));
    Ok(())
}

pub(super) fn stop_timer(ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
    ctx.state.timer = None;
    ctx.emit(OutboundMessage::everyone(SyncMessage::TimerStopped));
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::test_support::*;
    use crate::application::dto::SyncMessage;
    use crate::domain::entities::{AmbientLight, Audience, GameMap, GridCell, TravelPace};

    #[test]
    fn test_reveal_and_hide_fog() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        let report = run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "reveal_fog", "cells": [{"x": 0, "y": 0}, {"x": 1, "y": 0}]}),
                json!({"action": "hide_fog", "cells": [{"x": 0, "y": 0}]}),
                json!({"action": "reveal_fog", "cells": [{"x": 25, "y": 0}]}),
            ],
        );
        assert_eq!(report.executed.len(), 2);
        assert!(report.failed[0].reason.contains("outside Battlefield"));
        let revealed: Vec<_> = state
            .active_map()
            .map(|m| m.revealed_cells.iter().copied().collect())
            .unwrap_or_default();
        assert_eq!(revealed, vec![GridCell { x: 1, y: 0 }]);
    }

    #[test]
    fn test_fog_on_named_map() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        state.add_map(GameMap::new("Sunken Crypt", 5, 5));
        run(
            &mut executor,
            &mut state,
            vec![json!({"action": "reveal_fog", "mapName": "crypt", "cells": [{"x": 2, "y": 2}]})],
        );
        assert_eq!(state.maps[1].revealed_cells.len(), 1);
        assert!(state.maps[0].revealed_cells.is_empty());
    }

    #[test]
    fn test_environment_flags() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        let report = run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "set_ambient_light", "mode": "dim"}),
                json!({"action": "set_underwater_combat", "enabled": true}),
                json!({"action": "set_travel_pace", "pace": "fast"}),
                json!({"action": "set_travel_pace", "pace": "sprinting"}),
            ],
        );
        assert_eq!(report.executed.len(), 3);
        assert_eq!(state.environment.ambient_light, AmbientLight::Dim);
        assert!(state.environment.underwater_combat);
        assert_eq!(state.environment.travel_pace, TravelPace::Fast);
    }

    #[test]
    fn test_shop_lifecycle() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        let report = run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "add_shop_item", "name": "Rope", "price": "1 gp"}),
                json!({"action": "open_shop", "name": "The Rusty Anvil", "items": [
                    {"name": "Longsword", "price": "15 gp"},
                    {"name": "Torch", "price": "1 cp", "quantity": 10}
                ]}),
                json!({"action": "add_shop_item", "name": "Rope", "price": "1 gp"}),
                json!({"action": "add_shop_item", "name": "Lute", "price": "a song"}),
                json!({"action": "remove_shop_item", "name": "longsword"}),
            ],
        );
        assert_eq!(report.executed.len(), 3);
        assert_eq!(report.failed[0].reason, "Invalid action: no shop is open");
        assert_eq!(report.failed[1].reason, "Invalid action: invalid price 'a song'");
        assert!(state.shop.open);
        let names: Vec<_> = state.shop.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Torch", "Rope"]);
        assert_eq!(state.shop.items[1].price_cp, 100);
    }

    #[test]
    fn test_switch_map_changes_active_map() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[("Goblin 1", 0, 0)]);
        let crypt = state.add_map(GameMap::new("Sunken Crypt", 10, 10));
        let report = run(
            &mut executor,
            &mut state,
            vec![json!({"action": "switch_map", "mapName": "Sunken"})],
        );
        assert_eq!(report.executed.len(), 1);
        assert_eq!(state.active_map, Some(crypt));
        assert!(state.active_tokens().is_empty());
        assert!(report.messages.iter().any(
            |m| matches!(m.message, SyncMessage::MapSwitched { map_id, .. } if map_id == crypt)
        ));
    }

    #[test]
    fn test_sidebar_is_dm_only() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        let report = run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "add_sidebar_entry", "category": "npcs", "name": "Sildar", "description": "Captive"}),
                json!({"action": "add_sidebar_entry", "category": "npcs", "name": "sildar", "description": "Rescued"}),
                json!({"action": "remove_sidebar_entry", "category": "quests", "name": "Sildar"}),
            ],
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(state.sidebar.len(), 1);
        assert_eq!(state.sidebar[0].description.as_deref(), Some("Rescued"));
        assert!(report.messages.iter().all(|m| m.audience == Audience::DmOnly));
    }

    #[test]
    fn test_timer_start_and_stop() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        run(
            &mut executor,
            &mut state,
            vec![json!({"action": "start_timer", "seconds": 60, "targetName": "The ritual"})],
        );
        assert_eq!(state.timer.as_ref().map(|t| t.seconds), Some(60));

        let report = run(&mut executor, &mut state, vec![json!({"action": "stop_timer"})]);
        assert!(state.timer.is_none());
        assert!(matches!(report.messages[0].message, SyncMessage::TimerStopped));
    }
}
