//! Area effects - geometry-targeted saves, damage and conditions

use super::{ActionContext, ActionError};
use crate::application::dto::{OutboundMessage, SyncMessage};
use crate::application::services::sync_broadcaster;
use crate::domain::entities::{Condition, Token};
use crate::domain::value_objects::{
    feet_to_cells, find_tokens_in_area, parse_formula, AreaShape, AreaTemplate, DmAction,
};

/// What the effect did to one token
struct AreaHit {
    token: Token,
    /// Rolled d20 and whether it met the DC
    save: Option<(u32, bool)>,
    damage: i32,
    conditioned: bool,
}

pub(super) fn apply_area_effect(
    ctx: &mut ActionContext<'_>,
    action: &DmAction,
) -> Result<(), ActionError> {
    let DmAction::ApplyAreaEffect {
        origin_x,
        origin_y,
        radius_or_length,
        shape,
        width_ft,
        direction,
        damage_formula,
        damage_type,
        save_type,
        save_dc,
        half_on_save,
        condition,
    } = action
    else {
        return Err(ActionError::invalid("expected apply_area_effect"));
    };

    if *radius_or_length == 0 {
        return Err(ActionError::invalid("radiusOrLength must be greater than zero"));
    }
    let condition = condition.as_deref().map(str::trim).filter(|c| !c.is_empty());
    if damage_formula.is_none() && condition.is_none() {
        return Err(ActionError::invalid("an area effect needs a damageFormula or a condition"));
    }
    let formula = damage_formula.as_deref().map(parse_formula).transpose()?;

    let radius = feet_to_cells(*radius_or_length);
    let mut area = AreaTemplate::new(*origin_x, *origin_y, radius, *shape);
    if *shape == AreaShape::Line {
        area = area
            .with_width(width_ft.map(feet_to_cells).unwrap_or(1.0))
            .with_direction(direction.unwrap_or_default());
    }

    let round = ctx.state.initiative.round();
    let map = ctx.state.active_map_mut().ok_or(ActionError::NoActiveMap)?;
    let map_id = map.id;
    let targets = find_tokens_in_area(&map.tokens, &area);

    let mut hits = Vec::with_capacity(targets.len());
    for id in targets {
        let Some(token) = map.token_mut(id) else {
            continue;
        };

        let save = match save_dc {
            Some(dc) => {
                let rolled = ctx.roller.roll_die(20);
                Some((rolled, rolled >= *dc))
            }
            None => None,
        };
        let saved = save.is_some_and(|(_, saved)| saved);

        let damage = match &formula {
            Some(formula) => {
                let total = formula.roll(&mut *ctx.roller).total.max(0);
                match (saved, *half_on_save) {
                    (true, true) => total / 2,
                    (true, false) => 0,
                    (false, _) => total,
                }
            }
            None => 0,
        };
        token.apply_damage(damage);

        let conditioned = condition.is_some() && !saved;
        if let Some(name) = condition.filter(|_| conditioned) {
            token.add_condition(name);
        }

        hits.push(AreaHit {
            token: token.clone(),
            save,
            damage,
            conditioned,
        });
    }

    if let Some(name) = condition {
        for hit in hits.iter().filter(|h| h.conditioned) {
            let label = &hit.token.label;
            let applied = Condition::new(label.clone(), name, round)
                .with_source(Some(format!("{} effect", shape.as_str())));
            match ctx.state.conditions.iter_mut().find(|c| c.matches(label, name)) {
                Some(existing) => *existing = Condition { id: existing.id, ..applied },
                None => ctx.state.conditions.push(applied),
            }
        }
    }

    for hit in hits.iter().filter(|h| h.damage > 0 || h.conditioned) {
        ctx.emit(OutboundMessage::about_token(
            &hit.token,
            SyncMessage::TokenUpdated {
                map_id,
                token: hit.token.clone(),
            },
        ));
    }
    if hits.iter().any(|h| h.conditioned) {
        let sync = sync_broadcaster::condition_sync(ctx.state);
        ctx.emit(sync);
    }

    ctx.announce(format!(
        "A {} ft {} at ({}, {}) catches {} creature(s).",
        radius_or_length,
        shape.as_str(),
        origin_x,
        origin_y,
        hits.iter().filter(|h| h.token.visible).count()
    ));
    let save_label = save_type
        .as_deref()
        .map(|s| format!("{} save", s.to_uppercase()))
        .unwrap_or_else(|| "save".to_string());
    for hit in &hits {
        let mut parts = Vec::new();
        if let (Some((rolled, saved)), Some(dc)) = (hit.save, save_dc) {
            let verdict = if saved { "succeeds" } else { "fails" };
            parts.push(format!("{} {} ({} vs DC {})", verdict, save_label, rolled, dc));
        }
        if formula.is_some() {
            match damage_type {
                Some(kind) => parts.push(format!("takes {} {} damage", hit.damage, kind)),
                None => parts.push(format!("takes {} damage", hit.damage)),
            }
        }
        if let Some(name) = condition.filter(|_| hit.conditioned) {
            parts.push(format!("is {}", name))
        }
        let line = format!("{} {}.", hit.token.label, parts.join(", "));
        if hit.token.visible {
            ctx.announce(line);
        } else {
            ctx.notify_dm(line);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::super::test_support::*;
    use crate::domain::aggregates::SessionState;

    fn with_hp(state: &mut SessionState, hp: i32) {
        if let Some(map) = state.active_map_mut() {
            for token in &mut map.tokens {
                token.hp = Some(hp);
                token.max_hp = Some(hp);
            }
        }
    }

    fn area(extra: Value) -> Value {
        let mut action = json!({
            "action": "apply_area_effect",
            "originX": 0,
            "originY": 0,
            "radiusOrLength": 10
        });
        if let (Some(base), Some(extra)) = (action.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        action
    }

    #[test]
    fn test_sphere_hits_within_radius_only() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[("Near", 2, 0), ("Far", 3, 0)]);
        with_hp(&mut state, 10);
        let report = run(
            &mut executor,
            &mut state,
            vec![area(json!({"shape": "sphere", "damageFormula": "6", "damageType": "fire"}))],
        );
        assert_eq!(report.executed.len(), 1);
        assert_eq!(token(&state, "Near").hp, Some(4));
        assert_eq!(token(&state, "Far").hp, Some(10));
        assert!(state.chat.iter().any(|c| c.text == "Near takes 6 fire damage."));
    }

    #[test]
    fn test_failed_save_takes_full_damage() {
        let mut executor = executor([1, 3, 4]);
        let mut state = state_with_tokens(&[("Goblin 1", 1, 1)]);
        with_hp(&mut state, 20);
        run(
            &mut executor,
            &mut state,
            vec![area(json!({"damageFormula": "2d6", "saveType": "dex", "saveDC": 25, "halfOnSave": true}))],
        );
        assert_eq!(token(&state, "Goblin 1").hp, Some(13));
    }

    #[test]
    fn test_successful_save_halves_or_negates() {
        let mut executor = executor([15, 3, 4]);
        let mut state = state_with_tokens(&[("Goblin 1", 1, 1)]);
        with_hp(&mut state, 20);
        run(
            &mut executor,
            &mut state,
            vec![area(json!({"damageFormula": "2d6", "saveDC": 12}))],
        );
        assert_eq!(token(&state, "Goblin 1").hp, Some(17));

        let mut executor = super::super::test_support::executor([15, 3, 4]);
        run(
            &mut executor,
            &mut state,
            vec![area(json!({"damageFormula": "2d6", "saveDc": 12, "halfOnSave": false}))],
        );
        assert_eq!(token(&state, "Goblin 1").hp, Some(17));
    }

    #[test]
    fn test_condition_only_on_failed_saves() {
        let mut executor = executor([20, 1]);
        let mut state = state_with_tokens(&[("Aria", 0, 1), ("Bram", 1, 0)]);
        run(
            &mut executor,
            &mut state,
            vec![area(json!({"saveType": "wis", "saveDC": 10, "condition": "Frightened"}))],
        );
        assert!(token(&state, "Aria").conditions.is_empty());
        assert_eq!(token(&state, "Bram").conditions, vec!["Frightened"]);
        assert_eq!(state.conditions.len(), 1);
        assert_eq!(state.conditions[0].target, "Bram");
    }

    #[test]
    fn test_condition_without_save_hits_everyone() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[("Aria", 0, 1), ("Bram", 1, 0), ("Cato", 9, 9)]);
        run(
            &mut executor,
            &mut state,
            vec![area(json!({"shape": "cube", "condition": "Restrained"}))],
        );
        assert_eq!(state.conditions.len(), 2);
        assert!(token(&state, "Cato").conditions.is_empty());
    }

    #[test]
    fn test_hp_clamps_at_zero() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[("Kobold", 0, 0)]);
        with_hp(&mut state, 3);
        run(
            &mut executor,
            &mut state,
            vec![area(json!({"damageFormula": "10"}))],
        );
        assert_eq!(token(&state, "Kobold").hp, Some(0));
    }

    #[test]
    fn test_line_defaults_east_and_honours_direction() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[("East", 3, 0), ("South", 0, 3)]);
        with_hp(&mut state, 10);
        run(
            &mut executor,
            &mut state,
            vec![
                area(json!({"shape": "line", "radiusOrLength": 30, "damageFormula": "1"})),
                area(json!({"shape": "line", "radiusOrLength": 30, "direction": "south", "damageFormula": "2"})),
            ],
        );
        assert_eq!(token(&state, "East").hp, Some(9));
        assert_eq!(token(&state, "South").hp, Some(8));
    }

    #[test]
    fn test_invalid_area_changes_nothing() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[("Goblin 1", 0, 0)]);
        with_hp(&mut state, 7);
        let report = run(
            &mut executor,
            &mut state,
            vec![
                area(json!({"radiusOrLength": 0, "damageFormula": "1d6"})),
                area(json!({"damageFormula": "fireball"})),
                area(json!({})),
            ],
        );
        assert_eq!(report.failed.len(), 3);
        assert!(report.messages.is_empty());
        assert!(state.chat.is_empty());
        assert_eq!(token(&state, "Goblin 1").hp, Some(7));
    }
}
