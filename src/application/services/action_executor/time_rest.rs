//! In-game clock, light sources and rests

use super::{ActionContext, ActionError};
use crate::application::dto::{OutboundMessage, SyncMessage};
use crate::application::services::sync_broadcaster;
use crate::domain::entities::{ActiveLightSource, Token};
use crate::domain::value_objects::{
    describe_duration, GameTime, SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE,
};

const SHORT_REST_SECONDS: u64 = SECONDS_PER_HOUR;
const LONG_REST_SECONDS: u64 = 8 * SECONDS_PER_HOUR;

/// Move the clock and burn out every light source that has run its course
fn set_clock(ctx: &mut ActionContext<'_>, time: GameTime) {
    ctx.state.time = time;
    let (expired, burning): (Vec<_>, Vec<_>) = std::mem::take(&mut ctx.state.light_sources)
        .into_iter()
        .partition(|source| source.is_expired(time));
    ctx.state.light_sources = burning;

    let sync = sync_broadcaster::time_sync(ctx.state);
    ctx.emit(sync);
    if !expired.is_empty() {
        for source in &expired {
            ctx.announce(format!(
                "{}'s {} burns out.",
                source.entity_name, source.source_name
            ));
        }
        let sync = sync_broadcaster::light_sources_sync(ctx.state);
        ctx.emit(sync);
    }
}

fn pass_time(ctx: &mut ActionContext<'_>, seconds: u64) {
    let time = ctx.state.time.advanced_by(seconds);
    set_clock(ctx, time);
}

pub(super) fn advance_time(
    ctx: &mut ActionContext<'_>,
    seconds: u64,
    minutes: u64,
    hours: u64,
    days: u64,
) -> Result<(), ActionError> {
    let total = [
        (seconds, 1),
        (minutes, SECONDS_PER_MINUTE),
        (hours, SECONDS_PER_HOUR),
        (days, SECONDS_PER_DAY),
    ]
    .into_iter()
    .try_fold(0u64, |acc, (amount, unit)| {
        amount.checked_mul(unit).and_then(|s| acc.checked_add(s))
    })
    .ok_or_else(|| ActionError::invalid("time span is too large"))?;
    if total == 0 {
        return Err(ActionError::invalid("advance_time needs a non-zero span"));
    }

    pass_time(ctx, total);
    let now = ctx.state.time;
    ctx.announce(format!("{} pass. It is now {}.", describe_duration(total), now));
    Ok(())
}

pub(super) fn set_time(
    ctx: &mut ActionContext<'_>,
    day: Option<u32>,
    hour: u32,
    minute: u32,
) -> Result<(), ActionError> {
    if hour >= 24 {
        return Err(ActionError::invalid("hour must be between 0 and 23"));
    }
    if minute >= 60 {
        return Err(ActionError::invalid("minute must be between 0 and 59"));
    }
    if day == Some(0) {
        return Err(ActionError::invalid("day starts at 1"));
    }

    let day = day.unwrap_or_else(|| ctx.state.time.day());
    set_clock(ctx, GameTime::from_parts(day, hour, minute));
    let now = ctx.state.time;
    ctx.announce(format!("It is now {}.", now));
    Ok(())
}

pub(super) fn share_time(ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
    let sync = sync_broadcaster::time_sync(ctx.state);
    ctx.emit(sync);
    let now = ctx.state.time;
    ctx.announce(format!("It is {}.", now));
    Ok(())
}

pub(super) fn light_source(
    ctx: &mut ActionContext<'_>,
    entity_name: &str,
    source_name: &str,
    duration_minutes: Option<u32>,
) -> Result<(), ActionError> {
    let (entity_name, source_name) = (entity_name.trim(), source_name.trim());
    if entity_name.is_empty() || source_name.is_empty() {
        return Err(ActionError::invalid("entityName and sourceName are required"));
    }
    if duration_minutes == Some(0) {
        return Err(ActionError::invalid("durationMinutes must be greater than zero"));
    }

    let source =
        ActiveLightSource::light(entity_name, source_name, ctx.state.time, duration_minutes);
    let lasts = source
        .expires_at
        .map(|at| describe_duration(at.total_seconds() - source.lit_at.total_seconds()));
    ctx.state
        .light_sources
        .retain(|s| !s.matches(entity_name, source_name));
    ctx.state.light_sources.push(source);

    let sync = sync_broadcaster::light_sources_sync(ctx.state);
    ctx.emit(sync);
    match lasts {
        Some(lasts) => ctx.announce(format!(
            "{} lights a {}. It will last {}.",
            entity_name, source_name, lasts
        )),
        None => ctx.announce(format!("{} lights a {}.", entity_name, source_name)),
    }
    Ok(())
}

pub(super) fn extinguish_source(
    ctx: &mut ActionContext<'_>,
    entity_name: &str,
    source_name: &str,
) -> Result<(), ActionError> {
    let index = ctx
        .state
        .light_sources
        .iter()
        .position(|s| s.matches(entity_name.trim(), source_name.trim()))
        .ok_or_else(|| {
            ActionError::not_found("Light source", format!("{} of {}", source_name, entity_name))
        })?;
    let removed = ctx.state.light_sources.remove(index);

    let sync = sync_broadcaster::light_sources_sync(ctx.state);
    ctx.emit(sync);
    ctx.announce(format!(
        "{} puts out the {}.",
        removed.entity_name, removed.source_name
    ));
    Ok(())
}

fn rest_names(character_names: &[String]) -> Result<Vec<String>, ActionError> {
    let names: Vec<String> = character_names
        .iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return Err(ActionError::invalid("characterNames must not be empty"));
    }
    Ok(names)
}

pub(super) fn short_rest(
    ctx: &mut ActionContext<'_>,
    character_names: &[String],
) -> Result<(), ActionError> {
    let names = rest_names(character_names)?;
    pass_time(ctx, SHORT_REST_SECONDS);
    for name in &names {
        ctx.announce(format!(
            "{} finishes a short rest and may spend Hit Dice to recover.",
            name
        ));
    }
    Ok(())
}

fn stands_for(token: &Token, name: &str) -> bool {
    token.label.eq_ignore_ascii_case(name)
        || token
            .entity_ref
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(name))
}

/// Top up every token standing for the character to its max hp
fn restore_hit_points(ctx: &mut ActionContext<'_>, name: &str) {
    let Some(map) = ctx.state.active_map_mut() else {
        return;
    };
    let map_id = map.id;
    let mut healed = Vec::new();
    for token in map.tokens.iter_mut().filter(|t| stands_for(t, name)) {
        if let Some(max_hp) = token.max_hp {
            if token.hp != Some(max_hp) {
                token.hp = Some(max_hp);
                healed.push(token.clone());
            }
        }
    }
    for token in healed {
        ctx.emit(OutboundMessage::about_token(
            &token,
            SyncMessage::TokenUpdated {
                map_id,
                token: token.clone(),
            },
        ));
    }
}

/// Strip exhaustion from a character and every token standing for them
fn recover_from_exhaustion(ctx: &mut ActionContext<'_>, name: &str) -> bool {
    let is_exhaustion = |condition: &str| condition.to_lowercase().contains("exhaustion");

    let mut labels = vec![name.to_string()];
    if let Some(map) = ctx.state.active_map_mut() {
        for token in map.tokens.iter_mut().filter(|t| stands_for(t, name)) {
            token.conditions.retain(|c| !is_exhaustion(c));
            labels.push(token.label.clone());
        }
    }

    let before = ctx.state.conditions.len();
    ctx.state.conditions.retain(|c| {
        !(is_exhaustion(&c.name) && labels.iter().any(|l| c.target.eq_ignore_ascii_case(l)))
    });
    before != ctx.state.conditions.len()
}

pub(super) fn long_rest(
    ctx: &mut ActionContext<'_>,
    character_names: &[String],
) -> Result<(), ActionError> {
    let names = rest_names(character_names)?;
    pass_time(ctx, LONG_REST_SECONDS);

    let mut any_recovered = false;
    for name in &names {
        restore_hit_points(ctx, name);
        if recover_from_exhaustion(ctx, name) {
            any_recovered = true;
            ctx.announce(format!(
                "{} finishes a long rest, regains all hit points and shakes off exhaustion.",
                name
            ));
        } else {
            ctx.announce(format!("{} finishes a long rest and regains all hit points.", name));
        }
    }
    if any_recovered {
        let sync = sync_broadcaster::condition_sync(ctx.state);
        ctx.emit(sync);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::test_support::*;
    use crate::application::dto::SyncMessage;
    use crate::domain::entities::Condition;
    use crate::domain::value_objects::GameTime;

    #[test]
    fn test_advance_time_sums_units() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        let report = run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "advance_time", "hours": 1, "minutes": 30}),
                json!({"action": "advance_time"}),
            ],
        );
        assert_eq!(report.executed.len(), 1);
        assert_eq!(state.time, GameTime::from_parts(1, 1, 30));
        assert_eq!(
            state.chat.back().map(|c| c.text.as_str()),
            Some("1 hour 30 minutes pass. It is now Day 1, 01:30 (deep night).")
        );
    }

    #[test]
    fn test_set_time_validates_and_keeps_day() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        state.time = GameTime::from_parts(3, 6, 0);
        let report = run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "set_time", "hour": 25}),
                json!({"action": "set_time", "hour": 21, "minute": 15}),
            ],
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(state.time, GameTime::from_parts(3, 21, 15));
    }

    #[test]
    fn test_torch_burns_out_when_time_passes() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "light_source", "entityName": "Aria", "sourceName": "Torch"}),
                json!({"action": "light_source", "entityName": "Bram", "sourceName": "Lantern"}),
                json!({"action": "advance_time", "minutes": 59}),
            ],
        );
        assert_eq!(state.light_sources.len(), 2);

        run(
            &mut executor,
            &mut state,
            vec![json!({"action": "advance_time", "minutes": 1})],
        );
        assert_eq!(state.light_sources.len(), 1);
        assert_eq!(state.light_sources[0].source_name, "Lantern");
        assert!(state.chat.iter().any(|c| c.text == "Aria's Torch burns out."));
    }

    #[test]
    fn test_extinguish_source() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        let report = run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "light_source", "entityName": "Aria", "sourceName": "Continual Flame"}),
                json!({"action": "extinguish_source", "entityName": "aria", "sourceName": "continual flame"}),
                json!({"action": "extinguish_source", "entityName": "aria", "sourceName": "continual flame"}),
            ],
        );
        assert_eq!(report.executed.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(state.light_sources.is_empty());
    }

    #[test]
    fn test_short_rest_advances_one_hour() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[]);
        let report = run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "short_rest", "characterNames": ["Aria", "Bram"]}),
                json!({"action": "short_rest", "characterNames": []}),
            ],
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(state.time, GameTime::from_parts(1, 1, 0));
        assert_eq!(state.chat.len(), 2);
    }

    #[test]
    fn test_long_rest_strips_exhaustion_only() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[("Aria", 0, 0), ("Goblin 1", 3, 3)]);
        run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "add_entity_condition", "entityLabel": "Aria", "condition": "Exhaustion", "value": 2}),
                json!({"action": "add_entity_condition", "entityLabel": "Aria", "condition": "Poisoned"}),
                json!({"action": "add_entity_condition", "entityLabel": "Goblin 1", "condition": "Exhaustion"}),
            ],
        );

        run(
            &mut executor,
            &mut state,
            vec![json!({"action": "long_rest", "characterNames": ["Aria"]})],
        );
        let remaining: Vec<(&str, &str)> = state
            .conditions
            .iter()
            .map(|c: &Condition| (c.target.as_str(), c.name.as_str()))
            .collect();
        assert_eq!(remaining, vec![("Aria", "Poisoned"), ("Goblin 1", "Exhaustion")]);
        assert_eq!(token(&state, "Aria").conditions, vec!["Poisoned"]);
        assert_eq!(state.time, GameTime::from_parts(1, 8, 0));
    }

    #[test]
    fn test_long_rest_restores_hit_points() {
        let mut executor = executor([]);
        let mut state = state_with_tokens(&[("Aria", 0, 0), ("Goblin 1", 3, 3)]);
        run(
            &mut executor,
            &mut state,
            vec![
                json!({"action": "update_token", "label": "Aria", "maxHp": 38, "hp": 9}),
                json!({"action": "update_token", "label": "Goblin 1", "maxHp": 7, "hp": 2}),
            ],
        );

        let report = run(
            &mut executor,
            &mut state,
            vec![json!({"action": "long_rest", "characterNames": ["aria"]})],
        );
        assert_eq!(token(&state, "Aria").hp, Some(38));
        assert_eq!(token(&state, "Goblin 1").hp, Some(2));
        assert!(report.messages.iter().any(|m| matches!(
            &m.message,
            SyncMessage::TokenUpdated { token, .. } if token.label == "Aria"
        )));
    }
}
