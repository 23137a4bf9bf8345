//! Label resolution - finding entities by the names producers know them by
//!
//! Producers usually only know display labels. Tokens may also be addressed
//! by id. Otherwise a case-insensitive exact match wins, then a prefix match
//! ("Goblin" finds "Goblin 1"). More than one equally good candidate is an
//! ambiguity error, never a guess.

use super::ActionError;
use crate::domain::aggregates::SessionState;
use crate::domain::entities::{GameMap, InitiativeTracker, Player};
use crate::domain::value_objects::{MapId, TokenId};

/// Index of the single best match for `label` among `names`
fn resolve_by<'a>(
    kind: &'static str,
    label: &str,
    names: impl Iterator<Item = &'a str> + Clone,
    fallback: fn(&str, &str) -> bool,
) -> Result<usize, ActionError> {
    let wanted = label.trim().to_lowercase();
    if wanted.is_empty() {
        return Err(ActionError::invalid(format!("{} label is empty", kind)));
    }

    let pick = |predicate: &dyn Fn(&str) -> bool| -> Vec<(usize, String)> {
        names
            .clone()
            .enumerate()
            .filter(|(_, name)| predicate(&name.to_lowercase()))
            .map(|(i, name)| (i, name.to_string()))
            .collect()
    };

    let exact = pick(&|name| name == wanted);
    let candidates = if exact.is_empty() {
        pick(&|name| fallback(name, &wanted))
    } else {
        exact
    };

    match candidates.len() {
        0 => Err(ActionError::not_found(kind, label)),
        1 => Ok(candidates[0].0),
        _ => Err(ActionError::Ambiguous {
            kind,
            label: label.to_string(),
            candidates: candidates.into_iter().map(|(_, name)| name).collect(),
        }),
    }
}

fn prefix(name: &str, wanted: &str) -> bool {
    name.starts_with(wanted)
}

fn substring(name: &str, wanted: &str) -> bool {
    name.contains(wanted)
}

/// Token on a map by id or label
pub(crate) fn token_on(map: &GameMap, label: &str) -> Result<TokenId, ActionError> {
    if let Some(id) = TokenId::parse(label) {
        if map.token(id).is_some() {
            return Ok(id);
        }
    }
    let index = resolve_by(
        "Token",
        label,
        map.tokens.iter().map(|t| t.label.as_str()),
        prefix,
    )?;
    Ok(map.tokens[index].id)
}

/// Token on the active map by id or label
pub(crate) fn active_token(state: &SessionState, label: &str) -> Result<TokenId, ActionError> {
    let map = state.active_map().ok_or(ActionError::NoActiveMap)?;
    token_on(map, label)
}

/// Map by exact name, then by substring
pub(crate) fn map_named(state: &SessionState, name: &str) -> Result<MapId, ActionError> {
    let index = resolve_by(
        "Map",
        name,
        state.maps.iter().map(|m| m.name.as_str()),
        substring,
    )?;
    Ok(state.maps[index].id)
}

/// Initiative entry by display name or entity reference
pub(crate) fn initiative_entry(
    tracker: &InitiativeTracker,
    label: &str,
) -> Result<usize, ActionError> {
    if !tracker.is_active() {
        return Err(ActionError::NoActiveEncounter);
    }
    if let Some(index) = tracker.find(label) {
        return Ok(index);
    }
    resolve_by(
        "Combatant",
        label,
        tracker.entries().iter().map(|e| e.name.as_str()),
        prefix,
    )
}

/// Player by display name or their character's name
pub(crate) fn player<'a>(state: &'a SessionState, name: &str) -> Result<&'a Player, ActionError> {
    let matches: Vec<&Player> = state.players.iter().filter(|p| p.answers_to(name)).collect();
    match matches.as_slice() {
        [] => Err(ActionError::not_found("Player", name)),
        [player] => Ok(*player),
        _ => Err(ActionError::Ambiguous {
            kind: "Player",
            label: name.to_string(),
            candidates: matches.iter().map(|p| p.name.clone()).collect(),
        }),
    }
}
