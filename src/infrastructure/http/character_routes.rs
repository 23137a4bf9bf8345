//! Character sheet API routes

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::session_routes::{not_found, parse_session_id};
use crate::domain::entities::Character;
use crate::domain::services::ResolvedEffects;
use crate::infrastructure::state::AppState;

const MAX_CHARACTER_LEVEL: u32 = 30;

/// Insert or replace a character sheet by name
pub async fn upsert_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(character): Json<Character>,
) -> Result<Json<Character>, (StatusCode, String)> {
    if character.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Character name must not be empty".to_string(),
        ));
    }
    if !(1..=MAX_CHARACTER_LEVEL).contains(&character.level) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Character level must be between 1 and {}", MAX_CHARACTER_LEVEL),
        ));
    }
    let session_id = parse_session_id(&id)?;
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_session_mut(session_id)
        .ok_or_else(|| not_found(session_id))?;

    session.upsert_character(character.clone());
    Ok(Json(character))
}

/// Resolved mechanical effects for a character
pub async fn get_effects(
    State(state): State<Arc<AppState>>,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<ResolvedEffects>, (StatusCode, String)> {
    let session_id = parse_session_id(&id)?;
    let sessions = state.sessions.read().await;
    let session = sessions
        .get_session(session_id)
        .ok_or_else(|| not_found(session_id))?;

    session
        .resolved_effects(&name)
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Character not found: {}", name)))
}
