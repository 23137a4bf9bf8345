//! Session API routes
//!
//! Used by producers outside the table, such as an AI planner submitting DM
//! action batches. Callers here act with DM authority.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::application::dto::{ExecutionReport, SessionSnapshot};
use crate::application::services::{ApprovalDecision, ApprovalOutcome};
use crate::domain::aggregates::PendingActionBatch;
use crate::domain::entities::GameMap;
use crate::domain::value_objects::{ApprovalBatchId, SessionId};
use crate::infrastructure::session::{default_map, SessionError, SessionInfo};
use crate::infrastructure::state::AppState;

type ApiError = (StatusCode, String);

pub(super) fn parse_session_id(raw: &str) -> Result<SessionId, ApiError> {
    SessionId::parse(raw).ok_or_else(|| (StatusCode::BAD_REQUEST, "Invalid session ID".to_string()))
}

pub(super) fn not_found(session_id: SessionId) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        SessionError::NotFound(session_id).to_string(),
    )
}

#[derive(Debug, Deserialize)]
pub struct MapRequest {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// Maps to load; the first becomes active
    #[serde(default)]
    pub maps: Vec<MapRequest>,
    #[serde(default)]
    pub require_approval: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitActionsRequest {
    pub actions: Vec<serde_json::Value>,
    #[serde(default)]
    pub bypass_approval: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Create a session
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionInfo>), ApiError> {
    if let Some(map) = req.maps.iter().find(|m| m.width == 0 || m.height == 0) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Map '{}' must have a non-zero size", map.name),
        ));
    }
    let maps = if req.maps.is_empty() {
        vec![default_map()]
    } else {
        req.maps
            .into_iter()
            .map(|m| GameMap::new(m.name, m.width, m.height))
            .collect()
    };

    let mut settings = state.config.session_settings();
    if let Some(require_approval) = req.require_approval {
        settings.require_approval = require_approval;
    }

    let mut sessions = state.sessions.write().await;
    let session_id = sessions.create_session_with(
        req.name.unwrap_or_else(|| "Untitled session".to_string()),
        maps,
        settings,
    );
    let info = sessions
        .get_session(session_id)
        .map(|s| s.info())
        .ok_or_else(|| not_found(session_id))?;

    Ok((StatusCode::CREATED, Json(info)))
}

/// List all sessions
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionInfo>> {
    Json(state.sessions.read().await.list_sessions())
}

/// Submit a batch of DM actions
pub async fn submit_actions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SubmitActionsRequest>,
) -> Result<Json<ExecutionReport>, ApiError> {
    let session_id = parse_session_id(&id)?;
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_session_mut(session_id)
        .ok_or_else(|| not_found(session_id))?;

    Ok(Json(session.submit_dm_actions(req.actions, req.bypass_approval)))
}

/// Batches awaiting DM approval
pub async fn list_approvals(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PendingActionBatch>>, ApiError> {
    let session_id = parse_session_id(&id)?;
    let sessions = state.sessions.read().await;
    let session = sessions
        .get_session(session_id)
        .ok_or_else(|| not_found(session_id))?;

    Ok(Json(session.pending_approvals().to_vec()))
}

async fn decide(
    state: &AppState,
    id: &str,
    batch_id: &str,
    decision: ApprovalDecision,
) -> Result<ApprovalOutcome, ApiError> {
    let session_id = parse_session_id(id)?;
    let batch_id = ApprovalBatchId::parse(batch_id)
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "Invalid batch ID".to_string()))?;

    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_session_mut(session_id)
        .ok_or_else(|| not_found(session_id))?;

    session
        .decide(true, batch_id, decision)
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))
}

/// Approve a queued batch and run it
pub async fn approve_batch(
    State(state): State<Arc<AppState>>,
    Path((id, batch_id)): Path<(String, String)>,
) -> Result<Json<ExecutionReport>, ApiError> {
    match decide(&state, &id, &batch_id, ApprovalDecision::Approve).await? {
        ApprovalOutcome::Executed(report) => Ok(Json(report)),
        ApprovalOutcome::Rejected { .. } => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Approval produced a rejection".to_string(),
        )),
    }
}

/// Reject a queued batch without running it
pub async fn reject_batch(
    State(state): State<Arc<AppState>>,
    Path((id, batch_id)): Path<(String, String)>,
    Json(req): Json<RejectRequest>,
) -> Result<StatusCode, ApiError> {
    decide(
        &state,
        &id,
        &batch_id,
        ApprovalDecision::Reject { reason: req.reason },
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Full DM view of a session
pub async fn get_snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session_id = parse_session_id(&id)?;
    let sessions = state.sessions.read().await;
    let session = sessions
        .get_session(session_id)
        .ok_or_else(|| not_found(session_id))?;

    Ok(Json(SessionSnapshot::for_dm(&session.state)))
}
