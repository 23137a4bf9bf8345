//! HTTP REST API routes

mod character_routes;
mod session_routes;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::infrastructure::state::AppState;
use crate::infrastructure::websocket;

pub use session_routes::{CreateSessionRequest, MapRequest, RejectRequest, SubmitActionsRequest};

/// Create all API routes
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Session routes
        .route(
            "/api/sessions",
            get(session_routes::list_sessions).post(session_routes::create_session),
        )
        .route(
            "/api/sessions/{id}/actions",
            post(session_routes::submit_actions),
        )
        .route(
            "/api/sessions/{id}/approvals",
            get(session_routes::list_approvals),
        )
        .route(
            "/api/sessions/{id}/approvals/{batch_id}/approve",
            post(session_routes::approve_batch),
        )
        .route(
            "/api/sessions/{id}/approvals/{batch_id}/reject",
            post(session_routes::reject_batch),
        )
        .route(
            "/api/sessions/{id}/snapshot",
            get(session_routes::get_snapshot),
        )
        // Character routes
        .route(
            "/api/sessions/{id}/characters",
            put(character_routes::upsert_character),
        )
        .route(
            "/api/sessions/{id}/characters/{name}/effects",
            get(character_routes::get_effects),
        )
}

/// The full application: health check, WebSocket endpoint and REST API
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::ws_handler))
        .merge(create_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
