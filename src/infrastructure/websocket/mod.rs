//! WebSocket handler for DM and player connections

mod messages;

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::application::services::{ApprovalDecision, ApprovalOutcome};
use crate::domain::value_objects::{ApprovalBatchId, SessionId};
use crate::infrastructure::session::{default_map, ClientId, SessionError};
use crate::infrastructure::state::AppState;

pub use messages::{ClientMessage, ParticipantRole, ServerMessage};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let client_id = ClientId::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    tracing::info!("New WebSocket connection established: {}", client_id);

    // Forward queued messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::error!("Failed to serialize server message: {}", e),
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    if let Some(response) = handle_message(msg, &state, client_id, tx.clone()).await
                    {
                        if tx.send(response).is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to parse message: {}", e);
                    let error = ServerMessage::error(
                        "PARSE_ERROR",
                        format!("Invalid message format: {}", e),
                    );
                    if tx.send(error).is_err() {
                        break;
                    }
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("WebSocket connection closed by client: {}", client_id);
                break;
            }
            Err(e) => {
                tracing::error!("WebSocket error for client {}: {}", client_id, e);
                break;
            }
            _ => {}
        }
    }

    {
        let mut sessions = state.sessions.write().await;
        if let Some((session_id, participant)) = sessions.leave_session(client_id) {
            tracing::info!(
                "Client {} (user: {}) disconnected from session {}",
                client_id,
                participant.user_id,
                session_id
            );
            if let Some(session) = sessions.get_session(session_id) {
                session.broadcast_except(
                    &ServerMessage::ParticipantLeft {
                        user_id: participant.user_id,
                    },
                    client_id,
                );
            }
        }
    }

    send_task.abort();
    tracing::info!("WebSocket connection terminated: {}", client_id);
}

fn session_error(error: SessionError) -> ServerMessage {
    let code = match &error {
        SessionError::NotFound(_) => "SESSION_NOT_FOUND",
        SessionError::ClientNotInSession(_) => "NOT_IN_SESSION",
        SessionError::DmAlreadyPresent => "DM_ALREADY_PRESENT",
        SessionError::NotDm => "NOT_AUTHORIZED",
        SessionError::NotPermitted(_) => "NOT_PERMITTED",
        SessionError::Approval(_) => "APPROVAL_ERROR",
    };
    ServerMessage::error(code, error.to_string())
}

fn parse_batch_id(raw: &str) -> Result<ApprovalBatchId, ServerMessage> {
    ApprovalBatchId::parse(raw).ok_or_else(|| {
        ServerMessage::error("INVALID_BATCH_ID", format!("Invalid batch id: {}", raw))
    })
}

/// Apply one client message; the return value goes back to the sender only
async fn handle_message(
    msg: ClientMessage,
    state: &AppState,
    client_id: ClientId,
    sender: mpsc::UnboundedSender<ServerMessage>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Heartbeat => Some(ServerMessage::Pong),

        ClientMessage::JoinSession {
            user_id,
            role,
            session_id,
            character_name,
        } => {
            tracing::info!(
                "User {} joining as {:?}, session: {:?}",
                user_id,
                role,
                session_id
            );
            let mut sessions = state.sessions.write().await;

            let session_id = match session_id {
                Some(raw) => match SessionId::parse(&raw) {
                    Some(id) => id,
                    None => {
                        return Some(ServerMessage::error(
                            "INVALID_SESSION_ID",
                            format!("Invalid session id: {}", raw),
                        ))
                    }
                },
                None if role == ParticipantRole::DungeonMaster => {
                    sessions.create_session(format!("{}'s table", user_id), vec![default_map()])
                }
                None => {
                    return Some(ServerMessage::error(
                        "SESSION_REQUIRED",
                        "Players must name the session to join",
                    ))
                }
            };

            match sessions.join_session(
                session_id,
                client_id,
                user_id.clone(),
                role,
                character_name.clone(),
                sender,
            ) {
                Ok(snapshot) => {
                    if let Some(session) = sessions.get_session(session_id) {
                        session.broadcast_except(
                            &ServerMessage::ParticipantJoined {
                                user_id,
                                role,
                                character_name,
                            },
                            client_id,
                        );
                    }
                    Some(ServerMessage::SessionJoined {
                        session_id: session_id.to_string(),
                        role,
                        snapshot: Box::new(snapshot),
                    })
                }
                Err(e) => {
                    tracing::warn!("Failed to join session: {}", e);
                    Some(session_error(e))
                }
            }
        }

        ClientMessage::SubmitDmActions { actions } => {
            let mut sessions = state.sessions.write().await;
            let session = match sessions.client_session_mut(client_id) {
                Ok(session) => session,
                Err(e) => return Some(session_error(e)),
            };
            if !session.is_dm(client_id) {
                return Some(session_error(SessionError::NotDm));
            }
            let report = session.submit_dm_actions(actions, false);
            Some(ServerMessage::from(&report))
        }

        ClientMessage::ApproveActionBatch { batch_id } => {
            let batch_id = match parse_batch_id(&batch_id) {
                Ok(id) => id,
                Err(error) => return Some(error),
            };
            let mut sessions = state.sessions.write().await;
            let session = match sessions.client_session_mut(client_id) {
                Ok(session) => session,
                Err(e) => return Some(session_error(e)),
            };
            let caller_is_dm = session.is_dm(client_id);
            match session.decide(caller_is_dm, batch_id, ApprovalDecision::Approve) {
                Ok(ApprovalOutcome::Executed(report)) => Some(ServerMessage::from(&report)),
                Ok(ApprovalOutcome::Rejected { .. }) => None,
                Err(e) => Some(session_error(e)),
            }
        }

        ClientMessage::RejectActionBatch { batch_id, reason } => {
            let batch_id = match parse_batch_id(&batch_id) {
                Ok(id) => id,
                Err(error) => return Some(error),
            };
            let mut sessions = state.sessions.write().await;
            let session = match sessions.client_session_mut(client_id) {
                Ok(session) => session,
                Err(e) => return Some(session_error(e)),
            };
            let caller_is_dm = session.is_dm(client_id);
            session
                .decide(caller_is_dm, batch_id, ApprovalDecision::Reject { reason })
                .err()
                .map(session_error)
        }

        ClientMessage::SetApprovalRequired { enabled } => {
            let mut sessions = state.sessions.write().await;
            let session = match sessions.client_session_mut(client_id) {
                Ok(session) => session,
                Err(e) => return Some(session_error(e)),
            };
            if !session.is_dm(client_id) {
                return Some(session_error(SessionError::NotDm));
            }
            session.set_require_approval(enabled);
            None
        }

        ClientMessage::PlayerMoveToken {
            label,
            grid_x,
            grid_y,
        } => {
            let mut sessions = state.sessions.write().await;
            let session = match sessions.client_session_mut(client_id) {
                Ok(session) => session,
                Err(e) => return Some(session_error(e)),
            };
            match session.player_move_token(client_id, &label, grid_x, grid_y) {
                Ok(report) => report
                    .failed
                    .first()
                    .map(|failure| ServerMessage::error("MOVE_FAILED", failure.reason.clone())),
                Err(e) => Some(session_error(e)),
            }
        }

        ClientMessage::RequestSnapshot => {
            let sessions = state.sessions.read().await;
            let snapshot = sessions
                .get_client_session(client_id)
                .and_then(|id| sessions.get_session(id))
                .and_then(|session| session.snapshot_for(client_id));
            match snapshot {
                Some(snapshot) => Some(ServerMessage::Snapshot {
                    snapshot: Box::new(snapshot),
                }),
                None => Some(session_error(SessionError::ClientNotInSession(client_id))),
            }
        }
    }
}
