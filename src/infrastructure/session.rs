//! Session management for active game sessions
//!
//! Each `GameSession` owns the authoritative `SessionState`, the executor
//! that mutates it and the connected participants. The `SessionManager` is
//! held behind a single `RwLock` in the app state, so every mutation of a
//! session happens under the write lock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::application::dto::{ExecutionReport, OutboundMessage, SessionSnapshot, SyncMessage};
use crate::application::ports::outbound::{BroadcastPort, CreatureCatalog};
use crate::application::services::sync_broadcaster;
use crate::application::services::{
    ApprovalDecision, ApprovalError, ApprovalOutcome, ApprovalService, DmActionExecutor,
    MAX_BATCH_SIZE,
};
use crate::domain::aggregates::{SessionSettings, SessionState};
use crate::domain::entities::{Audience, Character, ChatEntry, GameMap, Player};
use crate::domain::services::{resolve_effects, ResolvedEffects};
use crate::domain::value_objects::{ApprovalBatchId, RandomRoller, SessionId};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::websocket::{ParticipantRole, ServerMessage};

/// Unique identifier for a connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(uuid::Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A participant in a game session
#[derive(Debug, Clone)]
pub struct SessionParticipant {
    pub client_id: ClientId,
    pub user_id: String,
    pub role: ParticipantRole,
    pub character_name: Option<String>,
    pub joined_at: DateTime<Utc>,
    /// Channel to send messages to this participant
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

impl SessionParticipant {
    fn receives(&self, audience: &Audience) -> bool {
        match (audience, self.role) {
            (Audience::Everyone, _) => true,
            (Audience::DmOnly, role) => role == ParticipantRole::DungeonMaster,
            (Audience::Players, role) => role == ParticipantRole::Player,
            // The DM sees whispers they send
            (Audience::Player(_), ParticipantRole::DungeonMaster) => true,
            (Audience::Player(name), ParticipantRole::Player) => {
                self.user_id.eq_ignore_ascii_case(name)
                    || self
                        .character_name
                        .as_deref()
                        .is_some_and(|c| c.eq_ignore_ascii_case(name))
            }
        }
    }
}

/// Listing entry for a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub name: String,
    pub dm_user_id: Option<String>,
    pub participant_count: usize,
    pub pending_approvals: usize,
    pub created_at: DateTime<Utc>,
}

/// Error types for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Client not in any session: {0}")]
    ClientNotInSession(ClientId),

    #[error("Session already has a DM")]
    DmAlreadyPresent,

    #[error("Only the DM may do that")]
    NotDm,

    #[error("Not permitted: {0}")]
    NotPermitted(String),

    #[error(transparent)]
    Approval(#[from] ApprovalError),
}

/// An active game session
pub struct GameSession {
    pub id: SessionId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// User ID of the DM who owns this session
    pub dm_user_id: Option<String>,
    pub state: SessionState,
    executor: DmActionExecutor,
    approvals: ApprovalService,
    pub participants: HashMap<ClientId, SessionParticipant>,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("participants", &self.participants.len())
            .finish_non_exhaustive()
    }
}

impl BroadcastPort for GameSession {
    fn deliver(&self, message: &OutboundMessage) -> usize {
        let server_message = ServerMessage::Sync {
            message: message.message.clone(),
        };
        let mut delivered = 0;
        for participant in self
            .participants
            .values()
            .filter(|p| p.receives(&message.audience))
        {
            match participant.sender.send(server_message.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(
                    "Failed to send message to client {}: {}",
                    participant.client_id,
                    e
                ),
            }
        }
        delivered
    }
}

impl GameSession {
    pub fn new(
        id: SessionId,
        name: impl Into<String>,
        state: SessionState,
        executor: DmActionExecutor,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            created_at: Utc::now(),
            dm_user_id: None,
            state,
            executor,
            approvals: ApprovalService::new(),
            participants: HashMap::new(),
        }
    }

    // ========================================================================
    // Participants
    // ========================================================================

    pub fn add_participant(
        &mut self,
        client_id: ClientId,
        user_id: String,
        role: ParticipantRole,
        character_name: Option<String>,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) {
        if role == ParticipantRole::Player {
            self.state.add_player(Player {
                name: user_id.clone(),
                character_name: character_name.clone(),
            });
        }
        let participant = SessionParticipant {
            client_id,
            user_id,
            role,
            character_name,
            joined_at: Utc::now(),
            sender,
        };
        self.participants.insert(client_id, participant);
    }

    pub fn remove_participant(&mut self, client_id: ClientId) -> Option<SessionParticipant> {
        self.participants.remove(&client_id)
    }

    pub fn participant(&self, client_id: ClientId) -> Option<&SessionParticipant> {
        self.participants.get(&client_id)
    }

    pub fn is_dm(&self, client_id: ClientId) -> bool {
        self.participant(client_id)
            .is_some_and(|p| p.role == ParticipantRole::DungeonMaster)
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Send a host message to every participant except one
    pub fn broadcast_except(&self, message: &ServerMessage, exclude: ClientId) {
        for participant in self.participants.values() {
            if participant.client_id != exclude {
                if let Err(e) = participant.sender.send(message.clone()) {
                    tracing::warn!(
                        "Failed to send message to client {}: {}",
                        participant.client_id,
                        e
                    );
                }
            }
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id,
            name: self.name.clone(),
            dm_user_id: self.dm_user_id.clone(),
            participant_count: self.participants.len(),
            pending_approvals: self.state.pending_batches.len(),
            created_at: self.created_at,
        }
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    pub fn snapshot_for_role(&self, role: ParticipantRole, user_id: &str) -> SessionSnapshot {
        match role {
            ParticipantRole::DungeonMaster => SessionSnapshot::for_dm(&self.state),
            ParticipantRole::Player => SessionSnapshot::for_player(&self.state, user_id),
        }
    }

    pub fn snapshot_for(&self, client_id: ClientId) -> Option<SessionSnapshot> {
        self.participant(client_id)
            .map(|p| self.snapshot_for_role(p.role, &p.user_id))
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Run a DM batch and deliver the resulting sync messages
    pub fn submit_dm_actions(
        &mut self,
        actions: Vec<serde_json::Value>,
        bypass_approval: bool,
    ) -> ExecutionReport {
        let mut report = self
            .executor
            .execute_dm_actions(&mut self.state, actions, bypass_approval);
        let messages = report.take_messages();
        sync_broadcaster::publish(&*self, &messages);
        report
    }

    pub fn pending_approvals(&self) -> &[crate::domain::aggregates::PendingActionBatch] {
        self.approvals.pending(&self.state)
    }

    /// Approve or reject a queued batch and deliver the outcome
    pub fn decide(
        &mut self,
        caller_is_dm: bool,
        batch_id: ApprovalBatchId,
        decision: ApprovalDecision,
    ) -> Result<ApprovalOutcome, SessionError> {
        let mut outcome = self.approvals.process_decision(
            &mut self.executor,
            &mut self.state,
            caller_is_dm,
            batch_id,
            decision,
        )?;
        let messages = match &mut outcome {
            ApprovalOutcome::Executed(report) => report.take_messages(),
            ApprovalOutcome::Rejected { messages, .. } => std::mem::take(messages),
        };
        sync_broadcaster::publish(&*self, &messages);
        Ok(outcome)
    }

    pub fn set_require_approval(&mut self, enabled: bool) {
        self.state.settings.require_approval = enabled;
        tracing::info!(session_id = %self.id, enabled, "Approval requirement changed");

        let text = if enabled {
            "DM actions now require approval."
        } else {
            "DM actions no longer require approval."
        };
        let entry = ChatEntry::system(text).to(Audience::DmOnly);
        self.state.push_chat(entry.clone());
        self.deliver(&OutboundMessage::dm_only(SyncMessage::Chat { entry }));
    }

    /// Move a player's own token; runs as a `move_token` action without approval
    pub fn player_move_token(
        &mut self,
        client_id: ClientId,
        label: &str,
        grid_x: i32,
        grid_y: i32,
    ) -> Result<ExecutionReport, SessionError> {
        let participant = self
            .participant(client_id)
            .ok_or(SessionError::ClientNotInSession(client_id))?;
        let Some(character) = participant.character_name.clone() else {
            return Err(SessionError::NotPermitted(
                "you have no character in this session".to_string(),
            ));
        };

        let owns_token = self.state.active_tokens().iter().any(|t| {
            t.label.eq_ignore_ascii_case(label)
                && (t.label.eq_ignore_ascii_case(&character)
                    || t
                        .entity_ref
                        .as_deref()
                        .is_some_and(|r| r.eq_ignore_ascii_case(&character)))
        });
        if !owns_token {
            return Err(SessionError::NotPermitted(format!(
                "{} is not {}'s token",
                label, character
            )));
        }

        Ok(self.submit_dm_actions(
            vec![json!({
                "action": "move_token",
                "label": label,
                "gridX": grid_x,
                "gridY": grid_y
            })],
            true,
        ))
    }

    // ========================================================================
    // Characters
    // ========================================================================

    pub fn upsert_character(&mut self, character: Character) {
        tracing::debug!(
            session_id = %self.id,
            character = %character.name,
            "Character sheet saved"
        );
        self.state.upsert_character(character);
    }

    /// Current effect bundle for a character sheet
    pub fn resolved_effects(&self, name: &str) -> Option<ResolvedEffects> {
        self.state
            .character(name)
            .map(|c| resolve_effects(c, &self.state.custom_effects))
    }
}

/// Map a session starts with when none is supplied
pub fn default_map() -> GameMap {
    GameMap::new("Battlefield", 30, 30)
}

/// Manages active game sessions
pub struct SessionManager {
    sessions: HashMap<SessionId, GameSession>,
    /// Maps client IDs to their current session
    client_sessions: HashMap<ClientId, SessionId>,
    catalog: Arc<dyn CreatureCatalog>,
    settings: SessionSettings,
    max_batch_size: usize,
    /// Base seed; each new session gets the next value
    dice_seed: Option<u64>,
    created: u64,
}

impl SessionManager {
    pub fn new(catalog: Arc<dyn CreatureCatalog>) -> Self {
        Self {
            sessions: HashMap::new(),
            client_sessions: HashMap::new(),
            catalog,
            settings: SessionSettings::default(),
            max_batch_size: MAX_BATCH_SIZE,
            dice_seed: None,
            created: 0,
        }
    }

    pub fn from_config(config: &AppConfig, catalog: Arc<dyn CreatureCatalog>) -> Self {
        Self {
            settings: config.session_settings(),
            max_batch_size: config.max_batch_size,
            dice_seed: config.dice_seed,
            ..Self::new(catalog)
        }
    }

    fn new_executor(&mut self) -> DmActionExecutor {
        let roller = match self.dice_seed {
            Some(seed) => RandomRoller::seeded(seed.wrapping_add(self.created)),
            None => RandomRoller::new(),
        };
        self.created += 1;
        DmActionExecutor::new(Box::new(roller), Arc::clone(&self.catalog))
            .with_max_batch_size(self.max_batch_size)
    }

    /// Create a session; the first map becomes active
    pub fn create_session(&mut self, name: impl Into<String>, maps: Vec<GameMap>) -> SessionId {
        self.create_session_with(name, maps, self.settings)
    }

    pub fn create_session_with(
        &mut self,
        name: impl Into<String>,
        maps: Vec<GameMap>,
        settings: SessionSettings,
    ) -> SessionId {
        let mut state = SessionState::new(settings);
        for map in maps {
            state.add_map(map);
        }

        let session_id = SessionId::new();
        let executor = self.new_executor();
        let session = GameSession::new(session_id, name, state, executor);
        tracing::info!(
            "Created new session {} ({}) with {} map(s)",
            session_id,
            session.name,
            session.state.maps.len()
        );
        self.sessions.insert(session_id, session);
        session_id
    }

    /// Join a session; returns the joiner's snapshot
    pub fn join_session(
        &mut self,
        session_id: SessionId,
        client_id: ClientId,
        user_id: String,
        role: ParticipantRole,
        character_name: Option<String>,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<SessionSnapshot, SessionError> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;

        // Several tabs of the same DM may connect
        if role == ParticipantRole::DungeonMaster {
            match &session.dm_user_id {
                Some(dm) if *dm != user_id => return Err(SessionError::DmAlreadyPresent),
                Some(_) => {}
                None => session.dm_user_id = Some(user_id.clone()),
            }
        }

        session.add_participant(client_id, user_id.clone(), role, character_name, sender);
        self.client_sessions.insert(client_id, session_id);

        tracing::info!(
            "Client {} (user: {}) joined session {} as {:?}",
            client_id,
            user_id,
            session_id,
            role
        );

        Ok(session.snapshot_for_role(role, &user_id))
    }

    /// Leave a session; the session and its state stay alive
    pub fn leave_session(
        &mut self,
        client_id: ClientId,
    ) -> Option<(SessionId, SessionParticipant)> {
        let session_id = self.client_sessions.remove(&client_id)?;
        let session = self.sessions.get_mut(&session_id)?;
        let participant = session.remove_participant(client_id)?;
        tracing::info!(
            "Client {} left session {} (user: {})",
            client_id,
            session_id,
            participant.user_id
        );
        Some((session_id, participant))
    }

    pub fn get_session(&self, session_id: SessionId) -> Option<&GameSession> {
        self.sessions.get(&session_id)
    }

    pub fn get_session_mut(&mut self, session_id: SessionId) -> Option<&mut GameSession> {
        self.sessions.get_mut(&session_id)
    }

    pub fn get_client_session(&self, client_id: ClientId) -> Option<SessionId> {
        self.client_sessions.get(&client_id).copied()
    }

    /// The session a client is connected to
    pub fn client_session_mut(
        &mut self,
        client_id: ClientId,
    ) -> Result<&mut GameSession, SessionError> {
        let session_id = self
            .get_client_session(client_id)
            .ok_or(SessionError::ClientNotInSession(client_id))?;
        self.sessions
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound(session_id))
    }

    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self.sessions.values().map(GameSession::info).collect();
        infos.sort_by_key(|info| info.created_at);
        infos
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::domain::entities::Token;
    use crate::infrastructure::creature_catalog::InMemoryCreatureCatalog;

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(InMemoryCreatureCatalog::with_builtins()))
    }

    fn battlefield() -> GameMap {
        let mut map = GameMap::new("Battlefield", 20, 20);
        let mut aria = Token::new("Aria", 1, 1);
        aria.entity_ref = Some("Aria".into());
        map.tokens.push(aria);
        map.tokens.push(Token::new("Bram", 2, 2));
        map
    }

    fn join(
        manager: &mut SessionManager,
        session_id: SessionId,
        user: &str,
        role: ParticipantRole,
        character: Option<&str>,
    ) -> (ClientId, UnboundedReceiver<ServerMessage>) {
        let client_id = ClientId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        manager
            .join_session(
                session_id,
                client_id,
                user.to_string(),
                role,
                character.map(str::to_string),
                tx,
            )
            .unwrap();
        (client_id, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn chat_texts(messages: &[ServerMessage]) -> Vec<String> {
        messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::Sync {
                    message: SyncMessage::Chat { entry },
                } => Some(entry.text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_create_and_join_session() {
        let mut manager = manager();
        let session_id = manager.create_session("Crypt", vec![battlefield()]);
        let (client_id, _rx) = join(
            &mut manager,
            session_id,
            "sam",
            ParticipantRole::Player,
            Some("Aria"),
        );

        assert_eq!(manager.get_client_session(client_id), Some(session_id));
        let session = manager.get_session(session_id).unwrap();
        assert_eq!(session.state.players.len(), 1);
        assert_eq!(session.state.players[0].character_name.as_deref(), Some("Aria"));
        assert_eq!(manager.list_sessions()[0].participant_count, 1);
    }

    #[test]
    fn test_second_dm_is_rejected_but_same_dm_can_reconnect() {
        let mut manager = manager();
        let session_id = manager.create_session("Crypt", vec![]);
        join(&mut manager, session_id, "dm1", ParticipantRole::DungeonMaster, None);

        let (tx, _rx) = mpsc::unbounded_channel();
        let result = manager.join_session(
            session_id,
            ClientId::new(),
            "dm2".into(),
            ParticipantRole::DungeonMaster,
            None,
            tx,
        );
        assert!(matches!(result, Err(SessionError::DmAlreadyPresent)));

        join(&mut manager, session_id, "dm1", ParticipantRole::DungeonMaster, None);
    }

    #[test]
    fn test_leave_keeps_session_state() {
        let mut manager = manager();
        let session_id = manager.create_session("Crypt", vec![battlefield()]);
        let (client_id, _rx) = join(&mut manager, session_id, "sam", ParticipantRole::Player, None);

        let (left, participant) = manager.leave_session(client_id).unwrap();
        assert_eq!(left, session_id);
        assert_eq!(participant.user_id, "sam");
        assert!(manager.get_client_session(client_id).is_none());
        assert!(manager.get_session(session_id).unwrap().is_empty());
        assert!(manager.leave_session(client_id).is_none());
    }

    #[test]
    fn test_messages_route_by_audience() {
        let mut manager = manager();
        let session_id = manager.create_session("Crypt", vec![battlefield()]);
        let (_, mut dm) = join(
            &mut manager,
            session_id,
            "dm",
            ParticipantRole::DungeonMaster,
            None,
        );
        let (_, mut sam) = join(
            &mut manager,
            session_id,
            "sam",
            ParticipantRole::Player,
            Some("Aria"),
        );
        let (_, mut alex) = join(
            &mut manager,
            session_id,
            "alex",
            ParticipantRole::Player,
            Some("Bram"),
        );

        let session = manager.get_session_mut(session_id).unwrap();
        let report = session.submit_dm_actions(
            vec![
                json!({"action": "system_message", "message": "Roll for initiative"}),
                json!({"action": "hidden_dice_roll", "formula": "1d20", "reason": "perception"}),
                json!({"action": "whisper_player", "playerName": "Aria", "message": "You hear scratching"}),
            ],
            false,
        );
        assert_eq!(report.failed, vec![], "{:?}", report.failure_lines());

        let dm_chat = chat_texts(&drain(&mut dm));
        let sam_chat = chat_texts(&drain(&mut sam));
        let alex_chat = chat_texts(&drain(&mut alex));
        assert!(dm_chat.iter().any(|t| t == "You hear scratching"));
        assert!(sam_chat.iter().any(|t| t == "You hear scratching"));
        assert!(!alex_chat.iter().any(|t| t == "You hear scratching"));
        assert!(alex_chat.iter().any(|t| t == "Roll for initiative"));
        assert!(dm_chat.len() > alex_chat.len());
    }

    #[test]
    fn test_closed_channels_do_not_count() {
        let mut manager = manager();
        let session_id = manager.create_session("Crypt", vec![battlefield()]);
        let (_, rx) = join(&mut manager, session_id, "dm", ParticipantRole::DungeonMaster, None);
        drop(rx);

        let session = manager.get_session(session_id).unwrap();
        let delivered = session.deliver(&OutboundMessage::everyone(SyncMessage::TimerStopped));
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_approval_flow_through_session() {
        let mut manager = manager();
        let session_id = manager.create_session("Crypt", vec![battlefield()]);
        let (dm_id, mut dm) = join(
            &mut manager,
            session_id,
            "dm",
            ParticipantRole::DungeonMaster,
            None,
        );
        let (sam_id, _sam) = join(
            &mut manager,
            session_id,
            "sam",
            ParticipantRole::Player,
            Some("Aria"),
        );

        let session = manager.get_session_mut(session_id).unwrap();
        session.set_require_approval(true);
        let report = session.submit_dm_actions(
            vec![json!({"action": "move_token", "label": "Bram", "gridX": 9, "gridY": 9})],
            false,
        );
        let batch_id = report.queued_batch_id.unwrap();
        assert_eq!(session.pending_approvals().len(), 1);
        assert!(drain(&mut dm).iter().any(|m| matches!(
            m,
            ServerMessage::Sync {
                message: SyncMessage::ApprovalRequired { .. }
            }
        )));

        let denied = session.decide(session.is_dm(sam_id), batch_id, ApprovalDecision::Approve);
        assert!(matches!(denied, Err(SessionError::Approval(ApprovalError::NotAuthorized))));

        let outcome = session
            .decide(session.is_dm(dm_id), batch_id, ApprovalDecision::Approve)
            .unwrap();
        assert!(matches!(outcome, ApprovalOutcome::Executed(ref r) if r.executed.len() == 1));
        let bram = session.state.active_tokens().iter().find(|t| t.label == "Bram").unwrap();
        assert_eq!((bram.grid_x, bram.grid_y), (9, 9));
    }

    #[test]
    fn test_players_move_only_their_own_token() {
        let mut manager = manager();
        let session_id = manager.create_session("Crypt", vec![battlefield()]);
        let (sam_id, _sam) = join(
            &mut manager,
            session_id,
            "sam",
            ParticipantRole::Player,
            Some("Aria"),
        );
        let (alex_id, _alex) = join(
            &mut manager,
            session_id,
            "alex",
            ParticipantRole::Player,
            None,
        );

        let session = manager.get_session_mut(session_id).unwrap();
        session.set_require_approval(true);
        let report = session.player_move_token(sam_id, "Aria", 4, 5).unwrap();
        assert_eq!(report.executed.len(), 1);
        assert!(session.pending_approvals().is_empty());

        assert!(matches!(
            session.player_move_token(sam_id, "Bram", 0, 0),
            Err(SessionError::NotPermitted(_))
        ));
        assert!(matches!(
            session.player_move_token(alex_id, "Aria", 0, 0),
            Err(SessionError::NotPermitted(_))
        ));
        let aria = session.state.active_tokens().iter().find(|t| t.label == "Aria").unwrap();
        assert_eq!((aria.grid_x, aria.grid_y), (4, 5));
    }

    #[test]
    fn test_seeded_sessions_are_reproducible() {
        let config = AppConfig {
            dice_seed: Some(42),
            ..AppConfig::default()
        };
        let roll = |manager: &mut SessionManager| {
            let session_id = manager.create_session("Crypt", vec![]);
            let session = manager.get_session_mut(session_id).unwrap();
            session.submit_dm_actions(vec![json!({"action": "hidden_dice_roll", "formula": "10d20"})], false);
            session.state.chat.back().map(|c| c.text.clone())
        };

        let catalog: Arc<dyn CreatureCatalog> = Arc::new(InMemoryCreatureCatalog::with_builtins());
        let first = roll(&mut SessionManager::from_config(&config, Arc::clone(&catalog)));
        let second = roll(&mut SessionManager::from_config(&config, catalog));
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolved_effects_for_saved_sheet() {
        let mut manager = manager();
        let session_id = manager.create_session("Crypt", vec![]);
        let session = manager.get_session_mut(session_id).unwrap();
        session.upsert_character(Character::new("Aria", 5).with_feat("Alert"));

        assert!(session.resolved_effects("aria").is_some());
        assert!(session.resolved_effects("Nobody").is_none());
    }
}
