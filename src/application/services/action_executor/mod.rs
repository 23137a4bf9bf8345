//! DM Action Executor - Applies batches of DM actions to the session state
//!
//! Batches come from the DM's client or an AI planner as raw JSON records.
//! Each record is parsed into a [`DmAction`] and applied independently: one
//! failing action is recorded in the report and the rest of the batch still
//! runs. There is no all-or-nothing semantics across a batch.
//!
//! When the session requires approval the whole batch is queued instead, and
//! nothing is mutated until it is resubmitted with `bypass_approval`.

mod area_effect;
mod communication;
mod environment;
mod initiative;
mod resolve;
mod time_rest;
mod tokens;

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::application::dto::{ExecutionReport, FailedAction, OutboundMessage, SyncMessage};
use crate::application::ports::outbound::CreatureCatalog;
use crate::domain::aggregates::{PendingActionBatch, SessionState};
use crate::domain::entities::{Audience, ChatEntry};
use crate::domain::value_objects::{ApprovalBatchId, DiceError, DiceRoller, DmAction};

/// Largest batch executed in one call; the tail of longer batches is dropped
pub const MAX_BATCH_SIZE: usize = 50;

/// Why a single action failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// Missing or malformed fields
    #[error("Invalid action: {0}")]
    Validation(String),

    #[error("{kind} not found: {label}")]
    NotFound { kind: &'static str, label: String },

    #[error("{kind} '{label}' is ambiguous, matches: {}", .candidates.join(", "))]
    Ambiguous {
        kind: &'static str,
        label: String,
        candidates: Vec<String>,
    },

    #[error("No active map")]
    NoActiveMap,

    #[error("No active encounter")]
    NoActiveEncounter,

    #[error("{0}")]
    InsufficientResource(String),

    #[error("Unknown DM action: {0}")]
    UnknownAction(String),

    #[error(transparent)]
    Dice(#[from] DiceError),
}

impl ActionError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn not_found(kind: &'static str, label: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            label: label.into(),
        }
    }
}

/// Everything a handler may touch while applying one action
pub(crate) struct ActionContext<'a> {
    pub state: &'a mut SessionState,
    pub roller: &'a mut dyn DiceRoller,
    pub catalog: &'a dyn CreatureCatalog,
    pub outbox: &'a mut Vec<OutboundMessage>,
}

impl ActionContext<'_> {
    pub fn emit(&mut self, message: OutboundMessage) {
        self.outbox.push(message);
    }

    pub fn emit_all(&mut self, messages: impl IntoIterator<Item = OutboundMessage>) {
        self.outbox.extend(messages);
    }

    /// Record a chat line and send it to its audience
    pub fn chat(&mut self, entry: ChatEntry) {
        let message = OutboundMessage {
            audience: entry.audience.clone(),
            message: SyncMessage::Chat {
                entry: entry.clone(),
            },
        };
        self.state.push_chat(entry);
        self.outbox.push(message);
    }

    /// System line visible to the whole table
    pub fn announce(&mut self, text: impl Into<String>) {
        self.chat(ChatEntry::system(text));
    }

    /// System line visible only to the DM
    pub fn notify_dm(&mut self, text: impl Into<String>) {
        self.chat(ChatEntry::system(text).to(Audience::DmOnly));
    }
}

/// Executes DM actions against a session's authoritative state
pub struct DmActionExecutor {
    roller: Box<dyn DiceRoller>,
    catalog: Arc<dyn CreatureCatalog>,
    max_batch_size: usize,
}

impl DmActionExecutor {
    pub fn new(roller: Box<dyn DiceRoller>, catalog: Arc<dyn CreatureCatalog>) -> Self {
        Self {
            roller,
            catalog,
            max_batch_size: MAX_BATCH_SIZE,
        }
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Execute a batch of raw actions.
    ///
    /// Unless `bypass_approval` is set, a non-empty batch for a session that
    /// requires approval is queued whole and the report carries the batch id.
    /// Otherwise at most `max_batch_size` actions run, in order; the number
    /// dropped is reported as `truncated`. Never fails as a whole.
    #[instrument(skip(self, state, actions), fields(count = actions.len()))]
    pub fn execute_dm_actions(
        &mut self,
        state: &mut SessionState,
        mut actions: Vec<Value>,
        bypass_approval: bool,
    ) -> ExecutionReport {
        if !bypass_approval && state.settings.require_approval && !actions.is_empty() {
            return self.queue_for_approval(state, actions);
        }

        let mut report = ExecutionReport::default();
        if actions.len() > self.max_batch_size {
            report.truncated = actions.len() - self.max_batch_size;
            warn!(
                submitted = actions.len(),
                max = self.max_batch_size,
                dropped = report.truncated,
                "DM action batch truncated"
            );
            actions.truncate(self.max_batch_size);
        }

        let mut outbox = Vec::new();
        for raw in actions {
            let checkpoint = outbox.len();
            let mut ctx = ActionContext {
                state: &mut *state,
                roller: self.roller.as_mut(),
                catalog: self.catalog.as_ref(),
                outbox: &mut outbox,
            };

            match parse_action(&raw).and_then(|action| {
                apply(&mut ctx, &action)?;
                Ok(action)
            }) {
                Ok(action) => report.executed.push(action),
                Err(error) => {
                    warn!(error = %error, "DM action failed");
                    outbox.truncate(checkpoint);
                    report.failed.push(FailedAction {
                        action: raw,
                        reason: error.to_string(),
                    });
                }
            }
        }

        report.messages = outbox;
        report
    }

    fn queue_for_approval(&self, state: &mut SessionState, actions: Vec<Value>) -> ExecutionReport {
        let batch = PendingActionBatch {
            id: ApprovalBatchId::new(),
            summary: actions.iter().map(summarize).collect(),
            actions,
            requested_at: Utc::now(),
        };
        info!(
            batch_id = %batch.id,
            actions = batch.actions.len(),
            "DM action batch queued for approval"
        );

        let message = OutboundMessage::dm_only(SyncMessage::ApprovalRequired {
            batch_id: batch.id,
            summary: batch.summary.clone(),
        });
        let id = batch.id;
        state.pending_batches.push(batch);
        ExecutionReport::queued(id, vec![message])
    }
}

/// Parse one raw record, separating unknown tags from malformed fields
pub(crate) fn parse_action(raw: &Value) -> Result<DmAction, ActionError> {
    let tag = raw
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| ActionError::invalid("missing \"action\" tag"))?;
    if !DmAction::is_known(tag) {
        return Err(ActionError::UnknownAction(tag.to_string()));
    }
    serde_json::from_value(raw.clone())
        .map_err(|e| ActionError::Validation(format!("{}: {}", tag, e)))
}

/// Approval summary line for a raw record
pub(crate) fn summarize(raw: &Value) -> String {
    match parse_action(raw) {
        Ok(action) => action.describe(),
        Err(_) => raw
            .get("action")
            .and_then(Value::as_str)
            .map(|tag| format!("{} (unparsed)", tag))
            .unwrap_or_else(|| "(missing action tag)".to_string()),
    }
}

fn apply(ctx: &mut ActionContext<'_>, action: &DmAction) -> Result<(), ActionError> {
    match action {
        DmAction::PlaceToken { .. } => tokens::place_token(ctx, action),
        DmAction::PlaceCreature {
            grid_x,
            grid_y,
            creature_name,
            label,
            hp,
            visible,
        } => tokens::place_creature(
            ctx,
            *grid_x,
            *grid_y,
            creature_name,
            label.as_deref(),
            *hp,
            *visible,
        ),
        DmAction::MoveToken {
            label,
            grid_x,
            grid_y,
        } => tokens::move_token(ctx, label, *grid_x, *grid_y),
        DmAction::UpdateToken { .. } => tokens::update_token(ctx, action),
        DmAction::RemoveToken { label } => tokens::remove_token(ctx, label),

        DmAction::StartInitiative { entries } => initiative::start(ctx, entries),
        DmAction::AddToInitiative(entry) => initiative::add(ctx, entry),
        DmAction::RemoveFromInitiative { label } => initiative::remove(ctx, label),
        DmAction::NextTurn => initiative::next_turn(ctx),
        DmAction::EndInitiative => initiative::end(ctx),
        DmAction::UseLegendaryAction { entity_label, cost } => {
            initiative::use_legendary_action(ctx, entity_label, *cost)
        }
        DmAction::UseLegendaryResistance { entity_label } => {
            initiative::use_legendary_resistance(ctx, entity_label)
        }
        DmAction::RechargeRoll {
            entity_label,
            ability_name,
            recharge_on,
        } => initiative::recharge_roll(ctx, entity_label, ability_name, *recharge_on),
        DmAction::UseRechargeAbility {
            entity_label,
            ability_name,
        } => initiative::use_recharge_ability(ctx, entity_label, ability_name),

        DmAction::RevealFog { cells, map_name } => {
            environment::set_fog(ctx, cells, map_name.as_deref(), true)
        }
        DmAction::HideFog { cells, map_name } => {
            environment::set_fog(ctx, cells, map_name.as_deref(), false)
        }
        DmAction::SetAmbientLight { level } => environment::set_ambient_light(ctx, *level),
        DmAction::SetUnderwaterCombat { enabled } => {
            environment::set_underwater_combat(ctx, *enabled)
        }
        DmAction::SetTravelPace { pace } => environment::set_travel_pace(ctx, *pace),
        DmAction::OpenShop { name, items } => environment::open_shop(ctx, name, items),
        DmAction::CloseShop => environment::close_shop(ctx),
        DmAction::AddShopItem(item) => environment::add_shop_item(ctx, item),
        DmAction::RemoveShopItem { name } => environment::remove_shop_item(ctx, name),
        DmAction::SwitchMap { map_name } => environment::switch_map(ctx, map_name),
        DmAction::AddSidebarEntry {
            category,
            name,
            description,
        } => environment::add_sidebar_entry(ctx, *category, name, description.as_deref()),
        DmAction::RemoveSidebarEntry { category, name } => {
            environment::remove_sidebar_entry(ctx, *category, name)
        }
        DmAction::StartTimer {
            seconds,
            target_name,
        } => environment::start_timer(ctx, *seconds, target_name),
        DmAction::StopTimer => environment::stop_timer(ctx),

        DmAction::HiddenDiceRoll { formula, reason } => {
            communication::hidden_dice_roll(ctx, formula, reason.as_deref())
        }
        DmAction::WhisperPlayer {
            player_name,
            message,
        } => communication::whisper_player(ctx, player_name, message),
        DmAction::SystemMessage { message } => communication::system_message(ctx, message),
        DmAction::AddEntityCondition { .. } => communication::add_entity_condition(ctx, action),
        DmAction::RemoveEntityCondition {
            entity_label,
            condition,
        } => communication::remove_entity_condition(ctx, entity_label, condition),
        DmAction::AddCustomEffect {
            target_name,
            source_name,
            effects,
        } => communication::add_custom_effect(ctx, target_name, source_name, effects),
        DmAction::RemoveCustomEffect {
            target_name,
            source_name,
        } => communication::remove_custom_effect(ctx, target_name, source_name),

        DmAction::AdvanceTime {
            seconds,
            minutes,
            hours,
            days,
        } => time_rest::advance_time(ctx, *seconds, *minutes, *hours, *days),
        DmAction::SetTime { day, hour, minute } => {
            time_rest::set_time(ctx, *day, *hour, *minute)
        }
        DmAction::ShareTime => time_rest::share_time(ctx),
        DmAction::LightSource {
            entity_name,
            source_name,
            duration_minutes,
        } => time_rest::light_source(ctx, entity_name, source_name, *duration_minutes),
        DmAction::ExtinguishSource {
            entity_name,
            source_name,
        } => time_rest::extinguish_source(ctx, entity_name, source_name),
        DmAction::ShortRest { character_names } => time_rest::short_rest(ctx, character_names),
        DmAction::LongRest { character_names } => time_rest::long_rest(ctx, character_names),

        DmAction::ApplyAreaEffect { .. } => area_effect::apply_area_effect(ctx, action),
    }
}
