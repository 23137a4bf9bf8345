//! Initiative tracking - turn order, legendary pools and recharge abilities
//!
//! The tracker is either empty (no encounter) or holds an ordered list of
//! entries with exactly one current index. `start` always replaces whatever
//! was there; `advance` moves the cursor and wraps into a new round.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::DiceRoller;

/// Who a combatant is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntityCategory {
    Player,
    Npc,
    #[default]
    Enemy,
}

/// Per-round legendary action pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendaryActions {
    pub max: u32,
    pub used: u32,
}

impl LegendaryActions {
    pub fn new(max: u32) -> Self {
        Self { max, used: 0 }
    }

    pub fn remaining(&self) -> u32 {
        self.max.saturating_sub(self.used)
    }
}

/// Per-day legendary resistance pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendaryResistances {
    pub max: u32,
    pub remaining: u32,
}

impl LegendaryResistances {
    pub fn new(max: u32) -> Self {
        Self {
            max,
            remaining: max,
        }
    }
}

/// An ability that recharges on a d6 roll at or above `recharge_on`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeAbility {
    pub name: String,
    pub recharge_on: u32,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl RechargeAbility {
    pub fn new(name: impl Into<String>, recharge_on: u32) -> Self {
        Self {
            name: name.into(),
            recharge_on,
            available: true,
        }
    }
}

/// One combatant's place in the turn order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiativeEntry {
    /// Token id or character name this entry stands for
    pub entity_ref: String,
    pub name: String,
    pub category: EntityCategory,
    pub roll: i32,
    pub modifier: i32,
    pub total: i32,
    pub active: bool,
    pub legendary_actions: Option<LegendaryActions>,
    pub legendary_resistances: Option<LegendaryResistances>,
    #[serde(default)]
    pub recharge_abilities: Vec<RechargeAbility>,
}

impl InitiativeEntry {
    pub fn new(
        name: impl Into<String>,
        category: EntityCategory,
        roll: i32,
        modifier: i32,
    ) -> Self {
        let name = name.into();
        Self {
            entity_ref: name.clone(),
            name,
            category,
            roll,
            modifier,
            total: roll + modifier,
            active: false,
            legendary_actions: None,
            legendary_resistances: None,
            recharge_abilities: Vec::new(),
        }
    }

    pub fn recharge_ability_mut(&mut self, name: &str) -> Option<&mut RechargeAbility> {
        self.recharge_abilities
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

/// Action economy for the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResources {
    pub movement: u32,
    pub movement_used: u32,
    pub action_available: bool,
    pub bonus_action_available: bool,
    pub reaction_available: bool,
}

impl TurnResources {
    pub fn fresh(movement: u32) -> Self {
        Self {
            movement,
            movement_used: 0,
            action_available: true,
            bonus_action_available: true,
            reaction_available: true,
        }
    }
}

/// Outcome of a recharge roll made at the start of a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RechargeResult {
    pub entity: String,
    pub ability: String,
    pub rolled: u32,
    pub recharge_on: u32,
    pub recharged: bool,
}

/// What happened when the turn advanced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnAdvance {
    pub index: usize,
    pub entity_ref: String,
    pub name: String,
    pub round: u32,
    pub new_round: bool,
    pub recharges: Vec<RechargeResult>,
}

/// Turn order state machine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiativeTracker {
    entries: Vec<InitiativeEntry>,
    current: Option<usize>,
    round: u32,
    /// Turn resources keyed by entity reference
    turn_state: HashMap<String, TurnResources>,
}

impl InitiativeTracker {
    pub fn is_active(&self) -> bool {
        self.current.is_some() && !self.entries.is_empty()
    }

    pub fn entries(&self) -> &[InitiativeEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [InitiativeEntry] {
        &mut self.entries
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_entry(&self) -> Option<&InitiativeEntry> {
        self.current.and_then(|i| self.entries.get(i))
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn turn_state(&self, entity_ref: &str) -> Option<&TurnResources> {
        self.turn_state.get(entity_ref)
    }

    /// Replace the encounter with the given ordered entries
    pub fn start(&mut self, entries: Vec<InitiativeEntry>) {
        self.entries = entries;
        self.turn_state.clear();
        if self.entries.is_empty() {
            self.current = None;
            self.round = 0;
        } else {
            self.current = Some(0);
            self.round = 1;
        }
        self.refresh_active_flags();
    }

    /// Return to the no-encounter state
    pub fn end(&mut self) {
        self.entries.clear();
        self.turn_state.clear();
        self.current = None;
        self.round = 0;
    }

    pub fn seed_turn_state(&mut self, entity_ref: &str, movement: u32) {
        self.turn_state
            .insert(entity_ref.to_string(), TurnResources::fresh(movement));
    }

    pub fn find(&self, entity_ref: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.entity_ref == entity_ref)
    }

    /// Insert by descending total, keeping the current combatant current
    pub fn add(&mut self, entry: InitiativeEntry) -> usize {
        let index = self
            .entries
            .iter()
            .position(|e| e.total < entry.total)
            .unwrap_or(self.entries.len());
        self.entries.insert(index, entry);

        match self.current {
            Some(current) if index <= current => self.current = Some(current + 1),
            Some(_) => {}
            None => {
                self.current = Some(0);
                self.round = self.round.max(1);
            }
        }
        self.refresh_active_flags();
        index
    }

    /// Remove an entry; the cursor keeps pointing at the same combatant, or at
    /// the one who would have gone next if the current one was removed.
    pub fn remove(&mut self, index: usize) -> Option<InitiativeEntry> {
        if index >= self.entries.len() {
            return None;
        }
        let removed = self.entries.remove(index);
        self.turn_state.remove(&removed.entity_ref);

        if self.entries.is_empty() {
            self.end();
            return Some(removed);
        }

        if let Some(current) = self.current {
            if index < current {
                self.current = Some(current - 1);
            } else if current >= self.entries.len() {
                self.current = Some(0);
                self.round += 1;
            }
        }
        self.refresh_active_flags();
        Some(removed)
    }

    /// Advance to the next combatant and begin their turn.
    ///
    /// The beginning combatant's legendary actions reset to zero used, and for
    /// enemies every unavailable recharge ability rolls a d6.
    pub fn advance(
        &mut self,
        roller: &mut dyn DiceRoller,
        movement_for: impl Fn(&str) -> u32,
    ) -> Option<TurnAdvance> {
        let current = self.current?;
        if self.entries.is_empty() {
            return None;
        }

        let next = (current + 1) % self.entries.len();
        let new_round = next == 0;
        if new_round {
            self.round += 1;
        }
        self.current = Some(next);
        self.refresh_active_flags();

        let entry = &mut self.entries[next];
        if let Some(pool) = entry.legendary_actions.as_mut() {
            pool.used = 0;
        }

        let mut recharges = Vec::new();
        if entry.category == EntityCategory::Enemy {
            for ability in entry.recharge_abilities.iter_mut().filter(|a| !a.available) {
                let rolled = roller.roll_die(6);
                let recharged = rolled >= ability.recharge_on;
                if recharged {
                    ability.available = true;
                }
                recharges.push(RechargeResult {
                    entity: entry.name.clone(),
                    ability: ability.name.clone(),
                    rolled,
                    recharge_on: ability.recharge_on,
                    recharged,
                });
            }
        }

        let entity_ref = entry.entity_ref.clone();
        let name = entry.name.clone();
        let movement = movement_for(&entity_ref);
        self.turn_state
            .insert(entity_ref.clone(), TurnResources::fresh(movement));

        Some(TurnAdvance {
            index: next,
            entity_ref,
            name,
            round: self.round,
            new_round,
            recharges,
        })
    }

    fn refresh_active_flags(&mut self) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.active = Some(i) == self.current;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::ScriptedRoller;

    fn entry(name: &str, total: i32) -> InitiativeEntry {
        InitiativeEntry::new(name, EntityCategory::Enemy, total, 0)
    }

    fn names(tracker: &InitiativeTracker) -> Vec<&str> {
        tracker.entries().iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_start_keeps_given_order_and_marks_first_active() {
        let mut tracker = InitiativeTracker::default();
        tracker.start(vec![entry("Ogre", 3), entry("Aria", 18)]);
        assert_eq!(names(&tracker), vec!["Ogre", "Aria"]);
        assert_eq!(tracker.current_index(), Some(0));
        assert!(tracker.entries()[0].active);
        assert!(!tracker.entries()[1].active);
        assert_eq!(tracker.round(), 1);
    }

    #[test]
    fn test_start_with_no_entries_is_no_encounter() {
        let mut tracker = InitiativeTracker::default();
        tracker.start(Vec::new());
        assert!(!tracker.is_active());
    }

    #[test]
    fn test_advance_wraps_and_counts_rounds() {
        let mut tracker = InitiativeTracker::default();
        tracker.start(vec![entry("A", 20), entry("B", 10)]);
        let mut roller = ScriptedRoller::always(1);

        let step = tracker.advance(&mut roller, |_| 30).unwrap();
        assert_eq!((step.index, step.round, step.new_round), (1, 1, false));

        let step = tracker.advance(&mut roller, |_| 30).unwrap();
        assert_eq!((step.index, step.round, step.new_round), (0, 2, true));
        assert_eq!(tracker.turn_state("A").map(|t| t.movement), Some(30));
    }

    #[test]
    fn test_advance_resets_legendary_actions_of_beginning_entity() {
        let mut tracker = InitiativeTracker::default();
        let mut dragon = entry("Dragon", 20);
        dragon.legendary_actions = Some(LegendaryActions { max: 3, used: 3 });
        tracker.start(vec![entry("Aria", 22), dragon]);

        tracker.advance(&mut ScriptedRoller::always(1), |_| 30);
        assert_eq!(
            tracker.entries()[1].legendary_actions,
            Some(LegendaryActions { max: 3, used: 0 })
        );
    }

    #[test]
    fn test_advance_rolls_recharge_for_enemies_only() {
        let mut tracker = InitiativeTracker::default();
        let mut ogre = entry("Ogre", 14);
        ogre.recharge_abilities.push(RechargeAbility {
            name: "Boulder".into(),
            recharge_on: 5,
            available: false,
        });
        let mut ally = InitiativeEntry::new("Guard", EntityCategory::Npc, 12, 0);
        ally.recharge_abilities.push(RechargeAbility {
            name: "Rally".into(),
            recharge_on: 5,
            available: false,
        });
        tracker.start(vec![entry("Aria", 20), ogre, ally]);

        let step = tracker.advance(&mut ScriptedRoller::new([5]), |_| 30).unwrap();
        assert_eq!(step.recharges.len(), 1);
        assert!(step.recharges[0].recharged);
        assert!(tracker.entries()[1].recharge_abilities[0].available);

        let step = tracker.advance(&mut ScriptedRoller::new([6]), |_| 30).unwrap();
        assert!(step.recharges.is_empty());
        assert!(!tracker.entries()[2].recharge_abilities[0].available);
    }

    #[test]
    fn test_add_keeps_current_combatant() {
        let mut tracker = InitiativeTracker::default();
        tracker.start(vec![entry("A", 20), entry("B", 10)]);
        tracker.advance(&mut ScriptedRoller::always(1), |_| 30);
        assert_eq!(tracker.current_entry().map(|e| e.name.as_str()), Some("B"));

        tracker.add(entry("C", 15));
        assert_eq!(names(&tracker), vec!["A", "C", "B"]);
        assert_eq!(tracker.current_entry().map(|e| e.name.as_str()), Some("B"));
    }

    #[test]
    fn test_remove_before_current_shifts_cursor() {
        let mut tracker = InitiativeTracker::default();
        tracker.start(vec![entry("A", 20), entry("B", 15), entry("C", 10)]);
        tracker.advance(&mut ScriptedRoller::always(1), |_| 30);
        tracker.advance(&mut ScriptedRoller::always(1), |_| 30);

        tracker.remove(0);
        assert_eq!(tracker.current_entry().map(|e| e.name.as_str()), Some("C"));
    }

    #[test]
    fn test_remove_current_last_wraps_to_new_round() {
        let mut tracker = InitiativeTracker::default();
        tracker.start(vec![entry("A", 20), entry("B", 10)]);
        tracker.advance(&mut ScriptedRoller::always(1), |_| 30);

        tracker.remove(1);
        assert_eq!(tracker.current_index(), Some(0));
        assert_eq!(tracker.round(), 2);
    }

    #[test]
    fn test_remove_last_entry_ends_encounter() {
        let mut tracker = InitiativeTracker::default();
        tracker.start(vec![entry("A", 20)]);
        tracker.remove(0);
        assert!(!tracker.is_active());
        assert_eq!(tracker.round(), 0);
    }
}
