//! Condition entity - a named status effect on an entity

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::ConditionId;

/// How long a condition lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "rounds", rename_all = "snake_case")]
pub enum ConditionDuration {
    Rounds(u32),
    #[default]
    Permanent,
}

/// A status condition tracked against a token or character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: ConditionId,
    /// Label of the token or character the condition is on
    pub target: String,
    pub name: String,
    /// Numeric level for graded conditions (e.g. Exhaustion 2)
    pub value: Option<i32>,
    pub duration: ConditionDuration,
    pub source: Option<String>,
    pub round_applied: u32,
}

impl Condition {
    pub fn new(target: impl Into<String>, name: impl Into<String>, round_applied: u32) -> Self {
        Self {
            id: ConditionId::new(),
            target: target.into(),
            name: name.into(),
            value: None,
            duration: ConditionDuration::Permanent,
            source: None,
            round_applied,
        }
    }

    pub fn with_duration(mut self, duration: ConditionDuration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_value(mut self, value: Option<i32>) -> Self {
        self.value = value;
        self
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    /// Advisory only: conditions are never removed automatically
    pub fn is_active(&self, current_round: u32) -> bool {
        match self.duration {
            ConditionDuration::Permanent => true,
            ConditionDuration::Rounds(rounds) => {
                current_round < self.round_applied.saturating_add(rounds)
            }
        }
    }

    pub fn matches(&self, target: &str, name: &str) -> bool {
        self.target.eq_ignore_ascii_case(target) && self.name.eq_ignore_ascii_case(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_condition_stays_active() {
        let condition = Condition::new("Goblin 1", "Prone", 1);
        assert!(condition.is_active(100));
    }

    #[test]
    fn test_round_duration_lapses() {
        let condition =
            Condition::new("Ogre", "Frightened", 2).with_duration(ConditionDuration::Rounds(3));
        assert!(condition.is_active(2));
        assert!(condition.is_active(4));
        assert!(!condition.is_active(5));
    }

    #[test]
    fn test_matches_ignores_case() {
        let condition = Condition::new("Goblin 1", "Poisoned", 0);
        assert!(condition.matches("goblin 1", "POISONED"));
        assert!(!condition.matches("Goblin 2", "Poisoned"));
    }
}
