//! Map entity - a battle map owning its tokens and fog state

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::entities::Token;
use crate::domain::value_objects::{MapId, TokenId};

/// A single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

/// A battle map
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMap {
    pub id: MapId,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub tokens: Vec<Token>,
    /// Cells cleared of fog of war
    pub revealed_cells: BTreeSet<GridCell>,
}

impl GameMap {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: MapId::new(),
            name: name.into(),
            width,
            height,
            tokens: Vec::new(),
            revealed_cells: BTreeSet::new(),
        }
    }

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.iter().find(|t| t.id == id)
    }

    pub fn token_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        self.tokens.iter_mut().find(|t| t.id == id)
    }

    pub fn remove_token(&mut self, id: TokenId) -> Option<Token> {
        let index = self.tokens.iter().position(|t| t.id == id)?;
        Some(self.tokens.remove(index))
    }

    /// Reveal cells; returns how many were newly revealed
    pub fn reveal(&mut self, cells: &[GridCell]) -> usize {
        cells
            .iter()
            .filter(|cell| self.revealed_cells.insert(**cell))
            .count()
    }

    /// Hide cells again; returns how many were previously revealed
    pub fn hide(&mut self, cells: &[GridCell]) -> usize {
        cells
            .iter()
            .filter(|cell| self.revealed_cells.remove(*cell))
            .count()
    }

    /// Next free label for a creature, e.g. "Goblin 3" when two goblins exist
    pub fn next_numbered_label(&self, base: &str) -> String {
        let prefix = format!("{} ", base.to_lowercase());
        let highest = self
            .tokens
            .iter()
            .filter_map(|t| {
                let label = t.label.to_lowercase();
                if label == base.to_lowercase() {
                    Some(1)
                } else {
                    label.strip_prefix(&prefix)?.parse::<u32>().ok()
                }
            })
            .max()
            .unwrap_or(0);
        format!("{} {}", base, highest + 1)
    }
}
