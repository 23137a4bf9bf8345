//! Dice formulas and rolling
//!
//! Parses notation like "2d6+3", "1d20", "2d6+1d4-1" and rolls it through a
//! [`DiceRoller`], so tests can substitute fixed results.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const MAX_DICE_COUNT: u32 = 100;
const MAX_DIE_SIDES: u32 = 1000;
const MAX_CONSTANT: i32 = 10_000;
const MAX_TERMS: usize = 20;

/// Source of individual die results
pub trait DiceRoller: Send + Sync {
    /// Roll one die with the given number of sides, returning 1..=sides
    fn roll_die(&mut self, sides: u32) -> u32;
}

/// Production roller backed by a seedable RNG
pub struct RandomRoller {
    rng: StdRng,
}

impl RandomRoller {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic roller for reproducible sessions
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomRoller {
    fn default() -> Self {
        Self::new()
    }
}

impl DiceRoller for RandomRoller {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.rng.gen_range(1..=sides.max(1))
    }
}

/// Errors from parsing dice notation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiceError {
    #[error("Empty dice formula")]
    Empty,

    #[error("Invalid dice term: {0}")]
    InvalidTerm(String),

    #[error("Dice count must be between 1 and 100: {0}")]
    CountOutOfRange(String),

    #[error("Die sides must be between 1 and 1000: {0}")]
    SidesOutOfRange(String),

    #[error("Modifier must be between -10000 and 10000: {0}")]
    ModifierOutOfRange(String),

    #[error("Too many terms in dice formula (max 20): {0}")]
    TooManyTerms(String),
}

/// One additive term of a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiceTerm {
    Dice { count: u32, sides: u32, negative: bool },
    Constant(i32),
}

/// A parsed formula such as `2d6+1d4+3`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceFormula {
    terms: Vec<DiceTerm>,
}

/// Result of rolling a formula
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub formula: String,
    /// Individual die faces in roll order
    pub rolls: Vec<u32>,
    pub total: i32,
}

impl DiceFormula {
    /// Formula for a single die, e.g. `1d20`
    pub fn single(sides: u32) -> Self {
        Self {
            terms: vec![DiceTerm::Dice {
                count: 1,
                sides,
                negative: false,
            }],
        }
    }

    pub fn terms(&self) -> &[DiceTerm] {
        &self.terms
    }

    pub fn roll(&self, roller: &mut dyn DiceRoller) -> RollOutcome {
        let mut rolls = Vec::new();
        let mut total: i32 = 0;

        for term in &self.terms {
            match *term {
                DiceTerm::Dice {
                    count,
                    sides,
                    negative,
                } => {
                    for _ in 0..count {
                        let face = roller.roll_die(sides);
                        rolls.push(face);
                        if negative {
                            total = total.saturating_sub(face as i32);
                        } else {
                            total = total.saturating_add(face as i32);
                        }
                    }
                }
                DiceTerm::Constant(value) => total = total.saturating_add(value),
            }
        }

        RollOutcome {
            formula: self.to_string(),
            rolls,
            total,
        }
    }

    pub fn min(&self) -> i32 {
        self.terms
            .iter()
            .map(|term| match *term {
                DiceTerm::Dice {
                    count,
                    sides,
                    negative,
                } => {
                    if negative {
                        -((count * sides) as i32)
                    } else {
                        count as i32
                    }
                }
                DiceTerm::Constant(value) => value,
            })
            .sum()
    }

    pub fn max(&self) -> i32 {
        self.terms
            .iter()
            .map(|term| match *term {
                DiceTerm::Dice {
                    count,
                    sides,
                    negative,
                } => {
                    if negative {
                        -(count as i32)
                    } else {
                        (count * sides) as i32
                    }
                }
                DiceTerm::Constant(value) => value,
            })
            .sum()
    }
}

impl FromStr for DiceFormula {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_formula(s)
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            let (negative, body) = match *term {
                DiceTerm::Dice {
                    count,
                    sides,
                    negative,
                } => (negative, format!("{}d{}", count, sides)),
                DiceTerm::Constant(value) => (value < 0, value.abs().to_string()),
            };
            if negative {
                write!(f, "-")?;
            } else if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{}", body)?;
        }
        Ok(())
    }
}

/// Parse dice notation into a formula
pub fn parse_formula(notation: &str) -> Result<DiceFormula, DiceError> {
    let compact: String = notation
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    if compact.is_empty() {
        return Err(DiceError::Empty);
    }

    let mut terms = Vec::new();
    let mut negative = false;
    let mut current = String::new();

    // Split on +/- while remembering each term's sign
    for ch in compact.chars() {
        match ch {
            '+' | '-' => {
                if !current.is_empty() {
                    terms.push(parse_term(&current, negative)?);
                    current.clear();
                } else if !terms.is_empty() || ch == '+' {
                    return Err(DiceError::InvalidTerm(compact.clone()));
                }
                negative = ch == '-';
            }
            _ => current.push(ch),
        }
    }

    if current.is_empty() {
        return Err(DiceError::InvalidTerm(compact));
    }
    terms.push(parse_term(&current, negative)?);

    if terms.len() > MAX_TERMS {
        return Err(DiceError::TooManyTerms(compact));
    }

    Ok(DiceFormula { terms })
}

fn parse_term(term: &str, negative: bool) -> Result<DiceTerm, DiceError> {
    let Some(d_pos) = term.find('d') else {
        let value: i32 = term
            .parse()
            .map_err(|_| DiceError::InvalidTerm(term.to_string()))?;
        if !(0..=MAX_CONSTANT).contains(&value) {
            return Err(DiceError::ModifierOutOfRange(term.to_string()));
        }
        return Ok(DiceTerm::Constant(if negative { -value } else { value }));
    };

    let count_str = &term[..d_pos];
    let sides_str = &term[d_pos + 1..];

    // "d6" means "1d6"
    let count: u32 = if count_str.is_empty() {
        1
    } else {
        count_str
            .parse()
            .map_err(|_| DiceError::InvalidTerm(term.to_string()))?
    };
    let sides: u32 = sides_str
        .parse()
        .map_err(|_| DiceError::InvalidTerm(term.to_string()))?;

    if count == 0 || count > MAX_DICE_COUNT {
        return Err(DiceError::CountOutOfRange(term.to_string()));
    }
    if sides == 0 || sides > MAX_DIE_SIDES {
        return Err(DiceError::SidesOutOfRange(term.to_string()));
    }

    Ok(DiceTerm::Dice {
        count,
        sides,
        negative,
    })
}

/// Roller that replays scripted faces, for deterministic tests
#[cfg(test)]
pub struct ScriptedRoller {
    faces: std::collections::VecDeque<u32>,
    fallback: u32,
}

#[cfg(test)]
impl ScriptedRoller {
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
            fallback: 1,
        }
    }

    /// Every roll returns the same face (clamped to the die size)
    pub fn always(face: u32) -> Self {
        Self {
            faces: std::collections::VecDeque::new(),
            fallback: face,
        }
    }
}

#[cfg(test)]
impl DiceRoller for ScriptedRoller {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.faces
            .pop_front()
            .unwrap_or(self.fallback)
            .clamp(1, sides.max(1))
    }
}
