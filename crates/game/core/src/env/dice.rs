//! Dice notation and rollers.
//!
//! `roll()` is the single source of non-determinism available to formulas.
//! Everything random flows through a [`DiceRoller`] owned by one evaluator,
//! so tests swap in [`FixedRoller`] or [`ScriptedRoller`] and sessions that
//! need reproducibility use a seeded [`RandomRoller`].

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{ErrorSeverity, GameError};

/// Upper bound on dice per term (`1000d6` is fine, `5000d6` is not).
pub const MAX_DICE: u32 = 1000;
/// Upper bound on faces per die.
pub const MAX_SIDES: u32 = 1000;

/// Invalid dice notation or an exhausted script.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DiceError {
    #[error("empty dice expression")]
    Empty,

    #[error("invalid dice term '{term}'")]
    InvalidTerm { term: String },

    #[error("too many dice in '{term}' (max {MAX_DICE})")]
    TooManyDice { term: String },

    #[error("die in '{term}' must have between 1 and {MAX_SIDES} sides")]
    InvalidSides { term: String },

    #[error("cannot keep {keep} of {count} dice in '{term}'")]
    InvalidKeep { term: String, keep: u32, count: u32 },

    #[error("scripted roller has no more results for '{dice}'")]
    ScriptExhausted { dice: String },
}

impl GameError for DiceError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            DiceError::ScriptExhausted { .. } => ErrorSeverity::Internal,
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            DiceError::Empty => "DICE_EMPTY",
            DiceError::InvalidTerm { .. } => "DICE_INVALID_TERM",
            DiceError::TooManyDice { .. } => "DICE_TOO_MANY",
            DiceError::InvalidSides { .. } => "DICE_INVALID_SIDES",
            DiceError::InvalidKeep { .. } => "DICE_INVALID_KEEP",
            DiceError::ScriptExhausted { .. } => "DICE_SCRIPT_EXHAUSTED",
        }
    }
}

// ============================================================================
// Notation
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Keep {
    Highest(u32),
    Lowest(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Term {
    Dice {
        count: u32,
        sides: u32,
        keep: Option<Keep>,
    },
    Constant(i64),
}

/// Parsed dice expression such as `2d20kh1+5` or `1d8-1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiceExpr {
    /// `(sign, term)` pairs; sign is `1` or `-1`.
    terms: Vec<(i64, Term)>,
    source: String,
}

impl DiceExpr {
    /// Rolls every term with `rng` and returns the signed total.
    pub fn roll_with<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        self.terms
            .iter()
            .map(|(sign, term)| sign * roll_term(term, rng))
            .sum()
    }

    /// Smallest possible total.
    pub fn min(&self) -> i64 {
        self.terms
            .iter()
            .map(|(sign, term)| {
                let (lo, hi) = term_bounds(term);
                if *sign > 0 { lo } else { -hi }
            })
            .sum()
    }

    /// Largest possible total.
    pub fn max(&self) -> i64 {
        self.terms
            .iter()
            .map(|(sign, term)| {
                let (lo, hi) = term_bounds(term);
                if *sign > 0 { hi } else { -lo }
            })
            .sum()
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for DiceExpr {
    type Err = DiceError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let source: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        if source.is_empty() {
            return Err(DiceError::Empty);
        }

        let mut terms = Vec::new();
        let mut sign = 1;
        let mut current = String::new();
        for ch in source.chars() {
            if ch == '+' || ch == '-' {
                if !current.is_empty() {
                    terms.push((sign, parse_term(&current)?));
                    current.clear();
                } else if !terms.is_empty() || sign < 0 {
                    // Two operators in a row (`1d4+-2`).
                    return Err(DiceError::InvalidTerm { term: source.clone() });
                }
                sign = if ch == '-' { -1 } else { 1 };
            } else {
                current.push(ch);
            }
        }
        if current.is_empty() {
            return Err(DiceError::InvalidTerm { term: source });
        }
        terms.push((sign, parse_term(&current)?));

        Ok(Self { terms, source })
    }
}

fn parse_term(term: &str) -> Result<Term, DiceError> {
    let invalid = || DiceError::InvalidTerm {
        term: term.to_string(),
    };

    let Some((count, rest)) = term.split_once('d') else {
        return term.parse::<i64>().map(Term::Constant).map_err(|_| invalid());
    };

    let count = if count.is_empty() {
        1
    } else {
        count.parse::<u32>().map_err(|_| invalid())?
    };
    if count > MAX_DICE {
        return Err(DiceError::TooManyDice {
            term: term.to_string(),
        });
    }

    let (sides, keep) = match rest.find('k') {
        Some(pos) => (&rest[..pos], Some(&rest[pos..])),
        None => (rest, None),
    };
    let sides = sides.parse::<u32>().map_err(|_| invalid())?;
    if sides == 0 || sides > MAX_SIDES {
        return Err(DiceError::InvalidSides {
            term: term.to_string(),
        });
    }

    let keep = match keep {
        None => None,
        Some(suffix) => {
            let (kind, n) = if let Some(n) = suffix.strip_prefix("kh") {
                (Keep::Highest as fn(u32) -> Keep, n)
            } else if let Some(n) = suffix.strip_prefix("kl") {
                (Keep::Lowest as fn(u32) -> Keep, n)
            } else {
                return Err(invalid());
            };
            let n = if n.is_empty() {
                1
            } else {
                n.parse::<u32>().map_err(|_| invalid())?
            };
            if n == 0 || n > count {
                return Err(DiceError::InvalidKeep {
                    term: term.to_string(),
                    keep: n,
                    count,
                });
            }
            Some(kind(n))
        }
    };

    Ok(Term::Dice { count, sides, keep })
}

fn roll_term<R: Rng + ?Sized>(term: &Term, rng: &mut R) -> i64 {
    match *term {
        Term::Constant(value) => value,
        Term::Dice { count, sides, keep } => {
            let mut faces: Vec<i64> = (0..count)
                .map(|_| i64::from(rng.gen_range(1..=sides)))
                .collect();
            match keep {
                None => {}
                Some(Keep::Highest(n)) => {
                    faces.sort_unstable_by(|a, b| b.cmp(a));
                    faces.truncate(n as usize);
                }
                Some(Keep::Lowest(n)) => {
                    faces.sort_unstable();
                    faces.truncate(n as usize);
                }
            }
            faces.iter().sum()
        }
    }
}

fn term_bounds(term: &Term) -> (i64, i64) {
    match *term {
        Term::Constant(value) => (value, value),
        Term::Dice { count, sides, keep } => {
            let kept = match keep {
                Some(Keep::Highest(n) | Keep::Lowest(n)) => n,
                None => count,
            };
            (i64::from(kept), i64::from(kept) * i64::from(sides))
        }
    }
}

// ============================================================================
// Rollers
// ============================================================================

/// Source of dice totals for the `roll()` formula function.
pub trait DiceRoller: Send {
    /// Rolls `dice` (standard notation) and returns the total.
    fn roll(&mut self, dice: &str) -> Result<i64, DiceError>;
}

impl<R: DiceRoller + ?Sized> DiceRoller for Box<R> {
    fn roll(&mut self, dice: &str) -> Result<i64, DiceError> {
        (**self).roll(dice)
    }
}

/// Uniform sampler backed by [`StdRng`].
#[derive(Debug)]
pub struct RandomRoller {
    rng: StdRng,
}

impl RandomRoller {
    /// Roller seeded from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible roller: the same seed yields the same sequence.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomRoller {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl DiceRoller for RandomRoller {
    fn roll(&mut self, dice: &str) -> Result<i64, DiceError> {
        let expr: DiceExpr = dice.parse()?;
        Ok(expr.roll_with(&mut self.rng))
    }
}

/// Always returns the same total (notation is still validated).
#[derive(Clone, Copy, Debug)]
pub struct FixedRoller(pub i64);

impl DiceRoller for FixedRoller {
    fn roll(&mut self, dice: &str) -> Result<i64, DiceError> {
        dice.parse::<DiceExpr>()?;
        Ok(self.0)
    }
}

/// Returns queued totals in order; fails once the queue is empty.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRoller {
    results: VecDeque<i64>,
}

impl ScriptedRoller {
    pub fn new(results: impl IntoIterator<Item = i64>) -> Self {
        Self {
            results: results.into_iter().collect(),
        }
    }

    pub fn push(&mut self, result: i64) {
        self.results.push_back(result);
    }

    pub fn remaining(&self) -> usize {
        self.results.len()
    }
}

impl DiceRoller for ScriptedRoller {
    fn roll(&mut self, dice: &str) -> Result<i64, DiceError> {
        dice.parse::<DiceExpr>()?;
        self.results
            .pop_front()
            .ok_or_else(|| DiceError::ScriptExhausted {
                dice: dice.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bounds() {
        let expr: DiceExpr = "2d6+3".parse().unwrap();
        assert_eq!((expr.min(), expr.max()), (5, 15));

        let expr: DiceExpr = "d20 - 1".parse().unwrap();
        assert_eq!((expr.min(), expr.max()), (0, 19));

        let expr: DiceExpr = "4d6kl3".parse().unwrap();
        assert_eq!((expr.min(), expr.max()), (3, 18));

        let expr: DiceExpr = "-2+1d4".parse().unwrap();
        assert_eq!((expr.min(), expr.max()), (-1, 2));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!("".parse::<DiceExpr>(), Err(DiceError::Empty));
        assert!(matches!("1d".parse::<DiceExpr>(), Err(DiceError::InvalidTerm { .. })));
        assert!(matches!("1d0".parse::<DiceExpr>(), Err(DiceError::InvalidSides { .. })));
        assert!(matches!("2d20kh3".parse::<DiceExpr>(), Err(DiceError::InvalidKeep { .. })));
        assert!(matches!("5000d6".parse::<DiceExpr>(), Err(DiceError::TooManyDice { .. })));
        assert!(matches!("1d6+".parse::<DiceExpr>(), Err(DiceError::InvalidTerm { .. })));
        assert!(matches!("1d6+-2".parse::<DiceExpr>(), Err(DiceError::InvalidTerm { .. })));
    }

    #[test]
    fn test_seeded_roller_is_reproducible_and_in_range() {
        let mut a = RandomRoller::seeded(7);
        let mut b = RandomRoller::seeded(7);
        for _ in 0..50 {
            let x = a.roll("2d20kh1+2").unwrap();
            assert_eq!(x, b.roll("2d20kh1+2").unwrap());
            assert!((3..=22).contains(&x));
        }
    }

    #[test]
    fn test_fixed_and_scripted_rollers() {
        let mut fixed = FixedRoller(10);
        assert_eq!(fixed.roll("1d20").unwrap(), 10);
        assert!(fixed.roll("banana").is_err());

        let mut scripted = ScriptedRoller::new([3, 17]);
        assert_eq!(scripted.roll("1d20").unwrap(), 3);
        assert_eq!(scripted.roll("1d20").unwrap(), 17);
        assert!(matches!(scripted.roll("1d20"), Err(DiceError::ScriptExhausted { .. })));
    }
}
