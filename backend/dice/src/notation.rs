//! Dice notation: `XdY` rolls X dice of Y sides, `XdY+Z` adds a flat bonus.
//!
//! History records only accept the bare `XdY` form while presets also accept
//! the bonus. Both checks are shape-only; rolling applies the face bounds.
use std::{fmt, str::FromStr, sync::LazyLock};

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ParseError;

pub const MIN_SIDES: u32 = 2;
pub const MAX_SIDES: u32 = 100;
pub const MAX_DICE: u32 = 100;

static NOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)d([0-9]+)(?:\+([0-9]+))?$").unwrap());

static ROLL_NOTATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+d[0-9]+$").unwrap());

/// Quick roll notation, bonus allowed.
pub fn is_valid_notation(s: &str) -> bool {
    NOTATION.is_match(s)
}

/// History notation, no bonus term.
pub fn is_valid_roll_notation(s: &str) -> bool {
    ROLL_NOTATION.is_match(s)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Notation {
    pub count: u32,
    pub sides: u32,
    pub bonus: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub notation: Notation,
    pub results: Vec<u32>,
    pub total: u32,
}

impl Notation {
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::Notation(s.to_string());
        let captures = NOTATION.captures(s).ok_or_else(invalid)?;

        let number = |index: usize| -> Result<u32, ParseError> {
            captures
                .get(index)
                .map_or(Ok(0), |m| m.as_str().parse().map_err(|_| invalid()))
        };

        Ok(Self {
            count: number(1)?,
            sides: number(2)?,
            bonus: number(3)?,
        })
    }

    /// The `XdY` part, which is what the history stores.
    pub fn base(&self) -> String {
        format!("{}d{}", self.count, self.sides)
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RollOutcome, ParseError> {
        let unrollable = |reason| ParseError::Unrollable {
            notation: self.to_string(),
            reason,
        };

        if !(MIN_SIDES..=MAX_SIDES).contains(&self.sides) {
            return Err(unrollable("dice must have between 2 and 100 sides"));
        }
        if !(1..=MAX_DICE).contains(&self.count) {
            return Err(unrollable("between 1 and 100 dice can be rolled at once"));
        }

        let results: Vec<u32> = (0..self.count)
            .map(|_| rng.gen_range(1..=self.sides))
            .collect();
        let total = results
            .iter()
            .try_fold(self.bonus, |acc, &r| acc.checked_add(r))
            .ok_or_else(|| unrollable("total overflows"))?;

        Ok(RollOutcome {
            notation: *self,
            results,
            total,
        })
    }
}

impl FromStr for Notation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        if self.bonus > 0 {
            write!(f, "+{}", self.bonus)?;
        }

        Ok(())
    }
}

impl Serialize for Notation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Notation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for RollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let faces: Vec<String> = self.results.iter().map(u32::to_string).collect();
        write!(f, "{} = {}", self.notation, faces.join(" + "))?;
        if self.notation.bonus > 0 {
            write!(f, " + {}", self.notation.bonus)?;
        }

        write!(f, " = {}", self.total)
    }
}
