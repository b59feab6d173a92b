//! # Dice
//!
//! Shared domain types for the dice roller: identifiers, notation, the stored
//! records and the JSON payloads exchanged between the server and its clients.
//!
//! ## Records
//!
//! - **Roll**: one historical roll (`dados`, `resultados`, `total`, optional `userId`).
//!   Never mutated after creation.
//! - **QuickRoll**: a named preset owned by exactly one user. Carries an `order`
//!   that is dense per owner: `{0, 1, ..., n-1}`.
//!
//! ## Wire names
//!
//! Field names on the wire follow the web client that consumes them, so
//! `owner` is `userId`, record identities are `_id` and the history fields are
//! the Portuguese `dados`/`resultados`.
use thiserror::Error;

pub mod ids;
pub mod models;
pub mod notation;
pub mod payloads;

pub use ids::{ObjectId, is_valid_object_id};
pub use models::{Category, Color, NewQuickRoll, QuickRoll, QuickRollPatch, Roll, Sort, SortField};
pub use notation::{Notation, RollOutcome, is_valid_notation, is_valid_roll_notation};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid identifier {0:?}: expected 24 hexadecimal characters")]
    ObjectId(String),

    #[error("Invalid notation {0:?}: use XdY or XdY+Z")]
    Notation(String),

    #[error("Invalid roll notation {0:?}: use XdY")]
    RollNotation(String),

    #[error("Cannot roll {notation}: {reason}")]
    Unrollable {
        notation: String,
        reason: &'static str,
    },

    #[error("Unknown color {0:?}, expected one of: red, blue, green, yellow, purple, gray")]
    Color(String),

    #[error("Unknown category {0:?}, expected one of: combat, skills, magic, item, other")]
    Category(String),

    #[error("Unknown sort field {0:?}, expected one of: order, createdAt, updatedAt, name")]
    SortField(String),

    #[error("Name is required")]
    EmptyName,

    #[error("Result {0} is out of range, each die result must be between 1 and 100")]
    ResultOutOfRange(i64),

    #[error("Total {0} is out of range, must be at least 1")]
    TotalOutOfRange(i64),
}
