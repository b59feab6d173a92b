use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ParseError,
    ids::ObjectId,
    notation::{is_valid_notation, is_valid_roll_notation},
};

pub const MIN_RESULT: i64 = 1;
pub const MAX_RESULT: i64 = 100;

macro_rules! closed_enum {
    ($name:ident, $error:ident, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(ParseError::$error(s.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_enum!(Color, Color, {
    Red => "red",
    Blue => "blue",
    Green => "green",
    Yellow => "yellow",
    Purple => "purple",
    Gray => "gray",
});

closed_enum!(Category, Category, {
    Combat => "combat",
    Skills => "skills",
    Magic => "magic",
    Item => "item",
    Other => "other",
});

closed_enum!(SortField, SortField, {
    Order => "order",
    CreatedAt => "createdAt",
    UpdatedAt => "updatedAt",
    Name => "name",
});

impl Default for Color {
    fn default() -> Self {
        Color::Blue
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

pub fn is_valid_color(s: &str) -> bool {
    s.parse::<Color>().is_ok()
}

pub fn is_valid_category(s: &str) -> bool {
    s.parse::<Category>().is_ok()
}

pub fn is_valid_sort_field(s: &str) -> bool {
    s.parse::<SortField>().is_ok()
}

/// Sort key for listings. A leading `-` on the wire means descending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub descending: bool,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: SortField::Order,
            descending: false,
        }
    }
}

impl FromStr for Sort {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, field) = match s.strip_prefix('-') {
            Some(field) => (true, field),
            None => (false, s),
        };

        Ok(Self {
            field: field.parse()?,
            descending,
        })
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            f.write_str("-")?;
        }

        f.write_str(self.field.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roll {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(rename = "dados")]
    pub notation: String,
    #[serde(rename = "resultados")]
    pub results: Vec<u32>,
    pub total: u32,
    #[serde(rename = "userId")]
    pub owner: Option<ObjectId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Roll {
    /// Applies the record bounds: bare `XdY`, every result in `[1, 100]` and
    /// `total >= 1`. The total is not compared against the results.
    pub fn new(
        id: ObjectId,
        notation: &str,
        results: &[i64],
        total: i64,
        owner: Option<ObjectId>,
        now: DateTime<Utc>,
    ) -> Result<Self, ParseError> {
        if !is_valid_roll_notation(notation) {
            return Err(ParseError::RollNotation(notation.to_string()));
        }

        let results = results
            .iter()
            .map(|&r| match r {
                MIN_RESULT..=MAX_RESULT => Ok(r as u32),
                _ => Err(ParseError::ResultOutOfRange(r)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let total = u32::try_from(total)
            .ok()
            .filter(|t| *t >= 1)
            .ok_or(ParseError::TotalOutOfRange(total))?;

        Ok(Self {
            id,
            notation: notation.to_string(),
            results,
            total,
            owner,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickRoll {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(rename = "userId")]
    pub owner: ObjectId,
    pub name: String,
    pub notation: String,
    pub color: Color,
    pub category: Category,
    pub order: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuickRoll {
    pub fn new(
        id: ObjectId,
        owner: ObjectId,
        fields: NewQuickRoll,
        order: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            name: fields.name,
            notation: fields.notation,
            color: fields.color.unwrap_or_default(),
            category: fields.category.unwrap_or_default(),
            order,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields of a preset before the server assigns identity and order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewQuickRoll {
    pub name: String,
    pub notation: String,
    pub color: Option<Color>,
    pub category: Option<Category>,
}

impl NewQuickRoll {
    pub fn validate(&self) -> Result<(), ParseError> {
        validate_name(&self.name)?;
        validate_notation(&self.notation)
    }
}

/// Partial update. `None` leaves the stored field as it is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuickRollPatch {
    pub name: Option<String>,
    pub notation: Option<String>,
    pub color: Option<Color>,
    pub category: Option<Category>,
    pub order: Option<u32>,
}

impl QuickRollPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.notation.is_none()
            && self.color.is_none()
            && self.category.is_none()
            && self.order.is_none()
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(notation) = &self.notation {
            validate_notation(notation)?;
        }

        Ok(())
    }

    /// Overwrites the provided fields and refreshes `updated_at`. Setting
    /// `order` here does not compact the owner's other presets.
    pub fn apply(self, quick_roll: &mut QuickRoll, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            quick_roll.name = name;
        }
        if let Some(notation) = self.notation {
            quick_roll.notation = notation;
        }
        if let Some(color) = self.color {
            quick_roll.color = color;
        }
        if let Some(category) = self.category {
            quick_roll.category = category;
        }
        if let Some(order) = self.order {
            quick_roll.order = order;
        }

        quick_roll.updated_at = now;
    }
}

fn validate_name(name: &str) -> Result<(), ParseError> {
    if name.trim().is_empty() {
        return Err(ParseError::EmptyName);
    }

    Ok(())
}

fn validate_notation(notation: &str) -> Result<(), ParseError> {
    if !is_valid_notation(notation) {
        return Err(ParseError::Notation(notation.to_string()));
    }

    Ok(())
}
