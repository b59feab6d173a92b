//! Record and owner identities.
//!
//! Identities are 24 hexadecimal characters (12 bytes). Freshly generated ones
//! are laid out as `timestamp (4) | process unique (5) | counter (3)`, so ids
//! minted by one process sort roughly in creation order.
use std::{
    fmt,
    str::FromStr,
    sync::{
        LazyLock,
        atomic::{AtomicU32, Ordering},
    },
};

use chrono::Utc;
use rand::{Rng, thread_rng};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ParseError;

pub const OBJECT_ID_LEN: usize = 24;

static PROCESS_UNIQUE: LazyLock<[u8; 5]> = LazyLock::new(|| {
    let mut bytes = [0u8; 5];
    thread_rng().fill(&mut bytes);
    bytes
});

static COUNTER: LazyLock<AtomicU32> =
    LazyLock::new(|| AtomicU32::new(thread_rng().gen_range(0..0x00ff_ffff)));

/// True iff `s` is exactly 24 hexadecimal characters, either case.
pub fn is_valid_object_id(s: &str) -> bool {
    s.len() == OBJECT_ID_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// A validated identity, kept in lowercase so equality is plain string equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn generate() -> Self {
        let timestamp = Utc::now().timestamp() as u32;
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);

        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn parse(s: &str) -> Result<Self, ParseError> {
        if !is_valid_object_id(s) {
            return Err(ParseError::ObjectId(s.to_string()));
        }

        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ObjectId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
