//! # Store
//!
//! Document persistence for rolls and quick rolls.
//!
//! ## Requirements
//!
//! - Create, find, replace and delete single records by id
//! - All quick rolls of one owner, small sets (tens of presets per user)
//! - Most recent rolls, optionally per owner, bounded by a limit
//! - Bulk delete of rolls by owner or unconditionally
//!
//! ## Implementation
//!
//! - [`RedisStore`]: JSON documents in one Redis hash per record kind, plus an
//!   id set per owner for quick rolls and a creation-time sorted set for rolls
//! - [`MemoryStore`]: the same contract over in-process maps, selected with
//!   `STORE_URL=memory://` and used by the tests
//! - Ordering, filtering and the density invariant live in the services,
//!   the store only moves documents
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dice::{ObjectId, QuickRoll, Roll};
use thiserror::Error;
use tracing::info;

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

pub const MEMORY_URL: &str = "memory://";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Round trip to the backing store.
    async fn ping(&self) -> StoreResult<()>;

    async fn insert_quick_roll(&self, quick_roll: &QuickRoll) -> StoreResult<()>;

    async fn find_quick_roll(&self, id: &ObjectId) -> StoreResult<Option<QuickRoll>>;

    /// Every quick roll of `owner`, in no particular order.
    async fn owner_quick_rolls(&self, owner: &ObjectId) -> StoreResult<Vec<QuickRoll>>;

    async fn replace_quick_roll(&self, quick_roll: &QuickRoll) -> StoreResult<()>;

    /// Removes `quick_roll` and decrements `order` of every other quick roll
    /// of its owner placed above it, as one write. Returns how many records
    /// moved.
    async fn delete_and_compact(
        &self,
        quick_roll: &QuickRoll,
        now: DateTime<Utc>,
    ) -> StoreResult<u64>;

    async fn insert_roll(&self, roll: &Roll) -> StoreResult<()>;

    /// Newest first.
    async fn recent_rolls(&self, owner: Option<&ObjectId>, limit: usize) -> StoreResult<Vec<Roll>>;

    /// Deletes the rolls of `owner`, or every roll when `owner` is `None`.
    async fn clear_rolls(&self, owner: Option<&ObjectId>) -> StoreResult<u64>;

    /// Drops pooled connections. The next call reconnects.
    async fn teardown(&self) {}
}

pub fn init_store(store_url: &str) -> StoreResult<Arc<dyn Store>> {
    if store_url == MEMORY_URL {
        info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::default()));
    }

    info!("Using Redis store");
    Ok(Arc::new(RedisStore::open(store_url)?))
}
