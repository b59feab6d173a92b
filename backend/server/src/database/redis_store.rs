//! # Redis
//!
//! Key layout:
//!
//! - `quick_rolls`: hash, quick roll id → JSON document
//! - `quick_rolls:{owner}`: set of the owner's quick roll ids
//! - `rolls`: hash, roll id → JSON document
//! - `rolls:timeline`: sorted set of roll ids scored by creation time (ms)
//! - `rolls:timeline:{owner}`: the same, restricted to one owner
//!
//! Multi-key writes go through `MULTI`/`EXEC` pipelines so a document and its
//! index entries land together.
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dice::{ObjectId, QuickRoll, Roll};
use redis::{
    AsyncCommands, Client, RedisResult,
    aio::{ConnectionManager, ConnectionManagerConfig},
    cmd, pipe,
};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Store, StoreResult};

pub const QUICK_ROLLS: &str = "quick_rolls";
pub const ROLLS: &str = "rolls";
pub const ROLL_TIMELINE: &str = "rolls:timeline";

const CONNECTION_TIMEOUT: Duration = Duration::from_millis(500);
const SCAN_COUNT: usize = 100;

fn owner_quick_rolls_key(owner: &ObjectId) -> String {
    format!("{QUICK_ROLLS}:{owner}")
}

fn owner_timeline_key(owner: &ObjectId) -> String {
    format!("{ROLL_TIMELINE}:{owner}")
}

/// Lazily established, process-wide connection.
///
/// The first caller connects while later callers wait on the same lock, so
/// concurrent first requests open a single connection. A failed attempt
/// leaves the slot empty and the next call tries again.
pub struct Connector {
    client: Client,
    manager: Mutex<Option<ConnectionManager>>,
}

impl Connector {
    pub fn open(redis_url: &str) -> RedisResult<Self> {
        Ok(Self {
            client: Client::open(redis_url)?,
            manager: Mutex::new(None),
        })
    }

    pub async fn connection(&self) -> RedisResult<ConnectionManager> {
        let mut slot = self.manager.lock().await;

        if let Some(manager) = slot.as_ref() {
            return Ok(manager.clone());
        }

        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(CONNECTION_TIMEOUT);

        let manager = self
            .client
            .get_connection_manager_with_config(config)
            .await
            .map_err(|e| {
                warn!("Failed to connect to Redis: {e}");
                e
            })?;

        info!("Connected to Redis");
        *slot = Some(manager.clone());

        Ok(manager)
    }

    pub async fn is_connected(&self) -> bool {
        self.manager.lock().await.is_some()
    }

    pub async fn teardown(&self) {
        if self.manager.lock().await.take().is_some() {
            info!("Dropped Redis connection");
        }
    }
}

pub struct RedisStore {
    connector: Connector,
}

impl RedisStore {
    pub fn open(redis_url: &str) -> RedisResult<Self> {
        Ok(Self {
            connector: Connector::open(redis_url)?,
        })
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    async fn fetch_documents<T: DeserializeOwned>(
        &self,
        conn: &mut ConnectionManager,
        hash: &str,
        ids: &[String],
    ) -> StoreResult<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw: Vec<Option<String>> = cmd("HMGET").arg(hash).arg(ids).query_async(conn).await?;

        let mut documents = Vec::with_capacity(raw.len());
        for (id, json) in ids.iter().zip(raw) {
            match json {
                Some(json) => documents.push(serde_json::from_str(&json)?),
                None => debug!("Dangling index entry {id} in {hash}"),
            }
        }

        Ok(documents)
    }

    /// Every key matching `pattern`, walked with `SCAN` so Redis never blocks.
    async fn scan_keys(
        &self,
        conn: &mut ConnectionManager,
        pattern: &str,
    ) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut cursor = 0u64;

        loop {
            let (next, batch): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(conn)
                .await?;
            keys.extend(batch);

            if next == 0 {
                return Ok(keys);
            }
            cursor = next;
        }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connector.connection().await?;
        let _: String = cmd("PING").query_async(&mut conn).await?;

        Ok(())
    }

    async fn insert_quick_roll(&self, quick_roll: &QuickRoll) -> StoreResult<()> {
        let mut conn = self.connector.connection().await?;
        let json = serde_json::to_string(quick_roll)?;

        pipe()
            .atomic()
            .hset(QUICK_ROLLS, quick_roll.id.as_str(), json)
            .ignore()
            .sadd(owner_quick_rolls_key(&quick_roll.owner), quick_roll.id.as_str())
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }

    async fn find_quick_roll(&self, id: &ObjectId) -> StoreResult<Option<QuickRoll>> {
        let mut conn = self.connector.connection().await?;
        let json: Option<String> = conn.hget(QUICK_ROLLS, id.as_str()).await?;

        Ok(json.map(|json| serde_json::from_str(&json)).transpose()?)
    }

    async fn owner_quick_rolls(&self, owner: &ObjectId) -> StoreResult<Vec<QuickRoll>> {
        let mut conn = self.connector.connection().await?;
        let ids: Vec<String> = conn.smembers(owner_quick_rolls_key(owner)).await?;

        self.fetch_documents(&mut conn, QUICK_ROLLS, &ids).await
    }

    async fn replace_quick_roll(&self, quick_roll: &QuickRoll) -> StoreResult<()> {
        let mut conn = self.connector.connection().await?;
        let json = serde_json::to_string(quick_roll)?;

        let _: () = conn.hset(QUICK_ROLLS, quick_roll.id.as_str(), json).await?;

        Ok(())
    }

    async fn delete_and_compact(
        &self,
        quick_roll: &QuickRoll,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut conn = self.connector.connection().await?;
        let owner_key = owner_quick_rolls_key(&quick_roll.owner);

        let ids: Vec<String> = conn.smembers(&owner_key).await?;
        let siblings: Vec<QuickRoll> = self.fetch_documents(&mut conn, QUICK_ROLLS, &ids).await?;

        let mut pipeline = pipe();
        pipeline
            .atomic()
            .hdel(QUICK_ROLLS, quick_roll.id.as_str())
            .ignore()
            .srem(&owner_key, quick_roll.id.as_str())
            .ignore();

        let mut shifted = 0;
        for mut sibling in siblings
            .into_iter()
            .filter(|q| q.id != quick_roll.id && q.order > quick_roll.order)
        {
            sibling.order -= 1;
            sibling.updated_at = now;

            pipeline
                .hset(QUICK_ROLLS, sibling.id.as_str(), serde_json::to_string(&sibling)?)
                .ignore();
            shifted += 1;
        }

        pipeline.query_async::<()>(&mut conn).await?;

        Ok(shifted)
    }

    async fn insert_roll(&self, roll: &Roll) -> StoreResult<()> {
        let mut conn = self.connector.connection().await?;
        let json = serde_json::to_string(roll)?;
        let score = roll.created_at.timestamp_millis();

        let mut pipeline = pipe();
        pipeline
            .atomic()
            .hset(ROLLS, roll.id.as_str(), json)
            .ignore()
            .zadd(ROLL_TIMELINE, roll.id.as_str(), score)
            .ignore();

        if let Some(owner) = &roll.owner {
            pipeline
                .zadd(owner_timeline_key(owner), roll.id.as_str(), score)
                .ignore();
        }

        pipeline.query_async::<()>(&mut conn).await?;

        Ok(())
    }

    async fn recent_rolls(&self, owner: Option<&ObjectId>, limit: usize) -> StoreResult<Vec<Roll>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.connector.connection().await?;
        let timeline = owner.map_or_else(|| ROLL_TIMELINE.to_string(), owner_timeline_key);

        let ids: Vec<String> = conn.zrevrange(timeline, 0, limit as isize - 1).await?;

        self.fetch_documents(&mut conn, ROLLS, &ids).await
    }

    async fn clear_rolls(&self, owner: Option<&ObjectId>) -> StoreResult<u64> {
        let mut conn = self.connector.connection().await?;

        let Some(owner) = owner else {
            let timelines = self.scan_keys(&mut conn, &format!("{ROLL_TIMELINE}:*")).await?;

            let mut pipeline = pipe();
            pipeline
                .atomic()
                .hlen(ROLLS)
                .del(ROLLS)
                .ignore()
                .del(ROLL_TIMELINE)
                .ignore();
            for timeline in &timelines {
                pipeline.del(timeline).ignore();
            }
            let (deleted,): (u64,) = pipeline.query_async(&mut conn).await?;

            return Ok(deleted);
        };

        let timeline = owner_timeline_key(owner);
        let ids: Vec<String> = conn.zrange(&timeline, 0, -1).await?;

        if ids.is_empty() {
            return Ok(0);
        }

        pipe()
            .atomic()
            .hdel(ROLLS, &ids)
            .ignore()
            .zrem(ROLL_TIMELINE, &ids)
            .ignore()
            .del(&timeline)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;

        Ok(ids.len() as u64)
    }

    async fn teardown(&self) {
        self.connector.teardown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::contract;

    #[test]
    fn test_key_layout() {
        let owner = ObjectId::parse("507f1f77bcf86cd799439011").unwrap();

        assert_eq!(
            owner_quick_rolls_key(&owner),
            "quick_rolls:507f1f77bcf86cd799439011"
        );
        assert_eq!(
            owner_timeline_key(&owner),
            "rolls:timeline:507f1f77bcf86cd799439011"
        );
    }

    #[test]
    fn test_rejects_malformed_url() {
        assert!(RedisStore::open("not a redis url").is_err());
    }

    #[tokio::test]
    async fn test_failed_connect_is_not_cached() {
        // Nothing listens on port 1, opening does not connect yet.
        let store = RedisStore::open("redis://127.0.0.1:1").unwrap();
        assert!(!store.connector().is_connected().await);

        assert!(store.ping().await.is_err());
        assert!(!store.connector().is_connected().await);

        assert!(store.ping().await.is_err());
        assert!(!store.connector().is_connected().await);
    }

    /// Store against a real server when `REDIS_URL` is set, otherwise `None`
    /// and the test passes without running.
    fn live_store() -> Option<RedisStore> {
        let url = std::env::var("REDIS_URL").ok()?;
        Some(RedisStore::open(&url).unwrap())
    }

    #[tokio::test]
    async fn test_live_delete_compacts_orders() {
        let Some(store) = live_store() else { return };

        contract::delete_compacts_orders(&store).await;
        store.teardown().await;
    }

    #[tokio::test]
    async fn test_live_recent_rolls_newest_first() {
        let Some(store) = live_store() else { return };

        contract::recent_rolls_newest_first(&store).await;
        store.teardown().await;
    }

    #[tokio::test]
    async fn test_live_clear_by_owner() {
        let Some(store) = live_store() else { return };

        contract::clear_by_owner(&store).await;
        store.teardown().await;
    }
}
