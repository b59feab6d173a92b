use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dice::{ObjectId, QuickRoll, Roll};
use parking_lot::RwLock;

use super::{Store, StoreResult};

/// In-process store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    quick_rolls: RwLock<HashMap<ObjectId, QuickRoll>>,
    rolls: RwLock<Vec<Roll>>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_quick_roll(&self, quick_roll: &QuickRoll) -> StoreResult<()> {
        self.quick_rolls
            .write()
            .insert(quick_roll.id.clone(), quick_roll.clone());

        Ok(())
    }

    async fn find_quick_roll(&self, id: &ObjectId) -> StoreResult<Option<QuickRoll>> {
        Ok(self.quick_rolls.read().get(id).cloned())
    }

    async fn owner_quick_rolls(&self, owner: &ObjectId) -> StoreResult<Vec<QuickRoll>> {
        Ok(self
            .quick_rolls
            .read()
            .values()
            .filter(|q| &q.owner == owner)
            .cloned()
            .collect())
    }

    async fn replace_quick_roll(&self, quick_roll: &QuickRoll) -> StoreResult<()> {
        self.insert_quick_roll(quick_roll).await
    }

    async fn delete_and_compact(
        &self,
        quick_roll: &QuickRoll,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut quick_rolls = self.quick_rolls.write();
        quick_rolls.remove(&quick_roll.id);

        let mut shifted = 0;
        for other in quick_rolls.values_mut() {
            if other.owner == quick_roll.owner && other.order > quick_roll.order {
                other.order -= 1;
                other.updated_at = now;
                shifted += 1;
            }
        }

        Ok(shifted)
    }

    async fn insert_roll(&self, roll: &Roll) -> StoreResult<()> {
        self.rolls.write().push(roll.clone());

        Ok(())
    }

    async fn recent_rolls(&self, owner: Option<&ObjectId>, limit: usize) -> StoreResult<Vec<Roll>> {
        let mut rolls: Vec<Roll> = self
            .rolls
            .read()
            .iter()
            .filter(|r| owner.is_none_or(|owner| r.owner.as_ref() == Some(owner)))
            .cloned()
            .collect();

        // Insertion order breaks timestamp ties, newest first.
        rolls.reverse();
        rolls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rolls.truncate(limit);

        Ok(rolls)
    }

    async fn clear_rolls(&self, owner: Option<&ObjectId>) -> StoreResult<u64> {
        let mut rolls = self.rolls.write();
        let before = rolls.len();

        match owner {
            Some(owner) => rolls.retain(|r| r.owner.as_ref() != Some(owner)),
            None => rolls.clear(),
        }

        Ok((before - rolls.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use dice::NewQuickRoll;

    use super::*;
    use crate::database::contract;

    fn owner(hex: &str) -> ObjectId {
        ObjectId::parse(hex).unwrap()
    }

    fn roll(owner: Option<ObjectId>, at: DateTime<Utc>) -> Roll {
        Roll::new(ObjectId::generate(), "2d6", &[3, 4], 7, owner, at).unwrap()
    }

    #[tokio::test]
    async fn test_recent_rolls_newest_first_with_limit() {
        let store = MemoryStore::default();
        let start = Utc::now();

        for minutes in 0..5 {
            store
                .insert_roll(&roll(None, start + Duration::minutes(minutes)))
                .await
                .unwrap();
        }

        let recent = store.recent_rolls(None, 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].created_at, start + Duration::minutes(4));
        assert_eq!(recent[2].created_at, start + Duration::minutes(2));
    }

    #[tokio::test]
    async fn test_recent_rolls_ties_keep_insertion_order() {
        let store = MemoryStore::default();
        let at = Utc::now();

        let first = roll(None, at);
        let second = roll(None, at);
        store.insert_roll(&first).await.unwrap();
        store.insert_roll(&second).await.unwrap();

        let recent = store.recent_rolls(None, 10).await.unwrap();
        assert_eq!(recent[0].id, second.id);
        assert_eq!(recent[1].id, first.id);
    }

    #[tokio::test]
    async fn test_clear_by_owner_and_everything() {
        let store = MemoryStore::default();
        let alice = owner("aaaaaaaaaaaaaaaaaaaaaaaa");
        let bob = owner("bbbbbbbbbbbbbbbbbbbbbbbb");
        let now = Utc::now();

        store.insert_roll(&roll(Some(alice.clone()), now)).await.unwrap();
        store.insert_roll(&roll(Some(alice.clone()), now)).await.unwrap();
        store.insert_roll(&roll(Some(bob.clone()), now)).await.unwrap();
        store.insert_roll(&roll(None, now)).await.unwrap();

        assert_eq!(store.clear_rolls(Some(&alice)).await.unwrap(), 2);
        assert_eq!(store.recent_rolls(Some(&bob), 10).await.unwrap().len(), 1);
        assert_eq!(store.clear_rolls(None).await.unwrap(), 2);
        assert!(store.recent_rolls(None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_compaction_only_touches_owner_above_deleted() {
        let store = MemoryStore::default();
        let alice = owner("aaaaaaaaaaaaaaaaaaaaaaaa");
        let bob = owner("bbbbbbbbbbbbbbbbbbbbbbbb");
        let now = Utc::now();

        let mut deleted = None;
        for (who, order) in [(&alice, 0), (&alice, 1), (&alice, 2), (&alice, 3), (&bob, 2)] {
            let fields = NewQuickRoll {
                name: format!("preset {order}"),
                notation: "1d20".to_string(),
                ..Default::default()
            };
            let quick_roll = QuickRoll::new(ObjectId::generate(), who.clone(), fields, order, now);
            store.insert_quick_roll(&quick_roll).await.unwrap();
            if who == &alice && order == 1 {
                deleted = Some(quick_roll);
            }
        }

        let deleted = deleted.unwrap();
        assert_eq!(store.delete_and_compact(&deleted, now).await.unwrap(), 2);
        assert!(store.find_quick_roll(&deleted.id).await.unwrap().is_none());

        let mut alice_orders: Vec<u32> = store
            .owner_quick_rolls(&alice)
            .await
            .unwrap()
            .iter()
            .map(|q| q.order)
            .collect();
        alice_orders.sort();
        assert_eq!(alice_orders, vec![0, 1, 2]);

        let bob_orders: Vec<u32> = store
            .owner_quick_rolls(&bob)
            .await
            .unwrap()
            .iter()
            .map(|q| q.order)
            .collect();
        assert_eq!(bob_orders, vec![2]);
    }

    #[tokio::test]
    async fn test_store_contract() {
        let store = MemoryStore::default();

        contract::delete_compacts_orders(&store).await;
        contract::recent_rolls_newest_first(&store).await;
        contract::clear_by_owner(&store).await;
    }
}
