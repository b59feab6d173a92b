use std::{collections::HashMap, sync::Arc};

use dice::ObjectId;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per owner. Mutations of an owner's quick rolls hold it for
/// their whole read-modify-write so `order` stays dense.
#[derive(Default)]
pub struct OwnerLocks {
    locks: Mutex<HashMap<ObjectId, Arc<AsyncMutex<()>>>>,
}

impl OwnerLocks {
    pub async fn lock(&self, owner: &ObjectId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            // Entries nobody holds or waits on can go.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(owner.clone()).or_default().clone()
        };

        lock.lock_owned().await
    }

    pub fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}
