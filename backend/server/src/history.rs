use std::sync::Arc;

use chrono::Utc;
use dice::{ObjectId, Roll};
use tracing::{info, warn};

use crate::{
    database::Store,
    error::AppError,
    utils::{optional_owner, present},
};

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

pub struct HistoryService {
    store: Arc<dyn Store>,
    require_clear_confirmation: bool,
}

impl HistoryService {
    pub fn new(store: Arc<dyn Store>, require_clear_confirmation: bool) -> Self {
        Self {
            store,
            require_clear_confirmation,
        }
    }

    /// Persists one roll. The total is stored as given, it is not checked
    /// against the results or the notation's faces.
    pub async fn save(
        &self,
        notation: Option<&str>,
        results: Option<&[i64]>,
        total: Option<i64>,
        owner: Option<&str>,
    ) -> Result<Roll, AppError> {
        let (Some(notation), Some(results), Some(total)) = (present(notation), results, total)
        else {
            return Err(AppError::InvalidInput(
                "dados, resultados (array) and total are required",
            ));
        };

        let owner = optional_owner(owner)?;
        let roll = Roll::new(ObjectId::generate(), notation, results, total, owner, Utc::now())?;

        self.store.insert_roll(&roll).await?;
        info!("Saved roll {} ({} = {})", roll.id, roll.notation, roll.total);

        Ok(roll)
    }

    pub async fn list(
        &self,
        owner: Option<&str>,
        limit: usize,
    ) -> Result<(Vec<Roll>, Option<ObjectId>), AppError> {
        let owner = optional_owner(owner)?;
        let rolls = self.store.recent_rolls(owner.as_ref(), limit).await?;

        Ok((rolls, owner))
    }

    /// Without an owner this deletes every roll, unless confirmation is
    /// required, in which case `all` must be set.
    pub async fn clear(&self, owner: Option<&str>, all: bool) -> Result<u64, AppError> {
        let owner = optional_owner(owner)?;

        if owner.is_none() {
            if self.require_clear_confirmation && !all {
                return Err(AppError::Validation(
                    "clearing every roll requires all=true".to_string(),
                ));
            }

            warn!("Clearing the entire roll history");
        }

        let deleted = self.store.clear_rolls(owner.as_ref()).await?;
        info!("Cleared {deleted} rolls");

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    const ALICE: &str = "aaaaaaaaaaaaaaaaaaaaaaaa";
    const BOB: &str = "bbbbbbbbbbbbbbbbbbbbbbbb";

    fn service(require_clear_confirmation: bool) -> HistoryService {
        HistoryService::new(Arc::new(MemoryStore::default()), require_clear_confirmation)
    }

    #[tokio::test]
    async fn test_save_then_list_newest_first() {
        let history = service(false);

        history
            .save(Some("1d20"), Some(&[12][..]), Some(12), None)
            .await
            .unwrap();
        let saved = history
            .save(Some("2d6"), Some(&[3, 4][..]), Some(7), Some(ALICE))
            .await
            .unwrap();

        let (rolls, filter) = history.list(None, DEFAULT_HISTORY_LIMIT).await.unwrap();
        assert!(filter.is_none());
        assert_eq!(rolls.len(), 2);
        assert_eq!(rolls[0], saved);
        assert_eq!(rolls[0].results, vec![3, 4]);
        assert_eq!(rolls[0].total, 7);

        let (rolls, filter) = history.list(Some(ALICE), DEFAULT_HISTORY_LIMIT).await.unwrap();
        assert_eq!(filter.map(|o| o.to_string()).as_deref(), Some(ALICE));
        assert_eq!(rolls, vec![saved]);
    }

    #[tokio::test]
    async fn test_save_requires_fields() {
        let history = service(false);

        for (notation, results, total) in [
            (None, Some(&[3][..]), Some(3)),
            (Some(""), Some(&[3][..]), Some(3)),
            (Some("1d6"), None, Some(3)),
            (Some("1d6"), Some(&[3][..]), None),
        ] {
            assert!(matches!(
                history.save(notation, results, total, None).await,
                Err(AppError::InvalidInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_save_rejects_bad_owner_and_bounds() {
        let history = service(false);

        assert!(matches!(
            history.save(Some("2d6"), Some(&[3, 4][..]), Some(7), Some("xyz")).await,
            Err(AppError::InvalidOwner)
        ));
        assert!(matches!(
            history.save(Some("2d6+1"), Some(&[3, 4][..]), Some(8), None).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            history.save(Some("1d200"), Some(&[150][..]), Some(150), None).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_rejects_bad_owner() {
        let history = service(false);

        assert!(matches!(
            history.list(Some("xyz"), DEFAULT_HISTORY_LIMIT).await,
            Err(AppError::InvalidOwner)
        ));
    }

    #[tokio::test]
    async fn test_clear_by_owner_and_all() {
        let history = service(false);

        history.save(Some("1d6"), Some(&[1][..]), Some(1), Some(ALICE)).await.unwrap();
        history.save(Some("1d6"), Some(&[2][..]), Some(2), Some(BOB)).await.unwrap();
        history.save(Some("1d6"), Some(&[3][..]), Some(3), None).await.unwrap();

        assert_eq!(history.clear(Some(ALICE), false).await.unwrap(), 1);
        assert_eq!(history.clear(None, false).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_everything_can_require_confirmation() {
        let history = service(true);
        history.save(Some("1d6"), Some(&[1][..]), Some(1), None).await.unwrap();

        assert!(matches!(
            history.clear(None, false).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(history.clear(None, true).await.unwrap(), 1);
    }
}
