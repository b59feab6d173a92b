//! # Quick Roll Ordering
//!
//! Presets are rendered in `order`, which for every owner is exactly
//! `{0, 1, ..., n-1}`:
//!
//! - Create appends: `order = max + 1`, or `0` for the first preset
//! - Delete compacts: every preset above the deleted position moves down one
//! - Update never compacts, a caller setting `order` owns the consequences
//!
//! Create, update and delete hold the owner's lock from the first read to the
//! last write, so two requests for the same owner cannot interleave their
//! read-modify-write and leave gaps or duplicates behind.
use std::{cmp::Ordering, sync::Arc};

use chrono::Utc;
use dice::{Category, NewQuickRoll, ObjectId, QuickRoll, QuickRollPatch, Sort, SortField};
use tracing::{debug, info};

use crate::{
    database::Store,
    error::AppError,
    locks::OwnerLocks,
    utils::{MAX_LIMIT, lenient_owner, record_id, required_owner},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListOptions {
    pub category: Option<Category>,
    pub limit: usize,
    pub sort: Sort,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            category: None,
            limit: MAX_LIMIT,
            sort: Sort::default(),
        }
    }
}

pub struct QuickRollService {
    store: Arc<dyn Store>,
    locks: OwnerLocks,
}

impl QuickRollService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            locks: OwnerLocks::default(),
        }
    }

    pub async fn create(
        &self,
        owner: Option<&str>,
        fields: NewQuickRoll,
    ) -> Result<QuickRoll, AppError> {
        fields.validate()?;
        let owner = required_owner(owner)?;

        let _guard = self.locks.lock(&owner).await;

        let next_order = self
            .store
            .owner_quick_rolls(&owner)
            .await?
            .iter()
            .map(|q| q.order)
            .max()
            .map_or(0, |max| max + 1);

        let quick_roll =
            QuickRoll::new(ObjectId::generate(), owner, fields, next_order, Utc::now());
        self.store.insert_quick_roll(&quick_roll).await?;

        info!(
            "Created quick roll {} for {} at order {}",
            quick_roll.id, quick_roll.owner, quick_roll.order
        );

        Ok(quick_roll)
    }

    pub async fn update(
        &self,
        id: &str,
        owner: Option<&str>,
        patch: QuickRollPatch,
    ) -> Result<QuickRoll, AppError> {
        let owner = required_owner(owner)?;
        let id = record_id(id)?;

        if patch.is_empty() {
            return Err(AppError::NoFieldsProvided);
        }
        patch.validate()?;

        let _guard = self.locks.lock(&owner).await;

        let mut quick_roll = self.owned(&id, &owner, "update").await?;
        patch.apply(&mut quick_roll, Utc::now());
        self.store.replace_quick_roll(&quick_roll).await?;

        info!("Updated quick roll {id}");

        Ok(quick_roll)
    }

    pub async fn delete(&self, id: &str, owner: Option<&str>) -> Result<QuickRoll, AppError> {
        let owner = required_owner(owner)?;
        let id = record_id(id)?;

        let _guard = self.locks.lock(&owner).await;

        let quick_roll = self.owned(&id, &owner, "delete").await?;
        let shifted = self
            .store
            .delete_and_compact(&quick_roll, Utc::now())
            .await?;

        info!(
            "Deleted quick roll {id} at order {}, shifted {shifted}",
            quick_roll.order
        );

        Ok(quick_roll)
    }

    /// An absent or malformed owner yields an empty list, not an error.
    pub async fn list(
        &self,
        owner: Option<&str>,
        options: &ListOptions,
    ) -> Result<Vec<QuickRoll>, AppError> {
        let Some(owner) = lenient_owner(owner) else {
            debug!("Listing quick rolls without a valid owner");
            return Ok(Vec::new());
        };

        let mut quick_rolls: Vec<QuickRoll> = self
            .store
            .owner_quick_rolls(&owner)
            .await?
            .into_iter()
            .filter(|q| options.category.is_none_or(|c| q.category == c))
            .collect();

        quick_rolls.sort_by(|a, b| compare(a, b, options.sort));
        quick_rolls.truncate(options.limit);

        Ok(quick_rolls)
    }

    async fn owned(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        action: &'static str,
    ) -> Result<QuickRoll, AppError> {
        let quick_roll = self
            .store
            .find_quick_roll(id)
            .await?
            .ok_or(AppError::NotFound)?;

        if &quick_roll.owner != owner {
            return Err(AppError::Forbidden(action));
        }

        Ok(quick_roll)
    }
}

fn compare(a: &QuickRoll, b: &QuickRoll, sort: Sort) -> Ordering {
    let primary = match sort.field {
        SortField::Order => a.order.cmp(&b.order),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Name => a.name.cmp(&b.name),
    };
    let primary = if sort.descending {
        primary.reverse()
    } else {
        primary
    };

    primary
        .then_with(|| a.order.cmp(&b.order))
        .then_with(|| a.id.cmp(&b.id))
}
