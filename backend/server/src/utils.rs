use dice::ObjectId;

use crate::error::AppError;

pub const MIN_LIMIT: usize = 1;
pub const MAX_LIMIT: usize = 100;

/// Out-of-range limits are clamped, unparsable ones fall back to `default`.
pub fn clamp_limit(requested: Option<&str>, default: usize) -> usize {
    requested
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .map_or(default, |n| {
            n.clamp(MIN_LIMIT as i64, MAX_LIMIT as i64) as usize
        })
}

/// Treats an empty query value the same as an absent one.
pub fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Owner for mutating endpoints: absent or malformed is a 400.
pub fn required_owner(user_id: Option<&str>) -> Result<ObjectId, AppError> {
    present(user_id)
        .and_then(|id| ObjectId::parse(id).ok())
        .ok_or(AppError::OwnerRequired)
}

/// Owner used only as a filter: absent is fine, malformed is a 400.
pub fn optional_owner(user_id: Option<&str>) -> Result<Option<ObjectId>, AppError> {
    present(user_id)
        .map(|id| ObjectId::parse(id).map_err(|_| AppError::InvalidOwner))
        .transpose()
}

/// Owner for the lenient listing: absent or malformed means "nobody".
pub fn lenient_owner(user_id: Option<&str>) -> Option<ObjectId> {
    present(user_id).and_then(|id| ObjectId::parse(id).ok())
}

pub fn record_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse(id).map_err(|_| AppError::InvalidIdentifier("quick roll"))
}
