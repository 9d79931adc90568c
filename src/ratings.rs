//! Star ratings, one local opinion per entity.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use thiserror::Error;

use crate::store::{keys, Documents, StoreError};

pub const RATING_RANGE: RangeInclusive<i64> = 1..=5;

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("Rating {0} is out of range [1, 5]")]
    OutOfRange(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct RatingStore {
    docs: Documents,
}

impl RatingStore {
    pub fn new(docs: Documents) -> Self {
        Self { docs }
    }

    /// Overwrites any previous rating for the entity.
    pub fn set_rating(&self, entity_id: &str, value: i64) -> Result<(), RatingError> {
        if !RATING_RANGE.contains(&value) {
            return Err(RatingError::OutOfRange(value));
        }

        let guard = self.docs.lock()?;
        let mut ratings: BTreeMap<String, u8> = guard.read_or_default(keys::RATINGS)?;
        ratings.insert(entity_id.to_string(), value as u8);
        guard.write(keys::RATINGS, &ratings)?;

        tracing::info!("Rated {} with {} stars", entity_id, value);
        Ok(())
    }

    /// `None` means unrated.
    pub fn get_rating(&self, entity_id: &str) -> Result<Option<u8>, RatingError> {
        let ratings: BTreeMap<String, u8> = self.docs.lock()?.read_or_default(keys::RATINGS)?;
        Ok(ratings.get(entity_id).copied())
    }

    pub fn all_ratings(&self) -> Result<BTreeMap<String, u8>, RatingError> {
        Ok(self.docs.lock()?.read_or_default(keys::RATINGS)?)
    }
}
