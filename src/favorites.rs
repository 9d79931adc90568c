//! Favorited entities.
//!
//! Favorites live under two keys: the id list (cheap membership checks) and
//! the detail list (full records, so the favorites view never refetches).
//! Nothing outside this module touches either key, and every mutation
//! rewrites both halves from one in-memory list while holding the store lock.
//!
//! Before touching either half a mutation saves the previous raw values under
//! a journal key and clears it once both writes landed. While the halves
//! disagree and a journal exists, readers see the journalled state, so a write
//! that fails halfway (rollback included) never shows up as a partial add or
//! remove. The next mutation or [`FavoritesIndex::reconcile`] puts the halves
//! back from the journal first. Without a journal, membership is the
//! intersection of the two halves.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Entity;
use crate::store::{keys, Documents, DocumentsGuard, StoreError};

#[derive(Debug, Error)]
pub enum FavoritesError {
    #[error("Entity {0} is not a favorite")]
    NotFound(String),

    #[error("Entity {0} is not in the catalog and not a favorite")]
    NotInCatalog(String),

    #[error("Record id {found} does not match entity {expected}")]
    IdMismatch { expected: String, found: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of [`FavoritesIndex::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

/// What [`FavoritesIndex::reconcile`] had to repair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// An interrupted write was undone from the journal.
    pub rolled_back: bool,
    /// Ids listed without a kept record.
    pub orphaned_ids: Vec<String>,
    /// Records stored without a kept id.
    pub orphaned_details: Vec<String>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        !self.rolled_back && self.orphaned_ids.is_empty() && self.orphaned_details.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FavoritesIndex {
    docs: Documents,
}

/// Raw values of both halves taken before a mutation.
#[derive(Debug, Serialize, Deserialize)]
struct Journal {
    ids: Option<String>,
    details: Option<String>,
}

/// Decoded id list and detail list.
struct Halves {
    ids: Vec<String>,
    details: Vec<Entity>,
}

impl Halves {
    fn parse(ids: Option<&str>, details: Option<&str>) -> Result<Self, StoreError> {
        Ok(Self {
            ids: match ids {
                Some(raw) => serde_json::from_str(raw)?,
                None => Vec::new(),
            },
            details: match details {
                Some(raw) => serde_json::from_str(raw)?,
                None => Vec::new(),
            },
        })
    }

    /// Records whose id is in both halves, in detail-list order, first copy wins.
    fn members(&self) -> Vec<Entity> {
        let listed: HashSet<&str> = self.ids.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        self.details
            .iter()
            .filter(|e| listed.contains(e.id.as_str()) && seen.insert(e.id.as_str()))
            .cloned()
            .collect()
    }

    fn is_consistent(&self) -> bool {
        let members = self.members();
        self.ids.len() == members.len()
            && self.details.len() == members.len()
            && self.ids.iter().zip(&members).all(|(id, e)| *id == e.id)
    }
}

/// Both halves and the journal as currently stored.
struct Stored {
    ids_raw: Option<String>,
    details_raw: Option<String>,
    halves: Halves,
    journal: Option<Journal>,
}

impl Stored {
    fn load(guard: &DocumentsGuard<'_>) -> Result<Self, StoreError> {
        let ids_raw = guard.get_raw(keys::FAVORITE_IDS)?;
        let details_raw = guard.get_raw(keys::FAVORITE_DETAILS)?;
        let halves = Halves::parse(ids_raw.as_deref(), details_raw.as_deref())?;
        let journal = guard.read(keys::FAVORITES_JOURNAL)?;
        Ok(Self {
            ids_raw,
            details_raw,
            halves,
            journal,
        })
    }

    /// The journal, when an interrupted write left the halves disagreeing.
    fn pending(&self) -> Option<&Journal> {
        self.journal
            .as_ref()
            .filter(|_| !self.halves.is_consistent())
    }

    /// Current favorites as readers should see them.
    fn members(&self) -> Result<Vec<Entity>, StoreError> {
        match self.pending() {
            Some(journal) => {
                Ok(Halves::parse(journal.ids.as_deref(), journal.details.as_deref())?.members())
            }
            None => Ok(self.halves.members()),
        }
    }

    /// Undo an interrupted write by restoring both halves from the journal.
    fn settle(self, guard: &DocumentsGuard<'_>) -> Result<Self, StoreError> {
        if self.pending().is_none() {
            return Ok(self);
        }
        if let Some(journal) = &self.journal {
            tracing::warn!("Rolling favorites back to the state before an interrupted write");
            guard.restore_raw(keys::FAVORITE_IDS, journal.ids.as_deref())?;
            guard.restore_raw(keys::FAVORITE_DETAILS, journal.details.as_deref())?;
            clear_journal(guard);
        }
        Self::load(guard)
    }

    /// Write `next` to both halves. On failure the id list is put back as it
    /// was; if that fails too the journal stays behind for readers.
    fn commit(&self, guard: &DocumentsGuard<'_>, next: &[Entity]) -> Result<(), StoreError> {
        guard.write(
            keys::FAVORITES_JOURNAL,
            &Journal {
                ids: self.ids_raw.clone(),
                details: self.details_raw.clone(),
            },
        )?;

        let ids: Vec<&str> = next.iter().map(|e| e.id.as_str()).collect();
        if let Err(err) = guard.write(keys::FAVORITE_IDS, &ids) {
            clear_journal(guard);
            return Err(err);
        }

        let Err(err) = guard.write(keys::FAVORITE_DETAILS, next) else {
            clear_journal(guard);
            return Ok(());
        };

        tracing::warn!("Favorite details write failed, rolling back id list: {}", err);
        match guard.restore_raw(keys::FAVORITE_IDS, self.ids_raw.as_deref()) {
            Ok(()) => {
                clear_journal(guard);
                Err(err)
            }
            Err(rollback) => {
                tracing::error!(
                    "Favorites rollback failed after {}: {}; serving the journalled state until repaired",
                    err,
                    rollback
                );
                Err(StoreError::Corrupted(format!(
                    "favorites detail write failed ({}) and id rollback failed ({})",
                    err, rollback
                )))
            }
        }
    }
}

/// A leftover journal is ignored once the halves agree, so failing here only warns.
fn clear_journal(guard: &DocumentsGuard<'_>) {
    if let Err(e) = guard.remove(keys::FAVORITES_JOURNAL) {
        tracing::warn!("Could not clear favorites journal: {}", e);
    }
}

impl FavoritesIndex {
    pub fn new(docs: Documents) -> Self {
        Self { docs }
    }

    /// Add the entity if it is not a favorite, remove it if it is.
    ///
    /// When adding, `entity` is stored as given; later changes upstream are
    /// not reflected.
    pub fn toggle(&self, entity_id: &str, entity: &Entity) -> Result<Toggle, FavoritesError> {
        if entity.id != entity_id {
            return Err(FavoritesError::IdMismatch {
                expected: entity_id.to_string(),
                found: entity.id.clone(),
            });
        }

        let guard = self.docs.lock()?;
        let stored = Stored::load(&guard)?.settle(&guard)?;
        let mut members = stored.members()?;

        let outcome = if let Some(pos) = members.iter().position(|e| e.id == entity_id) {
            members.remove(pos);
            Toggle::Removed
        } else {
            members.push(entity.clone());
            Toggle::Added
        };

        stored.commit(&guard, &members)?;
        tracing::info!("Favorite {} {:?}", entity_id, outcome);
        Ok(outcome)
    }

    /// Remove a favorite explicitly; unlike [`toggle`](Self::toggle) this never adds.
    pub fn remove(&self, entity_id: &str) -> Result<(), FavoritesError> {
        let guard = self.docs.lock()?;
        let stored = Stored::load(&guard)?.settle(&guard)?;
        let mut members = stored.members()?;

        let pos = members
            .iter()
            .position(|e| e.id == entity_id)
            .ok_or_else(|| FavoritesError::NotFound(entity_id.to_string()))?;
        members.remove(pos);

        stored.commit(&guard, &members)?;
        tracing::info!("Removed favorite {}", entity_id);
        Ok(())
    }

    pub fn is_favorite(&self, entity_id: &str) -> Result<bool, FavoritesError> {
        let guard = self.docs.lock()?;
        Ok(Stored::load(&guard)?
            .members()?
            .iter()
            .any(|e| e.id == entity_id))
    }

    /// Favorited records in the order they were added.
    pub fn list_favorites(&self) -> Result<Vec<Entity>, FavoritesError> {
        let guard = self.docs.lock()?;
        Ok(Stored::load(&guard)?.members()?)
    }

    pub fn favorite_ids(&self) -> Result<Vec<String>, FavoritesError> {
        Ok(self
            .list_favorites()?
            .into_iter()
            .map(|e| e.id)
            .collect())
    }

    /// Rewrite both halves so they agree.
    ///
    /// An interrupted write is rolled back from the journal; after that,
    /// entries found in only one half are dropped.
    pub fn reconcile(&self) -> Result<ReconcileReport, FavoritesError> {
        let guard = self.docs.lock()?;
        let stored = Stored::load(&guard)?;
        let rolled_back = stored.pending().is_some();

        if !rolled_back && stored.halves.is_consistent() {
            if stored.journal.is_some() {
                clear_journal(&guard);
            }
            return Ok(ReconcileReport::default());
        }

        let members = stored.members()?;
        let kept: HashSet<&str> = members.iter().map(|e| e.id.as_str()).collect();
        let report = ReconcileReport {
            rolled_back,
            orphaned_ids: stored
                .halves
                .ids
                .iter()
                .filter(|id| !kept.contains(id.as_str()))
                .cloned()
                .collect(),
            orphaned_details: stored
                .halves
                .details
                .iter()
                .filter(|e| !kept.contains(e.id.as_str()))
                .map(|e| e.id.clone())
                .collect(),
        };

        let stored = stored.settle(&guard)?;
        if !stored.halves.is_consistent() {
            let members = stored.members()?;
            stored.commit(&guard, &members)?;
        }
        tracing::warn!(
            "Reconciled favorites: rolled back {}, dropped {} ids and {} records",
            report.rolled_back,
            report.orphaned_ids.len(),
            report.orphaned_details.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_rejects_mismatched_record() {
        let favorites = FavoritesIndex::new(Documents::in_memory());
        let result = favorites.toggle("1", &Entity::new("2", "Other"));
        assert!(matches!(result, Err(FavoritesError::IdMismatch { .. })));
        assert!(favorites.list_favorites().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_records_collapse_to_one_member() {
        let docs = Documents::in_memory();
        {
            let guard = docs.lock().unwrap();
            guard.write(keys::FAVORITE_IDS, &["1"]).unwrap();
            guard
                .write(
                    keys::FAVORITE_DETAILS,
                    &[Entity::new("1", "First"), Entity::new("1", "Copy")],
                )
                .unwrap();
        }

        let favorites = FavoritesIndex::new(docs);
        let listed = favorites.list_favorites().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "First");
    }

    #[test]
    fn test_leftover_journal_is_ignored_when_halves_agree() {
        let docs = Documents::in_memory();
        {
            let guard = docs.lock().unwrap();
            guard.write(keys::FAVORITE_IDS, &["1"]).unwrap();
            guard
                .write(keys::FAVORITE_DETAILS, &[Entity::new("1", "First")])
                .unwrap();
            guard
                .write(
                    keys::FAVORITES_JOURNAL,
                    &Journal {
                        ids: None,
                        details: None,
                    },
                )
                .unwrap();
        }

        let favorites = FavoritesIndex::new(docs.clone());
        assert_eq!(favorites.favorite_ids().unwrap(), vec!["1"]);
        assert!(favorites.reconcile().unwrap().is_clean());
        assert!(docs
            .lock()
            .unwrap()
            .get_raw(keys::FAVORITES_JOURNAL)
            .unwrap()
            .is_none());
    }
}
