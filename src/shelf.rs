//! Wires every component onto one document store.

use anyhow::Result;

use crate::catalog::{CatalogCache, CatalogSource, HttpCatalogSource};
use crate::config::Config;
use crate::favorites::{FavoritesError, FavoritesIndex, Toggle};
use crate::feedback::FeedbackStore;
use crate::ratings::RatingStore;
use crate::session::SessionManager;
use crate::store::{DocumentStore, Documents, SqliteStore};

pub struct Shelf<S> {
    pub session: SessionManager,
    pub ratings: RatingStore,
    pub favorites: FavoritesIndex,
    pub feedback: FeedbackStore,
    pub catalog: CatalogCache<S>,
}

impl Shelf<HttpCatalogSource> {
    /// Open the SQLite database and catalog endpoint named by `config`.
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.resolved_database_path()?;
        let store = SqliteStore::open(&path)?;
        tracing::info!("Using database {}", path.display());

        let shelf = Self::new(store, HttpCatalogSource::new(&config.catalog_url));
        let report = shelf.favorites.reconcile()?;
        if !report.is_clean() {
            tracing::warn!("Repaired favorites on open: {:?}", report);
        }
        Ok(shelf)
    }
}

impl<S: CatalogSource> Shelf<S> {
    pub fn new(store: impl DocumentStore + 'static, source: S) -> Self {
        let docs = Documents::new(store);
        Self {
            session: SessionManager::new(docs.clone()),
            ratings: RatingStore::new(docs.clone()),
            favorites: FavoritesIndex::new(docs.clone()),
            feedback: FeedbackStore::new(docs),
            catalog: CatalogCache::new(source),
        }
    }

    /// Toggle a favorite using the record currently in the catalog cache.
    ///
    /// An entity that is already a favorite can be removed even after it has
    /// dropped out of the cache.
    pub fn toggle_favorite(&self, entity_id: &str) -> Result<Toggle, FavoritesError> {
        match self.catalog.get(entity_id) {
            Some(entity) => self.favorites.toggle(entity_id, &entity),
            None => match self.favorites.remove(entity_id) {
                Ok(()) => Ok(Toggle::Removed),
                Err(FavoritesError::NotFound(id)) => Err(FavoritesError::NotInCatalog(id)),
                Err(e) => Err(e),
            },
        }
    }
}
