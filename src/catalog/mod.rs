//! The last fetched page of the remote catalog.
//!
//! [`CatalogCache::refresh`] is the only operation that goes to the network;
//! filtering and lookups read the cached list. The cache has its own lock
//! and never touches the document store, so a slow or failing fetch does not
//! hold up favorites, ratings or comments.

mod client;

use std::future::Future;
use std::sync::{RwLock, RwLockReadGuard};

use thiserror::Error;

pub use client::{HttpCatalogSource, DEFAULT_CATALOG_URL};

use crate::models::Entity;

/// How many entities a refresh keeps.
pub const CATALOG_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog returned an error: {0}")]
    Status(String),

    #[error("Failed to parse catalog: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Where the catalog comes from.
pub trait CatalogSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Vec<Entity>, FetchError>> + Send;
}

#[derive(Debug)]
pub struct CatalogCache<S> {
    source: S,
    entries: RwLock<Vec<Entity>>,
}

impl<S: CatalogSource> CatalogCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Fetch, keep the first [`CATALOG_LIMIT`] entities and replace the cache.
    ///
    /// On failure the previous contents stay in place.
    pub async fn refresh(&self) -> Result<Vec<Entity>, FetchError> {
        let mut fetched = match self.source.fetch().await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!("Catalog refresh failed, keeping cached list: {}", e);
                return Err(e);
            }
        };
        fetched.truncate(CATALOG_LIMIT);

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        *entries = fetched.clone();
        tracing::debug!("Catalog cache holds {} entities", entries.len());
        Ok(fetched)
    }
}

impl<S> CatalogCache<S> {
    fn read(&self) -> RwLockReadGuard<'_, Vec<Entity>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn entities(&self) -> Vec<Entity> {
        self.read().clone()
    }

    /// Case-insensitive substring match on the name. An empty query returns everything.
    pub fn filter(&self, query: &str) -> Vec<Entity> {
        let entries = self.read();
        if query.is_empty() {
            return entries.clone();
        }

        let needle = query.to_lowercase();
        entries
            .iter()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn get(&self, entity_id: &str) -> Option<Entity> {
        self.read().iter().find(|e| e.id == entity_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<Entity>);

    impl CatalogSource for Fixed {
        async fn fetch(&self) -> Result<Vec<Entity>, FetchError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_filter_ignores_case() {
        let cache = CatalogCache::new(Fixed(vec![
            Entity::new("1", "Under the Dome"),
            Entity::new("2", "Person of Interest"),
        ]));
        cache.refresh().await.unwrap();

        let found = cache.filter("DOME");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1");
        assert_eq!(cache.filter("").len(), 2);
    }

    #[test]
    fn test_empty_cache_before_refresh() {
        let cache = CatalogCache::new(Fixed(vec![Entity::new("1", "A")]));
        assert!(cache.is_empty());
        assert!(cache.get("1").is_none());
    }
}
