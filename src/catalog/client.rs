//! HTTP source for the remote catalog.
//!
//! One GET, no auth, no retries. The endpoint comes from [`Config`](crate::config::Config)
//! (`CATALOG_SHELF_URL`, default [`DEFAULT_CATALOG_URL`]).

use reqwest::Client;

use super::{CatalogSource, FetchError};
use crate::models::Entity;

pub const DEFAULT_CATALOG_URL: &str = "https://api.tvmaze.com/shows";

#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    url: String,
    client: Client,
}

impl HttpCatalogSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for HttpCatalogSource {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_URL)
    }
}

impl CatalogSource for HttpCatalogSource {
    async fn fetch(&self) -> Result<Vec<Entity>, FetchError> {
        tracing::debug!("Fetching catalog from {}", self.url);
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status(format!("{}: {}", status, body)));
        }

        let body = response.bytes().await?;
        let records: Vec<serde_json::Value> = serde_json::from_slice(&body)?;
        Ok(records.into_iter().filter_map(decode_record).collect())
    }
}

/// One catalog element, or `None` (logged) when it lacks an id or name.
fn decode_record(record: serde_json::Value) -> Option<Entity> {
    match serde_json::from_value(record) {
        Ok(entity) => Some(entity),
        Err(e) => {
            tracing::warn!("Skipping unusable catalog record: {}", e);
            None
        }
    }
}
