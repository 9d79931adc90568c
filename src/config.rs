//! Runtime configuration.
//!
//! Resolved in order: built-in defaults, `config.json` in the user config
//! directory (`<config dir>/catalog-shelf/config.json`), then environment:
//! - `CATALOG_SHELF_URL` - catalog endpoint
//! - `CATALOG_SHELF_DB` - path of the SQLite document database

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_CATALOG_URL;
use crate::store::SqliteStore;

const APP_NAME: &str = "catalog-shelf";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog_url: String,
    /// `None` means the platform data directory.
    pub database_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            database_path: None,
        }
    }
}

impl Config {
    /// Load from the config file (if any) and apply environment overrides.
    /// A missing or unreadable file falls back to defaults.
    pub fn load() -> Self {
        let base = match Self::try_load_file() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        base.with_overrides(|name| std::env::var(name).ok())
    }

    fn try_load_file() -> Result<Self> {
        let Some(path) = config_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Apply `CATALOG_SHELF_*` overrides looked up through `var`.
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var("CATALOG_SHELF_URL") {
            self.catalog_url = url;
        }
        if let Some(path) = var("CATALOG_SHELF_DB") {
            self.database_path = Some(PathBuf::from(path));
        }
        self
    }

    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => SqliteStore::default_path(),
        }
    }
}

fn config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Some(path)
}
