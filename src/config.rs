//! Engine Configuration
//!
//! Settings come from, lowest precedence first: built-in defaults, an
//! optional JSON config file, then environment variables. The command-line
//! caller applies its own flags on top.

use crate::catalog::Catalog;
use crate::error::{NormalizeError, Result};
use crate::forbidden::DisallowList;
use crate::fuzzy_matcher::FuzzyMatcher;
use crate::pipeline::InventoryPipeline;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const ENV_CATALOG_PATH: &str = "INVENTORY_CATALOG_PATH";
pub const ENV_DISALLOW_PATH: &str = "INVENTORY_DISALLOW_PATH";
pub const ENV_SIMILARITY_THRESHOLD: &str = "INVENTORY_SIMILARITY_THRESHOLD";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub matcher: FuzzyMatcher,
    /// Catalog file; the embedded catalog is used when unset
    pub catalog_path: Option<PathBuf>,
    /// Disallow-list file; the embedded list is used when unset
    pub disallow_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.matcher.validate()?;
        Ok(config)
    }

    /// Overlay environment variables on top of this config.
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary lookup (the process environment in
    /// production, a map in tests).
    pub fn with_vars<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_CATALOG_PATH).filter(|v| !v.trim().is_empty()) {
            self.catalog_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup(ENV_DISALLOW_PATH).filter(|v| !v.trim().is_empty()) {
            self.disallow_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_SIMILARITY_THRESHOLD) {
            let threshold: f64 = raw.trim().parse().map_err(|_| {
                NormalizeError::Config(format!(
                    "{} is not a number: '{}'",
                    ENV_SIMILARITY_THRESHOLD, raw
                ))
            })?;
            self.matcher.similarity_threshold = threshold;
        }
        self.matcher.validate()?;
        Ok(self)
    }

    /// Load the catalog and disallow-list and build a pipeline. Any load
    /// failure is returned; no pipeline exists without valid tables.
    pub fn build_pipeline(&self) -> Result<InventoryPipeline> {
        let catalog = match &self.catalog_path {
            Some(path) => Catalog::load(path)?,
            None => Catalog::embedded()?,
        };
        let disallow = match &self.disallow_path {
            Some(path) => DisallowList::load(path)?,
            None => DisallowList::embedded()?,
        };

        info!(
            "Pipeline ready: catalog '{}' ({} entries), {} disallow terms, threshold {}",
            catalog.version(),
            catalog.len(),
            disallow.len(),
            self.matcher.similarity_threshold
        );

        InventoryPipeline::new(catalog, disallow).with_matcher(self.matcher.clone())
    }
}
