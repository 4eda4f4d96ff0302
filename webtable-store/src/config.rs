//! Table retention settings.
//!
//! Only the `content` and `meta` families keep history. Link families hold
//! one value per qualifier and cannot be configured otherwise.
//!
//! ```json
//! { "max_versions": { "content": 5, "meta": 3 } }
//! ```

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use webtable_core::Family;

pub const DEFAULT_MAX_VERSIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    pub max_versions: BTreeMap<Family, usize>,
}

impl Default for TableConfig {
    fn default() -> Self {
        let max_versions = Family::ALL
            .into_iter()
            .filter(Family::is_versioned)
            .map(|family| (family, DEFAULT_MAX_VERSIONS))
            .collect();
        Self { max_versions }
    }
}

impl TableConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| match e {
            StoreError::Config(msg) => StoreError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: TableConfig =
            serde_json::from_str(json).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Versions retained per cell of `family`.
    pub fn max_versions(&self, family: Family) -> usize {
        if !family.is_versioned() {
            return 1;
        }
        self.max_versions
            .get(&family)
            .copied()
            .unwrap_or(DEFAULT_MAX_VERSIONS)
    }

    pub fn with_max_versions(mut self, family: Family, versions: usize) -> Result<Self> {
        self.max_versions.insert(family, versions);
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        for (family, versions) in &self.max_versions {
            if !family.is_versioned() && *versions != 1 {
                return Err(StoreError::Config(format!(
                    "family '{}' keeps exactly one version",
                    family
                )));
            }
            if *versions == 0 {
                return Err(StoreError::Config(format!(
                    "family '{}' must keep at least one version",
                    family
                )));
            }
        }
        Ok(())
    }
}
