//! YAML configuration for the populate command.
//!
//! Supplies run defaults and per-table overrides; CLI flags take precedence.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Per-table population settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Record count for this table (overrides default)
    pub records: Option<usize>,
    /// Leave this table untouched
    pub skip: bool,
}

/// Default population settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultConfig {
    /// Records per table
    pub records: Option<usize>,
    /// Rows per insert transaction
    pub batch_size: Option<usize>,
    /// Seed for the random source
    pub seed: Option<u64>,
    /// Minimum row count for verification
    pub min_records: Option<u64>,
}

/// Complete YAML configuration for the populate command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulateYamlConfig {
    pub default: DefaultConfig,
    /// Per-table settings
    pub tables: HashMap<String, TableConfig>,
}

impl PopulateYamlConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: PopulateYamlConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Get configuration for a specific table
    pub fn get_table_config(&self, table_name: &str) -> Option<&TableConfig> {
        self.tables.get(table_name).or_else(|| {
            // Try case-insensitive match
            let lower = table_name.to_lowercase();
            self.tables
                .iter()
                .find(|(k, _)| k.to_lowercase() == lower)
                .map(|(_, v)| v)
        })
    }

    pub fn should_skip(&self, table_name: &str) -> bool {
        self.get_table_config(table_name)
            .map(|c| c.skip)
            .unwrap_or(false)
    }

    /// Record count override for a table, if the file sets one
    pub fn get_records(&self, table_name: &str) -> Option<usize> {
        self.get_table_config(table_name).and_then(|c| c.records)
    }

}
