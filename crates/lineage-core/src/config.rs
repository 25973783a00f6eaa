//! Configuration management for lineage services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`LINEAGE__` prefix, `__` separator,
//!    e.g. `LINEAGE__NEO4J__URI`)
//! 2. Config file (`lineage.toml` by default)
//! 3. Defaults

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level settings, one field per config section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub neo4j: Neo4jSettings,

    #[serde(default)]
    pub cleanup: CleanupSettings,

    #[serde(default)]
    pub search: SearchSettings,
}

/// Connection settings for the Neo4j store.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jSettings {
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

/// Settings for batched maintenance operations.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupSettings {
    /// Maximum nodes touched by one batch transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

/// Settings for the architecture search loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Iterations per worker.
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Candidates whose depth already produced an experiment slower than
    /// this are pruned.
    #[serde(default = "default_latency_threshold")]
    pub latency_threshold_ms: f64,

    /// RNG seed; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Dataset recorded as `TRAINED_ON` provenance.
    #[serde(default)]
    pub dataset: Option<String>,

    /// Hardware recorded as `EVALUATED_ON` provenance.
    #[serde(default)]
    pub hardware: Option<String>,

    /// Where run journals are written; journaling is off when absent.
    #[serde(default)]
    pub journal_dir: Option<String>,

    /// Concurrent search loops.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Settings {
    /// Load settings from `{file_prefix}.toml` (optional) and `LINEAGE__*`
    /// environment variables.
    pub fn load(file_prefix: &str) -> Result<Self, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("LINEAGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(cfg.try_deserialize()?)
    }
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "lineage-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_batch_size() -> u64 {
    1000
}

fn default_iterations() -> u32 {
    10
}

fn default_latency_threshold() -> f64 {
    20.0
}

fn default_workers() -> usize {
    1
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            latency_threshold_ms: default_latency_threshold(),
            seed: None,
            dataset: None,
            hardware: None,
            journal_dir: None,
            workers: default_workers(),
        }
    }
}
