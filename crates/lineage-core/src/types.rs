//! Core domain types for the lineage knowledge graph.
//!
//! Dataset lineage: datasets, data files, features, categories, units,
//! storage descriptors. NAS provenance: layers, hardware, experiments.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ── Dataset Lineage ───────────────────────────────────────────────

/// The category a feature column belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Index,
    Setting,
    Sensor,
    #[serde(rename = "RUL")]
    Rul,
}

impl Category {
    /// The `Category.name` stored in the graph.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "Index",
            Self::Setting => "Setting",
            Self::Sensor => "Sensor",
            Self::Rul => "RUL",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One feature column of a data file, tagged with its category and unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureSpec {
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub unit: Option<String>,
}

impl FeatureSpec {
    pub fn new(name: &str, category: Category, unit: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            category,
            unit: unit.map(str::to_string),
        }
    }
}

/// The feature columns of a file together with descriptions of their units.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureSet {
    pub features: Vec<FeatureSpec>,
    /// Unit name → human-readable description.
    #[serde(default)]
    pub units: BTreeMap<String, String>,
}

impl FeatureSet {
    /// Description for a unit, if one is known.
    pub fn unit_description(&self, unit: &str) -> Option<&str> {
        self.units.get(unit).map(String::as_str)
    }

    /// Load a feature set from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// A storage location for a data file. Identity is the full tuple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct StorageDescriptor {
    #[serde(rename = "type")]
    pub storage_type: String,
    pub path: String,
    #[serde(rename = "storage_url")]
    pub url: String,
    #[serde(rename = "storage_name")]
    pub name: String,
}

// ── NAS Provenance ────────────────────────────────────────────────

/// A reusable network layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayerSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: String,
    #[serde(default)]
    pub kernel: Option<i64>,
    #[serde(default)]
    pub params: Option<i64>,
}

/// A training dataset referenced by NAS experiments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetSpec {
    pub name: String,
    pub samples: i64,
    pub classes: i64,
}

/// A deployment target with resource limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HardwareSpec {
    pub name: String,
    pub max_memory_mb: i64,
    pub max_latency_ms: f64,
}

/// One evaluation result of an architecture. Append-only once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentRecord {
    pub name: String,
    pub architecture: String,
    /// Layer names in composition order.
    pub layers: Vec<String>,
    pub accuracy: f64,
    pub latency_ms: f64,
    pub flops: Option<f64>,
    pub energy_mj: Option<f64>,
    pub timestamp: DateTime<Utc>,
    /// Dataset the architecture was trained on.
    pub dataset: Option<String>,
    /// Hardware the architecture was evaluated on.
    pub hardware: Option<String>,
}

impl ExperimentRecord {
    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names() {
        assert_eq!(Category::Rul.as_str(), "RUL");
        assert_eq!(
            serde_json::to_string(&Category::Rul).unwrap(),
            "\"RUL\""
        );
        let parsed: Category = serde_json::from_str("\"Sensor\"").unwrap();
        assert_eq!(parsed, Category::Sensor);
    }

    #[test]
    fn test_feature_set_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.json");
        std::fs::write(
            &path,
            r#"{
                "features": [
                    {"name": "cycle", "category": "Index"},
                    {"name": "T24", "category": "Sensor", "unit": "R"}
                ],
                "units": {"R": "Rankine temperature scale"}
            }"#,
        )
        .unwrap();

        let set = FeatureSet::from_json_file(&path).unwrap();
        assert_eq!(set.features.len(), 2);
        assert_eq!(set.features[0].unit, None);
        assert_eq!(set.unit_description("R"), Some("Rankine temperature scale"));
        assert_eq!(set.unit_description("psia"), None);
    }

    #[test]
    fn test_feature_set_missing_file() {
        let err = FeatureSet::from_json_file("/nonexistent/features.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_storage_descriptor_serializes_graph_property_names() {
        let s = StorageDescriptor {
            storage_type: "s3".to_string(),
            path: "/cmapss/train_FD001.txt".to_string(),
            url: "s3://bucket".to_string(),
            name: "raw".to_string(),
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["type"], "s3");
        assert_eq!(v["storage_url"], "s3://bucket");
        assert_eq!(v["storage_name"], "raw");
    }
}
