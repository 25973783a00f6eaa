//! Read projections over the lineage graph.
//!
//! Each query returns an ordered list of flat records and never writes.
//! Optional relationships (a feature's unit, a file's asset) come back as
//! `None` instead of dropping the row.

use neo4rs::{query, Row};
use serde::{Deserialize, Serialize};

use crate::client::{GraphClient, GraphError};

/// A dataset and one of its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetFileRecord {
    pub dataset: String,
    pub file: String,
    pub file_type: Option<String>,
}

/// A feature of a file with its category and optional unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub feature: String,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub unit_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub unit: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub storage_type: String,
    pub path: String,
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub name: String,
    pub asset_id: String,
    pub asset_type: Option<String>,
}

/// A data file a RUL label file is associated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatedFileRecord {
    pub file: String,
    pub file_type: Option<String>,
}

impl GraphClient {
    // ── Dataset Lineage ──────────────────────────────────────────

    /// Every dataset with its files, ordered by dataset then file.
    pub async fn list_datasets_and_files(&self) -> Result<Vec<DatasetFileRecord>, GraphError> {
        let q = query(
            "MATCH (ds:Dataset)-[:CONTAINS]->(df:DataFile)
             RETURN ds.name AS dataset, df.name AS file, df.type AS type
             ORDER BY dataset, file",
        );

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| {
                Ok(DatasetFileRecord {
                    dataset: get(row, "dataset")?,
                    file: get(row, "file")?,
                    file_type: get(row, "type")?,
                })
            })
            .collect()
    }

    /// Features of a file, ordered by category then feature name.
    pub async fn features_for_file(&self, file: &str) -> Result<Vec<FeatureRecord>, GraphError> {
        let q = query(
            "MATCH (df:DataFile {name: $file})-[:HAS_FEATURE]->(f:Feature)
             OPTIONAL MATCH (f)-[:BELONGS_TO]->(c:Category)
             OPTIONAL MATCH (f)-[:MEASURED_IN]->(u:Unit)
             RETURN f.name AS feature, c.name AS category,
                    u.name AS unit, u.description AS unit_description
             ORDER BY category, feature",
        )
        .param("file", file);

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| {
                Ok(FeatureRecord {
                    feature: get(row, "feature")?,
                    category: get(row, "category")?,
                    unit: get(row, "unit")?,
                    unit_description: get(row, "unit_description")?,
                })
            })
            .collect()
    }

    /// Names of files with the given type, ordered by name.
    pub async fn files_by_type(&self, file_type: &str) -> Result<Vec<String>, GraphError> {
        let q = query(
            "MATCH (df:DataFile)
             WHERE df.type = $file_type
             RETURN df.name AS file
             ORDER BY file",
        )
        .param("file_type", file_type);

        let rows = self.query_rows(q).await?;
        rows.iter().map(|row| get(row, "file")).collect()
    }

    /// Every known unit, ordered by name.
    pub async fn list_units(&self) -> Result<Vec<UnitRecord>, GraphError> {
        let q = query(
            "MATCH (u:Unit)
             RETURN u.name AS unit, u.description AS description
             ORDER BY unit",
        );

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| {
                Ok(UnitRecord {
                    unit: get(row, "unit")?,
                    description: get(row, "description")?,
                })
            })
            .collect()
    }

    /// Storage locations of a file, ordered by type then path.
    pub async fn storage_for_file(&self, file: &str) -> Result<Vec<StorageRecord>, GraphError> {
        let q = query(
            "MATCH (df:DataFile {name: $file})-[:is_stored_in]->(s:Storage)
             RETURN s.type AS type, s.path AS path,
                    s.storage_url AS url, s.storage_name AS name
             ORDER BY type, path, url, name",
        )
        .param("file", file);

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| {
                Ok(StorageRecord {
                    storage_type: get(row, "type")?,
                    path: get(row, "path")?,
                    url: get(row, "url")?,
                    name: get(row, "name")?,
                })
            })
            .collect()
    }

    /// Assets linked from a file, ordered by name.
    pub async fn assets_for_file(&self, file: &str) -> Result<Vec<AssetRecord>, GraphError> {
        let q = query(
            "MATCH (df:DataFile {name: $file})-[:linked_asset]->(a:Asset)
             RETURN a.name AS name, a.asset_id AS asset_id, a.asset_type AS asset_type
             ORDER BY name",
        )
        .param("file", file);

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| {
                Ok(AssetRecord {
                    name: get(row, "name")?,
                    asset_id: get(row, "asset_id")?,
                    asset_type: get(row, "asset_type")?,
                })
            })
            .collect()
    }

    // ── RUL Association ──────────────────────────────────────────

    /// Data files associated with a RUL label file, ordered by name.
    pub async fn associated_files_for_rul(
        &self,
        rul_file: &str,
    ) -> Result<Vec<AssociatedFileRecord>, GraphError> {
        let q = query(
            "MATCH (rul:DataFile {name: $rul_file})-[:ASSOCIATED_WITH]->(df:DataFile)
             RETURN df.name AS file, df.type AS type
             ORDER BY file",
        )
        .param("rul_file", rul_file);

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| {
                Ok(AssociatedFileRecord {
                    file: get(row, "file")?,
                    file_type: get(row, "type")?,
                })
            })
            .collect()
    }
}

/// Read a column from a row, mapping decode failures to `Serialization`.
pub(crate) fn get<'a, T: serde::Deserialize<'a>>(row: &'a Row, column: &str) -> Result<T, GraphError> {
    row.get::<T>(column)
        .map_err(|e| GraphError::Serialization(format!("Failed to read {column}: {e}")))
}
