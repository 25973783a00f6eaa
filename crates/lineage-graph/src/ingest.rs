//! Metadata ingestion: idempotent upserts of dataset lineage.
//!
//! Every node is matched by its identity (name, or the full descriptor tuple
//! for Storage) with MERGE, so re-ingesting the same metadata leaves node and
//! edge counts unchanged. Each public operation is a single write unit.

use lineage_core::catalog::{RUL_FEATURE, RUL_FILE_TYPE};
use lineage_core::{Category, FeatureSet, FeatureSpec, StorageDescriptor};
use neo4rs::{query, Query, Txn};
use serde::Serialize;

use crate::client::{row_count, txn_one, GraphClient, GraphError};

/// Asset type recorded by [`GraphClient::link_asset`].
pub const DEFAULT_ASSET_TYPE: &str = "engine";

const UPSERT_DATAFILE: &str = "MERGE (ds:Dataset {name: $dataset})
     MERGE (df:DataFile {name: $file})
     SET df.type = $file_type
     WITH ds, df
     OPTIONAL MATCH (prev:Dataset)-[stale:CONTAINS]->(df)
     WHERE prev <> ds
     DELETE stale
     WITH DISTINCT ds, df
     MERGE (ds)-[:CONTAINS]->(df)";

const UPSERT_FEATURE: &str = "MERGE (f:Feature {name: $name})
     MERGE (c:Category {name: $category})
     WITH f, c
     OPTIONAL MATCH (f)-[stale:BELONGS_TO]->(other:Category)
     WHERE other <> c
     DELETE stale
     WITH DISTINCT f, c
     MERGE (f)-[:BELONGS_TO]->(c)
     WITH f
     MATCH (df:DataFile {name: $file})
     MERGE (df)-[:HAS_FEATURE]->(f)";

const UPSERT_UNIT: &str = "MERGE (u:Unit {name: $unit})
     ON CREATE SET u.description = $description
     ON MATCH SET u.description = coalesce($description, u.description)
     WITH u
     MATCH (f:Feature {name: $feature})
     OPTIONAL MATCH (f)-[stale:MEASURED_IN]->(other:Unit)
     WHERE other <> u
     DELETE stale
     WITH DISTINCT f, u
     MERGE (f)-[:MEASURED_IN]->(u)";

const LINK_ASSET: &str = "MATCH (df:DataFile {name: $file})
     MERGE (a:Asset {name: $asset})
     ON CREATE SET a.asset_id = $asset_id, a.asset_type = $asset_type
     ON MATCH SET a.asset_type = $asset_type
     MERGE (df)-[:linked_asset]->(a)
     RETURN a.asset_id AS asset_id";

const LINK_STORAGE: &str = "MATCH (df:DataFile {name: $file})
     MERGE (s:Storage {type: $type, path: $path, storage_url: $url, storage_name: $name})
     MERGE (df)-[:is_stored_in]->(s)
     RETURN count(s) AS linked";

const ASSOCIATE_RUL: &str = "MATCH (rul:DataFile {name: $rul_file})
     MATCH (df:DataFile {name: $file})
     MERGE (rul)-[:ASSOCIATED_WITH]->(df)
     RETURN count(df) AS linked";

/// What an ingestion call wrote (or re-matched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub dataset: String,
    pub file: String,
    pub file_type: String,
    pub features: usize,
    pub units: usize,
}

impl GraphClient {
    // ── File Metadata ────────────────────────────────────────────

    /// Upsert a data file, its dataset, and every feature column of
    /// `feature_set` with their categories and units.
    pub async fn ingest_file_metadata(
        &self,
        dataset: &str,
        file: &str,
        file_type: &str,
        feature_set: &FeatureSet,
    ) -> Result<IngestSummary, GraphError> {
        let mut statements = vec![upsert_datafile(dataset, file, file_type)];
        let mut units = 0;
        for feature in &feature_set.features {
            statements.push(upsert_feature(file, feature));
            if let Some(unit) = &feature.unit {
                statements.push(upsert_unit(
                    &feature.name,
                    unit,
                    feature_set.unit_description(unit),
                ));
                units += 1;
            }
        }

        self.execute_write(move |txn| Box::pin(run_all(txn, statements)))
            .await?;

        let summary = IngestSummary {
            dataset: dataset.to_string(),
            file: file.to_string(),
            file_type: file_type.to_string(),
            features: feature_set.features.len(),
            units,
        };
        tracing::info!(
            dataset,
            file,
            file_type,
            features = summary.features,
            "Ingested file metadata"
        );
        Ok(summary)
    }

    /// Upsert a label-only file: one `RUL_Value` feature under the `RUL` category.
    pub async fn ingest_rul_metadata(
        &self,
        dataset: &str,
        file: &str,
    ) -> Result<IngestSummary, GraphError> {
        let feature = FeatureSpec::new(RUL_FEATURE, Category::Rul, None);
        let statements = vec![
            upsert_datafile(dataset, file, RUL_FILE_TYPE),
            upsert_feature(file, &feature),
        ];

        self.execute_write(move |txn| Box::pin(run_all(txn, statements)))
            .await?;

        tracing::info!(dataset, file, "Ingested RUL metadata");
        Ok(IngestSummary {
            dataset: dataset.to_string(),
            file: file.to_string(),
            file_type: RUL_FILE_TYPE.to_string(),
            features: 1,
            units: 0,
        })
    }

    // ── Links ────────────────────────────────────────────────────

    /// Link a data file to an asset of the default type. See
    /// [`GraphClient::link_asset_with_type`].
    pub async fn link_asset(&self, asset: &str, file: &str) -> Result<String, GraphError> {
        self.link_asset_with_type(asset, file, DEFAULT_ASSET_TYPE)
            .await
    }

    /// Upsert an asset and link it from `file`. Returns the asset's id.
    ///
    /// `asset_id` is assigned from the id generator only when the asset is
    /// created; later calls overwrite `asset_type` and keep the original id.
    /// The single MERGE against the `Asset.name` constraint means concurrent
    /// first links still end with exactly one id.
    pub async fn link_asset_with_type(
        &self,
        asset: &str,
        file: &str,
        asset_type: &str,
    ) -> Result<String, GraphError> {
        let q = query(LINK_ASSET)
            .param("file", file)
            .param("asset", asset)
            .param("asset_id", self.next_id())
            .param("asset_type", asset_type);

        let row = self
            .execute_write(move |txn| Box::pin(async move { txn_one(txn, q).await }))
            .await?;

        let row = row.ok_or_else(|| GraphError::NotFound {
            label: "DataFile".to_string(),
            name: file.to_string(),
        })?;
        let asset_id: String = row
            .get("asset_id")
            .map_err(|e| GraphError::Serialization(format!("Failed to read asset_id: {e}")))?;

        tracing::info!(asset, file, asset_id = %asset_id, "Linked asset");
        Ok(asset_id)
    }

    /// Upsert a storage descriptor (keyed by the full tuple) and link it
    /// from `file`. Distinct descriptors yield distinct Storage nodes.
    pub async fn link_storage(
        &self,
        file: &str,
        storage: &StorageDescriptor,
    ) -> Result<(), GraphError> {
        let q = query(LINK_STORAGE)
            .param("file", file)
            .param("type", storage.storage_type.as_str())
            .param("path", storage.path.as_str())
            .param("url", storage.url.as_str())
            .param("name", storage.name.as_str());

        let row = self
            .execute_write(move |txn| Box::pin(async move { txn_one(txn, q).await }))
            .await?;

        if row_count(row.as_ref(), "linked")? == 0 {
            return Err(GraphError::NotFound {
                label: "DataFile".to_string(),
                name: file.to_string(),
            });
        }

        tracing::info!(
            file,
            storage_type = %storage.storage_type,
            path = %storage.path,
            "Linked storage"
        );
        Ok(())
    }

    // ── RUL Association ──────────────────────────────────────────

    /// Associate a RUL label file with the data file it labels. Both files
    /// must already exist; repeating the call adds no second edge.
    pub async fn associate_rul_file(&self, rul_file: &str, file: &str) -> Result<(), GraphError> {
        let q = query(ASSOCIATE_RUL)
            .param("rul_file", rul_file)
            .param("file", file);

        let row = self
            .execute_write(move |txn| Box::pin(async move { txn_one(txn, q).await }))
            .await?;

        if row_count(row.as_ref(), "linked")? == 0 {
            return Err(GraphError::NotFound {
                label: "DataFile".to_string(),
                name: format!("{rul_file} or {file}"),
            });
        }

        tracing::info!(rul_file, file, "Associated RUL file");
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────

async fn run_all(txn: &mut Txn, statements: Vec<Query>) -> Result<(), GraphError> {
    for q in statements {
        txn.run(q).await?;
    }
    Ok(())
}

fn upsert_datafile(dataset: &str, file: &str, file_type: &str) -> Query {
    query(UPSERT_DATAFILE)
        .param("dataset", dataset)
        .param("file", file)
        .param("file_type", file_type)
}

fn upsert_feature(file: &str, feature: &FeatureSpec) -> Query {
    query(UPSERT_FEATURE)
        .param("name", feature.name.as_str())
        .param("category", feature.category.as_str())
        .param("file", file)
}

fn upsert_unit(feature: &str, unit: &str, description: Option<&str>) -> Query {
    query(UPSERT_UNIT)
        .param("unit", unit)
        .param("description", description.map(str::to_string))
        .param("feature", feature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_match_clause(cypher: &str) -> &str {
        let start = cypher.find("ON MATCH SET").unwrap();
        let rest = &cypher[start..];
        let end = rest.find('\n').unwrap_or(rest.len());
        &rest[..end]
    }

    #[test]
    fn test_asset_id_is_only_set_on_create() {
        assert!(LINK_ASSET.contains("ON CREATE SET a.asset_id = $asset_id"));
        assert!(!on_match_clause(LINK_ASSET).contains("asset_id"));
        assert!(on_match_clause(LINK_ASSET).contains("a.asset_type = $asset_type"));
    }

    #[test]
    fn test_storage_identity_is_full_tuple() {
        assert!(LINK_STORAGE.contains(
            "MERGE (s:Storage {type: $type, path: $path, storage_url: $url, storage_name: $name})"
        ));
    }

    #[test]
    fn test_upserts_never_create_unconditionally() {
        for cypher in [
            UPSERT_DATAFILE,
            UPSERT_FEATURE,
            UPSERT_UNIT,
            LINK_ASSET,
            LINK_STORAGE,
            ASSOCIATE_RUL,
        ] {
            assert!(!cypher.contains("CREATE ("), "unexpected CREATE in {cypher}");
        }
    }

    #[test]
    fn test_link_operations_require_existing_file() {
        assert!(LINK_ASSET.starts_with("MATCH (df:DataFile {name: $file})"));
        assert!(LINK_STORAGE.starts_with("MATCH (df:DataFile {name: $file})"));
        assert!(ASSOCIATE_RUL.starts_with(
            "MATCH (rul:DataFile {name: $rul_file})\n     MATCH (df:DataFile {name: $file})"
        ));
        assert!(ASSOCIATE_RUL.contains("MERGE (rul)-[:ASSOCIATED_WITH]->(df)"));
    }
}
