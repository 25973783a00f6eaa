//! Schema bootstrap and reference seed data.
//!
//! Both routines are idempotent and meant to run once at process start,
//! before any ingestion or search work.

use lineage_core::catalog::{reference_dataset, reference_hardware, reference_layers};
use lineage_core::Identifier;
use neo4rs::query;

use crate::client::{GraphClient, GraphError};
use crate::nas::BASELINE_ARCHITECTURE;

/// Uniqueness constraints: (constraint name, label, property).
pub const UNIQUE_CONSTRAINTS: &[(&str, &str, &str)] = &[
    ("dataset_name", "Dataset", "name"),
    ("datafile_name", "DataFile", "name"),
    ("feature_name", "Feature", "name"),
    ("category_name", "Category", "name"),
    ("unit_name", "Unit", "name"),
    ("asset_name", "Asset", "name"),
    ("arch_name", "Architecture", "name"),
    ("layer_name", "Layer", "name"),
    ("hardware_name", "Hardware", "name"),
];

impl GraphClient {
    /// Create every uniqueness constraint that does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), GraphError> {
        for (name, label, property) in UNIQUE_CONSTRAINTS {
            let name = Identifier::new(name)?;
            let label = Identifier::new(label)?;
            let property = Identifier::new(property)?;
            let cypher = format!(
                "CREATE CONSTRAINT {name} IF NOT EXISTS
                 FOR (n:{label})
                 REQUIRE n.{property} IS UNIQUE"
            );
            self.run(query(&cypher)).await?;
            tracing::debug!(constraint = %name, "Ensured constraint");
        }
        tracing::info!(count = UNIQUE_CONSTRAINTS.len(), "Schema constraints ensured");
        Ok(())
    }

    /// Drop every constraint created by [`GraphClient::ensure_schema`].
    pub async fn drop_schema_constraints(&self) -> Result<(), GraphError> {
        for (name, _, _) in UNIQUE_CONSTRAINTS {
            self.drop_constraint(name).await?;
        }
        Ok(())
    }

    /// Merge the layer catalog, the reference dataset and hardware, and the
    /// baseline architecture with its single baseline experiment.
    pub async fn seed_nas_reference_data(&self) -> Result<(), GraphError> {
        let layers = reference_layers();
        let dataset = reference_dataset();
        let hardware = reference_hardware();

        let mut statements = Vec::with_capacity(layers.len() + 4);
        for layer in &layers {
            statements.push(
                query(
                    "MERGE (l:Layer {name: $name})
                     SET l.type = $type, l.kernel = $kernel, l.params = $params",
                )
                .param("name", layer.name.as_str())
                .param("type", layer.layer_type.as_str())
                .param("kernel", layer.kernel)
                .param("params", layer.params),
            );
        }

        statements.push(
            query(
                "MERGE (d:Dataset {name: $name})
                 SET d.samples = $samples, d.classes = $classes",
            )
            .param("name", dataset.name.as_str())
            .param("samples", dataset.samples)
            .param("classes", dataset.classes),
        );

        statements.push(
            query(
                "MERGE (h:Hardware {name: $name})
                 SET h.maxMemoryMB = $memory, h.maxLatencyMs = $latency",
            )
            .param("name", hardware.name.as_str())
            .param("memory", hardware.max_memory_mb)
            .param("latency", hardware.max_latency_ms),
        );

        let baseline_layers: Vec<String> = layers.iter().map(|l| l.name.clone()).collect();
        statements.push(
            query(
                "MERGE (a:Architecture {name: $arch})
                 SET a.depth = $depth
                 WITH a
                 UNWIND range(0, size($layers) - 1) AS i
                 MATCH (l:Layer {name: $layers[i]})
                 MERGE (a)-[:COMPOSED_OF {order: i + 1}]->(l)",
            )
            .param("arch", BASELINE_ARCHITECTURE)
            .param("depth", baseline_layers.len() as i64)
            .param("layers", baseline_layers),
        );

        statements.push(
            query(
                "MATCH (a:Architecture {name: $arch}),
                       (d:Dataset {name: $dataset}),
                       (h:Hardware {name: $hardware})
                 MERGE (a)-[:HAS_EXPERIMENT]->(e:Experiment {name: $experiment})
                 ON CREATE SET e.accuracy = $accuracy, e.latencyMs = $latency,
                               e.flops = $flops, e.energy_mJ = $energy,
                               e.timestamp = datetime()
                 MERGE (a)-[:TRAINED_ON]->(d)
                 MERGE (a)-[:EVALUATED_ON]->(h)",
            )
            .param("arch", BASELINE_ARCHITECTURE)
            .param("dataset", dataset.name.as_str())
            .param("hardware", hardware.name.as_str())
            .param("experiment", format!("exp_{BASELINE_ARCHITECTURE}"))
            .param("accuracy", 0.87)
            .param("latency", 18.0)
            .param("flops", 1.2e8)
            .param("energy", 35.0),
        );

        self.execute_write(move |txn| {
            Box::pin(async move {
                for q in statements {
                    txn.run(q).await?;
                }
                Ok(())
            })
        })
        .await?;

        tracing::info!(
            layers = layers.len(),
            dataset = %dataset.name,
            hardware = %hardware.name,
            "Seeded NAS reference data"
        );
        Ok(())
    }
}
