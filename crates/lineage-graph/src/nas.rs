//! NAS provenance on the graph: the prune-check read and the atomic
//! store of an evaluated architecture.

use lineage_core::ExperimentRecord;
use neo4rs::{query, Txn};
use serde::{Deserialize, Serialize};

use crate::client::{txn_count, txn_rows, GraphClient, GraphError};
use crate::queries::get;

/// Architecture seeded as the search baseline.
pub const BASELINE_ARCHITECTURE: &str = "NAS_CNN_v1";

const COUNT_SLOW_AT_DEPTH: &str = "MATCH (a:Architecture)-[:HAS_EXPERIMENT]->(e:Experiment)
     WHERE a.depth = $depth AND e.latencyMs > $threshold
     RETURN count(a) AS bad_count";

/// An architecture together with one of its experiment results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureScore {
    pub architecture: String,
    pub accuracy: f64,
    pub latency_ms: f64,
}

impl GraphClient {
    // ── Prune-check ──────────────────────────────────────────────

    /// Count architectures of exactly `depth` layers that have an experiment
    /// slower than `threshold_ms`.
    pub async fn count_slow_architectures(
        &self,
        depth: usize,
        threshold_ms: f64,
    ) -> Result<i64, GraphError> {
        let q = query(COUNT_SLOW_AT_DEPTH)
            .param("depth", depth as i64)
            .param("threshold", threshold_ms);

        self.execute_read(move |txn| {
            Box::pin(async move { txn_count(txn, q, "bad_count").await })
        })
        .await
    }

    // ── Store ────────────────────────────────────────────────────

    /// Record an evaluated architecture in one write unit: the Architecture
    /// (depth set), its ordered layers, a fresh Experiment, and provenance
    /// edges. Nothing is written if any step fails.
    ///
    /// An existing architecture must already have exactly the same layer
    /// sequence; otherwise the unit is rejected with [`GraphError::Conflict`].
    pub async fn record_experiment(&self, record: &ExperimentRecord) -> Result<(), GraphError> {
        let owned = record.clone();
        self.execute_write(move |txn| Box::pin(async move { store_experiment(txn, &owned).await }))
            .await?;
        tracing::info!(
            architecture = %record.architecture,
            experiment = %record.name,
            depth = record.depth(),
            latency_ms = record.latency_ms,
            "Stored experiment"
        );
        Ok(())
    }

    // ── Read projections ─────────────────────────────────────────

    /// Architectures with an experiment above `min_accuracy` and below
    /// `max_latency_ms`, best accuracy first.
    pub async fn valid_architectures(
        &self,
        min_accuracy: f64,
        max_latency_ms: f64,
    ) -> Result<Vec<ArchitectureScore>, GraphError> {
        let q = query(
            "MATCH (a:Architecture)-[:HAS_EXPERIMENT]->(e:Experiment)
             WHERE e.accuracy > $min_accuracy AND e.latencyMs < $max_latency
             RETURN a.name AS architecture, e.accuracy AS accuracy, e.latencyMs AS latency
             ORDER BY accuracy DESC, latency, architecture",
        )
        .param("min_accuracy", min_accuracy)
        .param("max_latency", max_latency_ms);

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| {
                Ok(ArchitectureScore {
                    architecture: get(row, "architecture")?,
                    accuracy: get(row, "accuracy")?,
                    latency_ms: get(row, "latency")?,
                })
            })
            .collect()
    }

    /// Layer names of an architecture in composition order.
    pub async fn architecture_layers(&self, name: &str) -> Result<Vec<String>, GraphError> {
        let q = layer_sequence_query(name);
        let rows = self.query_rows(q).await?;
        rows.iter().map(|row| get(row, "layer")).collect()
    }
}

fn layer_sequence_query(arch: &str) -> neo4rs::Query {
    query(
        "MATCH (a:Architecture {name: $arch})-[r:COMPOSED_OF]->(l:Layer)
         RETURN l.name AS layer
         ORDER BY r.order",
    )
    .param("arch", arch)
}

async fn store_experiment(txn: &mut Txn, record: &ExperimentRecord) -> Result<(), GraphError> {
    let arch = record.architecture.as_str();

    txn.run(
        query(
            "MERGE (a:Architecture {name: $arch})
             SET a.depth = $depth",
        )
        .param("arch", arch)
        .param("depth", record.depth() as i64),
    )
    .await?;

    let existing: Vec<String> = txn_rows(txn, layer_sequence_query(arch))
        .await?
        .iter()
        .map(|row| get(row, "layer"))
        .collect::<Result<_, _>>()?;

    if existing.is_empty() {
        for (i, layer) in record.layers.iter().enumerate() {
            let linked = txn_count(
                txn,
                query(
                    "MATCH (a:Architecture {name: $arch}), (l:Layer {name: $layer})
                     MERGE (a)-[:COMPOSED_OF {order: $order}]->(l)
                     RETURN count(l) AS linked",
                )
                .param("arch", arch)
                .param("layer", layer.as_str())
                .param("order", (i + 1) as i64),
                "linked",
            )
            .await?;
            if linked == 0 {
                return Err(GraphError::NotFound {
                    label: "Layer".to_string(),
                    name: layer.clone(),
                });
            }
        }
    } else if existing != record.layers {
        return Err(GraphError::Conflict(format!(
            "architecture {arch} is composed of {existing:?}, not {:?}",
            record.layers
        )));
    }

    txn.run(
        query(
            "MATCH (a:Architecture {name: $arch})
             CREATE (e:Experiment {
                 name: $name,
                 accuracy: $accuracy,
                 latencyMs: $latency,
                 flops: $flops,
                 energy_mJ: $energy,
                 timestamp: datetime($timestamp)
             })
             MERGE (a)-[:HAS_EXPERIMENT]->(e)",
        )
        .param("arch", arch)
        .param("name", record.name.as_str())
        .param("accuracy", record.accuracy)
        .param("latency", record.latency_ms)
        .param("flops", record.flops)
        .param("energy", record.energy_mj)
        .param("timestamp", record.timestamp.to_rfc3339()),
    )
    .await?;

    if let Some(dataset) = &record.dataset {
        link_provenance(txn, arch, "Dataset", "TRAINED_ON", dataset).await?;
    }
    if let Some(hardware) = &record.hardware {
        link_provenance(txn, arch, "Hardware", "EVALUATED_ON", hardware).await?;
    }

    Ok(())
}

/// Merge a provenance edge from the architecture to an existing node.
/// `label` and `rel_type` are compile-time constants.
async fn link_provenance(
    txn: &mut Txn,
    arch: &str,
    label: &'static str,
    rel_type: &'static str,
    target: &str,
) -> Result<(), GraphError> {
    let cypher = format!(
        "MATCH (a:Architecture {{name: $arch}}), (t:{label} {{name: $target}})
         MERGE (a)-[:{rel_type}]->(t)
         RETURN count(t) AS linked"
    );
    let q = query(&cypher).param("arch", arch).param("target", target);

    if txn_count(txn, q, "linked").await? == 0 {
        return Err(GraphError::NotFound {
            label: label.to_string(),
            name: target.to_string(),
        });
    }
    Ok(())
}
