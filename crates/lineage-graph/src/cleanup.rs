//! Batched maintenance: safe deletes and property clears at any scale.
//!
//! Every destructive operation runs as a loop of bounded write units. One
//! unit matches at most `batch_size` nodes, mutates them, and commits; the
//! loop stops at the first unit that affects fewer than `batch_size` nodes.
//! Because each unit re-evaluates its match against what is left, an
//! interrupted run is resumed simply by invoking it again.
//!
//! Labels and property names are substituted into the query text and so
//! must pass [`lineage_core::ident::sanitize_identifier`]; filter values are
//! always bound parameters.

use std::fmt;
use std::future::Future;

use lineage_core::{IdentError, Identifier};
use neo4rs::{query, BoltType, Query};
use serde::Serialize;

use crate::client::{row_count, txn_count, GraphClient, GraphError};

/// Labels owned by dataset-lineage ingestion.
pub const LINEAGE_LABELS: &[&str] = &[
    "Dataset", "DataFile", "Feature", "Category", "Unit", "Asset", "Storage",
];

/// A typed value compared against a node property. Cypher never equates a
/// string with a number, so `4` and `"4"` match different nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl FilterValue {
    /// Interpret command-line text: an integer, a decimal number, `true` or
    /// `false`, otherwise a string. Double quotes force a string.
    pub fn parse(raw: &str) -> Self {
        if let Some(quoted) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
            return Self::String(quoted.to_string());
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Integer(i);
        }
        let numeric = raw
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'));
        if numeric {
            if let Ok(f) = raw.parse::<f64>() {
                return Self::Float(f);
            }
        }
        match raw {
            "true" => Self::Boolean(true),
            "false" => Self::Boolean(false),
            _ => Self::String(raw.to_string()),
        }
    }

    fn to_bolt(&self) -> BoltType {
        match self {
            Self::String(s) => BoltType::from(s.as_str()),
            Self::Integer(i) => BoltType::from(*i),
            Self::Float(f) => BoltType::from(*f),
            Self::Boolean(b) => BoltType::from(*b),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for FilterValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// Restricts which nodes of a label a maintenance operation touches.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeFilter {
    /// `n.<property> = <value>`; the value is bound, never interpolated.
    PropertyEquals {
        property: Identifier,
        value: FilterValue,
    },
    /// `n.<property> IS NULL`.
    PropertyMissing { property: Identifier },
}

impl NodeFilter {
    pub fn equals(property: &str, value: impl Into<FilterValue>) -> Result<Self, IdentError> {
        Ok(Self::PropertyEquals {
            property: Identifier::new(property)?,
            value: value.into(),
        })
    }

    pub fn missing(property: &str) -> Result<Self, IdentError> {
        Ok(Self::PropertyMissing {
            property: Identifier::new(property)?,
        })
    }

    fn where_clause(&self) -> String {
        match self {
            Self::PropertyEquals { property, .. } => format!("WHERE n.{property} = $filter_value"),
            Self::PropertyMissing { property } => format!("WHERE n.{property} IS NULL"),
        }
    }

    fn bind(&self, q: Query) -> Query {
        match self {
            Self::PropertyEquals { value, .. } => q.param("filter_value", value.to_bolt()),
            Self::PropertyMissing { .. } => q,
        }
    }
}

/// One batched maintenance operation. Each variant renders to a single
/// statement taking `$limit` and returning the affected count as `affected`.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    DeleteLabel {
        label: Identifier,
        filter: Option<NodeFilter>,
    },
    DeleteOrphans,
    ClearProperty {
        label: Identifier,
        property: Identifier,
    },
}

impl BatchOp {
    pub fn delete_label(label: &str, filter: Option<NodeFilter>) -> Result<Self, IdentError> {
        Ok(Self::DeleteLabel {
            label: Identifier::new(label)?,
            filter,
        })
    }

    pub fn clear_property(label: &str, property: &str) -> Result<Self, IdentError> {
        Ok(Self::ClearProperty {
            label: Identifier::new(label)?,
            property: Identifier::new(property)?,
        })
    }

    /// The statement run for each batch.
    pub fn cypher(&self) -> String {
        match self {
            Self::DeleteLabel { label, filter } => {
                let where_clause = filter.as_ref().map(NodeFilter::where_clause).unwrap_or_default();
                format!(
                    "MATCH (n:{label}) {where_clause}
                     WITH n LIMIT $limit
                     DETACH DELETE n
                     RETURN count(n) AS affected"
                )
            }
            Self::DeleteOrphans => "MATCH (n) WHERE NOT (n)--()
                 WITH n LIMIT $limit
                 DETACH DELETE n
                 RETURN count(n) AS affected"
                .to_string(),
            Self::ClearProperty { label, property } => format!(
                "MATCH (n:{label}) WHERE n.{property} IS NOT NULL
                 WITH n LIMIT $limit
                 SET n.{property} = null
                 RETURN count(n) AS affected"
            ),
        }
    }

    pub fn to_query(&self, limit: u64) -> Result<Query, GraphError> {
        let limit = bolt_limit(limit)?;
        let q = query(&self.cypher()).param("limit", limit);
        Ok(match self {
            Self::DeleteLabel {
                filter: Some(filter),
                ..
            } => filter.bind(q),
            _ => q,
        })
    }
}

impl fmt::Display for BatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteLabel { label, .. } => write!(f, "delete :{label}"),
            Self::DeleteOrphans => f.write_str("delete orphans"),
            Self::ClearProperty { label, property } => write!(f, "clear :{label}.{property}"),
        }
    }
}

/// Outcome of a batched operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Nodes affected across all committed batches.
    pub total: u64,
    /// Batch transactions executed, including the final short one.
    pub batches: u32,
}

/// Runs a single bounded batch of a [`BatchOp`] as one atomic unit.
pub trait BatchExecutor {
    /// Apply `op` to at most `limit` nodes and return how many were affected.
    fn run_batch(
        &self,
        op: &BatchOp,
        limit: u64,
    ) -> impl Future<Output = Result<u64, GraphError>> + Send;
}

impl BatchExecutor for GraphClient {
    async fn run_batch(&self, op: &BatchOp, limit: u64) -> Result<u64, GraphError> {
        let q = op.to_query(limit)?;
        let affected = self
            .execute_write(move |txn| {
                Box::pin(async move { txn_count(txn, q, "affected").await })
            })
            .await?;
        Ok(affected.max(0) as u64)
    }
}

/// Drive `op` to completion in units of at most `batch_size` nodes.
pub async fn run_in_batches<E: BatchExecutor>(
    executor: &E,
    op: &BatchOp,
    batch_size: u64,
) -> Result<BatchReport, GraphError> {
    if batch_size == 0 {
        return Err(GraphError::Validation(
            "batch_size must be at least 1".to_string(),
        ));
    }
    bolt_limit(batch_size)?;

    let mut report = BatchReport::default();
    loop {
        let affected = match executor.run_batch(op, batch_size).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(
                    op = %op,
                    committed = report.total,
                    batches = report.batches,
                    error = %e,
                    "Batch failed; committed batches are kept, rerun to resume"
                );
                return Err(e);
            }
        };
        report.batches += 1;
        report.total += affected;
        tracing::info!(
            op = %op,
            affected,
            total = report.total,
            batch = report.batches,
            "Batch committed"
        );
        if affected < batch_size {
            break;
        }
    }
    Ok(report)
}

/// Cypher integers are signed 64-bit.
fn bolt_limit(limit: u64) -> Result<i64, GraphError> {
    i64::try_from(limit).map_err(|_| {
        GraphError::Validation(format!("batch_size {limit} exceeds {}", i64::MAX))
    })
}

impl GraphClient {
    // ── Counting ─────────────────────────────────────────────────

    /// Count nodes matching an optional label and filter.
    pub async fn dry_count(
        &self,
        label: Option<&str>,
        filter: Option<&NodeFilter>,
    ) -> Result<u64, GraphError> {
        let label_clause = match label {
            Some(l) => format!(":{}", Identifier::new(l)?),
            None => String::new(),
        };
        let where_clause = filter.map(NodeFilter::where_clause).unwrap_or_default();
        let cypher = format!("MATCH (n{label_clause}) {where_clause} RETURN count(n) AS cnt");

        let mut q = query(&cypher);
        if let Some(f) = filter {
            q = f.bind(q);
        }

        let row = self.query_one(q).await?;
        Ok(row_count(row.as_ref(), "cnt")?.max(0) as u64)
    }

    // ── Batched Mutations ────────────────────────────────────────

    /// Detach-delete every node of `label` (optionally filtered), in batches.
    pub async fn delete_label(
        &self,
        label: &str,
        filter: Option<NodeFilter>,
        batch_size: u64,
    ) -> Result<BatchReport, GraphError> {
        let op = BatchOp::delete_label(label, filter)?;
        let report = run_in_batches(self, &op, batch_size).await?;
        tracing::info!(label, total = report.total, batches = report.batches, "Label deleted");
        Ok(report)
    }

    /// Detach-delete every node without relationships, in batches.
    pub async fn delete_orphans(&self, batch_size: u64) -> Result<BatchReport, GraphError> {
        let report = run_in_batches(self, &BatchOp::DeleteOrphans, batch_size).await?;
        tracing::info!(total = report.total, batches = report.batches, "Orphans deleted");
        Ok(report)
    }

    /// Null out `property` on every node of `label` that has it, in batches.
    pub async fn remove_property(
        &self,
        label: &str,
        property: &str,
        batch_size: u64,
    ) -> Result<BatchReport, GraphError> {
        let op = BatchOp::clear_property(label, property)?;
        let report = run_in_batches(self, &op, batch_size).await?;
        tracing::info!(label, property, total = report.total, "Property cleared");
        Ok(report)
    }

    /// Delete all dataset-lineage nodes (see [`LINEAGE_LABELS`]), label by label.
    pub async fn clean_lineage_metadata(&self, batch_size: u64) -> Result<BatchReport, GraphError> {
        let mut combined = BatchReport::default();
        for label in LINEAGE_LABELS {
            let report = self.delete_label(label, None, batch_size).await?;
            combined.total += report.total;
            combined.batches += report.batches;
        }
        Ok(combined)
    }

    // ── Administrative ───────────────────────────────────────────

    /// Drop a constraint by name. No-op if it does not exist.
    pub async fn drop_constraint(&self, name: &str) -> Result<(), GraphError> {
        let name = Identifier::new(name)?;
        self.run(query(&format!("DROP CONSTRAINT {name} IF EXISTS")))
            .await?;
        tracing::info!(constraint = %name, "Dropped constraint (if existed)");
        Ok(())
    }

    /// Drop an index by name. No-op if it does not exist.
    pub async fn drop_index(&self, name: &str) -> Result<(), GraphError> {
        let name = Identifier::new(name)?;
        self.run(query(&format!("DROP INDEX {name} IF EXISTS")))
            .await?;
        tracing::info!(index = %name, "Dropped index (if existed)");
        Ok(())
    }
}
