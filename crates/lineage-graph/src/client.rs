//! Neo4j connection management and the transactional execution contract.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use lineage_core::config::Neo4jSettings;
use lineage_core::{IdGenerator, IdentError, UuidGenerator};
use neo4rs::{ConfigBuilder, Graph, Query, Row, Txn};

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Node not found: {label} with name {name}")]
    NotFound { label: String, name: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<IdentError> for GraphError {
    fn from(e: IdentError) -> Self {
        Self::Validation(e.to_string())
    }
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::from(&Neo4jSettings::default())
    }
}

impl From<&Neo4jSettings> for GraphConfig {
    fn from(s: &Neo4jSettings) -> Self {
        Self {
            uri: s.uri.clone(),
            user: s.user.clone(),
            password: s.password.clone(),
            max_connections: s.max_connections,
            fetch_size: s.fetch_size,
        }
    }
}

/// A transaction function's future. Borrows the open transaction for `'t`.
pub type TxFuture<'t, T> = Pin<Box<dyn Future<Output = Result<T, GraphError>> + Send + 't>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessMode {
    Read,
    Write,
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// This is the single point of access for all knowledge graph operations and
/// is passed explicitly to every component. Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
    ids: Arc<dyn IdGenerator>,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self {
            graph,
            ids: Arc::new(UuidGenerator),
        })
    }

    /// Replace the generator used for fresh `Asset.asset_id` values.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub(crate) fn next_id(&self) -> String {
        self.ids.generate()
    }

    /// Execute an auto-commit statement that returns no rows.
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute an auto-commit read and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute an auto-commit read and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }

    /// Begin a transaction.
    pub async fn start_txn(&self) -> Result<Txn, GraphError> {
        Ok(self.graph.start_txn().await?)
    }

    /// Run `work` inside a read unit.
    ///
    /// neo4rs 0.8 opens every explicit transaction with the session default
    /// (write) access mode, so the server does not reject a write issued
    /// here. Writes still never persist: the transaction is rolled back
    /// unconditionally once `work` returns.
    pub async fn execute_read<T, F>(&self, work: F) -> Result<T, GraphError>
    where
        F: for<'t> FnOnce(&'t mut Txn) -> TxFuture<'t, T>,
    {
        self.execute_in_txn(AccessMode::Read, work).await
    }

    /// Run `work` inside a write unit: every statement it issues is
    /// committed together, or none is if `work` fails.
    pub async fn execute_write<T, F>(&self, work: F) -> Result<T, GraphError>
    where
        F: for<'t> FnOnce(&'t mut Txn) -> TxFuture<'t, T>,
    {
        self.execute_in_txn(AccessMode::Write, work).await
    }

    async fn execute_in_txn<T, F>(&self, mode: AccessMode, work: F) -> Result<T, GraphError>
    where
        F: for<'t> FnOnce(&'t mut Txn) -> TxFuture<'t, T>,
    {
        let mut txn = self.start_txn().await?;
        let outcome = work(&mut txn).await;

        match outcome {
            Ok(value) if mode == AccessMode::Write => {
                txn.commit().await?;
                Ok(value)
            }
            Ok(value) => {
                if let Err(e) = txn.rollback().await {
                    tracing::warn!(error = %e, "Failed to close read transaction");
                }
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(mode = ?mode, error = %err, "Rolling back transaction");
                if let Err(e) = txn.rollback().await {
                    tracing::warn!(error = %e, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

// ── Transaction-scoped helpers ───────────────────────────────────

/// Execute a statement inside `txn` and collect all rows.
pub async fn txn_rows(txn: &mut Txn, query: Query) -> Result<Vec<Row>, GraphError> {
    let mut stream = txn.execute(query).await?;
    let mut rows = Vec::new();
    while let Some(row) = stream.next(txn.handle()).await? {
        rows.push(row);
    }
    Ok(rows)
}

/// Execute a statement inside `txn` and return its first row.
///
/// The stream is drained so the transaction is ready for the next statement.
pub async fn txn_one(txn: &mut Txn, query: Query) -> Result<Option<Row>, GraphError> {
    Ok(txn_rows(txn, query).await?.into_iter().next())
}

/// Execute a statement inside `txn` that returns a single integer column.
/// A statement that yields no row counts as zero.
pub async fn txn_count(txn: &mut Txn, query: Query, column: &str) -> Result<i64, GraphError> {
    let row = txn_one(txn, query).await?;
    row_count(row.as_ref(), column)
}

/// Read an integer column from an optional row; a missing row is zero.
pub(crate) fn row_count(row: Option<&Row>, column: &str) -> Result<i64, GraphError> {
    match row {
        Some(row) => row
            .get::<i64>(column)
            .map_err(|e| GraphError::Serialization(format!("Failed to read {column}: {e}"))),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_config_from_settings() {
        let settings = Neo4jSettings {
            uri: "bolt://graph:7687".to_string(),
            max_connections: 4,
            ..Default::default()
        };
        let config = GraphConfig::from(&settings);
        assert_eq!(config.uri, "bolt://graph:7687");
        assert_eq!(config.user, "neo4j");
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.fetch_size, 256);
    }

    #[test]
    fn test_ident_error_maps_to_validation() {
        let err: GraphError = IdentError::InvalidCharacters("a b".to_string()).into();
        assert!(matches!(err, GraphError::Validation(_)));
        assert!(err.to_string().contains("a b"));
    }

    #[test]
    fn test_missing_row_counts_as_zero() {
        assert_eq!(row_count(None, "cnt").unwrap(), 0);
    }
}
