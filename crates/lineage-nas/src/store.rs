//! The store seam of the search loop, backed by the graph.

use std::future::Future;
use std::sync::Arc;

use lineage_core::ExperimentRecord;
use lineage_graph::GraphClient;

use crate::error::Result;

/// What the search loop needs from persistent storage.
pub trait ExperimentStore {
    /// Architectures of exactly `depth` layers with an experiment slower
    /// than `threshold_ms`.
    fn slow_architecture_count(
        &self,
        depth: usize,
        threshold_ms: f64,
    ) -> impl Future<Output = Result<i64>> + Send;

    /// Persist an evaluated architecture atomically.
    fn store_experiment(&self, record: &ExperimentRecord) -> impl Future<Output = Result<()>> + Send;
}

impl ExperimentStore for GraphClient {
    async fn slow_architecture_count(&self, depth: usize, threshold_ms: f64) -> Result<i64> {
        Ok(self.count_slow_architectures(depth, threshold_ms).await?)
    }

    async fn store_experiment(&self, record: &ExperimentRecord) -> Result<()> {
        Ok(self.record_experiment(record).await?)
    }
}

impl<T: ExperimentStore + Send + Sync> ExperimentStore for Arc<T> {
    async fn slow_architecture_count(&self, depth: usize, threshold_ms: f64) -> Result<i64> {
        (**self).slow_architecture_count(depth, threshold_ms).await
    }

    async fn store_experiment(&self, record: &ExperimentRecord) -> Result<()> {
        (**self).store_experiment(record).await
    }
}
