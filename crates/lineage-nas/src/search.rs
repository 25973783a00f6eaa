//! The propose, prune, evaluate, store loop.

use chrono::Utc;
use lineage_core::config::SearchSettings;
use lineage_core::ExperimentRecord;
use lineage_graph::GraphError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{NasError, Result};
use crate::evaluate::{Evaluation, Evaluator};
use crate::space::{Candidate, SearchSpace};
use crate::store::ExperimentStore;

/// What happened to one proposed candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IterationOutcome {
    /// Skipped without evaluation: `bad_count` architectures of the same
    /// depth were already too slow.
    Pruned { bad_count: i64 },
    /// Evaluated and recorded as `experiment`.
    Stored {
        experiment: String,
        evaluation: Evaluation,
    },
    /// Evaluated, but the store refused it because the name is already
    /// taken by a different layer sequence.
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub candidate: Candidate,
    pub outcome: IterationOutcome,
}

/// Per-iteration outcomes of a run plus running totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub iterations: Vec<IterationRecord>,
    pub pruned: u32,
    pub stored: u32,
    pub rejected: u32,
}

impl SearchReport {
    fn push(&mut self, record: IterationRecord) {
        match record.outcome {
            IterationOutcome::Pruned { .. } => self.pruned += 1,
            IterationOutcome::Stored { .. } => self.stored += 1,
            IterationOutcome::Rejected { .. } => self.rejected += 1,
        }
        self.iterations.push(record);
    }
}

/// A single-threaded search over `space`, pruning against `store`.
pub struct SearchLoop<S, E> {
    store: S,
    evaluator: E,
    space: SearchSpace,
    settings: SearchSettings,
    rng: StdRng,
}

impl<S: ExperimentStore, E: Evaluator> SearchLoop<S, E> {
    /// Build a loop over the default search space. The RNG is seeded from
    /// `settings.seed` when present.
    pub fn new(store: S, evaluator: E, settings: SearchSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store,
            evaluator,
            space: SearchSpace::default(),
            settings,
            rng,
        }
    }

    pub fn with_search_space(mut self, space: SearchSpace) -> Self {
        self.space = space;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run `settings.iterations` iterations. Store and evaluator failures
    /// abort the run; name conflicts are recorded and the run continues.
    pub async fn run(&mut self) -> Result<SearchReport> {
        let mut report = SearchReport::default();
        for iteration in 1..=self.settings.iterations {
            let record = self.step(iteration).await?;
            report.push(record);
        }

        tracing::info!(
            iterations = self.settings.iterations,
            stored = report.stored,
            pruned = report.pruned,
            rejected = report.rejected,
            "Search complete"
        );
        Ok(report)
    }

    /// One iteration: propose, prune-check, evaluate, store.
    pub async fn step(&mut self, iteration: u32) -> Result<IterationRecord> {
        let candidate = self.space.propose(&mut self.rng);
        let depth = candidate.depth();

        let bad_count = self
            .store
            .slow_architecture_count(depth, self.settings.latency_threshold_ms)
            .await?;
        if bad_count > 0 {
            tracing::info!(
                iteration,
                candidate = %candidate.name,
                depth,
                bad_count,
                "Pruned candidate"
            );
            return Ok(IterationRecord {
                iteration,
                candidate,
                outcome: IterationOutcome::Pruned { bad_count },
            });
        }

        let evaluation = self.evaluator.evaluate(&candidate).await?;
        let record = self.experiment_record(&candidate, &evaluation);

        let outcome = match self.store.store_experiment(&record).await {
            Ok(()) => {
                tracing::info!(
                    iteration,
                    candidate = %candidate.name,
                    depth,
                    accuracy = evaluation.accuracy,
                    latency_ms = evaluation.latency_ms,
                    "Stored candidate"
                );
                IterationOutcome::Stored {
                    experiment: record.name,
                    evaluation,
                }
            }
            Err(NasError::Graph(GraphError::Conflict(reason))) => {
                tracing::warn!(
                    iteration,
                    candidate = %candidate.name,
                    reason = %reason,
                    "Candidate rejected by store"
                );
                IterationOutcome::Rejected { reason }
            }
            Err(e) => return Err(e),
        };

        Ok(IterationRecord {
            iteration,
            candidate,
            outcome,
        })
    }

    fn experiment_record(&self, candidate: &Candidate, evaluation: &Evaluation) -> ExperimentRecord {
        ExperimentRecord {
            name: format!("exp_{}", candidate.name),
            architecture: candidate.name.clone(),
            layers: candidate.layers.clone(),
            accuracy: evaluation.accuracy,
            latency_ms: evaluation.latency_ms,
            flops: evaluation.flops,
            energy_mj: evaluation.energy_mj,
            timestamp: Utc::now(),
            dataset: self.settings.dataset.clone(),
            hardware: self.settings.hardware.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::MockEvaluator;
    use std::sync::Mutex;

    /// Mirrors the graph's prune-check and conflict rules in memory.
    #[derive(Default)]
    struct FakeStore {
        records: Mutex<Vec<ExperimentRecord>>,
        always_conflict: bool,
    }

    impl FakeStore {
        fn with_record(depth: usize, latency_ms: f64) -> Self {
            let store = Self::default();
            store.records.lock().unwrap().push(ExperimentRecord {
                name: "exp_seed".to_string(),
                architecture: "seed".to_string(),
                layers: vec!["Conv3x3".to_string(); depth],
                accuracy: 0.9,
                latency_ms,
                flops: None,
                energy_mj: None,
                timestamp: Utc::now(),
                dataset: None,
                hardware: None,
            });
            store
        }

        fn len(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

    impl ExperimentStore for FakeStore {
        async fn slow_architecture_count(&self, depth: usize, threshold_ms: f64) -> Result<i64> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .filter(|r| r.depth() == depth && r.latency_ms > threshold_ms)
                .count() as i64)
        }

        async fn store_experiment(&self, record: &ExperimentRecord) -> Result<()> {
            let mut records = self.records.lock().unwrap();
            let clash = records
                .iter()
                .any(|r| r.architecture == record.architecture && r.layers != record.layers);
            if self.always_conflict || clash {
                return Err(GraphError::Conflict(record.architecture.clone()).into());
            }
            records.push(record.clone());
            Ok(())
        }
    }

    struct FailingEvaluator;

    impl Evaluator for FailingEvaluator {
        async fn evaluate(&self, candidate: &Candidate) -> Result<Evaluation> {
            Err(NasError::Evaluation {
                candidate: candidate.name.clone(),
                reason: "out of memory".to_string(),
            })
        }
    }

    fn settings(iterations: u32) -> SearchSettings {
        SearchSettings {
            iterations,
            seed: Some(11),
            ..SearchSettings::default()
        }
    }

    fn single(layers: &[&str]) -> SearchSpace {
        SearchSpace::new(vec![layers.iter().map(|l| l.to_string()).collect()]).unwrap()
    }

    #[tokio::test]
    async fn test_slow_depth_prunes_only_that_depth() {
        let store = FakeStore::with_record(4, 25.0);
        let mut deep = SearchLoop::new(store, MockEvaluator, settings(3))
            .with_search_space(single(&["Conv3x3", "ReLU", "Conv3x3", "ReLU"]));
        let report = deep.run().await.unwrap();
        assert_eq!(report.pruned, 3);
        assert_eq!(report.stored, 0);
        assert!(report
            .iterations
            .iter()
            .all(|r| r.outcome == IterationOutcome::Pruned { bad_count: 1 }));
        assert_eq!(deep.store().len(), 1);

        let store = FakeStore::with_record(4, 25.0);
        let mut shallow = SearchLoop::new(store, MockEvaluator, settings(3))
            .with_search_space(single(&["Conv3x3", "ReLU", "MaxPool2x2"]));
        let report = shallow.run().await.unwrap();
        assert_eq!(report.stored + report.rejected, 3);
        assert_eq!(report.pruned, 0);
    }

    #[tokio::test]
    async fn test_deep_candidates_pruned_after_first_slow_store() {
        let mut search = SearchLoop::new(FakeStore::default(), MockEvaluator, settings(30));
        let report = search.run().await.unwrap();
        assert_eq!(report.iterations.len(), 30);
        assert_eq!(report.pruned + report.stored + report.rejected, 30);

        let mut slow_depth_seen = false;
        for record in &report.iterations {
            match (&record.outcome, record.candidate.depth()) {
                (IterationOutcome::Pruned { bad_count }, 4) => {
                    assert!(slow_depth_seen);
                    assert!(*bad_count >= 1);
                }
                (IterationOutcome::Pruned { .. }, depth) => panic!("depth {depth} pruned"),
                (IterationOutcome::Stored { evaluation, .. }, 4) => {
                    assert!(!slow_depth_seen, "depth 4 stored after a slow result");
                    assert_eq!(evaluation.latency_ms, 22.0);
                    slow_depth_seen = true;
                }
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn test_threshold_is_strict() {
        let mut search = SearchLoop::new(
            FakeStore::default(),
            MockEvaluator,
            SearchSettings {
                latency_threshold_ms: 22.0,
                ..settings(4)
            },
        )
        .with_search_space(single(&["Conv3x3", "ReLU", "Conv3x3", "ReLU"]));
        let report = search.run().await.unwrap();
        assert_eq!(report.pruned, 0);
    }

    #[tokio::test]
    async fn test_stored_record_carries_provenance() {
        let mut search = SearchLoop::new(
            FakeStore::default(),
            MockEvaluator,
            SearchSettings {
                dataset: Some("CIFAR-10".to_string()),
                hardware: Some("Jetson-Nano".to_string()),
                ..settings(1)
            },
        )
        .with_search_space(single(&["Conv3x3", "ReLU", "MaxPool2x2"]));
        let report = search.run().await.unwrap();
        assert_eq!(report.stored, 1);

        let records = search.store().records.lock().unwrap();
        let stored = &records[0];
        assert_eq!(stored.name, format!("exp_{}", stored.architecture));
        assert_eq!(stored.accuracy, 0.85);
        assert_eq!(stored.latency_ms, 19.0);
        assert_eq!(stored.dataset.as_deref(), Some("CIFAR-10"));
        assert_eq!(stored.hardware.as_deref(), Some("Jetson-Nano"));
    }

    #[tokio::test]
    async fn test_conflicts_are_reported_and_search_continues() {
        let store = FakeStore {
            always_conflict: true,
            ..FakeStore::default()
        };
        let mut search = SearchLoop::new(store, MockEvaluator, settings(5));
        let report = search.run().await.unwrap();
        assert_eq!(report.rejected, 5);
        assert_eq!(search.store().len(), 0);
    }

    #[tokio::test]
    async fn test_evaluator_failure_aborts_run() {
        let mut search = SearchLoop::new(FakeStore::default(), FailingEvaluator, settings(5));
        let err = search.run().await.unwrap_err();
        assert!(matches!(err, NasError::Evaluation { .. }));
        assert_eq!(search.store().len(), 0);
    }

    #[tokio::test]
    async fn test_same_seed_same_run() {
        let mut a = SearchLoop::new(FakeStore::default(), MockEvaluator, settings(8));
        let mut b = SearchLoop::new(FakeStore::default(), MockEvaluator, settings(8));
        let ra = a.run().await.unwrap();
        let rb = b.run().await.unwrap();
        let names = |r: &SearchReport| -> Vec<Candidate> {
            r.iterations.iter().map(|i| i.candidate.clone()).collect()
        };
        assert_eq!(names(&ra), names(&rb));
    }
}
