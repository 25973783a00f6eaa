//! Concurrent search workers.
//!
//! Spawns one tokio task per worker, each running its own [`SearchLoop`]
//! against a shared store. Worker `i` is seeded with `seed + i` so seeded
//! runs stay reproducible per worker. Prune checks read whatever other
//! workers have committed so far.

use std::path::PathBuf;

use lineage_core::config::SearchSettings;
use serde::Serialize;

use crate::error::{NasError, Result};
use crate::evaluate::Evaluator;
use crate::journal::{JournalStore, SearchJournal};
use crate::search::{SearchLoop, SearchReport};
use crate::store::ExperimentStore;

/// Outcome of one worker's run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerResult {
    pub worker: usize,
    pub report: SearchReport,
    pub journal: Option<PathBuf>,
}

pub struct SearchScheduler<S, E> {
    store: S,
    evaluator: E,
    settings: SearchSettings,
}

impl<S, E> SearchScheduler<S, E>
where
    S: ExperimentStore + Clone + Send + Sync + 'static,
    E: Evaluator + Clone + Send + Sync + 'static,
{
    pub fn new(store: S, evaluator: E, settings: SearchSettings) -> Self {
        Self {
            store,
            evaluator,
            settings,
        }
    }

    /// Run `settings.workers` loops to completion. Every worker is awaited;
    /// the first failure is returned after all of them finish.
    pub async fn run(&self) -> Result<Vec<WorkerResult>> {
        let workers = self.settings.workers.max(1);
        let journals = self
            .settings
            .journal_dir
            .as_ref()
            .map(JournalStore::new)
            .transpose()?;
        let journals = journals.map(std::sync::Arc::new);

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let settings = worker_settings(&self.settings, worker);
            let store = self.store.clone();
            let evaluator = self.evaluator.clone();
            let journals = journals.clone();

            let handle = tokio::spawn(async move {
                let journal = SearchJournal::start(worker, &settings);
                let report = SearchLoop::new(store, evaluator, settings).run().await?;

                let path = match journals {
                    Some(store) => Some(store.save(&journal.finalize(report.clone())?)?),
                    None => None,
                };
                Ok::<_, NasError>(WorkerResult {
                    worker,
                    report,
                    journal: path,
                })
            });
            handles.push(handle);
        }

        tracing::info!(workers, "Search workers started");

        let mut results = Vec::with_capacity(workers);
        let mut first_error = None;
        for (worker, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(e)) => {
                    tracing::error!(worker, error = %e, "Search worker failed");
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    tracing::error!(worker, error = %e, "Search worker panicked");
                    first_error.get_or_insert(NasError::Worker {
                        worker,
                        reason: e.to_string(),
                    });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}

fn worker_settings(base: &SearchSettings, worker: usize) -> SearchSettings {
    SearchSettings {
        seed: base.seed.map(|s| s.wrapping_add(worker as u64)),
        ..base.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::MockEvaluator;
    use lineage_core::ExperimentRecord;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CountingStore {
        stored: Mutex<Vec<String>>,
    }

    impl ExperimentStore for CountingStore {
        async fn slow_architecture_count(&self, _depth: usize, _threshold_ms: f64) -> Result<i64> {
            Ok(0)
        }

        async fn store_experiment(&self, record: &ExperimentRecord) -> Result<()> {
            self.stored.lock().unwrap().push(record.name.clone());
            Ok(())
        }
    }

    #[test]
    fn test_worker_seeds_are_offset() {
        let base = SearchSettings {
            seed: Some(100),
            ..SearchSettings::default()
        };
        assert_eq!(worker_settings(&base, 0).seed, Some(100));
        assert_eq!(worker_settings(&base, 3).seed, Some(103));
        assert_eq!(worker_settings(&SearchSettings::default(), 3).seed, None);
    }

    #[tokio::test]
    async fn test_all_workers_run_to_completion() {
        let store = Arc::new(CountingStore::default());
        let settings = SearchSettings {
            iterations: 4,
            workers: 3,
            seed: Some(5),
            ..SearchSettings::default()
        };
        let results = SearchScheduler::new(store.clone(), MockEvaluator, settings)
            .run()
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.report.stored == 4 && r.journal.is_none()));
        assert_eq!(store.stored.lock().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_workers_write_journals() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SearchSettings {
            iterations: 2,
            workers: 2,
            journal_dir: Some(dir.path().to_string_lossy().into_owned()),
            ..SearchSettings::default()
        };
        let results = SearchScheduler::new(Arc::new(CountingStore::default()), MockEvaluator, settings)
            .run()
            .await
            .unwrap();

        for result in &results {
            let path = result.journal.as_ref().unwrap();
            assert!(path.starts_with(dir.path()));
            let journal = JournalStore::load(path).unwrap();
            assert_eq!(journal.worker, result.worker);
            assert_eq!(journal.report, result.report);
        }
    }
}
