//! Tamper-evident run journals.
//!
//! A finalized journal carries a BLAKE3 hash over every other field.
//! Journals are stored as `{root}/YYYY/MM/DD/{run_id}.json`. Loading one
//! from the path `save` returned recomputes the hash and refuses anything
//! that no longer matches.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use lineage_core::config::SearchSettings;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NasError, Result};
use crate::search::SearchReport;

/// The record of one search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchJournal {
    pub run_id: Uuid,
    pub worker: usize,
    pub settings: SearchSettings,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub report: SearchReport,
    pub content_hash: Option<String>,
}

/// Everything but `content_hash`, borrowed for hashing.
#[derive(Serialize)]
struct HashableJournal<'a> {
    run_id: &'a Uuid,
    worker: usize,
    settings: &'a SearchSettings,
    started_at: &'a DateTime<Utc>,
    completed_at: &'a Option<DateTime<Utc>>,
    report: &'a SearchReport,
}

impl SearchJournal {
    /// Open a journal for a run that is about to start.
    pub fn start(worker: usize, settings: &SearchSettings) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            worker,
            settings: settings.clone(),
            started_at: Utc::now(),
            completed_at: None,
            report: SearchReport::default(),
            content_hash: None,
        }
    }

    /// Attach the run's report, stamp completion, and seal the content hash.
    pub fn finalize(mut self, report: SearchReport) -> Result<Self> {
        self.report = report;
        self.completed_at = Some(Utc::now());
        self.content_hash = Some(self.compute_hash()?);
        Ok(self)
    }

    /// Hex BLAKE3 hash of the canonical JSON of every field except the hash.
    pub fn compute_hash(&self) -> Result<String> {
        let hashable = HashableJournal {
            run_id: &self.run_id,
            worker: self.worker,
            settings: &self.settings,
            started_at: &self.started_at,
            completed_at: &self.completed_at,
            report: &self.report,
        };
        let json = serde_json::to_vec(&hashable)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }

    pub fn verify_integrity(&self) -> bool {
        match (&self.content_hash, self.compute_hash()) {
            (Some(stored), Ok(computed)) => *stored == computed,
            _ => false,
        }
    }
}

/// Date-partitioned directory of journals.
pub struct JournalStore {
    root: PathBuf,
}

impl JournalStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, journal: &SearchJournal) -> PathBuf {
        let date = journal.started_at;
        self.root
            .join(format!("{:04}", date.year()))
            .join(format!("{:02}", date.month()))
            .join(format!("{:02}", date.day()))
            .join(format!("{}.json", journal.run_id))
    }

    /// Write a finalized journal; returns the file it was written to.
    pub fn save(&self, journal: &SearchJournal) -> Result<PathBuf> {
        if journal.content_hash.is_none() {
            return Err(NasError::NotFinalized);
        }

        let path = self.path_for(journal);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(journal)?)?;

        tracing::debug!(run_id = %journal.run_id, path = %path.display(), "Journal saved");
        Ok(path)
    }

    /// Read a journal file and verify its content hash.
    pub fn load(path: &Path) -> Result<SearchJournal> {
        let journal: SearchJournal = serde_json::from_str(&fs::read_to_string(path)?)?;
        if !journal.verify_integrity() {
            return Err(NasError::IntegrityViolation(journal.run_id));
        }
        Ok(journal)
    }
}
