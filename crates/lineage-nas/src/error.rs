use lineage_graph::GraphError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NasError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Invalid search space: {0}")]
    InvalidSearchSpace(String),

    #[error("Evaluation failed for {candidate}: {reason}")]
    Evaluation { candidate: String, reason: String },

    #[error("Search worker {worker} failed: {reason}")]
    Worker { worker: usize, reason: String },

    #[error("Integrity violation: journal {0} has been tampered with")]
    IntegrityViolation(Uuid),

    #[error("Journal is not finalized (missing content hash)")]
    NotFinalized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NasError>;
