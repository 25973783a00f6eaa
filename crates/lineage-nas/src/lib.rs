//! Architecture search over a fixed space of layer sequences.
//!
//! Each iteration proposes a candidate, asks the store whether its depth
//! already produced a slow experiment, and either prunes it or evaluates
//! and records it. Runs can be journaled to disk with a BLAKE3 content
//! hash so later tampering is detectable.

pub mod error;
pub mod evaluate;
pub mod journal;
pub mod scheduler;
pub mod search;
pub mod space;
pub mod store;

pub use error::NasError;
pub use evaluate::{Evaluation, Evaluator, MockEvaluator};
pub use journal::{JournalStore, SearchJournal};
pub use scheduler::{SearchScheduler, WorkerResult};
pub use search::{IterationOutcome, IterationRecord, SearchLoop, SearchReport};
pub use space::{Candidate, SearchSpace};
pub use store::ExperimentStore;
