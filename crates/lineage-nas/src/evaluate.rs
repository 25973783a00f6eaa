//! Candidate evaluation.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::space::Candidate;

/// Measured quality of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub latency_ms: f64,
    pub flops: Option<f64>,
    pub energy_mj: Option<f64>,
}

/// Trains or measures a candidate. Implementations may be slow, so the
/// search loop awaits them without holding any store transaction.
pub trait Evaluator {
    fn evaluate(&self, candidate: &Candidate) -> impl Future<Output = Result<Evaluation>> + Send;
}

/// Deterministic stand-in: accuracy `0.7 + 0.05 * depth` rounded to two
/// decimals, latency `10 + 3 * depth` milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockEvaluator;

impl Evaluator for MockEvaluator {
    async fn evaluate(&self, candidate: &Candidate) -> Result<Evaluation> {
        let depth = candidate.depth() as f64;
        Ok(Evaluation {
            accuracy: ((0.7 + 0.05 * depth) * 100.0).round() / 100.0,
            latency_ms: 10.0 + 3.0 * depth,
            flops: None,
            energy_mj: None,
        })
    }
}
