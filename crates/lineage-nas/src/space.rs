//! The search space and candidate proposal.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NasError, Result};

/// An architecture proposed for evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub layers: Vec<String>,
}

impl Candidate {
    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}

/// The layer sequences a search may propose. Never empty, and no
/// sequence is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSpace {
    sequences: Vec<Vec<String>>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        let seq = |names: &[&str]| names.iter().map(|n| n.to_string()).collect();
        Self {
            sequences: vec![
                seq(&["Conv3x3", "ReLU", "MaxPool2x2"]),
                seq(&["Conv3x3", "ReLU", "Conv3x3", "ReLU"]),
                seq(&["Conv3x3", "ReLU", "MaxPool2x2", "Conv3x3"]),
            ],
        }
    }
}

impl SearchSpace {
    pub fn new(sequences: Vec<Vec<String>>) -> Result<Self> {
        if sequences.is_empty() {
            return Err(NasError::InvalidSearchSpace(
                "at least one layer sequence is required".to_string(),
            ));
        }
        if let Some(i) = sequences.iter().position(|s| s.is_empty()) {
            return Err(NasError::InvalidSearchSpace(format!(
                "sequence {i} has no layers"
            )));
        }
        Ok(Self { sequences })
    }

    pub fn sequences(&self) -> &[Vec<String>] {
        &self.sequences
    }

    /// Pick a sequence uniformly and give it a name `NAS_CNN_<100..=999>`.
    pub fn propose<R: Rng + ?Sized>(&self, rng: &mut R) -> Candidate {
        let layers = self
            .sequences
            .choose(rng)
            .cloned()
            .unwrap_or_default();
        Candidate {
            name: format!("NAS_CNN_{}", rng.gen_range(100..=999)),
            layers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_space() {
        let space = SearchSpace::default();
        let depths: Vec<usize> = space.sequences().iter().map(Vec::len).collect();
        assert_eq!(depths, vec![3, 4, 4]);
    }

    #[test]
    fn test_empty_space_rejected() {
        assert!(matches!(
            SearchSpace::new(vec![]),
            Err(NasError::InvalidSearchSpace(_))
        ));
        assert!(matches!(
            SearchSpace::new(vec![vec!["ReLU".to_string()], vec![]]),
            Err(NasError::InvalidSearchSpace(_))
        ));
    }

    #[test]
    fn test_proposals_come_from_space() {
        let space = SearchSpace::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let c = space.propose(&mut rng);
            assert!(space.sequences().contains(&c.layers));
            let suffix: u32 = c.name.strip_prefix("NAS_CNN_").unwrap().parse().unwrap();
            assert!((100..=999).contains(&suffix));
        }
    }

    #[test]
    fn test_same_seed_same_proposals() {
        let space = SearchSpace::default();
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..10 {
            assert_eq!(space.propose(&mut a), space.propose(&mut b));
        }
    }
}
