use crate::error::{MatchError, MatchResult};
use crate::types::Neighbor;

/// Nearest / second-nearest distance ratio test on squared distances.
///
/// A threshold of 0.49 on squared distances is the same as 0.7 on plain
/// Euclidean distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioTest {
    threshold: f64,
}

impl RatioTest {
    pub fn new(threshold: f64) -> MatchResult<Self> {
        validate_threshold(threshold)?;
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Accept iff a second neighbor exists and `best < threshold * second`
    pub fn accept(&self, best_sq: f64, second_sq: Option<f64>) -> bool {
        accept(best_sq, second_sq, self.threshold)
    }

    /// Applies the test to a sorted search result
    pub fn accept_neighbors<T>(&self, neighbors: &[Neighbor<'_, T>]) -> bool {
        match neighbors {
            [best, second, ..] => self.accept(best.distance_sq, Some(second.distance_sq)),
            _ => false,
        }
    }
}

/// Ratio test with an explicit threshold; no validation of `threshold`
pub fn accept(best_sq: f64, second_sq: Option<f64>, threshold: f64) -> bool {
    match second_sq {
        Some(second) => best_sq < threshold * second,
        None => false,
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> MatchResult<()> {
    // NaN fails both comparisons
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(MatchError::InvalidRatioThreshold(threshold))
    }
}
