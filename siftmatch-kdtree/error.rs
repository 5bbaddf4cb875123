use siftmatch_core::DimensionMismatch;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchError {
    EmptyIndex,
    DimensionMismatch { expected: usize, actual: usize },
    ZeroDimension,
    InvalidNeighborCount(usize),
    InvalidVisitBudget(usize),
    InvalidRatioThreshold(f64),
    ThreadPool(String),
}

impl MatchError {
    /// True for the invalid-parameter family (`k`, visit budget, ratio)
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            MatchError::InvalidNeighborCount(_)
                | MatchError::InvalidVisitBudget(_)
                | MatchError::InvalidRatioThreshold(_)
        )
    }
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::EmptyIndex => {
                write!(f, "Cannot build or query an index over zero vectors")
            }
            MatchError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: index holds {}-D vectors, got {}-D", expected, actual)
            }
            MatchError::ZeroDimension => {
                write!(f, "Vectors must have at least one dimension")
            }
            MatchError::InvalidNeighborCount(k) => {
                write!(f, "Invalid neighbor count: {} (must be >= 1)", k)
            }
            MatchError::InvalidVisitBudget(n) => {
                write!(f, "Invalid visit budget: {} (must be >= 1)", n)
            }
            MatchError::InvalidRatioThreshold(r) => {
                write!(f, "Invalid ratio threshold: {} (must be in (0, 1])", r)
            }
            MatchError::ThreadPool(e) => {
                write!(f, "Failed to build matcher thread pool: {}", e)
            }
        }
    }
}

impl std::error::Error for MatchError {}

impl From<DimensionMismatch> for MatchError {
    fn from(err: DimensionMismatch) -> Self {
        MatchError::DimensionMismatch { expected: err.expected, actual: err.actual }
    }
}

pub type MatchResult<T> = Result<T, MatchError>;
