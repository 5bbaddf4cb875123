#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Threshold on the squared ratio of distances between the nearest and second nearest neighbor
pub const NN_SQ_DIST_RATIO_THR: f64 = 0.49;

/// Maximum number of leaves checked during a best-bin-first search
pub const KDTREE_BBF_MAX_NN_CHKS: usize = 200;

/// Descriptor length produced by the standard 4x4x8 SIFT histogram layout
pub const SIFT_DESCR_LEN: usize = 128;

/// Text layout a feature set was read from or will be written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FeatureKind {
    /// David Lowe's keypoint files (`y x scale orientation` + descriptor)
    #[default]
    Lowe,
    /// Oxford VGG affine region files (`x y a b c` + descriptor)
    Oxford,
}

/// Image feature = location/shape payload + fixed-length descriptor
///
/// Only `descriptor` takes part in matching, everything else is carried
/// through to whoever consumes the correspondences.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Feature {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub orientation: f64,
    /// Oxford ellipse parameters, `a*dx^2 + 2*b*dx*dy + c*dy^2 = 1`
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub kind: FeatureKind,
    pub descriptor: Vec<f64>,
}

impl Feature {
    /// Lowe-style feature from position, scale and orientation
    pub fn new(x: f64, y: f64, scale: f64, orientation: f64, descriptor: Vec<f64>) -> Self {
        Self {
            x,
            y,
            scale,
            orientation,
            kind: FeatureKind::Lowe,
            descriptor,
            ..Self::default()
        }
    }

    /// Oxford-style feature from position and ellipse parameters
    pub fn oxford(x: f64, y: f64, a: f64, b: f64, c: f64, descriptor: Vec<f64>) -> Self {
        Self {
            x,
            y,
            a,
            b,
            c,
            kind: FeatureKind::Oxford,
            descriptor,
            ..Self::default()
        }
    }

    /// Descriptor length
    pub fn dimension(&self) -> usize {
        self.descriptor.len()
    }
}

impl AsRef<[f64]> for Feature {
    fn as_ref(&self) -> &[f64] {
        &self.descriptor
    }
}

/// Two descriptors of different length were compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionMismatch {
    pub expected: usize,
    pub actual: usize,
}

impl std::fmt::Display for DimensionMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Descriptor dimension mismatch: expected {}, got {}", self.expected, self.actual)
    }
}

impl std::error::Error for DimensionMismatch {}

/// Squared Euclidean distance between two descriptors
pub fn descr_dist_sq(a: &[f64], b: &[f64]) -> Result<f64, DimensionMismatch> {
    if a.len() != b.len() {
        return Err(DimensionMismatch { expected: a.len(), actual: b.len() });
    }
    Ok(dist_sq_unchecked(a, b))
}

/// Squared Euclidean distance without the length check.
///
/// Extra trailing components of the longer slice are ignored, callers must
/// have validated the dimensions beforehand.
#[inline(always)]
pub fn dist_sq_unchecked(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(p, q)| {
            let d = p - q;
            d * d
        })
        .sum()
}

/// Parameters of one matching session
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchConfig {
    /// Neighbors requested per query, 2 for ratio-test matching
    pub neighbors: usize,
    /// Leaf visits allowed per best-bin-first search
    pub max_visits: usize,
    /// Acceptance threshold on the squared distance ratio, in (0, 1]
    pub ratio_threshold: f64,
    pub n_threads: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            neighbors: 2,
            max_visits: KDTREE_BBF_MAX_NN_CHKS,
            ratio_threshold: NN_SQ_DIST_RATIO_THR,
            n_threads: num_cpus::get().max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_squared_euclidean() {
        let d = descr_dist_sq(&[0.0, 0.0], &[3.0, 4.0]).unwrap();
        assert_eq!(d, 25.0);
        assert_eq!(descr_dist_sq(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_distance_dimension_mismatch() {
        let err = descr_dist_sq(&[0.0; 128], &[0.0; 64]).unwrap_err();
        assert_eq!(err, DimensionMismatch { expected: 128, actual: 64 });
    }

    #[test]
    fn test_feature_exposes_descriptor() {
        let f = Feature::new(10.0, 20.0, 1.5, 0.25, vec![1.0, 2.0, 3.0]);
        assert_eq!(f.as_ref(), &[1.0, 2.0, 3.0]);
        assert_eq!(f.dimension(), 3);
        assert_eq!(f.kind, FeatureKind::Lowe);

        let o = Feature::oxford(1.0, 2.0, 0.1, 0.0, 0.1, vec![0.0; 4]);
        assert_eq!(o.kind, FeatureKind::Oxford);
        assert_eq!(o.scale, 0.0);
    }

    #[test]
    fn test_default_config() {
        let cfg = MatchConfig::default();
        assert_eq!(cfg.neighbors, 2);
        assert_eq!(cfg.max_visits, 200);
        assert_eq!(cfg.ratio_threshold, 0.49);
        assert!(cfg.n_threads >= 1);
    }
}
