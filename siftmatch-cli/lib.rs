use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use siftmatch_core::{Feature, FeatureKind};
use siftmatch_io::{FeatureIoError, FeatureMatch};
use siftmatch_kdtree::{MatchError, MatchStats, Matcher, MatcherConfig};
use tracing::info;

pub use siftmatch_core::{self, MatchConfig};
pub use siftmatch_kdtree::MatcherConfig as Config;

/// Line colour used for matches, magenta as in Lowe's demo
pub const MATCH_COLOR: Rgb<u8> = Rgb([255, 0, 255]);

#[derive(Debug)]
pub enum PipelineError {
    Match(MatchError),
    Features(FeatureIoError),
    Config(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Match(e) => write!(f, "Matching error: {}", e),
            PipelineError::Features(e) => write!(f, "Feature file error: {}", e),
            PipelineError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<MatchError> for PipelineError {
    fn from(err: MatchError) -> Self {
        PipelineError::Match(err)
    }
}

impl From<FeatureIoError> for PipelineError {
    fn from(err: FeatureIoError) -> Self {
        PipelineError::Features(err)
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// High-level matcher: index the second feature set, query it with the first
pub struct FeatureMatcher {
    config: MatcherConfig,
}

impl FeatureMatcher {
    /// Validate the configuration; worker threads are owned by each match run
    pub fn new(config: MatcherConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Load configuration from a JSON or TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let config = MatcherConfig::load(path).map_err(|e| PipelineError::Config(e.to_string()))?;
        Self::new(config)
    }

    /// Load a feature file; `None` guesses the format from the header
    pub fn load_features<P: AsRef<Path>>(path: P, kind: Option<FeatureKind>) -> PipelineResult<Vec<Feature>> {
        let features = match kind {
            Some(kind) => siftmatch_io::import_features(path, kind)?,
            None => siftmatch_io::import_features_auto(path)?.0,
        };
        Ok(features)
    }

    /// Match every feature of `features1` against an index over `features2`
    pub fn match_features<'q, 'a>(
        &self,
        features1: &'q [Feature],
        features2: &'a [Feature],
    ) -> PipelineResult<(Vec<FeatureMatch<'q, 'a>>, MatchStats)> {
        info!(count = features2.len(), "building kd tree");
        let matcher = Matcher::new(features2, self.config.core.clone())?;
        let (matches, stats) = matcher.match_all_with_stats(features1)?;
        info!(
            queries = stats.queries,
            rejected_ratio = stats.rejected_ratio,
            too_few_neighbors = stats.too_few_neighbors,
            "Found {} total matches",
            matches.len()
        );
        Ok((matches, stats))
    }

    /// Get matcher configuration
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }
}

/// Place `top` above `bottom` on a canvas as wide as the wider of the two
pub fn stack_images(top: &RgbImage, bottom: &RgbImage) -> RgbImage {
    let width = top.width().max(bottom.width());
    let height = top.height() + bottom.height();
    let mut stacked = RgbImage::new(width, height);
    image::imageops::replace(&mut stacked, top, 0, 0);
    image::imageops::replace(&mut stacked, bottom, 0, top.height() as i64);
    stacked
}

/// Draw a line per match from the query point (top image) to its match (bottom image)
pub fn draw_matches(stacked: &mut RgbImage, top_height: u32, matches: &[FeatureMatch<'_, '_>]) {
    let offset = top_height as f32;
    for m in matches {
        let start = (m.query.x.round() as f32, m.query.y.round() as f32);
        let end = (m.matched.x.round() as f32, m.matched.y.round() as f32 + offset);
        draw_line_segment_mut(stacked, start, end, MATCH_COLOR);
        draw_hollow_circle_mut(stacked, (start.0 as i32, start.1 as i32), 2, MATCH_COLOR);
        draw_hollow_circle_mut(stacked, (end.0 as i32, end.1 as i32), 2, MATCH_COLOR);
    }
}

/// Stack both images and draw the matches onto the result
pub fn render_matches(image1: &RgbImage, image2: &RgbImage, matches: &[FeatureMatch<'_, '_>]) -> RgbImage {
    let mut stacked = stack_images(image1, image2);
    draw_matches(&mut stacked, image1.height(), matches);
    stacked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_threaded() -> MatcherConfig {
        let mut cfg = MatcherConfig::new();
        cfg.core.n_threads = 1;
        cfg
    }

    fn features(points: &[(f64, f64, [f64; 3])]) -> Vec<Feature> {
        points
            .iter()
            .map(|&(x, y, d)| Feature::new(x, y, 1.0, 0.0, d.to_vec()))
            .collect()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = single_threaded();
        cfg.core.ratio_threshold = 0.0;
        assert!(matches!(
            FeatureMatcher::new(cfg),
            Err(PipelineError::Match(MatchError::InvalidRatioThreshold(_)))
        ));
    }

    #[test]
    fn test_several_multi_threaded_matchers() {
        let mut cfg = MatcherConfig::new();
        cfg.core.n_threads = 2;
        let first = FeatureMatcher::new(cfg.clone()).unwrap();
        let second = FeatureMatcher::new(cfg).unwrap();

        let image2 = features(&[
            (5.0, 5.0, [0.0, 0.0, 0.0]),
            (15.0, 5.0, [100.0, 0.0, 0.0]),
            (5.0, 15.0, [0.0, 100.0, 0.0]),
        ]);
        let image1 = features(&[(4.0, 6.0, [1.0, 0.0, 0.0])]);
        let (a, _) = first.match_features(&image1, &image2).unwrap();
        let (b, _) = second.match_features(&image1, &image2).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(a[0].matched_index, b[0].matched_index);
    }

    #[test]
    fn test_match_features() {
        let image2 = features(&[
            (5.0, 5.0, [0.0, 0.0, 0.0]),
            (15.0, 5.0, [100.0, 0.0, 0.0]),
            (5.0, 15.0, [0.0, 100.0, 0.0]),
        ]);
        let image1 = features(&[(4.0, 6.0, [1.0, 0.0, 0.0]), (9.0, 9.0, [50.0, 50.0, 0.0])]);

        let matcher = FeatureMatcher::new(single_threaded()).unwrap();
        let (matches, stats) = matcher.match_features(&image1, &image2).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].query_index, 0);
        assert_eq!(matches[0].matched_index, 0);
        assert_eq!(stats.rejected_ratio, 1);
    }

    #[test]
    fn test_empty_reference_set() {
        let matcher = FeatureMatcher::new(single_threaded()).unwrap();
        let queries = features(&[(0.0, 0.0, [0.0; 3])]);
        let result = matcher.match_features(&queries, &[]);
        assert!(matches!(result, Err(PipelineError::Match(MatchError::EmptyIndex))));
    }

    #[test]
    fn test_stack_images() {
        let top = RgbImage::from_pixel(4, 3, Rgb([10, 10, 10]));
        let bottom = RgbImage::from_pixel(6, 2, Rgb([200, 200, 200]));
        let stacked = stack_images(&top, &bottom);
        assert_eq!(stacked.dimensions(), (6, 5));
        assert_eq!(*stacked.get_pixel(0, 0), Rgb([10, 10, 10]));
        assert_eq!(*stacked.get_pixel(5, 0), Rgb([0, 0, 0]));
        assert_eq!(*stacked.get_pixel(5, 4), Rgb([200, 200, 200]));
    }

    #[test]
    fn test_render_matches_draws_line() {
        let image1 = RgbImage::new(20, 20);
        let image2 = RgbImage::new(20, 20);
        let query = Feature::new(10.0, 2.0, 1.0, 0.0, vec![0.0]);
        let target = Feature::new(10.0, 8.0, 1.0, 0.0, vec![0.0]);
        let matches = vec![FeatureMatch {
            query_index: 0,
            query: &query,
            matched_index: 0,
            matched: &target,
            best_distance_sq: 0.0,
            second_distance_sq: 1.0,
        }];

        let out = render_matches(&image1, &image2, &matches);
        assert_eq!(out.dimensions(), (20, 40));
        // vertical segment from (10, 2) to (10, 28)
        assert_eq!(*out.get_pixel(10, 15), MATCH_COLOR);
        assert_eq!(*out.get_pixel(0, 15), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matcher.toml");
        let mut cfg = single_threaded();
        cfg.core.max_visits = 75;
        cfg.save_toml(&path).unwrap();

        let matcher = FeatureMatcher::from_file(&path).unwrap();
        assert_eq!(matcher.config().core.max_visits, 75);

        std::fs::write(&path, "not = [valid").unwrap();
        assert!(matches!(FeatureMatcher::from_file(&path), Err(PipelineError::Config(_))));
    }
}
