use siftmatch_core::MatchConfig;
use crate::config::MatcherConfig;
use crate::error::MatchResult;
use crate::matcher::Matcher;

/// Builder for creating a `Matcher`
#[derive(Debug, Clone)]
pub struct MatcherBuilder {
    config: MatchConfig,
}

impl Default for MatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MatcherBuilder {
    /// Create a new builder with Lowe's default settings
    pub fn new() -> Self {
        Self { config: MatcherConfig::new().core }
    }

    /// Set the number of neighbors requested per query
    pub fn neighbors(mut self, k: usize) -> Self {
        self.config.neighbors = k;
        self
    }

    /// Set the maximum number of leaves checked per search
    pub fn max_visits(mut self, max_visits: usize) -> Self {
        self.config.max_visits = max_visits;
        self
    }

    /// Set the threshold on the squared nearest / second-nearest ratio
    pub fn ratio_threshold(mut self, threshold: f64) -> Self {
        self.config.ratio_threshold = threshold;
        self
    }

    /// Set the threshold from a plain (not squared) distance ratio
    pub fn distance_ratio(mut self, ratio: f64) -> Self {
        self.config.ratio_threshold = ratio * ratio;
        self
    }

    /// Set the number of threads used by `match_all`
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.n_threads = n_threads;
        self
    }

    /// Apply the fast preset
    pub fn preset_fast(mut self) -> Self {
        self.config = MatcherConfig::fast_preset().core;
        self
    }

    /// Apply the accurate preset
    pub fn preset_accurate(mut self) -> Self {
        self.config = MatcherConfig::accurate_preset().core;
        self
    }

    /// Apply the exhaustive preset
    pub fn preset_exhaustive(mut self) -> Self {
        self.config = MatcherConfig::exhaustive_preset().core;
        self
    }

    /// Build the index over `items`
    pub fn build<T: AsRef<[f64]>>(self, items: &[T]) -> MatchResult<Matcher<'_, T>> {
        Matcher::new(items, self.config)
    }

    /// Generate a summary of the builder's configuration
    pub fn summary(&self) -> String {
        self.clone().to_config().summary()
    }

    /// Create a builder from an existing `MatcherConfig`
    pub fn from_config(config: MatcherConfig) -> Self {
        Self { config: config.core }
    }

    /// Convert the builder into a `MatcherConfig`
    pub fn to_config(self) -> MatcherConfig {
        MatcherConfig {
            core: self.config,
            name: None,
            description: None,
            version: None,
        }
    }
}
