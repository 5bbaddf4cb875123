use siftmatch_core::{MatchConfig, NN_SQ_DIST_RATIO_THR};
use crate::builder::MatcherBuilder;
use crate::error::{MatchError, MatchResult};
use crate::ratio::validate_threshold;

#[cfg(feature = "serde")]
use serde::{Serialize, Deserialize};

/// Largest visit budget that still fits a TOML integer
pub const UNBOUNDED_VISITS: usize = usize::MAX >> 1;

/// Checks `k`, the visit budget and the ratio threshold
pub fn validate_match_config(config: &MatchConfig) -> MatchResult<()> {
    if config.neighbors == 0 {
        return Err(MatchError::InvalidNeighborCount(config.neighbors));
    }
    if config.max_visits == 0 {
        return Err(MatchError::InvalidVisitBudget(config.max_visits));
    }
    validate_threshold(config.ratio_threshold)
}

/// Complete matcher configuration with metadata
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatcherConfig {
    /// Core matching parameters
    pub core: MatchConfig,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub version: Option<String>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MatcherConfig {
    /// Lowe's settings: 2 neighbors, 200 leaf checks, 0.49 squared ratio, all cores
    pub fn new() -> Self {
        Self {
            core: MatchConfig::default(),
            name: None,
            description: None,
            version: None,
        }
    }

    /// Small search budget, all cores
    pub fn fast_preset() -> Self {
        Self {
            core: MatchConfig {
                neighbors: 2,
                max_visits: 50,
                ratio_threshold: NN_SQ_DIST_RATIO_THR,
                n_threads: num_cpus::get(),
            },
            name: Some("Fast".to_string()),
            description: Some("Small leaf budget for real-time matching".to_string()),
            version: Some("1.0".to_string()),
        }
    }

    /// Larger search budget and a stricter ratio for fewer false matches
    pub fn accurate_preset() -> Self {
        Self {
            core: MatchConfig {
                neighbors: 2,
                max_visits: 1000,
                ratio_threshold: 0.36,
                n_threads: num_cpus::get(),
            },
            name: Some("Accurate".to_string()),
            description: Some("Large leaf budget with a strict 0.6 distance ratio".to_string()),
            version: Some("1.0".to_string()),
        }
    }

    /// Unbounded budget, BBF degenerates into exact search
    pub fn exhaustive_preset() -> Self {
        Self {
            core: MatchConfig {
                neighbors: 2,
                max_visits: UNBOUNDED_VISITS,
                ratio_threshold: NN_SQ_DIST_RATIO_THR,
                n_threads: num_cpus::get(),
            },
            name: Some("Exhaustive".to_string()),
            description: Some("Exact nearest neighbors, no visit limit".to_string()),
            version: Some("1.0".to_string()),
        }
    }

    /// Add metadata to configuration
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self.version = Some("1.0".to_string());
        self
    }

    /// Convert to MatcherBuilder for further customization
    pub fn to_builder(self) -> MatcherBuilder {
        MatcherBuilder::from_config(self)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "MatcherConfig: k={}, max_visits={}, ratio_threshold={:.3}, threads={}",
            self.core.neighbors, self.core.max_visits, self.core.ratio_threshold, self.core.n_threads
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> MatchResult<()> {
        validate_match_config(&self.core)
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from `.json` or `.toml`, chosen by extension (TOML otherwise)
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let is_json = path
            .as_ref()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::load_json(path)
        } else {
            Self::load_toml(path)
        }
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
