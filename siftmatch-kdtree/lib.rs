//! k-d tree index, best-bin-first search and ratio-test descriptor matching.
//!
//! ```no_run
//! use siftmatch_kdtree::MatcherBuilder;
//!
//! let reference = vec![vec![0.0, 0.0], vec![10.0, 0.0], vec![0.0, 10.0]];
//! let queries = vec![vec![1.0, 0.0]];
//!
//! let matcher = MatcherBuilder::new().max_visits(200).build(&reference)?;
//! for m in matcher.match_all(&queries)? {
//!     println!("{} -> {} ({:.3})", m.query_index, m.matched_index, m.ratio());
//! }
//! # Ok::<(), siftmatch_kdtree::MatchError>(())
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod matcher;
pub mod ratio;
pub mod search;
pub mod tree;
pub mod types;

pub use builder::MatcherBuilder;
pub use config::{validate_match_config, MatcherConfig, UNBOUNDED_VISITS};
pub use error::{MatchError, MatchResult};
pub use matcher::Matcher;
pub use ratio::{accept, RatioTest};
pub use tree::{KdNode, KdTree};
pub use types::{Correspondence, MatchStats, Neighbor, NodeId};

pub use siftmatch_core::{descr_dist_sq, Feature, MatchConfig};
