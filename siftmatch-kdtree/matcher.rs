use rayon::prelude::*;
use siftmatch_core::MatchConfig;
use tracing::debug;

use crate::config::validate_match_config;
use crate::error::{MatchError, MatchResult};
use crate::ratio::RatioTest;
use crate::tree::KdTree;
use crate::types::{Correspondence, MatchStats};

/// Index over one feature set plus the parameters used to match queries against it.
///
/// With `n_threads > 1` the matcher owns a rayon pool of exactly that size, so
/// batch matching never depends on how the global pool was configured.
#[derive(Debug)]
pub struct Matcher<'a, T> {
    tree: KdTree<'a, T>,
    config: MatchConfig,
    ratio: RatioTest,
    pool: Option<rayon::ThreadPool>,
}

impl<'a, T: AsRef<[f64]>> Matcher<'a, T> {
    /// Validates `config` and builds the index over `items`
    pub fn new(items: &'a [T], config: MatchConfig) -> MatchResult<Self> {
        validate_match_config(&config)?;
        let ratio = RatioTest::new(config.ratio_threshold)?;
        let tree = KdTree::build(items)?;
        let pool = if config.n_threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.n_threads)
                .build()
                .map_err(|e| MatchError::ThreadPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };
        Ok(Self { tree, config, ratio, pool })
    }

    /// Worker threads used by batch matching
    pub fn threads(&self) -> usize {
        self.pool.as_ref().map_or(1, |pool| pool.current_num_threads())
    }

    pub fn tree(&self) -> &KdTree<'a, T> {
        &self.tree
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Match one query; `Ok(None)` when the ratio test rejects it
    pub fn match_one<'q, Q: AsRef<[f64]>>(
        &self,
        query_index: usize,
        query: &'q Q,
    ) -> MatchResult<Option<Correspondence<'q, 'a, Q, T>>> {
        Ok(self.evaluate(query_index, query)?.0)
    }

    /// Match every query in order, keeping only accepted correspondences
    pub fn match_all<'q, Q>(&self, queries: &'q [Q]) -> MatchResult<Vec<Correspondence<'q, 'a, Q, T>>>
    where
        Q: AsRef<[f64]> + Sync,
        T: Sync,
    {
        Ok(self.match_all_with_stats(queries)?.0)
    }

    /// Like [`Matcher::match_all`], also returning acceptance counters
    pub fn match_all_with_stats<'q, Q>(
        &self,
        queries: &'q [Q],
    ) -> MatchResult<(Vec<Correspondence<'q, 'a, Q, T>>, MatchStats)>
    where
        Q: AsRef<[f64]> + Sync,
        T: Sync,
    {
        let outcomes: Vec<_> = if let Some(pool) = &self.pool {
            pool.install(|| {
                queries
                    .par_iter()
                    .enumerate()
                    .map(|(i, q)| self.evaluate(i, q))
                    .collect::<MatchResult<Vec<_>>>()
            })?
        } else {
            queries
                .iter()
                .enumerate()
                .map(|(i, q)| self.evaluate(i, q))
                .collect::<MatchResult<Vec<_>>>()?
        };

        let mut stats = MatchStats::default();
        let mut matches = Vec::new();
        for (found, s) in outcomes {
            stats = stats.merge(s);
            matches.extend(found);
        }

        debug!(
            queries = stats.queries,
            accepted = stats.accepted,
            rejected_ratio = stats.rejected_ratio,
            too_few_neighbors = stats.too_few_neighbors,
            "matched feature set"
        );
        Ok((matches, stats))
    }

    fn evaluate<'q, Q: AsRef<[f64]>>(
        &self,
        query_index: usize,
        query: &'q Q,
    ) -> MatchResult<(Option<Correspondence<'q, 'a, Q, T>>, MatchStats)> {
        let neighbors = self
            .tree
            .knn(query.as_ref(), self.config.neighbors, self.config.max_visits)?;
        let mut stats = MatchStats { queries: 1, ..MatchStats::default() };

        let (best, second) = match neighbors.as_slice() {
            [best, second, ..] => (*best, *second),
            _ => {
                stats.too_few_neighbors = 1;
                return Ok((None, stats));
            }
        };

        if !self.ratio.accept_neighbors(&neighbors) {
            stats.rejected_ratio = 1;
            return Ok((None, stats));
        }

        stats.accepted = 1;
        Ok((
            Some(Correspondence {
                query_index,
                query,
                matched_index: best.index,
                matched: best.item,
                best_distance_sq: best.distance_sq,
                second_distance_sq: second.distance_sq,
            }),
            stats,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threads: usize) -> MatchConfig {
        MatchConfig {
            neighbors: 2,
            max_visits: 200,
            ratio_threshold: 0.49,
            n_threads: threads,
        }
    }

    fn triangle() -> Vec<Vec<f64>> {
        vec![vec![0.0, 0.0], vec![10.0, 0.0], vec![0.0, 10.0]]
    }

    #[test]
    fn test_match_one_accepts_distinct() {
        let items = triangle();
        let matcher = Matcher::new(&items, config(1)).unwrap();
        let query = vec![1.0, 0.0];
        let m = matcher.match_one(0, &query).unwrap().unwrap();
        assert_eq!(m.matched_index, 0);
        assert_eq!(m.best_distance_sq, 1.0);
        assert_eq!(m.second_distance_sq, 81.0);
        assert_eq!(m.query, &query);
        assert!((m.ratio() - 1.0 / 81.0).abs() < 1e-12);
    }

    #[test]
    fn test_match_one_rejects_tie() {
        let items = triangle();
        let matcher = Matcher::new(&items, config(1)).unwrap();
        assert!(matcher.match_one(0, &vec![5.0, 0.0]).unwrap().is_none());
    }

    #[test]
    fn test_single_vector_index_never_matches() {
        let items = vec![vec![0.0, 0.0]];
        let matcher = Matcher::new(&items, config(1)).unwrap();
        let queries = vec![vec![0.0, 0.0], vec![3.0, 3.0]];
        let (matches, stats) = matcher.match_all_with_stats(&queries).unwrap();
        assert!(matches.is_empty());
        assert_eq!(stats.too_few_neighbors, 2);
        assert_eq!(stats.queries, 2);
    }

    #[test]
    fn test_match_all_keeps_query_order() {
        let items: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64 * 10.0, (i % 5) as f64 * 100.0]).collect();
        let queries: Vec<Vec<f64>> = items.iter().rev().map(|v| vec![v[0] + 0.5, v[1]]).collect();

        let serial = Matcher::new(&items, config(1)).unwrap().match_all(&queries).unwrap();
        let parallel = Matcher::new(&items, config(4)).unwrap().match_all(&queries).unwrap();

        assert_eq!(serial.len(), queries.len());
        assert_eq!(serial.len(), parallel.len());
        for (i, (a, b)) in serial.iter().zip(parallel.iter()).enumerate() {
            assert_eq!(a.query_index, i);
            assert_eq!(a.query_index, b.query_index);
            assert_eq!(a.matched_index, b.matched_index);
            assert_eq!(a.matched_index, items.len() - 1 - i);
        }
    }

    #[test]
    fn test_each_matcher_owns_its_pool() {
        let items: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64 * 10.0, (i % 4) as f64 * 50.0]).collect();
        let queries: Vec<Vec<f64>> = items.iter().map(|v| vec![v[0] + 0.5, v[1]]).collect();

        let serial = Matcher::new(&items, config(1)).unwrap();
        let two = Matcher::new(&items, config(2)).unwrap();
        let three = Matcher::new(&items, config(3)).unwrap();
        assert_eq!(serial.threads(), 1);
        assert_eq!(two.threads(), 2);
        assert_eq!(three.threads(), 3);

        let a = two.match_all(&queries).unwrap();
        let b = three.match_all(&queries).unwrap();
        assert_eq!(a.len(), queries.len());
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.matched_index, y.matched_index);
        }
    }

    #[test]
    fn test_stats_add_up() {
        let items = triangle();
        let matcher = Matcher::new(&items, config(1)).unwrap();
        let queries = vec![vec![1.0, 0.0], vec![5.0, 0.0], vec![0.0, 9.5]];
        let (matches, stats) = matcher.match_all_with_stats(&queries).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(stats, MatchStats { queries: 3, accepted: 2, rejected_ratio: 1, too_few_neighbors: 0 });
    }

    #[test]
    fn test_invalid_config_rejected() {
        let items = triangle();
        let mut cfg = config(1);
        cfg.ratio_threshold = 1.5;
        assert!(matches!(Matcher::new(&items, cfg), Err(MatchError::InvalidRatioThreshold(_))));

        let mut cfg = config(1);
        cfg.max_visits = 0;
        assert!(matches!(Matcher::new(&items, cfg), Err(MatchError::InvalidVisitBudget(0))));

        let mut cfg = config(1);
        cfg.neighbors = 0;
        assert!(matches!(Matcher::new(&items, cfg), Err(MatchError::InvalidNeighborCount(0))));
    }

    #[test]
    fn test_query_dimension_mismatch_propagates() {
        let items = triangle();
        let matcher = Matcher::new(&items, config(2)).unwrap();
        let queries = vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]];
        let err = matcher.match_all(&queries).unwrap_err();
        assert_eq!(err, MatchError::DimensionMismatch { expected: 2, actual: 3 });
    }

    #[test]
    fn test_empty_index() {
        let items: Vec<Vec<f64>> = Vec::new();
        assert!(matches!(Matcher::new(&items, config(1)), Err(MatchError::EmptyIndex)));
    }
}
