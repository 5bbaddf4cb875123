/// Index of a node inside a tree's node arena
pub type NodeId = usize;

/// One entry of a k-nearest-neighbor result
#[derive(Debug)]
pub struct Neighbor<'a, T> {
    /// Position of the item in the slice the tree was built over
    pub index: usize,
    pub item: &'a T,
    pub distance_sq: f64,
}

impl<T> Clone for Neighbor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Neighbor<'_, T> {}

/// Accepted match between a query item and an indexed item
#[derive(Debug)]
pub struct Correspondence<'q, 'a, Q, T> {
    pub query_index: usize,
    pub query: &'q Q,
    pub matched_index: usize,
    pub matched: &'a T,
    /// Squared distance to the nearest neighbor
    pub best_distance_sq: f64,
    /// Squared distance to the second nearest neighbor
    pub second_distance_sq: f64,
}

impl<Q, T> Clone for Correspondence<'_, '_, Q, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Q, T> Copy for Correspondence<'_, '_, Q, T> {}

impl<Q, T> Correspondence<'_, '_, Q, T> {
    /// Squared distance ratio that justified acceptance
    pub fn ratio(&self) -> f64 {
        self.best_distance_sq / self.second_distance_sq
    }
}

/// Counters collected over one `match_all` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub queries: usize,
    pub accepted: usize,
    /// Two neighbors found but not distinct enough
    pub rejected_ratio: usize,
    /// Fewer than two neighbors came back from the search
    pub too_few_neighbors: usize,
}

impl MatchStats {
    pub(crate) fn merge(self, other: MatchStats) -> MatchStats {
        MatchStats {
            queries: self.queries + other.queries,
            accepted: self.accepted + other.accepted,
            rejected_ratio: self.rejected_ratio + other.rejected_ratio,
            too_few_neighbors: self.too_few_neighbors + other.too_few_neighbors,
        }
    }
}
