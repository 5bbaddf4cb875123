//! Best-bin-first k-nearest-neighbor search.
//!
//! The search walks straight down to the leaf on the query's side of every
//! split and defers each sibling to a priority queue keyed by the squared
//! distance from the query to the sibling's cell. Later rounds pop the
//! closest deferred cell and repeat, until the visit budget is spent, the
//! queue runs dry, or no deferred cell can beat the current k-th neighbor.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use siftmatch_core::dist_sq_unchecked;
use tracing::trace;

use crate::error::{MatchError, MatchResult};
use crate::tree::{KdNode, KdTree};
use crate::types::{Neighbor, NodeId};

/// Deferred subtree waiting in the backtracking queue
#[derive(Debug, Clone, Copy)]
struct Branch {
    /// Squared distance from the query to the subtree's cell
    bound: f64,
    node: NodeId,
    /// Head of the cell's gap chain, `None` while the query lies inside on every dimension
    gaps: Option<usize>,
}

// BinaryHeap is a max-heap, reverse so the smallest bound pops first
impl Ord for Branch {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .bound
            .total_cmp(&self.bound)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Branch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Branch {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Branch {}

/// Squared gap between the query and a cell along one dimension.
///
/// Links form a persistent list per cell: a cell shares its parent's
/// links and adds one for the split that created it.
#[derive(Debug, Clone, Copy)]
struct GapLink {
    dim: usize,
    gap_sq: f64,
    prev: Option<usize>,
}

fn gap_sq(links: &[GapLink], mut at: Option<usize>, dim: usize) -> f64 {
    while let Some(i) = at {
        let link = &links[i];
        if link.dim == dim {
            return link.gap_sq;
        }
        at = link.prev;
    }
    0.0
}

/// Best-k entry; the heap keeps the worst candidate on top
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance_sq: f64,
    index: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_sq
            .total_cmp(&other.distance_sq)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl<'a, T: AsRef<[f64]>> KdTree<'a, T> {
    /// Approximate k nearest neighbors of `query`, at most `max_visits` leaves examined.
    ///
    /// Results are sorted by ascending squared distance (ties by item index).
    /// Fewer than `k` results come back when the tree is smaller than `k` or
    /// the budget runs out first; neither case is an error.
    pub fn knn(&self, query: &[f64], k: usize, max_visits: usize) -> MatchResult<Vec<Neighbor<'a, T>>> {
        self.bbf(query, k, max_visits, |_, _| {})
    }

    /// Nearest and second nearest neighbor, the input of the ratio test
    pub fn two_nearest(&self, query: &[f64], max_visits: usize) -> MatchResult<Vec<Neighbor<'a, T>>> {
        self.knn(query, 2, max_visits)
    }

    /// BBF search reporting every deferred subtree and its lower bound to `on_defer`
    pub(crate) fn bbf<F>(
        &self,
        query: &[f64],
        k: usize,
        max_visits: usize,
        mut on_defer: F,
    ) -> MatchResult<Vec<Neighbor<'a, T>>>
    where
        F: FnMut(NodeId, f64),
    {
        if k == 0 {
            return Err(MatchError::InvalidNeighborCount(k));
        }
        if max_visits == 0 {
            return Err(MatchError::InvalidVisitBudget(max_visits));
        }
        if query.len() != self.dimension() {
            return Err(MatchError::DimensionMismatch { expected: self.dimension(), actual: query.len() });
        }

        let items = self.items();
        let mut queue = BinaryHeap::new();
        let mut links: Vec<GapLink> = Vec::new();
        let mut best: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        let mut visits = 0usize;

        queue.push(Branch { bound: 0.0, node: self.root(), gaps: None });

        while visits < max_visits {
            let Some(branch) = queue.pop() else { break };

            if best.len() == k {
                if let Some(worst) = best.peek() {
                    if branch.bound > worst.distance_sq {
                        break;
                    }
                }
            }

            let mut node = branch.node;
            loop {
                match *self.node(node) {
                    KdNode::Internal { dim, split, left, right } => {
                        let diff = query[dim] - split;
                        let (near, far) = if diff <= 0.0 { (left, right) } else { (right, left) };

                        // The far cell differs from this one only along `dim`
                        let gap = diff * diff;
                        let bound = branch.bound + (gap - gap_sq(&links, branch.gaps, dim));
                        links.push(GapLink { dim, gap_sq: gap, prev: branch.gaps });

                        on_defer(far, bound);
                        queue.push(Branch { bound, node: far, gaps: Some(links.len() - 1) });
                        node = near;
                    }
                    KdNode::Leaf { item } => {
                        let candidate = Candidate {
                            distance_sq: dist_sq_unchecked(query, items[item].as_ref()),
                            index: item,
                        };
                        if best.len() < k {
                            best.push(candidate);
                        } else if best.peek().is_some_and(|worst| candidate < *worst) {
                            best.pop();
                            best.push(candidate);
                        }
                        visits += 1;
                        break;
                    }
                }
            }
        }

        trace!(visits, found = best.len(), pending = queue.len(), "bbf search finished");

        Ok(best
            .into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor { index: c.index, item: &items[c.index], distance_sq: c.distance_sq })
            .collect())
    }
}
