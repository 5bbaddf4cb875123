//! Balanced k-d tree over a borrowed slice of descriptors.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`]. Every
//! internal node has exactly two children and every leaf references exactly
//! one item, so a tree over `n` items has `2n - 1` nodes.

use tracing::debug;

use crate::error::{MatchError, MatchResult};
use crate::types::NodeId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KdNode {
    Internal {
        /// Dimension of maximum variance among the node's vectors
        dim: usize,
        /// Lower median of `dim`, always a coordinate of one of the node's vectors
        split: f64,
        /// Vectors with `v[dim] <= split`
        left: NodeId,
        /// Vectors with `v[dim] >= split`
        right: NodeId,
    },
    Leaf {
        /// Position of the vector in the slice the tree was built over
        item: usize,
    },
}

#[derive(Debug)]
pub struct KdTree<'a, T> {
    items: &'a [T],
    nodes: Vec<KdNode>,
    root: NodeId,
    dimension: usize,
}

impl<T> Clone for KdTree<'_, T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items,
            nodes: self.nodes.clone(),
            root: self.root,
            dimension: self.dimension,
        }
    }
}

impl<'a, T: AsRef<[f64]>> KdTree<'a, T> {
    /// Builds a balanced tree over `items`.
    ///
    /// Each level splits on the dimension of maximum variance (lowest index on
    /// ties) at the lower median, found by linear-time selection.
    pub fn build(items: &'a [T]) -> MatchResult<Self> {
        let first = items.first().ok_or(MatchError::EmptyIndex)?;
        let dimension = first.as_ref().len();
        if dimension == 0 {
            return Err(MatchError::ZeroDimension);
        }
        if let Some(bad) = items.iter().find(|v| v.as_ref().len() != dimension) {
            return Err(MatchError::DimensionMismatch { expected: dimension, actual: bad.as_ref().len() });
        }

        let mut order: Vec<usize> = (0..items.len()).collect();
        let mut nodes = Vec::with_capacity(2 * items.len() - 1);
        let root = build_recursive(items, dimension, &mut order, &mut nodes);

        let tree = Self { items, nodes, root, dimension };
        debug!(
            vectors = items.len(),
            dimension,
            depth = tree.depth(),
            "built kd tree"
        );
        Ok(tree)
    }
}

impl<'a, T> KdTree<'a, T> {
    /// Number of indexed vectors
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false, construction rejects empty input
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Dimension shared by every indexed vector
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The slice the tree was built over
    pub fn items(&self) -> &'a [T] {
        self.items
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &KdNode {
        &self.nodes[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 1usize)];
        while let Some((id, d)) = stack.pop() {
            match self.nodes[id] {
                KdNode::Internal { left, right, .. } => {
                    stack.push((left, d + 1));
                    stack.push((right, d + 1));
                }
                KdNode::Leaf { .. } => deepest = deepest.max(d),
            }
        }
        deepest
    }

    /// Item indices held by the leaves under `id`, left to right
    pub fn subtree_items(&self, id: NodeId) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            match self.nodes[id] {
                KdNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
                KdNode::Leaf { item } => out.push(item),
            }
        }
        out
    }

    /// Item indices of every leaf in the tree, left to right
    pub fn leaf_items(&self) -> Vec<usize> {
        self.subtree_items(self.root)
    }
}

/// Builds the subtree over `order` and returns its id.
///
/// `order` holds item positions and is permuted in place; the left half
/// ends up in `order[..=m]`, the right half in `order[m + 1..]`.
fn build_recursive<T: AsRef<[f64]>>(
    items: &[T],
    dimension: usize,
    order: &mut [usize],
    nodes: &mut Vec<KdNode>,
) -> NodeId {
    if order.len() == 1 {
        nodes.push(KdNode::Leaf { item: order[0] });
        return nodes.len() - 1;
    }

    let dim = max_variance_dimension(items, dimension, order);
    let m = (order.len() - 1) / 2;
    let (_, &mut median, _) = order.select_nth_unstable_by(m, |&a, &b| {
        items[a].as_ref()[dim].total_cmp(&items[b].as_ref()[dim])
    });
    let split = items[median].as_ref()[dim];

    // Reserve the slot first so the parent precedes its children in the arena
    let id = nodes.len();
    nodes.push(KdNode::Leaf { item: usize::MAX });

    let (lo, hi) = order.split_at_mut(m + 1);
    let left = build_recursive(items, dimension, lo, nodes);
    let right = build_recursive(items, dimension, hi, nodes);
    nodes[id] = KdNode::Internal { dim, split, left, right };
    id
}

/// Dimension with the largest variance over `order`, lowest index on ties
fn max_variance_dimension<T: AsRef<[f64]>>(items: &[T], dimension: usize, order: &[usize]) -> usize {
    let n = order.len() as f64;
    let mut best_dim = 0;
    let mut best_var = f64::NEG_INFINITY;

    for dim in 0..dimension {
        let mean = order.iter().map(|&i| items[i].as_ref()[dim]).sum::<f64>() / n;
        let var = order
            .iter()
            .map(|&i| {
                let d = items[i].as_ref()[dim] - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        if var > best_var {
            best_var = var;
            best_dim = dim;
        }
    }
    best_dim
}
