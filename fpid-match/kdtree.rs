//! Best-bin-first kd-tree over candidate descriptors.
//!
//! Splits on the dimension of highest variance at the median, so the tree is
//! a pure function of its input. Search visits leaves in order of their lower
//! distance bound and stops after `max_checks` descriptor comparisons, giving
//! approximate neighbours; with `max_checks == 0` every reachable leaf is
//! checked and the result is exact.

use fpid_core::{Descriptor, DescriptorMetric};
use crate::types::TopTwo;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug)]
enum KdNode {
    Leaf { start: usize, end: usize },
    Split { dim: usize, value: f32, left: usize, right: usize },
}

#[derive(Debug)]
pub(crate) struct KdTree<'a> {
    points: &'a [Descriptor],
    /// Point indices, permuted so every leaf owns a contiguous range
    order: Vec<usize>,
    nodes: Vec<KdNode>,
    root: usize,
}

/// Pending subtree ordered by smallest lower bound first
#[derive(Debug, PartialEq)]
struct Branch {
    bound: f32,
    node: usize,
}

impl Eq for Branch {}

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

impl<'a> KdTree<'a> {
    pub(crate) fn build(points: &'a [Descriptor], leaf_size: usize) -> Self {
        let mut tree = Self {
            points,
            order: (0..points.len()).collect(),
            nodes: Vec::new(),
            root: 0,
        };
        tree.root = tree.build_node(0, points.len(), leaf_size.max(1));
        tree
    }

    fn build_node(&mut self, start: usize, end: usize, leaf_size: usize) -> usize {
        if end - start <= leaf_size {
            return self.push(KdNode::Leaf { start, end });
        }

        let Some(dim) = self.widest_dimension(start, end) else {
            return self.push(KdNode::Leaf { start, end });
        };

        let points = self.points;
        self.order[start..end].sort_by(|&a, &b| points[a][dim].total_cmp(&points[b][dim]).then(a.cmp(&b)));
        let mid = start + (end - start) / 2;
        let value = points[self.order[mid]][dim];

        let left = self.build_node(start, mid, leaf_size);
        let right = self.build_node(mid, end, leaf_size);
        self.push(KdNode::Split { dim, value, left, right })
    }

    /// Dimension with the largest variance over `order[start..end]`, `None` if all points coincide
    fn widest_dimension(&self, start: usize, end: usize) -> Option<usize> {
        let dims = self.points[self.order[start]].len();
        let n = (end - start) as f32;
        let mut best: Option<(usize, f32)> = None;

        for dim in 0..dims {
            let mean = self.order[start..end].iter().map(|&i| self.points[i][dim]).sum::<f32>() / n;
            let var = self.order[start..end]
                .iter()
                .map(|&i| {
                    let d = self.points[i][dim] - mean;
                    d * d
                })
                .sum::<f32>();
            if var > 0.0 && best.is_none_or(|(_, v)| var > v) {
                best = Some((dim, var));
            }
        }
        best.map(|(dim, _)| dim)
    }

    fn push(&mut self, node: KdNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Two nearest points to `query`
    pub(crate) fn nearest_two(&self, query: &[f32], metric: DescriptorMetric, max_checks: usize) -> TopTwo {
        let mut top = TopTwo::new();
        if self.points.is_empty() {
            return top;
        }

        let mut heap = BinaryHeap::new();
        heap.push(Branch { bound: 0.0, node: self.root });
        let mut checks = 0usize;

        while let Some(Branch { bound, node }) = heap.pop() {
            if bound >= top.worst() {
                break;
            }
            if max_checks > 0 && checks >= max_checks && top.second.is_some() {
                break;
            }

            // Descend to a leaf, queueing the far side of every split on the way
            let mut current = node;
            loop {
                match self.nodes[current] {
                    KdNode::Split { dim, value, left, right } => {
                        let diff = query[dim] - value;
                        let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };
                        heap.push(Branch {
                            bound: bound.max(diff.abs()),
                            node: far,
                        });
                        current = near;
                    }
                    KdNode::Leaf { start, end } => {
                        for &idx in &self.order[start..end] {
                            top.offer(idx, metric.distance(query, &self.points[idx]));
                            checks += 1;
                        }
                        break;
                    }
                }
            }
        }

        top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_points(n: usize) -> Vec<Descriptor> {
        (0..n)
            .map(|i| vec![(i % 7) as f32, (i / 7) as f32, ((i * 3) % 5) as f32])
            .collect()
    }

    #[test]
    fn test_exact_search_matches_scan() {
        let points = grid_points(60);
        let tree = KdTree::build(&points, 4);
        let query = [2.2, 3.9, 1.1];

        let top = tree.nearest_two(&query, DescriptorMetric::Euclidean, 0);
        let mut dists: Vec<f32> = points
            .iter()
            .map(|p| DescriptorMetric::Euclidean.distance(&query, p))
            .collect();
        dists.sort_by(f32::total_cmp);

        assert_eq!(top.first.unwrap().distance, dists[0]);
        assert_eq!(top.second.unwrap().distance, dists[1]);
    }

    #[test]
    fn test_duplicate_points_become_leaf() {
        let points = vec![vec![1.0, 1.0]; 20];
        let tree = KdTree::build(&points, 2);
        assert_eq!(tree.nodes.len(), 1);
        let top = tree.nearest_two(&[0.0, 0.0], DescriptorMetric::Manhattan, 0);
        assert_eq!(top.first.unwrap().distance, 2.0);
        assert_eq!(top.second.unwrap().distance, 2.0);
    }

    #[test]
    fn test_bounded_checks_still_return_two() {
        let points = grid_points(200);
        let tree = KdTree::build(&points, 2);
        let top = tree.nearest_two(&[0.0, 0.0, 0.0], DescriptorMetric::Euclidean, 1);
        assert!(top.first.is_some() && top.second.is_some());
    }

    #[test]
    fn test_build_is_deterministic() {
        let points = grid_points(100);
        let a = KdTree::build(&points, 3);
        let b = KdTree::build(&points, 3);
        assert_eq!(a.order, b.order);
    }
}
