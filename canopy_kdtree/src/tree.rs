// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Midpoint-split kd-tree stored in an arena.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::ops::Range;

use crate::error::TreeError;
use crate::points::PointSet;
use crate::types::Bound;

/// Default maximum number of points in a leaf.
pub const DEFAULT_LEAF_SIZE: usize = 20;

/// Stable index of a node in a [`KdTree`] arena.
///
/// Ids are assigned in postorder: both children of a node have smaller ids
/// than the node itself, and the root has the largest id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    const fn new(i: usize) -> Self {
        Self(i)
    }

    /// Arena index of the node.
    pub const fn get(self) -> usize {
        self.0
    }
}

/// Per-node aggregate computed bottom-up while the tree is built.
///
/// Leaves summarize their own points and payload; internal nodes combine the
/// statistics of their two children. The unit type is the statistic of trees
/// that need none.
pub trait Statistic<P>: Sized {
    /// Statistic of a leaf owning `range` of the (already permuted) points.
    fn from_leaf(points: &PointSet, payload: &[P], range: Range<usize>, bound: &Bound) -> Self;

    /// Statistic of an internal node from its children.
    fn merge(left: &Self, right: &Self, bound: &Bound, count: usize) -> Self;
}

impl<P> Statistic<P> for () {
    fn from_leaf(_: &PointSet, _: &[P], _: Range<usize>, _: &Bound) -> Self {}

    fn merge(_: &Self, _: &Self, _: &Bound, _: usize) -> Self {}
}

/// A tree node: a contiguous range of points and their tight bound.
#[derive(Clone, Debug)]
pub struct Node<S> {
    bound: Bound,
    begin: usize,
    count: usize,
    children: Option<[NodeId; 2]>,
    stat: S,
}

impl<S> Node<S> {
    /// Bound containing every point of the node.
    pub fn bound(&self) -> &Bound {
        &self.bound
    }

    /// Index of the first point.
    pub fn begin(&self) -> usize {
        self.begin
    }

    /// One past the index of the last point.
    pub fn end(&self) -> usize {
        self.begin + self.count
    }

    /// Number of points.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Point index range.
    pub fn range(&self) -> Range<usize> {
        self.begin..self.end()
    }

    /// Left and right children, absent for leaves.
    pub fn children(&self) -> Option<[NodeId; 2]> {
        self.children
    }

    /// Whether the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// The build-time statistic.
    pub fn stat(&self) -> &S {
        &self.stat
    }
}

/// A kd-tree over an owned, permuted [`PointSet`] with one payload entry per point.
///
/// Construction permutes the points (and payload) so that every node owns a
/// contiguous range. [`KdTree::old_from_new`] maps tree order back to the
/// caller's order. The topology is immutable once built, so a tree can be
/// shared by any number of traversals.
pub struct KdTree<S, P = ()> {
    points: PointSet,
    payload: Vec<P>,
    old_from_new: Vec<usize>,
    nodes: Vec<Node<S>>,
    root: NodeId,
    leaf_size: usize,
}

impl<S: Statistic<()>> KdTree<S, ()> {
    /// Build a tree with no per-point payload.
    pub fn build(points: PointSet, leaf_size: usize) -> Result<Self, TreeError> {
        let n = points.len();
        let mut payload = Vec::with_capacity(n);
        payload.resize(n, ());
        Self::build_with_payload(points, payload, leaf_size)
    }
}

impl<S: Statistic<P>, P> KdTree<S, P> {
    /// Build a tree; `payload[i]` travels with point `i` through partitioning.
    pub fn build_with_payload(
        points: PointSet,
        payload: Vec<P>,
        leaf_size: usize,
    ) -> Result<Self, TreeError> {
        if leaf_size == 0 {
            return Err(TreeError::InvalidLeafSize(leaf_size));
        }
        if points.is_empty() {
            return Err(TreeError::EmptyInput);
        }
        if payload.len() != points.len() {
            return Err(TreeError::PayloadLength {
                points: points.len(),
                payload: payload.len(),
            });
        }
        let n = points.len();
        let mut builder = Builder {
            points,
            payload,
            old_from_new: (0..n).collect(),
            nodes: Vec::with_capacity(2 * n.div_ceil(leaf_size)),
            leaf_size,
        };
        let root_bound = builder.points.bound_of(0, n);
        let root = builder.build_node(root_bound, 0, n);

        let tree = Self {
            points: builder.points,
            payload: builder.payload,
            old_from_new: builder.old_from_new,
            nodes: builder.nodes,
            root,
            leaf_size,
        };
        log::debug!(
            "kd-tree built: {} points, {} nodes, {} leaves, depth {}, largest leaf {}",
            n,
            tree.nodes.len(),
            tree.num_leaves(),
            tree.depth(),
            tree.largest_leaf(),
        );
        Ok(tree)
    }
}

impl<S, P> KdTree<S, P> {
    /// Id of the root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> &Node<S> {
        &self.nodes[id.get()]
    }

    /// Total number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves.
    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Ids of all leaves in left-to-right order.
    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        // Postorder ids with contiguous ranges: leaves appear left to right.
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_leaf())
            .map(|(i, _)| NodeId::new(i))
    }

    /// Length of the longest root-to-leaf path in edges; a single leaf has depth 0.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut stack = alloc::vec![(self.root, 0_usize)];
        while let Some((id, d)) = stack.pop() {
            depth = depth.max(d);
            if let Some([l, r]) = self.node(id).children {
                stack.push((l, d + 1));
                stack.push((r, d + 1));
            }
        }
        depth
    }

    /// Point count of the largest leaf.
    pub fn largest_leaf(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.count)
            .max()
            .unwrap_or(0)
    }

    /// The permuted points in tree order.
    pub fn points(&self) -> &PointSet {
        &self.points
    }

    /// The permuted payload in tree order.
    pub fn payload(&self) -> &[P] {
        &self.payload
    }

    /// Original index of the point stored at each tree position.
    pub fn old_from_new(&self) -> &[usize] {
        &self.old_from_new
    }

    /// Tree position of each original point.
    pub fn new_from_old(&self) -> Vec<usize> {
        let mut out = alloc::vec![0; self.old_from_new.len()];
        for (new, &old) in self.old_from_new.iter().enumerate() {
            out[old] = new;
        }
        out
    }

    /// Leaf size threshold the tree was built with.
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Dimension of the points.
    pub fn dim(&self) -> usize {
        self.points.dim()
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a built tree.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl<S, P> Debug for KdTree<S, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KdTree")
            .field("points", &self.points.len())
            .field("dim", &self.points.dim())
            .field("leaf_size", &self.leaf_size)
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

struct Builder<S, P> {
    points: PointSet,
    payload: Vec<P>,
    old_from_new: Vec<usize>,
    nodes: Vec<Node<S>>,
    leaf_size: usize,
}

impl<S: Statistic<P>, P> Builder<S, P> {
    /// The only place points move: coordinates, payload and index map together.
    fn swap_points(&mut self, i: usize, j: usize) {
        self.points.swap_rows(i, j);
        self.payload.swap(i, j);
        self.old_from_new.swap(i, j);
    }

    /// Build the subtree owning `begin..begin + count` with the given tight
    /// bound. Children are pushed before their parent.
    fn build_node(&mut self, bound: Bound, begin: usize, count: usize) -> NodeId {
        let split = if count > self.leaf_size {
            match bound.widest_dim() {
                Some((dim, width)) if width > 0.0 => Some((dim, split_value(&bound, dim))),
                _ => {
                    log::trace!("forcing leaf of {count} coincident points at {begin}");
                    None
                }
            }
        } else {
            None
        };

        let (children, stat) = match split {
            Some((dim, value)) => {
                let d = self.points.dim();
                let mut left_bound = Bound::empty(d);
                let mut right_bound = Bound::empty(d);
                let mid = self.partition(dim, value, begin, count, &mut left_bound, &mut right_bound);
                assert!(
                    mid > begin && mid < begin + count,
                    "partition of {count} points at {begin} on dim {dim} at {value} left one side empty"
                );
                let left = self.build_node(left_bound, begin, mid - begin);
                let right = self.build_node(right_bound, mid, begin + count - mid);
                let stat = S::merge(
                    &self.nodes[left.get()].stat,
                    &self.nodes[right.get()].stat,
                    &bound,
                    count,
                );
                (Some([left, right]), stat)
            }
            None => {
                let stat = S::from_leaf(&self.points, &self.payload, begin..begin + count, &bound);
                (None, stat)
            }
        };

        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node {
            bound,
            begin,
            count,
            children,
            stat,
        });
        id
    }

    /// Two-cursor in-place partition of `begin..begin + count` around `value` on
    /// `dim`. Points strictly below go left. Both child bounds are grown as the
    /// cursors pass points. Returns the first index of the right side.
    fn partition(
        &mut self,
        dim: usize,
        value: f64,
        begin: usize,
        count: usize,
        left_bound: &mut Bound,
        right_bound: &mut Bound,
    ) -> usize {
        let mut lo = begin;
        // Exclusive: `hi - 1` is the next candidate from the right.
        let mut hi = begin + count;
        loop {
            while lo < hi && self.points.coord(lo, dim) < value {
                *left_bound |= self.points.point(lo);
                lo += 1;
            }
            while lo < hi && self.points.coord(hi - 1, dim) >= value {
                *right_bound |= self.points.point(hi - 1);
                hi -= 1;
            }
            if lo >= hi {
                break;
            }
            // `lo` belongs right and `hi - 1` belongs left.
            self.swap_points(lo, hi - 1);
            *left_bound |= self.points.point(lo);
            *right_bound |= self.points.point(hi - 1);
            lo += 1;
            hi -= 1;
        }
        lo
    }
}

/// Midpoint of `dim`, nudged to the upper end if rounding collapsed it onto
/// the lower end. Keeps `lo < split <= hi` so both sides are non-empty.
fn split_value(bound: &Bound, dim: usize) -> f64 {
    let iv = bound.get(dim);
    let mid = iv.mid();
    if mid > iv.lo { mid } else { iv.hi }
}
