// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Kd-tree: a midpoint-split kd-tree over D-dimensional point sets.
//!
//! This crate is the spatial substrate for multi-tree pruning algorithms.
//!
//! - Build a tree once from a [`PointSet`] and an optional per-point payload.
//! - Every node owns a contiguous range of the permuted points and a tight [`Bound`].
//! - A user [`Statistic`] is computed bottom-up for every node during the build.
//! - [`Bound`] answers the minimum and maximum squared distance between two
//!   nodes, or between a node and a point.
//!
//! Nodes split on their widest dimension at the midpoint of that dimension.
//! A node becomes a leaf when it holds at most `leaf_size` points, or when all
//! of its points coincide.
//!
//! # Example
//!
//! ```rust
//! use canopy_kdtree::{KdTree, PointSet};
//!
//! let points = PointSet::from_rows(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0]]).unwrap();
//! let tree: KdTree<()> = KdTree::build(points, 1).unwrap();
//!
//! let root = tree.node(tree.root());
//! assert_eq!(root.count(), 4);
//! let [left, right] = root.children().unwrap();
//! let (left, right) = (tree.node(left), tree.node(right));
//!
//! // Lower and upper bounds on the squared distance between any two points.
//! let d = left.bound().distance_sq_range(right.bound());
//! assert!(d.lo <= d.hi);
//!
//! // Positions in tree order map back to the caller's order.
//! assert_eq!(tree.old_from_new().len(), 4);
//! ```
//!
//! ## Statistics
//!
//! A [`Statistic`] summarizes the points and payload under a node. Leaves are
//! computed from their point range; internal nodes merge their two children.
//! Trees that need no statistic use `()`.
//!
//! ## Float semantics
//!
//! Coordinates are validated finite on construction. Interval arithmetic on
//! [`Interval`] saturates at infinity and treats `0 * inf` as `0`.
//!
//! ## Features
//!
//! - `std` (enabled by default): forwarded to Kurbo when `kurbo` is enabled.
//! - `libm`: forwarded to Kurbo for `no_std` builds.
//! - `kurbo`: conversions between [`Bound`] and `kurbo::Rect`, and
//!   `PointSet::from_kurbo_points`.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod error;
mod points;
mod tree;
pub mod types;

pub use error::TreeError;
pub use points::PointSet;
pub use tree::{DEFAULT_LEAF_SIZE, KdTree, Node, NodeId, Statistic};
pub use types::{Bound, Interval, distance_sq};
