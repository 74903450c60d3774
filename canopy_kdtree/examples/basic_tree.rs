// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic usage of Canopy Kdtree: build a tree with a custom statistic, walk
//! its leaves, and map tree order back to input order.

use canopy_kdtree::{Bound, KdTree, PointSet, Statistic};
use core::ops::Range;

/// Sum of the payload values below a node.
#[derive(Debug)]
struct Mass(f64);

impl Statistic<f64> for Mass {
    fn from_leaf(_: &PointSet, payload: &[f64], range: Range<usize>, _: &Bound) -> Self {
        Self(payload[range].iter().sum())
    }

    fn merge(left: &Self, right: &Self, _: &Bound, _: usize) -> Self {
        Self(left.0 + right.0)
    }
}

fn main() {
    let rows: Vec<[f64; 2]> = (0..64)
        .map(|i| {
            let t = f64::from(i);
            [(t * 0.37).sin() * 10.0, (t * 0.11).cos() * 4.0]
        })
        .collect();
    let masses: Vec<f64> = (0..64).map(|i| 1.0 + f64::from(i % 3)).collect();
    let points = PointSet::from_rows(&rows).unwrap();

    let tree: KdTree<Mass, f64> = KdTree::build_with_payload(points, masses, 8).unwrap();
    let root = tree.node(tree.root());
    println!(
        "{} points, {} nodes, {} leaves, depth {}, total mass {}",
        tree.len(),
        tree.num_nodes(),
        tree.num_leaves(),
        tree.depth(),
        root.stat().0
    );

    for id in tree.leaves() {
        let leaf = tree.node(id);
        println!(
            "leaf {:?}: points {:?}, mass {}, bound {:?}",
            id,
            leaf.range(),
            leaf.stat().0,
            leaf.bound()
        );
    }

    // Input index of the first point stored in tree order.
    println!("tree point 0 was input point {}", tree.old_from_new()[0]);
}
