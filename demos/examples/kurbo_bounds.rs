// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Kurbo interop: build a tree from `kurbo::Point`s and list leaf rectangles.
//!
//! Run:
//! - `cargo run -p canopy_demos --example kurbo_bounds`

use canopy_kdtree::{Bound, KdTree, PointSet};
use kurbo::{Point, Rect};

fn main() {
    let pts: Vec<Point> = (0..40)
        .map(|i| {
            let t = f64::from(i) * 0.3;
            Point::new(t.cos() * (10.0 + t), t.sin() * (10.0 + t))
        })
        .collect();
    let points = PointSet::from_kurbo_points(&pts).unwrap();
    let tree: KdTree<()> = KdTree::build(points, 6).unwrap();

    let viewport = Bound::from(Rect::new(-5.0, -5.0, 15.0, 15.0));
    for id in tree.leaves() {
        let leaf = tree.node(id);
        let Some(rect) = leaf.bound().to_rect() else {
            continue;
        };
        let visible = viewport.min_distance_sq(leaf.bound()) == 0.0;
        println!(
            "leaf {:?}: {} points in {:?}{}",
            id,
            leaf.count(),
            rect,
            if visible { " (touches viewport)" } else { "" }
        );
    }
}
