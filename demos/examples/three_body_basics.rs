// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axilrod-Teller three-body potentials.
//!
//! Sum the potential at every point of a random cloud under a relative
//! tolerance and report how far each point lands from the exhaustive sum.
//!
//! Run:
//! - `cargo run -p canopy_demos --example three_body_basics`

use canopy_dualtree::{PointSet, ThreeBody, ThreeBodyConfig, Tolerance, naive};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() {
    let mut rng = StdRng::seed_from_u64(7);
    let coords = (0..150 * 3).map(|_| rng.random::<f64>() * 20.0).collect();
    let points = PointSet::new(3, coords).unwrap();

    let config = ThreeBodyConfig::new(1.0)
        .with_tolerance(Tolerance::relative(0.05))
        .with_leaf_size(8);
    let tb = ThreeBody::new(points.clone(), config).unwrap();
    let est = tb.potentials();
    let exact = naive::three_body(&points, 1.0);

    let worst = exact
        .iter()
        .enumerate()
        .map(|(i, p)| (est.values[i] - p.value).abs() / p.magnitude())
        .fold(0.0, f64::max);
    println!(
        "{} points, {} triples per point, {:.1}% pruned",
        est.len(),
        est.combinations,
        100.0 * est.pruned_fraction()
    );
    println!("worst error relative to |P| + |N|: {worst:.2e}");
    println!("traversal: {:?}", est.stats);
    for i in 0..5 {
        println!(
            "point {i}: {:.6e} (exact {:.6e}, used error {:.2e})",
            est.values[i], exact[i].value, est.used_error[i]
        );
    }
}
