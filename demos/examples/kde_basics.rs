// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Kernel density estimation basics.
//!
//! Estimate the density of a two-cluster sample at a few probe points, then
//! compare a tolerance sweep against the exhaustive sum.
//!
//! Run:
//! - `cargo run -p canopy_demos --example kde_basics`

use canopy_dualtree::{Kde, KdeConfig, Kernel, PointSet, Tolerance, naive};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut rows = Vec::with_capacity(4000);
    for i in 0..4000 {
        let (cx, cy) = if i % 2 == 0 { (-2.0, 0.0) } else { (2.0, 1.0) };
        let dx: f64 = (0..4).map(|_| rng.random_range(-0.5..0.5)).sum();
        let dy: f64 = (0..4).map(|_| rng.random_range(-0.5..0.5)).sum();
        rows.push([cx + dx, cy + dy]);
    }
    let sample = PointSet::from_rows(&rows).unwrap();
    let probes = PointSet::from_rows(&[[-2.0, 0.0], [0.0, 0.5], [2.0, 1.0], [6.0, 6.0]]).unwrap();

    let config = KdeConfig::new(0.3).with_tolerance(Tolerance::new(1e-6, 0.01));
    let kde = Kde::new(sample.clone(), config).unwrap();
    let est = kde.estimate(probes.clone()).unwrap();
    for (i, p) in probes.iter().enumerate() {
        println!(
            "density at {:?}: {:.6} (within [{:.6}, {:.6}])",
            p, est.values[i], est.bounds[i].lo, est.bounds[i].hi
        );
    }

    // Tolerance sweep over the whole sample.
    let exact = naive::kde(&sample, None, &sample, Kernel::Epanechnikov, 0.3).unwrap();
    for rel in [0.0, 0.01, 0.1, 0.5] {
        let config = KdeConfig::new(0.3)
            .with_kernel(Kernel::Epanechnikov)
            .with_tolerance(Tolerance::relative(rel));
        let est = Kde::new(sample.clone(), config).unwrap().estimate_reference();
        println!(
            "relative {rel:>4}: max error {:.2e}, pruned {:5.1}%, {} prunes, {} base cases",
            naive::max_relative_error(&est.values, &exact),
            100.0 * est.pruned_fraction(),
            est.stats.prunes,
            est.stats.base_cases,
        );
    }
}
