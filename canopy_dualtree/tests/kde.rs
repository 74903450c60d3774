// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Kernel density estimates checked against exhaustive sums.

use approx::assert_relative_eq;
use canopy_dualtree::{Error, Estimates, Kde, KdeConfig, Kernel, PointSet, Tolerance, naive};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn uniform(rng: &mut StdRng, n: usize, dim: usize) -> PointSet {
    let coords = (0..n * dim).map(|_| rng.random::<f64>()).collect();
    PointSet::new(dim, coords).unwrap()
}

/// Tight clusters around a few random centers.
fn clustered(rng: &mut StdRng, n: usize, dim: usize, clusters: usize) -> PointSet {
    let centers: Vec<f64> = (0..clusters * dim)
        .map(|_| rng.random_range(0.0..10.0))
        .collect();
    let mut coords = Vec::with_capacity(n * dim);
    for i in 0..n {
        let c = i % clusters;
        for d in 0..dim {
            let jitter: f64 = (0..3).map(|_| rng.random_range(-0.1..0.1)).sum();
            coords.push(centers[c * dim + d] + jitter);
        }
    }
    PointSet::new(dim, coords).unwrap()
}

/// `|estimate - exact| <= absolute + relative * exact` and the bounds hold the
/// exact value.
fn assert_within(est: &Estimates, exact: &[f64], tolerance: Tolerance) {
    assert_eq!(est.len(), exact.len());
    for (i, &e) in exact.iter().enumerate() {
        let slack = 1e-9 * (1.0 + e);
        let allowed = tolerance.absolute + tolerance.relative * e + slack;
        let err = (est.values[i] - e).abs();
        assert!(err <= allowed, "point {i}: error {err} exceeds {allowed}");
        let b = est.bounds[i];
        assert!(
            b.lo - slack <= e && e <= b.hi + slack,
            "point {i}: {e} outside [{}, {}]",
            b.lo,
            b.hi
        );
        assert!(
            est.used_error[i] <= allowed,
            "point {i}: reported error {} exceeds {allowed}",
            est.used_error[i]
        );
    }
    assert!(est.is_fully_accounted());
}

#[test]
fn monochromatic_gaussian_in_three_dimensions() {
    let mut rng = StdRng::seed_from_u64(1);
    let points = uniform(&mut rng, 200, 3);
    let tolerance = Tolerance::relative(0.01);
    let config = KdeConfig::new(0.5)
        .with_tolerance(tolerance)
        .with_leaf_size(8);
    let kde = Kde::new(points.clone(), config).unwrap();
    let est = kde.estimate_reference();
    let exact = naive::kde(&points, None, &points, Kernel::Gaussian, 0.5).unwrap();
    assert_within(&est, &exact, tolerance);
    assert_eq!(est.combinations, 200);
}

#[test]
fn bichromatic_gaussian_in_five_dimensions() {
    let mut rng = StdRng::seed_from_u64(2);
    let references = uniform(&mut rng, 5000, 5);
    let queries = uniform(&mut rng, 300, 5);
    let tolerance = Tolerance::relative(0.05);
    let config = KdeConfig::new(0.3).with_tolerance(tolerance);
    let kde = Kde::new(references.clone(), config).unwrap();
    let est = kde.estimate(queries.clone()).unwrap();
    let exact = naive::kde(&references, None, &queries, Kernel::Gaussian, 0.3).unwrap();
    assert_within(&est, &exact, tolerance);
    assert!(naive::max_relative_error(&est.values, &exact) <= 0.05 + 1e-9);
}

#[test]
fn epanechnikov_with_absolute_tolerance() {
    let mut rng = StdRng::seed_from_u64(3);
    let references = clustered(&mut rng, 600, 2, 4);
    let queries = uniform(&mut rng, 100, 2);
    let tolerance = Tolerance::absolute(1e-3);
    let config = KdeConfig::new(1.5)
        .with_kernel(Kernel::Epanechnikov)
        .with_tolerance(tolerance)
        .with_leaf_size(10);
    let kde = Kde::new(references.clone(), config).unwrap();
    let est = kde.estimate(queries.clone()).unwrap();
    let exact = naive::kde(&references, None, &queries, Kernel::Epanechnikov, 1.5).unwrap();
    assert_within(&est, &exact, tolerance);
    assert!(naive::max_absolute_error(&est.values, &exact) <= 1e-3 + 1e-9);
}

#[test]
fn weighted_references_match_the_weighted_sum() {
    let mut rng = StdRng::seed_from_u64(4);
    let references = uniform(&mut rng, 300, 2);
    let weights: Vec<f64> = (0..300).map(|_| rng.random_range(0.0..2.0)).collect();
    let queries = uniform(&mut rng, 50, 2);
    let tolerance = Tolerance::new(1e-4, 0.01);
    let config = KdeConfig::new(0.2).with_tolerance(tolerance);
    let exact = naive::kde(
        &references,
        Some(weights.as_slice()),
        &queries,
        Kernel::Gaussian,
        0.2,
    )
    .unwrap();
    let kde = Kde::with_weights(references, weights, config).unwrap();
    let est = kde.estimate(queries).unwrap();
    assert_within(&est, &exact, tolerance);
}

#[test]
fn zero_tolerance_is_exact() {
    let mut rng = StdRng::seed_from_u64(5);
    let points = clustered(&mut rng, 400, 3, 5);
    let config = KdeConfig::new(0.4)
        .with_tolerance(Tolerance::EXACT)
        .with_leaf_size(6);
    let kde = Kde::new(points.clone(), config).unwrap();
    let est = kde.estimate_reference();
    let exact = naive::kde(&points, None, &points, Kernel::Gaussian, 0.4).unwrap();
    assert!(naive::max_relative_error(&est.values, &exact) <= 1e-10);
    assert!(est.is_fully_accounted());
}

#[test]
fn far_clusters_are_pruned_under_a_loose_budget() {
    let mut rng = StdRng::seed_from_u64(6);
    let points = clustered(&mut rng, 2000, 2, 8);
    let tolerance = Tolerance::relative(0.5);
    let config = KdeConfig::new(0.1)
        .with_kernel(Kernel::Epanechnikov)
        .with_tolerance(tolerance);
    let kde = Kde::new(points.clone(), config).unwrap();
    let est = kde.estimate_reference();
    assert!(est.stats.prunes > 0);
    assert!(est.pruned_fraction() > 0.5, "{}", est.pruned_fraction());
    let exact = naive::kde(&points, None, &points, Kernel::Epanechnikov, 0.1).unwrap();
    assert_within(&est, &exact, tolerance);
}

#[test]
fn runs_are_deterministic() {
    let mut rng = StdRng::seed_from_u64(7);
    let points = uniform(&mut rng, 500, 3);
    let config = KdeConfig::new(0.25).with_tolerance(Tolerance::relative(0.05));
    let a = Kde::new(points.clone(), config).unwrap().estimate_reference();
    let b = Kde::new(points, config).unwrap().estimate_reference();
    assert_eq!(a.values, b.values);
    assert_eq!(a.used_error, b.used_error);
    assert_eq!(a.stats, b.stats);
}

#[test]
fn identical_points_share_one_leaf() {
    let rows = vec![[1.0, 1.0]; 50];
    let points = PointSet::from_rows(&rows).unwrap();
    let config = KdeConfig::new(1.0).with_leaf_size(4);
    let kde = Kde::new(points, config).unwrap();
    assert_eq!(kde.reference().num_nodes(), 1);
    let est = kde.estimate_reference();
    let peak = 1.0 / Kernel::Gaussian.normalization(2, 1.0);
    for &v in &est.values {
        assert_relative_eq!(v, peak, max_relative = 1e-12);
    }
}

#[test]
fn rejects_bad_input() {
    let points = PointSet::from_rows(&[[0.0, 0.0], [1.0, 1.0]]).unwrap();
    let config = KdeConfig::new(1.0);
    assert_eq!(
        Kde::new(points.clone(), KdeConfig::new(0.0)).unwrap_err(),
        Error::InvalidBandwidth(0.0)
    );
    assert_eq!(
        Kde::with_weights(points.clone(), vec![1.0, -1.0], config).unwrap_err(),
        Error::InvalidWeight {
            index: 1,
            weight: -1.0
        }
    );
    assert_eq!(
        Kde::with_weights(points.clone(), vec![0.0, 0.0], config).unwrap_err(),
        Error::ZeroTotalWeight
    );
    let kde = Kde::new(points, config).unwrap();
    let queries = PointSet::from_rows(&[[0.0, 0.0, 0.0]]).unwrap();
    assert_eq!(
        kde.estimate(queries).unwrap_err(),
        Error::DimensionMismatch {
            query: 3,
            reference: 2
        }
    );
}
