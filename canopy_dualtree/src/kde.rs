// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dual-tree kernel density estimation.
//!
//! The density at a query point `q` is
//! `f(q) = (1 / (W * C_h)) * Σ_r w_r * k(|q - r|²)`, where `W` is the total
//! reference weight and `C_h` the kernel normalization. Work is carried out in
//! unnormalized units (`Σ_r w_r * k`) and divided by `W * C_h` on output.
//!
//! Every point carries bounds on its *eventual* sum: they start at
//! `[0, W]` (every reference contributing nothing, or everything at
//! `k(0) = 1`) and only tighten as reference groups are committed or
//! evaluated exactly.
//!
//! The estimate satisfies `|f̂(q) - f(q)| <= absolute + relative * f(q)` for
//! every query point.

use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use canopy_kdtree::{Bound, Interval, KdTree, Node, PointSet, Statistic, distance_sq};

use crate::config::KdeConfig;
use crate::engine::{Positions, Problem, StateOf, Traversal};
use crate::error::Error;
use crate::estimates::{Estimates, Row};

/// Total reference weight below a node.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MassStat {
    /// Sum of the weights of the node's points.
    pub weight: f64,
}

impl Statistic<f64> for MassStat {
    fn from_leaf(_: &PointSet, weights: &[f64], range: Range<usize>, _: &Bound) -> Self {
        Self {
            weight: weights[range].iter().sum(),
        }
    }

    fn merge(left: &Self, right: &Self, _: &Bound, _: usize) -> Self {
        Self {
            weight: left.weight + right.weight,
        }
    }
}

/// Bound on the contribution of a reference node to each point of a query node.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KdeDelta {
    /// `W_R * k(max distance²)`.
    pub lower: f64,
    /// `W_R * k(min distance²)`.
    pub upper: f64,
    /// Reference weight `W_R`.
    pub mass: f64,
    /// Number of reference points.
    pub count: u64,
}

impl KdeDelta {
    /// Largest error of the midpoint estimate.
    pub fn error(&self) -> f64 {
        0.5 * (self.upper - self.lower)
    }
}

/// Committed reference groups not yet pushed to the points.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct KdePostponed {
    /// Sum of committed lower bounds.
    pub lower: f64,
    /// Sum of committed upper bounds.
    pub upper: f64,
    /// Sum of committed reference weights.
    pub mass: f64,
    /// Sum of committed midpoint estimates.
    pub estimate: f64,
    /// Number of committed reference points.
    pub pruned: u64,
    /// Sum of committed errors.
    pub used_error: f64,
}

/// Bounds over all points below a query node.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KdeSummary {
    /// Union of the points' eventual bounds.
    pub bounds: Interval,
    /// Smallest number of references accounted for at any point.
    pub accounted_min: u64,
    /// Largest error used at any point.
    pub used_max: f64,
}

/// Running result of one query point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KdePoint {
    /// Bounds on the eventual unnormalized sum.
    pub bounds: Interval,
    /// Unnormalized estimate.
    pub estimate: f64,
    /// References accounted for by committed groups.
    pub pruned: u64,
    /// References evaluated exactly.
    pub exact: u64,
    /// Error used, in unnormalized units.
    pub used_error: f64,
}

impl KdePoint {
    /// Shift the eventual bounds by a committed `lower..upper` out of `mass`.
    fn commit(&mut self, lower: f64, upper: f64, mass: f64) {
        self.bounds = shifted(self.bounds, lower, upper - mass);
    }
}

/// `bounds` moved up by `lo` at the bottom and by `hi` at the top, kept
/// non-empty under rounding.
fn shifted(bounds: Interval, lo: f64, hi: f64) -> Interval {
    let lo = bounds.lo + lo;
    let hi = bounds.hi + hi;
    Interval::new(lo, hi.max(lo))
}

/// A weighted reference set ready for density queries.
///
/// The reference tree is built once and reused by every query.
///
/// ```
/// use canopy_dualtree::{Kde, KdeConfig, PointSet, Tolerance};
///
/// let refs = PointSet::from_rows(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [4.0, 4.0]]).unwrap();
/// let kde = Kde::new(refs, KdeConfig::new(0.5).with_tolerance(Tolerance::relative(0.01))).unwrap();
///
/// let queries = PointSet::from_rows(&[[0.5, 0.5], [10.0, 10.0]]).unwrap();
/// let est = kde.estimate(queries).unwrap();
/// assert!(est.values[0] > est.values[1]);
/// ```
pub struct Kde {
    config: KdeConfig,
    reference: KdTree<MassStat, f64>,
    total_weight: f64,
    norm: f64,
    inv_bandwidth_sq: f64,
}

impl core::fmt::Debug for Kde {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Kde")
            .field("config", &self.config)
            .field("reference", &self.reference)
            .field("total_weight", &self.total_weight)
            .finish_non_exhaustive()
    }
}

impl Kde {
    /// Unit-weight reference set.
    pub fn new(reference: PointSet, config: KdeConfig) -> Result<Self, Error> {
        let weights = vec![1.0; reference.len()];
        Self::with_weights(reference, weights, config)
    }

    /// Reference set with one non-negative weight per point.
    pub fn with_weights(
        reference: PointSet,
        weights: Vec<f64>,
        config: KdeConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        if let Some((index, &weight)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !(w.is_finite() && **w >= 0.0))
        {
            return Err(Error::InvalidWeight { index, weight });
        }
        let dim = reference.dim();
        let reference: KdTree<MassStat, f64> =
            KdTree::build_with_payload(reference, weights, config.leaf_size)?;
        let total_weight = reference.node(reference.root()).stat().weight;
        if total_weight <= 0.0 {
            return Err(Error::ZeroTotalWeight);
        }
        let norm = total_weight * config.kernel.normalization(dim, config.bandwidth);
        Ok(Self {
            config,
            reference,
            total_weight,
            norm,
            inv_bandwidth_sq: 1.0 / (config.bandwidth * config.bandwidth),
        })
    }

    /// The configuration.
    pub fn config(&self) -> &KdeConfig {
        &self.config
    }

    /// The reference tree.
    pub fn reference(&self) -> &KdTree<MassStat, f64> {
        &self.reference
    }

    /// Total reference weight `W`.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Factor `W * C_h` turning unnormalized sums into densities.
    pub fn norm(&self) -> f64 {
        self.norm
    }

    /// Densities at `queries`, in their original order.
    pub fn estimate(&self, queries: PointSet) -> Result<Estimates, Error> {
        if queries.dim() != self.reference.dim() {
            return Err(Error::DimensionMismatch {
                query: queries.dim(),
                reference: self.reference.dim(),
            });
        }
        let ones = vec![1.0; queries.len()];
        let queries: KdTree<MassStat, f64> =
            KdTree::build_with_payload(queries, ones, self.config.leaf_size)?;
        Ok(self.run(&queries))
    }

    /// Densities at the reference points themselves, in their original order.
    ///
    /// Each point's own contribution `w * k(0)` is included.
    pub fn estimate_reference(&self) -> Estimates {
        self.run(&self.reference)
    }

    fn run(&self, queries: &KdTree<MassStat, f64>) -> Estimates {
        log::debug!(
            "kde: {} queries against {} references, {:?} kernel, bandwidth {}",
            queries.len(),
            self.reference.len(),
            self.config.kernel,
            self.config.bandwidth,
        );
        let out = Traversal::new(self, [queries, &self.reference]).run();
        let scale = 1.0 / self.norm;
        let rows = out.points.iter().map(|p| Row {
            value: p.estimate * scale,
            bounds: p.bounds.scale(scale),
            pruned: p.pruned,
            exact: p.exact,
            used_error: p.used_error * scale,
        });
        Estimates::from_tree_order(
            rows,
            queries.old_from_new(),
            self.reference.len() as u64,
            out.stats,
        )
    }

    #[inline]
    fn kernel(&self, dist_sq: f64) -> f64 {
        self.config
            .kernel
            .eval_scaled(dist_sq * self.inv_bandwidth_sq)
    }

    /// Rounding allowance when comparing summaries.
    fn slack(&self) -> f64 {
        1e-9 * self.total_weight
    }
}

impl Problem<2> for Kde {
    type Stat = MassStat;
    type Payload = f64;
    type Delta = KdeDelta;
    type Postponed = KdePostponed;
    type Summary = KdeSummary;
    type Point = KdePoint;

    fn receivers(&self) -> Positions {
        Positions::FIRST
    }

    fn initial_point(&self) -> KdePoint {
        KdePoint {
            bounds: Interval::new(0.0, self.total_weight),
            estimate: 0.0,
            pruned: 0,
            exact: 0,
            used_error: 0.0,
        }
    }

    fn zero_postponed(&self) -> KdePostponed {
        KdePostponed::default()
    }

    fn initial_summary(&self) -> KdeSummary {
        KdeSummary {
            bounds: Interval::new(0.0, self.total_weight),
            accounted_min: 0,
            used_max: 0.0,
        }
    }

    fn empty_summary(&self) -> KdeSummary {
        KdeSummary {
            bounds: Interval::EMPTY,
            accounted_min: u64::MAX,
            used_max: f64::NEG_INFINITY,
        }
    }

    fn compute_delta(&self, nodes: &[&Node<MassStat>; 2]) -> KdeDelta {
        let [q, r] = nodes;
        let d = q.bound().distance_sq_range(r.bound());
        let mass = r.stat().weight;
        KdeDelta {
            lower: mass * self.kernel(d.hi),
            upper: mass * self.kernel(d.lo),
            mass,
            count: r.count() as u64,
        }
    }

    fn can_summarize(
        &self,
        _: &[&Node<MassStat>; 2],
        delta: &KdeDelta,
        states: &[Option<&StateOf<Self, 2>>; 2],
    ) -> bool {
        let Some(state) = states[0] else {
            return false;
        };
        let (summary, postponed) = (&state.summary, &state.postponed);
        let accounted = summary.accounted_min + postponed.pruned;
        let remaining = (self.reference.len() as u64).saturating_sub(accounted);
        if remaining == 0 {
            return false;
        }
        let lower = summary.bounds.lo + postponed.lower + delta.lower;
        let tolerance = self.config.tolerance;
        let budget = tolerance.absolute * self.norm + tolerance.relative * lower;
        let used = summary.used_max + postponed.used_error;
        // Spend at most this group's share of what is left of the budget.
        delta.error() * remaining as f64 <= (budget - used) * delta.count as f64
    }

    fn apply_delta(&self, postponed: &mut KdePostponed, delta: &KdeDelta, _: usize) {
        postponed.lower += delta.lower;
        postponed.upper += delta.upper;
        postponed.mass += delta.mass;
        postponed.estimate += 0.5 * (delta.lower + delta.upper);
        postponed.pruned += delta.count;
        postponed.used_error += delta.error();
    }

    fn apply_postponed(&self, into: &mut KdePostponed, from: &KdePostponed) {
        into.lower += from.lower;
        into.upper += from.upper;
        into.mass += from.mass;
        into.estimate += from.estimate;
        into.pruned += from.pruned;
        into.used_error += from.used_error;
    }

    fn base_case(
        &self,
        trees: &[&KdTree<MassStat, f64>; 2],
        nodes: &[&Node<MassStat>; 2],
        points: &mut [KdePoint],
    ) {
        let [queries, refs] = trees;
        let [q, r] = nodes;
        let weights = &refs.payload()[r.range()];
        for qi in q.range() {
            let x = queries.points().point(qi);
            let mut sum = 0.0;
            let mut mass = 0.0;
            for (ri, &w) in r.range().zip(weights) {
                sum += w * self.kernel(distance_sq(x, refs.points().point(ri)));
                mass += w;
            }
            let point = &mut points[qi];
            point.commit(sum, sum, mass);
            point.estimate += sum;
            point.exact += r.count() as u64;
        }
    }

    fn flush(&self, point: &mut KdePoint, postponed: &KdePostponed) {
        point.commit(postponed.lower, postponed.upper, postponed.mass);
        point.estimate += postponed.estimate;
        point.pruned += postponed.pruned;
        point.used_error += postponed.used_error;
    }

    fn summarize(&self, points: &[KdePoint]) -> KdeSummary {
        let mut summary = self.empty_summary();
        for p in points {
            summary.bounds |= p.bounds;
            summary.accounted_min = summary.accounted_min.min(p.pruned + p.exact);
            summary.used_max = summary.used_max.max(p.used_error);
        }
        summary
    }

    fn accumulate(&self, into: &mut KdeSummary, summary: &KdeSummary, postponed: &KdePostponed) {
        into.bounds |= shifted(
            summary.bounds,
            postponed.lower,
            postponed.upper - postponed.mass,
        );
        into.accounted_min = into
            .accounted_min
            .min(summary.accounted_min + postponed.pruned);
        into.used_max = into.used_max.max(summary.used_max + postponed.used_error);
    }

    fn is_tightened(&self, before: &KdeSummary, after: &KdeSummary) -> bool {
        let slack = self.slack();
        after.bounds.lo >= before.bounds.lo - slack
            && after.bounds.hi <= before.bounds.hi + slack
            && after.accounted_min >= before.accounted_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tolerance;
    use crate::kernel::Kernel;
    use crate::naive;
    use approx::assert_relative_eq;
    use num_traits::Float;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn within(estimate: f64, exact: f64, absolute: f64, relative: f64) -> bool {
        Float::abs(estimate - exact)
            <= absolute + relative * exact + 1e-12 * (1.0 + Float::abs(exact))
    }

    fn random_points(n: usize, dim: usize, seed: u64) -> PointSet {
        let mut rng = StdRng::seed_from_u64(seed);
        let coords = (0..n * dim).map(|_| rng.random::<f64>()).collect();
        PointSet::new(dim, coords).unwrap()
    }

    #[test]
    fn mass_statistic_sums_weights() {
        let points = random_points(100, 2, 1);
        let weights: Vec<f64> = (0..100).map(f64::from).collect();
        let tree: KdTree<MassStat, f64> = KdTree::build_with_payload(points, weights, 8).unwrap();
        assert_relative_eq!(tree.node(tree.root()).stat().weight, 4950.0);
        for leaf in tree.leaves() {
            let node = tree.node(leaf);
            let sum: f64 = tree.payload()[node.range()].iter().sum();
            assert_eq!(node.stat().weight, sum);
        }
    }

    #[test]
    fn delta_brackets_every_pair() {
        let kde = Kde::new(random_points(300, 2, 2), KdeConfig::new(0.2)).unwrap();
        let tree = kde.reference();
        let leaves: Vec<_> = tree.leaves().collect();
        for &a in &leaves {
            for &b in &leaves {
                let (na, nb) = (tree.node(a), tree.node(b));
                let delta = kde.compute_delta(&[na, nb]);
                for i in na.range() {
                    let exact: f64 = nb
                        .range()
                        .map(|j| kde.kernel(distance_sq(tree.points().point(i), tree.points().point(j))))
                        .sum();
                    assert!(delta.lower <= exact + 1e-12, "lower bound above exact sum");
                    assert!(exact <= delta.upper + 1e-12, "upper bound below exact sum");
                }
            }
        }
    }

    #[test]
    fn exact_tolerance_matches_naive() {
        let refs = random_points(200, 3, 3);
        let queries = random_points(50, 3, 4);
        let config = KdeConfig::new(0.3).with_tolerance(Tolerance::EXACT);
        let expected = naive::kde(&refs, None, &queries, config.kernel, config.bandwidth).unwrap();
        let kde = Kde::new(refs, config).unwrap();
        let est = kde.estimate(queries).unwrap();
        for (e, x) in est.values.iter().zip(&expected) {
            assert_relative_eq!(*e, *x, max_relative = 1e-12);
        }
        assert_eq!(est.max_used_error(), 0.0);
        assert!(est.is_fully_accounted());
    }

    #[test]
    fn relative_tolerance_is_honored_with_weights() {
        let refs = random_points(400, 2, 5);
        let mut rng = StdRng::seed_from_u64(6);
        let weights: Vec<f64> = (0..400).map(|_| rng.random_range(0.0..3.0)).collect();
        let config = KdeConfig::new(0.05)
            .with_kernel(Kernel::Epanechnikov)
            .with_tolerance(Tolerance::new(0.0, 0.05));
        let expected =
            naive::kde(&refs, Some(weights.as_slice()), &refs, config.kernel, config.bandwidth).unwrap();
        let kde = Kde::with_weights(refs, weights, config).unwrap();
        let est = kde.estimate_reference();
        for (i, (e, x)) in est.values.iter().zip(&expected).enumerate() {
            assert!(within(*e, *x, 0.0, 0.05), "point {i}: {e} vs {x}");
            assert!(
                est.bounds[i].lo <= x + 1e-9 && x - 1e-9 <= est.bounds[i].hi,
                "point {i}: {x} outside {:?}",
                est.bounds[i]
            );
        }
        assert!(est.is_fully_accounted());
    }

    #[test]
    fn wide_budget_prunes_at_the_top() {
        let kde = Kde::new(
            random_points(500, 2, 7),
            KdeConfig::new(1.0).with_tolerance(Tolerance::absolute(10.0)),
        )
        .unwrap();
        let est = kde.estimate_reference();
        assert!(est.pruned_fraction() > 0.99);
        assert!(est.is_fully_accounted());
    }

    #[test]
    fn rejects_bad_inputs() {
        let refs = random_points(10, 2, 8);
        let mut weights = vec![1.0; 10];
        weights[1] = -1.0;
        assert_eq!(
            Kde::with_weights(refs.clone(), weights, KdeConfig::default()).unwrap_err(),
            Error::InvalidWeight {
                index: 1,
                weight: -1.0
            }
        );
        assert_eq!(
            Kde::with_weights(refs.clone(), vec![0.0; 10], KdeConfig::default()).unwrap_err(),
            Error::ZeroTotalWeight
        );
        let kde = Kde::new(refs, KdeConfig::default()).unwrap();
        assert_eq!(
            kde.estimate(random_points(3, 3, 9)).unwrap_err(),
            Error::DimensionMismatch {
                query: 3,
                reference: 2
            }
        );
    }

    #[test]
    fn summaries_only_tighten() {
        let kde = Kde::new(random_points(10, 2, 10), KdeConfig::default()).unwrap();
        let wide = kde.initial_summary();
        let narrow = KdeSummary {
            bounds: Interval::new(1.0, 2.0),
            accounted_min: 4,
            used_max: 0.5,
        };
        assert!(kde.is_tightened(&wide, &narrow));
        assert!(!kde.is_tightened(&narrow, &wide));
    }
}
