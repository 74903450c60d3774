// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Triple-tree summation of the Axilrod-Teller three-body potential.
//!
//! For points `i`, `j`, `k` with squared side lengths `a = r_ij²`,
//! `b = r_jk²` and `c = r_ik²`,
//!
//! ```text
//! V = ν * [ (abc)^(-3/2) + 3/8 * (a + c - b)(a + b - c)(b + c - a) * (abc)^(-5/2) ]
//! ```
//!
//! which is `ν (1 + 3 cos γi cos γj cos γk) / (r_ij r_ik r_jk)³` written in
//! squared distances. The potential of a point is the sum of `V` over every
//! unordered triple containing it.
//!
//! Contributions are tracked as separate positive and negative parts. The
//! estimate of a point satisfies
//! `|V̂ - V| <= absolute + relative * (P + |N|)`, where `P` and `N` are the
//! sums of the positive and negative contributions. Coincident points make
//! `V` singular; their potentials come out non-finite.

use alloc::vec::Vec;

use canopy_kdtree::{Interval, KdTree, Node, PointSet, distance_sq};
use num_traits::Float;

use crate::config::ThreeBodyConfig;
use crate::engine::{Positions, Problem, StateOf, Traversal};
use crate::error::Error;
use crate::estimates::{Estimates, Row};

/// Axilrod-Teller potential of one triple with strength `strength`, from its
/// three squared side lengths in any order.
pub fn axilrod_teller(a: f64, b: f64, c: f64, strength: f64) -> f64 {
    let abc = a * b * c;
    let angular = 0.375 * (a + c - b) * (a + b - c) * (b + c - a) * Float::powf(abc, -2.5);
    strength * (Float::powf(abc, -1.5) + angular)
}

/// Interval enclosing [`axilrod_teller`] over every triple whose squared side
/// lengths lie in `a`, `b` and `c`.
pub fn axilrod_teller_range(a: Interval, b: Interval, c: Interval, strength: f64) -> Interval {
    let abc = a.mul(b).mul(c);
    let radial = Interval::new(Float::powf(abc.hi, -1.5), Float::powf(abc.lo, -1.5));
    let falloff = Interval::new(Float::powf(abc.hi, -2.5), Float::powf(abc.lo, -2.5));
    let f1 = Interval::new(a.lo + c.lo - b.hi, a.hi + c.hi - b.lo);
    let f2 = Interval::new(a.lo + b.lo - c.hi, a.hi + b.hi - c.lo);
    let f3 = Interval::new(b.lo + c.lo - a.hi, b.hi + c.hi - a.lo);
    let angular = f1.mul(f2).mul(f3).mul(falloff).scale(0.375);
    (radial + angular).scale(strength)
}

/// Number of triples, per point, that a canonical node tuple contributes to
/// each position. A node repeated at later positions is credited at its first
/// position only.
pub fn triple_counts(nodes: &[&Node<()>; 3]) -> [u64; 3] {
    let n = nodes.map(|x| x.count() as u64);
    let same01 = nodes[0].begin() == nodes[1].begin();
    let same12 = nodes[1].begin() == nodes[2].begin();
    match (same01, same12) {
        (true, true) => {
            let c = (n[0] - 1) * n[0].saturating_sub(2) / 2;
            [c, c, c]
        }
        (true, false) => {
            let a = (n[0] - 1) * n[2];
            [a, a, n[0] * (n[0] - 1) / 2]
        }
        (false, true) => {
            let b = n[0] * (n[1] - 1);
            [n[1] * (n[1] - 1) / 2, b, b]
        }
        (false, false) => [n[1] * n[2], n[0] * n[2], n[0] * n[1]],
    }
}

/// Bound on the potential of every triple in a node tuple.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThreeBodyDelta {
    /// Positive part of one triple's potential.
    pub positive: Interval,
    /// Negative part of one triple's potential.
    pub negative: Interval,
    /// Triples per point at each position, see [`triple_counts`].
    pub counts: [u64; 3],
}

impl ThreeBodyDelta {
    /// Largest error of the midpoint estimate of one triple.
    pub fn error(&self) -> f64 {
        0.5 * (self.positive.width() + self.negative.width())
    }
}

/// Committed triples not yet pushed to the points.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThreeBodyPostponed {
    /// Sum of committed positive parts.
    pub positive: Interval,
    /// Sum of committed negative parts.
    pub negative: Interval,
    /// Sum of committed midpoint estimates.
    pub estimate: f64,
    /// Number of committed triples.
    pub pruned: u64,
    /// Sum of committed errors.
    pub used_error: f64,
}

impl Default for ThreeBodyPostponed {
    fn default() -> Self {
        Self {
            positive: Interval::ZERO,
            negative: Interval::ZERO,
            estimate: 0.0,
            pruned: 0,
            used_error: 0.0,
        }
    }
}

/// Bounds over all points below a node.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThreeBodySummary {
    /// Union of the eventual positive sums: `[lo, +inf]`.
    pub positive: Interval,
    /// Union of the eventual negative sums: `[-inf, hi]`.
    pub negative: Interval,
    /// Smallest number of triples accounted for at any point.
    pub accounted_min: u64,
    /// Largest error used at any point.
    pub used_max: f64,
}

/// Running result of one point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThreeBodyPoint {
    /// Eventual positive sum, `[lo, +inf]`.
    pub positive: Interval,
    /// Eventual negative sum, `[-inf, hi]`.
    pub negative: Interval,
    /// Estimated potential.
    pub estimate: f64,
    /// Triples accounted for by committed tuples.
    pub pruned: u64,
    /// Triples evaluated exactly.
    pub exact: u64,
    /// Error used.
    pub used_error: f64,
}

impl ThreeBodyPoint {
    fn add_exact(&mut self, v: f64) {
        let v_range = Interval::point(v);
        if v >= 0.0 {
            self.positive += v_range;
        } else {
            self.negative += v_range;
        }
        self.estimate += v;
        self.exact += 1;
    }
}

/// A point set ready for three-body potential summation.
///
/// ```
/// use canopy_dualtree::{PointSet, ThreeBody, ThreeBodyConfig};
///
/// let points = PointSet::from_rows(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]).unwrap();
/// let tb = ThreeBody::new(points, ThreeBodyConfig::default()).unwrap();
/// let est = tb.potentials();
/// assert_eq!(est.len(), 4);
/// assert!(est.is_fully_accounted());
/// ```
pub struct ThreeBody {
    config: ThreeBodyConfig,
    tree: KdTree<()>,
    combinations: u64,
}

impl core::fmt::Debug for ThreeBody {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreeBody")
            .field("config", &self.config)
            .field("tree", &self.tree)
            .finish_non_exhaustive()
    }
}

impl ThreeBody {
    /// Build the tree over `points`. At least three points are required.
    pub fn new(points: PointSet, config: ThreeBodyConfig) -> Result<Self, Error> {
        config.validate()?;
        let n = points.len();
        if n < 3 {
            return Err(Error::TooFewPoints { got: n, min: 3 });
        }
        let tree = KdTree::build(points, config.leaf_size)?;
        let n = n as u64;
        Ok(Self {
            config,
            tree,
            combinations: (n - 1) * (n - 2) / 2,
        })
    }

    /// The configuration.
    pub fn config(&self) -> &ThreeBodyConfig {
        &self.config
    }

    /// The tree.
    pub fn tree(&self) -> &KdTree<()> {
        &self.tree
    }

    /// Potential at every point, in the original order.
    ///
    /// [`Estimates::bounds`] holds `estimate ± used_error`.
    pub fn potentials(&self) -> Estimates {
        log::debug!(
            "three-body: {} points, strength {}, {:?}",
            self.tree.len(),
            self.config.strength,
            self.config.tolerance,
        );
        let out = Traversal::new(self, [&self.tree; 3]).run();
        let rows = out.points.iter().map(|p| Row {
            value: p.estimate,
            bounds: Interval::new(p.estimate - p.used_error, p.estimate + p.used_error),
            pruned: p.pruned,
            exact: p.exact,
            used_error: p.used_error,
        });
        Estimates::from_tree_order(rows, self.tree.old_from_new(), self.combinations, out.stats)
    }

    fn slack(before: f64, after: f64) -> f64 {
        1e-9 * (Float::abs(before) + Float::abs(after))
    }
}

impl Problem<3> for ThreeBody {
    type Stat = ();
    type Payload = ();
    type Delta = ThreeBodyDelta;
    type Postponed = ThreeBodyPostponed;
    type Summary = ThreeBodySummary;
    type Point = ThreeBodyPoint;

    fn receivers(&self) -> Positions {
        Positions::all()
    }

    fn is_canonical(&self, nodes: &[&Node<()>; 3]) -> bool {
        nodes[0].begin() <= nodes[1].begin() && nodes[1].begin() <= nodes[2].begin()
    }

    fn initial_point(&self) -> ThreeBodyPoint {
        ThreeBodyPoint {
            positive: Interval::new(0.0, f64::INFINITY),
            negative: Interval::new(f64::NEG_INFINITY, 0.0),
            estimate: 0.0,
            pruned: 0,
            exact: 0,
            used_error: 0.0,
        }
    }

    fn zero_postponed(&self) -> ThreeBodyPostponed {
        ThreeBodyPostponed::default()
    }

    fn initial_summary(&self) -> ThreeBodySummary {
        ThreeBodySummary {
            positive: Interval::new(0.0, f64::INFINITY),
            negative: Interval::new(f64::NEG_INFINITY, 0.0),
            accounted_min: 0,
            used_max: 0.0,
        }
    }

    fn empty_summary(&self) -> ThreeBodySummary {
        ThreeBodySummary {
            positive: Interval::EMPTY,
            negative: Interval::EMPTY,
            accounted_min: u64::MAX,
            used_max: f64::NEG_INFINITY,
        }
    }

    fn compute_delta(&self, nodes: &[&Node<()>; 3]) -> ThreeBodyDelta {
        let [x, y, z] = nodes;
        let a = x.bound().distance_sq_range(y.bound());
        let b = y.bound().distance_sq_range(z.bound());
        let c = x.bound().distance_sq_range(z.bound());
        let v = axilrod_teller_range(a, b, c, self.config.strength);
        ThreeBodyDelta {
            positive: v.positive_part(),
            negative: v.negative_part(),
            counts: triple_counts(nodes),
        }
    }

    fn can_summarize(
        &self,
        _: &[&Node<()>; 3],
        delta: &ThreeBodyDelta,
        states: &[Option<&StateOf<Self, 3>>; 3],
    ) -> bool {
        let err = delta.error();
        let tolerance = self.config.tolerance;
        for (state, &count) in states.iter().zip(&delta.counts) {
            let Some(state) = state else {
                continue;
            };
            if count == 0 {
                continue;
            }
            if !err.is_finite() {
                return false;
            }
            let (summary, postponed) = (&state.summary, &state.postponed);
            let accounted = summary.accounted_min + postponed.pruned;
            let remaining = self.combinations.saturating_sub(accounted);
            if remaining == 0 {
                return false;
            }
            let c = count as f64;
            let positive = summary.positive.lo + postponed.positive.lo + c * delta.positive.lo;
            let negative = summary.negative.hi + postponed.negative.hi + c * delta.negative.hi;
            let budget = tolerance.absolute + tolerance.relative * (positive - negative);
            let used = summary.used_max + postponed.used_error;
            // The point's share of the remaining budget for these `count` triples.
            if err * remaining as f64 > budget - used {
                return false;
            }
        }
        true
    }

    fn apply_delta(&self, postponed: &mut ThreeBodyPostponed, delta: &ThreeBodyDelta, position: usize) {
        let count = delta.counts[position];
        if count == 0 {
            return;
        }
        let c = count as f64;
        postponed.positive += delta.positive.scale(c);
        postponed.negative += delta.negative.scale(c);
        postponed.estimate += c * (delta.positive.mid() + delta.negative.mid());
        postponed.pruned += count;
        postponed.used_error += c * delta.error();
    }

    fn apply_postponed(&self, into: &mut ThreeBodyPostponed, from: &ThreeBodyPostponed) {
        into.positive += from.positive;
        into.negative += from.negative;
        into.estimate += from.estimate;
        into.pruned += from.pruned;
        into.used_error += from.used_error;
    }

    fn base_case(
        &self,
        trees: &[&KdTree<()>; 3],
        nodes: &[&Node<()>; 3],
        points: &mut [ThreeBodyPoint],
    ) {
        let coords = trees[0].points();
        let [x, y, z] = nodes;
        for i in x.range() {
            let pi = coords.point(i);
            for j in y.range().filter(|&j| j > i) {
                let pj = coords.point(j);
                let a = distance_sq(pi, pj);
                for k in z.range().filter(|&k| k > j) {
                    let pk = coords.point(k);
                    let v = axilrod_teller(
                        a,
                        distance_sq(pj, pk),
                        distance_sq(pi, pk),
                        self.config.strength,
                    );
                    points[i].add_exact(v);
                    points[j].add_exact(v);
                    points[k].add_exact(v);
                }
            }
        }
    }

    fn flush(&self, point: &mut ThreeBodyPoint, postponed: &ThreeBodyPostponed) {
        point.positive += postponed.positive;
        point.negative += postponed.negative;
        point.estimate += postponed.estimate;
        point.pruned += postponed.pruned;
        point.used_error += postponed.used_error;
    }

    fn summarize(&self, points: &[ThreeBodyPoint]) -> ThreeBodySummary {
        let mut summary = self.empty_summary();
        for p in points {
            summary.positive |= p.positive;
            summary.negative |= p.negative;
            summary.accounted_min = summary.accounted_min.min(p.pruned + p.exact);
            summary.used_max = summary.used_max.max(p.used_error);
        }
        summary
    }

    fn accumulate(
        &self,
        into: &mut ThreeBodySummary,
        summary: &ThreeBodySummary,
        postponed: &ThreeBodyPostponed,
    ) {
        into.positive |= summary.positive + postponed.positive;
        into.negative |= summary.negative + postponed.negative;
        into.accounted_min = into
            .accounted_min
            .min(summary.accounted_min + postponed.pruned);
        into.used_max = into.used_max.max(summary.used_max + postponed.used_error);
    }

    fn is_tightened(&self, before: &ThreeBodySummary, after: &ThreeBodySummary) -> bool {
        let (p0, p1) = (before.positive.lo, after.positive.lo);
        let (n0, n1) = (before.negative.hi, after.negative.hi);
        // Singular triples (coincident points) yield NaN sums, which compare
        // as neither looser nor tighter.
        !(p1 < p0 - Self::slack(p0, p1))
            && !(n1 > n0 + Self::slack(n0, n1))
            && after.accounted_min >= before.accounted_min
    }
}

/// Naive sum of [`axilrod_teller`] over all triples, with positive and
/// negative parts kept apart.
pub(crate) fn naive_parts(points: &PointSet, strength: f64) -> Vec<[f64; 2]> {
    let n = points.len();
    let mut parts = alloc::vec![[0.0; 2]; n];
    for i in 0..n {
        for j in i + 1..n {
            let a = distance_sq(points.point(i), points.point(j));
            for k in j + 1..n {
                let v = axilrod_teller(
                    a,
                    distance_sq(points.point(j), points.point(k)),
                    distance_sq(points.point(i), points.point(k)),
                    strength,
                );
                let slot = usize::from(v < 0.0);
                parts[i][slot] += v;
                parts[j][slot] += v;
                parts[k][slot] += v;
            }
        }
    }
    parts
}
