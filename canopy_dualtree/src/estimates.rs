// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-point output of a run, in the caller's point order.

use alloc::vec;
use alloc::vec::Vec;

use canopy_kdtree::Interval;

use crate::engine::TraversalStats;

/// One point's final output.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Row {
    pub(crate) value: f64,
    pub(crate) bounds: Interval,
    pub(crate) pruned: u64,
    pub(crate) exact: u64,
    pub(crate) used_error: f64,
}

/// Estimated values with per-point diagnostics.
///
/// All vectors are indexed by the caller's original point order.
#[derive(Clone, Debug, PartialEq)]
pub struct Estimates {
    /// Estimated value per point.
    pub values: Vec<f64>,
    /// Interval each true value is known to lie in.
    pub bounds: Vec<Interval>,
    /// Combinations accounted for by committed bounds.
    pub pruned: Vec<u64>,
    /// Combinations evaluated exactly.
    pub exact: Vec<u64>,
    /// Upper bound on `|estimate - true value|`, in output units.
    pub used_error: Vec<f64>,
    /// Number of combinations each point takes part in.
    pub combinations: u64,
    /// Counters of the traversal that produced the estimates.
    pub stats: TraversalStats,
}

impl Estimates {
    /// Gather rows stored in tree order into caller order.
    pub(crate) fn from_tree_order(
        rows: impl ExactSizeIterator<Item = Row>,
        old_from_new: &[usize],
        combinations: u64,
        stats: TraversalStats,
    ) -> Self {
        let n = rows.len();
        let mut out = Self {
            values: vec![0.0; n],
            bounds: vec![Interval::ZERO; n],
            pruned: vec![0; n],
            exact: vec![0; n],
            used_error: vec![0.0; n],
            combinations,
            stats,
        };
        for (row, &old) in rows.zip(old_from_new) {
            out.values[old] = row.value;
            out.bounds[old] = row.bounds;
            out.pruned[old] = row.pruned;
            out.exact[old] = row.exact;
            out.used_error[old] = row.used_error;
        }
        out
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no points.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fraction of all combinations that were accounted for by pruning.
    pub fn pruned_fraction(&self) -> f64 {
        let pruned: u64 = self.pruned.iter().sum();
        let exact: u64 = self.exact.iter().sum();
        let total = pruned + exact;
        if total == 0 {
            0.0
        } else {
            pruned as f64 / total as f64
        }
    }

    /// Largest error bound over all points.
    pub fn max_used_error(&self) -> f64 {
        self.used_error.iter().copied().fold(0.0, f64::max)
    }

    /// Whether every point's pruned and exact counts add up to its number of
    /// combinations.
    pub fn is_fully_accounted(&self) -> bool {
        self.pruned
            .iter()
            .zip(&self.exact)
            .all(|(p, e)| p + e == self.combinations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(value: f64, pruned: u64, exact: u64) -> Row {
        Row {
            value,
            bounds: Interval::point(value),
            pruned,
            exact,
            used_error: value / 10.0,
        }
    }

    #[test]
    fn rows_land_in_caller_order() {
        let rows = [row(1.0, 2, 2), row(2.0, 0, 4), row(3.0, 4, 0)];
        let est = Estimates::from_tree_order(
            rows.into_iter(),
            &[2, 0, 1],
            4,
            TraversalStats::default(),
        );
        assert_eq!(est.values, [2.0, 3.0, 1.0]);
        assert_eq!(est.pruned, [0, 4, 2]);
        assert_eq!(est.bounds[2], Interval::point(1.0));
        assert!(est.is_fully_accounted());
        assert_eq!(est.pruned_fraction(), 0.5);
        assert_eq!(est.max_used_error(), 0.3);
    }
}
