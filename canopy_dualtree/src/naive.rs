// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exhaustive reference evaluators, for checking tree results.
//!
//! These visit every pair or triple and are only practical for small inputs.

use alloc::vec::Vec;

use canopy_kdtree::{PointSet, TreeError, distance_sq};
use num_traits::Float;

use crate::error::Error;
use crate::kernel::Kernel;
use crate::three_body::naive_parts;

/// Density at each query, in query order, by summing over every reference.
///
/// `weights` defaults to one per reference.
pub fn kde(
    references: &PointSet,
    weights: Option<&[f64]>,
    queries: &PointSet,
    kernel: Kernel,
    bandwidth: f64,
) -> Result<Vec<f64>, Error> {
    if queries.dim() != references.dim() {
        return Err(Error::DimensionMismatch {
            query: queries.dim(),
            reference: references.dim(),
        });
    }
    if let Some(w) = weights {
        if w.len() != references.len() {
            return Err(TreeError::PayloadLength {
                points: references.len(),
                payload: w.len(),
            }
            .into());
        }
    }
    let weight = |i: usize| weights.map_or(1.0, |w| w[i]);
    let total: f64 = (0..references.len()).map(weight).sum();
    let norm = total * kernel.normalization(references.dim(), bandwidth);
    Ok(queries
        .iter()
        .map(|q| {
            let sum: f64 = references
                .iter()
                .enumerate()
                .map(|(i, r)| weight(i) * kernel.eval(distance_sq(q, r), bandwidth))
                .sum();
            sum / norm
        })
        .collect())
}

/// Axilrod-Teller potential of one point, split by sign.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Potential {
    /// Sum over all triples containing the point.
    pub value: f64,
    /// Sum of the positive contributions.
    pub positive: f64,
    /// Sum of the negative contributions.
    pub negative: f64,
}

impl Potential {
    /// `positive + |negative|`, the magnitude relative tolerances refer to.
    pub fn magnitude(&self) -> f64 {
        self.positive - self.negative
    }
}

/// Potential at each point, in input order, by summing over every triple.
pub fn three_body(points: &PointSet, strength: f64) -> Vec<Potential> {
    naive_parts(points, strength)
        .into_iter()
        .map(|[positive, negative]| Potential {
            value: positive + negative,
            positive,
            negative,
        })
        .collect()
}

/// Largest `|approx - exact| / |exact|` over paired values.
///
/// A pair with `exact == 0` counts as zero error if `approx` is also zero and
/// as infinite otherwise.
pub fn max_relative_error(approx: &[f64], exact: &[f64]) -> f64 {
    approx
        .iter()
        .zip(exact)
        .map(|(&a, &e)| {
            if e == 0.0 {
                if a == 0.0 { 0.0 } else { f64::INFINITY }
            } else {
                Float::abs(a - e) / Float::abs(e)
            }
        })
        .fold(0.0, f64::max)
}

/// Largest `|approx - exact|` over paired values.
pub fn max_absolute_error(approx: &[f64], exact: &[f64]) -> f64 {
    approx
        .iter()
        .zip(exact)
        .map(|(&a, &e)| Float::abs(a - e))
        .fold(0.0, f64::max)
}
