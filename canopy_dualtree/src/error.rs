// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input errors, reported before any traversal work begins.

use canopy_kdtree::TreeError;

/// Reasons a problem cannot be set up or run.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// The point set or tree could not be built.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Kernel bandwidth must be positive and finite.
    #[error("bandwidth must be positive and finite, got {0}")]
    InvalidBandwidth(f64),

    /// Tolerances must be non-negative and finite.
    #[error("tolerance must be non-negative and finite, got absolute {absolute}, relative {relative}")]
    InvalidTolerance {
        /// Requested absolute tolerance.
        absolute: f64,
        /// Requested relative tolerance.
        relative: f64,
    },

    /// Probability must lie in `(0, 1]`.
    #[error("probability must lie in (0, 1], got {0}")]
    InvalidProbability(f64),

    /// Potential strength must be finite.
    #[error("potential strength must be finite, got {0}")]
    InvalidStrength(f64),

    /// Leaf size must be at least one point.
    #[error("leaf size must be positive, got {0}")]
    InvalidLeafSize(usize),

    /// Query and reference points have different dimensions.
    #[error("query dimension {query} does not match reference dimension {reference}")]
    DimensionMismatch {
        /// Dimension of the query points.
        query: usize,
        /// Dimension of the reference points.
        reference: usize,
    },

    /// A reference weight is negative or not finite.
    #[error("weight {weight} of reference point {index} must be non-negative and finite")]
    InvalidWeight {
        /// Index of the offending reference point.
        index: usize,
        /// The offending weight.
        weight: f64,
    },

    /// All reference weights are zero, so the density is undefined.
    #[error("total reference weight is zero")]
    ZeroTotalWeight,

    /// The problem needs more points than were supplied.
    #[error("need at least {min} points, got {got}")]
    TooFewPoints {
        /// Number of points supplied.
        got: usize,
        /// Minimum number required.
        min: usize,
    },
}
