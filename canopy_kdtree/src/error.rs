// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input errors reported before any tree work begins.

/// Reasons a point set or tree cannot be built.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// No points were supplied.
    #[error("point set is empty")]
    EmptyInput,

    /// Points must have at least one coordinate.
    #[error("points must have at least one dimension")]
    ZeroDimension,

    /// A row has a different number of coordinates than the first row.
    #[error("point {point} has {got} coordinates, expected {expected}")]
    DimensionMismatch {
        /// Index of the offending point.
        point: usize,
        /// Dimension of the first point.
        expected: usize,
        /// Dimension of the offending point.
        got: usize,
    },

    /// A flat coordinate buffer is not a whole number of rows.
    #[error("{len} coordinates do not divide into rows of dimension {dim}")]
    RaggedCoordinates {
        /// Length of the flat buffer.
        len: usize,
        /// Requested dimension.
        dim: usize,
    },

    /// A coordinate is NaN or infinite.
    #[error("coordinate {dim} of point {point} is not finite")]
    NonFiniteCoordinate {
        /// Index of the offending point.
        point: usize,
        /// Offending dimension.
        dim: usize,
    },

    /// The leaf size threshold must be at least one point.
    #[error("leaf size must be positive, got {0}")]
    InvalidLeafSize(usize),

    /// The per-point payload does not have one entry per point.
    #[error("payload has {payload} entries for {points} points")]
    PayloadLength {
        /// Number of points.
        points: usize,
        /// Number of payload entries.
        payload: usize,
    },
}
