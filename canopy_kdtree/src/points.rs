// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dense row-major point storage.

use alloc::vec::Vec;

use crate::error::TreeError;
use crate::types::Bound;

/// An `N x D` matrix of finite `f64` coordinates stored row-major.
///
/// A point set is validated once on construction: it is non-empty, every row
/// has the same dimension, and every coordinate is finite. Tree nodes refer to
/// rows through `(begin, count)` ranges and never copy them.
#[derive(Clone, Debug, PartialEq)]
pub struct PointSet {
    dim: usize,
    coords: Vec<f64>,
}

impl PointSet {
    /// Wrap a flat row-major coordinate buffer of `coords.len() / dim` points.
    pub fn new(dim: usize, coords: Vec<f64>) -> Result<Self, TreeError> {
        if dim == 0 {
            return Err(TreeError::ZeroDimension);
        }
        if coords.is_empty() {
            return Err(TreeError::EmptyInput);
        }
        if coords.len() % dim != 0 {
            return Err(TreeError::RaggedCoordinates {
                len: coords.len(),
                dim,
            });
        }
        if let Some(pos) = coords.iter().position(|x| !x.is_finite()) {
            return Err(TreeError::NonFiniteCoordinate {
                point: pos / dim,
                dim: pos % dim,
            });
        }
        Ok(Self { dim, coords })
    }

    /// Collect rows into a point set. All rows must share the first row's length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, TreeError> {
        let Some(first) = rows.first() else {
            return Err(TreeError::EmptyInput);
        };
        let dim = first.as_ref().len();
        let mut coords = Vec::with_capacity(rows.len() * dim);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != dim {
                return Err(TreeError::DimensionMismatch {
                    point: i,
                    expected: dim,
                    got: row.len(),
                });
            }
            coords.extend_from_slice(row);
        }
        Self::new(dim, coords)
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.coords.len() / self.dim
    }

    /// Always false for a constructed point set; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Dimension of every point.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Coordinates of point `i`.
    #[inline]
    pub fn point(&self, i: usize) -> &[f64] {
        &self.coords[i * self.dim..(i + 1) * self.dim]
    }

    /// Coordinate `d` of point `i`.
    #[inline]
    pub fn coord(&self, i: usize, d: usize) -> f64 {
        self.coords[i * self.dim + d]
    }

    /// Iterate over points in storage order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.coords.chunks_exact(self.dim)
    }

    /// The flat row-major buffer.
    pub fn as_flat(&self) -> &[f64] {
        &self.coords
    }

    /// Tight bound of the points in `begin..end`.
    pub fn bound_of(&self, begin: usize, end: usize) -> Bound {
        let mut bound = Bound::empty(self.dim);
        for i in begin..end {
            bound |= self.point(i);
        }
        bound
    }

    /// Swap two rows in place.
    pub(crate) fn swap_rows(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        let (head, tail) = self.coords.split_at_mut(hi * self.dim);
        head[lo * self.dim..(lo + 1) * self.dim].swap_with_slice(&mut tail[..self.dim]);
    }
}

#[cfg(feature = "kurbo")]
impl PointSet {
    /// Two-dimensional point set from Kurbo points.
    pub fn from_kurbo_points(points: &[kurbo::Point]) -> Result<Self, TreeError> {
        let mut coords = Vec::with_capacity(points.len() * 2);
        for p in points {
            coords.push(p.x);
            coords.push(p.y);
        }
        Self::new(2, coords)
    }
}
