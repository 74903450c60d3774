// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types: closed scalar intervals and axis-aligned bounds.

use alloc::vec;
use alloc::vec::Vec;
use core::ops::{Add, AddAssign, BitOr, BitOrAssign};

/// Closed interval `[lo, hi]` over `f64`.
///
/// Used both for per-dimension extents of a [`Bound`] and for value bounds on
/// accumulated contributions. The empty interval is represented by the
/// sentinel [`Interval::EMPTY`] (`[+inf, -inf]`), which is the identity of
/// union. Infinite endpoints are allowed and addition saturates at them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Interval {
    /// Lower endpoint.
    pub lo: f64,
    /// Upper endpoint.
    pub hi: f64,
}

impl Default for Interval {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Interval {
    /// The empty interval; identity for union, absorbing for addition.
    pub const EMPTY: Self = Self::new(f64::INFINITY, f64::NEG_INFINITY);

    /// The degenerate interval `[0, 0]`.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// The whole extended real line.
    pub const UNBOUNDED: Self = Self::new(f64::NEG_INFINITY, f64::INFINITY);

    /// Create an interval from its endpoints.
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Degenerate interval holding a single value.
    pub const fn point(v: f64) -> Self {
        Self { lo: v, hi: v }
    }

    /// True if `hi < lo` (includes [`Interval::EMPTY`]).
    pub fn is_empty(&self) -> bool {
        self.hi < self.lo
    }

    /// Width `hi - lo`; zero for empty intervals.
    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.hi - self.lo
        }
    }

    /// Midpoint of the interval. Finite for any finite endpoints.
    pub fn mid(&self) -> f64 {
        0.5 * self.lo + 0.5 * self.hi
    }

    /// Whether `v` lies in the closed interval.
    pub fn contains(&self, v: f64) -> bool {
        self.lo <= v && v <= self.hi
    }

    /// Whether `other` is a subset of this interval. The empty interval is a
    /// subset of everything.
    pub fn contains_interval(&self, other: &Self) -> bool {
        other.is_empty() || (self.lo <= other.lo && other.hi <= self.hi)
    }

    /// Grow the interval to include `v`.
    pub fn include(&mut self, v: f64) {
        self.lo = self.lo.min(v);
        self.hi = self.hi.max(v);
    }

    /// Smallest interval containing both.
    pub fn union(self, other: Self) -> Self {
        Self {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    /// Multiply by a scalar; endpoints are swapped for negative factors.
    ///
    /// A zero factor yields `[0, 0]` even when an endpoint is infinite.
    pub fn scale(self, k: f64) -> Self {
        if self.is_empty() {
            return Self::EMPTY;
        }
        if k == 0.0 {
            return Self::ZERO;
        }
        let a = self.lo * k;
        let b = self.hi * k;
        if k > 0.0 {
            Self::new(a, b)
        } else {
            Self::new(b, a)
        }
    }

    /// Interval product, taking `0 * inf = 0`.
    pub fn mul(self, other: Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::EMPTY;
        }
        let products = [
            mul_endpoints(self.lo, other.lo),
            mul_endpoints(self.lo, other.hi),
            mul_endpoints(self.hi, other.lo),
            mul_endpoints(self.hi, other.hi),
        ];
        let mut out = Self::EMPTY;
        for p in products {
            out.include(p);
        }
        out
    }

    /// Part of the interval at or above zero, as an interval (`[0, 0]` if none).
    pub fn positive_part(self) -> Self {
        Self::new(self.lo.max(0.0), self.hi.max(0.0))
    }

    /// Part of the interval at or below zero, as an interval (`[0, 0]` if none).
    pub fn negative_part(self) -> Self {
        Self::new(self.lo.min(0.0), self.hi.min(0.0))
    }
}

fn mul_endpoints(a: f64, b: f64) -> f64 {
    if a == 0.0 || b == 0.0 { 0.0 } else { a * b }
}

fn add_saturating(a: f64, b: f64) -> f64 {
    let s = a + b;
    // `inf + -inf`: keep the side that is already unbounded in `a`.
    if s.is_nan() { a } else { s }
}

impl Add for Interval {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        if self.is_empty() || rhs.is_empty() {
            return Self::EMPTY;
        }
        Self::new(add_saturating(self.lo, rhs.lo), add_saturating(self.hi, rhs.hi))
    }
}

impl AddAssign for Interval {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl BitOr for Interval {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Interval {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl BitOrAssign<f64> for Interval {
    fn bitor_assign(&mut self, rhs: f64) {
        self.include(rhs);
    }
}

/// Axis-aligned bound over `D` dimensions: one [`Interval`] per dimension.
///
/// Union (`|=`) is monotone: a bound only ever grows as points or other bounds
/// are folded into it. Midpoint and width are derived per dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct Bound {
    dims: Vec<Interval>,
}

impl Bound {
    /// An empty bound in `dim` dimensions.
    pub fn empty(dim: usize) -> Self {
        Self {
            dims: vec![Interval::EMPTY; dim],
        }
    }

    /// Build a bound from explicit per-dimension intervals.
    pub fn from_intervals(dims: Vec<Interval>) -> Self {
        Self { dims }
    }

    /// The tight bound of a single point.
    pub fn from_point(p: &[f64]) -> Self {
        Self {
            dims: p.iter().map(|&x| Interval::point(x)).collect(),
        }
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.dims.len()
    }

    /// Interval for dimension `d`.
    pub fn get(&self, d: usize) -> Interval {
        self.dims[d]
    }

    /// All per-dimension intervals.
    pub fn intervals(&self) -> &[Interval] {
        &self.dims
    }

    /// True if any dimension is empty (no point has been included yet).
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(Interval::is_empty)
    }

    /// Width along dimension `d`.
    pub fn width(&self, d: usize) -> f64 {
        self.dims[d].width()
    }

    /// Midpoint along dimension `d`.
    pub fn mid(&self, d: usize) -> f64 {
        self.dims[d].mid()
    }

    /// The widest dimension and its width. Ties go to the lowest index.
    ///
    /// Returns `None` only for a zero-dimensional bound.
    pub fn widest_dim(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (d, iv) in self.dims.iter().enumerate() {
            let w = iv.width();
            if best.is_none_or(|(_, bw)| w > bw) {
                best = Some((d, w));
            }
        }
        best
    }

    /// Grow to include a point.
    pub fn include_point(&mut self, p: &[f64]) {
        debug_assert_eq!(p.len(), self.dims.len(), "point dimension must match bound");
        for (iv, &x) in self.dims.iter_mut().zip(p) {
            iv.include(x);
        }
    }

    /// Grow to include another bound.
    pub fn union_with(&mut self, other: &Self) {
        debug_assert_eq!(other.dims.len(), self.dims.len(), "bound dimensions must match");
        for (iv, o) in self.dims.iter_mut().zip(&other.dims) {
            *iv |= *o;
        }
    }

    /// Whether the point lies inside (boundary inclusive).
    pub fn contains_point(&self, p: &[f64]) -> bool {
        p.len() == self.dims.len() && self.dims.iter().zip(p).all(|(iv, &x)| iv.contains(x))
    }

    /// Whether `other` lies entirely inside this bound.
    pub fn contains(&self, other: &Self) -> bool {
        other.dims.len() == self.dims.len()
            && self
                .dims
                .iter()
                .zip(&other.dims)
                .all(|(a, b)| a.contains_interval(b))
    }

    /// Smallest squared Euclidean distance between any two points of the bounds.
    pub fn min_distance_sq(&self, other: &Self) -> f64 {
        self.dims
            .iter()
            .zip(&other.dims)
            .map(|(a, b)| {
                let gap = (a.lo - b.hi).max(b.lo - a.hi).max(0.0);
                gap * gap
            })
            .sum()
    }

    /// Largest squared Euclidean distance between any two points of the bounds.
    pub fn max_distance_sq(&self, other: &Self) -> f64 {
        self.dims
            .iter()
            .zip(&other.dims)
            .map(|(a, b)| {
                let span = (a.hi - b.lo).max(b.hi - a.lo);
                span * span
            })
            .sum()
    }

    /// Range of squared distances between points of the two bounds.
    pub fn distance_sq_range(&self, other: &Self) -> Interval {
        Interval::new(self.min_distance_sq(other), self.max_distance_sq(other))
    }

    /// Smallest squared distance from a point to the bound (zero inside).
    pub fn min_distance_sq_point(&self, p: &[f64]) -> f64 {
        self.dims
            .iter()
            .zip(p)
            .map(|(iv, &x)| {
                let gap = (iv.lo - x).max(x - iv.hi).max(0.0);
                gap * gap
            })
            .sum()
    }

    /// Largest squared distance from a point to any point of the bound.
    pub fn max_distance_sq_point(&self, p: &[f64]) -> f64 {
        self.dims
            .iter()
            .zip(p)
            .map(|(iv, &x)| {
                let span = (x - iv.lo).max(iv.hi - x);
                span * span
            })
            .sum()
    }
}

impl BitOrAssign<&[f64]> for Bound {
    fn bitor_assign(&mut self, rhs: &[f64]) {
        self.include_point(rhs);
    }
}

impl BitOrAssign<&Self> for Bound {
    fn bitor_assign(&mut self, rhs: &Self) {
        self.union_with(rhs);
    }
}

/// Squared Euclidean distance between two points of equal dimension.
#[inline]
pub fn distance_sq(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(feature = "kurbo")]
impl From<kurbo::Rect> for Bound {
    fn from(r: kurbo::Rect) -> Self {
        let r = r.abs();
        Self::from_intervals(vec![Interval::new(r.x0, r.x1), Interval::new(r.y0, r.y1)])
    }
}

#[cfg(feature = "kurbo")]
impl Bound {
    /// The bound as a Kurbo rectangle, if it is non-empty and two-dimensional.
    pub fn to_rect(&self) -> Option<kurbo::Rect> {
        match self.dims.as_slice() {
            [x, y] if !x.is_empty() && !y.is_empty() => {
                Some(kurbo::Rect::new(x.lo, y.lo, x.hi, y.hi))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_union_identity() {
        let mut iv = Interval::EMPTY;
        assert!(iv.is_empty());
        iv |= Interval::new(1.0, 2.0);
        assert_eq!(iv, Interval::new(1.0, 2.0));
        iv |= 5.0;
        assert_eq!(iv, Interval::new(1.0, 5.0));
        assert_eq!(Interval::EMPTY.width(), 0.0);
    }

    #[test]
    fn addition_saturates_at_infinity() {
        let unknown = Interval::new(0.0, f64::INFINITY);
        let sum = unknown + Interval::new(2.0, 3.0);
        assert_eq!(sum, Interval::new(2.0, f64::INFINITY));
        assert!((Interval::EMPTY + sum).is_empty());
    }

    #[test]
    fn product_handles_signs_and_zero_times_infinity() {
        let a = Interval::new(-2.0, 3.0);
        let b = Interval::new(-1.0, 4.0);
        assert_eq!(a.mul(b), Interval::new(-8.0, 12.0));
        let z = Interval::ZERO.mul(Interval::new(1.0, f64::INFINITY));
        assert_eq!(z, Interval::ZERO);
        assert_eq!(Interval::new(1.0, 2.0).scale(-2.0), Interval::new(-4.0, -2.0));
    }

    #[test]
    fn sign_parts_split_an_interval() {
        let iv = Interval::new(-3.0, 5.0);
        assert_eq!(iv.positive_part(), Interval::new(0.0, 5.0));
        assert_eq!(iv.negative_part(), Interval::new(-3.0, 0.0));
        assert_eq!(Interval::new(1.0, 2.0).negative_part(), Interval::ZERO);
    }

    #[test]
    fn bound_grows_monotonically_and_contains_points() {
        let mut b = Bound::empty(2);
        assert!(b.is_empty());
        b |= &[1.0, 2.0][..];
        b |= &[-1.0, 4.0][..];
        assert!(!b.is_empty());
        assert!(b.contains_point(&[0.0, 3.0]));
        assert!(!b.contains_point(&[0.0, 5.0]));
        let before = b.clone();
        b |= &Bound::from_point(&[0.5, 2.5]);
        assert_eq!(b, before, "including an interior point must not change the bound");
        assert!(b.contains(&before));
    }

    #[test]
    fn widest_dim_breaks_ties_on_lowest_index() {
        let b = Bound::from_intervals(vec![
            Interval::new(0.0, 1.0),
            Interval::new(5.0, 7.0),
            Interval::new(-1.0, 1.0),
        ]);
        assert_eq!(b.widest_dim(), Some((1, 2.0)));
        let flat = Bound::from_point(&[3.0, 3.0]);
        assert_eq!(flat.widest_dim(), Some((0, 0.0)));
    }

    #[test]
    fn distance_ranges_between_boxes() {
        let a = Bound::from_intervals(vec![Interval::new(0.0, 1.0), Interval::new(0.0, 1.0)]);
        let b = Bound::from_intervals(vec![Interval::new(3.0, 4.0), Interval::new(0.0, 1.0)]);
        assert_eq!(a.min_distance_sq(&b), 4.0);
        assert_eq!(a.max_distance_sq(&b), 16.0 + 1.0);
        assert_eq!(a.min_distance_sq(&a), 0.0);
        assert_eq!(a.max_distance_sq(&a), 2.0);
        assert_eq!(a.min_distance_sq_point(&[0.5, 3.0]), 4.0);
        assert_eq!(a.max_distance_sq_point(&[0.0, 0.0]), 2.0);
        assert_eq!(distance_sq(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }

    #[test]
    fn midpoint_of_huge_endpoints_stays_finite() {
        let iv = Interval::new(1e308, 1.5e308);
        let m = iv.mid();
        assert!(m.is_finite() && iv.lo < m && m < iv.hi, "midpoint {m} left the interval");
        assert_eq!(Interval::new(-f64::MAX, f64::MAX).mid(), 0.0);
        assert_eq!(Interval::new(f64::MAX, f64::MAX).mid(), f64::MAX);
    }

    #[cfg(feature = "kurbo")]
    #[test]
    fn kurbo_rects_convert_both_ways() {
        let b = Bound::from(kurbo::Rect::new(4.0, 3.0, 1.0, 2.0));
        assert_eq!(b.get(0), Interval::new(1.0, 4.0));
        assert_eq!(b.get(1), Interval::new(2.0, 3.0));
        assert_eq!(b.to_rect(), Some(kurbo::Rect::new(1.0, 2.0, 4.0, 3.0)));
        assert_eq!(Bound::from_point(&[0.0, 0.0, 0.0]).to_rect(), None);
        assert_eq!(Bound::empty(2).to_rect(), None);
    }
}
