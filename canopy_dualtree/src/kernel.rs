// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Radially symmetric smoothing kernels.

use core::f64::consts::PI;

use num_traits::Float;

/// A smoothing kernel `k(d²)` with `k(0) = 1`, non-increasing in distance.
///
/// Values are unnormalized; divide by [`Kernel::normalization`] to obtain a
/// probability density.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Kernel {
    /// `exp(-d² / 2h²)`.
    #[default]
    Gaussian,
    /// `max(0, 1 - d² / h²)`; zero beyond the bandwidth.
    Epanechnikov,
}

impl Kernel {
    /// Unnormalized kernel value at squared distance `dist_sq` with bandwidth
    /// `bandwidth`.
    #[inline]
    pub fn eval(self, dist_sq: f64, bandwidth: f64) -> f64 {
        self.eval_scaled(dist_sq / (bandwidth * bandwidth))
    }

    /// Unnormalized kernel value at `u = d² / h²`.
    #[inline]
    pub fn eval_scaled(self, u: f64) -> f64 {
        match self {
            Self::Gaussian => Float::exp(-0.5 * u),
            Self::Epanechnikov => {
                if u < 1.0 {
                    1.0 - u
                } else {
                    0.0
                }
            }
        }
    }

    /// Integral of the unnormalized kernel over `dim`-dimensional space.
    pub fn normalization(self, dim: usize, bandwidth: f64) -> f64 {
        match self {
            Self::Gaussian => {
                let half = dim as f64 / 2.0;
                Float::powf(2.0 * PI * bandwidth * bandwidth, half)
            }
            Self::Epanechnikov => {
                unit_ball_volume(dim) * Float::powf(bandwidth, dim as f64) * 2.0 / (dim as f64 + 2.0)
            }
        }
    }
}

/// Volume of the unit ball in `dim` dimensions, by the two-step recurrence
/// `V(d) = V(d - 2) * 2π / d`.
fn unit_ball_volume(dim: usize) -> f64 {
    let mut v = if dim % 2 == 0 { 1.0 } else { 2.0 };
    let mut d = if dim % 2 == 0 { 2 } else { 3 };
    while d <= dim {
        v *= 2.0 * PI / d as f64;
        d += 2;
    }
    v
}
