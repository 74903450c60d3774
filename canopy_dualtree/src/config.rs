// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Run configuration for the density and potential problems.

use canopy_kdtree::DEFAULT_LEAF_SIZE;

use crate::error::Error;
use crate::kernel::Kernel;

/// Error budget for one output value.
///
/// Both parts combine additively: an estimate `v̂` of a value `v` is accepted
/// when `|v̂ - v| <= absolute + relative * m`, where `m` is the magnitude the
/// problem measures relative error against (the density itself for KDE, the
/// summed magnitude of positive and negative contributions for three-body
/// potentials).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tolerance {
    /// Absolute part, in output units.
    pub absolute: f64,
    /// Relative part, as a fraction of the output magnitude.
    pub relative: f64,
}

impl Tolerance {
    /// No error allowed: every contribution is computed exactly, except those
    /// whose bound is already exact.
    pub const EXACT: Self = Self::new(0.0, 0.0);

    /// A tolerance with both parts.
    pub const fn new(absolute: f64, relative: f64) -> Self {
        Self { absolute, relative }
    }

    /// A purely absolute tolerance.
    pub const fn absolute(absolute: f64) -> Self {
        Self::new(absolute, 0.0)
    }

    /// A purely relative tolerance.
    pub const fn relative(relative: f64) -> Self {
        Self::new(0.0, relative)
    }

    /// Whether both parts are zero.
    pub fn is_exact(&self) -> bool {
        self.absolute == 0.0 && self.relative == 0.0
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        let ok = |x: f64| x.is_finite() && x >= 0.0;
        if ok(self.absolute) && ok(self.relative) {
            Ok(())
        } else {
            Err(Error::InvalidTolerance {
                absolute: self.absolute,
                relative: self.relative,
            })
        }
    }
}

fn validate_probability(probability: f64) -> Result<(), Error> {
    if probability > 0.0 && probability <= 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidProbability(probability))
    }
}

fn validate_leaf_size(leaf_size: usize) -> Result<(), Error> {
    if leaf_size == 0 {
        Err(Error::InvalidLeafSize(leaf_size))
    } else {
        Ok(())
    }
}

/// Configuration of a kernel density estimate.
///
/// ```
/// use canopy_dualtree::{Kernel, KdeConfig, Tolerance};
///
/// let config = KdeConfig::new(0.25)
///     .with_kernel(Kernel::Epanechnikov)
///     .with_tolerance(Tolerance::new(1e-3, 0.01))
///     .with_leaf_size(32);
/// assert!(config.validate().is_ok());
/// assert!(KdeConfig::new(-1.0).validate().is_err());
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KdeConfig {
    /// Smoothing kernel.
    pub kernel: Kernel,
    /// Kernel bandwidth `h`.
    pub bandwidth: f64,
    /// Error budget per query density. Defaults to an absolute `0.1`.
    pub tolerance: Tolerance,
    /// Required probability that every bound holds, in `(0, 1]`.
    ///
    /// The bounds used for pruning are deterministic, so they satisfy any
    /// probability; the value is validated and recorded.
    pub probability: f64,
    /// Maximum number of points per tree leaf.
    pub leaf_size: usize,
}

impl Default for KdeConfig {
    fn default() -> Self {
        Self {
            kernel: Kernel::Gaussian,
            bandwidth: 1.0,
            tolerance: Tolerance::absolute(0.1),
            probability: 1.0,
            leaf_size: DEFAULT_LEAF_SIZE,
        }
    }
}

impl KdeConfig {
    /// Default configuration with the given bandwidth.
    pub fn new(bandwidth: f64) -> Self {
        Self {
            bandwidth,
            ..Self::default()
        }
    }

    /// Use `kernel`.
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Use `tolerance`.
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Use `probability`.
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    /// Use `leaf_size`.
    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    /// Check every field.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.bandwidth.is_finite() && self.bandwidth > 0.0) {
            return Err(Error::InvalidBandwidth(self.bandwidth));
        }
        self.tolerance.validate()?;
        validate_probability(self.probability)?;
        validate_leaf_size(self.leaf_size)
    }
}

/// Configuration of an Axilrod-Teller three-body potential sum.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThreeBodyConfig {
    /// Potential strength `ν`.
    pub strength: f64,
    /// Error budget per point potential. Defaults to a relative `0.1`.
    pub tolerance: Tolerance,
    /// Required probability that every bound holds, in `(0, 1]`.
    pub probability: f64,
    /// Maximum number of points per tree leaf.
    pub leaf_size: usize,
}

impl Default for ThreeBodyConfig {
    fn default() -> Self {
        Self {
            strength: 1.0,
            tolerance: Tolerance::relative(0.1),
            probability: 1.0,
            leaf_size: DEFAULT_LEAF_SIZE,
        }
    }
}

impl ThreeBodyConfig {
    /// Default configuration with the given strength.
    pub fn new(strength: f64) -> Self {
        Self {
            strength,
            ..Self::default()
        }
    }

    /// Use `tolerance`.
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Use `probability`.
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    /// Use `leaf_size`.
    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    /// Check every field.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.strength.is_finite() {
            return Err(Error::InvalidStrength(self.strength));
        }
        self.tolerance.validate()?;
        validate_probability(self.probability)?;
        validate_leaf_size(self.leaf_size)
    }
}
