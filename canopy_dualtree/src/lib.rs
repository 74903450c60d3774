// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Dualtree: bounded-error multi-tree algorithms over kd-trees.
//!
//! This crate replaces the exhaustive `O(N^k)` evaluation of pairwise and
//! three-point sums with a recursive traversal over [`canopy_kdtree`] trees
//! that bounds the contribution of whole node tuples and skips work once an
//! error budget is provably met.
//!
//! - [`Kde`]: kernel density estimation (two trees, or one tree queried
//!   against itself).
//! - [`ThreeBody`]: Axilrod-Teller three-body potentials (one tree in three
//!   positions).
//! - [`engine`]: the generic traversal, driven by a [`Problem`] strategy, for
//!   writing further problems of arity one to three.
//! - [`naive`]: exhaustive evaluators for checking results on small inputs.
//!
//! # Example
//!
//! ```rust
//! use canopy_dualtree::{Kde, KdeConfig, Kernel, PointSet, Tolerance, naive};
//!
//! let rows: Vec<[f64; 2]> = (0..200)
//!     .map(|i| {
//!         let t = f64::from(i) * 0.1;
//!         [t.cos() * t, t.sin() * t]
//!     })
//!     .collect();
//! let points = PointSet::from_rows(&rows).unwrap();
//!
//! let config = KdeConfig::new(0.5)
//!     .with_kernel(Kernel::Gaussian)
//!     .with_tolerance(Tolerance::new(0.0, 0.01));
//! let kde = Kde::new(points.clone(), config).unwrap();
//! let est = kde.estimate_reference();
//!
//! let exact = naive::kde(&points, None, &points, config.kernel, config.bandwidth).unwrap();
//! assert!(naive::max_relative_error(&est.values, &exact) <= 0.01 + 1e-9);
//! assert!(est.is_fully_accounted());
//! ```
//!
//! ## Error guarantees
//!
//! Every pruning decision spends at most a node tuple's share of the
//! remaining per-point budget, in proportion to the number of combinations it
//! accounts for. The budget of a point is `absolute + relative * m`, where `m`
//! is a lower bound on the point's magnitude that only grows as work
//! completes, so the final error never exceeds `absolute + relative * m` for
//! the true magnitude `m`. With a zero tolerance only contributions with
//! exactly known values are committed and the result matches the exhaustive
//! sum up to rounding.
//!
//! The `probability` fields of the configurations are validated but the
//! bounds used are deterministic, so they hold with probability one.
//!
//! ## Features
//!
//! - `std` (enabled by default): float functions from the standard library.
//! - `libm`: float functions from `libm`, for `no_std` builds.
//!
//! One of the two must be enabled. This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("canopy_dualtree requires either the `std` or `libm` feature");

mod config;
pub mod engine;
mod error;
mod estimates;
pub mod kde;
mod kernel;
pub mod naive;
pub mod three_body;

pub use canopy_kdtree::{Interval, KdTree, PointSet, TreeError};
pub use config::{KdeConfig, ThreeBodyConfig, Tolerance};
pub use engine::{Positions, Problem, Traversal, TraversalStats};
pub use error::Error;
pub use estimates::Estimates;
pub use kde::Kde;
pub use kernel::Kernel;
pub use three_body::ThreeBody;
