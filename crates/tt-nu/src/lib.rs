//! # tt-nu
//!
//! Neutrino momentum reconstruction for `t -> b l nu` decays:
//! - [`WMassSolver`]: longitudinal momentum from the W-mass constraint (0, 1 or 2 candidates).
//! - [`EllipseSolver`]: top- and W-mass constraints with the b jet, solution closest to MET.
//! - [`PeriodicMinimizer`]: the deterministic one-dimensional minimizer used on the ellipse.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ellipse;
pub mod extremum;
pub mod quadratic;

pub use ellipse::{BestNeutrino, DEFAULT_TOP_MASS, DEFAULT_W_MASS, EllipseSolver};
pub use extremum::{Extremum, PeriodicMinimizer, minimize_periodic};
pub use quadratic::{
    QuadraticBranch, QuadraticCoefficients, W_MASS, WMassSolution, WMassSolver,
};
