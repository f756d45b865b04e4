//! # tt-core
//!
//! Shared building blocks for ttreco: four-momentum arithmetic, the reconstructed physics
//! objects (jets, leptons, MET) consumed by the reconstruction, and the common error type.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod kinematics;
pub mod objects;

pub use error::{Error, Result};
pub use kinematics::{FourMomentum, wrap_phi};
pub use objects::{BTagWorkingPoint, Jet, Lepton, LeptonFlavour, Met, MetCovariance};
