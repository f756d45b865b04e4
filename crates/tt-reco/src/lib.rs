//! # tt-reco
//!
//! Reconstruction of semileptonic top-quark pair decays, `t tbar -> (b l nu) (b q q')`.
//!
//! - [`JetAssigner`]: selects jets and searches all jet-parton assignments for the best one.
//! - [`RankStrategy`]: scores an assignment. Two are provided: [`Chi2Strategy`] (kinematic
//!   chi-squared with the W-mass neutrino) and [`LikelihoodStrategy`] (binned densities with the
//!   top+W-mass ellipse neutrino).
//! - [`TtObservables`]: derived kinematics of the reconstructed pair.
//! - [`batch`]: parallel processing of many events.
//!
//! ```no_run
//! use tt_reco::{Chi2Config, Chi2Expression, Chi2Strategy, EventView, JetAssigner, JetSelection};
//! # use tt_core::{Jet, Lepton, Met};
//! # fn run(jets: &[Jet], lepton: &Lepton, met: Met) -> tt_core::Result<()> {
//! let mut assigner = JetAssigner::new(JetSelection::new(30.0, 2.4));
//! let mut strategy = Chi2Strategy::new(
//!     Chi2Config::new()
//!         .term(Chi2Expression::MassTopHad, 173.0, 20.0)
//!         .term(Chi2Expression::MassWHad, 80.4, 10.0),
//! )?;
//! let reco = assigner.reconstruct(&EventView::new(jets, Some(lepton), met), &mut strategy);
//! if reco.is_success() {
//!     println!("m(t_had) = {:.1}", reco.top_had_p4()?.mass());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assignment;
pub mod batch;
pub mod chi2;
pub mod config;
pub mod event;
pub mod likelihood;
pub mod observables;
pub mod strategy;
pub mod table;

pub use assignment::{DecayJet, JetAssigner, JetAssignment, Reconstruction};
pub use batch::{EventOutcome, reconstruct_batch, reconstruct_event, reconstruct_sequential};
pub use chi2::{Chi2Strategy, DecayProducts};
pub use config::{
    BTagMode, BTagRequirement, Chi2Config, Chi2Expression, Chi2TermConfig, JetSelection,
    LikelihoodConfig, LikelihoodSource, RecoConfig, StrategyConfig,
};
pub use event::{Event, EventView};
pub use likelihood::LikelihoodStrategy;
pub use observables::TtObservables;
pub use strategy::{
    AnyStrategy, NeutrinoReconstruction, RankContext, RankStrategy, ReconstructionStatus,
};
pub use table::{DensityTable1D, DensityTable2D, TableData, TableSet};
