//! The rank-strategy interface between the jet-assignment engine and a scoring method.
//!
//! For every event the engine calls [`RankStrategy::begin_event`] once, then
//! [`RankStrategy::rank`] for every jet assignment it enumerates, then
//! [`RankStrategy::end_event`]. A larger rank means a more plausible assignment; `-inf` rejects
//! the assignment.

use crate::assignment::JetAssignment;
use crate::chi2::Chi2Strategy;
use crate::event::EventView;
use crate::likelihood::LikelihoodStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use tt_core::FourMomentum;
use tt_nu::{QuadraticBranch, WMassSolver};

/// Outcome of the reconstruction of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconstructionStatus {
    /// A best assignment with a finite rank was found.
    Success,
    /// Fewer than four jets passed the selection.
    InsufficientJets,
    /// No lepton in the event, or no neutrino candidate from it.
    NoLeptonOrNeutrino,
    /// The neutrino could not be reconstructed for any leptonic b candidate.
    NoValidNeutrinoReconstruction,
    /// Every reconstructed neutrino fell outside the neutrino density table.
    NeutrinoLikelihoodOutOfRange,
    /// Every mass pair fell outside the mass density table.
    MassLikelihoodOutOfRange,
    /// Every assignment was rejected for another reason.
    Unspecified,
}

impl ReconstructionStatus {
    /// Numeric code, 0 for success and then in declaration order.
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::InsufficientJets => 1,
            Self::NoLeptonOrNeutrino => 2,
            Self::NoValidNeutrinoReconstruction => 3,
            Self::NeutrinoLikelihoodOutOfRange => 4,
            Self::MassLikelihoodOutOfRange => 5,
            Self::Unspecified => 6,
        }
    }

    /// Whether the event was reconstructed.
    #[inline]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for ReconstructionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::InsufficientJets => "insufficient jets",
            Self::NoLeptonOrNeutrino => "no lepton or neutrino",
            Self::NoValidNeutrinoReconstruction => "no valid neutrino reconstruction",
            Self::NeutrinoLikelihoodOutOfRange => "neutrino likelihood out of range",
            Self::MassLikelihoodOutOfRange => "mass likelihood out of range",
            Self::Unspecified => "unspecified failure",
        };
        f.write_str(s)
    }
}

/// Engine state visible to [`RankStrategy::rank`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankContext {
    /// Highest rank among the assignments evaluated so far in this event (`-inf` before the
    /// first finite one).
    pub best_rank: f64,
}

/// A method to score jet assignments.
pub trait RankStrategy {
    /// Prepare for a new event.
    ///
    /// Returning an error status aborts the event before any assignment is ranked.
    fn begin_event(&mut self, event: &EventView<'_>) -> Result<(), ReconstructionStatus>;

    /// Rank one assignment. `-inf` (or NaN) rejects it.
    fn rank(&mut self, event: &EventView<'_>, assignment: &JetAssignment, ctx: RankContext) -> f64;

    /// Finish the event.
    ///
    /// `found` tells whether some assignment got a rank above `-inf`. When it did not, the
    /// returned status explains why.
    fn end_event(&mut self, found: bool) -> ReconstructionStatus;

    /// Neutrino associated with the best assignment of the current event.
    fn neutrino(&self) -> Option<FourMomentum>;
}

impl<S: RankStrategy + ?Sized> RankStrategy for Box<S> {
    fn begin_event(&mut self, event: &EventView<'_>) -> Result<(), ReconstructionStatus> {
        (**self).begin_event(event)
    }

    fn rank(&mut self, event: &EventView<'_>, assignment: &JetAssignment, ctx: RankContext) -> f64 {
        (**self).rank(event, assignment, ctx)
    }

    fn end_event(&mut self, found: bool) -> ReconstructionStatus {
        (**self).end_event(found)
    }

    fn neutrino(&self) -> Option<FourMomentum> {
        (**self).neutrino()
    }
}

/// One of the built-in strategies, as selected by a [`RecoConfig`](crate::RecoConfig).
#[derive(Debug, Clone)]
pub enum AnyStrategy {
    /// Chi-squared ranking.
    Chi2(Chi2Strategy),
    /// Likelihood ranking.
    Likelihood(LikelihoodStrategy),
}

impl RankStrategy for AnyStrategy {
    fn begin_event(&mut self, event: &EventView<'_>) -> Result<(), ReconstructionStatus> {
        match self {
            Self::Chi2(s) => s.begin_event(event),
            Self::Likelihood(s) => s.begin_event(event),
        }
    }

    fn rank(&mut self, event: &EventView<'_>, assignment: &JetAssignment, ctx: RankContext) -> f64 {
        match self {
            Self::Chi2(s) => s.rank(event, assignment, ctx),
            Self::Likelihood(s) => s.rank(event, assignment, ctx),
        }
    }

    fn end_event(&mut self, found: bool) -> ReconstructionStatus {
        match self {
            Self::Chi2(s) => s.end_event(found),
            Self::Likelihood(s) => s.end_event(found),
        }
    }

    fn neutrino(&self) -> Option<FourMomentum> {
        match self {
            Self::Chi2(s) => s.neutrino(),
            Self::Likelihood(s) => s.neutrino(),
        }
    }
}

/// Neutrino candidates of an event from the W-mass constraint, computed once per event.
#[derive(Debug, Clone, Default)]
pub struct NeutrinoReconstruction {
    solver: WMassSolver,
    candidates: Vec<FourMomentum>,
}

impl NeutrinoReconstruction {
    /// Use the given solver.
    pub fn new(solver: WMassSolver) -> Self {
        Self { solver, candidates: Vec::new() }
    }

    /// Solve for the event's leading lepton and MET. No lepton gives no candidates.
    pub fn reconstruct(&mut self, event: &EventView<'_>) -> &[FourMomentum] {
        self.candidates.clear();
        if let Some(lepton) = event.lepton {
            let solution = self.solver.solve_detailed(&lepton.p4, &event.met);
            if solution.branch == QuadraticBranch::NoSolution {
                log::debug!("W-mass solver: no neutrino candidate (MET = {:.3})", event.met.pt());
            }
            self.candidates = solution.candidates;
        }
        &self.candidates
    }

    /// Candidates from the last call to [`reconstruct`](Self::reconstruct).
    pub fn candidates(&self) -> &[FourMomentum] {
        &self.candidates
    }

    /// The solver.
    pub fn solver(&self) -> &WMassSolver {
        &self.solver
    }
}
