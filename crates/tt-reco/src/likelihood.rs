//! Ranking by a likelihood built from binned densities.
//!
//! The neutrino is reconstructed with the ellipse solver for the leptonic b candidate, and the
//! rank of an assignment is
//!
//! `ln p_nu(d) + ln p_m(m(q1 + q2), m(b_had + q1 + q2))`
//!
//! with `d` the distance between the neutrino and the MET in the transverse plane. Assignments
//! whose neutrino cannot be reconstructed, or whose inputs fall outside either table, are
//! rejected.
//!
//! The neutrino only depends on the leptonic b jet, so its outcome is cached per jet for the
//! duration of an event. Rejections are cached as well, which makes the cached and uncached
//! computations identical, including the failure diagnostics.

use crate::assignment::JetAssignment;
use crate::config::LikelihoodConfig;
use crate::event::EventView;
use crate::strategy::{RankContext, RankStrategy, ReconstructionStatus};
use tt_core::{FourMomentum, MetCovariance, Result};
use tt_nu::EllipseSolver;

/// What the neutrino reconstruction gave for one leptonic b candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
enum NeutrinoOutcome {
    /// No solution ellipse.
    Unreconstructable,
    /// Distance outside the neutrino table.
    OutOfRange,
    /// Neutrino and its log-density.
    InRange { p4: FourMomentum, log_density: f64 },
}

/// Likelihood rank strategy.
#[derive(Debug, Clone)]
pub struct LikelihoodStrategy {
    config: LikelihoodConfig,
    use_cache: bool,
    lepton: Option<FourMomentum>,
    neutrino: Option<FourMomentum>,
    /// Indexed by jet index in the event.
    cache: Vec<Option<NeutrinoOutcome>>,
    neutrino_reconstructed: bool,
    neutrino_likelihood_in_range: bool,
    mass_likelihood_in_range: bool,
}

impl LikelihoodStrategy {
    /// Strategy with the given tables and mass hypotheses; the neutrino cache is enabled.
    pub fn new(config: LikelihoodConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            use_cache: true,
            lepton: None,
            neutrino: None,
            cache: Vec::new(),
            neutrino_reconstructed: false,
            neutrino_likelihood_in_range: false,
            mass_likelihood_in_range: false,
        })
    }

    /// Enable or disable the neutrino cache.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    /// Configuration.
    pub fn config(&self) -> &LikelihoodConfig {
        &self.config
    }

    /// Whether the neutrino cache is used.
    pub fn cache_enabled(&self) -> bool {
        self.use_cache
    }

    fn reconstruct_neutrino(
        &mut self,
        event: &EventView<'_>,
        lepton: &FourMomentum,
        b_jet: &FourMomentum,
    ) -> NeutrinoOutcome {
        let solver = EllipseSolver::new(lepton, b_jet, self.config.w_mass, self.config.top_mass);
        if !solver.is_reconstructable() {
            return NeutrinoOutcome::Unreconstructable;
        }

        let covariance = if self.config.use_event_met_covariance {
            event.met_covariance
        } else {
            MetCovariance::identity()
        };
        let Some(best) = solver.get_best(&event.met, &covariance) else {
            return NeutrinoOutcome::Unreconstructable;
        };
        self.neutrino_reconstructed = true;

        match self.config.neutrino_table.log_density(best.distance()) {
            Some(log_density) => {
                self.neutrino_likelihood_in_range = true;
                NeutrinoOutcome::InRange { p4: best.p4, log_density }
            }
            None => NeutrinoOutcome::OutOfRange,
        }
    }

    fn neutrino_outcome(
        &mut self,
        event: &EventView<'_>,
        lepton: &FourMomentum,
        b_index: usize,
        b_jet: &FourMomentum,
    ) -> NeutrinoOutcome {
        if !self.use_cache {
            return self.reconstruct_neutrino(event, lepton, b_jet);
        }
        if let Some(Some(cached)) = self.cache.get(b_index) {
            return *cached;
        }
        let outcome = self.reconstruct_neutrino(event, lepton, b_jet);
        if let Some(slot) = self.cache.get_mut(b_index) {
            *slot = Some(outcome);
        }
        outcome
    }
}

impl RankStrategy for LikelihoodStrategy {
    fn begin_event(
        &mut self,
        event: &EventView<'_>,
    ) -> std::result::Result<(), ReconstructionStatus> {
        self.neutrino = None;
        self.neutrino_reconstructed = false;
        self.neutrino_likelihood_in_range = false;
        self.mass_likelihood_in_range = false;
        self.cache.clear();
        self.cache.resize(event.jets.len(), None);

        self.lepton = event.lepton.map(|l| l.p4);
        if self.lepton.is_none() {
            return Err(ReconstructionStatus::NoLeptonOrNeutrino);
        }
        Ok(())
    }

    fn rank(&mut self, event: &EventView<'_>, assignment: &JetAssignment, ctx: RankContext) -> f64 {
        let (Some(lepton), Some([b_lep, b_had, q1, q2])) =
            (self.lepton, assignment.momenta(event.jets))
        else {
            return f64::NEG_INFINITY;
        };

        let (p4_nu, mut log_likelihood) =
            match self.neutrino_outcome(event, &lepton, assignment.b_top_lep, &b_lep) {
                NeutrinoOutcome::InRange { p4, log_density } => (p4, log_density),
                NeutrinoOutcome::Unreconstructable | NeutrinoOutcome::OutOfRange => {
                    return f64::NEG_INFINITY;
                }
            };

        let w = q1 + q2;
        let m_w = w.mass();
        let m_top = (w + b_had).mass();
        match self.config.mass_table.log_density(m_w, m_top) {
            Some(log_density) => {
                self.mass_likelihood_in_range = true;
                log_likelihood += log_density;
            }
            None => return f64::NEG_INFINITY,
        }

        if log_likelihood > ctx.best_rank {
            self.neutrino = Some(p4_nu);
        }
        log_likelihood
    }

    fn end_event(&mut self, found: bool) -> ReconstructionStatus {
        if found {
            ReconstructionStatus::Success
        } else if !self.neutrino_reconstructed {
            ReconstructionStatus::NoValidNeutrinoReconstruction
        } else if !self.neutrino_likelihood_in_range {
            ReconstructionStatus::NeutrinoLikelihoodOutOfRange
        } else if !self.mass_likelihood_in_range {
            ReconstructionStatus::MassLikelihoodOutOfRange
        } else {
            ReconstructionStatus::Unspecified
        }
    }

    fn neutrino(&self) -> Option<FourMomentum> {
        self.neutrino
    }
}
