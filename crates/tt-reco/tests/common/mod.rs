#![allow(dead_code)]

use rand::Rng;
use rand::rngs::StdRng;
use std::f64::consts::PI;
use std::sync::Arc;
use tt_core::{FourMomentum, Jet, Lepton, LeptonFlavour, Met};
use tt_reco::{
    DensityTable1D, DensityTable2D, Event, JetAssignment, LikelihoodConfig, RankContext,
    RankStrategy, ReconstructionStatus,
};

/// Semi-realistic event with `n_jets` pt-ordered jets.
pub fn random_event(rng: &mut StdRng, n_jets: usize) -> Event {
    let mut pts: Vec<f64> = (0..n_jets).map(|_| rng.random_range(25.0..250.0)).collect();
    pts.sort_by(|a, b| b.total_cmp(a));

    let jets = pts
        .into_iter()
        .map(|pt| {
            Jet::from_pt_eta_phi_m(
                pt,
                rng.random_range(-2.4..2.4),
                rng.random_range(-PI..PI),
                rng.random_range(0.0..15.0),
                rng.random_range(0.0..1.0),
            )
        })
        .collect();

    let lepton = Lepton::new(
        FourMomentum::from_pt_eta_phi_m(
            rng.random_range(25.0..120.0),
            rng.random_range(-2.1..2.1),
            rng.random_range(-PI..PI),
            0.105,
        ),
        LeptonFlavour::Muon,
    );
    let met = Met::from_pt_phi(rng.random_range(0.0..150.0), rng.random_range(-PI..PI));

    Event::new(jets, Some(lepton), met)
}

/// Likelihood configuration whose tables are flat over a wide domain.
pub fn uniform_tables() -> LikelihoodConfig {
    let nu = DensityTable1D::from_edges_and_contents(vec![0.0, 5.0e4, 1.0e5], vec![2.0, 2.0])
        .expect("valid table");
    let mass = DensityTable2D::from_edges_and_contents(
        vec![0.0, 1.0e4, 2.0e4],
        vec![0.0, 1.0e4, 2.0e4],
        vec![vec![7.0, 7.0], vec![7.0, 7.0]],
    )
    .expect("valid table");
    LikelihoodConfig::new(Arc::new(nu), Arc::new(mass))
}

/// Counts rank calls and gives every assignment the same rank.
#[derive(Debug, Clone, Default)]
pub struct Counting {
    pub calls: Vec<JetAssignment>,
}

impl RankStrategy for Counting {
    fn begin_event(&mut self, _: &tt_reco::EventView<'_>) -> Result<(), ReconstructionStatus> {
        self.calls.clear();
        Ok(())
    }

    fn rank(&mut self, _: &tt_reco::EventView<'_>, a: &JetAssignment, _: RankContext) -> f64 {
        self.calls.push(*a);
        0.0
    }

    fn end_event(&mut self, found: bool) -> ReconstructionStatus {
        if found { ReconstructionStatus::Success } else { ReconstructionStatus::Unspecified }
    }

    fn neutrino(&self) -> Option<FourMomentum> {
        Some(FourMomentum::zero())
    }
}

/// Expected number of assignments for `n` selected jets.
pub fn n_assignments(n: usize) -> usize {
    if n < 4 { 0 } else { n * (n - 1) * (n - 2) * (n - 3) / 2 }
}
