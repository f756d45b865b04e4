//! Observables of the reconstructed top-quark pair.

use crate::assignment::Reconstruction;
use serde::{Deserialize, Serialize};
use tt_core::Result;

/// Per-event summary of the reconstructed `t tbar` system.
///
/// When the reconstruction did not succeed every quantity is zero and only `status_code` is
/// meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TtObservables {
    /// Rank of the best jet assignment.
    pub best_rank: f64,
    /// [`ReconstructionStatus::code`](crate::ReconstructionStatus::code).
    pub status_code: u8,
    /// Mass of the leptonically decaying top quark.
    pub mass_top_lep: f64,
    /// Mass of the hadronically decaying top quark.
    pub mass_top_had: f64,
    /// Mass of the hadronically decaying W boson.
    pub mass_w_had: f64,
    /// Transverse momentum of the leptonic top.
    pub pt_top_lep: f64,
    /// Transverse momentum of the hadronic top.
    pub pt_top_had: f64,
    /// Invariant mass of the pair.
    pub mass_tt: f64,
    /// Transverse momentum of the pair.
    pub pt_tt: f64,
    /// Rapidity of the pair.
    pub rapidity_tt: f64,
    /// Angular separation between the two tops.
    pub delta_r_tt: f64,
    /// Cosine of the angle between the leptonic top in the pair rest frame and the pair
    /// direction in the lab.
    pub cos_top_lep_tt: f64,
}

impl TtObservables {
    /// Compute the observables of a reconstructed event.
    pub fn from_reconstruction(reco: &Reconstruction<'_>) -> Result<Self> {
        let status_code = reco.status().code();
        if !reco.is_success() {
            return Ok(Self { status_code, ..Self::default() });
        }

        let top_lep = reco.top_lep_p4()?;
        let top_had = reco.top_had_p4()?;
        let tt = top_lep + top_had;

        let b = tt.boost_vector();
        let top_lep_rest = top_lep.boosted([-b[0], -b[1], -b[2]]);
        let norm = top_lep_rest.p() * tt.p();
        let cos_top_lep_tt = if norm > 0.0 { top_lep_rest.dot3(&tt) / norm } else { 0.0 };

        Ok(Self {
            best_rank: reco.rank(),
            status_code,
            mass_top_lep: top_lep.mass(),
            mass_top_had: top_had.mass(),
            mass_w_had: reco.w_had_p4()?.mass(),
            pt_top_lep: top_lep.pt(),
            pt_top_had: top_had.pt(),
            mass_tt: tt.mass(),
            pt_tt: tt.pt(),
            rapidity_tt: tt.rapidity(),
            delta_r_tt: top_lep.delta_r(&top_had),
            cos_top_lep_tt,
        })
    }
}
