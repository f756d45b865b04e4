//! Combinatorial jet-parton assignment.
//!
//! [`JetAssigner`] enumerates every way to assign four selected jets to the b quarks from the
//! leptonic and the hadronic top-quark decays and to the two light quarks from the hadronic W
//! decay, asks a [`RankStrategy`] to score each, and keeps the best one. The two light quarks
//! are unordered, so with `N` selected jets there are `N (N-1) (N-2) (N-3) / 2` assignments.

use crate::config::{BTagRequirement, JetSelection};
use crate::event::EventView;
use crate::strategy::{RankContext, RankStrategy, ReconstructionStatus};
use serde::{Deserialize, Serialize};
use tt_core::{Error, FourMomentum, Jet, Lepton, Result};

/// Role of a jet in the `t tbar -> b l nu b q q'` decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecayJet {
    /// b quark from the leptonically decaying top quark.
    BTopLep,
    /// b quark from the hadronically decaying top quark.
    BTopHad,
    /// First light quark from the hadronic W decay (the leading one in pt).
    Q1TopHad,
    /// Second light quark from the hadronic W decay.
    Q2TopHad,
}

/// Indices, into the event's jet slice, of the jets assigned to the four roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JetAssignment {
    /// b jet from the leptonic top.
    pub b_top_lep: usize,
    /// b jet from the hadronic top.
    pub b_top_had: usize,
    /// First light jet from the hadronic W.
    pub q1_top_had: usize,
    /// Second light jet from the hadronic W.
    pub q2_top_had: usize,
}

impl JetAssignment {
    /// Index of the jet playing the given role.
    pub fn index(&self, role: DecayJet) -> usize {
        match role {
            DecayJet::BTopLep => self.b_top_lep,
            DecayJet::BTopHad => self.b_top_had,
            DecayJet::Q1TopHad => self.q1_top_had,
            DecayJet::Q2TopHad => self.q2_top_had,
        }
    }

    /// Jet playing the given role; `None` if the index is out of bounds for `jets`.
    pub fn jet<'a>(&self, jets: &'a [Jet], role: DecayJet) -> Option<&'a Jet> {
        jets.get(self.index(role))
    }

    /// Four-momenta in the order b_lep, b_had, q1, q2.
    pub fn momenta(&self, jets: &[Jet]) -> Option<[FourMomentum; 4]> {
        Some([
            jets.get(self.b_top_lep)?.p4,
            jets.get(self.b_top_had)?.p4,
            jets.get(self.q1_top_had)?.p4,
            jets.get(self.q2_top_had)?.p4,
        ])
    }
}

/// The jet-assignment engine.
///
/// Holds only per-event scratch state, so one instance is reused across events but must not
/// process two events at once.
#[derive(Debug, Clone, Default)]
pub struct JetAssigner {
    selection: JetSelection,
    b_tag_requirement: Option<BTagRequirement>,
    selected: Vec<usize>,
}

impl JetAssigner {
    /// Engine with the given jet selection and no b-tag requirement.
    pub fn new(selection: JetSelection) -> Self {
        Self { selection, b_tag_requirement: None, selected: Vec::new() }
    }

    /// Only consider assignments whose b candidates satisfy `requirement`.
    pub fn with_b_tag_requirement(mut self, requirement: BTagRequirement) -> Self {
        self.b_tag_requirement = Some(requirement);
        self
    }

    /// Jet selection.
    pub fn selection(&self) -> &JetSelection {
        &self.selection
    }

    /// B-tag requirement, if any.
    pub fn b_tag_requirement(&self) -> Option<&BTagRequirement> {
        self.b_tag_requirement.as_ref()
    }

    /// Apply the jet selection and return the indices of the selected jets.
    pub fn select(&mut self, jets: &[Jet]) -> &[usize] {
        self.selected.clear();
        for (i, jet) in jets.iter().enumerate() {
            if jet.eta().abs() > self.selection.max_abs_eta {
                continue;
            }
            if jet.pt() < self.selection.min_pt {
                break;
            }
            self.selected.push(i);
        }
        &self.selected
    }

    /// Reconstruct one event.
    ///
    /// The engine never rejects an event: failures are reported through the status of the
    /// returned [`Reconstruction`].
    pub fn reconstruct<'a, S: RankStrategy + ?Sized>(
        &mut self,
        event: &EventView<'a>,
        strategy: &mut S,
    ) -> Reconstruction<'a> {
        self.select(event.jets);
        let n = self.selected.len();

        let mut reco = Reconstruction {
            status: ReconstructionStatus::Unspecified,
            rank: f64::NEG_INFINITY,
            assignment: None,
            jets: event.jets,
            lepton: event.lepton,
            neutrino: None,
            n_selected: n,
            n_ranked: 0,
        };

        // The strategy's event precondition takes precedence over the jet count.
        if let Err(status) = strategy.begin_event(event) {
            reco.status = status;
            log::debug!("tt reconstruction: {status}");
            return reco;
        }

        if n < 4 {
            reco.status = ReconstructionStatus::InsufficientJets;
            log::debug!("tt reconstruction: {} ({n} selected jets)", reco.status);
            return reco;
        }

        let selected = &self.selected;
        for (i_lep, &b_lep) in selected.iter().enumerate() {
            for (i_had, &b_had) in selected.iter().enumerate() {
                if i_had == i_lep {
                    continue;
                }
                if let Some(req) = &self.b_tag_requirement {
                    if !req.accepts(&event.jets[b_lep], &event.jets[b_had]) {
                        continue;
                    }
                }

                for i_q1 in 0..n {
                    if i_q1 == i_lep || i_q1 == i_had {
                        continue;
                    }
                    // Light jets are unordered: q2 always follows q1 in pt.
                    for i_q2 in (i_q1 + 1)..n {
                        if i_q2 == i_lep || i_q2 == i_had {
                            continue;
                        }

                        let candidate = JetAssignment {
                            b_top_lep: b_lep,
                            b_top_had: b_had,
                            q1_top_had: selected[i_q1],
                            q2_top_had: selected[i_q2],
                        };
                        let rank =
                            strategy.rank(event, &candidate, RankContext { best_rank: reco.rank });
                        reco.n_ranked += 1;

                        if rank > reco.rank {
                            reco.rank = rank;
                            reco.assignment = Some(candidate);
                        }
                    }
                }
            }
        }

        let found = reco.assignment.is_some();
        let diagnosis = strategy.end_event(found);
        reco.status = match (found, diagnosis) {
            (true, _) => ReconstructionStatus::Success,
            (false, ReconstructionStatus::Success) => ReconstructionStatus::Unspecified,
            (false, status) => status,
        };

        if found {
            reco.neutrino = strategy.neutrino();
        } else {
            log::debug!(
                "tt reconstruction: {} ({n} selected jets, {} assignments ranked)",
                reco.status,
                reco.n_ranked
            );
        }
        reco
    }
}

/// Result of [`JetAssigner::reconstruct`] for one event.
///
/// Physics accessors return [`Error::NotReconstructed`] unless the status is
/// [`ReconstructionStatus::Success`].
#[derive(Debug, Clone)]
pub struct Reconstruction<'a> {
    status: ReconstructionStatus,
    rank: f64,
    assignment: Option<JetAssignment>,
    jets: &'a [Jet],
    lepton: Option<&'a Lepton>,
    neutrino: Option<FourMomentum>,
    n_selected: usize,
    n_ranked: usize,
}

impl<'a> Reconstruction<'a> {
    /// Outcome.
    pub fn status(&self) -> ReconstructionStatus {
        self.status
    }

    /// Whether the event was reconstructed.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Rank of the best assignment, `-inf` if there is none.
    pub fn rank(&self) -> f64 {
        self.rank
    }

    /// Number of jets that passed the selection.
    pub fn n_selected_jets(&self) -> usize {
        self.n_selected
    }

    /// Number of assignments passed to the rank strategy.
    pub fn n_ranked(&self) -> usize {
        self.n_ranked
    }

    fn ensure_success(&self) -> Result<()> {
        if self.status.is_success() {
            Ok(())
        } else {
            Err(Error::NotReconstructed(format!("reconstruction status: {}", self.status)))
        }
    }

    /// Best assignment.
    pub fn assignment(&self) -> Result<&JetAssignment> {
        self.ensure_success()?;
        self.assignment
            .as_ref()
            .ok_or_else(|| Error::NotReconstructed("no jet assignment".into()))
    }

    /// Jet playing the given role in the best assignment.
    pub fn jet(&self, role: DecayJet) -> Result<&'a Jet> {
        let assignment = self.assignment()?;
        assignment.jet(self.jets, role).ok_or_else(|| {
            Error::Computation(format!("jet index {} out of bounds", assignment.index(role)))
        })
    }

    /// Lepton from the leptonic top.
    pub fn lepton(&self) -> Result<&'a Lepton> {
        self.ensure_success()?;
        self.lepton.ok_or_else(|| Error::NotReconstructed("no lepton in the event".into()))
    }

    /// Reconstructed neutrino.
    pub fn neutrino(&self) -> Result<FourMomentum> {
        self.ensure_success()?;
        self.neutrino.ok_or_else(|| Error::NotReconstructed("no neutrino reconstructed".into()))
    }

    /// `l + nu + b_lep`.
    pub fn top_lep_p4(&self) -> Result<FourMomentum> {
        Ok(self.lepton()?.p4 + self.neutrino()? + self.jet(DecayJet::BTopLep)?.p4)
    }

    /// `b_had + q1 + q2`.
    pub fn top_had_p4(&self) -> Result<FourMomentum> {
        Ok(self.jet(DecayJet::BTopHad)?.p4 + self.w_had_p4()?)
    }

    /// `q1 + q2`.
    pub fn w_had_p4(&self) -> Result<FourMomentum> {
        Ok(self.jet(DecayJet::Q1TopHad)?.p4 + self.jet(DecayJet::Q2TopHad)?.p4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_core::{LeptonFlavour, Met};

    /// Ranks with a fixed table keyed by assignment, recording every call.
    #[derive(Default)]
    struct Recording {
        calls: Vec<JetAssignment>,
        reject_all: bool,
        abort: Option<ReconstructionStatus>,
    }

    impl RankStrategy for Recording {
        fn begin_event(
            &mut self,
            _: &EventView<'_>,
        ) -> std::result::Result<(), ReconstructionStatus> {
            self.calls.clear();
            self.abort.map_or(Ok(()), Err)
        }

        fn rank(&mut self, _: &EventView<'_>, a: &JetAssignment, _: RankContext) -> f64 {
            self.calls.push(*a);
            if self.reject_all {
                f64::NEG_INFINITY
            } else {
                // Prefers the hadronic b at index 2 and the lepton b at index 0.
                -((a.b_top_had as f64 - 2.0).abs() + a.b_top_lep as f64)
            }
        }

        fn end_event(&mut self, found: bool) -> ReconstructionStatus {
            if found { ReconstructionStatus::Success } else { ReconstructionStatus::Unspecified }
        }

        fn neutrino(&self) -> Option<FourMomentum> {
            Some(FourMomentum::from_p3_massless(10.0, 0.0, 5.0))
        }
    }

    fn jets(pts: &[f64]) -> Vec<Jet> {
        pts.iter()
            .enumerate()
            .map(|(i, &pt)| Jet::from_pt_eta_phi_m(pt, 0.1 * i as f64, 0.5 * i as f64, 5.0, 0.0))
            .collect()
    }

    fn lepton() -> Lepton {
        Lepton::new(FourMomentum::from_pt_eta_phi_m(40.0, 0.0, 0.0, 0.0), LeptonFlavour::Muon)
    }

    #[test]
    fn test_selection_breaks_on_low_pt_and_skips_forward_jets() {
        let mut js = jets(&[100.0, 90.0, 80.0, 20.0, 70.0]);
        js[1] = Jet::from_pt_eta_phi_m(90.0, 3.0, 0.0, 5.0, 0.0);
        let mut assigner = JetAssigner::new(JetSelection::new(30.0, 2.4));
        // Jet 1 is forward, jet 3 ends the scan so jet 4 is never considered.
        assert_eq!(assigner.select(&js), &[0, 2]);
    }

    #[test]
    fn test_four_jets_enumerate_twelve_assignments() {
        let js = jets(&[100.0, 90.0, 80.0, 70.0]);
        let l = lepton();
        let event = EventView::new(&js, Some(&l), Met::new(20.0, 0.0));
        let mut strategy = Recording::default();
        let reco = JetAssigner::default().reconstruct(&event, &mut strategy);
        assert_eq!(reco.n_ranked(), 12);
        assert_eq!(strategy.calls.len(), 12);
        for a in &strategy.calls {
            assert!(a.q1_top_had < a.q2_top_had);
        }
    }

    #[test]
    fn test_best_assignment_and_accessors() {
        let js = jets(&[100.0, 90.0, 80.0, 70.0, 60.0]);
        let l = lepton();
        let event = EventView::new(&js, Some(&l), Met::new(20.0, 0.0));
        let mut strategy = Recording::default();
        let reco = JetAssigner::default().reconstruct(&event, &mut strategy);

        assert_eq!(reco.status(), ReconstructionStatus::Success);
        assert_eq!(reco.rank(), 0.0);
        let a = reco.assignment().unwrap();
        assert_eq!((a.b_top_lep, a.b_top_had), (0, 2));
        // First enumerated light pair wins the tie.
        assert_eq!((a.q1_top_had, a.q2_top_had), (1, 3));

        assert_eq!(reco.jet(DecayJet::BTopHad).unwrap(), &js[2]);
        assert_eq!(reco.w_had_p4().unwrap(), js[1].p4 + js[3].p4);
        assert_eq!(reco.top_had_p4().unwrap(), js[2].p4 + (js[1].p4 + js[3].p4));
        let nu = reco.neutrino().unwrap();
        assert_eq!(reco.top_lep_p4().unwrap(), l.p4 + nu + js[0].p4);
    }

    #[test]
    fn test_insufficient_jets_never_ranks() {
        let js = jets(&[100.0, 90.0, 80.0]);
        let l = lepton();
        let event = EventView::new(&js, Some(&l), Met::default());
        let mut strategy = Recording::default();
        let reco = JetAssigner::default().reconstruct(&event, &mut strategy);
        assert_eq!(reco.status(), ReconstructionStatus::InsufficientJets);
        assert_eq!(reco.n_ranked(), 0);
        assert!(strategy.calls.is_empty());
        assert!(matches!(reco.assignment(), Err(Error::NotReconstructed(_))));
        assert!(matches!(reco.neutrino(), Err(Error::NotReconstructed(_))));
    }

    #[test]
    fn test_event_precondition_precedes_jet_count() {
        let js = jets(&[100.0, 90.0, 80.0]);
        let event = EventView::new(&js, None, Met::default());
        let mut strategy = Recording {
            abort: Some(ReconstructionStatus::NoLeptonOrNeutrino),
            ..Default::default()
        };
        let reco = JetAssigner::default().reconstruct(&event, &mut strategy);
        assert_eq!(reco.status(), ReconstructionStatus::NoLeptonOrNeutrino);
        assert_eq!(reco.n_ranked(), 0);
    }

    #[test]
    fn test_begin_event_failure_aborts() {
        let js = jets(&[100.0, 90.0, 80.0, 70.0]);
        let event = EventView::new(&js, None, Met::default());
        let mut strategy = Recording {
            abort: Some(ReconstructionStatus::NoLeptonOrNeutrino),
            ..Default::default()
        };
        let reco = JetAssigner::default().reconstruct(&event, &mut strategy);
        assert_eq!(reco.status(), ReconstructionStatus::NoLeptonOrNeutrino);
        assert!(strategy.calls.is_empty());
        assert!(reco.lepton().is_err());
    }

    #[test]
    fn test_all_rejected_uses_strategy_diagnosis() {
        let js = jets(&[100.0, 90.0, 80.0, 70.0]);
        let l = lepton();
        let event = EventView::new(&js, Some(&l), Met::default());
        let mut strategy = Recording { reject_all: true, ..Default::default() };
        let reco = JetAssigner::default().reconstruct(&event, &mut strategy);
        assert_eq!(reco.status(), ReconstructionStatus::Unspecified);
        assert_eq!(reco.rank(), f64::NEG_INFINITY);
        assert!(reco.top_had_p4().is_err());
    }
}
