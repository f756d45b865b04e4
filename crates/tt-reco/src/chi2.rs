//! Ranking by a chi-squared of kinematic quantities.
//!
//! The neutrino comes from the W-mass constraint and may have two candidates. Each assignment
//! is scored with the candidate that minimizes the chi-squared, and the rank is `-chi2`.

use crate::assignment::JetAssignment;
use crate::config::{Chi2Config, Chi2Expression, Chi2TermConfig};
use crate::event::EventView;
use crate::strategy::{NeutrinoReconstruction, RankContext, RankStrategy, ReconstructionStatus};
use tt_core::{FourMomentum, Result};
use tt_nu::WMassSolver;

/// Decay products of one interpretation of the event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayProducts {
    /// Charged lepton.
    pub lepton: FourMomentum,
    /// Neutrino.
    pub neutrino: FourMomentum,
    /// b jet from the leptonic top.
    pub b_top_lep: FourMomentum,
    /// b jet from the hadronic top.
    pub b_top_had: FourMomentum,
    /// First light jet.
    pub q1_top_had: FourMomentum,
    /// Second light jet.
    pub q2_top_had: FourMomentum,
}

impl Chi2Expression {
    /// Value of the observable.
    pub fn evaluate(self, p: &DecayProducts) -> f64 {
        match self {
            Self::MassTopLep => (p.lepton + p.neutrino + p.b_top_lep).mass(),
            Self::MassTopHad => (p.b_top_had + p.q1_top_had + p.q2_top_had).mass(),
            Self::MassWHad => (p.q1_top_had + p.q2_top_had).mass(),
            Self::PtTt => (p.lepton
                + p.neutrino
                + p.b_top_lep
                + p.b_top_had
                + p.q1_top_had
                + p.q2_top_had)
                .pt(),
        }
    }
}

impl Chi2TermConfig {
    /// Contribution `((x - mean) / variance)^2`.
    #[inline]
    pub fn evaluate(&self, p: &DecayProducts) -> f64 {
        let x = self.expression.evaluate(p);
        ((x - self.mean) / self.variance).powi(2)
    }
}

/// Chi-squared rank strategy.
#[derive(Debug, Clone)]
pub struct Chi2Strategy {
    terms: Vec<Chi2TermConfig>,
    neutrinos: NeutrinoReconstruction,
    lepton: Option<FourMomentum>,
    min_chi2: f64,
    best_neutrino: Option<usize>,
}

impl Chi2Strategy {
    /// Strategy with the given terms. Fails if a term or the W mass is invalid.
    pub fn new(config: Chi2Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            neutrinos: NeutrinoReconstruction::new(WMassSolver::new(config.w_mass)),
            terms: config.terms,
            lepton: None,
            min_chi2: f64::INFINITY,
            best_neutrino: None,
        })
    }

    /// Append a term.
    pub fn add_term(&mut self, expression: Chi2Expression, mean: f64, variance: f64) -> Result<()> {
        let term = Chi2TermConfig { expression, mean, variance };
        term.validate()?;
        self.terms.push(term);
        Ok(())
    }

    /// Terms in evaluation order.
    pub fn terms(&self) -> &[Chi2TermConfig] {
        &self.terms
    }

    /// Neutrino candidates of the current event.
    pub fn neutrino_candidates(&self) -> &[FourMomentum] {
        self.neutrinos.candidates()
    }

    /// Chi-squared of one interpretation.
    pub fn chi2(&self, products: &DecayProducts) -> f64 {
        self.terms.iter().map(|t| t.evaluate(products)).sum()
    }

    /// Smallest chi-squared seen in the current event.
    pub fn min_chi2(&self) -> f64 {
        self.min_chi2
    }
}

impl RankStrategy for Chi2Strategy {
    fn begin_event(
        &mut self,
        event: &EventView<'_>,
    ) -> std::result::Result<(), ReconstructionStatus> {
        self.min_chi2 = f64::INFINITY;
        self.best_neutrino = None;
        self.lepton = event.lepton.map(|l| l.p4);

        if self.lepton.is_none() || self.neutrinos.reconstruct(event).is_empty() {
            return Err(ReconstructionStatus::NoLeptonOrNeutrino);
        }
        Ok(())
    }

    fn rank(&mut self, event: &EventView<'_>, assignment: &JetAssignment, _: RankContext) -> f64 {
        let (Some(lepton), Some([b_lep, b_had, q1, q2])) =
            (self.lepton, assignment.momenta(event.jets))
        else {
            return f64::NEG_INFINITY;
        };

        let mut min_chi2_here = f64::INFINITY;
        for (i, &neutrino) in self.neutrinos.candidates().iter().enumerate() {
            let products = DecayProducts {
                lepton,
                neutrino,
                b_top_lep: b_lep,
                b_top_had: b_had,
                q1_top_had: q1,
                q2_top_had: q2,
            };
            let chi2: f64 = self.terms.iter().map(|t| t.evaluate(&products)).sum();

            if chi2 < min_chi2_here {
                min_chi2_here = chi2;
            }
            if chi2 < self.min_chi2 {
                self.min_chi2 = chi2;
                self.best_neutrino = Some(i);
            }
        }

        -min_chi2_here
    }

    fn end_event(&mut self, found: bool) -> ReconstructionStatus {
        if found { ReconstructionStatus::Success } else { ReconstructionStatus::Unspecified }
    }

    fn neutrino(&self) -> Option<FourMomentum> {
        self.best_neutrino.and_then(|i| self.neutrinos.candidates().get(i).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::JetAssigner;
    use approx::assert_relative_eq;
    use tt_core::{Jet, Lepton, LeptonFlavour, Met};

    fn products() -> DecayProducts {
        DecayProducts {
            lepton: FourMomentum::from_pt_eta_phi_m(40.0, 0.0, 0.0, 0.0),
            neutrino: FourMomentum::from_p3_massless(30.0, 5.0, 20.0),
            b_top_lep: FourMomentum::from_pt_eta_phi_m(60.0, 0.5, 0.8, 4.8),
            b_top_had: FourMomentum::from_pt_eta_phi_m(70.0, -0.3, 2.5, 4.8),
            q1_top_had: FourMomentum::from_pt_eta_phi_m(50.0, 0.1, -2.0, 0.0),
            q2_top_had: FourMomentum::from_pt_eta_phi_m(35.0, -0.6, -2.9, 0.0),
        }
    }

    #[test]
    fn test_expressions() {
        let p = products();
        assert_relative_eq!(
            Chi2Expression::MassWHad.evaluate(&p),
            (p.q1_top_had + p.q2_top_had).mass()
        );
        assert_relative_eq!(
            Chi2Expression::MassTopLep.evaluate(&p),
            (p.lepton + p.neutrino + p.b_top_lep).mass()
        );
        let total =
            p.lepton + p.neutrino + p.b_top_lep + p.b_top_had + p.q1_top_had + p.q2_top_had;
        assert_relative_eq!(Chi2Expression::PtTt.evaluate(&p), total.pt());
    }

    #[test]
    fn test_term_uses_unsquared_variance() {
        let p = products();
        let mw = Chi2Expression::MassWHad.evaluate(&p);
        let term =
            Chi2TermConfig { expression: Chi2Expression::MassWHad, mean: mw - 6.0, variance: 3.0 };
        assert_relative_eq!(term.evaluate(&p), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_terms_are_rejected() {
        let negative = Chi2Config::new().term(Chi2Expression::PtTt, 0.0, -1.0);
        assert!(Chi2Strategy::new(negative).is_err());
        let mut s = Chi2Strategy::new(Chi2Config::new()).unwrap();
        assert!(s.add_term(Chi2Expression::PtTt, 0.0, 0.0).is_err());
        assert!(s.add_term(Chi2Expression::PtTt, 0.0, 50.0).is_ok());
        assert_eq!(s.terms().len(), 1);
    }

    #[test]
    fn test_no_lepton_aborts() {
        let jets = vec![Jet::from_pt_eta_phi_m(50.0, 0.0, 0.0, 5.0, 0.0); 4];
        let event = EventView::new(&jets, None, Met::new(30.0, 0.0));
        let config = Chi2Config::new().term(Chi2Expression::MassWHad, 80.4, 10.0);
        let mut s = Chi2Strategy::new(config).unwrap();
        let reco = JetAssigner::default().reconstruct(&event, &mut s);
        assert_eq!(reco.status(), ReconstructionStatus::NoLeptonOrNeutrino);
    }

    #[test]
    fn test_best_neutrino_belongs_to_winning_assignment() {
        let jets = vec![
            Jet::from_pt_eta_phi_m(90.0, 0.2, 0.3, 5.0, 0.0),
            Jet::from_pt_eta_phi_m(70.0, -0.5, 2.6, 5.0, 0.0),
            Jet::from_pt_eta_phi_m(55.0, 0.8, -2.0, 5.0, 0.0),
            Jet::from_pt_eta_phi_m(40.0, -1.1, -2.8, 5.0, 0.0),
            Jet::from_pt_eta_phi_m(32.0, 1.4, 1.0, 5.0, 0.0),
        ];
        let lepton = Lepton::new(
            FourMomentum::from_pt_eta_phi_m(45.0, 0.4, -0.6, 0.0),
            LeptonFlavour::Electron,
        );
        let event = EventView::new(&jets, Some(&lepton), Met::new(35.0, -20.0));

        let config = Chi2Config::new()
            .term(Chi2Expression::MassTopLep, 173.0, 25.0)
            .term(Chi2Expression::MassTopHad, 173.0, 20.0)
            .term(Chi2Expression::MassWHad, 80.4, 10.0);
        let mut s = Chi2Strategy::new(config).unwrap();
        let reco = JetAssigner::default().reconstruct(&event, &mut s);
        assert!(reco.is_success());

        // The event-wide best candidate gives the winning rank when plugged into the winner.
        let a = reco.assignment().unwrap();
        let [b_lep, b_had, q1, q2] = a.momenta(&jets).unwrap();
        let nu = reco.neutrino().unwrap();
        let chi2 = s.chi2(&DecayProducts {
            lepton: lepton.p4,
            neutrino: nu,
            b_top_lep: b_lep,
            b_top_had: b_had,
            q1_top_had: q1,
            q2_top_had: q2,
        });
        assert_eq!(-chi2, reco.rank());
        assert_eq!(s.min_chi2(), chi2);
        assert!(s.neutrino_candidates().contains(&nu));
    }
}
