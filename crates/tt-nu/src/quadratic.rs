//! Neutrino reconstruction from the W-boson mass constraint.
//!
//! The neutrino transverse momentum is identified with the measured MET and its mass is set to
//! zero. Requiring `m(l + nu) = m_W` then gives a quadratic equation for the longitudinal
//! momentum:
//!
//! `a pz^2 + b pz + c = 0`, with
//!
//! - `lambda = (m_W^2 - m_l^2 + 2 (MET_x l_x + MET_y l_y)) / (2 E_l)`
//! - `a = 1 - (l_z / E_l)^2`
//! - `b = -2 (l_z / E_l) lambda`
//! - `c = MET^2 - lambda^2`
//!
//! When the discriminant is negative the MET magnitude is rescaled, keeping its direction in
//! the transverse plane, by the smallest amount that makes the discriminant vanish.

use tt_core::{FourMomentum, Met};

/// W-boson mass used by default, GeV.
pub const W_MASS: f64 = 80.419;

/// Coefficients of the quadratic equation for the neutrino `pz`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticCoefficients {
    /// Coefficient of `pz^2`.
    pub a: f64,
    /// Coefficient of `pz`.
    pub b: f64,
    /// Constant term.
    pub c: f64,
}

impl QuadraticCoefficients {
    /// `b^2 - 4ac`.
    #[inline]
    pub fn discriminant(&self) -> f64 {
        self.b * self.b - 4.0 * self.a * self.c
    }
}

/// Which case of the solution procedure produced the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadraticBranch {
    /// `a == 0`: the equation is linear.
    Linear,
    /// Positive discriminant: two solutions.
    TwoSolutions,
    /// Zero discriminant: one solution.
    SingleSolution,
    /// Negative discriminant: MET magnitude adjusted, one solution.
    AdjustedMet,
    /// No physical solution.
    NoSolution,
}

/// Full outcome of [`WMassSolver::solve_detailed`].
#[derive(Debug, Clone, PartialEq)]
pub struct WMassSolution {
    /// Branch taken.
    pub branch: QuadraticBranch,
    /// Coefficients computed with the measured MET.
    pub coefficients: QuadraticCoefficients,
    /// MET used to build the candidates (differs from the input only for
    /// [`QuadraticBranch::AdjustedMet`]).
    pub met: Met,
    /// Neutrino candidates (0, 1 or 2).
    pub candidates: Vec<FourMomentum>,
}

/// Solver for the neutrino `pz` under the W-mass constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WMassSolver {
    w_mass: f64,
}

impl Default for WMassSolver {
    fn default() -> Self {
        Self { w_mass: W_MASS }
    }
}

impl WMassSolver {
    /// Create a solver with the given W-boson mass hypothesis.
    pub fn new(w_mass: f64) -> Self {
        Self { w_mass }
    }

    /// W-boson mass hypothesis.
    pub fn w_mass(&self) -> f64 {
        self.w_mass
    }

    /// Coefficients of the `pz` equation for the given lepton and MET.
    pub fn coefficients(&self, lepton: &FourMomentum, met: &Met) -> QuadraticCoefficients {
        let e = lepton.e;
        let r = lepton.pz / e;
        let lambda = (self.w_mass * self.w_mass - lepton.mass().powi(2)
            + 2.0 * (met.px * lepton.px + met.py * lepton.py))
            / (2.0 * e);

        QuadraticCoefficients {
            a: 1.0 - r * r,
            b: -2.0 * r * lambda,
            c: met.px * met.px + met.py * met.py - lambda * lambda,
        }
    }

    /// Reconstruct neutrino candidates. An empty list means the reconstruction failed.
    pub fn solve(&self, lepton: &FourMomentum, met: &Met) -> Vec<FourMomentum> {
        self.solve_detailed(lepton, met).candidates
    }

    /// Reconstruct neutrino candidates and report how they were obtained.
    pub fn solve_detailed(&self, lepton: &FourMomentum, met: &Met) -> WMassSolution {
        let coefficients = self.coefficients(lepton, met);
        let QuadraticCoefficients { a, b, c } = coefficients;

        let mut out = WMassSolution {
            branch: QuadraticBranch::NoSolution,
            coefficients,
            met: *met,
            candidates: Vec::new(),
        };

        if a == 0.0 {
            // Massless lepton along the beam axis.
            if b != 0.0 {
                out.branch = QuadraticBranch::Linear;
                out.candidates.push(FourMomentum::from_p3_massless(met.px, met.py, -c / b));
            }
            return out;
        }

        let discriminant = coefficients.discriminant();

        if discriminant > 0.0 {
            let sqrt_d = discriminant.sqrt();
            out.branch = QuadraticBranch::TwoSolutions;
            out.candidates.push(FourMomentum::from_p3_massless(
                met.px,
                met.py,
                (-b - sqrt_d) / (2.0 * a),
            ));
            out.candidates.push(FourMomentum::from_p3_massless(
                met.px,
                met.py,
                (-b + sqrt_d) / (2.0 * a),
            ));
            return out;
        }

        if discriminant == 0.0 {
            out.branch = QuadraticBranch::SingleSolution;
            out.candidates.push(FourMomentum::from_p3_massless(met.px, met.py, -b / (2.0 * a)));
            return out;
        }

        let Some(adjusted_pt) = self.adjusted_met_pt(lepton, met) else {
            log::trace!(
                "W-mass neutrino solver: no positive MET gives a real solution (MET = {:.3})",
                met.pt()
            );
            return out;
        };

        let met_pt = met.pt();
        let adjusted = Met::new(met.px / met_pt * adjusted_pt, met.py / met_pt * adjusted_pt);
        let adjusted_coefficients = self.coefficients(lepton, &adjusted);
        let pz = -adjusted_coefficients.b / (2.0 * adjusted_coefficients.a);

        log::trace!(
            "W-mass neutrino solver: MET adjusted from {:.3} to {:.3}",
            met_pt,
            adjusted_pt
        );

        out.branch = QuadraticBranch::AdjustedMet;
        out.met = adjusted;
        out.candidates.push(FourMomentum::from_p3_massless(adjusted.px, adjusted.py, pz));
        out
    }

    /// MET magnitude along the measured direction that makes the discriminant vanish.
    ///
    /// Solves `u m^2 + v m + w = 0`, where `g` is the projection of the lepton transverse
    /// momentum on the MET direction:
    ///
    /// - `u = (l_z / E)^2 + (g / E)^2 - 1`
    /// - `v = g (m_W^2 - m_l^2) / E^2`
    /// - `w = ((m_W^2 - m_l^2) / (2E))^2`
    ///
    /// Returns the positive root closest to the measured MET, or `None` if there is none.
    fn adjusted_met_pt(&self, lepton: &FourMomentum, met: &Met) -> Option<f64> {
        let met_pt = met.pt();
        if met_pt == 0.0 {
            return None;
        }

        let e = lepton.e;
        let g = (lepton.px * met.px + lepton.py * met.py) / met_pt;
        let delta = self.w_mass * self.w_mass - lepton.mass().powi(2);

        let u = (lepton.pz / e).powi(2) + (g / e).powi(2) - 1.0;
        let v = g * delta / (e * e);
        let w = (delta / (2.0 * e)).powi(2);

        if u == 0.0 {
            if v == 0.0 {
                return None;
            }
            let m = -w / v;
            return (m > 0.0).then_some(m);
        }

        let discriminant = v * v - 4.0 * u * w;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_d = discriminant.sqrt();
        let m1 = (-v - sqrt_d) / (2.0 * u);
        let m2 = (-v + sqrt_d) / (2.0 * u);

        match (m1 > 0.0, m2 > 0.0) {
            (true, true) => {
                if (met_pt - m1).abs() < (met_pt - m2).abs() {
                    Some(m1)
                } else {
                    Some(m2)
                }
            }
            (true, false) => Some(m1),
            (false, true) => Some(m2),
            (false, false) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lepton(pt: f64, eta: f64, phi: f64) -> FourMomentum {
        FourMomentum::from_pt_eta_phi_m(pt, eta, phi, 0.105)
    }

    #[test]
    fn test_central_lepton_reference_roots() {
        // eta = 0 => l_z = 0 => a = 1, b = 0, pz = +-sqrt(lambda^2 - MET^2).
        let l = FourMomentum::from_pt_eta_phi_m(40.0, 0.0, 0.0, 0.0);
        let met = Met::new(30.0, 0.0);
        let solver = WMassSolver::default();

        let lambda = (W_MASS * W_MASS + 2.0 * 30.0 * 40.0) / (2.0 * 40.0);
        let reference = (lambda * lambda - 900.0).sqrt();

        let coeff = solver.coefficients(&l, &met);
        assert_eq!(coeff.a, 1.0);
        assert_eq!(coeff.b, 0.0);
        assert_relative_eq!(coeff.c, 900.0 - lambda * lambda, max_relative = 1e-12);

        let sol = solver.solve_detailed(&l, &met);
        assert_eq!(sol.branch, QuadraticBranch::TwoSolutions);
        assert_eq!(sol.candidates.len(), 2);
        assert_relative_eq!(sol.candidates[0].pz, -reference, max_relative = 1e-9);
        assert_relative_eq!(sol.candidates[1].pz, reference, max_relative = 1e-9);
    }

    #[test]
    fn test_two_solutions_satisfy_w_mass() {
        let l = lepton(35.0, -1.2, 2.0);
        let met = Met::new(20.0, -15.0);
        let nus = WMassSolver::default().solve(&l, &met);
        assert_eq!(nus.len(), 2);
        for nu in nus {
            assert_relative_eq!((l + nu).mass(), W_MASS, max_relative = 1e-9);
            assert_eq!(nu.px, 20.0);
            assert_eq!(nu.py, -15.0);
            assert_relative_eq!(nu.mass2(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_negative_discriminant_adjusts_met_magnitude_only() {
        // Transverse mass well above m_W.
        let l = lepton(40.0, 0.5, 0.0);
        let met = Met::new(-100.0, 20.0);
        let solver = WMassSolver::default();
        assert!(solver.coefficients(&l, &met).discriminant() < 0.0);

        let sol = solver.solve_detailed(&l, &met);
        assert_eq!(sol.branch, QuadraticBranch::AdjustedMet);
        assert_eq!(sol.candidates.len(), 1);

        let nu = sol.candidates[0];
        assert_relative_eq!(nu.phi(), met.phi(), epsilon = 1e-12);
        assert!(nu.pt() < met.pt());

        // The adjusted MET makes the discriminant vanish, so the mass constraint holds.
        let adj = solver.coefficients(&l, &sol.met);
        assert!(adj.discriminant().abs() <= 1e-9 * adj.b * adj.b + 1e-6);
        assert_relative_eq!((l + nu).mass(), W_MASS, max_relative = 1e-7);
    }

    #[test]
    fn test_linear_case_for_lepton_along_beam() {
        let l = FourMomentum::new(0.0, 0.0, 50.0, 50.0);
        let met = Met::new(30.0, 0.0);
        let sol = WMassSolver::default().solve_detailed(&l, &met);
        assert_eq!(sol.branch, QuadraticBranch::Linear);
        assert_eq!(sol.candidates.len(), 1);
        assert_relative_eq!((l + sol.candidates[0]).mass(), W_MASS, max_relative = 1e-9);
    }

    #[test]
    fn test_custom_w_mass() {
        let l = lepton(50.0, 0.3, 1.0);
        let met = Met::new(10.0, 35.0);
        let solver = WMassSolver::new(75.0);
        for nu in solver.solve(&l, &met) {
            assert_relative_eq!((l + nu).mass(), 75.0, max_relative = 1e-7);
        }
    }
}
