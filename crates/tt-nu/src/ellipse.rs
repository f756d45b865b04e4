//! Neutrino reconstruction from the top-quark and W-boson mass constraints.
//!
//! Given a charged lepton and the b-quark jet from the same top-quark decay, the two mass
//! constraints `m(l + nu) = m_W` and `m(b + l + nu) = m_t` restrict the neutrino
//! three-momentum to an ellipse (B.A. Betchart, R. Demina, A. Harel, NIM A736 (2014) 169,
//! arXiv:1305.1878). The ellipse is parameterized as
//!
//! `p_nu(t) = H (cos t, sin t, 1)^T`
//!
//! with a 3x3 matrix `H = R^T H~`. `H~` describes the ellipse in a frame where the lepton
//! points along `+x` and the b jet lies in the `xy` half-plane with `y >= 0`; `R` rotates the
//! laboratory frame into that frame. The unique solution is the point of the ellipse whose
//! transverse projection is closest to the measured MET.

use crate::extremum::PeriodicMinimizer;
use nalgebra::{Matrix3, Vector3};
use std::f64::consts::FRAC_PI_2;
use tt_core::{FourMomentum, Met, MetCovariance};

/// Default W-boson mass hypothesis, GeV.
pub const DEFAULT_W_MASS: f64 = 80.0;

/// Default top-quark mass hypothesis, GeV.
pub const DEFAULT_TOP_MASS: f64 = 173.0;

/// Neutrino selected on the ellipse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestNeutrino {
    /// Neutrino four-momentum (massless).
    pub p4: FourMomentum,
    /// Minimized squared distance between the neutrino transverse momentum and the MET,
    /// weighted with the inverse MET covariance.
    pub chi2: f64,
    /// Ellipse parameter of the solution, in `[0, 2pi)`.
    pub t: f64,
}

impl BestNeutrino {
    /// Distance to the MET, `sqrt(chi2)`.
    #[inline]
    pub fn distance(&self) -> f64 {
        self.chi2.sqrt()
    }
}

/// Ellipse solver for one lepton + b-jet pair.
#[derive(Debug, Clone)]
pub struct EllipseSolver {
    w_mass: f64,
    top_mass: f64,
    h: Option<Matrix3<f64>>,
    minimizer: PeriodicMinimizer,
}

impl EllipseSolver {
    /// Build the solution ellipse for the given lepton and b jet.
    ///
    /// Construction never fails; check [`is_reconstructable`](Self::is_reconstructable) before
    /// asking for a solution.
    pub fn new(lepton: &FourMomentum, b_jet: &FourMomentum, w_mass: f64, top_mass: f64) -> Self {
        let h = ellipse_matrix(lepton, b_jet, w_mass, top_mass);
        if h.is_none() {
            log::trace!(
                "ellipse neutrino solver: no solution for m(l+b) = {:.3} (m_t = {top_mass})",
                (*lepton + *b_jet).mass()
            );
        }
        Self { w_mass, top_mass, h, minimizer: PeriodicMinimizer::default() }
    }

    /// Build with `m_W = 80` and `m_t = 173` GeV.
    pub fn with_defaults(lepton: &FourMomentum, b_jet: &FourMomentum) -> Self {
        Self::new(lepton, b_jet, DEFAULT_W_MASS, DEFAULT_TOP_MASS)
    }

    /// Replace the minimizer used by [`get_best`](Self::get_best).
    pub fn with_minimizer(mut self, minimizer: PeriodicMinimizer) -> Self {
        self.minimizer = minimizer;
        self
    }

    /// W-boson mass hypothesis.
    pub fn w_mass(&self) -> f64 {
        self.w_mass
    }

    /// Top-quark mass hypothesis.
    pub fn top_mass(&self) -> f64 {
        self.top_mass
    }

    /// Whether a solution ellipse exists.
    ///
    /// It does not exist when `m(l + b) > m_t`, and also for degenerate inputs (collinear or
    /// zero-momentum lepton and b jet).
    #[inline]
    pub fn is_reconstructable(&self) -> bool {
        self.h.is_some()
    }

    /// The ellipse matrix `H`, if the ellipse exists.
    pub fn ellipse_matrix(&self) -> Option<&Matrix3<f64>> {
        self.h.as_ref()
    }

    /// Neutrino at ellipse parameter `t`.
    pub fn solution(&self, t: f64) -> Option<FourMomentum> {
        let h = self.h.as_ref()?;
        let p = h * Vector3::new(t.cos(), t.sin(), 1.0);
        Some(FourMomentum::from_p3_massless(p.x, p.y, p.z))
    }

    /// Find the point of the ellipse closest to the measured MET.
    ///
    /// The distance is Mahalanobis with the given covariance; the identity gives the Euclidean
    /// distance in the transverse plane. `None` if the ellipse does not exist or the
    /// covariance is not positive definite.
    pub fn get_best(&self, met: &Met, covariance: &MetCovariance) -> Option<BestNeutrino> {
        let h = self.h.as_ref()?;
        let inv = covariance.inverse()?;

        let chi2 = |t: f64| {
            let p = h * Vector3::new(t.cos(), t.sin(), 1.0);
            let dx = met.px - p.x;
            let dy = met.py - p.y;
            dx * (inv[0][0] * dx + inv[0][1] * dy) + dy * (inv[1][0] * dx + inv[1][1] * dy)
        };

        let best = self.minimizer.minimize(chi2)?;
        let p4 = self.solution(best.t)?;
        Some(BestNeutrino { p4, chi2: best.value, t: best.t })
    }

    /// Same as [`get_best`](Self::get_best) with the sentinel convention for failures:
    /// a zero four-vector and a figure of merit of `-1`.
    pub fn get_best_or_zero(&self, met: &Met, covariance: &MetCovariance) -> (FourMomentum, f64) {
        match self.get_best(met, covariance) {
            Some(best) => (best.p4, best.chi2),
            None => (FourMomentum::zero(), -1.0),
        }
    }
}

fn rotation_x(a: f64) -> Matrix3<f64> {
    let (s, c) = a.sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, -s, 0.0, s, c)
}

fn rotation_y(a: f64) -> Matrix3<f64> {
    let (s, c) = a.sin_cos();
    Matrix3::new(c, 0.0, s, 0.0, 1.0, 0.0, -s, 0.0, c)
}

fn rotation_z(a: f64) -> Matrix3<f64> {
    let (s, c) = a.sin_cos();
    Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
}

fn ellipse_matrix(
    lepton: &FourMomentum,
    b_jet: &FourMomentum,
    w_mass: f64,
    top_mass: f64,
) -> Option<Matrix3<f64>> {
    let p_l = lepton.p();
    let p_b = b_jet.p();
    if !(p_l > 0.0 && p_b > 0.0 && lepton.e > 0.0 && b_jet.e > 0.0) {
        return None;
    }

    let angle = lepton.angle(b_jet);
    let (s, c) = angle.sin_cos();
    if s <= 0.0 {
        return None;
    }

    let mw2 = w_mass * w_mass;
    let ml2 = lepton.mass().powi(2);
    let mb2 = b_jet.mass().powi(2);

    let beta_l = p_l / lepton.e;
    let beta_b = p_b / b_jet.e;

    let x0 = -(mw2 - ml2) / (2.0 * lepton.e);
    let x0p = -(top_mass * top_mass - mw2 - mb2) / (2.0 * b_jet.e);
    let eps2 = mw2 * (1.0 - beta_l * beta_l);

    let sx = (x0 * beta_l - p_l * (1.0 - beta_l * beta_l)) / (beta_l * beta_l);
    let sy = (x0p / beta_b - c * sx) / s;

    let omega = (beta_l / beta_b - c) / s;
    let omega2_cap = omega * omega + 1.0 - beta_l * beta_l;
    if !(omega2_cap > 0.0) {
        return None;
    }
    let omega_cap = omega2_cap.sqrt();

    let x1 = sx - (sx + omega * sy) / omega2_cap;
    let y1 = sy - (sx + omega * sy) * omega / omega2_cap;

    let z2 = x1 * x1 * omega2_cap - (sy - omega * sx).powi(2) - (mw2 - x0 * x0 - eps2);
    if !(z2 >= 0.0) {
        return None;
    }
    let z = z2.sqrt();

    #[rustfmt::skip]
    let h_tilde = Matrix3::new(
        z / omega_cap,         0.0, x1 - p_l,
        omega * z / omega_cap, 0.0, y1,
        0.0,                   z,   0.0,
    );

    // Lepton to +x, then the b jet into the xy plane.
    let r_lepton = rotation_y(FRAC_PI_2 - lepton.theta()) * rotation_z(-lepton.phi());
    let b_rot = r_lepton * Vector3::new(b_jet.px, b_jet.py, b_jet.pz);
    let alpha = b_rot.z.atan2(b_rot.y);
    let r = rotation_x(-alpha) * r_lepton;

    let h = r.transpose() * h_tilde;
    h.iter().all(|x| x.is_finite()).then_some(h)
}
