//! Reconstructed physics objects consumed by the reconstruction.

use crate::kinematics::FourMomentum;
use serde::{Deserialize, Serialize};

/// B-tagging working point: a jet with discriminant strictly above `threshold` is tagged.
///
/// The threshold itself comes from the experiment's calibration service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BTagWorkingPoint {
    /// Discriminant threshold.
    pub threshold: f64,
}

impl BTagWorkingPoint {
    /// Create a working point with the given threshold.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

/// A reconstructed jet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Jet {
    /// Four-momentum.
    pub p4: FourMomentum,
    /// B-tagging discriminant.
    #[serde(default)]
    pub b_tag: f64,
}

impl Jet {
    /// Create a jet from its four-momentum and b-tag discriminant.
    pub fn new(p4: FourMomentum, b_tag: f64) -> Self {
        Self { p4, b_tag }
    }

    /// Convenience constructor from `(pt, eta, phi, m)`.
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, m: f64, b_tag: f64) -> Self {
        Self { p4: FourMomentum::from_pt_eta_phi_m(pt, eta, phi, m), b_tag }
    }

    /// Transverse momentum.
    #[inline]
    pub fn pt(&self) -> f64 {
        self.p4.pt()
    }

    /// Pseudorapidity.
    #[inline]
    pub fn eta(&self) -> f64 {
        self.p4.eta()
    }

    /// Whether the jet passes the given b-tagging working point.
    #[inline]
    pub fn is_b_tagged(&self, wp: &BTagWorkingPoint) -> bool {
        self.b_tag > wp.threshold
    }
}

/// Charged lepton flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeptonFlavour {
    /// Electron.
    Electron,
    /// Muon.
    Muon,
}

/// A reconstructed charged lepton.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lepton {
    /// Four-momentum.
    pub p4: FourMomentum,
    /// Flavour.
    pub flavour: LeptonFlavour,
}

impl Lepton {
    /// Create a lepton.
    pub fn new(p4: FourMomentum, flavour: LeptonFlavour) -> Self {
        Self { p4, flavour }
    }
}

/// Missing transverse momentum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Met {
    /// x component.
    pub px: f64,
    /// y component.
    pub py: f64,
}

impl Met {
    /// Create from Cartesian components.
    pub fn new(px: f64, py: f64) -> Self {
        Self { px, py }
    }

    /// Create from magnitude and azimuth.
    pub fn from_pt_phi(pt: f64, phi: f64) -> Self {
        Self { px: pt * phi.cos(), py: pt * phi.sin() }
    }

    /// Magnitude.
    #[inline]
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    /// Azimuth.
    #[inline]
    pub fn phi(&self) -> f64 {
        self.py.atan2(self.px)
    }
}

/// Covariance of the measured MET components.
///
/// Elements of the 2x2 matrix `[[var_x, cov_xy], [cov_xy, var_y]]`. The identity turns the
/// Mahalanobis distance used by the ellipse neutrino solver into the Euclidean one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetCovariance {
    /// Variance of the x component.
    pub var_x: f64,
    /// Variance of the y component.
    pub var_y: f64,
    /// Covariance between x and y.
    pub cov_xy: f64,
}

impl MetCovariance {
    /// Create a covariance matrix from its elements.
    pub fn new(var_x: f64, var_y: f64, cov_xy: f64) -> Self {
        Self { var_x, var_y, cov_xy }
    }

    /// Covariance from the standard errors of the components and their correlation `rho`.
    pub fn from_errors(err_x: f64, err_y: f64, rho: f64) -> Self {
        Self { var_x: err_x * err_x, var_y: err_y * err_y, cov_xy: rho * err_x * err_y }
    }

    /// Unit covariance.
    pub const fn identity() -> Self {
        Self { var_x: 1.0, var_y: 1.0, cov_xy: 0.0 }
    }

    /// Determinant.
    pub fn determinant(&self) -> f64 {
        self.var_x * self.var_y - self.cov_xy * self.cov_xy
    }

    /// Inverse matrix, row-major. `None` unless the matrix is positive definite.
    pub fn inverse(&self) -> Option<[[f64; 2]; 2]> {
        let det = self.determinant();
        if !(det.is_finite() && det > 0.0 && self.var_x > 0.0) {
            return None;
        }
        Some([[self.var_y / det, -self.cov_xy / det], [-self.cov_xy / det, self.var_x / det]])
    }
}

impl Default for MetCovariance {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_b_tag_threshold_is_strict() {
        let wp = BTagWorkingPoint::new(0.5);
        let at = Jet::from_pt_eta_phi_m(30.0, 0.0, 0.0, 5.0, 0.5);
        let above = Jet::from_pt_eta_phi_m(30.0, 0.0, 0.0, 5.0, 0.51);
        assert!(!at.is_b_tagged(&wp));
        assert!(above.is_b_tagged(&wp));
    }

    #[test]
    fn test_met_polar() {
        let met = Met::from_pt_phi(50.0, -0.3);
        assert_relative_eq!(met.pt(), 50.0, epsilon = 1e-12);
        assert_relative_eq!(met.phi(), -0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_inverse() {
        let cov = MetCovariance::new(4.0, 9.0, 1.5);
        let inv = cov.inverse().unwrap();
        // C * C^-1 = 1
        assert_relative_eq!(4.0 * inv[0][0] + 1.5 * inv[1][0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(4.0 * inv[0][1] + 1.5 * inv[1][1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(1.5 * inv[0][1] + 9.0 * inv[1][1], 1.0, epsilon = 1e-12);

        assert!(MetCovariance::new(1.0, 1.0, 1.0).inverse().is_none());
        assert_eq!(MetCovariance::identity().inverse(), Some([[1.0, 0.0], [0.0, 1.0]]));
    }

    #[test]
    fn test_covariance_from_errors() {
        let cov = MetCovariance::from_errors(2.0, 3.0, 0.5);
        assert_relative_eq!(cov.var_x, 4.0, epsilon = 1e-12);
        assert_relative_eq!(cov.var_y, 9.0, epsilon = 1e-12);
        assert_relative_eq!(cov.cov_xy, 3.0, epsilon = 1e-12);
        assert_relative_eq!(cov.determinant(), 27.0, epsilon = 1e-12);

        assert_eq!(MetCovariance::from_errors(1.0, 1.0, 0.0), MetCovariance::identity());
        // Full correlation is singular.
        assert!(MetCovariance::from_errors(2.0, 3.0, 1.0).inverse().is_none());
    }

    #[test]
    fn test_jet_deserializes_without_b_tag() {
        let jet: Jet =
            serde_json::from_str(r#"{"p4": {"px": 30.0, "py": 0.0, "pz": 0.0, "e": 31.0}}"#)
                .unwrap();
        assert_eq!(jet.b_tag, 0.0);
        assert_relative_eq!(jet.pt(), 30.0);
    }
}
