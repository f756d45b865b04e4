//! Four-momentum arithmetic.
//!
//! Conventions follow the usual collider ones: energies and momenta in GeV, `phi` in
//! `(-pi, pi]`, pseudorapidity `eta = asinh(pz / pt)`.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};

/// A Lorentz four-vector `(px, py, pz, E)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FourMomentum {
    /// x component of the momentum.
    pub px: f64,
    /// y component of the momentum.
    pub py: f64,
    /// z component of the momentum (along the beam).
    pub pz: f64,
    /// Energy.
    pub e: f64,
}

impl FourMomentum {
    /// Build from Cartesian components.
    #[inline]
    pub const fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self { px, py, pz, e }
    }

    /// The zero four-vector.
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Build from transverse momentum, pseudorapidity, azimuth and mass.
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, m: f64) -> Self {
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let e = (px * px + py * py + pz * pz + m * m).sqrt();
        Self { px, py, pz, e }
    }

    /// Build a massless four-vector from a three-momentum (`E = |p|`).
    pub fn from_p3_massless(px: f64, py: f64, pz: f64) -> Self {
        let e = (px * px + py * py + pz * pz).sqrt();
        Self { px, py, pz, e }
    }

    /// Three-momentum as an array.
    #[inline]
    pub fn p3(&self) -> [f64; 3] {
        [self.px, self.py, self.pz]
    }

    /// Squared magnitude of the three-momentum.
    #[inline]
    pub fn p2(&self) -> f64 {
        self.px * self.px + self.py * self.py + self.pz * self.pz
    }

    /// Magnitude of the three-momentum.
    #[inline]
    pub fn p(&self) -> f64 {
        self.p2().sqrt()
    }

    /// Transverse momentum.
    #[inline]
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    /// Azimuthal angle. Zero for a vector along the beam axis.
    #[inline]
    pub fn phi(&self) -> f64 {
        self.py.atan2(self.px)
    }

    /// Polar angle of the three-momentum.
    pub fn theta(&self) -> f64 {
        if self.px == 0.0 && self.py == 0.0 && self.pz == 0.0 {
            0.0
        } else {
            self.pt().atan2(self.pz)
        }
    }

    /// Pseudorapidity. Infinite for a vector along the beam, zero for the null vector.
    pub fn eta(&self) -> f64 {
        let pt = self.pt();
        if pt == 0.0 && self.pz == 0.0 {
            return 0.0;
        }
        (self.pz / pt).asinh()
    }

    /// Rapidity `0.5 ln((E + pz) / (E - pz))`.
    pub fn rapidity(&self) -> f64 {
        0.5 * ((self.e + self.pz) / (self.e - self.pz)).ln()
    }

    /// Invariant mass squared.
    #[inline]
    pub fn mass2(&self) -> f64 {
        self.e * self.e - self.p2()
    }

    /// Invariant mass.
    ///
    /// A space-like vector (negative `m^2`, usually from rounding) gets the negative mass
    /// `-sqrt(-m^2)`.
    pub fn mass(&self) -> f64 {
        let m2 = self.mass2();
        if m2 < 0.0 { -(-m2).sqrt() } else { m2.sqrt() }
    }

    /// Velocity `|p| / E`.
    pub fn beta(&self) -> f64 {
        self.p() / self.e
    }

    /// Boost vector `p / E` that brings a particle at rest to this momentum.
    pub fn boost_vector(&self) -> [f64; 3] {
        [self.px / self.e, self.py / self.e, self.pz / self.e]
    }

    /// Apply a Lorentz boost with velocity `b`.
    pub fn boosted(&self, b: [f64; 3]) -> Self {
        let b2 = b[0] * b[0] + b[1] * b[1] + b[2] * b[2];
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let bp = b[0] * self.px + b[1] * self.py + b[2] * self.pz;
        let gamma2 = if b2 > 0.0 { (gamma - 1.0) / b2 } else { 0.0 };
        let k = gamma2 * bp + gamma * self.e;

        Self {
            px: self.px + k * b[0],
            py: self.py + k * b[1],
            pz: self.pz + k * b[2],
            e: gamma * (self.e + bp),
        }
    }

    /// Dot product of the three-momenta.
    #[inline]
    pub fn dot3(&self, other: &Self) -> f64 {
        self.px * other.px + self.py * other.py + self.pz * other.pz
    }

    /// Opening angle between the three-momenta, in `[0, pi]`. Zero if either is null.
    pub fn angle(&self, other: &Self) -> f64 {
        let norm2 = self.p2() * other.p2();
        if norm2 <= 0.0 {
            return 0.0;
        }
        (self.dot3(other) / norm2.sqrt()).clamp(-1.0, 1.0).acos()
    }

    /// Azimuthal separation wrapped into `[-pi, pi)`.
    pub fn delta_phi(&self, other: &Self) -> f64 {
        wrap_phi(self.phi() - other.phi())
    }

    /// Angular separation `sqrt(d_eta^2 + d_phi^2)`.
    pub fn delta_r(&self, other: &Self) -> f64 {
        let deta = self.eta() - other.eta();
        let dphi = self.delta_phi(other);
        deta.hypot(dphi)
    }
}

/// Wrap an angle into `[-pi, pi)`.
pub fn wrap_phi(phi: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    let r = (phi + PI).rem_euclid(TAU);
    // rem_euclid may round up to exactly TAU for tiny negative inputs.
    if r >= TAU { -PI } else { r - PI }
}

impl Add for FourMomentum {
    type Output = FourMomentum;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.px + rhs.px, self.py + rhs.py, self.pz + rhs.pz, self.e + rhs.e)
    }
}

impl Sub for FourMomentum {
    type Output = FourMomentum;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.px - rhs.px, self.py - rhs.py, self.pz - rhs.pz, self.e - rhs.e)
    }
}

impl Neg for FourMomentum {
    type Output = FourMomentum;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.px, -self.py, -self.pz, -self.e)
    }
}

impl Sum for FourMomentum {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, p| acc + p)
    }
}
