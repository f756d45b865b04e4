//! Deterministic minimization of a function on a periodic domain `[0, 2pi)`.
//!
//! The whole period is scanned on a uniform grid; every grid point that is a local minimum of
//! the sampled values is refined by golden-section search inside its two neighbouring cells. The
//! global best over all refinements (and the raw grid samples) is returned. Ties keep the
//! smallest grid index, so the result only depends on the function values.

use std::f64::consts::TAU;

/// Location and value of a minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    /// Argument in `[0, 2pi)`.
    pub t: f64,
    /// Function value at `t`.
    pub value: f64,
}

/// Grid-plus-golden-section minimizer over one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicMinimizer {
    /// Number of uniform grid points over the period (at least 3).
    pub grid_points: usize,
    /// Width of the golden-section bracket at which refinement stops.
    pub tolerance: f64,
    /// Upper bound on golden-section iterations per refinement.
    pub max_iterations: usize,
}

impl Default for PeriodicMinimizer {
    fn default() -> Self {
        Self { grid_points: 36, tolerance: 1e-10, max_iterations: 200 }
    }
}

impl PeriodicMinimizer {
    /// Find the global minimum of `f` over `[0, 2pi)`.
    ///
    /// Returns `None` if `f` never produced a finite value on the grid.
    pub fn minimize<F: Fn(f64) -> f64>(&self, f: F) -> Option<Extremum> {
        let n = self.grid_points.max(3);
        let step = TAU / n as f64;
        let samples: Vec<f64> = (0..n).map(|i| f(i as f64 * step)).collect();

        let mut best: Option<Extremum> = None;
        let mut consider = |cand: Extremum| {
            if !cand.value.is_finite() {
                return;
            }
            match best {
                Some(b) if cand.value >= b.value => {}
                _ => best = Some(cand),
            }
        };

        for (i, &v) in samples.iter().enumerate() {
            if !v.is_finite() {
                continue;
            }
            let prev = samples[(i + n - 1) % n];
            let next = samples[(i + 1) % n];
            // A NaN neighbour does not prevent a local minimum.
            let not_below = |x: f64| x.is_nan() || x >= v;
            if !(not_below(prev) && not_below(next)) {
                continue;
            }

            let t0 = i as f64 * step;
            let grid = Extremum { t: t0, value: v };
            let refined = self.golden_section(&f, t0 - step, t0 + step);
            match refined {
                Some(r) if r.value < v => consider(r),
                _ => consider(grid),
            }
        }

        best
    }

    fn golden_section<F: Fn(f64) -> f64>(&self, f: &F, lo: f64, hi: f64) -> Option<Extremum> {
        let inv_phi = (5.0f64.sqrt() - 1.0) / 2.0;
        let (mut a, mut b) = (lo, hi);
        let mut c = b - inv_phi * (b - a);
        let mut d = a + inv_phi * (b - a);
        let mut fc = f(c);
        let mut fd = f(d);

        for _ in 0..self.max_iterations {
            if (b - a).abs() < self.tolerance {
                break;
            }
            if fc < fd {
                b = d;
                d = c;
                fd = fc;
                c = b - inv_phi * (b - a);
                fc = f(c);
            } else {
                a = c;
                c = d;
                fc = fd;
                d = a + inv_phi * (b - a);
                fd = f(d);
            }
        }

        let (t, value) = if fc <= fd { (c, fc) } else { (d, fd) };
        value.is_finite().then(|| Extremum { t: t.rem_euclid(TAU), value })
    }
}

/// Minimize with [`PeriodicMinimizer::default`].
pub fn minimize_periodic<F: Fn(f64) -> f64>(f: F) -> Option<Extremum> {
    PeriodicMinimizer::default().minimize(f)
}
