//! Inverse-CDF sampling of the Gamma distribution with shape 2, scale 2.
//!
//! For shape 2 the CDF has the closed form
//!
//! ```text
//! F(x) = 1 - e^(-x/θ) · (1 + x/θ)        θ = SCALE
//! ```
//!
//! but no closed-form inverse, so the quantile is found numerically with a
//! bracketed Newton iteration on `y = x/θ`.  The mean of the distribution is
//! `SHAPE · SCALE = 4`.

pub const SHAPE: f64 = 2.0;
pub const SCALE: f64 = 2.0;

const TOLERANCE: f64 = 1e-12;
const MAX_ITERATIONS: usize = 100;

/// CDF of Gamma(2, 1) at `y`.
#[inline]
fn unit_cdf(y: f64) -> f64 {
    1.0 - (-y).exp() * (1.0 + y)
}

/// Quantile of Gamma(2, 2) for probability `p`.
///
/// `p <= 0` maps to 0.  `p >= 1` is clamped just below 1 so the result stays
/// finite.
pub fn inverse_cdf(p: f64) -> f64 {
    if !(p > 0.0) {
        return 0.0;
    }
    let p = p.min(1.0 - f64::EPSILON);

    // Bracket the root.
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    while unit_cdf(hi) < p {
        lo = hi;
        hi *= 2.0;
    }

    let mut y = 0.5 * (lo + hi);
    for _ in 0..MAX_ITERATIONS {
        let f = unit_cdf(y) - p;
        if f.abs() < TOLERANCE {
            break;
        }
        if f > 0.0 {
            hi = y;
        } else {
            lo = y;
        }
        // pdf of Gamma(2, 1)
        let slope = y * (-y).exp();
        let newton = if slope > 0.0 { y - f / slope } else { f64::NAN };
        y = if newton > lo && newton < hi { newton } else { 0.5 * (lo + hi) };
        if hi - lo < TOLERANCE {
            break;
        }
    }
    y * SCALE
}
