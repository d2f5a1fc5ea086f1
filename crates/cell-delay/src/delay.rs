//! The `Delay` enum.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::gamma;
use crate::{DelayError, DelayResult};

/// Speed conversion factor m/s → km/h.
const MPS_TO_KMH: f64 = 3.6;

/// Linear and quadratic coefficients of the speed penalty (per km/h).
const PENALTY_LINEAR: f64 = -9.258e-4;
const PENALTY_QUADRATIC: f64 = 7.357e-5;

/// A transmission delay model.  All values are nanoseconds.
///
/// Deserializes from an internally tagged object, e.g.
///
/// ```json
/// { "type": "GammaRandomDelay", "minDelay": 40, "expDelay": 80 }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Delay {
    /// Always the same delay.
    #[serde(rename = "ConstantDelay")]
    Constant { delay: u64 },

    /// One of `steps` evenly spaced values in `[min_delay, max_delay]`.
    #[serde(rename = "SimpleRandomDelay", rename_all = "camelCase")]
    SimpleRandom { steps: u32, min_delay: u64, max_delay: u64 },

    /// `min_delay` plus a Gamma(2, 2) draw rescaled so that the mean of the
    /// whole delay is `exp_delay`.
    #[serde(rename = "GammaRandomDelay", rename_all = "camelCase")]
    GammaRandom { min_delay: u64, exp_delay: u64 },

    /// [`Delay::GammaRandom`] multiplied by a quadratic penalty on the
    /// node's speed.
    #[serde(rename = "GammaSpeedDelay", rename_all = "camelCase")]
    GammaSpeed { min_delay: u64, exp_delay: u64 },
}

impl Delay {
    /// Check parameter consistency.  Called once when configuration is loaded.
    pub fn validate(&self) -> DelayResult<()> {
        match *self {
            Delay::Constant { .. } => Ok(()),
            Delay::SimpleRandom { min_delay, max_delay, .. } => {
                if min_delay > max_delay {
                    return Err(DelayError::MinAboveMax { min: min_delay, max: max_delay });
                }
                Ok(())
            }
            Delay::GammaRandom { min_delay, exp_delay }
            | Delay::GammaSpeed { min_delay, exp_delay } => {
                if exp_delay < min_delay {
                    return Err(DelayError::ExpectedBelowMin { min: min_delay, exp: exp_delay });
                }
                Ok(())
            }
        }
    }

    /// Lower bound of every value `generate_delay` can return.
    pub fn min_delay(&self) -> u64 {
        match *self {
            Delay::Constant { delay } => delay,
            Delay::SimpleRandom { steps, min_delay, max_delay } => {
                if steps <= 1 {
                    midpoint(min_delay, max_delay)
                } else {
                    min_delay
                }
            }
            Delay::GammaRandom { min_delay, .. } | Delay::GammaSpeed { min_delay, .. } => min_delay,
        }
    }

    /// Draw a delay in nanoseconds.
    ///
    /// A pure function of the parameters, the supplied randomness, and the
    /// node's speed in m/s (only [`Delay::GammaSpeed`] looks at the speed).
    /// Never below [`min_delay`](Self::min_delay).
    pub fn generate_delay<R: Rng + ?Sized>(&self, rng: &mut R, speed_mps: f64) -> u64 {
        match *self {
            Delay::Constant { delay } => delay,
            Delay::SimpleRandom { steps, min_delay, max_delay } => {
                if steps <= 1 {
                    return midpoint(min_delay, max_delay);
                }
                let k = rng.gen_range(0..steps) as u128;
                // At most `max_delay - min_delay`, so it fits back into u64.
                let offset = k * u128::from(max_delay - min_delay) / (steps as u128 - 1);
                min_delay + offset as u64
            }
            Delay::GammaRandom { min_delay, exp_delay } => {
                gamma_delay(rng, min_delay, exp_delay).round() as u64
            }
            Delay::GammaSpeed { min_delay, exp_delay } => {
                let base = gamma_delay(rng, min_delay, exp_delay);
                (base * speed_penalty(speed_mps)).round() as u64
            }
        }
    }
}

impl std::fmt::Display for Delay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delay::Constant { delay } => write!(f, "constant({delay} ns)"),
            Delay::SimpleRandom { steps, min_delay, max_delay } => {
                write!(f, "simpleRandom({min_delay}..={max_delay} ns, {steps} steps)")
            }
            Delay::GammaRandom { min_delay, exp_delay } => {
                write!(f, "gammaRandom(min {min_delay} ns, exp {exp_delay} ns)")
            }
            Delay::GammaSpeed { min_delay, exp_delay } => {
                write!(f, "gammaSpeed(min {min_delay} ns, exp {exp_delay} ns)")
            }
        }
    }
}

#[inline]
fn midpoint(min: u64, max: u64) -> u64 {
    min + (max.saturating_sub(min)) / 2
}

/// Unrounded Gamma delay: `g · 0.25 · (exp − min) + min`.
///
/// `g` has mean `SHAPE · SCALE = 4`, so the factor 0.25 puts the mean of the
/// sum at exactly `exp_delay`.
fn gamma_delay<R: Rng + ?Sized>(rng: &mut R, min_delay: u64, exp_delay: u64) -> f64 {
    let g = gamma::inverse_cdf(rng.r#gen::<f64>());
    let spread = exp_delay.saturating_sub(min_delay) as f64;
    g * (spread / (gamma::SHAPE * gamma::SCALE)) + min_delay as f64
}

/// Quadratic speed penalty factor, never below 1.
///
/// `f(v) = max(1, 1 − 9.258e−4·v + 7.357e−5·v²)` with `v` in km/h.
pub fn speed_penalty(speed_mps: f64) -> f64 {
    let v = speed_mps.abs() * MPS_TO_KMH;
    (1.0 + PENALTY_LINEAR * v + PENALTY_QUADRATIC * v * v).max(1.0)
}
