//! Shared pieces of the distributed-element approximations.

use ecm_core::Real;

use crate::error::{CircuitError, CircuitResult};

/// Lowest sample rate accepted for the simplification heuristic.
const MIN_SAMPLE_RATE: Real = 1e-8;

/// How aggressively short time constants are folded into resistors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SimplificationMode {
    /// Drop branches with τ below a third of the sample interval.
    #[default]
    Standard,
    /// Keep forward Euler stable: drop branches with τ below ~half the interval.
    EulerStability,
}

/// Options controlling when RC terms are truncated.
#[derive(Clone, Copy, Debug)]
pub struct DecompositionOptions {
    /// Sample rate of the surrounding simulation (Hz)
    pub sample_rate: Real,
    pub mode: SimplificationMode,
}

impl Default for DecompositionOptions {
    fn default() -> Self {
        Self {
            sample_rate: 1e6,
            mode: SimplificationMode::default(),
        }
    }
}

impl DecompositionOptions {
    /// Smallest step the solver is expected to take.
    pub fn min_dt(&self) -> CircuitResult<Real> {
        if !self.sample_rate.is_finite() || self.sample_rate <= MIN_SAMPLE_RATE {
            return Err(CircuitError::InvalidSampleRate {
                value: self.sample_rate,
            });
        }
        Ok(1.0 / self.sample_rate)
    }

    /// Relaxation times below this value are replaced by a resistor.
    pub fn simplification_threshold(&self) -> CircuitResult<Real> {
        let min_dt = self.min_dt()?;
        Ok(match self.mode {
            SimplificationMode::Standard => min_dt / 3.0,
            SimplificationMode::EulerStability => 0.50001 * min_dt,
        })
    }
}

/// One explicit RC branch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RcBranch {
    pub resistance: Real,
    pub capacitance: Real,
}

impl RcBranch {
    pub fn tau(&self) -> Real {
        self.resistance * self.capacitance
    }
}

/// RC ladder plus the resistance of all truncated terms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Decomposition {
    pub branches: Vec<RcBranch>,
    pub residual: Option<Real>,
}

impl Decomposition {
    /// Resistance seen at DC: every branch plus the residual.
    pub fn dc_resistance(&self) -> Real {
        self.branches.iter().map(|b| b.resistance).sum::<Real>() + self.residual.unwrap_or(0.0)
    }
}
