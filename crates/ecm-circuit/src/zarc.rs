//! Zarc element: constant-phase impedance approximated by up to three RC branches.
//!
//! The shape exponent φ selects three ratios from fixed interpolation tables.
//! Branch relaxation times are `τ·tauFactor`, `τ` and `τ/tauFactor`; branch
//! resistances are `rOuter·R`, `rInner·R` and `rOuter·R`. Branches whose
//! relaxation time does not exceed three sample intervals are folded into one
//! residual resistor so the DC resistance is preserved.

use std::sync::Arc;

use ecm_core::{Real, Uid, ValueSource, ensure_finite};
use ecm_system::RowVector;
use tracing::{debug, warn};

use crate::context::SystemContext;
use crate::decomposition::{Decomposition, RcBranch};
use crate::error::{CircuitError, CircuitResult};

/// Anchors of the ratio tables.
const PHI: [Real; 10] = [0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.92, 0.94, 0.96, 1.0];

const TAU_FACTOR: [Real; 10] = [
    39.9742, 21.8364, 13.6186, 9.23106, 6.58365, 4.83194, 4.5502, 4.28597, 4.03746, 3.80306,
];

const R_FACTOR_OUTER: [Real; 10] = [
    0.28084, 0.26535, 0.2446, 0.21576, 0.17431, 0.11057, 0.093487, 0.074352, 0.05276, 0.028198,
];

const R_FACTOR_INNER: [Real; 10] = [
    0.39633, 0.44284, 0.49461, 0.55903, 0.64641, 0.77687, 0.8115, 0.8502, 0.89378, 0.94327,
];

/// Maximum number of explicit branches.
pub const MAX_ZARC_BRANCHES: usize = 3;

fn interpolate(table: &[Real; 10], phi: Real) -> Real {
    if phi.is_nan() {
        return Real::NAN;
    }
    if phi <= PHI[0] {
        return table[0];
    }
    if phi >= PHI[9] {
        return table[9];
    }
    let hi = PHI.partition_point(|&p| p <= phi);
    let lo = hi - 1;
    ecm_core::lerp(PHI[lo], table[lo], PHI[hi], table[hi], phi)
}

/// Ratio between the outer and the middle relaxation time.
pub fn tau_factor(phi: Real) -> Real {
    interpolate(&TAU_FACTOR, phi)
}

/// Resistance share of the middle branch.
pub fn r_factor_inner(phi: Real) -> Real {
    interpolate(&R_FACTOR_INNER, phi)
}

/// Resistance share of each outer branch.
pub fn r_factor_outer(phi: Real) -> Real {
    interpolate(&R_FACTOR_OUTER, phi)
}

/// `(resistance, relaxation time)` of the three branches, slowest first.
fn branch_parameters(tau: Real, resistance: Real, phi: Real) -> [(Real, Real); 3] {
    let tf = tau_factor(phi);
    let outer = r_factor_outer(phi) * resistance;
    let inner = r_factor_inner(phi) * resistance;
    [(outer, tau * tf), (inner, tau), (outer, tau / tf)]
}

#[derive(Clone, Debug)]
pub struct Zarc {
    tau: Arc<ValueSource>,
    resistance: Arc<ValueSource>,
    phi: Arc<ValueSource>,
    sample_interval: Real,
    element_count: usize,
    uids: Vec<Uid>,
    r_values: [Real; 3],
    c_values: [Real; 3],
    tau_values: [Real; 3],
    residual: Real,
}

impl Zarc {
    /// Decide the retained branch count from the lower bounds of τ and φ.
    pub fn new(
        tau: Arc<ValueSource>,
        resistance: Arc<ValueSource>,
        phi: Arc<ValueSource>,
        sample_interval: Real,
    ) -> CircuitResult<Self> {
        if !sample_interval.is_finite() || sample_interval <= 0.0 {
            return Err(CircuitError::InvalidSampleRate {
                value: sample_interval,
            });
        }
        let const_tau = ensure_finite(tau.min_value_of_lookup()?, "zarc tau lower bound")?;
        let phi_min = ensure_finite(phi.min_value_of_lookup()?, "zarc phi lower bound")?;
        let tf = tau_factor(phi_min);

        let candidates = [const_tau * tf, const_tau, const_tau / tf];
        let element_count = candidates
            .iter()
            .filter(|&&t| t > 3.0 * sample_interval)
            .count();

        debug!(
            element_count,
            tau = const_tau,
            sample_interval,
            "zarc decomposition"
        );
        if element_count == 0 {
            warn!(
                tau = const_tau,
                sample_interval, "zarc collapsed to a pure resistance"
            );
        }

        Ok(Self {
            tau,
            resistance,
            phi,
            sample_interval,
            element_count,
            uids: Vec::new(),
            r_values: [0.0; 3],
            c_values: [0.0; 3],
            tau_values: [0.0; 3],
            residual: 0.0,
        })
    }

    /// Number of explicit RC branches (0..=3).
    pub fn number_of_elements(&self) -> usize {
        self.element_count
    }

    pub fn sample_interval(&self) -> Real {
        self.sample_interval
    }

    pub fn uids(&self) -> &[Uid] {
        &self.uids
    }

    /// Branch resistances from the last assembly; the residual sits in the
    /// first slot past the retained branches.
    pub fn r_values(&self) -> &[Real; 3] {
        &self.r_values
    }

    pub fn c_values(&self) -> &[Real; 3] {
        &self.c_values
    }

    pub fn tau_values(&self) -> &[Real; 3] {
        &self.tau_values
    }

    /// Voltage across each retained branch at the solved state.
    pub fn voltage_values(&self, ctx: &SystemContext<'_>) -> Vec<Real> {
        self.uids.iter().map(|&uid| ctx.state_value(uid)).collect()
    }

    /// Branches and residual at the current parameter values.
    pub fn decomposition(&self) -> CircuitResult<Decomposition> {
        let params = self.current_parameters()?;
        let branches = params[..self.element_count]
            .iter()
            .map(|&(r, t)| RcBranch {
                resistance: r,
                capacitance: t / r,
            })
            .collect();
        let residual = (self.element_count < MAX_ZARC_BRANCHES)
            .then(|| params[self.element_count..].iter().map(|(r, _)| r).sum::<Real>());
        Ok(Decomposition { branches, residual })
    }

    fn current_parameters(&self) -> CircuitResult<[(Real, Real); 3]> {
        Ok(branch_parameters(
            self.tau.value()?,
            self.resistance.value()?,
            ensure_finite(self.phi.value()?, "zarc phi")?,
        ))
    }

    pub(crate) fn set_system(&mut self, ctx: &mut SystemContext<'_>) -> CircuitResult<()> {
        self.uids.clear();
        for _ in 0..self.element_count {
            self.uids.push(ctx.new_differential_uid()?);
        }
        Ok(())
    }

    pub(crate) fn voltage(
        &mut self,
        current: &RowVector,
        ctx: &mut SystemContext<'_>,
    ) -> CircuitResult<RowVector> {
        if self.uids.len() != self.element_count {
            return Err(CircuitError::Detached { element: "Zarc" });
        }
        let params = self.current_parameters()?;

        let mut voltage = ctx.zero_row();
        for (i, &uid) in self.uids.iter().enumerate() {
            let (r, tau) = params[i];
            let mut row = current * (r / tau);
            let col = ctx.column(uid);
            row[col] -= 1.0 / tau;
            ctx.add_equations(uid, &row)?;
            voltage[col] += 1.0;

            self.r_values[i] = r;
            self.c_values[i] = tau / r;
            self.tau_values[i] = tau;
        }

        self.residual = params[self.element_count..].iter().map(|(r, _)| r).sum();
        if self.element_count < MAX_ZARC_BRANCHES {
            self.r_values[self.element_count] = self.residual;
        }
        Ok(voltage + current * self.residual)
    }

    pub(crate) fn power(&self, current: Real, ctx: &SystemContext<'_>) -> Real {
        let branches: Real = self
            .uids
            .iter()
            .zip(self.r_values.iter())
            .map(|(&uid, r)| {
                let v = ctx.state_value(uid);
                v * v / r
            })
            .sum();
        branches + current * current * self.residual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_hit_anchors_and_clamp() {
        assert_eq!(tau_factor(0.4), 39.9742);
        assert_eq!(tau_factor(1.0), 3.80306);
        assert_eq!(tau_factor(0.1), 39.9742);
        assert_eq!(tau_factor(1.5), 3.80306);
        assert_eq!(r_factor_inner(0.9), 0.77687);
        assert_eq!(r_factor_outer(0.9), 0.11057);
    }

    #[test]
    fn tables_interpolate_linearly() {
        let mid = tau_factor(0.45);
        assert!((mid - (39.9742 + 21.8364) / 2.0).abs() < 1e-9);
        let mid = r_factor_outer(0.91);
        assert!((mid - (0.11057 + 0.093487) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn nan_phi_does_not_panic() {
        assert!(tau_factor(Real::NAN).is_nan());
        assert!(r_factor_inner(Real::NAN).is_nan());
        assert!(r_factor_outer(Real::NAN).is_nan());
    }

    #[test]
    fn non_finite_phi_state_is_rejected() {
        use ecm_core::{EcmError, Lookup1D, StateCell};

        let c = ValueSource::constant;
        let temperature = StateCell::new(25.0);
        let phi = ValueSource::lookup_1d(
            Lookup1D::new(vec![0.0, 50.0], vec![0.7, 0.9]).unwrap(),
            temperature.clone(),
        );
        let z = Zarc::new(c(1.0), c(2.0), phi, 1e-4).unwrap();
        assert!(z.decomposition().is_ok());

        temperature.set(Real::NAN);
        let err = z.decomposition().unwrap_err();
        assert!(matches!(
            err,
            CircuitError::Value(EcmError::NonFinite { .. })
        ));
    }

    #[test]
    fn invalid_sample_interval() {
        let c = ValueSource::constant;
        for dt in [0.0, -1.0, Real::INFINITY] {
            let err = Zarc::new(c(1.0), c(1.0), c(0.8), dt).unwrap_err();
            assert!(matches!(err, CircuitError::InvalidSampleRate { .. }));
        }
    }

    #[test]
    fn full_decomposition_has_no_residual() {
        let c = ValueSource::constant;
        let z = Zarc::new(c(1.0), c(2.0), c(1.0), 1e-4).unwrap();
        assert_eq!(z.number_of_elements(), 3);
        let d = z.decomposition().unwrap();
        assert_eq!(d.branches.len(), 3);
        assert_eq!(d.residual, None);
        assert!((d.branches[1].tau() - 1.0).abs() < 1e-12);
    }
}
