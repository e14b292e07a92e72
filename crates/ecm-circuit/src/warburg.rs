//! Warburg diffusion impedance as a truncated series of parallel RC terms.
//!
//! Both variants return a serial composite. Terms whose relaxation time falls
//! below the simplification threshold end the series; they and every later
//! term are lumped into one residual resistor.

use std::f64::consts::PI;
use std::sync::Arc;

use ecm_core::{Real, ValueSource};
use tracing::{debug, warn};

use crate::decomposition::DecompositionOptions;
use crate::element::CircuitElement;
use crate::error::{CircuitError, CircuitResult};
use crate::leaf::Leaf;

#[derive(Clone, Copy, Debug)]
pub struct WarburgOptions {
    /// Requested number of RC terms
    pub terms: usize,
    pub decomposition: DecompositionOptions,
    /// Append the limiting capacity (cotanh only)
    pub with_capacity: bool,
}

impl Default for WarburgOptions {
    fn default() -> Self {
        Self {
            terms: 5,
            decomposition: DecompositionOptions::default(),
            with_capacity: true,
        }
    }
}

/// Weight of term `n` (1-based) of the tanh series: `1/(2n-1)²`.
///
/// There is no term 0; its weight is 0.
pub fn tanh_weight(n: usize) -> Real {
    if n == 0 {
        return 0.0;
    }
    let k = (2 * n - 1) as Real;
    1.0 / (k * k)
}

/// Weight of term `n` (1-based) of the cotanh series: `4/(nπ)²`.
///
/// There is no term 0; its weight is 0.
pub fn cotanh_weight(n: usize) -> Real {
    if n == 0 {
        return 0.0;
    }
    let k = n as Real * PI;
    4.0 / (k * k)
}

/// Shared ladder construction. `term` maps a weight to `(R_n, τ_n)`.
fn build_ladder(
    label: &'static str,
    terms: usize,
    weight: fn(usize) -> Real,
    base_resistance: &Arc<ValueSource>,
    opts: &DecompositionOptions,
    term: impl Fn(Real) -> CircuitResult<(Arc<ValueSource>, Arc<ValueSource>)>,
) -> CircuitResult<CircuitElement> {
    if terms == 0 {
        return Err(CircuitError::InvalidArgument {
            what: "warburg term count must be positive",
        });
    }
    let threshold = opts.simplification_threshold()?;

    let mut ladder = CircuitElement::serial();
    let mut retained = 0;
    for n in 1..=terms {
        let w = weight(n);
        let (r_n, tau_n) = term(w)?;
        if tau_n.max_value_of_lookup()? < threshold {
            break;
        }
        ladder.add_child(Leaf::parallel_rc(r_n, tau_n).into())?;
        retained = n;
    }

    if retained < terms {
        let residual: Real = (retained + 1..=terms).map(weight).sum();
        ladder.add_child(Leaf::ohmic(ValueSource::scaled(base_resistance.clone(), residual)).into())?;
        if retained == 0 {
            warn!(variant = label, terms, "warburg collapsed to a pure resistance");
        }
    }
    debug!(variant = label, requested = terms, retained, "warburg decomposition");
    Ok(ladder)
}

/// Tanh (finite-length, transmissive) Warburg from `R` and `τ`.
///
/// Term `n` has `R_n = R/(2n-1)²` and `τ_n = τ/(2n-1)²`, so every branch
/// shares the capacitance `τ/R`.
pub fn tanh(
    resistance: Arc<ValueSource>,
    tau: Arc<ValueSource>,
    opts: &WarburgOptions,
) -> CircuitResult<CircuitElement> {
    build_ladder(
        "tanh",
        opts.terms,
        tanh_weight,
        &resistance,
        &opts.decomposition,
        |w| {
            Ok((
                ValueSource::scaled(resistance.clone(), w),
                ValueSource::scaled(tau.clone(), w),
            ))
        },
    )
}

/// Cotanh (finite-length, reflective) Warburg from `σ` and `C_lim`.
///
/// Term `n` has `R_n = w_n·C_lim·σ²` and `τ_n = ½·C_lim·R_n`. With
/// `with_capacity` the limiting capacity is appended after the ladder.
pub fn cotanh(
    sigma: Arc<ValueSource>,
    clim: Arc<ValueSource>,
    opts: &WarburgOptions,
) -> CircuitResult<CircuitElement> {
    let base = ValueSource::product(vec![clim.clone(), sigma.clone(), sigma])?;
    let half_clim = ValueSource::scaled(clim.clone(), 0.5);
    let mut ladder = build_ladder(
        "cotanh",
        opts.terms,
        cotanh_weight,
        &base,
        &opts.decomposition,
        |w| {
            let r_n = ValueSource::scaled(base.clone(), w);
            let tau_n = ValueSource::product(vec![half_clim.clone(), r_n.clone()])?;
            Ok((r_n, tau_n))
        },
    )?;
    if opts.with_capacity {
        ladder.add_child(Leaf::capacity(clim).into())?;
    }
    Ok(ladder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights() {
        assert_eq!(tanh_weight(1), 1.0);
        assert_eq!(tanh_weight(3), 1.0 / 25.0);
        assert!((cotanh_weight(1) - 4.0 / (PI * PI)).abs() < 1e-15);
        assert!((cotanh_weight(2) - 1.0 / (PI * PI)).abs() < 1e-15);
    }

    #[test]
    fn term_zero_has_no_weight() {
        assert_eq!(tanh_weight(0), 0.0);
        assert_eq!(cotanh_weight(0), 0.0);
    }

    #[test]
    fn zero_terms_is_rejected() {
        let c = ValueSource::constant;
        let opts = WarburgOptions {
            terms: 0,
            ..Default::default()
        };
        assert!(matches!(
            tanh(c(1.0), c(1.0), &opts),
            Err(CircuitError::InvalidArgument { .. })
        ));
        assert!(matches!(
            cotanh(c(1.0), c(1.0), &opts),
            Err(CircuitError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn cotanh_appends_capacity_last() {
        let c = ValueSource::constant;
        let ladder = cotanh(c(2.0), c(3.0), &WarburgOptions::default()).unwrap();
        assert_eq!(ladder.child_count(), 6);
        assert!(matches!(ladder.at(5).unwrap().leaf(), Some(Leaf::Capacity(_))));

        let without = WarburgOptions {
            with_capacity: false,
            ..Default::default()
        };
        let ladder = cotanh(c(2.0), c(3.0), &without).unwrap();
        assert_eq!(ladder.child_count(), 5);
    }
}
