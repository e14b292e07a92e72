//! Solid-phase diffusion in a spherical particle as a fixed RC series.
//!
//! Branch ratios come from a 29-term distribution-of-relaxation-times fit;
//! terms past the requested count are lumped into a residual resistance.

use std::sync::Arc;

use ecm_core::{Real, Uid, ValueSource};
use ecm_system::RowVector;

use crate::context::SystemContext;
use crate::error::{CircuitError, CircuitResult};

/// Number of tabulated terms.
pub const SPHERICAL_TERMS: usize = 29;

const R_FACTOR: [Real; SPHERICAL_TERMS] = [
    0.991746408883833,
    0.335189554500520,
    0.172209582896012,
    0.0990088488847815,
    0.0894316108842422,
    0.0628533575690239,
    0.0433650998346649,
    0.0409465516111291,
    0.0359600164087731,
    0.0257087018345930,
    0.0206062060663296,
    0.0163927855682163,
    0.0133393793597222,
    0.00963063557519788,
    0.0105619640377753,
    0.00625486628390168,
    0.00466427366388678,
    0.00489302085372321,
    0.00377038387403826,
    0.00272828796945697,
    0.00220461281834244,
    0.00172611255496559,
    0.00122500955193401,
    0.00100641130984464,
    0.000988915520199850,
    0.000990703772136943,
    0.00101843891449268,
    0.00109746077161406,
    0.00134411783912767,
];

const TAU_FACTOR: [Real; SPHERICAL_TERMS] = [
    0.991451359646436,
    0.335870153447181,
    0.167579701571178,
    0.0979200017777679,
    0.0616838415192040,
    0.0396617079878360,
    0.0257407628044021,
    0.0166771337841095,
    0.0106849233907334,
    0.00681822631765891,
    0.00435433073209765,
    0.00278113078679821,
    0.00177898142175253,
    0.00113938740056861,
    0.000731596152250355,
    0.000467596673254973,
    0.000300414861021452,
    0.000192385090821147,
    0.000122045399317404,
    7.75570733968097e-05,
    4.97188886786378e-05,
    3.21196950002819e-05,
    2.08531377797455e-05,
    1.35775500596413e-05,
    8.84548015906210e-06,
    5.76662104649152e-06,
    3.76592279815960e-06,
    2.46389055469806e-06,
    1.61518180144545e-06,
];

#[derive(Clone, Debug)]
pub struct SphericalDiffusion {
    resistance: Arc<ValueSource>,
    tau: Arc<ValueSource>,
    rc_count: usize,
    with_capacity: bool,
    residual_factor: Real,
    uids: Vec<Uid>,
    capacity_uid: Option<Uid>,
}

impl SphericalDiffusion {
    pub fn new(
        resistance: Arc<ValueSource>,
        tau: Arc<ValueSource>,
        rc_count: usize,
        with_capacity: bool,
    ) -> CircuitResult<Self> {
        if rc_count > SPHERICAL_TERMS {
            return Err(CircuitError::InvalidArgument {
                what: "spherical diffusion supports at most 29 RC terms",
            });
        }
        Ok(Self {
            resistance,
            tau,
            rc_count,
            with_capacity,
            residual_factor: R_FACTOR[rc_count..].iter().sum(),
            uids: Vec::new(),
            capacity_uid: None,
        })
    }

    pub fn rc_count(&self) -> usize {
        self.rc_count
    }

    pub fn has_capacity(&self) -> bool {
        self.with_capacity
    }

    /// Share of `R` carried by the truncated terms.
    pub fn residual_factor(&self) -> Real {
        self.residual_factor
    }

    pub(crate) fn set_system(&mut self, ctx: &mut SystemContext<'_>) -> CircuitResult<()> {
        self.uids.clear();
        for _ in 0..self.rc_count {
            self.uids.push(ctx.new_differential_uid()?);
        }
        self.capacity_uid = if self.with_capacity {
            Some(ctx.new_differential_uid()?)
        } else {
            None
        };
        Ok(())
    }

    pub(crate) fn voltage(
        &mut self,
        current: &RowVector,
        ctx: &mut SystemContext<'_>,
    ) -> CircuitResult<RowVector> {
        if self.uids.len() != self.rc_count || self.with_capacity != self.capacity_uid.is_some() {
            return Err(CircuitError::Detached {
                element: "SphericalDiffusion",
            });
        }
        let r = self.resistance.value()?;
        let tau = self.tau.value()?;
        let inv_c = r / tau;

        let mut voltage = ctx.zero_row();
        for (i, &uid) in self.uids.iter().enumerate() {
            let col = ctx.column(uid);
            let mut row = current * (inv_c * R_FACTOR[i] / TAU_FACTOR[i]);
            row[col] -= 1.0 / (tau * TAU_FACTOR[i]);
            ctx.add_equations(uid, &row)?;
            voltage[col] += 1.0;
        }
        if let Some(uid) = self.capacity_uid {
            ctx.add_equations(uid, &(current * (1.5 * inv_c)))?;
            voltage[ctx.column(uid)] += 1.0;
        }

        Ok(voltage + current * (self.residual_factor * r))
    }

    pub(crate) fn power(&self, current: Real, ctx: &SystemContext<'_>) -> CircuitResult<Real> {
        let r = self.resistance.value()?;
        let branches: Real = self
            .uids
            .iter()
            .enumerate()
            .map(|(i, &uid)| {
                let v = ctx.state_value(uid);
                v * v / (R_FACTOR[i] * r)
            })
            .sum();
        Ok(branches + current * current * self.residual_factor * r)
    }
}
