//! Time integrators: fixed-step Euler/RK4 and the embedded Cash-Karp pair.

use ecm_core::Real;
use nalgebra::DVector;

use crate::error::SimResult;
use crate::model::TransientModel;

/// Trait for fixed-step time integrators.
pub trait Integrator {
    /// Advance state by one time step using the transient model.
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: Real,
        x: &M::State,
        dt: Real,
    ) -> SimResult<M::State>;
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Copy, Debug)]
pub struct RK4;

impl Integrator for RK4 {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: Real,
        x: &M::State,
        dt: Real,
    ) -> SimResult<M::State> {
        let k1 = model.rhs(t, x)?;

        let x2 = model.add(x, &model.scale(&k1, 0.5 * dt));
        let k2 = model.rhs(t + 0.5 * dt, &x2)?;

        let x3 = model.add(x, &model.scale(&k2, 0.5 * dt));
        let k3 = model.rhs(t + 0.5 * dt, &x3)?;

        let x4 = model.add(x, &model.scale(&k3, dt));
        let k4 = model.rhs(t + dt, &x4)?;

        // x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
        let k_sum = model.add(
            &model.add(&k1, &model.scale(&k2, 2.0)),
            &model.add(&model.scale(&k3, 2.0), &k4),
        );

        Ok(model.add(x, &model.scale(&k_sum, dt / 6.0)))
    }
}

/// Forward Euler (explicit, 1st order, one rhs call per step).
#[derive(Clone, Copy, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: Real,
        x: &M::State,
        dt: Real,
    ) -> SimResult<M::State> {
        let xdot = model.rhs(t, x)?;
        Ok(model.add(x, &model.scale(&xdot, dt)))
    }
}

// Cash-Karp tableau
const C: [Real; 6] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 3.0 / 5.0, 1.0, 7.0 / 8.0];
const A: [[Real; 5]; 6] = [
    [0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0],
    [3.0 / 10.0, -9.0 / 10.0, 6.0 / 5.0, 0.0, 0.0],
    [-11.0 / 54.0, 5.0 / 2.0, -70.0 / 27.0, 35.0 / 27.0, 0.0],
    [
        1631.0 / 55296.0,
        175.0 / 512.0,
        575.0 / 13824.0,
        44275.0 / 110592.0,
        253.0 / 4096.0,
    ],
];
const B5: [Real; 6] = [
    37.0 / 378.0,
    0.0,
    250.0 / 621.0,
    125.0 / 594.0,
    0.0,
    512.0 / 1771.0,
];
const B4: [Real; 6] = [
    2825.0 / 27648.0,
    0.0,
    18575.0 / 48384.0,
    13525.0 / 55296.0,
    277.0 / 14336.0,
    1.0 / 4.0,
];

/// Result of one embedded step.
#[derive(Clone, Debug)]
pub struct EmbeddedStep {
    /// 5th order solution
    pub state: DVector<Real>,
    /// Difference between the 5th and 4th order solutions
    pub error: DVector<Real>,
}

/// Cash-Karp 4(5) embedded Runge-Kutta pair.
#[derive(Clone, Copy, Debug)]
pub struct CashKarp45;

impl CashKarp45 {
    /// Order used for step growth: the error estimate is O(dt^5).
    pub const ORDER: i32 = 5;

    pub fn try_step<M>(
        &self,
        model: &mut M,
        t: Real,
        x: &DVector<Real>,
        dt: Real,
    ) -> SimResult<EmbeddedStep>
    where
        M: TransientModel<State = DVector<Real>>,
    {
        let mut k: Vec<DVector<Real>> = Vec::with_capacity(6);
        for stage in 0..6 {
            let mut xs = x.clone();
            for (j, kj) in k.iter().enumerate() {
                xs.axpy(dt * A[stage][j], kj, 1.0);
            }
            k.push(model.rhs(t + C[stage] * dt, &xs)?);
        }

        let mut state = x.clone();
        let mut error = DVector::zeros(x.len());
        for (i, ki) in k.iter().enumerate() {
            state.axpy(dt * B5[i], ki, 1.0);
            error.axpy(dt * (B5[i] - B4[i]), ki, 1.0);
        }
        Ok(EmbeddedStep { state, error })
    }
}
