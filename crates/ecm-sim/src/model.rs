//! TransientModel trait and the reduced network ODE.

use ecm_core::Real;
use ecm_system::DifferentialAlgebraicReducer;
use nalgebra::DVector;

use crate::error::SimResult;

/// Trait for transient (dynamic) system models.
///
/// A TransientModel must implement:
/// - State type (Clone, for snapshots)
/// - Initial state
/// - RHS computation: x_dot = f(t, x)
/// - State arithmetic for integration: add states, scale by scalar
pub trait TransientModel {
    type State: Clone;

    /// State at the start of the step.
    fn initial_state(&self) -> Self::State;

    /// Compute state derivative dxdt = f(t, x).
    ///
    /// Takes &mut self so models can cache intermediate solutions.
    fn rhs(&mut self, t: Real, x: &Self::State) -> SimResult<Self::State>;

    /// result = a + b
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// result = scale * a
    fn scale(&self, a: &Self::State, scale: Real) -> Self::State;
}

/// Differential states of one assembled network with the algebraic unknowns
/// eliminated.
///
/// Coefficients are frozen for the duration of one step; the network is
/// re-assembled before the next.
#[derive(Clone, Debug)]
pub struct ReducedModel {
    reducer: DifferentialAlgebraicReducer,
    x0: DVector<Real>,
}

impl ReducedModel {
    pub fn new(reducer: DifferentialAlgebraicReducer, x0: DVector<Real>) -> Self {
        Self { reducer, x0 }
    }

    pub fn reducer(&self) -> &DifferentialAlgebraicReducer {
        &self.reducer
    }

    /// Algebraic unknowns consistent with `x_d`.
    pub fn algebraic_states(&self, x_d: &DVector<Real>) -> DVector<Real> {
        self.reducer.algebraic_states(x_d)
    }
}

impl TransientModel for ReducedModel {
    type State = DVector<Real>;

    fn initial_state(&self) -> Self::State {
        self.x0.clone()
    }

    fn rhs(&mut self, _t: Real, x: &Self::State) -> SimResult<Self::State> {
        Ok(self.reducer.derivative(x))
    }

    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State {
        a + b
    }

    fn scale(&self, a: &Self::State, scale: Real) -> Self::State {
        a * scale
    }
}
