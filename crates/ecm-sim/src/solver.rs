//! Solvers advancing an assembled state system group by one step.
//!
//! Every `solve` expects the caller to have re-assembled the group
//! (`reset_system` + a full element traversal) for the current state.

use ecm_core::Real;
use ecm_system::{DifferentialAlgebraicReducer, EquationSystemKind, StateSystemGroup};
use nalgebra::DVector;
use tracing::{debug, trace};

use crate::error::{SimError, SimResult};
use crate::integrator::{CashKarp45, ForwardEuler, Integrator, RK4};
use crate::model::{ReducedModel, TransientModel};

/// Integrator selection for fixed-step solving.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegratorType {
    /// 4th-order Runge-Kutta (default, 4 rhs calls per step).
    #[default]
    RK4,
    /// Forward Euler (1st-order, 1 rhs call per step).
    ForwardEuler,
}

/// Step size control of the variable-step solver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdaptiveOptions {
    /// First trial step (seconds)
    pub initial_step: Real,
    pub abs_tol: Real,
    pub rel_tol: Real,
    /// Attempts per step before giving up
    pub max_tries: usize,
    pub safety: Real,
    /// Lower bound of the shrink factor after a rejection
    pub min_shrink: Real,
    /// Upper bound of the growth factor after an acceptance
    pub max_grow: Real,
    /// Largest step ever taken (seconds)
    pub max_step: Real,
}

impl Default for AdaptiveOptions {
    fn default() -> Self {
        Self {
            initial_step: 1e-4,
            abs_tol: 1e-10,
            rel_tol: 1e-10,
            max_tries: 10,
            safety: 0.9,
            min_shrink: 0.2,
            max_grow: 5.0,
            max_step: 1.0,
        }
    }
}

impl AdaptiveOptions {
    pub fn validate(&self) -> SimResult<()> {
        let positive = |v: Real| v.is_finite() && v > 0.0;
        if !positive(self.initial_step) || !positive(self.max_step) {
            return Err(SimError::InvalidArg {
                what: "adaptive step sizes must be positive",
            });
        }
        if !positive(self.abs_tol) || !(self.rel_tol >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "adaptive tolerances must be positive",
            });
        }
        if self.max_tries == 0 {
            return Err(SimError::InvalidArg {
                what: "max_tries must be positive",
            });
        }
        if !(0.0 < self.min_shrink && self.min_shrink < 1.0) || self.max_grow < 1.0 {
            return Err(SimError::InvalidArg {
                what: "shrink/grow bounds out of range",
            });
        }
        Ok(())
    }
}

fn ensure_step(dt: Real) -> SimResult<Real> {
    if dt.is_finite() && dt > 0.0 {
        Ok(dt)
    } else {
        Err(SimError::InvalidArg {
            what: "dt must be positive",
        })
    }
}

/// Write the new differential states and matching algebraic states back.
fn commit(
    group: &mut StateSystemGroup,
    model: &ReducedModel,
    x_d: &DVector<Real>,
    dt: Real,
) -> SimResult<()> {
    if let Some(bad) = x_d.iter().find(|v| !v.is_finite()) {
        return Err(SimError::NonFinite {
            what: "differential states",
            value: *bad,
        });
    }
    group.set_differential_states(x_d)?;
    group.set_algebraic_states(&model.algebraic_states(x_d))?;
    group.set_dt(dt)?;
    Ok(())
}

/// Solves the algebraic constraints of a group without differential states.
#[derive(Clone, Debug)]
pub struct LinearSystemSolver {
    dt: Real,
    time: Real,
}

impl LinearSystemSolver {
    pub fn new(dt: Real) -> SimResult<Self> {
        Ok(Self {
            dt: ensure_step(dt)?,
            time: 0.0,
        })
    }

    pub fn time(&self) -> Real {
        self.time
    }

    /// `x_a = A_aa⁻¹(-C_a)`, then advance time by `dt`.
    pub fn solve(&mut self, group: &mut StateSystemGroup) -> SimResult<Real> {
        let reducer = DifferentialAlgebraicReducer::new(group)?;
        let model = ReducedModel::new(reducer, group.differential_states());
        let x_d = model.initial_state();
        commit(group, &model, &x_d, self.dt)?;
        self.time += self.dt;
        Ok(self.time)
    }
}

/// One reduction plus one integrator step of fixed size per call.
#[derive(Clone, Debug)]
pub struct FixedStepSolver {
    integrator: IntegratorType,
    dt: Real,
    time: Real,
}

impl FixedStepSolver {
    pub fn new(dt: Real, integrator: IntegratorType) -> SimResult<Self> {
        Ok(Self {
            integrator,
            dt: ensure_step(dt)?,
            time: 0.0,
        })
    }

    pub fn time(&self) -> Real {
        self.time
    }

    pub fn dt(&self) -> Real {
        self.dt
    }

    pub fn solve(&mut self, group: &mut StateSystemGroup) -> SimResult<Real> {
        let reducer = DifferentialAlgebraicReducer::new(group)?;
        let mut model = ReducedModel::new(reducer, group.differential_states());
        let x0 = model.initial_state();
        let x1 = match self.integrator {
            IntegratorType::RK4 => RK4.step(&mut model, self.time, &x0, self.dt)?,
            IntegratorType::ForwardEuler => ForwardEuler.step(&mut model, self.time, &x0, self.dt)?,
        };
        commit(group, &model, &x1, self.dt)?;
        self.time += self.dt;
        trace!(time = self.time, dt = self.dt, "fixed step");
        Ok(self.time)
    }
}

/// Embedded Cash-Karp 4(5) stepping with error-controlled step size.
///
/// The returned time is whatever step was accepted, not a requested target.
#[derive(Clone, Debug)]
pub struct VariableStepSolver {
    opts: AdaptiveOptions,
    next_dt: Real,
    last_dt: Real,
    time: Real,
}

impl VariableStepSolver {
    pub fn new(opts: AdaptiveOptions) -> SimResult<Self> {
        opts.validate()?;
        Ok(Self {
            opts,
            next_dt: opts.initial_step.min(opts.max_step),
            last_dt: 0.0,
            time: 0.0,
        })
    }

    pub fn time(&self) -> Real {
        self.time
    }

    /// Size of the last accepted step.
    pub fn last_dt(&self) -> Real {
        self.last_dt
    }

    /// Trial size of the next step.
    pub fn next_dt(&self) -> Real {
        self.next_dt
    }

    pub fn solve(&mut self, group: &mut StateSystemGroup) -> SimResult<Real> {
        self.advance(group, None)
    }

    /// Like [`VariableStepSolver::solve`], never stepping past `limit`.
    pub fn solve_until(&mut self, group: &mut StateSystemGroup, limit: Real) -> SimResult<Real> {
        if limit <= self.time {
            return Ok(self.time);
        }
        self.advance(group, Some(limit))
    }

    /// Scaled max-norm of the error estimate; accepted when ≤ 1.
    fn error_norm(&self, x0: &DVector<Real>, x1: &DVector<Real>, err: &DVector<Real>) -> Real {
        x0.iter()
            .zip(x1.iter())
            .zip(err.iter())
            .map(|((a, b), e)| {
                let scale = self.opts.abs_tol + self.opts.rel_tol * a.abs().max(b.abs());
                e.abs() / scale
            })
            .fold(0.0, Real::max)
    }

    fn advance(&mut self, group: &mut StateSystemGroup, limit: Option<Real>) -> SimResult<Real> {
        let x0 = group.differential_states();
        let mut dt = self.next_dt.min(self.opts.max_step);

        for attempt in 1..=self.opts.max_tries {
            let (clamped, end) = match limit {
                Some(limit) if dt >= limit - self.time => (limit - self.time, limit),
                _ => (dt, self.time + dt),
            };
            let reducer = DifferentialAlgebraicReducer::new(group)?;
            let mut model = ReducedModel::new(reducer, x0.clone());
            let trial = CashKarp45.try_step(&mut model, self.time, &x0, clamped)?;
            let norm = self.error_norm(&x0, &trial.state, &trial.error);
            if !norm.is_finite() {
                return Err(SimError::NonFinite {
                    what: "step error estimate",
                    value: norm,
                });
            }

            if norm <= 1.0 {
                commit(group, &model, &trial.state, clamped)?;
                self.time = end;
                self.last_dt = clamped;
                let grow = if norm == 0.0 {
                    self.opts.max_grow
                } else {
                    (self.opts.safety * norm.powf(-1.0 / CashKarp45::ORDER as Real))
                        .clamp(1.0, self.opts.max_grow)
                };
                // a step clamped to the limit does not shrink the next one
                self.next_dt = (dt.max(clamped) * grow).min(self.opts.max_step);
                trace!(time = self.time, dt = clamped, norm, "variable step accepted");
                return Ok(self.time);
            }

            let shrink = (self.opts.safety * norm.powf(-1.0 / (CashKarp45::ORDER - 1) as Real))
                .clamp(self.opts.min_shrink, 1.0);
            debug!(attempt, dt = clamped, norm, "variable step rejected");
            dt = clamped * shrink;
        }

        Err(SimError::StepRejected {
            tries: self.opts.max_tries,
            dt,
        })
    }
}

/// Solver chosen from the equation-system classification.
#[derive(Clone, Debug)]
pub enum Solver {
    Linear(LinearSystemSolver),
    Fixed(FixedStepSolver),
    Variable(VariableStepSolver),
}

impl Solver {
    pub fn time(&self) -> Real {
        match self {
            Solver::Linear(s) => s.time(),
            Solver::Fixed(s) => s.time(),
            Solver::Variable(s) => s.time(),
        }
    }

    pub fn solve(&mut self, group: &mut StateSystemGroup) -> SimResult<Real> {
        match self {
            Solver::Linear(s) => s.solve(group),
            Solver::Fixed(s) => s.solve(group),
            Solver::Variable(s) => s.solve(group),
        }
    }

    /// Variable-step solvers stop at `limit`; the others ignore it.
    pub fn solve_until(&mut self, group: &mut StateSystemGroup, limit: Real) -> SimResult<Real> {
        match self {
            Solver::Variable(s) => s.solve_until(group, limit),
            other => other.solve(group),
        }
    }

    /// Pure algebraic groups always get the linear solver.
    pub(crate) fn for_kind(
        kind: EquationSystemKind,
        stepping: &crate::sim::SteppingMode,
        dt: Real,
    ) -> SimResult<Self> {
        use crate::sim::SteppingMode;
        Ok(match (kind, stepping) {
            (EquationSystemKind::Algebraic, _) => Solver::Linear(LinearSystemSolver::new(dt)?),
            (_, SteppingMode::Fixed(integrator)) => {
                Solver::Fixed(FixedStepSolver::new(dt, *integrator)?)
            }
            (_, SteppingMode::Variable(opts)) => Solver::Variable(VariableStepSolver::new(*opts)?),
        })
    }

    /// Keep the clock when switching solvers.
    pub(crate) fn with_time(mut self, time: Real) -> Self {
        match &mut self {
            Solver::Linear(s) => s.time = time,
            Solver::Fixed(s) => s.time = time,
            Solver::Variable(s) => s.time = time,
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecm_core::{Real, SystemKind, Uid};
    use nalgebra::RowDVector;

    /// One capacity-like state: dx/dt = -x/τ + u/τ
    fn rc_group(tau: Real, u: Real) -> StateSystemGroup {
        let mut group = StateSystemGroup::new();
        let uid = group.new_differential_equation().unwrap();
        group.initialize().unwrap();
        assemble_rc(&mut group, uid, tau, u);
        group
    }

    fn assemble_rc(group: &mut StateSystemGroup, uid: Uid, tau: Real, u: Real) {
        group.reset_system();
        group
            .add_equations(uid, &RowDVector::from_row_slice(&[-1.0 / tau, u / tau]))
            .unwrap();
    }

    #[test]
    fn fixed_step_advances_time_and_state() {
        let mut group = rc_group(1.0, 2.0);
        let mut solver = FixedStepSolver::new(0.1, IntegratorType::ForwardEuler).unwrap();
        let t = solver.solve(&mut group).unwrap();
        assert!((t - 0.1).abs() < 1e-15);
        assert!((group.state()[0] - 0.2).abs() < 1e-15);
        assert_eq!(group.dt(), 0.1);
    }

    #[test]
    fn invalid_step_is_rejected() {
        assert!(FixedStepSolver::new(0.0, IntegratorType::RK4).is_err());
        assert!(LinearSystemSolver::new(-1.0).is_err());
        let opts = AdaptiveOptions {
            max_tries: 0,
            ..Default::default()
        };
        assert!(VariableStepSolver::new(opts).is_err());
    }

    #[test]
    fn variable_step_grows_and_respects_limit() {
        let uid = Uid::from_index(SystemKind::Differential, 0);
        let mut group = rc_group(1.0, 1.0);
        let mut solver = VariableStepSolver::new(AdaptiveOptions {
            abs_tol: 1e-8,
            rel_tol: 1e-8,
            ..Default::default()
        })
        .unwrap();
        let mut t = 0.0;
        while t < 2.0 {
            t = solver.solve_until(&mut group, 2.0).unwrap();
            assemble_rc(&mut group, uid, 1.0, 1.0);
        }
        assert_eq!(t, 2.0);
        let exact = 1.0 - (-2.0_f64).exp();
        assert!((group.state()[0] - exact).abs() < 1e-6);
        assert!(solver.next_dt() > 1e-4);
    }

    #[test]
    fn impossible_tolerance_is_reported() {
        let mut group = rc_group(1e-3, 1.0);
        let mut solver = VariableStepSolver::new(AdaptiveOptions {
            initial_step: 1.0,
            abs_tol: 1e-30,
            rel_tol: 0.0,
            max_tries: 2,
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            solver.solve(&mut group),
            Err(SimError::StepRejected { tries: 2, .. })
        ));
        assert_eq!(solver.time(), 0.0);
    }

    #[test]
    fn empty_group_is_a_no_op() {
        let mut group = StateSystemGroup::new();
        group.initialize().unwrap();
        let mut solver = LinearSystemSolver::new(0.5).unwrap();
        assert_eq!(solver.solve(&mut group).unwrap(), 0.5);
        assert_eq!(group.state().len(), 1);
    }
}
