//! Differential + algebraic state systems sharing one state vector.

use ecm_core::{Real, SystemKind, Uid, ensure_positive};
use nalgebra::DVector;
use tracing::debug;

use crate::error::{SystemError, SystemResult};
use crate::state_system::{RowVector, StateSystem};

/// Owns both equation sets and the combined state `[x_d; x_a; 1]`.
///
/// Created once per topology. UIDs are allocated during the element
/// traversal, then [`StateSystemGroup::initialize`] fixes all widths.
#[derive(Clone, Debug)]
pub struct StateSystemGroup {
    differential: StateSystem,
    algebraic: StateSystem,
    state: DVector<Real>,
    dt: Real,
    initialized: bool,
}

impl Default for StateSystemGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSystemGroup {
    pub fn new() -> Self {
        Self {
            differential: StateSystem::new(SystemKind::Differential),
            algebraic: StateSystem::new(SystemKind::Algebraic),
            state: DVector::from_element(1, 1.0),
            dt: 1e-3,
            initialized: false,
        }
    }

    pub fn differential(&self) -> &StateSystem {
        &self.differential
    }

    pub fn algebraic(&self) -> &StateSystem {
        &self.algebraic
    }

    pub fn new_differential_equation(&mut self) -> SystemResult<Uid> {
        self.differential.new_equation()
    }

    pub fn new_algebraic_equation(&mut self) -> SystemResult<Uid> {
        self.algebraic.new_equation()
    }

    /// Size both systems and the state vector from the allocated totals.
    pub fn initialize(&mut self) -> SystemResult<()> {
        if self.initialized {
            return Err(SystemError::AlreadyInitialized {
                what: "state system group",
            });
        }
        let n = self.state_count();
        self.differential.initialize(n)?;
        self.algebraic.initialize(n)?;
        self.state = DVector::zeros(n + 1);
        self.state[n] = 1.0;
        self.initialized = true;
        debug!(
            differential = self.diff_count(),
            algebraic = self.alg_count(),
            "state system group initialized"
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn diff_count(&self) -> usize {
        self.differential.equation_count()
    }

    pub fn alg_count(&self) -> usize {
        self.algebraic.equation_count()
    }

    /// Number of unknowns (without the affine slot).
    pub fn state_count(&self) -> usize {
        self.diff_count() + self.alg_count()
    }

    /// Length of every coefficient row and of the state vector.
    pub fn width(&self) -> usize {
        self.state_count() + 1
    }

    /// Column of `uid` in the combined state vector.
    pub fn column(&self, uid: Uid) -> usize {
        uid.column(self.diff_count())
    }

    /// Route a coefficient row to the equation set owning `uid`.
    pub fn add_equations(&mut self, uid: Uid, row: &RowVector) -> SystemResult<()> {
        match uid.kind() {
            SystemKind::Differential => self.differential.add_equations(uid, row),
            SystemKind::Algebraic => self.algebraic.add_equations(uid, row),
        }
    }

    /// Zero both coefficient sets before the next assembly pass.
    pub fn reset_system(&mut self) {
        self.differential.reset_system();
        self.algebraic.reset_system();
    }

    pub fn state(&self) -> &DVector<Real> {
        &self.state
    }

    pub fn state_value(&self, uid: Uid) -> Real {
        self.state[self.column(uid)]
    }

    pub fn differential_states(&self) -> DVector<Real> {
        self.state.rows(0, self.diff_count()).into_owned()
    }

    pub fn algebraic_states(&self) -> DVector<Real> {
        self.state
            .rows(self.diff_count(), self.alg_count())
            .into_owned()
    }

    pub fn set_differential_states(&mut self, x_d: &DVector<Real>) -> SystemResult<()> {
        let d = self.diff_count();
        if x_d.len() != d {
            return Err(SystemError::DimensionMismatch {
                what: "differential states",
                expected: d,
                found: x_d.len(),
            });
        }
        self.state.rows_mut(0, d).copy_from(x_d);
        Ok(())
    }

    pub fn set_algebraic_states(&mut self, x_a: &DVector<Real>) -> SystemResult<()> {
        let (d, a) = (self.diff_count(), self.alg_count());
        if x_a.len() != a {
            return Err(SystemError::DimensionMismatch {
                what: "algebraic states",
                expected: a,
                found: x_a.len(),
            });
        }
        self.state.rows_mut(d, a).copy_from(x_a);
        Ok(())
    }

    /// Step size used by state-dependent updates (SOC, dissipated energy).
    pub fn dt(&self) -> Real {
        self.dt
    }

    pub fn set_dt(&mut self, dt: Real) -> SystemResult<()> {
        self.dt = ensure_positive(dt, "step size")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_sizes_everything() {
        let mut g = StateSystemGroup::new();
        let d0 = g.new_differential_equation().unwrap();
        let _d1 = g.new_differential_equation().unwrap();
        let a0 = g.new_algebraic_equation().unwrap();
        g.initialize().unwrap();

        assert_eq!(g.state_count(), 3);
        assert_eq!(g.width(), 4);
        assert_eq!(g.state().len(), 4);
        assert_eq!(g.state()[3], 1.0);
        assert_eq!(g.differential().matrix().shape(), (2, 3));
        assert_eq!(g.algebraic().matrix().shape(), (1, 3));
        assert_eq!(g.column(d0), 0);
        assert_eq!(g.column(a0), 2);
    }

    #[test]
    fn initialize_twice_fails() {
        let mut g = StateSystemGroup::new();
        g.initialize().unwrap();
        assert!(matches!(
            g.initialize(),
            Err(SystemError::AlreadyInitialized { .. })
        ));
    }

    #[test]
    fn add_equations_routes_by_kind() {
        let mut g = StateSystemGroup::new();
        let d = g.new_differential_equation().unwrap();
        let a = g.new_algebraic_equation().unwrap();
        g.initialize().unwrap();

        g.add_equations(d, &RowVector::from_row_slice(&[1.0, 2.0, 3.0]))
            .unwrap();
        g.add_equations(a, &RowVector::from_row_slice(&[4.0, 5.0, 6.0]))
            .unwrap();
        assert_eq!(g.differential().constants()[0], 3.0);
        assert_eq!(g.algebraic().matrix()[(0, 1)], 5.0);
    }

    #[test]
    fn state_slices_round_trip() {
        let mut g = StateSystemGroup::new();
        g.new_differential_equation().unwrap();
        g.new_algebraic_equation().unwrap();
        g.new_algebraic_equation().unwrap();
        g.initialize().unwrap();

        g.set_differential_states(&DVector::from_vec(vec![7.0]))
            .unwrap();
        g.set_algebraic_states(&DVector::from_vec(vec![1.0, 2.0]))
            .unwrap();
        assert_eq!(g.state().as_slice(), &[7.0, 1.0, 2.0, 1.0]);
        assert!(g.set_algebraic_states(&DVector::zeros(1)).is_err());
    }

    #[test]
    fn dt_must_be_positive() {
        let mut g = StateSystemGroup::new();
        assert!(g.set_dt(0.0).is_err());
        g.set_dt(0.01).unwrap();
        assert_eq!(g.dt(), 0.01);
    }
}
