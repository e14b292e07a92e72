//! Elimination of algebraic unknowns from an assembled DAE.
//!
//! With `x = [x_d; x_a; 1]` the assembled sets read
//!
//! ```text
//! dx_d/dt = A_dd·x_d + A_da·x_a + C_d
//!       0 = A_ad·x_d + A_aa·x_a + C_a
//! ```
//!
//! Solving the second block for `x_a = -A_aa⁻¹(A_ad·x_d + C_a)` and
//! substituting gives the reduced ODE `dx_d/dt = A'·x_d + C'`.

use ecm_core::Real;
use nalgebra::{DMatrix, DVector};
use tracing::trace;

use crate::error::{SystemError, SystemResult};
use crate::group::StateSystemGroup;

/// `dx_d/dt = matrix·x_d + constants`
#[derive(Clone, Debug)]
pub struct ReducedSystem {
    pub matrix: DMatrix<Real>,
    pub constants: DVector<Real>,
}

impl ReducedSystem {
    pub fn derivative(&self, x_d: &DVector<Real>) -> DVector<Real> {
        &self.matrix * x_d + &self.constants
    }
}

/// Snapshot of one assembly pass with the algebraic block factorized.
///
/// Coefficients are state dependent, so a new reducer is built after every
/// assembly.
#[derive(Clone, Debug)]
pub struct DifferentialAlgebraicReducer {
    a_dd: DMatrix<Real>,
    a_da: DMatrix<Real>,
    c_d: DVector<Real>,
    // x_a = -(gain·x_d + offset)
    gain: DMatrix<Real>,
    offset: DVector<Real>,
}

impl DifferentialAlgebraicReducer {
    pub fn new(group: &StateSystemGroup) -> SystemResult<Self> {
        if !group.is_initialized() {
            return Err(SystemError::NotInitialized {
                what: "reduction of an uninitialized group",
            });
        }
        let d = group.diff_count();
        let a = group.alg_count();

        let diff = group.differential();
        let a_dd = diff.matrix().columns(0, d).into_owned();
        let a_da = diff.matrix().columns(d, a).into_owned();
        let c_d = diff.constants().clone();

        // No constraints: nothing to eliminate.
        if a == 0 {
            return Ok(Self {
                a_dd,
                a_da,
                c_d,
                gain: DMatrix::zeros(0, d),
                offset: DVector::zeros(0),
            });
        }

        let alg = group.algebraic();
        let a_ad = alg.matrix().columns(0, d).into_owned();
        let a_aa = alg.matrix().columns(d, a).into_owned();

        let lu = a_aa.lu();
        if !lu.is_invertible() || is_nearly_singular(lu.u().diagonal().as_slice()) {
            return Err(SystemError::SingularAlgebraicBlock { size: a });
        }
        let gain = lu
            .solve(&a_ad)
            .ok_or(SystemError::SingularAlgebraicBlock { size: a })?;
        let offset = lu
            .solve(alg.constants())
            .ok_or(SystemError::SingularAlgebraicBlock { size: a })?;
        if gain.iter().chain(offset.iter()).any(|v| !v.is_finite()) {
            return Err(SystemError::SingularAlgebraicBlock { size: a });
        }

        trace!(differential = d, algebraic = a, "algebraic block factorized");
        Ok(Self {
            a_dd,
            a_da,
            c_d,
            gain,
            offset,
        })
    }

    pub fn diff_count(&self) -> usize {
        self.a_dd.nrows()
    }

    pub fn alg_count(&self) -> usize {
        self.offset.len()
    }

    /// Algebraic unknowns consistent with `x_d`.
    pub fn algebraic_states(&self, x_d: &DVector<Real>) -> DVector<Real> {
        -(&self.gain * x_d + &self.offset)
    }

    /// Right-hand side of the differential block after substituting `x_a`.
    pub fn derivative(&self, x_d: &DVector<Real>) -> DVector<Real> {
        let x_a = self.algebraic_states(x_d);
        &self.a_dd * x_d + &self.a_da * x_a + &self.c_d
    }

    /// Explicit reduced system `A' = A_dd - A_da·gain`, `C' = C_d - A_da·offset`.
    pub fn reduced(&self) -> ReducedSystem {
        ReducedSystem {
            matrix: &self.a_dd - &self.a_da * &self.gain,
            constants: &self.c_d - &self.a_da * &self.offset,
        }
    }
}

fn is_nearly_singular(pivots: &[Real]) -> bool {
    let largest = pivots.iter().fold(0.0_f64, |m, p| m.max(p.abs()));
    if largest == 0.0 {
        return true;
    }
    let floor = Real::EPSILON * largest * pivots.len() as Real;
    pivots.iter().any(|p| p.abs() <= floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_system::RowVector;

    /// dx/dt = -x + 2a + 1, 0 = x - a + 3
    fn small_dae() -> StateSystemGroup {
        let mut g = StateSystemGroup::new();
        let d = g.new_differential_equation().unwrap();
        let a = g.new_algebraic_equation().unwrap();
        g.initialize().unwrap();
        g.add_equations(d, &RowVector::from_row_slice(&[-1.0, 2.0, 1.0]))
            .unwrap();
        g.add_equations(a, &RowVector::from_row_slice(&[1.0, -1.0, 3.0]))
            .unwrap();
        g
    }

    #[test]
    fn reduces_known_dae() {
        let r = DifferentialAlgebraicReducer::new(&small_dae()).unwrap();
        let red = r.reduced();
        assert!((red.matrix[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((red.constants[0] - 7.0).abs() < 1e-12);

        let x_d = DVector::from_vec(vec![2.0]);
        assert!((r.algebraic_states(&x_d)[0] - 5.0).abs() < 1e-12);
        assert!((r.derivative(&x_d)[0] - 9.0).abs() < 1e-12);
        assert!((red.derivative(&x_d)[0] - 9.0).abs() < 1e-12);
    }

    #[test]
    fn zero_constraints_skip_reduction() {
        let mut g = StateSystemGroup::new();
        let d = g.new_differential_equation().unwrap();
        g.initialize().unwrap();
        g.add_equations(d, &RowVector::from_row_slice(&[-2.0, 4.0]))
            .unwrap();

        let r = DifferentialAlgebraicReducer::new(&g).unwrap();
        assert_eq!(r.alg_count(), 0);
        let x_d = DVector::from_vec(vec![1.0]);
        assert_eq!(r.derivative(&x_d)[0], 2.0);
        assert_eq!(r.algebraic_states(&x_d).len(), 0);
    }

    #[test]
    fn pure_algebraic_solves_directly() {
        // 0 = 2a - 6
        let mut g = StateSystemGroup::new();
        let a = g.new_algebraic_equation().unwrap();
        g.initialize().unwrap();
        g.add_equations(a, &RowVector::from_row_slice(&[2.0, -6.0]))
            .unwrap();

        let r = DifferentialAlgebraicReducer::new(&g).unwrap();
        let x_a = r.algebraic_states(&DVector::zeros(0));
        assert!((x_a[0] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn singular_block_is_reported() {
        // the constraint does not involve the algebraic unknown at all
        let mut g = StateSystemGroup::new();
        let d = g.new_differential_equation().unwrap();
        let a = g.new_algebraic_equation().unwrap();
        g.initialize().unwrap();
        g.add_equations(d, &RowVector::from_row_slice(&[0.0, 1.0, 0.0]))
            .unwrap();
        g.add_equations(a, &RowVector::from_row_slice(&[1.0, 0.0, 0.0]))
            .unwrap();

        let err = DifferentialAlgebraicReducer::new(&g).unwrap_err();
        assert_eq!(err, SystemError::SingularAlgebraicBlock { size: 1 });
    }

    #[test]
    fn uninitialized_group_is_rejected() {
        let g = StateSystemGroup::new();
        assert!(matches!(
            DifferentialAlgebraicReducer::new(&g),
            Err(SystemError::NotInitialized { .. })
        ));
    }
}
