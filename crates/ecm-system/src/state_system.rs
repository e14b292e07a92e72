//! One coefficient matrix plus constant vector for a single equation set.

use ecm_core::{EcmError, Real, SystemKind, Uid};
use nalgebra::{DMatrix, DVector, RowDVector};

use crate::error::{SystemError, SystemResult};

/// Coefficient row over the combined state `[x_d; x_a; 1]`.
///
/// The last column is the affine slot and lands in the constant vector.
pub type RowVector = RowDVector<Real>;

/// Equation set `A·x + C` with one row per allocated UID.
#[derive(Clone, Debug)]
pub struct StateSystem {
    kind: SystemKind,
    equation_count: usize,
    state_count: Option<usize>,
    matrix: DMatrix<Real>,
    constants: DVector<Real>,
}

impl StateSystem {
    pub fn new(kind: SystemKind) -> Self {
        Self {
            kind,
            equation_count: 0,
            state_count: None,
            matrix: DMatrix::zeros(0, 0),
            constants: DVector::zeros(0),
        }
    }

    pub fn kind(&self) -> SystemKind {
        self.kind
    }

    /// Allocate the next UID. Only valid before [`StateSystem::initialize`].
    pub fn new_equation(&mut self) -> SystemResult<Uid> {
        if self.state_count.is_some() {
            return Err(SystemError::AlreadyInitialized {
                what: "cannot register an equation after initialization",
            });
        }
        let uid = Uid::try_from_index(self.kind, self.equation_count)?;
        self.equation_count += 1;
        Ok(uid)
    }

    /// Number of UIDs allocated so far (== matrix rows once initialized).
    pub fn equation_count(&self) -> usize {
        self.equation_count
    }

    pub fn is_initialized(&self) -> bool {
        self.state_count.is_some()
    }

    /// Fix the column width to `state_count` unknowns. Single use.
    pub fn initialize(&mut self, state_count: usize) -> SystemResult<()> {
        if self.state_count.is_some() {
            return Err(SystemError::AlreadyInitialized {
                what: "state system",
            });
        }
        self.matrix = DMatrix::zeros(self.equation_count, state_count);
        self.constants = DVector::zeros(self.equation_count);
        self.state_count = Some(state_count);
        Ok(())
    }

    /// Accumulate `row` into the equation owned by `uid`.
    ///
    /// Several contributors to one UID sum their rows.
    pub fn add_equations(&mut self, uid: Uid, row: &RowVector) -> SystemResult<()> {
        let state_count = self.state_count.ok_or(SystemError::NotInitialized {
            what: "equations added before initialization",
        })?;
        if uid.kind() != self.kind {
            return Err(EcmError::Invariant {
                what: "uid belongs to the other equation set",
            }
            .into());
        }
        let i = uid.index();
        if i >= self.equation_count {
            return Err(SystemError::IndexOutOfRange {
                what: "equation uid",
                index: i,
                len: self.equation_count,
            });
        }
        if row.len() != state_count + 1 {
            return Err(SystemError::DimensionMismatch {
                what: "coefficient row",
                expected: state_count + 1,
                found: row.len(),
            });
        }

        for j in 0..state_count {
            self.matrix[(i, j)] += row[j];
        }
        self.constants[i] += row[state_count];
        Ok(())
    }

    /// Zero all coefficients, keeping the shape.
    pub fn reset_system(&mut self) {
        self.matrix.fill(0.0);
        self.constants.fill(0.0);
    }

    pub fn matrix(&self) -> &DMatrix<Real> {
        &self.matrix
    }

    pub fn constants(&self) -> &DVector<Real> {
        &self.constants
    }

    /// Evaluate every row at `state` (length `state_count + 1`, last entry 1).
    pub fn evaluate(&self, state: &DVector<Real>) -> DVector<Real> {
        let n = self.matrix.ncols();
        &self.matrix * state.rows(0, n) + &self.constants
    }
}

/// Scalar product of a coefficient row with the combined state vector.
pub fn evaluate_row(row: &RowVector, state: &DVector<Real>) -> Real {
    row.iter().zip(state.iter()).map(|(a, b)| a * b).sum()
}
