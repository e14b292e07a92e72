//! Explicit access to the state system group during tree traversal.

use ecm_core::{Real, Uid};
use ecm_system::{RowVector, StateSystemGroup, evaluate_row};
use nalgebra::DVector;

use crate::error::CircuitResult;

/// Handle passed down through every traversal call.
///
/// Elements never store a reference to the group; UIDs they allocate are
/// plain values resolved through this context.
pub struct SystemContext<'g> {
    group: &'g mut StateSystemGroup,
}

impl<'g> SystemContext<'g> {
    pub fn new(group: &'g mut StateSystemGroup) -> Self {
        Self { group }
    }

    pub fn group(&self) -> &StateSystemGroup {
        &*self.group
    }

    pub fn new_differential_uid(&mut self) -> CircuitResult<Uid> {
        Ok(self.group.new_differential_equation()?)
    }

    pub fn new_algebraic_uid(&mut self) -> CircuitResult<Uid> {
        Ok(self.group.new_algebraic_equation()?)
    }

    pub fn add_equations(&mut self, uid: Uid, row: &RowVector) -> CircuitResult<()> {
        Ok(self.group.add_equations(uid, row)?)
    }

    /// Row width: number of unknowns plus the affine slot.
    pub fn width(&self) -> usize {
        self.group.width()
    }

    pub fn diff_count(&self) -> usize {
        self.group.diff_count()
    }

    pub fn column(&self, uid: Uid) -> usize {
        self.group.column(uid)
    }

    pub fn state(&self) -> &DVector<Real> {
        self.group.state()
    }

    pub fn state_value(&self, uid: Uid) -> Real {
        self.group.state_value(uid)
    }

    pub fn evaluate(&self, row: &RowVector) -> Real {
        evaluate_row(row, self.group.state())
    }

    pub fn dt(&self) -> Real {
        self.group.dt()
    }

    pub fn zero_row(&self) -> RowVector {
        RowVector::zeros(self.width())
    }

    /// Row selecting the unknown `uid`.
    pub fn unit_row(&self, uid: Uid) -> RowVector {
        let mut row = self.zero_row();
        row[self.column(uid)] = 1.0;
        row
    }

    /// Row holding only a constant in the affine slot.
    pub fn constant_row(&self, value: Real) -> RowVector {
        let mut row = self.zero_row();
        let last = row.len() - 1;
        row[last] = value;
        row
    }
}
