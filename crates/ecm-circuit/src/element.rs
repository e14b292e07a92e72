//! The circuit element tree.
//!
//! Per topology the traversal order is fixed:
//!
//! 1. `add_child` builds the tree (composites only).
//! 2. `set_system` allocates UIDs in insertion order.
//! 3. `StateSystemGroup::initialize` fixes the row width.
//! 4. `set_initial_current` on the root distributes current rows.
//! 5. Every step: `set_current_value`, `reset_system`, `get_voltage`, solve,
//!    `calculate_state_dependent_values`.
//!
//! Reordering children between steps breaks the UID to column mapping.

use ecm_core::{Real, Uid};
use ecm_system::RowVector;
use tracing::debug;

use crate::cell::CellState;
use crate::context::SystemContext;
use crate::error::{CircuitError, CircuitResult};
use crate::leaf::Leaf;

/// Children share one current row.
#[derive(Debug, Default)]
pub struct SerialComposite {
    children: Vec<CircuitElement>,
    cell: Option<CellState>,
}

/// Children share one node voltage.
///
/// `k` children get `k - 1` algebraic unknowns: branch `i >= 1` carries the
/// current of unknown `i - 1`, the first branch carries the remainder.
#[derive(Debug, Default)]
pub struct ParallelComposite {
    children: Vec<CircuitElement>,
    branch_uids: Vec<Uid>,
}

impl ParallelComposite {
    pub fn branch_uids(&self) -> &[Uid] {
        &self.branch_uids
    }
}

#[derive(Debug)]
pub enum ElementKind {
    Leaf(Leaf),
    Serial(SerialComposite),
    Parallel(ParallelComposite),
}

/// Node of the circuit tree with its per-step current/voltage rows.
#[derive(Debug)]
pub struct CircuitElement {
    kind: ElementKind,
    observable: bool,
    current: RowVector,
    voltage: RowVector,
    current_value: Real,
    voltage_value: Real,
    power_value: Real,
}

impl From<Leaf> for CircuitElement {
    fn from(leaf: Leaf) -> Self {
        Self::new(ElementKind::Leaf(leaf))
    }
}

impl CircuitElement {
    fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            observable: false,
            current: RowVector::zeros(0),
            voltage: RowVector::zeros(0),
            current_value: 0.0,
            voltage_value: 0.0,
            power_value: 0.0,
        }
    }

    pub fn serial() -> Self {
        Self::new(ElementKind::Serial(SerialComposite::default()))
    }

    pub fn parallel() -> Self {
        Self::new(ElementKind::Parallel(ParallelComposite::default()))
    }

    /// Serial composite that integrates SOC and dissipated energy.
    pub fn cell(state: CellState) -> Self {
        Self::new(ElementKind::Serial(SerialComposite {
            children: Vec::new(),
            cell: Some(state),
        }))
    }

    /// Observable elements compute their own scalar current and voltage.
    pub fn observable(mut self, observable: bool) -> Self {
        self.observable = observable;
        self
    }

    pub fn set_observable(&mut self, observable: bool) {
        self.observable = observable;
    }

    pub fn is_observable(&self) -> bool {
        self.observable
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn leaf(&self) -> Option<&Leaf> {
        match &self.kind {
            ElementKind::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn cell_state(&self) -> Option<&CellState> {
        match &self.kind {
            ElementKind::Serial(s) => s.cell.as_ref(),
            _ => None,
        }
    }

    pub fn cell_state_mut(&mut self) -> Option<&mut CellState> {
        match &mut self.kind {
            ElementKind::Serial(s) => s.cell.as_mut(),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match &self.kind {
            ElementKind::Leaf(leaf) => leaf.name(),
            ElementKind::Serial(s) if s.cell.is_some() => "CellElement",
            ElementKind::Serial(_) => "SerialTwoPort",
            ElementKind::Parallel(_) => "ParallelTwoPort",
        }
    }

    /// Take ownership of `child`. Leaves have no children.
    pub fn add_child(&mut self, child: CircuitElement) -> CircuitResult<()> {
        match &mut self.kind {
            ElementKind::Serial(s) => s.children.push(child),
            ElementKind::Parallel(p) => p.children.push(child),
            ElementKind::Leaf(_) => {
                return Err(CircuitError::InvalidTopology {
                    what: "cannot add a child to a leaf element",
                });
            }
        }
        Ok(())
    }

    /// Builder form of [`CircuitElement::add_child`].
    pub fn with_child(mut self, child: impl Into<CircuitElement>) -> CircuitResult<Self> {
        self.add_child(child.into())?;
        Ok(self)
    }

    pub fn children(&self) -> &[CircuitElement] {
        match &self.kind {
            ElementKind::Serial(s) => &s.children,
            ElementKind::Parallel(p) => &p.children,
            ElementKind::Leaf(_) => &[],
        }
    }

    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// Bounds-checked child access.
    pub fn at(&self, index: usize) -> CircuitResult<&CircuitElement> {
        let children = self.children();
        children.get(index).ok_or(CircuitError::IndexOutOfRange {
            what: "child",
            index,
            len: children.len(),
        })
    }

    pub fn at_mut(&mut self, index: usize) -> CircuitResult<&mut CircuitElement> {
        let children = match &mut self.kind {
            ElementKind::Serial(s) => &mut s.children,
            ElementKind::Parallel(p) => &mut p.children,
            ElementKind::Leaf(_) => {
                return Err(CircuitError::IndexOutOfRange {
                    what: "child",
                    index,
                    len: 0,
                });
            }
        };
        let len = children.len();
        children.get_mut(index).ok_or(CircuitError::IndexOutOfRange {
            what: "child",
            index,
            len,
        })
    }

    pub fn current_vector(&self) -> &RowVector {
        &self.current
    }

    pub fn voltage_vector(&self) -> &RowVector {
        &self.voltage
    }

    pub fn current_value(&self) -> Real {
        self.current_value
    }

    pub fn voltage_value(&self) -> Real {
        self.voltage_value
    }

    pub fn power_value(&self) -> Real {
        self.power_value
    }

    /// Allocate UIDs for this subtree.
    ///
    /// Parallel composites take their `k - 1` algebraic UIDs after all
    /// children have been visited.
    pub fn set_system(&mut self, ctx: &mut SystemContext<'_>) -> CircuitResult<()> {
        match &mut self.kind {
            ElementKind::Leaf(leaf) => leaf.set_system(ctx)?,
            ElementKind::Serial(s) => {
                for child in &mut s.children {
                    child.set_system(ctx)?;
                }
            }
            ElementKind::Parallel(p) => {
                for child in &mut p.children {
                    child.set_system(ctx)?;
                }
                p.branch_uids.clear();
                for _ in 1..p.children.len() {
                    p.branch_uids.push(ctx.new_algebraic_uid()?);
                }
                debug!(
                    branches = p.children.len(),
                    constraints = p.branch_uids.len(),
                    "parallel composite attached"
                );
            }
        }
        Ok(())
    }

    /// Root entry point: become observable and push a constant current row.
    pub fn set_initial_current(
        &mut self,
        ctx: &SystemContext<'_>,
        current: Real,
    ) -> CircuitResult<()> {
        self.observable = true;
        let row = ctx.constant_row(current);
        self.set_current(ctx, row)
    }

    /// Distribute a current row through the subtree.
    pub fn set_current(&mut self, ctx: &SystemContext<'_>, current: RowVector) -> CircuitResult<()> {
        if current.len() != ctx.width() {
            return Err(ecm_system::SystemError::DimensionMismatch {
                what: "current row",
                expected: ctx.width(),
                found: current.len(),
            }
            .into());
        }
        match &mut self.kind {
            ElementKind::Leaf(_) => {}
            ElementKind::Serial(s) => {
                for child in &mut s.children {
                    child.set_current(ctx, current.clone())?;
                }
            }
            ElementKind::Parallel(p) => {
                if !p.children.is_empty() && p.branch_uids.len() + 1 != p.children.len() {
                    return Err(CircuitError::Detached {
                        element: "ParallelTwoPort",
                    });
                }
                let diff_count = ctx.diff_count();
                let mut rows = Vec::with_capacity(p.children.len());
                let mut first = current.clone();
                for uid in &p.branch_uids {
                    first[uid.column(diff_count)] = -1.0;
                }
                rows.push(first);
                for uid in &p.branch_uids {
                    let mut row = ctx.zero_row();
                    row[uid.column(diff_count)] = 1.0;
                    rows.push(row);
                }
                for (child, row) in p.children.iter_mut().zip(rows) {
                    child.set_current(ctx, row)?;
                }
            }
        }
        self.voltage = RowVector::zeros(current.len());
        self.current = current;
        Ok(())
    }

    /// Set the externally imposed current (affine slot of the current row).
    ///
    /// Parallel composites forward it to their first branch only.
    pub fn set_current_value(&mut self, value: Real) -> CircuitResult<()> {
        let last = match self.current.len() {
            0 => {
                return Err(CircuitError::Detached {
                    element: self.name(),
                });
            }
            n => n - 1,
        };
        self.current[last] = value;
        match &mut self.kind {
            ElementKind::Leaf(_) => {}
            ElementKind::Serial(s) => {
                for child in &mut s.children {
                    child.set_current_value(value)?;
                }
            }
            ElementKind::Parallel(p) => {
                if let Some(first) = p.children.first_mut() {
                    first.set_current_value(value)?;
                }
            }
        }
        Ok(())
    }

    /// Assemble this subtree's voltage row, adding rate equations and branch
    /// constraints to the group on the way.
    pub fn get_voltage(&mut self, ctx: &mut SystemContext<'_>) -> CircuitResult<&RowVector> {
        let voltage = match &mut self.kind {
            ElementKind::Leaf(leaf) => leaf.voltage(&self.current, ctx)?,
            ElementKind::Serial(s) => {
                let mut sum = RowVector::zeros(self.current.len());
                for child in &mut s.children {
                    sum += child.get_voltage(ctx)?;
                }
                sum
            }
            ElementKind::Parallel(p) => {
                let n = p.children.len();
                if n == 0 {
                    RowVector::zeros(self.current.len())
                } else {
                    let mut branch_voltages = Vec::with_capacity(n);
                    for child in &mut p.children {
                        branch_voltages.push(child.get_voltage(ctx)?.clone());
                    }
                    // the last branch defines the node voltage
                    let node = branch_voltages[n - 1].clone();
                    for i in 1..n - 1 {
                        ctx.add_equations(p.branch_uids[i - 1], &(&node - &branch_voltages[i]))?;
                    }
                    if n > 1 {
                        ctx.add_equations(p.branch_uids[n - 2], &(&node - &branch_voltages[0]))?;
                    }
                    node
                }
            }
        };
        self.voltage = voltage;
        Ok(&self.voltage)
    }

    /// Refresh scalar current/voltage/power from the solved state vector.
    pub fn calculate_state_dependent_values(
        &mut self,
        ctx: &SystemContext<'_>,
    ) -> CircuitResult<()> {
        match &mut self.kind {
            ElementKind::Leaf(leaf) => {
                let values = leaf.values(&self.current, &self.voltage, ctx)?;
                self.current_value = values.current;
                self.voltage_value = values.voltage;
                self.power_value = values.power;
            }
            ElementKind::Serial(SerialComposite { children, cell }) => {
                let mut power = 0.0;
                for child in children.iter_mut() {
                    child.calculate_state_dependent_values(ctx)?;
                    power += child.power_value;
                }
                self.power_value = power;
                if self.observable || cell.is_some() {
                    self.current_value = ctx.evaluate(&self.current);
                }
                if self.observable {
                    self.voltage_value = ctx.evaluate(&self.voltage);
                }
                if let Some(cell) = cell {
                    cell.record_step(self.current_value, power, ctx.dt());
                }
            }
            ElementKind::Parallel(p) => {
                let mut power = 0.0;
                for child in &mut p.children {
                    child.calculate_state_dependent_values(ctx)?;
                    power += child.power_value;
                }
                self.power_value = power;
                if self.observable {
                    self.current_value = ctx.evaluate(&self.current);
                    self.voltage_value = ctx.evaluate(&self.voltage);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecm_core::ValueSource;
    use ecm_system::StateSystemGroup;

    fn resistor(r: Real) -> CircuitElement {
        Leaf::ohmic(ValueSource::constant(r)).into()
    }

    #[test]
    fn leaf_rejects_children() {
        let mut leaf = resistor(1.0);
        let err = leaf.add_child(resistor(2.0)).unwrap_err();
        assert!(matches!(err, CircuitError::InvalidTopology { .. }));
    }

    #[test]
    fn at_is_bounds_checked() {
        let serial = CircuitElement::serial()
            .with_child(resistor(1.0))
            .unwrap();
        assert!(serial.at(0).is_ok());
        assert!(matches!(
            serial.at(1),
            Err(CircuitError::IndexOutOfRange {
                index: 1,
                len: 1,
                ..
            })
        ));
    }

    #[test]
    fn set_current_value_needs_attachment() {
        let mut r = resistor(1.0);
        assert!(matches!(
            r.set_current_value(1.0),
            Err(CircuitError::Detached { .. })
        ));
    }

    #[test]
    fn wrong_row_width_is_rejected() {
        let mut group = StateSystemGroup::new();
        group.initialize().unwrap();
        let ctx = SystemContext::new(&mut group);
        let mut r = resistor(1.0);
        assert!(r.set_current(&ctx, RowVector::zeros(3)).is_err());
    }

    #[test]
    fn names() {
        assert_eq!(CircuitElement::serial().name(), "SerialTwoPort");
        assert_eq!(CircuitElement::parallel().name(), "ParallelTwoPort");
        assert_eq!(resistor(1.0).name(), "OhmicResistance");
    }
}
