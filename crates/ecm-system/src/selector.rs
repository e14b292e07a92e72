//! Classification of an assembled state system group.

use tracing::debug;

use crate::group::StateSystemGroup;

/// Shape of the assembled equation set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EquationSystemKind {
    /// No rate equations: one linear solve per step, no time integration.
    Algebraic,
    /// No algebraic constraints: plain ODE.
    Differential,
    /// Both sets present: algebraic unknowns are eliminated each step.
    DifferentialAlgebraic,
}

/// Pick the equation system kind from the allocated row counts.
///
/// A group without any unknowns is treated as algebraic with zero rows.
pub fn select(group: &StateSystemGroup) -> EquationSystemKind {
    let kind = if group.diff_count() == 0 {
        EquationSystemKind::Algebraic
    } else if group.alg_count() == 0 {
        EquationSystemKind::Differential
    } else {
        EquationSystemKind::DifferentialAlgebraic
    };
    debug!(
        ?kind,
        differential = group.diff_count(),
        algebraic = group.alg_count(),
        "equation system selected"
    );
    kind
}
