//! Equation bookkeeping for equivalent-circuit networks.
//!
//! Circuit elements register unknowns (UIDs) and contribute coefficient rows
//! into a pair of state systems: one for rate equations, one for algebraic
//! branch constraints. This crate owns those systems, classifies the
//! assembled set and eliminates algebraic unknowns so a plain ODE integrator
//! can advance the differential states.

pub mod error;
pub mod group;
pub mod reducer;
pub mod selector;
pub mod state_system;

pub use error::{SystemError, SystemResult};
pub use group::StateSystemGroup;
pub use reducer::{DifferentialAlgebraicReducer, ReducedSystem};
pub use selector::{EquationSystemKind, select};
pub use state_system::{RowVector, StateSystem, evaluate_row};
