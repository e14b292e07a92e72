//! Transient simulation of equivalent-circuit networks.
//!
//! Provides:
//! - Fixed-step integrators (forward Euler, RK4) and an embedded Cash-Karp 4(5) pair
//! - Solvers for algebraic, differential and mixed equation systems
//! - A `Network` driver that runs the per-step traversal protocol
//! - `run_sim` for current profiles and `run_pack` for many cells in parallel

pub mod error;
pub mod integrator;
pub mod model;
pub mod sim;
pub mod solver;

// Re-exports for public API
pub use error::{SimError, SimResult};
pub use integrator::{CashKarp45, EmbeddedStep, ForwardEuler, Integrator, RK4};
pub use model::{ReducedModel, TransientModel};
pub use sim::{Network, SimOptions, SimRecord, SteppingMode, run_pack, run_sim};
pub use solver::{
    AdaptiveOptions, FixedStepSolver, IntegratorType, LinearSystemSolver, Solver,
    VariableStepSolver,
};
