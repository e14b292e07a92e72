//! ecm-circuit: equivalent-circuit element tree for battery impedance models.
//!
//! Provides:
//! - Serial and parallel composites, and a cell composite that tracks SOC
//! - Leaves: ohmic resistance, capacity, parallel RC, voltage source
//! - Distributed elements: Zarc, Warburg (tanh/cotanh), spherical diffusion
//!
//! Elements allocate state UIDs in one traversal and contribute coefficient
//! rows to a [`ecm_system::StateSystemGroup`] in the next.
//!
//! # Example
//!
//! ```no_run
//! use ecm_circuit::{CircuitElement, Leaf, SystemContext};
//! use ecm_core::ValueSource;
//! use ecm_system::StateSystemGroup;
//!
//! let c = ValueSource::constant;
//! let mut root = CircuitElement::serial()
//!     .with_child(Leaf::ohmic(c(0.01)))?
//!     .with_child(Leaf::parallel_rc(c(0.02), c(5.0)))?;
//!
//! let mut group = StateSystemGroup::new();
//! root.set_system(&mut SystemContext::new(&mut group))?;
//! group.initialize()?;
//!
//! let mut ctx = SystemContext::new(&mut group);
//! root.set_initial_current(&ctx, 2.0)?;
//! let voltage = root.get_voltage(&mut ctx)?.clone();
//! println!("terminal voltage row: {voltage}");
//! # Ok::<(), ecm_circuit::CircuitError>(())
//! ```

pub mod cell;
pub mod context;
pub mod decomposition;
pub mod element;
pub mod error;
pub mod leaf;
pub mod spherical;
pub mod warburg;
pub mod zarc;

// Re-exports
pub use cell::{CellState, Soc};
pub use context::SystemContext;
pub use decomposition::{Decomposition, DecompositionOptions, RcBranch, SimplificationMode};
pub use element::{CircuitElement, ElementKind, ParallelComposite, SerialComposite};
pub use error::{CircuitError, CircuitResult};
pub use leaf::{
    Capacity, ConstantPhaseElement, Inductance, Leaf, LeafValues, OhmicResistance, ParallelRc,
    VoltageSource,
};
pub use spherical::{SPHERICAL_TERMS, SphericalDiffusion};
pub use warburg::WarburgOptions;
pub use zarc::{MAX_ZARC_BRANCHES, Zarc};
