//! ecm-core: stable foundation for the equivalent-circuit network.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - ids (typed state indices for differential/algebraic equations)
//! - state (shared external states that lookups can bind to)
//! - lookup (clamped 1-D/2-D linear interpolation tables)
//! - value (ValueSource: constant, lookup and composed scalar providers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod lookup;
pub mod numeric;
pub mod state;
pub mod value;

// Re-exports: nice ergonomics for downstream crates
pub use error::{EcmError, EcmResult};
pub use ids::*;
pub use lookup::{Lookup1D, Lookup2D};
pub use numeric::*;
pub use state::StateCell;
pub use value::ValueSource;
