//! Shared external states (SOC, temperature, ...) read by lookups.

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::Real;

/// A scalar owned by one writer (e.g. a cell's SOC tracker) and read by any
/// number of lookups bound to it.
///
/// Cloning shares the underlying value.
#[derive(Clone)]
pub struct StateCell(Arc<AtomicU64>);

impl StateCell {
    pub fn new(value: Real) -> Self {
        Self(Arc::new(AtomicU64::new(value.to_bits())))
    }

    pub fn get(&self) -> Real {
        Real::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, value: Real) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    /// True when both handles refer to the same state.
    pub fn same_as(&self, other: &StateCell) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl fmt::Debug for StateCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateCell").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_value() {
        let a = StateCell::new(20.0);
        let b = a.clone();
        b.set(35.5);
        assert_eq!(a.get(), 35.5);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&StateCell::new(35.5)));
    }
}
