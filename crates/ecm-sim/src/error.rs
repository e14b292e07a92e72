//! Error types for simulation operations.

use ecm_circuit::CircuitError;
use ecm_core::error::EcmError;
use ecm_system::SystemError;
use thiserror::Error;

/// Errors encountered during transient simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-finite value in {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Step rejected {tries} times, last trial step {dt}")]
    StepRejected { tries: usize, dt: f64 },

    #[error("Circuit error: {0}")]
    Circuit(#[from] CircuitError),

    #[error("State system error: {0}")]
    System(#[from] SystemError),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<EcmError> for SimError {
    fn from(e: EcmError) -> Self {
        SimError::Circuit(e.into())
    }
}

impl From<SimError> for EcmError {
    fn from(e: SimError) -> Self {
        match e {
            SimError::InvalidArg { what } => EcmError::InvalidArg { what },
            SimError::NonFinite { what, value } => EcmError::NonFinite { what, value },
            SimError::StepRejected { .. } => EcmError::Invariant {
                what: "adaptive step size control failed",
            },
            SimError::Circuit(e) => e.into(),
            SimError::System(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SimError::StepRejected { tries: 10, dt: 1e-9 };
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn circuit_errors_wrap() {
        let err: SimError = CircuitError::InvalidArgument { what: "terms" }.into();
        assert!(matches!(err, SimError::Circuit(_)));
        let core: EcmError = err.into();
        assert!(matches!(core, EcmError::InvalidArg { what: "terms" }));
    }
}
