//! Error types for circuit element operations.

use ecm_core::error::EcmError;
use ecm_system::SystemError;
use thiserror::Error;

/// Errors that can occur while building or traversing a circuit tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CircuitError {
    #[error("Invalid topology: {what}")]
    InvalidTopology { what: &'static str },

    #[error("Index out of range: {what} (index={index}, len={len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Invalid sample rate: {value}")]
    InvalidSampleRate { value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArgument { what: &'static str },

    #[error("{element} cannot be simulated in the time domain")]
    NotSimulatable { element: &'static str },

    #[error("{element} used before it was attached to a state system")]
    Detached { element: &'static str },

    #[error("State system error: {0}")]
    System(#[from] SystemError),

    #[error("Value source error: {0}")]
    Value(#[from] EcmError),
}

pub type CircuitResult<T> = Result<T, CircuitError>;

impl From<CircuitError> for EcmError {
    fn from(e: CircuitError) -> Self {
        match e {
            CircuitError::InvalidTopology { what } => EcmError::InvalidArg { what },
            CircuitError::IndexOutOfRange { what, index, len } => {
                EcmError::IndexOob { what, index, len }
            }
            CircuitError::InvalidSampleRate { .. } => EcmError::InvalidArg {
                what: "sample rate",
            },
            CircuitError::InvalidArgument { what } => EcmError::InvalidArg { what },
            CircuitError::NotSimulatable { element } => EcmError::UnsupportedOperation {
                what: element,
            },
            CircuitError::Detached { element } => EcmError::Invariant { what: element },
            CircuitError::System(e) => e.into(),
            CircuitError::Value(e) => e,
        }
    }
}
