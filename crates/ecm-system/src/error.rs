//! Error types for state system operations.

use ecm_core::error::EcmError;
use thiserror::Error;

/// Errors raised while allocating, assembling or reducing equation systems.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SystemError {
    #[error("Already initialized: {what}")]
    AlreadyInitialized { what: &'static str },

    #[error("Not initialized: {what}")]
    NotInitialized { what: &'static str },

    #[error("Index out of range: {what} (index={index}, len={len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Algebraic block of size {size} is singular")]
    SingularAlgebraicBlock { size: usize },

    #[error("Core error: {0}")]
    Core(#[from] EcmError),
}

pub type SystemResult<T> = Result<T, SystemError>;

impl From<SystemError> for EcmError {
    fn from(e: SystemError) -> Self {
        match e {
            SystemError::AlreadyInitialized { what } => EcmError::Invariant { what },
            SystemError::NotInitialized { what } => EcmError::Invariant { what },
            SystemError::IndexOutOfRange { what, index, len } => {
                EcmError::IndexOob { what, index, len }
            }
            SystemError::DimensionMismatch { what, .. } => EcmError::InvalidArg { what },
            SystemError::SingularAlgebraicBlock { .. } => EcmError::InvalidArg {
                what: "singular algebraic block",
            },
            SystemError::Core(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SystemError::SingularAlgebraicBlock { size: 2 };
        assert!(err.to_string().contains("singular"));
    }

    #[test]
    fn error_conversion() {
        let err = SystemError::IndexOutOfRange {
            what: "uid",
            index: 4,
            len: 2,
        };
        let core: EcmError = err.into();
        assert!(matches!(core, EcmError::IndexOob { index: 4, .. }));
    }
}
