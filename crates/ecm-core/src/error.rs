use thiserror::Error;

pub type EcmResult<T> = Result<T, EcmError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EcmError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Unsupported operation: {what}")]
    UnsupportedOperation { what: &'static str },

    #[error("Invariant violated: {what}")]
    Invariant { what: &'static str },
}
