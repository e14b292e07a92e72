//! Error type for the command-line front end.

use ecm_circuit::CircuitError;
use ecm_core::EcmError;
use ecm_sim::SimError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Value(#[from] EcmError),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;
