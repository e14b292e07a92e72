//! Built-in demonstration networks.

use std::sync::Arc;

use clap::ValueEnum;
use ecm_circuit::warburg::{self, WarburgOptions};
use ecm_circuit::{
    CellState, CircuitElement, CircuitResult, DecompositionOptions, Leaf, Soc, Zarc,
};
use ecm_core::{Lookup1D, Real, StateCell, ValueSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Series resistor and one RC pair
    RcStep,
    /// RC pair parallel to a resistor (differential-algebraic)
    Parallel,
    /// Series resistor and a Zarc element
    Zarc,
    /// Series resistor and a tanh Warburg ladder
    Warburg,
    /// Cell with SOC-dependent open-circuit voltage, R0, RC and Warburg
    Cell,
}

fn c(value: Real) -> Arc<ValueSource> {
    ValueSource::constant(value)
}

/// Open-circuit voltage over SOC (%) of a generic NMC cell.
fn ocv_table() -> CircuitResult<Lookup1D> {
    Ok(Lookup1D::new(
        vec![0.0, 10.0, 20.0, 40.0, 60.0, 80.0, 100.0],
        vec![3.0, 3.45, 3.55, 3.65, 3.8, 3.95, 4.2],
    )?)
}

/// Build the network for `scenario`; `dt` sets the decomposition interval.
pub fn build(scenario: Scenario, dt: Real) -> CircuitResult<CircuitElement> {
    let decomposition = DecompositionOptions {
        sample_rate: 1.0 / dt,
        ..Default::default()
    };
    match scenario {
        Scenario::RcStep => CircuitElement::serial()
            .with_child(Leaf::ohmic(c(0.01)))?
            .with_child(Leaf::parallel_rc(c(0.02), c(1.0))),
        Scenario::Parallel => {
            let branch = CircuitElement::parallel()
                .with_child(Leaf::parallel_rc(c(0.03), c(2.0)))?
                .with_child(Leaf::ohmic(c(0.05)))?;
            CircuitElement::serial()
                .with_child(Leaf::ohmic(c(0.01)))?
                .with_child(branch)
        }
        Scenario::Zarc => {
            let zarc = Zarc::new(c(0.05), c(0.015), c(0.8), dt)?;
            CircuitElement::serial()
                .with_child(Leaf::ohmic(c(0.01)))?
                .with_child(Leaf::Zarc(zarc))
        }
        Scenario::Warburg => {
            let opts = WarburgOptions {
                terms: 10,
                decomposition,
                ..Default::default()
            };
            CircuitElement::serial()
                .with_child(Leaf::ohmic(c(0.01)))?
                .with_child(warburg::tanh(c(0.02), c(20.0), &opts)?)
        }
        Scenario::Cell => cell(2.0, 80.0, 0.012, dt),
    }
}

/// Cell element whose OCV follows its own SOC.
pub fn cell(
    capacity_ah: Real,
    initial_soc: Real,
    r0: Real,
    dt: Real,
) -> CircuitResult<CircuitElement> {
    let state = CellState::new(Soc::new(capacity_ah, initial_soc)?, StateCell::new(25.0));
    let ocv = ValueSource::lookup_1d(ocv_table()?, state.soc().state());
    let opts = WarburgOptions {
        decomposition: DecompositionOptions {
            sample_rate: 1.0 / dt,
            ..Default::default()
        },
        ..Default::default()
    };
    CircuitElement::cell(state)
        .with_child(Leaf::voltage_source(ocv))?
        .with_child(Leaf::ohmic(c(r0)))?
        .with_child(Leaf::parallel_rc(c(0.008), c(5.0)))?
        .with_child(warburg::tanh(c(0.01), c(100.0), &opts)?)
}
