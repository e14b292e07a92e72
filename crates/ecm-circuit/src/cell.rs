//! Cell-level states carried by a serial composite.

use ecm_core::{Real, StateCell};

use crate::error::{CircuitError, CircuitResult};

const SECONDS_PER_HOUR: Real = 3600.0;

/// State of charge integrated from the cell current.
///
/// Charge is kept in A·s and clamped to `[0, max]`. The percentage is
/// published through a [`StateCell`] so lookups can follow it.
#[derive(Debug)]
pub struct Soc {
    max_charge: Real,
    charge: Real,
    percent: StateCell,
}

impl Soc {
    /// `capacity_ah` in ampere hours, `initial_percent` in `[0, 100]`.
    pub fn new(capacity_ah: Real, initial_percent: Real) -> CircuitResult<Self> {
        if !capacity_ah.is_finite() || capacity_ah <= 0.0 {
            return Err(CircuitError::InvalidArgument {
                what: "cell capacity must be positive",
            });
        }
        if !(0.0..=100.0).contains(&initial_percent) {
            return Err(CircuitError::InvalidArgument {
                what: "initial SOC must be within 0..=100 %",
            });
        }
        let max_charge = capacity_ah * SECONDS_PER_HOUR;
        let charge = max_charge * initial_percent / 100.0;
        Ok(Self {
            max_charge,
            charge,
            percent: StateCell::new(initial_percent),
        })
    }

    /// Add `delta` A·s (positive charges the cell).
    pub fn update_charge(&mut self, delta: Real) {
        self.set_charge(self.charge + delta);
    }

    pub fn set_charge(&mut self, charge: Real) {
        self.charge = charge.clamp(0.0, self.max_charge);
        self.percent.set(self.value());
    }

    /// SOC in percent.
    pub fn value(&self) -> Real {
        self.charge / self.max_charge * 100.0
    }

    pub fn charge(&self) -> Real {
        self.charge
    }

    pub fn max_charge(&self) -> Real {
        self.max_charge
    }

    /// Handle for binding lookups to the SOC percentage.
    pub fn state(&self) -> StateCell {
        self.percent.clone()
    }
}

/// SOC, temperature and dissipated energy of one cell.
#[derive(Debug)]
pub struct CellState {
    soc: Soc,
    temperature: StateCell,
    dissipated_energy: Real,
}

impl CellState {
    pub fn new(soc: Soc, temperature: StateCell) -> Self {
        Self {
            soc,
            temperature,
            dissipated_energy: 0.0,
        }
    }

    pub fn soc(&self) -> &Soc {
        &self.soc
    }

    pub fn soc_mut(&mut self) -> &mut Soc {
        &mut self.soc
    }

    pub fn temperature(&self) -> &StateCell {
        &self.temperature
    }

    /// Heat released since construction or the last reset (J).
    pub fn dissipated_energy(&self) -> Real {
        self.dissipated_energy
    }

    pub fn reset_dissipated_energy(&mut self) {
        self.dissipated_energy = 0.0;
    }

    pub(crate) fn record_step(&mut self, current: Real, power: Real, dt: Real) {
        self.soc.update_charge(current * dt);
        self.dissipated_energy += power * dt;
    }
}
