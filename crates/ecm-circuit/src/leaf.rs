//! Concrete leaf kinds of the circuit tree.
//!
//! Every leaf turns the current row it receives into a voltage row and, when
//! it carries state, contributes one rate equation per owned UID.

use std::sync::Arc;

use ecm_core::{Real, Uid, ValueSource};
use ecm_system::RowVector;

use crate::context::SystemContext;
use crate::error::{CircuitError, CircuitResult};
use crate::spherical::SphericalDiffusion;
use crate::zarc::Zarc;

/// Scalar results of one leaf after a solved step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LeafValues {
    pub current: Real,
    pub voltage: Real,
    pub power: Real,
}

/// `V = I·R`
#[derive(Clone, Debug)]
pub struct OhmicResistance {
    resistance: Arc<ValueSource>,
}

impl OhmicResistance {
    pub fn new(resistance: Arc<ValueSource>) -> Self {
        Self { resistance }
    }

    pub fn resistance(&self) -> &Arc<ValueSource> {
        &self.resistance
    }
}

/// `dV/dt = I/C`
#[derive(Clone, Debug)]
pub struct Capacity {
    capacitance: Arc<ValueSource>,
    uid: Option<Uid>,
}

impl Capacity {
    pub fn new(capacitance: Arc<ValueSource>) -> Self {
        Self {
            capacitance,
            uid: None,
        }
    }

    pub fn capacitance(&self) -> &Arc<ValueSource> {
        &self.capacitance
    }

    pub fn uid(&self) -> Option<Uid> {
        self.uid
    }
}

/// Resistor parallel to a capacitor, parametrized by `R` and `τ = R·C`.
///
/// `dV/dt = I·R/τ - V/τ`
#[derive(Clone, Debug)]
pub struct ParallelRc {
    resistance: Arc<ValueSource>,
    tau: Arc<ValueSource>,
    uid: Option<Uid>,
}

impl ParallelRc {
    pub fn new(resistance: Arc<ValueSource>, tau: Arc<ValueSource>) -> Self {
        Self {
            resistance,
            tau,
            uid: None,
        }
    }

    pub fn resistance(&self) -> &Arc<ValueSource> {
        &self.resistance
    }

    pub fn tau(&self) -> &Arc<ValueSource> {
        &self.tau
    }

    pub fn uid(&self) -> Option<Uid> {
        self.uid
    }

    /// `C = τ/R` at the current parameter values.
    pub fn capacitance(&self) -> CircuitResult<Real> {
        Ok(self.tau.value()? / self.resistance.value()?)
    }
}

/// Ideal source, e.g. an open-circuit voltage looked up over SOC.
#[derive(Clone, Debug)]
pub struct VoltageSource {
    voltage: Arc<ValueSource>,
}

impl VoltageSource {
    pub fn new(voltage: Arc<ValueSource>) -> Self {
        Self { voltage }
    }

    pub fn voltage(&self) -> &Arc<ValueSource> {
        &self.voltage
    }
}

/// Display-only inductance; not part of the time-domain model.
#[derive(Clone, Debug)]
pub struct Inductance {
    inductance: Arc<ValueSource>,
}

impl Inductance {
    pub fn new(inductance: Arc<ValueSource>) -> Self {
        Self { inductance }
    }

    pub fn inductance(&self) -> &Arc<ValueSource> {
        &self.inductance
    }
}

/// Display-only constant phase element `Z = 1/(C·(jω)^φ)`.
#[derive(Clone, Debug)]
pub struct ConstantPhaseElement {
    capacitance: Arc<ValueSource>,
    phi: Arc<ValueSource>,
}

impl ConstantPhaseElement {
    pub fn new(capacitance: Arc<ValueSource>, phi: Arc<ValueSource>) -> Self {
        Self { capacitance, phi }
    }

    pub fn capacitance(&self) -> &Arc<ValueSource> {
        &self.capacitance
    }

    pub fn phi(&self) -> &Arc<ValueSource> {
        &self.phi
    }
}

/// Closed set of leaf behaviors.
#[derive(Clone, Debug)]
pub enum Leaf {
    OhmicResistance(OhmicResistance),
    Capacity(Capacity),
    ParallelRc(ParallelRc),
    VoltageSource(VoltageSource),
    Inductance(Inductance),
    ConstantPhase(ConstantPhaseElement),
    Zarc(Zarc),
    SphericalDiffusion(SphericalDiffusion),
}

impl Leaf {
    pub fn ohmic(resistance: Arc<ValueSource>) -> Self {
        Self::OhmicResistance(OhmicResistance::new(resistance))
    }

    pub fn capacity(capacitance: Arc<ValueSource>) -> Self {
        Self::Capacity(Capacity::new(capacitance))
    }

    pub fn parallel_rc(resistance: Arc<ValueSource>, tau: Arc<ValueSource>) -> Self {
        Self::ParallelRc(ParallelRc::new(resistance, tau))
    }

    pub fn voltage_source(voltage: Arc<ValueSource>) -> Self {
        Self::VoltageSource(VoltageSource::new(voltage))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OhmicResistance(_) => "OhmicResistance",
            Self::Capacity(_) => "Capacity",
            Self::ParallelRc(_) => "ParallelRC",
            Self::VoltageSource(_) => "VoltageSource",
            Self::Inductance(_) => "Inductance",
            Self::ConstantPhase(_) => "ConstantPhaseElement",
            Self::Zarc(_) => "Zarc",
            Self::SphericalDiffusion(_) => "SphericalDiffusion",
        }
    }

    /// Allocate the differential UIDs this leaf owns.
    pub(crate) fn set_system(&mut self, ctx: &mut SystemContext<'_>) -> CircuitResult<()> {
        match self {
            Self::Capacity(c) => c.uid = Some(ctx.new_differential_uid()?),
            Self::ParallelRc(rc) => rc.uid = Some(ctx.new_differential_uid()?),
            Self::Zarc(z) => z.set_system(ctx)?,
            Self::SphericalDiffusion(s) => s.set_system(ctx)?,
            Self::OhmicResistance(_)
            | Self::VoltageSource(_)
            | Self::Inductance(_)
            | Self::ConstantPhase(_) => {}
        }
        Ok(())
    }

    /// Voltage row for `current`; stateful leaves add their rate equations.
    pub(crate) fn voltage(
        &mut self,
        current: &RowVector,
        ctx: &mut SystemContext<'_>,
    ) -> CircuitResult<RowVector> {
        match self {
            Self::OhmicResistance(r) => Ok(current * r.resistance.value()?),
            Self::Capacity(c) => {
                let uid = c.uid.ok_or(CircuitError::Detached {
                    element: "Capacity",
                })?;
                ctx.add_equations(uid, &(current / c.capacitance.value()?))?;
                Ok(ctx.unit_row(uid))
            }
            Self::ParallelRc(rc) => {
                let uid = rc.uid.ok_or(CircuitError::Detached {
                    element: "ParallelRC",
                })?;
                let r = rc.resistance.value()?;
                let tau = rc.tau.value()?;
                let mut row = current * (r / tau);
                row[ctx.column(uid)] -= 1.0 / tau;
                ctx.add_equations(uid, &row)?;
                Ok(ctx.unit_row(uid))
            }
            Self::VoltageSource(v) => Ok(ctx.constant_row(v.voltage.value()?)),
            Self::Inductance(_) => Err(CircuitError::NotSimulatable {
                element: "Inductance",
            }),
            Self::ConstantPhase(_) => Err(CircuitError::NotSimulatable {
                element: "ConstantPhaseElement",
            }),
            Self::Zarc(z) => z.voltage(current, ctx),
            Self::SphericalDiffusion(s) => s.voltage(current, ctx),
        }
    }

    /// Scalar current, voltage and dissipated power at the solved state.
    pub(crate) fn values(
        &self,
        current: &RowVector,
        voltage: &RowVector,
        ctx: &SystemContext<'_>,
    ) -> CircuitResult<LeafValues> {
        let i = ctx.evaluate(current);
        let v = ctx.evaluate(voltage);
        let power = match self {
            Self::OhmicResistance(r) => i * i * r.resistance.value()?,
            Self::ParallelRc(rc) => v * v / rc.resistance.value()?,
            Self::Zarc(z) => z.power(i, ctx),
            Self::SphericalDiffusion(s) => s.power(i, ctx)?,
            Self::Capacity(_)
            | Self::VoltageSource(_)
            | Self::Inductance(_)
            | Self::ConstantPhase(_) => 0.0,
        };
        Ok(LeafValues {
            current: i,
            voltage: v,
            power,
        })
    }
}
