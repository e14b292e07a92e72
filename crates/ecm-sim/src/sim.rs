//! Network stepping driver, simulation runner and result recording.

use ecm_circuit::{CircuitElement, SystemContext};
use ecm_core::{Real, Tolerances, nearly_equal};
use ecm_system::{EquationSystemKind, StateSystemGroup, select};
use rayon::prelude::*;
use tracing::info;

use crate::error::{SimError, SimResult};
use crate::solver::{AdaptiveOptions, IntegratorType, Solver};

/// How the differential states are advanced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SteppingMode {
    Fixed(IntegratorType),
    Variable(AdaptiveOptions),
}

impl Default for SteppingMode {
    fn default() -> Self {
        SteppingMode::Fixed(IntegratorType::default())
    }
}

/// Options for simulation runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Fixed time step (seconds); ignored by variable stepping
    pub dt: Real,
    /// Final simulation time (seconds)
    pub t_end: Real,
    /// Maximum number of steps (safety limit)
    pub max_steps: usize,
    /// Record every N-th step (decimation)
    pub record_every: usize,
    pub stepping: SteppingMode,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            dt: 1e-3,
            t_end: 1.0,
            max_steps: 100_000,
            record_every: 10,
            stepping: SteppingMode::default(),
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        if !(self.t_end >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "t_end must be non-negative",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if self.record_every == 0 {
            return Err(SimError::InvalidArg {
                what: "record_every must be positive",
            });
        }
        if let SteppingMode::Variable(opts) = &self.stepping {
            opts.validate()?;
        }
        Ok(())
    }
}

/// One circuit tree with its own state system group and solver.
#[derive(Debug)]
pub struct Network {
    root: CircuitElement,
    group: StateSystemGroup,
    kind: EquationSystemKind,
    solver: Solver,
}

impl Network {
    /// Attach `root`: allocate UIDs, fix the widths, distribute the current
    /// rows and pick a solver for the resulting equation system.
    pub fn new(root: CircuitElement) -> SimResult<Self> {
        Self::with_stepping(root, SteppingMode::default(), SimOptions::default().dt)
    }

    pub fn with_stepping(
        mut root: CircuitElement,
        stepping: SteppingMode,
        dt: Real,
    ) -> SimResult<Self> {
        let mut group = StateSystemGroup::new();
        root.set_system(&mut SystemContext::new(&mut group))?;
        group.initialize()?;
        group.set_dt(dt)?;
        root.set_initial_current(&SystemContext::new(&mut group), 0.0)?;
        let kind = select(&group);
        let solver = Solver::for_kind(kind, &stepping, dt)?;
        info!(
            root = root.name(),
            differential = group.diff_count(),
            algebraic = group.alg_count(),
            ?kind,
            "network initialized"
        );
        Ok(Self {
            root,
            group,
            kind,
            solver,
        })
    }

    /// Swap the solver, keeping the simulation clock.
    pub fn set_stepping(&mut self, stepping: SteppingMode, dt: Real) -> SimResult<()> {
        let time = self.solver.time();
        self.solver = Solver::for_kind(self.kind, &stepping, dt)?.with_time(time);
        Ok(())
    }

    /// Advance one solver step with the terminal current held at `current`.
    pub fn step(&mut self, current: Real) -> SimResult<Real> {
        self.step_inner(current, None)
    }

    /// Like [`Network::step`]; variable stepping never passes `limit`.
    pub fn step_until(&mut self, current: Real, limit: Real) -> SimResult<Real> {
        self.step_inner(current, Some(limit))
    }

    fn step_inner(&mut self, current: Real, limit: Option<Real>) -> SimResult<Real> {
        if !current.is_finite() {
            return Err(SimError::NonFinite {
                what: "terminal current",
                value: current,
            });
        }
        self.root.set_current_value(current)?;
        self.group.reset_system();
        self.root.get_voltage(&mut SystemContext::new(&mut self.group))?;
        let time = match limit {
            Some(limit) => self.solver.solve_until(&mut self.group, limit)?,
            None => self.solver.solve(&mut self.group)?,
        };
        self.root
            .calculate_state_dependent_values(&SystemContext::new(&mut self.group))?;
        Ok(time)
    }

    pub fn time(&self) -> Real {
        self.solver.time()
    }

    pub fn kind(&self) -> EquationSystemKind {
        self.kind
    }

    pub fn terminal_voltage(&self) -> Real {
        self.root.voltage_value()
    }

    pub fn current(&self) -> Real {
        self.root.current_value()
    }

    /// Power dissipated in the whole tree.
    pub fn power(&self) -> Real {
        self.root.power_value()
    }

    /// SOC in percent when the root is a cell element.
    pub fn soc(&self) -> Option<Real> {
        self.root.cell_state().map(|cell| cell.soc().value())
    }

    pub fn root(&self) -> &CircuitElement {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut CircuitElement {
        &mut self.root
    }

    pub fn group(&self) -> &StateSystemGroup {
        &self.group
    }
}

/// Record of simulation results.
#[derive(Clone, Debug, Default)]
pub struct SimRecord {
    /// Time points (seconds)
    pub t: Vec<Real>,
    pub voltage: Vec<Real>,
    pub current: Vec<Real>,
    pub power: Vec<Real>,
    /// Empty unless the root is a cell element
    pub soc: Vec<Real>,
}

impl SimRecord {
    fn push(&mut self, t: Real, network: &Network) {
        self.t.push(t);
        self.voltage.push(network.terminal_voltage());
        self.current.push(network.current());
        self.power.push(network.power());
        if let Some(soc) = network.soc() {
            self.soc.push(soc);
        }
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

/// Run a transient simulation, driving the terminal current from `profile(t)`.
pub fn run_sim<F>(network: &mut Network, profile: F, opts: &SimOptions) -> SimResult<SimRecord>
where
    F: Fn(Real) -> Real,
{
    opts.validate()?;
    network.set_stepping(opts.stepping, opts.dt)?;

    let mut t = network.time();
    let mut record = SimRecord::default();
    record.push(t, network);

    // accumulated dt may land a hair below t_end
    let tol = Tolerances::default();
    let mut step = 0;
    while t < opts.t_end && !nearly_equal(t, opts.t_end, tol) && step < opts.max_steps {
        let current = profile(t);
        t = match opts.stepping {
            SteppingMode::Fixed(_) => network.step(current)?,
            SteppingMode::Variable(_) => network.step_until(current, opts.t_end)?,
        };
        step += 1;

        if step % opts.record_every == 0 {
            record.push(t, network);
        }
    }

    // Always record final state
    if step % opts.record_every != 0 {
        record.push(t, network);
    }

    Ok(record)
}

/// Simulate independent networks concurrently with the same profile.
pub fn run_pack<F>(networks: &mut [Network], profile: F, opts: &SimOptions) -> Vec<SimResult<SimRecord>>
where
    F: Fn(Real) -> Real + Sync,
{
    networks
        .par_iter_mut()
        .map(|network| run_sim(network, &profile, opts))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecm_circuit::Leaf;
    use ecm_core::ValueSource;

    #[test]
    fn sim_options_defaults() {
        let opts = SimOptions::default();
        assert_eq!(opts.dt, 1e-3);
        assert_eq!(opts.t_end, 1.0);
        assert_eq!(opts.max_steps, 100_000);
        assert_eq!(opts.record_every, 10);
        assert_eq!(opts.stepping, SteppingMode::Fixed(IntegratorType::RK4));
    }

    #[test]
    fn sim_options_invalid() {
        let bad = [
            SimOptions {
                dt: 0.0,
                ..Default::default()
            },
            SimOptions {
                t_end: -1.0,
                ..Default::default()
            },
            SimOptions {
                max_steps: 0,
                ..Default::default()
            },
            SimOptions {
                record_every: 0,
                ..Default::default()
            },
        ];
        for opts in &bad {
            assert!(matches!(opts.validate(), Err(SimError::InvalidArg { .. })));
        }
    }

    #[test]
    fn network_steps_a_resistor() {
        let root = CircuitElement::serial()
            .with_child(Leaf::ohmic(ValueSource::constant(2.0)))
            .unwrap();
        let mut network = Network::new(root).unwrap();
        assert_eq!(network.kind(), EquationSystemKind::Algebraic);
        let t = network.step(3.0).unwrap();
        assert!((t - 1e-3).abs() < 1e-15);
        assert_eq!(network.terminal_voltage(), 6.0);
        assert_eq!(network.power(), 18.0);
        assert_eq!(network.soc(), None);
        assert!(network.step(Real::NAN).is_err());
    }

    #[test]
    fn accumulated_steps_stop_at_end_time() {
        let root = CircuitElement::serial()
            .with_child(Leaf::ohmic(ValueSource::constant(1.0)))
            .unwrap();
        let mut network = Network::new(root).unwrap();
        let opts = SimOptions {
            dt: 0.1,
            t_end: 1.0,
            record_every: 1,
            ..Default::default()
        };
        let record = run_sim(&mut network, |_| 1.0, &opts).unwrap();
        // ten steps of 0.1 sum to 0.9999999999999999
        assert_eq!(record.len(), 11);
        assert!((record.t[10] - 1.0).abs() < 1e-12);
    }
}
