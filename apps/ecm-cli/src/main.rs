mod error;
mod scenarios;

use clap::{Parser, Subcommand, ValueEnum};
use ecm_circuit::warburg::{self, WarburgOptions};
use ecm_circuit::{
    CircuitElement, Decomposition, DecompositionOptions, Leaf, RcBranch, SimplificationMode, Zarc,
};
use ecm_core::{Real, ValueSource};
use ecm_sim::{
    AdaptiveOptions, IntegratorType, Network, SimOptions, SimRecord, SteppingMode, run_pack,
    run_sim,
};
use serde::Serialize;
use tracing::info;

use crate::error::{CliError, CliResult};
use crate::scenarios::Scenario;

#[derive(Parser)]
#[command(name = "ecm-cli")]
#[command(about = "Equivalent-circuit battery network simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a built-in network under a constant current
    Run {
        scenario: Scenario,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Print the RC decomposition of a distributed element
    Decompose {
        kind: DecomposeKind,
        /// Relaxation time τ (zarc, warburg-tanh)
        #[arg(long, default_value_t = 1.0)]
        tau: Real,
        /// Resistance R (zarc, warburg-tanh)
        #[arg(long, default_value_t = 0.01)]
        resistance: Real,
        /// Shape exponent φ (zarc)
        #[arg(long, default_value_t = 0.8)]
        phi: Real,
        /// Warburg coefficient σ (warburg-cotanh)
        #[arg(long, default_value_t = 0.05)]
        sigma: Real,
        /// Limiting capacity (warburg-cotanh)
        #[arg(long, default_value_t = 1000.0)]
        clim: Real,
        /// Sample rate in Hz
        #[arg(long, default_value_t = 1e6)]
        sample_rate: Real,
        /// Number of Warburg terms
        #[arg(long, default_value_t = 5)]
        terms: usize,
        /// Use the forward Euler stability threshold
        #[arg(long)]
        euler_stability: bool,
        #[arg(long)]
        json: bool,
    },
    /// Simulate a pack of cells in parallel
    Pack {
        /// Number of cells
        #[arg(long, default_value_t = 8)]
        cells: usize,
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Time step in seconds
    #[arg(long, default_value_t = 1e-2)]
    dt: Real,
    /// End time in seconds
    #[arg(long, default_value_t = 10.0)]
    t_end: Real,
    /// Terminal current in A (positive charges)
    #[arg(long, default_value_t = 1.0)]
    current: Real,
    /// Use the error-controlled variable-step solver
    #[arg(long)]
    variable_step: bool,
    /// Record every N-th step
    #[arg(long, default_value_t = 10)]
    record_every: usize,
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    fn sim_options(&self) -> SimOptions {
        let stepping = if self.variable_step {
            SteppingMode::Variable(AdaptiveOptions {
                initial_step: self.dt,
                ..Default::default()
            })
        } else {
            SteppingMode::Fixed(IntegratorType::RK4)
        };
        SimOptions {
            dt: self.dt,
            t_end: self.t_end,
            record_every: self.record_every,
            stepping,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DecomposeKind {
    Zarc,
    WarburgTanh,
    WarburgCotanh,
}

#[derive(Serialize)]
struct Sample {
    t: Real,
    voltage: Real,
    current: Real,
    power: Real,
    #[serde(skip_serializing_if = "Option::is_none")]
    soc: Option<Real>,
}

fn samples(record: &SimRecord) -> Vec<Sample> {
    (0..record.len())
        .map(|i| Sample {
            t: record.t[i],
            voltage: record.voltage[i],
            current: record.current[i],
            power: record.power[i],
            soc: record.soc.get(i).copied(),
        })
        .collect()
}

#[derive(Serialize)]
struct Branch {
    resistance: Real,
    capacitance: Real,
    tau: Real,
}

impl From<&RcBranch> for Branch {
    fn from(b: &RcBranch) -> Self {
        Self {
            resistance: b.resistance,
            capacitance: b.capacitance,
            tau: b.tau(),
        }
    }
}

#[derive(Serialize)]
struct DecompositionReport {
    branches: Vec<Branch>,
    residual: Option<Real>,
    capacity: Option<Real>,
}

#[derive(Serialize)]
struct CellSummary {
    cell: usize,
    voltage: Real,
    soc: Option<Real>,
    dissipated_energy: Option<Real>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { scenario, run } => cmd_run(scenario, &run),
        Commands::Decompose {
            kind,
            tau,
            resistance,
            phi,
            sigma,
            clim,
            sample_rate,
            terms,
            euler_stability,
            json,
        } => {
            let decomposition = DecompositionOptions {
                sample_rate,
                mode: if euler_stability {
                    SimplificationMode::EulerStability
                } else {
                    SimplificationMode::Standard
                },
            };
            let report = match kind {
                DecomposeKind::Zarc => {
                    let min_dt = decomposition.min_dt()?;
                    let zarc = Zarc::new(
                        ValueSource::constant(tau),
                        ValueSource::constant(resistance),
                        ValueSource::constant(phi),
                        min_dt,
                    )?;
                    report_from(&zarc.decomposition()?, None)
                }
                DecomposeKind::WarburgTanh | DecomposeKind::WarburgCotanh => {
                    let opts = WarburgOptions {
                        terms,
                        decomposition,
                        with_capacity: true,
                    };
                    let ladder = match kind {
                        DecomposeKind::WarburgTanh => warburg::tanh(
                            ValueSource::constant(resistance),
                            ValueSource::constant(tau),
                            &opts,
                        )?,
                        _ => warburg::cotanh(
                            ValueSource::constant(sigma),
                            ValueSource::constant(clim),
                            &opts,
                        )?,
                    };
                    ladder_report(&ladder)?
                }
            };
            print_report(&report, json)
        }
        Commands::Pack { cells, run } => cmd_pack(cells, &run),
    }
}

fn cmd_run(scenario: Scenario, args: &RunArgs) -> CliResult<()> {
    let root = scenarios::build(scenario, args.dt)?;
    let mut network = Network::new(root)?;
    let current = args.current;
    info!(?scenario, dt = args.dt, t_end = args.t_end, current, "starting run");
    let record = run_sim(&mut network, |_| current, &args.sim_options())?;
    info!(samples = record.len(), t = network.time(), "run finished");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&samples(&record))?);
        return Ok(());
    }

    println!(
        "Scenario {:?}: {:?}, {} differential / {} algebraic states",
        scenario,
        network.kind(),
        network.group().diff_count(),
        network.group().alg_count()
    );
    println!(
        "{:>10} {:>12} {:>10} {:>12} {:>8}",
        "t [s]", "U [V]", "I [A]", "P [W]", "SOC [%]"
    );
    for s in samples(&record) {
        let soc = s.soc.map(|v| format!("{v:.3}")).unwrap_or_default();
        println!(
            "{:>10.4} {:>12.6} {:>10.4} {:>12.6} {:>8}",
            s.t, s.voltage, s.current, s.power, soc
        );
    }
    Ok(())
}

fn cmd_pack(cells: usize, args: &RunArgs) -> CliResult<()> {
    if cells == 0 {
        return Err(CliError::InvalidArg("pack needs at least one cell".into()));
    }
    let mut pack = (0..cells)
        .map(|i| -> CliResult<Network> {
            // spread of ±10 % in R0
            let spread = 0.9 + 0.2 * i as Real / cells.max(2).saturating_sub(1) as Real;
            let root = scenarios::cell(2.0, 80.0, 0.012 * spread, args.dt)?;
            Ok(Network::new(root)?)
        })
        .collect::<CliResult<Vec<_>>>()?;

    let current = args.current;
    info!(cells, dt = args.dt, t_end = args.t_end, current, "starting pack");
    for record in run_pack(&mut pack, |_| current, &args.sim_options()) {
        record?;
    }

    let summary: Vec<CellSummary> = pack
        .iter()
        .enumerate()
        .map(|(cell, network)| CellSummary {
            cell,
            voltage: network.terminal_voltage(),
            soc: network.soc(),
            dissipated_energy: network.root().cell_state().map(|c| c.dissipated_energy()),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!("{:>5} {:>12} {:>10} {:>12}", "cell", "U [V]", "SOC [%]", "Q [J]");
    for s in &summary {
        println!(
            "{:>5} {:>12.6} {:>10.4} {:>12.4}",
            s.cell,
            s.voltage,
            s.soc.unwrap_or(Real::NAN),
            s.dissipated_energy.unwrap_or(Real::NAN)
        );
    }
    Ok(())
}

fn report_from(decomposition: &Decomposition, capacity: Option<Real>) -> DecompositionReport {
    DecompositionReport {
        branches: decomposition.branches.iter().map(Branch::from).collect(),
        residual: decomposition.residual,
        capacity,
    }
}

/// Read branch values back out of a Warburg ladder.
fn ladder_report(ladder: &CircuitElement) -> CliResult<DecompositionReport> {
    let mut decomposition = Decomposition::default();
    let mut capacity = None;
    for child in ladder.children() {
        match child.leaf() {
            Some(Leaf::ParallelRc(rc)) => decomposition.branches.push(RcBranch {
                resistance: rc.resistance().value()?,
                capacitance: rc.capacitance()?,
            }),
            Some(Leaf::OhmicResistance(r)) => {
                decomposition.residual = Some(r.resistance().value()?);
            }
            Some(Leaf::Capacity(c)) => capacity = Some(c.capacitance().value()?),
            _ => {
                return Err(CliError::InvalidArg(format!(
                    "unexpected {} in warburg ladder",
                    child.name()
                )));
            }
        }
    }
    Ok(report_from(&decomposition, capacity))
}

fn print_report(report: &DecompositionReport, json: bool) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("{:>4} {:>14} {:>14} {:>14}", "#", "R [Ohm]", "C [F]", "tau [s]");
    for (i, b) in report.branches.iter().enumerate() {
        println!(
            "{:>4} {:>14.6e} {:>14.6e} {:>14.6e}",
            i + 1,
            b.resistance,
            b.capacitance,
            b.tau
        );
    }
    match report.residual {
        Some(r) => println!("residual resistance: {r:.6e} Ohm"),
        None => println!("residual resistance: none"),
    }
    if let Some(c) = report.capacity {
        println!("limiting capacity: {c:.6e} F");
    }
    Ok(())
}
