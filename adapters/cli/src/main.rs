#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Getaway simulation.

mod autopilot;

use std::{path::PathBuf, time::Duration};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use getaway_core::{Event, UpgradeKind, WaypointState};
use getaway_simulation::{Simulation, SimulationConfig};
use getaway_world::query;
use log::{debug, info, warn};

use autopilot::Autopilot;

/// Runs a headless Getaway simulation driven by an autopilot.
#[derive(Debug, Parser)]
#[command(
    name = "getaway",
    about = "Run a headless Getaway simulation with an autopilot driver"
)]
struct Cli {
    /// TOML configuration file; built-in defaults apply when omitted.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Overrides the configured random seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated seconds to run before stopping.
    #[arg(long, default_value_t = 300.0)]
    duration: f32,

    /// Simulated seconds per tick.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    step: f32,
}

/// Entry point for the Getaway command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    ensure!(
        cli.step.is_finite() && cli.step > 0.0,
        "step must be a positive number of seconds, got {}",
        cli.step
    );
    ensure!(
        cli.duration.is_finite() && cli.duration >= 0.0,
        "duration must be a non-negative number of seconds, got {}",
        cli.duration
    );

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    info!("starting run with seed {:#x}", config.seed);

    let mut simulation = Simulation::new(config).context("invalid simulation configuration")?;
    let mut autopilot = Autopilot::new(simulation.world());
    let dt = Duration::from_secs_f32(cli.step);
    let ticks = (cli.duration / cli.step).ceil() as u64;

    for _ in 0..ticks {
        let input = autopilot.drive(simulation.world(), dt);
        let mut events = simulation.tick(input);
        for command in autopilot.contacts(simulation.world()) {
            events.extend(simulation.submit(command));
        }
        if query::waypoint(simulation.world()) == WaypointState::Docked {
            for command in autopilot.shop() {
                events.extend(simulation.submit(command));
            }
        }

        report(&events);
        if simulation.outcome().is_terminal() {
            break;
        }
    }

    summarize(&simulation);
    Ok(())
}

fn report(events: &[Event]) {
    for event in events {
        match event {
            Event::ChaseStarted { agent_speed } => {
                warn!("police on your tail (top speed {agent_speed:.1})");
            }
            Event::ChaseEnded { reason } => info!("chase over: {reason:?}"),
            Event::ShieldAbsorbedHit { traffic } => {
                info!("shield absorbed a hit from car {}", traffic.get());
            }
            Event::PickupCollected { kind, .. } => info!("collected {kind:?}"),
            Event::PitStopReached => info!("pulled into the pit stop"),
            Event::UpgradePurchased { kind, level, cost } => {
                info!("bought {kind:?} level {level} for {cost}");
            }
            Event::WaypointSkipped => info!("missed the pit stop"),
            Event::RunEnded { outcome } => info!("run ended: {outcome:?}"),
            Event::TimeAdvanced { .. } => {}
            other => debug!("{other:?}"),
        }
    }
}

fn summarize(simulation: &Simulation) {
    let world = simulation.world();
    println!("outcome:   {:?}", simulation.outcome());
    println!("distance:  {:.0}", query::distance_travelled(world));
    println!("coins:     {}", query::coins(world));
    println!("fuel:      {:.1}%", query::fuel_fraction(world) * 100.0);
    for kind in UpgradeKind::ALL {
        println!(
            "{:<10} level {}",
            format!("{kind:?}:"),
            query::upgrade_level(world, kind)
        );
    }
    println!("heat:      {:.0}", simulation.pursuit().heat());
    println!("ticks:     {}", query::tick_index(world));
}
