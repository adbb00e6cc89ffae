#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Central scheduler that wires the world and the pure systems together.
//!
//! A [`Simulation`] owns the authoritative world plus the spawning and
//! pursuit systems, and advances them in dependency order on every
//! [`Simulation::tick`]: the player's motion and the clock are applied
//! first, spawn commands are applied next so new cars register before
//! anything reads the lanes again, and the pursuit system runs last.

use std::time::Duration;

use getaway_core::{Command, Event, RunOutcome};
use getaway_system_pursuit::{Pursuit, PursuitContext};
use getaway_system_spawning::{SpawnContext, Spawning};
use getaway_world::{self as world, query, World};
use log::debug;

mod config;

pub use config::{ConfigError, SimulationConfig};

const PURSUIT_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;

/// Motion reported by the vehicle controller for a single tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriverInput {
    /// Forward position of the player along the road.
    pub position: f32,
    /// Forward speed of the player.
    pub speed: f32,
    /// Lateral coordinate of the player across the lanes.
    pub lateral: f32,
    /// Simulated time elapsed since the previous tick.
    pub dt: Duration,
}

/// A single run of the driving simulation.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    spawning: Spawning,
    pursuit: Pursuit,
}

impl Simulation {
    /// Validates the configuration and builds a run ready for its first tick.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let start = config.world.player_start;
        let spawning = Spawning::new(config.spawning, start, config.seed);
        let pursuit = Pursuit::new(config.pursuit, config.seed ^ PURSUIT_STREAM);
        Ok(Self {
            world: World::new(config.world),
            spawning,
            pursuit,
        })
    }

    /// Read-only access to the authoritative world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Read-only access to the pursuit state machine.
    #[must_use]
    pub fn pursuit(&self) -> &Pursuit {
        &self.pursuit
    }

    /// Outcome of the run so far.
    #[must_use]
    pub fn outcome(&self) -> RunOutcome {
        query::outcome(&self.world)
    }

    /// Advances the run by one tick, returning every event it produced.
    pub fn tick(&mut self, input: DriverInput) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::DrivePlayer {
                position: input.position,
                speed: input.speed,
                lateral: input.lateral,
            },
            &mut events,
        );
        world::apply(&mut self.world, Command::Tick { dt: input.dt }, &mut events);
        self.dispatch(events)
    }

    /// Applies an out-of-band command such as a collision report or a pit stop action.
    pub fn submit(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        self.dispatch(events)
    }

    fn dispatch(&mut self, mut events: Vec<Event>) -> Vec<Event> {
        if events.is_empty() {
            return events;
        }

        let mut spawn_commands = Vec::new();
        {
            let context = SpawnContext {
                player: query::player(&self.world),
                lanes: query::lanes(&self.world),
                occupancy: query::lane_occupancy(&self.world),
                waypoint: query::waypoint(&self.world),
                phase: self.pursuit.phase(),
                fuel_fraction: query::fuel_fraction(&self.world),
                pickups: query::pickup_census(&self.world),
            };
            self.spawning.handle(&events, &context, &mut spawn_commands);
        }

        let mut spawned = Vec::new();
        for command in spawn_commands {
            world::apply(&mut self.world, command, &mut spawned);
        }

        let mut pursuit_events = Vec::new();
        let mut pursuit_commands = Vec::new();
        {
            let context = PursuitContext {
                player: query::player(&self.world),
                player_max_speed: query::player_max_speed(&self.world),
                upgrades: query::total_upgrades(&self.world),
                lanes: query::lanes(&self.world),
            };
            self.pursuit.handle(
                &events,
                &context,
                &mut pursuit_events,
                &mut pursuit_commands,
            );
        }

        events.extend(spawned);
        events.extend(pursuit_events);
        for command in pursuit_commands {
            world::apply(&mut self.world, command, &mut events);
        }

        debug!(
            "tick {} produced {} events",
            query::tick_index(&self.world),
            events.len()
        );
        events
    }
}
