#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for traffic, pickup, and pit stop placement.
//!
//! Each category runs an independent countdown driven by the distance-based
//! difficulty curve. Traffic batches consult [`SpeedSafety`] against the
//! world's lane occupancy view so no car is placed closer than a
//! speed-dependent following distance to the car ahead of it.

use getaway_core::{
    Command, Event, LaneIndex, LaneLayout, LaneOccupancyView, PickupCensus, PlayerSnapshot,
    PursuitPhase, WaypointState,
};
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

mod pickups;
mod safety;
mod traffic;

pub use pickups::{CoinSpawnConfig, FuelSpawnConfig, PowerUpSpawnConfig};
pub use safety::{SafetyTuning, SpawnClearance, SpeedSafety};
pub use traffic::TrafficSpawnConfig;

use pickups::PickupSpawner;
use traffic::TrafficSpawner;

/// Tuning for pit stop placement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaypointSpawnConfig {
    /// Distance ahead of the player at which the next pit stop is placed.
    pub spacing: f32,
}

impl Default for WaypointSpawnConfig {
    fn default() -> Self {
        Self { spacing: 1_000.0 }
    }
}

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Following distance guarantee applied to traffic.
    pub safety: SafetyTuning,
    /// Traffic batch cadence and composition.
    pub traffic: TrafficSpawnConfig,
    /// Fuel pickup cadence.
    pub fuel: FuelSpawnConfig,
    /// Coin pickup cadence.
    pub coins: CoinSpawnConfig,
    /// Power-up pickup cadence.
    pub power_ups: PowerUpSpawnConfig,
    /// Pit stop placement.
    pub waypoint: WaypointSpawnConfig,
}

/// Read-only views the spawning system consults on every tick.
#[derive(Clone, Copy, Debug)]
pub struct SpawnContext<'a> {
    /// Player motion as of the current tick.
    pub player: PlayerSnapshot,
    /// Lane layout of the road.
    pub lanes: &'a LaneLayout,
    /// Frontmost live car of every lane.
    pub occupancy: &'a LaneOccupancyView,
    /// State of the pit stop waypoint.
    pub waypoint: WaypointState,
    /// Current pursuit phase.
    pub phase: PursuitPhase,
    /// Fraction of the fuel tank currently filled.
    pub fuel_fraction: f32,
    /// Live pickups by category.
    pub pickups: PickupCensus,
}

/// Pure system that deterministically emits spawn commands as simulated time advances.
#[derive(Debug)]
pub struct Spawning {
    safety: SpeedSafety,
    traffic: TrafficSpawner,
    pickups: PickupSpawner,
    waypoint: WaypointSpawnConfig,
    rng: ChaCha8Rng,
}

impl Spawning {
    /// Creates a new spawning system anchored at the run's start position.
    #[must_use]
    pub fn new(config: Config, start_position: f32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let pickups = PickupSpawner::new(
            config.fuel,
            config.coins,
            config.power_ups,
            start_position,
            &mut rng,
        );
        Self {
            safety: SpeedSafety::new(config.safety),
            traffic: TrafficSpawner::new(config.traffic, start_position),
            pickups,
            waypoint: config.waypoint,
            rng,
        }
    }

    /// Speed safety calculator used for traffic placement.
    #[must_use]
    pub fn safety(&self) -> &SpeedSafety {
        &self.safety
    }

    /// Seconds until the next traffic batch is attempted.
    #[must_use]
    pub fn traffic_timer(&self) -> f32 {
        self.traffic.timer()
    }

    /// Consumes events and immutable views to emit spawn commands.
    pub fn handle(&mut self, events: &[Event], context: &SpawnContext<'_>, out: &mut Vec<Command>) {
        let mut ticked = false;
        let mut elapsed = 0.0;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                ticked = true;
                elapsed += dt.as_secs_f32();
            }
        }

        if !ticked {
            return;
        }

        if context.waypoint == WaypointState::Vacant && !context.lanes.is_empty() {
            let lane = LaneIndex::new(self.rng.gen_range(0..context.lanes.len()) as u32);
            let position = context.player.position + self.waypoint.spacing;
            info!("next pit stop in lane {} at {position:.0}", lane.get());
            out.push(Command::PlaceWaypoint { lane, position });
        }

        self.traffic
            .advance(elapsed, context, &self.safety, &mut self.rng, out);
        self.pickups.advance(elapsed, context, &mut self.rng, out);
    }
}

/// Uniform sample in `[low, high]`, or `low` when the range is empty.
fn uniform(rng: &mut ChaCha8Rng, low: f32, high: f32) -> f32 {
    if high > low {
        rng.gen_range(low..=high)
    } else {
        low
    }
}

#[cfg(test)]
mod tests {
    use super::{uniform, Config};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn uniform_collapses_empty_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(uniform(&mut rng, 5.0, 5.0), 5.0);
        assert_eq!(uniform(&mut rng, 5.0, 1.0), 5.0);
        let value = uniform(&mut rng, -0.8, 0.8);
        assert!((-0.8..=0.8).contains(&value));
    }

    #[test]
    fn config_reads_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [traffic]
            max_per_batch = 3
            models = ["bus"]

            [safety]
            minimum_gap = 12.0
            "#,
        )
        .expect("parse");
        assert_eq!(config.traffic.max_per_batch, 3);
        assert_eq!(config.traffic.lead_distance, 150.0);
        assert_eq!(config.safety.minimum_gap, 12.0);
        assert_eq!(config.safety.speed_buffer, 2.0);
        assert_eq!(config.coins.max_live, 3);
    }
}
