#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Getaway.
//!
//! The world owns every piece of shared mutable simulation state: the lane
//! registry, the traffic and pickup populations, the player's reported
//! motion, the fuel tank, the coin ledger, timed effects, the pit stop
//! waypoint, and the run outcome. All mutation goes through [`apply`]; all
//! reads go through the [`query`] module.

use std::collections::BTreeMap;

use getaway_core::{
    Command, EffectKind, Event, LaneIndex, LaneLayout, LaneOccupancyView, PickupId, PickupKind,
    RunOutcome, TrafficId, TrafficSnapshot, UpgradeKind, WaypointState,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

mod effects;
mod fuel;
mod ledger;
mod occupancy;

pub use fuel::FuelTuning;
pub use ledger::{UpgradeCatalog, UpgradeTrack};
pub use occupancy::{LaneOccupancy, LaneRegistry, TrafficLookup};

use effects::Effects;
use fuel::FuelTank;
use ledger::Ledger;

/// Tuning for pickups and the effects they grant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupTuning {
    /// Fuel restored by a fuel pickup.
    pub fuel_amount: f32,
    /// Coins granted by a coin pickup.
    pub coin_value: f32,
    /// Seconds a fuel pickup stays on the road.
    pub fuel_lifetime: f32,
    /// Seconds a coin pickup stays on the road.
    pub coin_lifetime: f32,
    /// Seconds a speed boost or shield pickup stays on the road.
    pub power_up_lifetime: f32,
    /// Seconds of protection granted by a shield pickup.
    pub shield_duration: f32,
    /// Seconds of boosted top speed granted by a speed boost pickup.
    pub boost_duration: f32,
    /// Top speed multiplier granted by a speed boost pickup.
    pub boost_multiplier: f32,
}

impl PickupTuning {
    fn lifetime(&self, kind: PickupKind) -> f32 {
        match kind {
            PickupKind::Fuel => self.fuel_lifetime,
            PickupKind::Coin => self.coin_lifetime,
            PickupKind::SpeedBoost | PickupKind::Shield => self.power_up_lifetime,
        }
    }
}

impl Default for PickupTuning {
    fn default() -> Self {
        Self {
            fuel_amount: 25.0,
            coin_value: 75.0,
            fuel_lifetime: 30.0,
            coin_lifetime: 20.0,
            power_up_lifetime: 15.0,
            shield_duration: 5.0,
            boost_duration: 8.0,
            boost_multiplier: 1.5,
        }
    }
}

/// Configuration parameters required to construct the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Lateral coordinates of the lanes.
    pub lanes: LaneLayout,
    /// Forward position the player starts the run at.
    pub player_start: f32,
    /// Distance behind the player at which traffic is retired.
    pub destroy_behind: f32,
    /// Distance the player must travel to win the run.
    pub journey_distance: f32,
    /// Coins earned per unit of forward distance travelled.
    pub coin_per_distance: f32,
    /// Coins held when the run starts.
    pub starting_coins: f32,
    /// Distance past an active pit stop after which it counts as skipped.
    pub waypoint_skip_threshold: f32,
    /// Fuel consumption tuning.
    pub fuel: FuelTuning,
    /// Pickup and effect tuning.
    pub pickups: PickupTuning,
    /// Upgrade stat and cost tables.
    pub upgrades: UpgradeCatalog,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            lanes: LaneLayout::default(),
            player_start: 0.0,
            destroy_behind: 20.0,
            journey_distance: 5_000.0,
            coin_per_distance: 0.2,
            starting_coins: 0.0,
            waypoint_skip_threshold: 20.0,
            fuel: FuelTuning::default(),
            pickups: PickupTuning::default(),
            upgrades: UpgradeCatalog::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Active,
    Retired,
}

#[derive(Clone, Debug)]
struct TrafficCar {
    id: TrafficId,
    lane: LaneIndex,
    position: f32,
    speed: f32,
    lifecycle: Lifecycle,
}

impl TrafficCar {
    fn snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot {
            id: self.id,
            lane: self.lane,
            position: self.position,
            speed: self.speed,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct TrafficStore {
    cars: BTreeMap<TrafficId, TrafficCar>,
}

impl TrafficStore {
    fn live(&self, traffic: TrafficId) -> Option<&TrafficCar> {
        self.cars
            .get(&traffic)
            .filter(|car| car.lifecycle == Lifecycle::Active)
    }
}

impl TrafficLookup for TrafficStore {
    fn live_position(&self, traffic: TrafficId) -> Option<f32> {
        self.live(traffic).map(|car| car.position)
    }
}

#[derive(Clone, Debug)]
struct Pickup {
    id: PickupId,
    kind: PickupKind,
    lane: LaneIndex,
    position: f32,
    remaining: f32,
}

#[derive(Clone, Copy, Debug)]
struct Player {
    position: f32,
    speed: f32,
    lateral: f32,
    lane: LaneIndex,
}

/// Represents the authoritative Getaway world state.
#[derive(Debug)]
pub struct World {
    lanes: LaneLayout,
    destroy_behind: f32,
    journey_distance: f32,
    coin_per_distance: f32,
    skip_threshold: f32,
    pickup_tuning: PickupTuning,
    registry: LaneRegistry,
    traffic: TrafficStore,
    occupancy: LaneOccupancyView,
    pickups: Vec<Pickup>,
    player: Player,
    start_position: f32,
    coin_anchor: f32,
    fuel: FuelTank,
    ledger: Ledger,
    effects: Effects,
    waypoint: WaypointState,
    outcome: RunOutcome,
    next_traffic: u32,
    next_pickup: u32,
    tick_index: u64,
}

impl World {
    /// Creates a new world ready for simulation.
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        let lanes = config.lanes;
        let center = lanes.center();
        let player = Player {
            position: config.player_start,
            speed: 0.0,
            lateral: lanes.coordinate(center).unwrap_or(0.0),
            lane: center,
        };
        let ledger = Ledger::new(config.upgrades, config.starting_coins);
        let fuel = FuelTank::full(ledger.stat(UpgradeKind::FuelTank), config.fuel);

        let mut world = Self {
            registry: LaneRegistry::new(lanes.len()),
            occupancy: LaneOccupancyView::from_frontmost(vec![None; lanes.len()]),
            lanes,
            destroy_behind: config.destroy_behind,
            journey_distance: config.journey_distance,
            coin_per_distance: config.coin_per_distance,
            skip_threshold: config.waypoint_skip_threshold,
            pickup_tuning: config.pickups,
            traffic: TrafficStore::default(),
            pickups: Vec::new(),
            player,
            start_position: config.player_start,
            coin_anchor: config.player_start,
            fuel,
            ledger,
            effects: Effects::new(),
            waypoint: WaypointState::Vacant,
            outcome: RunOutcome::Running,
            next_traffic: 0,
            next_pickup: 0,
            tick_index: 0,
        };
        world.refresh_occupancy();
        world
    }

    fn tick(&mut self, dt: std::time::Duration, out_events: &mut Vec<Event>) {
        if self.outcome.is_terminal() || self.waypoint == WaypointState::Docked {
            return;
        }

        self.tick_index = self.tick_index.saturating_add(1);
        out_events.push(Event::TimeAdvanced { dt });
        let seconds = dt.as_secs_f32();

        self.advance_traffic(seconds, out_events);
        self.age_pickups(seconds, out_events);
        self.age_effects(seconds, out_events);
        self.burn_fuel(seconds, out_events);
        self.earn_distance_coins(out_events);
        self.check_waypoint_skip(out_events);

        if self.fuel.is_empty() {
            self.end_run(RunOutcome::OutOfFuel, out_events);
        } else if self.journey_distance > 0.0
            && self.player.position - self.start_position >= self.journey_distance
        {
            self.end_run(RunOutcome::Victory, out_events);
        }

        self.refresh_occupancy();
    }

    fn advance_traffic(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        let threshold = self.player.position - self.destroy_behind;
        let mut retired = Vec::new();
        for car in self.traffic.cars.values_mut() {
            if car.lifecycle != Lifecycle::Active {
                continue;
            }
            car.position += car.speed * dt;
            if car.position < threshold {
                car.lifecycle = Lifecycle::Retired;
                retired.push(car.id);
            }
        }

        for traffic in retired {
            self.retire(traffic, out_events);
        }
    }

    /// Unregisters and drops the car in one step so no later query observes it.
    fn retire(&mut self, traffic: TrafficId, out_events: &mut Vec<Event>) {
        let Some(car) = self.traffic.cars.remove(&traffic) else {
            return;
        };
        self.registry.unregister(car.id, car.lane);
        out_events.push(Event::TrafficRetired {
            traffic: car.id,
            lane: car.lane,
        });
    }

    fn age_pickups(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        for pickup in &mut self.pickups {
            pickup.remaining -= dt;
        }
        self.pickups.retain(|pickup| {
            if pickup.remaining > 0.0 {
                return true;
            }
            out_events.push(Event::PickupExpired {
                pickup: pickup.id,
                kind: pickup.kind,
            });
            false
        });
    }

    fn age_effects(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        let mut expired = Vec::new();
        self.effects.tick(dt, &mut expired);
        for effect in expired {
            debug!("{effect:?} expired");
            out_events.push(Event::EffectExpired { effect });
        }
    }

    fn burn_fuel(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        self.fuel.burn(self.player.speed, dt);
        if self
            .fuel
            .track_lane_change(self.player.lateral, self.lanes.coordinates())
        {
            self.push_fuel(out_events);
        }
    }

    fn earn_distance_coins(&mut self, out_events: &mut Vec<Event>) {
        let travelled = self.player.position - self.coin_anchor;
        if travelled <= 0.0 {
            return;
        }
        self.coin_anchor = self.player.position;
        self.credit(travelled * self.coin_per_distance, out_events);
    }

    fn credit(&mut self, amount: f32, out_events: &mut Vec<Event>) {
        let before = self.ledger.whole_coins();
        self.ledger.earn(amount);
        let after = self.ledger.whole_coins();
        if after != before {
            out_events.push(Event::CoinsChanged { coins: after });
        }
    }

    fn check_waypoint_skip(&mut self, out_events: &mut Vec<Event>) {
        if let WaypointState::Active { position, .. } = self.waypoint {
            if self.player.position - position > self.skip_threshold {
                info!("pit stop at {position:.0} skipped");
                self.waypoint = WaypointState::Vacant;
                out_events.push(Event::WaypointSkipped);
            }
        }
    }

    fn push_fuel(&self, out_events: &mut Vec<Event>) {
        out_events.push(Event::FuelChanged {
            fuel: self.fuel.fuel(),
            capacity: self.fuel.capacity(),
        });
    }

    fn end_run(&mut self, outcome: RunOutcome, out_events: &mut Vec<Event>) {
        if self.outcome.is_terminal() || !outcome.is_terminal() {
            return;
        }
        info!(
            "run ended: {outcome:?} after {:.0} units",
            self.player.position - self.start_position
        );
        self.outcome = outcome;
        out_events.push(Event::RunEnded { outcome });
    }

    fn refresh_occupancy(&mut self) {
        let registry = &mut self.registry;
        let traffic = &self.traffic;
        let frontmost = self
            .lanes
            .lanes()
            .map(|lane| {
                registry
                    .frontmost(lane, traffic)
                    .and_then(|id| traffic.live(id))
                    .map(TrafficCar::snapshot)
            })
            .collect();
        self.occupancy = LaneOccupancyView::from_frontmost(frontmost);
    }

    fn spawn_traffic(
        &mut self,
        lane: LaneIndex,
        position: f32,
        speed: f32,
        model: usize,
        out_events: &mut Vec<Event>,
    ) {
        if !self.lanes.contains(lane) {
            warn!("ignored traffic spawn in unknown lane {}", lane.get());
            return;
        }

        let id = TrafficId::new(self.next_traffic);
        self.next_traffic = self.next_traffic.wrapping_add(1);
        let _ = self.traffic.cars.insert(
            id,
            TrafficCar {
                id,
                lane,
                position,
                speed,
                lifecycle: Lifecycle::Active,
            },
        );
        self.registry.register(id, lane);
        out_events.push(Event::TrafficSpawned {
            traffic: id,
            lane,
            position,
            speed,
            model,
        });
        self.refresh_occupancy();
    }

    fn spawn_pickup(
        &mut self,
        kind: PickupKind,
        lane: LaneIndex,
        position: f32,
        out_events: &mut Vec<Event>,
    ) {
        if !self.lanes.contains(lane) {
            warn!("ignored {kind:?} spawn in unknown lane {}", lane.get());
            return;
        }

        let id = PickupId::new(self.next_pickup);
        self.next_pickup = self.next_pickup.wrapping_add(1);
        self.pickups.push(Pickup {
            id,
            kind,
            lane,
            position,
            remaining: self.pickup_tuning.lifetime(kind),
        });
        out_events.push(Event::PickupSpawned {
            pickup: id,
            kind,
            lane,
            position,
        });
    }

    fn collect_pickup(&mut self, pickup: PickupId, out_events: &mut Vec<Event>) {
        if self.outcome.is_terminal() {
            return;
        }
        let Some(index) = self.pickups.iter().position(|entry| entry.id == pickup) else {
            return;
        };
        let kind = self.pickups.remove(index).kind;
        out_events.push(Event::PickupCollected { pickup, kind });

        let tuning = self.pickup_tuning;
        match kind {
            PickupKind::Fuel => {
                self.fuel.refuel(tuning.fuel_amount);
                self.push_fuel(out_events);
            }
            PickupKind::Coin => self.credit(tuning.coin_value, out_events),
            PickupKind::SpeedBoost => {
                self.effects
                    .activate_boost(tuning.boost_multiplier, tuning.boost_duration);
                self.push_effect(EffectKind::SpeedBoost, out_events);
            }
            PickupKind::Shield => {
                self.effects.activate_shield(tuning.shield_duration);
                self.push_effect(EffectKind::Shield, out_events);
            }
        }
    }

    fn push_effect(&self, effect: EffectKind, out_events: &mut Vec<Event>) {
        out_events.push(Event::EffectActivated {
            effect,
            remaining: self.effects.remaining(effect),
        });
    }

    fn report_collision(&mut self, traffic: TrafficId, out_events: &mut Vec<Event>) {
        if self.outcome.is_terminal() {
            return;
        }
        if self.traffic.live(traffic).is_none() {
            debug!("collision with retired traffic {} ignored", traffic.get());
            return;
        }

        if self.effects.shield_active() {
            debug!("shield absorbed collision with traffic {}", traffic.get());
            out_events.push(Event::ShieldAbsorbedHit { traffic });
        } else {
            self.end_run(RunOutcome::Crashed, out_events);
        }
    }

    fn purchase(&mut self, kind: UpgradeKind, out_events: &mut Vec<Event>) {
        if self.waypoint != WaypointState::Docked {
            out_events.push(Event::PurchaseRejected {
                kind,
                reason: getaway_core::PurchaseError::NotDocked,
            });
            return;
        }

        match self.ledger.purchase(kind) {
            Ok(purchase) => {
                info!(
                    "{kind:?} upgraded to level {} for {} coins",
                    purchase.level, purchase.cost
                );
                out_events.push(Event::UpgradePurchased {
                    kind,
                    level: purchase.level,
                    cost: purchase.cost,
                });
                out_events.push(Event::CoinsChanged {
                    coins: self.ledger.whole_coins(),
                });
                if kind == UpgradeKind::FuelTank {
                    self.fuel.resize(self.ledger.stat(UpgradeKind::FuelTank));
                    self.push_fuel(out_events);
                }
            }
            Err(reason) => out_events.push(Event::PurchaseRejected { kind, reason }),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::DrivePlayer {
            position,
            speed,
            lateral,
        } => {
            world.player = Player {
                position,
                speed,
                lateral,
                lane: world.lanes.nearest(lateral),
            };
        }
        Command::SpawnTraffic {
            lane,
            position,
            speed,
            model,
        } => world.spawn_traffic(lane, position, speed, model, out_events),
        Command::RetireTraffic { traffic } => {
            world.retire(traffic, out_events);
            world.refresh_occupancy();
        }
        Command::SpawnPickup {
            kind,
            lane,
            position,
        } => world.spawn_pickup(kind, lane, position, out_events),
        Command::CollectPickup { pickup } => world.collect_pickup(pickup, out_events),
        Command::ReportCollision { traffic } => world.report_collision(traffic, out_events),
        Command::PlaceWaypoint { lane, position } => {
            if world.waypoint != WaypointState::Vacant || !world.lanes.contains(lane) {
                debug!("ignored waypoint placement in lane {}", lane.get());
                return;
            }
            world.waypoint = WaypointState::Active { lane, position };
            out_events.push(Event::WaypointPlaced { lane, position });
        }
        Command::ReachPitStop => {
            if let WaypointState::Active { position, .. } = world.waypoint {
                info!("docked at pit stop {position:.0}");
                world.waypoint = WaypointState::Docked;
                out_events.push(Event::PitStopReached);
            }
        }
        Command::LeavePitStop => {
            if world.waypoint == WaypointState::Docked {
                world.waypoint = WaypointState::Vacant;
                out_events.push(Event::PitStopLeft);
            }
        }
        Command::PurchaseUpgrade { kind } => world.purchase(kind, out_events),
        Command::EndRun { outcome } => world.end_run(outcome, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use getaway_core::{
        LaneLayout, LaneOccupancyView, PickupCensus, PickupKind, PickupSnapshot, PlayerSnapshot,
        RunOutcome, TrafficSnapshot, UpgradeKind, WaypointState,
    };

    use super::World;

    /// Provides read-only access to the lane layout.
    #[must_use]
    pub fn lanes(world: &World) -> &LaneLayout {
        &world.lanes
    }

    /// Captures the player's most recently reported motion.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        PlayerSnapshot {
            position: world.player.position,
            speed: world.player.speed,
            lateral: world.player.lateral,
            lane: world.player.lane,
        }
    }

    /// Forward position the run started at.
    #[must_use]
    pub fn start_position(world: &World) -> f32 {
        world.start_position
    }

    /// Forward distance travelled since the run started.
    #[must_use]
    pub fn distance_travelled(world: &World) -> f32 {
        world.player.position - world.start_position
    }

    /// Frontmost live car of every lane, current as of the last mutation.
    #[must_use]
    pub fn lane_occupancy(world: &World) -> &LaneOccupancyView {
        &world.occupancy
    }

    /// Captures every live car in identifier order.
    #[must_use]
    pub fn traffic_view(world: &World) -> Vec<TrafficSnapshot> {
        world
            .traffic
            .cars
            .values()
            .map(super::TrafficCar::snapshot)
            .collect()
    }

    /// Captures every pickup on the road in spawn order.
    #[must_use]
    pub fn pickups(world: &World) -> Vec<PickupSnapshot> {
        world
            .pickups
            .iter()
            .map(|pickup| PickupSnapshot {
                id: pickup.id,
                kind: pickup.kind,
                lane: pickup.lane,
                position: pickup.position,
            })
            .collect()
    }

    /// Counts the live pickups by spawn category.
    #[must_use]
    pub fn pickup_census(world: &World) -> PickupCensus {
        let mut census = PickupCensus::default();
        for pickup in &world.pickups {
            match pickup.kind {
                PickupKind::Fuel => census.fuel += 1,
                PickupKind::Coin => census.coins += 1,
                PickupKind::SpeedBoost | PickupKind::Shield => census.power_ups += 1,
            }
        }
        census
    }

    /// State of the pit stop waypoint.
    #[must_use]
    pub fn waypoint(world: &World) -> WaypointState {
        world.waypoint
    }

    /// Fuel currently in the tank.
    #[must_use]
    pub fn fuel(world: &World) -> f32 {
        world.fuel.fuel()
    }

    /// Fraction of the tank currently filled, in `[0, 1]`.
    #[must_use]
    pub fn fuel_fraction(world: &World) -> f32 {
        world.fuel.fraction()
    }

    /// Exact coin balance including fractional distance earnings.
    #[must_use]
    pub fn coin_balance(world: &World) -> f32 {
        world.ledger.coins()
    }

    /// Whole coins available to spend.
    #[must_use]
    pub fn coins(world: &World) -> u32 {
        world.ledger.whole_coins()
    }

    /// Current level of an upgrade track, starting from one.
    #[must_use]
    pub fn upgrade_level(world: &World, kind: UpgradeKind) -> u32 {
        world.ledger.level(kind)
    }

    /// Number of upgrade levels purchased across every track.
    #[must_use]
    pub fn total_upgrades(world: &World) -> u32 {
        world.ledger.total_upgrades()
    }

    /// Engine top speed without temporary boosts.
    #[must_use]
    pub fn player_max_speed(world: &World) -> f32 {
        world.ledger.stat(UpgradeKind::Engine)
    }

    /// Engine top speed including any active speed boost.
    #[must_use]
    pub fn boosted_max_speed(world: &World) -> f32 {
        world.ledger.stat(UpgradeKind::Engine) * world.effects.boost_multiplier()
    }

    /// Lateral speed at which the player changes lanes.
    #[must_use]
    pub fn lane_change_speed(world: &World) -> f32 {
        world.ledger.stat(UpgradeKind::Handling)
    }

    /// Fraction of forward speed kept while changing lanes.
    #[must_use]
    pub fn lane_change_speed_retain(world: &World) -> f32 {
        world.ledger.speed_retain()
    }

    /// Reports whether collisions are currently absorbed.
    #[must_use]
    pub fn shield_active(world: &World) -> bool {
        world.effects.shield_active()
    }

    /// Outcome of the run so far.
    #[must_use]
    pub fn outcome(world: &World) -> RunOutcome {
        world.outcome
    }

    /// Number of ticks that advanced simulated time.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
