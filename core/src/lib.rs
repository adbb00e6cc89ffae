#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Getaway simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems and presentation collaborators to react to. Systems consume
//! event streams, query immutable snapshots, and respond with new command
//! batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod difficulty;

pub use difficulty::{DifficultyCurve, DifficultyTuning, RateScaling};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Reports the player vehicle's motion as resolved by the vehicle controller.
    DrivePlayer {
        /// Forward position of the player along the road.
        position: f32,
        /// Current forward speed of the player.
        speed: f32,
        /// Lateral coordinate of the player across the lanes.
        lateral: f32,
    },
    /// Requests that a traffic car be created and registered in a lane.
    SpawnTraffic {
        /// Lane the car travels in for its whole lifetime.
        lane: LaneIndex,
        /// Forward position the car starts at.
        position: f32,
        /// Constant forward speed assigned to the car.
        speed: f32,
        /// Index into the configured traffic model list.
        model: usize,
    },
    /// Requests that a traffic car be retired through an external path.
    RetireTraffic {
        /// Identifier of the car to retire.
        traffic: TrafficId,
    },
    /// Requests that a pickup be placed on the road.
    SpawnPickup {
        /// Kind of pickup to place.
        kind: PickupKind,
        /// Lane the pickup sits in.
        lane: LaneIndex,
        /// Forward position of the pickup.
        position: f32,
    },
    /// Reports that the player drove through a pickup.
    CollectPickup {
        /// Identifier of the collected pickup.
        pickup: PickupId,
    },
    /// Reports a resolved collision between the player and a traffic car.
    ReportCollision {
        /// Identifier of the car the player struck.
        traffic: TrafficId,
    },
    /// Requests that the next pit stop waypoint be placed on the road.
    PlaceWaypoint {
        /// Lane occupied by the pit stop.
        lane: LaneIndex,
        /// Forward position of the pit stop.
        position: f32,
    },
    /// Reports that the player pulled into the active pit stop.
    ReachPitStop,
    /// Reports that the player left the pit stop and resumed driving.
    LeavePitStop,
    /// Requests an upgrade purchase from the pit stop garage.
    PurchaseUpgrade {
        /// Upgrade track to advance by one level.
        kind: UpgradeKind,
    },
    /// Requests that the run terminate with the provided outcome.
    EndRun {
        /// Terminal outcome of the run.
        outcome: RunOutcome,
    },
}

/// Events broadcast by the world and systems after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a traffic car was created and registered.
    TrafficSpawned {
        /// Identifier assigned to the new car.
        traffic: TrafficId,
        /// Lane the car was registered in.
        lane: LaneIndex,
        /// Forward position the car starts at.
        position: f32,
        /// Constant speed assigned to the car.
        speed: f32,
        /// Index into the configured traffic model list.
        model: usize,
    },
    /// Confirms that a traffic car was retired and unregistered.
    TrafficRetired {
        /// Identifier of the retired car.
        traffic: TrafficId,
        /// Lane the car was unregistered from.
        lane: LaneIndex,
    },
    /// Confirms that a pickup was placed on the road.
    PickupSpawned {
        /// Identifier assigned to the pickup.
        pickup: PickupId,
        /// Kind of pickup placed.
        kind: PickupKind,
        /// Lane the pickup sits in.
        lane: LaneIndex,
        /// Forward position of the pickup.
        position: f32,
    },
    /// Confirms that the player collected a pickup.
    PickupCollected {
        /// Identifier of the collected pickup.
        pickup: PickupId,
        /// Kind of pickup collected.
        kind: PickupKind,
    },
    /// Reports that a pickup timed out before being collected.
    PickupExpired {
        /// Identifier of the expired pickup.
        pickup: PickupId,
        /// Kind of pickup that expired.
        kind: PickupKind,
    },
    /// Reports the fuel reserve after it changed by a discrete amount.
    FuelChanged {
        /// Fuel currently held in the tank.
        fuel: f32,
        /// Capacity of the tank.
        capacity: f32,
    },
    /// Reports that the whole-coin balance changed.
    CoinsChanged {
        /// Whole coins currently held by the player.
        coins: u32,
    },
    /// Confirms that a timed effect became active or was extended.
    EffectActivated {
        /// Effect that is now active.
        effect: EffectKind,
        /// Seconds remaining before the effect expires.
        remaining: f32,
    },
    /// Reports that a timed effect ran out.
    EffectExpired {
        /// Effect that expired.
        effect: EffectKind,
    },
    /// Reports that the shield absorbed a collision that would have ended the run.
    ShieldAbsorbedHit {
        /// Identifier of the car the player struck.
        traffic: TrafficId,
    },
    /// Confirms that a pit stop waypoint was placed.
    WaypointPlaced {
        /// Lane occupied by the pit stop.
        lane: LaneIndex,
        /// Forward position of the pit stop.
        position: f32,
    },
    /// Reports that the player drove past the pit stop without stopping.
    WaypointSkipped,
    /// Reports that the player docked at the pit stop.
    PitStopReached,
    /// Reports that the player left the pit stop.
    PitStopLeft,
    /// Confirms that an upgrade was purchased.
    UpgradePurchased {
        /// Upgrade track that advanced.
        kind: UpgradeKind,
        /// Level reached after the purchase, starting from one.
        level: u32,
        /// Coins spent on the purchase.
        cost: u32,
    },
    /// Reports that an upgrade purchase request was rejected.
    PurchaseRejected {
        /// Upgrade track that was requested.
        kind: UpgradeKind,
        /// Specific reason the purchase failed.
        reason: PurchaseError,
    },
    /// Reports the heat level after it changed.
    HeatChanged {
        /// Heat accumulated toward triggering a chase.
        heat: f32,
    },
    /// Announces that a police chase began.
    ChaseStarted {
        /// Top speed assigned to the pursuit agent for the whole chase.
        agent_speed: f32,
    },
    /// Announces that the active chase ended without a capture.
    ChaseEnded {
        /// Why the chase ended.
        reason: ChaseEndReason,
    },
    /// Reports the bust progress after it changed.
    BustProgressChanged {
        /// Progress toward a capture in `[0, 1]`.
        progress: f32,
    },
    /// Announces that the pursuit agent captured the player.
    Captured,
    /// Announces that the run reached a terminal outcome.
    RunEnded {
        /// Terminal outcome of the run.
        outcome: RunOutcome,
    },
}

/// Index of a lane counted from the leftmost lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneIndex(u32);

impl LaneIndex {
    /// Creates a new lane index wrapper.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the underlying lane number.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Retrieves the lane number as a slice index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Unique identifier assigned to a traffic car.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrafficId(u32);

impl TrafficId {
    /// Creates a new traffic identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a pickup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PickupId(u32);

impl PickupId {
    /// Creates a new pickup identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Kinds of pickups that can be placed on the road.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickupKind {
    /// Refills part of the fuel tank.
    Fuel,
    /// Adds a fixed amount of coins to the ledger.
    Coin,
    /// Temporarily raises the player's top speed.
    SpeedBoost,
    /// Temporarily absorbs traffic collisions.
    Shield,
}

/// Timed effects granted by power-up pickups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Collisions with traffic are absorbed while active.
    Shield,
    /// Top speed is multiplied while active.
    SpeedBoost,
}

/// Upgrade tracks available in the pit stop garage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// Raises the player's top speed.
    Engine,
    /// Raises the fuel tank capacity.
    FuelTank,
    /// Raises lane change speed and reduces the speed lost while changing lanes.
    Handling,
}

impl UpgradeKind {
    /// Every upgrade track in garage order.
    pub const ALL: [UpgradeKind; 3] = [Self::Engine, Self::FuelTank, Self::Handling];
}

/// Reasons an upgrade purchase may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PurchaseError {
    /// Purchases are only possible while docked at a pit stop.
    NotDocked,
    /// The upgrade track is already at its final level.
    MaxLevel,
    /// The ledger does not hold enough coins.
    InsufficientCoins,
}

/// Terminal and non-terminal outcomes of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunOutcome {
    /// The run is still in progress.
    Running,
    /// The pursuit agent's bust timer completed.
    Busted,
    /// The player struck traffic without a shield.
    Crashed,
    /// The fuel tank ran dry.
    OutOfFuel,
    /// The player travelled the full journey distance.
    Victory,
}

impl RunOutcome {
    /// Reports whether the outcome ends the run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Phase of the pursuit state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PursuitPhase {
    /// Heat accumulates and no pursuit agent exists.
    Idle,
    /// A pursuit agent is actively chasing the player.
    Chasing,
}

/// Reasons a chase ends without a capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChaseEndReason {
    /// The player pulled far enough ahead of the pursuit agent.
    Escaped,
    /// The player reached a pit stop, which also clears heat.
    PitStop,
}

/// State of the scripted pit stop waypoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WaypointState {
    /// No pit stop is placed; the next one should be scheduled.
    Vacant,
    /// A pit stop waits ahead of the player.
    Active {
        /// Lane occupied by the pit stop.
        lane: LaneIndex,
        /// Forward position of the pit stop.
        position: f32,
    },
    /// The player is docked at the pit stop and simulated time is frozen.
    Docked,
}

impl WaypointState {
    /// Reports whether the provided forward position lies inside the waypoint's safe zone.
    ///
    /// Returns the waypoint's lane when the waypoint is active and the
    /// distance to it is strictly less than `radius`.
    #[must_use]
    pub fn guarded_lane(&self, position: f32, radius: f32) -> Option<LaneIndex> {
        match *self {
            Self::Active {
                lane,
                position: waypoint,
            } if (position - waypoint).abs() < radius => Some(lane),
            _ => None,
        }
    }
}

/// Fixed lateral coordinates of the parallel lanes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneLayout {
    coordinates: Vec<f32>,
}

impl LaneLayout {
    /// Creates a layout from lateral coordinates ordered left to right.
    #[must_use]
    pub fn new(coordinates: Vec<f32>) -> Self {
        Self { coordinates }
    }

    /// Number of lanes in the layout.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    /// Reports whether the layout contains no lanes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Reports whether the lane index addresses a configured lane.
    #[must_use]
    pub fn contains(&self, lane: LaneIndex) -> bool {
        lane.index() < self.coordinates.len()
    }

    /// Lateral coordinate of the lane, if it exists.
    #[must_use]
    pub fn coordinate(&self, lane: LaneIndex) -> Option<f32> {
        self.coordinates.get(lane.index()).copied()
    }

    /// Lateral coordinates ordered left to right.
    #[must_use]
    pub fn coordinates(&self) -> &[f32] {
        &self.coordinates
    }

    /// Iterator over every lane index in the layout.
    pub fn lanes(&self) -> impl Iterator<Item = LaneIndex> {
        (0..self.coordinates.len()).map(|index| LaneIndex::new(index as u32))
    }

    /// Lane whose coordinate is closest to the provided lateral position.
    ///
    /// Ties resolve toward the lower index. An empty layout yields lane zero.
    #[must_use]
    pub fn nearest(&self, lateral: f32) -> LaneIndex {
        let mut closest = 0;
        let mut closest_distance = f32::INFINITY;
        for (index, coordinate) in self.coordinates.iter().enumerate() {
            let distance = (lateral - coordinate).abs();
            if distance < closest_distance {
                closest_distance = distance;
                closest = index;
            }
        }
        LaneIndex::new(closest as u32)
    }

    /// Middle lane of the layout, rounding toward the left for even counts.
    #[must_use]
    pub fn center(&self) -> LaneIndex {
        LaneIndex::new((self.coordinates.len().saturating_sub(1) / 2) as u32)
    }
}

impl Default for LaneLayout {
    fn default() -> Self {
        Self::new(vec![-3.3, 0.0, 3.3])
    }
}

/// Immutable representation of the player's motion used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Forward position of the player along the road.
    pub position: f32,
    /// Current forward speed of the player.
    pub speed: f32,
    /// Lateral coordinate of the player across the lanes.
    pub lateral: f32,
    /// Lane closest to the player's lateral coordinate.
    pub lane: LaneIndex,
}

/// Immutable representation of a single traffic car used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrafficSnapshot {
    /// Unique identifier assigned to the car.
    pub id: TrafficId,
    /// Lane the car travels in.
    pub lane: LaneIndex,
    /// Forward position of the car.
    pub position: f32,
    /// Constant forward speed of the car.
    pub speed: f32,
}

/// Read-only snapshot of the frontmost live car in every lane.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LaneOccupancyView {
    frontmost: Vec<Option<TrafficSnapshot>>,
}

impl LaneOccupancyView {
    /// Creates a view from one optional frontmost snapshot per lane.
    #[must_use]
    pub fn from_frontmost(frontmost: Vec<Option<TrafficSnapshot>>) -> Self {
        Self { frontmost }
    }

    /// Number of lanes captured by the view.
    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.frontmost.len()
    }

    /// Frontmost live car in the lane, if any.
    ///
    /// Out-of-range lanes report no occupant.
    #[must_use]
    pub fn frontmost(&self, lane: LaneIndex) -> Option<TrafficSnapshot> {
        self.frontmost.get(lane.index()).copied().flatten()
    }
}

/// Immutable representation of a single pickup used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickupSnapshot {
    /// Unique identifier assigned to the pickup.
    pub id: PickupId,
    /// Kind of pickup.
    pub kind: PickupKind,
    /// Lane the pickup sits in.
    pub lane: LaneIndex,
    /// Forward position of the pickup.
    pub position: f32,
}

/// Read-only snapshot of the pickup population relevant to spawning cadence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PickupCensus {
    /// Live fuel pickups.
    pub fuel: usize,
    /// Live coin pickups.
    pub coins: usize,
    /// Live speed boost and shield pickups.
    pub power_ups: usize,
}

#[cfg(test)]
mod tests {
    use super::{
        LaneIndex, LaneLayout, LaneOccupancyView, TrafficId, TrafficSnapshot, WaypointState,
    };

    #[test]
    fn nearest_lane_resolves_closest_coordinate() {
        let layout = LaneLayout::default();
        assert_eq!(layout.nearest(-2.0), LaneIndex::new(0));
        assert_eq!(layout.nearest(1.0), LaneIndex::new(1));
        assert_eq!(layout.nearest(9.0), LaneIndex::new(2));
    }

    #[test]
    fn center_lane_of_three_lane_layout_is_index_one() {
        assert_eq!(LaneLayout::default().center(), LaneIndex::new(1));
    }

    #[test]
    fn occupancy_view_reports_nothing_for_unknown_lanes() {
        let snapshot = TrafficSnapshot {
            id: TrafficId::new(1),
            lane: LaneIndex::new(0),
            position: 10.0,
            speed: 12.0,
        };
        let view = LaneOccupancyView::from_frontmost(vec![Some(snapshot), None]);
        assert_eq!(view.frontmost(LaneIndex::new(0)), Some(snapshot));
        assert_eq!(view.frontmost(LaneIndex::new(1)), None);
        assert_eq!(view.frontmost(LaneIndex::new(7)), None);
    }

    #[test]
    fn waypoint_guards_its_lane_only_inside_radius() {
        let waypoint = WaypointState::Active {
            lane: LaneIndex::new(2),
            position: 1_000.0,
        };
        assert_eq!(waypoint.guarded_lane(960.0, 60.0), Some(LaneIndex::new(2)));
        assert_eq!(waypoint.guarded_lane(940.0, 60.0), None);
        assert_eq!(WaypointState::Docked.guarded_lane(1_000.0, 60.0), None);
    }

    #[test]
    fn lane_layout_deserializes_from_toml() {
        let layout: LaneLayout = toml::from_str("coordinates = [-4.0, 0.0, 4.0]").expect("parse");
        assert_eq!(layout.coordinates(), &[-4.0, 0.0, 4.0]);
    }
}
