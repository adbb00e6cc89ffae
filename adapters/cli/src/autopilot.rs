use std::time::Duration;

use getaway_core::{Command, LaneIndex, UpgradeKind, WaypointState};
use getaway_simulation::DriverInput;
use getaway_world::{query, World};

const CRUISE_FRACTION: f32 = 0.85;
const ACCELERATION: f32 = 12.0;
const LOOK_AHEAD: f32 = 40.0;
const LOOK_BEHIND: f32 = 6.0;
const PIT_APPROACH: f32 = 150.0;
const PIT_SPEED: f32 = 8.0;
const PIT_REACH: f32 = 3.0;
const CAR_LENGTH: f32 = 2.0;
const PICKUP_REACH: f32 = 1.5;
const LATERAL_REACH: f32 = 1.0;

/// Scripted driver standing in for a human player.
///
/// Cruises below the engine's top speed, swerves around slower traffic,
/// and heads for every pit stop it sees.
#[derive(Debug)]
pub(crate) struct Autopilot {
    target_lane: LaneIndex,
    speed: f32,
}

impl Autopilot {
    pub(crate) fn new(world: &World) -> Self {
        Self {
            target_lane: query::player(world).lane,
            speed: 0.0,
        }
    }

    /// Chooses the player's motion for the next tick.
    pub(crate) fn drive(&mut self, world: &World, dt: Duration) -> DriverInput {
        let player = query::player(world);
        let lanes = query::lanes(world);
        let seconds = dt.as_secs_f32();

        let mut target_speed = query::boosted_max_speed(world) * CRUISE_FRACTION;
        match query::waypoint(world) {
            WaypointState::Active { lane, position }
                if (0.0..PIT_APPROACH).contains(&(position - player.position)) =>
            {
                if self.lane_clear(world, lane, player.position) {
                    self.target_lane = lane;
                }
                if self.target_lane == lane {
                    target_speed = target_speed.min(PIT_SPEED.max(position - player.position));
                }
            }
            _ => {}
        }

        if let Some(blocker) = self.blocker(world, self.target_lane, player.position) {
            let escape = adjacent(self.target_lane, lanes.len())
                .into_iter()
                .find(|lane| self.lane_clear(world, *lane, player.position));
            match escape {
                Some(lane) => self.target_lane = lane,
                None => target_speed = target_speed.min(blocker),
            }
        }

        let target_lateral = lanes.coordinate(self.target_lane).unwrap_or(player.lateral);
        let changing = (target_lateral - player.lateral).abs() > f32::EPSILON;
        if changing {
            target_speed *= query::lane_change_speed_retain(world);
        }

        let step = ACCELERATION * seconds;
        self.speed = if self.speed < target_speed {
            (self.speed + step).min(target_speed)
        } else {
            (self.speed - step).max(target_speed)
        };

        let lateral = move_towards(
            player.lateral,
            target_lateral,
            query::lane_change_speed(world) * seconds,
        );
        DriverInput {
            position: player.position + self.speed * seconds,
            speed: self.speed,
            lateral,
            dt,
        }
    }

    /// Collisions, pickups, and pit stop arrivals resolved against the current world.
    pub(crate) fn contacts(&mut self, world: &World) -> Vec<Command> {
        let player = query::player(world);
        let lanes = query::lanes(world);
        let aligned = |lane: LaneIndex| {
            lanes
                .coordinate(lane)
                .is_some_and(|x| (x - player.lateral).abs() < LATERAL_REACH)
        };

        let mut commands = Vec::new();
        for car in query::traffic_view(world) {
            if aligned(car.lane) && (car.position - player.position).abs() < CAR_LENGTH {
                commands.push(Command::ReportCollision { traffic: car.id });
            }
        }
        for pickup in query::pickups(world) {
            if aligned(pickup.lane) && (pickup.position - player.position).abs() < PICKUP_REACH {
                commands.push(Command::CollectPickup { pickup: pickup.id });
            }
        }
        if let WaypointState::Active { lane, position } = query::waypoint(world) {
            if aligned(lane) && (position - player.position).abs() < PIT_REACH {
                self.speed = 0.0;
                commands.push(Command::ReachPitStop);
            }
        }
        commands
    }

    /// Garage visit: one purchase attempt per track, then back on the road.
    pub(crate) fn shop(&self) -> Vec<Command> {
        UpgradeKind::ALL
            .into_iter()
            .map(|kind| Command::PurchaseUpgrade { kind })
            .chain(std::iter::once(Command::LeavePitStop))
            .collect()
    }

    /// Speed of the nearest car ahead in `lane`, if it is close enough to matter.
    fn blocker(&self, world: &World, lane: LaneIndex, position: f32) -> Option<f32> {
        query::traffic_view(world)
            .into_iter()
            .filter(|car| car.lane == lane)
            .filter(|car| (0.0..LOOK_AHEAD).contains(&(car.position - position)))
            .min_by(|a, b| a.position.total_cmp(&b.position))
            .map(|car| car.speed)
    }

    fn lane_clear(&self, world: &World, lane: LaneIndex, position: f32) -> bool {
        !query::traffic_view(world).into_iter().any(|car| {
            car.lane == lane && (-LOOK_BEHIND..LOOK_AHEAD).contains(&(car.position - position))
        })
    }
}

fn adjacent(lane: LaneIndex, lane_count: usize) -> Vec<LaneIndex> {
    let index = lane.get();
    let mut lanes = Vec::with_capacity(2);
    if index > 0 {
        lanes.push(LaneIndex::new(index - 1));
    }
    if (index as usize + 1) < lane_count {
        lanes.push(LaneIndex::new(index + 1));
    }
    lanes
}

fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(delta)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{adjacent, Autopilot};
    use getaway_core::{Command, LaneIndex};
    use getaway_world::{self as world, query, World};

    const STEP: Duration = Duration::from_millis(100);

    fn spawn(world: &mut World, lane: u32, position: f32, speed: f32) {
        let mut events = Vec::new();
        world::apply(
            world,
            Command::SpawnTraffic {
                lane: LaneIndex::new(lane),
                position,
                speed,
                model: 0,
            },
            &mut events,
        );
    }

    #[test]
    fn accelerates_toward_cruise_speed() {
        let world = World::default();
        let mut autopilot = Autopilot::new(&world);
        let input = autopilot.drive(&world, STEP);
        assert!((input.speed - 1.2).abs() < 1e-4);
        assert_eq!(input.lateral, 0.0);
    }

    #[test]
    fn swerves_around_slow_traffic() {
        let mut world = World::default();
        spawn(&mut world, 1, 20.0, 5.0);
        let mut autopilot = Autopilot::new(&world);
        let input = autopilot.drive(&world, STEP);
        assert!(input.lateral < 0.0, "expected a move toward the left lane");
    }

    #[test]
    fn reports_overlapping_traffic_as_a_collision() {
        let mut world = World::default();
        spawn(&mut world, 1, 1.0, 10.0);
        let mut autopilot = Autopilot::new(&world);
        let commands = autopilot.contacts(&world);
        assert!(matches!(
            commands.as_slice(),
            [Command::ReportCollision { .. }]
        ));
        assert_eq!(query::traffic_view(&world).len(), 1);
    }

    #[test]
    fn shop_ends_by_leaving_the_pit_stop() {
        let world = World::default();
        let autopilot = Autopilot::new(&world);
        let commands = autopilot.shop();
        assert_eq!(commands.len(), 4);
        assert_eq!(commands.last(), Some(&Command::LeavePitStop));
    }

    #[test]
    fn adjacent_lanes_stay_in_range() {
        assert_eq!(adjacent(LaneIndex::new(0), 3), vec![LaneIndex::new(1)]);
        assert_eq!(
            adjacent(LaneIndex::new(1), 3),
            vec![LaneIndex::new(0), LaneIndex::new(2)]
        );
        assert_eq!(adjacent(LaneIndex::new(2), 3), vec![LaneIndex::new(1)]);
    }
}
