use getaway_core::{LaneIndex, LaneOccupancyView};
use serde::{Deserialize, Serialize};

/// Tuning for the spawn-time following distance guarantee.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyTuning {
    /// Gap required behind the frontmost car even when no faster than it.
    pub minimum_gap: f32,
    /// Additional gap required per unit a new car would close on the frontmost car.
    pub gap_per_speed_unit: f32,
    /// Margin by which a new car must stay slower than the frontmost car.
    pub speed_buffer: f32,
}

impl Default for SafetyTuning {
    fn default() -> Self {
        Self {
            minimum_gap: 8.0,
            gap_per_speed_unit: 0.5,
            speed_buffer: 2.0,
        }
    }
}

/// Verdict for a single lane at a candidate spawn position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnClearance {
    /// Whether a car may be spawned in the lane.
    pub can_spawn: bool,
    /// Highest speed a new car may travel without closing on the car ahead.
    pub max_safe_speed: f32,
}

impl SpawnClearance {
    const BLOCKED: Self = Self {
        can_spawn: false,
        max_safe_speed: 0.0,
    };
}

/// Decides whether a lane can take a new car and how fast that car may go.
///
/// The guarantee holds at spawn time only. Cars keep a constant speed, so a
/// new car capped below the speed of the car ahead never closes on it, but
/// the gap is not re-validated afterwards.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpeedSafety {
    tuning: SafetyTuning,
}

impl SpeedSafety {
    /// Creates a calculator with the provided tuning.
    #[must_use]
    pub const fn new(tuning: SafetyTuning) -> Self {
        Self { tuning }
    }

    /// Tuning backing the calculator.
    #[must_use]
    pub const fn tuning(&self) -> SafetyTuning {
        self.tuning
    }

    /// Evaluates a candidate spawn against the frontmost car of `lane`.
    #[must_use]
    pub fn evaluate(
        &self,
        occupancy: &LaneOccupancyView,
        lane: LaneIndex,
        spawn_position: f32,
        desired_speed: f32,
    ) -> SpawnClearance {
        if lane.index() >= occupancy.lane_count() {
            return SpawnClearance::BLOCKED;
        }

        let Some(front) = occupancy.frontmost(lane) else {
            return SpawnClearance {
                can_spawn: true,
                max_safe_speed: desired_speed,
            };
        };

        let speed_delta = (desired_speed - front.speed).max(0.0);
        let required = self.tuning.minimum_gap + speed_delta * self.tuning.gap_per_speed_unit;
        let actual = front.position - spawn_position;
        if actual < required {
            return SpawnClearance::BLOCKED;
        }

        let max_safe_speed = desired_speed.min(front.speed - self.tuning.speed_buffer);
        SpawnClearance {
            can_spawn: max_safe_speed > 0.0,
            max_safe_speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SafetyTuning, SpeedSafety};
    use getaway_core::{LaneIndex, LaneOccupancyView, TrafficId, TrafficSnapshot};

    fn view_with_front(position: f32, speed: f32) -> LaneOccupancyView {
        LaneOccupancyView::from_frontmost(vec![
            None,
            Some(TrafficSnapshot {
                id: TrafficId::new(7),
                lane: LaneIndex::new(1),
                position,
                speed,
            }),
            None,
        ])
    }

    #[test]
    fn empty_lane_allows_desired_speed() {
        let safety = SpeedSafety::default();
        let clearance = safety.evaluate(
            &view_with_front(500.0, 20.0),
            LaneIndex::new(0),
            470.0,
            25.0,
        );
        assert!(clearance.can_spawn);
        assert_eq!(clearance.max_safe_speed, 25.0);
    }

    #[test]
    fn faster_car_needs_speed_dependent_gap() {
        let safety = SpeedSafety::default();
        let clearance = safety.evaluate(
            &view_with_front(500.0, 20.0),
            LaneIndex::new(1),
            470.0,
            25.0,
        );
        assert!(clearance.can_spawn);
        assert_eq!(clearance.max_safe_speed, 18.0);
    }

    #[test]
    fn gap_shorter_than_required_blocks_lane() {
        let safety = SpeedSafety::default();
        // 8 + (25 - 20) * 0.5 = 10.5 required, 10 available.
        let clearance = safety.evaluate(
            &view_with_front(500.0, 20.0),
            LaneIndex::new(1),
            490.0,
            25.0,
        );
        assert!(!clearance.can_spawn);
    }

    #[test]
    fn slow_frontmost_car_leaves_no_safe_speed() {
        let safety = SpeedSafety::default();
        let clearance = safety.evaluate(
            &view_with_front(500.0, 1.5),
            LaneIndex::new(1),
            400.0,
            20.0,
        );
        assert!(!clearance.can_spawn);
        assert!(clearance.max_safe_speed <= 0.0);
    }

    #[test]
    fn unknown_lane_is_blocked() {
        let safety = SpeedSafety::new(SafetyTuning::default());
        let clearance = safety.evaluate(
            &view_with_front(500.0, 20.0),
            LaneIndex::new(3),
            0.0,
            15.0,
        );
        assert!(!clearance.can_spawn);
        assert_eq!(safety.tuning().minimum_gap, 8.0);
    }
}
