use serde::{Deserialize, Serialize};

/// Tuning for fuel consumption.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelTuning {
    /// Fuel burned per second regardless of speed.
    pub base_rate: f32,
    /// Additional fuel burned per second for every unit of forward speed.
    pub speed_factor: f32,
    /// Flat fuel cost charged when a lane change starts.
    pub lane_change_cost: f32,
    /// Lateral distance from a lane centre inside which the player counts as settled.
    pub lane_tolerance: f32,
}

impl Default for FuelTuning {
    fn default() -> Self {
        Self {
            base_rate: 2.0,
            speed_factor: 0.02,
            lane_change_cost: 1.0,
            lane_tolerance: 0.2,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct FuelTank {
    fuel: f32,
    capacity: f32,
    changing_lanes: bool,
    tuning: FuelTuning,
}

impl FuelTank {
    pub(crate) fn full(capacity: f32, tuning: FuelTuning) -> Self {
        let capacity = capacity.max(0.0);
        Self {
            fuel: capacity,
            capacity,
            changing_lanes: false,
            tuning,
        }
    }

    pub(crate) fn fuel(&self) -> f32 {
        self.fuel
    }

    pub(crate) fn capacity(&self) -> f32 {
        self.capacity
    }

    pub(crate) fn fraction(&self) -> f32 {
        if self.capacity <= 0.0 {
            return 0.0;
        }
        self.fuel / self.capacity
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.fuel <= 0.0
    }

    /// Burns fuel for one tick of driving at `speed`.
    pub(crate) fn burn(&mut self, speed: f32, dt: f32) {
        let rate = self.tuning.base_rate + speed.abs() * self.tuning.speed_factor;
        self.fuel = (self.fuel - rate * dt).clamp(0.0, self.capacity);
    }

    /// Charges the lane change cost on the tick a lane change begins.
    ///
    /// Returns `true` when a charge was applied.
    pub(crate) fn track_lane_change(&mut self, lateral: f32, lanes: &[f32]) -> bool {
        let settled = lanes
            .iter()
            .any(|coordinate| (lateral - coordinate).abs() < self.tuning.lane_tolerance);
        let changing = !settled;
        let started = changing && !self.changing_lanes;
        self.changing_lanes = changing;

        if started {
            self.fuel = (self.fuel - self.tuning.lane_change_cost).max(0.0);
        }
        started
    }

    pub(crate) fn refuel(&mut self, amount: f32) {
        self.fuel = (self.fuel + amount.max(0.0)).min(self.capacity);
    }

    /// Replaces the capacity, crediting any increase to the current reserve.
    pub(crate) fn resize(&mut self, capacity: f32) {
        let capacity = capacity.max(0.0);
        if capacity > self.capacity {
            self.fuel += capacity - self.capacity;
        }
        self.capacity = capacity;
        self.fuel = self.fuel.min(capacity);
    }
}
