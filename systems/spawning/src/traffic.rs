use getaway_core::{
    Command, DifficultyCurve, DifficultyTuning, LaneIndex, PursuitPhase, RateScaling,
};
use log::{debug, error};
use rand::{seq::SliceRandom, Rng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{safety::SpeedSafety, uniform, SpawnContext};

/// Tuning for traffic batches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficSpawnConfig {
    /// Distance-to-level mapping used by the traffic cadence.
    pub difficulty: DifficultyTuning,
    /// Seconds between batches as a function of difficulty level.
    pub interval: RateScaling,
    /// Half-width of the uniform band added to every reset.
    pub jitter: f32,
    /// Largest number of cars a single batch may place.
    pub max_per_batch: usize,
    /// Distance ahead of the player at which cars appear.
    pub lead_distance: f32,
    /// Lowest speed rolled for a new car.
    pub min_speed: f32,
    /// Highest speed rolled for a new car.
    pub max_speed: f32,
    /// Fractional interval increase applied while a chase is under way.
    pub chase_penalty: f32,
    /// Radius around an active pit stop inside which its lane takes no traffic.
    pub pit_stop_safe_zone: f32,
    /// Vehicle models a new car picks from.
    pub models: Vec<String>,
}

impl Default for TrafficSpawnConfig {
    fn default() -> Self {
        Self {
            difficulty: DifficultyTuning {
                distance_per_level: 1_000.0,
                max_level: 15.0,
            },
            interval: RateScaling::new(1.5, 0.2, 0.4),
            jitter: 0.8,
            max_per_batch: 2,
            lead_distance: 150.0,
            min_speed: 12.0,
            max_speed: 25.0,
            chase_penalty: 0.5,
            pit_stop_safe_zone: 60.0,
            models: vec![
                "sedan".to_owned(),
                "hatchback".to_owned(),
                "van".to_owned(),
                "pickup".to_owned(),
            ],
        }
    }
}

#[derive(Debug)]
pub(crate) struct TrafficSpawner {
    config: TrafficSpawnConfig,
    curve: DifficultyCurve,
    timer: f32,
    enabled: bool,
}

impl TrafficSpawner {
    pub(crate) fn new(config: TrafficSpawnConfig, start_position: f32) -> Self {
        let enabled = !config.models.is_empty();
        if !enabled {
            error!("traffic spawning disabled: no vehicle models configured");
        }
        let curve = DifficultyCurve::new(start_position, config.difficulty);
        let timer = curve.scaled(start_position, &config.interval);
        Self {
            config,
            curve,
            timer,
            enabled,
        }
    }

    pub(crate) fn timer(&self) -> f32 {
        self.timer
    }

    pub(crate) fn advance(
        &mut self,
        elapsed: f32,
        context: &SpawnContext<'_>,
        safety: &SpeedSafety,
        rng: &mut ChaCha8Rng,
        out: &mut Vec<Command>,
    ) {
        if !self.enabled {
            return;
        }

        self.timer -= elapsed;
        if self.timer > 0.0 {
            return;
        }

        self.spawn_batch(context, safety, rng, out);
        self.timer = self.next_interval(context, rng);
    }

    fn spawn_batch(
        &self,
        context: &SpawnContext<'_>,
        safety: &SpeedSafety,
        rng: &mut ChaCha8Rng,
        out: &mut Vec<Command>,
    ) {
        let config = &self.config;
        let spawn_position = context.player.position + config.lead_distance;

        let mut candidates: Vec<(LaneIndex, f32)> = Vec::new();
        for lane in context.lanes.lanes() {
            let desired = uniform(rng, config.min_speed, config.max_speed);
            let clearance = safety.evaluate(context.occupancy, lane, spawn_position, desired);
            if clearance.can_spawn {
                candidates.push((lane, clearance.max_safe_speed));
            }
        }

        if let Some(guarded) = context
            .waypoint
            .guarded_lane(spawn_position, config.pit_stop_safe_zone)
        {
            candidates.retain(|(lane, _)| *lane != guarded);
        }

        if candidates.is_empty() {
            debug!("no lane clear for traffic at {spawn_position:.0}");
            return;
        }

        let count = rng
            .gen_range(1..=config.max_per_batch.max(1))
            .min(candidates.len());
        let chosen: Vec<(LaneIndex, f32)> =
            candidates.choose_multiple(rng, count).copied().collect();

        for (lane, max_safe_speed) in chosen {
            let speed = if max_safe_speed <= config.min_speed {
                max_safe_speed
            } else {
                rng.gen_range(config.min_speed..=max_safe_speed)
            };
            let model = rng.gen_range(0..config.models.len());
            debug!(
                "traffic in lane {} at {spawn_position:.0}, speed {speed:.1} (max {max_safe_speed:.1})",
                lane.get()
            );
            out.push(Command::SpawnTraffic {
                lane,
                position: spawn_position,
                speed,
                model,
            });
        }
    }

    fn next_interval(&self, context: &SpawnContext<'_>, rng: &mut ChaCha8Rng) -> f32 {
        let mut interval = self
            .curve
            .scaled(context.player.position, &self.config.interval);
        if self.config.jitter > 0.0 {
            interval += uniform(rng, -self.config.jitter, self.config.jitter);
        }
        if context.phase == PursuitPhase::Chasing {
            interval *= 1.0 + self.config.chase_penalty;
        }
        interval.max(0.0)
    }
}
