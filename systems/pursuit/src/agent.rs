use getaway_core::{LaneIndex, LaneLayout, PlayerSnapshot};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Tuning for the pursuing vehicle's motion and capture logic.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTuning {
    /// Closest the agent may get to the player along the road.
    pub min_follow: f32,
    /// Gap above which the agent drives flat out.
    pub max_follow: f32,
    /// Fraction of the player's speed the agent drops to when too close.
    pub back_off_factor: f32,
    /// Lowest speed the agent drops to when too close.
    pub speed_floor: f32,
    /// Speed the agent adds to the player's inside the follow band.
    pub catchup_bias: f32,
    /// Probability per tick of stepping one lane toward the player.
    pub lane_change_chance: f32,
    /// Lateral speed at the start of a chase.
    pub base_lane_change_speed: f32,
    /// Highest lateral speed the agent ever reaches.
    pub max_lane_change_speed: f32,
    /// Weight applied to the lateral speed growth factor.
    pub lane_change_scale: f32,
    /// Lateral speed growth per minute of chase.
    pub lane_change_per_minute: f32,
    /// Lateral speed growth per purchased upgrade level.
    pub lane_change_per_upgrade: f32,
    /// Straight-line distance inside which bust progress accumulates.
    pub bust_distance: f32,
    /// Seconds of uninterrupted contact needed for a capture.
    pub bust_duration: f32,
    /// Lateral offset under which the agent counts as sharing the player's lane.
    pub same_lane_threshold: f32,
    /// Decay rate of bust progress relative to its accumulation rate.
    pub bust_decay: f32,
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            min_follow: 2.0,
            max_follow: 15.0,
            back_off_factor: 0.7,
            speed_floor: 2.0,
            catchup_bias: 2.0,
            lane_change_chance: 0.015,
            base_lane_change_speed: 4.0,
            max_lane_change_speed: 10.0,
            lane_change_scale: 0.5,
            lane_change_per_minute: 0.3,
            lane_change_per_upgrade: 0.2,
            bust_distance: 3.0,
            bust_duration: 2.0,
            same_lane_threshold: 1.5,
            bust_decay: 0.5,
        }
    }
}

impl AgentTuning {
    /// Lateral speed after `chase_minutes` of pursuit against `upgrades` purchased levels.
    #[must_use]
    pub fn lane_change_speed(&self, chase_minutes: f32, upgrades: u32) -> f32 {
        let factor = chase_minutes * self.lane_change_per_minute
            + upgrades as f32 * self.lane_change_per_upgrade;
        let base = self.base_lane_change_speed;
        (base + factor * self.lane_change_scale).clamp(base, self.max_lane_change_speed.max(base))
    }
}

/// Summing many small contact steps in `f32` can stop just short of a full meter.
const CAPTURE_TOLERANCE: f32 = 1e-5;

/// Accumulates contact time toward a capture.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BustMeter {
    progress: f32,
}

impl BustMeter {
    /// Progress toward a capture in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Reports whether the meter is full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.progress >= 1.0
    }

    /// Fills while in contact, drains at the decay rate otherwise.
    pub fn update(&mut self, in_contact: bool, dt: f32, tuning: &AgentTuning) -> f32 {
        if tuning.bust_duration <= 0.0 {
            self.progress = if in_contact { 1.0 } else { 0.0 };
            return self.progress;
        }

        let rate = dt / tuning.bust_duration;
        let delta = if in_contact {
            rate
        } else {
            -rate * tuning.bust_decay
        };
        self.progress = (self.progress + delta).clamp(0.0, 1.0);
        if in_contact && self.progress >= 1.0 - CAPTURE_TOLERANCE {
            self.progress = 1.0;
        }
        self.progress
    }

    pub(crate) fn reset(&mut self) {
        self.progress = 0.0;
    }
}

/// The single pursuing vehicle that exists while a chase is under way.
#[derive(Clone, Debug, PartialEq)]
pub struct PursuitAgent {
    position: f32,
    lateral: f32,
    lane: LaneIndex,
    speed: f32,
    max_speed: f32,
}

impl PursuitAgent {
    /// Places an agent at `position` in `lane` with a fixed top speed.
    #[must_use]
    pub fn new(position: f32, lane: LaneIndex, lanes: &LaneLayout, max_speed: f32) -> Self {
        Self {
            position,
            lateral: lanes.coordinate(lane).unwrap_or(0.0),
            lane,
            speed: 0.0,
            max_speed,
        }
    }

    /// Forward position along the road.
    #[must_use]
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Lateral coordinate across the lanes.
    #[must_use]
    pub fn lateral(&self) -> f32 {
        self.lateral
    }

    /// Lane the agent is steering toward.
    #[must_use]
    pub fn lane(&self) -> LaneIndex {
        self.lane
    }

    /// Forward speed chosen on the last step.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Top speed fixed when the chase began.
    #[must_use]
    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    /// Reports whether the agent is close enough, aligned, and behind the player.
    #[must_use]
    pub fn in_contact(&self, player: &PlayerSnapshot, tuning: &AgentTuning) -> bool {
        let dx = player.lateral - self.lateral;
        let dz = player.position - self.position;
        let distance = (dx * dx + dz * dz).sqrt();
        distance <= tuning.bust_distance && dx.abs() < tuning.same_lane_threshold && dz > 0.0
    }

    /// Advances the agent by one tick: lane choice, lateral drift, then forward motion.
    pub fn step(
        &mut self,
        dt: f32,
        player: &PlayerSnapshot,
        lanes: &LaneLayout,
        lane_change_speed: f32,
        tuning: &AgentTuning,
        rng: &mut ChaCha8Rng,
    ) {
        if rng.gen::<f32>() < tuning.lane_change_chance {
            self.lane = step_toward(self.lane, player.lane);
        }
        if let Some(target) = lanes.coordinate(self.lane) {
            self.lateral = move_towards(self.lateral, target, lane_change_speed * dt);
        }

        let gap = player.position - self.position;
        self.speed = if gap < tuning.min_follow {
            (player.speed * tuning.back_off_factor).max(tuning.speed_floor)
        } else if gap > tuning.max_follow {
            self.max_speed
        } else {
            (player.speed + tuning.catchup_bias).min(self.max_speed)
        };

        self.position =
            (self.position + self.speed * dt).min(player.position - tuning.min_follow);
    }
}

fn step_toward(current: LaneIndex, target: LaneIndex) -> LaneIndex {
    match current.get().cmp(&target.get()) {
        std::cmp::Ordering::Less => LaneIndex::new(current.get() + 1),
        std::cmp::Ordering::Greater => LaneIndex::new(current.get() - 1),
        std::cmp::Ordering::Equal => current,
    }
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
    use super::{move_towards, step_toward, AgentTuning, BustMeter, PursuitAgent};
    use getaway_core::{LaneIndex, LaneLayout, PlayerSnapshot};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn player(position: f32, speed: f32) -> PlayerSnapshot {
        PlayerSnapshot {
            position,
            speed,
            lateral: 0.0,
            lane: LaneIndex::new(1),
        }
    }

    fn step(agent: &mut PursuitAgent, player: &PlayerSnapshot) {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        agent.step(
            0.5,
            player,
            &LaneLayout::default(),
            4.0,
            &AgentTuning::default(),
            &mut rng,
        );
    }

    #[test]
    fn bust_meter_fills_in_exactly_bust_duration() {
        let tuning = AgentTuning::default();
        let mut meter = BustMeter::default();
        for _ in 0..3 {
            let _ = meter.update(true, 0.5, &tuning);
            assert!(!meter.is_full());
        }
        assert_eq!(meter.update(true, 0.5, &tuning), 1.0);
        assert!(meter.is_full());
    }

    #[test]
    fn bust_meter_fills_on_time_at_sixty_hertz() {
        let tuning = AgentTuning::default();
        let dt = std::time::Duration::from_secs_f32(1.0 / 60.0).as_secs_f32();
        let mut meter = BustMeter::default();
        let mut ticks = 0;
        while !meter.is_full() {
            let _ = meter.update(true, dt, &tuning);
            ticks += 1;
            assert!(ticks <= 120, "meter still filling after two seconds");
        }
        assert_eq!(ticks, 120);
        assert_eq!(meter.progress(), 1.0);
    }

    #[test]
    fn bust_meter_drains_at_half_rate() {
        let tuning = AgentTuning::default();
        let mut meter = BustMeter::default();
        let _ = meter.update(true, 1.0, &tuning);
        assert_eq!(meter.progress(), 0.5);
        let _ = meter.update(false, 2.0, &tuning);
        assert_eq!(meter.progress(), 0.0);
        let _ = meter.update(false, 2.0, &tuning);
        assert_eq!(meter.progress(), 0.0);
    }

    #[test]
    fn agent_far_behind_drives_flat_out() {
        let lanes = LaneLayout::default();
        let mut agent = PursuitAgent::new(0.0, LaneIndex::new(1), &lanes, 33.0);
        step(&mut agent, &player(100.0, 30.0));
        assert_eq!(agent.speed(), 33.0);
        assert!((agent.position() - 16.5).abs() < 1e-4);
    }

    #[test]
    fn agent_inside_band_matches_player_plus_bias() {
        let lanes = LaneLayout::default();
        let mut agent = PursuitAgent::new(90.0, LaneIndex::new(1), &lanes, 40.0);
        step(&mut agent, &player(100.0, 20.0));
        assert_eq!(agent.speed(), 22.0);
    }

    #[test]
    fn agent_never_passes_the_follow_limit() {
        let lanes = LaneLayout::default();
        let mut agent = PursuitAgent::new(97.0, LaneIndex::new(1), &lanes, 40.0);
        step(&mut agent, &player(100.0, 30.0));
        assert_eq!(agent.position(), 98.0);

        step(&mut agent, &player(99.0, 10.0));
        assert_eq!(agent.speed(), 7.0);
        assert_eq!(agent.position(), 97.0);
    }

    #[test]
    fn agent_in_contact_only_when_aligned_and_behind() {
        let lanes = LaneLayout::default();
        let tuning = AgentTuning::default();
        let agent = PursuitAgent::new(98.0, LaneIndex::new(1), &lanes, 40.0);
        assert!(agent.in_contact(&player(100.0, 0.0), &tuning));
        assert!(!agent.in_contact(&player(96.0, 0.0), &tuning));

        let mut beside = player(100.0, 0.0);
        beside.lateral = 1.6;
        assert!(!agent.in_contact(&beside, &tuning));
    }

    #[test]
    fn lane_change_speed_grows_and_caps() {
        let tuning = AgentTuning::default();
        assert_eq!(tuning.lane_change_speed(0.0, 0), 4.0);
        assert!((tuning.lane_change_speed(2.0, 3) - 4.6).abs() < 1e-5);
        assert_eq!(tuning.lane_change_speed(600.0, 0), 10.0);
    }

    #[test]
    fn lateral_motion_steps_one_lane_and_never_overshoots() {
        assert_eq!(step_toward(LaneIndex::new(0), LaneIndex::new(2)), LaneIndex::new(1));
        assert_eq!(step_toward(LaneIndex::new(2), LaneIndex::new(0)), LaneIndex::new(1));
        assert_eq!(move_towards(0.0, 3.3, 2.0), 2.0);
        assert_eq!(move_towards(2.0, 3.3, 2.0), 3.3);
        assert_eq!(move_towards(0.0, -3.3, 1.0), -1.0);
    }
}
