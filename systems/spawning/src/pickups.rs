use getaway_core::{Command, DifficultyCurve, DifficultyTuning, LaneIndex, PickupKind, RateScaling};
use log::debug;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{uniform, SpawnContext};

/// Tuning for fuel pickups.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelSpawnConfig {
    /// Distance-to-level mapping used by the fuel cadence.
    pub difficulty: DifficultyTuning,
    /// Seconds between fuel pickups as a function of difficulty level.
    pub interval: RateScaling,
    /// Distance ahead of the player at which fuel appears.
    pub lead_distance: f32,
    /// Tank fraction at or below which fuel spawns more often.
    pub low_fuel_threshold: f32,
    /// Interval multiplier applied while the tank is low.
    pub low_fuel_multiplier: f32,
}

impl Default for FuelSpawnConfig {
    fn default() -> Self {
        Self {
            difficulty: DifficultyTuning {
                distance_per_level: 1_000.0,
                max_level: 10.0,
            },
            interval: RateScaling::new(3.0, 0.4, 2.0),
            lead_distance: 80.0,
            low_fuel_threshold: 0.3,
            low_fuel_multiplier: 0.4,
        }
    }
}

/// Tuning for coin pickups.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinSpawnConfig {
    /// Distance-to-level mapping used by the coin cadence.
    pub difficulty: DifficultyTuning,
    /// Seconds between coins as a function of difficulty level.
    pub interval: RateScaling,
    /// Half-width of the uniform band added to every reset.
    pub jitter: f32,
    /// Distance ahead of the player at which coins appear.
    pub lead_distance: f32,
    /// Coins allowed on the road at once.
    pub max_live: usize,
}

impl Default for CoinSpawnConfig {
    fn default() -> Self {
        Self {
            difficulty: DifficultyTuning {
                distance_per_level: 1_500.0,
                max_level: 8.0,
            },
            interval: RateScaling::new(8.0, 0.4, 4.0),
            jitter: 2.0,
            lead_distance: 60.0,
            max_live: 3,
        }
    }
}

/// Tuning for speed boost and shield pickups.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpSpawnConfig {
    /// Distance-to-level mapping used by the power-up cadence.
    pub difficulty: DifficultyTuning,
    /// Seconds between power-ups as a function of difficulty level.
    pub interval: RateScaling,
    /// Distance ahead of the player at which power-ups appear.
    pub lead_distance: f32,
    /// Every n-th power-up is a shield; the rest are speed boosts.
    pub shield_every: u32,
}

impl Default for PowerUpSpawnConfig {
    fn default() -> Self {
        Self {
            difficulty: DifficultyTuning {
                distance_per_level: 1_000.0,
                max_level: 10.0,
            },
            interval: RateScaling::new(6.0, 0.5, 2.0),
            lead_distance: 60.0,
            shield_every: 3,
        }
    }
}

/// Countdown shared by every pickup category.
#[derive(Debug)]
struct Countdown {
    curve: DifficultyCurve,
    interval: RateScaling,
    jitter: f32,
    remaining: f32,
}

impl Countdown {
    fn new(
        start_position: f32,
        difficulty: DifficultyTuning,
        interval: RateScaling,
        jitter: f32,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let base = interval.base.max(0.0);
        let remaining = if base > 0.0 {
            rng.gen_range(0.0..base)
        } else {
            0.0
        };
        Self {
            curve: DifficultyCurve::new(start_position, difficulty),
            interval,
            jitter,
            remaining,
        }
    }

    /// Counts down and reports whether the timer is due.
    fn elapse(&mut self, elapsed: f32) -> bool {
        self.remaining -= elapsed;
        self.remaining <= 0.0
    }

    fn hold(&mut self) {
        self.remaining = 0.0;
    }

    fn reset(&mut self, position: f32, multiplier: f32, rng: &mut ChaCha8Rng) {
        let mut interval = self.curve.scaled(position, &self.interval);
        if self.jitter > 0.0 {
            interval += uniform(rng, -self.jitter, self.jitter);
        }
        self.remaining = (interval * multiplier).max(0.0);
    }
}

#[derive(Debug)]
pub(crate) struct PickupSpawner {
    fuel_config: FuelSpawnConfig,
    coin_config: CoinSpawnConfig,
    power_up_config: PowerUpSpawnConfig,
    fuel: Countdown,
    coins: Countdown,
    power_ups: Countdown,
    power_ups_spawned: u32,
}

impl PickupSpawner {
    pub(crate) fn new(
        fuel_config: FuelSpawnConfig,
        coin_config: CoinSpawnConfig,
        power_up_config: PowerUpSpawnConfig,
        start_position: f32,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let fuel = Countdown::new(
            start_position,
            fuel_config.difficulty,
            fuel_config.interval,
            0.0,
            rng,
        );
        let coins = Countdown::new(
            start_position,
            coin_config.difficulty,
            coin_config.interval,
            coin_config.jitter,
            rng,
        );
        let power_ups = Countdown::new(
            start_position,
            power_up_config.difficulty,
            power_up_config.interval,
            0.0,
            rng,
        );
        Self {
            fuel_config,
            coin_config,
            power_up_config,
            fuel,
            coins,
            power_ups,
            power_ups_spawned: 0,
        }
    }

    pub(crate) fn advance(
        &mut self,
        elapsed: f32,
        context: &SpawnContext<'_>,
        rng: &mut ChaCha8Rng,
        out: &mut Vec<Command>,
    ) {
        if context.lanes.is_empty() {
            return;
        }
        let position = context.player.position;

        if self.fuel.elapse(elapsed) {
            place(
                PickupKind::Fuel,
                position + self.fuel_config.lead_distance,
                context,
                rng,
                out,
            );
            let multiplier = if context.fuel_fraction <= self.fuel_config.low_fuel_threshold {
                self.fuel_config.low_fuel_multiplier
            } else {
                1.0
            };
            self.fuel.reset(position, multiplier, rng);
        }

        if self.coins.elapse(elapsed) {
            if context.pickups.coins < self.coin_config.max_live {
                place(
                    PickupKind::Coin,
                    position + self.coin_config.lead_distance,
                    context,
                    rng,
                    out,
                );
                self.coins.reset(position, 1.0, rng);
            } else {
                self.coins.hold();
            }
        }

        if self.power_ups.elapse(elapsed) {
            self.power_ups_spawned = self.power_ups_spawned.wrapping_add(1);
            let every = self.power_up_config.shield_every;
            let kind = if every > 0 && self.power_ups_spawned % every == 0 {
                PickupKind::Shield
            } else {
                PickupKind::SpeedBoost
            };
            place(
                kind,
                position + self.power_up_config.lead_distance,
                context,
                rng,
                out,
            );
            self.power_ups.reset(position, 1.0, rng);
        }
    }
}

fn place(
    kind: PickupKind,
    position: f32,
    context: &SpawnContext<'_>,
    rng: &mut ChaCha8Rng,
    out: &mut Vec<Command>,
) {
    let lane = LaneIndex::new(rng.gen_range(0..context.lanes.len()) as u32);
    debug!("{kind:?} in lane {} at {position:.0}", lane.get());
    out.push(Command::SpawnPickup {
        kind,
        lane,
        position,
    });
}
