#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pursuit system that turns accumulated heat into a police chase.
//!
//! Heat builds at a fixed rate while no chase is under way. Once it reaches
//! its maximum a single [`PursuitAgent`] is placed behind the player and the
//! system tracks bust progress until the chase is resolved by escape, a pit
//! stop, or capture.

use getaway_core::{
    ChaseEndReason, Command, Event, LaneLayout, PlayerSnapshot, PursuitPhase, RunOutcome,
};
use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

mod agent;

pub use agent::{AgentTuning, BustMeter, PursuitAgent};

/// Tuning for the top speed advantage the agent holds over the player.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvantageTuning {
    /// Advantage at the start of a run with no upgrades.
    pub base: f32,
    /// Advantage gained per minute of run time.
    pub per_minute: f32,
    /// Advantage gained per purchased upgrade level.
    pub per_upgrade: f32,
    /// Largest advantage the agent may hold.
    pub cap: f32,
}

impl AdvantageTuning {
    /// Advantage granted after `run_minutes` against `upgrades` purchased levels.
    #[must_use]
    pub fn at(&self, run_minutes: f32, upgrades: u32) -> f32 {
        (self.base + run_minutes * self.per_minute + upgrades as f32 * self.per_upgrade)
            .min(self.cap)
    }
}

impl Default for AdvantageTuning {
    fn default() -> Self {
        Self {
            base: 3.0,
            per_minute: 0.1,
            per_upgrade: 0.3,
            cap: 6.0,
        }
    }
}

/// Configuration parameters required to construct the pursuit system.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Heat at which a chase begins.
    pub max_heat: f32,
    /// Heat gained per second while no chase is under way.
    pub heat_rate: f32,
    /// Distance behind the player at which the agent enters.
    pub chase_start_distance: f32,
    /// Distance behind the player beyond which the agent has lost the chase.
    pub escape_distance: f32,
    /// Agent top speed advantage.
    pub advantage: AdvantageTuning,
    /// Agent motion and capture tuning.
    pub agent: AgentTuning,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_heat: 100.0,
            heat_rate: 7.0,
            chase_start_distance: 25.0,
            escape_distance: 200.0,
            advantage: AdvantageTuning::default(),
            agent: AgentTuning::default(),
        }
    }
}

/// Player-side inputs the pursuit system reads on every tick.
#[derive(Clone, Copy, Debug)]
pub struct PursuitContext<'a> {
    /// Player motion as of the current tick.
    pub player: PlayerSnapshot,
    /// Engine top speed of the player, excluding temporary boosts.
    pub player_max_speed: f32,
    /// Purchased upgrade levels across every track.
    pub upgrades: u32,
    /// Lane layout of the road.
    pub lanes: &'a LaneLayout,
}

#[derive(Debug)]
struct Chase {
    agent: PursuitAgent,
    elapsed: f32,
}

/// Heat, chase, and capture state machine.
#[derive(Debug)]
pub struct Pursuit {
    config: Config,
    heat: f32,
    bust: BustMeter,
    chase: Option<Chase>,
    run_time: f32,
    captured: bool,
    rng: ChaCha8Rng,
}

impl Pursuit {
    /// Creates a new pursuit system with no heat.
    #[must_use]
    pub fn new(config: Config, seed: u64) -> Self {
        Self {
            config,
            heat: 0.0,
            bust: BustMeter::default(),
            chase: None,
            run_time: 0.0,
            captured: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Current phase of the state machine.
    #[must_use]
    pub fn phase(&self) -> PursuitPhase {
        if self.chase.is_some() {
            PursuitPhase::Chasing
        } else {
            PursuitPhase::Idle
        }
    }

    /// Heat accumulated toward a chase, in `[0, max_heat]`.
    #[must_use]
    pub fn heat(&self) -> f32 {
        self.heat
    }

    /// Progress toward a capture, in `[0, 1]`.
    #[must_use]
    pub fn bust_progress(&self) -> f32 {
        self.bust.progress()
    }

    /// Pursuing vehicle while a chase is under way.
    #[must_use]
    pub fn agent(&self) -> Option<&PursuitAgent> {
        self.chase.as_ref().map(|chase| &chase.agent)
    }

    /// Reports whether the agent has captured the player.
    #[must_use]
    pub fn captured(&self) -> bool {
        self.captured
    }

    /// Consumes events and player views, emitting pursuit events and commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        context: &PursuitContext<'_>,
        out_events: &mut Vec<Event>,
        out_commands: &mut Vec<Command>,
    ) {
        let mut resolved = false;
        for event in events {
            if self.captured {
                return;
            }
            match event {
                Event::TimeAdvanced { dt } => {
                    let dt = dt.as_secs_f32();
                    self.run_time += dt;
                    if self.chase.is_some() {
                        resolved |= self.advance_chase(dt, context, out_events, out_commands);
                    } else if !resolved {
                        self.build_heat(dt, context, out_events);
                    }
                }
                Event::PitStopReached => {
                    resolved |= self.pit_stop(out_events);
                }
                _ => {}
            }
        }
    }

    fn build_heat(&mut self, dt: f32, context: &PursuitContext<'_>, out_events: &mut Vec<Event>) {
        let max_heat = self.config.max_heat.max(0.0);
        let heat = (self.heat + self.config.heat_rate * dt).clamp(0.0, max_heat);
        if heat != self.heat {
            self.heat = heat;
            out_events.push(Event::HeatChanged { heat });
        }
        if self.heat >= max_heat {
            self.start_chase(context, out_events);
        }
    }

    fn start_chase(&mut self, context: &PursuitContext<'_>, out_events: &mut Vec<Event>) {
        let advantage = self
            .config
            .advantage
            .at(self.run_time / 60.0, context.upgrades);
        let agent_speed = context.player_max_speed + advantage;
        let agent = PursuitAgent::new(
            context.player.position - self.config.chase_start_distance,
            context.lanes.center(),
            context.lanes,
            agent_speed,
        );
        info!(
            "chase started at {:.0}, agent top speed {agent_speed:.1}",
            context.player.position
        );
        self.chase = Some(Chase {
            agent,
            elapsed: 0.0,
        });
        out_events.push(Event::ChaseStarted { agent_speed });
    }

    /// Returns `true` when the chase ended on this step.
    fn advance_chase(
        &mut self,
        dt: f32,
        context: &PursuitContext<'_>,
        out_events: &mut Vec<Event>,
        out_commands: &mut Vec<Command>,
    ) -> bool {
        let Some(chase) = self.chase.as_mut() else {
            return false;
        };
        let tuning = self.config.agent;

        chase.elapsed += dt;
        let lane_change_speed = tuning.lane_change_speed(chase.elapsed / 60.0, context.upgrades);
        chase.agent.step(
            dt,
            &context.player,
            context.lanes,
            lane_change_speed,
            &tuning,
            &mut self.rng,
        );

        let in_contact = chase.agent.in_contact(&context.player, &tuning);
        let gap = context.player.position - chase.agent.position();
        let before = self.bust.progress();
        let progress = self.bust.update(in_contact, dt, &tuning);
        if progress != before {
            out_events.push(Event::BustProgressChanged { progress });
        }

        if self.bust.is_full() {
            info!("player captured after {:.1}s of chase", chase.elapsed);
            self.captured = true;
            out_events.push(Event::Captured);
            out_commands.push(Command::EndRun {
                outcome: RunOutcome::Busted,
            });
            return true;
        }

        if gap > self.config.escape_distance {
            debug!("agent fell {gap:.0} behind");
            self.end_chase(ChaseEndReason::Escaped, out_events);
            return true;
        }
        false
    }

    fn end_chase(&mut self, reason: ChaseEndReason, out_events: &mut Vec<Event>) {
        if self.chase.take().is_none() {
            return;
        }
        info!("chase ended: {reason:?}");
        out_events.push(Event::ChaseEnded { reason });
    }

    /// Returns `true` when a chase was under way.
    fn pit_stop(&mut self, out_events: &mut Vec<Event>) -> bool {
        if self.heat != 0.0 {
            self.heat = 0.0;
            out_events.push(Event::HeatChanged { heat: 0.0 });
        }

        let chasing = self.chase.is_some();
        self.end_chase(ChaseEndReason::PitStop, out_events);
        if self.bust.progress() != 0.0 {
            self.bust.reset();
            out_events.push(Event::BustProgressChanged { progress: 0.0 });
        }
        chasing
    }
}

#[cfg(test)]
mod tests {
    use super::AdvantageTuning;

    #[test]
    fn advantage_grows_with_time_and_upgrades_then_caps() {
        let tuning = AdvantageTuning::default();
        assert_eq!(tuning.at(0.0, 0), 3.0);
        assert!((tuning.at(10.0, 2) - 4.6).abs() < 1e-5);
        assert_eq!(tuning.at(0.0, 20), 6.0);
    }
}
