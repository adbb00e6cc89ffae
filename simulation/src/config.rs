use std::{fs, io, path::Path, path::PathBuf};

use getaway_core::DifficultyTuning;
use getaway_system_pursuit::Config as PursuitConfig;
use getaway_system_spawning::Config as SpawningConfig;
use getaway_world::WorldConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a simulation configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration from {}", path.display())]
    Io {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The configuration was not valid TOML or did not match the schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The lane layout contains no lanes.
    #[error("lane layout must contain at least one lane")]
    NoLanes,
    /// The lane coordinates are not strictly increasing.
    #[error("lane coordinates must be strictly increasing left to right")]
    UnsortedLanes,
    /// A difficulty curve has a non-positive distance per level.
    #[error("{category} difficulty needs a positive distance per level, got {distance}")]
    InvalidDifficulty {
        /// Spawn category owning the curve.
        category: &'static str,
        /// Offending distance per level.
        distance: f32,
    },
    /// The traffic speed range is inverted.
    #[error("traffic speed range is inverted: {min} > {max}")]
    InvertedSpeedRange {
        /// Configured lower bound.
        min: f32,
        /// Configured upper bound.
        max: f32,
    },
    /// The bust duration is not positive.
    #[error("bust duration must be positive, got {0}")]
    InvalidBustDuration(f32),
}

/// Complete configuration of a simulation run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed from which every random stream of the run is derived.
    pub seed: u64,
    /// Road, player, and economy settings.
    pub world: WorldConfig,
    /// Traffic, pickup, and pit stop cadence.
    pub spawning: SpawningConfig,
    /// Heat and chase tuning.
    pub pursuit: PursuitConfig,
}

impl SimulationConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Rejects settings the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lanes = self.world.lanes.coordinates();
        if lanes.is_empty() {
            return Err(ConfigError::NoLanes);
        }
        if lanes.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ConfigError::UnsortedLanes);
        }

        let spawning = &self.spawning;
        check_difficulty("traffic", spawning.traffic.difficulty)?;
        check_difficulty("fuel", spawning.fuel.difficulty)?;
        check_difficulty("coin", spawning.coins.difficulty)?;
        check_difficulty("power-up", spawning.power_ups.difficulty)?;

        let traffic = &spawning.traffic;
        if traffic.min_speed > traffic.max_speed {
            return Err(ConfigError::InvertedSpeedRange {
                min: traffic.min_speed,
                max: traffic.max_speed,
            });
        }

        let bust_duration = self.pursuit.agent.bust_duration;
        if bust_duration.is_nan() || bust_duration <= 0.0 {
            return Err(ConfigError::InvalidBustDuration(bust_duration));
        }
        Ok(())
    }
}

fn check_difficulty(category: &'static str, tuning: DifficultyTuning) -> Result<(), ConfigError> {
    let distance = tuning.distance_per_level;
    if distance.is_nan() || distance <= 0.0 {
        return Err(ConfigError::InvalidDifficulty { category, distance });
    }
    Ok(())
}
