use serde::{Deserialize, Serialize};

/// Distance-driven tuning that maps progress along the road to a difficulty level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTuning {
    /// Forward distance the player must travel to gain one full level.
    pub distance_per_level: f32,
    /// Highest level the curve may report regardless of distance travelled.
    pub max_level: f32,
}

impl Default for DifficultyTuning {
    fn default() -> Self {
        Self {
            distance_per_level: 1_000.0,
            max_level: 10.0,
        }
    }
}

/// Linear rate that shrinks as difficulty rises, floored at a minimum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateScaling {
    /// Value reported at level zero.
    pub base: f32,
    /// Amount subtracted from the base for every difficulty level.
    pub per_level: f32,
    /// Lowest value the scaling may ever report.
    pub floor: f32,
}

impl RateScaling {
    /// Creates a new rate scaling descriptor.
    #[must_use]
    pub const fn new(base: f32, per_level: f32, floor: f32) -> Self {
        Self {
            base,
            per_level,
            floor,
        }
    }

    /// Evaluates the scaled rate at the provided difficulty level.
    #[must_use]
    pub fn at_level(&self, level: f32) -> f32 {
        (self.base - level * self.per_level).max(self.floor)
    }
}

impl Default for RateScaling {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
}

/// Pure difficulty curve anchored at the position where the run started.
///
/// The curve holds no state beyond that anchor: every query is a function of
/// the supplied forward position. Levels are fractional, clamped to
/// `[0, max_level]`, and non-decreasing in distance travelled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DifficultyCurve {
    start: f32,
    tuning: DifficultyTuning,
}

impl DifficultyCurve {
    /// Creates a curve that starts counting distance from `start`.
    #[must_use]
    pub const fn new(start: f32, tuning: DifficultyTuning) -> Self {
        Self { start, tuning }
    }

    /// Position the curve measures travelled distance from.
    #[must_use]
    pub const fn start(&self) -> f32 {
        self.start
    }

    /// Tuning parameters backing the curve.
    #[must_use]
    pub const fn tuning(&self) -> DifficultyTuning {
        self.tuning
    }

    /// Difficulty level reached at the provided forward position.
    #[must_use]
    pub fn level(&self, position: f32) -> f32 {
        let per_level = self.tuning.distance_per_level;
        if per_level <= 0.0 || per_level.is_nan() {
            return 0.0;
        }

        let cap = self.tuning.max_level.max(0.0);
        let level = (position - self.start) / per_level;
        if level.is_nan() {
            return 0.0;
        }
        level.clamp(0.0, cap)
    }

    /// Evaluates a caller-specific rate at the provided forward position.
    #[must_use]
    pub fn scaled(&self, position: f32, scaling: &RateScaling) -> f32 {
        scaling.at_level(self.level(position))
    }
}

#[cfg(test)]
mod tests {
    use super::{DifficultyCurve, DifficultyTuning, RateScaling};

    fn curve() -> DifficultyCurve {
        DifficultyCurve::new(
            0.0,
            DifficultyTuning {
                distance_per_level: 1_000.0,
                max_level: 10.0,
            },
        )
    }

    #[test]
    fn level_is_capped_beyond_configured_maximum() {
        assert_eq!(curve().level(15_000.0), 10.0);
    }

    #[test]
    fn level_never_drops_below_zero_before_start() {
        let curve = DifficultyCurve::new(500.0, DifficultyTuning::default());
        assert_eq!(curve.level(100.0), 0.0);
    }

    #[test]
    fn level_is_non_decreasing_in_distance() {
        let curve = curve();
        let mut previous = curve.level(0.0);
        for step in 1..=300 {
            let level = curve.level(step as f32 * 50.0);
            assert!(level >= previous, "level decreased at step {step}");
            previous = level;
        }
    }

    #[test]
    fn scaled_rate_respects_floor() {
        let scaling = RateScaling::new(1.5, 0.2, 0.4);
        let curve = DifficultyCurve::new(
            0.0,
            DifficultyTuning {
                distance_per_level: 1_000.0,
                max_level: 15.0,
            },
        );
        assert!((curve.scaled(2_500.0, &scaling) - 1.0).abs() < 1e-6);
        assert_eq!(curve.scaled(50_000.0, &scaling), 0.4);
    }

    #[test]
    fn degenerate_distance_per_level_reports_level_zero() {
        let curve = DifficultyCurve::new(
            0.0,
            DifficultyTuning {
                distance_per_level: 0.0,
                max_level: 10.0,
            },
        );
        assert_eq!(curve.level(10_000.0), 0.0);
    }
}
