use getaway_core::EffectKind;

/// Countdown timers for the power-up effects currently applied to the player.
#[derive(Clone, Debug)]
pub(crate) struct Effects {
    shield: f32,
    boost: f32,
    boost_multiplier: f32,
}

impl Effects {
    pub(crate) fn new() -> Self {
        Self {
            shield: 0.0,
            boost: 0.0,
            boost_multiplier: 1.0,
        }
    }

    pub(crate) fn shield_active(&self) -> bool {
        self.shield > 0.0
    }

    pub(crate) fn boost_multiplier(&self) -> f32 {
        if self.boost > 0.0 {
            self.boost_multiplier
        } else {
            1.0
        }
    }

    pub(crate) fn remaining(&self, effect: EffectKind) -> f32 {
        match effect {
            EffectKind::Shield => self.shield,
            EffectKind::SpeedBoost => self.boost,
        }
    }

    /// Starts the shield or extends it to the longer of the two durations.
    pub(crate) fn activate_shield(&mut self, duration: f32) {
        self.shield = self.shield.max(duration);
    }

    /// Starts the boost, or keeps the longer duration and larger multiplier when already active.
    pub(crate) fn activate_boost(&mut self, multiplier: f32, duration: f32) {
        if self.boost > 0.0 {
            self.boost = self.boost.max(duration);
            self.boost_multiplier = self.boost_multiplier.max(multiplier);
        } else {
            self.boost = duration;
            self.boost_multiplier = multiplier;
        }
    }

    /// Counts every timer down, reporting the effects that expired this tick.
    pub(crate) fn tick(&mut self, dt: f32, expired: &mut Vec<EffectKind>) {
        if self.shield > 0.0 {
            self.shield -= dt;
            if self.shield <= 0.0 {
                self.shield = 0.0;
                expired.push(EffectKind::Shield);
            }
        }

        if self.boost > 0.0 {
            self.boost -= dt;
            if self.boost <= 0.0 {
                self.boost = 0.0;
                self.boost_multiplier = 1.0;
                expired.push(EffectKind::SpeedBoost);
            }
        }
    }
}
