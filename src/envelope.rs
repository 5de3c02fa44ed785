use crate::curve::ShapingCurve;

/// Which segment the envelope is currently walking through. Attack and release are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeStage {
    #[default]
    Resting,
    Attacking,
    Releasing,
}

/// A shaping curve together with how far its phase advances per sample.
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    pub step: f32,
    pub curve: &'a ShapingCurve,
}

/// Per-sample phase increment for a segment lasting `time_seconds`.
pub fn phase_step(time_seconds: f32, sample_rate: f32) -> f32 {
    1.0 / (time_seconds * sample_rate)
}

/// Gain reduction follower that walks a shaping curve instead of using a one-pole smoother.
///
/// Every sample the curve value at the current phase is used as the fraction of the remaining
/// distance to cover towards the target. The distance is measured from wherever the envelope is
/// right now, so when the target moves halfway through a segment the interpolation re-anchors
/// around the new target while the phase keeps going. Once the phase reaches 1 the envelope lands
/// exactly on the target.
#[derive(Debug, Clone, Default)]
pub struct ShapedEnvelope {
    gain_reduction_db: f32,
    attack_phase: f32,
    release_phase: f32,
    stage: EnvelopeStage,
}

impl ShapedEnvelope {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advances the envelope by one sample and returns the new gain reduction in dB.
    pub fn next(&mut self, target_db: f32, attack: Segment, release: Segment) -> f32 {
        if target_db > self.gain_reduction_db {
            self.stage = EnvelopeStage::Attacking;
            self.release_phase = 0.0;

            self.attack_phase = (self.attack_phase + attack.step).clamp(0.0, 1.0);
            let fraction = attack.curve.value_at_phase(self.attack_phase);
            self.gain_reduction_db += fraction * (target_db - self.gain_reduction_db);

            if self.attack_phase >= 1.0 {
                self.settle(target_db);
            }
        } else if target_db < self.gain_reduction_db {
            self.stage = EnvelopeStage::Releasing;
            self.attack_phase = 0.0;

            self.release_phase = (self.release_phase + release.step).clamp(0.0, 1.0);
            let fraction = release.curve.value_at_phase(self.release_phase);
            let remaining = self.gain_reduction_db - target_db;
            self.gain_reduction_db = target_db + remaining * fraction;

            if self.release_phase >= 1.0 {
                self.settle(target_db);
            }
        } else {
            self.settle(target_db);
        }

        self.gain_reduction_db
    }

    fn settle(&mut self, target_db: f32) {
        self.gain_reduction_db = target_db;
        self.attack_phase = 0.0;
        self.release_phase = 0.0;
        self.stage = EnvelopeStage::Resting;
    }

    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    pub fn attack_phase(&self) -> f32 {
        self.attack_phase
    }

    pub fn release_phase(&self) -> f32 {
        self.release_phase
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn in_attack(&self) -> bool {
        self.stage == EnvelopeStage::Attacking
    }

    pub fn in_release(&self) -> bool {
        self.stage == EnvelopeStage::Releasing
    }
}
