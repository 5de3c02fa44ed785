use nih_plug::prelude::*;

use crate::curve::ShapingCurve;
use crate::envelope::{phase_step, EnvelopeStage, Segment, ShapedEnvelope};
use crate::gain_law::{frame_peak, level_to_db, GainLaw, SILENCE_FLOOR_DB};
use crate::history::GainHistory;

/// Everything the host side can change about the compressor, as one snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    pub threshold_db: f32,
    pub knee_db: f32,
    pub input_gain_db: f32,
    pub output_gain_db: f32,
    /// Attack time in seconds. Must be positive.
    pub attack_time: f32,
    /// Release time in seconds. Must be positive.
    pub release_time: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            threshold_db: 0.0,
            knee_db: 0.0,
            input_gain_db: 0.0,
            output_gain_db: 0.0,
            attack_time: 0.01,
            release_time: 0.1,
        }
    }
}

/// Single band, fixed ratio compressor whose attack and release are shaped by drawable curves.
///
/// All channels share one detector and one gain reduction value. The level is the loudest channel
/// after the input gain has been applied.
pub struct Compressor {
    settings: CompressorSettings,
    attack_curve: ShapingCurve,
    release_curve: ShapingCurve,

    envelope: ShapedEnvelope,
    history: GainHistory,
    /// Detector level of the last processed sample, in dB.
    input_level_db: f32,
    sample_rate: f32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self {
            settings: CompressorSettings::default(),
            attack_curve: ShapingCurve::attack_default(),
            release_curve: ShapingCurve::release_default(),

            envelope: ShapedEnvelope::default(),
            history: GainHistory::default(),
            input_level_db: SILENCE_FLOOR_DB,
            sample_rate: 44100.0,
        }
    }
}

impl Compressor {
    /// Sets the sample rate and resets the envelope. Settings and curves are left alone.
    pub fn prepare(&mut self, sample_rate: f32) {
        nih_debug_assert!(sample_rate > 0.0);
        self.sample_rate = sample_rate;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.envelope.reset();
        self.history.clear();
        self.input_level_db = SILENCE_FLOOR_DB;
    }

    /// Compresses `channels` in place. Every channel must have the same length.
    pub fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        nih_debug_assert!(self.settings.attack_time > 0.0);
        nih_debug_assert!(self.settings.release_time > 0.0);

        let input_gain = util::db_to_gain(self.settings.input_gain_db);
        for channel in channels.iter_mut() {
            for sample in channel.iter_mut() {
                *sample *= input_gain;
            }
        }

        let law = GainLaw::new(self.settings.threshold_db, self.settings.knee_db);
        let attack = Segment {
            step: phase_step(self.settings.attack_time, self.sample_rate),
            curve: &self.attack_curve,
        };
        let release = Segment {
            step: phase_step(self.settings.release_time, self.sample_rate),
            curve: &self.release_curve,
        };

        let num_samples = channels.first().map_or(0, |channel| channel.len());
        for sample_idx in 0..num_samples {
            self.input_level_db = level_to_db(frame_peak(channels, sample_idx));
            let target_db = law.target_reduction_db(self.input_level_db);
            let gain_reduction_db = self.envelope.next(target_db, attack, release);

            let gain = util::db_to_gain(-gain_reduction_db);
            for channel in channels.iter_mut() {
                channel[sample_idx] *= gain;
            }

            self.history.push(gain_reduction_db);
        }

        let output_gain = util::db_to_gain(self.settings.output_gain_db);
        for channel in channels.iter_mut() {
            for sample in channel.iter_mut() {
                *sample *= output_gain;
            }
        }
    }

    pub fn apply_settings(&mut self, settings: CompressorSettings) {
        self.settings = settings;
    }

    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.settings.threshold_db = threshold_db;
    }

    pub fn set_knee(&mut self, knee_db: f32) {
        self.settings.knee_db = knee_db;
    }

    pub fn set_input_gain(&mut self, input_gain_db: f32) {
        self.settings.input_gain_db = input_gain_db;
    }

    pub fn set_output_gain(&mut self, output_gain_db: f32) {
        self.settings.output_gain_db = output_gain_db;
    }

    pub fn set_attack_time(&mut self, seconds: f32) {
        self.settings.attack_time = seconds;
    }

    pub fn set_release_time(&mut self, seconds: f32) {
        self.settings.release_time = seconds;
    }

    pub fn set_attack_curve(&mut self, curve: ShapingCurve) {
        self.attack_curve = curve;
    }

    pub fn set_release_curve(&mut self, curve: ShapingCurve) {
        self.release_curve = curve;
    }

    pub fn settings(&self) -> CompressorSettings {
        self.settings
    }

    pub fn attack_curve(&self) -> &ShapingCurve {
        &self.attack_curve
    }

    pub fn release_curve(&self) -> &ShapingCurve {
        &self.release_curve
    }

    pub fn gain_reduction_db(&self) -> f32 {
        self.envelope.gain_reduction_db()
    }

    pub fn input_level_db(&self) -> f32 {
        self.input_level_db
    }

    pub fn gain_reduction_history(&self) -> &GainHistory {
        &self.history
    }

    pub fn envelope_stage(&self) -> EnvelopeStage {
        self.envelope.stage()
    }

    pub fn envelope(&self) -> &ShapedEnvelope {
        &self.envelope
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}
