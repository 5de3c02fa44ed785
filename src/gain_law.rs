use nih_plug::prelude::util;

/// The compression ratio is fixed at 4:1.
pub const RATIO: f32 = 4.0;

/// Level reported for a block of digital silence.
pub const SILENCE_FLOOR_DB: f32 = util::MINUS_INFINITY_DB;

/// Static threshold/knee mapping from input level to the gain reduction that level asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainLaw {
    pub threshold_db: f32,
    pub knee_db: f32,
}

impl GainLaw {
    pub fn new(threshold_db: f32, knee_db: f32) -> Self {
        Self {
            threshold_db,
            knee_db,
        }
    }

    /// Target gain reduction in dB (always `>= 0`) for an input level in dB.
    ///
    /// Inside the knee the reduction is the full-ratio slope scaled by `x²`, where `x` is the
    /// position within the knee. In the lower half of the knee the level is still below the
    /// threshold, which makes the raw product negative, so the result is clamped at zero.
    /// A knee of zero never reaches the knee branch and acts as a hard knee.
    pub fn target_reduction_db(&self, level_db: f32) -> f32 {
        let slope = 1.0 - 1.0 / RATIO;
        let knee_start = self.threshold_db - self.knee_db / 2.0;
        let knee_end = self.threshold_db + self.knee_db / 2.0;

        if level_db <= knee_start {
            0.0
        } else if level_db > knee_end {
            (level_db - self.threshold_db) * slope
        } else {
            let x = (level_db - knee_start) / self.knee_db;
            (x * x * (level_db - self.threshold_db) * slope).max(0.0)
        }
    }
}

/// Converts a linear peak to dB, flooring silence instead of taking `log(0)`.
pub fn level_to_db(peak: f32) -> f32 {
    if peak > 0.0 {
        util::gain_to_db(peak)
    } else {
        SILENCE_FLOOR_DB
    }
}

/// Loudest absolute sample across all channels at `sample_idx`.
pub fn frame_peak(channels: &[&mut [f32]], sample_idx: usize) -> f32 {
    channels
        .iter()
        .fold(0.0_f32, |peak, channel| peak.max(channel[sample_idx].abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_below_knee_is_zero() {
        let law = GainLaw::new(-12.0, 6.0);
        assert_eq!(law.target_reduction_db(-15.0), 0.0);
        assert_eq!(law.target_reduction_db(-40.0), 0.0);
        assert_eq!(law.target_reduction_db(SILENCE_FLOOR_DB), 0.0);
    }

    #[test]
    fn test_above_knee_uses_full_ratio() {
        let law = GainLaw::new(-12.0, 6.0);
        assert!((law.target_reduction_db(0.0) - 9.0).abs() < EPS);
        assert!((law.target_reduction_db(-6.0) - 4.5).abs() < EPS);
        assert!((law.target_reduction_db(12.0) - 18.0).abs() < EPS);
    }

    #[test]
    fn test_inside_knee() {
        // x = (-10.5 - -15) / 6 = 0.75
        let law = GainLaw::new(-12.0, 6.0);
        let expected = 0.75 * 0.75 * 1.5 * 0.75;
        assert!((law.target_reduction_db(-10.5) - expected).abs() < EPS);
        // x = 0.5 lands exactly on the threshold
        assert_eq!(law.target_reduction_db(-12.0), 0.0);
    }

    #[test]
    fn test_knee_boundaries_are_continuous() {
        for &(threshold, knee) in &[(-12.0_f32, 6.0_f32), (-30.0, 12.0), (-3.0, 24.0)] {
            let law = GainLaw::new(threshold, knee);
            let start = threshold - knee / 2.0;
            let end = threshold + knee / 2.0;

            assert!(law.target_reduction_db(start).abs() < EPS);
            assert!(law.target_reduction_db(start + 1e-3).abs() < EPS);

            let at_end = law.target_reduction_db(end);
            let just_above = law.target_reduction_db(end + 1e-3);
            assert!((at_end - (end - threshold) * 0.75).abs() < EPS);
            assert!((at_end - just_above).abs() < 1e-2);
        }
    }

    #[test]
    fn test_never_negative_across_knee() {
        let law = GainLaw::new(-12.0, 24.0);
        let mut level = -30.0_f32;
        while level < 6.0 {
            assert!(law.target_reduction_db(level) >= 0.0, "negative at {level} dB");
            level += 0.01;
        }
    }

    #[test]
    fn test_wider_knee_is_monotonic() {
        let threshold = -20.0;
        for &level in &[-40.0_f32, -32.0, -26.0, -14.0, -8.0, 0.0] {
            let narrow_knee = 6.0;
            let narrow = GainLaw::new(threshold, narrow_knee).target_reduction_db(level);
            for &wide_knee in &[8.0_f32, 12.0, 24.0] {
                let wide = GainLaw::new(threshold, wide_knee).target_reduction_db(level);
                if level >= threshold + narrow_knee / 2.0 {
                    assert!(wide <= narrow + EPS, "level {level}, knee {wide_knee}");
                }
                if level <= threshold - narrow_knee / 2.0 {
                    assert!(wide >= narrow - EPS, "level {level}, knee {wide_knee}");
                }
            }
        }
    }

    #[test]
    fn test_zero_knee_is_hard() {
        let law = GainLaw::new(-12.0, 0.0);
        assert_eq!(law.target_reduction_db(-12.0), 0.0);
        assert!((law.target_reduction_db(-11.0) - 0.75).abs() < EPS);
        assert!(law.target_reduction_db(-11.0).is_finite());
    }

    #[test]
    fn test_level_to_db() {
        assert_eq!(level_to_db(0.0), SILENCE_FLOOR_DB);
        assert!(level_to_db(1.0).abs() < EPS);
        assert!((level_to_db(0.5) + 6.0206).abs() < 1e-3);
    }

    #[test]
    fn test_frame_peak_takes_loudest_channel() {
        let mut left = [0.25_f32, -0.1];
        let mut right = [-0.5_f32, 0.05];
        let channels: [&mut [f32]; 2] = [&mut left, &mut right];
        assert_eq!(frame_peak(&channels, 0), 0.5);
        assert_eq!(frame_peak(&channels, 1), 0.1);
    }
}
