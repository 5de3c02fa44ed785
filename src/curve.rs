//! 256-point lookup tables that shape the attack and release segments.
//!
//! A curve is a plain value. The engine swaps whole curves in and out, so a reader never sees a
//! table that is halfway through being redrawn.

/// Number of points in a shaping curve.
pub const CURVE_LEN: usize = 256;

/// Which segment a curve is drawn for. This decides where the endpoints are pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    /// Rises from 0 to 1.
    Attack,
    /// Falls from 1 to 0.
    Release,
}

impl CurveKind {
    /// Values of the first and last point.
    pub fn endpoints(self) -> (f32, f32) {
        match self {
            CurveKind::Attack => (0.0, 1.0),
            CurveKind::Release => (1.0, 0.0),
        }
    }
}

/// Preset shapes a curve can be rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CurveShape {
    #[default]
    Linear,
    /// `t^k`, slow start and fast finish.
    Exponential(f32),
    /// `1 - (1 - t)^k`, fast start and slow finish.
    Logarithmic(f32),
    /// Smoothstep.
    SCurve,
}

impl CurveShape {
    /// Maps `t` in `[0, 1]` to a rising value in `[0, 1]`.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            CurveShape::Linear => t,
            CurveShape::Exponential(k) => t.powf(k),
            CurveShape::Logarithmic(k) => 1.0 - (1.0 - t).powf(k),
            CurveShape::SCurve => t * t * (3.0 - 2.0 * t),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapingCurve {
    values: [f32; CURVE_LEN],
}

impl ShapingCurve {
    pub fn from_values(values: [f32; CURVE_LEN]) -> Self {
        Self { values }
    }

    /// Builds a curve by evaluating `f` at every normalized position `i / 255`.
    pub fn from_fn(f: impl Fn(f32) -> f32) -> Self {
        let mut values = [0.0; CURVE_LEN];
        for (i, value) in values.iter_mut().enumerate() {
            *value = f(i as f32 / (CURVE_LEN - 1) as f32);
        }

        Self { values }
    }

    /// Renders a preset shape. Release curves are the shape mirrored top to bottom, so they fall
    /// from 1 to 0 at the same rate the attack version rises.
    pub fn from_shape(kind: CurveKind, shape: CurveShape) -> Self {
        match kind {
            CurveKind::Attack => Self::from_fn(|t| shape.apply(t)),
            CurveKind::Release => Self::from_fn(|t| 1.0 - shape.apply(t)),
        }
    }

    /// Linear ramp from 0 to 1.
    pub fn attack_default() -> Self {
        Self::from_shape(CurveKind::Attack, CurveShape::Linear)
    }

    /// Linear ramp from 1 to 0.
    pub fn release_default() -> Self {
        Self::from_shape(CurveKind::Release, CurveShape::Linear)
    }

    pub fn values(&self) -> &[f32; CURVE_LEN] {
        &self.values
    }

    /// Value at a normalized phase. The phase is mapped to the nearest point and clamped to the
    /// table, so phases outside of `[0, 1]` read the first or last point.
    pub fn value_at_phase(&self, phase: f32) -> f32 {
        let position = (phase * (CURVE_LEN - 1) as f32).round();
        let index = position.clamp(0.0, (CURVE_LEN - 1) as f32) as usize;
        self.values[index]
    }

    /// Sets a single point the way a drawn edit would. The value is clamped to `[0, 1]` and the
    /// two endpoints stay pinned to `kind`'s start and end values.
    pub fn set_point(&mut self, kind: CurveKind, index: usize, value: f32) {
        let index = index.min(CURVE_LEN - 1);
        let (start, end) = kind.endpoints();
        self.values[index] = if index == 0 {
            start
        } else if index == CURVE_LEN - 1 {
            end
        } else {
            value.clamp(0.0, 1.0)
        };
    }

    /// Fills every point between `from` and `to` (inclusive) with a straight line between the two
    /// values. Used to connect drag positions that skipped over points. A segment touching either
    /// end of the table ramps into that end's pinned value.
    pub fn draw_segment(
        &mut self,
        kind: CurveKind,
        from: usize,
        from_value: f32,
        to: usize,
        to_value: f32,
    ) {
        let (from, from_value, to, to_value) = if from <= to {
            (from, from_value, to, to_value)
        } else {
            (to, to_value, from, from_value)
        };
        let to = to.min(CURVE_LEN - 1);
        if from > to {
            return;
        }

        let (start, end) = kind.endpoints();
        let from_value = if from == 0 { start } else { from_value };
        let to_value = if to == CURVE_LEN - 1 { end } else { to_value };

        let span = (to - from) as f32;
        for index in from..=to {
            let t = if span > 0.0 {
                (index - from) as f32 / span
            } else {
                1.0
            };
            self.set_point(kind, index, from_value + (to_value - from_value) * t);
        }
    }
}
