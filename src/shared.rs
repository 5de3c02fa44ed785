//! Hand-off between the audio thread and everything else.
//!
//! Curves travel from the editor to the audio thread and telemetry travels back, both as whole
//! snapshots through triple buffers. The audio thread never locks and never sees a partially
//! written curve. Readers see the newest complete snapshot, at most one block old.

use triple_buffer::TripleBuffer;

use crate::compressor::Compressor;
use crate::curve::ShapingCurve;
use crate::gain_law::SILENCE_FLOOR_DB;
use crate::history::HISTORY_LEN;

/// Both shaping curves, published together.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSet {
    pub attack: ShapingCurve,
    pub release: ShapingCurve,
}

impl Default for CurveSet {
    fn default() -> Self {
        Self {
            attack: ShapingCurve::attack_default(),
            release: ShapingCurve::release_default(),
        }
    }
}

/// Creates a linked publisher/subscriber pair, both starting out at `initial`.
pub fn curve_channel(initial: CurveSet) -> (CurvePublisher, CurveSubscriber) {
    let (input, output) = TripleBuffer::new(&initial).split();
    (
        CurvePublisher {
            staged: initial,
            input,
        },
        CurveSubscriber { output },
    )
}

/// Writing end, owned by whoever edits the curves.
pub struct CurvePublisher {
    /// Last snapshot handed to the audio thread. Single-curve edits are applied on top of this.
    staged: CurveSet,
    input: triple_buffer::Input<CurveSet>,
}

impl CurvePublisher {
    pub fn set_attack(&mut self, curve: ShapingCurve) {
        self.staged.attack = curve;
        self.input.write(self.staged.clone());
    }

    pub fn set_release(&mut self, curve: ShapingCurve) {
        self.staged.release = curve;
        self.input.write(self.staged.clone());
    }

    pub fn publish(&mut self, curves: CurveSet) {
        self.staged = curves;
        self.input.write(self.staged.clone());
    }

    pub fn current(&self) -> &CurveSet {
        &self.staged
    }
}

/// Reading end, owned by the audio thread.
pub struct CurveSubscriber {
    output: triple_buffer::Output<CurveSet>,
}

impl CurveSubscriber {
    /// The newest snapshot if one was published since the last poll.
    pub fn poll(&mut self) -> Option<&CurveSet> {
        if self.output.updated() {
            Some(self.output.read())
        } else {
            None
        }
    }
}

/// What the compressor exposes for metering, as of the last processed block.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub gain_reduction_db: f32,
    pub input_level_db: f32,
    /// Raw history ring, see `history_index` for where the oldest value sits.
    pub history: [f32; HISTORY_LEN],
    pub history_index: usize,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            gain_reduction_db: 0.0,
            input_level_db: SILENCE_FLOOR_DB,
            history: [0.0; HISTORY_LEN],
            history_index: 0,
        }
    }
}

pub fn telemetry_channel() -> (TelemetryPublisher, TelemetryReader) {
    let (input, output) = TripleBuffer::new(&Telemetry::default()).split();
    (TelemetryPublisher { input }, TelemetryReader { output })
}

pub struct TelemetryPublisher {
    input: triple_buffer::Input<Telemetry>,
}

impl TelemetryPublisher {
    /// Copies the compressor's meter values into the back buffer and publishes them.
    pub fn publish(&mut self, compressor: &Compressor) {
        let telemetry = self.input.input_buffer();
        telemetry.gain_reduction_db = compressor.gain_reduction_db();
        telemetry.input_level_db = compressor.input_level_db();
        telemetry.history = *compressor.gain_reduction_history().values();
        telemetry.history_index = compressor.gain_reduction_history().write_index();

        self.input.publish();
    }
}

pub struct TelemetryReader {
    output: triple_buffer::Output<Telemetry>,
}

impl TelemetryReader {
    pub fn latest(&mut self) -> &Telemetry {
        self.output.read()
    }
}
