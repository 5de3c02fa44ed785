use nih_plug::prelude::*;
use std::sync::{Arc, Mutex};

pub mod compressor;
pub use compressor::{Compressor, CompressorSettings};
pub mod curve;
pub use curve::{CurveKind, CurveShape, ShapingCurve, CURVE_LEN};
pub mod envelope;
pub use envelope::{EnvelopeStage, ShapedEnvelope};
pub mod gain_law;
pub use gain_law::{GainLaw, RATIO};
pub mod history;
pub use history::{GainHistory, HISTORY_LEN};
pub mod shared;
pub use shared::{CurvePublisher, CurveSet, Telemetry, TelemetryReader};

use shared::{CurveSubscriber, TelemetryPublisher};

pub struct SondyComp {
    params: Arc<SondyCompParams>,
    compressor: Compressor,

    /// Audio thread side of the curve hand-off.
    curve_updates: CurveSubscriber,
    /// Editor side of the curve hand-off. Only ever locked off the audio thread.
    curve_publisher: Arc<Mutex<CurvePublisher>>,

    telemetry: TelemetryPublisher,
    telemetry_reader: Arc<Mutex<TelemetryReader>>,
}

#[derive(Params)]
struct SondyCompParams {
    /// Gain applied before level detection.
    #[id = "input_gain"]
    pub input_gain: FloatParam,

    /// Gain applied after compression.
    #[id = "output_gain"]
    pub output_gain: FloatParam,

    #[id = "threshold"]
    pub threshold: FloatParam,

    /// Width of the soft knee centered on the threshold. Zero gives a hard knee.
    #[id = "knee"]
    pub knee: FloatParam,

    /// Time it takes to walk the full attack curve, in milliseconds.
    #[id = "attack_time"]
    pub attack_time: FloatParam,

    /// Time it takes to walk the full release curve, in milliseconds.
    #[id = "release_time"]
    pub release_time: FloatParam,
}

impl Default for SondyComp {
    fn default() -> Self {
        let (curve_publisher, curve_updates) = shared::curve_channel(CurveSet::default());
        let (telemetry, telemetry_reader) = shared::telemetry_channel();

        Self {
            params: Arc::new(SondyCompParams::default()),
            compressor: Compressor::default(),

            curve_updates,
            curve_publisher: Arc::new(Mutex::new(curve_publisher)),

            telemetry,
            telemetry_reader: Arc::new(Mutex::new(telemetry_reader)),
        }
    }
}

impl Default for SondyCompParams {
    fn default() -> Self {
        Self {
            input_gain: gain_param("Input Gain"),
            output_gain: gain_param("Output Gain"),
            threshold: FloatParam::new(
                "Threshold",
                -12.0,
                FloatRange::Linear {
                    min: -60.0,
                    max: 0.0,
                },
            )
            .with_step_size(0.1)
            .with_unit(" dB"),
            knee: FloatParam::new("Knee", 6.0, FloatRange::Linear { min: 0.0, max: 24.0 })
                .with_step_size(0.1)
                .with_unit(" dB"),
            attack_time: time_param("Attack Time", 100.0, 10.0, 1000.0),
            release_time: time_param("Release Time", 300.0, 10.0, 3000.0),
        }
    }
}

fn gain_param(name: &'static str) -> FloatParam {
    FloatParam::new(
        name,
        0.0,
        FloatRange::Linear {
            min: -24.0,
            max: 24.0,
        },
    )
    .with_step_size(0.1)
    .with_unit(" dB")
}

fn time_param(name: &'static str, default_ms: f32, min_ms: f32, max_ms: f32) -> FloatParam {
    FloatParam::new(
        name,
        default_ms,
        FloatRange::Skewed {
            min: min_ms,
            max: max_ms,
            factor: FloatRange::skew_factor(-1.0),
        },
    )
    .with_unit(" ms")
    .with_value_to_string(formatters::v2s_f32_rounded(1))
}

impl SondyCompParams {
    /// Reads the current parameter values into a snapshot for the compressor.
    fn settings(&self) -> CompressorSettings {
        CompressorSettings {
            threshold_db: self.threshold.value(),
            knee_db: self.knee.value(),
            input_gain_db: self.input_gain.value(),
            output_gain_db: self.output_gain.value(),
            attack_time: self.attack_time.value() / 1000.0,
            release_time: self.release_time.value() / 1000.0,
        }
    }
}

impl SondyComp {
    /// Handle for editing the shaping curves from outside the audio thread.
    pub fn curve_publisher(&self) -> Arc<Mutex<CurvePublisher>> {
        self.curve_publisher.clone()
    }

    /// Handle for reading meter values from outside the audio thread.
    pub fn telemetry(&self) -> Arc<Mutex<TelemetryReader>> {
        self.telemetry_reader.clone()
    }

    fn pull_curves(&mut self) {
        if let Some(curves) = self.curve_updates.poll() {
            self.compressor.set_attack_curve(curves.attack.clone());
            self.compressor.set_release_curve(curves.release.clone());
        }
    }
}

impl Plugin for SondyComp {
    const NAME: &'static str = "Sondy Comp";
    const VENDOR: &'static str = "Daishi Suzuki";
    const URL: &'static str = env!("CARGO_PKG_HOMEPAGE");
    const EMAIL: &'static str = "zukky.rikugame@gmail.com";

    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Stereo is the default, mono hosts get the same compressor with a single detector input.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),

            aux_input_ports: &[],
            aux_output_ports: &[],

            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),

            aux_input_ports: &[],
            aux_output_ports: &[],

            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const MIDI_OUTPUT: MidiConfig = MidiConfig::None;

    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        nih_log!(
            "Initializing at {} Hz with {} channel(s)",
            buffer_config.sample_rate,
            audio_io_layout
                .main_input_channels
                .map(NonZeroU32::get)
                .unwrap_or(0)
        );
        self.compressor.prepare(buffer_config.sample_rate);
        true
    }

    fn reset(&mut self) {
        // Called from the audio thread, so this only clears state and never allocates.
        self.compressor.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        if buffer.samples() == 0 {
            return ProcessStatus::Normal;
        }

        // Parameter and curve changes both take effect from the first sample of this block.
        self.compressor.apply_settings(self.params.settings());
        self.pull_curves();

        self.compressor.process_block(buffer.as_slice());
        self.telemetry.publish(&self.compressor);

        ProcessStatus::Normal
    }
}

impl ClapPlugin for SondyComp {
    const CLAP_ID: &'static str = "com.zukky.sondy-comp";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Compressor with drawable attack and release curves");
    const CLAP_MANUAL_URL: Option<&'static str> = Some(Self::URL);
    const CLAP_SUPPORT_URL: Option<&'static str> = None;

    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Compressor,
    ];
}

impl Vst3Plugin for SondyComp {
    const VST3_CLASS_ID: [u8; 16] = *b"SondyCompShaped!";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Dynamics];
}

nih_export_clap!(SondyComp);
nih_export_vst3!(SondyComp);

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyContext;

    impl ProcessContext<SondyComp> for DummyContext {
        fn plugin_api(&self) -> PluginApi { PluginApi::Vst3 }
        fn execute_background(&self, _task: ()) {}
        fn execute_gui(&self, _task: ()) {}
        fn transport(&self) -> &Transport { unreachable!("transport unused") }
        fn next_event(&mut self) -> Option<PluginNoteEvent<SondyComp>> { None }
        fn send_event(&mut self, _event: PluginNoteEvent<SondyComp>) {}
        fn set_latency_samples(&self, _samples: u32) {}
        fn set_current_voice_capacity(&self, _capacity: u32) {}
    }

    /// Plugin prepared at 1 kHz so the default 100 ms attack spans 100 samples.
    fn prepared_plugin() -> SondyComp {
        let mut plugin = SondyComp::default();
        plugin.compressor.prepare(1000.0);
        plugin
    }

    fn process(plugin: &mut SondyComp, left: &mut [f32], right: &mut [f32]) {
        let num_samples = left.len();
        let mut buffer = Buffer::default();
        unsafe { buffer.set_slices(num_samples, |out| *out = vec![left, right]) };
        let mut aux = AuxiliaryBuffers { inputs: &mut [], outputs: &mut [] };
        let mut ctx = DummyContext;
        plugin.process(&mut buffer, &mut aux, &mut ctx);
    }

    #[test]
    fn test_process_silence() {
        let mut plugin = prepared_plugin();
        let mut left = vec![0.0_f32; 64];
        let mut right = vec![0.0_f32; 64];
        process(&mut plugin, &mut left, &mut right);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
        assert_eq!(plugin.compressor.gain_reduction_db(), 0.0);
    }

    #[test]
    fn test_default_params_compress_full_scale() {
        let mut plugin = prepared_plugin();
        let mut left = vec![1.0_f32; 512];
        let mut right = vec![1.0_f32; 512];
        process(&mut plugin, &mut left, &mut right);

        // Threshold -12 dB, so 0 dB input asks for 9 dB of reduction
        let settings = plugin.compressor.settings();
        assert_eq!(settings.threshold_db, -12.0);
        assert!((settings.attack_time - 0.1).abs() < 1e-6);
        assert!((plugin.compressor.gain_reduction_db() - 9.0).abs() < 1e-4);

        let expected = util::db_to_gain(-9.0);
        assert!((left[511] - expected).abs() < 1e-4);
        assert_eq!(left, right);
        assert!(left[0] > left[50] && left[50] > left[511]);
    }

    #[test]
    fn test_published_curves_reach_the_compressor() {
        let mut plugin = prepared_plugin();
        let publisher = plugin.curve_publisher();
        publisher
            .lock()
            .unwrap()
            .set_attack(ShapingCurve::from_values([1.0; CURVE_LEN]));

        let mut left = vec![1.0_f32; 1];
        let mut right = vec![1.0_f32; 1];
        process(&mut plugin, &mut left, &mut right);

        assert_eq!(plugin.compressor.attack_curve().values()[0], 1.0);
        assert_eq!(plugin.compressor.gain_reduction_db(), 9.0);
        assert_eq!(
            plugin.compressor.release_curve(),
            &ShapingCurve::release_default()
        );
    }

    #[test]
    fn test_telemetry_follows_processing() {
        let mut plugin = prepared_plugin();
        let telemetry = plugin.telemetry();

        let mut left = vec![1.0_f32; 32];
        let mut right = vec![0.5_f32; 32];
        process(&mut plugin, &mut left, &mut right);

        let mut reader = telemetry.lock().unwrap();
        let latest = reader.latest();
        assert_eq!(latest.gain_reduction_db, plugin.compressor.gain_reduction_db());
        assert!(latest.gain_reduction_db > 0.0);
        assert!(latest.input_level_db.abs() < 1e-4);
        assert_eq!(latest.history_index, 32);
    }

    #[test]
    fn test_reset_clears_envelope() {
        let mut plugin = prepared_plugin();
        let mut left = vec![1.0_f32; 50];
        let mut right = vec![1.0_f32; 50];
        process(&mut plugin, &mut left, &mut right);
        assert!(plugin.compressor.gain_reduction_db() > 0.0);

        plugin.reset();
        assert_eq!(plugin.compressor.gain_reduction_db(), 0.0);
        assert_eq!(plugin.compressor.envelope_stage(), EnvelopeStage::Resting);
    }
}
