//! Phase-vocoder engine.
//!
//! One [`PhaseVocoderProcessor`] per channel, all driven with the same
//! synthesis hop so channels stay sample-aligned.
//!
//! Time ratio and pitch scale are captured when audio is fed. Input fed under
//! a keyframe map is split at keyframe boundaries, each run stretched by the
//! ratio of its keyframe segment.

mod processor;

use std::collections::BTreeMap;
use std::fmt;

use rustfft::FftPlanner;
use stretto_core::{AudioBlock, EngineOption, StretchOptions, StretcherConfig, WindowOption};
use tracing::{debug, trace};

use crate::engine::{Availability, StretchEngine};
use processor::{FrameParams, PhaseVocoderProcessor};

/// FFT size presets, selected by the window option.
///
/// - **Small (1024)**: `WINDOW_SHORT`, lowest latency, best for percussive material
/// - **Medium (2048)**: default
/// - **Large (4096)**: `WINDOW_LONG`, best frequency resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FftSize {
    Small = 1024,
    #[default]
    Medium = 2048,
    Large = 4096,
}

impl FftSize {
    pub fn size(&self) -> usize {
        *self as usize
    }

    /// FFT size / 4 (75% overlap)
    pub fn hop_size(&self) -> usize {
        self.size() / 4
    }

    pub fn latency_seconds(&self, sample_rate: f64) -> f64 {
        self.size() as f64 / sample_rate
    }
}

impl From<WindowOption> for FftSize {
    fn from(window: WindowOption) -> Self {
        match window {
            WindowOption::Short => Self::Small,
            WindowOption::Standard => Self::Medium,
            WindowOption::Long => Self::Large,
        }
    }
}

/// Built-in [`StretchEngine`].
pub struct PhaseVocoderEngine {
    processors: Vec<PhaseVocoderProcessor>,
    fft_size: FftSize,
    sample_rate: u32,
    options: StretchOptions,
    time_ratio: f64,
    pitch_scale: f64,
    formant_scale: f64,
    expected_input_duration: Option<usize>,
    keyframes: BTreeMap<usize, usize>,
    studied: usize,
    /// Input samples fed since the last reset.
    input_position: usize,
    final_fed: bool,
}

impl PhaseVocoderEngine {
    /// Build from an already validated configuration.
    pub fn new(config: &StretcherConfig) -> Self {
        let fft_size = FftSize::from(config.options.group::<WindowOption>());
        let mut planner = FftPlanner::new();
        let processors = (0..config.channels)
            .map(|_| PhaseVocoderProcessor::new(fft_size, &mut planner))
            .collect();

        debug!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            fft_size = fft_size.size(),
            options = %config.options,
            "phase vocoder engine created"
        );

        Self {
            processors,
            fft_size,
            sample_rate: config.sample_rate,
            options: config.options,
            time_ratio: config.time_ratio,
            pitch_scale: config.pitch_scale,
            formant_scale: 0.0,
            expected_input_duration: None,
            keyframes: BTreeMap::new(),
            studied: 0,
            input_position: 0,
            final_fed: false,
        }
    }

    pub fn fft_size(&self) -> FftSize {
        self.fft_size
    }

    pub fn latency_seconds(&self) -> f64 {
        self.fft_size.latency_seconds(self.sample_rate as f64)
    }

    pub fn expected_input_duration(&self) -> Option<usize> {
        self.expected_input_duration
    }

    pub fn options(&self) -> StretchOptions {
        self.options
    }

    /// Explicit hint, else the amount of studied input.
    fn input_duration(&self) -> Option<usize> {
        self.expected_input_duration
            .or((self.studied > 0).then_some(self.studied))
    }

    /// Ratio in force at input `position`, and where that ratio ends.
    fn segment_at(&self, position: usize) -> (f64, usize) {
        if self.keyframes.is_empty() {
            return (self.time_ratio, usize::MAX);
        }
        let (s0, t0) = self
            .keyframes
            .range(..=position)
            .next_back()
            .map_or((0, 0), |(s, t)| (*s, *t));
        if let Some((&s1, &t1)) = self.keyframes.range(position.saturating_add(1)..).next() {
            return ((t1 - t0) as f64 / (s1 - s0) as f64, s1);
        }

        // Past the last keyframe: land on duration × ratio when the duration is known.
        let ratio = match self.input_duration() {
            Some(total) if total > s0 => {
                let target = total as f64 * self.time_ratio;
                if target > t0 as f64 {
                    (target - t0 as f64) / (total - s0) as f64
                } else {
                    self.time_ratio
                }
            }
            _ => self.time_ratio,
        };
        (ratio, usize::MAX)
    }

    fn frame_params(&self, ratio: f64) -> FrameParams {
        let hop = (self.fft_size.hop_size() as f64 * ratio).round() as usize;
        FrameParams {
            synthesis_hop: hop.max(1),
            pitch_scale: self.pitch_scale as f32,
        }
    }
}

impl StretchEngine for PhaseVocoderEngine {
    fn feed(&mut self, block: &AudioBlock, final_block: bool) {
        let len = block.samples();
        trace!(samples = len, final_block, position = self.input_position, "feed");

        let mut offset = 0;
        while offset < len {
            let position = self.input_position + offset;
            let (ratio, end) = self.segment_at(position);
            let run = (end - position).min(len - offset);
            let params = self.frame_params(ratio);
            for (channel, processor) in self.processors.iter_mut().enumerate() {
                if let Some(samples) = block.channel(channel) {
                    processor.push_input(&samples[offset..offset + run], params);
                }
            }
            offset += run;
        }
        self.input_position = self.input_position.saturating_add(len);

        for processor in &mut self.processors {
            if final_block {
                processor.flush();
            } else {
                processor.process();
            }
        }

        if final_block {
            self.final_fed = true;
            debug!(available = self.samples_available().samples(), "final block flushed");
        }
    }

    fn pull(&mut self, max_samples: usize) -> AudioBlock {
        let count = max_samples.min(self.samples_available().samples());
        let mut block = AudioBlock::zeros(self.processors.len(), count);
        for (channel, processor) in self.processors.iter_mut().enumerate() {
            if let Some(out) = block.channel_mut(channel) {
                processor.pop_output(out);
            }
        }
        block
    }

    fn samples_required(&self) -> usize {
        if self.final_fed {
            return 0;
        }
        let buffered = self
            .processors
            .first()
            .map_or(0, PhaseVocoderProcessor::input_buffered);
        self.fft_size.size().saturating_sub(buffered)
    }

    fn samples_available(&self) -> Availability {
        let ready = self
            .processors
            .iter()
            .map(PhaseVocoderProcessor::output_available)
            .min()
            .unwrap_or(0);
        match (ready, self.final_fed) {
            (0, true) => Availability::Finished,
            (0, false) => Availability::NotReady,
            (n, _) => Availability::Ready(n),
        }
    }

    fn set_time_ratio(&mut self, ratio: f64) {
        self.time_ratio = ratio;
    }

    fn time_ratio(&self) -> f64 {
        self.time_ratio
    }

    fn set_pitch_scale(&mut self, scale: f64) {
        self.pitch_scale = scale;
    }

    fn pitch_scale(&self) -> f64 {
        self.pitch_scale
    }

    fn engine_version(&self) -> u32 {
        match self.options.group::<EngineOption>() {
            EngineOption::Finer => 3,
            EngineOption::Faster => 2,
        }
    }

    fn is_final_block_fed(&self) -> bool {
        self.final_fed
    }

    fn reset(&mut self) {
        for processor in &mut self.processors {
            processor.reset();
        }
        self.studied = 0;
        self.input_position = 0;
        self.final_fed = false;
    }

    /// Stored only; this engine does not model formants.
    fn set_formant_scale(&mut self, scale: f64) {
        self.formant_scale = scale;
    }

    fn formant_scale(&self) -> f64 {
        self.formant_scale
    }

    /// Only the length is used, as a fallback input duration.
    fn study(&mut self, block: &AudioBlock, _final_block: bool) {
        self.studied = self.studied.saturating_add(block.samples());
    }

    fn set_expected_input_duration(&mut self, samples: usize) {
        self.expected_input_duration = Some(samples);
    }

    fn set_keyframe_map(&mut self, map: &BTreeMap<usize, usize>) {
        self.keyframes = map.clone();
    }

    fn input_increment(&self) -> usize {
        self.fft_size.hop_size()
    }

    fn output_increments(&self) -> Vec<usize> {
        self.processors
            .first()
            .map_or_else(Vec::new, |p| p.recent_hops().to_vec())
    }

    fn set_max_process_size(&mut self, samples: usize) {
        for processor in &mut self.processors {
            processor.reserve_input(samples);
        }
    }

    fn set_options(&mut self, options: StretchOptions) {
        self.options = options;
    }

    fn start_delay(&self) -> usize {
        (self.preferred_start_pad() as f64 * self.time_ratio).round() as usize
    }

    fn preferred_start_pad(&self) -> usize {
        self.fft_size.size() - self.fft_size.hop_size()
    }
}

impl fmt::Debug for PhaseVocoderEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseVocoderEngine")
            .field("channels", &self.processors.len())
            .field("fft_size", &self.fft_size)
            .field("time_ratio", &self.time_ratio)
            .field("pitch_scale", &self.pitch_scale)
            .field("final_fed", &self.final_fed)
            .finish_non_exhaustive()
    }
}
