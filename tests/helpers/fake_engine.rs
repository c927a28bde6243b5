//! Deterministic stand-in for a real stretch engine.
//!
//! Resamples by sample dropping/repeating: every input sample advances a phase
//! by the time ratio and one output sample is emitted per whole unit of phase.
//! Output count is therefore exactly predictable, which the real engine's is not.

use std::collections::{BTreeMap, VecDeque};

use stretto::core::{AudioBlock, StretchOptions, StretcherConfig};
use stretto::{Availability, StretchEngine};

/// Fixed input request while the stream is open.
pub const FAKE_REQUIRED: usize = 256;

#[derive(Debug)]
pub struct FakeEngine {
    queues: Vec<VecDeque<f32>>,
    phase: f64,
    time_ratio: f64,
    pitch_scale: f64,
    formant_scale: f64,
    options: StretchOptions,
    final_fed: bool,
    /// (samples, final, was packed) for every feed
    pub feeds: Vec<(usize, bool, bool)>,
    pub studied: usize,
    pub resets: usize,
    pub keyframes: BTreeMap<usize, usize>,
}

impl FakeEngine {
    pub fn new(config: &StretcherConfig) -> Self {
        Self {
            queues: vec![VecDeque::new(); config.channels],
            phase: 0.0,
            time_ratio: config.time_ratio,
            pitch_scale: config.pitch_scale,
            formant_scale: 0.0,
            options: config.options,
            final_fed: false,
            feeds: Vec::new(),
            studied: 0,
            resets: 0,
            keyframes: BTreeMap::new(),
        }
    }

    pub fn options(&self) -> StretchOptions {
        self.options
    }

    pub fn fed_samples(&self) -> usize {
        self.feeds.iter().map(|(n, _, _)| n).sum()
    }
}

impl StretchEngine for FakeEngine {
    fn feed(&mut self, block: &AudioBlock, final_block: bool) {
        self.feeds
            .push((block.samples(), final_block, block.is_packed()));
        for s in 0..block.samples() {
            self.phase += self.time_ratio;
            while self.phase >= 1.0 {
                self.phase -= 1.0;
                for (c, queue) in self.queues.iter_mut().enumerate() {
                    queue.push_back(block.get(c, s).unwrap_or_default());
                }
            }
        }
        self.final_fed |= final_block;
    }

    fn pull(&mut self, max_samples: usize) -> AudioBlock {
        let count = max_samples.min(self.samples_available().samples());
        let channels: Vec<Vec<f32>> = self
            .queues
            .iter_mut()
            .map(|q| q.drain(..count).collect())
            .collect();
        AudioBlock::from_channels(&channels).unwrap()
    }

    fn samples_required(&self) -> usize {
        if self.final_fed {
            0
        } else {
            FAKE_REQUIRED
        }
    }

    fn samples_available(&self) -> Availability {
        match (self.queues[0].len(), self.final_fed) {
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
        1
    }

    fn is_final_block_fed(&self) -> bool {
        self.final_fed
    }

    fn reset(&mut self) {
        self.queues.iter_mut().for_each(VecDeque::clear);
        self.phase = 0.0;
        self.final_fed = false;
        self.resets += 1;
    }

    fn set_formant_scale(&mut self, scale: f64) {
        self.formant_scale = scale;
    }

    fn formant_scale(&self) -> f64 {
        self.formant_scale
    }

    fn study(&mut self, block: &AudioBlock, _final_block: bool) {
        self.studied += block.samples();
    }

    fn set_keyframe_map(&mut self, map: &BTreeMap<usize, usize>) {
        self.keyframes = map.clone();
    }

    fn set_options(&mut self, options: StretchOptions) {
        self.options = options;
    }
}
