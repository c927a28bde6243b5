//! Boundary between the controller and a time-stretch engine.

use std::collections::BTreeMap;

use stretto_core::{AudioBlock, StretchOptions};

/// Output-queue state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Availability {
    /// Nothing buffered yet; more input is needed.
    NotReady,
    /// This many samples per channel can be pulled.
    Ready(usize),
    /// The final block was fed and every sample has been pulled.
    Finished,
}

impl Availability {
    /// Ready sample count, 0 for the other two states.
    #[inline]
    pub fn samples(self) -> usize {
        match self {
            Self::Ready(n) => n,
            Self::NotReady | Self::Finished => 0,
        }
    }

    #[inline]
    pub fn is_finished(self) -> bool {
        self == Self::Finished
    }
}

/// A streaming push/pull time-stretch and pitch-shift engine.
///
/// The controller validates every value before it reaches the engine and only
/// feeds packed blocks whose channel count matches the engine's. Engines never
/// fail.
pub trait StretchEngine {
    /// Push input. `final_block` marks the end of the stream and flushes the tail.
    fn feed(&mut self, block: &AudioBlock, final_block: bool);

    /// Pop up to `max_samples` per channel as a packed block.
    fn pull(&mut self, max_samples: usize) -> AudioBlock;

    /// Input samples wanted before more output can appear. Advisory.
    fn samples_required(&self) -> usize;

    fn samples_available(&self) -> Availability;

    fn set_time_ratio(&mut self, ratio: f64);

    fn time_ratio(&self) -> f64;

    fn set_pitch_scale(&mut self, scale: f64);

    fn pitch_scale(&self) -> f64;

    fn engine_version(&self) -> u32;

    fn is_final_block_fed(&self) -> bool;

    /// Drop all buffered audio and streaming state. Parameters are kept.
    fn reset(&mut self);

    /// 0 means automatic.
    fn set_formant_scale(&mut self, _scale: f64) {}

    fn formant_scale(&self) -> f64 {
        0.0
    }

    /// Offline pre-analysis pass.
    fn study(&mut self, _block: &AudioBlock, _final_block: bool) {}

    fn set_expected_input_duration(&mut self, _samples: usize) {}

    fn set_max_process_size(&mut self, _samples: usize) {}

    /// Offline map from input sample positions to output sample positions.
    /// Sources and targets both increase.
    fn set_keyframe_map(&mut self, _map: &BTreeMap<usize, usize>) {}

    /// Input samples consumed per analysis step. 0 when not meaningful.
    fn input_increment(&self) -> usize {
        0
    }

    /// Output samples produced by each analysis step of the latest feed.
    fn output_increments(&self) -> Vec<usize> {
        Vec::new()
    }

    /// Runtime change of the adjustable option groups.
    fn set_options(&mut self, _options: StretchOptions) {}

    /// Output samples to discard after a padded start.
    fn start_delay(&self) -> usize {
        0
    }

    /// Silent samples to feed before the real input.
    fn preferred_start_pad(&self) -> usize {
        0
    }
}

impl<E: StretchEngine + ?Sized> StretchEngine for Box<E> {
    fn feed(&mut self, block: &AudioBlock, final_block: bool) {
        (**self).feed(block, final_block)
    }

    fn pull(&mut self, max_samples: usize) -> AudioBlock {
        (**self).pull(max_samples)
    }

    fn samples_required(&self) -> usize {
        (**self).samples_required()
    }

    fn samples_available(&self) -> Availability {
        (**self).samples_available()
    }

    fn set_time_ratio(&mut self, ratio: f64) {
        (**self).set_time_ratio(ratio)
    }

    fn time_ratio(&self) -> f64 {
        (**self).time_ratio()
    }

    fn set_pitch_scale(&mut self, scale: f64) {
        (**self).set_pitch_scale(scale)
    }

    fn pitch_scale(&self) -> f64 {
        (**self).pitch_scale()
    }

    fn engine_version(&self) -> u32 {
        (**self).engine_version()
    }

    fn is_final_block_fed(&self) -> bool {
        (**self).is_final_block_fed()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn set_formant_scale(&mut self, scale: f64) {
        (**self).set_formant_scale(scale)
    }

    fn formant_scale(&self) -> f64 {
        (**self).formant_scale()
    }

    fn study(&mut self, block: &AudioBlock, final_block: bool) {
        (**self).study(block, final_block)
    }

    fn set_expected_input_duration(&mut self, samples: usize) {
        (**self).set_expected_input_duration(samples)
    }

    fn set_max_process_size(&mut self, samples: usize) {
        (**self).set_max_process_size(samples)
    }

    fn set_keyframe_map(&mut self, map: &BTreeMap<usize, usize>) {
        (**self).set_keyframe_map(map)
    }

    fn input_increment(&self) -> usize {
        (**self).input_increment()
    }

    fn output_increments(&self) -> Vec<usize> {
        (**self).output_increments()
    }

    fn set_options(&mut self, options: StretchOptions) {
        (**self).set_options(options)
    }

    fn start_delay(&self) -> usize {
        (**self).start_delay()
    }

    fn preferred_start_pad(&self) -> usize {
        (**self).preferred_start_pad()
    }
}
