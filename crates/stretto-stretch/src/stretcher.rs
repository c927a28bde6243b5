//! Streaming time-stretch controller.
//!
//! [`Stretcher`] validates everything a caller hands it, copies strided blocks
//! into packed storage, and forwards to a [`StretchEngine`]. The engine owns the
//! streaming state; the controller only remembers whether the final block went
//! in and whether processing has started.

use std::collections::BTreeMap;

use stretto_core::config::{
    validate_formant_scale, validate_pitch_scale, validate_time_ratio,
};
use stretto_core::params::{get_param, get_param_or, reject_unknown};
use stretto_core::{
    from_canonical, to_canonical, AudioBlock, AudioTensor, DetectorOption, Error, FormantOption,
    OptionGroup, ParamValue, PhaseOption, PitchOption, Result, ShapeSpec, StretchOptions,
    StretchParams, StretcherConfig, TransientsOption,
};
use tracing::{debug, trace};

use crate::builder::StretcherBuilder;
use crate::engine::{Availability, StretchEngine};
use crate::vocoder::PhaseVocoderEngine;

/// Parameter names accepted by [`Stretcher::from_params`].
const CONSTRUCTION_PARAMS: &[&str] = &[
    "sample_rate",
    "channels",
    "options",
    "time_ratio",
    "pitch_scale",
];

/// Push/pull time-stretch and pitch-shift controller.
///
/// # Example
///
/// ```
/// use stretto_stretch::{Stretcher, StretchOptions};
/// use stretto_core::AudioBlock;
///
/// let mut stretcher = Stretcher::new(16000, 2, StretchOptions::PROCESS_REALTIME)?;
/// stretcher.set_time_ratio(1.5)?;
///
/// let block = AudioBlock::zeros(2, stretcher.samples_required());
/// stretcher.process(&block, false)?;
///
/// let out = stretcher.retrieve(stretcher.available());
/// assert_eq!(out.channels(), 2);
/// # Ok::<(), stretto_core::Error>(())
/// ```
#[derive(Debug)]
pub struct Stretcher<E: StretchEngine = PhaseVocoderEngine> {
    engine: E,
    config: StretcherConfig,
    max_process_size: Option<usize>,
    started: bool,
    final_fed: bool,
}

impl Stretcher {
    pub fn new(sample_rate: u32, channels: usize, options: StretchOptions) -> Result<Self> {
        Self::from_config(StretcherConfig::new(sample_rate, channels).options(options))
    }

    pub fn builder(sample_rate: u32, channels: usize) -> StretcherBuilder {
        StretcherBuilder::new(sample_rate, channels)
    }

    pub fn from_config(config: StretcherConfig) -> Result<Self> {
        Self::with_engine(config, PhaseVocoderEngine::new)
    }

    /// Build from dynamically-typed parameters.
    ///
    /// `sample_rate` and `channels` are required unsigned integers; `options`
    /// must be a [`StretchOptions`] value; `time_ratio` and `pitch_scale` are
    /// numbers. Wrong kinds are type errors, bad values are range errors.
    pub fn from_params(params: &StretchParams) -> Result<Self> {
        Self::from_config(config_from_params(params)?)
    }
}

impl<E: StretchEngine> Stretcher<E> {
    /// Validate `config`, then build the engine with `factory`.
    ///
    /// The factory is not called when validation fails.
    pub fn with_engine(
        config: StretcherConfig,
        factory: impl FnOnce(&StretcherConfig) -> E,
    ) -> Result<Self> {
        config.validate()?;
        let engine = factory(&config);
        debug!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            options = %config.options,
            engine_version = engine.engine_version(),
            "stretcher created"
        );
        Ok(Self {
            engine,
            config,
            max_process_size: None,
            started: false,
            final_fed: false,
        })
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.config.channels
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Current options, including runtime group changes.
    #[inline]
    pub fn options(&self) -> StretchOptions {
        self.config.options
    }

    pub fn config(&self) -> &StretcherConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_version(&self) -> u32 {
        self.engine.engine_version()
    }

    pub fn time_ratio(&self) -> f64 {
        self.engine.time_ratio()
    }

    /// Output duration / input duration for audio fed from now on.
    pub fn set_time_ratio(&mut self, ratio: f64) -> Result<()> {
        validate_time_ratio(ratio)?;
        debug!(ratio, "time ratio changed");
        self.engine.set_time_ratio(ratio);
        self.config.time_ratio = ratio;
        Ok(())
    }

    pub fn pitch_scale(&self) -> f64 {
        self.engine.pitch_scale()
    }

    pub fn set_pitch_scale(&mut self, scale: f64) -> Result<()> {
        validate_pitch_scale(scale)?;
        debug!(scale, "pitch scale changed");
        self.engine.set_pitch_scale(scale);
        self.config.pitch_scale = scale;
        Ok(())
    }

    pub fn formant_scale(&self) -> f64 {
        self.engine.formant_scale()
    }

    /// 0.0 lets the engine follow the pitch scale.
    pub fn set_formant_scale(&mut self, scale: f64) -> Result<()> {
        validate_formant_scale(scale)?;
        debug!(scale, "formant scale changed");
        self.engine.set_formant_scale(scale);
        Ok(())
    }

    /// Set a runtime parameter by name.
    pub fn set_param(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<()> {
        let value = value.into();
        match name {
            "time_ratio" => self.set_time_ratio(value.to_f64(name)?),
            "pitch_scale" => self.set_pitch_scale(value.to_f64(name)?),
            "formant_scale" => self.set_formant_scale(value.to_f64(name)?),
            "expected_input_duration" => {
                let samples = to_usize(&value, name)?;
                self.set_expected_input_duration(samples);
                Ok(())
            }
            "max_process_size" => self.set_max_process_size(to_usize(&value, name)?),
            _ => Err(Error::UnknownParameter(name.to_string())),
        }
    }

    pub fn set_transients_option(&mut self, option: TransientsOption) -> Result<()> {
        self.set_option_group(option, "transients", true)
    }

    pub fn set_detector_option(&mut self, option: DetectorOption) -> Result<()> {
        self.set_option_group(option, "detector", true)
    }

    pub fn set_pitch_option(&mut self, option: PitchOption) -> Result<()> {
        self.set_option_group(option, "pitch", true)
    }

    pub fn set_phase_option(&mut self, option: PhaseOption) -> Result<()> {
        self.set_option_group(option, "phase", false)
    }

    pub fn set_formant_option(&mut self, option: FormantOption) -> Result<()> {
        self.set_option_group(option, "formant", false)
    }

    fn set_option_group<G: OptionGroup + core::fmt::Debug>(
        &mut self,
        member: G,
        group: &str,
        realtime_only: bool,
    ) -> Result<()> {
        if realtime_only && !self.config.options.is_realtime() {
            return Err(Error::InvalidState(format!(
                "{group} option can only be changed in real-time mode"
            )));
        }
        let options = self.config.options.with_group(member);
        debug!(?member, %options, "option group changed");
        self.engine.set_options(options);
        self.config.options = options;
        Ok(())
    }

    /// Input samples the engine wants before it can produce more output.
    ///
    /// Advisory only: any block size is accepted.
    pub fn samples_required(&self) -> usize {
        self.engine.samples_required()
    }

    /// Samples per channel ready to retrieve. 0 both before output is ready
    /// and after the stream has been drained; see [`availability`](Self::availability).
    pub fn available(&self) -> usize {
        self.engine.samples_available().samples()
    }

    pub fn availability(&self) -> Availability {
        self.engine.samples_available()
    }

    /// Whether the final block was fed and all output retrieved.
    pub fn is_done(&self) -> bool {
        self.final_fed && self.engine.samples_available().is_finished()
    }

    /// Feed one block. `final_block` ends the stream and flushes the engine.
    ///
    /// Strided blocks (e.g. transposed views) are copied into packed storage
    /// first. Nothing is fed when validation fails.
    pub fn process(&mut self, block: &AudioBlock, final_block: bool) -> Result<()> {
        if self.final_fed {
            return Err(Error::FinalBlockAlreadyFed);
        }
        self.check_block(block)?;
        trace!(samples = block.samples(), final_block, "process");

        if block.is_packed() {
            self.engine.feed(block, final_block);
        } else {
            debug!(shape = ?block.shape(), "copying strided block into packed storage");
            let packed = AudioBlock::from_tensor(block.as_tensor().to_contiguous())?;
            self.engine.feed(&packed, final_block);
        }

        self.started = true;
        if final_block {
            self.final_fed = true;
            debug!("final block fed");
        }
        Ok(())
    }

    /// Fold an N-d tensor with samples along `sample_axis` and feed it.
    pub fn process_tensor(
        &mut self,
        tensor: AudioTensor,
        sample_axis: usize,
        final_block: bool,
    ) -> Result<()> {
        let block = to_canonical(tensor, sample_axis)?;
        self.process(&block, final_block)
    }

    /// Pull up to `max_samples` per channel.
    ///
    /// Returns a packed `channels × n` block with `n = min(max_samples,
    /// available())`; `n` is 0 when nothing is ready.
    pub fn retrieve(&mut self, max_samples: usize) -> AudioBlock {
        let count = max_samples.min(self.available());
        trace!(requested = max_samples, count, "retrieve");
        if count == 0 {
            return AudioBlock::empty(self.channels());
        }
        self.engine.pull(count)
    }

    /// [`retrieve`](Self::retrieve), unfolded into the layout described by `shape`.
    pub fn retrieve_as(&mut self, max_samples: usize, shape: &ShapeSpec) -> Result<AudioTensor> {
        from_canonical(self.retrieve(max_samples), shape)
    }

    /// Offline pre-analysis. Only before the first [`process`](Self::process)
    /// call, and only in offline mode.
    pub fn study(&mut self, block: &AudioBlock, final_block: bool) -> Result<()> {
        self.check_offline_setup("study")?;
        self.check_block(block)?;
        trace!(samples = block.samples(), final_block, "study");
        if block.is_packed() {
            self.engine.study(block, final_block);
        } else {
            let packed = AudioBlock::from_tensor(block.as_tensor().to_contiguous())?;
            self.engine.study(&packed, final_block);
        }
        Ok(())
    }

    /// Offline time map: input sample position → output sample position.
    ///
    /// Input between two keyframes is stretched to span the distance between
    /// their targets; past the last keyframe the time ratio applies. Only in
    /// offline mode, before the first [`process`](Self::process) call.
    /// Targets must increase with their sources.
    pub fn set_keyframe_map(&mut self, map: &BTreeMap<usize, usize>) -> Result<()> {
        self.check_offline_setup("set_keyframe_map")?;
        let mut previous: Option<(usize, usize)> = None;
        for (&source, &target) in map {
            if let Some((s0, t0)) = previous {
                if target <= t0 {
                    return Err(Error::out_of_range(
                        "keyframe_map",
                        format!("{source} -> {target}"),
                        format!("target > {t0} (keyframe {s0} -> {t0})"),
                    ));
                }
            }
            previous = Some((source, target));
        }
        debug!(keyframes = map.len(), "keyframe map set");
        self.engine.set_keyframe_map(map);
        Ok(())
    }

    /// Input samples consumed per analysis step.
    pub fn input_increment(&self) -> usize {
        self.engine.input_increment()
    }

    /// Output samples produced by each analysis step of the latest
    /// [`process`](Self::process) call.
    pub fn output_increments(&self) -> Vec<usize> {
        self.engine.output_increments()
    }

    /// Total input length hint for offline mode.
    pub fn set_expected_input_duration(&mut self, samples: usize) {
        debug!(samples, "expected input duration");
        self.engine.set_expected_input_duration(samples);
    }

    /// Largest block [`process`](Self::process) will accept from now on.
    pub fn set_max_process_size(&mut self, samples: usize) -> Result<()> {
        if samples == 0 {
            return Err(Error::out_of_range("max_process_size", samples, "> 0"));
        }
        debug!(samples, "max process size");
        self.engine.set_max_process_size(samples);
        self.max_process_size = Some(samples);
        Ok(())
    }

    pub fn max_process_size(&self) -> Option<usize> {
        self.max_process_size
    }

    /// Output samples to drop when the input was padded with
    /// [`preferred_start_pad`](Self::preferred_start_pad) silent samples.
    pub fn start_delay(&self) -> usize {
        self.engine.start_delay()
    }

    pub fn preferred_start_pad(&self) -> usize {
        self.engine.preferred_start_pad()
    }

    /// Drop all buffered audio and accept a new stream. Parameters keep their
    /// current values.
    pub fn reset(&mut self) {
        debug!("reset");
        self.engine.reset();
        self.started = false;
        self.final_fed = false;
    }

    fn check_offline_setup(&self, operation: &str) -> Result<()> {
        if self.config.options.is_realtime() {
            return Err(Error::InvalidState(format!(
                "{operation} is only available in offline mode"
            )));
        }
        if self.started {
            return Err(Error::InvalidState(format!(
                "{operation} must happen before processing starts"
            )));
        }
        Ok(())
    }

    fn check_block(&self, block: &AudioBlock) -> Result<()> {
        if block.channels() != self.channels() {
            return Err(Error::ChannelMismatch {
                expected: self.channels(),
                found: block.channels(),
            });
        }
        if let Some(max) = self.max_process_size {
            if block.samples() > max {
                return Err(Error::BlockTooLarge {
                    samples: block.samples(),
                    max,
                });
            }
        }
        Ok(())
    }
}

/// Sizes past `usize::MAX` saturate; they are hints, not allocations.
fn to_usize(value: &ParamValue, name: &str) -> Result<usize> {
    let n = value.to_unsigned(name)?;
    Ok(usize::try_from(n).unwrap_or(usize::MAX))
}

/// Typed configuration from a dynamic parameter map. Out-of-range values are
/// caught later by [`StretcherConfig::validate`].
pub fn config_from_params(params: &StretchParams) -> Result<StretcherConfig> {
    reject_unknown(params, CONSTRUCTION_PARAMS)?;

    let sample_rate = get_param(params, "sample_rate", ParamValue::to_unsigned)?;
    let channels = get_param(params, "channels", ParamValue::to_unsigned)?;
    let options = get_param_or(
        params,
        "options",
        StretchOptions::DEFAULT,
        ParamValue::to_options,
    )?;
    let time_ratio = get_param_or(params, "time_ratio", 1.0, ParamValue::to_f64)?;
    let pitch_scale = get_param_or(params, "pitch_scale", 1.0, ParamValue::to_f64)?;

    // Values too large for the field are still range errors.
    let sample_rate = u32::try_from(sample_rate).unwrap_or(u32::MAX);
    let channels = usize::try_from(channels).unwrap_or(usize::MAX);

    Ok(StretcherConfig::new(sample_rate, channels)
        .options(options)
        .time_ratio(time_ratio)
        .pitch_scale(pitch_scale))
}
