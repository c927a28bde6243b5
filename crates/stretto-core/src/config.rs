//! Layout and stretcher configuration.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, StretchOptions};

/// Element type of every audio buffer handled by stretto.
pub type Sample = f32;

/// Lowest accepted sample rate, in Hz.
pub const MIN_SAMPLE_RATE: u32 = 8000;
/// Highest accepted sample rate, in Hz.
pub const MAX_SAMPLE_RATE: u32 = 384_000;
/// Maximum number of channels a stretcher can be configured with.
pub const MAX_CHANNELS: usize = 8;

/// Process-wide description of the canonical block layout.
///
/// The stretch engine consumes `(channel, sample)` blocks stored channel-major.
/// The layout is fixed at compile time and read through [`layout()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Index of the channel axis in a canonical block.
    pub channel_axis: usize,
    /// Index of the sample axis in a canonical block.
    pub sample_axis: usize,
    /// numpy-style type string of [`Sample`].
    pub dtype_name: &'static str,
}

const CANONICAL_LAYOUT: LayoutConfig = LayoutConfig {
    channel_axis: 0,
    sample_axis: 1,
    dtype_name: "=f4",
};

static LAYOUT: LayoutConfig = CANONICAL_LAYOUT;

/// The canonical layout.
#[inline]
pub fn layout() -> &'static LayoutConfig {
    &LAYOUT
}

pub const CHANNEL_AXIS: usize = CANONICAL_LAYOUT.channel_axis;
pub const SAMPLE_AXIS: usize = CANONICAL_LAYOUT.sample_axis;
pub const DTYPE_NAME: &str = CANONICAL_LAYOUT.dtype_name;

// Packed blocks hand out per-channel slices, which needs channel-major storage.
const _: () = assert!(CHANNEL_AXIS == 0 && SAMPLE_AXIS == 1);
const _: () = assert!(core::mem::size_of::<Sample>() == 4);

/// Construction parameters of a stretcher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StretcherConfig {
    pub sample_rate: u32,
    pub channels: usize,
    #[serde(default)]
    pub options: StretchOptions,
    #[serde(default = "unit_ratio")]
    pub time_ratio: f64,
    #[serde(default = "unit_ratio")]
    pub pitch_scale: f64,
}

fn unit_ratio() -> f64 {
    1.0
}

impl StretcherConfig {
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            sample_rate,
            channels,
            options: StretchOptions::DEFAULT,
            time_ratio: 1.0,
            pitch_scale: 1.0,
        }
    }

    pub fn options(mut self, options: StretchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn time_ratio(mut self, ratio: f64) -> Self {
        self.time_ratio = ratio;
        self
    }

    pub fn pitch_scale(mut self, scale: f64) -> Self {
        self.pitch_scale = scale;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_sample_rate(self.sample_rate)?;
        validate_channels(self.channels)?;
        self.options.validate()?;
        validate_time_ratio(self.time_ratio)?;
        validate_pitch_scale(self.pitch_scale)?;
        Ok(())
    }
}

pub fn validate_sample_rate(sample_rate: u32) -> Result<()> {
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        return Err(Error::out_of_range(
            "sample_rate",
            sample_rate,
            format!("{MIN_SAMPLE_RATE}..={MAX_SAMPLE_RATE} Hz"),
        ));
    }
    Ok(())
}

pub fn validate_channels(channels: usize) -> Result<()> {
    if !(1..=MAX_CHANNELS).contains(&channels) {
        return Err(Error::out_of_range(
            "channels",
            channels,
            format!("1..={MAX_CHANNELS}"),
        ));
    }
    Ok(())
}

pub fn validate_time_ratio(ratio: f64) -> Result<()> {
    validate_positive("time_ratio", ratio)
}

pub fn validate_pitch_scale(scale: f64) -> Result<()> {
    validate_positive("pitch_scale", scale)
}

/// Formant scale accepts 0.0, which asks the engine to derive it from the
/// pitch scale.
pub fn validate_formant_scale(scale: f64) -> Result<()> {
    if !scale.is_finite() || scale < 0.0 {
        return Err(Error::out_of_range(
            "formant_scale",
            scale,
            "finite value >= 0.0",
        ));
    }
    Ok(())
}

fn validate_positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::out_of_range(name, value, "finite value > 0.0"));
    }
    Ok(())
}
