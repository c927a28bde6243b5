//! Layout adapter and shared types for streaming time-stretch.
//!
//! # Primary API
//!
//! - [`to_canonical`] / [`from_canonical`]: fold N-d tensors into `(channel, sample)` blocks and back
//! - [`AudioTensor`] / [`AudioBlock`]: strided sample storage
//! - [`ShapeSpec`]: target layout with a sample-axis marker and one optional wildcard
//! - [`StretchOptions`]: engine option flags and presets
//! - [`StretcherConfig`]: validated construction parameters
//!
//! # Example
//!
//! ```
//! use stretto_core::prelude::*;
//!
//! // (batch, samples, channels)
//! let tensor = AudioTensor::zeros(&[3, 64, 2]);
//! let block = to_canonical(tensor, 1)?;
//! assert_eq!(block.shape(), [6, 64]);
//!
//! let spec = ShapeSpec::from([Dim::Size(3), Dim::Samples, Dim::Infer]);
//! let restored = from_canonical(block, &spec)?;
//! assert_eq!(restored.shape(), &[3, 64, 2]);
//! # Ok::<(), stretto_core::Error>(())
//! ```

pub mod error;
pub use error::{Error, ErrorKind, Result};

pub mod config;
pub use config::{
    layout, validate_channels, validate_formant_scale, validate_pitch_scale,
    validate_sample_rate, validate_time_ratio, LayoutConfig, Sample, StretcherConfig,
    CHANNEL_AXIS, DTYPE_NAME, MAX_CHANNELS, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE, SAMPLE_AXIS,
};

pub mod options;
pub use options::{
    DetectorOption, EngineOption, FormantOption, OptionGroup, PhaseOption, PitchOption,
    StretchOptions, TransientsOption, WindowOption,
};

pub mod params;
pub use params::{get_param, get_param_or, reject_unknown, ParamValue, StretchParams};

pub mod tensor;
pub use tensor::{contiguous_strides, element_count, AudioTensor, Shape, Strides};

pub mod block;
pub use block::{make_canonical_block, AudioBlock};

pub mod shape;
pub use shape::{Dim, ShapeSpec};

pub mod layout;
pub use layout::{
    from_canonical, from_canonical_2d, reorder_from_canonical, reorder_to_canonical, to_canonical,
};

pub mod prelude {
    pub use crate::{
        from_canonical, from_canonical_2d, make_canonical_block, to_canonical, AudioBlock,
        AudioTensor, Dim, Error, Result, Sample, ShapeSpec, StretchOptions, StretcherConfig,
        CHANNEL_AXIS, SAMPLE_AXIS,
    };
}
