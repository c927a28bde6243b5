//! # Stretto - streaming time-stretch and pitch-shift
//!
//! ## Architecture
//!
//! Stretto is an umbrella crate that coordinates:
//! - **stretto-core** - Layout adapter (N-d tensors to `(channel, sample)` blocks and back), option flags, errors
//! - **stretto-stretch** - Stretch controller, engine trait, phase-vocoder engine
//!
//! ## Quick Start
//!
//! ```
//! use stretto::prelude::*;
//!
//! // (samples, channels) interleaved input
//! let input = AudioTensor::from_fn(&[4096, 2], |i| (i as f32 * 0.01).sin());
//!
//! let mut stretcher = Stretcher::builder(44100, 2)
//!     .options(StretchOptions::PROCESS_REALTIME)
//!     .time_ratio(1.5)
//!     .build()?;
//!
//! stretcher.process(&to_canonical(input, 0)?, true)?;
//!
//! // Back to (samples, channels)
//! let spec = ShapeSpec::from([Dim::Samples, Dim::Infer]);
//! let output = from_canonical(stretcher.retrieve(usize::MAX), &spec)?;
//! assert_eq!(output.shape()[1], 2);
//! assert!(stretcher.is_done());
//! # Ok::<(), stretto::Error>(())
//! ```

pub use stretto_core as core;
pub use stretto_stretch as stretch;

mod error;
pub use error::{Error, Result};

pub use stretto_core::{
    from_canonical, from_canonical_2d, layout, make_canonical_block, reorder_from_canonical,
    reorder_to_canonical, to_canonical, AudioBlock, AudioTensor, DetectorOption, Dim,
    EngineOption, ErrorKind, FormantOption, LayoutConfig, OptionGroup, ParamValue, PhaseOption,
    PitchOption, Sample, ShapeSpec, StretchOptions, StretchParams, StretcherConfig,
    TransientsOption, WindowOption, CHANNEL_AXIS, DTYPE_NAME, MAX_CHANNELS, MAX_SAMPLE_RATE,
    MIN_SAMPLE_RATE, SAMPLE_AXIS,
};
pub use stretto_core::params;

pub use stretto_stretch::{
    Availability, FftSize, PhaseVocoderEngine, StretchEngine, Stretcher, StretcherBuilder,
};

pub mod prelude {
    pub use crate::{
        from_canonical, make_canonical_block, to_canonical, AudioBlock, AudioTensor,
        Availability, Dim, Error, Result, Sample, ShapeSpec, StretchEngine, StretchOptions,
        Stretcher, CHANNEL_AXIS, SAMPLE_AXIS,
    };
}
