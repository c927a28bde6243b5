//! Streaming time-stretch and pitch-shift controller.
//!
//! - [`Stretcher`] / [`StretcherBuilder`]: validated push/pull front-end
//! - [`StretchEngine`]: engine boundary, with [`Availability`] for the output queue
//! - [`PhaseVocoderEngine`]: built-in engine
//!
//! # Example
//!
//! ```
//! use stretto_stretch::{Stretcher, StretchOptions};
//! use stretto_core::AudioBlock;
//!
//! let mut stretcher = Stretcher::new(44100, 1, StretchOptions::PROCESS_REALTIME)?;
//! stretcher.set_time_ratio(2.0)?;
//!
//! let mut produced = 0;
//! for i in 0..8 {
//!     let block = AudioBlock::filled(1, 2048, 0.1);
//!     stretcher.process(&block, i == 7)?;
//!     produced += stretcher.retrieve(usize::MAX).samples();
//! }
//! assert!(stretcher.is_done());
//! assert!(produced > 8 * 2048);
//! # Ok::<(), stretto_core::Error>(())
//! ```

pub mod builder;
pub mod engine;
pub mod stretcher;
pub mod vocoder;

pub use builder::StretcherBuilder;
pub use engine::{Availability, StretchEngine};
pub use stretcher::{config_from_params, Stretcher};
pub use vocoder::{FftSize, PhaseVocoderEngine};

pub use stretto_core::{Error, ErrorKind, Result, StretchOptions};
