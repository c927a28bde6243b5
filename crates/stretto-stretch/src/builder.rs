//! Fluent construction of a [`Stretcher`].

use stretto_core::{Result, StretchOptions, StretcherConfig};

use crate::engine::StretchEngine;
use crate::stretcher::Stretcher;
use crate::vocoder::PhaseVocoderEngine;

/// Builder for [`Stretcher`].
///
/// Created via [`Stretcher::builder`]. Nothing is validated until
/// [`build`](Self::build).
///
/// # Example
/// ```
/// use stretto_stretch::{Stretcher, StretchOptions};
///
/// let stretcher = Stretcher::builder(48000, 2)
///     .options(StretchOptions::PROCESS_REALTIME | StretchOptions::ENGINE_FINER)
///     .time_ratio(1.25)
///     .pitch_scale(0.5)
///     .max_process_size(4096)
///     .build()?;
///
/// assert_eq!(stretcher.engine_version(), 3);
/// # Ok::<(), stretto_core::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct StretcherBuilder {
    config: StretcherConfig,
    formant_scale: Option<f64>,
    max_process_size: Option<usize>,
    expected_input_duration: Option<usize>,
}

impl StretcherBuilder {
    pub(crate) fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            config: StretcherConfig::new(sample_rate, channels),
            formant_scale: None,
            max_process_size: None,
            expected_input_duration: None,
        }
    }

    /// Option flags (default: [`StretchOptions::DEFAULT`]).
    pub fn options(mut self, options: StretchOptions) -> Self {
        self.config.options = options;
        self
    }

    /// Initial time ratio (default: 1.0).
    pub fn time_ratio(mut self, ratio: f64) -> Self {
        self.config.time_ratio = ratio;
        self
    }

    /// Initial pitch scale (default: 1.0).
    pub fn pitch_scale(mut self, scale: f64) -> Self {
        self.config.pitch_scale = scale;
        self
    }

    pub fn formant_scale(mut self, scale: f64) -> Self {
        self.formant_scale = Some(scale);
        self
    }

    pub fn max_process_size(mut self, samples: usize) -> Self {
        self.max_process_size = Some(samples);
        self
    }

    pub fn expected_input_duration(mut self, samples: usize) -> Self {
        self.expected_input_duration = Some(samples);
        self
    }

    /// Build with the phase-vocoder engine.
    pub fn build(self) -> Result<Stretcher> {
        self.build_with_engine(PhaseVocoderEngine::new)
    }

    /// Build with a custom engine.
    pub fn build_with_engine<E: StretchEngine>(
        self,
        factory: impl FnOnce(&StretcherConfig) -> E,
    ) -> Result<Stretcher<E>> {
        if let Some(scale) = self.formant_scale {
            stretto_core::validate_formant_scale(scale)?;
        }
        let mut stretcher = Stretcher::with_engine(self.config, factory)?;
        if let Some(scale) = self.formant_scale {
            stretcher.set_formant_scale(scale)?;
        }
        if let Some(samples) = self.max_process_size {
            stretcher.set_max_process_size(samples)?;
        }
        if let Some(samples) = self.expected_input_duration {
            stretcher.set_expected_input_duration(samples);
        }
        Ok(stretcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let stretcher = Stretcher::builder(44100, 2).build().unwrap();
        assert_eq!(stretcher.channels(), 2);
        assert_eq!(stretcher.time_ratio(), 1.0);
        assert_eq!(stretcher.pitch_scale(), 1.0);
        assert_eq!(stretcher.max_process_size(), None);
        assert_eq!(stretcher.engine_version(), 2);
    }

    #[test]
    fn test_builder_applies_settings() {
        let stretcher = Stretcher::builder(22050, 1)
            .options(StretchOptions::PROCESS_REALTIME)
            .time_ratio(2.0)
            .pitch_scale(1.5)
            .formant_scale(1.0)
            .max_process_size(512)
            .expected_input_duration(22050)
            .build()
            .unwrap();
        assert_eq!(stretcher.time_ratio(), 2.0);
        assert_eq!(stretcher.pitch_scale(), 1.5);
        assert_eq!(stretcher.formant_scale(), 1.0);
        assert_eq!(stretcher.max_process_size(), Some(512));
        assert_eq!(stretcher.engine().expected_input_duration(), Some(22050));
    }

    #[test]
    fn test_builder_rejects_before_engine() {
        let err = Stretcher::builder(44100, 2)
            .formant_scale(-1.0)
            .build_with_engine(|_| -> PhaseVocoderEngine { unreachable!() })
            .unwrap_err();
        assert!(err.is_range_error());

        let err = Stretcher::builder(44100, 2).time_ratio(0.0).build().unwrap_err();
        assert!(err.is_range_error());
    }

    #[test]
    fn test_config_round_trip_rebuilds() {
        let stretcher = Stretcher::builder(16000, 2)
            .options(StretchOptions::PERCUSSIVE)
            .time_ratio(0.75)
            .build()
            .unwrap();
        let json = serde_json::to_string(stretcher.config()).unwrap();
        let config: StretcherConfig = serde_json::from_str(&json).unwrap();
        let rebuilt = Stretcher::from_config(config).unwrap();
        assert_eq!(rebuilt.config(), stretcher.config());
        assert_eq!(rebuilt.engine().fft_size().size(), 1024);
    }
}
