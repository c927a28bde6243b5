//! Test helpers and fixtures for stretto integration tests.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (layout changes, copies)
//! - `OUTPUT_LENGTH_TOLERANCE` (5%): Retrieved vs expected sample counts
//! - `LEVEL_TOLERANCE` (10%): Signal level through the vocoder

#![allow(dead_code)]

pub mod fake_engine;
pub mod tolerances;

pub use fake_engine::{FakeEngine, FAKE_REQUIRED};

use stretto::prelude::*;
use stretto::StretcherConfig;

/// Default test sample rate
pub const TEST_SAMPLE_RATE: u32 = 16000;

/// Install a fmt subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Real-time stretcher on the phase-vocoder engine.
pub fn test_stretcher(channels: usize) -> Stretcher {
    Stretcher::new(TEST_SAMPLE_RATE, channels, StretchOptions::PROCESS_REALTIME)
        .expect("Failed to create test stretcher")
}

/// Stretcher driving a [`FakeEngine`].
pub fn fake_stretcher(channels: usize, options: StretchOptions) -> Stretcher<FakeEngine> {
    let config = StretcherConfig::new(TEST_SAMPLE_RATE, channels).options(options);
    Stretcher::with_engine(config, FakeEngine::new).expect("Failed to create fake stretcher")
}

/// Sine wave at `frequency` Hz.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// White noise in -1..1 from a fixed seed.
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    // Simple LCG for reproducible "random" noise
    let mut rng = seed;
    (0..num_samples)
        .map(|_| {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((rng >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0
        })
        .collect()
}

/// Tensor whose elements equal their row-major index.
pub fn generate_staircase(shape: &[usize]) -> AudioTensor {
    AudioTensor::from_fn(shape, |i| i as f32)
}

/// Canonical block with a distinct sine per channel.
pub fn sine_block(channels: usize, samples: usize) -> AudioBlock {
    let per_channel: Vec<Vec<f32>> = (0..channels)
        .map(|c| generate_sine(220.0 * (c + 1) as f64, TEST_SAMPLE_RATE as f64, samples))
        .collect();
    AudioBlock::from_channels(&per_channel).expect("equal channel lengths")
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Assert two counts agree within a relative tolerance.
pub fn assert_relative_eq_count(actual: usize, expected: f64, tolerance: f64) {
    let error = (actual as f64 - expected).abs() / expected;
    assert!(
        error <= tolerance,
        "Expected about {} samples, got {} ({:.2}% off)",
        expected,
        actual,
        error * 100.0
    );
}
