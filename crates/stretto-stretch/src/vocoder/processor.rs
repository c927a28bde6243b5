//! Single-channel phase vocoder.
//!
//! ## Algorithm Overview
//!
//! 1. **Analysis**: Window the input with a Hann window and take the FFT
//! 2. **Phase Unwrapping**: Instantaneous frequency from the phase difference between frames
//! 3. **Synthesis**: Accumulate phase at the synthesis hop (scaled by pitch), IFFT, overlap-add
//!
//! Samples before the next synthesis frame start receive no further
//! contributions, so they move to the output queue as soon as a frame is added.
//!
//! Each run of buffered input remembers the [`FrameParams`] in force when it
//! was pushed; a frame uses the parameters of the run holding its first sample.

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use stretto_core::Sample;

use super::FftSize;

/// Per-frame synthesis settings, captured when input is pushed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FrameParams {
    pub synthesis_hop: usize,
    pub pitch_scale: f32,
}

/// Queued output. Silence past the end of a frame is kept as a count.
#[derive(Debug, Clone)]
enum OutputRun {
    Samples(VecDeque<Sample>),
    Silence(usize),
}

impl OutputRun {
    fn is_empty(&self) -> bool {
        match self {
            Self::Samples(samples) => samples.is_empty(),
            Self::Silence(len) => *len == 0,
        }
    }
}

#[derive(Clone)]
pub(crate) struct PhaseVocoderProcessor {
    fft_size: usize,
    hop_analysis: usize,

    window: Vec<f32>,
    /// Sum of squared window values, for overlap-add gain.
    window_energy: f32,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,

    phase_accumulator: Vec<f32>,
    last_phase: Vec<f32>,
    expected_phase_diff: Vec<f32>,

    input: VecDeque<Sample>,
    /// (length, params) runs covering `input`, front first.
    input_params: VecDeque<(usize, FrameParams)>,
    last_params: FrameParams,
    /// Synthesis hop of each frame analysed by the latest `process`/`flush`.
    recent_hops: Vec<usize>,
    overlap: Vec<f32>,
    output: VecDeque<OutputRun>,
    output_len: usize,
}

impl PhaseVocoderProcessor {
    /// Plans are cached by `planner`, so channels built from one planner share them.
    pub fn new(fft_size: FftSize, planner: &mut FftPlanner<f32>) -> Self {
        let size = fft_size.size();
        let hop = fft_size.hop_size();
        let num_bins = size / 2 + 1;

        let window = Self::create_hann_window(size);
        let window_energy = window.iter().map(|w| w * w).sum();

        let expected_phase_diff = (0..num_bins)
            .map(|k| 2.0 * PI * (k as f32) * (hop as f32) / (size as f32))
            .collect();

        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Self {
            fft_size: size,
            hop_analysis: hop,
            window,
            window_energy,
            forward,
            inverse,
            spectrum: vec![Complex::new(0.0, 0.0); size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            phase_accumulator: vec![0.0; num_bins],
            last_phase: vec![0.0; num_bins],
            expected_phase_diff,
            input: VecDeque::with_capacity(size * 2),
            input_params: VecDeque::new(),
            last_params: FrameParams {
                synthesis_hop: hop,
                pitch_scale: 1.0,
            },
            recent_hops: Vec::new(),
            overlap: vec![0.0; size],
            output: VecDeque::new(),
            output_len: 0,
        }
    }

    fn create_hann_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
            .collect()
    }

    pub fn reset(&mut self) {
        self.spectrum.fill(Complex::new(0.0, 0.0));
        self.phase_accumulator.fill(0.0);
        self.last_phase.fill(0.0);
        self.input.clear();
        self.input_params.clear();
        self.recent_hops.clear();
        self.overlap.fill(0.0);
        self.output.clear();
        self.output_len = 0;
    }

    pub fn reserve_input(&mut self, samples: usize) {
        self.input.reserve(samples);
    }

    /// Buffer `samples`; frames starting inside them will use `params`.
    pub fn push_input(&mut self, samples: &[Sample], params: FrameParams) {
        if samples.is_empty() {
            return;
        }
        self.input.extend(samples.iter().copied());
        match self.input_params.back_mut() {
            Some((len, last)) if *last == params => *len += samples.len(),
            _ => self.input_params.push_back((samples.len(), params)),
        }
    }

    /// Input samples not yet consumed by an analysis hop.
    #[inline]
    pub fn input_buffered(&self) -> usize {
        self.input.len()
    }

    #[inline]
    pub fn output_available(&self) -> usize {
        self.output_len
    }

    pub fn recent_hops(&self) -> &[usize] {
        &self.recent_hops
    }

    /// Move up to `out.len()` output samples into `out`; returns how many.
    pub fn pop_output(&mut self, out: &mut [Sample]) -> usize {
        let mut written = 0;
        while written < out.len() {
            let Some(run) = self.output.front_mut() else {
                break;
            };
            let rest = &mut out[written..];
            written += match run {
                OutputRun::Samples(samples) => {
                    let n = rest.len().min(samples.len());
                    for (dst, src) in rest.iter_mut().zip(samples.drain(..n)) {
                        *dst = src;
                    }
                    n
                }
                OutputRun::Silence(len) => {
                    let n = rest.len().min(*len);
                    rest[..n].fill(0.0);
                    *len -= n;
                    n
                }
            };
            if run.is_empty() {
                self.output.pop_front();
            }
        }
        self.output_len -= written;
        written
    }

    /// Analyse every full frame currently buffered.
    pub fn process(&mut self) {
        self.recent_hops.clear();
        self.process_buffered();
    }

    /// Zero-pad the buffered tail until each remaining hop has started a frame.
    pub fn flush(&mut self) {
        self.recent_hops.clear();
        self.process_buffered();
        let remaining = self.input.len();
        if remaining == 0 {
            return;
        }
        let frames = remaining.div_ceil(self.hop_analysis);
        self.input
            .resize((frames - 1) * self.hop_analysis + self.fft_size, 0.0);
        for _ in 0..frames {
            self.process_frame();
        }
        self.input.clear();
        self.input_params.clear();
    }

    fn process_buffered(&mut self) {
        while self.input.len() >= self.fft_size {
            self.process_frame();
        }
    }

    /// Parameters of the run holding the first buffered sample. Padding added
    /// by `flush` has no run of its own and keeps the last parameters.
    fn frame_params(&mut self) -> FrameParams {
        if let Some((_, params)) = self.input_params.front() {
            self.last_params = *params;
        }
        self.last_params
    }

    fn consume_params(&mut self, mut count: usize) {
        while count > 0 {
            let Some((len, _)) = self.input_params.front_mut() else {
                break;
            };
            if *len > count {
                *len -= count;
                break;
            }
            count -= *len;
            self.input_params.pop_front();
        }
    }

    fn process_frame(&mut self) {
        let num_bins = self.fft_size / 2 + 1;
        let FrameParams {
            synthesis_hop,
            pitch_scale,
        } = self.frame_params();
        self.recent_hops.push(synthesis_hop);

        for (i, bin) in self.spectrum.iter_mut().enumerate() {
            *bin = Complex::new(self.input[i] * self.window[i], 0.0);
        }
        self.input.drain(..self.hop_analysis);
        self.consume_params(self.hop_analysis);

        self.forward
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let hop_ratio = synthesis_hop as f32 / self.hop_analysis as f32;
        for k in 0..num_bins {
            let magnitude = self.spectrum[k].norm();
            let phase = self.spectrum[k].arg();

            let expected = self.expected_phase_diff[k];
            let deviation = Self::wrap_phase(phase - self.last_phase[k] - expected);
            let true_freq = expected + deviation;

            self.phase_accumulator[k] =
                Self::wrap_phase(self.phase_accumulator[k] + true_freq * pitch_scale * hop_ratio);
            self.last_phase[k] = phase;

            self.spectrum[k] = Complex::from_polar(magnitude, self.phase_accumulator[k]);
        }

        // Conjugate symmetry for a real signal
        for k in 1..num_bins - 1 {
            self.spectrum[self.fft_size - k] = self.spectrum[k].conj();
        }

        self.inverse
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        // 1/N for the unnormalised inverse, hop/energy for the window overlap
        let gain = synthesis_hop as f32 / (self.window_energy * self.fft_size as f32);
        for ((acc, bin), w) in self
            .overlap
            .iter_mut()
            .zip(self.spectrum.iter())
            .zip(self.window.iter())
        {
            *acc += bin.re * w * gain;
        }

        self.emit(synthesis_hop);
    }

    /// Move `count` finished samples from the overlap buffer to the output queue.
    fn emit(&mut self, count: usize) {
        let from_overlap = count.min(self.fft_size);
        let finished = self.overlap[..from_overlap].iter().copied();
        match self.output.back_mut() {
            Some(OutputRun::Samples(samples)) => samples.extend(finished),
            _ => self.output.push_back(OutputRun::Samples(finished.collect())),
        }
        if count > from_overlap {
            self.output
                .push_back(OutputRun::Silence(count - from_overlap));
        }
        self.output_len = self.output_len.saturating_add(count);

        self.overlap.copy_within(from_overlap.., 0);
        let tail = self.fft_size - from_overlap;
        self.overlap[tail..].fill(0.0);
    }

    #[inline]
    fn wrap_phase(phase: f32) -> f32 {
        (phase + PI).rem_euclid(2.0 * PI) - PI
    }
}

impl fmt::Debug for PhaseVocoderProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseVocoderProcessor")
            .field("fft_size", &self.fft_size)
            .field("hop_analysis", &self.hop_analysis)
            .field("input", &self.input.len())
            .field("output", &self.output_len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn processor(size: FftSize) -> PhaseVocoderProcessor {
        PhaseVocoderProcessor::new(size, &mut FftPlanner::new())
    }

    fn hop(synthesis_hop: usize) -> FrameParams {
        FrameParams {
            synthesis_hop,
            pitch_scale: 1.0,
        }
    }

    fn drain(proc: &mut PhaseVocoderProcessor) -> Vec<f32> {
        let mut out = vec![0.0; proc.output_available()];
        let n = proc.pop_output(&mut out);
        out.truncate(n);
        out
    }

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_hann_window() {
        let window = PhaseVocoderProcessor::create_hann_window(1024);
        assert_eq!(window.len(), 1024);
        assert!(window[0] < 0.001);
        assert!((window[512] - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_wrap_phase() {
        assert_abs_diff_eq!(PhaseVocoderProcessor::wrap_phase(0.0), 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(
            PhaseVocoderProcessor::wrap_phase(0.5 + 4.0 * PI),
            0.5,
            epsilon = 1e-4
        );
        assert_abs_diff_eq!(
            PhaseVocoderProcessor::wrap_phase(-0.5 - 2.0 * PI),
            -0.5,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_frame_needs_full_window() {
        let mut proc = processor(FftSize::Small);
        proc.push_input(&[0.5; 256], hop(256));
        proc.process();
        assert_eq!(proc.output_available(), 0);
        assert_eq!(proc.input_buffered(), 256);

        proc.push_input(&[0.3; 768], hop(256));
        proc.process();
        assert_eq!(proc.output_available(), 256);
        assert_eq!(proc.input_buffered(), 768);
    }

    #[test]
    fn test_synthesis_hop_sets_output_rate() {
        let mut proc = processor(FftSize::Small);
        proc.push_input(&sine(440.0, 44100.0, 1024 + 256 * 3), hop(128));
        proc.process();
        assert_eq!(proc.output_available(), 4 * 128);
        assert_eq!(proc.recent_hops(), &[128; 4]);
    }

    #[test]
    fn test_frames_use_params_of_their_first_sample() {
        let mut proc = processor(FftSize::Small);
        proc.push_input(&[0.1; 1023], hop(256));
        proc.push_input(&[0.1; 1], hop(512));
        proc.process();
        // frame at 0 was fed entirely under the old hop
        assert_eq!(proc.output_available(), 256);

        // frames at 256, 512, 768 start in the first run, 1024 in the second
        proc.push_input(&[0.1; 1024], hop(512));
        proc.process();
        assert_eq!(proc.recent_hops(), &[256, 256, 256, 512]);
        assert_eq!(proc.output_available(), 4 * 256 + 512);
    }

    #[test]
    fn test_flush_padding_keeps_last_params() {
        let mut proc = processor(FftSize::Small);
        proc.push_input(&[0.1; 300], hop(100));
        proc.flush();
        // frames at 0 and 256, both inside the pushed run
        assert_eq!(proc.recent_hops(), &[100, 100]);
        assert_eq!(proc.output_available(), 200);
    }

    #[test]
    fn test_hop_larger_than_frame_pads_with_silence() {
        let mut proc = processor(FftSize::Small);
        proc.push_input(&[0.1; 1024], hop(3000));
        proc.process();
        assert_eq!(proc.output_available(), 3000);
        let tail: Vec<f32> = drain(&mut proc).split_off(1024);
        assert_eq!(tail.len(), 3000 - 1024);
        assert!(tail.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_huge_hop_does_not_materialise_silence() {
        let huge = 1usize << 40;
        let mut proc = processor(FftSize::Small);
        proc.push_input(&[0.1; 1024 + 256], hop(huge));
        proc.process();
        assert_eq!(proc.output_available(), 2 * huge);

        let mut out = vec![1.0; 2048];
        assert_eq!(proc.pop_output(&mut out), 2048);
        assert!(out[1024..].iter().all(|s| *s == 0.0));
        assert_eq!(proc.output_available(), 2 * huge - 2048);
    }

    #[test]
    fn test_pop_output_spans_runs() {
        let mut proc = processor(FftSize::Small);
        proc.push_input(&[0.2; 1024 + 256], hop(1500));
        proc.process();
        // samples, silence, samples, silence
        let out = drain(&mut proc);
        assert_eq!(out.len(), 3000);
        assert!(out[1024..1500].iter().all(|s| *s == 0.0));
        assert!(out[1500..2524].iter().any(|s| *s != 0.0));
        assert_eq!(proc.output_available(), 0);
        assert_eq!(proc.pop_output(&mut [0.0; 8]), 0);
    }

    #[test]
    fn test_flush_analyses_every_hop() {
        let mut proc = processor(FftSize::Small);
        proc.push_input(&[0.2; 1024 + 3 * 256], hop(256));
        proc.process();
        assert_eq!(proc.output_available(), 4 * 256);
        assert_eq!(proc.input_buffered(), 768);

        proc.flush();
        assert_eq!(proc.output_available(), 7 * 256);
        assert_eq!(proc.input_buffered(), 0);
    }

    #[test]
    fn test_passthrough_level() {
        let mut proc = processor(FftSize::Small);
        let input = sine(440.0, 44100.0, 8192);
        proc.push_input(&input, hop(256));
        proc.process();

        let output = drain(&mut proc);
        assert!(!output.is_empty());

        // Skip the fade-in of the first frames; steady state should be close to unity gain
        let steady = &output[1024..output.len() - 1024];
        let rms = |s: &[f32]| (s.iter().map(|x| x * x).sum::<f32>() / s.len() as f32).sqrt();
        let expected = rms(&input[1024..input.len() - 1024]);
        assert_abs_diff_eq!(rms(steady), expected, epsilon = 0.05);
    }

    #[test]
    fn test_reset() {
        let mut proc = processor(FftSize::Small);
        proc.push_input(&[0.5; 2048], hop(256));
        proc.process();
        proc.reset();
        assert_eq!(proc.input_buffered(), 0);
        assert_eq!(proc.output_available(), 0);
        assert!(proc.recent_hops().is_empty());
    }
}
