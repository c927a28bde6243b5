//! Canonical `(channel, sample)` audio blocks.

use crate::tensor::AudioTensor;
use crate::{Error, Result, Sample, CHANNEL_AXIS, SAMPLE_AXIS};

/// A 2-axis audio buffer in canonical axis order.
///
/// The block may be a strided view (for instance a transposed interleaved
/// buffer); [`is_packed`](Self::is_packed) tells whether the storage is
/// already channel-major and can be handed to an engine as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    tensor: AudioTensor,
}

impl AudioBlock {
    /// Packed block with every sample set to `value`.
    pub fn filled(channels: usize, samples: usize, value: Sample) -> Self {
        Self {
            tensor: AudioTensor::filled(&canonical_shape(channels, samples), value),
        }
    }

    pub fn zeros(channels: usize, samples: usize) -> Self {
        Self::filled(channels, samples, 0.0)
    }

    /// Block with no samples.
    pub fn empty(channels: usize) -> Self {
        Self::zeros(channels, 0)
    }

    /// Packed block from one vector per channel.
    pub fn from_channels<C: AsRef<[Sample]>>(channels: &[C]) -> Result<Self> {
        let samples = channels.first().map_or(0, |c| c.as_ref().len());
        let mut data = Vec::with_capacity(channels.len() * samples);
        for channel in channels {
            let channel = channel.as_ref();
            if channel.len() != samples {
                return Err(Error::DataLength {
                    expected: samples,
                    found: channel.len(),
                });
            }
            data.extend_from_slice(channel);
        }
        Self::from_packed(data, channels.len(), samples)
    }

    /// Packed block over channel-major data.
    pub fn from_packed(data: Vec<Sample>, channels: usize, samples: usize) -> Result<Self> {
        Ok(Self {
            tensor: AudioTensor::from_vec(data, &canonical_shape(channels, samples))?,
        })
    }

    /// Strided view over interleaved (sample-major) data. Does not copy.
    pub fn from_interleaved(data: Vec<Sample>, channels: usize) -> Result<Self> {
        if channels == 0 || data.len() % channels != 0 {
            return Err(Error::DataLength {
                expected: data.len().next_multiple_of(channels.max(1)),
                found: data.len(),
            });
        }
        let frames = data.len() / channels;
        let tensor = AudioTensor::from_vec(data, &[frames, channels])?.transposed()?;
        Self::from_tensor(tensor)
    }

    /// Wrap a 2-axis tensor already in canonical axis order.
    pub fn from_tensor(tensor: AudioTensor) -> Result<Self> {
        if tensor.ndim() != 2 {
            return Err(Error::WrongAxisCount {
                expected: "2",
                found: tensor.ndim(),
            });
        }
        Ok(Self { tensor })
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.tensor.shape()[CHANNEL_AXIS]
    }

    #[inline]
    pub fn samples(&self) -> usize {
        self.tensor.shape()[SAMPLE_AXIS]
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.tensor.shape()[0], self.tensor.shape()[1]]
    }

    /// Total element count.
    pub fn len(&self) -> usize {
        self.tensor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensor.is_empty()
    }

    /// True when the storage is dense and channel-major.
    pub fn is_packed(&self) -> bool {
        self.tensor.is_contiguous()
    }

    /// Packed version of this block; copies only strided views.
    pub fn into_packed(self) -> Self {
        Self {
            tensor: self.tensor.into_contiguous(),
        }
    }

    /// One channel's samples. `None` for strided blocks or a bad index.
    pub fn channel(&self, channel: usize) -> Option<&[Sample]> {
        if channel >= self.channels() {
            return None;
        }
        let samples = self.samples();
        self.tensor
            .as_slice()
            .map(|data| &data[channel * samples..(channel + 1) * samples])
    }

    pub fn channel_mut(&mut self, channel: usize) -> Option<&mut [Sample]> {
        if channel >= self.channels() {
            return None;
        }
        let samples = self.samples();
        self.tensor
            .as_mut_slice()
            .map(|data| &mut data[channel * samples..(channel + 1) * samples])
    }

    /// Per-channel slices of a packed block.
    pub fn channel_slices(&self) -> Option<Vec<&[Sample]>> {
        (0..self.channels()).map(|c| self.channel(c)).collect()
    }

    pub fn get(&self, channel: usize, sample: usize) -> Option<Sample> {
        let mut index = [0; 2];
        index[CHANNEL_AXIS] = channel;
        index[SAMPLE_AXIS] = sample;
        self.tensor.get(&index)
    }

    pub fn as_tensor(&self) -> &AudioTensor {
        &self.tensor
    }

    pub fn into_tensor(self) -> AudioTensor {
        self.tensor
    }
}

impl From<AudioBlock> for AudioTensor {
    fn from(block: AudioBlock) -> Self {
        block.into_tensor()
    }
}

impl TryFrom<AudioTensor> for AudioBlock {
    type Error = Error;

    fn try_from(tensor: AudioTensor) -> Result<Self> {
        Self::from_tensor(tensor)
    }
}

fn canonical_shape(channels: usize, samples: usize) -> [usize; 2] {
    let mut shape = [0; 2];
    shape[CHANNEL_AXIS] = channels;
    shape[SAMPLE_AXIS] = samples;
    shape
}

/// Packed block of `channels` × `samples`, every element set to `fill`.
pub fn make_canonical_block(channels: usize, samples: usize, fill: Sample) -> AudioBlock {
    AudioBlock::filled(channels, samples, fill)
}
