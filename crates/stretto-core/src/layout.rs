//! Folding caller tensors into canonical blocks and back.
//!
//! A caller tensor has one sample axis and any number of other axes, in any
//! order. Folding moves the sample axis last and merges the remaining axes,
//! left to right, into the channel axis. Unfolding needs the original shape
//! of those axes back (a [`ShapeSpec`]), since the merge forgets it.

use tracing::trace;

use crate::block::AudioBlock;
use crate::shape::{Dim, ShapeSpec};
use crate::tensor::AudioTensor;
use crate::{Error, Result, SAMPLE_AXIS};

/// Fold `tensor` into a canonical block, treating `sample_axis` as time.
///
/// Only shape and strides change; a copy is made when the non-sample axes
/// cannot be merged in place. A 2-axis tensor that already has its samples on
/// [`SAMPLE_AXIS`] is returned untouched.
pub fn to_canonical(tensor: AudioTensor, sample_axis: usize) -> Result<AudioBlock> {
    let ndim = tensor.ndim();
    if ndim < 2 {
        return Err(Error::WrongAxisCount {
            expected: "at least 2",
            found: ndim,
        });
    }
    if sample_axis >= ndim {
        return Err(Error::AxisOutOfRange {
            axis: sample_axis,
            ndim,
        });
    }
    if ndim == 2 && sample_axis == SAMPLE_AXIS {
        return AudioBlock::from_tensor(tensor);
    }

    trace!(shape = ?tensor.shape(), sample_axis, "folding tensor");
    // (channels, samples); CHANNEL_AXIS is 0
    let folded = tensor
        .move_axis(sample_axis, ndim - 1)?
        .merge_axes(0, ndim - 1)?;
    AudioBlock::from_tensor(folded)
}

/// Unfold a canonical block into the layout described by `wanted`.
///
/// The block's channel axis is split into the non-sample axes of `wanted`
/// (the wildcard is inferred) and the sample axis is moved to the marker's
/// position. Stride-only, except that dropping the channel axis of a strided
/// single-channel block packs it.
pub fn from_canonical(block: AudioBlock, wanted: &ShapeSpec) -> Result<AudioTensor> {
    let resolved = wanted.resolve(block.channels())?;
    trace!(shape = ?block.shape(), %wanted, "unfolding block");

    let channel_major = block.into_tensor();

    let split_count = resolved.channel_dims.len();
    let unfolded = if split_count == 0 {
        // Only the sample axis is wanted; drop the length-1 channel axis.
        let samples = channel_major.shape()[1];
        channel_major.reshape(&[samples])?
    } else {
        channel_major.split_axis(0, &resolved.channel_dims)?
    };

    let last = unfolded.ndim() - 1;
    unfolded.move_axis(last, resolved.sample_axis)
}

/// Two-axis shorthand: put the channel axis at `wanted_channel_axis` (0 or 1).
pub fn from_canonical_2d(block: AudioBlock, wanted_channel_axis: usize) -> Result<AudioTensor> {
    let spec = match wanted_channel_axis {
        0 => ShapeSpec::from([Dim::Infer, Dim::Samples]),
        1 => ShapeSpec::from([Dim::Samples, Dim::Infer]),
        other => return Err(Error::InvalidAxisPosition(other)),
    };
    from_canonical(block, &spec)
}

/// Alias of [`to_canonical`].
pub fn reorder_to_canonical(tensor: AudioTensor, sample_axis: usize) -> Result<AudioBlock> {
    to_canonical(tensor, sample_axis)
}

/// Alias of [`from_canonical`].
pub fn reorder_from_canonical(block: AudioBlock, wanted: &ShapeSpec) -> Result<AudioTensor> {
    from_canonical(block, wanted)
}
