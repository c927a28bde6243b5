//! Strided N-dimensional audio tensor.
//!
//! An [`AudioTensor`] owns a flat storage vector and describes how to walk it
//! with a shape and a stride per axis (strides are counted in elements). Axis
//! moves and axis splits only rewrite the shape/stride vectors; merging axes
//! does the same when the strides line up and falls back to a dense copy
//! otherwise.
//!
//! The storage always holds exactly `len()` elements, so every tensor is a
//! permutation/reshape of some dense row-major buffer.

use smallvec::SmallVec;

use crate::{Error, Result, Sample};

/// Shape vector (axis lengths).
pub type Shape = SmallVec<[usize; 4]>;

/// Stride vector, in elements.
pub type Strides = SmallVec<[usize; 4]>;

/// Owned, strided N-dimensional buffer of [`Sample`]s.
#[derive(Debug, Clone)]
pub struct AudioTensor {
    data: Vec<Sample>,
    shape: Shape,
    strides: Strides,
}

impl AudioTensor {
    /// Wrap a dense row-major buffer.
    pub fn from_vec(data: Vec<Sample>, shape: &[usize]) -> Result<Self> {
        let expected = element_count(shape);
        if expected != Some(data.len()) {
            return Err(Error::DataLength {
                expected: expected.unwrap_or(usize::MAX),
                found: data.len(),
            });
        }
        Ok(Self {
            data,
            shape: Shape::from_slice(shape),
            strides: contiguous_strides(shape),
        })
    }

    /// Dense tensor with every element set to `value`.
    ///
    /// # Panics
    ///
    /// Like `vec!`, if the element count does not fit in memory.
    pub fn filled(shape: &[usize], value: Sample) -> Self {
        let len = saturating_count(shape);
        Self {
            data: vec![value; len],
            shape: Shape::from_slice(shape),
            strides: contiguous_strides(shape),
        }
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self::filled(shape, 0.0)
    }

    /// Dense tensor whose elements are produced from their row-major position.
    pub fn from_fn(shape: &[usize], mut f: impl FnMut(usize) -> Sample) -> Self {
        let len = saturating_count(shape);
        Self {
            data: (0..len).map(&mut f).collect(),
            shape: Shape::from_slice(shape),
            strides: contiguous_strides(shape),
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total element count.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True when the storage is dense row-major in the current axis order.
    ///
    /// Axes of length 1 are ignored since their stride is never used.
    pub fn is_contiguous(&self) -> bool {
        if self.data.is_empty() {
            return true;
        }
        let mut expected = 1;
        for (&len, &stride) in self.shape.iter().zip(self.strides.iter()).rev() {
            if len != 1 && stride != expected {
                return false;
            }
            expected *= len;
        }
        true
    }

    /// Element at a multi-index, or `None` if the index is out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<Sample> {
        if index.len() != self.ndim() {
            return None;
        }
        let mut offset = 0;
        for ((&i, &len), &stride) in index.iter().zip(&self.shape).zip(&self.strides) {
            if i >= len {
                return None;
            }
            offset += i * stride;
        }
        self.data.get(offset).copied()
    }

    /// Elements in logical (row-major) order, whatever the strides.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            tensor: self,
            index: Shape::from_elem(0, self.ndim()),
            remaining: self.len(),
        }
    }

    /// Storage slice, when it is already in logical order.
    pub fn as_slice(&self) -> Option<&[Sample]> {
        self.is_contiguous().then_some(self.data.as_slice())
    }

    pub fn as_mut_slice(&mut self) -> Option<&mut [Sample]> {
        if self.is_contiguous() {
            Some(self.data.as_mut_slice())
        } else {
            None
        }
    }

    /// Dense copy in logical order.
    pub fn to_contiguous(&self) -> Self {
        Self {
            data: self.iter().collect(),
            shape: self.shape.clone(),
            strides: contiguous_strides(&self.shape),
        }
    }

    /// Dense version of this tensor, copying only when needed.
    pub fn into_contiguous(mut self) -> Self {
        if self.is_contiguous() {
            self.strides = contiguous_strides(&self.shape);
            self
        } else {
            self.to_contiguous()
        }
    }

    /// Elements in logical order as a flat vector.
    pub fn into_vec(self) -> Vec<Sample> {
        self.into_contiguous().data
    }

    /// Move axis `source` to position `destination`, keeping the relative
    /// order of the others. Never copies.
    pub fn move_axis(self, source: usize, destination: usize) -> Result<Self> {
        let ndim = self.ndim();
        for axis in [source, destination] {
            if axis >= ndim {
                return Err(Error::AxisOutOfRange { axis, ndim });
            }
        }
        let mut order: SmallVec<[usize; 4]> = (0..ndim).filter(|&a| a != source).collect();
        order.insert(destination, source);
        Ok(self.permuted(&order))
    }

    /// Swap the two axes of a 2-axis tensor. Never copies.
    pub fn transposed(self) -> Result<Self> {
        if self.ndim() != 2 {
            return Err(Error::WrongAxisCount {
                expected: "2",
                found: self.ndim(),
            });
        }
        Ok(self.permuted(&[1, 0]))
    }

    /// Reorder axes so that new axis `i` is old axis `order[i]`.
    pub(crate) fn permuted(mut self, order: &[usize]) -> Self {
        debug_assert_eq!(order.len(), self.ndim());
        self.shape = order.iter().map(|&a| self.shape[a]).collect();
        self.strides = order.iter().map(|&a| self.strides[a]).collect();
        self
    }

    /// Merge axes `start..end` into a single axis of their product length.
    ///
    /// Stride-only when the merged axes are laid out row-major relative to
    /// each other; otherwise the tensor is made dense first.
    pub fn merge_axes(self, start: usize, end: usize) -> Result<Self> {
        let ndim = self.ndim();
        if start >= end || end > ndim {
            return Err(Error::AxisOutOfRange {
                axis: end.max(start),
                ndim,
            });
        }
        let mut this = if self.can_merge(start, end) {
            self
        } else {
            self.to_contiguous()
        };

        // Zero-length tensors can carry axes whose product overflows.
        let merged_len =
            element_count(&this.shape[start..end]).ok_or_else(|| Error::ShapeMismatch {
                expected: format!("{:?}", &this.shape[start..end]),
                found: 0,
            })?;
        let merged_stride = this.shape[start..end]
            .iter()
            .zip(&this.strides[start..end])
            .rev()
            .find(|(&len, _)| len != 1)
            .map(|(_, &stride)| stride)
            .unwrap_or(1);

        this.shape.drain(start + 1..end);
        this.strides.drain(start + 1..end);
        this.shape[start] = merged_len;
        this.strides[start] = merged_stride;
        Ok(this)
    }

    fn can_merge(&self, start: usize, end: usize) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut axes = self.shape[start..end]
            .iter()
            .zip(&self.strides[start..end])
            .filter(|(&len, _)| len != 1);
        let Some((_, mut outer_stride)) = axes.next().map(|(l, s)| (*l, *s)) else {
            return true;
        };
        for (&len, &stride) in axes {
            if outer_stride != stride * len {
                return false;
            }
            outer_stride = stride;
        }
        true
    }

    /// Split `axis` into several axes with lengths `dims` (row-major).
    ///
    /// The product of `dims` must equal the current length of `axis`.
    /// Never copies.
    pub fn split_axis(mut self, axis: usize, dims: &[usize]) -> Result<Self> {
        let ndim = self.ndim();
        if axis >= ndim {
            return Err(Error::AxisOutOfRange { axis, ndim });
        }
        if dims.is_empty() || element_count(dims) != Some(self.shape[axis]) {
            return Err(Error::ShapeMismatch {
                expected: format!("{:?}", dims),
                found: self.shape[axis],
            });
        }

        let base = self.strides[axis];
        let mut split_strides: Strides = Strides::from_elem(0, dims.len());
        let mut acc = base;
        for (i, &len) in dims.iter().enumerate().rev() {
            split_strides[i] = acc;
            acc = acc.saturating_mul(len);
        }

        self.shape.remove(axis);
        self.strides.remove(axis);
        for (offset, (&len, &stride)) in dims.iter().zip(&split_strides).enumerate() {
            self.shape.insert(axis + offset, len);
            self.strides.insert(axis + offset, stride);
        }
        Ok(self)
    }

    /// Reinterpret as `shape`, which must have the same element count.
    pub fn reshape(self, shape: &[usize]) -> Result<Self> {
        let expected = element_count(shape);
        if expected != Some(self.len()) {
            return Err(Error::DataLength {
                expected: expected.unwrap_or(usize::MAX),
                found: self.len(),
            });
        }
        let mut this = self.into_contiguous();
        this.shape = Shape::from_slice(shape);
        this.strides = contiguous_strides(shape);
        Ok(this)
    }
}

impl PartialEq for AudioTensor {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.iter().eq(other.iter())
    }
}

/// Product of the axis lengths, `None` on overflow.
pub fn element_count(shape: &[usize]) -> Option<usize> {
    if shape.contains(&0) {
        return Some(0);
    }
    shape.iter().try_fold(1usize, |acc, &len| acc.checked_mul(len))
}

fn saturating_count(shape: &[usize]) -> usize {
    element_count(shape).unwrap_or(usize::MAX)
}

/// Row-major strides for `shape`.
pub fn contiguous_strides(shape: &[usize]) -> Strides {
    let mut strides = Strides::from_elem(0, shape.len());
    let mut acc = 1usize;
    for (i, &len) in shape.iter().enumerate().rev() {
        strides[i] = acc;
        acc = acc.saturating_mul(len.max(1));
    }
    strides
}

/// Logical-order iterator over an [`AudioTensor`].
pub struct Iter<'a> {
    tensor: &'a AudioTensor,
    index: Shape,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if self.remaining == 0 {
            return None;
        }
        let offset: usize = self
            .index
            .iter()
            .zip(&self.tensor.strides)
            .map(|(&i, &stride)| i * stride)
            .sum();
        let value = self.tensor.data[offset];

        self.remaining -= 1;
        for axis in (0..self.index.len()).rev() {
            self.index[axis] += 1;
            if self.index[axis] < self.tensor.shape[axis] {
                break;
            }
            self.index[axis] = 0;
        }
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}
