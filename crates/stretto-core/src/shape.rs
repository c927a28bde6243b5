//! Target-shape descriptors for unfolding canonical blocks.

use core::fmt;

use smallvec::SmallVec;

use crate::tensor::{element_count, Shape};
use crate::{Error, Result};

/// One axis of a [`ShapeSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Axis of known length.
    Size(usize),
    /// Length inferred from the remaining element count (`-1`).
    Infer,
    /// Position of the sample axis.
    Samples,
}

/// Desired layout of a caller tensor: axis sizes plus one sample-axis marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeSpec {
    dims: SmallVec<[Dim; 4]>,
}

/// Validated form of a [`ShapeSpec`] for a particular channel count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedShape {
    /// Index of the sample axis in the target shape.
    pub sample_axis: usize,
    /// Lengths of the non-sample axes, in target order.
    pub channel_dims: Shape,
}

impl ShapeSpec {
    pub fn new(dims: impl IntoIterator<Item = Dim>) -> Self {
        Self {
            dims: dims.into_iter().collect(),
        }
    }

    /// Parse a list where `None` marks the sample axis and `-1` is a wildcard.
    pub fn parse(dims: &[Option<i64>]) -> Result<Self> {
        dims.iter()
            .map(|d| match *d {
                None => Ok(Dim::Samples),
                Some(-1) => Ok(Dim::Infer),
                Some(n) if n >= 0 => Ok(Dim::Size(n as usize)),
                Some(n) => Err(Error::InvalidDim(n)),
            })
            .collect::<Result<SmallVec<[Dim; 4]>>>()
            .map(|dims| Self { dims })
    }

    /// Descriptor that rebuilds a tensor of `shape` whose samples run along
    /// `sample_axis`.
    pub fn for_tensor(shape: &[usize], sample_axis: usize) -> Result<Self> {
        if sample_axis >= shape.len() {
            return Err(Error::AxisOutOfRange {
                axis: sample_axis,
                ndim: shape.len(),
            });
        }
        Ok(Self::new(shape.iter().enumerate().map(|(axis, &len)| {
            if axis == sample_axis {
                Dim::Samples
            } else {
                Dim::Size(len)
            }
        })))
    }

    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Check the markers and resolve the wildcard against `channels`.
    pub(crate) fn resolve(&self, channels: usize) -> Result<ResolvedShape> {
        let markers = self.dims.iter().filter(|d| **d == Dim::Samples).count();
        match markers {
            0 => return Err(Error::MissingSampleAxisMarker),
            1 => {}
            n => return Err(Error::DuplicateSampleAxisMarker(n)),
        }
        let wildcards = self.dims.iter().filter(|d| **d == Dim::Infer).count();
        if wildcards > 1 {
            return Err(Error::MultipleWildcards(wildcards));
        }

        let sample_axis = self
            .dims
            .iter()
            .position(|d| *d == Dim::Samples)
            .unwrap_or_default();
        let sizes: Shape = self
            .dims
            .iter()
            .filter_map(|d| match d {
                Dim::Size(n) => Some(*n),
                _ => None,
            })
            .collect();
        let known = element_count(&sizes).ok_or_else(|| self.mismatch(channels))?;

        let inferred = if wildcards == 1 {
            if known == 0 || channels % known != 0 {
                return Err(self.mismatch(channels));
            }
            channels / known
        } else {
            if known != channels {
                return Err(self.mismatch(channels));
            }
            0
        };

        let channel_dims = self
            .dims
            .iter()
            .filter_map(|d| match d {
                Dim::Size(n) => Some(*n),
                Dim::Infer => Some(inferred),
                Dim::Samples => None,
            })
            .collect();

        Ok(ResolvedShape {
            sample_axis,
            channel_dims,
        })
    }

    fn mismatch(&self, channels: usize) -> Error {
        Error::ShapeMismatch {
            expected: self.to_string(),
            found: channels,
        }
    }
}

impl fmt::Display for ShapeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match dim {
                Dim::Size(n) => write!(f, "{n}")?,
                Dim::Infer => f.write_str("-1")?,
                Dim::Samples => f.write_str("samples")?,
            }
        }
        f.write_str(")")
    }
}

impl From<&[Dim]> for ShapeSpec {
    fn from(dims: &[Dim]) -> Self {
        Self::new(dims.iter().copied())
    }
}

impl<const N: usize> From<[Dim; N]> for ShapeSpec {
    fn from(dims: [Dim; N]) -> Self {
        Self::new(dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let spec = ShapeSpec::parse(&[Some(2), None, Some(-1)]).unwrap();
        assert_eq!(spec.dims(), &[Dim::Size(2), Dim::Samples, Dim::Infer]);
        assert_eq!(spec.to_string(), "(2, samples, -1)");

        assert_eq!(
            ShapeSpec::parse(&[Some(-2), None]).unwrap_err(),
            Error::InvalidDim(-2)
        );
    }

    #[test]
    fn test_resolve_markers() {
        let none = ShapeSpec::from([Dim::Size(2), Dim::Size(3)]);
        assert_eq!(none.resolve(6).unwrap_err(), Error::MissingSampleAxisMarker);

        let two = ShapeSpec::from([Dim::Samples, Dim::Size(2), Dim::Samples]);
        assert_eq!(
            two.resolve(2).unwrap_err(),
            Error::DuplicateSampleAxisMarker(2)
        );

        let wild = ShapeSpec::from([Dim::Infer, Dim::Samples, Dim::Infer]);
        assert_eq!(wild.resolve(4).unwrap_err(), Error::MultipleWildcards(2));
    }

    #[test]
    fn test_resolve_wildcard() {
        let spec = ShapeSpec::from([Dim::Size(2), Dim::Samples, Dim::Infer]);
        let resolved = spec.resolve(6).unwrap();
        assert_eq!(resolved.sample_axis, 1);
        assert_eq!(resolved.channel_dims.as_slice(), &[2, 3]);

        assert!(spec.resolve(5).unwrap_err().is_shape_error());
    }

    #[test]
    fn test_resolve_product_mismatch() {
        let spec = ShapeSpec::from([Dim::Size(2), Dim::Size(2), Dim::Samples]);
        assert!(spec.resolve(4).is_ok());
        assert!(matches!(
            spec.resolve(3),
            Err(Error::ShapeMismatch { found: 3, .. })
        ));
    }

    #[test]
    fn test_resolve_overflowing_sizes() {
        let huge = 1i64 << 40;
        let spec = ShapeSpec::parse(&[Some(huge), Some(huge), None]).unwrap();
        assert!(matches!(
            spec.resolve(2),
            Err(Error::ShapeMismatch { found: 2, .. })
        ));

        let spec = ShapeSpec::parse(&[Some(huge), Some(huge), Some(-1), None]).unwrap();
        assert!(spec.resolve(4).unwrap_err().is_shape_error());
    }

    #[test]
    fn test_for_tensor() {
        let spec = ShapeSpec::for_tensor(&[4, 100, 2], 1).unwrap();
        assert_eq!(spec.dims(), &[Dim::Size(4), Dim::Samples, Dim::Size(2)]);
        assert!(ShapeSpec::for_tensor(&[4, 100], 2).is_err());
    }
}
