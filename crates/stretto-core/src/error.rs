//! Error types for stretto-core.

use thiserror::Error;

/// Broad category of an [`Error`].
///
/// Type and range problems are kept apart so callers (and tests) can tell a
/// wrongly-typed argument from a well-typed one with a bad value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong argument kind, or a required argument is missing.
    Type,
    /// Numeric or enumerated value outside its documented bounds.
    Range,
    /// Axis, shape or element-count problem.
    Shape,
    /// Operation not valid in the current streaming state.
    State,
}

/// Error type for stretto operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Type mismatch for '{name}': expected {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Value out of range for '{name}': {value} (expected {expected})")]
    OutOfRange {
        name: &'static str,
        value: String,
        expected: String,
    },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Invalid channel axis position {0}: must be 0 or 1")]
    InvalidAxisPosition(usize),

    #[error("Invalid dimension {0} in shape descriptor")]
    InvalidDim(i64),

    #[error("Axis {axis} out of range for tensor with {ndim} axes")]
    AxisOutOfRange { axis: usize, ndim: usize },

    #[error("Expected {expected} axes, got {found}")]
    WrongAxisCount { expected: &'static str, found: usize },

    #[error("Shape descriptor has no sample axis marker")]
    MissingSampleAxisMarker,

    #[error("Shape descriptor has {0} sample axis markers, expected exactly one")]
    DuplicateSampleAxisMarker(usize),

    #[error("Shape descriptor has {0} wildcard dimensions, at most one is allowed")]
    MultipleWildcards(usize),

    #[error("Shape mismatch: cannot fold {found} channels into {expected}")]
    ShapeMismatch { expected: String, found: usize },

    #[error("Wrong number of audio channels: expected {expected}, got {found}")]
    ChannelMismatch { expected: usize, found: usize },

    #[error("Block of {samples} samples exceeds the maximum process size {max}")]
    BlockTooLarge { samples: usize, max: usize },

    #[error("Data length {found} does not match shape element count {expected}")]
    DataLength { expected: usize, found: usize },

    #[error("Final block already fed; call reset() before feeding more audio")]
    FinalBlockAlreadyFed,

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TypeMismatch { .. } | Error::MissingParameter(_) | Error::UnknownParameter(_) => {
                ErrorKind::Type
            }
            Error::OutOfRange { .. }
            | Error::InvalidOptions(_)
            | Error::InvalidAxisPosition(_)
            | Error::InvalidDim(_) => ErrorKind::Range,
            Error::AxisOutOfRange { .. }
            | Error::WrongAxisCount { .. }
            | Error::MissingSampleAxisMarker
            | Error::DuplicateSampleAxisMarker(_)
            | Error::MultipleWildcards(_)
            | Error::ShapeMismatch { .. }
            | Error::ChannelMismatch { .. }
            | Error::BlockTooLarge { .. }
            | Error::DataLength { .. } => ErrorKind::Shape,
            Error::FinalBlockAlreadyFed | Error::InvalidState(_) => ErrorKind::State,
        }
    }

    pub fn is_type_error(&self) -> bool {
        self.kind() == ErrorKind::Type
    }

    pub fn is_range_error(&self) -> bool {
        self.kind() == ErrorKind::Range
    }

    pub fn is_shape_error(&self) -> bool {
        self.kind() == ErrorKind::Shape
    }

    pub fn out_of_range(
        name: &'static str,
        value: impl ToString,
        expected: impl Into<String>,
    ) -> Self {
        Error::OutOfRange {
            name,
            value: value.to_string(),
            expected: expected.into(),
        }
    }
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        let type_err = Error::TypeMismatch {
            name: "sample_rate".into(),
            expected: "unsigned integer",
            found: "String(\"x\")".into(),
        };
        let range_err = Error::out_of_range("sample_rate", 10, "8000..=384000");

        assert_eq!(type_err.kind(), ErrorKind::Type);
        assert_eq!(range_err.kind(), ErrorKind::Range);
        assert!(Error::MissingSampleAxisMarker.is_shape_error());
        assert_eq!(Error::FinalBlockAlreadyFed.kind(), ErrorKind::State);
    }

    #[test]
    fn test_display() {
        let err = Error::ChannelMismatch {
            expected: 2,
            found: 1,
        };
        assert_eq!(
            err.to_string(),
            "Wrong number of audio channels: expected 2, got 1"
        );
    }
}
