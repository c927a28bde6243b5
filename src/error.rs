//! Centralized error type for the stretto umbrella crate.
//!
//! Wraps subsystem errors so `?` propagates naturally across crate boundaries.

use stretto_core::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] stretto_core::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Core(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use stretto_stretch::{StretchOptions, Stretcher};

    fn build(sample_rate: u32) -> Result<Stretcher> {
        Ok(Stretcher::new(sample_rate, 2, StretchOptions::DEFAULT)?)
    }

    #[test]
    fn test_core_errors_propagate() {
        let err = build(100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        assert!(err.to_string().contains("sample_rate"));
        assert!(build(44100).is_ok());
    }
}
