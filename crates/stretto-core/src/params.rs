//! Dynamically-typed parameters.
//!
//! Lets front-ends (scripting layers, config files, control messages) build a
//! stretcher or change its parameters without knowing Rust types up front,
//! while still telling a wrongly-typed value apart from an out-of-range one.

use std::collections::HashMap;

use crate::{Error, Result, StretchOptions};

/// Create a [`StretchParams`] map with key-value pairs.
///
/// # Example
/// ```
/// use stretto_core::{params, StretchOptions};
///
/// let params = params! {
///     "sample_rate" => 44100,
///     "channels" => 2,
///     "options" => StretchOptions::PROCESS_REALTIME,
/// };
/// assert_eq!(params.len(), 3);
/// ```
#[macro_export]
macro_rules! params {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::StretchParams::new();
        $(
            map.insert($key.to_string(), $value.into());
        )*
        map
    }};
}

/// Parameters keyed by name.
pub type StretchParams = HashMap<String, ParamValue>;

/// Parameter value types
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    String(String),
    Options(StretchOptions),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Int(_) => "integer",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Options(_) => "options",
        }
    }

    /// Non-negative integer. Floats, bools, strings and negative integers are
    /// type errors.
    pub fn to_unsigned(&self, name: &str) -> Result<u64> {
        match self {
            Self::Int(i) if *i >= 0 => Ok(*i as u64),
            _ => Err(self.mismatch(name, "unsigned integer")),
        }
    }

    /// Any number. Integers are widened.
    pub fn to_f64(&self, name: &str) -> Result<f64> {
        match self {
            Self::Float(f) => Ok(*f),
            Self::Int(i) => Ok(*i as f64),
            _ => Err(self.mismatch(name, "number")),
        }
    }

    /// Only an actual options value; raw masks and names are type errors.
    pub fn to_options(&self, name: &str) -> Result<StretchOptions> {
        match self {
            Self::Options(options) => Ok(*options),
            _ => Err(self.mismatch(name, "StretchOptions")),
        }
    }

    fn mismatch(&self, name: &str, expected: &'static str) -> Error {
        Error::TypeMismatch {
            name: name.to_string(),
            expected,
            found: format!("{} {:?}", self.type_name(), self),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<f32> for ParamValue {
    fn from(f: f32) -> Self {
        Self::Float(f as f64)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for ParamValue {
    fn from(i: i32) -> Self {
        Self::Int(i as i64)
    }
}

impl From<u32> for ParamValue {
    fn from(i: u32) -> Self {
        Self::Int(i as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<StretchOptions> for ParamValue {
    fn from(options: StretchOptions) -> Self {
        Self::Options(options)
    }
}

/// Get a required parameter, converting it with `convert`.
pub fn get_param<T>(
    params: &StretchParams,
    name: &str,
    convert: impl FnOnce(&ParamValue, &str) -> Result<T>,
) -> Result<T> {
    params
        .get(name)
        .ok_or_else(|| Error::MissingParameter(name.to_string()))
        .and_then(|v| convert(v, name))
}

/// Get an optional parameter with a default. Present but wrongly-typed values
/// are still errors.
pub fn get_param_or<T>(
    params: &StretchParams,
    name: &str,
    default: T,
    convert: impl FnOnce(&ParamValue, &str) -> Result<T>,
) -> Result<T> {
    match params.get(name) {
        Some(v) => convert(v, name),
        None => Ok(default),
    }
}

/// Fail on keys outside `known`.
pub fn reject_unknown(params: &StretchParams, known: &[&str]) -> Result<()> {
    match params.keys().find(|k| !known.contains(&k.as_str())) {
        Some(unknown) => Err(Error::UnknownParameter(unknown.clone())),
        None => Ok(()),
    }
}
